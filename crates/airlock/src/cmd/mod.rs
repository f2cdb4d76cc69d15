use std::path::PathBuf;

use airlock::handlers::{Echo, Math};
use airlock_rpc::Registry;
use clap::{Args, Subcommand, ValueEnum};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod call;
pub mod methods;
pub mod serve;
pub mod version;

pub const DEFAULT_SOCKET_PATH: &str = "rpc.sock";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve a handler on a local socket until interrupted.
    Serve(ServeArgs),
    /// Call one method on a running server and print the result.
    Call(CallArgs),
    /// List the methods a builtin handler exposes.
    Methods(MethodsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Call(args) => call::run(args, format),
        Command::Methods(args) => methods::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum HandlerKind {
    /// Integer arithmetic.
    #[default]
    Math,
    /// Echo and ping.
    Echo,
}

impl HandlerKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Math => "math",
            Self::Echo => "echo",
        }
    }

    pub fn registry(self) -> Registry {
        match self {
            Self::Math => Registry::from_handler(Math),
            Self::Echo => Registry::from_handler(Echo),
        }
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Socket path to bind. A stale file at this path is replaced.
    #[arg(long, env = "AIRLOCK_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
    pub socket: PathBuf,
    /// Handler to serve.
    #[arg(long, value_enum, default_value_t = HandlerKind::Math)]
    pub handler: HandlerKind,
    /// Largest accepted request, in bytes.
    #[arg(long, default_value_t = airlock_wire::DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
    /// Close malformed requests without replying.
    #[arg(long)]
    pub drop_malformed: bool,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Socket path to connect to.
    #[arg(long, env = "AIRLOCK_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
    pub socket: PathBuf,
    /// Maximum time to wait for the response (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Method name.
    pub method: String,
    /// Arguments, each parsed as JSON or taken as a plain string.
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct MethodsArgs {
    /// Handler to describe.
    #[arg(long, value_enum, default_value_t = HandlerKind::Math)]
    pub handler: HandlerKind,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

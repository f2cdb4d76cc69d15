use airlock_rpc::{MalformedPolicy, RpcServer, ServerConfig, ShutdownHandle};
use airlock_wire::FrameConfig;

use crate::cmd::ServeArgs;
use crate::exit::{rpc_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};

pub fn run(args: ServeArgs) -> CliResult<i32> {
    if args.max_frame_size == 0 {
        return Err(CliError::new(USAGE, "max frame size must be greater than zero"));
    }

    let config = ServerConfig {
        frame: FrameConfig {
            max_frame_size: args.max_frame_size,
            ..FrameConfig::default()
        },
        malformed: if args.drop_malformed {
            MalformedPolicy::Drop
        } else {
            MalformedPolicy::Reply
        },
        ..ServerConfig::default()
    };

    let mut server = RpcServer::bind_with_config(&args.socket, args.handler.registry(), config)
        .map_err(|err| rpc_error("bind failed", err))?;

    install_ctrlc_handler(server.shutdown_handle())?;

    tracing::info!(
        path = %server.path().display(),
        handler = args.handler.name(),
        "serving"
    );

    server
        .serve()
        .map_err(|err| rpc_error("serve failed", err))?;

    Ok(SUCCESS)
}

fn install_ctrlc_handler(handle: ShutdownHandle) -> CliResult<()> {
    ctrlc::set_handler(move || {
        handle.shutdown();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

//! RPC dispatch over a local socket.
//!
//! An [`RpcServer`] binds a Unix domain socket, accepts one connection at a
//! time, reads one request, dispatches it against a [`Registry`] of named
//! callables and writes back one response before closing the connection.
//! [`Client`] is the matching caller side.

pub mod args;
pub mod client;
pub mod error;
pub mod registry;
pub mod server;
pub mod shutdown;

pub use client::{call, Client};
pub use error::{ClientError, DispatchError, Result, RpcError};
pub use registry::{CallError, CallResult, Callable, Handler, Registry, Resolve};
pub use server::{dispatch, Exchange, MalformedPolicy, RpcServer, ServerConfig};
pub use shutdown::ShutdownHandle;

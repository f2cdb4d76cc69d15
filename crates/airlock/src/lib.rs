//! Minimal RPC over a local socket.
//!
//! airlock serves named methods over a Unix domain socket: one MessagePack
//! request in, one MessagePack response out, one connection per call.
//!
//! # Crate Structure
//!
//! - [`transport`] - Unix domain socket endpoint
//! - [`wire`] - value grammar, request/response records and codec
//! - [`rpc`] - handler registry, server lifecycle and client
//! - [`handlers`] - builtin handlers served by the `airlock` binary

pub mod handlers;

/// Re-export transport types.
pub mod transport {
    pub use airlock_transport::*;
}

/// Re-export wire types.
pub mod wire {
    pub use airlock_wire::*;
}

/// Re-export RPC types.
pub mod rpc {
    pub use airlock_rpc::*;
}

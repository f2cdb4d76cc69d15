//! Local stream endpoint for airlock.
//!
//! Wraps a filesystem-path Unix domain socket: bind with stale artifact
//! removal, blocking accept, connect, and removal of the socket file when the
//! listener is dropped.
//!
//! This is the lowest layer of airlock. The wire codec and the RPC server
//! build on the [`LocalStream`] type provided here.

pub mod error;

#[cfg(unix)]
pub mod stream;
#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};

#[cfg(unix)]
pub use stream::LocalStream;
#[cfg(unix)]
pub use uds::UnixDomainSocket;

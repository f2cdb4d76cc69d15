use airlock_transport::TransportError;
use airlock_wire::WireError;

/// Errors raised by the server side.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The listening endpoint could not be created.
    #[error("endpoint bind failed: {0}")]
    Bind(#[source] TransportError),

    /// Transport-level error after startup (accept, socket options).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Reading or writing a message failed.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// The server has been stopped and no longer accepts connections.
    #[error("server stopped")]
    Stopped,
}

pub type Result<T> = std::result::Result<T, RpcError>;

/// Why a request could not produce a result.
///
/// Both variants are reported to the caller as the response `error` string and
/// never stop the server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("Method {0} not found")]
    MethodNotFound(String),

    #[error("{0}")]
    CallFailed(String),
}

/// Errors raised by [`Client`](crate::Client) calls.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Could not reach the server.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Encoding the request or decoding the response failed.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// The server closed the connection without answering.
    #[error("server closed the connection without a response")]
    NoResponse,

    /// The server answered with a non-empty `error`.
    #[error("remote error: {0}")]
    Remote(String),
}

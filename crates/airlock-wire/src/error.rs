/// Errors that can occur while encoding, decoding, reading or writing messages.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The bytes do not form a valid message.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The bytes are a valid prefix of a message but more are needed.
    #[error("incomplete message")]
    Incomplete,

    /// No complete message fit into the bounded read buffer.
    #[error("message exceeds max frame size ({max} bytes)")]
    FrameTooLarge { max: usize },

    /// The message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// An I/O error occurred while reading or writing.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection in the middle of a message.
    #[error("connection closed (incomplete message)")]
    ConnectionClosed,
}

impl WireError {
    pub(crate) fn from_decode(err: rmp_serde::decode::Error) -> Self {
        use rmp_serde::decode::Error;

        match err {
            Error::InvalidMarkerRead(ref io) | Error::InvalidDataRead(ref io)
                if io.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                WireError::Incomplete
            }
            other => WireError::Malformed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, WireError>;

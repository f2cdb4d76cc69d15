use std::io::{ErrorKind, Read};

use airlock_transport::LocalStream;
use bytes::BytesMut;
use tracing::debug;

use crate::codec::{decode_request, decode_response, FrameConfig};
use crate::error::{Result, WireError};
use crate::message::{Request, Response};

const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads one complete message from any `Read` stream.
///
/// Bytes are accumulated into a buffer bounded by
/// [`FrameConfig::max_frame_size`] and a decode is attempted after every read,
/// so a message is returned as soon as its last byte arrives. The peer does not
/// have to close its write side first.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(config.max_frame_size.min(READ_CHUNK_SIZE)),
            config,
        }
    }

    /// Read the next request (blocking).
    ///
    /// Returns `Ok(None)` if the peer closed without sending a single byte.
    pub fn read_request(&mut self) -> Result<Option<Request>> {
        self.read_with(decode_request)
    }

    /// Read the next response (blocking).
    ///
    /// Returns `Ok(None)` if the peer closed without sending a single byte.
    pub fn read_response(&mut self) -> Result<Option<Response>> {
        self.read_with(decode_response)
    }

    fn read_with<M>(&mut self, decode: impl Fn(&[u8]) -> Result<M>) -> Result<Option<M>> {
        let max = self.config.max_frame_size;
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            if self.buf.len() >= max {
                return Err(WireError::FrameTooLarge { max });
            }

            let room = (max - self.buf.len()).min(READ_CHUNK_SIZE);
            let read = match self.inner.read(&mut chunk[..room]) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            };

            if read == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(WireError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);

            match decode(&self.buf) {
                Ok(message) => {
                    debug!(size = self.buf.len(), "decoded message");
                    self.buf.clear();
                    return Ok(Some(message));
                }
                Err(WireError::Incomplete) => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<LocalStream> {
    /// Create a reader for a `LocalStream` and apply the read timeout from config.
    pub fn with_config_stream(inner: LocalStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_wire_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_wire_error(err: airlock_transport::TransportError) -> WireError {
    use airlock_transport::TransportError;

    match err {
        TransportError::Io(io) | TransportError::Accept(io) => WireError::Io(io),
        TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
            WireError::Io(source)
        }
        other => WireError::Io(std::io::Error::other(other.to_string())),
    }
}

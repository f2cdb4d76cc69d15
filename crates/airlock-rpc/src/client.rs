use std::path::{Path, PathBuf};
use std::time::Duration;

use airlock_transport::UnixDomainSocket;
use airlock_wire::{FrameConfig, FrameReader, FrameWriter, Request, Response, Value};
use tracing::debug;

use crate::error::ClientError;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Calls methods on a server listening at a socket path.
///
/// Every call opens its own connection, matching the server's one request
/// per connection model.
#[derive(Debug, Clone)]
pub struct Client {
    path: PathBuf,
    config: FrameConfig,
}

impl Client {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_config(path, FrameConfig::default())
    }

    pub fn with_config(path: impl AsRef<Path>, config: FrameConfig) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config,
        }
    }

    /// Apply `timeout` to both reading the response and writing the request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = Some(timeout);
        self.config.write_timeout = Some(timeout);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Call `method` and return its result, or [`ClientError::Remote`] if the
    /// server reported an error.
    pub fn call(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        let response = self.request(&Request::new(method, args))?;
        response.into_result().map_err(ClientError::Remote)
    }

    /// Send `request` and return the raw response.
    pub fn request(&self, request: &Request) -> Result<Response> {
        let stream = UnixDomainSocket::connect(&self.path)?;
        let mut writer = FrameWriter::with_config_stream(stream.try_clone()?, self.config.clone())?;
        let mut reader = FrameReader::with_config_stream(stream, self.config.clone())?;

        let size = writer.write_message(request)?;
        debug!(method = %request.method, size, "sent request");

        let response = reader.read_response()?.ok_or(ClientError::NoResponse)?;
        debug!(method = %request.method, error = %response.error, "received response");
        Ok(response)
    }
}

/// Call `method` on the server at `path` with default configuration.
pub fn call(path: impl AsRef<Path>, method: &str, args: Vec<Value>) -> Result<Value> {
    Client::new(path).call(method, args)
}

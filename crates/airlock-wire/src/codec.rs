use serde::{Deserialize, Serialize};

use crate::error::{Result, WireError};
use crate::message::{Request, Response};
use crate::value::Value;

/// Default maximum size of one encoded message: 4 KiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 4 * 1024;

/// Deepest list/map nesting accepted by the decoders.
///
/// Decoding recurses once per level, so this bounds stack use for inputs
/// that stay well under the frame size limit.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Encode any message as a MessagePack map with named keys.
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(message)?)
}

/// Encode a bare value.
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    encode(value)
}

/// Decode a bare value.
pub fn decode_value(bytes: &[u8]) -> Result<Value> {
    decode(bytes)
}

/// Decode a request.
///
/// Fails with [`WireError::Malformed`] when `func` is missing, not a string
/// or empty, or when `args` is not a list of values. Returns
/// [`WireError::Incomplete`] when `bytes` is a truncated message.
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    let request: Request = decode(bytes)?;
    if request.method.is_empty() {
        return Err(WireError::Malformed("empty method name".to_string()));
    }
    Ok(request)
}

/// Decode a response. Missing keys take their defaults (nil result, empty error).
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    decode(bytes)
}

fn decode<'de, T: Deserialize<'de>>(bytes: &'de [u8]) -> Result<T> {
    let mut de = rmp_serde::Deserializer::from_read_ref(bytes);
    de.set_max_depth(MAX_NESTING_DEPTH);
    T::deserialize(&mut de).map_err(WireError::from_decode)
}

/// Configuration for message reading and writing.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum encoded message size in bytes. Default: 4 KiB.
    pub max_frame_size: usize,
    /// Read timeout for blocking operations. Default: none.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations. Default: none.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

//! Wire codec for airlock RPC messages.
//!
//! Every message is a single MessagePack map:
//! - request: `{"func": <method name>, "args": [<value>...]}`
//! - response: `{"result": <value or nil>, "error": <string, empty on success>}`
//!
//! MessagePack is self-delimiting, so there is no length prefix. Readers
//! accumulate bytes into a bounded buffer until a complete message decodes.

pub mod codec;
pub mod error;
pub mod message;
pub mod reader;
pub mod value;
pub mod writer;

pub use codec::{
    decode_request, decode_response, decode_value, encode, encode_value, FrameConfig,
    DEFAULT_MAX_FRAME_SIZE, MAX_NESTING_DEPTH,
};
pub use error::{Result, WireError};
pub use message::{Request, Response};
pub use reader::FrameReader;
pub use value::Value;
pub use writer::FrameWriter;

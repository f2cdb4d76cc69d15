use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A call request: the target method and its positional arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Name of the method to invoke. Never empty once decoded.
    #[serde(rename = "func")]
    pub method: String,
    /// Positional arguments in call order.
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Request {
    pub fn new(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

/// The outcome of a call.
///
/// A non-empty `error` means the call failed and `result` is nil. Otherwise
/// `result` is the returned value, which may itself be nil.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: String,
}

impl Response {
    /// A successful response carrying `result`.
    pub fn ok(result: impl Into<Value>) -> Self {
        Self {
            result: result.into(),
            error: String::new(),
        }
    }

    /// A failed response carrying `message`.
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            result: Value::Nil,
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }

    /// Split into the call outcome.
    pub fn into_result(self) -> std::result::Result<Value, String> {
        if self.is_error() {
            Err(self.error)
        } else {
            Ok(self.result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn err_response_has_nil_result() {
        let response = Response::err("boom");
        assert!(response.is_error());
        assert!(response.result.is_nil());
        assert_eq!(response.into_result(), Err("boom".to_string()));
    }

    #[test]
    fn ok_response_with_nil_result_is_success() {
        let response = Response::ok(Value::Nil);
        assert!(!response.is_error());
        assert_eq!(response.into_result(), Ok(Value::Nil));
    }
}

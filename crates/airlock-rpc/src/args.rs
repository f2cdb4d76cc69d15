//! Positional argument helpers for method implementations.
//!
//! Each helper fails with a [`CallError`] whose message is sent back to the
//! caller, e.g. `argument 1: expected integer, got string`.

use airlock_wire::Value;

use crate::registry::CallError;

/// Fail unless exactly `expected` arguments were passed.
pub fn expect_arity(args: &[Value], expected: usize) -> Result<(), CallError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(CallError::new(format!(
            "expected {expected} argument{}, got {}",
            if expected == 1 { "" } else { "s" },
            args.len()
        )))
    }
}

/// Argument at `index`, or a failure if too few were passed.
pub fn arg(args: &[Value], index: usize) -> Result<&Value, CallError> {
    args.get(index)
        .ok_or_else(|| CallError::new(format!("missing argument {index}")))
}

pub fn arg_i64(args: &[Value], index: usize) -> Result<i64, CallError> {
    let value = arg(args, index)?;
    value.as_i64().ok_or_else(|| mismatch(index, "integer", value))
}

pub fn arg_f64(args: &[Value], index: usize) -> Result<f64, CallError> {
    let value = arg(args, index)?;
    value.as_f64().ok_or_else(|| mismatch(index, "float", value))
}

pub fn arg_str(args: &[Value], index: usize) -> Result<&str, CallError> {
    let value = arg(args, index)?;
    value.as_str().ok_or_else(|| mismatch(index, "string", value))
}

pub fn arg_bool(args: &[Value], index: usize) -> Result<bool, CallError> {
    let value = arg(args, index)?;
    value.as_bool().ok_or_else(|| mismatch(index, "boolean", value))
}

fn mismatch(index: usize, expected: &str, got: &Value) -> CallError {
    CallError::new(format!(
        "argument {index}: expected {expected}, got {}",
        got.type_name()
    ))
}

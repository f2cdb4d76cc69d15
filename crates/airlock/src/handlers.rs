//! Builtin handlers.

use std::sync::Arc;

use airlock_rpc::args::{arg_i64, expect_arity};
use airlock_rpc::{CallError, CallResult, Handler, Registry};
use airlock_wire::Value;

/// Integer arithmetic: `Add`, `Subtract`, `Multiply`, `Divide`.
///
/// `Divide` rounds toward negative infinity. Overflow and a zero divisor are
/// reported as call failures.
#[derive(Debug, Default, Clone, Copy)]
pub struct Math;

impl Handler for Math {
    fn register(self: Arc<Self>, registry: &mut Registry) {
        registry
            .register("Add", |args| binary(args, i64::checked_add))
            .register("Subtract", |args| binary(args, i64::checked_sub))
            .register("Multiply", |args| binary(args, i64::checked_mul))
            .register("Divide", |args| {
                expect_arity(args, 2)?;
                floor_div(arg_i64(args, 0)?, arg_i64(args, 1)?)
            });
    }
}

fn binary(args: &[Value], op: fn(i64, i64) -> Option<i64>) -> CallResult {
    expect_arity(args, 2)?;
    op(arg_i64(args, 0)?, arg_i64(args, 1)?)
        .map(Value::Integer)
        .ok_or_else(overflow)
}

fn floor_div(a: i64, b: i64) -> CallResult {
    if b == 0 {
        return Err(CallError::new("division by zero"));
    }
    let q = a.checked_div(b).ok_or_else(overflow)?;
    let q = if a % b != 0 && (a < 0) != (b < 0) { q - 1 } else { q };
    Ok(Value::Integer(q))
}

fn overflow() -> CallError {
    CallError::new("integer overflow")
}

/// Diagnostics: `Echo` returns its arguments as a list, `Ping` returns `"pong"`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Echo;

impl Handler for Echo {
    fn register(self: Arc<Self>, registry: &mut Registry) {
        registry
            .register("Echo", |args| Ok(Value::List(args.to_vec())))
            .register("Ping", |_| Ok(Value::from("pong")));
    }
}

#[cfg(test)]
mod tests {
    use airlock_rpc::Resolve;

    use super::*;

    fn call(registry: &Registry, method: &str, args: &[Value]) -> CallResult {
        let f = registry.resolve(method).expect("method should be registered");
        f(args)
    }

    #[test]
    fn math_exposes_four_methods() {
        let registry = Registry::from_handler(Math);
        assert_eq!(
            registry.method_names(),
            vec!["Add", "Divide", "Multiply", "Subtract"]
        );
    }

    #[test]
    fn math_operations() {
        let registry = Registry::from_handler(Math);
        let two_three = [Value::Integer(2), Value::Integer(3)];
        assert_eq!(call(&registry, "Add", &two_three), Ok(Value::Integer(5)));
        assert_eq!(call(&registry, "Subtract", &two_three), Ok(Value::Integer(-1)));
        assert_eq!(call(&registry, "Multiply", &two_three), Ok(Value::Integer(6)));
        assert_eq!(
            call(&registry, "Divide", &[Value::Integer(7), Value::Integer(2)]),
            Ok(Value::Integer(3))
        );
    }

    #[test]
    fn divide_floors_toward_negative_infinity() {
        assert_eq!(floor_div(-7, 2), Ok(Value::Integer(-4)));
        assert_eq!(floor_div(7, -2), Ok(Value::Integer(-4)));
        assert_eq!(floor_div(-7, -2), Ok(Value::Integer(3)));
        assert_eq!(floor_div(-8, 2), Ok(Value::Integer(-4)));
    }

    #[test]
    fn divide_by_zero_fails() {
        let registry = Registry::from_handler(Math);
        let err = call(&registry, "Divide", &[Value::Integer(10), Value::Integer(0)]).unwrap_err();
        assert_eq!(err.message(), "division by zero");
    }

    #[test]
    fn overflow_fails() {
        let registry = Registry::from_handler(Math);
        let err = call(&registry, "Add", &[Value::Integer(i64::MAX), Value::Integer(1)]).unwrap_err();
        assert_eq!(err.message(), "integer overflow");
        assert_eq!(floor_div(i64::MIN, -1), Err(overflow()));
    }

    #[test]
    fn math_accepts_integral_floats() {
        let registry = Registry::from_handler(Math);
        assert_eq!(
            call(&registry, "Add", &[Value::Float(2.0), Value::Integer(3)]),
            Ok(Value::Integer(5))
        );
    }

    #[test]
    fn echo_returns_arguments() {
        let registry = Registry::from_handler(Echo);
        let args = [Value::Integer(1), Value::from("two"), Value::Nil];
        assert_eq!(call(&registry, "Echo", &args), Ok(Value::List(args.to_vec())));
        assert_eq!(call(&registry, "Ping", &[]), Ok(Value::from("pong")));
    }
}

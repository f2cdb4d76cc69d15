use std::time::Duration;

use airlock_rpc::Client;
use airlock_wire::Value;

use crate::cmd::CallArgs;
use crate::exit::{client_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_result, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let params: Vec<Value> = args.args.iter().map(|raw| parse_arg(raw)).collect();

    let client = Client::new(&args.socket).with_timeout(timeout);
    let result = client
        .call(&args.method, params)
        .map_err(|err| client_error("call failed", err))?;

    print_result(&args.method, &result, format);
    Ok(SUCCESS)
}

/// JSON when it parses, otherwise the raw text as a string.
fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw))
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

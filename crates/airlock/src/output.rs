use std::io::IsTerminal;

use airlock_wire::Value;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct CallOutput<'a> {
    method: &'a str,
    result: &'a Value,
}

#[derive(Serialize)]
struct MethodsOutput<'a> {
    handler: &'a str,
    methods: &'a [&'a str],
}

pub fn print_result(method: &str, result: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = CallOutput { method, result };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["METHOD", "TYPE", "RESULT"])
                .add_row(vec![
                    method.to_string(),
                    result.type_name().to_string(),
                    render(result),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", render(result)),
    }
}

pub fn print_methods(handler: &str, methods: &[&str], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MethodsOutput { handler, methods };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["HANDLER", "METHOD"]);
            for method in methods {
                table.add_row(vec![handler.to_string(), method.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for method in methods {
                println!("{method}");
            }
        }
    }
}

/// Plain strings print bare; everything else prints as compact JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| format!("{other:?}")),
    }
}

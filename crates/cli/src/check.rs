use std::path::PathBuf;

use clap::Args;
use schemagen_core::{Issue, check};
use serde_json::Value;
use tracing::debug;

use crate::common::{compile_document, load_config};

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Resolved OpenAPI document (JSON)
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,
    /// Named schema to check against
    #[arg(long, value_name = "SCHEMA")]
    pub model: String,
    /// JSON value to check
    #[arg(value_name = "VALUE")]
    pub value: PathBuf,
    /// Generator configuration (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Exit code 0 when the value passes, 1 on issues or errors.
pub fn run(args: CheckArgs) -> i32 {
    match execute(&args) {
        Ok(issues) if issues.is_empty() => {
            println!("ok");
            0
        }
        Ok(issues) => {
            for issue in issues {
                println!("{issue}");
            }
            1
        }
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}

fn execute(args: &CheckArgs) -> Result<Vec<Issue>, String> {
    let config = load_config(args.config.as_deref())?;
    let api = compile_document(&args.document, &config)?;
    let model = api
        .model(&args.model)
        .ok_or_else(|| format!("Unknown schema '{}'", args.model))?;

    let raw = std::fs::read_to_string(&args.value)
        .map_err(|e| format!("Failed to read {}: {e}", args.value.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .map_err(|e| format!("Invalid JSON in {}: {e}", args.value.display()))?;

    let issues = check(&model.validator, &value, &api.index).map_err(|e| e.to_string())?;
    debug!(model = %args.model, issues = issues.len(), "checked value");
    Ok(issues)
}

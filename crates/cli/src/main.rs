//! `schemagen` command-line driver.

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod check;
mod common;
mod compile;

#[derive(Parser)]
#[command(
    name = "schemagen",
    version,
    about = "Compile OpenAPI schemas into type and validator contracts"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a document and print the result
    Compile(compile::CompileArgs),
    /// Check a JSON value against a compiled schema
    Check(check::CheckArgs),
}

fn main() {
    init_tracing();
    std::process::exit(run(std::env::args()));
}

fn run<I>(args: I) -> i32
where
    I: IntoIterator<Item = String>,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => match cli.command {
            Some(Commands::Compile(args)) => compile::run(args),
            Some(Commands::Check(args)) => check::run(args),
            None => {
                let mut cmd = Cli::command();
                let _ = cmd.print_help();
                println!();
                0
            }
        },
        Err(e) => {
            let code = e.exit_code();
            let _ = e.print();
            code
        }
    }
}

fn init_tracing() {
    // SCHEMAGEN_LOG takes a plain level ("debug") or a full filter spec
    let filter = match std::env::var("SCHEMAGEN_LOG") {
        Ok(level) if is_plain_level(&level) => {
            format!("schemagen={level},schemagen_core={level},schemagen_cli={level}")
        }
        Ok(spec) => spec,
        Err(_) => "schemagen=info,schemagen_core=info,schemagen_cli=info".to_string(),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(EnvFilter::new(filter));

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: tracing subscriber already initialized");
    }
}

fn is_plain_level(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_no_command_prints_help() {
        assert_eq!(run(argv(&["schemagen"])), 0);
    }

    #[test]
    fn test_unknown_format_is_a_usage_error() {
        assert_eq!(
            run(argv(&["schemagen", "compile", "openapi.json", "--format", "yaml"])),
            2
        );
    }

    #[test]
    fn test_missing_document_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert_eq!(
            run(argv(&["schemagen", "compile", path.to_str().unwrap()])),
            1
        );
    }

    #[test]
    fn test_plain_levels() {
        assert!(is_plain_level("DEBUG"));
        assert!(!is_plain_level("schemagen_core=trace"));
    }
}

use std::path::Path;
use std::time::Instant;

use schemagen_core::{CompiledApi, GeneratorConfig, generate};
use tracing::debug;

/// Run a command body, mapping its error to stderr and exit code 1.
pub fn run_command<F>(f: F) -> i32
where
    F: FnOnce() -> Result<(), String>,
{
    match f() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}

/// Configuration from `path`, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<GeneratorConfig, String> {
    match path {
        Some(path) => {
            let config = GeneratorConfig::load(path).map_err(|e| e.to_string())?;
            debug!(path = %path.display(), "loaded configuration");
            Ok(config)
        }
        None => Ok(GeneratorConfig::default()),
    }
}

/// Read and compile the document at `path`.
pub fn compile_document(path: &Path, config: &GeneratorConfig) -> Result<CompiledApi, String> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    generate(&json, config).map_err(|e| format!("{}: {e}", path.display()))
}

pub fn format_elapsed_ms(start: Instant) -> String {
    let elapsed = start.elapsed();
    if elapsed.as_secs() == 0 {
        return format!("{}ms", elapsed.as_millis());
    }
    format!("{}s {}ms", elapsed.as_secs(), elapsed.subsec_millis())
}

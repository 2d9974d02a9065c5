use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, ValueEnum};
use schemagen_core::{CompiledApi, Emit, EmitContext, GeneratorConfig};
use tracing::info;

use crate::common::{compile_document, format_elapsed_ms, load_config, run_command};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Full compiled API as JSON
    Json,
    /// Modules with rendered declarations and call signatures
    Summary,
}

#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    /// Resolved OpenAPI document (JSON)
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,
    /// Generator configuration (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Summary)]
    pub format: OutputFormat,
}

pub fn run(args: CompileArgs) -> i32 {
    run_command(|| {
        let output = execute(&args)?;
        print!("{output}");
        Ok(())
    })
}

fn execute(args: &CompileArgs) -> Result<String, String> {
    let start = Instant::now();
    let config = load_config(args.config.as_deref())?;
    let api = compile_document(&args.document, &config)?;
    info!(
        document = %args.document.display(),
        elapsed = %format_elapsed_ms(start),
        "compiled"
    );

    match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&api)
            .map(|json| json + "\n")
            .map_err(|e| format!("Failed to serialize output: {e}")),
        OutputFormat::Summary => Ok(summary(&api, &config)),
    }
}

fn summary(api: &CompiledApi, config: &GeneratorConfig) -> String {
    let cx = EmitContext::new(&api.index, config);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} models, {} operations in {} modules",
        api.index.len(),
        api.operations.len(),
        api.modules.len()
    );

    for module in &api.modules {
        let _ = writeln!(out, "\n// {}", module.module_name);
        for (owner, names) in &module.imports {
            let names: Vec<String> = names
                .iter()
                .flat_map(|name| [cx.model_name(name), cx.schema_const(name)])
                .collect();
            let _ = writeln!(out, "import {{ {} }} from \"./{owner}\";", names.join(", "));
        }
        for name in &module.models {
            if let Some(model) = api.model(name) {
                out.push_str(&model.emit_with(&cx));
            }
        }
        for name in &module.operations {
            if let Some(op) = api.operation(name) {
                let _ = writeln!(out, "{}", op.emit_with(&cx));
            }
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    const DOCUMENT: &str = r##"{
        "openapi": "3.0.3",
        "info": { "title": "Pets", "version": "1.0.0" },
        "paths": {
            "/pets": {
                "get": {
                    "operationId": "listPets",
                    "tags": ["pets"],
                    "responses": {
                        "200": {
                            "description": "ok",
                            "content": {
                                "application/json": {
                                    "schema": { "type": "array", "items": { "$ref": "#/components/schemas/Pet" } }
                                }
                            }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Pet": {
                    "type": "object",
                    "required": ["name"],
                    "properties": { "name": { "type": "string" } }
                }
            }
        }
    }"##;

    fn document_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOCUMENT.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_summary_lists_models_and_operations() {
        let file = document_file();
        let output = execute(&CompileArgs {
            document: file.path().to_path_buf(),
            config: None,
            format: OutputFormat::Summary,
        })
        .unwrap();

        assert!(output.starts_with("1 models, 1 operations in 1 modules"));
        assert!(output.contains("// pets"));
        assert!(output.contains("export type Pet = "));
        assert!(output.contains("listPets(): GET /pets => Pet[]"));
    }

    #[test]
    fn test_json_output_parses() {
        let file = document_file();
        let output = execute(&CompileArgs {
            document: file.path().to_path_buf(),
            config: None,
            format: OutputFormat::Json,
        })
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["operations"][0]["name"], "listPets");
        assert_eq!(value["modules"][0]["moduleName"], "pets");
        assert!(value["index"]["models"]["Pet"].is_object());
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let file = document_file();
        let mut config = tempfile::NamedTempFile::new().unwrap();
        writeln!(config, "unknown = true").unwrap();

        let err = execute(&CompileArgs {
            document: file.path().to_path_buf(),
            config: Some(config.path().to_path_buf()),
            format: OutputFormat::Summary,
        })
        .unwrap_err();
        assert!(err.contains("invalid configuration"));
    }
}

//! Compilation pipeline.
//!
//! 1. Resolve scopes for every Named Schema (the barrier: nothing compiles
//!    before the complete assignment exists).
//! 2. Compile every model, scopes in parallel.
//! 3. Synthesize every operation contract, in parallel.
//! 4. Group models, operations and cross-scope imports into modules.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::GeneratorConfig;
use crate::error::CompileError;
use crate::ir::{CompiledModel, ModelEntry, OperationContract, RequiredImports, Scope};
use crate::load::{LoadedDocument, load};
use crate::resolve::{ModelIndex, resolve};
use crate::spec::OpenApiSpec;
use crate::synthesize::synthesize;
use crate::typegen::compile_type;
use crate::validator::compile_validator;

/// One output module.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeModule {
    pub scope: Scope,
    pub module_name: String,
    /// Schema names owned by this scope, dependencies first.
    pub models: Vec<String>,
    /// Operation names, in document order.
    pub operations: Vec<String>,
    /// Owning module name to the schema names imported from it.
    pub imports: BTreeMap<String, BTreeSet<String>>,
}

/// Everything produced for one document.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledApi {
    pub index: ModelIndex,
    pub operations: Vec<OperationContract>,
    pub modules: Vec<ScopeModule>,
}

impl CompiledApi {
    pub fn model(&self, schema_name: &str) -> Option<&CompiledModel> {
        self.index.compiled(schema_name)
    }

    pub fn operation(&self, name: &str) -> Option<&OperationContract> {
        self.operations.iter().find(|op| op.name == name)
    }

    pub fn module(&self, scope: &Scope) -> Option<&ScopeModule> {
        self.modules.iter().find(|m| m.scope == *scope)
    }
}

/// Parse, lower and compile an OpenAPI JSON document.
pub fn generate(json: &str, config: &GeneratorConfig) -> Result<CompiledApi, CompileError> {
    let spec = OpenApiSpec::from_json(json)?;
    let document = load(&spec)?;
    compile(&document, config)
}

/// Compile a lowered document.
pub fn compile(
    document: &LoadedDocument,
    config: &GeneratorConfig,
) -> Result<CompiledApi, CompileError> {
    let mut index = resolve(&document.operations, &document.graph)?;

    let scopes: Vec<Scope> = index.scopes().into_iter().collect();
    let compiled: Vec<Vec<CompiledModel>> = scopes
        .par_iter()
        .map(|scope| {
            index
                .in_scope(scope)
                .map(|entry| compile_model(entry, &index))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<_, _>>()?;
    let mut compiled: HashMap<String, CompiledModel> = compiled
        .into_iter()
        .flatten()
        .map(|m| (m.schema_name.clone(), m))
        .collect();
    let names: Vec<String> = index.entries().map(|e| e.schema_name.clone()).collect();
    for name in names {
        if let Some(model) = compiled.remove(&name) {
            index.record(model)?;
        }
    }
    debug!(models = index.len(), scopes = scopes.len(), "models compiled");

    let synthesized: Vec<(OperationContract, RequiredImports)> = document
        .operations
        .par_iter()
        .map(|op| synthesize(op, &index, config))
        .collect::<Result<_, _>>()?;
    debug!(operations = synthesized.len(), "operations synthesized");

    let modules = group_modules(&index, &synthesized, config);
    let operations: Vec<OperationContract> =
        synthesized.into_iter().map(|(contract, _)| contract).collect();

    info!(
        models = index.len(),
        operations = operations.len(),
        modules = modules.len(),
        "compilation finished"
    );
    Ok(CompiledApi {
        index,
        operations,
        modules,
    })
}

fn compile_model(entry: &ModelEntry, index: &ModelIndex) -> Result<CompiledModel, CompileError> {
    Ok(CompiledModel {
        schema_name: entry.schema_name.clone(),
        model_name: entry.model_name.clone(),
        scope: entry.scope.clone(),
        dependencies: entry.dependencies.clone(),
        declaration: compile_type(&entry.schema, true),
        validator: compile_validator(&entry.schema, index)?,
        doc: entry.schema.description.clone(),
        deprecated: entry.schema.deprecated,
    })
}

fn group_modules(
    index: &ModelIndex,
    synthesized: &[(OperationContract, RequiredImports)],
    config: &GeneratorConfig,
) -> Vec<ScopeModule> {
    let mut scopes = index.scopes();
    scopes.extend(synthesized.iter().map(|(op, _)| op.scope.clone()));

    scopes
        .into_iter()
        .map(|scope| {
            let models = dependency_order(index, &scope);

            let mut used: BTreeSet<&str> = BTreeSet::new();
            for name in &models {
                if let Some(entry) = index.get(name) {
                    used.extend(entry.dependencies.iter().map(String::as_str));
                }
            }
            let mut operations = Vec::new();
            for (op, imports) in synthesized.iter().filter(|(op, _)| op.scope == scope) {
                operations.push(op.name.clone());
                used.extend(imports.iter().map(String::as_str));
            }

            let mut imports: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
            for name in used {
                if let Some(owner) = index.scope_of(name)
                    && *owner != scope
                {
                    imports
                        .entry(owner.module_name(&config.default_scope).to_string())
                        .or_default()
                        .insert(name.to_string());
                }
            }

            ScopeModule {
                module_name: scope.module_name(&config.default_scope).to_string(),
                scope,
                models,
                operations,
                imports,
            }
        })
        .collect()
}

/// Models of `scope` with same-scope dependencies first. Cycles are cut at
/// the first revisit.
fn dependency_order(index: &ModelIndex, scope: &Scope) -> Vec<String> {
    fn visit(index: &ModelIndex, name: &str, seen: &mut HashSet<String>, out: &mut Vec<String>) {
        if !seen.insert(name.to_string()) {
            return;
        }
        let Some(entry) = index.get(name) else {
            return;
        };
        for dep in &entry.dependencies {
            if index.scope_of(dep) == Some(&entry.scope) {
                visit(index, dep, seen, out);
            }
        }
        out.push(name.to_string());
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for entry in index.in_scope(scope) {
        visit(index, &entry.schema_name, &mut seen, &mut out);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ir::{HttpMethod, OperationDef, ResponseDef, SchemaGraph, SchemaNode};

    fn document() -> LoadedDocument {
        let mut graph = SchemaGraph::new();
        graph.insert(
            "Pet",
            SchemaNode::object(
                [
                    ("owner", SchemaNode::reference("Owner")),
                    ("error", SchemaNode::reference("Error")),
                ],
                &[],
            ),
        );
        graph.insert("Owner", SchemaNode::object([("name", SchemaNode::string())], &[]));
        graph.insert("Error", SchemaNode::object([("message", SchemaNode::string())], &[]));

        let mut list = OperationDef::new("listPets", HttpMethod::Get, "/pets");
        list.tags = vec!["pets".into()];
        list.responses.push(ResponseDef::with_body(
            "200",
            "application/json",
            SchemaNode::array(SchemaNode::reference("Pet")),
        ));
        let mut health = OperationDef::new("health", HttpMethod::Get, "/health");
        health.responses.push(ResponseDef::with_body(
            "500",
            "application/json",
            SchemaNode::reference("Error"),
        ));

        LoadedDocument {
            graph,
            operations: vec![list, health],
        }
    }

    #[test]
    fn test_modules_order_dependencies_first() {
        let api = compile(&document(), &GeneratorConfig::default()).unwrap();
        let pets = api.module(&Scope::Tag("pets".into())).unwrap();
        assert_eq!(pets.models, vec!["Owner", "Pet"]);
        assert_eq!(pets.operations, vec!["listPets"]);
        assert_eq!(
            pets.imports.get("common").unwrap().iter().collect::<Vec<_>>(),
            vec!["Error"]
        );

        let common = api.module(&Scope::Default).unwrap();
        assert_eq!(common.module_name, "common");
        assert_eq!(common.models, vec!["Error"]);
        assert_eq!(common.operations, vec!["health"]);
        assert!(common.imports.is_empty());
    }

    #[test]
    fn test_every_model_is_compiled() {
        let api = compile(&document(), &GeneratorConfig::default()).unwrap();
        let names: Vec<&str> = api.index.models().map(|m| m.schema_name.as_str()).collect();
        assert_eq!(names, vec!["Pet", "Owner", "Error"]);
        assert!(api.model("Pet").unwrap().validator.lazy_references().contains(&"Owner"));
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let config = GeneratorConfig::default();
        let first = compile(&document(), &config).unwrap();
        let second = compile(&document(), &config).unwrap();
        assert_eq!(first.operations, second.operations);
        assert_eq!(first.modules, second.modules);
        assert_eq!(
            first.index.models().collect::<Vec<_>>(),
            second.index.models().collect::<Vec<_>>()
        );
    }
}

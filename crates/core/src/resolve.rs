//! Dependency and scope resolution.
//!
//! Walks every operation's schemas to their Named Schema closure and assigns
//! each definition to exactly one [`Scope`]. The result is the
//! [`ModelIndex`], the single memo table both compiler backends consult.

use std::collections::{BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::error::CompileError;
use crate::ir::{CompiledModel, ModelEntry, OperationDef, Scope, SchemaGraph, SchemaNode, ValidatorExpr};
use crate::utils::{model_identifier, unique_name};
use crate::validator::RefResolver;

/// Registered Named Schemas, in graph order, plus their compiled artifacts
/// once the pipeline has produced them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelIndex {
    #[serde(skip)]
    entries: IndexMap<String, ModelEntry>,
    #[serde(rename = "models")]
    compiled: IndexMap<String, CompiledModel>,
}

impl ModelIndex {
    /// Registered entry for `name`, or a resolution error.
    pub fn entry(&self, name: &str) -> Result<&ModelEntry, CompileError> {
        self.entries
            .get(name)
            .ok_or_else(|| CompileError::unresolved(name))
    }

    pub fn get(&self, name: &str) -> Option<&ModelEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ModelEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn scope_of(&self, name: &str) -> Option<&Scope> {
        self.entries.get(name).map(|e| &e.scope)
    }

    /// Every scope that owns at least one model.
    pub fn scopes(&self) -> BTreeSet<Scope> {
        self.entries.values().map(|e| e.scope.clone()).collect()
    }

    /// Entries owned by `scope`, in graph order.
    pub fn in_scope<'a>(&'a self, scope: &'a Scope) -> impl Iterator<Item = &'a ModelEntry> {
        self.entries.values().filter(move |e| e.scope == *scope)
    }

    /// Store the compiled artifacts of a registered model.
    pub fn record(&mut self, model: CompiledModel) -> Result<(), CompileError> {
        self.entry(&model.schema_name)?;
        self.compiled.insert(model.schema_name.clone(), model);
        Ok(())
    }

    pub fn compiled(&self, name: &str) -> Option<&CompiledModel> {
        self.compiled.get(name)
    }

    /// Compiled models, in graph order of recording.
    pub fn models(&self) -> impl Iterator<Item = &CompiledModel> {
        self.compiled.values()
    }

    /// User-facing name of a schema occurrence: its title, else the name of
    /// the Named Schema it refers to (or that definition's title).
    pub fn display_name<'a>(&'a self, schema: &'a SchemaNode) -> Option<&'a str> {
        if let Some(title) = schema.title.as_deref() {
            return Some(title);
        }
        let name = schema.named_target()?;
        match self.entries.get(name) {
            Some(entry) => entry.schema.display_name().or(Some(name)),
            None => Some(name),
        }
    }
}

impl RefResolver for ModelIndex {
    fn resolve(&self, name: &str) -> Result<ValidatorExpr, CompileError> {
        self.entry(name)?;
        Ok(ValidatorExpr::lazy(name))
    }
}

/// Assign every Named Schema in `graph` to a scope.
///
/// A schema reached only from operations of one tag lands in that tag's
/// scope. Anything reached from two or more tags, from an untagged operation,
/// or from no operation at all lands in [`Scope::Default`].
pub fn resolve(operations: &[OperationDef], graph: &SchemaGraph) -> Result<ModelIndex, CompileError> {
    let mut usage: HashMap<String, BTreeSet<Scope>> = HashMap::new();
    for op in operations {
        let scope = Scope::for_tag(op.primary_tag());
        for name in closure(&op.schemas(), graph)? {
            usage.entry(name).or_default().insert(scope.clone());
        }
    }

    let mut taken = HashSet::new();
    let mut entries = IndexMap::with_capacity(graph.len());
    for (name, node) in graph.iter() {
        let dependencies = node.direct_references();
        if let Some(missing) = dependencies.iter().find(|d| !graph.contains(d)) {
            return Err(CompileError::unresolved(missing.as_str()));
        }
        let scope = usage
            .get(name)
            .filter(|scopes| scopes.len() == 1)
            .and_then(|scopes| scopes.iter().next())
            .cloned()
            .unwrap_or(Scope::Default);
        entries.insert(
            name.to_string(),
            ModelEntry {
                schema_name: name.to_string(),
                model_name: unique_name(&model_identifier(name), &mut taken),
                scope,
                dependencies,
                schema: node.clone(),
            },
        );
    }

    let index = ModelIndex {
        entries,
        compiled: IndexMap::new(),
    };
    debug!(
        models = index.len(),
        scopes = index.scopes().len(),
        shared = index.in_scope(&Scope::Default).count(),
        "scopes resolved"
    );
    Ok(index)
}

/// Names transitively reachable from `roots`, in discovery order.
fn closure(roots: &[&SchemaNode], graph: &SchemaGraph) -> Result<Vec<String>, CompileError> {
    let mut pending: Vec<String> = roots
        .iter()
        .flat_map(|root| root.direct_references())
        .rev()
        .collect();
    let mut seen = HashSet::new();
    let mut order = Vec::new();

    while let Some(name) = pending.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }
        let node = graph
            .get(&name)
            .ok_or_else(|| CompileError::unresolved(name.as_str()))?;
        pending.extend(node.direct_references().into_iter().rev());
        order.push(name);
    }
    Ok(order)
}

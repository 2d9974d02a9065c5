//! Model entries and output scopes.

use std::fmt;

use serde::Serialize;

use super::schema::SchemaNode;
use super::types::TypeExpr;
use super::validator::ValidatorExpr;

/// Output partition owning a subset of Named Schemas.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "scope", content = "tag", rename_all = "camelCase")]
pub enum Scope {
    /// Shared schemas: used by two or more tags, by untagged operations, or
    /// by no operation at all.
    Default,
    /// Schemas used by operations of exactly one tag.
    Tag(String),
}

impl Scope {
    /// Scope for an operation's primary tag.
    pub fn for_tag(tag: Option<&str>) -> Self {
        match tag {
            Some(tag) => Scope::Tag(tag.to_string()),
            None => Scope::Default,
        }
    }

    /// Module name, with `default_name` standing in for the default scope.
    pub fn module_name<'a>(&'a self, default_name: &'a str) -> &'a str {
        match self {
            Scope::Default => default_name,
            Scope::Tag(tag) => tag,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Default => write!(f, "<default>"),
            Scope::Tag(tag) => write!(f, "{tag}"),
        }
    }
}

/// A Named Schema registered in exactly one scope.
///
/// Created once by the resolver and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    pub schema_name: String,
    /// Sanitized declaration name.
    pub model_name: String,
    pub scope: Scope,
    /// Directly nested Named Schemas (not the closure).
    pub dependencies: Vec<String>,
    pub schema: SchemaNode,
}

/// Both compiled artifacts of one [`ModelEntry`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledModel {
    pub schema_name: String,
    pub model_name: String,
    pub scope: Scope,
    pub dependencies: Vec<String>,
    /// The expanded type of the schema itself.
    pub declaration: TypeExpr,
    pub validator: ValidatorExpr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

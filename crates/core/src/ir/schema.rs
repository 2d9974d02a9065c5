//! Schema IR: the tagged union every compiler backend folds over.
//!
//! A [`SchemaNode`] with `name` set is a *Named Schema* definition. Inline
//! occurrences of a named schema are [`SchemaKind::Ref`] handles into the
//! [`SchemaGraph`], which is how recursive schema graphs are represented.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// A single schema in the IR.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaNode {
    /// Set on Named Schema definitions; identity of the named type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// User-facing title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Free-form documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `deprecated: true` was declared.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    /// `nullable: true` (or `null` in a type array handled by the loader).
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    /// Keywords present on this node that no backend can express.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unsupported: Vec<String>,
    /// Shape of the schema.
    pub kind: SchemaKind,
}

/// Shape of a schema after keyword precedence has been applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SchemaKind {
    /// `true` accepts everything, `false` accepts nothing.
    Bool {
        /// The boolean schema value.
        value: bool,
    },
    /// Occurrence of a Named Schema.
    Ref {
        /// Name of the referenced definition.
        name: String,
    },
    /// String, number, integer, boolean or null.
    Scalar(ScalarSchema),
    /// Lists and tuples.
    Array(ArraySchema),
    /// Objects with properties and/or additional properties.
    Object(ObjectSchema),
    /// `oneOf`, `anyOf` or `allOf` with sibling keywords already merged into
    /// every branch.
    Composition(Composition),
    /// Exactly one value.
    Const {
        /// The constant.
        value: Value,
    },
    /// One of the listed values.
    Enum {
        /// Allowed values, in declaration order.
        values: Vec<Value>,
    },
}

/// Primitive JSON type of a scalar schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl ScalarType {
    /// Parse a JSON Schema `type` keyword value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "null" => Some(Self::Null),
            _ => None,
        }
    }
}

/// Scalar type plus the string/numeric constraints that apply to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarSchema {
    #[serde(rename = "type")]
    pub ty: ScalarType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
}

impl ScalarSchema {
    /// Unconstrained scalar of the given type.
    pub fn new(ty: ScalarType) -> Self {
        Self {
            ty,
            format: None,
            min_length: None,
            max_length: None,
            pattern: None,
            minimum: None,
            maximum: None,
            exclusive_minimum: None,
            exclusive_maximum: None,
            multiple_of: None,
        }
    }

    /// Whether any numeric bound is declared.
    pub fn has_range(&self) -> bool {
        self.minimum.is_some()
            || self.maximum.is_some()
            || self.exclusive_minimum.is_some()
            || self.exclusive_maximum.is_some()
    }
}

/// Array schema: a homogeneous list, or a tuple when `prefix_items` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArraySchema {
    /// Item schema; `true` when `items` was absent, `false` closes a tuple.
    pub items: Box<SchemaNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_items: Option<Vec<SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unique_items: bool,
}

/// Object schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSchema {
    /// Declared properties in document order.
    pub properties: IndexMap<String, SchemaNode>,
    /// Names listed under `required`.
    pub required: Vec<String>,
    /// `true` when `additionalProperties` was absent.
    pub additional_properties: Box<SchemaNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,
}

impl ObjectSchema {
    /// Whether `name` is listed under `required`.
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Whether unknown keys are rejected.
    pub fn is_closed(&self) -> bool {
        self.additional_properties.is_false()
    }
}

/// Composition operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CompositionOp {
    OneOf,
    AnyOf,
    AllOf,
}

impl CompositionOp {
    /// Keyword spelling.
    pub fn keyword(self) -> &'static str {
        match self {
            CompositionOp::OneOf => "oneOf",
            CompositionOp::AnyOf => "anyOf",
            CompositionOp::AllOf => "allOf",
        }
    }
}

/// A composition and its (already merged) branches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Composition {
    pub op: CompositionOp,
    pub branches: Vec<SchemaNode>,
}

impl SchemaNode {
    /// Anonymous node of the given shape.
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            name: None,
            title: None,
            description: None,
            deprecated: false,
            nullable: false,
            unsupported: Vec::new(),
            kind,
        }
    }

    /// The `true` schema.
    pub fn any() -> Self {
        Self::new(SchemaKind::Bool { value: true })
    }

    /// The `false` schema.
    pub fn never() -> Self {
        Self::new(SchemaKind::Bool { value: false })
    }

    /// Occurrence of the named schema `name`.
    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(SchemaKind::Ref { name: name.into() })
    }

    /// Unconstrained scalar.
    pub fn scalar(ty: ScalarType) -> Self {
        Self::new(SchemaKind::Scalar(ScalarSchema::new(ty)))
    }

    /// Plain `{"type": "string"}`.
    pub fn string() -> Self {
        Self::scalar(ScalarType::String)
    }

    /// List of `items`.
    pub fn array(items: SchemaNode) -> Self {
        Self::new(SchemaKind::Array(ArraySchema {
            items: Box::new(items),
            prefix_items: None,
            min_items: None,
            max_items: None,
            unique_items: false,
        }))
    }

    /// Object with the given properties, open to additional keys.
    pub fn object<I, S>(properties: I, required: &[&str]) -> Self
    where
        I: IntoIterator<Item = (S, SchemaNode)>,
        S: Into<String>,
    {
        Self::new(SchemaKind::Object(ObjectSchema {
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
            required: required.iter().map(|r| (*r).to_string()).collect(),
            additional_properties: Box::new(Self::any()),
            min_properties: None,
            max_properties: None,
        }))
    }

    /// `const` schema.
    pub fn constant(value: Value) -> Self {
        Self::new(SchemaKind::Const { value })
    }

    /// `enum` schema.
    pub fn one_of_values(values: Vec<Value>) -> Self {
        Self::new(SchemaKind::Enum { values })
    }

    /// Composition over `branches`.
    pub fn composition(op: CompositionOp, branches: Vec<SchemaNode>) -> Self {
        Self::new(SchemaKind::Composition(Composition { op, branches }))
    }

    /// Mark this node as the definition of `name`.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the `nullable` flag.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Set the title.
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Close an object schema (`additionalProperties: false`). No-op for
    /// other shapes.
    pub fn closed(mut self) -> Self {
        if let SchemaKind::Object(obj) = &mut self.kind {
            obj.additional_properties = Box::new(Self::never());
        }
        self
    }

    /// Whether this is the `false` schema.
    pub fn is_false(&self) -> bool {
        matches!(self.kind, SchemaKind::Bool { value: false }) && !self.nullable
    }

    /// The name this node stands for, whether it is a definition or a
    /// reference to one.
    pub fn named_target(&self) -> Option<&str> {
        match (&self.name, &self.kind) {
            (Some(name), _) => Some(name),
            (None, SchemaKind::Ref { name }) => Some(name),
            _ => None,
        }
    }

    /// User-facing name: title first, then the schema name.
    pub fn display_name(&self) -> Option<&str> {
        self.title.as_deref().or(self.name.as_deref())
    }

    /// Immediate child schemas, in a stable order.
    pub fn children(&self) -> Vec<&SchemaNode> {
        match &self.kind {
            SchemaKind::Bool { .. }
            | SchemaKind::Ref { .. }
            | SchemaKind::Scalar(_)
            | SchemaKind::Const { .. }
            | SchemaKind::Enum { .. } => Vec::new(),
            SchemaKind::Array(arr) => {
                let mut out: Vec<&SchemaNode> =
                    arr.prefix_items.iter().flatten().collect();
                out.push(&arr.items);
                out
            }
            SchemaKind::Object(obj) => {
                let mut out: Vec<&SchemaNode> = obj.properties.values().collect();
                out.push(&obj.additional_properties);
                out
            }
            SchemaKind::Composition(comp) => comp.branches.iter().collect(),
        }
    }

    /// Named schemas referenced by this node, expanding exactly this node.
    ///
    /// Descends through anonymous children and stops at every named child,
    /// recording it. Names appear once, in first-seen order.
    pub fn direct_references(&self) -> Vec<String> {
        let mut seen = Vec::new();
        let mut stack: Vec<&SchemaNode> = self.children().into_iter().rev().collect();
        if let SchemaKind::Ref { name } = &self.kind {
            seen.push(name.clone());
        }
        while let Some(node) = stack.pop() {
            if let Some(name) = node.named_target() {
                if !seen.iter().any(|s| s == name) {
                    seen.push(name.to_string());
                }
                continue;
            }
            stack.extend(node.children().into_iter().rev());
        }
        seen
    }
}

/// Ordered registry of Named Schema definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SchemaGraph {
    definitions: IndexMap<String, SchemaNode>,
}

impl SchemaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` as the definition of `name`, overwriting its `name`.
    pub fn insert(&mut self, name: impl Into<String>, node: SchemaNode) {
        let name = name.into();
        let node = node.named(name.clone());
        self.definitions.insert(name, node);
    }

    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Definition names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.definitions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_references_stop_at_named_children() {
        let group = SchemaNode::object(
            [
                ("name", SchemaNode::string()),
                ("owner", SchemaNode::reference("User")),
                ("children", SchemaNode::array(SchemaNode::reference("Group"))),
                (
                    "tags",
                    SchemaNode::array(SchemaNode::object(
                        [("tag", SchemaNode::reference("Tag"))],
                        &[],
                    )),
                ),
                ("again", SchemaNode::reference("User")),
            ],
            &["name"],
        )
        .named("Group");

        assert_eq!(group.direct_references(), vec!["User", "Group", "Tag"]);
    }

    #[test]
    fn reference_node_reports_itself() {
        assert_eq!(SchemaNode::reference("Pet").direct_references(), vec!["Pet"]);
    }

    #[test]
    fn graph_insert_names_definition() {
        let mut graph = SchemaGraph::new();
        graph.insert("Pet", SchemaNode::string());
        assert_eq!(graph.get("Pet").and_then(|n| n.name.as_deref()), Some("Pet"));
        assert!(graph.contains("Pet"));
        assert_eq!(graph.names().collect::<Vec<_>>(), vec!["Pet"]);
    }
}

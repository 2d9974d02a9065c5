//! OpenAPI document structs for serde deserialization.
//!
//! This module defines the subset of OpenAPI 3.0/3.1 the compiler consumes.
//! Maps are `IndexMap`s so document order survives deserialization.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::CompileError;

/// Root OpenAPI document.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenApiSpec {
    /// `openapi` version string, informational only.
    pub openapi: Option<String>,
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    pub components: Option<Components>,
}

/// `components`; only `schemas` is read.
#[derive(Debug, Clone, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub schemas: IndexMap<String, Schema>,
}

/// Operations under one URL template, keyed by method.
#[derive(Debug, Clone, Deserialize)]
pub struct PathItem {
    pub get: Option<Operation>,
    pub put: Option<Operation>,
    pub post: Option<Operation>,
    pub delete: Option<Operation>,
    pub options: Option<Operation>,
    pub head: Option<Operation>,
    pub patch: Option<Operation>,
    pub trace: Option<Operation>,
    /// Inherited by every operation unless overridden by (name, location).
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// One method on a path.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    #[serde(default)]
    pub responses: IndexMap<String, Response>,
}

/// A parameter (path, query, header or cookie).
#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    #[serde(default)]
    pub required: bool,
    pub style: Option<String>,
    pub explode: Option<bool>,
    pub schema: Option<Schema>,
    /// Alternative to `schema`; the first media type's schema is used.
    pub content: Option<IndexMap<String, MediaType>>,
    pub description: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
}

/// `requestBody` object.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub required: bool,
    pub description: Option<String>,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// One entry of an operation's `responses` map.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    pub description: Option<String>,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// Body schema for one media type.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaType {
    pub schema: Option<Schema>,
}

/// A JSON Schema: either a boolean or a keyword object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Schema {
    Bool(bool),
    Object(Box<SchemaObject>),
}

/// JSON Schema keyword object used in OpenAPI.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaObject {
    /// `$ref`; only `#/components/schemas/<Name>` is accepted by the loader.
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,

    pub title: Option<String>,
    pub description: Option<String>,
    pub deprecated: Option<bool>,
    /// 3.0 `nullable`. 3.1 documents put `"null"` in the type array.
    pub nullable: Option<bool>,

    /// The type of the schema (string, number, integer, boolean, object, array, null).
    #[serde(rename = "type")]
    pub schema_type: Option<SchemaType>,
    /// Format hint (e.g., date-time, uuid, binary).
    pub format: Option<String>,

    /// `const`.
    #[serde(rename = "const")]
    pub const_value: Option<Value>,
    /// Enum values.
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<Value>>,

    #[serde(rename = "oneOf")]
    pub one_of: Option<Vec<Schema>>,
    #[serde(rename = "anyOf")]
    pub any_of: Option<Vec<Schema>>,
    #[serde(rename = "allOf")]
    pub all_of: Option<Vec<Schema>>,

    // --- Objects ---
    pub properties: Option<IndexMap<String, Schema>>,
    pub required: Option<Vec<String>>,
    pub additional_properties: Option<Schema>,
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,

    // --- Arrays ---
    pub items: Option<Schema>,
    pub prefix_items: Option<Vec<Schema>>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: Option<bool>,

    // --- Strings ---
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,

    // --- Numbers ---
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<ExclusiveBound>,
    pub exclusive_maximum: Option<ExclusiveBound>,
    pub multiple_of: Option<f64>,

    // --- Keywords with no mapping; captured so they can be rejected ---
    pub not: Option<Value>,
    pub pattern_properties: Option<Value>,
    pub contains: Option<Value>,
    pub min_contains: Option<Value>,
    pub max_contains: Option<Value>,
}

/// `type` as a string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

/// `exclusiveMinimum`/`exclusiveMaximum`: a flag in OpenAPI 3.0, a number in 3.1.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ExclusiveBound {
    Flag(bool),
    Value(f64),
}

impl OpenApiSpec {
    /// Parse an OpenAPI document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, CompileError> {
        serde_json::from_str(json)
            .map_err(|e| CompileError::Document(format!("failed to parse OpenAPI document: {e}")))
    }
}

impl SchemaObject {
    /// Keywords present on this object that no backend supports.
    pub fn unsupported_keywords(&self) -> Vec<String> {
        [
            ("not", self.not.is_some()),
            ("patternProperties", self.pattern_properties.is_some()),
            ("contains", self.contains.is_some()),
            ("minContains", self.min_contains.is_some()),
            ("maxContains", self.max_contains.is_some()),
        ]
        .into_iter()
        .filter(|(_, present)| *present)
        .map(|(keyword, _)| keyword.to_string())
        .collect()
    }

    /// Whether the declared type list includes `null`.
    pub fn type_includes_null(&self) -> bool {
        match &self.schema_type {
            Some(SchemaType::Single(t)) => t == "null",
            Some(SchemaType::Multiple(types)) => types.iter().any(|t| t == "null"),
            None => false,
        }
    }

    /// Declared types, in order.
    pub fn types(&self) -> Vec<&str> {
        match &self.schema_type {
            Some(SchemaType::Single(t)) => vec![t.as_str()],
            Some(SchemaType::Multiple(types)) => types.iter().map(String::as_str).collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_boolean_and_object_schemas() {
        let json = r##"{
            "openapi": "3.1.0",
            "paths": {},
            "components": {
                "schemas": {
                    "Anything": true,
                    "Nothing": false,
                    "Pet": {
                        "type": ["object", "null"],
                        "properties": { "id": { "type": "integer", "exclusiveMinimum": 0 } },
                        "not": { "type": "string" }
                    }
                }
            }
        }"##;
        let spec = OpenApiSpec::from_json(json).unwrap();
        let schemas = &spec.components.unwrap().schemas;
        let names: Vec<_> = schemas.keys().cloned().collect();
        assert_eq!(names, vec!["Anything", "Nothing", "Pet"]);
        assert!(matches!(schemas["Anything"], Schema::Bool(true)));

        let Schema::Object(pet) = &schemas["Pet"] else {
            panic!("expected object schema");
        };
        assert!(pet.type_includes_null());
        assert_eq!(pet.types(), vec!["object", "null"]);
        assert_eq!(pet.unsupported_keywords(), vec!["not"]);
        let Some(Schema::Object(id)) = pet.properties.as_ref().unwrap().get("id") else {
            panic!("expected id property");
        };
        assert!(matches!(id.exclusive_minimum, Some(ExclusiveBound::Value(v)) if v == 0.0));
    }

    #[test]
    fn test_invalid_document_is_a_document_error() {
        let err = OpenApiSpec::from_json("{ not json").unwrap_err();
        assert!(matches!(err, CompileError::Document(_)));
    }
}

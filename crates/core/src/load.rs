//! Lowering from the serde document model to the schema and operation IR.
//!
//! This module handles all the OpenAPI-specific logic:
//! - Schema keyword precedence and sibling-keyword merging
//! - Local `$ref` to Named Schema handles
//! - Parameter merging and operation naming

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::CompileError;
use crate::ir::{
    ArraySchema, Composition, CompositionOp, HttpMethod, ObjectSchema, OperationDef,
    ParamLocation, ParameterDef, RequestBodyDef, ResponseDef, ScalarSchema, ScalarType,
    SchemaGraph, SchemaKind, SchemaNode,
};
use crate::spec::{
    ExclusiveBound, OpenApiSpec, Operation, Parameter, PathItem, Schema, SchemaObject, SchemaType,
};
use crate::utils::{sanitize_ts_identifier, to_camel_case};

const COMPONENT_PREFIX: &str = "#/components/schemas/";

/// Schema graph and operations of one document.
#[derive(Debug, Clone, Default)]
pub struct LoadedDocument {
    pub graph: SchemaGraph,
    /// Operations in document order.
    pub operations: Vec<OperationDef>,
}

/// Lower a parsed document into IR.
pub fn load(spec: &OpenApiSpec) -> Result<LoadedDocument, CompileError> {
    let mut graph = SchemaGraph::new();
    if let Some(components) = &spec.components {
        for (name, schema) in &components.schemas {
            graph.insert(name.clone(), lower_schema(schema)?);
        }
    }

    let mut operations = Vec::new();
    let mut operation_names = HashSet::new();
    for (path, item) in &spec.paths {
        for (method, op) in path_operations(item) {
            let def = lower_operation(path, method, op, &item.parameters)?;
            if !operation_names.insert(def.name.clone()) {
                return Err(CompileError::Document(format!(
                    "duplicate operation name '{}' ({} {path}); each operation must have a unique identifier",
                    def.name,
                    method.as_str()
                )));
            }
            operations.push(def);
        }
    }

    debug!(
        schemas = graph.len(),
        operations = operations.len(),
        "document lowered"
    );
    Ok(LoadedDocument { graph, operations })
}

fn path_operations(item: &PathItem) -> impl Iterator<Item = (HttpMethod, &Operation)> {
    [
        (HttpMethod::Get, item.get.as_ref()),
        (HttpMethod::Put, item.put.as_ref()),
        (HttpMethod::Post, item.post.as_ref()),
        (HttpMethod::Delete, item.delete.as_ref()),
        (HttpMethod::Options, item.options.as_ref()),
        (HttpMethod::Head, item.head.as_ref()),
        (HttpMethod::Patch, item.patch.as_ref()),
        (HttpMethod::Trace, item.trace.as_ref()),
    ]
    .into_iter()
    .filter_map(|(method, op)| op.map(|op| (method, op)))
}

/// Lower one schema.
///
/// Shape keywords are resolved with a single precedence:
/// `oneOf` > `anyOf` > `allOf` > `type` array > `const` > `enum` > `type` >
/// inferred (`properties`-like ⇒ object, `items`-like ⇒ array) > unknown.
pub fn lower_schema(schema: &Schema) -> Result<SchemaNode, CompileError> {
    match schema {
        Schema::Bool(value) => Ok(SchemaNode::new(SchemaKind::Bool { value: *value })),
        Schema::Object(obj) => lower_object(obj),
    }
}

fn lower_object(obj: &SchemaObject) -> Result<SchemaNode, CompileError> {
    let mut node = SchemaNode::new(lower_kind(obj)?);
    let has_concrete_type = obj.types().iter().any(|t| *t != "null");
    node.title.clone_from(&obj.title);
    node.description.clone_from(&obj.description);
    node.deprecated = obj.deprecated.unwrap_or(false);
    node.nullable = obj.nullable == Some(true) || (obj.type_includes_null() && has_concrete_type);
    node.unsupported = obj.unsupported_keywords();
    Ok(node)
}

fn lower_kind(obj: &SchemaObject) -> Result<SchemaKind, CompileError> {
    if let Some(reference) = &obj.ref_path {
        return Ok(SchemaKind::Ref {
            name: component_name(reference)?,
        });
    }

    for (op, branches) in [
        (CompositionOp::OneOf, &obj.one_of),
        (CompositionOp::AnyOf, &obj.any_of),
        (CompositionOp::AllOf, &obj.all_of),
    ] {
        if let Some(branches) = branches {
            let mut base = obj.siblings();
            base.clear_composition(op);
            let branches = branches
                .iter()
                .map(|b| lower_branch(&base, b))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(SchemaKind::Composition(Composition { op, branches }));
        }
    }

    let types = obj.types();
    let concrete: Vec<&str> = types.iter().copied().filter(|t| *t != "null").collect();
    if concrete.len() > 1 {
        let branches = concrete
            .iter()
            .map(|t| {
                let mut member = obj.siblings();
                member.schema_type = Some(SchemaType::Single((*t).to_string()));
                lower_object(&member)
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(SchemaKind::Composition(Composition {
            op: CompositionOp::AnyOf,
            branches,
        }));
    }

    if let Some(value) = &obj.const_value {
        return Ok(SchemaKind::Const {
            value: value.clone(),
        });
    }
    if let Some(values) = &obj.enum_values {
        return Ok(SchemaKind::Enum {
            values: values.clone(),
        });
    }

    match concrete.first() {
        Some(&"object") => lower_object_shape(obj),
        Some(&"array") => lower_array_shape(obj),
        Some(other) => Ok(match ScalarType::parse(other) {
            Some(ty) => SchemaKind::Scalar(lower_scalar(ty, obj)),
            None => SchemaKind::Bool { value: true },
        }),
        None if !types.is_empty() => Ok(SchemaKind::Scalar(ScalarSchema::new(ScalarType::Null))),
        None if obj.looks_like_object() => lower_object_shape(obj),
        None if obj.looks_like_array() => lower_array_shape(obj),
        None => Ok(SchemaKind::Bool { value: true }),
    }
}

/// Branches keep their own keywords and inherit the parent's shape keywords
/// they don't declare. A `$ref` branch stays a reference.
fn lower_branch(base: &SchemaObject, branch: &Schema) -> Result<SchemaNode, CompileError> {
    match branch {
        Schema::Bool(true) if !base.is_shapeless() => lower_object(base),
        Schema::Bool(_) => lower_schema(branch),
        Schema::Object(b) if b.ref_path.is_some() => lower_object(b),
        Schema::Object(b) => lower_object(&base.overlay(b)),
    }
}

fn lower_scalar(ty: ScalarType, obj: &SchemaObject) -> ScalarSchema {
    let mut scalar = ScalarSchema::new(ty);
    scalar.format.clone_from(&obj.format);
    scalar.min_length = obj.min_length;
    scalar.max_length = obj.max_length;
    scalar.pattern.clone_from(&obj.pattern);
    scalar.minimum = obj.minimum;
    scalar.maximum = obj.maximum;
    scalar.multiple_of = obj.multiple_of;
    match obj.exclusive_minimum {
        Some(ExclusiveBound::Value(v)) => scalar.exclusive_minimum = Some(v),
        Some(ExclusiveBound::Flag(true)) => scalar.exclusive_minimum = scalar.minimum.take(),
        Some(ExclusiveBound::Flag(false)) | None => {}
    }
    match obj.exclusive_maximum {
        Some(ExclusiveBound::Value(v)) => scalar.exclusive_maximum = Some(v),
        Some(ExclusiveBound::Flag(true)) => scalar.exclusive_maximum = scalar.maximum.take(),
        Some(ExclusiveBound::Flag(false)) | None => {}
    }
    scalar
}

fn lower_array_shape(obj: &SchemaObject) -> Result<SchemaKind, CompileError> {
    let items = match &obj.items {
        Some(items) => lower_schema(items)?,
        None => SchemaNode::any(),
    };
    let prefix_items = obj
        .prefix_items
        .as_ref()
        .map(|prefix| prefix.iter().map(lower_schema).collect::<Result<Vec<_>, _>>())
        .transpose()?;
    Ok(SchemaKind::Array(ArraySchema {
        items: Box::new(items),
        prefix_items,
        min_items: obj.min_items,
        max_items: obj.max_items,
        unique_items: obj.unique_items.unwrap_or(false),
    }))
}

fn lower_object_shape(obj: &SchemaObject) -> Result<SchemaKind, CompileError> {
    let properties = match &obj.properties {
        Some(props) => props
            .iter()
            .map(|(name, schema)| Ok((name.clone(), lower_schema(schema)?)))
            .collect::<Result<IndexMap<_, _>, CompileError>>()?,
        None => IndexMap::new(),
    };
    let additional_properties = match &obj.additional_properties {
        Some(schema) => lower_schema(schema)?,
        None => SchemaNode::any(),
    };
    Ok(SchemaKind::Object(ObjectSchema {
        properties,
        required: obj.required.clone().unwrap_or_default(),
        additional_properties: Box::new(additional_properties),
        min_properties: obj.min_properties,
        max_properties: obj.max_properties,
    }))
}

/// Schema name of a local component reference.
fn component_name(reference: &str) -> Result<String, CompileError> {
    reference
        .strip_prefix(COMPONENT_PREFIX)
        .filter(|name| !name.is_empty() && !name.contains('/'))
        .map(|name| name.replace("~1", "/").replace("~0", "~"))
        .ok_or_else(|| {
            CompileError::Document(format!(
                "unsupported reference '{reference}': only {COMPONENT_PREFIX}<Name> is resolved"
            ))
        })
}

impl SchemaObject {
    /// Shape keywords only: metadata and rejected keywords are stripped.
    fn siblings(&self) -> SchemaObject {
        SchemaObject {
            ref_path: None,
            title: None,
            description: None,
            deprecated: None,
            nullable: None,
            not: None,
            pattern_properties: None,
            contains: None,
            min_contains: None,
            max_contains: None,
            ..self.clone()
        }
    }

    fn clear_composition(&mut self, op: CompositionOp) {
        match op {
            CompositionOp::OneOf => self.one_of = None,
            CompositionOp::AnyOf => self.any_of = None,
            CompositionOp::AllOf => self.all_of = None,
        }
    }

    fn is_shapeless(&self) -> bool {
        *self == SchemaObject::default()
    }

    fn looks_like_object(&self) -> bool {
        self.properties.is_some()
            || self.additional_properties.is_some()
            || self.required.is_some()
            || self.min_properties.is_some()
            || self.max_properties.is_some()
    }

    fn looks_like_array(&self) -> bool {
        self.items.is_some()
            || self.prefix_items.is_some()
            || self.min_items.is_some()
            || self.max_items.is_some()
            || self.unique_items.is_some()
    }

    /// `top` with every keyword it leaves unset taken from `self`.
    /// `properties` and `required` are unioned, `top` winning on conflicts.
    fn overlay(&self, top: &SchemaObject) -> SchemaObject {
        fn fill<T: Clone>(slot: &mut Option<T>, base: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(base);
            }
        }

        let mut merged = top.clone();
        fill(&mut merged.schema_type, &self.schema_type);
        fill(&mut merged.format, &self.format);
        fill(&mut merged.const_value, &self.const_value);
        fill(&mut merged.enum_values, &self.enum_values);
        fill(&mut merged.one_of, &self.one_of);
        fill(&mut merged.any_of, &self.any_of);
        fill(&mut merged.all_of, &self.all_of);
        fill(&mut merged.additional_properties, &self.additional_properties);
        fill(&mut merged.min_properties, &self.min_properties);
        fill(&mut merged.max_properties, &self.max_properties);
        fill(&mut merged.items, &self.items);
        fill(&mut merged.prefix_items, &self.prefix_items);
        fill(&mut merged.min_items, &self.min_items);
        fill(&mut merged.max_items, &self.max_items);
        fill(&mut merged.unique_items, &self.unique_items);
        fill(&mut merged.min_length, &self.min_length);
        fill(&mut merged.max_length, &self.max_length);
        fill(&mut merged.pattern, &self.pattern);
        fill(&mut merged.minimum, &self.minimum);
        fill(&mut merged.maximum, &self.maximum);
        fill(&mut merged.exclusive_minimum, &self.exclusive_minimum);
        fill(&mut merged.exclusive_maximum, &self.exclusive_maximum);
        fill(&mut merged.multiple_of, &self.multiple_of);

        if let (Some(base), Some(top)) = (&self.properties, &top.properties) {
            let mut properties = base.clone();
            for (name, schema) in top {
                properties.insert(name.clone(), schema.clone());
            }
            merged.properties = Some(properties);
        } else {
            fill(&mut merged.properties, &self.properties);
        }

        if let (Some(base), Some(top)) = (&self.required, &top.required) {
            let mut required = base.clone();
            for name in top {
                if !required.contains(name) {
                    required.push(name.clone());
                }
            }
            merged.required = Some(required);
        } else {
            fill(&mut merged.required, &self.required);
        }

        merged
    }
}

fn lower_operation(
    path: &str,
    method: HttpMethod,
    op: &Operation,
    path_params: &[Parameter],
) -> Result<OperationDef, CompileError> {
    let mut def = OperationDef::new(operation_name(path, method, op), method, path);
    def.operation_id.clone_from(&op.operation_id);
    def.tags.clone_from(&op.tags);
    def.summary.clone_from(&op.summary);
    def.description.clone_from(&op.description);
    def.deprecated = op.deprecated;
    def.parameters = lower_parameters(path, method, &op.parameters, path_params)?;

    if let Some(body) = &op.request_body {
        let content = body
            .content
            .iter()
            .map(|(media_type, media)| {
                let schema = match &media.schema {
                    Some(schema) => lower_schema(schema)?,
                    None => SchemaNode::any(),
                };
                Ok((media_type.clone(), schema))
            })
            .collect::<Result<IndexMap<_, _>, CompileError>>()?;
        if !content.is_empty() {
            def.request_body = Some(RequestBodyDef {
                required: body.required,
                description: body.description.clone(),
                content,
            });
        }
    }

    for (status, response) in &op.responses {
        let content = response
            .content
            .iter()
            .map(|(media_type, media)| {
                Ok((media_type.clone(), media.schema.as_ref().map(lower_schema).transpose()?))
            })
            .collect::<Result<IndexMap<_, _>, CompileError>>()?;
        def.responses.push(ResponseDef {
            status: status.clone(),
            description: response.description.clone(),
            content,
        });
    }

    Ok(def)
}

/// Sanitized `operationId`, else `<method>_<static path segments>` camel-cased.
fn operation_name(path: &str, method: HttpMethod, op: &Operation) -> String {
    if let Some(id) = &op.operation_id {
        return sanitize_ts_identifier(id);
    }

    let path_parts: Vec<_> = path
        .split('/')
        .filter(|s| !s.is_empty() && !s.starts_with('{'))
        .collect();

    let base = path_parts.join("_");
    sanitize_ts_identifier(&to_camel_case(&format!(
        "{}_{}",
        method.as_str().to_lowercase(),
        base
    )))
}

/// Path-level parameters first; operation-level parameters with the same
/// (name, location) replace them.
fn lower_parameters(
    path: &str,
    method: HttpMethod,
    op_params: &[Parameter],
    path_params: &[Parameter],
) -> Result<Vec<ParameterDef>, CompileError> {
    check_duplicate_params(path_params, "path-level", path, method)?;
    check_duplicate_params(op_params, "operation-level", path, method)?;

    let mut params: Vec<ParameterDef> = Vec::new();
    for p in path_params {
        params.push(lower_parameter(p)?);
    }
    for p in op_params {
        let param = lower_parameter(p)?;
        params.retain(|existing| {
            !(existing.name == param.name && existing.location == param.location)
        });
        params.push(param);
    }
    Ok(params)
}

fn check_duplicate_params(
    params: &[Parameter],
    level: &str,
    path: &str,
    method: HttpMethod,
) -> Result<(), CompileError> {
    let mut seen = HashSet::new();
    for p in params {
        if !seen.insert((&p.name, &p.location)) {
            return Err(CompileError::Document(format!(
                "duplicate {} parameter '{}' in {level} parameters of {} {path}",
                p.location,
                p.name,
                method.as_str()
            )));
        }
    }
    Ok(())
}

fn lower_parameter(p: &Parameter) -> Result<ParameterDef, CompileError> {
    let location = ParamLocation::parse(&p.location).ok_or_else(|| {
        CompileError::Document(format!(
            "unknown location '{}' for parameter '{}'",
            p.location, p.name
        ))
    })?;

    let schema = match (&p.schema, &p.content) {
        (Some(schema), _) => lower_schema(schema)?,
        (None, Some(content)) => match content.values().find_map(|m| m.schema.as_ref()) {
            Some(schema) => lower_schema(schema)?,
            None => SchemaNode::string(),
        },
        (None, None) => SchemaNode::string(),
    };

    let mut param = ParameterDef::new(p.name.clone(), location, schema);
    param.required = p.required;
    param.style.clone_from(&p.style);
    param.explode = p.explode;
    param.description.clone_from(&p.description);
    param.deprecated = p.deprecated;
    Ok(param)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn lower_json(json: &str) -> SchemaNode {
        let schema: Schema = serde_json::from_str(json).unwrap();
        lower_schema(&schema).unwrap()
    }

    #[test]
    fn test_composition_precedence_and_sibling_merge() {
        let node = lower_json(
            r##"{
                "type": "object",
                "properties": { "kind": { "type": "string" } },
                "required": ["kind"],
                "anyOf": [{ "type": "string" }],
                "oneOf": [
                    { "properties": { "a": { "type": "integer" } }, "required": ["a"] },
                    { "$ref": "#/components/schemas/Other" }
                ]
            }"##,
        );
        let SchemaKind::Composition(comp) = &node.kind else {
            panic!("expected composition, got {:?}", node.kind);
        };
        assert_eq!(comp.op, CompositionOp::OneOf);
        assert_eq!(comp.branches[1], SchemaNode::reference("Other"));

        // First branch inherits the lower-precedence anyOf, then merges.
        let SchemaKind::Composition(inner) = &comp.branches[0].kind else {
            panic!("expected nested anyOf");
        };
        assert_eq!(inner.op, CompositionOp::AnyOf);
        let SchemaKind::Scalar(scalar) = &inner.branches[0].kind else {
            panic!("branch type wins over parent type");
        };
        assert_eq!(scalar.ty, ScalarType::String);
    }

    #[test]
    fn test_branch_properties_are_unioned() {
        let node = lower_json(
            r##"{
                "type": "object",
                "properties": { "kind": { "type": "string" } },
                "required": ["kind"],
                "oneOf": [
                    { "properties": { "a": { "type": "integer" } }, "required": ["a"] }
                ]
            }"##,
        );
        let SchemaKind::Composition(comp) = &node.kind else {
            panic!("expected composition");
        };
        let SchemaKind::Object(obj) = &comp.branches[0].kind else {
            panic!("expected object branch");
        };
        assert_eq!(obj.properties.keys().collect::<Vec<_>>(), vec!["kind", "a"]);
        assert_eq!(obj.required, vec!["kind", "a"]);
    }

    #[test]
    fn test_type_array_becomes_nullable_any_of() {
        let node = lower_json(r##"{ "type": ["string", "integer", "null"], "minimum": 1 }"##);
        assert!(node.nullable);
        let SchemaKind::Composition(comp) = &node.kind else {
            panic!("expected anyOf");
        };
        assert_eq!(comp.op, CompositionOp::AnyOf);
        assert_eq!(comp.branches.len(), 2);
        let SchemaKind::Scalar(int) = &comp.branches[1].kind else {
            panic!("expected integer branch");
        };
        assert_eq!(int.minimum, Some(1.0));

        let single = lower_json(r##"{ "type": ["string", "null"] }"##);
        assert!(single.nullable);
        assert!(matches!(single.kind, SchemaKind::Scalar(ref s) if s.ty == ScalarType::String));

        let null = lower_json(r##"{ "type": "null" }"##);
        assert!(!null.nullable);
        assert!(matches!(null.kind, SchemaKind::Scalar(ref s) if s.ty == ScalarType::Null));
    }

    #[test]
    fn test_exclusive_bounds_both_dialects() {
        let v30 = lower_json(r##"{ "type": "number", "minimum": 0, "exclusiveMinimum": true }"##);
        let SchemaKind::Scalar(s) = v30.kind else {
            panic!("expected scalar");
        };
        assert_eq!(s.minimum, None);
        assert_eq!(s.exclusive_minimum, Some(0.0));

        let v31 = lower_json(r##"{ "type": "number", "exclusiveMaximum": 10 }"##);
        let SchemaKind::Scalar(s) = v31.kind else {
            panic!("expected scalar");
        };
        assert_eq!(s.exclusive_maximum, Some(10.0));
    }

    #[test]
    fn test_inferred_shapes_and_unknown() {
        assert!(matches!(
            lower_json(r##"{ "properties": {} }"##).kind,
            SchemaKind::Object(_)
        ));
        assert!(matches!(
            lower_json(r##"{ "items": { "type": "string" } }"##).kind,
            SchemaKind::Array(_)
        ));
        assert_eq!(lower_json("{}").kind, SchemaKind::Bool { value: true });
        assert_eq!(
            lower_json(r##"{ "const": 3, "enum": [1, 2] }"##).kind,
            SchemaKind::Const { value: serde_json::json!(3) }
        );
    }

    #[test]
    fn test_unsupported_keywords_are_recorded() {
        let node = lower_json(r##"{ "type": "array", "contains": { "type": "string" } }"##);
        assert_eq!(node.unsupported, vec!["contains"]);
    }

    #[test]
    fn test_foreign_reference_is_a_document_error() {
        let schema: Schema =
            serde_json::from_str(r##"{ "$ref": "https://example.com/pet.json" }"##).unwrap();
        assert!(matches!(
            lower_schema(&schema),
            Err(CompileError::Document(_))
        ));
    }

    #[test]
    fn test_operations_parameters_and_names() {
        let json = r##"{
            "paths": {
                "/pets/{petId}/owners": {
                    "parameters": [
                        { "name": "petId", "in": "path", "required": true, "schema": { "type": "string" } },
                        { "name": "limit", "in": "query", "schema": { "type": "integer" } }
                    ],
                    "get": {
                        "tags": ["pets"],
                        "parameters": [
                            { "name": "limit", "in": "query", "required": true, "schema": { "type": "string" } }
                        ],
                        "responses": { "204": { "description": "none" } }
                    }
                }
            }
        }"##;
        let spec = OpenApiSpec::from_json(json).unwrap();
        let doc = load(&spec).unwrap();
        let op = &doc.operations[0];
        assert_eq!(op.name, "getPetsOwners");
        assert_eq!(op.primary_tag(), Some("pets"));
        assert_eq!(op.parameters.len(), 2);
        assert_eq!(op.parameters[1].name, "limit");
        assert!(op.parameters[1].required);
        assert_eq!(op.responses[0].status, "204");
        assert!(op.responses[0].content.is_empty());
    }

    #[test]
    fn test_duplicate_operation_ids_fail() {
        let json = r##"{
            "paths": {
                "/a": { "get": { "operationId": "same", "responses": {} } },
                "/b": { "get": { "operationId": "same", "responses": {} } }
            }
        }"##;
        let spec = OpenApiSpec::from_json(json).unwrap();
        let err = load(&spec).unwrap_err();
        assert!(err.to_string().contains("duplicate operation name 'same'"));
    }
}

//! Operation contract synthesis.
//!
//! Turns one [`OperationDef`] into an [`OperationContract`] plus the schema
//! names the contract refers to. Nothing is accumulated behind the caller's
//! back: every helper returns its own import set and the caller merges.

use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;
use tracing::warn;

use crate::config::GeneratorConfig;
use crate::dispatch::{MediaValidators, compile_response_dispatch};
use crate::error::{CompileError, Unsupported};
use crate::ir::{
    BodyVariant, Literal, MediaCoercion, OperationContract, OperationDef, ParamLocation,
    ParameterContract, ParameterDef, ParameterGroups, ParameterStyle, ParameterValue,
    PipelineStep, Primitive, Property, RequestBodyContract, RequestBodyDef, RequiredImports,
    ResponseContentType, ResponseContract, ResponseStatus, ResponseVariant, SchemaKind,
    SchemaNode, Scope, Serialization, TypeExpr, ValidatorExpr,
};
use crate::resolve::ModelIndex;
use crate::simplify::simplify_union;
use crate::typegen::compile_type;
use crate::utils::{
    body_content_type, essence, field_identifier, is_json_media_type, media_type_argument,
    sanitize_ts_identifier, unique_name,
};
use crate::validator::compile_validator;

/// Argument selecting the variant of a multi-media-type request body.
const DISCRIMINATOR: &str = "contentType";
const WILDCARD: &str = "*/*";

/// Synthesize the call contract of `op`.
///
/// Returns the contract and the Named Schemas it refers to; every one of them
/// is registered in `index`.
pub fn synthesize(
    op: &OperationDef,
    index: &ModelIndex,
    config: &GeneratorConfig,
) -> Result<(OperationContract, RequiredImports), CompileError> {
    let mut imports = RequiredImports::new();

    let mut taken = HashSet::new();
    let mut parameters = ParameterGroups::default();
    for param in &op.parameters {
        let (contract, used) = synthesize_parameter(op, param, index, &mut taken)?;
        imports.extend(used);
        if let Some(group) = parameters.group_mut(param.location) {
            group.push(contract);
        }
    }

    let request_body = match op.request_body.as_ref().filter(|b| !b.content.is_empty()) {
        Some(body) => {
            let (contract, used) = synthesize_body(body, index)?;
            imports.extend(used);
            Some(contract)
        }
        None => None,
    };

    let (response, pipeline, used) = synthesize_responses(op, index, config)?;
    imports.extend(used);

    let contract = OperationContract {
        name: op.name.clone(),
        method: op.method,
        path: op.path.clone(),
        scope: Scope::for_tag(op.primary_tag()),
        summary: op.summary.clone(),
        description: op.description.clone(),
        deprecated: op.deprecated,
        parameters,
        request_body,
        response,
        pipeline,
    };
    Ok((contract, imports))
}

/// Type, validator and imports of one schema occurrence.
struct Occurrence {
    ty: TypeExpr,
    validator: ValidatorExpr,
    imports: RequiredImports,
}

fn compile_occurrence(schema: &SchemaNode, index: &ModelIndex) -> Result<Occurrence, CompileError> {
    let ty = compile_type(schema, false);
    let validator = compile_validator(schema, index)?;
    let mut imports = RequiredImports::new();
    for name in ty.references().into_iter().chain(validator.lazy_references()) {
        index.entry(name)?;
        imports.insert(name.to_string());
    }
    Ok(Occurrence {
        ty,
        validator,
        imports,
    })
}

fn synthesize_parameter(
    op: &OperationDef,
    param: &ParameterDef,
    index: &ModelIndex,
    taken: &mut HashSet<String>,
) -> Result<(ParameterContract, RequiredImports), CompileError> {
    let parameter = param.name.clone();
    let method = op.method.as_str().to_string();
    let path = op.path.clone();

    match param.location {
        ParamLocation::Cookie => {
            return Err(Unsupported::CookieParameter {
                parameter,
                method,
                path,
            }
            .into());
        }
        ParamLocation::Path if !param.required => {
            return Err(Unsupported::OptionalPathParameter {
                parameter,
                method,
                path,
            }
            .into());
        }
        _ => {}
    }

    let (style, default_explode) = ParameterStyle::default_for(param.location);
    if let Some(declared) = param.style.as_deref()
        && ParameterStyle::parse(declared) != Some(style)
    {
        return Err(Unsupported::ParameterStyle {
            style: declared.to_string(),
            location: param.location.as_str().to_string(),
            parameter,
            method,
            path,
        }
        .into());
    }
    let explode = param.explode.unwrap_or(default_explode);
    let serialization = (explode != default_explode).then_some(Serialization { style, explode });

    let Occurrence {
        ty,
        validator,
        imports,
    } = compile_occurrence(&param.schema, index)?;
    let value = match &param.schema.kind {
        SchemaKind::Const { value } => ParameterValue::Fixed {
            value: value.clone(),
        },
        _ => ParameterValue::Argument,
    };

    let contract = ParameterContract {
        argument: unique_name(&sanitize_ts_identifier(&param.name), taken),
        name: parameter,
        location: param.location,
        required: param.required,
        ty,
        validator,
        serialization,
        doc: param
            .description
            .clone()
            .or_else(|| param.schema.description.clone()),
        value,
    };
    Ok((contract, imports))
}

fn synthesize_body(
    body: &RequestBodyDef,
    index: &ModelIndex,
) -> Result<(RequestBodyContract, RequiredImports), CompileError> {
    if body.content.len() == 1
        && let Some((media_type, schema)) = body.content.first()
    {
        let occurrence = compile_occurrence(schema, index)?;
        let contract = RequestBodyContract::Single {
            argument: "body".to_string(),
            media_type: media_type.clone(),
            required: body.required,
            encoding: body_content_type(media_type),
            ty: occurrence.ty,
            validator: occurrence.validator,
        };
        return Ok((contract, occurrence.imports));
    }

    let default_media_type = body
        .content
        .keys()
        .find(|m| is_json_media_type(m))
        .cloned();
    let mut taken = HashSet::from([DISCRIMINATOR.to_string()]);
    let mut imports = RequiredImports::new();
    let mut variants = Vec::with_capacity(body.content.len());
    let mut members = Vec::with_capacity(body.content.len());

    for (media_type, schema) in &body.content {
        let occurrence = compile_occurrence(schema, index)?;
        imports.extend(occurrence.imports);
        let argument = unique_name(&media_type_argument(media_type), &mut taken);
        members.push(TypeExpr::object(vec![
            Property {
                name: DISCRIMINATOR.to_string(),
                ty: TypeExpr::string_literal(media_type.as_str()),
                optional: default_media_type.as_ref() == Some(media_type),
                doc: None,
            },
            Property::required(argument.clone(), occurrence.ty.clone()),
        ]));
        variants.push(BodyVariant {
            media_type: media_type.clone(),
            argument,
            encoding: body_content_type(media_type),
            ty: occurrence.ty,
            validator: occurrence.validator,
        });
    }

    let contract = RequestBodyContract::Variants {
        discriminator: DISCRIMINATOR.to_string(),
        default_media_type,
        required: body.required,
        variants,
        ty: simplify_union(members),
    };
    Ok((contract, imports))
}

/// Determine response content type from media type string
fn detect_response_content_type(media_type: &str) -> ResponseContentType {
    let media_type = essence(media_type);
    if media_type == "application/json" || media_type.ends_with("+json") {
        ResponseContentType::Json
    } else if media_type.starts_with("text/")
        || media_type == "application/xml"
        || media_type.ends_with("+xml")
    {
        ResponseContentType::Text
    } else if media_type == "application/octet-stream"
        || media_type.starts_with("image/")
        || media_type.starts_with("audio/")
        || media_type.starts_with("video/")
        || media_type == "application/pdf"
    {
        ResponseContentType::Blob
    } else {
        ResponseContentType::Unknown
    }
}

fn synthesize_responses(
    op: &OperationDef,
    index: &ModelIndex,
    config: &GeneratorConfig,
) -> Result<(ResponseContract, Vec<PipelineStep>, RequiredImports), CompileError> {
    let mut imports = RequiredImports::new();
    let mut variants = Vec::new();
    let mut dispatch: IndexMap<ResponseStatus, MediaValidators> = IndexMap::new();

    for response in &op.responses {
        let status = ResponseStatus::parse(&response.status).ok_or_else(|| {
            CompileError::Document(format!(
                "invalid response status '{}' in {} {}",
                response.status,
                op.method.as_str(),
                op.path
            ))
        })?;
        let media = dispatch.entry(status).or_default();

        if response.content.is_empty() {
            if status.is_success() && status != ResponseStatus::Code(204) {
                warn!(
                    operation = %op.name,
                    status = %status,
                    "success response declares no content"
                );
            }
            variants.push(ResponseVariant {
                status,
                media_type: None,
                success: status.is_success(),
                ty: TypeExpr::void(),
                validator: None,
                representation: ResponseContentType::Unknown,
            });
            continue;
        }

        for (media_type, schema) in &response.content {
            let representation = detect_response_content_type(media_type);
            let (ty, validator) = match (representation, schema) {
                _ if status == ResponseStatus::Code(204) => (TypeExpr::void(), None),
                (ResponseContentType::Json, Some(schema)) => {
                    let occurrence = compile_occurrence(schema, index)?;
                    imports.extend(occurrence.imports);
                    (occurrence.ty, Some(occurrence.validator))
                }
                (ResponseContentType::Json | ResponseContentType::Unknown, _) => {
                    (TypeExpr::unknown(), None)
                }
                (ResponseContentType::Text, _) => (TypeExpr::string(), None),
                (ResponseContentType::Blob, _) => (TypeExpr::primitive(Primitive::Binary), None),
            };
            media.insert(media_type.clone(), validator.clone());
            variants.push(ResponseVariant {
                status,
                media_type: Some(media_type.clone()),
                success: status.is_success(),
                ty,
                validator,
                representation,
            });
        }
    }

    // Without any 2xx response, `default` is what a successful call returns.
    if !variants.iter().any(|v| v.success) {
        for variant in &mut variants {
            variant.success = variant.status == ResponseStatus::Default;
        }
    }

    let errors: Vec<TypeExpr> = variants
        .iter()
        .filter(|v| !v.success)
        .map(|v| v.ty.clone())
        .collect();
    let error = if errors.is_empty() {
        TypeExpr::unknown()
    } else {
        simplify_union(errors)
    };

    if variants.is_empty() {
        let contract = ResponseContract {
            variants,
            envelope: TypeExpr::void(),
            result: TypeExpr::void(),
            error,
            validator: None,
        };
        return Ok((contract, Vec::new(), imports));
    }

    let success: Vec<&ResponseVariant> = variants.iter().filter(|v| v.success).collect();
    let envelope = simplify_union(success.iter().map(|v| envelope_member(v)).collect());
    let validator = config
        .validate_responses
        .then(|| compile_response_dispatch(&dispatch));
    let validate = validator.as_ref().map(|_| PipelineStep::Validate);

    let (result, pipeline) = if success.iter().all(|v| v.ty == TypeExpr::void()) {
        let steps = validate.into_iter().chain([PipelineStep::DiscardBody]).collect();
        (TypeExpr::void(), steps)
    } else {
        let mut steps = vec![PipelineStep::Coerce {
            media: coercions(&variants),
        }];
        steps.extend(validate);
        let result = match created_shortcut(&success, op, index, config) {
            Some((result, field)) => {
                steps.push(PipelineStep::CreatedShortcut { field });
                result
            }
            None => simplify_union(success.iter().map(|v| v.ty.clone()).collect()),
        };
        steps.push(PipelineStep::ExtractBody);
        (result, steps)
    };

    let contract = ResponseContract {
        variants,
        envelope,
        result,
        error,
        validator,
    };
    Ok((contract, pipeline, imports))
}

/// `{ status; mediaType; body }` for one success variant.
fn envelope_member(variant: &ResponseVariant) -> TypeExpr {
    let status = match variant.status {
        ResponseStatus::Code(code) => TypeExpr::literal(Literal::Int(i64::from(code))),
        ResponseStatus::Class(_) | ResponseStatus::Default => TypeExpr::number(),
    };
    let media_type = match variant.media_type.as_deref() {
        Some(WILDCARD) => TypeExpr::string(),
        Some(media_type) => TypeExpr::string_literal(media_type),
        None => TypeExpr::null(),
    };
    TypeExpr::object(vec![
        Property::required("status", status),
        Property::required("mediaType", media_type),
        Property::required("body", variant.ty.clone()),
    ])
}

/// One representation per distinct media type, first declaration wins.
fn coercions(variants: &[ResponseVariant]) -> Vec<MediaCoercion> {
    let mut media: Vec<MediaCoercion> = Vec::new();
    for variant in variants {
        if let Some(media_type) = &variant.media_type
            && !media.iter().any(|m| m.media_type == *media_type)
        {
            media.push(MediaCoercion {
                media_type: media_type.clone(),
                representation: variant.representation,
            });
        }
    }
    media
}

/// `{ created: true; <field>: B201 } | { created: false; <field>: B200 }`
/// when the success statuses are exactly 200 and 201.
fn created_shortcut(
    success: &[&ResponseVariant],
    op: &OperationDef,
    index: &ModelIndex,
    config: &GeneratorConfig,
) -> Option<(TypeExpr, String)> {
    if !config.created_shortcut {
        return None;
    }
    let has = |code: u16| success.iter().any(|v| v.status == ResponseStatus::Code(code));
    let only_pair = success
        .iter()
        .all(|v| matches!(v.status, ResponseStatus::Code(200 | 201)));
    if !only_pair || !has(200) || !has(201) {
        return None;
    }

    let body = |code: u16| {
        simplify_union(
            success
                .iter()
                .filter(|v| v.status == ResponseStatus::Code(code))
                .map(|v| v.ty.clone())
                .collect(),
        )
    };
    let field = shortcut_field(op, index);
    let member = |created: bool, body: TypeExpr| {
        TypeExpr::object(vec![
            Property::required("created", TypeExpr::bool_literal(created)),
            Property::required(field.clone(), body),
        ])
    };
    let result = TypeExpr::Union {
        members: vec![member(true, body(201)), member(false, body(200))],
    };
    Some((result, field))
}

/// camelCased user-facing name shared by the 200 and 201 bodies, else `body`.
fn shortcut_field(op: &OperationDef, index: &ModelIndex) -> String {
    const FALLBACK: &str = "body";
    let mut names = BTreeSet::new();
    for code in [200, 201] {
        let schemas: Vec<&SchemaNode> = op
            .responses
            .iter()
            .filter(|r| ResponseStatus::parse(&r.status) == Some(ResponseStatus::Code(code)))
            .flat_map(|r| r.content.values().flatten())
            .collect();
        if schemas.is_empty() {
            return FALLBACK.to_string();
        }
        for schema in schemas {
            match index.display_name(schema) {
                Some(name) => names.insert(name),
                None => return FALLBACK.to_string(),
            };
        }
    }

    match names.into_iter().collect::<Vec<_>>().as_slice() {
        [name] => {
            let field = field_identifier(name);
            if field == "created" {
                FALLBACK.to_string()
            } else {
                field
            }
        }
        _ => FALLBACK.to_string(),
    }
}

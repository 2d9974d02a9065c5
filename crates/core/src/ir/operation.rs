//! Operation definitions as handed over by the document loader.

use indexmap::IndexMap;
use serde::Serialize;

use super::schema::SchemaNode;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
        }
    }
}

/// Parameter location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParamLocation {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "path" => Some(ParamLocation::Path),
            "query" => Some(ParamLocation::Query),
            "header" => Some(ParamLocation::Header),
            "cookie" => Some(ParamLocation::Cookie),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Header => "header",
            ParamLocation::Cookie => "cookie",
        }
    }
}

/// A parameter declared on an operation (path-item parameters already merged).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDef {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    /// Declared `style`, verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explode: Option<bool>,
    pub schema: SchemaNode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub deprecated: bool,
}

/// Request body with one schema per media type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestBodyDef {
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Media type to schema, in document order.
    pub content: IndexMap<String, SchemaNode>,
}

/// A response keyed by its status (`"200"`, `"2XX"`, `"default"`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseDef {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Media type to optional body schema, in document order.
    pub content: IndexMap<String, Option<SchemaNode>>,
}

/// One HTTP operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDef {
    /// Sanitized identifier (from `operationId` or method + path).
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    pub method: HttpMethod,
    /// URL path template, e.g. `/pets/{petId}`.
    pub path: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub deprecated: bool,
    pub parameters: Vec<ParameterDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBodyDef>,
    pub responses: Vec<ResponseDef>,
}

impl OperationDef {
    /// Minimal operation, handy for building inputs by hand.
    pub fn new(name: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operation_id: None,
            method,
            path: path.into(),
            tags: Vec::new(),
            summary: None,
            description: None,
            deprecated: false,
            parameters: Vec::new(),
            request_body: None,
            responses: Vec::new(),
        }
    }

    /// The tag that owns this operation, if any.
    pub fn primary_tag(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }

    /// Every schema this operation mentions: parameters, request bodies and
    /// responses, in that order.
    pub fn schemas(&self) -> Vec<&SchemaNode> {
        let mut out: Vec<&SchemaNode> = self.parameters.iter().map(|p| &p.schema).collect();
        if let Some(body) = &self.request_body {
            out.extend(body.content.values());
        }
        for response in &self.responses {
            out.extend(response.content.values().flatten());
        }
        out
    }
}

impl ParameterDef {
    pub fn new(name: impl Into<String>, location: ParamLocation, schema: SchemaNode) -> Self {
        Self {
            name: name.into(),
            location,
            required: location == ParamLocation::Path,
            style: None,
            explode: None,
            schema,
            description: None,
            deprecated: false,
        }
    }
}

impl ResponseDef {
    /// Response with a single media type.
    pub fn with_body(
        status: impl Into<String>,
        media_type: impl Into<String>,
        schema: SchemaNode,
    ) -> Self {
        let mut content = IndexMap::new();
        content.insert(media_type.into(), Some(schema));
        Self {
            status: status.into(),
            description: None,
            content,
        }
    }

    /// Response without content.
    pub fn empty(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            description: None,
            content: IndexMap::new(),
        }
    }
}

//! API-level IR for synthesized operation contracts.
//!
//! This module defines what downstream emission consumes per operation:
//! - ParameterGroups: path, query and header parameters
//! - RequestBodyContract: one argument, or a media-type discriminated union
//! - ResponseContract: (status, mediaType) variants plus derived types
//! - PipelineStep: post-processing replayed in order by the emitter

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::model::Scope;
use super::operation::{HttpMethod, ParamLocation};
use super::types::TypeExpr;
use super::validator::ValidatorExpr;

/// Schema names an artifact refers to; merged explicitly by callers.
pub type RequiredImports = BTreeSet<String>;

/// Per-operation call contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationContract {
    pub name: String,
    pub method: HttpMethod,
    pub path: String,
    pub scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub deprecated: bool,
    pub parameters: ParameterGroups,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBodyContract>,
    pub response: ResponseContract,
    /// Post-processing steps, replayed in order.
    pub pipeline: Vec<PipelineStep>,
}

/// Parameters grouped by location. Cookie parameters are rejected upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParameterGroups {
    pub path: Vec<ParameterContract>,
    pub query: Vec<ParameterContract>,
    pub header: Vec<ParameterContract>,
}

impl ParameterGroups {
    /// All parameters, path first.
    pub fn iter(&self) -> impl Iterator<Item = &ParameterContract> {
        self.path.iter().chain(&self.query).chain(&self.header)
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty() && self.query.is_empty() && self.header.is_empty()
    }

    /// Parameters the caller must supply (fixed values excluded).
    pub fn arguments(&self) -> impl Iterator<Item = &ParameterContract> {
        self.iter()
            .filter(|p| matches!(p.value, ParameterValue::Argument))
    }

    pub(crate) fn group_mut(&mut self, location: ParamLocation) -> Option<&mut Vec<ParameterContract>> {
        match location {
            ParamLocation::Path => Some(&mut self.path),
            ParamLocation::Query => Some(&mut self.query),
            ParamLocation::Header => Some(&mut self.header),
            ParamLocation::Cookie => None,
        }
    }
}

/// Single parameter definition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterContract {
    /// Original name from the document (for URL building).
    pub name: String,
    /// TypeScript-safe identifier.
    pub argument: String,
    pub location: ParamLocation,
    pub required: bool,
    pub ty: TypeExpr,
    pub validator: ValidatorExpr,
    /// Present only when the serialization deviates from the location default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialization: Option<Serialization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    pub value: ParameterValue,
}

/// Whether the parameter is supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ParameterValue {
    Argument,
    /// `const` schema: always sent with this value.
    Fixed { value: Value },
}

/// Serialization style of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterStyle {
    Simple,
    Form,
    Matrix,
    Label,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

impl ParameterStyle {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "simple" => Some(Self::Simple),
            "form" => Some(Self::Form),
            "matrix" => Some(Self::Matrix),
            "label" => Some(Self::Label),
            "spaceDelimited" => Some(Self::SpaceDelimited),
            "pipeDelimited" => Some(Self::PipeDelimited),
            "deepObject" => Some(Self::DeepObject),
            _ => None,
        }
    }

    /// Documented default `(style, explode)` for a location.
    pub fn default_for(location: ParamLocation) -> (Self, bool) {
        match location {
            ParamLocation::Path | ParamLocation::Header => (Self::Simple, false),
            ParamLocation::Query | ParamLocation::Cookie => (Self::Form, true),
        }
    }
}

/// Serialization override carried for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Serialization {
    pub style: ParameterStyle,
    pub explode: bool,
}

/// Request body content type determines how to serialize the body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyContentType {
    /// JSON body - use JSON.stringify()
    Json,
    /// multipart/form-data - pass FormData directly
    FormData,
    /// application/x-www-form-urlencoded - use URLSearchParams
    UrlEncoded,
    /// text/* - send as string
    Text,
    /// Anything else - send the binary value as is
    Binary,
}

/// Request body contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RequestBodyContract {
    /// One media type: one argument and a fixed `Content-Type`.
    #[serde(rename_all = "camelCase")]
    Single {
        argument: String,
        media_type: String,
        required: bool,
        encoding: BodyContentType,
        ty: TypeExpr,
        validator: ValidatorExpr,
    },
    /// Several media types: a union discriminated by `discriminator`.
    #[serde(rename_all = "camelCase")]
    Variants {
        /// Name of the media-type argument.
        discriminator: String,
        /// Media type assumed when the discriminator is omitted.
        #[serde(skip_serializing_if = "Option::is_none")]
        default_media_type: Option<String>,
        required: bool,
        variants: Vec<BodyVariant>,
        /// The discriminated union the caller passes.
        ty: TypeExpr,
    },
}

/// One media type of a multi-media-type request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyVariant {
    pub media_type: String,
    pub argument: String,
    pub encoding: BodyContentType,
    pub ty: TypeExpr,
    pub validator: ValidatorExpr,
}

/// Response content type determines how to parse the response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseContentType {
    /// JSON response - use res.json()
    Json,
    /// Plain text response - use res.text()
    Text,
    /// Binary/blob response - use res.blob()
    Blob,
    /// Unknown content type - return Response directly
    Unknown,
}

/// Status key of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ResponseStatus {
    Code(u16),
    /// `2XX` style ranges; the digit is the class.
    Class(u8),
    Default,
}

impl ResponseStatus {
    pub fn parse(value: &str) -> Option<Self> {
        if value == "default" {
            return Some(Self::Default);
        }
        if let Some(class) = value.strip_suffix("XX").or_else(|| value.strip_suffix("xx")) {
            return class
                .parse::<u8>()
                .ok()
                .filter(|c| (1..=5).contains(c))
                .map(Self::Class);
        }
        value
            .parse::<u16>()
            .ok()
            .filter(|c| (100..=599).contains(c))
            .map(Self::Code)
    }

    /// 2xx codes and the `2XX` class.
    pub fn is_success(&self) -> bool {
        match self {
            Self::Code(code) => (200..300).contains(code),
            Self::Class(class) => *class == 2,
            Self::Default => false,
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{code}"),
            Self::Class(class) => write!(f, "{class}XX"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// One (status, mediaType) response shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseVariant {
    pub status: ResponseStatus,
    /// `None` when the response declares no content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub success: bool,
    pub ty: TypeExpr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<ValidatorExpr>,
    pub representation: ResponseContentType,
}

/// Everything known about an operation's responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseContract {
    pub variants: Vec<ResponseVariant>,
    /// Simplified union of `{ status; mediaType; body }` over success variants.
    pub envelope: TypeExpr,
    /// What the caller receives once the pipeline has run.
    pub result: TypeExpr,
    /// Union of non-success bodies.
    pub error: TypeExpr,
    /// Combined dispatch validator, when response validation is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<ValidatorExpr>,
}

/// Post-processing step, as data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum PipelineStep {
    /// Convert the raw body into its representation per media type.
    Coerce { media: Vec<MediaCoercion> },
    /// Run the response dispatch validator.
    Validate,
    /// Collapse a {200, 201} pair into `{ created, <field> }`.
    CreatedShortcut { field: String },
    /// Return the body.
    ExtractBody,
    /// Drop the body and return nothing.
    DiscardBody,
}

/// Representation chosen for one media type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaCoercion {
    pub media_type: String,
    pub representation: ResponseContentType,
}

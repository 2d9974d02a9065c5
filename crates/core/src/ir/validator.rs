//! Runtime-validator algebra.
//!
//! Mirrors the schema shape but targets runtime checking, in the style of a
//! combinator library (`z.object({...}).strict()`): primitives carry the
//! constraints they can express directly; everything else becomes a
//! [`Refinement`] step attached with [`ValidatorExpr::Refined`].

use serde::Serialize;

use super::types::Literal;

/// Validator expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidatorExpr {
    /// Accepts anything.
    Unknown,
    /// Accepts nothing.
    Never,
    String(StringValidator),
    Number(NumberValidator),
    Boolean,
    Null,
    /// Instance of the injectable binary type.
    Binary,
    Literal {
        literal: Literal,
    },
    Union {
        members: Vec<ValidatorExpr>,
    },
    Intersection {
        members: Vec<ValidatorExpr>,
    },
    Array {
        items: Box<ValidatorExpr>,
        #[serde(skip_serializing_if = "Option::is_none")]
        min_items: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_items: Option<u64>,
    },
    Tuple {
        prefix: Vec<ValidatorExpr>,
        #[serde(skip_serializing_if = "Option::is_none")]
        rest: Option<Box<ValidatorExpr>>,
    },
    Object(ObjectValidator),
    /// Deferred reference to the validator of a Named Schema. Construction of
    /// the target is postponed until first use, which breaks cycles.
    LazyRef {
        name: String,
    },
    Nullable {
        inner: Box<ValidatorExpr>,
    },
    /// Base validator followed by custom refinement steps.
    Refined {
        inner: Box<ValidatorExpr>,
        refinements: Vec<Refinement>,
    },
    /// Branch-minimized dispatch over `{status, mediaType, body}`.
    Dispatch(Box<ResponseDispatch>),
}

/// String combinator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StringValidator {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Number combinator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberValidator {
    pub integer: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Bound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Bound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
}

/// Inclusive or exclusive numeric bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bound {
    pub value: f64,
    pub exclusive: bool,
}

impl Bound {
    pub fn inclusive(value: f64) -> Self {
        Self {
            value,
            exclusive: false,
        }
    }

    pub fn exclusive(value: f64) -> Self {
        Self {
            value,
            exclusive: true,
        }
    }
}

/// Object combinator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectValidator {
    pub fields: Vec<FieldValidator>,
    pub unknown_keys: UnknownKeys,
}

/// One declared property of an object validator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldValidator {
    pub name: String,
    pub validator: ValidatorExpr,
    pub optional: bool,
}

/// Treatment of keys that are not declared properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum UnknownKeys {
    /// Reject unknown keys (`additionalProperties: false`).
    Strict,
    /// Validate every unknown key's value.
    Catchall { validator: Box<ValidatorExpr> },
}

/// Custom check the base combinators cannot express. Each produces exactly
/// one issue, with [`Refinement::message`] and an empty path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "check", rename_all = "camelCase")]
pub enum Refinement {
    MinItems { limit: u64 },
    MaxItems { limit: u64 },
    UniqueItems,
    MinProperties { limit: u64 },
    MaxProperties { limit: u64 },
    /// Numeric range checked separately from a `multipleOf` combinator.
    Range {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<Bound>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<Bound>,
    },
}

impl Refinement {
    /// Stable diagnostic message.
    pub fn message(&self) -> String {
        match self {
            Refinement::MinItems { limit } => {
                format!("Array must contain at least {limit} element(s)")
            }
            Refinement::MaxItems { limit } => {
                format!("Array must contain at most {limit} element(s)")
            }
            Refinement::UniqueItems => "Array items must be unique".to_string(),
            Refinement::MinProperties { limit } => {
                format!("Object must have at least {limit} properties")
            }
            Refinement::MaxProperties { limit } => {
                format!("Object must have at most {limit} properties")
            }
            Refinement::Range { min, max } => {
                let lower = match min {
                    Some(b) if b.exclusive => format!("({}", b.value),
                    Some(b) => format!("[{}", b.value),
                    None => "(-inf".to_string(),
                };
                let upper = match max {
                    Some(b) if b.exclusive => format!("{})", b.value),
                    Some(b) => format!("{}]", b.value),
                    None => "inf)".to_string(),
                };
                format!("Number must be within {lower}, {upper}")
            }
        }
    }
}

/// Combined response validator: outer branches on status, inner branches on
/// media type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseDispatch {
    /// Status branches that differ from `fallback`, in declaration order.
    pub branches: Vec<StatusBranch>,
    /// Arm taken when no branch matches.
    pub fallback: DispatchArm,
}

/// Outer branch keyed by status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusBranch {
    pub status: StatusMatch,
    pub arm: DispatchArm,
}

/// How a status branch matches the received status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "match", content = "value", rename_all = "camelCase")]
pub enum StatusMatch {
    /// Literal status equality.
    Exact(u16),
    /// Status class, e.g. `2XX` is `Class(2)`.
    Class(u8),
}

impl StatusMatch {
    pub fn matches(self, status: u16) -> bool {
        match self {
            StatusMatch::Exact(code) => code == status,
            StatusMatch::Class(class) => status / 100 == u16::from(class),
        }
    }
}

/// Statement executed for a status (or as the status fallback).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "arm", rename_all = "camelCase")]
pub enum DispatchArm {
    /// Validate the body.
    Body { validator: ValidatorExpr },
    /// Branch on literal media-type equality.
    Media {
        cases: Vec<MediaCase>,
        fallback: Box<DispatchArm>,
    },
    /// Raise a diagnostic naming the received value of `field`.
    Reject { field: DispatchField },
}

/// Inner branch keyed by media type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaCase {
    pub media_type: String,
    pub validator: ValidatorExpr,
}

/// Envelope field a dispatch can reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DispatchField {
    Status,
    MediaType,
}

impl DispatchField {
    /// Property name in the response envelope.
    pub fn key(self) -> &'static str {
        match self {
            DispatchField::Status => "status",
            DispatchField::MediaType => "mediaType",
        }
    }

    /// Diagnostic for a received value that matched no branch.
    pub fn unexpected(self, received: &str) -> String {
        match self {
            DispatchField::Status => format!("Unexpected response status: {received}"),
            DispatchField::MediaType => format!("Unexpected response media type: {received}"),
        }
    }
}

impl ValidatorExpr {
    pub fn literal(literal: Literal) -> Self {
        ValidatorExpr::Literal { literal }
    }

    pub fn string() -> Self {
        ValidatorExpr::String(StringValidator::default())
    }

    pub fn number() -> Self {
        ValidatorExpr::Number(NumberValidator::default())
    }

    pub fn lazy(name: impl Into<String>) -> Self {
        ValidatorExpr::LazyRef { name: name.into() }
    }

    /// Attach refinements, leaving `self` untouched when there are none.
    pub fn refined(self, refinements: Vec<Refinement>) -> Self {
        if refinements.is_empty() {
            return self;
        }
        match self {
            ValidatorExpr::Refined {
                inner,
                refinements: mut existing,
            } => {
                existing.extend(refinements);
                ValidatorExpr::Refined {
                    inner,
                    refinements: existing,
                }
            }
            other => ValidatorExpr::Refined {
                inner: Box::new(other),
                refinements,
            },
        }
    }

    /// Flattened, deduplicated union; a single member stands alone and no
    /// members accept nothing.
    pub fn union(members: Vec<ValidatorExpr>) -> Self {
        let mut flat = Vec::with_capacity(members.len());
        for m in members {
            match m {
                ValidatorExpr::Union { members } => flat.extend(members),
                other => flat.push(other),
            }
        }
        Self::collapse(flat, ValidatorExpr::Never, |members| ValidatorExpr::Union {
            members,
        })
    }

    /// Flattened, deduplicated intersection; no members accept anything.
    pub fn intersection(members: Vec<ValidatorExpr>) -> Self {
        let mut flat = Vec::with_capacity(members.len());
        for m in members {
            match m {
                ValidatorExpr::Intersection { members } => flat.extend(members),
                ValidatorExpr::Unknown => {}
                other => flat.push(other),
            }
        }
        Self::collapse(flat, ValidatorExpr::Unknown, |members| {
            ValidatorExpr::Intersection { members }
        })
    }

    fn collapse(
        flat: Vec<ValidatorExpr>,
        empty: ValidatorExpr,
        wrap: impl FnOnce(Vec<ValidatorExpr>) -> ValidatorExpr,
    ) -> Self {
        let mut unique: Vec<ValidatorExpr> = Vec::with_capacity(flat.len());
        for m in flat {
            if !unique.contains(&m) {
                unique.push(m);
            }
        }
        match unique.len() {
            0 => empty,
            1 => unique.remove(0),
            _ => wrap(unique),
        }
    }

    /// Object validator with the given fields.
    pub fn object(fields: Vec<FieldValidator>, unknown_keys: UnknownKeys) -> Self {
        ValidatorExpr::Object(ObjectValidator {
            fields,
            unknown_keys,
        })
    }

    /// Names of every lazily referenced schema, in first-seen order.
    pub fn lazy_references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_lazy(&mut out);
        out
    }

    fn collect_lazy<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            ValidatorExpr::LazyRef { name } => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            ValidatorExpr::Union { members } | ValidatorExpr::Intersection { members } => {
                members.iter().for_each(|m| m.collect_lazy(out));
            }
            ValidatorExpr::Array { items, .. } => items.collect_lazy(out),
            ValidatorExpr::Tuple { prefix, rest } => {
                prefix.iter().for_each(|p| p.collect_lazy(out));
                if let Some(r) = rest {
                    r.collect_lazy(out);
                }
            }
            ValidatorExpr::Object(obj) => {
                obj.fields.iter().for_each(|f| f.validator.collect_lazy(out));
                if let UnknownKeys::Catchall { validator } = &obj.unknown_keys {
                    validator.collect_lazy(out);
                }
            }
            ValidatorExpr::Nullable { inner } | ValidatorExpr::Refined { inner, .. } => {
                inner.collect_lazy(out);
            }
            ValidatorExpr::Dispatch(dispatch) => {
                for branch in &dispatch.branches {
                    branch.arm.collect_lazy(out);
                }
                dispatch.fallback.collect_lazy(out);
            }
            ValidatorExpr::Unknown
            | ValidatorExpr::Never
            | ValidatorExpr::String(_)
            | ValidatorExpr::Number(_)
            | ValidatorExpr::Boolean
            | ValidatorExpr::Null
            | ValidatorExpr::Binary
            | ValidatorExpr::Literal { .. } => {}
        }
    }
}

impl DispatchArm {
    fn collect_lazy<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            DispatchArm::Body { validator } => validator.collect_lazy(out),
            DispatchArm::Media { cases, fallback } => {
                cases.iter().for_each(|c| c.validator.collect_lazy(out));
                fallback.collect_lazy(out);
            }
            DispatchArm::Reject { .. } => {}
        }
    }
}

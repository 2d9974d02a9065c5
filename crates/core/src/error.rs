//! Error taxonomy for the compiler core.
//!
//! Every failure is synchronous and aborts compilation of the current
//! document. There is no partial output.

use thiserror::Error;

/// Errors raised while lowering a document, resolving scopes or compiling
/// schemas and operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A schema or parameter construct with no defined mapping.
    #[error("unsupported {0}")]
    Unsupported(#[from] Unsupported),
    /// A named schema reference that is not registered in the model index.
    #[error("unresolved schema reference '{name}'")]
    Resolution {
        /// The missing schema name.
        name: String,
    },
    /// The input document violates a structural precondition.
    #[error("invalid document: {0}")]
    Document(String),
}

/// Constructs the compiler refuses to translate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unsupported {
    /// A JSON Schema keyword the validator backend cannot express.
    #[error("schema keyword '{keyword}'")]
    Keyword {
        /// The offending keyword, e.g. `not`.
        keyword: String,
    },
    /// Cookie parameters are not carried by operation contracts.
    #[error("cookie parameter '{parameter}' in {method} {path}")]
    CookieParameter {
        /// Parameter name.
        parameter: String,
        /// HTTP method of the operation.
        method: String,
        /// URL path template of the operation.
        path: String,
    },
    /// A serialization style that is not allowed for the parameter location.
    #[error("style '{style}' for {location} parameter '{parameter}' in {method} {path}")]
    ParameterStyle {
        /// The declared style.
        style: String,
        /// Parameter location (`path`, `query`, `header`).
        location: String,
        /// Parameter name.
        parameter: String,
        /// HTTP method of the operation.
        method: String,
        /// URL path template of the operation.
        path: String,
    },
    /// Path parameters must be declared `required: true`.
    #[error("optional path parameter '{parameter}' in {method} {path}")]
    OptionalPathParameter {
        /// Parameter name.
        parameter: String,
        /// HTTP method of the operation.
        method: String,
        /// URL path template of the operation.
        path: String,
    },
}

impl CompileError {
    /// Shorthand for a [`CompileError::Resolution`] naming `name`.
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self::Resolution { name: name.into() }
    }

    /// Shorthand for an unsupported schema keyword.
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self::Unsupported(Unsupported::Keyword {
            keyword: keyword.into(),
        })
    }
}

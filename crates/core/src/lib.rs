//! Schema-graph compiler for OpenAPI documents.
//!
//! Turns a parsed OpenAPI 3.x document into two families of artifacts: static
//! type declarations ([`TypeExpr`]) and runtime validators
//! ([`ValidatorExpr`]), plus a call contract per operation
//! ([`OperationContract`]) that ties parameters, request bodies and a
//! status-dispatched response validator together.
//!
//! ## Module Structure
//!
//! - `spec`: serde model of the input document
//! - `load`: lowering into the schema IR
//! - `ir`: intermediate representations shared by every stage
//! - `fold`: the schema fold both backends plug into
//! - `typegen` / `validator`: the two compiler backends
//! - `simplify`: union and intersection normalization
//! - `resolve`: scope assignment and the model index
//! - `dispatch`: status/media response validators
//! - `synthesize`: operation contracts
//! - `pipeline`: end-to-end compilation
//! - `check`: evaluating validators against JSON values
//! - `emit`: TypeScript and zod rendering
//!
//! ```no_run
//! use schemagen_core::{GeneratorConfig, generate};
//!
//! let json = std::fs::read_to_string("openapi.json")?;
//! let api = generate(&json, &GeneratorConfig::default())?;
//! for module in &api.modules {
//!     println!("{}: {} models", module.module_name, module.models.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod check;
pub mod config;
pub mod dispatch;
pub mod emit;
pub mod error;
pub mod fold;
pub mod ir;
pub mod load;
pub mod pipeline;
pub mod resolve;
pub mod simplify;
pub mod spec;
pub mod synthesize;
pub mod typegen;
pub mod utils;
pub mod validator;

pub use check::{CheckError, Issue, PathSegment, ValidatorLookup, check};
pub use config::{ConfigError, GeneratorConfig};
pub use emit::{Emit, EmitContext};
pub use error::{CompileError, Unsupported};
pub use ir::{CompiledModel, OperationContract, Scope, SchemaNode, TypeExpr, ValidatorExpr};
pub use load::{LoadedDocument, load};
pub use pipeline::{CompiledApi, ScopeModule, compile, generate};
pub use resolve::{ModelIndex, resolve};
pub use spec::OpenApiSpec;

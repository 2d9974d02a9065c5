//! Intermediate representations shared by every compiler stage.
//!
//! ## Module Structure
//!
//! - `schema`: Schema IR (SchemaNode, SchemaGraph)
//! - `operation`: operation definitions handed over by the loader
//! - `types`: target type algebra (TypeExpr)
//! - `validator`: runtime-validator algebra (ValidatorExpr)
//! - `model`: ModelEntry and Scope
//! - `contract`: synthesized OperationContract

pub mod contract;
pub mod model;
pub mod operation;
pub mod schema;
pub mod types;
pub mod validator;

pub use contract::{
    BodyContentType, BodyVariant, MediaCoercion, OperationContract, ParameterContract,
    ParameterGroups, ParameterStyle, ParameterValue, PipelineStep, RequestBodyContract,
    RequiredImports, ResponseContentType, ResponseContract, ResponseStatus, ResponseVariant,
    Serialization,
};
pub use model::{CompiledModel, ModelEntry, Scope};
pub use operation::{HttpMethod, OperationDef, ParamLocation, ParameterDef, RequestBodyDef, ResponseDef};
pub use schema::{
    ArraySchema, Composition, CompositionOp, ObjectSchema, ScalarSchema, ScalarType, SchemaGraph,
    SchemaKind, SchemaNode,
};
pub use types::{IndexSignature, Literal, Member, Primitive, Property, TypeExpr};
pub use validator::{
    Bound, DispatchArm, DispatchField, FieldValidator, MediaCase, NumberValidator,
    ObjectValidator, Refinement, ResponseDispatch, StatusBranch, StatusMatch, StringValidator,
    UnknownKeys, ValidatorExpr,
};

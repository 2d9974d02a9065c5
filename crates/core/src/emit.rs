//! Rendering via the Emit trait.
//!
//! Type expressions render as TypeScript type syntax and validator
//! expressions as zod combinator chains. Output is single-line and meant for
//! inspection and summaries; writing modules to disk happens elsewhere.

use std::collections::HashMap;

use crate::config::GeneratorConfig;
use crate::ir::{
    Bound, CompiledModel, DispatchArm, Literal, Member, NumberValidator, OperationContract,
    Primitive, Refinement, ResponseDispatch, StatusMatch, StringValidator, TypeExpr,
    UnknownKeys, ValidatorExpr,
};
use crate::resolve::ModelIndex;
use crate::utils::{escape_js_string, model_identifier, quote_if_needed};

/// Naming and type choices shared by every rendered node.
#[derive(Debug, Clone)]
pub struct EmitContext {
    /// TypeScript type standing in for binary payloads.
    pub binary_type: String,
    /// Schema name to declaration name.
    model_names: HashMap<String, String>,
}

impl Default for EmitContext {
    fn default() -> Self {
        Self {
            binary_type: "Blob".to_string(),
            model_names: HashMap::new(),
        }
    }
}

impl EmitContext {
    /// Context using the model names registered in `index`.
    pub fn new(index: &ModelIndex, config: &GeneratorConfig) -> Self {
        Self {
            binary_type: config.binary_type.clone(),
            model_names: index
                .entries()
                .map(|e| (e.schema_name.clone(), e.model_name.clone()))
                .collect(),
        }
    }

    /// Declaration name of a Named Schema.
    pub fn model_name(&self, schema_name: &str) -> String {
        self.model_names
            .get(schema_name)
            .cloned()
            .unwrap_or_else(|| model_identifier(schema_name))
    }

    /// Name of the validator constant of a Named Schema.
    pub fn schema_const(&self, schema_name: &str) -> String {
        format!("{}Schema", self.model_name(schema_name))
    }
}

/// Trait for emitting TypeScript code from IR nodes.
pub trait Emit {
    fn emit_with(&self, cx: &EmitContext) -> String;

    /// Emit with the default context.
    fn emit(&self) -> String {
        self.emit_with(&EmitContext::default())
    }
}

impl Emit for Literal {
    fn emit_with(&self, _: &EmitContext) -> String {
        match self {
            Literal::String(s) => format!("\"{}\"", escape_js_string(s)),
            Literal::Int(i) => i.to_string(),
            Literal::Number(n) => n.to_string(),
            Literal::Bool(b) => b.to_string(),
            Literal::Null => "null".to_string(),
        }
    }
}

impl Emit for TypeExpr {
    fn emit_with(&self, cx: &EmitContext) -> String {
        match self {
            TypeExpr::Primitive { primitive } => match primitive {
                Primitive::String => "string".to_string(),
                Primitive::Number => "number".to_string(),
                Primitive::Boolean => "boolean".to_string(),
                Primitive::Unknown => "unknown".to_string(),
                Primitive::Never => "never".to_string(),
                Primitive::Void => "void".to_string(),
                Primitive::Binary => cx.binary_type.clone(),
            },
            TypeExpr::Literal { literal } => literal.emit_with(cx),
            TypeExpr::Reference { name } => cx.model_name(name),
            TypeExpr::Union { members } => members
                .iter()
                .map(|t| t.emit_with(cx))
                .collect::<Vec<_>>()
                .join(" | "),
            TypeExpr::Intersection { members } => members
                .iter()
                .map(|t| {
                    let s = t.emit_with(cx);
                    if matches!(t, TypeExpr::Union { .. }) {
                        format!("({s})")
                    } else {
                        s
                    }
                })
                .collect::<Vec<_>>()
                .join(" & "),
            TypeExpr::TypeLiteral { members } => {
                if members.is_empty() {
                    return "{}".to_string();
                }
                let parts: Vec<String> = members
                    .iter()
                    .map(|m| match m {
                        Member::Property(p) => {
                            let opt = if p.optional { "?" } else { "" };
                            format!("{}{opt}: {}", quote_if_needed(&p.name), p.ty.emit_with(cx))
                        }
                        Member::Index(idx) => format!(
                            "[{}: {}]: {}",
                            idx.key_name,
                            idx.key.emit_with(cx),
                            idx.value.emit_with(cx)
                        ),
                    })
                    .collect();
                format!("{{ {} }}", parts.join("; "))
            }
            TypeExpr::Array { items } => {
                let inner = items.emit_with(cx);
                // Wrap complex types in parentheses
                if matches!(
                    **items,
                    TypeExpr::Union { .. } | TypeExpr::Intersection { .. }
                ) {
                    format!("({inner})[]")
                } else {
                    format!("{inner}[]")
                }
            }
            TypeExpr::Tuple { prefix, rest } => {
                let mut parts: Vec<String> = prefix.iter().map(|t| t.emit_with(cx)).collect();
                if let Some(rest) = rest {
                    parts.push(format!("...{}", TypeExpr::array((**rest).clone()).emit_with(cx)));
                }
                format!("[{}]", parts.join(", "))
            }
        }
    }
}

fn bound_checks(min: Option<&Bound>, max: Option<&Bound>) -> String {
    let mut out = String::new();
    if let Some(b) = min {
        let method = if b.exclusive { "gt" } else { "gte" };
        out.push_str(&format!(".{method}({})", b.value));
    }
    if let Some(b) = max {
        let method = if b.exclusive { "lt" } else { "lte" };
        out.push_str(&format!(".{method}({})", b.value));
    }
    out
}

impl Emit for StringValidator {
    fn emit_with(&self, _: &EmitContext) -> String {
        let mut out = "z.string()".to_string();
        match self.format.as_deref() {
            Some("email") => out.push_str(".email()"),
            Some("uuid") => out.push_str(".uuid()"),
            Some("uri" | "url") => out.push_str(".url()"),
            Some("date-time") => out.push_str(".datetime()"),
            _ => {}
        }
        if let Some(n) = self.min_length {
            out.push_str(&format!(".min({n})"));
        }
        if let Some(n) = self.max_length {
            out.push_str(&format!(".max({n})"));
        }
        if let Some(pattern) = &self.pattern {
            out.push_str(&format!(".regex(new RegExp(\"{}\"))", escape_js_string(pattern)));
        }
        out
    }
}

impl Emit for NumberValidator {
    fn emit_with(&self, _: &EmitContext) -> String {
        let mut out = "z.number()".to_string();
        if self.integer {
            out.push_str(".int()");
        }
        out.push_str(&bound_checks(self.min.as_ref(), self.max.as_ref()));
        if let Some(step) = self.multiple_of {
            out.push_str(&format!(".multipleOf({step})"));
        }
        out
    }
}

/// `(v) => <predicate>` for a refinement.
fn refinement_predicate(refinement: &Refinement) -> String {
    match refinement {
        Refinement::MinItems { limit } => format!("(v) => v.length >= {limit}"),
        Refinement::MaxItems { limit } => format!("(v) => v.length <= {limit}"),
        Refinement::UniqueItems => {
            "(v) => new Set(v.map((x) => JSON.stringify(x))).size === v.length".to_string()
        }
        Refinement::MinProperties { limit } => {
            format!("(v) => Object.keys(v).length >= {limit}")
        }
        Refinement::MaxProperties { limit } => {
            format!("(v) => Object.keys(v).length <= {limit}")
        }
        Refinement::Range { min, max } => {
            let mut checks = Vec::new();
            if let Some(b) = min {
                checks.push(format!("v {} {}", if b.exclusive { ">" } else { ">=" }, b.value));
            }
            if let Some(b) = max {
                checks.push(format!("v {} {}", if b.exclusive { "<" } else { "<=" }, b.value));
            }
            if checks.is_empty() {
                "(v) => true".to_string()
            } else {
                format!("(v) => {}", checks.join(" && "))
            }
        }
    }
}

impl Emit for ValidatorExpr {
    fn emit_with(&self, cx: &EmitContext) -> String {
        match self {
            ValidatorExpr::Unknown => "z.unknown()".to_string(),
            ValidatorExpr::Never => "z.never()".to_string(),
            ValidatorExpr::String(string) => string.emit_with(cx),
            ValidatorExpr::Number(number) => number.emit_with(cx),
            ValidatorExpr::Boolean => "z.boolean()".to_string(),
            ValidatorExpr::Null => "z.null()".to_string(),
            ValidatorExpr::Binary => format!("z.instanceof({})", cx.binary_type),
            ValidatorExpr::Literal {
                literal: Literal::Null,
            } => "z.null()".to_string(),
            ValidatorExpr::Literal { literal } => format!("z.literal({})", literal.emit_with(cx)),
            ValidatorExpr::Union { members } => {
                let parts: Vec<String> = members.iter().map(|m| m.emit_with(cx)).collect();
                format!("z.union([{}])", parts.join(", "))
            }
            ValidatorExpr::Intersection { members } => {
                let mut iter = members.iter().map(|m| m.emit_with(cx));
                let first = iter.next().unwrap_or_else(|| "z.unknown()".to_string());
                iter.fold(first, |acc, m| format!("z.intersection({acc}, {m})"))
            }
            ValidatorExpr::Array {
                items,
                min_items,
                max_items,
            } => {
                let mut out = format!("z.array({})", items.emit_with(cx));
                if let Some(n) = min_items {
                    out.push_str(&format!(".min({n})"));
                }
                if let Some(n) = max_items {
                    out.push_str(&format!(".max({n})"));
                }
                out
            }
            ValidatorExpr::Tuple { prefix, rest } => {
                let parts: Vec<String> = prefix.iter().map(|p| p.emit_with(cx)).collect();
                let mut out = format!("z.tuple([{}])", parts.join(", "));
                if let Some(rest) = rest {
                    out.push_str(&format!(".rest({})", rest.emit_with(cx)));
                }
                out
            }
            ValidatorExpr::Object(object) => {
                let fields: Vec<String> = object
                    .fields
                    .iter()
                    .map(|f| {
                        let optional = if f.optional { ".optional()" } else { "" };
                        format!(
                            "{}: {}{optional}",
                            quote_if_needed(&f.name),
                            f.validator.emit_with(cx)
                        )
                    })
                    .collect();
                let shape = if fields.is_empty() {
                    "{}".to_string()
                } else {
                    format!("{{ {} }}", fields.join(", "))
                };
                let keys = match &object.unknown_keys {
                    UnknownKeys::Strict => ".strict()".to_string(),
                    UnknownKeys::Catchall { validator } if **validator == ValidatorExpr::Unknown => {
                        ".passthrough()".to_string()
                    }
                    UnknownKeys::Catchall { validator } => {
                        format!(".catchall({})", validator.emit_with(cx))
                    }
                };
                format!("z.object({shape}){keys}")
            }
            ValidatorExpr::LazyRef { name } => format!("z.lazy(() => {})", cx.schema_const(name)),
            ValidatorExpr::Nullable { inner } => format!("{}.nullable()", inner.emit_with(cx)),
            ValidatorExpr::Refined { inner, refinements } => {
                let mut out = inner.emit_with(cx);
                for refinement in refinements {
                    out.push_str(&format!(
                        ".refine({}, {{ message: \"{}\" }})",
                        refinement_predicate(refinement),
                        escape_js_string(&refinement.message())
                    ));
                }
                out
            }
            ValidatorExpr::Dispatch(dispatch) => dispatch.emit_with(cx),
        }
    }
}

impl Emit for ResponseDispatch {
    fn emit_with(&self, cx: &EmitContext) -> String {
        let mut body = String::new();
        for (i, branch) in self.branches.iter().enumerate() {
            let test = match branch.status {
                StatusMatch::Exact(code) => format!("r.status === {code}"),
                StatusMatch::Class(class) => format!("Math.floor(r.status / 100) === {class}"),
            };
            let keyword = if i == 0 { "if" } else { " else if" };
            body.push_str(&format!("{keyword} ({test}) {{ {} }}", emit_arm(&branch.arm, cx)));
        }
        let fallback = emit_arm(&self.fallback, cx);
        if self.branches.is_empty() {
            body.push_str(&fallback);
        } else {
            body.push_str(&format!(" else {{ {fallback} }}"));
        }
        format!(
            "z.object({{ status: z.number(), mediaType: z.string().nullable(), body: z.unknown() }})\
             .superRefine((r, ctx) => {{ {body} }})"
        )
    }
}

fn emit_arm(arm: &DispatchArm, cx: &EmitContext) -> String {
    match arm {
        DispatchArm::Body { validator } => {
            format!("validateBody({}, r.body, ctx);", validator.emit_with(cx))
        }
        DispatchArm::Media { cases, fallback } => {
            let mut out = String::new();
            for (i, case) in cases.iter().enumerate() {
                let keyword = if i == 0 { "if" } else { " else if" };
                out.push_str(&format!(
                    "{keyword} (r.mediaType === \"{}\") {{ validateBody({}, r.body, ctx); }}",
                    escape_js_string(&case.media_type),
                    case.validator.emit_with(cx)
                ));
            }
            out.push_str(&format!(" else {{ {} }}", emit_arm(fallback, cx)));
            out
        }
        DispatchArm::Reject { field } => format!(
            "ctx.addIssue({{ code: \"custom\", path: [\"{key}\"], message: `{}${{r.{key}}}` }});",
            field.unexpected(""),
            key = field.key()
        ),
    }
}

impl Emit for CompiledModel {
    fn emit_with(&self, cx: &EmitContext) -> String {
        format!(
            "export type {name} = {ty};\nexport const {name}Schema: z.ZodType<{name}> = {validator};\n",
            name = self.model_name,
            ty = self.declaration.emit_with(cx),
            validator = self.validator.emit_with(cx),
        )
    }
}

impl Emit for OperationContract {
    fn emit_with(&self, cx: &EmitContext) -> String {
        let mut args: Vec<String> = self
            .parameters
            .arguments()
            .map(|p| {
                let opt = if p.required { "" } else { "?" };
                format!("{}{opt}: {}", p.argument, p.ty.emit_with(cx))
            })
            .collect();
        if self.request_body.is_some() {
            args.push("body".to_string());
        }
        format!(
            "{}({}): {} {} => {}",
            self.name,
            args.join(", "),
            self.method.as_str(),
            self.path,
            self.response.result.emit_with(cx)
        )
    }
}

//! Target type algebra.
//!
//! `TypeExpr` is the TypeScript-shaped output of the schema type compiler:
//! - Primitive: string, number, boolean, unknown, never, void, binary
//! - Literal: "foo", 42, true, null
//! - Reference: a Named Schema by name
//! - Union / Intersection: always flattened and deduplicated by the simplifier
//! - TypeLiteral: property and index-signature members
//! - Array / Tuple

use serde::Serialize;
use serde_json::Value;

/// TypeScript type representation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypeExpr {
    /// Primitive types
    Primitive { primitive: Primitive },
    /// Literal type: "foo", 42, true, null
    Literal { literal: Literal },
    /// Named schema reference
    Reference { name: String },
    /// Union type: A | B | C
    Union { members: Vec<TypeExpr> },
    /// Intersection type: A & B & C
    Intersection { members: Vec<TypeExpr> },
    /// Object type: { foo: string; bar?: number; [key: string]: unknown }
    TypeLiteral { members: Vec<Member> },
    /// Array type: T[]
    Array { items: Box<TypeExpr> },
    /// Tuple type: [A, B, ...C[]]
    Tuple {
        prefix: Vec<TypeExpr>,
        #[serde(skip_serializing_if = "Option::is_none")]
        rest: Option<Box<TypeExpr>>,
    },
}

/// TypeScript primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Primitive {
    String,
    Number,
    Boolean,
    Unknown,
    Never,
    Void,
    /// The injectable binary type (`Blob` unless configured otherwise).
    Binary,
}

/// TypeScript literal values
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    String(String),
    Int(i64),
    Number(f64),
    Bool(bool),
    Null,
}

impl Literal {
    /// Convert a JSON scalar to a literal. Arrays and objects have no literal
    /// type.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Literal::Null),
            Value::Bool(b) => Some(Literal::Bool(*b)),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => Literal::Int(i),
                None => Literal::Number(n.as_f64().unwrap_or(0.0)),
            }),
            Value::String(s) => Some(Literal::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Back to JSON, used for fixed parameter values.
    pub fn to_json(&self) -> Value {
        match self {
            Literal::String(s) => Value::String(s.clone()),
            Literal::Int(i) => Value::from(*i),
            Literal::Number(n) => Value::from(*n),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Null => Value::Null,
        }
    }
}

/// Member of a type literal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "member", rename_all = "camelCase")]
pub enum Member {
    Property(Property),
    Index(IndexSignature),
}

/// Object property definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub name: String,
    pub ty: TypeExpr,
    pub optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// `[key: K]: V`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSignature {
    /// Name of the key binding, e.g. `key` in `[key: string]`.
    pub key_name: String,
    pub key: TypeExpr,
    pub value: TypeExpr,
}

impl TypeExpr {
    pub fn primitive(primitive: Primitive) -> Self {
        TypeExpr::Primitive { primitive }
    }

    pub fn string() -> Self {
        Self::primitive(Primitive::String)
    }

    pub fn number() -> Self {
        Self::primitive(Primitive::Number)
    }

    pub fn boolean() -> Self {
        Self::primitive(Primitive::Boolean)
    }

    pub fn unknown() -> Self {
        Self::primitive(Primitive::Unknown)
    }

    pub fn never() -> Self {
        Self::primitive(Primitive::Never)
    }

    pub fn void() -> Self {
        Self::primitive(Primitive::Void)
    }

    pub fn literal(literal: Literal) -> Self {
        TypeExpr::Literal { literal }
    }

    /// The `null` type.
    pub fn null() -> Self {
        Self::literal(Literal::Null)
    }

    pub fn string_literal(value: impl Into<String>) -> Self {
        Self::literal(Literal::String(value.into()))
    }

    pub fn bool_literal(value: bool) -> Self {
        Self::literal(Literal::Bool(value))
    }

    pub fn reference(name: impl Into<String>) -> Self {
        TypeExpr::Reference { name: name.into() }
    }

    pub fn array(items: TypeExpr) -> Self {
        TypeExpr::Array {
            items: Box::new(items),
        }
    }

    /// Type literal made only of properties.
    pub fn object(properties: Vec<Property>) -> Self {
        TypeExpr::TypeLiteral {
            members: properties.into_iter().map(Member::Property).collect(),
        }
    }

    /// The empty type literal `{}`.
    pub fn empty_object() -> Self {
        TypeExpr::TypeLiteral {
            members: Vec::new(),
        }
    }

    /// Names of every schema this type refers to, in first-seen order.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TypeExpr::Reference { name } => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            TypeExpr::Union { members } | TypeExpr::Intersection { members } => {
                for m in members {
                    m.collect_references(out);
                }
            }
            TypeExpr::TypeLiteral { members } => {
                for m in members {
                    match m {
                        Member::Property(p) => p.ty.collect_references(out),
                        Member::Index(idx) => {
                            idx.key.collect_references(out);
                            idx.value.collect_references(out);
                        }
                    }
                }
            }
            TypeExpr::Array { items } => items.collect_references(out),
            TypeExpr::Tuple { prefix, rest } => {
                for p in prefix {
                    p.collect_references(out);
                }
                if let Some(r) = rest {
                    r.collect_references(out);
                }
            }
            TypeExpr::Primitive { .. } | TypeExpr::Literal { .. } => {}
        }
    }
}

impl Property {
    pub fn required(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            doc: None,
        }
    }

    pub fn optional(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            optional: true,
            ..Self::required(name, ty)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn literals_from_json() {
        assert_eq!(Literal::from_json(&json!(1)), Some(Literal::Int(1)));
        assert_eq!(Literal::from_json(&json!(1.5)), Some(Literal::Number(1.5)));
        assert_eq!(Literal::from_json(&json!("a")), Some(Literal::String("a".into())));
        assert_eq!(Literal::from_json(&json!(null)), Some(Literal::Null));
        assert_eq!(Literal::from_json(&json!([1])), None);
    }

    #[test]
    fn references_are_collected_once() {
        let ty = TypeExpr::Union {
            members: vec![
                TypeExpr::reference("A"),
                TypeExpr::array(TypeExpr::reference("B")),
                TypeExpr::object(vec![Property::required("a", TypeExpr::reference("A"))]),
            ],
        };
        assert_eq!(ty.references(), vec!["A", "B"]);
    }
}

//! Schema type compiler: [`SchemaNode`] → [`TypeExpr`].

use std::convert::Infallible;

use serde_json::Value;

use crate::fold::{SchemaAlgebra, fold};
use crate::ir::{
    ArraySchema, CompositionOp, IndexSignature, Literal, Member, ObjectSchema, Primitive,
    Property, ScalarSchema, ScalarType, SchemaNode, TypeExpr,
};
use crate::simplify::{simplify_intersection, simplify_union};
use crate::utils::to_camel_case;

/// Compile `schema` into a type expression.
///
/// With `expand` unset a Named Schema becomes [`TypeExpr::Reference`]; set it
/// only for the declaration of the schema itself. This never fails: shapes
/// with no mapping compile to `unknown`.
pub fn compile_type(schema: &SchemaNode, expand: bool) -> TypeExpr {
    let Ok(ty) = fold(&mut TypeCompiler, schema, expand);
    ty
}

/// The type backend as a [`SchemaAlgebra`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeCompiler;

impl SchemaAlgebra for TypeCompiler {
    type Output = TypeExpr;
    type Error = Infallible;

    fn boolean(&mut self, _: &SchemaNode, value: bool) -> Result<TypeExpr, Infallible> {
        Ok(if value {
            TypeExpr::unknown()
        } else {
            TypeExpr::never()
        })
    }

    fn reference(&mut self, name: &str) -> Result<TypeExpr, Infallible> {
        Ok(TypeExpr::reference(name))
    }

    fn scalar(&mut self, _: &SchemaNode, scalar: &ScalarSchema) -> Result<TypeExpr, Infallible> {
        Ok(match scalar.ty {
            ScalarType::String if scalar.format.as_deref() == Some("binary") => {
                TypeExpr::primitive(Primitive::Binary)
            }
            ScalarType::String => TypeExpr::string(),
            ScalarType::Number | ScalarType::Integer => TypeExpr::number(),
            ScalarType::Boolean => TypeExpr::boolean(),
            ScalarType::Null => TypeExpr::null(),
        })
    }

    fn array(
        &mut self,
        _: &SchemaNode,
        array: &ArraySchema,
        prefix: Option<Vec<TypeExpr>>,
        items: TypeExpr,
    ) -> Result<TypeExpr, Infallible> {
        Ok(match prefix {
            Some(prefix) => TypeExpr::Tuple {
                prefix,
                rest: (!array.items.is_false()).then(|| Box::new(items)),
            },
            None => TypeExpr::array(items),
        })
    }

    fn object(
        &mut self,
        _: &SchemaNode,
        object: &ObjectSchema,
        properties: Vec<(String, TypeExpr)>,
        additional: TypeExpr,
    ) -> Result<TypeExpr, Infallible> {
        let fields = properties
            .into_iter()
            .map(|(name, ty)| Property {
                optional: !object.is_required(&name),
                doc: object
                    .properties
                    .get(&name)
                    .and_then(|p| p.description.clone()),
                name,
                ty,
            })
            .collect();

        let mut members = vec![TypeExpr::object(fields)];
        if !object.is_closed() {
            let key_name = object
                .additional_properties
                .title
                .as_deref()
                .map(to_camel_case)
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| "key".to_string());
            members.push(TypeExpr::TypeLiteral {
                members: vec![Member::Index(IndexSignature {
                    key_name,
                    key: TypeExpr::string(),
                    value: additional,
                })],
            });
        }
        Ok(simplify_intersection(members))
    }

    fn composition(
        &mut self,
        _: &SchemaNode,
        op: CompositionOp,
        branches: Vec<TypeExpr>,
    ) -> Result<TypeExpr, Infallible> {
        Ok(match op {
            CompositionOp::OneOf | CompositionOp::AnyOf => simplify_union(branches),
            CompositionOp::AllOf => simplify_intersection(branches),
        })
    }

    fn literals(&mut self, _: &SchemaNode, values: &[Value]) -> Result<TypeExpr, Infallible> {
        Ok(simplify_union(
            values
                .iter()
                .map(|v| Literal::from_json(v).map_or_else(TypeExpr::unknown, TypeExpr::literal))
                .collect(),
        ))
    }

    fn nullable(&mut self, inner: TypeExpr) -> Result<TypeExpr, Infallible> {
        Ok(simplify_union(vec![inner, TypeExpr::null()]))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ir::SchemaKind;
    use serde_json::json;

    fn key_signature(key_name: &str, value: TypeExpr) -> TypeExpr {
        TypeExpr::TypeLiteral {
            members: vec![Member::Index(IndexSignature {
                key_name: key_name.into(),
                key: TypeExpr::string(),
                value,
            })],
        }
    }

    #[test]
    fn test_boolean_schemas() {
        assert_eq!(compile_type(&SchemaNode::any(), true), TypeExpr::unknown());
        assert_eq!(compile_type(&SchemaNode::never(), true), TypeExpr::never());
    }

    #[test]
    fn test_nullable_wraps_before_reference_cut() {
        let node = SchemaNode::reference("Pet").nullable();
        assert_eq!(
            compile_type(&node, false),
            TypeExpr::Union {
                members: vec![TypeExpr::reference("Pet"), TypeExpr::null()]
            }
        );
    }

    #[test]
    fn test_recursive_group_stays_a_reference() {
        let group = SchemaNode::object(
            [
                ("name", SchemaNode::string()),
                ("children", SchemaNode::array(SchemaNode::reference("Group"))),
            ],
            &["name"],
        )
        .named("Group")
        .closed();

        assert_eq!(compile_type(&group, false), TypeExpr::reference("Group"));
        assert_eq!(
            compile_type(&group, true),
            TypeExpr::object(vec![
                Property::required("name", TypeExpr::string()),
                Property::optional("children", TypeExpr::array(TypeExpr::reference("Group"))),
            ])
        );
    }

    #[test]
    fn test_scalars_and_binary() {
        let mut binary = ScalarSchema::new(ScalarType::String);
        binary.format = Some("binary".into());
        assert_eq!(
            compile_type(&SchemaNode::new(SchemaKind::Scalar(binary)), true),
            TypeExpr::primitive(Primitive::Binary)
        );
        assert_eq!(
            compile_type(&SchemaNode::scalar(ScalarType::Integer), true),
            TypeExpr::number()
        );
        assert_eq!(
            compile_type(&SchemaNode::scalar(ScalarType::Null), true),
            TypeExpr::null()
        );
    }

    #[test]
    fn test_enum_and_const() {
        assert_eq!(
            compile_type(&SchemaNode::one_of_values(vec![json!(true), json!(false)]), true),
            TypeExpr::boolean()
        );
        assert_eq!(
            compile_type(&SchemaNode::constant(json!("cat")), true),
            TypeExpr::string_literal("cat")
        );
    }

    #[test]
    fn test_tuples() {
        let mut tuple = SchemaNode::array(SchemaNode::never());
        if let SchemaKind::Array(arr) = &mut tuple.kind {
            arr.prefix_items = Some(vec![SchemaNode::string(), SchemaNode::scalar(ScalarType::Number)]);
        }
        assert_eq!(
            compile_type(&tuple, true),
            TypeExpr::Tuple {
                prefix: vec![TypeExpr::string(), TypeExpr::number()],
                rest: None,
            }
        );

        if let SchemaKind::Array(arr) = &mut tuple.kind {
            arr.items = Box::new(SchemaNode::string());
        }
        assert_eq!(
            compile_type(&tuple, true),
            TypeExpr::Tuple {
                prefix: vec![TypeExpr::string(), TypeExpr::number()],
                rest: Some(Box::new(TypeExpr::string())),
            }
        );
    }

    #[test]
    fn test_open_objects_get_index_signatures() {
        let open = SchemaNode::object([("id", SchemaNode::string())], &["id"]);
        assert_eq!(
            compile_type(&open, true),
            TypeExpr::Intersection {
                members: vec![
                    TypeExpr::object(vec![Property::required("id", TypeExpr::string())]),
                    key_signature("key", TypeExpr::unknown()),
                ]
            }
        );

        let mut map = SchemaNode::object(Vec::<(String, SchemaNode)>::new(), &[]);
        if let SchemaKind::Object(obj) = &mut map.kind {
            obj.additional_properties = Box::new(SchemaNode::string().titled("Locale Code"));
        }
        assert_eq!(
            compile_type(&map, true),
            key_signature("localeCode", TypeExpr::string())
        );

        let closed = SchemaNode::object(Vec::<(String, SchemaNode)>::new(), &[]).closed();
        assert_eq!(compile_type(&closed, true), TypeExpr::empty_object());
    }

    #[test]
    fn test_all_of_merges_literals() {
        let node = SchemaNode::composition(
            CompositionOp::AllOf,
            vec![
                SchemaNode::object([("a", SchemaNode::string())], &["a"]).closed(),
                SchemaNode::object([("b", SchemaNode::string())], &[]).closed(),
            ],
        );
        assert_eq!(
            compile_type(&node, true),
            TypeExpr::object(vec![
                Property::required("a", TypeExpr::string()),
                Property::optional("b", TypeExpr::string()),
            ])
        );
    }

    #[test]
    fn test_single_branch_composition_degenerates() {
        let node = SchemaNode::composition(CompositionOp::OneOf, vec![SchemaNode::reference("Pet")]);
        assert_eq!(compile_type(&node, true), TypeExpr::reference("Pet"));
    }
}

//! Validator compiler: [`SchemaNode`] → [`ValidatorExpr`].
//!
//! Same traversal as the type compiler (both are [`fold`] instances), but
//! named occurrences are handed to a [`RefResolver`], which yields
//! [`ValidatorExpr::LazyRef`] so cyclic schemas never expand eagerly.

use serde_json::Value;

use crate::error::CompileError;
use crate::fold::{SchemaAlgebra, fold};
use crate::ir::{
    ArraySchema, Bound, CompositionOp, FieldValidator, Literal, NumberValidator, ObjectSchema,
    Refinement, ScalarSchema, ScalarType, SchemaNode, StringValidator, UnknownKeys, ValidatorExpr,
};

/// Supplies the validator for an occurrence of a Named Schema.
pub trait RefResolver {
    fn resolve(&self, name: &str) -> Result<ValidatorExpr, CompileError>;
}

/// Resolves every name to a lazy reference without checking that it exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct LazyResolver;

impl RefResolver for LazyResolver {
    fn resolve(&self, name: &str) -> Result<ValidatorExpr, CompileError> {
        Ok(ValidatorExpr::lazy(name))
    }
}

/// Compile `schema` into a validator, expanding the root.
///
/// Fails on `not`, `patternProperties`, `contains`, `minContains` and
/// `maxContains`, and on references `resolver` cannot resolve.
pub fn compile_validator(
    schema: &SchemaNode,
    resolver: &dyn RefResolver,
) -> Result<ValidatorExpr, CompileError> {
    fold(&mut ValidatorCompiler::new(resolver), schema, true)
}

/// The validator backend as a [`SchemaAlgebra`].
pub struct ValidatorCompiler<'a> {
    resolver: &'a dyn RefResolver,
}

impl<'a> ValidatorCompiler<'a> {
    pub fn new(resolver: &'a dyn RefResolver) -> Self {
        Self { resolver }
    }
}

impl std::fmt::Debug for ValidatorCompiler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorCompiler").finish_non_exhaustive()
    }
}

impl SchemaAlgebra for ValidatorCompiler<'_> {
    type Output = ValidatorExpr;
    type Error = CompileError;

    fn enter(&mut self, node: &SchemaNode) -> Result<(), CompileError> {
        match node.unsupported.first() {
            Some(keyword) => Err(CompileError::keyword(keyword.clone())),
            None => Ok(()),
        }
    }

    fn boolean(&mut self, _: &SchemaNode, value: bool) -> Result<ValidatorExpr, CompileError> {
        Ok(if value {
            ValidatorExpr::Unknown
        } else {
            ValidatorExpr::Never
        })
    }

    fn reference(&mut self, name: &str) -> Result<ValidatorExpr, CompileError> {
        self.resolver.resolve(name)
    }

    fn scalar(
        &mut self,
        _: &SchemaNode,
        scalar: &ScalarSchema,
    ) -> Result<ValidatorExpr, CompileError> {
        Ok(match scalar.ty {
            ScalarType::String if scalar.format.as_deref() == Some("binary") => {
                ValidatorExpr::Binary
            }
            ScalarType::String => ValidatorExpr::String(StringValidator {
                format: scalar.format.clone(),
                min_length: scalar.min_length,
                max_length: scalar.max_length,
                pattern: scalar.pattern.clone(),
            }),
            ScalarType::Number | ScalarType::Integer => number_validator(scalar),
            ScalarType::Boolean => ValidatorExpr::Boolean,
            ScalarType::Null => ValidatorExpr::Null,
        })
    }

    fn array(
        &mut self,
        _: &SchemaNode,
        array: &ArraySchema,
        prefix: Option<Vec<ValidatorExpr>>,
        items: ValidatorExpr,
    ) -> Result<ValidatorExpr, CompileError> {
        let mut refinements = Vec::new();
        let base = match prefix {
            Some(prefix) => {
                let rest = (!array.items.is_false()).then(|| Box::new(items));
                if rest.is_some() {
                    if let Some(limit) = array.min_items {
                        refinements.push(Refinement::MinItems { limit });
                    }
                    if let Some(limit) = array.max_items {
                        refinements.push(Refinement::MaxItems { limit });
                    }
                }
                ValidatorExpr::Tuple { prefix, rest }
            }
            None => ValidatorExpr::Array {
                items: Box::new(items),
                min_items: array.min_items,
                max_items: array.max_items,
            },
        };
        if array.unique_items {
            refinements.push(Refinement::UniqueItems);
        }
        Ok(base.refined(refinements))
    }

    fn object(
        &mut self,
        _: &SchemaNode,
        object: &ObjectSchema,
        properties: Vec<(String, ValidatorExpr)>,
        additional: ValidatorExpr,
    ) -> Result<ValidatorExpr, CompileError> {
        let fields = properties
            .into_iter()
            .map(|(name, validator)| FieldValidator {
                optional: !object.is_required(&name),
                name,
                validator,
            })
            .collect();
        let unknown_keys = if object.is_closed() {
            UnknownKeys::Strict
        } else {
            UnknownKeys::Catchall {
                validator: Box::new(additional),
            }
        };

        let mut refinements = Vec::new();
        if let Some(limit) = object.min_properties {
            refinements.push(Refinement::MinProperties { limit });
        }
        if let Some(limit) = object.max_properties {
            refinements.push(Refinement::MaxProperties { limit });
        }
        Ok(ValidatorExpr::object(fields, unknown_keys).refined(refinements))
    }

    fn composition(
        &mut self,
        _: &SchemaNode,
        op: CompositionOp,
        branches: Vec<ValidatorExpr>,
    ) -> Result<ValidatorExpr, CompileError> {
        Ok(match op {
            CompositionOp::OneOf | CompositionOp::AnyOf => ValidatorExpr::union(branches),
            CompositionOp::AllOf => ValidatorExpr::intersection(branches),
        })
    }

    fn literals(&mut self, _: &SchemaNode, values: &[Value]) -> Result<ValidatorExpr, CompileError> {
        Ok(ValidatorExpr::union(
            values
                .iter()
                .map(|v| match Literal::from_json(v) {
                    Some(literal) => ValidatorExpr::literal(literal),
                    None => ValidatorExpr::Unknown,
                })
                .collect(),
        ))
    }

    fn nullable(&mut self, inner: ValidatorExpr) -> Result<ValidatorExpr, CompileError> {
        Ok(match inner {
            ValidatorExpr::Null | ValidatorExpr::Nullable { .. } | ValidatorExpr::Unknown => inner,
            other => ValidatorExpr::Nullable {
                inner: Box::new(other),
            },
        })
    }
}

/// Numeric combinator. Bounds move into a [`Refinement::Range`] when
/// combined with `multipleOf`.
fn number_validator(scalar: &ScalarSchema) -> ValidatorExpr {
    let min = tighter(
        scalar.minimum.map(Bound::inclusive),
        scalar.exclusive_minimum.map(Bound::exclusive),
        |a, b| a > b,
    );
    let max = tighter(
        scalar.maximum.map(Bound::inclusive),
        scalar.exclusive_maximum.map(Bound::exclusive),
        |a, b| a < b,
    );
    let integer = scalar.ty == ScalarType::Integer;

    if scalar.multiple_of.is_some() && scalar.has_range() {
        return ValidatorExpr::Number(NumberValidator {
            integer,
            min: None,
            max: None,
            multiple_of: scalar.multiple_of,
        })
        .refined(vec![Refinement::Range { min, max }]);
    }
    ValidatorExpr::Number(NumberValidator {
        integer,
        min,
        max,
        multiple_of: scalar.multiple_of,
    })
}

/// The stricter of an inclusive and an exclusive bound; ties go to the
/// exclusive one.
fn tighter(
    inclusive: Option<Bound>,
    exclusive: Option<Bound>,
    stricter: impl Fn(f64, f64) -> bool,
) -> Option<Bound> {
    match (inclusive, exclusive) {
        (Some(i), Some(e)) if stricter(i.value, e.value) => Some(i),
        (_, Some(e)) => Some(e),
        (i, None) => i,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::ir::SchemaKind;
    use serde_json::json;

    struct Known(&'static [&'static str]);

    impl RefResolver for Known {
        fn resolve(&self, name: &str) -> Result<ValidatorExpr, CompileError> {
            if self.0.contains(&name) {
                Ok(ValidatorExpr::lazy(name))
            } else {
                Err(CompileError::unresolved(name))
            }
        }
    }

    fn group() -> SchemaNode {
        SchemaNode::object(
            [
                ("name", SchemaNode::string()),
                ("children", SchemaNode::array(SchemaNode::reference("Group"))),
            ],
            &["name"],
        )
        .named("Group")
    }

    #[test]
    fn test_recursive_reference_is_lazy() {
        let v = compile_validator(&group(), &Known(&["Group"])).unwrap();
        assert_eq!(
            v,
            ValidatorExpr::object(
                vec![
                    FieldValidator {
                        name: "name".into(),
                        validator: ValidatorExpr::string(),
                        optional: false,
                    },
                    FieldValidator {
                        name: "children".into(),
                        validator: ValidatorExpr::Array {
                            items: Box::new(ValidatorExpr::lazy("Group")),
                            min_items: None,
                            max_items: None,
                        },
                        optional: true,
                    },
                ],
                UnknownKeys::Catchall {
                    validator: Box::new(ValidatorExpr::Unknown)
                },
            )
        );
    }

    #[test]
    fn test_unresolved_reference_fails() {
        let err = compile_validator(&group(), &Known(&[])).unwrap_err();
        assert_eq!(err, CompileError::unresolved("Group"));
    }

    #[test]
    fn test_unsupported_keywords_are_rejected() {
        for keyword in ["not", "patternProperties", "contains", "minContains", "maxContains"] {
            let mut inner = SchemaNode::array(SchemaNode::string());
            inner.unsupported.push(keyword.to_string());
            let node = SchemaNode::object([("tags", inner)], &[]);
            assert_eq!(
                compile_validator(&node, &LazyResolver).unwrap_err(),
                CompileError::keyword(keyword)
            );
        }
    }

    #[test]
    fn test_strict_objects_and_size_refinements() {
        let mut node = SchemaNode::object([("a", SchemaNode::string())], &["a"]).closed();
        if let SchemaKind::Object(obj) = &mut node.kind {
            obj.min_properties = Some(1);
            obj.max_properties = Some(3);
        }
        let v = compile_validator(&node, &LazyResolver).unwrap();
        let ValidatorExpr::Refined { inner, refinements } = v else {
            panic!("expected refinements");
        };
        assert!(matches!(
            *inner,
            ValidatorExpr::Object(ref o) if o.unknown_keys == UnknownKeys::Strict
        ));
        assert_eq!(
            refinements,
            vec![
                Refinement::MinProperties { limit: 1 },
                Refinement::MaxProperties { limit: 3 }
            ]
        );
    }

    #[test]
    fn test_range_with_multiple_of_becomes_refinement() {
        let mut scalar = ScalarSchema::new(ScalarType::Integer);
        scalar.minimum = Some(0.0);
        scalar.exclusive_maximum = Some(100.0);
        scalar.multiple_of = Some(5.0);
        let v = compile_validator(&SchemaNode::new(SchemaKind::Scalar(scalar.clone())), &LazyResolver)
            .unwrap();
        assert_eq!(
            v,
            ValidatorExpr::Number(NumberValidator {
                integer: true,
                min: None,
                max: None,
                multiple_of: Some(5.0),
            })
            .refined(vec![Refinement::Range {
                min: Some(Bound::inclusive(0.0)),
                max: Some(Bound::exclusive(100.0)),
            }])
        );

        scalar.multiple_of = None;
        let v = compile_validator(&SchemaNode::new(SchemaKind::Scalar(scalar)), &LazyResolver)
            .unwrap();
        assert_eq!(
            v,
            ValidatorExpr::Number(NumberValidator {
                integer: true,
                min: Some(Bound::inclusive(0.0)),
                max: Some(Bound::exclusive(100.0)),
                multiple_of: None,
            })
        );
    }

    #[test]
    fn test_tuple_with_rest_refines_item_counts() {
        let mut node = SchemaNode::array(SchemaNode::string());
        if let SchemaKind::Array(arr) = &mut node.kind {
            arr.prefix_items = Some(vec![SchemaNode::scalar(ScalarType::Number)]);
            arr.min_items = Some(2);
            arr.unique_items = true;
        }
        let v = compile_validator(&node, &LazyResolver).unwrap();
        let ValidatorExpr::Refined { refinements, .. } = v else {
            panic!("expected refinements");
        };
        assert_eq!(
            refinements,
            vec![Refinement::MinItems { limit: 2 }, Refinement::UniqueItems]
        );
    }

    #[test]
    fn test_nullable_enum() {
        let node = SchemaNode::one_of_values(vec![json!("a"), json!("b")]).nullable();
        assert_eq!(
            compile_validator(&node, &LazyResolver).unwrap(),
            ValidatorExpr::Nullable {
                inner: Box::new(ValidatorExpr::Union {
                    members: vec![
                        ValidatorExpr::literal(Literal::String("a".into())),
                        ValidatorExpr::literal(Literal::String("b".into())),
                    ]
                })
            }
        );
    }
}

//! Generic fold over [`SchemaNode`].
//!
//! Both backends are instances of [`SchemaAlgebra`]; [`fold`] owns the
//! traversal order, the nullable wrapping and the named-reference cut, so the
//! type compiler and the validator compiler cannot disagree on them.

use serde_json::Value;

use crate::ir::{ArraySchema, CompositionOp, ObjectSchema, ScalarSchema, SchemaKind, SchemaNode};

/// One method per schema case. Children arrive already folded.
pub trait SchemaAlgebra {
    type Output;
    type Error;

    /// Pre-order hook, called on every visited node before anything else.
    fn enter(&mut self, node: &SchemaNode) -> Result<(), Self::Error> {
        let _ = node;
        Ok(())
    }

    fn boolean(&mut self, node: &SchemaNode, value: bool) -> Result<Self::Output, Self::Error>;

    /// Occurrence of a Named Schema that must not be expanded.
    fn reference(&mut self, name: &str) -> Result<Self::Output, Self::Error>;

    fn scalar(
        &mut self,
        node: &SchemaNode,
        scalar: &ScalarSchema,
    ) -> Result<Self::Output, Self::Error>;

    fn array(
        &mut self,
        node: &SchemaNode,
        array: &ArraySchema,
        prefix: Option<Vec<Self::Output>>,
        items: Self::Output,
    ) -> Result<Self::Output, Self::Error>;

    /// `properties` is in declaration order.
    fn object(
        &mut self,
        node: &SchemaNode,
        object: &ObjectSchema,
        properties: Vec<(String, Self::Output)>,
        additional: Self::Output,
    ) -> Result<Self::Output, Self::Error>;

    fn composition(
        &mut self,
        node: &SchemaNode,
        op: CompositionOp,
        branches: Vec<Self::Output>,
    ) -> Result<Self::Output, Self::Error>;

    /// `const` (one value) and `enum`.
    fn literals(&mut self, node: &SchemaNode, values: &[Value])
    -> Result<Self::Output, Self::Error>;

    /// Wrap the folded non-null shape of a `nullable` node.
    fn nullable(&mut self, inner: Self::Output) -> Result<Self::Output, Self::Error>;
}

/// Fold `node` with `algebra`.
///
/// A Named Schema is expanded only when `expand` is set; children are always
/// folded with `expand = false`, so each named occurrence below the root
/// becomes [`SchemaAlgebra::reference`]. That cut is what makes cyclic graphs
/// terminate.
pub fn fold<A>(algebra: &mut A, node: &SchemaNode, expand: bool) -> Result<A::Output, A::Error>
where
    A: SchemaAlgebra + ?Sized,
{
    algebra.enter(node)?;
    let shape = fold_shape(algebra, node, expand)?;
    if node.nullable {
        algebra.nullable(shape)
    } else {
        Ok(shape)
    }
}

fn fold_shape<A>(algebra: &mut A, node: &SchemaNode, expand: bool) -> Result<A::Output, A::Error>
where
    A: SchemaAlgebra + ?Sized,
{
    if !expand && let Some(name) = node.named_target() {
        return algebra.reference(name);
    }

    match &node.kind {
        SchemaKind::Bool { value } => algebra.boolean(node, *value),
        SchemaKind::Ref { name } => algebra.reference(name),
        SchemaKind::Scalar(scalar) => algebra.scalar(node, scalar),
        SchemaKind::Array(array) => {
            let prefix = array
                .prefix_items
                .as_ref()
                .map(|prefix| {
                    prefix
                        .iter()
                        .map(|p| fold(algebra, p, false))
                        .collect::<Result<Vec<_>, _>>()
                })
                .transpose()?;
            let items = fold(algebra, &array.items, false)?;
            algebra.array(node, array, prefix, items)
        }
        SchemaKind::Object(object) => {
            let mut properties = Vec::with_capacity(object.properties.len());
            for (name, schema) in &object.properties {
                properties.push((name.clone(), fold(algebra, schema, false)?));
            }
            let additional = fold(algebra, &object.additional_properties, false)?;
            algebra.object(node, object, properties, additional)
        }
        SchemaKind::Composition(composition) => {
            let branches = composition
                .branches
                .iter()
                .map(|b| fold(algebra, b, false))
                .collect::<Result<Vec<_>, _>>()?;
            algebra.composition(node, composition.op, branches)
        }
        SchemaKind::Const { value } => algebra.literals(node, std::slice::from_ref(value)),
        SchemaKind::Enum { values } => algebra.literals(node, values),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    /// Renders a compact trace of the fold, one token per callback.
    struct Trace {
        entered: usize,
    }

    impl SchemaAlgebra for Trace {
        type Output = String;
        type Error = String;

        fn enter(&mut self, node: &SchemaNode) -> Result<(), String> {
            self.entered += 1;
            match node.unsupported.first() {
                Some(keyword) => Err(keyword.clone()),
                None => Ok(()),
            }
        }

        fn boolean(&mut self, _: &SchemaNode, value: bool) -> Result<String, String> {
            Ok(value.to_string())
        }

        fn reference(&mut self, name: &str) -> Result<String, String> {
            Ok(format!("&{name}"))
        }

        fn scalar(&mut self, _: &SchemaNode, scalar: &ScalarSchema) -> Result<String, String> {
            Ok(format!("{:?}", scalar.ty))
        }

        fn array(
            &mut self,
            _: &SchemaNode,
            _: &ArraySchema,
            prefix: Option<Vec<String>>,
            items: String,
        ) -> Result<String, String> {
            Ok(match prefix {
                Some(prefix) => format!("[{};{items}]", prefix.join(",")),
                None => format!("[{items}]"),
            })
        }

        fn object(
            &mut self,
            _: &SchemaNode,
            _: &ObjectSchema,
            properties: Vec<(String, String)>,
            additional: String,
        ) -> Result<String, String> {
            let fields: Vec<String> = properties
                .into_iter()
                .map(|(k, v)| format!("{k}:{v}"))
                .collect();
            Ok(format!("{{{};{additional}}}", fields.join(",")))
        }

        fn composition(
            &mut self,
            _: &SchemaNode,
            op: CompositionOp,
            branches: Vec<String>,
        ) -> Result<String, String> {
            Ok(format!("{}({})", op.keyword(), branches.join(",")))
        }

        fn literals(&mut self, _: &SchemaNode, values: &[Value]) -> Result<String, String> {
            Ok(format!("{values:?}"))
        }

        fn nullable(&mut self, inner: String) -> Result<String, String> {
            Ok(format!("{inner}?"))
        }
    }

    fn group() -> SchemaNode {
        SchemaNode::object(
            [
                ("name", SchemaNode::string()),
                ("children", SchemaNode::array(SchemaNode::reference("Group"))),
                ("parent", SchemaNode::reference("Group").nullable()),
            ],
            &["name"],
        )
        .named("Group")
    }

    #[test]
    fn named_root_expands_only_when_asked() {
        let mut trace = Trace { entered: 0 };
        assert_eq!(fold(&mut trace, &group(), false).unwrap(), "&Group");
        assert_eq!(
            fold(&mut trace, &group(), true).unwrap(),
            "{name:String,children:[&Group],parent:&Group?;true}"
        );
    }

    #[test]
    fn enter_runs_before_every_node() {
        let mut trace = Trace { entered: 0 };
        let mut bad = SchemaNode::string();
        bad.unsupported.push("not".into());
        let node = SchemaNode::object([("a", bad)], &[]);
        assert_eq!(fold(&mut trace, &node, true).unwrap_err(), "not");
        assert_eq!(trace.entered, 2);
    }
}

//! Union and intersection simplification for [`TypeExpr`].
//!
//! Every union or intersection the compiler builds goes through here, so
//! stored operators are flat and deduplicated. All decisions depend only on
//! member order and structural equality.

use crate::ir::{Literal, Member, Property, TypeExpr};

/// Canonical union of `members`.
///
/// - nested unions are flattened; `never` is dropped next to other members
/// - exact duplicates are dropped, first occurrence wins
/// - `true | false` collapses to `boolean`, which absorbs boolean literals
/// - two property-only type literals with the same field names and exactly
///   one differing field merge into one literal whose field type is the
///   union of both (repeated until nothing merges)
pub fn simplify_union(members: Vec<TypeExpr>) -> TypeExpr {
    let mut flat = Vec::with_capacity(members.len());
    for member in members {
        flatten_union(member, &mut flat);
    }
    if flat.len() > 1 {
        flat.retain(|m| *m != TypeExpr::never());
    }
    dedup(&mut flat);
    collapse_booleans(&mut flat);
    merge_literals(&mut flat);

    match flat.len() {
        0 => TypeExpr::never(),
        1 => flat.remove(0),
        _ => TypeExpr::Union { members: flat },
    }
}

/// Canonical intersection of `members`.
///
/// - nested intersections are flattened; `never` absorbs everything
/// - `{}` and `unknown` are identity elements
/// - property-only type literals merge field by field: the left field keeps
///   its documentation, field types are intersected recursively, and a field
///   stays optional only if it is optional on both sides
/// - literals with index signatures stay separate operands
pub fn simplify_intersection(members: Vec<TypeExpr>) -> TypeExpr {
    let mut flat = Vec::with_capacity(members.len());
    for member in members {
        flatten_intersection(member, &mut flat);
    }
    if flat.contains(&TypeExpr::never()) {
        return TypeExpr::never();
    }

    let saw_unknown = flat.contains(&TypeExpr::unknown());
    flat.retain(|m| *m != TypeExpr::unknown() && *m != TypeExpr::empty_object());
    dedup(&mut flat);

    let mut merged: Vec<TypeExpr> = Vec::with_capacity(flat.len());
    for member in flat {
        if pure_properties(&member).is_none() {
            merged.push(member);
            continue;
        }
        let target = merged.iter().position(|m| pure_properties(m).is_some());
        match (target, member) {
            (Some(index), TypeExpr::TypeLiteral { members }) => {
                if let TypeExpr::TypeLiteral { members: target } = &mut merged[index] {
                    merge_fields(target, into_properties(members));
                }
            }
            (_, member) => merged.push(member),
        }
    }
    dedup(&mut merged);

    match merged.len() {
        0 if saw_unknown => TypeExpr::unknown(),
        0 => TypeExpr::empty_object(),
        1 => merged.remove(0),
        _ => TypeExpr::Intersection { members: merged },
    }
}

fn flatten_union(ty: TypeExpr, out: &mut Vec<TypeExpr>) {
    match ty {
        TypeExpr::Union { members } => {
            for m in members {
                flatten_union(m, out);
            }
        }
        other => out.push(other),
    }
}

fn flatten_intersection(ty: TypeExpr, out: &mut Vec<TypeExpr>) {
    match ty {
        TypeExpr::Intersection { members } => {
            for m in members {
                flatten_intersection(m, out);
            }
        }
        other => out.push(other),
    }
}

fn dedup(members: &mut Vec<TypeExpr>) {
    let mut unique: Vec<TypeExpr> = Vec::with_capacity(members.len());
    for m in members.drain(..) {
        if !unique.contains(&m) {
            unique.push(m);
        }
    }
    *members = unique;
}

fn collapse_booleans(members: &mut Vec<TypeExpr>) {
    let t = members.iter().position(|m| *m == TypeExpr::bool_literal(true));
    let f = members.iter().position(|m| *m == TypeExpr::bool_literal(false));
    if let (Some(t), Some(f)) = (t, f) {
        let (first, second) = if t < f { (t, f) } else { (f, t) };
        members[first] = TypeExpr::boolean();
        members.remove(second);
    }
    if members.contains(&TypeExpr::boolean()) {
        members.retain(|m| {
            !matches!(
                m,
                TypeExpr::Literal {
                    literal: Literal::Bool(_)
                }
            )
        });
    }
    dedup(members);
}

fn merge_literals(members: &mut Vec<TypeExpr>) {
    'search: loop {
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                if let Some(merged) = merge_single_difference(&members[i], &members[j]) {
                    members[i] = merged;
                    members.remove(j);
                    dedup(members);
                    continue 'search;
                }
            }
        }
        break;
    }
}

/// Properties of a type literal made only of properties.
fn pure_properties(ty: &TypeExpr) -> Option<Vec<&Property>> {
    let TypeExpr::TypeLiteral { members } = ty else {
        return None;
    };
    members
        .iter()
        .map(|m| match m {
            Member::Property(p) => Some(p),
            Member::Index(_) => None,
        })
        .collect()
}

fn merge_single_difference(a: &TypeExpr, b: &TypeExpr) -> Option<TypeExpr> {
    let left = pure_properties(a)?;
    let right = pure_properties(b)?;
    if left.is_empty() || left.len() != right.len() {
        return None;
    }

    let mut differing: Option<(usize, &Property)> = None;
    for (index, p) in left.iter().enumerate() {
        let q = right.iter().find(|q| q.name == p.name)?;
        if p.ty != q.ty || p.optional != q.optional {
            if differing.is_some() {
                return None;
            }
            differing = Some((index, q));
        }
    }
    let (index, q) = differing?;

    let mut properties: Vec<Property> = left.into_iter().cloned().collect();
    let field = &mut properties[index];
    field.ty = simplify_union(vec![field.ty.clone(), q.ty.clone()]);
    field.optional = field.optional || q.optional;
    if field.doc.is_none() {
        field.doc.clone_from(&q.doc);
    }
    Some(TypeExpr::object(properties))
}

fn merge_fields(target: &mut Vec<Member>, right: Vec<Property>) {
    for q in right {
        let existing = target.iter_mut().find_map(|m| match m {
            Member::Property(p) if p.name == q.name => Some(p),
            _ => None,
        });
        match existing {
            Some(p) => {
                p.ty = simplify_intersection(vec![p.ty.clone(), q.ty]);
                p.optional = p.optional && q.optional;
                if p.doc.is_none() {
                    p.doc = q.doc;
                }
            }
            None => target.push(Member::Property(q)),
        }
    }
}

fn into_properties(members: Vec<Member>) -> Vec<Property> {
    members
        .into_iter()
        .filter_map(|m| match m {
            Member::Property(p) => Some(p),
            Member::Index(_) => None,
        })
        .collect()
}

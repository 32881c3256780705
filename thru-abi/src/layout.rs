//! C3 — the layout engine (spec §4.3). Computes constant sizes (used for
//! trailing-size budgeting, spec §4.4) and alignments (used for field
//! packing and `alignof`).

use std::collections::{HashMap, HashSet};

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::document::{BinaryExpr, Expr, TypeKind, UnaryExpr, UnaryOp};
use crate::error::ValidationError;
use crate::registry::Registry;

/// Per-call memoization context, so repeated `type-ref`s in a large schema
/// are only resolved once (spec §4.3: "memoized by type name when
/// traversing through `type-ref`").
struct LayoutCtx<'a> {
    registry: &'a Registry,
    size_cache: HashMap<String, Option<usize>>,
    align_cache: HashMap<String, usize>,
    visiting: HashSet<String>,
}

impl<'a> LayoutCtx<'a> {
    fn new(registry: &'a Registry) -> Self {
        LayoutCtx {
            registry,
            size_cache: HashMap::new(),
            align_cache: HashMap::new(),
            visiting: HashSet::new(),
        }
    }
}

/// The packed-layout constant size of `kind`, or `None` if it has no
/// constant size (spec §4.3: "Constant size const-size(kind)").
pub fn const_size(registry: &Registry, kind: &TypeKind) -> Result<Option<usize>, ValidationError> {
    let mut ctx = LayoutCtx::new(registry);
    const_size_kind(&mut ctx, kind)
}

pub fn const_size_of_name(registry: &Registry, name: &str) -> Result<Option<usize>, ValidationError> {
    let mut ctx = LayoutCtx::new(registry);
    const_size_ref(&mut ctx, name)
}

fn const_size_kind(ctx: &mut LayoutCtx, kind: &TypeKind) -> Result<Option<usize>, ValidationError> {
    match kind {
        TypeKind::Primitive(p) => Ok(Some(p.byte_len())),
        TypeKind::TypeRef(name) => const_size_ref(ctx, name),
        TypeKind::Array(array) => {
            let element = const_size_kind(ctx, &array.element)?;
            let Some(element) = element else { return Ok(None) };
            match const_eval(&array.size) {
                Some(len) => match len.to_usize() {
                    Some(len) => Ok(Some(element * len)),
                    None => Ok(None),
                },
                None => Ok(None),
            }
        }
        TypeKind::Struct(s) => {
            let mut total = 0usize;
            for field in &s.fields {
                match const_size_kind(ctx, &field.kind)? {
                    Some(size) => total += size,
                    None => return Ok(None),
                }
            }
            Ok(Some(total))
        }
        TypeKind::Enum(e) => {
            if e.variants.is_empty() {
                return Ok(Some(0));
            }
            let mut sizes = Vec::with_capacity(e.variants.len());
            for variant in &e.variants {
                match const_size_kind(ctx, &variant.kind)? {
                    Some(size) => sizes.push(size),
                    None => return Ok(None),
                }
            }
            if sizes.windows(2).all(|w| w[0] == w[1]) {
                Ok(Some(sizes[0]))
            } else {
                Ok(None)
            }
        }
        TypeKind::Union(u) => {
            let mut max = 0usize;
            for variant in &u.variants {
                match const_size_kind(ctx, &variant.kind)? {
                    Some(size) => max = max.max(size),
                    None => return Ok(None),
                }
            }
            Ok(Some(max))
        }
        // Intentionally not constant: the discriminator is runtime (spec §4.3).
        TypeKind::SizeDiscriminatedUnion(_) => Ok(None),
    }
}

fn const_size_ref(ctx: &mut LayoutCtx, name: &str) -> Result<Option<usize>, ValidationError> {
    if let Some(cached) = ctx.size_cache.get(name) {
        return Ok(*cached);
    }
    if !ctx.visiting.insert(name.to_string()) {
        // Self-reference through type-ref: not constant.
        return Ok(None);
    }
    let def = ctx.registry.get(name)?;
    let kind = def.kind.clone();
    let result = const_size_kind(ctx, &kind)?;
    ctx.visiting.remove(name);
    ctx.size_cache.insert(name.to_string(), result);
    Ok(result)
}

/// A restricted constant-expression evaluator used only by the layout
/// engine: literals and arithmetic binary/unary operators, no field
/// references and no `sizeof`/`alignof` (spec §4.3: "Use const-eval that
/// supports only literal and arithmetic binary operators").
fn const_eval(expr: &Expr) -> Option<BigInt> {
    match expr {
        Expr::Literal(v) => Some(v.clone()),
        Expr::Binary(BinaryExpr { op, left, right }) => {
            let l = const_eval(left)?;
            let r = const_eval(right)?;
            const_eval_binary(*op, &l, &r)
        }
        Expr::Unary(UnaryExpr { op, operand }) => {
            let v = const_eval(operand)?;
            match op {
                UnaryOp::BitNot => Some(-(v) - BigInt::from(1u8)),
            }
        }
        Expr::FieldRef(_) | Expr::Sizeof(_) | Expr::Alignof(_) => None,
    }
}

fn const_eval_binary(op: crate::document::BinaryOp, l: &BigInt, r: &BigInt) -> Option<BigInt> {
    use crate::document::BinaryOp::*;
    use num_traits::Zero;
    match op {
        Add => Some(l + r),
        Sub => Some(l - r),
        Mul => Some(l * r),
        Div => {
            if r.is_zero() {
                None
            } else {
                Some(l / r)
            }
        }
        Mod => {
            if r.is_zero() {
                None
            } else {
                Some(l % r)
            }
        }
        BitAnd => Some(l & r),
        BitOr => Some(l | r),
        BitXor => Some(l ^ r),
        LeftShift => r.to_u32().map(|n| l * BigInt::from(2u8).pow(n)),
        RightShift => r.to_u32().map(|n| l / BigInt::from(2u8).pow(n)),
    }
}

/// The alignment of `kind`, always `>= 1` (spec §4.3: "Alignment
/// align(kind)").
pub fn align(registry: &Registry, kind: &TypeKind) -> Result<usize, ValidationError> {
    let mut ctx = LayoutCtx::new(registry);
    align_kind(&mut ctx, kind)
}

pub fn align_of_name(registry: &Registry, name: &str) -> Result<usize, ValidationError> {
    let mut ctx = LayoutCtx::new(registry);
    align_ref(&mut ctx, name)
}

fn align_kind(ctx: &mut LayoutCtx, kind: &TypeKind) -> Result<usize, ValidationError> {
    match kind {
        TypeKind::Primitive(p) => Ok(p.byte_len()),
        TypeKind::TypeRef(name) => align_ref(ctx, name),
        TypeKind::Array(array) => align_kind(ctx, &array.element),
        TypeKind::Struct(s) => {
            if s.attributes.aligned > 0 {
                return Ok(s.attributes.aligned as usize);
            }
            if s.fields.is_empty() {
                return Ok(1);
            }
            let mut max = 1usize;
            for field in &s.fields {
                max = max.max(align_kind(ctx, &field.kind)?);
            }
            Ok(max)
        }
        TypeKind::Enum(e) => {
            if e.attributes.aligned > 0 {
                return Ok(e.attributes.aligned as usize);
            }
            if e.variants.is_empty() {
                return Ok(1);
            }
            let mut max = 1usize;
            for variant in &e.variants {
                max = max.max(align_kind(ctx, &variant.kind)?);
            }
            Ok(max)
        }
        TypeKind::Union(u) => {
            if u.attributes.aligned > 0 {
                return Ok(u.attributes.aligned as usize);
            }
            if u.variants.is_empty() {
                return Ok(1);
            }
            let mut max = 1usize;
            for variant in &u.variants {
                max = max.max(align_kind(ctx, &variant.kind)?);
            }
            Ok(max)
        }
        TypeKind::SizeDiscriminatedUnion(s) => {
            if s.attributes.aligned > 0 {
                return Ok(s.attributes.aligned as usize);
            }
            if s.variants.is_empty() {
                return Ok(1);
            }
            let mut max = 1usize;
            for variant in &s.variants {
                max = max.max(align_kind(ctx, &variant.kind)?);
            }
            Ok(max)
        }
    }
}

fn align_ref(ctx: &mut LayoutCtx, name: &str) -> Result<usize, ValidationError> {
    if let Some(cached) = ctx.align_cache.get(name) {
        return Ok(*cached);
    }
    if !ctx.visiting.insert(name.to_string()) {
        // Self-reference: default alignment, matches the const-size guard.
        return Ok(1);
    }
    let def = ctx.registry.get(name)?;
    let kind = def.kind.clone();
    let result = align_kind(ctx, &kind)?;
    ctx.visiting.remove(name);
    ctx.align_cache.insert(name.to_string(), result);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::*;

    fn reg(types: Vec<TypeDef>) -> Registry {
        Registry::build(Document { types }).unwrap()
    }

    #[test]
    fn primitive_const_size() {
        let registry = reg(vec![]);
        let size = const_size(&registry, &TypeKind::Primitive(Primitive::U32)).unwrap();
        assert_eq!(size, Some(4));
    }

    #[test]
    fn struct_sums_field_sizes() {
        let registry = reg(vec![]);
        let kind = TypeKind::Struct(StructDef {
            fields: vec![
                FieldDef {
                    name: "a".into(),
                    kind: TypeKind::Primitive(Primitive::U8),
                },
                FieldDef {
                    name: "b".into(),
                    kind: TypeKind::Primitive(Primitive::U32),
                },
            ],
            attributes: Attributes::default(),
        });
        assert_eq!(const_size(&registry, &kind).unwrap(), Some(5));
    }

    #[test]
    fn array_with_field_ref_size_is_not_constant() {
        let registry = reg(vec![]);
        let kind = TypeKind::Array(ArrayDef {
            element: Box::new(TypeKind::Primitive(Primitive::U8)),
            size: Expr::FieldRef(vec![PathSegment::Field("len".into())]),
        });
        assert_eq!(const_size(&registry, &kind).unwrap(), None);
    }

    #[test]
    fn size_discriminated_union_is_never_constant() {
        let registry = reg(vec![]);
        let kind = TypeKind::SizeDiscriminatedUnion(SizeDiscriminatedUnionDef {
            variants: vec![SizeDiscriminatedVariant {
                name: "Short".into(),
                expected_size: 4,
                kind: TypeKind::Primitive(Primitive::U32),
            }],
            attributes: Attributes::default(),
        });
        assert_eq!(const_size(&registry, &kind).unwrap(), None);
    }

    #[test]
    fn struct_alignment_defaults_to_max_field_alignment() {
        let registry = reg(vec![]);
        let kind = TypeKind::Struct(StructDef {
            fields: vec![
                FieldDef {
                    name: "a".into(),
                    kind: TypeKind::Primitive(Primitive::U8),
                },
                FieldDef {
                    name: "b".into(),
                    kind: TypeKind::Primitive(Primitive::U64),
                },
            ],
            attributes: Attributes::default(),
        });
        assert_eq!(align(&registry, &kind).unwrap(), 8);
    }
}

//! C1 — the expression evaluator (spec §4.1).

use num_bigint::BigInt;
use num_traits::{Pow, ToPrimitive, Zero};

use crate::document::{BinaryExpr, BinaryOp, Expr, PathSegment, UnaryExpr, UnaryOp};
use crate::error::DecodeError;
use crate::scope::ScopeRef;

/// Evaluates an expression against an optional scope chain, producing an
/// arbitrary-precision integer (spec §4.1).
pub fn evaluate(expr: &Expr, scope: Option<&ScopeRef>, path: &str) -> Result<BigInt, DecodeError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::FieldRef(segments) => eval_field_ref(segments, scope, path),
        Expr::Binary(BinaryExpr { op, left, right }) => {
            let l = evaluate(left, scope, path)?;
            let r = evaluate(right, scope, path)?;
            eval_binary(*op, &l, &r, path)
        }
        Expr::Unary(UnaryExpr { op, operand }) => {
            let v = evaluate(operand, scope, path)?;
            match op {
                UnaryOp::BitNot => Ok(bit_not(&v)),
            }
        }
        Expr::Sizeof(_) | Expr::Alignof(_) => Err(DecodeError::ExpressionFailure {
            path: path.to_string(),
            message: "sizeof/alignof must be resolved against a type registry".to_string(),
        }),
    }
}

/// Like [`evaluate`], but also resolves `sizeof`/`alignof` against the
/// registry's layout engine (kept as a separate entry point so the pure
/// scope-only evaluator above has no registry dependency).
pub fn evaluate_with_registry(
    expr: &Expr,
    registry: &crate::registry::Registry,
    scope: Option<&ScopeRef>,
    path: &str,
) -> Result<BigInt, DecodeError> {
    match expr {
        Expr::Sizeof(name) => {
            let size = crate::layout::const_size_of_name(registry, name)?.ok_or_else(|| {
                DecodeError::ExpressionFailure {
                    path: path.to_string(),
                    message: format!("type `{name}` has no constant size"),
                }
            })?;
            Ok(BigInt::from(size))
        }
        Expr::Alignof(name) => {
            let align = crate::layout::align_of_name(registry, name)?;
            Ok(BigInt::from(align))
        }
        Expr::Binary(BinaryExpr { op, left, right }) => {
            let l = evaluate_with_registry(left, registry, scope, path)?;
            let r = evaluate_with_registry(right, registry, scope, path)?;
            eval_binary(*op, &l, &r, path)
        }
        Expr::Unary(UnaryExpr { op, operand }) => {
            let v = evaluate_with_registry(operand, registry, scope, path)?;
            match op {
                UnaryOp::BitNot => Ok(bit_not(&v)),
            }
        }
        Expr::Literal(_) | Expr::FieldRef(_) => evaluate(expr, scope, path),
    }
}

fn eval_field_ref(
    path_segments: &[PathSegment],
    scope: Option<&ScopeRef>,
    ctx: &str,
) -> Result<BigInt, DecodeError> {
    let Some(first) = path_segments.first() else {
        return Err(DecodeError::ExpressionFailure {
            path: ctx.to_string(),
            message: "empty field-reference path".to_string(),
        });
    };

    let Some(scope) = scope else {
        return Err(DecodeError::ExpressionFailure {
            path: ctx.to_string(),
            message: "field reference used outside of any struct scope".to_string(),
        });
    };

    match first {
        PathSegment::Parent => eval_field_ref(&path_segments[1..], scope.parent(), ctx),
        PathSegment::Field(name) => {
            if let Some(value) = scope.get(name) {
                walk_into(&value, &path_segments[1..], ctx)
            } else {
                // Retry the whole path against the parent scope: this is
                // what lets an array-length expression written inside a
                // nested struct find a sibling of an ancestor.
                eval_field_ref(path_segments, scope.parent(), ctx)
            }
        }
    }
}

fn walk_into(
    value: &crate::value::DecodedValue,
    remaining: &[PathSegment],
    ctx: &str,
) -> Result<BigInt, DecodeError> {
    if remaining.is_empty() {
        return value.as_primitive_bigint().ok_or_else(|| DecodeError::ExpressionFailure {
            path: ctx.to_string(),
            message: "field reference did not terminate on a primitive value".to_string(),
        });
    }

    match &remaining[0] {
        PathSegment::Parent => Err(DecodeError::ExpressionFailure {
            path: ctx.to_string(),
            message: "`..` is only valid at the start of a field-reference path".to_string(),
        }),
        PathSegment::Field(name) => {
            let next = value
                .struct_field(name)
                .ok_or_else(|| DecodeError::ExpressionFailure {
                    path: ctx.to_string(),
                    message: format!("no field named `{name}` on referenced value"),
                })?;
            walk_into(next, &remaining[1..], ctx)
        }
    }
}

fn eval_binary(op: BinaryOp, l: &BigInt, r: &BigInt, path: &str) -> Result<BigInt, DecodeError> {
    match op {
        BinaryOp::Add => Ok(l + r),
        BinaryOp::Sub => Ok(l - r),
        BinaryOp::Mul => Ok(l * r),
        BinaryOp::Div => {
            if r.is_zero() {
                return Err(DecodeError::ExpressionFailure {
                    path: path.to_string(),
                    message: "division by zero".to_string(),
                });
            }
            Ok(l / r)
        }
        BinaryOp::Mod => {
            if r.is_zero() {
                return Err(DecodeError::ExpressionFailure {
                    path: path.to_string(),
                    message: "modulo by zero".to_string(),
                });
            }
            Ok(l % r)
        }
        BinaryOp::BitAnd => Ok(l & r),
        BinaryOp::BitOr => Ok(l | r),
        BinaryOp::BitXor => Ok(l ^ r),
        BinaryOp::LeftShift => shift(l, r, path, true),
        BinaryOp::RightShift => shift(l, r, path, false),
    }
}

/// Shifts use unbounded arithmetic (spec §4.1: "the reference uses
/// unbounded arithmetic"), implemented via multiplication/division by a
/// power of two rather than relying on a fixed machine width.
fn shift(l: &BigInt, r: &BigInt, path: &str, left: bool) -> Result<BigInt, DecodeError> {
    let n = r.to_u32().ok_or_else(|| DecodeError::ExpressionFailure {
        path: path.to_string(),
        message: "shift amount out of range".to_string(),
    })?;
    let factor = BigInt::from(2u8).pow(n);
    if left {
        Ok(l * factor)
    } else {
        Ok(l / factor)
    }
}

/// Bitwise complement on arbitrary-precision integers (two's complement
/// identity `!x == -x - 1`, correct for any magnitude).
fn bit_not(v: &BigInt) -> BigInt {
    -(v.clone()) - BigInt::from(1u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{DecodedKind, DecodedValue, PrimitiveValue};
    use test_case::test_case;

    fn primitive_scope(name: &str, value: i64) -> ScopeRef {
        let scope = crate::scope::ScopeNode::new(None);
        scope.insert(
            name.to_string(),
            DecodedValue {
                offset: 0,
                length: 1,
                raw_hex: String::new(),
                type_name: None,
                kind: DecodedKind::Primitive {
                    primitive: crate::document::Primitive::U8,
                    value: PrimitiveValue::U8(value as u8),
                },
            },
        );
        scope
    }

    #[test_case(BinaryOp::Add, 3, 4, 7)]
    #[test_case(BinaryOp::Sub, 10, 4, 6)]
    #[test_case(BinaryOp::Mul, 3, 4, 12)]
    #[test_case(BinaryOp::Div, 12, 4, 3)]
    #[test_case(BinaryOp::Mod, 13, 4, 1)]
    #[test_case(BinaryOp::BitAnd, 0b1100, 0b1010, 0b1000)]
    #[test_case(BinaryOp::BitOr, 0b1100, 0b1010, 0b1110)]
    #[test_case(BinaryOp::BitXor, 0b1100, 0b1010, 0b0110)]
    #[test_case(BinaryOp::LeftShift, 1, 4, 16)]
    #[test_case(BinaryOp::RightShift, 16, 4, 1)]
    fn binary_ops(op: BinaryOp, l: i64, r: i64, expected: i64) {
        let result = eval_binary(op, &BigInt::from(l), &BigInt::from(r), "Root").unwrap();
        assert_eq!(result, BigInt::from(expected));
    }

    #[test]
    fn division_by_zero_fails() {
        let err = eval_binary(BinaryOp::Div, &BigInt::from(1), &BigInt::from(0), "Root.x");
        assert!(matches!(err, Err(DecodeError::ExpressionFailure { .. })));
    }

    #[test]
    fn field_ref_resolves_sibling() {
        let scope = primitive_scope("len", 7);
        let expr = Expr::FieldRef(vec![PathSegment::Field("len".into())]);
        let value = evaluate(&expr, Some(&scope), "Root").unwrap();
        assert_eq!(value, BigInt::from(7));
    }

    #[test]
    fn field_ref_retries_against_parent_scope() {
        let parent = primitive_scope("len", 9);
        let child = crate::scope::ScopeNode::new(Some(parent));
        let expr = Expr::FieldRef(vec![PathSegment::Field("len".into())]);
        let value = evaluate(&expr, Some(&child), "Root.inner").unwrap();
        assert_eq!(value, BigInt::from(9));
    }

    #[test]
    fn explicit_parent_segment_walks_up() {
        let parent = primitive_scope("len", 11);
        let child = crate::scope::ScopeNode::new(Some(parent));
        let expr = Expr::FieldRef(vec![PathSegment::Parent, PathSegment::Field("len".into())]);
        let value = evaluate(&expr, Some(&child), "Root.inner").unwrap();
        assert_eq!(value, BigInt::from(11));
    }

    #[test]
    fn bit_not_is_twos_complement() {
        assert_eq!(bit_not(&BigInt::from(0)), BigInt::from(-1));
        assert_eq!(bit_not(&BigInt::from(5)), BigInt::from(-6));
    }
}

//! Integer operator semantics shared by both execution backends
//!
//! Every operator applies the integer promotions and usual arithmetic
//! conversions, computes in `i128` and wraps back into the result kind.
//! Comparisons and logical operators yield `int` 0 or 1.

use super::value::Value;
use crate::parser::ast::{BinOp, IntKind, UnOp};
use std::fmt;

/// Operator failures; callers attach the source location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithError {
    DivisionByZero { op: BinOp },
    ShiftOutOfRange { amount: i128, width: u32 },
}

impl fmt::Display for ArithError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithError::DivisionByZero { op } => {
                write!(f, "'{}' by zero", op.symbol())
            }
            ArithError::ShiftOutOfRange { amount, width } => {
                write!(f, "shift amount {} outside 0..{}", amount, width)
            }
        }
    }
}

/// Evaluate a binary operator on two already-evaluated operands.
///
/// `&&` and `||` are accepted here on values; short-circuiting is the
/// caller's job.
pub fn binary(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, ArithError> {
    match op {
        BinOp::And => return Ok(Value::from_bool(lhs.is_truthy() && rhs.is_truthy())),
        BinOp::Or => return Ok(Value::from_bool(lhs.is_truthy() || rhs.is_truthy())),
        BinOp::BitShl | BinOp::BitShr => return shift(op, lhs, rhs),
        _ => {}
    }

    let kind = lhs.kind().common(rhs.kind());
    let a = lhs.convert(kind).as_i128();
    let b = rhs.convert(kind).as_i128();

    let raw = match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div | BinOp::Mod => {
            if b == 0 {
                return Err(ArithError::DivisionByZero { op });
            }
            // Operands are at most 64 bits wide, so i128 division cannot overflow
            if op == BinOp::Div {
                a / b
            } else {
                a % b
            }
        }
        BinOp::BitAnd => a & b,
        BinOp::BitOr => a | b,
        BinOp::BitXor => a ^ b,
        BinOp::Eq => return Ok(Value::from_bool(a == b)),
        BinOp::Ne => return Ok(Value::from_bool(a != b)),
        BinOp::Lt => return Ok(Value::from_bool(a < b)),
        BinOp::Le => return Ok(Value::from_bool(a <= b)),
        BinOp::Gt => return Ok(Value::from_bool(a > b)),
        BinOp::Ge => return Ok(Value::from_bool(a >= b)),
        BinOp::And | BinOp::Or | BinOp::BitShl | BinOp::BitShr => unreachable!(),
    };

    Ok(Value::new(kind, raw))
}

fn shift(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, ArithError> {
    let lhs = lhs.promote();
    let width = lhs.kind().bits();
    let amount = rhs.promote().as_i128();
    if amount < 0 || amount >= width as i128 {
        return Err(ArithError::ShiftOutOfRange { amount, width });
    }
    let amount = amount as u32;
    let raw = if op == BinOp::BitShl {
        lhs.as_i128() << amount
    } else {
        // Arithmetic for signed kinds, logical for unsigned (raw is non-negative)
        lhs.as_i128() >> amount
    };
    Ok(Value::new(lhs.kind(), raw))
}

/// Evaluate a non-mutating unary operator
pub fn unary(op: UnOp, operand: Value) -> Value {
    match op {
        UnOp::Neg => {
            let v = operand.promote();
            Value::new(v.kind(), v.as_i128().wrapping_neg())
        }
        UnOp::Plus => operand.promote(),
        UnOp::BitNot => {
            let v = operand.promote();
            Value::new(v.kind(), !v.as_i128())
        }
        UnOp::Not => Value::from_bool(!operand.is_truthy()),
        UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec => {
            step(operand, op.step())
        }
    }
}

/// `x + delta` converted back to the kind of `x`, the value stored by `++`/`--`.
///
/// Adding in the common kind and converting back is the same as adding
/// modulo 2^bits of the operand's own kind.
pub fn step(operand: Value, delta: i128) -> Value {
    Value::new(operand.kind(), operand.as_i128() + delta)
}

/// The size reported by `sizeof` for an integer kind, as `unsigned long`
pub fn size_of(kind: IntKind) -> Value {
    Value::new(IntKind::ULong, kind.size() as i128)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(kind: IntKind, n: i128) -> Value {
        Value::new(kind, n)
    }

    #[test]
    fn test_signed_overflow_wraps() {
        let max = Value::int(i32::MAX);
        assert_eq!(binary(BinOp::Add, max, Value::int(1)).unwrap(), Value::int(i32::MIN));
        assert_eq!(
            binary(BinOp::Div, Value::int(i32::MIN), Value::int(-1)).unwrap(),
            Value::int(i32::MIN)
        );
        assert_eq!(
            binary(
                BinOp::Mul,
                v(IntKind::ULong, u64::MAX as i128),
                v(IntKind::ULong, u64::MAX as i128)
            )
            .unwrap()
            .as_i128(),
            1
        );
    }

    #[test]
    fn test_usual_arithmetic_conversions() {
        // -1 converts to UINT_MAX when compared with an unsigned int
        let r = binary(BinOp::Lt, Value::int(-1), v(IntKind::UInt, 1)).unwrap();
        assert_eq!(r, Value::int(0));
        // long absorbs unsigned int
        let r = binary(BinOp::Add, v(IntKind::Long, -1), v(IntKind::UInt, 1)).unwrap();
        assert_eq!(r, v(IntKind::Long, 0));
        // char + char is int
        let r = binary(BinOp::Add, v(IntKind::Char, 100), v(IntKind::Char, 100)).unwrap();
        assert_eq!(r, Value::int(200));
    }

    #[test]
    fn test_division_truncates_toward_zero() {
        assert_eq!(binary(BinOp::Div, Value::int(-7), Value::int(2)).unwrap(), Value::int(-3));
        assert_eq!(binary(BinOp::Mod, Value::int(-7), Value::int(2)).unwrap(), Value::int(-1));
        assert_eq!(
            binary(BinOp::Mod, Value::int(1), Value::int(0)),
            Err(ArithError::DivisionByZero { op: BinOp::Mod })
        );
    }

    #[test]
    fn test_shifts() {
        assert_eq!(
            binary(BinOp::BitShl, Value::int(1), Value::int(31)).unwrap(),
            Value::int(i32::MIN)
        );
        assert_eq!(binary(BinOp::BitShr, Value::int(-8), Value::int(1)).unwrap(), Value::int(-4));
        assert_eq!(
            binary(BinOp::BitShr, v(IntKind::UInt, 0x8000_0000), Value::int(31)).unwrap(),
            v(IntKind::UInt, 1)
        );
        assert!(matches!(
            binary(BinOp::BitShl, Value::int(1), Value::int(32)),
            Err(ArithError::ShiftOutOfRange { amount: 32, width: 32 })
        ));
        assert!(binary(BinOp::BitShl, Value::int(1), Value::int(-1)).is_err());
        // char operand is promoted, so shifting by 8 is fine
        assert_eq!(
            binary(BinOp::BitShl, v(IntKind::Char, 1), Value::int(8)).unwrap(),
            Value::int(256)
        );
    }

    #[test]
    fn test_unary_and_step() {
        assert_eq!(unary(UnOp::Neg, Value::int(i32::MIN)), Value::int(i32::MIN));
        assert_eq!(unary(UnOp::BitNot, Value::int(0)), Value::int(-1));
        assert_eq!(unary(UnOp::Not, v(IntKind::Long, 5)), Value::int(0));
        assert_eq!(step(v(IntKind::Char, 127), 1), v(IntKind::Char, -128));
        assert_eq!(step(v(IntKind::UInt, 0), -1), v(IntKind::UInt, 4294967295));
        assert_eq!(unary(UnOp::PreInc, Value::int(2)), Value::int(3));
    }
}

//! Runtime value representation
//!
//! This module defines [`Value`], the only runtime value of the fixture
//! interpreter: an integer tagged with its [`IntKind`].
//!
//! # Normalisation
//!
//! The payload is stored widened to `i128` and is always reduced into the
//! range of its kind on construction, so two's-complement wrapping falls out
//! of every constructor instead of being checked at each operator.
//!
//! # Initialization Tracking
//!
//! Storage slots hold `Option<Value>`; `None` marks an indeterminate object
//! and reading it is reported as an uninitialized read.

use crate::parser::ast::IntKind;
use std::fmt;

/// Runtime integer value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Value {
    kind: IntKind,
    raw: i128,
}

impl Value {
    /// Build a value of `kind`, wrapping `raw` modulo 2^bits
    pub fn new(kind: IntKind, raw: i128) -> Self {
        Value {
            kind,
            raw: wrap(kind, raw),
        }
    }

    pub fn int(n: i32) -> Self {
        Value::new(IntKind::Int, n as i128)
    }

    pub fn zero(kind: IntKind) -> Self {
        Value::new(kind, 0)
    }

    /// `int` 1 or 0, the result kind of comparisons and logical operators
    pub fn from_bool(b: bool) -> Self {
        Value::int(b as i32)
    }

    pub fn kind(&self) -> IntKind {
        self.kind
    }

    pub fn as_i128(&self) -> i128 {
        self.raw
    }

    pub fn is_truthy(&self) -> bool {
        self.raw != 0
    }

    /// Convert to another integer kind (C11 6.3.1.3, wrapping for signed targets)
    pub fn convert(self, kind: IntKind) -> Value {
        Value::new(kind, self.raw)
    }

    /// Apply the integer promotions
    pub fn promote(self) -> Value {
        self.convert(self.kind.promote())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn wrap(kind: IntKind, raw: i128) -> i128 {
    let modulus = 1i128 << kind.bits();
    let reduced = raw.rem_euclid(modulus);
    if kind.is_signed() && reduced > kind.max_value() {
        reduced - modulus
    } else {
        reduced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapping_construction() {
        assert_eq!(Value::new(IntKind::Int, 2147483648).as_i128(), -2147483648);
        assert_eq!(Value::new(IntKind::UInt, -1).as_i128(), 4294967295);
        assert_eq!(Value::new(IntKind::Char, 200).as_i128(), -56);
        assert_eq!(Value::new(IntKind::UChar, 256).as_i128(), 0);
        assert_eq!(Value::new(IntKind::ULong, -1).as_i128(), u64::MAX as i128);
    }

    #[test]
    fn test_promote_and_convert() {
        let c = Value::new(IntKind::Char, -1);
        assert_eq!(c.promote().kind(), IntKind::Int);
        assert_eq!(c.promote().as_i128(), -1);
        assert_eq!(c.convert(IntKind::UShort).as_i128(), 65535);
        assert!(!Value::zero(IntKind::Long).is_truthy());
        assert_eq!(Value::from_bool(true), Value::int(1));
    }
}

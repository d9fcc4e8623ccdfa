//! Value and storage model shared by the execution backends
//!
//! This module provides the core abstractions:
//! - [`value`]: Runtime value representation (an integer tagged with its kind)
//! - [`arith`]: Operator semantics (promotions, conversions, wrapping)
//! - [`typing`]: Static expression kinds and integer constant folding
//! - [`stack`]: Call stack with scoped frames, plus the global table
//!
//! # Type Sizes
//!
//! The interpreter follows the LP64 data model regardless of host:
//! - `char`: 1 byte (signed)
//! - `short`: 2 bytes
//! - `int`: 4 bytes
//! - `long`, `long long`: 8 bytes

pub mod arith;
pub mod stack;
pub mod typing;
pub mod value;

use crate::parser::ast::{BaseType, Type};

/// Calculate the size of a type in bytes (`sizeof(void)` is 1, as in GNU C)
pub fn sizeof_type(t: &Type) -> usize {
    match t.base {
        BaseType::Void => 1,
        BaseType::Integer(kind) => kind.size(),
    }
}

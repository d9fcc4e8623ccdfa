//! Operator evaluation, implemented as `impl Interpreter` blocks

pub mod assign;
pub mod binary;
pub mod unary;

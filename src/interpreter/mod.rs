//! Tree-walking interpreter
//!
//! This module provides the reference execution backend:
//! - [`engine`]: Main interpreter with AST execution, scopes and snapshots
//! - [`errors`]: Runtime error types (shared with the block IR machine)
//!
//! # Execution Model
//!
//! The interpreter walks the AST and executes statements one at a time in
//! textual order. Every side effect, including the store of a postfix
//! `++`/`--`, is completed when its operator is evaluated. When created with
//! [`engine::Interpreter::with_snapshots`], a snapshot of all live variables
//! is taken after each statement.
//!
//! # Built-in Functions
//!
//! `exit` and `abort` are implemented in `builtins`.

pub mod engine;
pub mod errors;

mod builtins;
mod expressions;
mod jumps;
mod loops;
mod ops;
mod statements;
mod type_system;

pub(crate) use builtins::BUILTINS;

//! C source code parser
//!
//! This module transforms C fixture source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parse`]: Parsing (tokens → AST), split across `declarations`,
//!   `statements` and `expressions`
//! - [`ast`]: AST node definitions and the integer type model
//!
//! # Supported C Subset
//!
//! The parser accepts the integer subset used by conformance fixtures:
//! - Types: `char`, `short`, `int`, `long` with `signed`/`unsigned`, `void`, `const`
//! - Statements: declarations, control flow (`if`, `while`, `do`, `for`, `switch`),
//!   `return`, `break`, `continue`, blocks
//! - Expressions: arithmetic, logical, bitwise, ternary, comma, casts, `sizeof`,
//!   prefix and postfix increment/decrement, simple and compound assignment, calls
//! - Preprocessor lines are skipped
//! - No pointers, arrays, structs, strings or floating point
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser, one method per precedence level.
//! No external parser generator dependencies.

pub mod ast;
mod declarations;
mod expressions;
pub mod lexer;
pub mod parse;
mod statements;

pub use parse::{parse_source, ParseError, Parser};

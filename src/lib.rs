//! # Introduction
//!
//! cfixture runs single-file C conformance fixtures, programs whose only
//! observable result is their exit status, on two independent evaluators
//! and checks that they agree.
//!
//! ## Execution pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST ─┬→ Interpreter ──────────→ Outcome
//!                                ├→ Lowering → Block IR → VM → Outcome
//!                                └→ Unsequenced analysis → Warnings
//! ```
//!
//! 1. [`parser`]: tokenises the source and builds an AST.
//! 2. [`interpreter`]: walks the AST, storing every side effect as soon as
//!    its operator runs, and optionally records a [`snapshot::Snapshot`]
//!    after each statement.
//! 3. [`lowering`]: lowers the AST to a control-flow graph and executes it
//!    on a small virtual machine that defers postfix stores to the next
//!    sequence point.
//! 4. [`memory`]: the value model shared by both backends: kinds, wrapping
//!    arithmetic, static typing and the interpreter's stack.
//! 5. [`analysis`]: flags expressions with unsequenced side effects.
//! 6. [`conformance`]: runs every backend and produces a [`conformance::Report`].
//!
//! ## Supported C subset
//!
//! Types: `char`, `short`, `int`, `long` (signed and unsigned), `void`, `const`.
//! Control flow: `if/else`, `while`, `do-while`, `for`, `switch/case`,
//! `break`, `continue`, `return`.
//! Built-ins: `exit`, `abort`, `sizeof`.

pub mod analysis;
pub mod config;
pub mod conformance;
pub mod interpreter;
pub mod lowering;
pub mod memory;
pub mod outcome;
pub mod parser;
pub mod snapshot;

pub use conformance::{check, Backend, Report, Verdict};
pub use outcome::Outcome;

//! Static checks over the AST
//!
//! [`unsequenced`] finds full expressions whose result depends on the order
//! in which unsequenced side effects are applied. These are exactly the
//! programs on which the two execution backends may legitimately disagree.

pub mod unsequenced;

pub use unsequenced::{check_program, Warning, WarningKind};

//! Second execution backend: block IR and virtual machine
//!
//! - [`mir`]: The IR itself, with a textual form used by `dump-ir`
//! - [`builder`]: Lowering from the AST, one [`mir::Body`] per function
//! - [`machine`]: The VM, sharing operator semantics and error taxonomy with
//!   the interpreter
//!
//! The two backends differ in one conforming respect: the VM completes the
//! store of a postfix `++`/`--` at the next sequence point instead of
//! immediately. Programs with defined behaviour cannot observe the
//! difference.

pub mod builder;
pub mod machine;
pub mod mir;

pub use builder::lower_program;
pub use machine::Machine;
pub use mir::Module;

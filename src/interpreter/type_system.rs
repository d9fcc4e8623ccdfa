//! Static typing against the interpreter's live scopes
//!
//! `sizeof expr` and the arms of `?:` need the kind of an expression without
//! evaluating it. Names resolve exactly as they would at run time: innermost
//! local scope first, then globals.

use crate::interpreter::builtins::BUILTINS;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::typing::{expr_kind, KindLookup};
use crate::parser::ast::{AstNode, IntKind, SourceLocation};

impl KindLookup for Interpreter {
    fn variable_kind(&self, name: &str) -> Option<IntKind> {
        self.visible_kind(name)
    }

    fn return_kind(&self, name: &str) -> Option<Option<IntKind>> {
        match self.signatures.get(name) {
            Some(ty) => Some(ty.int_kind()),
            None if BUILTINS.contains(&name) => Some(None),
            None => None,
        }
    }
}

impl Interpreter {
    /// Kind of `expr` in the current scope
    pub(crate) fn static_kind(
        &self,
        expr: &AstNode,
        location: SourceLocation,
    ) -> Result<IntKind, RuntimeError> {
        expr_kind(expr, self).map_err(|e| RuntimeError::from_typing(e, location))
    }
}

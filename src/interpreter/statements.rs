//! Statement execution implementation
//!
//! This module handles declarations and the `if` statement; loops live in
//! `loops` and `return`/`switch` in `jumps`.
//!
//! # Implementation
//!
//! All statement execution methods are implemented as `pub(crate)` methods
//! on the [`Interpreter`] struct, allowing them to access and modify the
//! interpreter's state (stack, globals, snapshots).
//!
//! # Control Flow
//!
//! - `break`/`continue` set `control_flow`; the enclosing loop or switch clears it
//! - `return` sets `return_value` and `ControlFlow::Return`, cleared by the call
//! - A branch body gets its own scope, like a compound statement

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::stack::Variable;
use crate::parser::ast::*;

impl Interpreter {
    /// Declare locals, evaluating initializers left to right. Each name is
    /// in scope, still indeterminate, within its own initializer.
    pub(crate) fn execute_var_decl(
        &mut self,
        var_type: &Type,
        declarators: &[Declarator],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let kind = Self::declared_kind(var_type, location)?;

        for declarator in declarators {
            let var = Variable::new(kind, var_type.is_const, declarator.location);
            self.declare_local(&declarator.name, var, location)?;

            if let Some(init) = &declarator.init {
                let value = self.evaluate_expr(init)?;
                if let Some(var) = self
                    .stack
                    .current_frame_mut()
                    .and_then(|frame| frame.get_var_mut(&declarator.name))
                {
                    var.value = Some(value.convert(var.kind));
                }
            }
        }

        Ok(())
    }

    /// Bring the names of a declaration into scope without running its
    /// initializers, as when a `switch` jumps past it
    pub(crate) fn declare_skipped(
        &mut self,
        var_type: &Type,
        declarators: &[Declarator],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let kind = Self::declared_kind(var_type, location)?;
        for declarator in declarators {
            let var = Variable::new(kind, var_type.is_const, declarator.location);
            self.declare_local(&declarator.name, var, location)?;
        }
        Ok(())
    }

    fn declare_local(
        &mut self,
        name: &str,
        var: Variable,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let frame = self.stack.current_frame_mut().ok_or_else(|| {
            RuntimeError::UnsupportedOperation {
                message: "local declaration outside a function".to_string(),
                location,
            }
        })?;
        frame.declare_var(name.to_string(), var);
        Ok(())
    }

    pub(crate) fn execute_if(
        &mut self,
        condition: &AstNode,
        then_branch: &[AstNode],
        else_branch: Option<&[AstNode]>,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        self.snapshot_at(location)?;

        let cond_val = self.evaluate_expr(condition)?;

        if cond_val.is_truthy() {
            self.execute_block(then_branch)
        } else if let Some(else_stmts) = else_branch {
            self.execute_block(else_stmts)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Limits;
    use crate::interpreter::engine::Interpreter;
    use crate::interpreter::errors::RuntimeError;
    use crate::parser::parse::parse_source;

    fn run(src: &str) -> Result<u8, RuntimeError> {
        let program = parse_source(src).unwrap();
        Interpreter::new(&program, Limits::default())
            .run()
            .map(|o| o.status)
    }

    #[test]
    fn test_block_scoping_and_shadowing() {
        let src = r#"
            int main() {
                int x = 1;
                { int x = 5; x++; }
                if (x) { int y = x + 1; x = y; }
                return x;
            }
        "#;
        assert_eq!(run(src).unwrap(), 2);
    }

    #[test]
    fn test_multiple_declarators_in_order() {
        let src = "int main() { int a = 2, b = a * 3, c; c = a + b; return c; }";
        assert_eq!(run(src).unwrap(), 8);
    }

    #[test]
    fn test_uninitialized_read_is_error() {
        let err = run("int main() { int x; return x; }").unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::UninitializedRead { ref var, .. } if var == "x"
        ));
    }

    #[test]
    fn test_declaration_is_in_scope_in_its_initializer() {
        let src = r#"
            int x = 5;
            int main() {
                int x = x + 1;
                return x;
            }
        "#;
        let err = run(src).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::UninitializedRead { ref var, .. } if var == "x"
        ));
        assert_eq!(err.location().map(|l| l.line), Some(4));
    }

    #[test]
    fn test_const_local_cannot_be_modified() {
        let err = run("int main() { const int k = 3; k += 1; return k; }").unwrap_err();
        assert!(matches!(err, RuntimeError::ConstModification { .. }));
    }

    #[test]
    fn test_initializer_converts_to_declared_kind() {
        assert_eq!(
            run("int main() { unsigned char c = 300; return c; }").unwrap(),
            44
        );
        assert_eq!(run("int main() { char c = 200; return c < 0; }").unwrap(), 1);
    }
}

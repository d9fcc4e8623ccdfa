//! Loop statement execution (`while`, `do-while`, `for`).
//!
//! Adds `impl Interpreter` methods for the three loop forms supported by the
//! C subset. `break` and `continue` are propagated via `LoopBodyResult` so
//! the loop driver can react without inspecting `control_flow` directly.
//!
//! `return` inside a loop body is handled by returning
//! `LoopBodyResult::Exit`, which causes the loop to unwind immediately and
//! let the enclosing call observe `ControlFlow::Return`.

use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::parser::ast::{AstNode, SourceLocation};

/// Result returned by [`Interpreter::execute_loop_body`] to signal how the body ended.
pub(crate) enum LoopBodyResult {
    /// Body completed normally or via `continue`; the loop should iterate again.
    Continue,
    /// `break` was encountered; the loop should exit cleanly.
    Break,
    /// `return` was triggered; the loop driver should unwind and leave
    /// `self.control_flow` for the caller.
    Exit,
}

impl Interpreter {
    /// Executes all statements in `body` inside a fresh scope.
    pub(crate) fn execute_loop_body(
        &mut self,
        body: &[AstNode],
    ) -> Result<LoopBodyResult, RuntimeError> {
        self.execute_block(body)?;
        match self.control_flow {
            ControlFlow::Normal => Ok(LoopBodyResult::Continue),
            ControlFlow::Continue => {
                self.control_flow = ControlFlow::Normal;
                Ok(LoopBodyResult::Continue)
            }
            ControlFlow::Break => {
                self.control_flow = ControlFlow::Normal;
                Ok(LoopBodyResult::Break)
            }
            ControlFlow::Return => Ok(LoopBodyResult::Exit),
        }
    }

    /// Executes a `while (condition) { body }` loop.
    ///
    /// The condition is evaluated before each iteration. A snapshot is taken at
    /// `location` both when the condition is true (before executing the body) and
    /// when it first becomes false (loop exit point).
    pub(crate) fn execute_while(
        &mut self,
        condition: &AstNode,
        body: &[AstNode],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        loop {
            self.tick()?;
            let cond_val = self.evaluate_expr(condition)?;
            self.snapshot_at(location)?;

            if !cond_val.is_truthy() {
                break;
            }

            match self.execute_loop_body(body)? {
                LoopBodyResult::Exit | LoopBodyResult::Break => break,
                LoopBodyResult::Continue => continue,
            }
        }

        Ok(())
    }

    /// Executes a `do { body } while (condition)` loop.
    ///
    /// The body always runs at least once; the condition is checked after each
    /// iteration.
    pub(crate) fn execute_do_while(
        &mut self,
        body: &[AstNode],
        condition: &AstNode,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        loop {
            self.tick()?;
            self.snapshot_at(location)?;

            match self.execute_loop_body(body)? {
                LoopBodyResult::Exit | LoopBodyResult::Break => break,
                LoopBodyResult::Continue => {}
            }

            let cond_val = self.evaluate_expr(condition)?;
            if !cond_val.is_truthy() {
                self.snapshot_at(location)?;
                break;
            }
        }

        Ok(())
    }

    /// Executes a `for (init; condition; increment) { body }` loop.
    ///
    /// `init`, `condition`, and `increment` are all optional, matching C semantics.
    /// A missing condition is treated as always-true. The initializer and loop
    /// variable share a single scope that is exited when the loop ends.
    pub(crate) fn execute_for(
        &mut self,
        init: Option<&AstNode>,
        condition: Option<&AstNode>,
        increment: Option<&AstNode>,
        body: &[AstNode],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        self.enter_scope(); // Scope for init and loop variable
        let result = self.run_for(init, condition, increment, body, location);
        self.exit_scope();
        result
    }

    fn run_for(
        &mut self,
        init: Option<&AstNode>,
        condition: Option<&AstNode>,
        increment: Option<&AstNode>,
        body: &[AstNode],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        if let Some(init_stmt) = init {
            self.execute_statement(init_stmt)?;
        }

        loop {
            self.tick()?;
            if let Some(cond) = condition {
                let cond_val = self.evaluate_expr(cond)?;
                if !cond_val.is_truthy() {
                    self.snapshot_at(location)?;
                    break;
                }
            }

            self.snapshot_at(location)?;

            match self.execute_loop_body(body)? {
                LoopBodyResult::Exit | LoopBodyResult::Break => break,
                LoopBodyResult::Continue => {}
            }

            if let Some(inc) = increment {
                self.evaluate_discarded(inc)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Limits;
    use crate::interpreter::engine::Interpreter;
    use crate::interpreter::errors::RuntimeError;
    use crate::parser::parse::parse_source;

    fn run_with(src: &str, limits: Limits) -> Result<u8, RuntimeError> {
        let program = parse_source(src).unwrap();
        Interpreter::new(&program, limits).run().map(|o| o.status)
    }

    fn run(src: &str) -> Result<u8, RuntimeError> {
        run_with(src, Limits::default())
    }

    #[test]
    fn test_for_loop_with_continue_and_break() {
        let src = r#"
            int main() {
                int s = 0;
                for (int i = 0; i < 100; i++) {
                    if (i % 2) continue;
                    if (i > 10) break;
                    s += i;
                }
                return s;
            }
        "#;
        assert_eq!(run(src).unwrap(), 30);
    }

    #[test]
    fn test_while_and_do_while() {
        let src = "int main() { int n = 5, f = 1; while (n) f *= n--; return f; }";
        assert_eq!(run(src).unwrap(), 120);
        let src = "int main() { int n = 0; do n++; while (n < 0); return n; }";
        assert_eq!(run(src).unwrap(), 1);
    }

    #[test]
    fn test_return_from_nested_loop() {
        let src = "int main() { for (;;) { while (1) { return 9; } } }";
        assert_eq!(run(src).unwrap(), 9);
    }

    #[test]
    fn test_loop_variable_is_fresh_each_iteration() {
        let src = r#"
            int main() {
                int s = 0;
                for (int i = 0; i < 2; i++) {
                    int x;
                    if (i == 1) s = x;
                    x = 4;
                }
                return s;
            }
        "#;
        assert!(matches!(
            run(src),
            Err(RuntimeError::UninitializedRead { .. })
        ));
    }

    #[test]
    fn test_step_limit_stops_infinite_loop() {
        let limits = Limits {
            max_steps: 1000,
            ..Limits::default()
        };
        let err = run_with("int main() { while (1) {} }", limits).unwrap_err();
        assert_eq!(err, RuntimeError::StepLimitExceeded { limit: 1000 });
    }
}

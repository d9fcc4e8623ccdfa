//! Expression evaluation implementation
//!
//! This module handles evaluation of all C expression types, including:
//!
//! - Integer literals and variables
//! - Ternary and comma operators
//! - Function calls (including the `exit`/`abort` built-ins)
//! - Type casts and the `sizeof` operator
//!
//! Binary, unary and assignment operators live in `ops`.
//!
//! # Evaluation Order
//!
//! Operands, call arguments and initializers are evaluated strictly left to
//! right, and every side effect is stored the moment its operator runs.

use crate::interpreter::engine::{Interpreter, STACK_GROW_SIZE, STACK_RED_ZONE};
use crate::interpreter::errors::RuntimeError;
use crate::memory::{arith, sizeof_type, value::Value};
use crate::parser::ast::*;
use tracing::trace;

impl Interpreter {
    /// Evaluate an expression and return its value
    pub(crate) fn evaluate_expr(
        &mut self,
        expr: &AstNode,
    ) -> Result<Value, RuntimeError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.evaluate_expr_inner(expr)
        })
    }

    fn evaluate_expr_inner(
        &mut self,
        expr: &AstNode,
    ) -> Result<Value, RuntimeError> {
        match expr {
            AstNode::IntLiteral { value, kind, .. } => Ok(Value::new(*kind, *value)),

            AstNode::Variable(name, loc) => self.read_var(name, *loc),

            AstNode::Assignment { lhs, rhs, location } => {
                self.evaluate_assignment(lhs, rhs, *location)
            }

            AstNode::CompoundAssignment {
                lhs,
                op,
                rhs,
                location,
            } => self.evaluate_compound_assignment(lhs, *op, rhs, *location),

            AstNode::BinaryOp {
                op,
                left,
                right,
                location,
            } => self.evaluate_binary_op(*op, left, right, *location),

            AstNode::UnaryOp {
                op,
                operand,
                location,
            } => self.evaluate_unary_op(*op, operand, *location),

            AstNode::TernaryOp {
                condition,
                true_expr,
                false_expr,
                location,
            } => {
                // Both arms convert to their common kind
                let kind = self
                    .static_kind(true_expr, *location)?
                    .common(self.static_kind(false_expr, *location)?);
                let chosen = if self.evaluate_expr(condition)?.is_truthy() {
                    true_expr
                } else {
                    false_expr
                };
                Ok(self.evaluate_expr(chosen)?.convert(kind))
            }

            AstNode::Comma { left, right, .. } => {
                self.evaluate_discarded(left)?;
                self.evaluate_expr(right)
            }

            AstNode::FunctionCall {
                name,
                args,
                location,
            } => self
                .evaluate_call(name, args, *location)?
                .ok_or_else(|| RuntimeError::MissingReturnValue {
                    function: name.clone(),
                    location: *location,
                }),

            AstNode::Cast {
                target_type,
                expr,
                location,
            } => {
                let val = self.evaluate_expr(expr)?;
                let kind = Self::declared_kind(target_type, *location)?;
                Ok(val.convert(kind))
            }

            AstNode::SizeofType { target_type, .. } => Ok(Value::new(
                IntKind::ULong,
                sizeof_type(target_type) as i128,
            )),

            // The operand is not evaluated
            AstNode::SizeofExpr { expr, location } => {
                Ok(arith::size_of(self.static_kind(expr, *location)?))
            }

            other => Err(RuntimeError::UnsupportedOperation {
                message: "statement in expression position".to_string(),
                location: other.location(),
            }),
        }
    }

    /// Evaluate an expression whose value is not used (expression
    /// statements, `for` increments, the left side of a comma). Calls to
    /// `void` functions and `(void)` casts are only legal here.
    pub(crate) fn evaluate_discarded(
        &mut self,
        expr: &AstNode) -> Result<(), RuntimeError> {
        match expr {
            AstNode::FunctionCall {
                name,
                args,
                location,
            } => {
                self.evaluate_call(name, args, *location)?;
            }
            AstNode::Cast {
                target_type, expr, ..
            } if target_type.is_void() => self.evaluate_discarded(expr)?,
            AstNode::Comma { left, right, .. } => {
                self.evaluate_discarded(left)?;
                self.evaluate_discarded(right)?;
            }
            other => {
                let value = self.evaluate_expr(other)?;
                trace!(%value, "discarded");
            }
        }
        Ok(())
    }

    /// Evaluate arguments left to right and call a user function or built-in
    pub(crate) fn evaluate_call(
        &mut self,
        name: &str,
        args: &[AstNode],
        location: SourceLocation,
    ) -> Result<Option<Value>, RuntimeError> {
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.evaluate_expr(arg)?);
        }

        let Some(func) = self.function_defs.get(name).cloned() else {
            return self.call_builtin(name, arg_values, location);
        };

        self.call_function(&func, arg_values, location)
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
    fn test_ternary_and_comma() {
        let src = "int main() { int a = 0; int b = (a++, a++, a); return b ? b + 10 : 0; }";
        assert_eq!(run(src).unwrap(), 12);
        // Arms convert to the common kind: unsigned wins
        assert_eq!(run("int main() { return (1 ? -1 : 0u) > 0; }").unwrap(), 1);
    }

    #[test]
    fn test_sizeof_does_not_evaluate() {
        let src = "int main() { int x = 1; long n = sizeof(x++); return x * 10 + n; }";
        assert_eq!(run(src).unwrap(), 14);
        let src = "int main() { return sizeof(char) + sizeof(short) + sizeof(long long); }";
        assert_eq!(run(src).unwrap(), 11);
    }

    #[test]
    fn test_casts_truncate() {
        assert_eq!(run("int main() { return (unsigned char)-1; }").unwrap(), 255);
        let src = "int main() { long big = 4294967297; return (int)big; }";
        assert_eq!(run(src).unwrap(), 1);
    }

    #[test]
    fn test_recursion_and_arguments() {
        let src = r#"
            int fib(int n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            int main() { return fib(10); }
        "#;
        assert_eq!(run(src).unwrap(), 55);
    }

    #[test]
    fn test_call_errors() {
        assert!(matches!(
            run("int f(int a) { return a; } int main() { return f(); }"),
            Err(RuntimeError::ArgumentCountMismatch { expected: 1, got: 0, .. })
        ));
        assert!(matches!(
            run("int g(); int main() { return g(); }"),
            Err(RuntimeError::UndefinedFunction { .. })
        ));
        assert!(matches!(
            run("int f() { } int main() { return f(); }"),
            Err(RuntimeError::MissingReturnValue { .. })
        ));
        // Discarding a missing value is fine
        assert_eq!(run("int f() { } int main() { f(); return 3; }").unwrap(), 3);
    }

    #[test]
    fn test_recursion_depth_limit() {
        let src = "int f(int n) { return f(n + 1); } int main() { return f(0); }";
        let program = parse_source(src).unwrap();
        let limits = Limits {
            max_call_depth: 50,
            ..Limits::default()
        };
        let err = Interpreter::new(&program, limits).run().unwrap_err();
        assert!(matches!(err, RuntimeError::StackOverflow { limit: 50, .. }));
    }
}

//! Simple and compound assignment
//!
//! Only plain variables are assignable in this subset; the parser rejects
//! other targets. The stored value is converted to the variable's declared
//! kind and that converted value is the result of the expression.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::{arith, value::Value};
use crate::parser::ast::*;

impl Interpreter {
    fn assignment_target<'a>(
        lhs: &'a AstNode,
        location: SourceLocation,
    ) -> Result<(&'a str, SourceLocation), RuntimeError> {
        match lhs {
            AstNode::Variable(name, loc) => Ok((name, *loc)),
            _ => Err(RuntimeError::UnsupportedOperation {
                message: "assignment target is not a variable".to_string(),
                location,
            }),
        }
    }

    /// `lhs = rhs`
    pub(crate) fn evaluate_assignment(
        &mut self,
        lhs: &AstNode,
        rhs: &AstNode,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let (name, _) = Self::assignment_target(lhs, location)?;
        let value = self.evaluate_expr(rhs)?;
        self.write_var(name, value, location)
    }

    /// `lhs op= rhs`: reads `lhs` once, before evaluating `rhs`
    pub(crate) fn evaluate_compound_assignment(
        &mut self,
        lhs: &AstNode,
        op: BinOp,
        rhs: &AstNode,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let (name, var_loc) = Self::assignment_target(lhs, location)?;
        let current = self.read_var(name, var_loc)?;
        let operand = self.evaluate_expr(rhs)?;
        let result =
            arith::binary(op, current, operand).map_err(|e| RuntimeError::from_arith(e, location))?;
        self.write_var(name, result, location)
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
    fn test_chained_assignment_is_right_associative() {
        let src = "int main() { int a, b, c; a = b = c = 4; return a + b + c; }";
        assert_eq!(run(src).unwrap(), 12);
    }

    #[test]
    fn test_compound_operators() {
        let src = r#"
            int main() {
                int x = 7;
                x += 3; x -= 1; x *= 4; x /= 6; x %= 4;
                x <<= 3; x |= 1; x ^= 3; x &= 14; x >>= 1;
                return x;
            }
        "#;
        // 7 -> 10 -> 9 -> 36 -> 6 -> 2 -> 16 -> 17 -> 18 -> 2 -> 1
        assert_eq!(run(src).unwrap(), 1);
    }

    #[test]
    fn test_assignment_value_is_converted() {
        let src = "int main() { char c; int r = (c = 300); return r; }";
        assert_eq!(run(src).unwrap(), 44);
    }

    #[test]
    fn test_compound_on_uninitialized_is_error() {
        let err = run("int main() { int x; x += 1; return x; }").unwrap_err();
        assert!(matches!(err, RuntimeError::UninitializedRead { .. }));
    }
}

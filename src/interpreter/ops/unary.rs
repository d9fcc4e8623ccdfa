//! Unary operator evaluation

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::{arith, value::Value};
use crate::parser::ast::*;

impl Interpreter {
    pub(crate) fn evaluate_unary_op(
        &mut self,
        op: UnOp,
        operand: &AstNode,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        if op.is_inc_dec() {
            return self.evaluate_inc_dec_op(op, operand, location);
        }
        let val = self.evaluate_expr(operand)?;
        Ok(arith::unary(op, val))
    }

    /// `++x`/`--x` yield the updated value, `x++`/`x--` the value read before
    /// the update. The store happens immediately in both cases.
    fn evaluate_inc_dec_op(
        &mut self,
        op: UnOp,
        operand: &AstNode,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let AstNode::Variable(name, var_loc) = operand else {
            return Err(RuntimeError::UnsupportedOperation {
                message: format!("operand of {:?} is not a variable", op),
                location,
            });
        };

        let old = self.read_var(name, *var_loc)?;
        let new = self.write_var(name, arith::step(old, op.step()), location)?;

        Ok(if op.is_postfix() { old } else { new })
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Limits;
    use crate::interpreter::engine::Interpreter;
    use crate::interpreter::errors::RuntimeError;
    use crate::memory::value::Value;
    use crate::parser::ast::IntKind;
    use crate::parser::parse::parse_source;

    fn run(src: &str) -> Result<u8, RuntimeError> {
        let program = parse_source(src).unwrap();
        Interpreter::new(&program, Limits::default())
            .run()
            .map(|o| o.status)
    }

    #[test]
    fn test_prefix_and_postfix_results() {
        let src = r#"
            int main() {
                int a = 5;
                int b = a++;
                int c = ++a;
                return a * 100 + b * 10 + c - 700;
            }
        "#;
        assert_eq!(run(src).unwrap(), 57);

        let src = r#"
            int main() {
                int a = 5;
                int b = a--;
                int c = --a;
                return a + b + c;
            }
        "#;
        assert_eq!(run(src).unwrap(), 11);
    }

    #[test]
    fn test_increment_wraps_in_variable_kind() {
        let src = "unsigned char u = 255; char c = 127; int main() { u++; c++; return 0; }";
        let program = parse_source(src).unwrap();
        let mut interp = Interpreter::new(&program, Limits::default());
        interp.run().unwrap();
        assert_eq!(interp.global_value("u"), Some(Value::new(IntKind::UChar, 0)));
        assert_eq!(interp.global_value("c"), Some(Value::new(IntKind::Char, -128)));
    }

    #[test]
    fn test_unary_arithmetic() {
        assert_eq!(run("int main() { int x = 3; return -x + 10; }").unwrap(), 7);
        assert_eq!(run("int main() { return !0 + !5 + ~0 + 2; }").unwrap(), 2);
        assert_eq!(run("int main() { unsigned u = 1; return -u > 0; }").unwrap(), 1);
    }

    #[test]
    fn test_increment_of_const_global_rejected() {
        let err = run("const int k = 1; int main() { return ++k; }").unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::ConstModification { ref var, .. } if var == "k"
        ));
    }
}

//! Binary operator evaluation

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::{arith, value::Value};
use crate::parser::ast::{AstNode, BinOp, SourceLocation};

impl Interpreter {
    /// Evaluate `left op right`: left operand first, and the right one only
    /// when `&&`/`||` do not short-circuit
    pub(crate) fn evaluate_binary_op(
        &mut self,
        op: BinOp,
        left: &AstNode,
        right: &AstNode,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let left_val = self.evaluate_expr(left)?;

        match op {
            BinOp::And if !left_val.is_truthy() => return Ok(Value::from_bool(false)),
            BinOp::Or if left_val.is_truthy() => return Ok(Value::from_bool(true)),
            _ => {}
        }

        let right_val = self.evaluate_expr(right)?;
        arith::binary(op, left_val, right_val).map_err(|e| RuntimeError::from_arith(e, location))
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
    fn test_short_circuit_skips_side_effects() {
        let src = r#"
            int main() {
                int a = 0;
                int b = 0 && a++;
                int c = 1 || a++;
                return a * 10 + b + c;
            }
        "#;
        assert_eq!(run(src).unwrap(), 1);

        let src = r#"
            int main() {
                int a = 0;
                int r = a++ || a++;
                int s = a && 0;
                return a * 10 + r + s;
            }
        "#;
        assert_eq!(run(src).unwrap(), 21);
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(run("int main() { return 2 + 3 * 4 - 10 / 2 % 3; }").unwrap(), 12);
        assert_eq!(run("int main() { return 1 << 2 + 1 | 1 & 3 ^ 2; }").unwrap(), 11);
        assert_eq!(run("int main() { return 10 - 4 - 3; }").unwrap(), 3);
    }

    #[test]
    fn test_division_by_zero_reports_location() {
        let err = run("int main() {\n  int z = 0;\n  return 5 / z;\n}").unwrap_err();
        assert!(matches!(err, RuntimeError::DivisionError { .. }));
        assert_eq!(err.location().map(|l| l.line), Some(3));
    }

    #[test]
    fn test_invalid_shift() {
        let err = run("int main() { int s = 32; return 1 << s; }").unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidShift { amount: 32, width: 32, .. }));
    }

    #[test]
    fn test_int_min_division_wraps() {
        assert_eq!(run("int main() { int m = -2147483647 - 1; return m / -1 == m; }").unwrap(), 1);
    }
}

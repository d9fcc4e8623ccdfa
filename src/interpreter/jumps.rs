use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::memory::typing::const_eval;
use crate::memory::value::Value;
use crate::parser::ast::{AstNode, CaseNode, SourceLocation};

impl Interpreter {
    pub(crate) fn execute_return(
        &mut self,
        expr: Option<&AstNode>,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        self.return_value = match expr {
            Some(ret_expr) => Some(self.evaluate_expr(ret_expr)?),
            None => None,
        };

        self.snapshot_at(location)?;
        self.control_flow = ControlFlow::Return;
        Ok(())
    }

    /// Jump to the first matching `case` (or `default`) and fall through
    /// the remaining labels until `break` or the end of the body.
    pub(crate) fn execute_switch(
        &mut self,
        expr: &AstNode,
        cases: &[CaseNode],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        self.snapshot_at(location)?;

        let switch_val = self.evaluate_expr(expr)?.promote();

        let mut match_index: Option<usize> = None;
        let mut default_index: Option<usize> = None;

        for (i, case) in cases.iter().enumerate() {
            match case {
                CaseNode::Case { value, location, .. } => {
                    // Every label is checked, not just the ones before the match
                    let case_val = Self::case_label(value, switch_val, *location)?;
                    if match_index.is_none() && case_val == switch_val {
                        match_index = Some(i);
                    }
                }
                CaseNode::Default { .. } => {
                    default_index = default_index.or(Some(i));
                }
            }
        }

        let Some(start) = match_index.or(default_index) else {
            return Ok(());
        };

        self.enter_scope();
        let result = self.execute_switch_body(cases, start);
        self.exit_scope();
        result
    }

    /// Run the switch body from the case at `start`. Declarations in the
    /// cases jumped over are still in scope, with indeterminate values.
    fn execute_switch_body(
        &mut self,
        cases: &[CaseNode],
        start: usize,
    ) -> Result<(), RuntimeError> {
        for stmt in cases[..start].iter().flat_map(|case| case.statements()) {
            if let AstNode::VarDecl {
                var_type,
                declarators,
                location,
            } = stmt
            {
                self.declare_skipped(var_type, declarators, *location)?;
            }
        }

        for case in &cases[start..] {
            self.execute_statements(case.statements())?;

            match self.control_flow {
                ControlFlow::Normal => {}
                ControlFlow::Break => {
                    self.control_flow = ControlFlow::Normal;
                    break;
                }
                // continue and return propagate to the enclosing loop or call
                ControlFlow::Continue | ControlFlow::Return => break,
            }
        }
        Ok(())
    }

    /// Case labels must be integer constant expressions; they compare after
    /// conversion to the promoted kind of the controlling expression
    pub(crate) fn case_label(
        value: &AstNode,
        switch_val: Value,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        const_eval(value)
            .map(|v| v.convert(switch_val.kind()))
            .ok_or_else(|| RuntimeError::UnsupportedOperation {
                message: "case label is not an integer constant expression".to_string(),
                location,
            })
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
    fn test_switch_fallthrough_and_default() {
        let src = r#"
            int f(int x) {
                int r = 0;
                switch (x) {
                case 1: r += 1;
                case 2: r += 2; break;
                default: r = 40;
                case 3: r += 3;
                }
                return r;
            }
            int main() { return f(1) * 100 + f(2) * 10 + f(7); }
        "#;
        // f(1) = 3, f(2) = 2, f(7) = 43 (default then falls into case 3)
        assert_eq!(run(src).unwrap(), ((300 + 20 + 43) & 0xFF) as u8);
    }

    #[test]
    fn test_switch_continue_reaches_loop() {
        let src = r#"
            int main() {
                int n = 0;
                for (int i = 0; i < 4; i++) {
                    switch (i) { case 1: continue; default: n++; }
                }
                return n;
            }
        "#;
        assert_eq!(run(src).unwrap(), 3);
    }

    #[test]
    fn test_non_constant_case_label_rejected() {
        let src = r#"
            int main() {
                int k = 1;
                switch (1) { case k: return 1; }
                return 0;
            }
        "#;
        assert!(matches!(
            run(src),
            Err(RuntimeError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_unsigned_switch_compares_after_conversion() {
        let src = r#"
            int main() {
                unsigned u = 4294967295u;
                switch (u) { case -1: return 1; }
                return 0;
            }
        "#;
        assert_eq!(run(src).unwrap(), 1);
    }

    #[test]
    fn test_switch_jumps_past_declaration() {
        let src = r#"
            int main() {
                switch (2) {
                case 1: ; int x = 10;
                case 2: x = 3; return x;
                }
                return 0;
            }
        "#;
        assert_eq!(run(src).unwrap(), 3);
    }

    #[test]
    fn test_skipped_declaration_is_indeterminate() {
        let src = r#"
            int x = 7;
            int main() {
                switch (2) {
                case 1: ; int x = 10;
                case 2: return x;
                }
                return 0;
            }
        "#;
        let err = run(src).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::UninitializedRead { ref var, .. } if var == "x"
        ));
    }
}

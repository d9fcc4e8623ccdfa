//! Unsequenced modification detection
//!
//! Each subexpression is summarised by the variables it writes and reads
//! without an intervening sequence point. Two sibling operands conflict
//! when one writes a variable the other writes or reads. `&&`, `||`, `?:`
//! and `,` order their operands, so their operands never conflict with each
//! other, but their combined accesses still conflict with their siblings.
//! The arguments of a call are unsequenced among themselves.

use crate::parser::ast::{AstNode, CaseNode, Program, SourceLocation};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Two unsequenced writes to one variable
    MultipleModifications,
    /// A write unsequenced with a read of the same variable
    ModificationAndAccess,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub variable: String,
    pub location: SourceLocation,
    pub kind: WarningKind,
}

impl Warning {
    pub fn message(&self) -> String {
        match self.kind {
            WarningKind::MultipleModifications => {
                format!("multiple unsequenced modifications to '{}'", self.variable)
            }
            WarningKind::ModificationAndAccess => {
                format!("unsequenced modification and access to '{}'", self.variable)
            }
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: warning: {}", self.location, self.message())
    }
}

/// Check every full expression in the program, in source order
pub fn check_program(program: &Program) -> Vec<Warning> {
    let mut checker = Checker::default();
    for node in &program.nodes {
        match node {
            AstNode::FunctionDef { body, .. } => checker.statements(body),
            other => checker.statement(other),
        }
    }
    debug!(warnings = checker.warnings.len(), "unsequenced analysis done");
    checker.warnings
}

/// Check a single expression
pub fn check_expression(expr: &AstNode) -> Vec<Warning> {
    let mut checker = Checker::default();
    checker.expr(expr);
    checker.warnings
}

#[derive(Debug, Default)]
struct Accesses {
    /// Writes not yet followed by a sequence point inside the subexpression
    writes: Vec<String>,
    /// Writes completed before the subexpression's value is computed
    settled: Vec<String>,
    reads: Vec<String>,
}

impl Accesses {
    fn merge(&mut self, other: Accesses) {
        self.writes.extend(other.writes);
        self.settled.extend(other.settled);
        self.reads.extend(other.reads);
    }

    /// A sequence point follows every write made so far
    fn settle(&mut self) {
        self.settled.append(&mut self.writes);
    }

    fn writes_to(&self, name: &str) -> bool {
        self.writes.iter().chain(&self.settled).any(|w| w == name)
    }

    fn all_writes(&self) -> impl Iterator<Item = &String> + '_ {
        self.writes.iter().chain(&self.settled)
    }
}

#[derive(Default)]
struct Checker {
    warnings: Vec<Warning>,
}

impl Checker {
    fn report(
        &mut self,
        variable: &str,
        location: SourceLocation,
        kind: WarningKind,
    ) {
        let duplicate = self
            .warnings
            .iter()
            .any(|w| w.variable == variable && w.location == location && w.kind == kind);
        if !duplicate {
            self.warnings.push(Warning {
                variable: variable.to_string(),
                location,
                kind,
            });
        }
    }

    /// Report conflicts between two unsequenced operands. A sequence point
    /// inside one operand does not order its writes against the other one.
    fn conflicts(&mut self, a: &Accesses, b: &Accesses, location: SourceLocation) {
        for name in a.all_writes() {
            if b.writes_to(name) {
                self.report(name, location, WarningKind::MultipleModifications);
            } else if b.reads.contains(name) {
                self.report(name, location, WarningKind::ModificationAndAccess);
            }
        }
        for name in b.all_writes() {
            if !a.writes_to(name) && a.reads.contains(name) {
                self.report(name, location, WarningKind::ModificationAndAccess);
            }
        }
    }

    fn expr(&mut self, expr: &AstNode) -> Accesses {
        match expr {
            AstNode::Variable(name, _) => Accesses {
                reads: vec![name.clone()],
                ..Accesses::default()
            },

            AstNode::Assignment { lhs, rhs, location }
            | AstNode::CompoundAssignment {
                lhs, rhs, location, ..
            } => {
                let mut accesses = self.expr(rhs);
                // Reads of the target in the rhs, and writes settled by a
                // sequence point inside it, come before the store
                if let AstNode::Variable(name, _) = lhs.as_ref() {
                    if accesses.writes.contains(name) {
                        self.report(name, *location, WarningKind::MultipleModifications);
                    }
                    accesses.writes.push(name.clone());
                }
                accesses
            }

            AstNode::BinaryOp {
                op,
                left,
                right,
                location,
            } => {
                let mut lhs = self.expr(left);
                let rhs = self.expr(right);
                if op.is_short_circuit() {
                    lhs.settle();
                } else {
                    self.conflicts(&lhs, &rhs, *location);
                }
                lhs.merge(rhs);
                lhs
            }

            AstNode::UnaryOp { op, operand, .. } => match operand.as_ref() {
                AstNode::Variable(name, _) if op.is_inc_dec() => Accesses {
                    writes: vec![name.clone()],
                    ..Accesses::default()
                },
                other => self.expr(other),
            },

            AstNode::TernaryOp {
                condition,
                true_expr,
                false_expr,
                ..
            } => {
                let mut accesses = self.expr(condition);
                accesses.settle();
                accesses.merge(self.expr(true_expr));
                accesses.merge(self.expr(false_expr));
                accesses
            }

            AstNode::Comma { left, right, .. } => {
                let mut accesses = self.expr(left);
                accesses.settle();
                accesses.merge(self.expr(right));
                accesses
            }

            AstNode::FunctionCall { args, location, .. } => {
                let mut accesses = Accesses::default();
                for arg in args {
                    let arg_accesses = self.expr(arg);
                    self.conflicts(&accesses, &arg_accesses, *location);
                    accesses.merge(arg_accesses);
                }
                // Argument side effects complete before the call
                accesses.settle();
                accesses
            }

            AstNode::Cast { expr, .. } => self.expr(expr),

            // Not evaluated
            AstNode::SizeofExpr { .. } | AstNode::SizeofType { .. } => Accesses::default(),

            _ => Accesses::default(),
        }
    }

    fn full_expr(&mut self, expr: &AstNode) {
        self.expr(expr);
    }

    fn statements(&mut self, statements: &[AstNode]) {
        for stmt in statements {
            self.statement(stmt);
        }
    }

    fn statement(&mut self, stmt: &AstNode) {
        match stmt {
            AstNode::VarDecl { declarators, .. } => {
                for init in declarators.iter().filter_map(|d| d.init.as_deref()) {
                    self.full_expr(init);
                }
            }
            AstNode::ExpressionStatement { expr, .. } => self.full_expr(expr),
            AstNode::Return { expr, .. } => {
                if let Some(expr) = expr {
                    self.full_expr(expr);
                }
            }
            AstNode::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.full_expr(condition);
                self.statements(then_branch);
                if let Some(else_branch) = else_branch {
                    self.statements(else_branch);
                }
            }
            AstNode::While {
                condition, body, ..
            }
            | AstNode::DoWhile {
                condition, body, ..
            } => {
                self.full_expr(condition);
                self.statements(body);
            }
            AstNode::For {
                init,
                condition,
                increment,
                body,
                ..
            } => {
                if let Some(init) = init {
                    self.statement(init);
                }
                for expr in [condition, increment].into_iter().flatten() {
                    self.full_expr(expr);
                }
                self.statements(body);
            }
            AstNode::Switch { expr, cases, .. } => {
                self.full_expr(expr);
                for case in cases {
                    if let CaseNode::Case { value, .. } = case {
                        self.full_expr(value);
                    }
                    self.statements(case.statements());
                }
            }
            AstNode::Block { statements, .. } => self.statements(statements),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::{parse_source, Parser};

    fn warnings(expr: &str) -> Vec<(String, WarningKind)> {
        let expr = Parser::new(expr).unwrap().parse_expression().unwrap();
        check_expression(&expr)
            .into_iter()
            .map(|w| (w.variable, w.kind))
            .collect()
    }

    #[test]
    fn test_assignment_of_own_postfix_is_flagged() {
        assert_eq!(
            warnings("i = i++ + 1"),
            vec![("i".to_string(), WarningKind::MultipleModifications)]
        );
    }

    #[test]
    fn test_modification_and_access() {
        assert_eq!(
            warnings("i++ + i"),
            vec![("i".to_string(), WarningKind::ModificationAndAccess)]
        );
        assert_eq!(
            warnings("f(i, i++)"),
            vec![("i".to_string(), WarningKind::ModificationAndAccess)]
        );
        assert_eq!(
            warnings("(i++ && 1) + i"),
            vec![("i".to_string(), WarningKind::ModificationAndAccess)]
        );
    }

    #[test]
    fn test_sequenced_expressions_are_clean() {
        assert!(warnings("i = i + 1").is_empty());
        assert!(warnings("x += x").is_empty());
        assert!(warnings("i++ && i").is_empty());
        assert!(warnings("i++ || i++").is_empty());
        assert!(warnings("(i++, i)").is_empty());
        assert!(warnings("i++ ? i : i--").is_empty());
        assert!(warnings("a++ + b++").is_empty());
        assert!(warnings("sizeof(i++) + i").is_empty());
        assert!(warnings("i = (i++, i)").is_empty());
        assert!(warnings("i = f(i++)").is_empty());
        assert!(warnings("i = (i++ && 1)").is_empty());
        assert!(warnings("i = i-- ? 5 : 6").is_empty());
    }

    #[test]
    fn test_sequence_point_inside_operand_does_not_order_siblings() {
        assert_eq!(
            warnings("(i++, 0) + i"),
            vec![("i".to_string(), WarningKind::ModificationAndAccess)]
        );
        assert_eq!(
            warnings("f(i++) + i++"),
            vec![("i".to_string(), WarningKind::MultipleModifications)]
        );
        assert_eq!(
            warnings("i = (0, i++)"),
            vec![("i".to_string(), WarningKind::MultipleModifications)]
        );
    }

    #[test]
    fn test_unary_fixture_is_clean() {
        let src = "int a = 1; int b = 2; int c = 3;
            int main() {
                int t1 = ++a; int t2 = --a; int t3 = ++b; int t4 = --b; int t5 = --c;
                int t6 = ++c; int t7 = c++; int t8 = c--; int t9 = c++;
                return t1 - t2 + t3 + t4 * t5 * t6 + t7 - t8 * t9;
            }";
        assert!(check_program(&parse_source(src).unwrap()).is_empty());
    }

    #[test]
    fn test_program_walk_reports_location() {
        let src = r#"int main() {
  int i = 0;
  for (;;) {
    i = i++ + 5;
    break;
  }
  return i;
}"#;
        let found = check_program(&parse_source(src).unwrap());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].location.line, 4);
        assert_eq!(
            found[0].to_string(),
            format!(
                "4:{}: warning: multiple unsequenced modifications to 'i'",
                found[0].location.column
            )
        );
    }
}

//! Expression parsing implementation
//!
//! This module handles parsing of C expressions using one recursive-descent
//! method per precedence level.
//!
//! # Supported Expressions
//!
//! - Literals: integers, characters
//! - Identifiers and variables
//! - Binary operators: arithmetic, comparison, logical, bitwise
//! - Unary operators: `-`, `+`, `!`, `~`, `++`, `--`, `sizeof`
//! - Postfix: `++`, `--`, `()`
//! - Ternary `? :`, comma, simple and compound assignment
//! - Type casts: `(type)expr`
//!
//! Increment, decrement and assignment operands must be plain variables; the
//! parser rejects anything else as "not assignable".
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse expression (top-level entry point, includes the comma operator)
    pub(crate) fn parse_expression(&mut self) -> Result<AstNode, ParseError> {
        let mut left = self.parse_assignment()?;

        while self.match_token(&Token::Comma(self.current_location())) {
            let loc = self.previous_location();
            let right = Box::new(self.parse_assignment()?);
            left = AstNode::Comma {
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse assignment or ternary (right-associative)
    pub(crate) fn parse_assignment(&mut self) -> Result<AstNode, ParseError> {
        let expr = self.parse_ternary()?;

        let loc = self.current_location();
        if self.match_token(&Token::Eq(loc)) {
            Self::require_assignable(&expr, "Left side of assignment")?;
            let rhs = Box::new(self.parse_assignment()?);
            return Ok(AstNode::Assignment {
                lhs: Box::new(expr),
                rhs,
                location: loc,
            });
        }

        let compound_op = match self.peek() {
            Token::PlusEq(_) => Some(BinOp::Add),
            Token::MinusEq(_) => Some(BinOp::Sub),
            Token::StarEq(_) => Some(BinOp::Mul),
            Token::SlashEq(_) => Some(BinOp::Div),
            Token::PercentEq(_) => Some(BinOp::Mod),
            Token::AmpEq(_) => Some(BinOp::BitAnd),
            Token::PipeEq(_) => Some(BinOp::BitOr),
            Token::CaretEq(_) => Some(BinOp::BitXor),
            Token::LtLtEq(_) => Some(BinOp::BitShl),
            Token::GtGtEq(_) => Some(BinOp::BitShr),
            _ => None,
        };

        if let Some(op) = compound_op {
            self.advance();
            Self::require_assignable(&expr, "Left side of compound assignment")?;
            let rhs = Box::new(self.parse_assignment()?);
            return Ok(AstNode::CompoundAssignment {
                lhs: Box::new(expr),
                op,
                rhs,
                location: loc,
            });
        }

        Ok(expr)
    }

    /// Only plain variables are modifiable lvalues in this subset
    fn require_assignable(expr: &AstNode, what: &str) -> Result<(), ParseError> {
        match expr {
            AstNode::Variable(_, _) => Ok(()),
            other => Err(ParseError {
                message: format!("{} is not assignable", what),
                location: other.location(),
            }),
        }
    }

    /// Parse ternary: condition ? true_expr : false_expr
    pub(crate) fn parse_ternary(&mut self) -> Result<AstNode, ParseError> {
        let expr = self.parse_logical_or()?;

        if self.match_token(&Token::Question(self.current_location())) {
            let loc = self.previous_location();
            let true_expr = Box::new(self.parse_expression()?);
            self.expect_token(
                &Token::Colon(self.current_location()),
                "Expected ':' in ternary expression",
            )?;
            let false_expr = Box::new(self.parse_ternary()?);

            return Ok(AstNode::TernaryOp {
                condition: Box::new(expr),
                true_expr,
                false_expr,
                location: loc,
            });
        }

        Ok(expr)
    }

    /// Parse one left-associative binary level: `next (op next)*`, where
    /// `classify` maps the operator tokens of this level to their [`BinOp`]
    fn parse_binary_level(
        &mut self,
        classify: fn(&Token) -> Option<BinOp>,
        next: fn(&mut Self) -> Result<AstNode, ParseError>,
    ) -> Result<AstNode, ParseError> {
        let mut left = next(self)?;

        while let Some(op) = classify(self.peek()) {
            let loc = self.current_location();
            self.advance();
            let right = Box::new(next(self)?);
            left = AstNode::BinaryOp {
                op,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse logical OR (||)
    fn parse_logical_or(&mut self) -> Result<AstNode, ParseError> {
        self.parse_binary_level(
            |t| matches!(t, Token::OrOr(_)).then_some(BinOp::Or),
            Self::parse_logical_and,
        )
    }

    /// Parse logical AND (&&)
    fn parse_logical_and(&mut self) -> Result<AstNode, ParseError> {
        self.parse_binary_level(
            |t| matches!(t, Token::AndAnd(_)).then_some(BinOp::And),
            Self::parse_bitwise_or,
        )
    }

    /// Parse bitwise OR (|)
    fn parse_bitwise_or(&mut self) -> Result<AstNode, ParseError> {
        self.parse_binary_level(
            |t| matches!(t, Token::Pipe(_)).then_some(BinOp::BitOr),
            Self::parse_bitwise_xor,
        )
    }

    /// Parse bitwise XOR (^)
    fn parse_bitwise_xor(&mut self) -> Result<AstNode, ParseError> {
        self.parse_binary_level(
            |t| matches!(t, Token::Caret(_)).then_some(BinOp::BitXor),
            Self::parse_bitwise_and,
        )
    }

    /// Parse bitwise AND (&)
    fn parse_bitwise_and(&mut self) -> Result<AstNode, ParseError> {
        self.parse_binary_level(
            |t| matches!(t, Token::Amp(_)).then_some(BinOp::BitAnd),
            Self::parse_equality,
        )
    }

    /// Parse equality (== !=)
    fn parse_equality(&mut self) -> Result<AstNode, ParseError> {
        self.parse_binary_level(
            |t| match t {
                Token::EqEq(_) => Some(BinOp::Eq),
                Token::NotEq(_) => Some(BinOp::Ne),
                _ => None,
            },
            Self::parse_relational,
        )
    }

    /// Parse relational (< <= > >=)
    fn parse_relational(&mut self) -> Result<AstNode, ParseError> {
        self.parse_binary_level(
            |t| match t {
                Token::Lt(_) => Some(BinOp::Lt),
                Token::Le(_) => Some(BinOp::Le),
                Token::Gt(_) => Some(BinOp::Gt),
                Token::Ge(_) => Some(BinOp::Ge),
                _ => None,
            },
            Self::parse_shift,
        )
    }

    /// Parse bitwise shift (<< >>)
    fn parse_shift(&mut self) -> Result<AstNode, ParseError> {
        self.parse_binary_level(
            |t| match t {
                Token::LtLt(_) => Some(BinOp::BitShl),
                Token::GtGt(_) => Some(BinOp::BitShr),
                _ => None,
            },
            Self::parse_additive,
        )
    }

    /// Parse additive (+ -)
    fn parse_additive(&mut self) -> Result<AstNode, ParseError> {
        self.parse_binary_level(
            |t| match t {
                Token::Plus(_) => Some(BinOp::Add),
                Token::Minus(_) => Some(BinOp::Sub),
                _ => None,
            },
            Self::parse_multiplicative,
        )
    }

    /// Parse multiplicative (* / %)
    fn parse_multiplicative(&mut self) -> Result<AstNode, ParseError> {
        self.parse_binary_level(
            |t| match t {
                Token::Star(_) => Some(BinOp::Mul),
                Token::Slash(_) => Some(BinOp::Div),
                Token::Percent(_) => Some(BinOp::Mod),
                _ => None,
            },
            Self::parse_cast,
        )
    }

    /// Parse cast: (type)expr
    fn parse_cast(&mut self) -> Result<AstNode, ParseError> {
        // Without typedefs a type keyword after '(' always means a cast
        if self.check(&Token::LParen(self.current_location())) && self.is_type_keyword_ahead(1) {
            let loc = self.current_location();
            self.advance(); // consume '('
            let target_type = self.parse_type()?;
            self.expect_rparen("after cast type")?;
            let expr = Box::new(self.parse_cast()?);

            return Ok(AstNode::Cast {
                target_type,
                expr,
                location: loc,
            });
        }

        self.parse_unary()
    }

    /// Parse unary (! ~ - + ++ -- sizeof)
    fn parse_unary(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.current_location();

        let prefix = match self.peek() {
            Token::Bang(_) => Some(UnOp::Not),
            Token::Tilde(_) => Some(UnOp::BitNot),
            Token::Minus(_) => Some(UnOp::Neg),
            Token::Plus(_) => Some(UnOp::Plus),
            Token::PlusPlus(_) => Some(UnOp::PreInc),
            Token::MinusMinus(_) => Some(UnOp::PreDec),
            _ => None,
        };

        if let Some(op) = prefix {
            self.advance();
            let operand = if op.is_inc_dec() {
                let operand = self.parse_unary()?;
                Self::require_assignable(&operand, "Operand of prefix increment/decrement")?;
                operand
            } else {
                self.parse_cast()?
            };
            return Ok(AstNode::UnaryOp {
                op,
                operand: Box::new(operand),
                location: loc,
            });
        }

        if self.match_token(&Token::Sizeof(loc)) {
            if self.check(&Token::LParen(self.current_location())) && self.is_type_keyword_ahead(1)
            {
                self.advance(); // consume '('
                let target_type = self.parse_type()?;
                self.expect_rparen("after sizeof type")?;
                return Ok(AstNode::SizeofType {
                    target_type,
                    location: loc,
                });
            }

            let expr = Box::new(self.parse_unary()?);
            return Ok(AstNode::SizeofExpr {
                expr,
                location: loc,
            });
        }

        self.parse_postfix()
    }

    /// Parse postfix (++ -- ())
    fn parse_postfix(&mut self) -> Result<AstNode, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            let loc = self.current_location();

            let postfix = match self.peek() {
                Token::PlusPlus(_) => Some(UnOp::PostInc),
                Token::MinusMinus(_) => Some(UnOp::PostDec),
                _ => None,
            };

            if let Some(op) = postfix {
                self.advance();
                Self::require_assignable(&expr, "Operand of postfix increment/decrement")?;
                expr = AstNode::UnaryOp {
                    op,
                    operand: Box::new(expr),
                    location: loc,
                };
            } else if self.match_token(&Token::LParen(loc)) {
                let args = self.parse_argument_list()?;
                self.expect_rparen("after function arguments")?;

                let name = if let AstNode::Variable(n, _) = expr {
                    n
                } else {
                    return Err(ParseError {
                        message: "Function call must be on identifier".to_string(),
                        location: loc,
                    });
                };

                expr = AstNode::FunctionCall {
                    name,
                    args,
                    location: loc,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Parse argument list: (expr, expr, ...)
    fn parse_argument_list(&mut self) -> Result<Vec<AstNode>, ParseError> {
        let mut args = Vec::new();

        if self.check(&Token::RParen(self.current_location())) {
            return Ok(args);
        }

        loop {
            args.push(self.parse_assignment()?);

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        Ok(args)
    }

    /// Parse primary (literals, variables, parenthesized expressions)
    fn parse_primary(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.current_location();

        match self.peek_token() {
            Token::IntLiteral(value, kind, location) => {
                self.advance();
                Ok(AstNode::IntLiteral {
                    value,
                    kind,
                    location,
                })
            }
            // Character constants have type int in C
            Token::CharLiteral(c, location) => {
                self.advance();
                Ok(AstNode::IntLiteral {
                    value: c as i128,
                    kind: IntKind::Int,
                    location,
                })
            }
            Token::Ident(name, location) => {
                self.advance();
                Ok(AstNode::Variable(name, location))
            }
            Token::LParen(_) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_rparen("after expression")?;
                Ok(expr)
            }
            other => Err(ParseError {
                message: format!("Unexpected token: {}", other),
                location: loc,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::{parse_source, Parser};

    fn expr(src: &str) -> AstNode {
        Parser::new(src).unwrap().parse_expression().unwrap()
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        match expr("1 + 2 * 3") {
            AstNode::BinaryOp {
                op: BinOp::Add,
                right,
                ..
            } => assert!(matches!(*right, AstNode::BinaryOp { op: BinOp::Mul, .. })),
            other => panic!("Unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_left_associative_subtraction() {
        // t1 - t2 + t3 parses as (t1 - t2) + t3
        match expr("t1 - t2 + t3") {
            AstNode::BinaryOp {
                op: BinOp::Add,
                left,
                ..
            } => assert!(matches!(*left, AstNode::BinaryOp { op: BinOp::Sub, .. })),
            other => panic!("Unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_prefix_and_postfix() {
        assert!(matches!(expr("++a"), AstNode::UnaryOp { op: UnOp::PreInc, .. }));
        assert!(matches!(expr("a--"), AstNode::UnaryOp { op: UnOp::PostDec, .. }));
        // -a++ is -(a++)
        match expr("-a++") {
            AstNode::UnaryOp {
                op: UnOp::Neg,
                operand,
                ..
            } => assert!(matches!(*operand, AstNode::UnaryOp { op: UnOp::PostInc, .. })),
            other => panic!("Unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_increment_requires_variable() {
        let err = Parser::new("++(a + 1)").unwrap().parse_expression().unwrap_err();
        assert!(err.message.contains("not assignable"));
        let err = Parser::new("3++").unwrap().parse_expression().unwrap_err();
        assert!(err.message.contains("not assignable"));
    }

    #[test]
    fn test_assignment_is_right_associative() {
        match expr("a = b += 2") {
            AstNode::Assignment { rhs, .. } => assert!(matches!(
                *rhs,
                AstNode::CompoundAssignment { op: BinOp::Add, .. }
            )),
            other => panic!("Unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_cast_and_sizeof() {
        assert!(matches!(expr("(unsigned char)300"), AstNode::Cast { .. }));
        assert!(matches!(expr("sizeof(long)"), AstNode::SizeofType { .. }));
        assert!(matches!(expr("sizeof x"), AstNode::SizeofExpr { .. }));
        // a parenthesised variable is not a cast
        assert!(matches!(expr("(x) - 1"), AstNode::BinaryOp { op: BinOp::Sub, .. }));
    }

    #[test]
    fn test_call_arguments_stop_at_comma() {
        let src = "int f(int a, int b) { return a; } int main() { return f(1, 2), 3; }";
        let program = parse_source(src).unwrap();
        let main = program.functions().find(|f| f.name == "main").unwrap();
        match &main.body[0] {
            AstNode::Return { expr: Some(e), .. } => match &**e {
                AstNode::Comma { left, .. } => match &**left {
                    AstNode::FunctionCall { args, .. } => assert_eq!(args.len(), 2),
                    other => panic!("Unexpected tree: {:?}", other),
                },
                other => panic!("Unexpected tree: {:?}", other),
            },
            other => panic!("Unexpected statement: {:?}", other),
        }
    }
}

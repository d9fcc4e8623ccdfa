//! Statement parsing implementation
//!
//! This module handles parsing of all C statement types:
//!
//! - Variable declarations: `int x = 42, y;`
//! - Control flow: `if`, `while`, `for`, `do-while`, `switch`
//! - Jump statements: `return`, `break`, `continue`
//! - Compound statements: `{ ... }`
//! - Expression statements and the empty statement `;`
//!
//! # Grammar
//!
//! ```text
//! statement ::= var_decl | if_stmt | while_stmt | for_stmt
//!             | do_while_stmt | switch_stmt | return_stmt
//!             | break_stmt | continue_stmt | block | expr_stmt | ";"
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse block statements (inside braces, excluding the braces themselves)
    pub(crate) fn parse_block_statements(
        &mut self,
    ) -> Result<Vec<AstNode>, ParseError> {
        let mut statements = Vec::new();

        while !self.check(&Token::RBrace(self.current_location())) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        Ok(statements)
    }

    /// Parse a statement
    pub(crate) fn parse_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.current_location();

        if self.match_token(&Token::Return(loc)) {
            return self.parse_return_statement();
        }

        if self.match_token(&Token::If(loc)) {
            return self.parse_if_statement();
        }

        if self.match_token(&Token::While(loc)) {
            return self.parse_while_statement();
        }

        if self.match_token(&Token::Do(loc)) {
            return self.parse_do_while_statement();
        }

        if self.match_token(&Token::For(loc)) {
            return self.parse_for_statement();
        }

        if self.match_token(&Token::Switch(loc)) {
            return self.parse_switch_statement();
        }

        if self.match_token(&Token::Break(loc)) {
            self.expect_semicolon("after 'break'")?;
            return Ok(AstNode::Break { location: loc });
        }

        if self.match_token(&Token::Continue(loc)) {
            self.expect_semicolon("after 'continue'")?;
            return Ok(AstNode::Continue { location: loc });
        }

        if self.match_token(&Token::Semicolon(loc)) {
            return Ok(AstNode::Empty { location: loc });
        }

        if self.match_token(&Token::LBrace(loc)) {
            let statements = self.parse_block_statements()?;
            self.expect_rbrace("after block")?;
            return Ok(AstNode::Block {
                statements,
                location: loc,
            });
        }

        if self.is_type_keyword() {
            return self.parse_variable_declaration();
        }

        let expr = self.parse_expression()?;
        self.expect_semicolon("after expression")?;
        Ok(AstNode::ExpressionStatement {
            expr: Box::new(expr),
            location: loc,
        })
    }

    /// Parse return statement
    fn parse_return_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        let expr = if self.check(&Token::Semicolon(self.current_location())) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        self.expect_semicolon("after return")?;

        Ok(AstNode::Return {
            expr,
            location: loc,
        })
    }

    /// Parse if statement
    fn parse_if_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        self.expect_lparen("after 'if'")?;
        let condition = Box::new(self.parse_expression()?);
        self.expect_rparen("after if condition")?;

        let then_branch = self.parse_statement_or_block()?;

        let else_branch = if self.match_token(&Token::Else(self.current_location())) {
            Some(self.parse_statement_or_block()?)
        } else {
            None
        };

        Ok(AstNode::If {
            condition,
            then_branch,
            else_branch,
            location: loc,
        })
    }

    /// Parse while statement
    fn parse_while_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        self.expect_lparen("after 'while'")?;
        let condition = Box::new(self.parse_expression()?);
        self.expect_rparen("after while condition")?;

        let body = self.parse_statement_or_block()?;

        Ok(AstNode::While {
            condition,
            body,
            location: loc,
        })
    }

    /// Parse do-while statement
    fn parse_do_while_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        let body = self.parse_statement_or_block()?;

        self.expect_token(
            &Token::While(self.current_location()),
            "Expected 'while' after do body",
        )?;
        self.expect_lparen("after 'while'")?;
        let condition = Box::new(self.parse_expression()?);
        self.expect_rparen("after do-while condition")?;
        self.expect_semicolon("after do-while")?;

        Ok(AstNode::DoWhile {
            body,
            condition,
            location: loc,
        })
    }

    /// Parse for statement
    fn parse_for_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        self.expect_lparen("after 'for'")?;

        let init = if self.match_token(&Token::Semicolon(self.current_location())) {
            None
        } else if self.is_type_keyword() {
            // Declaration includes its semicolon
            Some(Box::new(self.parse_variable_declaration()?))
        } else {
            let expr_loc = self.current_location();
            let expr = self.parse_expression()?;
            self.expect_semicolon("after for init")?;
            Some(Box::new(AstNode::ExpressionStatement {
                expr: Box::new(expr),
                location: expr_loc,
            }))
        };

        let condition = if self.check(&Token::Semicolon(self.current_location())) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect_semicolon("after for condition")?;

        let increment = if self.check(&Token::RParen(self.current_location())) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect_rparen("after for clauses")?;

        let body = self.parse_statement_or_block()?;

        Ok(AstNode::For {
            init,
            condition,
            increment,
            body,
            location: loc,
        })
    }

    /// Parse switch statement
    fn parse_switch_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        self.expect_lparen("after 'switch'")?;
        let expr = Box::new(self.parse_expression()?);
        self.expect_rparen("after switch expression")?;
        self.expect_lbrace("before switch body")?;

        let mut cases = Vec::new();
        let mut seen_default = false;

        while !self.check(&Token::RBrace(self.current_location())) && !self.is_at_end() {
            if self.match_token(&Token::Case(self.current_location())) {
                let case_loc = self.previous_location();
                let value = self.parse_ternary()?;
                self.expect_token(
                    &Token::Colon(self.current_location()),
                    "Expected ':' after case value",
                )?;
                let statements = self.parse_case_statements()?;

                cases.push(CaseNode::Case {
                    value: Box::new(value),
                    statements,
                    location: case_loc,
                });
            } else if self.match_token(&Token::Default(self.current_location())) {
                let default_loc = self.previous_location();
                if seen_default {
                    return Err(ParseError {
                        message: "Multiple 'default' labels in one switch".to_string(),
                        location: default_loc,
                    });
                }
                seen_default = true;
                self.expect_token(
                    &Token::Colon(self.current_location()),
                    "Expected ':' after 'default'",
                )?;
                let statements = self.parse_case_statements()?;

                cases.push(CaseNode::Default {
                    statements,
                    location: default_loc,
                });
            } else {
                return Err(ParseError {
                    message: "Expected 'case' or 'default' in switch body".to_string(),
                    location: self.current_location(),
                });
            }
        }

        self.expect_rbrace("after switch body")?;

        Ok(AstNode::Switch {
            expr,
            cases,
            location: loc,
        })
    }

    /// Statements following a case label, up to the next label or the closing brace
    fn parse_case_statements(&mut self) -> Result<Vec<AstNode>, ParseError> {
        let mut statements = Vec::new();
        while !self.check(&Token::Case(self.current_location()))
            && !self.check(&Token::Default(self.current_location()))
            && !self.check(&Token::RBrace(self.current_location()))
            && !self.is_at_end()
        {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    /// Parse a local declaration including its semicolon: `int a = 1, b;`
    pub(crate) fn parse_variable_declaration(
        &mut self,
    ) -> Result<AstNode, ParseError> {
        let loc = self.current_location();
        let var_type = self.parse_type()?;
        let decl = self.parse_declarators(var_type, loc)?;
        self.expect_semicolon("after variable declaration")?;
        Ok(decl)
    }

    /// Parse statement or block (for if/while/for bodies)
    pub(crate) fn parse_statement_or_block(
        &mut self,
    ) -> Result<Vec<AstNode>, ParseError> {
        if self.match_token(&Token::LBrace(self.current_location())) {
            let statements = self.parse_block_statements()?;
            self.expect_rbrace("after block")?;
            Ok(statements)
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }
}

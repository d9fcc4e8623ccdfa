//! Declaration parsing implementation
//!
//! This module handles parsing of top-level declarations in C programs:
//!
//! - Global variables: `int a = 1, b;`
//! - Function prototypes: `int f(int);`
//! - Function definitions: `type name(params) { ... }`
//! - Type specifiers: any order of `const signed unsigned char short int long void`
//!
//! # Grammar
//!
//! ```text
//! declaration  ::= type declarator ("," declarator)* ";"
//!                | type identifier "(" params ")" (";" | "{" statements "}")
//! declarator   ::= identifier ("=" assignment_expr)?
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse a top-level declaration (global, prototype or function definition)
    pub(crate) fn parse_top_level_declaration(
        &mut self,
    ) -> Result<AstNode, ParseError> {
        let type_loc = self.current_location();
        let base_type = self.parse_type()?;

        // `type name (` starts a function, anything else is a global
        let is_function = matches!(self.peek(), Token::Ident(_, _))
            && matches!(self.peek_ahead(1), Some(Token::LParen(_)));

        if is_function {
            self.parse_function(base_type)
        } else {
            let decl = self.parse_declarators(base_type, type_loc)?;
            self.expect_semicolon("after global declaration")?;
            Ok(decl)
        }
    }

    /// Parse the rest of a function after its return type
    fn parse_function(&mut self, return_type: Type) -> Result<AstNode, ParseError> {
        let name = self.expect_identifier()?;
        let loc = self.previous_location();

        self.expect_lparen("after function name")?;
        let params = self.parse_parameter_list()?;
        self.expect_rparen("after parameters")?;

        if self.match_token(&Token::Semicolon(self.current_location())) {
            return Ok(AstNode::FunctionDecl {
                name,
                params,
                return_type,
                location: loc,
            });
        }

        if let Some(unnamed) = params.iter().position(|p| p.name.is_none()) {
            return Err(ParseError {
                message: format!(
                    "Parameter {} of function '{}' has no name",
                    unnamed + 1,
                    name
                ),
                location: loc,
            });
        }

        self.expect_lbrace("before function body")?;
        let body = self.parse_block_statements()?;
        self.expect_rbrace("after function body")?;

        Ok(AstNode::FunctionDef {
            name,
            params,
            return_type,
            body,
            location: loc,
        })
    }

    /// Parse parameter list: (type name, type name, ...)
    pub(crate) fn parse_parameter_list(
        &mut self,
    ) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();

        if self.check(&Token::RParen(self.current_location())) {
            return Ok(params);
        }

        // Special case: (void) means no parameters in C
        if self.check(&Token::Void(self.current_location()))
            && matches!(self.peek_ahead(1), Some(Token::RParen(_)))
        {
            self.advance();
            return Ok(params);
        }

        loop {
            let param_loc = self.current_location();
            let param_type = self.parse_type()?;
            if param_type.is_void() {
                return Err(ParseError {
                    message: "Parameter cannot have type void".to_string(),
                    location: param_loc,
                });
            }
            let name = match self.peek() {
                Token::Ident(_, _) => Some(self.expect_identifier()?),
                _ => None,
            };
            params.push(Param { name, param_type });

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        Ok(params)
    }

    /// Parse `name [= init] (, name [= init])*` after a type, without the
    /// trailing semicolon
    pub(crate) fn parse_declarators(
        &mut self,
        var_type: Type,
        location: SourceLocation,
    ) -> Result<AstNode, ParseError> {
        if var_type.is_void() {
            return Err(ParseError {
                message: "Variable declared with type void".to_string(),
                location,
            });
        }

        let mut declarators = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let decl_loc = self.previous_location();
            let init = if self.match_token(&Token::Eq(self.current_location())) {
                Some(Box::new(self.parse_assignment()?))
            } else {
                None
            };
            declarators.push(Declarator {
                name,
                init,
                location: decl_loc,
            });

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        Ok(AstNode::VarDecl {
            var_type,
            declarators,
            location,
        })
    }

    /// Parse type specifiers: any order of `const`, `signed`, `unsigned`,
    /// `char`, `short`, `int`, `long`, or a lone `void`
    pub(crate) fn parse_type(&mut self) -> Result<Type, ParseError> {
        let loc = self.current_location();
        let mut is_const = false;
        let mut signed = false;
        let mut unsigned = false;
        let mut void = false;
        let mut char_ = false;
        let mut short = false;
        let mut int = false;
        let mut longs = 0usize;
        let mut seen_any = false;

        loop {
            match self.peek() {
                Token::Const(_) => is_const = true,
                Token::Signed(_) => signed = true,
                Token::Unsigned(_) => unsigned = true,
                Token::Void(_) => void = true,
                Token::Char(_) => char_ = true,
                Token::Short(_) => short = true,
                Token::Int(_) => int = true,
                Token::Long(_) => longs += 1,
                _ => break,
            }
            seen_any = true;
            self.advance();
        }

        if !seen_any {
            return Err(ParseError {
                message: format!("Expected type, found {}", self.peek()),
                location: loc,
            });
        }

        let invalid = |what: &str| ParseError {
            message: format!("Invalid type specifier combination: {}", what),
            location: loc,
        };

        if signed && unsigned {
            return Err(invalid("both 'signed' and 'unsigned'"));
        }
        if longs > 2 {
            return Err(invalid("'long long long'"));
        }
        if void {
            if signed || unsigned || char_ || short || int || longs > 0 {
                return Err(invalid("'void' with other specifiers"));
            }
            let ty = Type::void();
            return Ok(if is_const { ty.with_const() } else { ty });
        }

        let kind = if char_ {
            if short || int || longs > 0 {
                return Err(invalid("'char' with a size or 'int'"));
            }
            if unsigned {
                IntKind::UChar
            } else {
                IntKind::Char
            }
        } else if short {
            if longs > 0 {
                return Err(invalid("'short' with 'long'"));
            }
            if unsigned {
                IntKind::UShort
            } else {
                IntKind::Short
            }
        } else if longs > 0 {
            if unsigned {
                IntKind::ULong
            } else {
                IntKind::Long
            }
        } else if unsigned {
            IntKind::UInt
        } else if int || signed {
            IntKind::Int
        } else {
            // bare `const`
            return Err(ParseError {
                message: format!("Expected type after 'const', found {}", self.peek()),
                location: self.current_location(),
            });
        };

        let ty = Type::int(kind);
        Ok(if is_const { ty.with_const() } else { ty })
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::{parse_source, Parser};

    fn parse_type(src: &str) -> Type {
        Parser::new(src).unwrap().parse_type().unwrap()
    }

    #[test]
    fn test_type_specifier_combinations() {
        assert_eq!(parse_type("int").int_kind(), Some(IntKind::Int));
        assert_eq!(parse_type("unsigned").int_kind(), Some(IntKind::UInt));
        assert_eq!(parse_type("long unsigned int").int_kind(), Some(IntKind::ULong));
        assert_eq!(parse_type("long long").int_kind(), Some(IntKind::Long));
        assert_eq!(parse_type("signed char").int_kind(), Some(IntKind::Char));
        assert_eq!(parse_type("short int").int_kind(), Some(IntKind::Short));
        assert!(parse_type("const int").is_const);
        assert!(parse_type("void").is_void());
    }

    #[test]
    fn test_invalid_type_combination() {
        let err = Parser::new("unsigned signed x").unwrap().parse_type().unwrap_err();
        assert!(err.message.contains("Invalid type specifier"));
    }

    #[test]
    fn test_prototype_and_definition() {
        let program = parse_source("int f(int);\nint f(int x) { return x; }").unwrap();
        assert!(matches!(program.nodes[0], AstNode::FunctionDecl { .. }));
        assert!(matches!(program.nodes[1], AstNode::FunctionDef { .. }));
    }

    #[test]
    fn test_definition_requires_parameter_names() {
        let err = parse_source("int f(int) { return 0; }").unwrap_err();
        assert!(err.message.contains("has no name"));
    }

    #[test]
    fn test_void_parameter_list() {
        let program = parse_source("int main(void) { return 0; }").unwrap();
        match &program.nodes[0] {
            AstNode::FunctionDef { params, .. } => assert!(params.is_empty()),
            _ => panic!("Expected function definition"),
        }
    }
}

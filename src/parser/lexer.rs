//! Lexer (tokenizer) for C source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! Preprocessor directives (`#include`, `#define`, ...) are silently skipped
//! rather than parsed; fixtures are expected to be self-contained.
//!
//! Integer literals are typed here, following the C rules for the first kind
//! in the candidate list that can represent the value.

use super::ast::{IntKind, SourceLocation};
use std::fmt;

/// All token variants produced by the lexer.
///
/// Every variant carries a [`SourceLocation`] so that parse errors can report
/// an accurate line and column without a separate token→location table.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    IntLiteral(i128, IntKind, SourceLocation),
    CharLiteral(i8, SourceLocation),

    // Identifiers
    Ident(String, SourceLocation),

    // Type keywords
    Int(SourceLocation),
    Char(SourceLocation),
    Short(SourceLocation),
    Long(SourceLocation),
    Signed(SourceLocation),
    Unsigned(SourceLocation),
    Void(SourceLocation),
    Const(SourceLocation),

    // Statement keywords
    If(SourceLocation),
    Else(SourceLocation),
    While(SourceLocation),
    Do(SourceLocation),
    For(SourceLocation),
    Switch(SourceLocation),
    Case(SourceLocation),
    Default(SourceLocation),
    Break(SourceLocation),
    Continue(SourceLocation),
    Return(SourceLocation),
    Sizeof(SourceLocation),

    // Arithmetic
    Plus(SourceLocation),    // +
    Minus(SourceLocation),   // -
    Star(SourceLocation),    // *
    Slash(SourceLocation),   // /
    Percent(SourceLocation), // %

    // Comparison
    EqEq(SourceLocation),  // ==
    NotEq(SourceLocation), // !=
    Lt(SourceLocation),    // <
    Le(SourceLocation),    // <=
    Gt(SourceLocation),    // >
    Ge(SourceLocation),    // >=

    // Logical
    AndAnd(SourceLocation), // &&
    OrOr(SourceLocation),   // ||
    Bang(SourceLocation),   // !

    // Bitwise
    Amp(SourceLocation),   // &
    Pipe(SourceLocation),  // |
    Caret(SourceLocation), // ^
    Tilde(SourceLocation), // ~
    LtLt(SourceLocation),  // <<
    GtGt(SourceLocation),  // >>

    // Assignment
    Eq(SourceLocation),        // =
    PlusEq(SourceLocation),    // +=
    MinusEq(SourceLocation),   // -=
    StarEq(SourceLocation),    // *=
    SlashEq(SourceLocation),   // /=
    PercentEq(SourceLocation), // %=
    AmpEq(SourceLocation),     // &=
    PipeEq(SourceLocation),    // |=
    CaretEq(SourceLocation),   // ^=
    LtLtEq(SourceLocation),    // <<=
    GtGtEq(SourceLocation),    // >>=

    // Increment/Decrement
    PlusPlus(SourceLocation),   // ++
    MinusMinus(SourceLocation), // --

    // Ternary
    Question(SourceLocation), // ?
    Colon(SourceLocation),    // :

    // Punctuation
    LParen(SourceLocation),    // (
    RParen(SourceLocation),    // )
    LBrace(SourceLocation),    // {
    RBrace(SourceLocation),    // }
    Semicolon(SourceLocation), // ;
    Comma(SourceLocation),     // ,

    // End of file
    Eof(SourceLocation),
}

impl Token {
    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::IntLiteral(_, _, loc)
            | Token::CharLiteral(_, loc)
            | Token::Ident(_, loc)
            | Token::Int(loc)
            | Token::Char(loc)
            | Token::Short(loc)
            | Token::Long(loc)
            | Token::Signed(loc)
            | Token::Unsigned(loc)
            | Token::Void(loc)
            | Token::Const(loc)
            | Token::If(loc)
            | Token::Else(loc)
            | Token::While(loc)
            | Token::Do(loc)
            | Token::For(loc)
            | Token::Switch(loc)
            | Token::Case(loc)
            | Token::Default(loc)
            | Token::Break(loc)
            | Token::Continue(loc)
            | Token::Return(loc)
            | Token::Sizeof(loc)
            | Token::Plus(loc)
            | Token::Minus(loc)
            | Token::Star(loc)
            | Token::Slash(loc)
            | Token::Percent(loc)
            | Token::EqEq(loc)
            | Token::NotEq(loc)
            | Token::Lt(loc)
            | Token::Le(loc)
            | Token::Gt(loc)
            | Token::Ge(loc)
            | Token::AndAnd(loc)
            | Token::OrOr(loc)
            | Token::Bang(loc)
            | Token::Amp(loc)
            | Token::Pipe(loc)
            | Token::Caret(loc)
            | Token::Tilde(loc)
            | Token::LtLt(loc)
            | Token::GtGt(loc)
            | Token::Eq(loc)
            | Token::PlusEq(loc)
            | Token::MinusEq(loc)
            | Token::StarEq(loc)
            | Token::SlashEq(loc)
            | Token::PercentEq(loc)
            | Token::AmpEq(loc)
            | Token::PipeEq(loc)
            | Token::CaretEq(loc)
            | Token::LtLtEq(loc)
            | Token::GtGtEq(loc)
            | Token::PlusPlus(loc)
            | Token::MinusMinus(loc)
            | Token::Question(loc)
            | Token::Colon(loc)
            | Token::LParen(loc)
            | Token::RParen(loc)
            | Token::LBrace(loc)
            | Token::RBrace(loc)
            | Token::Semicolon(loc)
            | Token::Comma(loc)
            | Token::Eof(loc) => *loc,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::IntLiteral(n, kind, _) => write!(f, "{} literal {}", kind, n),
            Token::CharLiteral(c, _) => {
                let byte = *c as u8;
                if byte.is_ascii_graphic() || byte == b' ' {
                    write!(f, "char literal '{}'", byte as char)
                } else {
                    write!(f, "char literal '\\x{:02x}'", byte)
                }
            }
            Token::Ident(s, _) => write!(f, "identifier '{}'", s),
            Token::Int(_) => write!(f, "'int'"),
            Token::Char(_) => write!(f, "'char'"),
            Token::Short(_) => write!(f, "'short'"),
            Token::Long(_) => write!(f, "'long'"),
            Token::Signed(_) => write!(f, "'signed'"),
            Token::Unsigned(_) => write!(f, "'unsigned'"),
            Token::Void(_) => write!(f, "'void'"),
            Token::Const(_) => write!(f, "'const'"),
            Token::If(_) => write!(f, "'if'"),
            Token::Else(_) => write!(f, "'else'"),
            Token::While(_) => write!(f, "'while'"),
            Token::Do(_) => write!(f, "'do'"),
            Token::For(_) => write!(f, "'for'"),
            Token::Switch(_) => write!(f, "'switch'"),
            Token::Case(_) => write!(f, "'case'"),
            Token::Default(_) => write!(f, "'default'"),
            Token::Break(_) => write!(f, "'break'"),
            Token::Continue(_) => write!(f, "'continue'"),
            Token::Return(_) => write!(f, "'return'"),
            Token::Sizeof(_) => write!(f, "'sizeof'"),
            Token::Plus(_) => write!(f, "'+'"),
            Token::Minus(_) => write!(f, "'-'"),
            Token::Star(_) => write!(f, "'*'"),
            Token::Slash(_) => write!(f, "'/'"),
            Token::Percent(_) => write!(f, "'%'"),
            Token::EqEq(_) => write!(f, "'=='"),
            Token::NotEq(_) => write!(f, "'!='"),
            Token::Lt(_) => write!(f, "'<'"),
            Token::Le(_) => write!(f, "'<='"),
            Token::Gt(_) => write!(f, "'>'"),
            Token::Ge(_) => write!(f, "'>='"),
            Token::AndAnd(_) => write!(f, "'&&'"),
            Token::OrOr(_) => write!(f, "'||'"),
            Token::Bang(_) => write!(f, "'!'"),
            Token::Amp(_) => write!(f, "'&'"),
            Token::Pipe(_) => write!(f, "'|'"),
            Token::Caret(_) => write!(f, "'^'"),
            Token::Tilde(_) => write!(f, "'~'"),
            Token::LtLt(_) => write!(f, "'<<'"),
            Token::GtGt(_) => write!(f, "'>>'"),
            Token::Eq(_) => write!(f, "'='"),
            Token::PlusEq(_) => write!(f, "'+='"),
            Token::MinusEq(_) => write!(f, "'-='"),
            Token::StarEq(_) => write!(f, "'*='"),
            Token::SlashEq(_) => write!(f, "'/='"),
            Token::PercentEq(_) => write!(f, "'%='"),
            Token::AmpEq(_) => write!(f, "'&='"),
            Token::PipeEq(_) => write!(f, "'|='"),
            Token::CaretEq(_) => write!(f, "'^='"),
            Token::LtLtEq(_) => write!(f, "'<<='"),
            Token::GtGtEq(_) => write!(f, "'>>='"),
            Token::PlusPlus(_) => write!(f, "'++'"),
            Token::MinusMinus(_) => write!(f, "'--'"),
            Token::Question(_) => write!(f, "'?'"),
            Token::Colon(_) => write!(f, "':'"),
            Token::LParen(_) => write!(f, "'('"),
            Token::RParen(_) => write!(f, "')'"),
            Token::LBrace(_) => write!(f, "'{{'"),
            Token::RBrace(_) => write!(f, "'}}'"),
            Token::Semicolon(_) => write!(f, "';'"),
            Token::Comma(_) => write!(f, "','"),
            Token::Eof(_) => write!(f, "end of file"),
        }
    }
}

/// Lexer error type
#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lexer error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for LexError {}

/// Lexer for C source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments()?;

            if self.is_at_end() {
                tokens.push(Token::Eof(self.current_location()));
                break;
            }

            if self.peek() == Some('#') {
                self.skip_preprocessor_directive();
                continue;
            }

            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    /// Get next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file".to_string(),
            location: loc,
        })?;

        match ch {
            '\'' => self.char_literal(),
            '0'..='9' => self.number_literal(ch),
            'a'..='z' | 'A'..='Z' | '_' => Ok(self.identifier_or_keyword(ch)),

            '+' => Ok(if self.eat('+') {
                Token::PlusPlus(loc)
            } else if self.eat('=') {
                Token::PlusEq(loc)
            } else {
                Token::Plus(loc)
            }),
            '-' => Ok(if self.eat('-') {
                Token::MinusMinus(loc)
            } else if self.eat('=') {
                Token::MinusEq(loc)
            } else {
                Token::Minus(loc)
            }),
            '*' => Ok(if self.eat('=') { Token::StarEq(loc) } else { Token::Star(loc) }),
            '/' => Ok(if self.eat('=') { Token::SlashEq(loc) } else { Token::Slash(loc) }),
            '%' => Ok(if self.eat('=') { Token::PercentEq(loc) } else { Token::Percent(loc) }),
            '=' => Ok(if self.eat('=') { Token::EqEq(loc) } else { Token::Eq(loc) }),
            '!' => Ok(if self.eat('=') { Token::NotEq(loc) } else { Token::Bang(loc) }),
            '^' => Ok(if self.eat('=') { Token::CaretEq(loc) } else { Token::Caret(loc) }),
            '&' => Ok(if self.eat('&') {
                Token::AndAnd(loc)
            } else if self.eat('=') {
                Token::AmpEq(loc)
            } else {
                Token::Amp(loc)
            }),
            '|' => Ok(if self.eat('|') {
                Token::OrOr(loc)
            } else if self.eat('=') {
                Token::PipeEq(loc)
            } else {
                Token::Pipe(loc)
            }),
            '<' => Ok(if self.eat('<') {
                if self.eat('=') {
                    Token::LtLtEq(loc)
                } else {
                    Token::LtLt(loc)
                }
            } else if self.eat('=') {
                Token::Le(loc)
            } else {
                Token::Lt(loc)
            }),
            '>' => Ok(if self.eat('>') {
                if self.eat('=') {
                    Token::GtGtEq(loc)
                } else {
                    Token::GtGt(loc)
                }
            } else if self.eat('=') {
                Token::Ge(loc)
            } else {
                Token::Gt(loc)
            }),
            '~' => Ok(Token::Tilde(loc)),
            '?' => Ok(Token::Question(loc)),
            ':' => Ok(Token::Colon(loc)),
            '(' => Ok(Token::LParen(loc)),
            ')' => Ok(Token::RParen(loc)),
            '{' => Ok(Token::LBrace(loc)),
            '}' => Ok(Token::RBrace(loc)),
            ';' => Ok(Token::Semicolon(loc)),
            ',' => Ok(Token::Comma(loc)),

            _ => Err(LexError {
                message: format!("Unexpected character: '{}'", ch),
                location: loc,
            }),
        }
    }

    /// Consume `expected` if it is the next character
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Parse character literal
    fn char_literal(&mut self) -> Result<Token, LexError> {
        let loc = SourceLocation::new(self.line, self.column - 1);

        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file in character literal".to_string(),
            location: self.current_location(),
        })?;

        let value = if ch == '\\' {
            let escaped = self.advance().ok_or_else(|| LexError {
                message: "Unexpected end of file in character literal".to_string(),
                location: self.current_location(),
            })?;

            match escaped {
                'n' => b'\n' as i8,
                't' => b'\t' as i8,
                'r' => b'\r' as i8,
                '\\' => b'\\' as i8,
                '\'' => b'\'' as i8,
                '"' => b'"' as i8,
                '0' => 0,
                'x' => {
                    let mut hex_str = String::new();
                    while let Some(h) = self.peek() {
                        if h.is_ascii_hexdigit() && hex_str.len() < 2 {
                            hex_str.push(h);
                            self.advance();
                        } else {
                            break;
                        }
                    }
                    u8::from_str_radix(&hex_str, 16)
                        .map(|v| v as i8)
                        .map_err(|_| LexError {
                            message: format!("Invalid hex escape sequence: \\x{}", hex_str),
                            location: self.current_location(),
                        })?
                }
                _ => {
                    return Err(LexError {
                        message: format!("Unknown escape sequence: \\{}", escaped),
                        location: self.current_location(),
                    });
                }
            }
        } else if ch.is_ascii() {
            ch as u8 as i8
        } else {
            return Err(LexError {
                message: format!("Non-ASCII character literal: '{}'", ch),
                location: loc,
            });
        };

        if self.advance() != Some('\'') {
            return Err(LexError {
                message: "Expected closing quote in character literal".to_string(),
                location: self.current_location(),
            });
        }

        Ok(Token::CharLiteral(value, loc))
    }

    /// Parse an integer literal with optional `0x`/octal prefix and `u`/`l` suffixes
    fn number_literal(&mut self, first_digit: char) -> Result<Token, LexError> {
        let loc = SourceLocation::new(self.line, self.column - 1);

        let radix = if first_digit == '0' && matches!(self.peek(), Some('x') | Some('X')) {
            self.advance();
            16
        } else if first_digit == '0' {
            8
        } else {
            10
        };

        let mut digits = String::new();
        if radix != 16 {
            digits.push(first_digit);
        }
        while let Some(ch) = self.peek() {
            if ch.is_digit(radix) {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let mut suffix = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                suffix.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if digits.is_empty() {
            return Err(LexError {
                message: "Hexadecimal literal has no digits".to_string(),
                location: loc,
            });
        }

        let value = u64::from_str_radix(&digits, radix).map_err(|_| LexError {
            message: format!("Integer literal out of range: {}", digits),
            location: loc,
        })? as i128;

        let lower = suffix.to_ascii_lowercase();
        let (is_unsigned, is_long) = match lower.as_str() {
            "" => (false, false),
            "u" => (true, false),
            "l" | "ll" => (false, true),
            "ul" | "lu" | "ull" | "llu" => (true, true),
            _ => {
                return Err(LexError {
                    message: format!("Invalid integer suffix: '{}'", suffix),
                    location: loc,
                });
            }
        };

        let candidates: &[IntKind] = match (radix == 10, is_unsigned, is_long) {
            (true, false, false) => &[IntKind::Int, IntKind::Long],
            (true, false, true) => &[IntKind::Long],
            (false, false, false) => &[IntKind::Int, IntKind::UInt, IntKind::Long, IntKind::ULong],
            (false, false, true) => &[IntKind::Long, IntKind::ULong],
            (_, true, false) => &[IntKind::UInt, IntKind::ULong],
            (_, true, true) => &[IntKind::ULong],
        };

        let kind = candidates
            .iter()
            .copied()
            .find(|kind| value <= kind.max_value())
            .ok_or_else(|| LexError {
                message: format!("Integer literal too large for its type: {}", digits),
                location: loc,
            })?;

        Ok(Token::IntLiteral(value, kind, loc))
    }

    /// Parse identifier or keyword
    fn identifier_or_keyword(&mut self, first_char: char) -> Token {
        let loc = SourceLocation::new(self.line, self.column - 1);
        let mut ident = String::new();
        ident.push(first_char);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match ident.as_str() {
            "int" => Token::Int(loc),
            "char" => Token::Char(loc),
            "short" => Token::Short(loc),
            "long" => Token::Long(loc),
            "signed" => Token::Signed(loc),
            "unsigned" => Token::Unsigned(loc),
            "void" => Token::Void(loc),
            "const" => Token::Const(loc),
            "if" => Token::If(loc),
            "else" => Token::Else(loc),
            "while" => Token::While(loc),
            "do" => Token::Do(loc),
            "for" => Token::For(loc),
            "switch" => Token::Switch(loc),
            "case" => Token::Case(loc),
            "default" => Token::Default(loc),
            "break" => Token::Break(loc),
            "continue" => Token::Continue(loc),
            "return" => Token::Return(loc),
            "sizeof" => Token::Sizeof(loc),
            _ => Token::Ident(ident, loc),
        }
    }

    /// Skip whitespace and comments
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                    self.advance();
                }
                Some('/') => {
                    if self.peek_ahead(1) == Some('/') {
                        self.skip_line_comment();
                    } else if self.peek_ahead(1) == Some('*') {
                        self.skip_block_comment()?;
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Skip single-line comment (// ...)
    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            self.advance();
            if ch == '\n' {
                break;
            }
        }
    }

    /// Skip multi-line comment (/* ... */)
    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start_loc = self.current_location();
        self.advance(); // skip '/'
        self.advance(); // skip '*'

        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some('/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }

        Err(LexError {
            message: "Unterminated block comment".to_string(),
            location: start_loc,
        })
    }

    /// Skip a preprocessor directive, honouring backslash line continuations
    fn skip_preprocessor_directive(&mut self) {
        let mut escaped = false;
        while let Some(ch) = self.peek() {
            self.advance();
            if ch == '\n' && !escaped {
                break;
            }
            escaped = ch == '\\';
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

// AST (Abstract Syntax Tree) definitions for the fixture interpreter

use std::fmt;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Integer kinds of the supported C subset (LP64 data model).
///
/// Plain `char` is signed. `long long` is parsed as [`IntKind::Long`], which
/// already has 64 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntKind {
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
}

impl IntKind {
    /// Width in bits
    pub fn bits(self) -> u32 {
        match self {
            IntKind::Char | IntKind::UChar => 8,
            IntKind::Short | IntKind::UShort => 16,
            IntKind::Int | IntKind::UInt => 32,
            IntKind::Long | IntKind::ULong => 64,
        }
    }

    /// Size in bytes, as reported by `sizeof`
    pub fn size(self) -> usize {
        (self.bits() / 8) as usize
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            IntKind::Char | IntKind::Short | IntKind::Int | IntKind::Long
        )
    }

    /// Integer conversion rank (C11 6.3.1.1)
    pub fn rank(self) -> u8 {
        match self {
            IntKind::Char | IntKind::UChar => 1,
            IntKind::Short | IntKind::UShort => 2,
            IntKind::Int | IntKind::UInt => 3,
            IntKind::Long | IntKind::ULong => 4,
        }
    }

    /// Unsigned kind with the same rank
    pub fn to_unsigned(self) -> IntKind {
        match self {
            IntKind::Char | IntKind::UChar => IntKind::UChar,
            IntKind::Short | IntKind::UShort => IntKind::UShort,
            IntKind::Int | IntKind::UInt => IntKind::UInt,
            IntKind::Long | IntKind::ULong => IntKind::ULong,
        }
    }

    /// Smallest value representable by this kind
    pub fn min_value(self) -> i128 {
        if self.is_signed() {
            -(1i128 << (self.bits() - 1))
        } else {
            0
        }
    }

    /// Largest value representable by this kind
    pub fn max_value(self) -> i128 {
        if self.is_signed() {
            (1i128 << (self.bits() - 1)) - 1
        } else {
            (1i128 << self.bits()) - 1
        }
    }

    /// Integer promotion: every kind ranked below `int` becomes `int`
    /// (all of their values fit in a 32-bit `int`).
    pub fn promote(self) -> IntKind {
        if self.rank() < IntKind::Int.rank() {
            IntKind::Int
        } else {
            self
        }
    }

    /// Usual arithmetic conversions for two operand kinds (C11 6.3.1.8)
    pub fn common(self, other: IntKind) -> IntKind {
        let a = self.promote();
        let b = other.promote();
        if a == b {
            return a;
        }
        if a.is_signed() == b.is_signed() {
            return if a.rank() >= b.rank() { a } else { b };
        }
        let (signed, unsigned) = if a.is_signed() { (a, b) } else { (b, a) };
        if unsigned.rank() >= signed.rank() {
            unsigned
        } else if signed.bits() > unsigned.bits() {
            signed
        } else {
            signed.to_unsigned()
        }
    }
}

impl fmt::Display for IntKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntKind::Char => "char",
            IntKind::UChar => "unsigned char",
            IntKind::Short => "short",
            IntKind::UShort => "unsigned short",
            IntKind::Int => "int",
            IntKind::UInt => "unsigned int",
            IntKind::Long => "long",
            IntKind::ULong => "unsigned long",
        };
        f.write_str(name)
    }
}

/// Base types supported by the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Void,
    Integer(IntKind),
}

/// Type representation with const qualifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Type {
    pub base: BaseType,
    pub is_const: bool,
}

impl Type {
    pub fn new(base: BaseType) -> Self {
        Type {
            base,
            is_const: false,
        }
    }

    pub fn int(kind: IntKind) -> Self {
        Type::new(BaseType::Integer(kind))
    }

    pub fn void() -> Self {
        Type::new(BaseType::Void)
    }

    pub fn with_const(mut self) -> Self {
        self.is_const = true;
        self
    }

    /// Integer kind of this type, `None` for `void`
    pub fn int_kind(&self) -> Option<IntKind> {
        match self.base {
            BaseType::Integer(kind) => Some(kind),
            BaseType::Void => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.base, BaseType::Void)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const {
            write!(f, "const ")?;
        }
        match self.base {
            BaseType::Void => write!(f, "void"),
            BaseType::Integer(kind) => write!(f, "{}", kind),
        }
    }
}

/// Binary operators
///
/// Compound assignments reuse the arithmetic variants (`a += b` is a
/// [`AstNode::CompoundAssignment`] with [`BinOp::Add`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    BitShl,
    BitShr,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitShl => "<<",
            BinOp::BitShr => ">>",
        }
    }

    /// `&&` and `||` evaluate their right operand conditionally
    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,     // -x
    Plus,    // +x
    Not,     // !x
    BitNot,  // ~x
    PreInc,  // ++x
    PreDec,  // --x
    PostInc, // x++
    PostDec, // x--
}

impl UnOp {
    /// Operators that write back to their operand
    pub fn is_inc_dec(self) -> bool {
        matches!(
            self,
            UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec
        )
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, UnOp::PostInc | UnOp::PostDec)
    }

    /// +1 for increments, -1 for decrements, 0 otherwise
    pub fn step(self) -> i128 {
        match self {
            UnOp::PreInc | UnOp::PostInc => 1,
            UnOp::PreDec | UnOp::PostDec => -1,
            _ => 0,
        }
    }
}

/// Function parameter
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Option<String>,
    pub param_type: Type,
}

/// One name introduced by a declaration (`int a = 1, b;` has two)
#[derive(Debug, Clone)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Box<AstNode>>,
    pub location: SourceLocation,
}

/// Switch case
#[derive(Debug, Clone)]
pub enum CaseNode {
    Case {
        value: Box<AstNode>,
        statements: Vec<AstNode>,
        location: SourceLocation,
    },
    Default {
        statements: Vec<AstNode>,
        location: SourceLocation,
    },
}

impl CaseNode {
    pub fn statements(&self) -> &[AstNode] {
        match self {
            CaseNode::Case { statements, .. } | CaseNode::Default { statements, .. } => statements,
        }
    }
}

/// Function definition indexed by name
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<AstNode>,
    pub return_type: Type,
    pub location: SourceLocation,
}

/// AST nodes representing statements and expressions
#[derive(Debug, Clone)]
pub enum AstNode {
    // Top-level declarations
    FunctionDef {
        name: String,
        params: Vec<Param>,
        body: Vec<AstNode>,
        return_type: Type,
        location: SourceLocation,
    },
    FunctionDecl {
        name: String,
        params: Vec<Param>,
        return_type: Type,
        location: SourceLocation,
    },

    // Statements
    VarDecl {
        var_type: Type,
        declarators: Vec<Declarator>,
        location: SourceLocation,
    },
    Return {
        expr: Option<Box<AstNode>>,
        location: SourceLocation,
    },
    If {
        condition: Box<AstNode>,
        then_branch: Vec<AstNode>,
        else_branch: Option<Vec<AstNode>>,
        location: SourceLocation,
    },
    While {
        condition: Box<AstNode>,
        body: Vec<AstNode>,
        location: SourceLocation,
    },
    DoWhile {
        body: Vec<AstNode>,
        condition: Box<AstNode>,
        location: SourceLocation,
    },
    For {
        init: Option<Box<AstNode>>,
        condition: Option<Box<AstNode>>,
        increment: Option<Box<AstNode>>,
        body: Vec<AstNode>,
        location: SourceLocation,
    },
    Switch {
        expr: Box<AstNode>,
        cases: Vec<CaseNode>,
        location: SourceLocation,
    },
    Break {
        location: SourceLocation,
    },
    Continue {
        location: SourceLocation,
    },
    Block {
        statements: Vec<AstNode>,
        location: SourceLocation,
    },
    ExpressionStatement {
        expr: Box<AstNode>,
        location: SourceLocation,
    },
    Empty {
        location: SourceLocation,
    },

    // Expressions
    IntLiteral {
        value: i128,
        kind: IntKind,
        location: SourceLocation,
    },
    Variable(String, SourceLocation),
    Assignment {
        lhs: Box<AstNode>,
        rhs: Box<AstNode>,
        location: SourceLocation,
    },
    CompoundAssignment {
        lhs: Box<AstNode>,
        op: BinOp,
        rhs: Box<AstNode>,
        location: SourceLocation,
    },
    BinaryOp {
        op: BinOp,
        left: Box<AstNode>,
        right: Box<AstNode>,
        location: SourceLocation,
    },
    UnaryOp {
        op: UnOp,
        operand: Box<AstNode>,
        location: SourceLocation,
    },
    TernaryOp {
        condition: Box<AstNode>,
        true_expr: Box<AstNode>,
        false_expr: Box<AstNode>,
        location: SourceLocation,
    },
    Comma {
        left: Box<AstNode>,
        right: Box<AstNode>,
        location: SourceLocation,
    },
    FunctionCall {
        name: String,
        args: Vec<AstNode>,
        location: SourceLocation,
    },
    Cast {
        target_type: Type,
        expr: Box<AstNode>,
        location: SourceLocation,
    },
    SizeofType {
        target_type: Type,
        location: SourceLocation,
    },
    SizeofExpr {
        expr: Box<AstNode>,
        location: SourceLocation,
    },
}

impl AstNode {
    /// Get the source location of this node
    pub fn location(&self) -> SourceLocation {
        match self {
            AstNode::FunctionDef { location, .. }
            | AstNode::FunctionDecl { location, .. }
            | AstNode::VarDecl { location, .. }
            | AstNode::Return { location, .. }
            | AstNode::If { location, .. }
            | AstNode::While { location, .. }
            | AstNode::DoWhile { location, .. }
            | AstNode::For { location, .. }
            | AstNode::Switch { location, .. }
            | AstNode::Break { location }
            | AstNode::Continue { location }
            | AstNode::Block { location, .. }
            | AstNode::ExpressionStatement { location, .. }
            | AstNode::Empty { location }
            | AstNode::IntLiteral { location, .. }
            | AstNode::Variable(_, location)
            | AstNode::Assignment { location, .. }
            | AstNode::CompoundAssignment { location, .. }
            | AstNode::BinaryOp { location, .. }
            | AstNode::UnaryOp { location, .. }
            | AstNode::TernaryOp { location, .. }
            | AstNode::Comma { location, .. }
            | AstNode::FunctionCall { location, .. }
            | AstNode::Cast { location, .. }
            | AstNode::SizeofType { location, .. }
            | AstNode::SizeofExpr { location, .. } => *location,
        }
    }
}

/// Top-level program structure
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub nodes: Vec<AstNode>, // Global VarDecls, FunctionDecls and FunctionDefs in source order
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    /// Function definitions in source order
    pub fn functions(&self) -> impl Iterator<Item = FunctionDef> + '_ {
        self.nodes.iter().filter_map(|node| match node {
            AstNode::FunctionDef {
                name,
                params,
                body,
                return_type,
                location,
            } => Some(FunctionDef {
                name: name.clone(),
                params: params.clone(),
                body: body.clone(),
                return_type: *return_type,
                location: *location,
            }),
            _ => None,
        })
    }

    /// Global variable declarations in source order
    pub fn globals(&self) -> impl Iterator<Item = &AstNode> + '_ {
        self.nodes
            .iter()
            .filter(|node| matches!(node, AstNode::VarDecl { .. }))
    }
}

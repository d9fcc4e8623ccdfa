//! Block IR: functions as control-flow graphs over numbered locals
//!
//! The shape follows rustc's MIR at a much smaller scale. A [`Body`] owns a
//! list of locals (local 0 is the return slot, locals `1..=arg_count` are
//! the parameters) and a list of basic blocks. Each block is a run of
//! straight-line [`Statement`]s ended by one [`Terminator`].

use crate::memory::value::Value;
use crate::parser::ast::{BinOp, IntKind, SourceLocation, UnOp};
use rustc_hash::FxHashMap;
use std::fmt;

/// Index into [`Body::locals`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Local(pub usize);

/// The return slot of every body
pub const RETURN_PLACE: Local = Local(0);

impl fmt::Display for Local {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_{}", self.0)
    }
}

/// Index into [`Body::blocks`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BasicBlock(pub usize);

impl BasicBlock {
    pub const START: BasicBlock = BasicBlock(0);
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// A storage location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Place {
    Local(Local),
    /// Index into [`Module::globals`]
    Global(usize),
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Place::Local(local) => write!(f, "{}", local),
            Place::Global(index) => write!(f, "@{}", index),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Copy(Place),
    Const(Value),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Copy(place) => write!(f, "copy {}", place),
            Operand::Const(value) => write!(f, "const {}_{}", value, short_kind(value.kind())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rvalue {
    Use(Operand),
    BinaryOp(BinOp, Operand, Operand),
    /// Never `++`/`--`; those are lowered to stores
    UnaryOp(UnOp, Operand),
    Cast(Operand, IntKind),
}

impl fmt::Display for Rvalue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rvalue::Use(op) => write!(f, "{}", op),
            Rvalue::BinaryOp(op, lhs, rhs) => write!(f, "{:?}({}, {})", op, lhs, rhs),
            Rvalue::UnaryOp(op, operand) => write!(f, "{:?}({})", op, operand),
            Rvalue::Cast(operand, kind) => write!(f, "{} as {}", operand, kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// Store into a place; fails on `const` objects
    Assign(Place, Rvalue),
    /// The initialising store of a declaration, allowed on `const` objects
    Init(Place, Rvalue),
    /// The local becomes indeterminate
    StorageLive(Local),
    StorageDead(Local),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub location: SourceLocation,
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StatementKind::Assign(place, rvalue) => write!(f, "{} = {};", place, rvalue),
            StatementKind::Init(place, rvalue) => write!(f, "{} := {};", place, rvalue),
            StatementKind::StorageLive(local) => write!(f, "StorageLive({});", local),
            StatementKind::StorageDead(local) => write!(f, "StorageDead({});", local),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TerminatorKind {
    Goto {
        target: BasicBlock,
    },
    /// Jump to the first target whose value equals the discriminant
    SwitchInt {
        discr: Operand,
        targets: Vec<(i128, BasicBlock)>,
        otherwise: BasicBlock,
    },
    Call {
        func: String,
        args: Vec<Operand>,
        /// `None` when the caller discards the result
        destination: Option<Place>,
        target: BasicBlock,
    },
    Return,
    /// `exit(status)`
    Exit(Operand),
    /// `abort()`
    Abort,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Terminator {
    pub kind: TerminatorKind,
    pub location: SourceLocation,
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TerminatorKind::Goto { target } => write!(f, "goto -> {};", target),
            TerminatorKind::SwitchInt {
                discr,
                targets,
                otherwise,
            } => {
                write!(f, "switchInt({}) -> [", discr)?;
                for (value, target) in targets {
                    write!(f, "{}: {}, ", value, target)?;
                }
                write!(f, "otherwise: {}];", otherwise)
            }
            TerminatorKind::Call {
                func,
                args,
                destination,
                target,
            } => {
                if let Some(place) = destination {
                    write!(f, "{} = ", place)?;
                }
                write!(f, "{}(", func)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ") -> {};", target)
            }
            TerminatorKind::Return => write!(f, "return;"),
            TerminatorKind::Exit(status) => write!(f, "exit({});", status),
            TerminatorKind::Abort => write!(f, "abort;"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlockData {
    pub statements: Vec<Statement>,
    pub terminator: Terminator,
}

/// A local slot: a named variable, a parameter or a temporary
#[derive(Debug, Clone, PartialEq)]
pub struct LocalDecl {
    /// `None` for temporaries and the return slot
    pub name: Option<String>,
    pub kind: IntKind,
    pub is_const: bool,
    pub location: SourceLocation,
}

/// The lowered form of one function, or of the global initializers
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub name: String,
    pub arg_count: usize,
    /// `None` for `void` functions
    pub return_kind: Option<IntKind>,
    pub locals: Vec<LocalDecl>,
    pub blocks: Vec<BasicBlockData>,
    pub location: SourceLocation,
}

impl Body {
    pub fn local_decl(&self, local: Local) -> Option<&LocalDecl> {
        self.locals.get(local.0)
    }

    pub fn block(&self, block: BasicBlock) -> Option<&BasicBlockData> {
        self.blocks.get(block.0)
    }

    /// Name used in diagnostics: the variable name, or `_N` for temporaries
    pub fn local_name(&self, local: Local) -> String {
        self.local_decl(local)
            .and_then(|decl| decl.name.clone())
            .unwrap_or_else(|| local.to_string())
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn {}(", self.name)?;
        for i in 1..=self.arg_count {
            if i > 1 {
                write!(f, ", ")?;
            }
            let kind = self.locals.get(i).map_or(IntKind::Int, |decl| decl.kind);
            write!(f, "{}: {}", Local(i), kind)?;
        }
        match self.return_kind {
            Some(kind) => writeln!(f, ") -> {} {{", kind)?,
            None => writeln!(f, ") {{")?,
        }

        for (i, decl) in self.locals.iter().enumerate().skip(self.arg_count + 1) {
            let mutability = if decl.is_const { "" } else { "mut " };
            write!(f, "    let {}{}: {};", mutability, Local(i), decl.kind)?;
            match &decl.name {
                Some(name) => writeln!(f, " // {}", name)?,
                None => writeln!(f)?,
            }
        }

        for (i, block) in self.blocks.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "    {}: {{", BasicBlock(i))?;
            for stmt in &block.statements {
                writeln!(f, "        {}", stmt)?;
            }
            writeln!(f, "        {}", block.terminator)?;
            writeln!(f, "    }}")?;
        }
        writeln!(f, "}}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalDecl {
    pub name: String,
    pub kind: IntKind,
    pub is_const: bool,
    pub location: SourceLocation,
}

/// A whole lowered program
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub globals: Vec<GlobalDecl>,
    /// Runs before `main`, initialising every global in declaration order
    pub global_init: Body,
    pub bodies: FxHashMap<String, Body>,
    /// Function names in source order
    pub order: Vec<String>,
}

impl Module {
    pub fn body(&self, name: &str) -> Option<&Body> {
        self.bodies.get(name)
    }

    /// Functions in source order
    pub fn functions(&self) -> impl Iterator<Item = &Body> + '_ {
        self.order.iter().filter_map(|name| self.bodies.get(name))
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, global) in self.globals.iter().enumerate() {
            let qualifier = if global.is_const { "const " } else { "" };
            writeln!(f, "static {}@{}: {}; // {}", qualifier, i, global.kind, global.name)?;
        }
        if !self.globals.is_empty() {
            writeln!(f)?;
        }
        write!(f, "{}", self.global_init)?;
        for body in self.functions() {
            writeln!(f)?;
            write!(f, "{}", body)?;
        }
        Ok(())
    }
}

fn short_kind(kind: IntKind) -> &'static str {
    match kind {
        IntKind::Char => "i8",
        IntKind::UChar => "u8",
        IntKind::Short => "i16",
        IntKind::UShort => "u16",
        IntKind::Int => "i32",
        IntKind::UInt => "u32",
        IntKind::Long => "i64",
        IntKind::ULong => "u64",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminator_display() {
        let term = Terminator {
            kind: TerminatorKind::SwitchInt {
                discr: Operand::Copy(Place::Local(Local(3))),
                targets: vec![(0, BasicBlock(2))],
                otherwise: BasicBlock(1),
            },
            location: SourceLocation::default(),
        };
        assert_eq!(term.to_string(), "switchInt(copy _3) -> [0: bb2, otherwise: bb1];");

        let call = Terminator {
            kind: TerminatorKind::Call {
                func: "f".to_string(),
                args: vec![Operand::Const(Value::int(1)), Operand::Copy(Place::Global(0))],
                destination: Some(Place::Local(Local(4))),
                target: BasicBlock(5),
            },
            location: SourceLocation::default(),
        };
        assert_eq!(call.to_string(), "_4 = f(const 1_i32, copy @0) -> bb5;");
    }

    #[test]
    fn test_statement_display() {
        let stmt = Statement {
            kind: StatementKind::Assign(
                Place::Global(1),
                Rvalue::BinaryOp(
                    BinOp::Add,
                    Operand::Copy(Place::Local(Local(2))),
                    Operand::Const(Value::new(IntKind::Long, -1)),
                ),
            ),
            location: SourceLocation::default(),
        };
        assert_eq!(stmt.to_string(), "@1 = Add(copy _2, const -1_i64);");
    }
}

//! Static typing of expressions
//!
//! Both backends need the kind of an expression without evaluating it
//! (`sizeof expr`) and the value of integer constant expressions
//! (`case` labels). Neither needs runtime state beyond the declared kind of
//! each name, which the caller supplies through a [`KindLookup`].

use super::arith;
use super::value::Value;
use crate::parser::ast::{AstNode, BinOp, IntKind, UnOp};

/// Resolves names to declared kinds
pub trait KindLookup {
    /// Declared kind of a variable, `None` if the name is not in scope
    fn variable_kind(&self, name: &str) -> Option<IntKind>;

    /// Return kind of a function: `Some(None)` for `void`, `None` if unknown
    fn return_kind(&self, name: &str) -> Option<Option<IntKind>>;
}

/// Why an expression has no integer kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypingError {
    UndefinedVariable(String),
    UndefinedFunction(String),
    VoidValue(String),
    NotAnExpression,
}

/// Kind of the value `expr` would produce
pub fn expr_kind(
    expr: &AstNode,
    lookup: &dyn KindLookup,
) -> Result<IntKind, TypingError> {
    match expr {
        AstNode::IntLiteral { kind, .. } => Ok(*kind),
        AstNode::Variable(name, _) => lookup
            .variable_kind(name)
            .ok_or_else(|| TypingError::UndefinedVariable(name.clone())),
        AstNode::Assignment { lhs, .. } | AstNode::CompoundAssignment { lhs, .. } => {
            expr_kind(lhs, lookup)
        }
        AstNode::BinaryOp {
            op, left, right, ..
        } => Ok(binary_kind(
            *op,
            expr_kind(left, lookup)?,
            expr_kind(right, lookup)?,
        )),
        AstNode::UnaryOp { op, operand, .. } => Ok(unary_kind(*op, expr_kind(operand, lookup)?)),
        AstNode::TernaryOp {
            true_expr,
            false_expr,
            ..
        } => Ok(expr_kind(true_expr, lookup)?.common(expr_kind(false_expr, lookup)?)),
        AstNode::Comma { right, .. } => expr_kind(right, lookup),
        AstNode::FunctionCall { name, .. } => match lookup.return_kind(name) {
            Some(Some(kind)) => Ok(kind),
            Some(None) => Err(TypingError::VoidValue(name.clone())),
            None => Err(TypingError::UndefinedFunction(name.clone())),
        },
        AstNode::Cast { target_type, .. } => target_type
            .int_kind()
            .ok_or_else(|| TypingError::VoidValue("cast".to_string())),
        AstNode::SizeofType { .. } | AstNode::SizeofExpr { .. } => Ok(IntKind::ULong),
        _ => Err(TypingError::NotAnExpression),
    }
}

/// Result kind of `lhs op rhs`
pub fn binary_kind(op: BinOp, lhs: IntKind, rhs: IntKind) -> IntKind {
    match op {
        BinOp::Eq
        | BinOp::Ne
        | BinOp::Lt
        | BinOp::Le
        | BinOp::Gt
        | BinOp::Ge
        | BinOp::And
        | BinOp::Or => IntKind::Int,
        BinOp::BitShl | BinOp::BitShr => lhs.promote(),
        _ => lhs.common(rhs),
    }
}

/// Result kind of a unary operator; `++`/`--` keep the operand's kind
pub fn unary_kind(op: UnOp, operand: IntKind) -> IntKind {
    match op {
        UnOp::Not => IntKind::Int,
        UnOp::Neg | UnOp::Plus | UnOp::BitNot => operand.promote(),
        UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec => operand,
    }
}

/// Fold an integer constant expression (literals, casts, `sizeof` of a type
/// and operators over those). Returns `None` for anything else, including
/// division by zero.
pub fn const_eval(expr: &AstNode) -> Option<Value> {
    match expr {
        AstNode::IntLiteral { value, kind, .. } => Some(Value::new(*kind, *value)),
        AstNode::UnaryOp { op, operand, .. } if !op.is_inc_dec() => {
            Some(arith::unary(*op, const_eval(operand)?))
        }
        AstNode::BinaryOp {
            op, left, right, ..
        } => {
            let l = const_eval(left)?;
            match op {
                BinOp::And if !l.is_truthy() => Some(Value::int(0)),
                BinOp::Or if l.is_truthy() => Some(Value::int(1)),
                _ => arith::binary(*op, l, const_eval(right)?).ok(),
            }
        }
        AstNode::TernaryOp {
            condition,
            true_expr,
            false_expr,
            ..
        } => {
            let kind = const_eval(true_expr)?.kind().common(const_eval(false_expr)?.kind());
            let chosen = if const_eval(condition)?.is_truthy() {
                const_eval(true_expr)?
            } else {
                const_eval(false_expr)?
            };
            Some(chosen.convert(kind))
        }
        AstNode::Cast {
            target_type, expr, ..
        } => Some(const_eval(expr)?.convert(target_type.int_kind()?)),
        AstNode::SizeofType { target_type, .. } => Some(Value::new(
            IntKind::ULong,
            super::sizeof_type(target_type) as i128,
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::Parser;
    use rustc_hash::FxHashMap;

    struct Scope(FxHashMap<&'static str, IntKind>);

    impl KindLookup for Scope {
        fn variable_kind(&self, name: &str) -> Option<IntKind> {
            self.0.get(name).copied()
        }

        fn return_kind(&self, name: &str) -> Option<Option<IntKind>> {
            match name {
                "f" => Some(Some(IntKind::Long)),
                "g" => Some(None),
                _ => None,
            }
        }
    }

    fn expr(src: &str) -> AstNode {
        Parser::new(src).unwrap().parse_expression().unwrap()
    }

    fn scope() -> Scope {
        let mut vars = FxHashMap::default();
        vars.insert("c", IntKind::Char);
        vars.insert("u", IntKind::UInt);
        vars.insert("l", IntKind::Long);
        Scope(vars)
    }

    #[test]
    fn test_expression_kinds() {
        let s = scope();
        assert_eq!(expr_kind(&expr("c"), &s), Ok(IntKind::Char));
        assert_eq!(expr_kind(&expr("c + c"), &s), Ok(IntKind::Int));
        assert_eq!(expr_kind(&expr("c++"), &s), Ok(IntKind::Char));
        assert_eq!(expr_kind(&expr("u + 1"), &s), Ok(IntKind::UInt));
        assert_eq!(expr_kind(&expr("u < l"), &s), Ok(IntKind::Int));
        assert_eq!(expr_kind(&expr("u + l"), &s), Ok(IntKind::Long));
        assert_eq!(expr_kind(&expr("c << l"), &s), Ok(IntKind::Int));
        assert_eq!(expr_kind(&expr("f(1)"), &s), Ok(IntKind::Long));
        assert_eq!(expr_kind(&expr("sizeof c"), &s), Ok(IntKind::ULong));
        assert_eq!(
            expr_kind(&expr("g()"), &s),
            Err(TypingError::VoidValue("g".to_string()))
        );
        assert_eq!(
            expr_kind(&expr("x"), &s),
            Err(TypingError::UndefinedVariable("x".to_string()))
        );
    }

    #[test]
    fn test_constant_folding() {
        assert_eq!(const_eval(&expr("1 + 2 * 3")), Some(Value::int(7)));
        assert_eq!(const_eval(&expr("-1")), Some(Value::int(-1)));
        assert_eq!(const_eval(&expr("(char)300")), Some(Value::new(IntKind::Char, 44)));
        assert_eq!(const_eval(&expr("0 && 1 / 0")), Some(Value::int(0)));
        assert_eq!(const_eval(&expr("1 / 0")), None);
        assert_eq!(const_eval(&expr("x + 1")), None);
        assert_eq!(
            const_eval(&expr("sizeof(long)")),
            Some(Value::new(IntKind::ULong, 8))
        );
    }
}

//! Runtime error types shared by both execution backends
//!
//! This module defines [`RuntimeError`], which represents all errors that can occur
//! during program execution (as opposed to parse errors or system errors).
//!
//! All runtime errors are fatal - they halt execution of the fixture. The one
//! exception is [`RuntimeError::ProgramExit`], which carries `exit()`/`abort()`
//! out of arbitrarily deep expression evaluation and is turned into an
//! [`Outcome`](crate::outcome::Outcome) by the engine.

use crate::memory::arith::ArithError;
use crate::memory::typing::TypingError;
use crate::parser::ast::SourceLocation;
use std::fmt;

/// Runtime errors that can occur during execution
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// Attempted to read an indeterminate variable
    UninitializedRead {
        var: String,
        location: SourceLocation,
    },

    /// Attempted to modify a const variable
    ConstModification {
        var: String,
        location: SourceLocation,
    },

    /// Undefined variable reference
    UndefinedVariable {
        name: String,
        location: SourceLocation,
    },

    /// Call to a function with no definition
    UndefinedFunction {
        name: String,
        location: SourceLocation,
    },

    /// Division by zero or modulo by zero
    DivisionError {
        operation: String,
        location: SourceLocation,
    },

    /// Shift by a negative amount or by at least the operand width
    InvalidShift {
        amount: i128,
        width: u32,
        location: SourceLocation,
    },

    /// Function argument count mismatch
    ArgumentCountMismatch {
        function: String,
        expected: usize,
        got: usize,
        location: SourceLocation,
    },

    /// The value of a call was used but the callee returned none
    MissingReturnValue {
        function: String,
        location: SourceLocation,
    },

    /// Call depth exceeded the configured limit
    StackOverflow {
        limit: usize,
        location: SourceLocation,
    },

    /// Step budget exhausted
    StepLimitExceeded { limit: u64 },

    /// Snapshot history limit exceeded
    SnapshotLimitExceeded { current: usize, limit: usize },

    /// Main function not found
    NoMainFunction,

    /// Unsupported operation or feature
    UnsupportedOperation {
        message: String,
        location: SourceLocation,
    },

    /// `exit(status)` or `abort()` was called (internal signal, not a real error)
    ProgramExit { status: i128, aborted: bool },
}

impl RuntimeError {
    /// Attach a location to an operator failure
    pub fn from_arith(err: ArithError, location: SourceLocation) -> Self {
        match err {
            ArithError::DivisionByZero { .. } => RuntimeError::DivisionError {
                operation: err.to_string(),
                location,
            },
            ArithError::ShiftOutOfRange { amount, width } => RuntimeError::InvalidShift {
                amount,
                width,
                location,
            },
        }
    }

    /// Attach a location to a static typing failure
    pub fn from_typing(err: TypingError, location: SourceLocation) -> Self {
        match err {
            TypingError::UndefinedVariable(name) => {
                RuntimeError::UndefinedVariable { name, location }
            }
            TypingError::UndefinedFunction(name) => {
                RuntimeError::UndefinedFunction { name, location }
            }
            TypingError::VoidValue(what) => RuntimeError::UnsupportedOperation {
                message: format!("void value of '{}' used", what),
                location,
            },
            TypingError::NotAnExpression => RuntimeError::UnsupportedOperation {
                message: "statement in expression position".to_string(),
                location,
            },
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            RuntimeError::UninitializedRead { location, .. } => Some(location),
            RuntimeError::ConstModification { location, .. } => Some(location),
            RuntimeError::UndefinedVariable { location, .. } => Some(location),
            RuntimeError::UndefinedFunction { location, .. } => Some(location),
            RuntimeError::DivisionError { location, .. } => Some(location),
            RuntimeError::InvalidShift { location, .. } => Some(location),
            RuntimeError::ArgumentCountMismatch { location, .. } => Some(location),
            RuntimeError::MissingReturnValue { location, .. } => Some(location),
            RuntimeError::StackOverflow { location, .. } => Some(location),
            RuntimeError::UnsupportedOperation { location, .. } => Some(location),
            RuntimeError::StepLimitExceeded { .. } => None,
            RuntimeError::SnapshotLimitExceeded { .. } => None,
            RuntimeError::NoMainFunction => None,
            RuntimeError::ProgramExit { .. } => None,
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UninitializedRead { var, location } => {
                write!(
                    f,
                    "Read from uninitialized variable '{}' at line {}",
                    var, location.line
                )
            }
            RuntimeError::ConstModification { var, location } => {
                write!(
                    f,
                    "Attempted to modify const variable '{}' at line {}",
                    var, location.line
                )
            }
            RuntimeError::UndefinedVariable { name, location } => {
                write!(f, "Undefined variable '{}' at line {}", name, location.line)
            }
            RuntimeError::UndefinedFunction { name, location } => {
                write!(f, "Undefined function '{}' at line {}", name, location.line)
            }
            RuntimeError::DivisionError {
                operation,
                location,
            } => {
                write!(f, "Division error: {} at line {}", operation, location.line)
            }
            RuntimeError::InvalidShift {
                amount,
                width,
                location,
            } => {
                write!(
                    f,
                    "Invalid shift by {} for a {}-bit operand at line {}",
                    amount, width, location.line
                )
            }
            RuntimeError::ArgumentCountMismatch {
                function,
                expected,
                got,
                location,
            } => {
                write!(
                    f,
                    "Function '{}' expects {} arguments, got {} at line {}",
                    function, expected, got, location.line
                )
            }
            RuntimeError::MissingReturnValue { function, location } => {
                write!(
                    f,
                    "Function '{}' returned no value but its result is used at line {}",
                    function, location.line
                )
            }
            RuntimeError::StackOverflow { limit, location } => {
                write!(
                    f,
                    "Call depth limit of {} exceeded at line {}",
                    limit, location.line
                )
            }
            RuntimeError::StepLimitExceeded { limit } => {
                write!(f, "Step limit of {} exceeded", limit)
            }
            RuntimeError::SnapshotLimitExceeded { current, limit } => {
                write!(
                    f,
                    "Snapshot memory limit exceeded: {} bytes used, limit is {}",
                    current, limit
                )
            }
            RuntimeError::NoMainFunction => write!(f, "No main() function found"),
            RuntimeError::UnsupportedOperation { message, location } => {
                write!(
                    f,
                    "Unsupported operation: {} at line {}",
                    message, location.line
                )
            }
            RuntimeError::ProgramExit { status, aborted } => {
                if *aborted {
                    write!(f, "Program aborted")
                } else {
                    write!(f, "Program exited with status {}", status)
                }
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::BinOp;

    #[test]
    fn test_arith_errors_keep_location() {
        let loc = SourceLocation::new(4, 9);
        let err = RuntimeError::from_arith(ArithError::DivisionByZero { op: BinOp::Div }, loc);
        assert_eq!(err.location(), Some(&loc));
        assert_eq!(err.to_string(), "Division error: '/' by zero at line 4");

        let err = RuntimeError::from_arith(
            ArithError::ShiftOutOfRange {
                amount: 40,
                width: 32,
            },
            loc,
        );
        assert!(matches!(err, RuntimeError::InvalidShift { amount: 40, .. }));
    }
}

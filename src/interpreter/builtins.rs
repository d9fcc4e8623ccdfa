//! Built-in library functions
//!
//! Only the process-termination functions are provided: `exit(status)` and
//! `abort()`. A user definition with the same name takes precedence.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::value::Value;
use crate::outcome::ABORT_STATUS;
use crate::parser::ast::{IntKind, SourceLocation};
use tracing::info;

/// Names handled by [`Interpreter::call_builtin`]
pub(crate) const BUILTINS: &[&str] = &["exit", "abort"];

impl Interpreter {
    pub(crate) fn call_builtin(
        &mut self,
        name: &str,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Option<Value>, RuntimeError> {
        match name {
            "exit" => {
                let [status] = args.as_slice() else {
                    return Err(RuntimeError::ArgumentCountMismatch {
                        function: name.to_string(),
                        expected: 1,
                        got: args.len(),
                        location,
                    });
                };
                let status = status.convert(IntKind::Int).as_i128();
                info!(status, line = location.line, "exit() called");
                Err(RuntimeError::ProgramExit {
                    status,
                    aborted: false,
                })
            }
            "abort" => {
                if !args.is_empty() {
                    return Err(RuntimeError::ArgumentCountMismatch {
                        function: name.to_string(),
                        expected: 0,
                        got: args.len(),
                        location,
                    });
                }
                info!(line = location.line, "abort() called");
                Err(RuntimeError::ProgramExit {
                    status: ABORT_STATUS,
                    aborted: true,
                })
            }
            _ => Err(RuntimeError::UndefinedFunction {
                name: name.to_string(),
                location,
            }),
        }
    }
}

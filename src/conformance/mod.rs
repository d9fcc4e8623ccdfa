//! Conformance harness
//!
//! Runs a program on every [`Backend`] and compares the exit statuses with
//! each other and with an optional expectation. Backends must agree exactly;
//! any difference is a [`Verdict::Divergence`]. The report also carries the
//! unsequenced-modification warnings that usually explain a divergence.

use crate::analysis::{check_program, Warning};
use crate::config::Limits;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::lowering::{lower_program, Machine};
use crate::outcome::Outcome;
use crate::parser::ast::Program;
use std::fmt;
use tracing::{info, warn};

/// An independent way of executing a program
pub trait Backend {
    fn name(&self) -> &'static str;

    fn run(&self, program: &Program, limits: &Limits) -> Result<Outcome, RuntimeError>;
}

/// The tree-walking interpreter
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpreterBackend;

impl Backend for InterpreterBackend {
    fn name(&self) -> &'static str {
        "interp"
    }

    fn run(
        &self,
        program: &Program,
        limits: &Limits,
    ) -> Result<Outcome, RuntimeError> {
        Interpreter::new(program, *limits).run()
    }
}

/// Lowering to block IR, then the virtual machine
#[derive(Debug, Clone, Copy, Default)]
pub struct VmBackend;

impl Backend for VmBackend {
    fn name(&self) -> &'static str {
        "vm"
    }

    fn run(
        &self,
        program: &Program,
        limits: &Limits,
    ) -> Result<Outcome, RuntimeError> {
        let module = lower_program(program)?;
        Machine::new(&module, *limits).run()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Every backend produced the same status, equal to the expectation if any
    Pass,
    /// Backends agree, but not with the expectation
    Mismatch,
    /// Backends produced different statuses
    Divergence,
    /// At least one backend failed with a runtime error
    Error,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Mismatch => write!(f, "MISMATCH"),
            Verdict::Divergence => write!(f, "DIVERGENCE"),
            Verdict::Error => write!(f, "ERROR"),
        }
    }
}

/// One backend's result
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRun {
    pub backend: &'static str,
    pub result: Result<Outcome, RuntimeError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub runs: Vec<BackendRun>,
    pub expected: Option<u8>,
    pub verdict: Verdict,
    pub warnings: Vec<Warning>,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    /// The status every backend agreed on, if they did
    pub fn agreed_status(&self) -> Option<u8> {
        let mut statuses = self.runs.iter().map(|run| run.result.as_ref().ok().map(|o| o.status));
        let first = statuses.next()??;
        statuses.all(|s| s == Some(first)).then_some(first)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.verdict)?;
        if let Some(expected) = self.expected {
            write!(f, " expected {}", expected)?;
        }
        for run in &self.runs {
            match &run.result {
                Ok(outcome) => write!(f, "; {}: {}", run.backend, outcome)?,
                Err(e) => write!(f, "; {}: error: {}", run.backend, e)?,
            }
        }
        Ok(())
    }
}

/// Run both built-in backends
pub fn check(program: &Program, expected: Option<u8>, limits: &Limits) -> Report {
    check_with(&[&InterpreterBackend, &VmBackend], program, expected, limits)
}

pub fn check_with(
    backends: &[&dyn Backend],
    program: &Program,
    expected: Option<u8>,
    limits: &Limits,
) -> Report {
    let runs: Vec<BackendRun> = backends
        .iter()
        .map(|backend| BackendRun {
            backend: backend.name(),
            result: backend.run(program, limits),
        })
        .collect();

    let verdict = judge(&runs, expected);
    let warnings = check_program(program);
    match verdict {
        Verdict::Pass => info!(%verdict, "conformance check"),
        _ => warn!(%verdict, warnings = warnings.len(), "conformance check"),
    }

    Report {
        runs,
        expected,
        verdict,
        warnings,
    }
}

fn judge(runs: &[BackendRun], expected: Option<u8>) -> Verdict {
    let mut statuses = Vec::with_capacity(runs.len());
    for run in runs {
        match &run.result {
            Ok(outcome) => statuses.push(outcome.status),
            Err(_) => return Verdict::Error,
        }
    }

    let Some(&first) = statuses.first() else {
        return Verdict::Error;
    };
    if statuses.iter().any(|&s| s != first) {
        return Verdict::Divergence;
    }
    match expected {
        Some(expected) if expected != first => Verdict::Mismatch,
        _ => Verdict::Pass,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Termination;
    use crate::parser::parse::parse_source;

    struct Fixed(i128);

    impl Backend for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn run(&self, _: &Program, _: &Limits) -> Result<Outcome, RuntimeError> {
            Ok(Outcome::new(self.0, Termination::Return))
        }
    }

    fn program(src: &str) -> Program {
        parse_source(src).unwrap()
    }

    #[test]
    fn test_pass_and_mismatch() {
        // The postfix store completes at the end of the statement on both backends
        let source = program("int main() { int x = 3; x++; return x + 4; }");
        let report = check(&source, Some(8), &Limits::default());
        assert_eq!(report.verdict, Verdict::Pass);
        assert_eq!(report.agreed_status(), Some(8));

        let report = check(&program("int main() { return 2; }"), Some(3), &Limits::default());
        assert_eq!(report.verdict, Verdict::Mismatch);
        assert!(!report.passed());

        // x++ + x: the interpreter reads 4, the VM still reads 3
        let p = program("int main() { int x = 3; return x++ + x; }");
        let report = check(&p, None, &Limits::default());
        assert_eq!(report.verdict, Verdict::Divergence);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_error_verdict() {
        let source = program("int main() { int z = 0; return 1 / z; }");
        let report = check(&source, None, &Limits::default());
        assert_eq!(report.verdict, Verdict::Error);
        assert_eq!(report.agreed_status(), None);
        assert!(report.to_string().starts_with("ERROR; interp: error: Division error"));
    }

    #[test]
    fn test_custom_backends() {
        let p = program("int main() { return 0; }");
        let report = check_with(&[&Fixed(263), &Fixed(7)], &p, Some(7), &Limits::default());
        // 263 and 7 truncate to the same status
        assert_eq!(report.verdict, Verdict::Pass);

        let report = check_with(&[&Fixed(1), &Fixed(2)], &p, None, &Limits::default());
        assert_eq!(report.verdict, Verdict::Divergence);

        let report = check_with(&[], &p, None, &Limits::default());
        assert_eq!(report.verdict, Verdict::Error);
    }
}

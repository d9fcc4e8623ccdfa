//! How a fixture run ended and the exit status it produced

use std::fmt;

/// Status reported for `abort()` (128 + SIGABRT)
pub const ABORT_STATUS: i128 = 134;

/// How the program terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// `main` returned (or fell off its end)
    Return,
    /// `exit(status)` was called
    Exit,
    /// `abort()` was called
    Abort,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Return => write!(f, "return"),
            Termination::Exit => write!(f, "exit"),
            Termination::Abort => write!(f, "abort"),
        }
    }
}

/// Result of running a fixture to completion on one backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Value returned by `main` or passed to `exit`, before truncation
    pub value: i128,
    /// Process exit status, `value & 0xFF`
    pub status: u8,
    pub termination: Termination,
}

impl Outcome {
    pub fn new(value: i128, termination: Termination) -> Self {
        Outcome {
            value,
            status: exit_status(value),
            termination,
        }
    }

    pub fn aborted() -> Self {
        Outcome::new(ABORT_STATUS, Termination::Abort)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status {} ({} {})",
            self.status, self.termination, self.value
        )
    }
}

/// Truncate a C `int` result to the POSIX exit status range
pub fn exit_status(value: i128) -> u8 {
    (value & 0xFF) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_truncation() {
        assert_eq!(exit_status(7), 7);
        assert_eq!(exit_status(256), 0);
        assert_eq!(exit_status(-1), 255);
        assert_eq!(exit_status(300), 44);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::new(263, Termination::Exit).to_string(), "status 7 (exit 263)");
        assert_eq!(Outcome::aborted().status, 134);
    }
}

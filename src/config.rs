//! Execution limits and logging setup

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (`tracing_subscriber` syntax)
pub const LOG_ENV: &str = "CFIXTURE_LOG";

/// Resource bounds applied by both backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Statements (interpreter) or IR statements and terminators (VM) executed
    pub max_steps: u64,
    /// Nested user function calls, `main` included
    pub max_call_depth: usize,
    /// Bytes of snapshot history kept by `trace`
    pub snapshot_memory_limit: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_steps: 10_000_000,
            max_call_depth: 1024,
            snapshot_memory_limit: 64 * 1024 * 1024,
        }
    }
}

/// Filter for a `-v` count; 0 defers to [`LOG_ENV`], falling back to `warn`
pub fn log_filter(verbosity: u8) -> EnvFilter {
    match verbosity {
        0 => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

/// Install the global subscriber, logging to stderr
pub fn init_logging(verbosity: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbosity))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_steps, 10_000_000);
        assert_eq!(limits.max_call_depth, 1024);
        assert_eq!(limits.snapshot_memory_limit, 64 << 20);
    }

    #[test]
    fn test_verbosity_overrides_filter() {
        assert_eq!(log_filter(2).to_string(), "debug");
        assert_eq!(log_filter(9).to_string(), "trace");
    }
}

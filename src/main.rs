// cfixture: run C conformance fixtures on two evaluators and compare exit statuses

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::debug;

use cfixture::analysis::check_program;
use cfixture::config::{self, Limits};
use cfixture::conformance::{self, Backend, InterpreterBackend, VmBackend};
use cfixture::interpreter::engine::Interpreter;
use cfixture::lowering::lower_program;
use cfixture::parser::ast::Program;
use cfixture::parser::parse_source;

/// Exit status for I/O, parse and runtime failures of the tool itself
const FAILURE_STATUS: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "cfixture",
    version,
    about = "Run C fixtures on two evaluators and compare exit statuses"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Maximum number of statements executed
    #[arg(long, global = true)]
    max_steps: Option<u64>,

    /// Maximum nesting of function calls
    #[arg(long, global = true)]
    max_call_depth: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a fixture and exit with its status
    Run {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = BackendKind::Interp)]
        backend: BackendKind,
    },
    /// Run every backend and compare the statuses
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Expected exit status
        #[arg(long)]
        expect: Option<u8>,
    },
    /// Print the live variables after each executed statement
    Trace { file: PathBuf },
    /// Report unsequenced modifications
    Lint { file: PathBuf },
    /// Print the lowered block IR
    DumpIr { file: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    Interp,
    Vm,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    config::init_logging(cli.verbose);

    match execute(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(FAILURE_STATUS)
        }
    }
}

fn limits(cli: &Cli) -> Limits {
    let defaults = Limits::default();
    Limits {
        max_steps: cli.max_steps.unwrap_or(defaults.max_steps),
        max_call_depth: cli.max_call_depth.unwrap_or(defaults.max_call_depth),
        ..defaults
    }
}

fn load(path: &Path) -> Result<Program> {
    let source =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let program =
        parse_source(&source).with_context(|| format!("failed to parse {}", path.display()))?;
    debug!(file = %path.display(), nodes = program.nodes.len(), "parsed");
    Ok(program)
}

fn execute(cli: &Cli) -> Result<ExitCode> {
    let limits = limits(cli);

    match &cli.command {
        Command::Run { file, backend } => {
            let program = load(file)?;
            let backend: &dyn Backend = match backend {
                BackendKind::Interp => &InterpreterBackend,
                BackendKind::Vm => &VmBackend,
            };
            let outcome = backend
                .run(&program, &limits)
                .with_context(|| format!("{} failed on {}", backend.name(), file.display()))?;
            Ok(ExitCode::from(outcome.status))
        }

        Command::Check { files, expect } => check_files(files, *expect, &limits),

        Command::Trace { file } => {
            let program = load(file)?;
            let mut interpreter = Interpreter::new(&program, limits).with_snapshots();
            let result = interpreter.run();
            for snapshot in interpreter.snapshots() {
                println!("{}", snapshot);
            }
            let outcome = result.with_context(|| format!("runtime error in {}", file.display()))?;
            println!("{}", outcome);
            Ok(ExitCode::from(outcome.status))
        }

        Command::Lint { file } => {
            let program = load(file)?;
            let warnings = check_program(&program);
            for warning in &warnings {
                println!("{}:{}", file.display(), warning);
            }
            Ok(if warnings.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Command::DumpIr { file } => {
            let program = load(file)?;
            let module = lower_program(&program)
                .with_context(|| format!("failed to lower {}", file.display()))?;
            print!("{}", module);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// One line per file; 0 when every verdict passes, 1 otherwise, 2 when a
/// file could not be loaded
fn check_files(
    files: &[PathBuf],
    expect: Option<u8>,
    limits: &Limits,
) -> Result<ExitCode> {
    let mut all_passed = true;
    let mut load_failed = false;

    for file in files {
        let program = match load(file) {
            Ok(program) => program,
            Err(e) => {
                eprintln!("{}: error: {:#}", file.display(), e);
                load_failed = true;
                continue;
            }
        };

        let report = conformance::check(&program, expect, limits);
        println!("{}: {}", file.display(), report);
        for warning in &report.warnings {
            println!("  {}", warning);
        }
        all_passed &= report.passed();
    }

    Ok(if load_failed {
        ExitCode::from(FAILURE_STATUS)
    } else if all_passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// Fixture tests: every program runs on both backends

use cfixture::analysis::{check_program, WarningKind};
use cfixture::config::Limits;
use cfixture::conformance::{check, Verdict};
use cfixture::interpreter::engine::Interpreter;
use cfixture::interpreter::errors::RuntimeError;
use cfixture::lowering::{lower_program, Machine};
use cfixture::outcome::Termination;
use cfixture::parser::ast::Program;
use cfixture::parser::parse_source;
use regex::Regex;
use std::fs;
use std::path::Path;

fn parse(source: &str) -> Program {
    parse_source(source).expect("Parsing failed")
}

fn load(name: &str) -> Program {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    let source = fs::read_to_string(&path).expect("Failed to read fixture file");
    parse(&source)
}

/// Assert that both backends agree on the expected exit status
macro_rules! check_fixture {
    ($program:expr, $expected:expr) => {{
        let program = $program;
        let report = check(&program, Some($expected), &Limits::default());
        assert_eq!(report.verdict, Verdict::Pass, "{}", report);
        report
    }};
}

#[test]
fn test_unary_order_fixture() {
    let report = check_fixture!(load("unary_order.c"), 7);
    assert!(report.warnings.is_empty());
    for run in &report.runs {
        let outcome = run.result.as_ref().expect("Execution failed");
        assert_eq!(outcome.value, 7);
        assert_eq!(outcome.termination, Termination::Return);
    }
}

#[test]
fn test_unary_order_intermediate_values() {
    let program = load("unary_order.c");
    let mut interpreter = Interpreter::new(&program, Limits::default()).with_snapshots();
    interpreter.run().expect("Execution failed");

    let last = interpreter
        .snapshots()
        .iter()
        .rev()
        .find(|s| s.lookup("t9").is_some())
        .expect("No snapshot after the last declaration");
    let expected = [
        ("t1", 2),
        ("t2", 1),
        ("t3", 3),
        ("t4", 2),
        ("t5", 2),
        ("t6", 3),
        ("t7", 3),
        ("t8", 4),
        ("t9", 3),
        ("a", 1),
        ("b", 2),
        ("c", 4),
    ];
    for (name, value) in expected {
        let var = last.lookup(name).unwrap_or_else(|| panic!("{} not in snapshot", name));
        assert_eq!(var.value.map(|v| v.as_i128()), Some(value), "{}", name);
    }
}

#[test]
fn test_globals_after_run_match_on_both_backends() {
    let program = load("unary_order.c");
    let mut interpreter = Interpreter::new(&program, Limits::default());
    interpreter.run().expect("Execution failed");

    let module = lower_program(&program).expect("Lowering failed");
    let mut machine = Machine::new(&module, Limits::default());
    machine.run().expect("Execution failed");

    for name in ["a", "b", "c"] {
        assert_eq!(interpreter.global_value(name), machine.global_value(name), "{}", name);
    }
}

#[test]
fn test_defined_programs_agree() {
    check_fixture!(parse("int main() { int x = 5; int y = 10; return x + y; }"), 15);
    check_fixture!(
        parse("int add(int a, int b) { return a + b; } int main() { return add(3, 4); }"),
        7
    );
    check_fixture!(
        parse(
            r#"
            unsigned char u = 250;
            int main() {
                int steps = 0;
                while (u++ != 0) steps++;
                return steps * 10 + u;
            }
            "#
        ),
        61
    );
    check_fixture!(
        parse(
            r#"
            int count(int n) {
                int s = 0;
                for (int i = 0; i < n; i++) {
                    switch (i & 3) {
                    case 0: s += 100; break;
                    case 1: continue;
                    default: s++;
                    }
                }
                return s;
            }
            int main() { return count(9) % 256; }
            "#
        ),
        48
    );
    check_fixture!(parse("int main() { return -1; }"), 255);
}

#[test]
fn test_exit_and_abort_on_both_backends() {
    let report = check_fixture!(
        parse("void stop() { exit(300); } int main() { stop(); return 1; }"),
        44
    );
    for run in &report.runs {
        assert_eq!(run.result.as_ref().map(|o| o.termination), Ok(Termination::Exit));
    }
    check_fixture!(parse("int main() { int x = 0; if (!x) abort(); return 0; }"), 134);
}

#[test]
fn test_unsequenced_program_diverges_and_is_flagged() {
    let program = load("unsequenced.c");
    let report = check(&program, None, &Limits::default());
    assert_eq!(report.verdict, Verdict::Divergence);

    let statuses: Vec<u8> = report
        .runs
        .iter()
        .map(|run| run.result.as_ref().expect("Execution failed").status)
        .collect();
    assert_eq!(statuses, vec![5, 1]);

    let warnings = check_program(&program);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].variable, "i");
    assert_eq!(warnings[0].kind, WarningKind::MultipleModifications);
    assert_eq!(warnings[0].location.line, 6);
}

#[test]
fn test_runtime_error_messages() {
    let line = Regex::new(r"at line \d+$").unwrap();

    let report = check(
        &parse("int main() {\n  int x;\n  return x;\n}"),
        None,
        &Limits::default(),
    );
    assert_eq!(report.verdict, Verdict::Error);
    let uninit = Regex::new(r"^Read from uninitialized variable 'x' at line 3$").unwrap();
    for run in &report.runs {
        let err = run.result.as_ref().expect_err("Expected an error");
        assert!(uninit.is_match(&err.to_string()), "{}: {}", run.backend, err);
    }

    let report = check(
        &parse("const int k = 2;\nint main() {\n  k += 1;\n  return k;\n}"),
        None,
        &Limits::default(),
    );
    for run in &report.runs {
        let err = run.result.as_ref().expect_err("Expected an error");
        assert!(matches!(err, RuntimeError::ConstModification { .. }));
        assert!(line.is_match(&err.to_string()));
    }

    let report = check(&parse("int main() { return 1 << 40; }"), None, &Limits::default());
    let shift = Regex::new(r"^Invalid shift by 40 for a 32-bit operand").unwrap();
    for run in &report.runs {
        let err = run.result.as_ref().expect_err("Expected an error");
        assert!(shift.is_match(&err.to_string()), "{}", err);
    }
}

#[test]
fn test_step_limit_applies_to_both_backends() {
    let limits = Limits {
        max_steps: 500,
        ..Limits::default()
    };
    let report = check(&parse("int main() { while (1) { } }"), None, &limits);
    assert_eq!(report.verdict, Verdict::Error);
    for run in &report.runs {
        assert_eq!(
            run.result.as_ref().err(),
            Some(&RuntimeError::StepLimitExceeded { limit: 500 })
        );
    }
}

#[test]
fn test_dump_ir_lists_every_function() {
    let module = lower_program(&load("unary_order.c")).expect("Lowering failed");
    let text = module.to_string();
    let header = Regex::new(r"(?m)^fn main\(\) -> int \{$").unwrap();
    assert!(header.is_match(&text), "{}", text);
    assert!(text.contains("static @2: int; // c"));
    assert_eq!(text.matches("StorageLive").count(), 9);
}

#[test]
fn test_recursion_up_to_default_depth() {
    let source = r#"
        int depth(int n) {
            if (n == 0) return 0;
            for (;;) {
                while (1) {
                    do {
                        if (1) {
                            {
                                switch (1) {
                                case 1: return depth(n - 1) + 1;
                                }
                            }
                        }
                    } while (0);
                }
            }
            return 0;
        }

        int main() { return depth(1000) == 1000; }
    "#;
    check_fixture!(parse(source), 1);
}

#[test]
fn test_unbounded_recursion_is_a_runtime_error() {
    let program = parse("int f(int n) { return f(n + 1); }\nint main() { return f(0); }");
    let report = check(&program, None, &Limits::default());
    assert_eq!(report.verdict, Verdict::Error);
    for run in &report.runs {
        let err = run.result.as_ref().expect_err("Expected an error");
        assert!(
            matches!(err, RuntimeError::StackOverflow { limit: 1024, .. }),
            "{}: {}",
            run.backend,
            err
        );
    }
}

#[test]
fn test_declaration_scope_agrees() {
    let skipped = r#"
        int main() {
            switch (2) {
            case 1: ; int x;
            case 2: x = 3; return x;
            }
            return 0;
        }
    "#;
    check_fixture!(parse(skipped), 3);

    let own_initializer = r#"
        int x = 5;
        int main() {
            int x = x;
            return x;
        }
    "#;
    let report = check(&parse(own_initializer), None, &Limits::default());
    assert_eq!(report.verdict, Verdict::Error);
    for run in &report.runs {
        assert!(matches!(
            run.result,
            Err(RuntimeError::UninitializedRead { ref var, .. }) if var == "x"
        ));
    }
}

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use skiff::env::Environment;
use skiff::execute;
use skiff::interpreter::{populate_builtin, Interpreter};
use skiff::reporter::WriteReporter;

/// A clonable sink so the test can keep a handle to what the interpreter and
/// reporter wrote.
#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct Run {
    results: Option<Vec<String>>,
    stdout: String,
    diagnostics: String,
}

fn run_with(source: &str, interactive: bool) -> Run {
    let out = SharedBuf::default();
    let errs = SharedBuf::default();
    let mut env = Environment::new_global();
    populate_builtin(&mut env);
    let mut interpreter = Interpreter::new(env, Box::new(out.clone()));
    let mut reporter = WriteReporter::new(errs.clone());
    let results = execute(source, &mut interpreter, &mut reporter, interactive);
    Run {
        results,
        stdout: out.contents(),
        diagnostics: errs.contents(),
    }
}

fn run(source: &str) -> Run {
    run_with(source, false)
}

fn assert_clean_stdout(source: &str, expected: &str) {
    let run = run(source);
    assert_eq!("", run.diagnostics, "unexpected diagnostics for {source:?}");
    assert_eq!(expected, run.stdout, "stdout mismatch for {source:?}");
}

#[test]
fn arithmetic_precedence_prints() {
    let run = run("print(1 + 2 * 3);");
    assert_eq!("", run.diagnostics);
    assert_eq!("7\n", run.stdout);
    assert_eq!(Some(vec!["7".to_string()]), run.results);
}

#[test]
fn declaration_assignment_print() {
    let run = run("var x = 10; x = x + 5; print(x);");
    assert_eq!("", run.diagnostics);
    assert_eq!("15\n", run.stdout);
    assert_eq!(
        Some(vec!["10".to_string(), "15".to_string(), "15".to_string()]),
        run.results
    );
}

#[test]
fn string_concatenation_prints_unquoted() {
    assert_clean_stdout("var s = \"hi\"; print(s + \" there\");", "hi there\n");
}

#[test]
fn string_number_concatenation() {
    assert_clean_stdout("print(\"n=\" + 42); print(7 + \"!\");", "n=42\n7!\n");
}

#[test]
fn if_else_takes_the_true_branch() {
    assert_clean_stdout(
        "if (1 < 2) { print(\"yes\"); } else { print(\"no\"); }",
        "yes\n",
    );
}

#[test]
fn elif_chain_picks_the_first_truthy_arm() {
    assert_clean_stdout(
        "var x = 2; \
         if (x == 1) { print(\"one\"); } \
         elif (x == 2) { print(\"two\"); } \
         elif (x == 3) { print(\"three\"); } \
         else { print(\"many\"); }",
        "two\n",
    );
}

#[test]
fn if_with_single_statement_bodies() {
    assert_clean_stdout("if (true) print(1); else print(2);", "1\n");
}

#[test]
fn for_loop_accumulates() {
    let run = run("var i = 0; for (var j = 0; j < 3; j = j + 1) { i = i + j; } print(i);");
    assert_eq!("", run.diagnostics);
    assert_eq!("3\n", run.stdout);
    // declaration, loop, print
    assert_eq!(
        Some(vec!["0".to_string(), "null".to_string(), "3".to_string()]),
        run.results
    );
}

#[test]
fn function_call_returns_a_value() {
    let run = run("fun f() { return 42; } print(f());");
    assert_eq!("", run.diagnostics);
    assert_eq!("42\n", run.stdout);
    assert_eq!(
        Some(vec!["undefined".to_string(), "42".to_string()]),
        run.results
    );
}

#[test]
fn function_parameters_bind_per_call() {
    assert_clean_stdout(
        "fun add(a, b) { return a + b; } print(add(1, 2)); print(add(10, 20));",
        "3\n30\n",
    );
}

#[test]
fn recursion_works() {
    assert_clean_stdout(
        "fun fib(n) { if (n < 2) { return n; } return fib(n - 1) + fib(n - 2); } print(fib(10));",
        "55\n",
    );
}

#[test]
fn return_unwinds_nested_blocks_into_the_call() {
    assert_clean_stdout(
        "fun f() { { var x = 1; { return x + 1; } } } print(f());",
        "2\n",
    );
}

#[test]
fn function_body_running_off_the_end_yields_nil() {
    assert_clean_stdout("fun noop() { 1 + 1; } print(noop());", "nil\n");
}

#[test]
fn nullish_coalescing_defaults_nil() {
    assert_clean_stdout("print(nil ?? \"x\"); print(1 ?? 2);", "x\n1\n");
}

#[test]
fn bang_truthiness_boundaries() {
    assert_clean_stdout(
        "print(!0); print(!\"\"); print(!\"a\"); print(!1); print(!false);",
        "true\ntrue\nfalse\nfalse\ntrue\n",
    );
}

#[test]
fn double_negation() {
    assert_clean_stdout("print(-(-5));", "5\n");
}

#[test]
fn logical_operators_produce_booleans() {
    assert_clean_stdout(
        "print(1 && 2); print(1 && false); print(false || 1); print(false || nil);",
        "true\nfalse\ntrue\nfalse\n",
    );
}

#[test]
fn falsy_and_short_circuits_to_nil() {
    assert_clean_stdout("print(false && true);", "nil\n");
}

#[test]
fn ternary_selects_a_branch() {
    assert_clean_stdout("print(1 < 2 ? \"a\" : \"b\");", "a\n");
}

#[test]
fn numbers_compare_numerically() {
    assert_clean_stdout("print(10 > 9); print(\"10\" > \"9\");", "true\nfalse\n");
}

#[test]
fn shadowing_in_blocks() {
    assert_clean_stdout(
        "var x = 1; { var x = 2; print(x); } print(x);",
        "2\n1\n",
    );
}

#[test]
fn assignment_writes_through_to_the_outer_scope() {
    assert_clean_stdout("var x = 1; { x = 9; } print(x);", "9\n");
}

#[test]
fn builtin_system_time_is_callable() {
    assert_clean_stdout("print(system_time() > 0);", "true\n");
}

#[test]
fn undefined_variable_read_is_reported() {
    let run = run("print(missing);");
    assert!(run.diagnostics.contains("Undefined variable 'missing'"));
    assert_eq!("", run.stdout);
    assert_eq!(Some(vec![]), run.results);
}

#[test]
fn parse_error_yields_no_results() {
    let run = run("var x = 1; var x = 2;");
    assert!(run.results.is_none());
    assert!(run.diagnostics.contains("Variable 'x' already declared"));
}

#[test]
fn assignment_to_undeclared_name_is_a_parse_error() {
    let run = run("y = 1;");
    assert!(run.results.is_none());
    assert!(run.diagnostics.contains("Undefined variable 'y'"));
}

#[test]
fn const_reassignment_is_a_runtime_error() {
    let run = run("const k = 1; k = 2;");
    assert!(run
        .diagnostics
        .contains("Constant 'k' cannot be reassigned"));
}

#[test]
fn builtins_are_constant() {
    let run = run("system_time = 1;");
    assert!(run
        .diagnostics
        .contains("Constant 'system_time' cannot be reassigned"));
}

#[test]
fn arity_mismatch_is_reported() {
    let run = run("fun f(a) { return a; } f(1, 2);");
    assert!(run.diagnostics.contains("arity mismatch: f"));
}

#[test]
fn calling_a_non_function_is_reported() {
    let run = run("var x = 1; x();");
    assert!(run.diagnostics.contains("not callable"));
}

#[test]
fn divide_by_zero_is_reported() {
    let run = run("print(1 / 0);");
    assert!(run.diagnostics.contains("divide by zero"));
    assert_eq!("", run.stdout);
}

#[test]
fn top_level_return_is_reported() {
    let run = run("return 1;");
    assert!(run.diagnostics.contains("return outside of a function"));
}

#[test]
fn batch_mode_stops_at_the_first_runtime_error() {
    let run = run("print(1); missing; print(2);");
    assert_eq!("1\n", run.stdout);
    assert!(run.diagnostics.contains("Undefined variable 'missing'"));
}

#[test]
fn interactive_mode_continues_past_a_runtime_error() {
    let run = run_with("missing; print(2);", true);
    assert_eq!("2\n", run.stdout);
    assert!(run.diagnostics.contains("Undefined variable 'missing'"));
}

#[test]
fn type_errors_carry_the_operator() {
    let run1 = run("true + 1;");
    assert!(run1
        .diagnostics
        .contains("Expected a number or string for '+' operator"));

    let run2 = run("1 - \"a\";");
    assert!(run2
        .diagnostics
        .contains("Expected a number for '-' operator"));

    let run3 = run("1 < \"a\";");
    assert!(run3
        .diagnostics
        .contains("Expected a number or string for '<' operator"));
}

#[test]
fn comments_are_skipped() {
    assert_clean_stdout(
        "// a leading comment\nprint(1); // trailing\n// and a closing one",
        "1\n",
    );
}

//! Integration tests for the Quill interpreter
//!
//! Runs whole programs through the full pipeline:
//! - Lexing and parsing
//! - Scope resolution
//! - Evaluation with captured output
//! - Error reporting

use pretty_assertions::assert_eq;
use quill::config::{BreakPolicy, Config, NativeFaultPolicy};
use quill::{run_source, RunOutcome};

/// Run a program with the default configuration
fn run(source: &str) -> RunOutcome {
    run_source(source, &Config::default())
}

/// Run a program that must succeed and return its output
fn output_of(source: &str) -> String {
    let outcome = run(source);
    if let Some(error) = &outcome.error {
        panic!("program failed: {error}");
    }
    outcome.output
}

/// Run a program that must fail and return the error headline kind
fn error_kind(source: &str) -> &'static str {
    run(source).error.expect("program should fail").kind()
}

// ============================================
// Basic programs
// ============================================

#[test]
fn test_print_local() {
    let source = "func test_func() = { var x = 32; var y = 33; printLine(x); } test_func();";
    assert_eq!(output_of(source), "32\n");
}

#[test]
fn test_add_locals() {
    let source = "func test_add() = { var x = 32; var y = 33; var z = x + y; printLine(z); } test_add();";
    assert_eq!(output_of(source), "65\n");
}

#[test]
fn test_truncating_division() {
    let source = "func test_div() = { var x = 10; var y = 3; var z = x / y; printLine(z); } test_div();";
    assert_eq!(output_of(source), "3\n");
}

#[test]
fn test_string_concatenation() {
    let source = r#"func main() = { var greeting = "Hello, " + "World"; printLine(greeting); }"#;
    assert_eq!(output_of(source), "Hello, World\n");
}

#[test]
fn test_main_entry_point() {
    let source = r#"
        func helper() = { return 21 * 2; }
        func main() = { printLine(helper()); }
    "#;
    assert_eq!(output_of(source), "42\n");
}

#[test]
fn test_class_named_main_is_entry_point() {
    let source = r#"class main = { func init() = { printLine("constructed"); } }"#;
    assert_eq!(output_of(source), "constructed\n");
}

#[test]
fn test_comments_are_ignored() {
    let source = "// leading comment\nfunc main() = { printLine(1); // trailing\n }";
    assert_eq!(output_of(source), "1\n");
}

// ============================================
// Functions and closures
// ============================================

#[test]
fn test_recursive_fibonacci() {
    let source = "
        func fib(n) = {
            if (n < 2) { return n; }
            return fib(n - 1) + fib(n - 2);
        }
        func main() = { printLine(fib(20)); }";
    assert_eq!(output_of(source), "6765\n");
}

#[test]
fn test_counter_closure() {
    let source = "
        func makeCounter() = {
            var count = 0;
            func increment() = { count = count + 1; return count; }
            return increment;
        }
        func main() = {
            var counter = makeCounter();
            counter();
            counter();
            printLine(counter());
        }";
    assert_eq!(output_of(source), "3\n");
}

#[test]
fn test_independent_closures() {
    let source = "
        func makeCounter() = {
            var count = 0;
            func increment() = { count = count + 1; return count; }
            return increment;
        }
        func main() = {
            var a = makeCounter();
            var b = makeCounter();
            a();
            a();
            printLine(b());
        }";
    assert_eq!(output_of(source), "1\n");
}

#[test]
fn test_argument_variable_shadows_global_in_callee() {
    let source = r#"
        var x = "global";
        func show(unused) = { printLine(x); }
        func caller() = { var x = "caller"; show(x); }
        caller();
        show(0);
    "#;
    assert_eq!(output_of(source), "caller\nglobal\n");
}

#[test]
fn test_functions_are_values() {
    let source = "
        func twice(f, v) = { return f(f(v)); }
        func inc(n) = { return n + 1; }
        func main() = { printLine(twice(inc, 5)); }";
    assert_eq!(output_of(source), "7\n");
}

// ============================================
// Control flow
// ============================================

#[test]
fn test_while_with_counter() {
    let source = "
        func main() = {
            var total = 0;
            var i = 1;
            while (i <= 10) { total = total + i; i = i + 1; }
            printLine(total);
        }";
    assert_eq!(output_of(source), "55\n");
}

#[test]
fn test_break_default_leaves_function() {
    let source = r#"
        func search() = {
            var i = 0;
            while (true) {
                if (i == 3) { break; }
                i = i + 1;
            }
            printLine("not reached");
        }
        func main() = { search(); printLine("done"); }
    "#;
    assert_eq!(output_of(source), "done\n");
}

#[test]
fn test_break_loop_policy() {
    let source = r#"
        func main() = {
            var i = 0;
            while (true) {
                if (i == 3) { break; }
                i = i + 1;
            }
            printLine(i);
        }
    "#;
    let mut config = Config::default();
    config.runtime.break_policy = BreakPolicy::Loop;
    let outcome = run_source(source, &config);
    assert!(outcome.is_ok());
    assert_eq!(outcome.output, "3\n");
}

#[test]
fn test_break_policy_from_toml() {
    let config = Config::from_toml_str("[runtime]\nbreak_policy = \"loop\"\n", "quill.toml").unwrap();
    let outcome = run_source(r#"while (true) { break; } printLine("after");"#, &config);
    assert_eq!(outcome.output, "after\n");
}

// ============================================
// Classes
// ============================================

#[test]
fn test_class_with_initializer() {
    let source = r#"
        class Point = {
            func init(x, y) = { this.x = x; this.y = y; }
            func sum() = { return this.x + this.y; }
        }
        func main() = {
            var p = Point(3, 4);
            printLine(p.sum());
            p.x = 10;
            printLine(p.sum());
        }
    "#;
    assert_eq!(output_of(source), "7\n14\n");
}

#[test]
fn test_inherited_and_overridden_methods() {
    let source = r#"
        class Shape = {
            func describe() = { return "shape with area " + this.label(); }
            func label() = { return "unknown"; }
        }
        class Square : Shape = {
            func init(side) = { this.side = side; }
            func label() = { return "square"; }
            func describe() = { return super.describe() + "!"; }
        }
        func main() = {
            var s = Square(2);
            printLine(s.describe());
        }
    "#;
    assert_eq!(output_of(source), "shape with area square!\n");
}

#[test]
fn test_instances_cannot_be_compared() {
    let source = r#"
        class Box = { }
        func main() = {
            var a = Box();
            printLine("before");
            printLine(a == a);
        }"#;
    let outcome = run(source);
    assert_eq!(outcome.output, "before\n");
    assert!(outcome.error.unwrap().message().contains("cannot compare instance for equality"));
}

#[test]
fn test_callee_frame_pushed_before_arguments() {
    let source = "
        func show(v) = { printLine(v); }
        func main() = { var x = 1; { var x = 2; } show(x); }";
    assert_eq!(output_of(source), "1\n");
}

#[test]
fn test_constructor_arity_checked() {
    let source = "class P = { func init(x) = { this.x = x; } } func main() = { P(); }";
    assert_eq!(error_kind(source), "Runtime");
}

#[test]
fn test_class_cannot_inherit_from_itself() {
    assert_eq!(error_kind("class Loop : Loop = { }"), "Resolve");
}

// ============================================
// Natives
// ============================================

#[test]
fn test_clock_increases() {
    let source = "func main() = { var a = clock(); var b = clock(); printLine(b >= a); }";
    assert_eq!(output_of(source), "true\n");
}

#[test]
fn test_file_open_reads_file() {
    let path = std::env::temp_dir().join(format!("quill_native_{}.txt", std::process::id()));
    std::fs::write(&path, "file contents").unwrap();
    let source = format!(
        r#"func main() = {{ printLine(fileOpen("{}")); }}"#,
        path.display()
    );
    let output = output_of(&source);
    std::fs::remove_file(&path).ok();
    assert_eq!(output, "file contents\n");
}

#[test]
fn test_native_fault_policy() {
    let source = r#"func main() = { var f = fileOpen("/definitely/missing"); printLine("continued"); }"#;
    assert_eq!(output_of(source), "continued\n");

    let mut config = Config::default();
    config.runtime.native_faults = NativeFaultPolicy::Error;
    let outcome = run_source(source, &config);
    assert_eq!(outcome.output, "");
    assert!(outcome.error.unwrap().message().contains("fileOpen"));
}

#[test]
fn test_disabled_native_is_undefined() {
    let mut config = Config::default();
    config.natives.enabled = vec!["clock".to_string()];
    let outcome = run_source(r#"func main() = { fileOpen("x"); }"#, &config);
    let error = outcome.error.unwrap();
    assert!(error.message().contains("undefined variable: fileOpen"));
}

// ============================================
// Errors
// ============================================

#[test]
fn test_arity_mismatch_before_any_output() {
    let outcome = run("func add(a, b) = { printLine(a); } func main() = { add(1); }");
    assert_eq!(outcome.output, "");
    let error = outcome.error.unwrap();
    assert!(error.message().contains("expects 2 argument(s), got 1"));
    assert!(error.span().is_some());
}

#[test]
fn test_output_before_runtime_error_is_kept() {
    let outcome = run(r#"func main() = { printLine("first"); printLine(1 - "x"); }"#);
    assert_eq!(outcome.output, "first\n");
    assert!(outcome.error.unwrap().message().contains("cannot subtract"));
}

#[test]
fn test_division_by_zero() {
    let outcome = run("func main() = { printLine(10 / 0); }");
    assert_eq!(outcome.error.unwrap().message(), "division by zero");
}

#[test]
fn test_lexer_error() {
    assert_eq!(error_kind("func main() = { var x = 1 # 2; }"), "Lexer");
}

#[test]
fn test_parse_error() {
    assert_eq!(error_kind("func main() = { printLine(1) }"), "Parser");
}

#[test]
fn test_undefined_function_suggestion() {
    let outcome = run("func greet() = { printLine(1); } func main() = { gret(); }");
    assert!(outcome
        .error
        .unwrap()
        .message()
        .contains("did you mean `greet`"));
}

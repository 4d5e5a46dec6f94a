//! Accepting and rejecting fixtures for every checker rule.

use sn_checker::check_module;
use sn_common::{Diagnostic, ErrorKind};
use sn_parser::parse;

fn check(source: &str) -> Vec<Diagnostic> {
    let (mut module, parse_diagnostics) = parse("test.sn", source);
    assert!(
        parse_diagnostics.is_empty(),
        "fixture must parse cleanly, got: {parse_diagnostics:?}"
    );
    check_module(&mut module)
}

fn accepts(source: &str) {
    let diagnostics = check(source);
    assert!(
        diagnostics.is_empty(),
        "expected `{source}` to check, got: {diagnostics:?}"
    );
}

fn rejects(source: &str, kind: ErrorKind) {
    let diagnostics = check(source);
    assert!(
        diagnostics.iter().any(|d| d.kind == kind),
        "expected {kind:?} for `{source}`, got: {diagnostics:?}"
    );
}

// ============================================================================
// Names and scopes
// ============================================================================

#[test]
fn variable_resolution() {
    accepts("x: int = 1\ny: int = x");
    rejects("y: int = x", ErrorKind::UndefinedName);
}

#[test]
fn redeclaration_in_same_scope() {
    accepts("x: int = 1\nif true { x: int = 2 }");
    rejects("x: int = 1\nx: int = 2", ErrorKind::Redeclaration);
}

#[test]
fn functions_support_forward_reference() {
    accepts(
        "fn even(n: int): bool => { if n == 0 { return true }\n return odd(n - 1) }\n\
         fn odd(n: int): bool => { if n == 0 { return false }\n return even(n - 1) }",
    );
}

// ============================================================================
// Assignment
// ============================================================================

#[test]
fn assignment_requires_matching_types() {
    accepts("x: int = 1\nx = 2");
    rejects("x: int = 1\nx = \"no\"", ErrorKind::TypeMismatch);
    rejects("x = 1", ErrorKind::UndefinedName);
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn arithmetic_requires_numerics() {
    accepts("x: int = 2 + 3 * 4");
    accepts("x: double = 1 + 2.5");
    rejects("x: int = true + 1", ErrorKind::InvalidOperand);
}

#[test]
fn modulo_is_int_only() {
    accepts("x: int = 7 % 3");
    rejects("x: double = 7.0 % 3.0", ErrorKind::InvalidOperand);
}

#[test]
fn string_concatenation() {
    accepts("s: str = \"a\" + \"b\"");
    rejects("s: str = \"a\" + 1", ErrorKind::InvalidOperand);
}

#[test]
fn equality_requires_equal_types() {
    accepts("b: bool = 1 == 2");
    accepts("b: bool = \"a\" != \"b\"");
    rejects("b: bool = 1 == \"a\"", ErrorKind::InvalidOperand);
}

#[test]
fn ordering_accepts_numerics_and_strings() {
    accepts("b: bool = 1 < 2.5");
    accepts("b: bool = \"a\" < \"b\"");
    rejects("b: bool = true < false", ErrorKind::InvalidOperand);
}

#[test]
fn logical_operators_require_bools() {
    accepts("b: bool = true && !false || true");
    rejects("b: bool = 1 && true", ErrorKind::InvalidOperand);
}

#[test]
fn unary_operators() {
    accepts("x: int = -5\nb: bool = !false");
    rejects("b: bool = !1", ErrorKind::InvalidOperand);
    rejects("x: int = -true", ErrorKind::InvalidOperand);
}

#[test]
fn increment_requires_int_variable() {
    accepts("i: int = 0\ni++");
    rejects("d: double = 0.5\nd++", ErrorKind::InvalidOperand);
    rejects("5++", ErrorKind::InvalidOperand);
}

// ============================================================================
// Arrays, slices, ranges, spread
// ============================================================================

#[test]
fn array_literal_elements_share_a_type() {
    accepts("xs: int[] = {1, 2, 3}");
    rejects("xs: int[] = {1, \"a\"}", ErrorKind::TypeMismatch);
}

#[test]
fn empty_array_literal_borrows_declared_type() {
    accepts("xs: int[] = {}");
    rejects("x: int = {} == {}", ErrorKind::InvalidOperand);
}

#[test]
fn array_access_types() {
    accepts("xs: int[] = {1}\nx: int = xs[0]");
    accepts("xs: int[] = {1}\nx: int = xs[-1]");
    rejects("x: int = 1\ny: int = x[0]", ErrorKind::InvalidOperand);
    rejects("xs: int[] = {1}\nx: int = xs[\"0\"]", ErrorKind::TypeMismatch);
}

#[test]
fn slice_bounds_must_be_int() {
    accepts("xs: int[] = {1, 2, 3}\nys: int[] = xs[1:2]");
    accepts("xs: int[] = {1, 2, 3}\nys: int[] = xs[::2]");
    rejects(
        "xs: int[] = {1, 2, 3}\nys: int[] = xs[1.5:]",
        ErrorKind::TypeMismatch,
    );
    rejects(
        "xs: int[] = {1, 2, 3}\nys: int[] = xs[::0]",
        ErrorKind::InvalidOperand,
    );
}

#[test]
fn range_produces_int_array() {
    accepts("xs: int[] = 1..10");
    rejects("xs: int[] = 1..2.5", ErrorKind::TypeMismatch);
}

#[test]
fn spread_requires_array_operand() {
    accepts("xs: int[] = {1}\nys: int[] = {0, ...xs}");
    rejects("x: int = 1\nys: int[] = {0, ...x}", ErrorKind::InvalidOperand);
}

// ============================================================================
// Calls
// ============================================================================

#[test]
fn call_arity_and_types() {
    accepts("fn add(a: int, b: int): int => { return a + b }\nx: int = add(1, 2)");
    rejects(
        "fn add(a: int, b: int): int => { return a + b }\nx: int = add(1)",
        ErrorKind::ArityMismatch,
    );
    rejects(
        "fn add(a: int, b: int): int => { return a + b }\nx: int = add(1, \"2\")",
        ErrorKind::TypeMismatch,
    );
    rejects("x: int = 1\ny: int = x(2)", ErrorKind::InvalidOperand);
}

#[test]
fn print_accepts_any_printable_value() {
    accepts("print(1)\nprint(\"s\")\nprint({1, 2})");
    rejects("print(1, 2)", ErrorKind::ArityMismatch);
}

// ============================================================================
// Members
// ============================================================================

#[test]
fn builtin_members_have_fixed_signatures() {
    accepts("xs: int[] = {1}\nxs.push(2)\nn: int = xs.length\nb: bool = xs.contains(1)");
    accepts("s: str = \"a\"\nt: str = s.toUpper()\nn: int = s.length\nc: char = s.charAt(0)");
    rejects("xs: int[] = {1}\nxs.push(\"a\")", ErrorKind::TypeMismatch);
    rejects("xs: int[] = {1}\nxs.frobnicate()", ErrorKind::InvalidOperand);
    rejects("x: int = 1\nn: int = x.length", ErrorKind::InvalidOperand);
}

#[test]
fn string_interpolation_is_a_string() {
    accepts("a: int = 1\ns: str = $\"a={a + 1}\"");
    rejects(
        "fn f(): void => { }\ns: str = $\"v={f()}\"",
        ErrorKind::InvalidOperand,
    );
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn conditions_must_be_bool() {
    accepts("if 1 < 2 { }");
    rejects("if 1 { }", ErrorKind::TypeMismatch);
    rejects("while \"no\" { }", ErrorKind::TypeMismatch);
    rejects("for ; 1 ; { }", ErrorKind::TypeMismatch);
}

#[test]
fn for_each_iterates_arrays_and_ranges() {
    accepts("for x in 1..3 { print(x) }");
    accepts("xs: str[] = {\"a\"}\nfor s in xs { print(s) }");
    rejects("for x in 5 { }", ErrorKind::TypeMismatch);
}

#[test]
fn break_and_continue_need_a_loop() {
    accepts("while true { break }");
    accepts("for x in 1..3 { continue }");
    rejects("break", ErrorKind::BreakOutsideLoop);
    rejects("fn f(): void => { continue }", ErrorKind::BreakOutsideLoop);
}

#[test]
fn return_types_match_the_function() {
    accepts("fn f(): int => { return 1 }");
    accepts("fn f(): void => { return }");
    rejects("fn f(): int => { return \"1\" }", ErrorKind::TypeMismatch);
    rejects("fn f(): void => { return 1 }", ErrorKind::TypeMismatch);
    rejects("fn f(): int => { return }", ErrorKind::TypeMismatch);
    rejects("return 1", ErrorKind::InvalidOperand);
}

// ============================================================================
// Memory qualifiers
// ============================================================================

#[test]
fn as_ref_is_for_value_typed_variables() {
    accepts("x: int as ref = 1");
    rejects("xs: int[] as ref = {1}", ErrorKind::InvalidMemoryQualifier);
    rejects(
        "fn f(x: int as ref): void => { }",
        ErrorKind::InvalidMemoryQualifier,
    );
}

#[test]
fn as_val_is_for_heap_typed_declarations() {
    accepts("xs: int[] = {1}\nys: int[] as val = xs");
    accepts("fn f(xs: int[] as val): void => { }");
    rejects("x: int as val = 1", ErrorKind::InvalidMemoryQualifier);
    rejects(
        "fn f(x: int as val): void => { }",
        ErrorKind::InvalidMemoryQualifier,
    );
}

// ============================================================================
// Function modifiers
// ============================================================================

#[test]
fn private_functions_cannot_return_heap_types() {
    rejects(
        "private fn f(): int[] => { return {1} }",
        ErrorKind::InvalidReturnType,
    );
    accepts("shared fn f(): int[] => { return {1} }");
    rejects(
        "private fn f(): str => { return \"s\" }",
        ErrorKind::InvalidReturnType,
    );
    accepts("private fn f(): int => { return 1 }");
}

#[test]
fn default_functions_allow_string_but_not_array_returns() {
    accepts("fn f(): str => { return \"s\" }");
    rejects("fn f(): int[] => { return {1} }", ErrorKind::InvalidReturnType);
}

// ============================================================================
// Lambdas and captures
// ============================================================================

#[test]
fn lambda_parameters_and_return_check() {
    accepts("f: fn(int): int = fn (a: int): int => { return a * 2 }\nx: int = f(3)");
    rejects(
        "f: fn(int): int = fn (a: int): int => { return \"a\" }",
        ErrorKind::TypeMismatch,
    );
}

#[test]
fn lambda_captures_are_recorded() {
    let (mut module, _) = parse(
        "test.sn",
        "fn outer(): void => {\n n: int = 10\n f: fn(int): int = fn (a: int): int => { return a + n }\n}",
    );
    assert!(check_module(&mut module).is_empty());
    let mut found = false;
    for i in 0..module.arena.expr_count() {
        if let sn_ast::ExprKind::Lambda { captures, .. } =
            &module.arena.expr(sn_ast::ExprId(i as u32)).kind
        {
            let names: Vec<&str> = captures.iter().map(|c| c.name.as_str()).collect();
            assert_eq!(names, ["n"]);
            found = true;
        }
    }
    assert!(found, "expected a lambda in the fixture");
}

// ============================================================================
// Structured results and continuation
// ============================================================================

#[test]
fn checker_reports_multiple_independent_errors() {
    let diagnostics = check("x: int = \"a\"\ny: str = 1\nz: bool = 2");
    assert_eq!(diagnostics.len(), 3);
    assert!(diagnostics.iter().all(|d| d.kind == ErrorKind::TypeMismatch));
}

#[test]
fn error_type_suppresses_cascades() {
    // One undefined name, one diagnostic: the error type flows through the
    // arithmetic without re-reporting.
    let diagnostics = check("x: int = missing + 1 * 2");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, ErrorKind::UndefinedName);
}

#[test]
fn deeply_nested_expressions_check_without_overflow() {
    let depth = 1_000;
    let source = format!(
        "x: int = {}1{}",
        "(1 + ".repeat(depth),
        ")".repeat(depth)
    );
    let (mut module, parse_diagnostics) = parse("deep.sn", &source);
    assert!(parse_diagnostics.is_empty(), "got: {parse_diagnostics:?}");
    assert!(check_module(&mut module).is_empty());
}

#[test]
fn every_checked_expression_has_a_type() {
    let (mut module, _) = parse(
        "test.sn",
        "fn main(): int => {\n xs: int[] = {1, 2}\n s: str = $\"n={xs.length}\"\n print(s)\n return xs[0]\n}",
    );
    assert!(check_module(&mut module).is_empty());
    for i in 0..module.arena.expr_count() {
        let expr = module.arena.expr(sn_ast::ExprId(i as u32));
        assert!(
            expr.ty.is_some(),
            "expression {i} at line {} has no type",
            expr.line
        );
    }
}

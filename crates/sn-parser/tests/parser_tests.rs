//! Parser fixtures: statement shapes, precedence, recovery.

use sn_ast::{ExprKind, LiteralValue, StmtKind};
use sn_common::Diagnostic;
use sn_lexer::TokenKind;
use sn_parser::parse;

fn parse_ok(source: &str) -> sn_ast::Module {
    let (module, diagnostics) = parse("test.sn", source);
    assert!(
        diagnostics.is_empty(),
        "expected no diagnostics for `{source}`, got: {diagnostics:?}"
    );
    module
}

fn parse_err(source: &str) -> Vec<Diagnostic> {
    let (_, diagnostics) = parse("test.sn", source);
    assert!(
        !diagnostics.is_empty(),
        "expected diagnostics for `{source}`"
    );
    diagnostics
}

#[test]
fn parses_function_declaration() {
    let module = parse_ok("fn main(): int => { return 2 + 3 * 4 }");
    assert_eq!(module.stmts.len(), 1);
    let StmtKind::Function(decl) = &module.arena.stmt(module.stmts[0]).kind else {
        panic!("expected a function statement");
    };
    assert_eq!(decl.name, "main");
    assert!(decl.params.is_empty());
    assert_eq!(module.arena.type_to_string(decl.ret), "int");
    assert_eq!(decl.body.len(), 1);
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let module = parse_ok("x: int = 2 + 3 * 4");
    let StmtKind::VarDecl { initializer, .. } = &module.arena.stmt(module.stmts[0]).kind else {
        panic!("expected a var decl");
    };
    let ExprKind::Binary { op, right, .. } = &module.arena.expr(initializer.unwrap()).kind
    else {
        panic!("expected a binary expression");
    };
    assert_eq!(*op, TokenKind::Plus);
    let ExprKind::Binary { op: inner, .. } = &module.arena.expr(*right).kind else {
        panic!("expected nested multiplication");
    };
    assert_eq!(*inner, TokenKind::Star);
}

#[test]
fn parses_memory_qualifiers() {
    let module = parse_ok("x: int as ref = 1\nys: int[] as val = {1, 2}");
    let StmtKind::VarDecl { qualifier, .. } = &module.arena.stmt(module.stmts[0]).kind else {
        panic!("expected a var decl");
    };
    assert_eq!(*qualifier, sn_ast::MemQualifier::AsRef);
    let StmtKind::VarDecl { qualifier, .. } = &module.arena.stmt(module.stmts[1]).kind else {
        panic!("expected a var decl");
    };
    assert_eq!(*qualifier, sn_ast::MemQualifier::AsVal);
}

#[test]
fn parses_shared_and_private_modifiers() {
    let module = parse_ok("shared fn f(): int[] => { return {1} }\nprivate fn g(): int => { return 0 }");
    let StmtKind::Function(f) = &module.arena.stmt(module.stmts[0]).kind else {
        panic!("expected a function");
    };
    assert_eq!(f.modifier, sn_ast::FunctionModifier::Shared);
    let StmtKind::Function(g) = &module.arena.stmt(module.stmts[1]).kind else {
        panic!("expected a function");
    };
    assert_eq!(g.modifier, sn_ast::FunctionModifier::Private);
}

#[test]
fn parses_for_each_over_range() {
    let module = parse_ok("for x in 1..3 { print(x) }");
    let StmtKind::ForEach { var_name, iterable, .. } =
        &module.arena.stmt(module.stmts[0]).kind
    else {
        panic!("expected for-each");
    };
    assert_eq!(var_name, "x");
    assert!(matches!(
        module.arena.expr(*iterable).kind,
        ExprKind::Range { .. }
    ));
}

#[test]
fn parses_c_style_for_with_optional_parts() {
    let module = parse_ok("for ; ; { break }");
    let StmtKind::For {
        initializer,
        condition,
        increment,
        ..
    } = &module.arena.stmt(module.stmts[0]).kind
    else {
        panic!("expected for");
    };
    assert!(initializer.is_none());
    assert!(condition.is_none());
    assert!(increment.is_none());
}

#[test]
fn parses_slices_with_missing_bounds() {
    for (source, has_start, has_end, has_step) in [
        ("y: int[] = xs[1:3]", true, true, false),
        ("y: int[] = xs[:3]", false, true, false),
        ("y: int[] = xs[1:]", true, false, false),
        ("y: int[] = xs[::2]", false, false, true),
        ("y: int[] = xs[1:5:2]", true, true, true),
    ] {
        let module = parse_ok(source);
        let StmtKind::VarDecl { initializer, .. } = &module.arena.stmt(module.stmts[0]).kind
        else {
            panic!("expected var decl in `{source}`");
        };
        let ExprKind::ArraySlice {
            start, end, step, ..
        } = &module.arena.expr(initializer.unwrap()).kind
        else {
            panic!("expected slice in `{source}`");
        };
        assert_eq!(start.is_some(), has_start, "start in `{source}`");
        assert_eq!(end.is_some(), has_end, "end in `{source}`");
        assert_eq!(step.is_some(), has_step, "step in `{source}`");
    }
}

#[test]
fn parses_interpolated_string_into_parts() {
    let module = parse_ok("s: str = $\"a={1 + 1}\"");
    let StmtKind::VarDecl { initializer, .. } = &module.arena.stmt(module.stmts[0]).kind else {
        panic!("expected var decl");
    };
    let ExprKind::Interpolated { parts } = &module.arena.expr(initializer.unwrap()).kind else {
        panic!("expected interpolated expression");
    };
    assert_eq!(parts.len(), 2);
    let ExprKind::Literal { value, .. } = &module.arena.expr(parts[0]).kind else {
        panic!("expected leading literal part");
    };
    assert_eq!(*value, LiteralValue::Str("a=".to_string()));
    assert!(matches!(
        module.arena.expr(parts[1]).kind,
        ExprKind::Binary { .. }
    ));
}

#[test]
fn parses_method_call_as_call_on_member() {
    let module = parse_ok("xs.push(4)");
    let StmtKind::Expression { expr } = &module.arena.stmt(module.stmts[0]).kind else {
        panic!("expected expression statement");
    };
    let ExprKind::Call { callee, args } = &module.arena.expr(*expr).kind else {
        panic!("expected call");
    };
    assert_eq!(args.len(), 1);
    let ExprKind::Member { name, .. } = &module.arena.expr(*callee).kind else {
        panic!("expected member callee");
    };
    assert_eq!(name, "push");
}

#[test]
fn parses_lambda_expression() {
    let module = parse_ok("f: fn(int): int = fn (a: int): int => { return a * 2 }");
    let StmtKind::VarDecl { initializer, ty, .. } = &module.arena.stmt(module.stmts[0]).kind
    else {
        panic!("expected var decl");
    };
    assert_eq!(module.arena.type_to_string(*ty), "fn(int): int");
    let ExprKind::Lambda { params, .. } = &module.arena.expr(initializer.unwrap()).kind else {
        panic!("expected lambda initializer");
    };
    assert_eq!(params.len(), 1);
}

#[test]
fn parses_spread_in_array_literal_and_call() {
    let module = parse_ok("zs: int[] = {1, ...xs, 5}\nf(...xs)");
    let StmtKind::VarDecl { initializer, .. } = &module.arena.stmt(module.stmts[0]).kind else {
        panic!("expected var decl");
    };
    let ExprKind::Array { elements } = &module.arena.expr(initializer.unwrap()).kind else {
        panic!("expected array literal");
    };
    assert!(matches!(
        module.arena.expr(elements[1]).kind,
        ExprKind::Spread { .. }
    ));
}

#[test]
fn import_is_recorded_on_the_module() {
    let module = parse_ok("import net\nimport process");
    assert_eq!(module.imports, ["net", "process"]);
}

#[test]
fn recovery_reports_multiple_statement_errors() {
    let diagnostics = parse_err("x: = 1\ny: int = )\nz: int = 3");
    assert!(diagnostics.len() >= 2, "got: {diagnostics:?}");
}

#[test]
fn stray_closing_brace_is_reported_and_skipped() {
    let (module, diagnostics) = parse("test.sn", "}\nx: int = 1");
    assert!(!diagnostics.is_empty());
    assert_eq!(module.stmts.len(), 1);
}

#[test]
fn error_carries_file_and_line() {
    let diagnostics = parse_err("x: int =\n@");
    assert!(diagnostics.iter().all(|d| d.file == "test.sn"));
    assert!(diagnostics.iter().any(|d| d.line >= 1));
}

#[test]
fn deeply_nested_expressions_parse_without_overflow() {
    let depth = 1_000;
    let source = format!(
        "x: int = {}1{}",
        "(".repeat(depth),
        ")".repeat(depth)
    );
    let (module, diagnostics) = parse("deep.sn", &source);
    assert!(diagnostics.is_empty(), "got: {diagnostics:?}");
    assert_eq!(module.stmts.len(), 1);
}

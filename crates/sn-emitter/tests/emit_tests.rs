//! Emitted-C inspection for the lowering contracts: arena placement,
//! runtime dispatch, qualifier semantics, interpolation chains.

use sn_checker::check_module;
use sn_emitter::{emit_module, write_c_file};
use sn_parser::parse;

fn emit(source: &str) -> String {
    let (mut module, parse_diagnostics) = parse("test.sn", source);
    assert!(
        parse_diagnostics.is_empty(),
        "fixture must parse: {parse_diagnostics:?}"
    );
    let check_diagnostics = check_module(&mut module);
    assert!(
        check_diagnostics.is_empty(),
        "fixture must check: {check_diagnostics:?}"
    );
    emit_module(&module).expect("emission succeeds")
}

fn count(text: &str, needle: &str) -> usize {
    text.matches(needle).count()
}

#[test]
fn arithmetic_lowers_to_typed_runtime_calls() {
    let c = emit("fn main(): int => { return 2 + 3 * 4 }");
    assert!(c.contains("rt_add_long(2, rt_mul_long(3, 4))"), "{c}");
    assert!(c.contains("long __exit_code__ = sn_main(__arena_0__);"), "{c}");
    assert!(c.contains("return (int)__exit_code__;"), "{c}");
}

#[test]
fn function_bodies_use_single_exit_cleanup() {
    let c = emit("fn f(): int => { return 1 }\nfn main(): int => { return f() }");
    assert!(c.contains("RtArena *__arena_1__ = rt_arena_create(__caller_arena__);"), "{c}");
    assert!(c.contains("goto sn_f_return;"), "{c}");
    assert!(c.contains("sn_f_return:"), "{c}");
    let label = c.find("sn_f_return:").unwrap();
    let destroy = c[label..].find("rt_arena_destroy(__arena_1__);").unwrap();
    let ret = c[label..].find("return __return_value__;").unwrap();
    assert!(destroy < ret, "cleanup precedes the return");
}

#[test]
fn loops_get_a_per_iteration_arena() {
    let c = emit(
        "fn main(): int => {\n while true {\n xs: int[] = {1, 2, 3}\n }\n return 0\n}",
    );
    // Loop arena is a child of the function arena, and the literal
    // allocates from the loop arena.
    assert!(c.contains("= rt_arena_create(__arena_1__);"), "{c}");
    let create = c.find("__loop_arena_").unwrap();
    let destroy = c.rfind("rt_arena_destroy(__loop_arena_").unwrap();
    assert!(create < destroy, "{c}");
    assert!(c.contains("rt_array_create_long(__loop_arena_"), "{c}");
}

#[test]
fn break_destroys_the_loop_arena_first() {
    let c = emit("fn main(): int => {\n while true {\n break\n }\n return 0\n}");
    let break_at = c.find("break;").unwrap();
    let destroy = c.find("rt_arena_destroy(__loop_arena_").unwrap();
    assert!(destroy < break_at, "{c}");
}

#[test]
fn shared_functions_allocate_returns_from_the_caller() {
    let c = emit("shared fn f(): int[] => { return {1} }\nfn main(): int => { return 0 }");
    assert!(
        c.contains("rt_array_create_long(__caller_arena__, 1, (long[]){1})"),
        "{c}"
    );
}

#[test]
fn default_functions_copy_string_returns_to_the_caller() {
    let c = emit("fn f(): str => { return \"s\" }\nfn main(): int => { return 0 }");
    assert!(
        c.contains("__return_value__ = rt_to_string_string(__caller_arena__, \"s\");"),
        "{c}"
    );
}

#[test]
fn as_ref_binds_through_function_arena_storage() {
    let c = emit(
        "fn main(): int => {\n x: int as ref = 1\n x = x + 1\n return x\n}",
    );
    assert!(
        c.contains("long *x = rt_arena_alloc(__arena_1__, sizeof(long));"),
        "{c}"
    );
    assert!(c.contains("*x = 1;"), "{c}");
    assert!(c.contains("((*x) = rt_add_long((*x), 1))"), "{c}");
    assert!(c.contains("__return_value__ = (*x);"), "{c}");
}

#[test]
fn as_val_parameters_clone_on_entry() {
    let c = emit("fn f(xs: int[] as val): int => { return xs.length }\nfn main(): int => { return 0 }");
    assert!(c.contains("xs = rt_array_clone_long(__arena_1__, xs);"), "{c}");
}

#[test]
fn as_val_assignment_clones() {
    let c = emit(
        "fn main(): int => {\n xs: int[] = {1}\n ys: int[] as val = xs\n ys = xs\n return 0\n}",
    );
    assert_eq!(count(&c, "rt_array_clone_long(__arena_1__, xs)"), 2, "{c}");
}

#[test]
fn interpolation_chains_conversions_and_concats() {
    let c = emit("fn main(): int => {\n s: str = $\"a={1 + 1}\"\n print(s)\n return 0\n}");
    // One extern declaration plus exactly two concat calls; the chain
    // starts from the empty string.
    assert_eq!(count(&c, "rt_str_concat("), 3, "{c}");
    assert_eq!(count(&c, "rt_to_string_string("), 2, "{c}");
    assert_eq!(count(&c, "rt_to_string_long("), 2, "{c}");
    assert!(c.contains("\"\""), "{c}");
    assert!(c.contains("rt_to_string_long(__arena_1__, rt_add_long(1, 1))"), "{c}");
}

#[test]
fn for_each_over_a_range_counts_inclusively() {
    let c = emit("fn main(): int => {\n for x in 1..3 {\n print(x)\n }\n return 0\n}");
    assert!(c.contains("long x = 1;"), "{c}");
    assert!(c.contains("x <= __range_end_"), "{c}");
    assert!(c.contains("x++"), "{c}");
    assert!(c.contains("rt_print_long(x)"), "{c}");
    // The literal range is never materialized.
    assert!(!c.contains("rt_array_range("), "{c}");
}

#[test]
fn for_each_over_an_array_indexes_through_the_runtime() {
    let c = emit(
        "fn main(): int => {\n xs: str[] = {\"a\", \"b\"}\n for s in xs {\n print(s)\n }\n return 0\n}",
    );
    assert!(c.contains("rt_array_length(__iter_"), "{c}");
    assert!(c.contains("rt_array_get_string(__iter_"), "{c}");
    assert!(c.contains("rt_print_string(s)"), "{c}");
}

#[test]
fn standalone_range_materializes() {
    let c = emit("fn main(): int => {\n xs: int[] = 1..3\n return xs.length\n}");
    assert!(c.contains("rt_array_range(__arena_1__, 1, 3)"), "{c}");
}

#[test]
fn slices_use_sentinels_for_missing_bounds() {
    let c = emit(
        "fn main(): int => {\n xs: int[] = {1, 2, 3}\n ys: int[] = xs[1:]\n zs: int[] = xs[:2:2]\n return 0\n}",
    );
    assert!(c.contains("#define RT_SLICE_NONE"), "{c}");
    assert!(
        c.contains("rt_array_slice_long(__arena_1__, xs, 1, RT_SLICE_NONE, 1)"),
        "{c}"
    );
    assert!(
        c.contains("rt_array_slice_long(__arena_1__, xs, RT_SLICE_NONE, 2, 2)"),
        "{c}"
    );
}

#[test]
fn methods_dispatch_on_the_element_type() {
    let c = emit(
        "fn main(): int => {\n xs: str[] = {\"a\"}\n xs.push(\"b\")\n ns: int[] = {1}\n ns.push(2)\n return 0\n}",
    );
    assert!(c.contains("rt_array_push_string(__arena_1__, xs, \"b\")"), "{c}");
    assert!(c.contains("rt_array_push_long(__arena_1__, ns, 2)"), "{c}");
}

#[test]
fn spread_in_a_literal_builds_a_concat_chain() {
    let c = emit(
        "fn main(): int => {\n xs: int[] = {1}\n ys: int[] = {0, ...xs, 5}\n zs: int[] = {...xs}\n return 0\n}",
    );
    assert!(c.contains("rt_array_concat_long(__arena_1__, rt_array_concat_long(__arena_1__, rt_array_create_long(__arena_1__, 1, (long[]){0}), xs), rt_array_create_long(__arena_1__, 1, (long[]){5}))"), "{c}");
    assert!(c.contains("rt_array_clone_long(__arena_1__, xs)"), "{c}");
}

#[test]
fn increments_take_the_variable_address() {
    let c = emit("fn main(): int => {\n i: int = 0\n i++\n i--\n return i\n}");
    assert!(c.contains("rt_post_inc_long(&i)"), "{c}");
    assert!(c.contains("rt_post_dec_long(&i)"), "{c}");
}

#[test]
fn lambdas_lift_with_capture_environments() {
    let c = emit(
        "fn outer(): int => {\n n: int = 10\n f: fn(int): int = fn (a: int): int => { return a + n }\n return f(4)\n}\nfn main(): int => { return outer() }",
    );
    assert!(c.contains("} __lambda_0_env__;"), "{c}");
    assert!(
        c.contains("static long __lambda_0__(RtArena *__caller_arena__, __lambda_0_env__ *__env__, long a)"),
        "{c}"
    );
    assert!(c.contains("rt_add_long(a, (*__env__->n))"), "{c}");
    assert!(c.contains("__lambda_0_bind__(__arena_1__, &n)"), "{c}");
    // The call goes through a typed trampoline, once per signature.
    assert!(c.contains("__call_long_long__(__arena_1__, f, 4)"), "{c}");
}

#[test]
fn capture_free_lambdas_skip_the_environment() {
    let c = emit(
        "fn main(): int => {\n f: fn(): int = fn (): int => { return 7 }\n return f()\n}",
    );
    assert!(c.contains("(RtClosure){ (void *)__lambda_0__, NULL }"), "{c}");
    assert!(!c.contains("__lambda_0_bind__"), "{c}");
}

#[test]
fn print_dispatches_per_type() {
    let c = emit(
        "fn main(): int => {\n print(1)\n print(1.5)\n print(\"s\")\n print(true)\n print({1, 2})\n return 0\n}",
    );
    assert!(c.contains("rt_print_long(1)"), "{c}");
    assert!(c.contains("rt_print_double(1.5)"), "{c}");
    assert!(c.contains("rt_print_string(\"s\")"), "{c}");
    assert!(c.contains("rt_print_bool(1)"), "{c}");
    assert!(c.contains("rt_print_array_long("), "{c}");
}

#[test]
fn externs_are_declared_once_in_first_use_order() {
    let c = emit("fn main(): int => { return 1 + 2 + 3 }");
    assert_eq!(count(&c, "extern long rt_add_long(long, long);"), 1, "{c}");
    let create = c.find("extern RtArena *rt_arena_create(RtArena *);").unwrap();
    let add = c.find("extern long rt_add_long(long, long);").unwrap();
    assert!(create < add, "arena externs precede arithmetic: {c}");
}

#[test]
fn top_level_statements_run_before_main_dispatch() {
    let c = emit("x: int = 5\nfn main(): int => { return x }\n");
    assert!(c.contains("static long x;"), "{c}");
    let init = c.find("x = 5;").unwrap();
    let call = c.find("sn_main(__arena_0__)").unwrap();
    assert!(init < call, "{c}");
    assert!(c.contains("__return_value__ = x;"), "{c}");
}

#[test]
fn modules_without_main_still_get_an_entry_point() {
    let c = emit("print(\"hello\")");
    assert!(c.contains("int main(void) {"), "{c}");
    assert!(c.contains("rt_print_string(\"hello\")"), "{c}");
    assert!(c.contains("return 0;"), "{c}");
}

#[test]
fn string_operators_and_methods_lower_to_str_calls() {
    let c = emit(
        "fn main(): int => {\n s: str = \"a\" + \"b\"\n t: str = s.toUpper()\n b: bool = s < t\n u: str = s.substring(0, 1)\n return s.length\n}",
    );
    assert!(c.contains("rt_str_concat(__arena_1__, \"a\", \"b\")"), "{c}");
    assert!(c.contains("rt_str_toUpper(__arena_1__, s)"), "{c}");
    assert!(c.contains("rt_lt_string(s, t)"), "{c}");
    assert!(c.contains("rt_str_substring(__arena_1__, s, 0, 1)"), "{c}");
    assert!(c.contains("rt_str_length(s)"), "{c}");
}

#[test]
fn equality_dispatches_per_operand_type() {
    let c = emit(
        "fn main(): int => {\n b1: bool = 1 == 2\n b2: bool = 1.5 != 2.5\n b3: bool = \"a\" == \"b\"\n xs: int[] = {1}\n b4: bool = xs == xs\n b5: bool = xs != xs\n return 0\n}",
    );
    assert!(c.contains("rt_eq_long(1, 2)"), "{c}");
    assert!(c.contains("rt_ne_double(1.5, 2.5)"), "{c}");
    assert!(c.contains("rt_eq_string(\"a\", \"b\")"), "{c}");
    assert!(c.contains("rt_array_eq_long(xs, xs)"), "{c}");
    assert!(c.contains("(!rt_array_eq_long(xs, xs))"), "{c}");
}

#[test]
fn write_is_atomic_and_leaves_no_temp_behind() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.c");
    write_c_file(&target, "int main(void) { return 0; }\n").unwrap();
    let written = std::fs::read_to_string(&target).unwrap();
    assert!(written.contains("int main"));
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

//! Expression lowering onto the `rt_*` ABI.

use sn_ast::{ExprId, ExprKind, LiteralValue, Type, TypeId};
use sn_lexer::TokenKind;

use crate::runtime::{c_type, rt_suffix};
use crate::{CEmitter, Slot};

impl<'m> CEmitter<'m> {
    /// C expression text for one node.
    pub(crate) fn expr_text(&mut self, id: ExprId) -> String {
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || self.expr_text_inner(id))
    }

    fn expr_text_inner(&mut self, id: ExprId) -> String {
        match self.module.arena.expr(id).kind.clone() {
            ExprKind::Literal { value, .. } => self.literal_text(&value),
            ExprKind::Variable { name } => self.var_use(&name),
            ExprKind::Assign { name, value } => self.assign_text(&name, value),
            ExprKind::Binary { left, op, right } => self.binary_text(left, op, right),
            ExprKind::Unary { op, operand } => {
                let operand = self.expr_text(operand);
                match op {
                    TokenKind::Bang => format!("(!{operand})"),
                    _ => format!("(-{operand})"),
                }
            }
            ExprKind::Increment { operand } => self.step_text(operand, "rt_post_inc_long"),
            ExprKind::Decrement { operand } => self.step_text(operand, "rt_post_dec_long"),
            ExprKind::Array { elements } => {
                let ty = self.ty_of(id);
                self.array_literal_text(&elements, ty)
            }
            ExprKind::ArrayAccess { array, index } => {
                let element = self.ty_of(id);
                let suffix = rt_suffix(&self.module.arena, element);
                let element_c = c_type(&self.module.arena, element);
                let space = if element_c.ends_with('*') { "" } else { " " };
                self.runtime.declare(format!(
                    "extern {element_c}{space}rt_array_get_{suffix}(RtArray *, long);"
                ));
                let array = self.expr_text(array);
                let index = self.expr_text(index);
                format!("rt_array_get_{suffix}({array}, {index})")
            }
            ExprKind::ArraySlice {
                array,
                start,
                end,
                step,
            } => self.slice_text(array, start, end, step),
            ExprKind::Range { start, end } => {
                self.runtime.declare(
                    "extern RtArray *rt_array_range(RtArena *, long, long);".to_string(),
                );
                let start = self.expr_text(start);
                let end = self.expr_text(end);
                let arena = self.alloc_arena();
                format!("rt_array_range({arena}, {start}, {end})")
            }
            // A spread in an argument list forwards the whole array.
            ExprKind::Spread { array } => self.expr_text(array),
            ExprKind::Call { callee, args } => self.call_text(callee, &args),
            ExprKind::Interpolated { parts } => self.interpolated_text(&parts),
            ExprKind::Member { object, name } => self.member_text(object, &name),
            ExprKind::Lambda {
                params,
                ret,
                body,
                modifier,
                captures,
                lambda_id,
            } => self.emit_lambda(lambda_id, &params, ret, &body, modifier, &captures),
        }
    }

    fn literal_text(&mut self, value: &LiteralValue) -> String {
        match value {
            LiteralValue::Int(v) => format!("{v}"),
            LiteralValue::Double(v) => format!("{v:?}"),
            LiteralValue::Char(raw) => format!("'{raw}'"),
            LiteralValue::Str(raw) => format!("\"{raw}\""),
            LiteralValue::Bool(true) => "1".to_string(),
            LiteralValue::Bool(false) => "0".to_string(),
        }
    }

    fn assign_text(&mut self, name: &str, value: ExprId) -> String {
        let value_ty = self.ty_of(value);
        let mut value_text = self.expr_text(value);
        let lvalue = match self.resolve(name) {
            Some(Slot::Local(info) | Slot::Global(info)) => {
                if info.qualifier == sn_ast::MemQualifier::AsVal {
                    let arena = self.alloc_arena();
                    value_text = self.clone_value(value_ty, &value_text, &arena);
                }
                if info.qualifier == sn_ast::MemQualifier::AsRef {
                    format!("(*{})", info.c_name)
                } else {
                    info.c_name
                }
            }
            Some(Slot::Capture(_)) => format!("(*__env__->{name})"),
            _ => {
                self.internal_error.get_or_insert_with(|| {
                    format!("unresolved assignment target '{name}' during emission")
                });
                return "0".to_string();
            }
        };
        format!("({lvalue} = {value_text})")
    }

    fn binary_text(&mut self, left: ExprId, op: TokenKind, right: ExprId) -> String {
        let lhs_ty = self.ty_of(left);
        let rhs_ty = self.ty_of(right);
        let lhs = self.expr_text(left);
        let rhs = self.expr_text(right);
        let arena = &self.module.arena;
        let either_double = matches!(arena.ty(lhs_ty), Type::Double)
            || matches!(arena.ty(rhs_ty), Type::Double);
        let both_str =
            matches!(arena.ty(lhs_ty), Type::Str) && matches!(arena.ty(rhs_ty), Type::Str);

        match op {
            TokenKind::AmpAmp => format!("({lhs} && {rhs})"),
            TokenKind::PipePipe => format!("({lhs} || {rhs})"),
            TokenKind::Plus if both_str => {
                self.runtime.declare(
                    "extern char *rt_str_concat(RtArena *, char *, char *);".to_string(),
                );
                let arena = self.alloc_arena();
                format!("rt_str_concat({arena}, {lhs}, {rhs})")
            }
            TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash
            | TokenKind::Percent => {
                let name = match op {
                    TokenKind::Plus => "add",
                    TokenKind::Minus => "sub",
                    TokenKind::Star => "mul",
                    TokenKind::Slash => "div",
                    _ => "mod",
                };
                if either_double {
                    self.runtime.declare(format!(
                        "extern double rt_{name}_double(double, double);"
                    ));
                    format!("rt_{name}_double({lhs}, {rhs})")
                } else {
                    self.runtime
                        .declare(format!("extern long rt_{name}_long(long, long);"));
                    format!("rt_{name}_long({lhs}, {rhs})")
                }
            }
            TokenKind::EqualsEquals
            | TokenKind::BangEquals
            | TokenKind::Less
            | TokenKind::LessEquals
            | TokenKind::Greater
            | TokenKind::GreaterEquals => {
                let name = match op {
                    TokenKind::EqualsEquals => "eq",
                    TokenKind::BangEquals => "ne",
                    TokenKind::Less => "lt",
                    TokenKind::LessEquals => "le",
                    TokenKind::Greater => "gt",
                    _ => "ge",
                };
                self.comparison_text(name, op, lhs_ty, rhs_ty, &lhs, &rhs)
            }
            _ => {
                self.internal_error
                    .get_or_insert_with(|| format!("binary operator {op} reached the emitter"));
                "0".to_string()
            }
        }
    }

    fn comparison_text(
        &mut self,
        name: &str,
        op: TokenKind,
        lhs_ty: TypeId,
        rhs_ty: TypeId,
        lhs: &str,
        rhs: &str,
    ) -> String {
        let arena = &self.module.arena;
        // Array equality dispatches on the element type.
        if let Some(element) = arena.element_type(lhs_ty) {
            let suffix = rt_suffix(arena, element);
            self.runtime.declare(format!(
                "extern int rt_array_eq_{suffix}(RtArray *, RtArray *);"
            ));
            return if op == TokenKind::BangEquals {
                format!("(!rt_array_eq_{suffix}({lhs}, {rhs}))")
            } else {
                format!("rt_array_eq_{suffix}({lhs}, {rhs})")
            };
        }
        let both_str =
            matches!(arena.ty(lhs_ty), Type::Str) && matches!(arena.ty(rhs_ty), Type::Str);
        let either_double = matches!(arena.ty(lhs_ty), Type::Double)
            || matches!(arena.ty(rhs_ty), Type::Double);
        let both_closure = matches!(arena.ty(lhs_ty), Type::Function { .. });
        if both_closure {
            self.runtime.declare(
                "extern int rt_eq_closure(RtClosure, RtClosure);".to_string(),
            );
            return if op == TokenKind::BangEquals {
                format!("(!rt_eq_closure({lhs}, {rhs}))")
            } else {
                format!("rt_eq_closure({lhs}, {rhs})")
            };
        }
        if both_str {
            self.runtime
                .declare(format!("extern int rt_{name}_string(char *, char *);"));
            format!("rt_{name}_string({lhs}, {rhs})")
        } else if either_double {
            self.runtime
                .declare(format!("extern int rt_{name}_double(double, double);"));
            format!("rt_{name}_double({lhs}, {rhs})")
        } else {
            // ints, bools, and chars all compare through the long entry
            // points after the usual promotions.
            self.runtime
                .declare(format!("extern int rt_{name}_long(long, long);"));
            format!("rt_{name}_long({lhs}, {rhs})")
        }
    }

    fn step_text(&mut self, operand: ExprId, helper: &str) -> String {
        self.runtime
            .declare(format!("extern long {helper}(long *);"));
        let addr = match self.module.arena.expr(operand).kind.clone() {
            ExprKind::Variable { name } => self.var_addr(&name),
            _ => {
                self.internal_error.get_or_insert_with(|| {
                    "increment of a non-variable reached the emitter".to_string()
                });
                "0".to_string()
            }
        };
        format!("{helper}({addr})")
    }

    /// Array literals without spreads are one `create` call over a
    /// compound literal; spreads turn the literal into a concat chain.
    fn array_literal_text(&mut self, elements: &[ExprId], array_ty: TypeId) -> String {
        let element = self
            .module
            .arena
            .element_type(array_ty)
            .unwrap_or_else(|| self.module.arena.error_type());
        let suffix = rt_suffix(&self.module.arena, element);
        let element_c = c_type(&self.module.arena, element);
        let space = if element_c.ends_with('*') { "" } else { " " };
        self.runtime.declare(format!(
            "extern RtArray *rt_array_create_{suffix}(RtArena *, long, {element_c}{space}*);"
        ));
        let arena = self.alloc_arena();

        // (piece text, came from a spread)
        let mut pieces: Vec<(String, bool)> = Vec::new();
        let mut run: Vec<String> = Vec::new();
        for &element_id in elements {
            if let ExprKind::Spread { array } = self.module.arena.expr(element_id).kind.clone() {
                if !run.is_empty() {
                    let n = run.len();
                    let items = run.join(", ");
                    pieces.push((
                        format!("rt_array_create_{suffix}({arena}, {n}, ({element_c}[]){{{items}}})"),
                        false,
                    ));
                    run.clear();
                }
                pieces.push((self.expr_text(array), true));
            } else {
                run.push(self.expr_text(element_id));
            }
        }
        if !run.is_empty() {
            let n = run.len();
            let items = run.join(", ");
            pieces.push((
                format!("rt_array_create_{suffix}({arena}, {n}, ({element_c}[]){{{items}}})"),
                false,
            ));
        }
        let mut pieces = pieces.into_iter();
        let Some((first, first_is_spread)) = pieces.next() else {
            return format!("rt_array_create_{suffix}({arena}, 0, NULL)");
        };
        let mut acc = if first_is_spread {
            // `{...xs}` builds a fresh array rather than aliasing.
            self.runtime.declare(format!(
                "extern RtArray *rt_array_clone_{suffix}(RtArena *, RtArray *);"
            ));
            format!("rt_array_clone_{suffix}({arena}, {first})")
        } else {
            first
        };
        for (piece, _) in pieces {
            self.runtime.declare(format!(
                "extern RtArray *rt_array_concat_{suffix}(RtArena *, RtArray *, RtArray *);"
            ));
            acc = format!("rt_array_concat_{suffix}({arena}, {acc}, {piece})");
        }
        acc
    }

    fn slice_text(
        &mut self,
        array: ExprId,
        start: Option<ExprId>,
        end: Option<ExprId>,
        step: Option<ExprId>,
    ) -> String {
        let array_ty = self.ty_of(array);
        let element = self
            .module
            .arena
            .element_type(array_ty)
            .unwrap_or_else(|| self.module.arena.error_type());
        let suffix = rt_suffix(&self.module.arena, element);
        self.runtime.declare(format!(
            "extern RtArray *rt_array_slice_{suffix}(RtArena *, RtArray *, long, long, long);"
        ));
        let array = self.expr_text(array);
        let start = match start {
            Some(start) => self.expr_text(start),
            None => "RT_SLICE_NONE".to_string(),
        };
        let end = match end {
            Some(end) => self.expr_text(end),
            None => "RT_SLICE_NONE".to_string(),
        };
        let step = match step {
            Some(step) => self.expr_text(step),
            None => "1".to_string(),
        };
        let arena = self.alloc_arena();
        format!("rt_array_slice_{suffix}({arena}, {array}, {start}, {end}, {step})")
    }

    fn call_text(&mut self, callee: ExprId, args: &[ExprId]) -> String {
        // Built-in method call.
        if let ExprKind::Member { object, name } = self.module.arena.expr(callee).kind.clone() {
            return self.method_call_text(object, &name, args);
        }
        // Direct call of a module-level function, or the print intrinsic.
        if let ExprKind::Variable { name } = self.module.arena.expr(callee).kind.clone() {
            match self.resolve(&name) {
                Some(Slot::Function(_)) => {
                    let arena = self.alloc_arena();
                    let mut text = format!("sn_{name}({arena}");
                    for &arg in args {
                        let arg = self.expr_text(arg);
                        text.push_str(", ");
                        text.push_str(&arg);
                    }
                    text.push(')');
                    return text;
                }
                None if name == "print" => return self.print_text(args),
                _ => {}
            }
        }
        // Anything else is a closure value invoked through a typed
        // trampoline, so the callee is evaluated exactly once.
        let callee_ty = self.ty_of(callee);
        let Type::Function { params, ret } = self.module.arena.ty(callee_ty).clone() else {
            self.internal_error
                .get_or_insert_with(|| "call of a non-function reached the emitter".to_string());
            return "0".to_string();
        };
        let helper = self.closure_call_helper(&params, ret);
        let closure = self.expr_text(callee);
        let arena = self.alloc_arena();
        let mut text = format!("{helper}({arena}, {closure}");
        for &arg in args {
            let arg = self.expr_text(arg);
            text.push_str(", ");
            text.push_str(&arg);
        }
        text.push(')');
        text
    }

    fn print_text(&mut self, args: &[ExprId]) -> String {
        let arg = args.first().copied();
        let Some(arg) = arg else {
            return "0".to_string();
        };
        let arg_ty = self.ty_of(arg);
        let text = self.expr_text(arg);
        if let Some(element) = self.module.arena.element_type(arg_ty) {
            let suffix = rt_suffix(&self.module.arena, element);
            self.runtime
                .declare(format!("extern void rt_print_array_{suffix}(RtArray *);"));
            return format!("rt_print_array_{suffix}({text})");
        }
        let suffix = rt_suffix(&self.module.arena, arg_ty);
        let arg_c = c_type(&self.module.arena, arg_ty);
        self.runtime
            .declare(format!("extern void rt_print_{suffix}({arg_c});"));
        format!("rt_print_{suffix}({text})")
    }

    fn method_call_text(&mut self, object: ExprId, name: &str, args: &[ExprId]) -> String {
        let receiver_ty = self.ty_of(object);
        let receiver = self.expr_text(object);
        let arg_texts: Vec<String> = args.iter().map(|&arg| self.expr_text(arg)).collect();
        if let Some(element) = self.module.arena.element_type(receiver_ty) {
            return self.array_method_text(element, &receiver, name, &arg_texts);
        }
        self.string_method_text(&receiver, name, &arg_texts)
    }

    fn array_method_text(
        &mut self,
        element: TypeId,
        receiver: &str,
        name: &str,
        args: &[String],
    ) -> String {
        let suffix = rt_suffix(&self.module.arena, element);
        let element_c = c_type(&self.module.arena, element);
        let space = if element_c.ends_with('*') { "" } else { " " };
        let arena = self.alloc_arena();
        let (decl, call) = match name {
            "push" => (
                format!("extern void rt_array_push_{suffix}(RtArena *, RtArray *, {element_c});"),
                format!("rt_array_push_{suffix}({arena}, {receiver}, {})", args[0]),
            ),
            "pop" => (
                format!("extern {element_c}{space}rt_array_pop_{suffix}(RtArray *);"),
                format!("rt_array_pop_{suffix}({receiver})"),
            ),
            "insert" => (
                format!(
                    "extern void rt_array_insert_{suffix}(RtArena *, RtArray *, long, {element_c});"
                ),
                format!(
                    "rt_array_insert_{suffix}({arena}, {receiver}, {}, {})",
                    args[0], args[1]
                ),
            ),
            "remove" => (
                format!("extern {element_c}{space}rt_array_remove_{suffix}(RtArray *, long);"),
                format!("rt_array_remove_{suffix}({receiver}, {})", args[0]),
            ),
            "reverse" => (
                format!("extern void rt_array_reverse_{suffix}(RtArray *);"),
                format!("rt_array_reverse_{suffix}({receiver})"),
            ),
            "clone" => (
                format!("extern RtArray *rt_array_clone_{suffix}(RtArena *, RtArray *);"),
                format!("rt_array_clone_{suffix}({arena}, {receiver})"),
            ),
            "concat" => (
                format!(
                    "extern RtArray *rt_array_concat_{suffix}(RtArena *, RtArray *, RtArray *);"
                ),
                format!("rt_array_concat_{suffix}({arena}, {receiver}, {})", args[0]),
            ),
            "indexOf" => (
                format!("extern long rt_array_indexOf_{suffix}(RtArray *, {element_c});"),
                format!("rt_array_indexOf_{suffix}({receiver}, {})", args[0]),
            ),
            "contains" => (
                format!("extern int rt_array_contains_{suffix}(RtArray *, {element_c});"),
                format!("rt_array_contains_{suffix}({receiver}, {})", args[0]),
            ),
            "join" => (
                format!("extern char *rt_array_join_{suffix}(RtArena *, RtArray *, char *);"),
                format!("rt_array_join_{suffix}({arena}, {receiver}, {})", args[0]),
            ),
            "clear" => (
                format!("extern void rt_array_clear_{suffix}(RtArray *);"),
                format!("rt_array_clear_{suffix}({receiver})"),
            ),
            _ => {
                self.internal_error.get_or_insert_with(|| {
                    format!("array method '{name}' reached the emitter")
                });
                return "0".to_string();
            }
        };
        self.runtime.declare(decl);
        call
    }

    fn string_method_text(&mut self, receiver: &str, name: &str, args: &[String]) -> String {
        let arena = self.alloc_arena();
        let (decl, call) = match name {
            "toUpper" | "toLower" | "trim" => (
                format!("extern char *rt_str_{name}(RtArena *, char *);"),
                format!("rt_str_{name}({arena}, {receiver})"),
            ),
            "substring" => (
                "extern char *rt_str_substring(RtArena *, char *, long, long);".to_string(),
                format!("rt_str_substring({arena}, {receiver}, {}, {})", args[0], args[1]),
            ),
            "indexOf" => (
                "extern long rt_str_indexOf(char *, char *);".to_string(),
                format!("rt_str_indexOf({receiver}, {})", args[0]),
            ),
            "startsWith" | "endsWith" | "contains" => (
                format!("extern int rt_str_{name}(char *, char *);"),
                format!("rt_str_{name}({receiver}, {})", args[0]),
            ),
            "replace" => (
                "extern char *rt_str_replace(RtArena *, char *, char *, char *);".to_string(),
                format!(
                    "rt_str_replace({arena}, {receiver}, {}, {})",
                    args[0], args[1]
                ),
            ),
            "split" => (
                "extern RtArray *rt_str_split(RtArena *, char *, char *);".to_string(),
                format!("rt_str_split({arena}, {receiver}, {})", args[0]),
            ),
            "charAt" => (
                "extern char rt_str_charAt(char *, long);".to_string(),
                format!("rt_str_charAt({receiver}, {})", args[0]),
            ),
            _ => {
                self.internal_error.get_or_insert_with(|| {
                    format!("string method '{name}' reached the emitter")
                });
                return "0".to_string();
            }
        };
        self.runtime.declare(decl);
        call
    }

    /// Each part converts through `rt_to_string_<type>` and folds into an
    /// accumulator that starts as the empty string.
    fn interpolated_text(&mut self, parts: &[ExprId]) -> String {
        self.runtime
            .declare("extern char *rt_str_concat(RtArena *, char *, char *);".to_string());
        let mut acc = "\"\"".to_string();
        for &part in parts {
            let part_ty = self.ty_of(part);
            let text = self.expr_text(part);
            let converted = self.to_string_text(part_ty, &text);
            let arena = self.alloc_arena();
            acc = format!("rt_str_concat({arena}, {acc}, {converted})");
        }
        acc
    }

    pub(crate) fn to_string_text(&mut self, ty: TypeId, value: &str) -> String {
        let arena = self.alloc_arena();
        if let Some(element) = self.module.arena.element_type(ty) {
            let suffix = rt_suffix(&self.module.arena, element);
            self.runtime.declare(format!(
                "extern char *rt_to_string_array_{suffix}(RtArena *, RtArray *);"
            ));
            return format!("rt_to_string_array_{suffix}({arena}, {value})");
        }
        let suffix = rt_suffix(&self.module.arena, ty);
        let value_c = c_type(&self.module.arena, ty);
        self.runtime.declare(format!(
            "extern char *rt_to_string_{suffix}(RtArena *, {value_c});"
        ));
        format!("rt_to_string_{suffix}({arena}, {value})")
    }

    /// `.length` is the only non-callable member.
    fn member_text(&mut self, object: ExprId, name: &str) -> String {
        let receiver_ty = self.ty_of(object);
        let receiver = self.expr_text(object);
        if name == "length" {
            if self.module.arena.element_type(receiver_ty).is_some() {
                self.runtime
                    .declare("extern long rt_array_length(RtArray *);".to_string());
                return format!("rt_array_length({receiver})");
            }
            self.runtime
                .declare("extern long rt_str_length(char *);".to_string());
            return format!("rt_str_length({receiver})");
        }
        self.internal_error
            .get_or_insert_with(|| format!("member '{name}' reached the emitter uncalled"));
        "0".to_string()
    }
}

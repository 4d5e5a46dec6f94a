//! Expression type inference.
//!
//! Each variant either computes the node's type or reports a diagnostic
//! and yields the error type, which propagates upward without producing
//! further diagnostics.

use rustc_hash::FxHashSet;
use sn_ast::{
    Capture, ExprId, ExprKind, FunctionModifier, LiteralValue, Parameter, StmtId, Type, TypeId,
};
use sn_common::ErrorKind;
use sn_lexer::TokenKind;

use crate::builtins::{member_method, member_property};
use crate::{CheckerState, LambdaCtx, SymbolKind};

impl<'m> CheckerState<'m> {
    pub(crate) fn check_expr(&mut self, id: ExprId) -> TypeId {
        self.check_expr_expected(id, None)
    }

    /// `expected` threads the declared target type into positions where an
    /// empty array literal would otherwise be ambiguous.
    pub(crate) fn check_expr_expected(&mut self, id: ExprId, expected: Option<TypeId>) -> TypeId {
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
            let ty = self.infer_expr(id, expected);
            self.module.arena.expr_mut(id).ty = Some(ty);
            ty
        })
    }

    fn infer_expr(&mut self, id: ExprId, expected: Option<TypeId>) -> TypeId {
        let expr = self.module.arena.expr(id);
        let line = expr.line;
        match expr.kind.clone() {
            ExprKind::Literal { ty, .. } => ty,
            ExprKind::Variable { name } => self.check_variable(&name, line),
            ExprKind::Assign { name, value } => self.check_assign(&name, value, line),
            ExprKind::Binary { left, op, right } => self.check_binary(left, op, right, line),
            ExprKind::Unary { op, operand } => self.check_unary(op, operand, line),
            ExprKind::Increment { operand } => self.check_step(operand, line, "'++'"),
            ExprKind::Decrement { operand } => self.check_step(operand, line, "'--'"),
            ExprKind::Array { elements } => self.check_array(&elements, expected, line),
            ExprKind::ArrayAccess { array, index } => self.check_array_access(array, index, line),
            ExprKind::ArraySlice {
                array,
                start,
                end,
                step,
            } => self.check_array_slice(array, start, end, step, line),
            ExprKind::Range { start, end } => self.check_range(start, end, line),
            ExprKind::Spread { array } => self.check_spread(array, line),
            ExprKind::Call { callee, args } => self.check_call(callee, &args, line),
            ExprKind::Interpolated { parts } => self.check_interpolated(&parts, line),
            ExprKind::Member { object, name } => self.check_member(object, &name, line),
            ExprKind::Lambda {
                params,
                ret,
                body,
                modifier,
                ..
            } => self.check_lambda(id, &params, ret, &body, modifier, line),
        }
    }

    fn check_variable(&mut self, name: &str, line: u32) -> TypeId {
        let Some((symbol, depth)) = self.symbols.lookup(name) else {
            self.error(
                ErrorKind::UndefinedName,
                line,
                format!("undefined name '{name}'"),
            );
            return self.module.arena.error_type();
        };
        let (ty, kind) = (symbol.ty, symbol.kind);
        // A hit outside the lambda's base scope is a capture; functions are
        // reachable at top level and do not close over anything.
        if kind != SymbolKind::Function {
            for ctx in &mut self.lambdas {
                if depth < ctx.base_depth && ctx.seen.insert(name.to_owned()) {
                    ctx.captures.push(Capture {
                        name: name.to_owned(),
                        ty,
                    });
                }
            }
        }
        ty
    }

    fn check_assign(&mut self, name: &str, value: ExprId, line: u32) -> TypeId {
        let target = match self.symbols.lookup(name) {
            Some((symbol, _)) => {
                if symbol.kind == SymbolKind::Function {
                    self.error(
                        ErrorKind::InvalidOperand,
                        line,
                        format!("cannot assign to function '{name}'"),
                    );
                    return self.module.arena.error_type();
                }
                symbol.ty
            }
            None => {
                self.error(
                    ErrorKind::UndefinedName,
                    line,
                    format!("undefined name '{name}'"),
                );
                return self.module.arena.error_type();
            }
        };
        // Same capture bookkeeping as a read.
        self.check_variable(name, line);
        let value_ty = self.check_expr_expected(value, Some(target));
        if self.module.arena.is_error_type(value_ty) {
            return self.module.arena.error_type();
        }
        if !self.module.arena.type_equals(value_ty, target) {
            let found = self.module.arena.type_to_string(value_ty);
            let wanted = self.module.arena.type_to_string(target);
            self.error(
                ErrorKind::TypeMismatch,
                line,
                format!("cannot assign {found} to '{name}' of type {wanted}"),
            );
            return self.module.arena.error_type();
        }
        target
    }

    fn check_binary(&mut self, left: ExprId, op: TokenKind, right: ExprId, line: u32) -> TypeId {
        let lhs = self.check_expr(left);
        let rhs = self.check_expr(right);
        let arena = &self.module.arena;
        if arena.is_error_type(lhs) || arena.is_error_type(rhs) {
            return arena.error_type();
        }
        let both_numeric = arena.is_numeric_type(lhs) && arena.is_numeric_type(rhs);
        let both_str = matches!(arena.ty(lhs), Type::Str) && matches!(arena.ty(rhs), Type::Str);
        let both_bool = matches!(arena.ty(lhs), Type::Bool) && matches!(arena.ty(rhs), Type::Bool);
        let either_double =
            matches!(arena.ty(lhs), Type::Double) || matches!(arena.ty(rhs), Type::Double);
        match op {
            TokenKind::Plus if both_str => self.module.arena.str_type(),
            TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash => {
                if !both_numeric {
                    return self.operand_error(op, lhs, rhs, line);
                }
                if either_double {
                    self.module.arena.double_type()
                } else {
                    self.module.arena.int_type()
                }
            }
            TokenKind::Percent => {
                let both_int = matches!(arena.ty(lhs), Type::Int)
                    && matches!(arena.ty(rhs), Type::Int);
                if !both_int {
                    return self.operand_error(op, lhs, rhs, line);
                }
                self.module.arena.int_type()
            }
            TokenKind::EqualsEquals | TokenKind::BangEquals => {
                if !arena.type_equals(lhs, rhs) {
                    return self.operand_error(op, lhs, rhs, line);
                }
                self.module.arena.bool_type()
            }
            TokenKind::Less
            | TokenKind::LessEquals
            | TokenKind::Greater
            | TokenKind::GreaterEquals => {
                if !(both_numeric || both_str) {
                    return self.operand_error(op, lhs, rhs, line);
                }
                self.module.arena.bool_type()
            }
            TokenKind::AmpAmp | TokenKind::PipePipe => {
                if !both_bool {
                    return self.operand_error(op, lhs, rhs, line);
                }
                self.module.arena.bool_type()
            }
            _ => {
                self.error(
                    ErrorKind::InternalConsistency,
                    line,
                    format!("unexpected binary operator {op}"),
                );
                self.module.arena.error_type()
            }
        }
    }

    fn operand_error(&mut self, op: TokenKind, lhs: TypeId, rhs: TypeId, line: u32) -> TypeId {
        let left = self.module.arena.type_to_string(lhs);
        let right = self.module.arena.type_to_string(rhs);
        self.error(
            ErrorKind::InvalidOperand,
            line,
            format!("operator {op} cannot be applied to {left} and {right}"),
        );
        self.module.arena.error_type()
    }

    fn check_unary(&mut self, op: TokenKind, operand: ExprId, line: u32) -> TypeId {
        let ty = self.check_expr(operand);
        if self.module.arena.is_error_type(ty) {
            return self.module.arena.error_type();
        }
        match op {
            TokenKind::Bang if matches!(self.module.arena.ty(ty), Type::Bool) => {
                self.module.arena.bool_type()
            }
            TokenKind::Minus if self.module.arena.is_numeric_type(ty) => ty,
            _ => {
                let rendered = self.module.arena.type_to_string(ty);
                self.error(
                    ErrorKind::InvalidOperand,
                    line,
                    format!("operator {op} cannot be applied to {rendered}"),
                );
                self.module.arena.error_type()
            }
        }
    }

    /// `++`/`--` need an assignable integer variable.
    fn check_step(&mut self, operand: ExprId, line: u32, op: &str) -> TypeId {
        let ty = self.check_expr(operand);
        if self.module.arena.is_error_type(ty) {
            return self.module.arena.error_type();
        }
        let is_variable = matches!(
            self.module.arena.expr(operand).kind,
            ExprKind::Variable { .. }
        );
        if !is_variable || !matches!(self.module.arena.ty(ty), Type::Int) {
            self.error(
                ErrorKind::InvalidOperand,
                line,
                format!("{op} requires an int variable"),
            );
            return self.module.arena.error_type();
        }
        self.module.arena.int_type()
    }

    fn check_array(
        &mut self,
        elements: &[ExprId],
        expected: Option<TypeId>,
        line: u32,
    ) -> TypeId {
        if elements.is_empty() {
            // An empty literal borrows the declared element type.
            match expected {
                Some(expected) if self.module.arena.element_type(expected).is_some() => {
                    return expected;
                }
                _ => {
                    self.error(
                        ErrorKind::InvalidOperand,
                        line,
                        "cannot infer the type of an empty array literal",
                    );
                    return self.module.arena.error_type();
                }
            }
        }
        let expected_element = expected.and_then(|e| self.module.arena.element_type(e));
        let mut element_ty: Option<TypeId> = None;
        let mut failed = false;
        for &element in elements {
            let is_spread = matches!(self.module.arena.expr(element).kind, ExprKind::Spread { .. });
            let ty = self.check_expr_expected(element, expected_element);
            if self.module.arena.is_error_type(ty) {
                failed = true;
                continue;
            }
            // A spread contributes its element type, not the array itself.
            let contributed = if is_spread {
                match self.module.arena.element_type(ty) {
                    Some(element) => element,
                    None => {
                        failed = true;
                        continue;
                    }
                }
            } else {
                ty
            };
            match element_ty {
                None => element_ty = Some(contributed),
                Some(previous) => {
                    if !self.module.arena.type_equals(previous, contributed) {
                        let a = self.module.arena.type_to_string(previous);
                        let b = self.module.arena.type_to_string(contributed);
                        self.error(
                            ErrorKind::TypeMismatch,
                            line,
                            format!("array elements must share one type, found {a} and {b}"),
                        );
                        failed = true;
                    }
                }
            }
        }
        match (failed, element_ty) {
            (false, Some(element)) => self.module.arena.array_type(element),
            _ => self.module.arena.error_type(),
        }
    }

    fn check_array_access(&mut self, array: ExprId, index: ExprId, line: u32) -> TypeId {
        let array_ty = self.check_expr(array);
        let index_ty = self.check_expr(index);
        if self.module.arena.is_error_type(array_ty) || self.module.arena.is_error_type(index_ty)
        {
            return self.module.arena.error_type();
        }
        let Some(element) = self.module.arena.element_type(array_ty) else {
            let rendered = self.module.arena.type_to_string(array_ty);
            self.error(
                ErrorKind::InvalidOperand,
                line,
                format!("cannot index {rendered}"),
            );
            return self.module.arena.error_type();
        };
        if !matches!(self.module.arena.ty(index_ty), Type::Int) {
            let rendered = self.module.arena.type_to_string(index_ty);
            self.error(
                ErrorKind::TypeMismatch,
                line,
                format!("array index must be int, found {rendered}"),
            );
            return self.module.arena.error_type();
        }
        element
    }

    fn check_array_slice(
        &mut self,
        array: ExprId,
        start: Option<ExprId>,
        end: Option<ExprId>,
        step: Option<ExprId>,
        line: u32,
    ) -> TypeId {
        let array_ty = self.check_expr(array);
        let mut failed = self.module.arena.is_error_type(array_ty);
        if !failed && self.module.arena.element_type(array_ty).is_none() {
            let rendered = self.module.arena.type_to_string(array_ty);
            self.error(
                ErrorKind::InvalidOperand,
                line,
                format!("cannot slice {rendered}"),
            );
            failed = true;
        }
        for (bound, what) in [(start, "start"), (end, "end"), (step, "step")] {
            let Some(bound) = bound else { continue };
            let ty = self.check_expr(bound);
            if self.module.arena.is_error_type(ty) {
                failed = true;
                continue;
            }
            if !matches!(self.module.arena.ty(ty), Type::Int) {
                let rendered = self.module.arena.type_to_string(ty);
                self.error(
                    ErrorKind::TypeMismatch,
                    line,
                    format!("slice {what} must be int, found {rendered}"),
                );
                failed = true;
            }
        }
        if let Some(step) = step {
            if matches!(
                self.module.arena.expr(step).kind,
                ExprKind::Literal {
                    value: LiteralValue::Int(0),
                    ..
                }
            ) {
                self.error(ErrorKind::InvalidOperand, line, "slice step cannot be zero");
                failed = true;
            }
        }
        if failed {
            self.module.arena.error_type()
        } else {
            array_ty
        }
    }

    fn check_range(&mut self, start: ExprId, end: ExprId, line: u32) -> TypeId {
        let start_ty = self.check_expr(start);
        let end_ty = self.check_expr(end);
        if self.module.arena.is_error_type(start_ty) || self.module.arena.is_error_type(end_ty) {
            return self.module.arena.error_type();
        }
        let both_int = matches!(self.module.arena.ty(start_ty), Type::Int)
            && matches!(self.module.arena.ty(end_ty), Type::Int);
        if !both_int {
            self.error(
                ErrorKind::TypeMismatch,
                line,
                "range endpoints must both be int",
            );
            return self.module.arena.error_type();
        }
        let int = self.module.arena.int_type();
        self.module.arena.array_type(int)
    }

    fn check_spread(&mut self, array: ExprId, line: u32) -> TypeId {
        let ty = self.check_expr(array);
        if self.module.arena.is_error_type(ty) {
            return self.module.arena.error_type();
        }
        if self.module.arena.element_type(ty).is_none() {
            let rendered = self.module.arena.type_to_string(ty);
            self.error(
                ErrorKind::InvalidOperand,
                line,
                format!("spread operand must be an array, found {rendered}"),
            );
            return self.module.arena.error_type();
        }
        ty
    }

    fn check_call(&mut self, callee: ExprId, args: &[ExprId], line: u32) -> TypeId {
        // Method call: `receiver.name(args)` dispatches on the receiver type.
        if let ExprKind::Member { object, name } = self.module.arena.expr(callee).kind.clone() {
            return self.check_method_call(callee, object, &name, args, line);
        }
        // `print` intrinsic, unless the program shadows the name.
        if let ExprKind::Variable { name } = &self.module.arena.expr(callee).kind {
            if name == "print" && self.symbols.lookup("print").is_none() {
                return self.check_print(callee, args, line);
            }
        }
        let callee_ty = self.check_expr(callee);
        if self.module.arena.is_error_type(callee_ty) {
            return self.module.arena.error_type();
        }
        let Type::Function { params, ret } = self.module.arena.ty(callee_ty).clone() else {
            let rendered = self.module.arena.type_to_string(callee_ty);
            self.error(
                ErrorKind::InvalidOperand,
                line,
                format!("{rendered} is not callable"),
            );
            return self.module.arena.error_type();
        };
        self.check_args(&params, args, line);
        ret
    }

    fn check_method_call(
        &mut self,
        callee: ExprId,
        object: ExprId,
        name: &str,
        args: &[ExprId],
        line: u32,
    ) -> TypeId {
        let receiver = self.check_expr(object);
        if self.module.arena.is_error_type(receiver) {
            return self.module.arena.error_type();
        }
        let Some(sig) = member_method(&mut self.module.arena, receiver, name) else {
            let rendered = self.module.arena.type_to_string(receiver);
            if member_property(&self.module.arena, receiver, name).is_some() {
                self.error(
                    ErrorKind::InvalidOperand,
                    line,
                    format!("property '{name}' on {rendered} is not callable"),
                );
            } else {
                self.error(
                    ErrorKind::InvalidOperand,
                    line,
                    format!("{rendered} has no method '{name}'"),
                );
            }
            return self.module.arena.error_type();
        };
        // Give the member node itself the method's function type.
        let method_ty = self
            .module
            .arena
            .function_type(sig.params.clone(), sig.ret);
        self.module.arena.expr_mut(callee).ty = Some(method_ty);
        self.check_args(&sig.params, args, line);
        sig.ret
    }

    fn check_print(&mut self, callee: ExprId, args: &[ExprId], line: u32) -> TypeId {
        if args.len() != 1 {
            self.error(
                ErrorKind::ArityMismatch,
                line,
                format!("print takes 1 argument, found {}", args.len()),
            );
            for &arg in args {
                self.check_expr(arg);
            }
            let void = self.module.arena.void_type();
            let print_ty = self.module.arena.function_type(vec![], void);
            self.module.arena.expr_mut(callee).ty = Some(print_ty);
            return void;
        }
        let arg_ty = self.check_expr(args[0]);
        if !self.module.arena.is_error_type(arg_ty) && self.module.arena.is_void_type(arg_ty) {
            self.error(
                ErrorKind::InvalidOperand,
                line,
                "cannot print a void expression",
            );
        }
        let void = self.module.arena.void_type();
        let print_ty = self.module.arena.function_type(vec![arg_ty], void);
        self.module.arena.expr_mut(callee).ty = Some(print_ty);
        void
    }

    fn check_args(&mut self, params: &[TypeId], args: &[ExprId], line: u32) {
        if params.len() != args.len() {
            self.error(
                ErrorKind::ArityMismatch,
                line,
                format!("expected {} arguments, found {}", params.len(), args.len()),
            );
            for &arg in args {
                self.check_expr(arg);
            }
            return;
        }
        for (&param, &arg) in params.iter().zip(args) {
            // A spread argument forwards a whole array to an array-typed
            // parameter, so its type is compared directly.
            let arg_ty = self.check_expr_expected(arg, Some(param));
            if self.module.arena.is_error_type(arg_ty) {
                continue;
            }
            if !self.module.arena.type_equals(arg_ty, param) {
                let found = self.module.arena.type_to_string(arg_ty);
                let wanted = self.module.arena.type_to_string(param);
                self.error(
                    ErrorKind::TypeMismatch,
                    line,
                    format!("argument has type {found}, expected {wanted}"),
                );
            }
        }
    }

    fn check_interpolated(&mut self, parts: &[ExprId], line: u32) -> TypeId {
        for &part in parts {
            let ty = self.check_expr(part);
            if self.module.arena.is_error_type(ty) {
                continue;
            }
            if self.module.arena.is_void_type(ty) {
                self.error(
                    ErrorKind::InvalidOperand,
                    line,
                    "a void expression cannot be interpolated into a string",
                );
            }
        }
        self.module.arena.str_type()
    }

    fn check_member(&mut self, object: ExprId, name: &str, line: u32) -> TypeId {
        let receiver = self.check_expr(object);
        if self.module.arena.is_error_type(receiver) {
            return self.module.arena.error_type();
        }
        if let Some(ty) = member_property(&self.module.arena, receiver, name) {
            return ty;
        }
        let rendered = self.module.arena.type_to_string(receiver);
        if member_method(&mut self.module.arena, receiver, name).is_some() {
            self.error(
                ErrorKind::InvalidOperand,
                line,
                format!("method '{name}' on {rendered} must be called"),
            );
        } else {
            self.error(
                ErrorKind::InvalidOperand,
                line,
                format!("{rendered} has no member '{name}'"),
            );
        }
        self.module.arena.error_type()
    }

    fn check_lambda(
        &mut self,
        id: ExprId,
        params: &[Parameter],
        ret: TypeId,
        body: &[StmtId],
        modifier: FunctionModifier,
        line: u32,
    ) -> TypeId {
        // Lambdas inherit the enclosing function's modifier unless they
        // carry their own.
        let effective = if modifier == FunctionModifier::Default {
            self.current_modifier
        } else {
            modifier
        };
        self.check_return_type_rule(ret, effective, line);

        self.lambdas.push(LambdaCtx {
            base_depth: self.symbols.depth(),
            captures: Vec::new(),
            seen: FxHashSet::default(),
        });
        self.symbols.open_scope();
        self.declare_params(params);
        let saved_return = self.expected_return.replace(ret);
        let saved_modifier = std::mem::replace(&mut self.current_modifier, effective);
        let saved_loop_depth = std::mem::replace(&mut self.loop_depth, 0);
        for &stmt in body {
            self.check_stmt(stmt);
        }
        self.loop_depth = saved_loop_depth;
        self.current_modifier = saved_modifier;
        self.expected_return = saved_return;
        self.symbols.close_scope();
        let ctx = self.lambdas.pop().expect("lambda context");

        let param_types: Vec<TypeId> = params.iter().map(|p| p.ty).collect();
        let ty = self.module.arena.function_type(param_types, ret);
        if let ExprKind::Lambda {
            captures,
            modifier: node_modifier,
            ..
        } = &mut self.module.arena.expr_mut(id).kind
        {
            *captures = ctx.captures;
            *node_modifier = effective;
        }
        ty
    }
}

//! Statement checking: declarations, control flow, and the
//! memory-qualifier and function-modifier rules.

use sn_ast::{
    FunctionDecl, FunctionModifier, MemQualifier, Parameter, StmtId, StmtKind, Type, TypeId,
};
use sn_common::ErrorKind;

use crate::{CheckerState, Symbol};

impl<'m> CheckerState<'m> {
    pub(crate) fn check_stmt(&mut self, id: StmtId) {
        let stmt = self.module.arena.stmt(id);
        let line = stmt.line;
        match stmt.kind.clone() {
            StmtKind::Expression { expr } => {
                self.check_expr(expr);
            }
            StmtKind::VarDecl {
                name,
                ty,
                initializer,
                qualifier,
            } => self.check_var_decl(&name, ty, initializer, qualifier, line),
            StmtKind::Function(decl) => self.check_function(&decl, line),
            StmtKind::Return { value } => self.check_return(value, line),
            StmtKind::Block { statements } => {
                self.symbols.open_scope();
                for stmt in statements {
                    self.check_stmt(stmt);
                }
                self.symbols.close_scope();
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expect_bool(condition, "if condition");
                self.check_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_stmt(else_branch);
                }
            }
            StmtKind::While { condition, body } => {
                self.expect_bool(condition, "while condition");
                self.loop_depth += 1;
                self.check_stmt(body);
                self.loop_depth -= 1;
            }
            StmtKind::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                self.symbols.open_scope();
                if let Some(initializer) = initializer {
                    self.check_stmt(initializer);
                }
                if let Some(condition) = condition {
                    self.expect_bool(condition, "for condition");
                }
                if let Some(increment) = increment {
                    self.check_expr(increment);
                }
                self.loop_depth += 1;
                self.check_stmt(body);
                self.loop_depth -= 1;
                self.symbols.close_scope();
            }
            StmtKind::ForEach {
                var_name,
                iterable,
                body,
            } => self.check_for_each(&var_name, iterable, body, line),
            StmtKind::Import { .. } => {}
            StmtKind::Break => {
                if self.loop_depth == 0 {
                    self.error(
                        ErrorKind::BreakOutsideLoop,
                        line,
                        "'break' is only legal inside a loop",
                    );
                }
            }
            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    self.error(
                        ErrorKind::BreakOutsideLoop,
                        line,
                        "'continue' is only legal inside a loop",
                    );
                }
            }
        }
    }

    fn check_var_decl(
        &mut self,
        name: &str,
        ty: TypeId,
        initializer: Option<sn_ast::ExprId>,
        qualifier: MemQualifier,
        line: u32,
    ) {
        match qualifier {
            MemQualifier::AsVal if !self.module.arena.is_heap_type(ty) => {
                let rendered = self.module.arena.type_to_string(ty);
                self.error(
                    ErrorKind::InvalidMemoryQualifier,
                    line,
                    format!("'as val' requires a heap type, found {rendered}"),
                );
            }
            MemQualifier::AsRef if self.module.arena.is_heap_type(ty) => {
                let rendered = self.module.arena.type_to_string(ty);
                self.error(
                    ErrorKind::InvalidMemoryQualifier,
                    line,
                    format!("'as ref' is only legal on value-typed variables, found {rendered}"),
                );
            }
            _ => {}
        }

        if let Some(initializer) = initializer {
            let init_ty = self.check_expr_expected(initializer, Some(ty));
            if !self.module.arena.is_error_type(init_ty)
                && !self.module.arena.type_equals(init_ty, ty)
            {
                let found = self.module.arena.type_to_string(init_ty);
                let declared = self.module.arena.type_to_string(ty);
                self.error(
                    ErrorKind::TypeMismatch,
                    line,
                    format!("initializer has type {found}, expected {declared}"),
                );
            }
        } else if qualifier == MemQualifier::AsRef {
            self.error(
                ErrorKind::InvalidMemoryQualifier,
                line,
                "'as ref' requires an initializer",
            );
        }

        if self
            .symbols
            .declare(name, Symbol::variable(ty, qualifier))
            .is_err()
        {
            self.error(
                ErrorKind::Redeclaration,
                line,
                format!("'{name}' is already declared in this scope"),
            );
        }
    }

    fn check_function(&mut self, decl: &FunctionDecl, line: u32) {
        // Named functions live at module scope; closures are spelled as
        // lambda expressions.
        if self.symbols.depth() > 1 {
            self.error(
                ErrorKind::InvalidOperand,
                line,
                format!(
                    "function '{}' must be declared at module scope; use a lambda instead",
                    decl.name
                ),
            );
            return;
        }

        self.check_return_type_rule(decl.ret, decl.modifier, line);

        self.symbols.open_scope();
        self.declare_params(&decl.params);
        let saved_return = self.expected_return.replace(decl.ret);
        let saved_modifier = std::mem::replace(&mut self.current_modifier, decl.modifier);
        let saved_loop_depth = std::mem::replace(&mut self.loop_depth, 0);
        for &stmt in &decl.body {
            self.check_stmt(stmt);
        }
        self.loop_depth = saved_loop_depth;
        self.current_modifier = saved_modifier;
        self.expected_return = saved_return;
        self.symbols.close_scope();
    }

    /// Parameters live in the function body's outermost scope.
    pub(crate) fn declare_params(&mut self, params: &[Parameter]) {
        for param in params {
            match param.qualifier {
                MemQualifier::AsRef => {
                    self.error(
                        ErrorKind::InvalidMemoryQualifier,
                        param.line,
                        format!("parameter '{}' cannot be declared 'as ref'", param.name),
                    );
                }
                MemQualifier::AsVal if !self.module.arena.is_heap_type(param.ty) => {
                    let rendered = self.module.arena.type_to_string(param.ty);
                    self.error(
                        ErrorKind::InvalidMemoryQualifier,
                        param.line,
                        format!("'as val' requires a heap type, found {rendered}"),
                    );
                }
                _ => {}
            }
            if self
                .symbols
                .declare(&param.name, Symbol::parameter(param.ty, param.qualifier))
                .is_err()
            {
                self.error(
                    ErrorKind::Redeclaration,
                    param.line,
                    format!("parameter '{}' is already declared", param.name),
                );
            }
        }
    }

    /// The activation arena of a `private` (and, for arrays, a default)
    /// function dies on return, so references into it would dangle.
    pub(crate) fn check_return_type_rule(
        &mut self,
        ret: TypeId,
        modifier: FunctionModifier,
        line: u32,
    ) {
        let rendered = self.module.arena.type_to_string(ret);
        match modifier {
            FunctionModifier::Shared => {}
            FunctionModifier::Private => {
                if self.module.arena.is_heap_type(ret) {
                    self.error(
                        ErrorKind::InvalidReturnType,
                        line,
                        format!("a private function cannot return {rendered}; declare it shared"),
                    );
                }
            }
            FunctionModifier::Default => {
                if matches!(
                    self.module.arena.ty(ret),
                    Type::Array(_) | Type::Function { .. }
                ) {
                    self.error(
                        ErrorKind::InvalidReturnType,
                        line,
                        format!("returning {rendered} requires a shared function"),
                    );
                }
            }
        }
    }

    fn check_return(&mut self, value: Option<sn_ast::ExprId>, line: u32) {
        let Some(expected) = self.expected_return else {
            self.error(
                ErrorKind::InvalidOperand,
                line,
                "'return' is only legal inside a function",
            );
            if let Some(value) = value {
                self.check_expr(value);
            }
            return;
        };
        match value {
            None => {
                if !self.module.arena.is_void_type(expected) {
                    let rendered = self.module.arena.type_to_string(expected);
                    self.error(
                        ErrorKind::TypeMismatch,
                        line,
                        format!("this function must return {rendered}"),
                    );
                }
            }
            Some(value) => {
                if self.module.arena.is_void_type(expected) {
                    self.check_expr(value);
                    self.error(
                        ErrorKind::TypeMismatch,
                        line,
                        "a void function cannot return a value",
                    );
                    return;
                }
                let value_ty = self.check_expr_expected(value, Some(expected));
                if !self.module.arena.is_error_type(value_ty)
                    && !self.module.arena.type_equals(value_ty, expected)
                {
                    let found = self.module.arena.type_to_string(value_ty);
                    let wanted = self.module.arena.type_to_string(expected);
                    self.error(
                        ErrorKind::TypeMismatch,
                        line,
                        format!("return value has type {found}, expected {wanted}"),
                    );
                }
            }
        }
    }

    fn check_for_each(
        &mut self,
        var_name: &str,
        iterable: sn_ast::ExprId,
        body: StmtId,
        line: u32,
    ) {
        let iterable_ty = self.check_expr(iterable);
        let element = match self.module.arena.ty(iterable_ty) {
            Type::Array(element) => Some(*element),
            Type::Error => None,
            _ => {
                let rendered = self.module.arena.type_to_string(iterable_ty);
                self.error(
                    ErrorKind::TypeMismatch,
                    line,
                    format!("for-each iterates arrays and ranges, found {rendered}"),
                );
                None
            }
        };
        self.symbols.open_scope();
        let var_ty = element.unwrap_or_else(|| self.module.arena.error_type());
        if self
            .symbols
            .declare(var_name, Symbol::variable(var_ty, MemQualifier::Default))
            .is_err()
        {
            self.error(
                ErrorKind::Redeclaration,
                line,
                format!("'{var_name}' is already declared in this scope"),
            );
        }
        self.loop_depth += 1;
        self.check_stmt(body);
        self.loop_depth -= 1;
        self.symbols.close_scope();
    }

    pub(crate) fn expect_bool(&mut self, condition: sn_ast::ExprId, what: &str) {
        let ty = self.check_expr(condition);
        if self.module.arena.is_error_type(ty) {
            return;
        }
        if !matches!(self.module.arena.ty(ty), Type::Bool) {
            let rendered = self.module.arena.type_to_string(ty);
            let line = self.module.arena.expr(condition).line;
            self.error(
                ErrorKind::TypeMismatch,
                line,
                format!("{what} must be bool, found {rendered}"),
            );
        }
    }
}

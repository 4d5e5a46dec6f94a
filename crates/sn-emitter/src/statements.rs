//! Statement lowering: declarations, control flow, and the per-iteration
//! loop arenas.

use rustc_hash::FxHashMap;
use sn_ast::{ExprId, ExprKind, FunctionModifier, MemQualifier, StmtId, StmtKind, Type, TypeId};

use crate::runtime::{c_type, c_zero, rt_suffix};
use crate::{CEmitter, VarInfo};

impl<'m> CEmitter<'m> {
    pub(crate) fn emit_stmt(&mut self, id: StmtId) {
        match self.module.arena.stmt(id).kind.clone() {
            StmtKind::Expression { expr } => {
                let text = self.expr_text(expr);
                self.write_line(&format!("{text};"));
            }
            StmtKind::VarDecl {
                name,
                ty,
                initializer,
                qualifier,
            } => self.emit_var_decl(&name, ty, initializer, qualifier),
            StmtKind::Function(decl) => {
                // Module-level functions are emitted by the top walk; the
                // checker rejects nested declarations.
                self.internal_error.get_or_insert_with(|| {
                    format!("nested function '{}' reached the emitter", decl.name)
                });
            }
            StmtKind::Return { value } => self.emit_return(value),
            StmtKind::Block { statements } => {
                self.write_line("{");
                self.indent += 1;
                self.scopes.push(FxHashMap::default());
                for stmt in statements {
                    self.emit_stmt(stmt);
                }
                self.scopes.pop();
                self.indent -= 1;
                self.write_line("}");
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond = self.expr_text(condition);
                self.write_line(&format!("if ({cond}) {{"));
                self.emit_branch(then_branch);
                match else_branch {
                    Some(else_branch) => {
                        self.write_line("} else {");
                        self.emit_branch(else_branch);
                        self.write_line("}");
                    }
                    None => self.write_line("}"),
                }
            }
            StmtKind::While { condition, body } => {
                let cond = self.expr_text(condition);
                self.write_line(&format!("while ({cond}) {{"));
                self.emit_loop_body(body, None);
                self.write_line("}");
            }
            StmtKind::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                self.write_line("{");
                self.indent += 1;
                self.scopes.push(FxHashMap::default());
                if let Some(initializer) = initializer {
                    self.emit_stmt(initializer);
                }
                let cond = match condition {
                    Some(condition) => self.expr_text(condition),
                    None => "1".to_string(),
                };
                let incr = match increment {
                    Some(increment) => self.expr_text(increment),
                    None => String::new(),
                };
                self.write_line(&format!("for (; {cond}; {incr}) {{"));
                self.emit_loop_body(body, None);
                self.write_line("}");
                self.scopes.pop();
                self.indent -= 1;
                self.write_line("}");
            }
            StmtKind::ForEach {
                var_name,
                iterable,
                body,
            } => self.emit_for_each(&var_name, iterable, body),
            StmtKind::Import { .. } => {}
            StmtKind::Break => {
                if let Some(loop_arena) = self.loop_arena_stack.last().cloned() {
                    self.write_line(&format!("rt_arena_destroy({loop_arena});"));
                }
                self.write_line("break;");
            }
            StmtKind::Continue => {
                if let Some(loop_arena) = self.loop_arena_stack.last().cloned() {
                    self.write_line(&format!("rt_arena_destroy({loop_arena});"));
                }
                self.write_line("continue;");
            }
        }
    }

    /// Emit an if/else branch between already-written braces.
    fn emit_branch(&mut self, branch: StmtId) {
        self.indent += 1;
        if let StmtKind::Block { statements } = self.module.arena.stmt(branch).kind.clone() {
            self.scopes.push(FxHashMap::default());
            for stmt in statements {
                self.emit_stmt(stmt);
            }
            self.scopes.pop();
        } else {
            self.emit_stmt(branch);
        }
        self.indent -= 1;
    }

    /// Loop bodies get a per-iteration arena: heap allocations made inside
    /// the iteration are reclaimed when it ends. `preamble` lines run
    /// before the arena exists (for-each element binding).
    fn emit_loop_body(&mut self, body: StmtId, preamble: Option<Vec<String>>) {
        self.indent += 1;
        for line in preamble.unwrap_or_default() {
            self.write_line(&line);
        }
        let parent = self.alloc_arena();
        let loop_arena = format!("__loop_arena_{}__", self.next_arena());
        self.rt_arena_fns();
        self.write_line(&format!("RtArena *{loop_arena} = rt_arena_create({parent});"));
        self.arena_stack.push(loop_arena.clone());
        self.loop_arena_stack.push(loop_arena.clone());
        if let StmtKind::Block { statements } = self.module.arena.stmt(body).kind.clone() {
            self.scopes.push(FxHashMap::default());
            for stmt in statements {
                self.emit_stmt(stmt);
            }
            self.scopes.pop();
        } else {
            self.emit_stmt(body);
        }
        self.loop_arena_stack.pop();
        self.arena_stack.pop();
        self.write_line(&format!("rt_arena_destroy({loop_arena});"));
        self.indent -= 1;
    }

    fn emit_var_decl(
        &mut self,
        name: &str,
        ty: TypeId,
        initializer: Option<ExprId>,
        qualifier: MemQualifier,
    ) {
        let init_text = initializer.map(|initializer| self.expr_text(initializer));
        let c_name = self.local_c_name(name);
        let var_c = c_type(&self.module.arena, ty);
        let space = if var_c.ends_with('*') { "" } else { " " };
        match qualifier {
            MemQualifier::AsRef => {
                // Storage lives in the function arena so the binding
                // survives per-iteration loop arenas.
                self.runtime
                    .declare("extern void *rt_arena_alloc(RtArena *, size_t);".to_string());
                let function_arena = self.function_arena.clone();
                self.write_line(&format!(
                    "{var_c}{space}*{c_name} = rt_arena_alloc({function_arena}, sizeof({var_c}));"
                ));
                let value = init_text.unwrap_or_else(|| c_zero(&self.module.arena, ty).to_string());
                self.write_line(&format!("*{c_name} = {value};"));
            }
            MemQualifier::AsVal => {
                let value = match init_text {
                    Some(init) => {
                        let arena = self.alloc_arena();
                        self.clone_value(ty, &init, &arena)
                    }
                    None => c_zero(&self.module.arena, ty).to_string(),
                };
                self.write_line(&format!("{var_c}{space}{c_name} = {value};"));
            }
            MemQualifier::Default => {
                let value =
                    init_text.unwrap_or_else(|| c_zero(&self.module.arena, ty).to_string());
                self.write_line(&format!("{var_c}{space}{c_name} = {value};"));
            }
        }
        self.declare_local(
            name,
            VarInfo {
                ty,
                qualifier,
                c_name,
            },
        );
    }

    /// Single-exit return lowering: set the return slot, unwind loop
    /// arenas, jump to the cleanup label.
    fn emit_return(&mut self, value: Option<ExprId>) {
        if let Some(value) = value {
            // Shared functions allocate their result from the caller's
            // arena so it escapes the activation.
            if self.current_modifier == FunctionModifier::Shared {
                self.alloc_override = Some("__caller_arena__".to_string());
            }
            let mut text = self.expr_text(value);
            self.alloc_override = None;
            if self.current_modifier == FunctionModifier::Default {
                if let Some(ret) = self.current_ret {
                    if matches!(self.module.arena.ty(ret), Type::Str) {
                        // Default functions hand strings back as a copy in
                        // the caller's arena.
                        self.runtime.declare(
                            "extern char *rt_to_string_string(RtArena *, char *);".to_string(),
                        );
                        text = format!("rt_to_string_string(__caller_arena__, {text})");
                    }
                }
            }
            self.write_line(&format!("__return_value__ = {text};"));
        }
        for loop_arena in self.loop_arena_stack.clone().iter().rev() {
            self.write_line(&format!("rt_arena_destroy({loop_arena});"));
        }
        let label = self.return_label.clone();
        self.write_line(&format!("goto {label};"));
    }

    fn emit_for_each(&mut self, var_name: &str, iterable: ExprId, body: StmtId) {
        let iterable_ty = self.ty_of(iterable);
        let element = self
            .module
            .arena
            .element_type(iterable_ty)
            .unwrap_or_else(|| self.module.arena.error_type());

        self.write_line("{");
        self.indent += 1;
        self.scopes.push(FxHashMap::default());
        let c_name = self.local_c_name(var_name);

        // A literal range iterates by counting; nothing is materialized.
        if let ExprKind::Range { start, end } = self.module.arena.expr(iterable).kind.clone() {
            let start_text = self.expr_text(start);
            let end_text = self.expr_text(end);
            let t = self.next_tmp();
            self.write_line(&format!("long {c_name} = {start_text};"));
            self.write_line(&format!("long __range_end_{t}__ = {end_text};"));
            self.declare_local(
                var_name,
                VarInfo {
                    ty: element,
                    qualifier: MemQualifier::Default,
                    c_name: c_name.clone(),
                },
            );
            self.write_line(&format!(
                "for (; {c_name} <= __range_end_{t}__; {c_name}++) {{"
            ));
            self.emit_loop_body(body, None);
            self.write_line("}");
        } else {
            let iterable_text = self.expr_text(iterable);
            let suffix = rt_suffix(&self.module.arena, element);
            let element_c = c_type(&self.module.arena, element);
            let space = if element_c.ends_with('*') { "" } else { " " };
            self.runtime
                .declare("extern long rt_array_length(RtArray *);".to_string());
            self.runtime.declare(format!(
                "extern {element_c}{space}rt_array_get_{suffix}(RtArray *, long);"
            ));
            let t = self.next_tmp();
            self.write_line(&format!("RtArray *__iter_{t}__ = {iterable_text};"));
            self.declare_local(
                var_name,
                VarInfo {
                    ty: element,
                    qualifier: MemQualifier::Default,
                    c_name: c_name.clone(),
                },
            );
            self.write_line(&format!(
                "for (long __idx_{t}__ = 0; __idx_{t}__ < rt_array_length(__iter_{t}__); __idx_{t}__++) {{"
            ));
            let binding = format!(
                "{element_c}{space}{c_name} = rt_array_get_{suffix}(__iter_{t}__, __idx_{t}__);"
            );
            self.emit_loop_body(body, Some(vec![binding]));
            self.write_line("}");
        }
        self.scopes.pop();
        self.indent -= 1;
        self.write_line("}");
    }
}

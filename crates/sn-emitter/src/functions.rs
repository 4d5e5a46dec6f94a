//! Module layout: user functions, lifted lambdas, closure plumbing, and
//! the generated `main`.

use rustc_hash::FxHashMap;
use sn_ast::{
    Capture, ExprId, FunctionDecl, FunctionModifier, MemQualifier, Parameter, StmtId, StmtKind,
    TypeId,
};

use crate::runtime::{c_type, c_zero, rt_suffix};
use crate::{CEmitter, FnInfo, VarInfo};

/// Emission context saved around a nested function-like body.
struct SavedCtx {
    out: String,
    indent: usize,
    scopes: Vec<FxHashMap<String, VarInfo>>,
    capture_frame: Option<FxHashMap<String, TypeId>>,
    function_arena: String,
    arena_stack: Vec<String>,
    loop_arena_stack: Vec<String>,
    alloc_override: Option<String>,
    return_label: String,
    current_ret: Option<TypeId>,
    current_modifier: FunctionModifier,
}

impl<'m> CEmitter<'m> {
    fn save_ctx(&mut self) -> SavedCtx {
        SavedCtx {
            out: std::mem::take(&mut self.out),
            indent: std::mem::replace(&mut self.indent, 0),
            scopes: std::mem::replace(&mut self.scopes, Vec::new()),
            capture_frame: self.capture_frame.take(),
            function_arena: std::mem::take(&mut self.function_arena),
            arena_stack: std::mem::take(&mut self.arena_stack),
            loop_arena_stack: std::mem::take(&mut self.loop_arena_stack),
            alloc_override: self.alloc_override.take(),
            return_label: std::mem::take(&mut self.return_label),
            current_ret: self.current_ret.take(),
            current_modifier: self.current_modifier,
        }
    }

    fn restore_ctx(&mut self, saved: SavedCtx) -> String {
        let body = std::mem::replace(&mut self.out, saved.out);
        self.indent = saved.indent;
        self.scopes = saved.scopes;
        self.capture_frame = saved.capture_frame;
        self.function_arena = saved.function_arena;
        self.arena_stack = saved.arena_stack;
        self.loop_arena_stack = saved.loop_arena_stack;
        self.alloc_override = saved.alloc_override;
        self.return_label = saved.return_label;
        self.current_ret = saved.current_ret;
        self.current_modifier = saved.current_modifier;
        body
    }

    pub(crate) fn emit(&mut self) {
        // Functions are callable and module-level variables visible from
        // any body, so both are registered before emission starts.
        let module = self.module;
        for &stmt in &module.stmts {
            match &module.arena.stmt(stmt).kind {
                StmtKind::Function(decl) => {
                    self.functions.insert(
                        decl.name.clone(),
                        FnInfo {
                            modifier: decl.modifier,
                            ret: decl.ret,
                            params: decl.params.iter().map(|p| p.ty).collect(),
                        },
                    );
                }
                StmtKind::VarDecl { name, ty, qualifier, .. } => {
                    self.declare_global(name, *ty, *qualifier);
                }
                _ => {}
            }
        }
        let mut main_stmts: Vec<StmtId> = Vec::new();
        let mut has_main = false;
        for &stmt in &module.stmts {
            match &module.arena.stmt(stmt).kind {
                StmtKind::Function(decl) => {
                    if decl.name == "main" {
                        has_main = true;
                    }
                    self.emit_function(decl);
                }
                _ => main_stmts.push(stmt),
            }
        }
        if has_main || !main_stmts.is_empty() {
            self.emit_main(&main_stmts, has_main);
        }
    }

    // ------------------------------------------------------------------
    // User functions
    // ------------------------------------------------------------------

    fn emit_function(&mut self, decl: &FunctionDecl) {
        let ret_c = if self.module.arena.is_void_type(decl.ret) {
            "void"
        } else {
            c_type(&self.module.arena, decl.ret)
        };
        let mut params_text = String::new();
        for param in &decl.params {
            params_text.push_str(", ");
            params_text.push_str(c_type(&self.module.arena, param.ty));
            if !params_text.ends_with('*') {
                params_text.push(' ');
            }
            params_text.push_str(&param.name);
        }
        let header = format!(
            "static {ret_c} sn_{}(RtArena *__caller_arena__{params_text})",
            decl.name
        );
        self.fn_protos.push(format!("{header};"));

        let saved = self.save_ctx();
        self.scopes = vec![saved.scopes[0].clone()];
        let arena_var = format!("__arena_{}__", self.next_arena());
        self.function_arena = arena_var.clone();
        self.arena_stack = vec![arena_var.clone()];
        self.return_label = format!("sn_{}_return", decl.name);
        self.current_ret = if self.module.arena.is_void_type(decl.ret) {
            None
        } else {
            Some(decl.ret)
        };
        self.current_modifier = decl.modifier;

        self.write_line(&format!("{header} {{"));
        self.indent += 1;
        self.rt_arena_fns();
        self.write_line(&format!(
            "RtArena *{arena_var} = rt_arena_create(__caller_arena__);"
        ));
        if let Some(ret) = self.current_ret {
            let zero = c_zero(&self.module.arena, ret);
            let ret_c = c_type(&self.module.arena, ret);
            let space = if ret_c.ends_with('*') { "" } else { " " };
            self.write_line(&format!("{ret_c}{space}__return_value__ = {zero};"));
        }
        self.scopes.push(FxHashMap::default());
        self.bind_params(&decl.params, &arena_var);
        for &stmt in &decl.body {
            self.emit_stmt(stmt);
        }
        self.indent -= 1;
        self.write_line(&format!("{}:", self.return_label.clone()));
        self.indent += 1;
        self.write_line(&format!("rt_arena_destroy({arena_var});"));
        if self.current_ret.is_some() {
            self.write_line("return __return_value__;");
        } else {
            self.write_line("return;");
        }
        self.indent -= 1;
        self.write_line("}");

        let body = self.restore_ctx(saved);
        self.bodies.push(body);
    }

    /// Declare parameters in the body scope; `as val` parameters are
    /// deep-copied into the activation arena on entry.
    fn bind_params(&mut self, params: &[Parameter], arena_var: &str) {
        for param in params {
            self.declare_local(
                &param.name,
                VarInfo {
                    ty: param.ty,
                    qualifier: MemQualifier::Default,
                    c_name: param.name.clone(),
                },
            );
            if param.qualifier == MemQualifier::AsVal {
                let copy = self.clone_value(param.ty, &param.name, arena_var);
                self.write_line(&format!("{} = {copy};", param.name));
            }
        }
    }

    /// Deep-copy expression for `as val` semantics.
    pub(crate) fn clone_value(&mut self, ty: TypeId, value: &str, arena: &str) -> String {
        if let Some(element) = self.module.arena.element_type(ty) {
            let suffix = rt_suffix(&self.module.arena, element);
            self.runtime.declare(format!(
                "extern RtArray *rt_array_clone_{suffix}(RtArena *, RtArray *);"
            ));
            return format!("rt_array_clone_{suffix}({arena}, {value})");
        }
        // Strings copy through the identity conversion; closures and value
        // types copy by C assignment.
        if matches!(self.module.arena.ty(ty), sn_ast::Type::Str) {
            self.runtime
                .declare("extern char *rt_to_string_string(RtArena *, char *);".to_string());
            return format!("rt_to_string_string({arena}, {value})");
        }
        value.to_string()
    }

    pub(crate) fn rt_arena_fns(&mut self) {
        self.runtime
            .declare("extern RtArena *rt_arena_create(RtArena *);".to_string());
        self.runtime
            .declare("extern void rt_arena_destroy(RtArena *);".to_string());
    }

    // ------------------------------------------------------------------
    // Lambdas
    // ------------------------------------------------------------------

    /// Lift a lambda to a top-level C function and return the expression
    /// text that builds its closure value at the current site.
    pub(crate) fn emit_lambda(
        &mut self,
        lambda_id: u32,
        params: &[Parameter],
        ret: TypeId,
        body: &[StmtId],
        modifier: FunctionModifier,
        captures: &[Capture],
    ) -> String {
        let fn_name = format!("__lambda_{lambda_id}__");
        let env_name = format!("__lambda_{lambda_id}_env__");
        let has_env = !captures.is_empty();

        // Capture addresses are taken in the surrounding context, before
        // the scope swap below.
        let capture_addrs: Vec<String> = captures
            .iter()
            .map(|capture| self.var_addr(&capture.name))
            .collect();

        if has_env {
            let mut typedef = "typedef struct {\n".to_string();
            for capture in captures {
                let field_c = c_type(&self.module.arena, capture.ty);
                let space = if field_c.ends_with('*') { "" } else { " " };
                typedef.push_str(&format!("    {field_c}{space}*{};\n", capture.name));
            }
            typedef.push_str(&format!("}} {env_name};\n"));
            self.lambda_decls.push(typedef);
        }

        let ret_c = if self.module.arena.is_void_type(ret) {
            "void"
        } else {
            c_type(&self.module.arena, ret)
        };
        let env_param = if has_env {
            format!("{env_name} *__env__")
        } else {
            "void *__env__".to_string()
        };
        let mut params_text = String::new();
        for param in params {
            params_text.push_str(", ");
            params_text.push_str(c_type(&self.module.arena, param.ty));
            if !params_text.ends_with('*') {
                params_text.push(' ');
            }
            params_text.push_str(&param.name);
        }
        let header =
            format!("static {ret_c} {fn_name}(RtArena *__caller_arena__, {env_param}{params_text})");
        self.lambda_decls.push(format!("{header};"));

        // Body, in a fresh context over the same globals.
        let saved = self.save_ctx();
        self.scopes = vec![saved.scopes[0].clone()];
        self.capture_frame = Some(
            captures
                .iter()
                .map(|c| (c.name.clone(), c.ty))
                .collect::<FxHashMap<_, _>>(),
        );
        let arena_var = format!("__arena_{}__", self.next_arena());
        self.function_arena = arena_var.clone();
        self.arena_stack = vec![arena_var.clone()];
        self.return_label = format!("__lambda_{lambda_id}_return__");
        self.current_ret = if self.module.arena.is_void_type(ret) {
            None
        } else {
            Some(ret)
        };
        self.current_modifier = modifier;

        self.write_line(&format!("{header} {{"));
        self.indent += 1;
        if !has_env {
            self.write_line("(void)__env__;");
        }
        self.rt_arena_fns();
        self.write_line(&format!(
            "RtArena *{arena_var} = rt_arena_create(__caller_arena__);"
        ));
        if let Some(ret) = self.current_ret {
            let zero = c_zero(&self.module.arena, ret);
            let ret_c = c_type(&self.module.arena, ret);
            let space = if ret_c.ends_with('*') { "" } else { " " };
            self.write_line(&format!("{ret_c}{space}__return_value__ = {zero};"));
        }
        self.scopes.push(FxHashMap::default());
        self.bind_params(params, &arena_var);
        for &stmt in body {
            self.emit_stmt(stmt);
        }
        self.indent -= 1;
        self.write_line(&format!("__lambda_{lambda_id}_return__:"));
        self.indent += 1;
        self.write_line(&format!("rt_arena_destroy({arena_var});"));
        if self.current_ret.is_some() {
            self.write_line("return __return_value__;");
        } else {
            self.write_line("return;");
        }
        self.indent -= 1;
        self.write_line("}");
        let body_text = self.restore_ctx(saved);
        self.lambda_defs.push(body_text);

        if !has_env {
            return format!("(RtClosure){{ (void *){fn_name}, NULL }}");
        }

        // Bind helper: allocates the environment and packs the closure.
        self.runtime
            .declare("extern void *rt_arena_alloc(RtArena *, size_t);".to_string());
        let mut bind_params = String::new();
        let mut bind_body = String::new();
        for capture in captures {
            let field_c = c_type(&self.module.arena, capture.ty);
            let space = if field_c.ends_with('*') { "" } else { " " };
            bind_params.push_str(&format!(", {field_c}{space}*{}", capture.name));
            bind_body.push_str(&format!("    env->{0} = {0};\n", capture.name));
        }
        let bind_name = format!("__lambda_{lambda_id}_bind__");
        self.lambda_decls
            .push(format!("static RtClosure {bind_name}(RtArena *__arena__{bind_params});"));
        self.lambda_defs.push(format!(
            "static RtClosure {bind_name}(RtArena *__arena__{bind_params}) {{\n    \
             {env_name} *env = rt_arena_alloc(__arena__, sizeof({env_name}));\n\
             {bind_body}    \
             RtClosure closure;\n    \
             closure.fn = (void *){fn_name};\n    \
             closure.env = env;\n    \
             return closure;\n}}\n"
        ));

        let arena = self.alloc_arena();
        format!("{bind_name}({arena}, {})", capture_addrs.join(", "))
    }

    // ------------------------------------------------------------------
    // Closure calls and function values
    // ------------------------------------------------------------------

    /// A typed trampoline so closure callees are evaluated exactly once.
    pub(crate) fn closure_call_helper(&mut self, params: &[TypeId], ret: TypeId) -> String {
        let ret_tok = rt_suffix(&self.module.arena, ret);
        let mut name = format!("__call_{ret_tok}");
        for &param in params {
            name.push('_');
            name.push_str(rt_suffix(&self.module.arena, param));
        }
        name.push_str("__");

        let ret_c = if self.module.arena.is_void_type(ret) {
            "void"
        } else {
            c_type(&self.module.arena, ret)
        };
        let mut decl_params = String::new();
        let mut cast_params = String::new();
        let mut args = String::new();
        for (i, &param) in params.iter().enumerate() {
            let param_c = c_type(&self.module.arena, param);
            let space = if param_c.ends_with('*') { "" } else { " " };
            decl_params.push_str(&format!(", {param_c}{space}__a{i}__"));
            cast_params.push_str(&format!(", {param_c}"));
            args.push_str(&format!(", __a{i}__"));
        }
        let ret_kw = if self.module.arena.is_void_type(ret) {
            ""
        } else {
            "return "
        };
        let helper = format!(
            "static {ret_c} {name}(RtArena *__arena__, RtClosure __c__{decl_params}) {{\n    \
             {ret_kw}(({ret_c} (*)(RtArena *, void *{cast_params}))__c__.fn)(__arena__, __c__.env{args});\n}}\n"
        );
        self.call_helpers.insert(helper);
        name
    }

    /// A top-level function used as a first-class value gets a wrapper
    /// matching the closure calling convention.
    pub(crate) fn function_value(&mut self, name: &str, info: &FnInfo) -> String {
        let wrapper = format!("__fnval_{name}__");
        let ret_c = if self.module.arena.is_void_type(info.ret) {
            "void"
        } else {
            c_type(&self.module.arena, info.ret)
        };
        let mut decl_params = String::new();
        let mut args = String::new();
        for (i, &param) in info.params.iter().enumerate() {
            let param_c = c_type(&self.module.arena, param);
            let space = if param_c.ends_with('*') { "" } else { " " };
            decl_params.push_str(&format!(", {param_c}{space}__a{i}__"));
            args.push_str(&format!(", __a{i}__"));
        }
        let ret_kw = if self.module.arena.is_void_type(info.ret) {
            ""
        } else {
            "return "
        };
        self.fn_value_wrappers.insert(format!(
            "static {ret_c} {wrapper}(RtArena *__arena__, void *__env__{decl_params}) {{\n    \
             (void)__env__;\n    \
             {ret_kw}sn_{name}(__arena__{args});\n}}\n"
        ));
        format!("(RtClosure){{ (void *){wrapper}, NULL }}")
    }

    // ------------------------------------------------------------------
    // main
    // ------------------------------------------------------------------

    fn emit_main(&mut self, stmts: &[StmtId], has_main: bool) {
        let saved = self.save_ctx();
        self.scopes = vec![saved.scopes[0].clone()];
        self.function_arena = "__arena_0__".to_string();
        self.arena_stack = vec!["__arena_0__".to_string()];
        self.return_label = "__main_return__".to_string();
        self.current_ret = None;

        self.write_line("int main(void) {");
        self.indent += 1;
        self.rt_arena_fns();
        self.write_line("RtArena *__arena_0__ = rt_arena_create(NULL);");
        self.scopes.push(FxHashMap::default());
        for &stmt in stmts {
            if let StmtKind::VarDecl {
                name,
                ty,
                initializer,
                qualifier,
            } = self.module.arena.stmt(stmt).kind.clone()
            {
                self.emit_global_var_decl(&name, ty, initializer, qualifier);
            } else {
                self.emit_stmt(stmt);
            }
        }
        let exit_with_code = has_main
            && self
                .functions
                .get("main")
                .is_some_and(|f| !self.module.arena.is_void_type(f.ret));
        if has_main {
            if exit_with_code {
                self.write_line("long __exit_code__ = sn_main(__arena_0__);");
            } else {
                self.write_line("sn_main(__arena_0__);");
            }
        }
        self.write_line("rt_arena_destroy(__arena_0__);");
        if exit_with_code {
            self.write_line("return (int)__exit_code__;");
        } else {
            self.write_line("return 0;");
        }
        self.indent -= 1;
        self.write_line("}");

        let body = self.restore_ctx(saved);
        self.bodies.push(body);
    }

    /// Top-level declarations become C globals so functions can see them.
    fn declare_global(&mut self, name: &str, ty: TypeId, qualifier: MemQualifier) {
        let var_c = c_type(&self.module.arena, ty);
        let space = if var_c.ends_with('*') { "" } else { " " };
        if qualifier == MemQualifier::AsRef {
            self.globals.push_str(&format!("static {var_c}{space}*{name};\n"));
        } else {
            self.globals.push_str(&format!("static {var_c}{space}{name};\n"));
        }
        self.scopes[0].insert(
            name.to_owned(),
            VarInfo {
                ty,
                qualifier,
                c_name: name.to_owned(),
            },
        );
    }

    /// Global initializers run at the top of `main`, in source order.
    fn emit_global_var_decl(
        &mut self,
        name: &str,
        ty: TypeId,
        initializer: Option<ExprId>,
        qualifier: MemQualifier,
    ) {
        let var_c = c_type(&self.module.arena, ty);
        match qualifier {
            MemQualifier::AsRef => {
                self.runtime
                    .declare("extern void *rt_arena_alloc(RtArena *, size_t);".to_string());
                self.write_line(&format!(
                    "{name} = rt_arena_alloc(__arena_0__, sizeof({var_c}));"
                ));
                if let Some(initializer) = initializer {
                    let init = self.expr_text(initializer);
                    self.write_line(&format!("*{name} = {init};"));
                }
            }
            MemQualifier::AsVal => {
                if let Some(initializer) = initializer {
                    let init = self.expr_text(initializer);
                    let arena = self.alloc_arena();
                    let copy = self.clone_value(ty, &init, &arena);
                    self.write_line(&format!("{name} = {copy};"));
                }
            }
            MemQualifier::Default => {
                if let Some(initializer) = initializer {
                    let init = self.expr_text(initializer);
                    self.write_line(&format!("{name} = {init};"));
                }
            }
        }
    }
}

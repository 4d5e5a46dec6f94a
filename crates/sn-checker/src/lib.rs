//! Type and memory-discipline checker for Sindarin.
//!
//! A single pass over the module: infers and validates expression types,
//! enforces the `as val`/`as ref` qualifier rules and the
//! `shared`/`private` function rules, and records lambda captures. The
//! checker accumulates diagnostics and keeps going across sibling
//! statements; inside an expression the error type propagates silently so
//! one mistake yields one diagnostic.

mod builtins;
mod expressions;
mod statements;
pub mod symbols;

use rustc_hash::FxHashSet;
use sn_ast::{Capture, FunctionModifier, Module, StmtKind, TypeId};
use sn_common::{Diagnostic, DiagnosticSink, ErrorKind};
use tracing::debug;

pub use symbols::{Symbol, SymbolKind, SymbolTable};

/// Check a module in place, filling every expression's type. Returns the
/// diagnostics in source order; empty means the module is well typed.
pub fn check_module(module: &mut Module) -> Vec<Diagnostic> {
    let mut checker = CheckerState::new(module);
    checker.run();
    let diagnostics = checker.diagnostics.into_vec();
    debug!(errors = diagnostics.len(), "type check finished");
    diagnostics
}

/// Boolean convenience over [`check_module`].
pub fn module_is_well_typed(module: &mut Module) -> bool {
    check_module(module).is_empty()
}

pub(crate) struct LambdaCtx {
    /// Scope depth outside the lambda; hits below this depth are captures.
    pub base_depth: usize,
    pub captures: Vec<Capture>,
    pub seen: FxHashSet<String>,
}

pub(crate) struct CheckerState<'m> {
    pub module: &'m mut Module,
    pub symbols: SymbolTable,
    pub diagnostics: DiagnosticSink,
    pub expected_return: Option<TypeId>,
    pub current_modifier: FunctionModifier,
    pub loop_depth: u32,
    pub lambdas: Vec<LambdaCtx>,
}

impl<'m> CheckerState<'m> {
    fn new(module: &'m mut Module) -> Self {
        Self {
            module,
            symbols: SymbolTable::new(),
            diagnostics: DiagnosticSink::new(),
            expected_return: None,
            current_modifier: FunctionModifier::Default,
            loop_depth: 0,
            lambdas: Vec::new(),
        }
    }

    fn run(&mut self) {
        let stmts = self.module.stmts.clone();
        // Functions are visible module-wide before any body is checked, so
        // forward reference and mutual recursion work.
        for &stmt in &stmts {
            if let StmtKind::Function(decl) = &self.module.arena.stmt(stmt).kind {
                let (name, line, modifier) = (decl.name.clone(), self.module.arena.stmt(stmt).line, decl.modifier);
                let params: Vec<TypeId> = decl.params.iter().map(|p| p.ty).collect();
                let ret = decl.ret;
                let ty = self.module.arena.function_type(params, ret);
                if self
                    .symbols
                    .declare(&name, Symbol::function(ty, modifier))
                    .is_err()
                {
                    self.error(
                        ErrorKind::Redeclaration,
                        line,
                        format!("function '{name}' is already declared"),
                    );
                }
            }
        }
        for &stmt in &stmts {
            self.check_stmt(stmt);
        }
    }

    pub(crate) fn error(&mut self, kind: ErrorKind, line: u32, message: impl Into<String>) {
        let file = self.module.filename.clone();
        self.diagnostics.error(kind, file, line, message);
    }
}

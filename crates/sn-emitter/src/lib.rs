//! C emitter for Sindarin.
//!
//! Walks a type-checked `Module` and produces one self-contained C
//! translation unit over the `rt_*` runtime ABI. Layout of the output:
//! typedef/extern header, globals, user-function prototypes, lifted
//! lambdas with their environment structs and bind helpers, user function
//! bodies, then `main`. Scope boundaries become arena create/destroy
//! pairs: one arena per function activation, one per loop iteration.

mod expressions;
mod functions;
mod runtime;
mod statements;

use std::io::Write as _;
use std::path::Path;

use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use sn_ast::{FunctionModifier, MemQualifier, Module, TypeId};
use sn_common::{Diagnostic, ErrorKind};
use tracing::debug;

pub use runtime::{PRELUDE, RuntimeRegistry, c_type, c_zero, rt_suffix};

/// Lower a checked module to C source text. The only failure mode is an
/// internal-consistency violation (an unchecked expression reached the
/// emitter), which reports rather than panics.
pub fn emit_module(module: &Module) -> Result<String, Diagnostic> {
    let mut emitter = CEmitter::new(module);
    emitter.emit();
    if let Some(message) = emitter.internal_error.take() {
        return Err(Diagnostic::new(
            ErrorKind::InternalConsistency,
            module.filename.clone(),
            0,
            message,
        ));
    }
    let text = emitter.assemble();
    debug!(file = %module.filename, bytes = text.len(), "emitted C translation unit");
    Ok(text)
}

/// Write the emitted text atomically: a sibling temp file, then a rename.
pub fn write_c_file(path: &Path, text: &str) -> Result<(), Diagnostic> {
    let io_error = |message: String| {
        Diagnostic::new(ErrorKind::IoError, path.display().to_string(), 0, message)
    };
    let mut temp = path.to_path_buf();
    let file_name = temp
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out.c".to_string());
    temp.set_file_name(format!(".{file_name}.tmp"));
    let mut file =
        std::fs::File::create(&temp).map_err(|e| io_error(format!("cannot create temp file: {e}")))?;
    file.write_all(text.as_bytes())
        .map_err(|e| io_error(format!("cannot write output: {e}")))?;
    file.sync_all()
        .map_err(|e| io_error(format!("cannot flush output: {e}")))?;
    drop(file);
    std::fs::rename(&temp, path).map_err(|e| io_error(format!("cannot rename into place: {e}")))
}

#[derive(Clone, Debug)]
pub(crate) struct FnInfo {
    pub modifier: FunctionModifier,
    pub ret: TypeId,
    pub params: Vec<TypeId>,
}

#[derive(Clone, Debug)]
pub(crate) struct VarInfo {
    pub ty: TypeId,
    pub qualifier: MemQualifier,
    /// The C identifier backing this variable. Differs from the source
    /// name when a declaration shadows an outer local, since a C
    /// initializer would otherwise see the fresh variable.
    pub c_name: String,
}

/// Where a name resolves during emission.
pub(crate) enum Slot {
    Local(VarInfo),
    Capture(TypeId),
    Global(VarInfo),
    Function(FnInfo),
}

pub(crate) struct CEmitter<'m> {
    pub module: &'m Module,

    // Output streams, assembled at the end.
    pub out: String,
    pub indent: usize,
    pub runtime: RuntimeRegistry,
    pub globals: String,
    pub fn_protos: Vec<String>,
    pub lambda_decls: Vec<String>,
    pub lambda_defs: Vec<String>,
    pub call_helpers: IndexSet<String>,
    pub fn_value_wrappers: IndexSet<String>,
    pub bodies: Vec<String>,

    // Name resolution. `scopes[0]` holds module-level globals.
    pub functions: FxHashMap<String, FnInfo>,
    pub scopes: Vec<FxHashMap<String, VarInfo>>,
    pub capture_frame: Option<FxHashMap<String, TypeId>>,

    // Arena bookkeeping.
    pub arena_counter: u32,
    pub tmp_counter: u32,
    /// The enclosing function's own arena (loop arenas nest inside it).
    pub function_arena: String,
    /// Innermost allocation arena (function arena or a loop arena).
    pub arena_stack: Vec<String>,
    /// Loop arenas of the current function, innermost last.
    pub loop_arena_stack: Vec<String>,
    /// Set while emitting a shared function's return value.
    pub alloc_override: Option<String>,

    // Current function context.
    pub return_label: String,
    pub current_ret: Option<TypeId>,
    pub current_modifier: FunctionModifier,

    pub internal_error: Option<String>,
}

impl<'m> CEmitter<'m> {
    fn new(module: &'m Module) -> Self {
        Self {
            module,
            out: String::new(),
            indent: 0,
            runtime: RuntimeRegistry::new(),
            globals: String::new(),
            fn_protos: Vec::new(),
            lambda_decls: Vec::new(),
            lambda_defs: Vec::new(),
            call_helpers: IndexSet::new(),
            fn_value_wrappers: IndexSet::new(),
            bodies: Vec::new(),
            functions: FxHashMap::default(),
            scopes: vec![FxHashMap::default()],
            capture_frame: None,
            // `__arena_0__` is reserved for the generated `main`.
            arena_counter: 1,
            tmp_counter: 0,
            function_arena: String::new(),
            arena_stack: Vec::new(),
            loop_arena_stack: Vec::new(),
            alloc_override: None,
            return_label: String::new(),
            current_ret: None,
            current_modifier: FunctionModifier::Default,
            internal_error: None,
        }
    }

    // ------------------------------------------------------------------
    // Writer
    // ------------------------------------------------------------------

    pub(crate) fn write_line(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(line);
        self.out.push('\n');
    }

    // ------------------------------------------------------------------
    // Name resolution
    // ------------------------------------------------------------------

    pub(crate) fn declare_local(&mut self, name: &str, info: VarInfo) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_owned(), info);
        }
    }

    pub(crate) fn resolve(&self, name: &str) -> Option<Slot> {
        for scope in self.scopes.iter().skip(1).rev() {
            if let Some(info) = scope.get(name) {
                return Some(Slot::Local(info.clone()));
            }
        }
        if let Some(frame) = &self.capture_frame {
            if let Some(&ty) = frame.get(name) {
                return Some(Slot::Capture(ty));
            }
        }
        if let Some(info) = self.scopes[0].get(name) {
            return Some(Slot::Global(info.clone()));
        }
        self.functions.get(name).map(|f| Slot::Function(f.clone()))
    }

    /// R-value text for a variable use.
    pub(crate) fn var_use(&mut self, name: &str) -> String {
        match self.resolve(name) {
            Some(Slot::Local(info) | Slot::Global(info)) => {
                if info.qualifier == MemQualifier::AsRef {
                    format!("(*{})", info.c_name)
                } else {
                    info.c_name
                }
            }
            Some(Slot::Capture(_)) => format!("(*__env__->{name})"),
            Some(Slot::Function(info)) => self.function_value(name, &info),
            None => {
                self.internal_error
                    .get_or_insert_with(|| format!("unresolved name '{name}' during emission"));
                "0".to_string()
            }
        }
    }

    /// Address of the storage behind a variable, for `&x`-style operands.
    pub(crate) fn var_addr(&mut self, name: &str) -> String {
        match self.resolve(name) {
            Some(Slot::Local(info) | Slot::Global(info)) => {
                if info.qualifier == MemQualifier::AsRef {
                    info.c_name
                } else {
                    format!("&{}", info.c_name)
                }
            }
            Some(Slot::Capture(_)) => format!("__env__->{name}"),
            _ => {
                self.internal_error
                    .get_or_insert_with(|| format!("unresolved lvalue '{name}' during emission"));
                "0".to_string()
            }
        }
    }

    /// Pick the C identifier for a new local; shadowing an outer local
    /// forces a rename so the initializer still sees the outer binding.
    pub(crate) fn local_c_name(&mut self, name: &str) -> String {
        let shadows = self.scopes.iter().skip(1).any(|s| s.contains_key(name));
        if shadows {
            format!("{name}__{}", self.next_tmp())
        } else {
            name.to_owned()
        }
    }

    // ------------------------------------------------------------------
    // Arenas and counters
    // ------------------------------------------------------------------

    /// The arena new heap values are allocated from: the shared-return
    /// override if active, otherwise the innermost scope arena.
    pub(crate) fn alloc_arena(&self) -> String {
        if let Some(override_arena) = &self.alloc_override {
            return override_arena.clone();
        }
        self.arena_stack
            .last()
            .cloned()
            .unwrap_or_else(|| "__arena_0__".to_string())
    }

    pub(crate) fn next_arena(&mut self) -> u32 {
        let n = self.arena_counter;
        self.arena_counter += 1;
        n
    }

    pub(crate) fn next_tmp(&mut self) -> u32 {
        let n = self.tmp_counter;
        self.tmp_counter += 1;
        n
    }

    pub(crate) fn ty_of(&mut self, id: sn_ast::ExprId) -> TypeId {
        match self.module.arena.expr(id).ty {
            Some(ty) => ty,
            None => {
                let line = self.module.arena.expr(id).line;
                self.internal_error.get_or_insert_with(|| {
                    format!("expression at line {line} reached the emitter unchecked")
                });
                self.module.arena.error_type()
            }
        }
    }

    // ------------------------------------------------------------------
    // Assembly
    // ------------------------------------------------------------------

    fn assemble(&mut self) -> String {
        let mut text = String::new();
        text.push_str(PRELUDE);
        text.push('\n');
        let externs = self.runtime.render();
        if !externs.is_empty() {
            text.push_str(&externs);
            text.push('\n');
        }
        if !self.globals.is_empty() {
            text.push_str(&self.globals);
            text.push('\n');
        }
        for proto in &self.fn_protos {
            text.push_str(proto);
            text.push('\n');
        }
        if !self.fn_protos.is_empty() {
            text.push('\n');
        }
        for helper in &self.call_helpers {
            text.push_str(helper);
            text.push('\n');
        }
        for wrapper in &self.fn_value_wrappers {
            text.push_str(wrapper);
            text.push('\n');
        }
        for decl in &self.lambda_decls {
            text.push_str(decl);
            text.push('\n');
        }
        for def in &self.lambda_defs {
            text.push_str(def);
            text.push('\n');
        }
        for body in &self.bodies {
            text.push_str(body);
            text.push('\n');
        }
        text
    }
}

//! Module - one parsed source file and the arena that owns its tree.

use crate::arena::{AstArena, StmtId};

/// Every id reachable from `stmts` resolves inside `arena`; dropping the
/// module frees the whole tree at once.
#[derive(Debug)]
pub struct Module {
    pub filename: String,
    pub arena: AstArena,
    /// Top-level statements in parse order.
    pub stmts: Vec<StmtId>,
    /// Imported module names, in source order. Single-file compilation
    /// only uses these to pick runtime objects at link time.
    pub imports: Vec<String>,
}

impl Module {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            arena: AstArena::new(),
            stmts: Vec::new(),
            imports: Vec::new(),
        }
    }
}

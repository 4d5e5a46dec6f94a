//! Symbol table - a stack of lexical scopes.
//!
//! Lookups walk from the innermost scope out and report the scope depth of
//! the hit; the checker uses that depth to detect lambda captures.

use rustc_hash::FxHashMap;
use sn_ast::{FunctionModifier, MemQualifier, TypeId};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
    Parameter,
}

#[derive(Clone, Debug)]
pub struct Symbol {
    pub ty: TypeId,
    pub qualifier: MemQualifier,
    pub modifier: FunctionModifier,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn variable(ty: TypeId, qualifier: MemQualifier) -> Self {
        Self {
            ty,
            qualifier,
            modifier: FunctionModifier::Default,
            kind: SymbolKind::Variable,
        }
    }

    pub fn parameter(ty: TypeId, qualifier: MemQualifier) -> Self {
        Self {
            ty,
            qualifier,
            modifier: FunctionModifier::Default,
            kind: SymbolKind::Parameter,
        }
    }

    pub fn function(ty: TypeId, modifier: FunctionModifier) -> Self {
        Self {
            ty,
            qualifier: MemQualifier::Default,
            modifier,
            kind: SymbolKind::Function,
        }
    }
}

#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<FxHashMap<String, Symbol>>,
}

impl SymbolTable {
    /// Starts with the module-level scope already open.
    pub fn new() -> Self {
        Self {
            scopes: vec![FxHashMap::default()],
        }
    }

    pub fn open_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    pub fn close_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot close the module scope");
        self.scopes.pop();
    }

    /// Number of open scopes; the innermost has index `depth() - 1`.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Declare into the current scope. `Err` means the name is already
    /// declared there.
    pub fn declare(&mut self, name: &str, symbol: Symbol) -> Result<(), ()> {
        let scope = self.scopes.last_mut().expect("at least one scope");
        if scope.contains_key(name) {
            return Err(());
        }
        scope.insert(name.to_owned(), symbol);
        Ok(())
    }

    /// Innermost-out lookup; also reports the scope index of the hit.
    pub fn lookup(&self, name: &str) -> Option<(&Symbol, usize)> {
        for (index, scope) in self.scopes.iter().enumerate().rev() {
            if let Some(symbol) = scope.get(name) {
                return Some((symbol, index));
            }
        }
        None
    }

    pub fn lookup_in_current(&self, name: &str) -> Option<&Symbol> {
        self.scopes.last().and_then(|scope| scope.get(name))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sn_ast::AstArena;

    #[test]
    fn declare_then_lookup_round_trips() {
        let arena = AstArena::new();
        let mut table = SymbolTable::new();
        table
            .declare("x", Symbol::variable(arena.int_type(), MemQualifier::Default))
            .unwrap();
        let (symbol, depth) = table.lookup("x").unwrap();
        assert_eq!(symbol.ty, arena.int_type());
        assert_eq!(depth, 0);
    }

    #[test]
    fn duplicate_in_same_scope_is_rejected() {
        let arena = AstArena::new();
        let mut table = SymbolTable::new();
        table
            .declare("x", Symbol::variable(arena.int_type(), MemQualifier::Default))
            .unwrap();
        assert!(table
            .declare("x", Symbol::variable(arena.bool_type(), MemQualifier::Default))
            .is_err());
    }

    #[test]
    fn inner_scope_shadows_and_close_restores() {
        let arena = AstArena::new();
        let mut table = SymbolTable::new();
        table
            .declare("x", Symbol::variable(arena.int_type(), MemQualifier::Default))
            .unwrap();
        table.open_scope();
        table
            .declare("x", Symbol::variable(arena.str_type(), MemQualifier::Default))
            .unwrap();
        assert_eq!(table.lookup("x").unwrap().0.ty, arena.str_type());
        assert_eq!(table.lookup("x").unwrap().1, 1);
        table.close_scope();
        assert_eq!(table.lookup("x").unwrap().0.ty, arena.int_type());
    }

    #[test]
    fn lookup_in_current_ignores_outer_scopes() {
        let arena = AstArena::new();
        let mut table = SymbolTable::new();
        table
            .declare("x", Symbol::variable(arena.int_type(), MemQualifier::Default))
            .unwrap();
        table.open_scope();
        assert!(table.lookup_in_current("x").is_none());
        assert!(table.lookup("x").is_some());
    }

    #[test]
    fn close_scope_removes_exactly_inner_declarations() {
        let arena = AstArena::new();
        let mut table = SymbolTable::new();
        table.open_scope();
        table
            .declare("inner", Symbol::variable(arena.int_type(), MemQualifier::Default))
            .unwrap();
        table.close_scope();
        assert!(table.lookup("inner").is_none());
    }
}

//! Arena - id-based storage for AST nodes and types.
//!
//! Expressions, statements, and types live in three `Vec`s owned by one
//! `AstArena`; nodes reference each other through `u32` index newtypes.
//! Dropping the arena frees the whole tree wholesale. Ids are only
//! meaningful against the arena that produced them.

use crate::expr::Expr;
use crate::stmt::Stmt;
use crate::types::Type;

/// Index of an expression within its arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExprId(pub u32);

/// Index of a statement within its arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StmtId(pub u32);

/// Index of a type within its arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

/// Owns every node of one module. Primitive types are interned once at
/// construction so the common cases are id-comparable.
#[derive(Debug)]
pub struct AstArena {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    types: Vec<Type>,
    ty_int: TypeId,
    ty_double: TypeId,
    ty_char: TypeId,
    ty_str: TypeId,
    ty_bool: TypeId,
    ty_void: TypeId,
    ty_error: TypeId,
    next_lambda_id: u32,
}

impl AstArena {
    pub fn new() -> Self {
        let mut arena = Self {
            exprs: Vec::new(),
            stmts: Vec::new(),
            types: Vec::new(),
            ty_int: TypeId(0),
            ty_double: TypeId(0),
            ty_char: TypeId(0),
            ty_str: TypeId(0),
            ty_bool: TypeId(0),
            ty_void: TypeId(0),
            ty_error: TypeId(0),
            next_lambda_id: 0,
        };
        arena.ty_int = arena.push_type(Type::Int);
        arena.ty_double = arena.push_type(Type::Double);
        arena.ty_char = arena.push_type(Type::Char);
        arena.ty_str = arena.push_type(Type::Str);
        arena.ty_bool = arena.push_type(Type::Bool);
        arena.ty_void = arena.push_type(Type::Void);
        arena.ty_error = arena.push_type(Type::Error);
        arena
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub(crate) fn push_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(expr);
        id
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.0 as usize]
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.0 as usize]
    }

    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    pub(crate) fn push_stmt(&mut self, stmt: Stmt) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(stmt);
        id
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.0 as usize]
    }

    pub fn stmt_mut(&mut self, id: StmtId) -> &mut Stmt {
        &mut self.stmts[id.0 as usize]
    }

    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn push_type(&mut self, ty: Type) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    pub fn ty(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    pub fn int_type(&self) -> TypeId {
        self.ty_int
    }

    pub fn double_type(&self) -> TypeId {
        self.ty_double
    }

    pub fn char_type(&self) -> TypeId {
        self.ty_char
    }

    pub fn str_type(&self) -> TypeId {
        self.ty_str
    }

    pub fn bool_type(&self) -> TypeId {
        self.ty_bool
    }

    pub fn void_type(&self) -> TypeId {
        self.ty_void
    }

    /// The cascade-suppression sentinel. Never equal to any type, never
    /// emitted; expressions that failed to check carry it.
    pub fn error_type(&self) -> TypeId {
        self.ty_error
    }

    /// Allocate an array type over `element`.
    pub fn array_type(&mut self, element: TypeId) -> TypeId {
        self.push_type(Type::Array(element))
    }

    /// Allocate a function type.
    pub fn function_type(&mut self, params: Vec<TypeId>, ret: TypeId) -> TypeId {
        self.push_type(Type::Function { params, ret })
    }

    pub(crate) fn next_lambda_id(&mut self) -> u32 {
        let id = self.next_lambda_id;
        self.next_lambda_id += 1;
        id
    }
}

impl Default for AstArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_interned_once() {
        let arena = AstArena::new();
        assert_eq!(arena.int_type(), arena.int_type());
        assert_ne!(arena.int_type(), arena.double_type());
        assert!(matches!(arena.ty(arena.str_type()), Type::Str));
    }

    #[test]
    fn array_types_nest() {
        let mut arena = AstArena::new();
        let ints = arena.array_type(arena.int_type());
        let grid = arena.array_type(ints);
        let Type::Array(inner) = *arena.ty(grid) else {
            panic!("expected array type");
        };
        assert_eq!(inner, ints);
    }
}

//! Type - the shared value lattice.
//!
//! Types are arena-owned and immutable once created. Many expression nodes
//! may reference one type id; equality is structural.

use crate::arena::{AstArena, TypeId};

#[derive(Clone, Debug)]
pub enum Type {
    Int,
    Double,
    Char,
    Str,
    Bool,
    Void,
    Array(TypeId),
    Function { params: Vec<TypeId>, ret: TypeId },
    /// Sentinel for expressions that failed to check. Unequal to every
    /// type, including itself, so no cascade diagnostics fire.
    Error,
}

impl AstArena {
    /// Structural equality: discriminants, then element type for arrays,
    /// return type and parameter tuple for functions.
    pub fn type_equals(&self, a: TypeId, b: TypeId) -> bool {
        match (self.ty(a), self.ty(b)) {
            (Type::Int, Type::Int)
            | (Type::Double, Type::Double)
            | (Type::Char, Type::Char)
            | (Type::Str, Type::Str)
            | (Type::Bool, Type::Bool)
            | (Type::Void, Type::Void) => true,
            (Type::Array(ea), Type::Array(eb)) => self.type_equals(*ea, *eb),
            (
                Type::Function { params: pa, ret: ra },
                Type::Function { params: pb, ret: rb },
            ) => {
                pa.len() == pb.len()
                    && self.type_equals(*ra, *rb)
                    && pa.iter().zip(pb).all(|(x, y)| self.type_equals(*x, *y))
            }
            _ => false,
        }
    }

    /// Deep-copy a type into fresh arena slots. Primitives reuse the
    /// interned ids.
    pub fn clone_type(&mut self, id: TypeId) -> TypeId {
        match self.ty(id).clone() {
            Type::Int => self.int_type(),
            Type::Double => self.double_type(),
            Type::Char => self.char_type(),
            Type::Str => self.str_type(),
            Type::Bool => self.bool_type(),
            Type::Void => self.void_type(),
            Type::Error => self.error_type(),
            Type::Array(element) => {
                let element = self.clone_type(element);
                self.array_type(element)
            }
            Type::Function { params, ret } => {
                let params = params.iter().map(|p| self.clone_type(*p)).collect();
                let ret = self.clone_type(ret);
                self.function_type(params, ret)
            }
        }
    }

    /// Canonical textual form: `int`, `double[]`, `fn(int,str): bool`.
    pub fn type_to_string(&self, id: TypeId) -> String {
        match self.ty(id) {
            Type::Int => "int".to_string(),
            Type::Double => "double".to_string(),
            Type::Char => "char".to_string(),
            Type::Str => "str".to_string(),
            Type::Bool => "bool".to_string(),
            Type::Void => "void".to_string(),
            Type::Error => "<error>".to_string(),
            Type::Array(element) => format!("{}[]", self.type_to_string(*element)),
            Type::Function { params, ret } => {
                let params: Vec<String> =
                    params.iter().map(|p| self.type_to_string(*p)).collect();
                format!("fn({}): {}", params.join(","), self.type_to_string(*ret))
            }
        }
    }

    /// Heap-typed values need out-of-band storage: arrays, strings, and
    /// function closures. Everything else is a value type.
    pub fn is_heap_type(&self, id: TypeId) -> bool {
        matches!(
            self.ty(id),
            Type::Array(_) | Type::Str | Type::Function { .. }
        )
    }

    pub fn is_numeric_type(&self, id: TypeId) -> bool {
        matches!(self.ty(id), Type::Int | Type::Double)
    }

    pub fn is_error_type(&self, id: TypeId) -> bool {
        matches!(self.ty(id), Type::Error)
    }

    pub fn is_void_type(&self, id: TypeId) -> bool {
        matches!(self.ty(id), Type::Void)
    }

    /// Element type of an array, if `id` is one.
    pub fn element_type(&self, id: TypeId) -> Option<TypeId> {
        match self.ty(id) {
            Type::Array(element) => Some(*element),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality_recurses() {
        let mut arena = AstArena::new();
        let a = arena.array_type(arena.int_type());
        let b = arena.array_type(arena.int_type());
        assert!(arena.type_equals(a, b));

        let f1 = arena.function_type(vec![arena.int_type(), arena.str_type()], arena.bool_type());
        let f2 = arena.function_type(vec![arena.int_type(), arena.str_type()], arena.bool_type());
        let f3 = arena.function_type(vec![arena.int_type()], arena.bool_type());
        assert!(arena.type_equals(f1, f2));
        assert!(!arena.type_equals(f1, f3));
    }

    #[test]
    fn error_type_is_unequal_to_itself() {
        let arena = AstArena::new();
        assert!(!arena.type_equals(arena.error_type(), arena.error_type()));
    }

    #[test]
    fn clone_round_trips_equality() {
        let mut arena = AstArena::new();
        let ints = arena.array_type(arena.int_type());
        let f = arena.function_type(vec![ints, arena.double_type()], ints);
        let clone = arena.clone_type(f);
        assert!(arena.type_equals(f, clone));
    }

    #[test]
    fn canonical_rendering() {
        let mut arena = AstArena::new();
        assert_eq!(arena.type_to_string(arena.int_type()), "int");
        let doubles = arena.array_type(arena.double_type());
        assert_eq!(arena.type_to_string(doubles), "double[]");
        let f = arena.function_type(vec![arena.int_type(), arena.str_type()], arena.bool_type());
        assert_eq!(arena.type_to_string(f), "fn(int,str): bool");
    }

    #[test]
    fn heap_classification() {
        let mut arena = AstArena::new();
        assert!(arena.is_heap_type(arena.str_type()));
        let ints = arena.array_type(arena.int_type());
        assert!(arena.is_heap_type(ints));
        assert!(!arena.is_heap_type(arena.int_type()));
        assert!(!arena.is_heap_type(arena.bool_type()));
    }
}

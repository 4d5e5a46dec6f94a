//! Runtime ABI surface.
//!
//! Every `rt_*` symbol the generated file calls is registered here on
//! first use; the extern block is printed in first-use order, so the
//! header only declares what the program actually needs.

use indexmap::IndexSet;
use sn_ast::{AstArena, Type, TypeId};

/// Collects extern declarations in first-use order.
#[derive(Debug, Default)]
pub struct RuntimeRegistry {
    declarations: IndexSet<String>,
}

impl RuntimeRegistry {
    pub fn new() -> Self {
        Self {
            declarations: IndexSet::new(),
        }
    }

    /// Record a symbol's declaration; repeated uses are deduplicated.
    pub fn declare(&mut self, declaration: String) {
        self.declarations.insert(declaration);
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for declaration in &self.declarations {
            out.push_str(declaration);
            out.push('\n');
        }
        out
    }
}

/// The `rt_*` name suffix for a type: `long`, `double`, `char`, `bool`,
/// `string`, `array` (nested arrays), `closure`.
pub fn rt_suffix(arena: &AstArena, ty: TypeId) -> &'static str {
    match arena.ty(ty) {
        Type::Int => "long",
        Type::Double => "double",
        Type::Char => "char",
        Type::Bool => "bool",
        Type::Str => "string",
        Type::Array(_) => "array",
        Type::Function { .. } => "closure",
        Type::Void | Type::Error => "void",
    }
}

/// The C type a Sindarin type lowers to.
pub fn c_type(arena: &AstArena, ty: TypeId) -> &'static str {
    match arena.ty(ty) {
        Type::Int => "long",
        Type::Double => "double",
        Type::Char => "char",
        Type::Bool => "int",
        Type::Str => "char *",
        Type::Array(_) => "RtArray *",
        Type::Function { .. } => "RtClosure",
        Type::Void => "void",
        Type::Error => "void",
    }
}

/// Zero value for a C local of the given type.
pub fn c_zero(arena: &AstArena, ty: TypeId) -> &'static str {
    match arena.ty(ty) {
        Type::Int => "0",
        Type::Double => "0.0",
        Type::Char => "'\\0'",
        Type::Bool => "0",
        Type::Str => "NULL",
        Type::Array(_) => "NULL",
        Type::Function { .. } => "{0}",
        Type::Void | Type::Error => "0",
    }
}

/// Fixed text at the top of every generated translation unit.
pub const PRELUDE: &str = "\
#include <stddef.h>

typedef struct RtArena RtArena;
typedef struct RtArray RtArray;
typedef struct {
    void *fn;
    void *env;
} RtClosure;

#define RT_SLICE_NONE (-9223372036854775807L - 1)
";

//! Built-in members - the closed method/property sets on arrays and
//! strings, with fixed signatures.

use sn_ast::{AstArena, Type, TypeId};

pub struct MethodSig {
    pub params: Vec<TypeId>,
    pub ret: TypeId,
}

/// Signature of `receiver.name(...)`, or `None` if no such method exists.
pub fn member_method(arena: &mut AstArena, receiver: TypeId, name: &str) -> Option<MethodSig> {
    match *arena.ty(receiver) {
        Type::Array(element) => array_method(arena, receiver, element, name),
        Type::Str => string_method(arena, name),
        _ => None,
    }
}

/// Type of the non-callable property `receiver.name`, or `None`.
pub fn member_property(arena: &AstArena, receiver: TypeId, name: &str) -> Option<TypeId> {
    match (arena.ty(receiver), name) {
        (Type::Array(_) | Type::Str, "length") => Some(arena.int_type()),
        _ => None,
    }
}

fn array_method(
    arena: &mut AstArena,
    receiver: TypeId,
    element: TypeId,
    name: &str,
) -> Option<MethodSig> {
    let int = arena.int_type();
    let sig = match name {
        "push" => MethodSig {
            params: vec![element],
            ret: arena.void_type(),
        },
        "pop" => MethodSig {
            params: vec![],
            ret: element,
        },
        "insert" => MethodSig {
            params: vec![int, element],
            ret: arena.void_type(),
        },
        "remove" => MethodSig {
            params: vec![int],
            ret: element,
        },
        "reverse" => MethodSig {
            params: vec![],
            ret: arena.void_type(),
        },
        "clone" => MethodSig {
            params: vec![],
            ret: receiver,
        },
        "concat" => MethodSig {
            params: vec![receiver],
            ret: receiver,
        },
        "indexOf" => MethodSig {
            params: vec![element],
            ret: int,
        },
        "contains" => MethodSig {
            params: vec![element],
            ret: arena.bool_type(),
        },
        "join" => MethodSig {
            params: vec![arena.str_type()],
            ret: arena.str_type(),
        },
        "clear" => MethodSig {
            params: vec![],
            ret: arena.void_type(),
        },
        _ => return None,
    };
    Some(sig)
}

fn string_method(arena: &mut AstArena, name: &str) -> Option<MethodSig> {
    let s = arena.str_type();
    let int = arena.int_type();
    let b = arena.bool_type();
    let sig = match name {
        "toUpper" | "toLower" | "trim" => MethodSig {
            params: vec![],
            ret: s,
        },
        "substring" => MethodSig {
            params: vec![int, int],
            ret: s,
        },
        "indexOf" => MethodSig {
            params: vec![s],
            ret: int,
        },
        "startsWith" | "endsWith" | "contains" => MethodSig {
            params: vec![s],
            ret: b,
        },
        "replace" => MethodSig {
            params: vec![s, s],
            ret: s,
        },
        "split" => MethodSig {
            params: vec![s],
            ret: arena.array_type(s),
        },
        "charAt" => MethodSig {
            params: vec![int],
            ret: arena.char_type(),
        },
        _ => return None,
    };
    Some(sig)
}

//! Expression nodes and their constructors.
//!
//! Constructors live on `AstArena`: they take child ids already allocated
//! in the same arena plus the location token, copy any identifier lexeme
//! into owned storage, and leave `ty` unset for the checker to fill.

use sn_lexer::{Token, TokenKind};

use crate::arena::{AstArena, ExprId, StmtId, TypeId};

/// Copy/reference discipline attached to a declaration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MemQualifier {
    #[default]
    Default,
    /// `as val` - deep copy on entry/assignment. Heap types only.
    AsVal,
    /// `as ref` - explicit reference binding. Value-typed variables only.
    AsRef,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FunctionModifier {
    #[default]
    Default,
    /// Return values are allocated from the caller's arena.
    Shared,
    /// The activation arena dies on return; heap returns are rejected.
    Private,
}

#[derive(Clone, Debug)]
pub struct Parameter {
    pub name: String,
    pub line: u32,
    pub ty: TypeId,
    pub qualifier: MemQualifier,
}

/// A free variable a lambda closes over, recorded by the checker.
#[derive(Clone, Debug)]
pub struct Capture {
    pub name: String,
    pub ty: TypeId,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LiteralValue {
    Int(i64),
    Double(f64),
    /// Raw body of the char literal; escape sequences pass through to C.
    Char(String),
    /// Raw body of the string literal, likewise unprocessed.
    Str(String),
    Bool(bool),
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Binary {
        left: ExprId,
        op: TokenKind,
        right: ExprId,
    },
    Unary {
        op: TokenKind,
        operand: ExprId,
    },
    Literal {
        value: LiteralValue,
        /// The literal's own type; `ty` on the node matches after checking.
        ty: TypeId,
    },
    Variable {
        name: String,
    },
    Assign {
        name: String,
        value: ExprId,
    },
    Call {
        callee: ExprId,
        args: Vec<ExprId>,
    },
    Array {
        elements: Vec<ExprId>,
    },
    ArrayAccess {
        array: ExprId,
        index: ExprId,
    },
    ArraySlice {
        array: ExprId,
        start: Option<ExprId>,
        end: Option<ExprId>,
        step: Option<ExprId>,
    },
    Range {
        start: ExprId,
        end: ExprId,
    },
    Spread {
        array: ExprId,
    },
    Increment {
        operand: ExprId,
    },
    Decrement {
        operand: ExprId,
    },
    Interpolated {
        parts: Vec<ExprId>,
    },
    Member {
        object: ExprId,
        name: String,
    },
    Lambda {
        params: Vec<Parameter>,
        ret: TypeId,
        body: Vec<StmtId>,
        modifier: FunctionModifier,
        captures: Vec<Capture>,
        lambda_id: u32,
    },
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: u32,
    /// Filled by the type checker; `None` before checking.
    pub ty: Option<TypeId>,
}

impl AstArena {
    fn new_expr(&mut self, kind: ExprKind, token: &Token<'_>) -> ExprId {
        self.push_expr(Expr {
            kind,
            line: token.line,
            ty: None,
        })
    }

    pub fn new_binary(&mut self, left: ExprId, op: &Token<'_>, right: ExprId) -> ExprId {
        self.new_expr(
            ExprKind::Binary {
                left,
                op: op.kind,
                right,
            },
            op,
        )
    }

    pub fn new_unary(&mut self, op: &Token<'_>, operand: ExprId) -> ExprId {
        self.new_expr(
            ExprKind::Unary {
                op: op.kind,
                operand,
            },
            op,
        )
    }

    pub fn new_literal(&mut self, value: LiteralValue, token: &Token<'_>) -> ExprId {
        let ty = match value {
            LiteralValue::Int(_) => self.int_type(),
            LiteralValue::Double(_) => self.double_type(),
            LiteralValue::Char(_) => self.char_type(),
            LiteralValue::Str(_) => self.str_type(),
            LiteralValue::Bool(_) => self.bool_type(),
        };
        self.new_expr(ExprKind::Literal { value, ty }, token)
    }

    pub fn new_variable(&mut self, name: &Token<'_>) -> ExprId {
        self.new_expr(
            ExprKind::Variable {
                name: name.lexeme.to_owned(),
            },
            name,
        )
    }

    pub fn new_assign(&mut self, name: &Token<'_>, value: ExprId) -> ExprId {
        self.new_expr(
            ExprKind::Assign {
                name: name.lexeme.to_owned(),
                value,
            },
            name,
        )
    }

    pub fn new_call(&mut self, callee: ExprId, args: Vec<ExprId>, token: &Token<'_>) -> ExprId {
        self.new_expr(ExprKind::Call { callee, args }, token)
    }

    pub fn new_array(&mut self, elements: Vec<ExprId>, token: &Token<'_>) -> ExprId {
        self.new_expr(ExprKind::Array { elements }, token)
    }

    pub fn new_array_access(
        &mut self,
        array: ExprId,
        index: ExprId,
        token: &Token<'_>,
    ) -> ExprId {
        self.new_expr(ExprKind::ArrayAccess { array, index }, token)
    }

    pub fn new_array_slice(
        &mut self,
        array: ExprId,
        start: Option<ExprId>,
        end: Option<ExprId>,
        step: Option<ExprId>,
        token: &Token<'_>,
    ) -> ExprId {
        self.new_expr(
            ExprKind::ArraySlice {
                array,
                start,
                end,
                step,
            },
            token,
        )
    }

    pub fn new_range(&mut self, start: ExprId, end: ExprId, token: &Token<'_>) -> ExprId {
        self.new_expr(ExprKind::Range { start, end }, token)
    }

    pub fn new_spread(&mut self, array: ExprId, token: &Token<'_>) -> ExprId {
        self.new_expr(ExprKind::Spread { array }, token)
    }

    pub fn new_increment(&mut self, operand: ExprId, token: &Token<'_>) -> ExprId {
        self.new_expr(ExprKind::Increment { operand }, token)
    }

    pub fn new_decrement(&mut self, operand: ExprId, token: &Token<'_>) -> ExprId {
        self.new_expr(ExprKind::Decrement { operand }, token)
    }

    pub fn new_interpolated(&mut self, parts: Vec<ExprId>, token: &Token<'_>) -> ExprId {
        self.new_expr(ExprKind::Interpolated { parts }, token)
    }

    pub fn new_member(&mut self, object: ExprId, name: &Token<'_>) -> ExprId {
        self.new_expr(
            ExprKind::Member {
                object,
                name: name.lexeme.to_owned(),
            },
            name,
        )
    }

    /// Lambda ids are handed out sequentially per module; the emitter names
    /// the lifted C function `__lambda_<id>__`.
    pub fn new_lambda(
        &mut self,
        params: Vec<Parameter>,
        ret: TypeId,
        body: Vec<StmtId>,
        modifier: FunctionModifier,
        token: &Token<'_>,
    ) -> ExprId {
        let lambda_id = self.next_lambda_id();
        self.new_expr(
            ExprKind::Lambda {
                params,
                ret,
                body,
                modifier,
                captures: Vec::new(),
                lambda_id,
            },
            token,
        )
    }
}

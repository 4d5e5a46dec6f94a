//! Statement nodes and their constructors.

use sn_lexer::Token;

use crate::arena::{AstArena, ExprId, StmtId, TypeId};
use crate::expr::{FunctionModifier, MemQualifier, Parameter};

#[derive(Clone, Debug)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Parameter>,
    pub ret: TypeId,
    pub body: Vec<StmtId>,
    pub modifier: FunctionModifier,
}

#[derive(Clone, Debug)]
pub enum StmtKind {
    Expression {
        expr: ExprId,
    },
    VarDecl {
        name: String,
        ty: TypeId,
        initializer: Option<ExprId>,
        qualifier: MemQualifier,
    },
    Function(FunctionDecl),
    Return {
        value: Option<ExprId>,
    },
    Block {
        statements: Vec<StmtId>,
    },
    If {
        condition: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    While {
        condition: ExprId,
        body: StmtId,
    },
    For {
        initializer: Option<StmtId>,
        condition: Option<ExprId>,
        increment: Option<ExprId>,
        body: StmtId,
    },
    ForEach {
        var_name: String,
        iterable: ExprId,
        body: StmtId,
    },
    Import {
        module: String,
    },
    Break,
    Continue,
}

#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: u32,
}

impl AstArena {
    fn new_stmt(&mut self, kind: StmtKind, token: &Token<'_>) -> StmtId {
        self.push_stmt(Stmt {
            kind,
            line: token.line,
        })
    }

    pub fn new_expression_stmt(&mut self, expr: ExprId, token: &Token<'_>) -> StmtId {
        self.new_stmt(StmtKind::Expression { expr }, token)
    }

    pub fn new_var_decl(
        &mut self,
        name: &Token<'_>,
        ty: TypeId,
        initializer: Option<ExprId>,
        qualifier: MemQualifier,
    ) -> StmtId {
        self.new_stmt(
            StmtKind::VarDecl {
                name: name.lexeme.to_owned(),
                ty,
                initializer,
                qualifier,
            },
            name,
        )
    }

    pub fn new_function(
        &mut self,
        name: &Token<'_>,
        params: Vec<Parameter>,
        ret: TypeId,
        body: Vec<StmtId>,
        modifier: FunctionModifier,
    ) -> StmtId {
        self.new_stmt(
            StmtKind::Function(FunctionDecl {
                name: name.lexeme.to_owned(),
                params,
                ret,
                body,
                modifier,
            }),
            name,
        )
    }

    pub fn new_return(&mut self, value: Option<ExprId>, token: &Token<'_>) -> StmtId {
        self.new_stmt(StmtKind::Return { value }, token)
    }

    pub fn new_block(&mut self, statements: Vec<StmtId>, token: &Token<'_>) -> StmtId {
        self.new_stmt(StmtKind::Block { statements }, token)
    }

    pub fn new_if(
        &mut self,
        condition: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
        token: &Token<'_>,
    ) -> StmtId {
        self.new_stmt(
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
            token,
        )
    }

    pub fn new_while(&mut self, condition: ExprId, body: StmtId, token: &Token<'_>) -> StmtId {
        self.new_stmt(StmtKind::While { condition, body }, token)
    }

    pub fn new_for(
        &mut self,
        initializer: Option<StmtId>,
        condition: Option<ExprId>,
        increment: Option<ExprId>,
        body: StmtId,
        token: &Token<'_>,
    ) -> StmtId {
        self.new_stmt(
            StmtKind::For {
                initializer,
                condition,
                increment,
                body,
            },
            token,
        )
    }

    pub fn new_for_each(
        &mut self,
        var_name: &Token<'_>,
        iterable: ExprId,
        body: StmtId,
        token: &Token<'_>,
    ) -> StmtId {
        self.new_stmt(
            StmtKind::ForEach {
                var_name: var_name.lexeme.to_owned(),
                iterable,
                body,
            },
            token,
        )
    }

    pub fn new_import(&mut self, module: &Token<'_>, token: &Token<'_>) -> StmtId {
        self.new_stmt(
            StmtKind::Import {
                module: module.lexeme.to_owned(),
            },
            token,
        )
    }

    pub fn new_break(&mut self, token: &Token<'_>) -> StmtId {
        self.new_stmt(StmtKind::Break, token)
    }

    pub fn new_continue(&mut self, token: &Token<'_>) -> StmtId {
        self.new_stmt(StmtKind::Continue, token)
    }
}

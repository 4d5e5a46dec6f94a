//! Statement-level grammar.

use sn_ast::{FunctionModifier, MemQualifier, Parameter, StmtId};
use sn_lexer::TokenKind;
use smallvec::SmallVec;

use crate::ParserState;

impl<'src> ParserState<'src> {
    pub(crate) fn parse_statement(&mut self) -> Option<StmtId> {
        match self.peek_kind() {
            TokenKind::Import => self.parse_import(),
            TokenKind::Shared => {
                self.advance();
                self.parse_function(FunctionModifier::Shared)
            }
            TokenKind::Private => {
                self.advance();
                self.parse_function(FunctionModifier::Private)
            }
            // `fn name(...)` declares; `fn (...)` is a lambda expression.
            TokenKind::Fn if self.peek_at(1) == TokenKind::Identifier => {
                self.parse_function(FunctionModifier::Default)
            }
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Break => {
                let token = self.advance();
                let stmt = self.module.arena.new_break(&token);
                self.expect_terminator();
                Some(stmt)
            }
            TokenKind::Continue => {
                let token = self.advance();
                let stmt = self.module.arena.new_continue(&token);
                self.expect_terminator();
                Some(stmt)
            }
            TokenKind::LeftBrace => self.parse_block(),
            TokenKind::Identifier if self.peek_at(1) == TokenKind::Colon => {
                self.parse_var_decl()
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_import(&mut self) -> Option<StmtId> {
        let keyword = self.advance();
        let name = self.expect(TokenKind::Identifier, "after 'import'")?;
        self.module.imports.push(name.lexeme.to_owned());
        let stmt = self.module.arena.new_import(&name, &keyword);
        self.expect_terminator();
        Some(stmt)
    }

    fn parse_function(&mut self, modifier: FunctionModifier) -> Option<StmtId> {
        self.expect(TokenKind::Fn, "to start a function declaration")?;
        let name = self.expect(TokenKind::Identifier, "as the function name")?;
        self.expect(TokenKind::LeftParen, "after the function name")?;
        let params = self.parse_parameters()?;
        let ret = if self.matches(TokenKind::Colon).is_some() {
            self.parse_type()?
        } else {
            self.module.arena.void_type()
        };
        self.expect(TokenKind::FatArrow, "before the function body")?;
        let body = self.parse_brace_statements()?;
        Some(
            self.module
                .arena
                .new_function(&name, params, ret, body, modifier),
        )
    }

    /// Parameter list up to and including the closing paren.
    pub(crate) fn parse_parameters(&mut self) -> Option<Vec<Parameter>> {
        let mut params: SmallVec<[Parameter; 4]> = SmallVec::new();
        if self.matches(TokenKind::RightParen).is_some() {
            return Some(params.into_vec());
        }
        loop {
            let name = self.expect(TokenKind::Identifier, "as a parameter name")?;
            self.expect(TokenKind::Colon, "after the parameter name")?;
            let ty = self.parse_type()?;
            let qualifier = self.parse_qualifier()?;
            params.push(Parameter {
                name: name.lexeme.to_owned(),
                line: name.line,
                ty,
                qualifier,
            });
            if self.matches(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RightParen, "after the parameter list")?;
        Some(params.into_vec())
    }

    /// Optional `as val` / `as ref` suffix. The parser accepts either on
    /// any declaration; legality per type and position is the checker's
    /// call.
    fn parse_qualifier(&mut self) -> Option<MemQualifier> {
        if self.matches(TokenKind::As).is_none() {
            return Some(MemQualifier::Default);
        }
        match self.peek_kind() {
            TokenKind::Val => {
                self.advance();
                Some(MemQualifier::AsVal)
            }
            TokenKind::Ref => {
                self.advance();
                Some(MemQualifier::AsRef)
            }
            other => {
                let line = self.peek().line;
                self.error(line, format!("expected 'val' or 'ref' after 'as', found {other}"));
                None
            }
        }
    }

    fn parse_return(&mut self) -> Option<StmtId> {
        let keyword = self.advance();
        let value = match self.peek_kind() {
            TokenKind::Newline
            | TokenKind::Semicolon
            | TokenKind::RightBrace
            | TokenKind::Eof => None,
            _ => Some(self.parse_expression()?),
        };
        let stmt = self.module.arena.new_return(value, &keyword);
        self.expect_terminator();
        Some(stmt)
    }

    fn parse_if(&mut self) -> Option<StmtId> {
        let keyword = self.advance();
        let condition = self.parse_expression()?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.matches(TokenKind::Else).is_some() {
            if self.check(TokenKind::If) {
                Some(self.parse_if()?)
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Some(
            self.module
                .arena
                .new_if(condition, then_branch, else_branch, &keyword),
        )
    }

    fn parse_while(&mut self) -> Option<StmtId> {
        let keyword = self.advance();
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        Some(self.module.arena.new_while(condition, body, &keyword))
    }

    fn parse_for(&mut self) -> Option<StmtId> {
        let keyword = self.advance();
        // `for x in iterable { ... }`
        if self.check(TokenKind::Identifier) && self.peek_at(1) == TokenKind::In {
            let var_name = self.advance();
            self.advance();
            let iterable = self.parse_expression()?;
            let body = self.parse_block()?;
            return Some(
                self.module
                    .arena
                    .new_for_each(&var_name, iterable, body, &keyword),
            );
        }
        // C-style header: `for init; cond; incr { ... }`, all parts optional.
        let initializer = if self.check(TokenKind::Semicolon) {
            None
        } else if self.check(TokenKind::Identifier) && self.peek_at(1) == TokenKind::Colon {
            Some(self.parse_var_decl_unterminated()?)
        } else {
            let token = self.peek();
            let expr = self.parse_expression()?;
            Some(self.module.arena.new_expression_stmt(expr, &token))
        };
        self.expect(TokenKind::Semicolon, "after the for initializer")?;
        let condition = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon, "after the for condition")?;
        let increment = if self.check(TokenKind::LeftBrace) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let body = self.parse_block()?;
        Some(
            self.module
                .arena
                .new_for(initializer, condition, increment, body, &keyword),
        )
    }

    fn parse_var_decl(&mut self) -> Option<StmtId> {
        let stmt = self.parse_var_decl_unterminated()?;
        self.expect_terminator();
        Some(stmt)
    }

    fn parse_var_decl_unterminated(&mut self) -> Option<StmtId> {
        let name = self.advance();
        self.expect(TokenKind::Colon, "after the variable name")?;
        let ty = self.parse_type()?;
        let qualifier = self.parse_qualifier()?;
        let initializer = if self.matches(TokenKind::Equals).is_some() {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Some(
            self.module
                .arena
                .new_var_decl(&name, ty, initializer, qualifier),
        )
    }

    /// `{ ... }` as a block statement node.
    pub(crate) fn parse_block(&mut self) -> Option<StmtId> {
        let open = self.peek();
        let statements = self.parse_brace_statements()?;
        Some(self.module.arena.new_block(statements, &open))
    }

    /// The statements between `{` and `}`, for blocks and function bodies.
    pub(crate) fn parse_brace_statements(&mut self) -> Option<Vec<StmtId>> {
        self.expect(TokenKind::LeftBrace, "to open a block")?;
        let mut statements = Vec::new();
        self.skip_terminators();
        while !self.check(TokenKind::RightBrace) && !self.at_end() {
            match self.parse_statement() {
                Some(stmt) => statements.push(stmt),
                None => self.synchronize(),
            }
            self.skip_terminators();
        }
        self.expect(TokenKind::RightBrace, "to close the block")?;
        Some(statements)
    }

    fn parse_expression_statement(&mut self) -> Option<StmtId> {
        let token = self.peek();
        let expr = self.parse_expression()?;
        let stmt = self.module.arena.new_expression_stmt(expr, &token);
        self.expect_terminator();
        Some(stmt)
    }
}

//! Expression-level grammar, precedence climbing, and type syntax.

use sn_ast::{ExprId, FunctionModifier, LiteralValue, TypeId};
use sn_lexer::{Lexer, Token, TokenKind};

use crate::ParserState;

impl<'src> ParserState<'src> {
    pub(crate) fn parse_expression(&mut self) -> Option<ExprId> {
        // Deeply nested sources are legal up to the documented depth; grow
        // the stack rather than overflow it.
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || self.parse_assignment())
    }

    fn parse_assignment(&mut self) -> Option<ExprId> {
        if self.check(TokenKind::Identifier) && self.peek_at(1) == TokenKind::Equals {
            let name = self.advance();
            self.advance();
            let value = self.parse_assignment()?;
            return Some(self.module.arena.new_assign(&name, value));
        }
        self.parse_or()
    }

    fn parse_or(&mut self) -> Option<ExprId> {
        let mut left = self.parse_and()?;
        while let Some(op) = self.matches(TokenKind::PipePipe) {
            let right = self.parse_and()?;
            left = self.module.arena.new_binary(left, &op, right);
        }
        Some(left)
    }

    fn parse_and(&mut self) -> Option<ExprId> {
        let mut left = self.parse_equality()?;
        while let Some(op) = self.matches(TokenKind::AmpAmp) {
            let right = self.parse_equality()?;
            left = self.module.arena.new_binary(left, &op, right);
        }
        Some(left)
    }

    fn parse_equality(&mut self) -> Option<ExprId> {
        let mut left = self.parse_comparison()?;
        while matches!(
            self.peek_kind(),
            TokenKind::EqualsEquals | TokenKind::BangEquals
        ) {
            let op = self.advance();
            let right = self.parse_comparison()?;
            left = self.module.arena.new_binary(left, &op, right);
        }
        Some(left)
    }

    fn parse_comparison(&mut self) -> Option<ExprId> {
        let mut left = self.parse_range()?;
        while matches!(
            self.peek_kind(),
            TokenKind::Less
                | TokenKind::LessEquals
                | TokenKind::Greater
                | TokenKind::GreaterEquals
        ) {
            let op = self.advance();
            let right = self.parse_range()?;
            left = self.module.arena.new_binary(left, &op, right);
        }
        Some(left)
    }

    fn parse_range(&mut self) -> Option<ExprId> {
        let left = self.parse_additive()?;
        if let Some(op) = self.matches(TokenKind::DotDot) {
            let right = self.parse_additive()?;
            return Some(self.module.arena.new_range(left, right, &op));
        }
        Some(left)
    }

    fn parse_additive(&mut self) -> Option<ExprId> {
        let mut left = self.parse_multiplicative()?;
        while matches!(self.peek_kind(), TokenKind::Plus | TokenKind::Minus) {
            let op = self.advance();
            let right = self.parse_multiplicative()?;
            left = self.module.arena.new_binary(left, &op, right);
        }
        Some(left)
    }

    fn parse_multiplicative(&mut self) -> Option<ExprId> {
        let mut left = self.parse_unary()?;
        while matches!(
            self.peek_kind(),
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent
        ) {
            let op = self.advance();
            let right = self.parse_unary()?;
            left = self.module.arena.new_binary(left, &op, right);
        }
        Some(left)
    }

    fn parse_unary(&mut self) -> Option<ExprId> {
        if matches!(self.peek_kind(), TokenKind::Bang | TokenKind::Minus) {
            let op = self.advance();
            let operand = self.parse_unary()?;
            return Some(self.module.arena.new_unary(&op, operand));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Option<ExprId> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::LeftParen => {
                    let open = self.advance();
                    let args = self.parse_element_list(TokenKind::RightParen)?;
                    expr = self.module.arena.new_call(expr, args, &open);
                }
                TokenKind::LeftBracket => {
                    expr = self.parse_index_suffix(expr)?;
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect(TokenKind::Identifier, "after '.'")?;
                    expr = self.module.arena.new_member(expr, &name);
                }
                TokenKind::PlusPlus => {
                    let op = self.advance();
                    expr = self.module.arena.new_increment(expr, &op);
                }
                TokenKind::MinusMinus => {
                    let op = self.advance();
                    expr = self.module.arena.new_decrement(expr, &op);
                }
                _ => return Some(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> Option<ExprId> {
        let token = self.peek();
        match token.kind {
            TokenKind::IntLiteral => {
                self.advance();
                match token.lexeme.parse::<i64>() {
                    Ok(value) => Some(self.module.arena.new_literal(LiteralValue::Int(value), &token)),
                    Err(_) => {
                        self.error(token.line, format!("integer literal '{}' out of range", token.lexeme));
                        None
                    }
                }
            }
            TokenKind::DoubleLiteral => {
                self.advance();
                match token.lexeme.parse::<f64>() {
                    Ok(value) => {
                        Some(self.module.arena.new_literal(LiteralValue::Double(value), &token))
                    }
                    Err(_) => {
                        self.error(token.line, format!("malformed double literal '{}'", token.lexeme));
                        None
                    }
                }
            }
            TokenKind::CharLiteral => {
                self.advance();
                Some(
                    self.module
                        .arena
                        .new_literal(LiteralValue::Char(token.lexeme.to_owned()), &token),
                )
            }
            TokenKind::StrLiteral => {
                self.advance();
                Some(
                    self.module
                        .arena
                        .new_literal(LiteralValue::Str(token.lexeme.to_owned()), &token),
                )
            }
            TokenKind::InterpolatedLiteral => {
                self.advance();
                self.parse_interpolated(token)
            }
            TokenKind::True => {
                self.advance();
                Some(self.module.arena.new_literal(LiteralValue::Bool(true), &token))
            }
            TokenKind::False => {
                self.advance();
                Some(self.module.arena.new_literal(LiteralValue::Bool(false), &token))
            }
            TokenKind::Identifier => {
                self.advance();
                Some(self.module.arena.new_variable(&token))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RightParen, "to close the grouping")?;
                Some(expr)
            }
            TokenKind::LeftBrace => {
                let open = self.advance();
                let elements = self.parse_element_list(TokenKind::RightBrace)?;
                Some(self.module.arena.new_array(elements, &open))
            }
            TokenKind::Fn => self.parse_lambda(),
            other => {
                self.error(token.line, format!("expected an expression, found {other}"));
                None
            }
        }
    }

    /// Comma-separated expressions (with spread elements) up to and
    /// including `close`. Newlines are permitted after the opener and
    /// after commas so literals can span lines.
    fn parse_element_list(&mut self, close: TokenKind) -> Option<Vec<ExprId>> {
        let mut elements = Vec::new();
        self.skip_newlines_only();
        if self.matches(close).is_some() {
            return Some(elements);
        }
        loop {
            let element = if let Some(ellipsis) = self.matches(TokenKind::Ellipsis) {
                let array = self.parse_expression()?;
                self.module.arena.new_spread(array, &ellipsis)
            } else {
                self.parse_expression()?
            };
            elements.push(element);
            if self.matches(TokenKind::Comma).is_none() {
                break;
            }
            self.skip_newlines_only();
        }
        self.skip_newlines_only();
        self.expect(close, "to close the list")?;
        Some(elements)
    }

    fn skip_newlines_only(&mut self) {
        while self.check(TokenKind::Newline) {
            self.advance();
        }
    }

    /// `[index]`, or a slice `[start:end:step]` with every bound optional.
    fn parse_index_suffix(&mut self, array: ExprId) -> Option<ExprId> {
        let open = self.advance();
        if self.matches(TokenKind::Colon).is_some() {
            return self.parse_slice_rest(array, None, &open);
        }
        let first = self.parse_expression()?;
        if self.matches(TokenKind::Colon).is_some() {
            return self.parse_slice_rest(array, Some(first), &open);
        }
        self.expect(TokenKind::RightBracket, "to close the index")?;
        Some(self.module.arena.new_array_access(array, first, &open))
    }

    /// After the first ':' of a slice.
    fn parse_slice_rest(
        &mut self,
        array: ExprId,
        start: Option<ExprId>,
        open: &Token<'src>,
    ) -> Option<ExprId> {
        let end = if matches!(self.peek_kind(), TokenKind::Colon | TokenKind::RightBracket) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let step = if self.matches(TokenKind::Colon).is_some() {
            if self.check(TokenKind::RightBracket) {
                None
            } else {
                Some(self.parse_expression()?)
            }
        } else {
            None
        };
        self.expect(TokenKind::RightBracket, "to close the slice")?;
        Some(
            self.module
                .arena
                .new_array_slice(array, start, end, step, open),
        )
    }

    fn parse_lambda(&mut self) -> Option<ExprId> {
        let keyword = self.advance();
        self.expect(TokenKind::LeftParen, "after 'fn'")?;
        let params = self.parse_parameters()?;
        let ret = if self.matches(TokenKind::Colon).is_some() {
            self.parse_type()?
        } else {
            self.module.arena.void_type()
        };
        self.expect(TokenKind::FatArrow, "before the lambda body")?;
        let body = self.parse_brace_statements()?;
        Some(self.module.arena.new_lambda(
            params,
            ret,
            body,
            FunctionModifier::Default,
            &keyword,
        ))
    }

    /// Split an interpolated literal body into string and `{expr}` parts.
    fn parse_interpolated(&mut self, token: Token<'src>) -> Option<ExprId> {
        let body = token.lexeme;
        let bytes = body.as_bytes();
        let mut parts = Vec::new();
        let mut i = 0usize;
        let mut segment_start = 0usize;
        while i < bytes.len() {
            if bytes[i] != b'{' {
                i += 1;
                continue;
            }
            if i > segment_start {
                let segment = Token::new(TokenKind::StrLiteral, &body[segment_start..i], token.line);
                parts.push(
                    self.module
                        .arena
                        .new_literal(LiteralValue::Str(segment.lexeme.to_owned()), &segment),
                );
            }
            let expr_start = i + 1;
            let mut depth = 1usize;
            i += 1;
            while i < bytes.len() && depth > 0 {
                match bytes[i] {
                    b'{' => depth += 1,
                    b'}' => depth -= 1,
                    b'"' => {
                        // Skip a nested string literal.
                        i += 1;
                        while i < bytes.len() && bytes[i] != b'"' {
                            if bytes[i] == b'\\' {
                                i += 1;
                            }
                            i += 1;
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
            if depth > 0 {
                self.error(token.line, "unbalanced '{' in interpolated string");
                return None;
            }
            let expr_source = &body[expr_start..i - 1];
            parts.push(self.parse_embedded_expression(expr_source, token.line)?);
            segment_start = i;
        }
        if segment_start < bytes.len() {
            let segment = Token::new(TokenKind::StrLiteral, &body[segment_start..], token.line);
            parts.push(
                self.module
                    .arena
                    .new_literal(LiteralValue::Str(segment.lexeme.to_owned()), &segment),
            );
        }
        Some(self.module.arena.new_interpolated(parts, &token))
    }

    /// Parse one expression lifted out of an interpolated string. The
    /// token cursor is swapped out and restored around the sub-parse.
    fn parse_embedded_expression(&mut self, source: &'src str, line: u32) -> Option<ExprId> {
        let (tokens, lex_diagnostics) = Lexer::new(self.file.clone(), source).tokenize();
        let had_lex_errors = !lex_diagnostics.is_empty();
        for diagnostic in lex_diagnostics {
            self.diagnostics.push(diagnostic);
        }
        if had_lex_errors {
            return None;
        }
        let saved_tokens = std::mem::replace(&mut self.tokens, tokens);
        let saved_pos = std::mem::replace(&mut self.pos, 0);
        let expr = self.parse_expression();
        let fully_consumed = self.at_end();
        self.tokens = saved_tokens;
        self.pos = saved_pos;
        let expr = expr?;
        if !fully_consumed {
            self.error(line, "trailing input after interpolated expression");
            return None;
        }
        Some(expr)
    }

    // ------------------------------------------------------------------
    // Type syntax
    // ------------------------------------------------------------------

    /// `int`, `double[]`, `fn(int,str): bool`, nested arrays via repeated
    /// `[]` suffixes.
    pub(crate) fn parse_type(&mut self) -> Option<TypeId> {
        let token = self.peek();
        let mut ty = match token.kind {
            TokenKind::KwInt => {
                self.advance();
                self.module.arena.int_type()
            }
            TokenKind::KwDouble => {
                self.advance();
                self.module.arena.double_type()
            }
            TokenKind::KwChar => {
                self.advance();
                self.module.arena.char_type()
            }
            TokenKind::KwStr => {
                self.advance();
                self.module.arena.str_type()
            }
            TokenKind::KwBool => {
                self.advance();
                self.module.arena.bool_type()
            }
            TokenKind::KwVoid => {
                self.advance();
                self.module.arena.void_type()
            }
            TokenKind::Fn => {
                self.advance();
                self.expect(TokenKind::LeftParen, "in a function type")?;
                let mut params = Vec::new();
                if !self.check(TokenKind::RightParen) {
                    loop {
                        params.push(self.parse_type()?);
                        if self.matches(TokenKind::Comma).is_none() {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RightParen, "in a function type")?;
                self.expect(TokenKind::Colon, "before the function return type")?;
                let ret = self.parse_type()?;
                self.module.arena.function_type(params, ret)
            }
            other => {
                self.error(token.line, format!("expected a type, found {other}"));
                return None;
            }
        };
        while self.check(TokenKind::LeftBracket) && self.peek_at(1) == TokenKind::RightBracket {
            self.advance();
            self.advance();
            ty = self.module.arena.array_type(ty);
        }
        Some(ty)
    }
}

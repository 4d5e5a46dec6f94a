//! AST printer - diagnostic-only indented tree dump.
//!
//! Resilient to partial trees: absent optional children render as
//! `<none>`. Every expression and statement variant has a branch.

use crate::arena::{AstArena, ExprId, StmtId};
use crate::expr::{ExprKind, LiteralValue};
use crate::module::Module;
use crate::stmt::StmtKind;

pub struct AstPrinter<'a> {
    arena: &'a AstArena,
    out: String,
    indent: usize,
}

/// Render a whole module as an indented tree.
pub fn print_module(module: &Module) -> String {
    let mut printer = AstPrinter {
        arena: &module.arena,
        out: String::new(),
        indent: 0,
    };
    printer.line(&format!("module {}", module.filename));
    printer.indent += 1;
    for &stmt in &module.stmts {
        printer.print_stmt(stmt);
    }
    printer.out
}

impl<'a> AstPrinter<'a> {
    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn type_label(&self, id: ExprId) -> String {
        match self.arena.expr(id).ty {
            Some(ty) => self.arena.type_to_string(ty),
            None => "<unchecked>".to_string(),
        }
    }

    fn nested<F: FnOnce(&mut Self)>(&mut self, f: F) {
        self.indent += 1;
        f(self);
        self.indent -= 1;
    }

    fn print_opt_expr(&mut self, label: &str, expr: Option<ExprId>) {
        match expr {
            Some(expr) => {
                self.line(label);
                self.nested(|p| p.print_expr(expr));
            }
            None => self.line(&format!("{label} <none>")),
        }
    }

    pub fn print_stmt(&mut self, id: StmtId) {
        let stmt = self.arena.stmt(id);
        let line = stmt.line;
        match stmt.kind.clone() {
            StmtKind::Expression { expr } => {
                self.line(&format!("expression-stmt (line {line})"));
                self.nested(|p| p.print_expr(expr));
            }
            StmtKind::VarDecl {
                name,
                ty,
                initializer,
                qualifier,
            } => {
                self.line(&format!(
                    "var-decl {name}: {} {qualifier:?} (line {line})",
                    self.arena.type_to_string(ty)
                ));
                self.nested(|p| p.print_opt_expr("initializer", initializer));
            }
            StmtKind::Function(decl) => {
                let params: Vec<String> = decl
                    .params
                    .iter()
                    .map(|p| format!("{}: {}", p.name, self.arena.type_to_string(p.ty)))
                    .collect();
                self.line(&format!(
                    "function {} ({}) -> {} {:?} (line {line})",
                    decl.name,
                    params.join(", "),
                    self.arena.type_to_string(decl.ret),
                    decl.modifier,
                ));
                self.nested(|p| {
                    for stmt in decl.body {
                        p.print_stmt(stmt);
                    }
                });
            }
            StmtKind::Return { value } => {
                self.line(&format!("return (line {line})"));
                self.nested(|p| p.print_opt_expr("value", value));
            }
            StmtKind::Block { statements } => {
                self.line(&format!("block (line {line})"));
                self.nested(|p| {
                    for stmt in statements {
                        p.print_stmt(stmt);
                    }
                });
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.line(&format!("if (line {line})"));
                self.nested(|p| {
                    p.print_expr(condition);
                    p.print_stmt(then_branch);
                    match else_branch {
                        Some(else_branch) => p.print_stmt(else_branch),
                        None => p.line("else <none>"),
                    }
                });
            }
            StmtKind::While { condition, body } => {
                self.line(&format!("while (line {line})"));
                self.nested(|p| {
                    p.print_expr(condition);
                    p.print_stmt(body);
                });
            }
            StmtKind::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                self.line(&format!("for (line {line})"));
                self.nested(|p| {
                    match initializer {
                        Some(init) => p.print_stmt(init),
                        None => p.line("initializer <none>"),
                    }
                    p.print_opt_expr("condition", condition);
                    p.print_opt_expr("increment", increment);
                    p.print_stmt(body);
                });
            }
            StmtKind::ForEach {
                var_name,
                iterable,
                body,
            } => {
                self.line(&format!("for-each {var_name} (line {line})"));
                self.nested(|p| {
                    p.print_expr(iterable);
                    p.print_stmt(body);
                });
            }
            StmtKind::Import { module } => {
                self.line(&format!("import {module} (line {line})"));
            }
            StmtKind::Break => self.line(&format!("break (line {line})")),
            StmtKind::Continue => self.line(&format!("continue (line {line})")),
        }
    }

    pub fn print_expr(&mut self, id: ExprId) {
        let expr = self.arena.expr(id);
        let line = expr.line;
        let ty = self.type_label(id);
        match expr.kind.clone() {
            ExprKind::Binary { left, op, right } => {
                self.line(&format!("binary {op} : {ty} (line {line})"));
                self.nested(|p| {
                    p.print_expr(left);
                    p.print_expr(right);
                });
            }
            ExprKind::Unary { op, operand } => {
                self.line(&format!("unary {op} : {ty} (line {line})"));
                self.nested(|p| p.print_expr(operand));
            }
            ExprKind::Literal { value, .. } => {
                let rendered = match value {
                    LiteralValue::Int(v) => v.to_string(),
                    LiteralValue::Double(v) => v.to_string(),
                    LiteralValue::Char(v) => format!("'{v}'"),
                    LiteralValue::Str(v) => format!("\"{v}\""),
                    LiteralValue::Bool(v) => v.to_string(),
                };
                self.line(&format!("literal {rendered} : {ty} (line {line})"));
            }
            ExprKind::Variable { name } => {
                self.line(&format!("variable {name} : {ty} (line {line})"));
            }
            ExprKind::Assign { name, value } => {
                self.line(&format!("assign {name} : {ty} (line {line})"));
                self.nested(|p| p.print_expr(value));
            }
            ExprKind::Call { callee, args } => {
                self.line(&format!("call : {ty} (line {line})"));
                self.nested(|p| {
                    p.print_expr(callee);
                    for arg in args {
                        p.print_expr(arg);
                    }
                });
            }
            ExprKind::Array { elements } => {
                self.line(&format!("array[{}] : {ty} (line {line})", elements.len()));
                self.nested(|p| {
                    for element in elements {
                        p.print_expr(element);
                    }
                });
            }
            ExprKind::ArrayAccess { array, index } => {
                self.line(&format!("array-access : {ty} (line {line})"));
                self.nested(|p| {
                    p.print_expr(array);
                    p.print_expr(index);
                });
            }
            ExprKind::ArraySlice {
                array,
                start,
                end,
                step,
            } => {
                self.line(&format!("array-slice : {ty} (line {line})"));
                self.nested(|p| {
                    p.print_expr(array);
                    p.print_opt_expr("start", start);
                    p.print_opt_expr("end", end);
                    p.print_opt_expr("step", step);
                });
            }
            ExprKind::Range { start, end } => {
                self.line(&format!("range : {ty} (line {line})"));
                self.nested(|p| {
                    p.print_expr(start);
                    p.print_expr(end);
                });
            }
            ExprKind::Spread { array } => {
                self.line(&format!("spread : {ty} (line {line})"));
                self.nested(|p| p.print_expr(array));
            }
            ExprKind::Increment { operand } => {
                self.line(&format!("increment : {ty} (line {line})"));
                self.nested(|p| p.print_expr(operand));
            }
            ExprKind::Decrement { operand } => {
                self.line(&format!("decrement : {ty} (line {line})"));
                self.nested(|p| p.print_expr(operand));
            }
            ExprKind::Interpolated { parts } => {
                self.line(&format!("interpolated[{}] : {ty} (line {line})", parts.len()));
                self.nested(|p| {
                    for part in parts {
                        p.print_expr(part);
                    }
                });
            }
            ExprKind::Member { object, name } => {
                self.line(&format!("member .{name} : {ty} (line {line})"));
                self.nested(|p| p.print_expr(object));
            }
            ExprKind::Lambda {
                params,
                ret,
                body,
                modifier,
                captures,
                lambda_id,
            } => {
                let params: Vec<String> = params
                    .iter()
                    .map(|p| format!("{}: {}", p.name, self.arena.type_to_string(p.ty)))
                    .collect();
                let captures: Vec<String> = captures.iter().map(|c| c.name.clone()).collect();
                self.line(&format!(
                    "lambda #{lambda_id} ({}) -> {} {:?} captures=[{}] (line {line})",
                    params.join(", "),
                    self.arena.type_to_string(ret),
                    modifier,
                    captures.join(", "),
                ));
                self.nested(|p| {
                    for stmt in body {
                        p.print_stmt(stmt);
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::LiteralValue;
    use sn_lexer::{Token, TokenKind};

    #[test]
    fn covers_missing_children_with_none() {
        let mut module = Module::new("test.sn");
        let token = Token::new(TokenKind::For, "for", 1);
        let body_token = Token::new(TokenKind::LeftBrace, "{", 1);
        let body = module.arena.new_block(Vec::new(), &body_token);
        let stmt = module.arena.new_for(None, None, None, body, &token);
        module.stmts.push(stmt);
        let printed = print_module(&module);
        assert!(printed.contains("initializer <none>"));
        assert!(printed.contains("condition <none>"));
        assert!(printed.contains("increment <none>"));
    }

    #[test]
    fn prints_literal_with_type() {
        let mut module = Module::new("test.sn");
        let token = Token::new(TokenKind::IntLiteral, "42", 3);
        let lit = module.arena.new_literal(LiteralValue::Int(42), &token);
        let stmt = module.arena.new_expression_stmt(lit, &token);
        module.stmts.push(stmt);
        let printed = print_module(&module);
        assert!(printed.contains("literal 42 : <unchecked> (line 3)"));
    }
}

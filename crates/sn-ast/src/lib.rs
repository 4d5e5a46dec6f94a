//! Arena-backed AST for the Sindarin compiler.
//!
//! - `AstArena` - id-based storage for expressions, statements, and types
//! - `Type` - the shared value lattice with structural equality
//! - `Expr`/`Stmt` - the node sums, built through arena constructors
//! - `Module` - one source file plus the arena that owns its tree
//! - `printer` - diagnostic tree dump

pub mod arena;
pub mod expr;
pub mod module;
pub mod printer;
pub mod stmt;
pub mod types;

pub use arena::{AstArena, ExprId, StmtId, TypeId};
pub use expr::{
    Capture, Expr, ExprKind, FunctionModifier, LiteralValue, MemQualifier, Parameter,
};
pub use module::Module;
pub use stmt::{FunctionDecl, Stmt, StmtKind};
pub use types::Type;

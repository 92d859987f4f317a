//! Host-language syntax: AST, construction helpers, traversal and printing

pub mod ast;
pub mod builder;
pub mod printer;
pub mod walk;

pub use ast::{Block, Decl, Expr, ExprId, ExprKind, File, FuncDecl, Import, Param, Stmt};
pub use builder::AstBuilder;
pub use printer::{print_expr, print_file};
pub use walk::VisitorMut;

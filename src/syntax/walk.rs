//! Mutable AST traversal
//!
//! Passes implement [`VisitorMut`] and override only the hooks they need; the
//! `walk_*` functions perform the canonical source-order traversal. A hook that
//! overrides `visit_expr` decides itself whether (and when) to descend by
//! calling [`walk_expr`].

use super::ast::*;

pub trait VisitorMut: Sized {
    fn visit_file(&mut self, file: &mut File) {
        walk_file(self, file)
    }

    fn visit_decl(&mut self, decl: &mut Decl) {
        walk_decl(self, decl)
    }

    fn visit_block(&mut self, block: &mut Block) {
        walk_block(self, block)
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        walk_stmt(self, stmt)
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr(self, expr)
    }
}

pub fn walk_file<V: VisitorMut>(v: &mut V, file: &mut File) {
    for decl in &mut file.decls {
        v.visit_decl(decl);
    }
}

pub fn walk_decl<V: VisitorMut>(v: &mut V, decl: &mut Decl) {
    match decl {
        Decl::Func(func) => v.visit_block(&mut func.body),
        Decl::Type { .. } => {}
        Decl::Var { value, .. } => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
    }
}

pub fn walk_block<V: VisitorMut>(v: &mut V, block: &mut Block) {
    for stmt in &mut block.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: VisitorMut>(v: &mut V, stmt: &mut Stmt) {
    match stmt {
        Stmt::Expr(expr) => v.visit_expr(expr),
        Stmt::Assign { lhs, rhs, .. } => {
            for expr in lhs.iter_mut().chain(rhs.iter_mut()) {
                v.visit_expr(expr);
            }
        }
        Stmt::IncDec { x, .. } => v.visit_expr(x),
        Stmt::Return(results) => {
            for expr in results {
                v.visit_expr(expr);
            }
        }
        Stmt::If { cond, then, els } => {
            v.visit_expr(cond);
            v.visit_block(then);
            if let Some(els) = els {
                v.visit_stmt(els);
            }
        }
        Stmt::Range { key, value, x, body, .. } => {
            if let Some(key) = key {
                v.visit_expr(key);
            }
            if let Some(value) = value {
                v.visit_expr(value);
            }
            v.visit_expr(x);
            v.visit_block(body);
        }
        Stmt::For { cond, body } => {
            if let Some(cond) = cond {
                v.visit_expr(cond);
            }
            v.visit_block(body);
        }
        Stmt::Block(block) => v.visit_block(block),
        Stmt::VarDecl { value, .. } => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        Stmt::Break | Stmt::Continue => {}
    }
}

/// Visit the direct children of an expression
pub fn walk_expr<V: VisitorMut>(v: &mut V, expr: &mut Expr) {
    match &mut expr.kind {
        ExprKind::Ident(_) | ExprKind::BasicLit { .. } | ExprKind::TypeExpr(_) => {}
        ExprKind::CompositeLit { elts, .. } => {
            for elt in elts {
                v.visit_expr(elt);
            }
        }
        ExprKind::KeyValue { key, value } => {
            v.visit_expr(key);
            v.visit_expr(value);
        }
        ExprKind::FuncLit { body, .. } => v.visit_block(body),
        ExprKind::Call { fun, args, .. } => {
            v.visit_expr(fun);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        ExprKind::Selector { x, .. } => v.visit_expr(x),
        ExprKind::Index { x, index } => {
            v.visit_expr(x);
            v.visit_expr(index);
        }
        ExprKind::SliceExpr { x, low, high } => {
            v.visit_expr(x);
            if let Some(low) = low {
                v.visit_expr(low);
            }
            if let Some(high) = high {
                v.visit_expr(high);
            }
        }
        ExprKind::Unary { x, .. } => v.visit_expr(x),
        ExprKind::Binary { x, y, .. } => {
            v.visit_expr(x);
            v.visit_expr(y);
        }
        ExprKind::Paren(x) => v.visit_expr(x),
    }
}

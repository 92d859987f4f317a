//! Expression construction with fresh node ids
//!
//! Parsers and tests build trees through an `AstBuilder` so every node gets a
//! distinct [`ExprId`] the type checker can key its results on.

use super::ast::*;
use crate::types::Type;

#[derive(Debug, Clone, Default)]
pub struct AstBuilder {
    next: u32,
}

impl AstBuilder {
    pub fn new() -> Self {
        AstBuilder { next: 0 }
    }

    /// Continue numbering after ids already handed out elsewhere
    pub fn starting_at(first: u32) -> Self {
        AstBuilder { next: first }
    }

    pub fn fresh_id(&mut self) -> ExprId {
        let id = ExprId(self.next);
        self.next += 1;
        id
    }

    pub fn expr(&mut self, kind: ExprKind) -> Expr {
        Expr::new(self.fresh_id(), kind)
    }

    pub fn ident(&mut self, name: &str) -> Expr {
        self.expr(ExprKind::Ident(name.to_string()))
    }

    pub fn int(&mut self, value: i64) -> Expr {
        self.expr(ExprKind::BasicLit {
            kind: LitKind::Int,
            value: value.to_string(),
        })
    }

    pub fn string(&mut self, value: &str) -> Expr {
        self.expr(ExprKind::BasicLit {
            kind: LitKind::String,
            value: format!("{:?}", value),
        })
    }

    pub fn composite(&mut self, ty: Option<Type>, elts: Vec<Expr>) -> Expr {
        self.expr(ExprKind::CompositeLit { ty, elts })
    }

    pub fn key_value(&mut self, key: Expr, value: Expr) -> Expr {
        self.expr(ExprKind::KeyValue {
            key: Box::new(key),
            value: Box::new(value),
        })
    }

    pub fn func_lit(&mut self, params: Vec<Param>, results: Vec<Type>, body: Vec<Stmt>) -> Expr {
        self.expr(ExprKind::FuncLit {
            params,
            results,
            body: Block::new(body),
        })
    }

    pub fn call(&mut self, fun: Expr, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call {
            fun: Box::new(fun),
            args,
            ellipsis: false,
        })
    }

    pub fn selector(&mut self, x: Expr, sel: &str) -> Expr {
        self.expr(ExprKind::Selector {
            x: Box::new(x),
            sel: sel.to_string(),
        })
    }

    /// `recv.method(args)`
    pub fn method_call(&mut self, recv: Expr, method: &str, args: Vec<Expr>) -> Expr {
        let fun = self.selector(recv, method);
        self.call(fun, args)
    }

    pub fn index(&mut self, x: Expr, index: Expr) -> Expr {
        self.expr(ExprKind::Index {
            x: Box::new(x),
            index: Box::new(index),
        })
    }

    pub fn unary(&mut self, op: UnaryOp, x: Expr) -> Expr {
        self.expr(ExprKind::Unary { op, x: Box::new(x) })
    }

    pub fn binary(&mut self, op: BinaryOp, x: Expr, y: Expr) -> Expr {
        self.expr(ExprKind::Binary {
            op,
            x: Box::new(x),
            y: Box::new(y),
        })
    }

    pub fn paren(&mut self, x: Expr) -> Expr {
        self.expr(ExprKind::Paren(Box::new(x)))
    }

    pub fn type_expr(&mut self, ty: Type) -> Expr {
        self.expr(ExprKind::TypeExpr(ty))
    }
}

/// `lhs := rhs`
pub fn define(lhs: Expr, rhs: Expr) -> Stmt {
    Stmt::Assign {
        lhs: vec![lhs],
        op: AssignOp::Define,
        rhs: vec![rhs],
    }
}

/// `lhs = rhs`
pub fn assign(lhs: Expr, rhs: Expr) -> Stmt {
    Stmt::Assign {
        lhs: vec![lhs],
        op: AssignOp::Assign,
        rhs: vec![rhs],
    }
}

/// `func name() { body }`
pub fn func_decl(name: &str, body: Vec<Stmt>) -> Decl {
    Decl::Func(FuncDecl {
        recv: None,
        name: name.to_string(),
        params: Vec::new(),
        results: Vec::new(),
        body: Block::new(body),
    })
}

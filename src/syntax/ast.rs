//! Abstract Syntax Tree Definitions
//!
//! The subset of the host grammar the specializer walks and rewrites. Every
//! expression carries an [`ExprId`] which is the key into the type oracle.
//! Nodes synthesized during rewriting use [`ExprId::SYNTHETIC`]; they have no
//! type information and are never candidates for specialization.

use crate::types::Type;

/// Identity of an expression node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

impl ExprId {
    pub const SYNTHETIC: ExprId = ExprId(u32::MAX);

    pub fn is_synthetic(&self) -> bool {
        *self == ExprId::SYNTHETIC
    }
}

/// A source file
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub package: String,
    pub imports: Vec<Import>,
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub name: Option<String>,
    pub path: String,
}

/// Top-level declarations
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Func(FuncDecl),
    /// `type name T`
    Type { name: String, ty: Type },
    /// `var name T = value`
    Var {
        name: String,
        ty: Option<Type>,
        value: Option<Expr>,
    },
}

/// Function or method declaration
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub recv: Option<Param>,
    pub name: String,
    pub params: Vec<Param>,
    pub results: Vec<Type>,
    pub body: Block,
}

/// A named (or blank) parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

impl Param {
    pub fn new(name: &str, ty: Type) -> Self {
        Param { name: name.to_string(), ty }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Block { stmts }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Define,
    Add,
    Sub,
    Mul,
}

impl AssignOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Define => ":=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
        }
    }
}

/// Statements
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Assign {
        lhs: Vec<Expr>,
        op: AssignOp,
        rhs: Vec<Expr>,
    },
    IncDec { x: Expr, inc: bool },
    Return(Vec<Expr>),
    If {
        cond: Expr,
        then: Block,
        /// Either a `Block` or another `If`
        els: Option<Box<Stmt>>,
    },
    /// `for key, value := range x { body }`
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        x: Expr,
        body: Block,
    },
    /// `for cond { body }`, or an infinite loop when `cond` is absent
    For { cond: Option<Expr>, body: Block },
    Block(Block),
    VarDecl {
        name: String,
        ty: Option<Type>,
        value: Option<Expr>,
    },
    Break,
    Continue,
}

/// An expression node
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    Imag,
    Char,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Addr,
    Deref,
    Recv,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Addr => "&",
            UnaryOp::Deref => "*",
            UnaryOp::Recv => "<-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    Xor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Host-language binding strength, higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Rem
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::BitAnd => 5,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::BitOr | BinaryOp::Xor => 4,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => 3,
            BinaryOp::And => 2,
            BinaryOp::Or => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Ident(String),
    BasicLit {
        kind: LitKind,
        value: String,
    },
    /// `T{elts}`; the type is omitted for nested literals
    CompositeLit {
        ty: Option<Type>,
        elts: Vec<Expr>,
    },
    /// `key: value` inside a composite literal
    KeyValue {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    FuncLit {
        params: Vec<Param>,
        results: Vec<Type>,
        body: Block,
    },
    Call {
        fun: Box<Expr>,
        args: Vec<Expr>,
        ellipsis: bool,
    },
    Selector {
        x: Box<Expr>,
        sel: String,
    },
    Index {
        x: Box<Expr>,
        index: Box<Expr>,
    },
    SliceExpr {
        x: Box<Expr>,
        low: Option<Box<Expr>>,
        high: Option<Box<Expr>>,
    },
    Unary {
        op: UnaryOp,
        x: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        x: Box<Expr>,
        y: Box<Expr>,
    },
    Paren(Box<Expr>),
    /// A type in expression position, e.g. the callee of a conversion
    TypeExpr(Type),
}

impl Expr {
    pub fn new(id: ExprId, kind: ExprKind) -> Self {
        Expr { id, kind }
    }

    /// A node created by rewriting, unknown to the type oracle
    pub fn synthetic(kind: ExprKind) -> Self {
        Expr { id: ExprId::SYNTHETIC, kind }
    }

    pub fn synthetic_ident(name: &str) -> Self {
        Expr::synthetic(ExprKind::Ident(name.to_string()))
    }

    /// Move the node out, leaving a synthetic blank identifier behind
    pub fn take(&mut self) -> Expr {
        std::mem::replace(self, Expr::synthetic_ident("_"))
    }

    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self.kind, ExprKind::Call { .. })
    }
}

//! Source printer
//!
//! Renders the AST back to host source the way gofmt lays it out: tab
//! indentation, one statement per line, minimal parentheses. Function literals
//! whose body is a single simple statement stay on one line.

use std::fmt::Write;

use super::ast::*;
use crate::types::Type;

/// Print a whole source file
pub fn print_file(file: &File) -> String {
    let mut p = Printer::new();
    p.file(file);
    p.finish()
}

/// Print a single expression
pub fn print_expr(expr: &Expr) -> String {
    let mut p = Printer::new();
    p.expr(expr);
    p.finish()
}

/// Print a statement at indentation level zero
pub fn print_stmt(stmt: &Stmt) -> String {
    let mut p = Printer::new();
    p.stmt(stmt);
    p.finish()
}

/// Print an import section for the given paths; empty when there are none
pub fn print_imports(paths: &[&str]) -> String {
    match paths {
        [] => String::new(),
        [single] => format!("import \"{}\"\n", single),
        many => {
            let mut out = String::from("import (\n");
            for path in many {
                let _ = writeln!(out, "\t\"{}\"", path);
            }
            out.push_str(")\n");
            out
        }
    }
}

struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn new() -> Self {
        Printer {
            out: String::new(),
            indent: 0,
        }
    }

    fn finish(self) -> String {
        self.out
    }

    fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push('\t');
        }
    }

    fn file(&mut self, file: &File) {
        let _ = writeln!(self.out, "package {}", file.package);
        if !file.imports.is_empty() {
            self.push("\n");
            if let [import] = file.imports.as_slice() {
                self.push("import ");
                self.import(import);
                self.push("\n");
            } else {
                self.push("import (\n");
                for import in &file.imports {
                    self.push("\t");
                    self.import(import);
                    self.push("\n");
                }
                self.push(")\n");
            }
        }
        for decl in &file.decls {
            self.push("\n");
            self.decl(decl);
            self.push("\n");
        }
    }

    fn import(&mut self, import: &Import) {
        if let Some(name) = &import.name {
            let _ = write!(self.out, "{} ", name);
        }
        let _ = write!(self.out, "\"{}\"", import.path);
    }

    fn decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Func(func) => {
                self.push("func ");
                if let Some(recv) = &func.recv {
                    let _ = write!(self.out, "({} {}) ", recv.name, recv.ty);
                }
                self.push(&func.name);
                self.signature(&func.params, &func.results);
                self.push(" ");
                self.block(&func.body);
            }
            Decl::Type { name, ty } => {
                let _ = write!(self.out, "type {} {}", name, ty);
            }
            Decl::Var { name, ty, value } => self.var(name, ty.as_ref(), value.as_ref()),
        }
    }

    fn var(&mut self, name: &str, ty: Option<&Type>, value: Option<&Expr>) {
        let _ = write!(self.out, "var {}", name);
        if let Some(ty) = ty {
            let _ = write!(self.out, " {}", ty);
        }
        if let Some(value) = value {
            self.push(" = ");
            self.expr(value);
        }
    }

    fn signature(&mut self, params: &[Param], results: &[Type]) {
        self.push("(");
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            let _ = write!(self.out, "{} {}", param.name, param.ty);
        }
        self.push(")");
        match results {
            [] => {}
            [single] => {
                let _ = write!(self.out, " {}", single);
            }
            many => {
                self.push(" (");
                for (i, ty) in many.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    let _ = write!(self.out, "{}", ty);
                }
                self.push(")");
            }
        }
    }

    fn block(&mut self, block: &Block) {
        self.push("{");
        self.indent += 1;
        for stmt in &block.stmts {
            self.newline();
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.newline();
        self.push("}");
    }

    fn expr_list(&mut self, exprs: &[Expr]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.expr(expr);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) => self.expr(expr),
            Stmt::Assign { lhs, op, rhs } => {
                self.expr_list(lhs);
                let _ = write!(self.out, " {} ", op.as_str());
                self.expr_list(rhs);
            }
            Stmt::IncDec { x, inc } => {
                self.expr(x);
                self.push(if *inc { "++" } else { "--" });
            }
            Stmt::Return(results) => {
                self.push("return");
                if !results.is_empty() {
                    self.push(" ");
                    self.expr_list(results);
                }
            }
            Stmt::If { cond, then, els } => {
                self.push("if ");
                self.expr(cond);
                self.push(" ");
                self.block(then);
                if let Some(els) = els {
                    self.push(" else ");
                    match els.as_ref() {
                        Stmt::Block(block) => self.block(block),
                        other => self.stmt(other),
                    }
                }
            }
            Stmt::Range {
                key,
                value,
                define,
                x,
                body,
            } => {
                self.push("for ");
                match (key, value) {
                    (None, None) => {}
                    (key, value) => {
                        match key {
                            Some(key) => self.expr(key),
                            None => self.push("_"),
                        }
                        if let Some(value) = value {
                            self.push(", ");
                            self.expr(value);
                        }
                        self.push(if *define { " := " } else { " = " });
                    }
                }
                self.push("range ");
                self.expr(x);
                self.push(" ");
                self.block(body);
            }
            Stmt::For { cond, body } => {
                self.push("for ");
                if let Some(cond) = cond {
                    self.expr(cond);
                    self.push(" ");
                }
                self.block(body);
            }
            Stmt::Block(block) => self.block(block),
            Stmt::VarDecl { name, ty, value } => self.var(name, ty.as_ref(), value.as_ref()),
            Stmt::Break => self.push("break"),
            Stmt::Continue => self.push("continue"),
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ident(name) => self.push(name),
            ExprKind::BasicLit { value, .. } => self.push(value),
            ExprKind::CompositeLit { ty, elts } => {
                if let Some(ty) = ty {
                    let _ = write!(self.out, "{}", ty);
                }
                self.push("{");
                self.expr_list(elts);
                self.push("}");
            }
            ExprKind::KeyValue { key, value } => {
                self.expr(key);
                self.push(": ");
                self.expr(value);
            }
            ExprKind::FuncLit {
                params,
                results,
                body,
            } => {
                self.push("func");
                self.signature(params, results);
                self.push(" ");
                match body.stmts.as_slice() {
                    [single] if is_simple(single) => {
                        self.push("{ ");
                        self.stmt(single);
                        self.push(" }");
                    }
                    _ => self.block(body),
                }
            }
            ExprKind::Call {
                fun,
                args,
                ellipsis,
            } => {
                match &fun.kind {
                    ExprKind::TypeExpr(ty) if needs_parens_as_callee(ty) => {
                        let _ = write!(self.out, "({})", ty);
                    }
                    _ => self.operand(fun),
                }
                self.push("(");
                self.expr_list(args);
                if *ellipsis {
                    self.push("...");
                }
                self.push(")");
            }
            ExprKind::Selector { x, sel } => {
                self.operand(x);
                self.push(".");
                self.push(sel);
            }
            ExprKind::Index { x, index } => {
                self.operand(x);
                self.push("[");
                self.expr(index);
                self.push("]");
            }
            ExprKind::SliceExpr { x, low, high } => {
                self.operand(x);
                self.push("[");
                if let Some(low) = low {
                    self.expr(low);
                }
                self.push(":");
                if let Some(high) = high {
                    self.expr(high);
                }
                self.push("]");
            }
            ExprKind::Unary { op, x } => {
                self.push(op.as_str());
                self.operand(x);
            }
            ExprKind::Binary { op, x, y } => {
                self.binary_operand(x, op.precedence(), false);
                let _ = write!(self.out, " {} ", op.as_str());
                self.binary_operand(y, op.precedence(), true);
            }
            ExprKind::Paren(x) => {
                self.push("(");
                self.expr(x);
                self.push(")");
            }
            ExprKind::TypeExpr(ty) => {
                let _ = write!(self.out, "{}", ty);
            }
        }
    }

    /// Primary-expression position: binary and unary operands get parentheses
    fn operand(&mut self, expr: &Expr) {
        if matches!(expr.kind, ExprKind::Binary { .. } | ExprKind::Unary { .. }) {
            self.push("(");
            self.expr(expr);
            self.push(")");
        } else {
            self.expr(expr);
        }
    }

    fn binary_operand(&mut self, expr: &Expr, parent: u8, right: bool) {
        let wrap = match &expr.kind {
            ExprKind::Binary { op, .. } => {
                op.precedence() < parent || (right && op.precedence() == parent)
            }
            _ => false,
        };
        if wrap {
            self.push("(");
            self.expr(expr);
            self.push(")");
        } else {
            self.expr(expr);
        }
    }
}

/// Statements that fit on one line inside a function literal
fn is_simple(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Expr(expr) => !contains_func_lit(expr),
        Stmt::Return(results) => results.iter().all(|e| !contains_func_lit(e)),
        Stmt::Assign { rhs, .. } => rhs.iter().all(|e| !contains_func_lit(e)),
        Stmt::IncDec { .. } | Stmt::Break | Stmt::Continue => true,
        _ => false,
    }
}

fn contains_func_lit(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::FuncLit { .. } => true,
        ExprKind::Call { fun, args, .. } => {
            contains_func_lit(fun) || args.iter().any(contains_func_lit)
        }
        ExprKind::Binary { x, y, .. } => contains_func_lit(x) || contains_func_lit(y),
        ExprKind::Unary { x, .. } | ExprKind::Paren(x) | ExprKind::Selector { x, .. } => {
            contains_func_lit(x)
        }
        _ => false,
    }
}

/// `*T(x)` and `func()(x)` parse differently than intended without parens
fn needs_parens_as_callee(ty: &Type) -> bool {
    !matches!(ty, Type::Named(_) | Type::Basic(_))
}

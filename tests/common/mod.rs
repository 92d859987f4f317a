#![allow(dead_code)]

use fusegen::codegen::{DeclRegistry, GenerationStats, Specializer};
use fusegen::syntax::ast::Expr;
use fusegen::syntax::walk::VisitorMut;
use fusegen::types::{ConstValue, Type, TypeInfo};
use fusegen::{AstBuilder, GenerationConfig};

/// Builds expressions and records their types as a checker would
pub struct Fixture {
    pub b: AstBuilder,
    pub info: TypeInfo,
}

impl Fixture {
    pub fn new() -> Self {
        Fixture {
            b: AstBuilder::new(),
            info: TypeInfo::new(),
        }
    }

    /// An identifier of the given type
    pub fn var(&mut self, name: &str, ty: Type) -> Expr {
        let e = self.b.ident(name);
        self.info.record(e.id, ty);
        e
    }

    /// An identifier holding a function value
    pub fn func(&mut self, name: &str, params: Vec<Type>, results: Vec<Type>) -> Expr {
        self.var(name, Type::func(params, results))
    }

    /// `func(T) bool`
    pub fn pred(&mut self, name: &str, elem: Type) -> Expr {
        self.func(name, vec![elem], vec![Type::bool()])
    }

    pub fn int(&mut self, n: i64) -> Expr {
        let e = self.b.int(n);
        self.info.record_constant(e.id, Type::int(), ConstValue::Int(n as i128));
        e
    }

    /// `recv.method(args)` with result type `ty`
    pub fn method(&mut self, recv: Expr, method: &str, args: Vec<Expr>, ty: Type) -> Expr {
        let e = self.b.method_call(recv, method, args);
        self.info.record(e.id, ty);
        e
    }

    /// `name(args)` with result type `ty`
    pub fn call(&mut self, name: &str, args: Vec<Expr>, ty: Type) -> Expr {
        let fun = self.b.ident(name);
        let e = self.b.call(fun, args);
        self.info.record(e.id, ty);
        e
    }

    /// Run the specializer over one expression
    pub fn specialize(&self, expr: &mut Expr, config: &GenerationConfig) -> (DeclRegistry, GenerationStats) {
        let mut spec = Specializer::new(&self.info, config);
        spec.visit_expr(expr);
        spec.finish()
    }
}

pub fn ints() -> Type {
    Type::slice(Type::int())
}

/// Source of the single declaration a registry holds
pub fn only_decl(registry: &DeclRegistry) -> &str {
    assert_eq!(registry.len(), 1, "expected exactly one declaration");
    &registry.declarations()[0].code
}

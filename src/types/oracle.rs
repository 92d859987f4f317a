//! # Type Oracle
//!
//! The interface through which the specializer consults the (external) type
//! checker. The checker runs once over the whole package before generation
//! begins; afterwards every expression the walk encounters can be resolved to
//! its type and, for constant expressions, its compile-time value.
//!
//! [`TypeInfo`] is the in-memory table a checker fills in.

use std::collections::HashMap;

use super::Type;
use crate::syntax::ast::ExprId;

/// A compile-time constant value
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Bool(bool),
    Int(i128),
    Float(f64),
    String(String),
}

impl ConstValue {
    /// Exact host-syntax rendering, usable as a literal in place of the
    /// expression that produced it
    pub fn exact_string(&self) -> String {
        match self {
            ConstValue::Bool(b) => b.to_string(),
            ConstValue::Int(n) => n.to_string(),
            ConstValue::Float(x) => {
                let s = format!("{:?}", x);
                if s.contains(['.', 'e', 'E']) || s.contains("inf") || s.contains("NaN") {
                    s
                } else {
                    format!("{}.0", s)
                }
            }
            ConstValue::String(s) => quote(s),
        }
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Resolved type of an expression, plus its value if it is constant
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAndValue {
    pub ty: Type,
    pub value: Option<ConstValue>,
}

impl TypeAndValue {
    pub fn new(ty: Type) -> Self {
        TypeAndValue { ty, value: None }
    }

    pub fn constant(ty: Type, value: ConstValue) -> Self {
        TypeAndValue { ty, value: Some(value) }
    }
}

/// Expression → type resolution, provided by the type checker
pub trait TypeOracle {
    /// Type (and constant value) recorded for an expression
    fn type_and_value(&self, expr: ExprId) -> Option<&TypeAndValue>;

    fn type_of(&self, expr: ExprId) -> Option<&Type> {
        self.type_and_value(expr).map(|tv| &tv.ty)
    }

    /// Names of the methods callable on a value of `ty`
    fn method_set(&self, ty: &Type) -> Vec<String> {
        match ty {
            Type::Named(named) => named.methods.clone(),
            Type::Pointer(elem) => match elem.as_ref() {
                Type::Named(named) => named.methods.clone(),
                _ => Vec::new(),
            },
            Type::Interface(specs) => specs
                .iter()
                .map(|spec| spec.split('(').next().unwrap_or(spec).trim().to_string())
                .collect(),
            _ => Vec::new(),
        }
    }

    fn has_method(&self, ty: &Type, name: &str) -> bool {
        self.method_set(ty).iter().any(|m| m == name)
    }

    /// Errors the checker reported; generation does not start if any exist
    fn diagnostics(&self) -> &[String] {
        &[]
    }
}

/// Type information recorded by a checker run
#[derive(Debug, Clone, Default)]
pub struct TypeInfo {
    types: HashMap<ExprId, TypeAndValue>,
    errors: Vec<String>,
}

impl TypeInfo {
    pub fn new() -> Self {
        TypeInfo {
            types: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Record the type of an expression
    pub fn record(&mut self, expr: ExprId, ty: Type) {
        self.types.insert(expr, TypeAndValue::new(ty));
    }

    /// Record a constant expression
    pub fn record_constant(&mut self, expr: ExprId, ty: Type, value: ConstValue) {
        self.types.insert(expr, TypeAndValue::constant(ty, value));
    }

    /// Record a type error
    pub fn report(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeOracle for TypeInfo {
    fn type_and_value(&self, expr: ExprId) -> Option<&TypeAndValue> {
        self.types.get(&expr)
    }

    fn diagnostics(&self) -> &[String] {
        &self.errors
    }
}

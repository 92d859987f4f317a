//! Call-site rewriting
//!
//! Each generator hands back a [`CallRewrite`] describing how the call that
//! triggered it must change. Rewrites mutate the call node in place; nodes
//! they create are synthetic and carry no type information.

use crate::error::{GenError, Result};
use crate::syntax::ast::{Expr, ExprId, ExprKind};
use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallRewrite {
    /// `max(a, b)` becomes `__fgfn_1_max(a, b)`
    Func { name: String },
    /// `xs.filter(f)` becomes `__fgtype_1_filter(xs).filter(f)`
    Method { type_name: String },
    /// `xs.filter(f).morph(g)` becomes `__fgpipe_1(xs).pipeline(f, g)`.
    /// `arity` holds the argument count of every link in execution order.
    Pipeline {
        type_name: String,
        method: String,
        arity: Vec<usize>,
    },
    /// The whole call is replaced by a constant literal
    Constant { text: String },
}

impl CallRewrite {
    pub fn apply(&self, call: &mut Expr) -> Result<()> {
        let id = call.id;
        match self {
            CallRewrite::Func { name } => match &mut call.kind {
                ExprKind::Call { fun, .. } => {
                    **fun = Expr::synthetic_ident(name);
                    Ok(())
                }
                _ => Err(not_a_call(id)),
            },
            CallRewrite::Method { type_name } => match &mut call.kind {
                ExprKind::Call { fun, .. } => match &mut fun.kind {
                    ExprKind::Selector { x, .. } => {
                        let recv = x.take();
                        **x = conversion(Expr::synthetic_ident(type_name), recv);
                        Ok(())
                    }
                    _ => Err(GenError::Rewrite("method call without selector".to_string())),
                },
                _ => Err(not_a_call(id)),
            },
            CallRewrite::Pipeline {
                type_name,
                method,
                arity,
            } => rewrite_pipeline(call, type_name, method, arity),
            CallRewrite::Constant { text } => {
                *call = Expr::synthetic_ident(text);
                Ok(())
            }
        }
    }
}

/// `T(x)`
pub fn conversion(to: Expr, x: Expr) -> Expr {
    Expr::synthetic(ExprKind::Call {
        fun: Box::new(to),
        args: vec![x],
        ellipsis: false,
    })
}

/// Wrap a rewritten expression in a conversion back to the named type the
/// original call had, so the generated structural type does not leak
pub fn convert_to_named(expr: &mut Expr, named: &Type) {
    let inner = expr.take();
    *expr = conversion(Expr::synthetic(ExprKind::TypeExpr(named.clone())), inner);
}

fn not_a_call(id: ExprId) -> GenError {
    GenError::Rewrite(format!("expected a call expression (expr {:?})", id))
}

/// Check that `call` is a chain of at least `arity.len()` method calls with
/// the recorded argument counts
fn check_chain(call: &Expr, arity: &[usize]) -> Result<()> {
    let mut cur = call;
    for (depth, expected) in arity.iter().rev().enumerate() {
        let ExprKind::Call { fun, args, .. } = &cur.kind else {
            return Err(GenError::Rewrite(format!("chain ends at depth {}", depth)));
        };
        let ExprKind::Selector { x, .. } = &fun.kind else {
            return Err(GenError::Rewrite(format!("link {} is not a method call", depth)));
        };
        if args.len() != *expected {
            return Err(GenError::Rewrite(format!(
                "link {} has {} arguments, expected {}",
                depth,
                args.len(),
                expected
            )));
        }
        cur = x;
    }
    Ok(())
}

fn rewrite_pipeline(call: &mut Expr, type_name: &str, method: &str, arity: &[usize]) -> Result<()> {
    check_chain(call, arity)?;

    let id = call.id;
    let mut cur = call.take();
    let mut groups = Vec::with_capacity(arity.len());
    for _ in arity {
        let ExprKind::Call { fun, args, .. } = cur.kind else {
            unreachable!("chain shape checked above");
        };
        let ExprKind::Selector { x, .. } = fun.kind else {
            unreachable!("chain shape checked above");
        };
        groups.push(args);
        cur = *x;
    }

    // groups were collected outermost first
    let args = groups.into_iter().rev().flatten().collect();
    let recv = conversion(Expr::synthetic_ident(type_name), cur);
    let fun = Expr::synthetic(ExprKind::Selector {
        x: Box::new(recv),
        sel: method.to_string(),
    });
    *call = Expr::new(
        id,
        ExprKind::Call {
            fun: Box::new(fun),
            args,
            ellipsis: false,
        },
    );
    Ok(())
}

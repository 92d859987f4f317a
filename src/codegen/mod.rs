//! # Specialization & Pipeline Fusion
//!
//! Turns calls of the dialect's generic builtins into calls of generated,
//! monomorphic host code.
//!
//! ## What we do:
//! - Recognize chains of fusible methods (`xs.filter(f).morph(g).fold(h, z)`)
//!   and fuse them into a single loop on a generated pipeline type
//! - Generate one specialized type + method (or function) for every other
//!   builtin call
//! - Fold builtin calls the type checker evaluated to a constant
//! - Rewrite each call site in place and collect the generated declarations,
//!   deduplicated by instantiation
//!
//! ## Generated names:
//! - `__fgpipe_N`: pipeline types, method `pipeline`
//! - `__fgtype_N_op`: single-method receiver types
//! - `__fgfn_N_op`: functions
//! - `__fgarg_N`: parameters of fused methods

pub mod fragment;
pub mod generators;
pub mod names;
pub mod pipeline;
pub mod registry;
pub mod rewrite;
pub mod specializer;
pub mod templates;

pub use fragment::{Fragment, VarCounters};
pub use generators::{FuncOp, MethodOp};
pub use names::{Allocation, DeclKind, NameAllocator};
pub use pipeline::{build_pipeline, Pipeline};
pub use registry::DeclRegistry;
pub use rewrite::CallRewrite;
pub use specializer::Specializer;
pub use templates::{PipeOp, ReceiverKind, Template};

use crate::syntax::ast::{Expr, ExprKind};

/// A method call `receiver.method(args)` viewed in place
#[derive(Debug, Clone, Copy)]
pub struct CallSite<'a> {
    pub call: &'a Expr,
    pub receiver: &'a Expr,
    pub method: &'a str,
    pub args: &'a [Expr],
}

impl<'a> CallSite<'a> {
    pub fn from_expr(expr: &'a Expr) -> Option<CallSite<'a>> {
        let ExprKind::Call { fun, args, .. } = &expr.kind else {
            return None;
        };
        match &fun.kind {
            ExprKind::Selector { x, sel } => Some(CallSite {
                call: expr,
                receiver: x,
                method: sel,
                args,
            }),
            _ => None,
        }
    }

    /// The receiver, if it is itself a method call
    pub fn inner(&self) -> Option<CallSite<'a>> {
        CallSite::from_expr(self.receiver)
    }
}

/// A generated declaration and the rewrite of the call that uses it
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub name: Allocation,
    pub code: String,
    pub rewrite: CallRewrite,
    pub imports: &'static [&'static str],
}

/// Name a declaration whose text still carries the `#name` directive and
/// produce its final, indented code. The text before naming is the
/// instantiation signature, so identical instantiations share one name.
pub(crate) fn name_declaration(
    names: &mut NameAllocator,
    kind: DeclKind,
    op: &str,
    mut code: Fragment,
) -> (Allocation, String) {
    let allocation = names.instantiate(kind, op, &code.to_string());
    code.fill("name", allocation.name());
    let code = fragment::reindent(&code.to_string()).trim_end().to_string();
    (allocation, code)
}

/// Statistics about one generation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationStats {
    /// Chains fused into a pipeline
    pub pipelines_fused: u32,
    /// Method calls absorbed by those pipelines
    pub links_fused: u32,
    /// Calls handled by a single-operation generator
    pub single_ops: u32,
    /// Builtin calls replaced by their constant value
    pub constant_folds: u32,
    /// Call sites that reused an existing declaration
    pub reused_declarations: u32,
    /// Fusible chains that failed to specify and fell back
    pub fusion_fallbacks: u32,
}

impl GenerationStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if any call site was rewritten
    pub fn any_rewrites(&self) -> bool {
        self.pipelines_fused > 0 || self.single_ops > 0 || self.constant_folds > 0
    }
}

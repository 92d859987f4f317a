//! The rewriting walk
//!
//! [`Specializer`] visits every call expression of a dialect file in source
//! order. For each builtin call it tries, in order:
//!
//! 1. pipeline fusion of the chain ending at the call (when enabled)
//! 2. constant folding, for function builtins the checker evaluated
//! 3. a single-operation declaration
//!
//! The chosen rewrite is applied in place, then the walk descends into the
//! rewritten node so unfused receivers and builtin calls nested in arguments
//! are handled too. Calls nothing applies to are left untouched.

use std::collections::HashSet;

use log::{debug, trace};

use super::generators::{generate_func, generate_method, FuncOp, MethodOp};
use super::names::NameAllocator;
use super::pipeline::build_pipeline;
use super::registry::DeclRegistry;
use super::rewrite::{convert_to_named, CallRewrite};
use super::{CallSite, Generated, GenerationStats};
use crate::config::GenerationConfig;
use crate::syntax::ast::{Expr, ExprKind, File};
use crate::syntax::walk::{walk_expr, VisitorMut};
use crate::types::TypeOracle;

pub struct Specializer<'a> {
    oracle: &'a dyn TypeOracle,
    config: &'a GenerationConfig,
    names: NameAllocator,
    registry: DeclRegistry,
    stats: GenerationStats,
    /// Package-level identifiers that hide a builtin function
    shadowed: HashSet<String>,
}

impl<'a> Specializer<'a> {
    pub fn new(oracle: &'a dyn TypeOracle, config: &'a GenerationConfig) -> Self {
        Specializer {
            oracle,
            config,
            names: NameAllocator::new(config),
            registry: DeclRegistry::new(),
            stats: GenerationStats::new(),
            shadowed: HashSet::new(),
        }
    }

    /// Treat these identifiers as user declarations rather than builtins
    pub fn with_shadowed<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shadowed.extend(names.into_iter().map(Into::into));
        self
    }

    /// Rewrite every builtin call in `file`
    pub fn specialize_file(&mut self, file: &mut File) {
        let before = self.stats.clone();
        self.visit_file(file);
        debug!(
            "package {}: {} pipeline(s), {} single op(s), {} constant(s)",
            file.package,
            self.stats.pipelines_fused - before.pipelines_fused,
            self.stats.single_ops - before.single_ops,
            self.stats.constant_folds - before.constant_folds
        );
    }

    pub fn registry(&self) -> &DeclRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &GenerationStats {
        &self.stats
    }

    pub fn finish(self) -> (DeclRegistry, GenerationStats) {
        (self.registry, self.stats)
    }

    /// Decide how `call` is rewritten, registering whatever it needs
    fn rewrite_for(&mut self, call: &Expr) -> Option<CallRewrite> {
        let ExprKind::Call { fun, args, .. } = &call.kind else {
            return None;
        };
        match &fun.kind {
            ExprKind::Ident(name) => self.function_call(call, name, args),
            ExprKind::Selector { .. } => self.method_call(call),
            _ => None,
        }
    }

    fn function_call(&mut self, call: &Expr, name: &str, args: &[Expr]) -> Option<CallRewrite> {
        let op = FuncOp::lookup(name)?;
        if self.shadowed.contains(name) {
            debug!("{}: declared in the package, not a builtin", name);
            return None;
        }

        if let Some(value) = self.oracle.type_and_value(call.id).and_then(|tv| tv.value.as_ref()) {
            self.stats.constant_folds += 1;
            return Some(CallRewrite::Constant {
                text: value.exact_string(),
            });
        }

        match generate_func(op, args, self.oracle, &mut self.names) {
            Ok(generated) => {
                self.stats.single_ops += 1;
                Some(self.commit(generated))
            }
            Err(err) => {
                debug!("{}: left untouched: {}", name, err);
                None
            }
        }
    }

    fn method_call(&mut self, call: &Expr) -> Option<CallRewrite> {
        if self.config.fusion {
            match build_pipeline(call, self.oracle, self.config) {
                Ok(Some(pipeline)) => {
                    self.stats.pipelines_fused += 1;
                    self.stats.links_fused += pipeline.len() as u32;
                    let generated = pipeline.assemble(&mut self.names, self.config);
                    return Some(self.commit(generated));
                }
                Ok(None) => {}
                Err(err) => {
                    debug!("fusion abandoned, falling back: {}", err);
                    self.stats.fusion_fallbacks += 1;
                }
            }
        }

        let site = CallSite::from_expr(call)?;
        let recv_ty = self.oracle.type_of(site.receiver.id)?;
        let op = MethodOp::lookup(site.method, recv_ty, site.args.len())?;
        if self.oracle.has_method(recv_ty, site.method) {
            debug!("{}: overridden by a method of {}", site.method, recv_ty);
            return None;
        }

        match generate_method(op, &site, self.oracle, &mut self.names) {
            Ok(generated) => {
                self.stats.single_ops += 1;
                Some(self.commit(generated))
            }
            Err(err) => {
                debug!("{}: left untouched: {}", site.method, err);
                None
            }
        }
    }

    /// Register a generated declaration and hand back its rewrite
    fn commit(&mut self, generated: Generated) -> CallRewrite {
        let Generated {
            name,
            code,
            rewrite,
            imports,
        } = generated;
        if name.is_fresh() {
            trace!("new declaration {}", name.name());
        } else {
            self.stats.reused_declarations += 1;
        }
        self.registry.add_declaration(name.name(), code);
        for path in imports {
            self.registry.require_import(path);
        }
        rewrite
    }
}

impl VisitorMut for Specializer<'_> {
    fn visit_expr(&mut self, expr: &mut Expr) {
        if !expr.is_call() || expr.id.is_synthetic() {
            walk_expr(self, expr);
            return;
        }

        let original = expr.id;
        let mut wrap = false;
        if let Some(rewrite) = self.rewrite_for(expr) {
            match rewrite.apply(expr) {
                Ok(()) => wrap = !matches!(rewrite, CallRewrite::Constant { .. }),
                Err(err) => debug!("rewrite failed, call left untouched: {}", err),
            }
        }

        walk_expr(self, expr);

        if wrap {
            if let Some(ty) = self.oracle.type_of(original).filter(|ty| ty.is_named()) {
                convert_to_named(expr, ty);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::builder::AstBuilder;
    use crate::syntax::printer::print_expr;
    use crate::types::{ConstValue, Type, TypeInfo};

    fn pred() -> Type {
        Type::func(vec![Type::int()], vec![Type::bool()])
    }

    #[test_log::test]
    fn test_fused_call_keeps_named_result_type() {
        let mut b = AstBuilder::new();
        let mut info = TypeInfo::new();
        let ints = Type::named("ints", Type::slice(Type::int()), &[]);

        let xs = b.ident("xs");
        info.record(xs.id, ints.clone());
        let f = b.ident("f");
        info.record(f.id, pred());
        let filtered = b.method_call(xs, "filter", vec![f]);
        info.record(filtered.id, ints.clone());
        let mut call = b.method_call(filtered, "reverse", vec![]);
        info.record(call.id, ints.clone());

        let config = GenerationConfig::new();
        let mut spec = Specializer::new(&info, &config);
        spec.visit_expr(&mut call);

        assert_eq!(print_expr(&call), "ints(__fgpipe_1(xs).pipeline(f))");
        assert_eq!(spec.stats().pipelines_fused, 1);
        assert_eq!(spec.stats().links_fused, 2);
        assert!(spec.registry().get("__fgpipe_1").unwrap().code.starts_with("type __fgpipe_1 []int\n"));
    }

    #[test_log::test]
    fn test_nested_builtin_in_argument() {
        let mut b = AstBuilder::new();
        let mut info = TypeInfo::new();

        let xs = b.ident("xs");
        info.record(xs.id, Type::slice(Type::int()));
        let not = b.ident("not");
        let f = b.ident("f");
        info.record(f.id, pred());
        let negated = b.call(not, vec![f]);
        info.record(negated.id, pred());
        let mut call = b.method_call(xs, "filter", vec![negated]);
        info.record(call.id, Type::slice(Type::int()));

        let config = GenerationConfig::new();
        let mut spec = Specializer::new(&info, &config);
        spec.visit_expr(&mut call);

        assert_eq!(
            print_expr(&call),
            "__fgtype_1_filter(xs).filter(__fgfn_1_not(f))"
        );
        assert_eq!(spec.stats().single_ops, 2);
        assert_eq!(spec.registry().len(), 2);
    }

    #[test_log::test]
    fn test_constant_call_is_folded() {
        let mut b = AstBuilder::new();
        let mut info = TypeInfo::new();
        let max = b.ident("max");
        let (one, two) = (b.int(1), b.int(2));
        let mut call = b.call(max, vec![one, two]);
        info.record_constant(call.id, Type::int(), ConstValue::Int(2));

        let config = GenerationConfig::new();
        let mut spec = Specializer::new(&info, &config);
        spec.visit_expr(&mut call);

        assert_eq!(print_expr(&call), "2");
        assert!(spec.registry().is_empty());
        assert_eq!(spec.stats().constant_folds, 1);
    }

    #[test_log::test]
    fn test_package_function_shadows_builtin() {
        let mut b = AstBuilder::new();
        let mut info = TypeInfo::new();
        let max = b.ident("max");
        let (x, y) = (b.ident("x"), b.ident("y"));
        info.record(x.id, Type::int());
        info.record(y.id, Type::int());
        let mut call = b.call(max, vec![x, y]);
        let before = call.clone();

        let config = GenerationConfig::new();
        let mut spec = Specializer::new(&info, &config).with_shadowed(["max"]);
        spec.visit_expr(&mut call);

        assert_eq!(call, before);
        assert!(!spec.stats().any_rewrites());
    }

    #[test_log::test]
    fn test_user_method_wins_over_builtin() {
        let mut b = AstBuilder::new();
        let mut info = TypeInfo::new();
        let ints = Type::named("ints", Type::slice(Type::int()), &["filter"]);
        let xs = b.ident("xs");
        info.record(xs.id, ints.clone());
        let f = b.ident("f");
        info.record(f.id, pred());
        let mut call = b.method_call(xs, "filter", vec![f]);
        info.record(call.id, ints);

        let config = GenerationConfig::new();
        let mut spec = Specializer::new(&info, &config);
        spec.visit_expr(&mut call);

        assert_eq!(print_expr(&call), "xs.filter(f)");
        assert!(spec.registry().is_empty());
    }

    #[test_log::test]
    fn test_unspecifiable_chain_falls_back_per_link() {
        let mut b = AstBuilder::new();
        let mut info = TypeInfo::new();
        let ints = Type::slice(Type::int());

        let xs = b.ident("xs");
        info.record(xs.id, ints.clone());
        let f = b.ident("f");
        info.record(f.id, pred());
        let filtered = b.method_call(xs, "filter", vec![f]);
        info.record(filtered.id, ints.clone());
        let g = b.ident("g"); // untyped: morph cannot be resolved
        let mut call = b.method_call(filtered, "morph", vec![g]);

        let config = GenerationConfig::new();
        let mut spec = Specializer::new(&info, &config);
        spec.visit_expr(&mut call);

        assert_eq!(print_expr(&call), "__fgtype_1_filter(xs).filter(f).morph(g)");
        assert_eq!(spec.stats().fusion_fallbacks, 1);
        assert_eq!(spec.stats().single_ops, 1);
    }

    #[test_log::test]
    fn test_fusion_disabled_generates_each_link() {
        let mut b = AstBuilder::new();
        let mut info = TypeInfo::new();
        let ints = Type::slice(Type::int());

        let xs = b.ident("xs");
        info.record(xs.id, ints.clone());
        let f = b.ident("f");
        info.record(f.id, pred());
        let filtered = b.method_call(xs, "filter", vec![f]);
        info.record(filtered.id, ints.clone());
        let mut call = b.method_call(filtered, "reverse", vec![]);
        info.record(call.id, ints.clone());

        let config = GenerationConfig::new().with_fusion(false);
        let mut spec = Specializer::new(&info, &config);
        spec.visit_expr(&mut call);

        assert_eq!(
            print_expr(&call),
            "__fgtype_1_reverse(__fgtype_2_filter(xs).filter(f)).reverse()"
        );
        let (registry, stats) = spec.finish();
        assert_eq!(registry.len(), 2);
        assert_eq!(stats.pipelines_fused, 0);
    }
}

//! # Pipeline Fusion
//!
//! Detects chains of fusible builtin methods and composes their templates
//! into one loop, so that
//!
//! ```text
//! xs.takeWhile(even).morph(square).filter(small)
//! ```
//!
//! becomes a single pass with no intermediate slices:
//!
//! ```text
//! var filtered []int
//! for _, e1 := range recv {
//!     if !__fgarg_0(e1) {
//!         break
//!     }
//!     e2 := __fgarg_1(e1)
//!     if !__fgarg_2(e2) {
//!         continue
//!     }
//!     filtered = append(filtered, e2)
//! }
//! return filtered
//! ```
//!
//! Assembly order: outline of the last link, setup of every link, loop of the
//! first link, step of every link, cons of the last link. Each splice fills
//! the single `#next` of the code so far and binds the element/key variables.
//!
//! Recognition walks from the outermost call back through receivers that are
//! themselves method calls. A reversal can only sit at either end of a
//! pipeline: at the outermost call it becomes the tail, anywhere else it
//! becomes the head and the walk stops there. Whatever is left inside the
//! receiver is handled when the walk of the call tree reaches it. Terminal
//! operations (`fold`, `all`, `toSet`, ...) only ever close a pipeline.

use log::{debug, trace};

use super::fragment::{Fragment, VarCounters};
use super::names::{DeclKind, NameAllocator};
use super::rewrite::CallRewrite;
use super::templates::{PipeOp, ReceiverKind, SpecifiedTemplate};
use super::{name_declaration, CallSite, Generated};
use crate::config::GenerationConfig;
use crate::error::Result;
use crate::syntax::ast::Expr;
use crate::types::TypeOracle;

const WRAPPER: &str = "
type #name #recv

func (recv #name) #method(#params)#ret {
#body
}";

/// A recognized chain, specified and ready for assembly
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<SpecifiedTemplate>,
    /// Argument count of each link, execution order
    arity: Vec<usize>,
}

/// Whether `inner` may feed directly into `outer` within one loop
fn can_precede(inner: PipeOp, outer: PipeOp) -> bool {
    match (inner.kind(), outer.kind()) {
        // a slice op producing a map (toSet) binds no key variable
        (ReceiverKind::Sequence, ReceiverKind::Mapping) => false,
        // projecting one half of a morphed pair leaves the other unused
        _ => !(inner == PipeOp::MorphMap && matches!(outer, PipeOp::Keys | PipeOp::Elems)),
    }
}

/// Recognize a fusible chain ending at `call`.
///
/// Returns `Ok(None)` when the chain is not eligible (fewer than two fusible
/// links) and an error when an eligible chain cannot be specified; both fall
/// back to single-operation generation.
pub fn build_pipeline(
    call: &Expr,
    oracle: &dyn TypeOracle,
    config: &GenerationConfig,
) -> Result<Option<Pipeline>> {
    let Some(outer) = CallSite::from_expr(call) else {
        return Ok(None);
    };
    let mut chain = vec![outer];
    while let Some(inner) = chain.last().and_then(|site| site.inner()) {
        chain.push(inner);
    }

    // outermost first
    let mut links: Vec<(CallSite, PipeOp)> = Vec::new();
    let mut have_reversal = false;
    for (i, site) in chain.iter().enumerate() {
        let Some(recv_ty) = oracle.type_of(site.receiver.id) else {
            debug!("{}: receiver has no recorded type, chain stops", site.method);
            break;
        };
        let Some(kind) = ReceiverKind::of(recv_ty) else {
            debug!("{}: receiver {} is neither slice nor map", site.method, recv_ty);
            break;
        };
        if oracle.has_method(recv_ty, site.method) {
            debug!("{}: overridden by a method of {}", site.method, recv_ty);
            break;
        }
        let Some(mut op) = PipeOp::lookup(site.method, kind, site.args.len()) else {
            debug!("{}: not fusible", site.method);
            break;
        };
        if op == PipeOp::Contains && !recv_ty.slice_elem().map_or(false, |e| e.comparable()) {
            op = PipeOp::ContainsNil;
        }
        if let Some((_, next)) = links.last() {
            if op.is_terminal() {
                debug!("{} ends a pipeline and cannot feed {}", op.name(), next.name());
                break;
            }
            if !can_precede(op, *next) {
                debug!("{} cannot feed {}, chain stops", op.name(), next.name());
                break;
            }
        }

        if op.is_reversal() {
            if have_reversal {
                debug!("second reversal, chain stops");
                break;
            }
            links.push((*site, op));
            if i == 0 {
                have_reversal = true;
                continue;
            }
            // a reversal anywhere but the tail is the head
            break;
        }
        links.push((*site, op));
    }

    if links.len() < 2 {
        debug!("{}: {} fusible link(s), not a pipeline", outer.method, links.len());
        return Ok(None);
    }
    links.reverse();

    let mut stages = Vec::with_capacity(links.len());
    let mut arity = Vec::with_capacity(links.len());
    let mut offset = 0;
    for (site, op) in &links {
        stages.push(op.template().specify(site, offset, oracle, &config.arg_prefix)?);
        arity.push(site.args.len());
        offset += site.args.len();
    }

    debug!(
        "fusing {}",
        stages.iter().map(|s| s.op.name()).collect::<Vec<_>>().join(" -> ")
    );
    Ok(Some(Pipeline { stages, arity }))
}

impl Pipeline {
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn ops(&self) -> Vec<PipeOp> {
        self.stages.iter().map(|s| s.op).collect()
    }

    /// Compose the method body from the specified templates
    pub fn body(&self) -> Fragment {
        let (first, last) = match (self.stages.first(), self.stages.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Fragment::default(),
        };
        let mut counters = VarCounters::new();

        let mut code = last.outline.clone();
        for stage in &self.stages {
            code = add_section(code, &stage.setup, &mut counters);
        }
        code = add_section(code, &first.iter, &mut counters);
        for stage in &self.stages {
            code = add_section(code, &stage.step, &mut counters);
        }
        add_section(code, &last.cons, &mut counters)
    }

    /// Generate the pipeline type, its method, and the call-site rewrite
    pub fn assemble(self, names: &mut NameAllocator, config: &GenerationConfig) -> Generated {
        let body = self.body();

        let mut params = Vec::new();
        for stage in &self.stages {
            for shape in &stage.params {
                params.push(format!("{}{} {}", config.arg_prefix, params.len(), shape));
            }
        }
        let (first, last) = (&self.stages[0], &self.stages[self.stages.len() - 1]);
        let ret = if last.ret.is_empty() {
            String::new()
        } else {
            format!(" {}", last.ret)
        };

        let mut code = Fragment::parse(WRAPPER);
        code.fill("recv", &first.recv);
        code.fill("method", &config.pipeline_method);
        code.fill("params", &params.join(", "));
        code.fill("ret", &ret);
        code.fill("body", &body.to_string());

        let (name, code) = name_declaration(names, DeclKind::Pipeline, "pipeline", code);
        let rewrite = CallRewrite::Pipeline {
            type_name: name.name().to_string(),
            method: config.pipeline_method.clone(),
            arity: self.arity,
        };
        Generated {
            name,
            code,
            rewrite,
            imports: &[],
        }
    }
}

fn add_section(outer: Fragment, inner: &Fragment, counters: &mut VarCounters) -> Fragment {
    if inner.is_passthrough() {
        return outer;
    }
    let mut code = outer.splice(inner);
    code.bind_vars(counters);
    trace!("spliced:\n{}", code);
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::builder::AstBuilder;
    use crate::syntax::printer::print_expr;
    use crate::types::{Type, TypeInfo};

    fn pred(info: &mut TypeInfo, b: &mut AstBuilder, name: &str, elem: Type) -> Expr {
        let e = b.ident(name);
        info.record(e.id, Type::func(vec![elem], vec![Type::bool()]));
        e
    }

    #[test_log::test]
    fn test_filter_then_reverse_puts_reversal_at_tail() {
        let mut b = AstBuilder::new();
        let mut info = TypeInfo::new();
        let ints = Type::slice(Type::int());

        let xs = b.ident("xs");
        info.record(xs.id, ints.clone());
        let f = pred(&mut info, &mut b, "big", Type::int());
        let filtered = b.method_call(xs, "filter", vec![f]);
        info.record(filtered.id, ints.clone());
        let reversed = b.method_call(filtered, "reverse", vec![]);
        info.record(reversed.id, ints.clone());

        let config = GenerationConfig::new();
        let pipeline = build_pipeline(&reversed, &info, &config).unwrap().unwrap();
        assert_eq!(pipeline.ops(), vec![PipeOp::Filter, PipeOp::Reverse]);

        let mut names = NameAllocator::new(&config);
        let generated = pipeline.assemble(&mut names, &config);
        assert_eq!(
            generated.code,
            "type __fgpipe_1 []int

func (recv __fgpipe_1) pipeline(__fgarg_0 func(int) bool) []int {
\tvar reversed []int
\tfor _, e1 := range recv {
\t\tif !__fgarg_0(e1) {
\t\t\tcontinue
\t\t}
\t\treversed = append(reversed, e1)
\t}
\tfor i, j := 0, len(reversed)-1; i < j; i, j = i+1, j-1 {
\t\treversed[i], reversed[j] = reversed[j], reversed[i]
\t}
\treturn reversed
}"
        );

        let mut call = reversed.clone();
        generated.rewrite.apply(&mut call).unwrap();
        assert_eq!(print_expr(&call), "__fgpipe_1(xs).pipeline(big)");
    }

    #[test_log::test]
    fn test_interior_reversal_becomes_head() {
        // xs.filter(f).reverse().morph(g): fuse reverse -> morph only
        let mut b = AstBuilder::new();
        let mut info = TypeInfo::new();
        let ints = Type::slice(Type::int());

        let xs = b.ident("xs");
        info.record(xs.id, ints.clone());
        let f = pred(&mut info, &mut b, "f", Type::int());
        let filtered = b.method_call(xs, "filter", vec![f]);
        info.record(filtered.id, ints.clone());
        let reversed = b.method_call(filtered, "reverse", vec![]);
        info.record(reversed.id, ints.clone());
        let g = pred(&mut info, &mut b, "g", Type::int());
        let morphed = b.method_call(reversed, "morph", vec![g]);
        info.record(morphed.id, Type::slice(Type::bool()));

        let pipeline = build_pipeline(&morphed, &info, &GenerationConfig::new())
            .unwrap()
            .unwrap();
        assert_eq!(pipeline.ops(), vec![PipeOp::Reverse, PipeOp::Morph]);
        assert!(pipeline.body().to_string().starts_with("var morphed []bool\nfor i := range recv {"));
    }

    #[test_log::test]
    fn test_double_reversal_is_not_fused() {
        let mut b = AstBuilder::new();
        let mut info = TypeInfo::new();
        let ints = Type::slice(Type::int());

        let xs = b.ident("xs");
        info.record(xs.id, ints.clone());
        let once = b.method_call(xs, "reverse", vec![]);
        info.record(once.id, ints.clone());
        let twice = b.method_call(once, "reverse", vec![]);
        info.record(twice.id, ints.clone());

        let built = build_pipeline(&twice, &info, &GenerationConfig::new()).unwrap();
        assert!(built.is_none());
    }

    #[test_log::test]
    fn test_to_set_does_not_feed_map_ops() {
        let mut b = AstBuilder::new();
        let mut info = TypeInfo::new();
        let set = Type::map(Type::int(), Type::empty_struct());

        let xs = b.ident("xs");
        info.record(xs.id, Type::slice(Type::int()));
        let to_set = b.method_call(xs, "toSet", vec![]);
        info.record(to_set.id, set.clone());
        let keys = b.method_call(to_set, "keys", vec![]);
        info.record(keys.id, Type::slice(Type::int()));

        assert!(build_pipeline(&keys, &info, &GenerationConfig::new())
            .unwrap()
            .is_none());
    }

    #[test_log::test]
    fn test_unresolvable_link_is_an_error() {
        let mut b = AstBuilder::new();
        let mut info = TypeInfo::new();
        let ints = Type::slice(Type::int());

        let xs = b.ident("xs");
        info.record(xs.id, ints.clone());
        let f = b.ident("f"); // no recorded type
        let filtered = b.method_call(xs, "filter", vec![f]);
        info.record(filtered.id, ints.clone());
        let three = b.int(3);
        info.record(three.id, Type::int());
        let taken = b.method_call(filtered, "take", vec![three]);
        info.record(taken.id, ints.clone());

        assert!(build_pipeline(&taken, &info, &GenerationConfig::new()).is_err());
    }

    #[test_log::test]
    fn test_keys_then_filter() {
        let mut b = AstBuilder::new();
        let mut info = TypeInfo::new();

        let m = b.ident("m");
        info.record(m.id, Type::map(Type::string(), Type::int()));
        let keys = b.method_call(m, "keys", vec![]);
        info.record(keys.id, Type::slice(Type::string()));
        let f = pred(&mut info, &mut b, "short", Type::string());
        let filtered = b.method_call(keys, "filter", vec![f]);
        info.record(filtered.id, Type::slice(Type::string()));

        let pipeline = build_pipeline(&filtered, &info, &GenerationConfig::new())
            .unwrap()
            .unwrap();
        assert_eq!(
            crate::codegen::fragment::reindent(&pipeline.body().to_string()),
            "var filtered []string
for k1 := range recv {
\te2 := k1
\tif !__fgarg_0(e2) {
\t\tcontinue
\t}
\tfiltered = append(filtered, e2)
}
return filtered
"
        );
    }
}

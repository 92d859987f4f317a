mod common;

use common::{ints, only_decl, Fixture};
use fusegen::syntax::printer::print_expr;
use fusegen::types::Type;
use fusegen::GenerationConfig;

#[test_log::test]
fn test_filter_morph_fold_fuses_into_one_loop() {
    let mut fx = Fixture::new();
    let xs = fx.var("xs", ints());
    let gt3 = fx.pred("gt3", Type::int());
    let even = fx.pred("even", Type::int());
    let all = fx.func("all", vec![Type::bool(), Type::bool()], vec![Type::bool()]);
    let init = fx.var("true", Type::bool());

    let filtered = fx.method(xs, "filter", vec![gt3], ints());
    let morphed = fx.method(filtered, "morph", vec![even], Type::slice(Type::bool()));
    let mut call = fx.method(morphed, "fold", vec![all, init], Type::bool());

    let (registry, stats) = fx.specialize(&mut call, &GenerationConfig::new());

    assert_eq!(print_expr(&call), "__fgpipe_1(xs).pipeline(gt3, even, all, true)");
    assert_eq!(
        only_decl(&registry),
        "type __fgpipe_1 []int

func (recv __fgpipe_1) pipeline(__fgarg_0 func(int) bool, __fgarg_1 func(int) bool, __fgarg_2 func(bool, bool) bool, __fgarg_3 bool) bool {
\tacc := __fgarg_3
\tfor _, e1 := range recv {
\t\tif !__fgarg_0(e1) {
\t\t\tcontinue
\t\t}
\t\te2 := __fgarg_1(e1)
\t\tacc = __fgarg_2(acc, e2)
\t}
\treturn acc
}"
    );
    assert_eq!(stats.pipelines_fused, 1);
    assert_eq!(stats.links_fused, 3);
}

#[test_log::test]
fn test_map_filters_fuse_with_nil_guard() {
    let mut fx = Fixture::new();
    let m_ty = Type::map(Type::int(), Type::int());
    let m = fx.var("m", m_ty.clone());
    let key_pred = vec![Type::int(), Type::int()];
    let even_key = fx.func("evenKey", key_pred.clone(), vec![Type::bool()]);
    let even_key2 = fx.func("evenKey", key_pred, vec![Type::bool()]);

    let once = fx.method(m, "filter", vec![even_key], m_ty.clone());
    let mut call = fx.method(once, "filter", vec![even_key2], m_ty);

    let (registry, _) = fx.specialize(&mut call, &GenerationConfig::new());

    assert_eq!(print_expr(&call), "__fgpipe_1(m).pipeline(evenKey, evenKey)");
    assert_eq!(
        only_decl(&registry),
        "type __fgpipe_1 map[int]int

func (recv __fgpipe_1) pipeline(__fgarg_0 func(int, int) bool, __fgarg_1 func(int, int) bool) map[int]int {
\tif recv == nil {
\t\treturn nil
\t}
\tfiltered := make(map[int]int)
\tfor k1, e1 := range recv {
\t\tif !__fgarg_0(k1, e1) {
\t\t\tcontinue
\t\t}
\t\tif !__fgarg_1(k1, e1) {
\t\t\tcontinue
\t\t}
\t\tfiltered[k1] = e1
\t}
\treturn filtered
}"
    );
}

#[test_log::test]
fn test_tee_before_all_keeps_short_circuit() {
    let mut fx = Fixture::new();
    let xs = fx.var("xs", ints());
    let print = fx.func("print", vec![Type::int()], vec![]);
    let lt3 = fx.pred("lt3", Type::int());

    let teed = fx.method(xs, "tee", vec![print], ints());
    let mut call = fx.method(teed, "all", vec![lt3], Type::bool());

    let (registry, _) = fx.specialize(&mut call, &GenerationConfig::new());
    let code = only_decl(&registry);

    assert!(code.contains(
        "\tfor _, e1 := range recv {
\t\t__fgarg_0(e1)
\t\tif !__fgarg_1(e1) {
\t\t\treturn false
\t\t}
\t}
\treturn true
}"
    ));
    // the side effect runs only for elements `all` gets to examine
    let effect = code.find("__fgarg_0(e1)").unwrap();
    let exit = code.find("return false").unwrap();
    assert!(effect < exit);
    assert_eq!(print_expr(&call), "__fgpipe_1(xs).pipeline(print, lt3)");
}

#[test_log::test]
fn test_interior_reversal_splits_the_chain() {
    let mut fx = Fixture::new();
    let xs = fx.var("xs", ints());
    let f = fx.pred("f", Type::int());
    let g = fx.func("g", vec![Type::int()], vec![Type::string()]);

    let filtered = fx.method(xs, "filter", vec![f], ints());
    let reversed = fx.method(filtered, "reverse", vec![], ints());
    let mut call = fx.method(reversed, "morph", vec![g], Type::slice(Type::string()));

    let (registry, stats) = fx.specialize(&mut call, &GenerationConfig::new());

    assert_eq!(
        print_expr(&call),
        "__fgpipe_1(__fgtype_1_filter(xs).filter(f)).pipeline(g)"
    );
    assert_eq!(stats.pipelines_fused, 1);
    assert_eq!(stats.single_ops, 1);
    let pipeline = &registry.get("__fgpipe_1").unwrap().code;
    assert!(pipeline.contains("\tfor i := range recv {\n\t\te1 := recv[len(recv)-i-1]\n"));
}

#[test_log::test]
fn test_user_method_ends_the_chain() {
    let mut fx = Fixture::new();
    let mine = Type::named("mine", ints(), &["filter"]);
    let ys = fx.var("ys", mine.clone());
    let f = fx.pred("f", Type::int());
    let g = fx.func("g", vec![Type::int()], vec![Type::int()]);

    let filtered = fx.method(ys, "filter", vec![f], mine);
    let mut call = fx.method(filtered, "morph", vec![g], ints());

    let (_, stats) = fx.specialize(&mut call, &GenerationConfig::new());

    assert_eq!(print_expr(&call), "__fgtype_1_morph(ys.filter(f)).morph(g)");
    assert_eq!(stats.pipelines_fused, 0);
}

#[test_log::test]
fn test_projection_of_morphed_map_is_not_fused() {
    let mut fx = Fixture::new();
    let m_ty = Type::map(Type::string(), Type::int());
    let m = fx.var("m", m_ty.clone());
    let swap = fx.func(
        "swap",
        vec![Type::string(), Type::int()],
        vec![Type::int(), Type::string()],
    );
    let swapped_ty = Type::map(Type::int(), Type::string());

    let morphed = fx.method(m, "morph", vec![swap], swapped_ty);
    let mut call = fx.method(morphed, "keys", vec![], ints());

    let (registry, stats) = fx.specialize(&mut call, &GenerationConfig::new());

    assert_eq!(
        print_expr(&call),
        "__fgtype_1_keys(__fgtype_2_morph(m).morph(swap)).keys()"
    );
    assert_eq!(stats.pipelines_fused, 0);
    assert_eq!(registry.len(), 2);
}

#[test_log::test]
fn test_identical_chains_share_a_pipeline() {
    let mut fx = Fixture::new();
    let mut calls = Vec::new();
    for name in ["xs", "ys"] {
        let recv = fx.var(name, ints());
        let f = fx.pred("f", Type::int());
        let filtered = fx.method(recv, "filter", vec![f], ints());
        calls.push(fx.method(filtered, "reverse", vec![], ints()));
    }

    let config = GenerationConfig::new();
    let mut spec = fusegen::Specializer::new(&fx.info, &config);
    for call in &mut calls {
        fusegen::syntax::walk::VisitorMut::visit_expr(&mut spec, call);
    }
    let (registry, stats) = spec.finish();

    assert_eq!(print_expr(&calls[0]), "__fgpipe_1(xs).pipeline(f)");
    assert_eq!(print_expr(&calls[1]), "__fgpipe_1(ys).pipeline(f)");
    assert_eq!(registry.len(), 1);
    assert_eq!(stats.reused_declarations, 1);
}

#[test_log::test]
fn test_take_and_drop_counters_are_per_link() {
    let mut fx = Fixture::new();
    let xs = fx.var("xs", ints());
    let two = fx.int(2);
    let three = fx.int(3);

    let dropped = fx.method(xs, "drop", vec![two], ints());
    let mut call = fx.method(dropped, "take", vec![three], ints());

    let (registry, _) = fx.specialize(&mut call, &GenerationConfig::new());
    let code = only_decl(&registry);

    assert_eq!(print_expr(&call), "__fgpipe_1(xs).pipeline(2, 3)");
    assert!(code.contains("\tntaken__fgarg_1 := 0\n"));
    assert!(code.contains("\tfor _, e1 := range recv[__fgarg_0:] {\n"));
    assert!(code.contains("\t\tif ntaken__fgarg_1++; ntaken__fgarg_1 > __fgarg_1 {\n\t\t\tbreak\n"));
}

#[test_log::test]
fn test_fold_only_closes_a_pipeline() {
    let mut fx = Fixture::new();
    let nested = Type::slice(ints());
    let xss = fx.var("xss", nested.clone());
    let g = fx.func("g", vec![ints()], vec![ints()]);
    let concat = fx.func("concat", vec![ints(), ints()], vec![ints()]);
    let seed = fx.var("seed", ints());
    let even = fx.pred("even", Type::int());

    let morphed = fx.method(xss, "morph", vec![g], nested);
    let folded = fx.method(morphed, "fold", vec![concat, seed], ints());
    let mut call = fx.method(folded, "filter", vec![even], ints());

    let (registry, stats) = fx.specialize(&mut call, &GenerationConfig::new());

    assert_eq!(
        print_expr(&call),
        "__fgtype_1_filter(__fgpipe_1(xss).pipeline(g, concat, seed)).filter(even)"
    );
    assert_eq!(stats.pipelines_fused, 1);
    assert_eq!(stats.single_ops, 1);
    assert_eq!(
        registry.get("__fgpipe_1").unwrap().code,
        "type __fgpipe_1 [][]int

func (recv __fgpipe_1) pipeline(__fgarg_0 func([]int) []int, __fgarg_1 func([]int, []int) []int, __fgarg_2 []int) []int {
\tacc := __fgarg_2
\tfor _, e1 := range recv {
\t\te2 := __fgarg_0(e1)
\t\tacc = __fgarg_1(acc, e2)
\t}
\treturn acc
}"
    );
}

#[test_log::test]
fn test_terminal_link_feeding_another_is_declined() {
    let mut fx = Fixture::new();
    let xss = fx.var("xss", Type::slice(ints()));
    let concat = fx.func("concat", vec![ints(), ints()], vec![ints()]);
    let seed = fx.var("seed", ints());
    let even = fx.pred("even", Type::int());

    let folded = fx.method(xss, "fold", vec![concat, seed], ints());
    let mut call = fx.method(folded, "filter", vec![even], ints());

    let (registry, stats) = fx.specialize(&mut call, &GenerationConfig::new());

    assert_eq!(
        print_expr(&call),
        "__fgtype_1_filter(__fgtype_2_fold(xss).fold(concat, seed)).filter(even)"
    );
    assert_eq!(stats.pipelines_fused, 0);
    assert_eq!(registry.len(), 2);
}

#[test_log::test]
fn test_chained_drop_whiles_keep_separate_state() {
    let mut fx = Fixture::new();
    let xs = fx.var("xs", ints());
    let neg = fx.pred("neg", Type::int());
    let small = fx.pred("small", Type::int());

    let once = fx.method(xs, "dropWhile", vec![neg], ints());
    let mut call = fx.method(once, "dropWhile", vec![small], ints());

    let (registry, _) = fx.specialize(&mut call, &GenerationConfig::new());

    assert_eq!(print_expr(&call), "__fgpipe_1(xs).pipeline(neg, small)");
    assert_eq!(
        only_decl(&registry),
        "type __fgpipe_1 []int

func (recv __fgpipe_1) pipeline(__fgarg_0 func(int) bool, __fgarg_1 func(int) bool) []int {
\tvar undropped []int
\tstilldropping__fgarg_0 := true
\tstilldropping__fgarg_1 := true
\tfor _, e1 := range recv {
\t\tstilldropping__fgarg_0 = stilldropping__fgarg_0 && __fgarg_0(e1)
\t\tif stilldropping__fgarg_0 {
\t\t\tcontinue
\t\t}
\t\tstilldropping__fgarg_1 = stilldropping__fgarg_1 && __fgarg_1(e1)
\t\tif stilldropping__fgarg_1 {
\t\t\tcontinue
\t\t}
\t\tundropped = append(undropped, e1)
\t}
\treturn undropped
}"
    );
}

#[test_log::test]
fn test_take_while_then_seedless_fold() {
    let mut fx = Fixture::new();
    let xs = fx.var("xs", ints());
    let pos = fx.pred("pos", Type::int());
    let add = fx.func("add", vec![Type::int(), Type::int()], vec![Type::int()]);

    let taken = fx.method(xs, "takeWhile", vec![pos], ints());
    let mut call = fx.method(taken, "fold", vec![add], Type::int());

    let (registry, _) = fx.specialize(&mut call, &GenerationConfig::new());

    assert_eq!(print_expr(&call), "__fgpipe_1(xs).pipeline(pos, add)");
    assert_eq!(
        only_decl(&registry),
        "type __fgpipe_1 []int

func (recv __fgpipe_1) pipeline(__fgarg_0 func(int) bool, __fgarg_1 func(int, int) int) int {
\tvar acc int
\tvar accset bool
\tfor _, e1 := range recv {
\t\tif !__fgarg_0(e1) {
\t\t\tbreak
\t\t}
\t\tif !accset {
\t\t\tacc = e1
\t\t\taccset = true
\t\t} else {
\t\t\tacc = __fgarg_1(acc, e1)
\t\t}
\t}
\tif !accset {
\t\tpanic(\"fold of empty slice\")
\t}
\treturn acc
}"
    );
}

#[test_log::test]
fn test_any_after_morph() {
    let mut fx = Fixture::new();
    let xs = fx.var("xs", ints());
    let name = fx.func("name", vec![Type::int()], vec![Type::string()]);
    let blank = fx.pred("blank", Type::string());

    let named = fx.method(xs, "morph", vec![name], Type::slice(Type::string()));
    let mut call = fx.method(named, "any", vec![blank], Type::bool());

    let (registry, _) = fx.specialize(&mut call, &GenerationConfig::new());

    assert_eq!(
        only_decl(&registry),
        "type __fgpipe_1 []int

func (recv __fgpipe_1) pipeline(__fgarg_0 func(int) string, __fgarg_1 func(string) bool) bool {
\tfor _, e1 := range recv {
\t\te2 := __fgarg_0(e1)
\t\tif __fgarg_1(e2) {
\t\t\treturn true
\t\t}
\t}
\treturn false
}"
    );
}

#[test_log::test]
fn test_contains_after_filter() {
    let mut fx = Fixture::new();
    let xs = fx.var("xs", ints());
    let f = fx.pred("f", Type::int());
    let x = fx.var("x", Type::int());

    let filtered = fx.method(xs, "filter", vec![f], ints());
    let mut call = fx.method(filtered, "contains", vec![x], Type::bool());

    let (registry, _) = fx.specialize(&mut call, &GenerationConfig::new());

    assert_eq!(print_expr(&call), "__fgpipe_1(xs).pipeline(f, x)");
    assert_eq!(
        only_decl(&registry),
        "type __fgpipe_1 []int

func (recv __fgpipe_1) pipeline(__fgarg_0 func(int) bool, __fgarg_1 int) bool {
\tfor _, e1 := range recv {
\t\tif !__fgarg_0(e1) {
\t\t\tcontinue
\t\t}
\t\tif e1 == __fgarg_1 {
\t\t\treturn true
\t\t}
\t}
\treturn false
}"
    );
}

#[test_log::test]
fn test_contains_of_incomparable_elements_compares_with_nil() {
    let mut fx = Fixture::new();
    let thunk = Type::func(vec![], vec![]);
    let thunks = Type::slice(thunk.clone());
    let fs = fx.var("fs", thunks.clone());
    let ready = fx.pred("ready", thunk.clone());
    let nil = fx.var("nil", thunk);

    let filtered = fx.method(fs, "filter", vec![ready], thunks);
    let mut call = fx.method(filtered, "contains", vec![nil], Type::bool());

    let (registry, _) = fx.specialize(&mut call, &GenerationConfig::new());
    let code = only_decl(&registry);

    assert!(code.contains(
        "pipeline(__fgarg_0 func(func()) bool, __fgarg_1 func()) bool {\n"
    ));
    assert!(code.contains("\t\tif e1 == nil {\n\t\t\treturn true\n\t\t}\n"));
}

#[test_log::test]
fn test_foreach_has_no_result() {
    let mut fx = Fixture::new();
    let xs = fx.var("xs", ints());
    let f = fx.pred("f", Type::int());
    let print = fx.func("print", vec![Type::int()], vec![]);

    let filtered = fx.method(xs, "filter", vec![f], ints());
    let mut call = fx.method(filtered, "foreach", vec![print], Type::Tuple(vec![]));

    let (registry, _) = fx.specialize(&mut call, &GenerationConfig::new());

    assert_eq!(
        only_decl(&registry),
        "type __fgpipe_1 []int

func (recv __fgpipe_1) pipeline(__fgarg_0 func(int) bool, __fgarg_1 func(int)) {
\tfor _, e1 := range recv {
\t\tif !__fgarg_0(e1) {
\t\t\tcontinue
\t\t}
\t\t__fgarg_1(e1)
\t}
}"
    );
}

#[test_log::test]
fn test_to_set_closes_a_pipeline() {
    let mut fx = Fixture::new();
    let xs = fx.var("xs", ints());
    let name = fx.func("name", vec![Type::int()], vec![Type::string()]);

    let named = fx.method(xs, "morph", vec![name], Type::slice(Type::string()));
    let set_ty = Type::map(Type::string(), Type::empty_struct());
    let mut call = fx.method(named, "toSet", vec![], set_ty);

    let (registry, _) = fx.specialize(&mut call, &GenerationConfig::new());

    assert_eq!(print_expr(&call), "__fgpipe_1(xs).pipeline(name)");
    assert_eq!(
        only_decl(&registry),
        "type __fgpipe_1 []int

func (recv __fgpipe_1) pipeline(__fgarg_0 func(int) string) map[string]struct{} {
\tset := make(map[string]struct{})
\tfor _, e1 := range recv {
\t\te2 := __fgarg_0(e1)
\t\tset[e2] = struct{}{}
\t}
\treturn set
}"
    );
}

#[test_log::test]
fn test_map_morph_then_filter_rebinds_key_and_element() {
    let mut fx = Fixture::new();
    let m = fx.var("m", Type::map(Type::string(), Type::int()));
    let swap = fx.func(
        "swap",
        vec![Type::string(), Type::int()],
        vec![Type::int(), Type::string()],
    );
    let keep = fx.func("keep", vec![Type::int(), Type::string()], vec![Type::bool()]);
    let swapped_ty = Type::map(Type::int(), Type::string());

    let swapped = fx.method(m, "morph", vec![swap], swapped_ty.clone());
    let mut call = fx.method(swapped, "filter", vec![keep], swapped_ty);

    let (registry, _) = fx.specialize(&mut call, &GenerationConfig::new());
    let code = only_decl(&registry);

    assert_eq!(print_expr(&call), "__fgpipe_1(m).pipeline(swap, keep)");
    assert!(code.starts_with("type __fgpipe_1 map[string]int\n"));
    assert!(code.ends_with(
        "map[int]string {
\tif recv == nil {
\t\treturn nil
\t}
\tfiltered := make(map[int]string)
\tfor k1, e1 := range recv {
\t\tk2, e2 := __fgarg_0(k1, e1)
\t\tif !__fgarg_1(k2, e2) {
\t\t\tcontinue
\t\t}
\t\tfiltered[k2] = e2
\t}
\treturn filtered
}"
    ));
}

#[test_log::test]
fn test_elems_after_map_filter() {
    let mut fx = Fixture::new();
    let m_ty = Type::map(Type::string(), Type::int());
    let m = fx.var("m", m_ty.clone());
    let keep = fx.func("keep", vec![Type::string(), Type::int()], vec![Type::bool()]);

    let filtered = fx.method(m, "filter", vec![keep], m_ty);
    let mut call = fx.method(filtered, "elems", vec![], ints());

    let (registry, _) = fx.specialize(&mut call, &GenerationConfig::new());

    assert_eq!(
        only_decl(&registry),
        "type __fgpipe_1 map[string]int

func (recv __fgpipe_1) pipeline(__fgarg_0 func(string, int) bool) []int {
\tvar elems []int
\tfor k1, e1 := range recv {
\t\tif !__fgarg_0(k1, e1) {
\t\t\tcontinue
\t\t}
\t\telems = append(elems, e1)
\t}
\treturn elems
}"
    );
}

#[test_log::test]
fn test_empty_results_are_nil_with_and_without_fusion() {
    let build = |fx: &mut Fixture| {
        let xs = fx.var("xs", ints());
        let f = fx.pred("f", Type::int());
        let name = fx.func("name", vec![Type::int()], vec![Type::string()]);
        let filtered = fx.method(xs, "filter", vec![f], ints());
        fx.method(filtered, "morph", vec![name], Type::slice(Type::string()))
    };

    let mut fx = Fixture::new();
    let mut fused = build(&mut fx);
    let mut unfused = build(&mut fx);

    let (fused_decls, _) = fx.specialize(&mut fused, &GenerationConfig::new());
    let (unfused_decls, _) =
        fx.specialize(&mut unfused, &GenerationConfig::new().with_fusion(false));

    let fused_code = only_decl(&fused_decls);
    assert!(fused_code.contains("\tvar morphed []string\n"));
    assert!(fused_code.ends_with("\treturn morphed\n}"));

    assert_eq!(unfused_decls.len(), 2);
    let morph = &unfused_decls.get("__fgtype_1_morph").unwrap().code;
    assert!(morph.contains("\tif len(xs) == 0 {\n\t\treturn nil\n\t}\n"));
    let filter = &unfused_decls.get("__fgtype_2_filter").unwrap().code;
    assert!(filter.contains("\tvar filtered []int\n"));
}

//! Single-operation generators
//!
//! Every builtin call that is not part of a fused pipeline gets its own
//! declaration: a free function for `max`/`min`/`merge`/`not`/`zip`, or a
//! named receiver type carrying exactly one method for the slice and map
//! methods. The call is then rewritten to use it.

use log::trace;

use super::fragment::Fragment;
use super::names::{DeclKind, NameAllocator};
use super::rewrite::CallRewrite;
use super::templates::{receiver_type, ReceiverKind, TypeResolver};
use super::{name_declaration, CallSite, Generated};
use crate::error::{GenError, Result};
use crate::syntax::ast::Expr;
use crate::types::{Signature, Type, TypeOracle};

/// Builtin functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuncOp {
    Max,
    Min,
    Merge,
    Not,
    Zip,
}

impl FuncOp {
    pub fn lookup(name: &str) -> Option<FuncOp> {
        match name {
            "max" => Some(FuncOp::Max),
            "min" => Some(FuncOp::Min),
            "merge" => Some(FuncOp::Merge),
            "not" => Some(FuncOp::Not),
            "zip" => Some(FuncOp::Zip),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FuncOp::Max => "max",
            FuncOp::Min => "min",
            FuncOp::Merge => "merge",
            FuncOp::Not => "not",
            FuncOp::Zip => "zip",
        }
    }

    fn check_arity(&self, found: usize) -> Result<()> {
        let expected = match self {
            FuncOp::Max | FuncOp::Min => 2,
            FuncOp::Not => 1,
            FuncOp::Zip => 3,
            FuncOp::Merge if found >= 1 => return Ok(()),
            FuncOp::Merge => 1,
        };
        if found != expected {
            return Err(GenError::ArityMismatch {
                op: self.name(),
                expected,
                found,
            });
        }
        Ok(())
    }

    fn source(&self) -> &'static str {
        match self {
            FuncOp::Max => MAX,
            FuncOp::Min => MIN,
            FuncOp::Merge => MERGE,
            FuncOp::Not => NOT,
            FuncOp::Zip => ZIP,
        }
    }

    fn resolve(&self, args: &[Expr], oracle: &dyn TypeOracle) -> Result<Vec<Type>> {
        match self {
            FuncOp::Max | FuncOp::Min => {
                let ty = arg_type(args, 0, oracle)?;
                if !ty.ordered() {
                    crate::bail_shape!("ordered type", ty);
                }
                Ok(vec![ty.clone()])
            }
            FuncOp::Merge => {
                // nil arguments carry no map type; the first typed one decides
                let found = args
                    .iter()
                    .filter_map(|arg| oracle.type_of(arg.id))
                    .find_map(|ty| ty.map_key_elem());
                match found {
                    Some((key, elem)) => Ok(vec![key.clone(), elem.clone()]),
                    None => crate::bail_shape!("map argument", "only untyped nil"),
                }
            }
            FuncOp::Not => {
                let ty = arg_type(args, 0, oracle)?;
                match ty.signature() {
                    Some(sig) if sig.results == [Type::bool()] => Ok(vec![ty.clone()]),
                    _ => crate::bail_shape!("func(...) bool", ty),
                }
            }
            FuncOp::Zip => {
                let ty = arg_type(args, 0, oracle)?;
                let Some(sig) = ty.signature() else {
                    crate::bail_shape!("function signature", ty);
                };
                match (sig.param(0), sig.param(1), sig.result(0)) {
                    (Some(t), Some(u), Some(v)) => Ok(vec![t.clone(), u.clone(), v.clone()]),
                    _ => crate::bail_shape!("func(T, U) V", ty),
                }
            }
        }
    }
}

/// Builtin methods of slices and maps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodOp {
    All,
    Any,
    Contains,
    /// `contains` over an element type without `==`; the argument is nil
    ContainsNil,
    ContainsMap,
    Drop,
    DropWhile,
    Elems,
    Filter,
    FilterMap,
    Fold,
    /// `fold` without a seed
    Fold1,
    Foreach,
    Keys,
    Morph,
    MorphMap,
    Reverse,
    /// `sort` by the natural order
    Sort,
    /// `sort` with a less function
    SortBy,
    Take,
    TakeWhile,
    Tee,
    ToMap,
    ToSet,
    Uniq,
}

impl MethodOp {
    /// Find the generator for `recv.method(args)`
    pub fn lookup(method: &str, recv: &Type, nargs: usize) -> Option<MethodOp> {
        let op = match (ReceiverKind::of(recv)?, method) {
            (ReceiverKind::Sequence, "all") => MethodOp::All,
            (ReceiverKind::Sequence, "any") => MethodOp::Any,
            (ReceiverKind::Sequence, "contains") => match recv.slice_elem() {
                Some(elem) if elem.comparable() => MethodOp::Contains,
                _ => MethodOp::ContainsNil,
            },
            (ReceiverKind::Sequence, "drop") => MethodOp::Drop,
            (ReceiverKind::Sequence, "dropWhile") => MethodOp::DropWhile,
            (ReceiverKind::Sequence, "filter") => MethodOp::Filter,
            (ReceiverKind::Sequence, "fold") if nargs == 1 => MethodOp::Fold1,
            (ReceiverKind::Sequence, "fold") => MethodOp::Fold,
            (ReceiverKind::Sequence, "foreach") => MethodOp::Foreach,
            (ReceiverKind::Sequence, "morph") => MethodOp::Morph,
            (ReceiverKind::Sequence, "reverse") => MethodOp::Reverse,
            (ReceiverKind::Sequence, "sort") if nargs == 0 => MethodOp::Sort,
            (ReceiverKind::Sequence, "sort") => MethodOp::SortBy,
            (ReceiverKind::Sequence, "take") => MethodOp::Take,
            (ReceiverKind::Sequence, "takeWhile") => MethodOp::TakeWhile,
            (ReceiverKind::Sequence, "tee") => MethodOp::Tee,
            (ReceiverKind::Sequence, "toMap") => MethodOp::ToMap,
            (ReceiverKind::Sequence, "toSet") => MethodOp::ToSet,
            (ReceiverKind::Sequence, "uniq") => MethodOp::Uniq,
            (ReceiverKind::Mapping, "contains") => MethodOp::ContainsMap,
            (ReceiverKind::Mapping, "elems") => MethodOp::Elems,
            (ReceiverKind::Mapping, "filter") => MethodOp::FilterMap,
            (ReceiverKind::Mapping, "keys") => MethodOp::Keys,
            (ReceiverKind::Mapping, "morph") => MethodOp::MorphMap,
            _ => return None,
        };
        Some(op)
    }

    /// Name of the generated method, which is the builtin's name
    pub fn name(&self) -> &'static str {
        match self {
            MethodOp::All => "all",
            MethodOp::Any => "any",
            MethodOp::Contains | MethodOp::ContainsNil | MethodOp::ContainsMap => "contains",
            MethodOp::Drop => "drop",
            MethodOp::DropWhile => "dropWhile",
            MethodOp::Elems => "elems",
            MethodOp::Filter | MethodOp::FilterMap => "filter",
            MethodOp::Fold | MethodOp::Fold1 => "fold",
            MethodOp::Foreach => "foreach",
            MethodOp::Keys => "keys",
            MethodOp::Morph | MethodOp::MorphMap => "morph",
            MethodOp::Reverse => "reverse",
            MethodOp::Sort | MethodOp::SortBy => "sort",
            MethodOp::Take => "take",
            MethodOp::TakeWhile => "takeWhile",
            MethodOp::Tee => "tee",
            MethodOp::ToMap => "toMap",
            MethodOp::ToSet => "toSet",
            MethodOp::Uniq => "uniq",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            MethodOp::Elems
            | MethodOp::Keys
            | MethodOp::Reverse
            | MethodOp::Sort
            | MethodOp::ToSet
            | MethodOp::Uniq => 0,
            MethodOp::Fold => 2,
            _ => 1,
        }
    }

    /// Imports the generated declaration depends on
    pub fn imports(&self) -> &'static [&'static str] {
        match self {
            MethodOp::Sort | MethodOp::SortBy => &["sort"],
            _ => &[],
        }
    }

    fn resolver(&self) -> TypeResolver {
        match self {
            MethodOp::ContainsMap
            | MethodOp::Elems
            | MethodOp::FilterMap
            | MethodOp::Keys => TypeResolver::MapKeyElem,
            MethodOp::Fold => TypeResolver::FoldSeeded,
            MethodOp::Fold1 => TypeResolver::FoldFirst,
            MethodOp::Morph | MethodOp::ToMap => TypeResolver::MorphSlice,
            MethodOp::MorphMap => TypeResolver::MorphMap,
            _ => TypeResolver::SliceElem,
        }
    }

    /// Element requirements the type checker leaves to the generator
    fn check_element(&self, site: &CallSite, oracle: &dyn TypeOracle) -> Result<()> {
        let needs = match self {
            MethodOp::Sort => "ordered element",
            MethodOp::Uniq => "comparable element",
            _ => return Ok(()),
        };
        let recv = receiver_type(site, oracle)?;
        let ok = match recv.slice_elem() {
            Some(elem) if *self == MethodOp::Sort => elem.ordered(),
            Some(elem) => elem.comparable(),
            None => false,
        };
        if !ok {
            crate::bail_shape!(needs, recv);
        }
        Ok(())
    }

    fn source(&self) -> &'static str {
        match self {
            MethodOp::All => ALL,
            MethodOp::Any => ANY,
            MethodOp::Contains => CONTAINS,
            MethodOp::ContainsNil => CONTAINS_NIL,
            MethodOp::ContainsMap => CONTAINS_MAP,
            MethodOp::Drop => DROP,
            MethodOp::DropWhile => DROP_WHILE,
            MethodOp::Elems => ELEMS,
            MethodOp::Filter => FILTER,
            MethodOp::FilterMap => FILTER_MAP,
            MethodOp::Fold => FOLD,
            MethodOp::Fold1 => FOLD1,
            MethodOp::Foreach => FOREACH,
            MethodOp::Keys => KEYS,
            MethodOp::Morph => MORPH,
            MethodOp::MorphMap => MORPH_MAP,
            MethodOp::Reverse => REVERSE,
            MethodOp::Sort => SORT,
            MethodOp::SortBy => SORT_BY,
            MethodOp::Take => TAKE,
            MethodOp::TakeWhile => TAKE_WHILE,
            MethodOp::Tee => TEE,
            MethodOp::ToMap => TO_MAP,
            MethodOp::ToSet => TO_SET,
            MethodOp::Uniq => UNIQ,
        }
    }
}

fn arg_type<'o>(args: &[Expr], i: usize, oracle: &'o dyn TypeOracle) -> Result<&'o Type> {
    let arg = args.get(i).ok_or(GenError::ArityMismatch {
        op: "argument",
        expected: i + 1,
        found: args.len(),
    })?;
    oracle.type_of(arg.id).ok_or(GenError::Unresolved {
        expr: arg.id,
        what: "argument",
    })
}

fn instantiate(op: &'static str, source: &str, types: &[Type]) -> Result<Fragment> {
    let mut code = Fragment::parse(source);
    code.substitute_types(op, types)?;
    Ok(code)
}

/// Generate the function behind a builtin function call
pub fn generate_func(
    op: FuncOp,
    args: &[Expr],
    oracle: &dyn TypeOracle,
    names: &mut NameAllocator,
) -> Result<Generated> {
    op.check_arity(args.len())?;
    let types = op.resolve(args, oracle)?;
    let mut code = instantiate(op.name(), op.source(), &types)?;

    if op == FuncOp::Not {
        let sig = types[0].signature().ok_or_else(|| GenError::ShapeMismatch {
            expected: "function signature",
            found: types[0].to_string(),
        })?;
        let (params, call_args) = forwarded_params(sig);
        code.fill("params", &params);
        code.fill("args", &call_args);
    }

    let (name, code) = name_declaration(names, DeclKind::Func, op.name(), code);
    trace!("{} -> {}", op.name(), name.name());
    Ok(Generated {
        rewrite: CallRewrite::Func {
            name: name.name().to_string(),
        },
        name,
        code,
        imports: &[],
    })
}

/// Generate the receiver type and method behind a builtin method call
pub fn generate_method(
    op: MethodOp,
    site: &CallSite,
    oracle: &dyn TypeOracle,
    names: &mut NameAllocator,
) -> Result<Generated> {
    if site.args.len() != op.arity() {
        return Err(GenError::ArityMismatch {
            op: op.name(),
            expected: op.arity(),
            found: site.args.len(),
        });
    }
    op.check_element(site, oracle)?;
    let types = op.resolver().resolve(site, oracle)?;
    let code = instantiate(op.name(), op.source(), &types)?;

    let (name, code) = name_declaration(names, DeclKind::Method, op.name(), code);
    trace!("{} -> {}", op.name(), name.name());
    Ok(Generated {
        rewrite: CallRewrite::Method {
            type_name: name.name().to_string(),
        },
        name,
        code,
        imports: op.imports(),
    })
}

/// Parameter list and forwarding argument list for a wrapper with `sig`
fn forwarded_params(sig: &Signature) -> (String, String) {
    let mut params = Vec::with_capacity(sig.params.len());
    let mut args = Vec::with_capacity(sig.params.len());
    for (i, ty) in sig.params.iter().enumerate() {
        let variadic = sig.variadic && i + 1 == sig.params.len();
        match (variadic, ty) {
            (true, Type::Slice(elem)) => {
                params.push(format!("p{} ...{}", i, elem));
                args.push(format!("p{}...", i));
            }
            _ => {
                params.push(format!("p{} {}", i, ty));
                args.push(format!("p{}", i));
            }
        }
    }
    (params.join(", "), args.join(", "))
}

const MAX: &str = "
func #name(a, b #T) #T {
    if a > b {
        return a
    }
    return b
}";

const MIN: &str = "
func #name(a, b #T) #T {
    if a < b {
        return a
    }
    return b
}";

const MERGE: &str = "
func #name(recv map[#T]#U, rest ...map[#T]#U) map[#T]#U {
    if len(rest) == 0 {
        return recv
    } else if recv == nil {
        recv = make(map[#T]#U, len(rest[0]))
    }
    for _, m := range rest {
        for k, v := range m {
            recv[k] = v
        }
    }
    return recv
}";

const NOT: &str = "
func #name(fn #T) #T {
    return func(#params) bool {
        return !fn(#args)
    }
}";

const ZIP: &str = "
func #name(fn func(#T, #U) #V, a []#T, b []#U) []#V {
    n := len(a)
    if len(b) < n {
        n = len(b)
    }
    zipped := make([]#V, n)
    for i := range zipped {
        zipped[i] = fn(a[i], b[i])
    }
    return zipped
}";

// Slice results are nil when empty, like the fused loops build them.
const ALL: &str = "
type #name []#T

func (xs #name) all(pred func(#T) bool) bool {
    for _, x := range xs {
        if !pred(x) {
            return false
        }
    }
    return true
}";

const ANY: &str = "
type #name []#T

func (xs #name) any(pred func(#T) bool) bool {
    for _, x := range xs {
        if pred(x) {
            return true
        }
    }
    return false
}";

const CONTAINS: &str = "
type #name []#T

func (xs #name) contains(e #T) bool {
    for _, x := range xs {
        if x == e {
            return true
        }
    }
    return false
}";

const CONTAINS_NIL: &str = "
type #name []#T

func (xs #name) contains(_ #T) bool {
    for _, x := range xs {
        if x == nil {
            return true
        }
    }
    return false
}";

const CONTAINS_MAP: &str = "
type #name map[#T]#U

func (m #name) contains(k #T) bool {
    _, ok := m[k]
    return ok
}";

const DROP: &str = "
type #name []#T

func (xs #name) drop(n int) []#T {
    if n < 0 {
        n = 0
    } else if n > len(xs) {
        n = len(xs)
    }
    return append([]#T(nil), xs[n:]...)
}";

const DROP_WHILE: &str = "
type #name []#T

func (xs #name) dropWhile(pred func(#T) bool) []#T {
    i := 0
    for i < len(xs) && pred(xs[i]) {
        i++
    }
    return append([]#T(nil), xs[i:]...)
}";

const ELEMS: &str = "
type #name map[#T]#U

func (m #name) elems() []#U {
    if len(m) == 0 {
        return nil
    }
    es := make([]#U, 0, len(m))
    for _, e := range m {
        es = append(es, e)
    }
    return es
}";

const FILTER: &str = "
type #name []#T

func (xs #name) filter(pred func(#T) bool) []#T {
    var filtered []#T
    for _, x := range xs {
        if pred(x) {
            filtered = append(filtered, x)
        }
    }
    return filtered
}";

const FILTER_MAP: &str = "
type #name map[#T]#U

func (m #name) filter(pred func(#T, #U) bool) map[#T]#U {
    if m == nil {
        return nil
    }
    filtered := make(map[#T]#U)
    for k, e := range m {
        if pred(k, e) {
            filtered[k] = e
        }
    }
    return filtered
}";

const FOLD: &str = "
type #name []#T

func (xs #name) fold(fn func(#U, #T) #U, acc #U) #U {
    for _, x := range xs {
        acc = fn(acc, x)
    }
    return acc
}";

const FOLD1: &str = "
type #name []#T

func (xs #name) fold(fn func(#T, #T) #T) #T {
    if len(xs) == 0 {
        panic(\"fold of empty slice\")
    }
    acc := xs[0]
    for _, x := range xs[1:] {
        acc = fn(acc, x)
    }
    return acc
}";

const FOREACH: &str = "
type #name []#T

func (xs #name) foreach(fn func(#T)) {
    for _, x := range xs {
        fn(x)
    }
}";

const KEYS: &str = "
type #name map[#T]#U

func (m #name) keys() []#T {
    if len(m) == 0 {
        return nil
    }
    ks := make([]#T, 0, len(m))
    for k := range m {
        ks = append(ks, k)
    }
    return ks
}";

const MORPH: &str = "
type #name []#T

func (xs #name) morph(fn func(#T) #U) []#U {
    if len(xs) == 0 {
        return nil
    }
    morphed := make([]#U, len(xs))
    for i := range xs {
        morphed[i] = fn(xs[i])
    }
    return morphed
}";

const MORPH_MAP: &str = "
type #name map[#T]#U

func (m #name) morph(fn func(#T, #U) (#V, #W)) map[#V]#W {
    if m == nil {
        return nil
    }
    morphed := make(map[#V]#W, len(m))
    for k, e := range m {
        mk, me := fn(k, e)
        morphed[mk] = me
    }
    return morphed
}";

const REVERSE: &str = "
type #name []#T

func (xs #name) reverse() []#T {
    if len(xs) == 0 {
        return nil
    }
    reversed := make([]#T, len(xs))
    for i := range xs {
        reversed[i] = xs[len(xs)-1-i]
    }
    return reversed
}";

const SORT: &str = "
type #name []#T

func (xs #name) sort() []#T {
    sorted := append([]#T(nil), xs...)
    sort.Slice(sorted, func(i, j int) bool {
        return sorted[i] < sorted[j]
    })
    return sorted
}";

const SORT_BY: &str = "
type #name []#T

func (xs #name) sort(less func(#T, #T) bool) []#T {
    sorted := append([]#T(nil), xs...)
    sort.Slice(sorted, func(i, j int) bool {
        return less(sorted[i], sorted[j])
    })
    return sorted
}";

const TAKE: &str = "
type #name []#T

func (xs #name) take(n int) []#T {
    if n < 0 {
        n = 0
    } else if n > len(xs) {
        n = len(xs)
    }
    return append([]#T(nil), xs[:n]...)
}";

const TAKE_WHILE: &str = "
type #name []#T

func (xs #name) takeWhile(pred func(#T) bool) []#T {
    i := 0
    for i < len(xs) && pred(xs[i]) {
        i++
    }
    return append([]#T(nil), xs[:i]...)
}";

const TEE: &str = "
type #name []#T

func (xs #name) tee(fn func(#T)) []#T {
    var teed []#T
    for _, x := range xs {
        fn(x)
        teed = append(teed, x)
    }
    return teed
}";

const TO_MAP: &str = "
type #name []#T

func (xs #name) toMap(fn func(#T) #U) map[#T]#U {
    m := make(map[#T]#U, len(xs))
    for _, x := range xs {
        m[x] = fn(x)
    }
    return m
}";

const TO_SET: &str = "
type #name []#T

func (xs #name) toSet() map[#T]struct{} {
    set := make(map[#T]struct{})
    for _, x := range xs {
        set[x] = struct{}{}
    }
    return set
}";

// adjacent duplicates only
const UNIQ: &str = "
type #name []#T

func (xs #name) uniq() []#T {
    if len(xs) == 0 {
        return nil
    }
    u := []#T{xs[0]}
    for _, x := range xs[1:] {
        if x != u[len(u)-1] {
            u = append(u, x)
        }
    }
    return u
}";

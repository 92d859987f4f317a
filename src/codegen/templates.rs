//! # Transformation Templates
//!
//! One template per fusible operation and receiver kind. A template is split
//! into sections that the assembler composes into a single loop:
//!
//! ```text
//! outline   (last link)   initializes the result and returns it
//! setup     (every link)  declarations needed by stateful steps
//! iter      (first link)  the loop over the receiver, binds #e (and #k)
//! step      (every link)  the per-element work, may bind #+e / #+k,
//!                         `continue` or `break`
//! cons      (last link)   folds the final element into the result
//! ```
//!
//! Every section except `cons` has exactly one `#next` insertion point;
//! `cons` has none. Absent `setup`/`step` sections forward to `#next`.
//!
//! Registry templates are static and never mutated; [`Template::specify`]
//! produces a private, fully concrete copy for one call site.

use log::trace;

use super::fragment::Fragment;
use super::CallSite;
use crate::error::{GenError, Result};
use crate::types::{Signature, Type, TypeOracle};

/// Shape of a builtin's receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverKind {
    Sequence,
    Mapping,
}

impl ReceiverKind {
    /// Classify a type by its underlying shape
    pub fn of(ty: &Type) -> Option<ReceiverKind> {
        match ty.underlying() {
            Type::Slice(_) => Some(ReceiverKind::Sequence),
            Type::Map { .. } => Some(ReceiverKind::Mapping),
            _ => None,
        }
    }
}

/// Fusible operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipeOp {
    All,
    Any,
    Contains,
    ContainsNil,
    Drop,
    DropWhile,
    Filter,
    Fold,
    Fold1,
    Foreach,
    Morph,
    Reverse,
    Take,
    TakeWhile,
    Tee,
    ToSet,
    Elems,
    FilterMap,
    Keys,
    MorphMap,
}

impl PipeOp {
    pub const CATALOGUE: [PipeOp; 20] = [
        PipeOp::All,
        PipeOp::Any,
        PipeOp::Contains,
        PipeOp::ContainsNil,
        PipeOp::Drop,
        PipeOp::DropWhile,
        PipeOp::Filter,
        PipeOp::Fold,
        PipeOp::Fold1,
        PipeOp::Foreach,
        PipeOp::Morph,
        PipeOp::Reverse,
        PipeOp::Take,
        PipeOp::TakeWhile,
        PipeOp::Tee,
        PipeOp::ToSet,
        PipeOp::Elems,
        PipeOp::FilterMap,
        PipeOp::Keys,
        PipeOp::MorphMap,
    ];

    /// Find the template for a method call. `fold` with a single argument
    /// is the seedless variant; the choice is made on argument count alone.
    pub fn lookup(method: &str, kind: ReceiverKind, nargs: usize) -> Option<PipeOp> {
        let op = match (kind, method) {
            (ReceiverKind::Sequence, "all") => PipeOp::All,
            (ReceiverKind::Sequence, "any") => PipeOp::Any,
            (ReceiverKind::Sequence, "contains") => PipeOp::Contains,
            (ReceiverKind::Sequence, "drop") => PipeOp::Drop,
            (ReceiverKind::Sequence, "dropWhile") => PipeOp::DropWhile,
            (ReceiverKind::Sequence, "filter") => PipeOp::Filter,
            (ReceiverKind::Sequence, "fold") if nargs == 1 => PipeOp::Fold1,
            (ReceiverKind::Sequence, "fold") => PipeOp::Fold,
            (ReceiverKind::Sequence, "foreach") => PipeOp::Foreach,
            (ReceiverKind::Sequence, "morph") => PipeOp::Morph,
            (ReceiverKind::Sequence, "reverse") => PipeOp::Reverse,
            (ReceiverKind::Sequence, "take") => PipeOp::Take,
            (ReceiverKind::Sequence, "takeWhile") => PipeOp::TakeWhile,
            (ReceiverKind::Sequence, "tee") => PipeOp::Tee,
            (ReceiverKind::Sequence, "toSet") => PipeOp::ToSet,
            (ReceiverKind::Mapping, "elems") => PipeOp::Elems,
            (ReceiverKind::Mapping, "filter") => PipeOp::FilterMap,
            (ReceiverKind::Mapping, "keys") => PipeOp::Keys,
            (ReceiverKind::Mapping, "morph") => PipeOp::MorphMap,
            _ => return None,
        };
        Some(op)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PipeOp::All => "all",
            PipeOp::Any => "any",
            PipeOp::Contains => "contains",
            PipeOp::ContainsNil => "containsNil",
            PipeOp::Drop => "drop",
            PipeOp::DropWhile => "dropWhile",
            PipeOp::Filter => "filter",
            PipeOp::Fold => "fold",
            PipeOp::Fold1 => "fold1",
            PipeOp::Foreach => "foreach",
            PipeOp::Morph => "morph",
            PipeOp::Reverse => "reverse",
            PipeOp::Take => "take",
            PipeOp::TakeWhile => "takeWhile",
            PipeOp::Tee => "tee",
            PipeOp::ToSet => "toSet",
            PipeOp::Elems => "elems",
            PipeOp::FilterMap => "filter",
            PipeOp::Keys => "keys",
            PipeOp::MorphMap => "morph",
        }
    }

    pub fn kind(&self) -> ReceiverKind {
        match self {
            PipeOp::Elems | PipeOp::FilterMap | PipeOp::Keys | PipeOp::MorphMap => {
                ReceiverKind::Mapping
            }
            _ => ReceiverKind::Sequence,
        }
    }

    pub fn is_reversal(&self) -> bool {
        matches!(self, PipeOp::Reverse)
    }

    /// Ops whose result is not built element by element: they have no step
    /// section and can only close a pipeline
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipeOp::All
                | PipeOp::Any
                | PipeOp::Contains
                | PipeOp::ContainsNil
                | PipeOp::Fold
                | PipeOp::Fold1
                | PipeOp::Foreach
                | PipeOp::ToSet
        )
    }

    pub fn template(&self) -> &'static Template {
        match self {
            PipeOp::All => &ALL,
            PipeOp::Any => &ANY,
            PipeOp::Contains => &CONTAINS,
            PipeOp::ContainsNil => &CONTAINS_NIL,
            PipeOp::Drop => &DROP,
            PipeOp::DropWhile => &DROP_WHILE,
            PipeOp::Filter => &FILTER,
            PipeOp::Fold => &FOLD,
            PipeOp::Fold1 => &FOLD1,
            PipeOp::Foreach => &FOREACH,
            PipeOp::Morph => &MORPH,
            PipeOp::Reverse => &REVERSE,
            PipeOp::Take => &TAKE,
            PipeOp::TakeWhile => &TAKE_WHILE,
            PipeOp::Tee => &TEE,
            PipeOp::ToSet => &TO_SET,
            PipeOp::Elems => &ELEMS,
            PipeOp::FilterMap => &FILTER_MAP,
            PipeOp::Keys => &KEYS,
            PipeOp::MorphMap => &MORPH_MAP,
        }
    }
}

/// How the type variables `#T`..`#W` of a template are resolved at a call site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeResolver {
    /// T = receiver element
    SliceElem,
    /// T = receiver key, U = receiver element
    MapKeyElem,
    /// From `func(U, T) U`: T, U
    FoldSeeded,
    /// From `func(T, T) T`: T
    FoldFirst,
    /// From `func(T) U`: T, U
    MorphSlice,
    /// From `func(T, U) (V, W)`: T, U, V, W
    MorphMap,
}

impl TypeResolver {
    pub fn resolve(&self, site: &CallSite, oracle: &dyn TypeOracle) -> Result<Vec<Type>> {
        match self {
            TypeResolver::SliceElem => {
                let recv = receiver_type(site, oracle)?;
                match recv.slice_elem() {
                    Some(elem) => Ok(vec![elem.clone()]),
                    None => crate::bail_shape!("slice receiver", recv),
                }
            }
            TypeResolver::MapKeyElem => {
                let recv = receiver_type(site, oracle)?;
                match recv.map_key_elem() {
                    Some((key, elem)) => Ok(vec![key.clone(), elem.clone()]),
                    None => crate::bail_shape!("map receiver", recv),
                }
            }
            TypeResolver::FoldSeeded | TypeResolver::FoldFirst => {
                let sig = arg_signature(site, 0, oracle)?;
                Ok(vec![param(sig, 1)?, param(sig, 0)?])
            }
            TypeResolver::MorphSlice => {
                let sig = arg_signature(site, 0, oracle)?;
                Ok(vec![param(sig, 0)?, result(sig, 0)?])
            }
            TypeResolver::MorphMap => {
                let sig = arg_signature(site, 0, oracle)?;
                Ok(vec![
                    param(sig, 0)?,
                    param(sig, 1)?,
                    result(sig, 0)?,
                    result(sig, 1)?,
                ])
            }
        }
    }
}

pub(crate) fn receiver_type<'o>(site: &CallSite, oracle: &'o dyn TypeOracle) -> Result<&'o Type> {
    oracle.type_of(site.receiver.id).ok_or(GenError::Unresolved {
        expr: site.receiver.id,
        what: "receiver",
    })
}

pub(crate) fn arg_signature<'o>(
    site: &CallSite,
    index: usize,
    oracle: &'o dyn TypeOracle,
) -> Result<&'o Signature> {
    let arg = site.args.get(index).ok_or(GenError::ArityMismatch {
        op: "argument",
        expected: index + 1,
        found: site.args.len(),
    })?;
    let ty = oracle.type_of(arg.id).ok_or(GenError::Unresolved {
        expr: arg.id,
        what: "argument",
    })?;
    match ty.signature() {
        Some(sig) => Ok(sig),
        None => crate::bail_shape!("function signature", ty),
    }
}

pub(crate) fn param(sig: &Signature, i: usize) -> Result<Type> {
    match sig.param(i) {
        Some(ty) => Ok(ty.clone()),
        None => crate::bail_shape!("function parameter", format!("func with {} params", sig.params.len())),
    }
}

pub(crate) fn result(sig: &Signature, i: usize) -> Result<Type> {
    match sig.result(i) {
        Some(ty) => Ok(ty.clone()),
        None => crate::bail_shape!("function result", format!("func with {} results", sig.results.len())),
    }
}

/// A transformation template
#[derive(Debug)]
pub struct Template {
    pub op: PipeOp,
    pub recv: &'static str,
    pub params: &'static [&'static str],
    pub ret: &'static str,
    pub outline: &'static str,
    pub setup: Option<&'static str>,
    pub iter: &'static str,
    pub step: Option<&'static str>,
    pub cons: &'static str,
    pub resolver: TypeResolver,
}

/// A template made concrete for one call site
#[derive(Debug, Clone, PartialEq)]
pub struct SpecifiedTemplate {
    pub op: PipeOp,
    pub recv: String,
    pub params: Vec<String>,
    pub ret: String,
    pub outline: Fragment,
    pub setup: Fragment,
    pub iter: Fragment,
    pub step: Fragment,
    pub cons: Fragment,
}

impl Template {
    /// Check the insertion-point invariant of every section
    pub fn validate(&self) -> Result<()> {
        let op = self.op.name();
        Fragment::parse(self.outline).check_insertion_points(op, "outline", 1)?;
        if let Some(setup) = self.setup {
            Fragment::parse(setup).check_insertion_points(op, "setup", 1)?;
        }
        Fragment::parse(self.iter).check_insertion_points(op, "iter", 1)?;
        if let Some(step) = self.step {
            Fragment::parse(step).check_insertion_points(op, "step", 1)?;
        }
        Fragment::parse(self.cons).check_insertion_points(op, "cons", 0)
    }

    /// Resolve types and argument names for one call site. `arg_offset` is
    /// the number of arguments consumed by earlier links of the chain.
    pub fn specify(
        &self,
        site: &CallSite,
        arg_offset: usize,
        oracle: &dyn TypeOracle,
        arg_prefix: &str,
    ) -> Result<SpecifiedTemplate> {
        let op = self.op.name();
        if site.args.len() != self.params.len() {
            return Err(GenError::ArityMismatch {
                op,
                expected: self.params.len(),
                found: site.args.len(),
            });
        }
        let types = self.resolver.resolve(site, oracle)?;
        trace!("{}: resolved [{}]", op, join_types(&types));

        let concrete = |src: &str| -> Result<Fragment> {
            let mut frag = Fragment::parse(src);
            frag.substitute_types(op, &types)?;
            frag.substitute_args(arg_prefix, arg_offset);
            Ok(frag)
        };
        let shape = |src: &str| -> Result<String> { Ok(concrete(src)?.to_string()) };

        Ok(SpecifiedTemplate {
            op: self.op,
            recv: shape(self.recv)?,
            params: self.params.iter().map(|p| shape(p)).collect::<Result<_>>()?,
            ret: shape(self.ret)?,
            outline: concrete(self.outline)?,
            setup: concrete(self.setup.unwrap_or("#next"))?,
            iter: concrete(self.iter)?,
            step: concrete(self.step.unwrap_or("#next"))?,
            cons: concrete(self.cons)?,
        })
    }
}

fn join_types(types: &[Type]) -> String {
    types.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}

/// Check every registry template
pub fn validate_registry() -> Result<()> {
    for op in PipeOp::CATALOGUE {
        let template = op.template();
        template.validate()?;
        if template.op != op {
            return Err(GenError::MalformedFragment {
                op: op.name(),
                section: "registry",
                reason: format!("registered under {:?}", template.op),
            });
        }
    }
    Ok(())
}

const RANGE_VALUES: &str = "
for _, #e := range recv {
    #next
}";

const RANGE_PAIRS: &str = "
for #k, #e := range recv {
    #next
}";

static ALL: Template = Template {
    op: PipeOp::All,
    recv: "[]#T",
    params: &["func(#T) bool"],
    ret: "bool",
    outline: "
#next
return true",
    setup: None,
    iter: RANGE_VALUES,
    step: None,
    cons: "
if !#arg1(#e) {
    return false
}",
    resolver: TypeResolver::SliceElem,
};

static ANY: Template = Template {
    op: PipeOp::Any,
    recv: "[]#T",
    params: &["func(#T) bool"],
    ret: "bool",
    outline: "
#next
return false",
    setup: None,
    iter: RANGE_VALUES,
    step: None,
    cons: "
if #arg1(#e) {
    return true
}",
    resolver: TypeResolver::SliceElem,
};

static CONTAINS: Template = Template {
    op: PipeOp::Contains,
    recv: "[]#T",
    params: &["#T"],
    ret: "bool",
    outline: "
#next
return false",
    setup: None,
    iter: RANGE_VALUES,
    step: None,
    cons: "
if #e == #arg1 {
    return true
}",
    resolver: TypeResolver::SliceElem,
};

// The element type has no ==, so the checker only admits a nil argument.
static CONTAINS_NIL: Template = Template {
    op: PipeOp::ContainsNil,
    recv: "[]#T",
    params: &["#T"],
    ret: "bool",
    outline: "
#next
return false",
    setup: None,
    iter: RANGE_VALUES,
    step: None,
    cons: "
if #e == nil {
    return true
}",
    resolver: TypeResolver::SliceElem,
};

static DROP: Template = Template {
    op: PipeOp::Drop,
    recv: "[]#T",
    params: &["int"],
    ret: "[]#T",
    outline: "
var undropped []#T
#next
return undropped",
    setup: Some(
        "
ndropped#arg1 := 0
#next",
    ),
    // as the first link the loop skips the prefix itself
    iter: "
if #arg1 < 0 {
    #arg1 = 0
} else if #arg1 > len(recv) {
    #arg1 = len(recv)
}
ndropped#arg1 = #arg1
for _, #e := range recv[#arg1:] {
    #next
}",
    step: Some(
        "
if ndropped#arg1++; ndropped#arg1 <= #arg1 {
    continue
}
#next",
    ),
    cons: "
undropped = append(undropped, #e)",
    resolver: TypeResolver::SliceElem,
};

static DROP_WHILE: Template = Template {
    op: PipeOp::DropWhile,
    recv: "[]#T",
    params: &["func(#T) bool"],
    ret: "[]#T",
    outline: "
var undropped []#T
#next
return undropped",
    setup: Some(
        "
stilldropping#arg1 := true
#next",
    ),
    iter: RANGE_VALUES,
    step: Some(
        "
stilldropping#arg1 = stilldropping#arg1 && #arg1(#e)
if stilldropping#arg1 {
    continue
}
#next",
    ),
    cons: "
undropped = append(undropped, #e)",
    resolver: TypeResolver::SliceElem,
};

static FILTER: Template = Template {
    op: PipeOp::Filter,
    recv: "[]#T",
    params: &["func(#T) bool"],
    ret: "[]#T",
    outline: "
var filtered []#T
#next
return filtered",
    setup: None,
    iter: RANGE_VALUES,
    step: Some(
        "
if !#arg1(#e) {
    continue
}
#next",
    ),
    cons: "
filtered = append(filtered, #e)",
    resolver: TypeResolver::SliceElem,
};

static FOLD: Template = Template {
    op: PipeOp::Fold,
    recv: "[]#T",
    params: &["func(#U, #T) #U", "#U"],
    ret: "#U",
    outline: "
acc := #arg2
#next
return acc",
    setup: None,
    iter: RANGE_VALUES,
    step: None,
    cons: "
acc = #arg1(acc, #e)",
    resolver: TypeResolver::FoldSeeded,
};

static FOLD1: Template = Template {
    op: PipeOp::Fold1,
    recv: "[]#T",
    params: &["func(#T, #T) #T"],
    ret: "#T",
    outline: "
var acc #T
var accset bool
#next
if !accset {
    panic(\"fold of empty slice\")
}
return acc",
    setup: None,
    iter: RANGE_VALUES,
    step: None,
    cons: "
if !accset {
    acc = #e
    accset = true
} else {
    acc = #arg1(acc, #e)
}",
    resolver: TypeResolver::FoldFirst,
};

static FOREACH: Template = Template {
    op: PipeOp::Foreach,
    recv: "[]#T",
    params: &["func(#T)"],
    ret: "",
    outline: "#next",
    setup: None,
    iter: RANGE_VALUES,
    step: None,
    cons: "#arg1(#e)",
    resolver: TypeResolver::SliceElem,
};

static MORPH: Template = Template {
    op: PipeOp::Morph,
    recv: "[]#T",
    params: &["func(#T) #U"],
    ret: "[]#U",
    outline: "
var morphed []#U
#next
return morphed",
    setup: None,
    iter: RANGE_VALUES,
    step: Some(
        "
#+e := #arg1(#e)
#next",
    ),
    cons: "
morphed = append(morphed, #e)",
    resolver: TypeResolver::MorphSlice,
};

static REVERSE: Template = Template {
    op: PipeOp::Reverse,
    recv: "[]#T",
    params: &[],
    ret: "[]#T",
    outline: "
var reversed []#T
#next
for i, j := 0, len(reversed)-1; i < j; i, j = i+1, j-1 {
    reversed[i], reversed[j] = reversed[j], reversed[i]
}
return reversed",
    setup: None,
    iter: "
for i := range recv {
    #e := recv[len(recv)-i-1]
    #next
}",
    step: None,
    cons: "
reversed = append(reversed, #e)",
    resolver: TypeResolver::SliceElem,
};

static TAKE: Template = Template {
    op: PipeOp::Take,
    recv: "[]#T",
    params: &["int"],
    ret: "[]#T",
    outline: "
var taken []#T
#next
return taken",
    setup: Some(
        "
ntaken#arg1 := 0
#next",
    ),
    iter: RANGE_VALUES,
    step: Some(
        "
if ntaken#arg1++; ntaken#arg1 > #arg1 {
    break
}
#next",
    ),
    cons: "
taken = append(taken, #e)",
    resolver: TypeResolver::SliceElem,
};

static TAKE_WHILE: Template = Template {
    op: PipeOp::TakeWhile,
    recv: "[]#T",
    params: &["func(#T) bool"],
    ret: "[]#T",
    outline: "
var taken []#T
#next
return taken",
    setup: None,
    iter: RANGE_VALUES,
    step: Some(
        "
if !#arg1(#e) {
    break
}
#next",
    ),
    cons: "
taken = append(taken, #e)",
    resolver: TypeResolver::SliceElem,
};

static TEE: Template = Template {
    op: PipeOp::Tee,
    recv: "[]#T",
    params: &["func(#T)"],
    ret: "[]#T",
    outline: "
var teed []#T
#next
return teed",
    setup: None,
    iter: RANGE_VALUES,
    step: Some(
        "
#arg1(#e)
#next",
    ),
    cons: "
teed = append(teed, #e)",
    resolver: TypeResolver::SliceElem,
};

static TO_SET: Template = Template {
    op: PipeOp::ToSet,
    recv: "[]#T",
    params: &[],
    ret: "map[#T]struct{}",
    outline: "
set := make(map[#T]struct{})
#next
return set",
    setup: None,
    iter: RANGE_VALUES,
    step: None,
    cons: "
set[#e] = struct{}{}",
    resolver: TypeResolver::SliceElem,
};

static ELEMS: Template = Template {
    op: PipeOp::Elems,
    recv: "map[#T]#U",
    params: &[],
    ret: "[]#U",
    outline: "
var elems []#U
#next
return elems",
    setup: None,
    iter: RANGE_VALUES,
    step: None,
    cons: "
elems = append(elems, #e)",
    resolver: TypeResolver::MapKeyElem,
};

static FILTER_MAP: Template = Template {
    op: PipeOp::FilterMap,
    recv: "map[#T]#U",
    params: &["func(#T, #U) bool"],
    ret: "map[#T]#U",
    outline: "
if recv == nil {
    return nil
}
filtered := make(map[#T]#U)
#next
return filtered",
    setup: None,
    iter: RANGE_PAIRS,
    step: Some(
        "
if !#arg1(#k, #e) {
    continue
}
#next",
    ),
    cons: "
filtered[#k] = #e",
    resolver: TypeResolver::MapKeyElem,
};

// Downstream sequence steps work on #e, so the key moves into a fresh
// element variable.
static KEYS: Template = Template {
    op: PipeOp::Keys,
    recv: "map[#T]#U",
    params: &[],
    ret: "[]#T",
    outline: "
var keys []#T
#next
return keys",
    setup: None,
    iter: "
for #k := range recv {
    #next
}",
    step: Some(
        "
#+e := #k
#next",
    ),
    cons: "
keys = append(keys, #e)",
    resolver: TypeResolver::MapKeyElem,
};

static MORPH_MAP: Template = Template {
    op: PipeOp::MorphMap,
    recv: "map[#T]#U",
    params: &["func(#T, #U) (#V, #W)"],
    ret: "map[#V]#W",
    outline: "
if recv == nil {
    return nil
}
morphed := make(map[#V]#W)
#next
return morphed",
    setup: None,
    iter: RANGE_PAIRS,
    step: Some(
        "
#+k, #+e := #arg1(#k, #e)
#next",
    ),
    cons: "
morphed[#k] = #e",
    resolver: TypeResolver::MorphMap,
};

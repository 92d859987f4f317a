//! # Type Model - Host Language Types
//!
//! The structural view of host-language types the specializer consumes from
//! the type checker. Every type prints in host syntax through `Display`; the
//! printed form is what gets substituted into code templates.
//!
//! Generated code only ever cares about the *underlying* shape of a type
//! (slice element, map key/element, signature parameters), so a named type
//! carries its underlying type alongside the names of its declared methods.

pub mod oracle;

pub use oracle::{ConstValue, TypeAndValue, TypeInfo, TypeOracle};

use std::fmt;
use std::rc::Rc;

/// Predeclared basic types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    /// The type of the bare `nil` identifier
    UntypedNil,
}

impl BasicKind {
    pub fn name(&self) -> &'static str {
        match self {
            BasicKind::Bool => "bool",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
            BasicKind::String => "string",
            BasicKind::UntypedNil => "untyped nil",
        }
    }

    /// Whether `<` is defined for values of this kind
    pub fn is_ordered(&self) -> bool {
        !matches!(
            self,
            BasicKind::Bool | BasicKind::Complex64 | BasicKind::Complex128 | BasicKind::UntypedNil
        )
    }
}

/// Channel direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// Function signature. A variadic signature stores its last parameter as a
/// slice type, like the host type checker does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub params: Vec<Type>,
    pub results: Vec<Type>,
    pub variadic: bool,
}

impl Signature {
    pub fn new(params: Vec<Type>, results: Vec<Type>) -> Self {
        Signature { params, results, variadic: false }
    }

    pub fn param(&self, i: usize) -> Option<&Type> {
        self.params.get(i)
    }

    pub fn result(&self, i: usize) -> Option<&Type> {
        self.results.get(i)
    }
}

/// Struct field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub embedded: bool,
}

/// A defined type: `type ints []int`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedType {
    pub name: String,
    pub underlying: Type,
    /// Names of methods declared on the type (value or pointer receiver)
    pub methods: Vec<String>,
}

/// Complete type representation for the host language
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Basic(BasicKind),
    Slice(Box<Type>),
    Array { len: u64, elem: Box<Type> },
    Map { key: Box<Type>, elem: Box<Type> },
    Pointer(Box<Type>),
    Chan { dir: ChanDir, elem: Box<Type> },
    Signature(Signature),
    Struct(Vec<Field>),
    /// Interface with the given method specs (`String() string`)
    Interface(Vec<String>),
    Named(Rc<NamedType>),
    /// Multiple results of a call
    Tuple(Vec<Type>),
}

impl Type {
    pub fn bool() -> Type {
        Type::Basic(BasicKind::Bool)
    }

    pub fn int() -> Type {
        Type::Basic(BasicKind::Int)
    }

    pub fn string() -> Type {
        Type::Basic(BasicKind::String)
    }

    pub fn nil() -> Type {
        Type::Basic(BasicKind::UntypedNil)
    }

    pub fn slice(elem: Type) -> Type {
        Type::Slice(Box::new(elem))
    }

    pub fn array(len: u64, elem: Type) -> Type {
        Type::Array { len, elem: Box::new(elem) }
    }

    pub fn map(key: Type, elem: Type) -> Type {
        Type::Map { key: Box::new(key), elem: Box::new(elem) }
    }

    pub fn pointer(elem: Type) -> Type {
        Type::Pointer(Box::new(elem))
    }

    pub fn func(params: Vec<Type>, results: Vec<Type>) -> Type {
        Type::Signature(Signature::new(params, results))
    }

    pub fn empty_struct() -> Type {
        Type::Struct(Vec::new())
    }

    pub fn named(name: &str, underlying: Type, methods: &[&str]) -> Type {
        Type::Named(Rc::new(NamedType {
            name: name.to_string(),
            underlying,
            methods: methods.iter().map(|m| m.to_string()).collect(),
        }))
    }

    /// The structural type behind any chain of names
    pub fn underlying(&self) -> &Type {
        match self {
            Type::Named(n) => n.underlying.underlying(),
            other => other,
        }
    }

    pub fn is_named(&self) -> bool {
        matches!(self, Type::Named(_))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Type::Basic(BasicKind::UntypedNil))
    }

    /// Element type of a slice-shaped type
    pub fn slice_elem(&self) -> Option<&Type> {
        match self.underlying() {
            Type::Slice(elem) => Some(elem),
            _ => None,
        }
    }

    /// Key and element types of a map-shaped type
    pub fn map_key_elem(&self) -> Option<(&Type, &Type)> {
        match self.underlying() {
            Type::Map { key, elem } => Some((key, elem)),
            _ => None,
        }
    }

    /// Signature of a function-shaped type
    pub fn signature(&self) -> Option<&Signature> {
        match self.underlying() {
            Type::Signature(sig) => Some(sig),
            _ => None,
        }
    }

    /// Whether `==` is defined between two values of this type
    pub fn comparable(&self) -> bool {
        match self.underlying() {
            Type::Basic(_) | Type::Pointer(_) | Type::Chan { .. } | Type::Interface(_) => true,
            Type::Array { elem, .. } => elem.comparable(),
            Type::Struct(fields) => fields.iter().all(|f| f.ty.comparable()),
            Type::Slice(_) | Type::Map { .. } | Type::Signature(_) | Type::Tuple(_) => false,
            Type::Named(_) => unreachable!("underlying() never returns a named type"),
        }
    }

    /// Whether `<` is defined between two values of this type
    pub fn ordered(&self) -> bool {
        match self.underlying() {
            Type::Basic(kind) => kind.is_ordered(),
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Basic(kind) => write!(f, "{}", kind.name()),
            Type::Slice(elem) => write!(f, "[]{}", elem),
            Type::Array { len, elem } => write!(f, "[{}]{}", len, elem),
            Type::Map { key, elem } => write!(f, "map[{}]{}", key, elem),
            Type::Pointer(elem) => write!(f, "*{}", elem),
            Type::Chan { dir, elem } => match dir {
                ChanDir::Both => write!(f, "chan {}", elem),
                ChanDir::Send => write!(f, "chan<- {}", elem),
                ChanDir::Recv => write!(f, "<-chan {}", elem),
            },
            Type::Signature(sig) => {
                write!(f, "func")?;
                write_signature(f, sig)
            }
            Type::Struct(fields) => {
                write!(f, "struct{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    if field.embedded {
                        write!(f, "{}", field.ty)?;
                    } else {
                        write!(f, "{} {}", field.name, field.ty)?;
                    }
                }
                write!(f, "}}")
            }
            Type::Interface(methods) => write!(f, "interface{{{}}}", methods.join("; ")),
            Type::Named(n) => write!(f, "{}", n.name),
            Type::Tuple(elems) => {
                write!(f, "(")?;
                write_list(f, elems)?;
                write!(f, ")")
            }
        }
    }
}

/// Writes `(params) results` as it follows the `func` keyword
pub(crate) fn write_signature(f: &mut fmt::Formatter, sig: &Signature) -> fmt::Result {
    write!(f, "(")?;
    for (i, param) in sig.params.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        match (sig.variadic && i + 1 == sig.params.len(), param) {
            (true, Type::Slice(elem)) => write!(f, "...{}", elem)?,
            _ => write!(f, "{}", param)?,
        }
    }
    write!(f, ")")?;
    match sig.results.len() {
        0 => Ok(()),
        1 => write!(f, " {}", sig.results[0]),
        _ => {
            write!(f, " (")?;
            write_list(f, &sig.results)?;
            write!(f, ")")
        }
    }
}

fn write_list(f: &mut fmt::Formatter, types: &[Type]) -> fmt::Result {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", ty)?;
    }
    Ok(())
}

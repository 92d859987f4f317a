//! # fusegen - Pipeline-Fusing Specializer
//!
//! Source-to-source compiler for a generics-free host language extended with
//! generic builtins (`filter`, `morph`, `fold`, `max`, `merge`, ...). Every
//! builtin call is replaced by a call to generated, monomorphic host code;
//! chains of fusible methods are fused into a single loop first.
//!
//! ## Generation Pipeline
//!
//! ```text
//! Dialect AST + Type Oracle
//!     ↓ [Specializer walk]
//! Builtin call sites
//!     ↓ [Chain Recognizer]      (codegen::pipeline)
//! Fusible chains
//!     ↓ [Template Specializer]  (codegen::templates)
//! Concrete template sections
//!     ↓ [Fragment Assembler]    (codegen::fragment)
//! One fused loop per chain
//!     ↓ [Call-Site Rewriter]    (codegen::rewrite)
//! Rewritten AST + Declaration Registry
//!     ↓ [Printer]
//! Host source files + auxiliary unit
//! ```
//!
//! Calls that do not fuse fall back to single-operation declarations
//! (`codegen::generators`) or, when the checker evaluated them, to constants.
//!
//! ## Usage as a Library
//!
//! ```ignore
//! use fusegen::{compile_package, GenerationConfig, Package, SourceFile};
//!
//! let mut package = Package::new("main")
//!     .with_file(SourceFile::new("main.ply", parsed_file));
//! let output = compile_package(&mut package, &type_info, &GenerationConfig::new())?;
//! for (name, source) in output.all_files() {
//!     println!("// {}\n{}", name, source);
//! }
//! ```

// Host language model
pub mod syntax;
pub mod types;

// Specialization & fusion
pub mod codegen;

// Driver
pub mod compiler;
pub mod config;
pub mod error;

pub use codegen::{CallRewrite, DeclRegistry, GenerationStats, PipeOp, Specializer};
pub use compiler::{compile_package, CompilationOutput, Package, SourceFile};
pub use config::GenerationConfig;
pub use error::{GenError, Result};
pub use syntax::{AstBuilder, File};
pub use types::{ConstValue, Type, TypeInfo, TypeOracle};

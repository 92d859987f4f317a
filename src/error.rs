//! # Generation Errors
//!
//! Every failure the specializer can hit. Most of them are recoverable at the
//! call site: a chain that cannot be specified falls back to single-operation
//! generation, and a call that cannot be generated at all is left untouched
//! for the host compiler to report. Only [`GenError::TypeCheck`],
//! [`GenError::InvalidConfig`] and a malformed template registry escape
//! [`crate::compile_package`].

use thiserror::Error;

use crate::syntax::ast::ExprId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenError {
    #[error("type checking failed with {} error(s): {}", .0.len(), .0.join("; "))]
    TypeCheck(Vec<String>),

    #[error("no type recorded for {what} (expr {expr:?})")]
    Unresolved { expr: ExprId, what: &'static str },

    #[error("expected {expected}, found {found}")]
    ShapeMismatch { expected: &'static str, found: String },

    #[error("{op}: expected {expected} argument(s), found {found}")]
    ArityMismatch {
        op: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("malformed {section} fragment in {op}: {reason}")]
    MalformedFragment {
        op: &'static str,
        section: &'static str,
        reason: String,
    },

    #[error("call rewrite failed: {0}")]
    Rewrite(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GenError {
    /// Whether the condition is handled by falling back to a simpler code path.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, GenError::TypeCheck(_) | GenError::InvalidConfig(_))
    }
}

pub type Result<T> = std::result::Result<T, GenError>;

/// Shorthand for returning a shape mismatch.
#[macro_export]
macro_rules! bail_shape {
    ($expected:expr, $found:expr) => {
        return Err($crate::error::GenError::ShapeMismatch {
            expected: $expected,
            found: $found.to_string(),
        })
    };
}

//! Error taxonomy for descriptor inspection and construction.
//!
//! A value that does not match a type is *not* an error: matching reports a
//! boolean and optional diagnostics. The variants below stop the current
//! operation and propagate to the caller.

use crate::reflect::TypeKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypeError {
    /// A checked downcast or kind-specific accessor was used on a type of
    /// another kind. Expected while exploring unknown descriptors.
    #[error("expected a type of kind `{expected}`, found `{actual}`")]
    KindMismatch { expected: TypeKind, actual: TypeKind },

    /// A builder was asked to combine incompatible variants.
    #[error("cannot extend {target} builder from a type of kind `{from}`")]
    IncompatibleExtendKind {
        target: &'static str,
        from: TypeKind,
    },

    /// A descriptor is missing data its discriminant requires, or refers to
    /// something that does not exist.
    #[error("malformed type descriptor: {0}")]
    MalformedDescriptor(String),

    /// A serialized descriptor document could not be decoded.
    #[error("invalid descriptor document: {0}")]
    Wire(#[from] serde_json::Error),
}

impl TypeError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDescriptor(message.into())
    }

    pub fn is_kind_mismatch(&self) -> bool {
        matches!(self, Self::KindMismatch { .. })
    }
}

//! Type classification and binding diagnostics.
//!
//! Every declared type is an implementation type (primary marker, becomes a model entity), a
//! placeholder type (placeholder marker, consulted during validation only) or irrelevant.
//!
//! # Key Components
//!
//! - [`Classifier`] - Decides membership and validates type-level rules
//! - [`markers`] - Marker attributes and their arguments
//! - [`wellknown`] - Engine vocabulary types
//! - [`BindingError`] / [`BindingErrors`] - Structured diagnostics

mod classifier;
mod diagnostics;
/// Marker attributes
pub mod markers;
/// Engine vocabulary types
pub mod wellknown;

pub use classifier::{
    role_of, structural_kind, Classification, ClassifiedType, Classifier, TypeKind, TypeRole,
};
pub use diagnostics::{
    BindingError, BindingErrors, Diagnostics, ErrorKind, SourceLocation, SymbolCategory, SymbolId,
};

//! # bindweaver Prelude
//!
//! The types needed to configure a run, inspect its document and extend the processor registry.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all bindweaver operations
pub use crate::Error;

/// The result type used throughout bindweaver
pub use crate::Result;

// ================================================================================================
// Generation Runs
// ================================================================================================

/// A configured generation run, its configuration and outcome
pub use crate::generator::{GenerationReport, Generator, GeneratorConfig};

/// Binding flavor and the read-only aggregate the exporters share
pub use crate::context::{BindingContext, BindingSchema};

// ================================================================================================
// Model
// ================================================================================================

/// The document and its entities
pub use crate::model::{
    ClassDefinition, EnumDefinition, FunctionDefinition, PropertyDefinition, StructDefinition,
    TypeClass, TypeDefinition, TypeDefinitionDocument,
};

// ================================================================================================
// Extension Points
// ================================================================================================

/// Processor contract and registry
pub use crate::processors::{FastInvokeParam, ProcessorRegistry, PropertyProcessor, Usage};

/// Binding diagnostics
pub use crate::bindings::{BindingError, BindingErrors, ErrorKind};

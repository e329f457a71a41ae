//! Metadata loading and cross-module resolution.
//!
//! [`ModuleResolver`] opens module images, caches them by name and resolves type references to
//! either a declaration in a loaded module ([`TypeHandle`]) or an intrinsic core-library type.
//! An unresolved reference is fatal for the run.

mod resolver;

pub use resolver::{
    is_core_library, ModuleResolver, ResolvedType, TypeHandle, CORE_LIBRARIES, MODULE_EXTENSION,
};

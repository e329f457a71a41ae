//! The canonical type-definition model.
//!
//! A generation run produces one [`TypeDefinitionDocument`] holding [`EnumDefinition`],
//! [`StructDefinition`] and [`ClassDefinition`] entities. Structs and classes own their
//! [`PropertyDefinition`]s, classes own their [`FunctionDefinition`]s. Links between types are
//! by name ([`TypeReferenceInfo`]), never by ownership.

mod definitions;
mod document;
/// Flag sets of model entities
pub mod flags;
/// Name-based GUIDs
pub mod guid;
/// Derived native layout
pub mod layout;
/// Name and path derivation
pub mod names;
mod typeclass;

pub use definitions::{
    BaseDefinition, ClassDefinition, DefaultValue, EnumDefinition, EnumField, FunctionDefinition,
    PropertyDefinition, ReferenceKind, StructDefinition, TypeCategory, TypeDefinition,
    TypeReferenceInfo,
};
pub use document::TypeDefinitionDocument;
pub use flags::{FunctionFlags, PropertyFlags, TypeFlags};
pub use typeclass::TypeClass;

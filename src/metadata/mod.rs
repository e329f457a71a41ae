//! Module metadata: the `.bmod` container, its heaps and tables, and the owned declaration model.
//!
//! # Key Components
//!
//! - [`image`] - Container header and stream directory
//! - [`streams`] - String, blob, user-string and GUID heaps
//! - [`tables`] - Fixed-width metadata tables
//! - [`signatures`] - Type, field, method and property signatures
//! - [`customattributes`] - Custom attribute argument blobs
//! - [`method`] - Method bodies and IL instructions
//! - [`module`] - Eagerly decoded [`module::LoadedModule`]
//! - [`builder`] - Authoring of module images
//!
//! # Examples
//!
//! ```rust,no_run
//! use bindweaver::metadata::module::LoadedModule;
//!
//! let module = LoadedModule::from_path("Modules/Game.bmod".as_ref())?;
//! for declaration in &module.types {
//!     println!("{}", declaration.full_name());
//! }
//! # Ok::<(), bindweaver::Error>(())
//! ```

/// Authoring of module images
pub mod builder;
/// Custom attribute blob parsing and encoding
pub mod customattributes;
/// Declaration attribute flags
pub mod flags;
/// The container header and stream directory
pub mod image;
/// Method bodies and IL instructions
pub mod method;
/// The owned declaration model of a module
pub mod module;
/// Signature parsing and encoding
pub mod signatures;
/// Metadata heaps
pub mod streams;
/// Metadata tables
pub mod tables;
/// Metadata tokens
pub mod token;

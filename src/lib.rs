// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # bindweaver
//!
//! Binding code generator for native engine interop. `bindweaver` reads compiled module images
//! describing user-declared engine types, validates them against the binding rules, builds a
//! canonical type-definition model and emits one C# proxy source per type. The emitted sources
//! encode native member offsets and call every reflected function either through a generic
//! marshaled invocation or, for functions in the fast-invoke set, through a direct native
//! function pointer.
//!
//! ## Pipeline
//!
//! | Stage | Module |
//! |---|---|
//! | Load modules, resolve cross-module references | [`loader`] over [`metadata`] |
//! | Classify and validate declarations | [`bindings`] |
//! | Build the type-definition document | [`factory`] into [`model`] |
//! | Choose a marshaling strategy per property kind | [`processors`] |
//! | Bundle document, schema and fast-invoke set | [`context`] |
//! | Render and save sources | [`export`] |
//!
//! [`Generator`] runs all stages for a [`GeneratorConfig`]. Generation is deterministic: the
//! same module bytes always produce the same files, and saving skips files whose content is
//! already current, so a no-op regeneration touches nothing.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bindweaver::prelude::*;
//!
//! let config = GeneratorConfig::new()
//!     .module("Modules/Game.bmod")
//!     .search_path("Engine/Modules")
//!     .output_root("Generated");
//! let report = Generator::new(config).run()?;
//! println!("{} written, {} unchanged", report.written, report.unchanged);
//! # Ok::<(), bindweaver::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`Result`]. Binding rule violations are collected and
//! returned together as [`Error::Validation`]; a property kind without a processor surfaces as
//! [`Error::NoProcessor`] when its owner is rendered.
//!
//! ```rust,no_run
//! use bindweaver::{Error, Generator, GeneratorConfig};
//!
//! match Generator::new(GeneratorConfig::new().module("Game.bmod")).run() {
//!     Ok(report) => println!("{} files", report.processed),
//!     Err(Error::Validation(errors)) => {
//!         for error in errors.iter() {
//!             eprintln!("{error}");
//!         }
//!     }
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Fixture modules shared by the unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// ```rust,no_run
/// use bindweaver::prelude::*;
///
/// let report = Generator::new(GeneratorConfig::sequential().module("Game.bmod")).run()?;
/// # Ok::<(), bindweaver::Error>(())
/// ```
pub mod prelude;

/// Compiled-module images: container, heaps, tables, signatures, attributes and method bodies.
///
/// The reader decodes a module eagerly into an owned [`metadata::module::LoadedModule`];
/// [`metadata::builder::ModuleBuilder`] writes images in the same format.
pub mod metadata;

pub mod bindings;
pub mod context;
pub mod export;
pub mod factory;
pub mod generator;
pub mod loader;
pub mod marshal;
pub mod model;
pub mod processors;

/// `bindweaver` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `bindweaver` Error type
///
/// The main error type for all operations in this crate, covering load, validation and
/// emission failures.
///
/// # Examples
///
/// ```rust,no_run
/// use bindweaver::{Error, Generator, GeneratorConfig};
///
/// match Generator::new(GeneratorConfig::new().module("Missing.bmod")).run() {
///     Err(Error::ModuleNotFound(path)) => println!("no module at {path}"),
///     Err(e) => println!("Error: {}", e),
///     Ok(_) => {}
/// }
/// ```
pub use error::Error;

/// Entry point of a generation run, see [`generator`].
pub use generator::{GenerationReport, Generator, GeneratorConfig};

/// Raw module bytes and the cursor used to decode them.
pub use file::{parser::Parser, File};

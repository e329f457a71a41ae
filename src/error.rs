use thiserror::Error;

use crate::bindings::BindingErrors;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

macro_rules! internal_error {
    ($($arg:tt)*) => {
        crate::Error::Internal(format!($($arg)*))
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants follow the three failure classes of a generation run:
///
/// ## Load Errors
/// - [`Error::Malformed`] - Corrupted or invalid module image
/// - [`Error::OutOfBounds`] - Attempted to read beyond the image boundaries
/// - [`Error::NotSupported`] - Unsupported image version or feature
/// - [`Error::Empty`] - Empty input provided
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::ModuleNotFound`] - A module path or name could not be located
/// - [`Error::UnresolvedReference`] - A cross-module type reference could not be resolved
///
/// ## Classification and Validation Errors
/// - [`Error::Validation`] - One or more binding rules were violated, reported as a batch
///
/// ## Emission Errors
/// - [`Error::NoProcessor`] - No processor is registered for a property's type-class tag
/// - [`Error::Internal`] - An internal invariant of the builder or registry was broken
///
/// # Examples
///
/// ```rust,no_run
/// use bindweaver::{Error, Generator, GeneratorConfig};
///
/// let config = GeneratorConfig::new().module("Game.bmod").output_root("Generated");
/// match Generator::new(config).run() {
///     Ok(report) => println!("{} files written", report.written),
///     Err(Error::Validation(errors)) => {
///         for error in errors.iter() {
///             eprintln!("{}", error);
///         }
///     }
///     Err(e) => eprintln!("generation failed: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The module image is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the image.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This image version or feature is not supported.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// A module could not be located, neither at its exact path nor through the search paths.
    #[error("Module not found - {0}")]
    ModuleNotFound(String),

    /// A type reference could not be resolved against the loaded modules.
    ///
    /// Unresolved references are fatal for the run, no partial document is produced.
    #[error("Unresolved reference '{reference}' in module '{module}'")]
    UnresolvedReference {
        /// Fully qualified name of the referenced type or module
        reference: String,
        /// Name of the module that holds the reference
        module: String,
    },

    /// One or more binding rules were violated.
    ///
    /// Carries every diagnostic collected during the phase that failed, so a single run
    /// can report multiple problems.
    #[error("{0}")]
    Validation(BindingErrors),

    /// No processor is registered for the type-class tag of a property.
    #[error("No processor registered for type class '{tag}' (property '{property}' of '{owner}')")]
    NoProcessor {
        /// The type-class tag that could not be resolved
        tag: String,
        /// The owning type of the property
        owner: String,
        /// The property that could not be emitted
        property: String,
    },

    /// Internal invariant violation; indicates a builder or registry bug rather than user error.
    #[error("Internal error - {0}")]
    Internal(String),

    /// Recursion limit reached while resolving nested generic arguments or type chains.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}

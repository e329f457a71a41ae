//! Metadata streams of a module image.
//!
//! A module image carries up to six streams:
//!
//! - **`#Strings`** - UTF-8 identifier heap (type, member and namespace names)
//! - **`#US`** - UTF-16 literals loaded by `ldstr`
//! - **`#Blob`** - signatures, constant values and custom attribute arguments
//! - **`#GUID`** - 16-byte module identities
//! - **`#~`** - the metadata tables, see [`crate::metadata::tables`]
//! - **`#IL`** - method bodies, addressed by the `body` column of `MethodDef`
//!
//! The heap views borrow from the image and never copy.

mod blob;
mod guid;
mod streamheader;
mod strings;
mod userstrings;

pub use blob::Blob;
pub use guid::Guid;
pub use streamheader::{StreamHeader, STREAM_NAMES};
pub use strings::Strings;
pub use userstrings::UserStrings;

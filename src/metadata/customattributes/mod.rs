//! Custom attributes (ECMA-335 II.23.3).
//!
//! Binding markers are custom attributes, so this is how the classifier learns what a
//! declaration wants to be. Blobs are decoded eagerly while a module is loaded.

mod encoder;
mod parser;
mod types;

pub use encoder::encode_custom_attribute_value;
pub use parser::{parse_custom_attribute_blob, CustomAttributeParser};
pub use types::*;

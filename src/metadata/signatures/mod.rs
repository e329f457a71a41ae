//! Signature blobs (ECMA-335 II.23.2).
//!
//! Field, method, property and type specification signatures describe the types a declaration
//! uses. [`SignatureParser`] decodes them from the `#Blob` heap; the `encode_*` functions produce
//! the same encoding and back [`crate::metadata::builder::ModuleBuilder`].

mod encoder;
mod parser;
mod types;

pub use encoder::{
    encode_field_signature, encode_method_signature, encode_property_signature, encode_type,
    encode_type_spec_signature,
};
pub use parser::SignatureParser;
pub use types::*;

/// Parse a field signature blob.
///
/// # Errors
/// Returns an error if the blob is not a valid field signature.
pub fn parse_field_signature(data: &[u8]) -> crate::Result<SignatureField> {
    SignatureParser::new(data).parse_field_signature()
}

/// Parse a method signature blob.
///
/// # Errors
/// Returns an error if the blob is not a valid method signature.
pub fn parse_method_signature(data: &[u8]) -> crate::Result<SignatureMethod> {
    SignatureParser::new(data).parse_method_signature()
}

/// Parse a property signature blob.
///
/// # Errors
/// Returns an error if the blob is not a valid property signature.
pub fn parse_property_signature(data: &[u8]) -> crate::Result<SignatureProperty> {
    SignatureParser::new(data).parse_property_signature()
}

/// Parse a type specification signature blob.
///
/// # Errors
/// Returns an error if the blob is not a valid type specification.
pub fn parse_type_spec_signature(data: &[u8]) -> crate::Result<SignatureTypeSpec> {
    SignatureParser::new(data).parse_type_spec_signature()
}

//! Custom attribute blob parser.
//!
//! Fixed arguments are typed by the attribute constructor's signature; named arguments carry
//! their own serialization type tag. Enum-typed arguments are read as 4-byte integers.

use crate::{
    file::parser::Parser,
    metadata::{
        customattributes::{
            CustomAttributeArgument, CustomAttributeNamedArgument, CustomAttributeValue,
            SERIALIZATION_TYPE,
        },
        signatures::{SignatureMethod, TypeSignature},
        token::Token,
    },
    Error::RecursionLimit,
    Result,
};

const MAX_RECURSION_DEPTH: usize = 50;
const PROLOG: u16 = 0x0001;

/// Parse a custom attribute blob against its constructor signature.
///
/// `type_name` maps a type token from the constructor signature to its full name; it is used to
/// distinguish `System.Type` and `System.Object` parameters from other class-typed parameters.
///
/// # Errors
/// Returns an error if the prolog is wrong, the blob is truncated, or an argument has a type
/// that cannot appear in a custom attribute.
pub fn parse_custom_attribute_blob(
    data: &[u8],
    constructor: &SignatureMethod,
    type_name: &dyn Fn(Token) -> Option<String>,
) -> Result<CustomAttributeValue> {
    if data.is_empty() {
        return Ok(CustomAttributeValue::default());
    }

    let mut parser = CustomAttributeParser::new(data);
    parser.parse_custom_attribute(constructor, type_name)
}

/// Stateful reader over one custom attribute blob.
pub struct CustomAttributeParser<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> CustomAttributeParser<'a> {
    /// Create a parser over `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        CustomAttributeParser {
            parser: Parser::new(data),
            depth: 0,
        }
    }

    /// Parse the blob.
    ///
    /// # Errors
    /// See [`parse_custom_attribute_blob`].
    pub fn parse_custom_attribute(
        &mut self,
        constructor: &SignatureMethod,
        type_name: &dyn Fn(Token) -> Option<String>,
    ) -> Result<CustomAttributeValue> {
        let prolog = self.parser.read_le::<u16>()?;
        if prolog != PROLOG {
            return Err(malformed_error!(
                "Invalid custom attribute prolog - expected 0x0001, got 0x{:04X}",
                prolog
            ));
        }

        let mut fixed_args = Vec::with_capacity(constructor.params.len());
        for param in &constructor.params {
            fixed_args.push(self.parse_fixed_argument(&param.base, type_name)?);
        }

        let mut named_args = Vec::new();
        if self.parser.remaining() >= 2 {
            let count = self.parser.read_le::<u16>()?;
            for _ in 0..count {
                named_args.push(self.parse_named_argument()?);
            }
        }

        Ok(CustomAttributeValue {
            fixed_args,
            named_args,
        })
    }

    fn parse_fixed_argument(
        &mut self,
        signature: &TypeSignature,
        type_name: &dyn Fn(Token) -> Option<String>,
    ) -> Result<CustomAttributeArgument> {
        self.depth += 1;
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(RecursionLimit(MAX_RECURSION_DEPTH));
        }

        let result = match signature {
            TypeSignature::Boolean => self.parse_argument_by_type_tag(SERIALIZATION_TYPE::BOOLEAN),
            TypeSignature::Char => self.parse_argument_by_type_tag(SERIALIZATION_TYPE::CHAR),
            TypeSignature::I1 => self.parse_argument_by_type_tag(SERIALIZATION_TYPE::I1),
            TypeSignature::U1 => self.parse_argument_by_type_tag(SERIALIZATION_TYPE::U1),
            TypeSignature::I2 => self.parse_argument_by_type_tag(SERIALIZATION_TYPE::I2),
            TypeSignature::U2 => self.parse_argument_by_type_tag(SERIALIZATION_TYPE::U2),
            TypeSignature::I4 => self.parse_argument_by_type_tag(SERIALIZATION_TYPE::I4),
            TypeSignature::U4 => self.parse_argument_by_type_tag(SERIALIZATION_TYPE::U4),
            TypeSignature::I8 => self.parse_argument_by_type_tag(SERIALIZATION_TYPE::I8),
            TypeSignature::U8 => self.parse_argument_by_type_tag(SERIALIZATION_TYPE::U8),
            TypeSignature::R4 => self.parse_argument_by_type_tag(SERIALIZATION_TYPE::R4),
            TypeSignature::R8 => self.parse_argument_by_type_tag(SERIALIZATION_TYPE::R8),
            TypeSignature::String => self.parse_argument_by_type_tag(SERIALIZATION_TYPE::STRING),
            TypeSignature::Object => self.parse_tagged_object(),
            TypeSignature::ValueType(token) => {
                let name = type_name(*token).unwrap_or_default();
                Ok(CustomAttributeArgument::Enum(
                    name,
                    self.parser.read_le::<i32>()?,
                ))
            }
            TypeSignature::Class(token) => match type_name(*token).as_deref() {
                Some("System.Type") => self.parse_argument_by_type_tag(SERIALIZATION_TYPE::TYPE),
                Some("System.Object") => self.parse_tagged_object(),
                other => Err(malformed_error!(
                    "Unsupported class-typed custom attribute argument - {}",
                    other.unwrap_or("<unresolved>")
                )),
            },
            TypeSignature::SzArray(element) => {
                let count = self.parser.read_le::<u32>()?;
                if count == u32::MAX {
                    Ok(CustomAttributeArgument::Null)
                } else if count as usize > self.parser.remaining() {
                    Err(malformed_error!(
                        "Array length {} exceeds custom attribute blob",
                        count
                    ))
                } else {
                    let mut items = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        items.push(self.parse_fixed_argument(element, type_name)?);
                    }
                    Ok(CustomAttributeArgument::Array(items))
                }
            }
            other => Err(malformed_error!(
                "Unsupported custom attribute argument type - {:?}",
                other
            )),
        };

        self.depth -= 1;
        result
    }

    fn parse_tagged_object(&mut self) -> Result<CustomAttributeArgument> {
        let tag = self.parser.read_le::<u8>()?;
        self.parse_argument_by_type_tag(tag)
    }

    fn parse_named_argument(&mut self) -> Result<CustomAttributeNamedArgument> {
        let kind = self.parser.read_le::<u8>()?;
        let is_field = match kind {
            SERIALIZATION_TYPE::FIELD => true,
            SERIALIZATION_TYPE::PROPERTY => false,
            _ => {
                return Err(malformed_error!(
                    "Invalid named argument kind - 0x{:02X}",
                    kind
                ))
            }
        };

        let type_tag = self.parser.read_le::<u8>()?;
        let enum_name = if type_tag == SERIALIZATION_TYPE::ENUM {
            Some(self.parser.read_ser_string()?.unwrap_or_default())
        } else {
            None
        };

        let Some(name) = self.parser.read_ser_string()? else {
            return Err(malformed_error!("Named argument without a name"));
        };

        let value = match enum_name {
            Some(enum_name) => CustomAttributeArgument::Enum(enum_name, self.parser.read_le::<i32>()?),
            None => self.parse_argument_by_type_tag(type_tag)?,
        };

        Ok(CustomAttributeNamedArgument {
            is_field,
            name,
            value,
        })
    }

    fn parse_argument_by_type_tag(&mut self, type_tag: u8) -> Result<CustomAttributeArgument> {
        Ok(match type_tag {
            SERIALIZATION_TYPE::BOOLEAN => CustomAttributeArgument::Bool(self.parser.read_le::<u8>()? != 0),
            SERIALIZATION_TYPE::CHAR => {
                let unit = self.parser.read_le::<u16>()?;
                CustomAttributeArgument::Char(
                    char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER),
                )
            }
            SERIALIZATION_TYPE::I1 => CustomAttributeArgument::I1(self.parser.read_le::<i8>()?),
            SERIALIZATION_TYPE::U1 => CustomAttributeArgument::U1(self.parser.read_le::<u8>()?),
            SERIALIZATION_TYPE::I2 => CustomAttributeArgument::I2(self.parser.read_le::<i16>()?),
            SERIALIZATION_TYPE::U2 => CustomAttributeArgument::U2(self.parser.read_le::<u16>()?),
            SERIALIZATION_TYPE::I4 => CustomAttributeArgument::I4(self.parser.read_le::<i32>()?),
            SERIALIZATION_TYPE::U4 => CustomAttributeArgument::U4(self.parser.read_le::<u32>()?),
            SERIALIZATION_TYPE::I8 => CustomAttributeArgument::I8(self.parser.read_le::<i64>()?),
            SERIALIZATION_TYPE::U8 => CustomAttributeArgument::U8(self.parser.read_le::<u64>()?),
            SERIALIZATION_TYPE::R4 => CustomAttributeArgument::R4(self.parser.read_le::<f32>()?),
            SERIALIZATION_TYPE::R8 => CustomAttributeArgument::R8(self.parser.read_le::<f64>()?),
            SERIALIZATION_TYPE::STRING => match self.parser.read_ser_string()? {
                Some(value) => CustomAttributeArgument::String(value),
                None => CustomAttributeArgument::Null,
            },
            SERIALIZATION_TYPE::TYPE => match self.parser.read_ser_string()? {
                Some(value) => CustomAttributeArgument::Type(value),
                None => CustomAttributeArgument::Null,
            },
            SERIALIZATION_TYPE::ENUM => {
                let name = self.parser.read_ser_string()?.unwrap_or_default();
                CustomAttributeArgument::Enum(name, self.parser.read_le::<i32>()?)
            }
            _ => {
                return Err(malformed_error!(
                    "Unsupported serialization type tag - 0x{:02X}",
                    type_tag
                ))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::signatures::SignatureParameter;

    fn constructor(params: Vec<TypeSignature>) -> SignatureMethod {
        SignatureMethod {
            has_this: true,
            return_type: SignatureParameter::new(TypeSignature::Void),
            params: params.into_iter().map(SignatureParameter::new).collect(),
            ..Default::default()
        }
    }

    fn no_types(_: Token) -> Option<String> {
        None
    }

    #[test]
    fn test_parse_empty_blob() {
        let value = parse_custom_attribute_blob(&[], &constructor(vec![]), &no_types).unwrap();
        assert!(value.fixed_args.is_empty());
        assert!(value.named_args.is_empty());
    }

    #[test]
    fn test_parse_invalid_prolog() {
        let result = parse_custom_attribute_blob(&[0x00, 0x01], &constructor(vec![]), &no_types);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_metadata_pair() {
        #[rustfmt::skip]
        let blob = [
            0x01, 0x00,
            0x08, b'C', b'a', b't', b'e', b'g', b'o', b'r', b'y',
            0x04, b'G', b'a', b'm', b'e',
            0x00, 0x00,
        ];
        let ctor = constructor(vec![TypeSignature::String, TypeSignature::String]);
        let value = parse_custom_attribute_blob(&blob, &ctor, &no_types).unwrap();

        assert_eq!(value.fixed_args.len(), 2);
        assert_eq!(value.fixed_args[0].as_str(), Some("Category"));
        assert_eq!(value.fixed_args[1].as_str(), Some("Game"));
    }

    #[test]
    fn test_parse_named_arguments() {
        #[rustfmt::skip]
        let blob = [
            0x01, 0x00,
            0x02, 0x00,
            0x54, 0x0E, 0x0F,
            b'R', b'e', b'p', b'l', b'i', b'c', b'a', b't', b'e', b'd', b'U', b's', b'i', b'n', b'g',
            0x05, b'O', b'n', b'R', b'e', b'p',
            0x54, 0x02, 0x0A,
            b'F', b'a', b's', b't', b'A', b'c', b'c', b'e', b's', b's',
            0x01,
        ];
        let value = parse_custom_attribute_blob(&blob, &constructor(vec![]), &no_types).unwrap();

        assert_eq!(value.named_args.len(), 2);
        assert!(!value.named_args[0].is_field);
        assert_eq!(
            value.named("ReplicatedUsing").and_then(CustomAttributeArgument::as_str),
            Some("OnRep")
        );
        assert_eq!(
            value.named("FastAccess").and_then(CustomAttributeArgument::as_bool),
            Some(true)
        );
    }

    #[test]
    fn test_parse_flags_and_enum() {
        #[rustfmt::skip]
        let blob = [
            0x01, 0x00,
            0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,
        ];
        let ctor = constructor(vec![
            TypeSignature::U8,
            TypeSignature::ValueType(Token::new(0x0100_0001)),
        ]);
        let names = |_: Token| Some("Game.EMode".to_string());
        let value = parse_custom_attribute_blob(&blob, &ctor, &names).unwrap();

        assert_eq!(value.fixed_args[0].as_flags(), Some(4));
        assert_eq!(
            value.fixed_args[1],
            CustomAttributeArgument::Enum("Game.EMode".to_string(), 2)
        );
    }

    #[test]
    fn test_parse_truncated() {
        let blob = [0x01, 0x00, 0x05, b'a'];
        let ctor = constructor(vec![TypeSignature::String]);
        assert!(parse_custom_attribute_blob(&blob, &ctor, &no_types).is_err());
    }
}

//! Custom attribute blob encoder, the inverse of [`super::parse_custom_attribute_blob`].

use crate::{
    file::io::{write_compressed_uint, write_le},
    metadata::customattributes::{
        CustomAttributeArgument, CustomAttributeValue, SERIALIZATION_TYPE,
    },
    Result,
};

fn write_ser_string(buffer: &mut Vec<u8>, value: &str) -> Result<()> {
    let Ok(length) = u32::try_from(value.len()) else {
        return Err(malformed_error!("String too long for a custom attribute"));
    };
    write_compressed_uint(buffer, length)?;
    buffer.extend_from_slice(value.as_bytes());
    Ok(())
}

fn type_tag(argument: &CustomAttributeArgument) -> u8 {
    match argument {
        CustomAttributeArgument::Null | CustomAttributeArgument::String(_) => {
            SERIALIZATION_TYPE::STRING
        }
        CustomAttributeArgument::Bool(_) => SERIALIZATION_TYPE::BOOLEAN,
        CustomAttributeArgument::Char(_) => SERIALIZATION_TYPE::CHAR,
        CustomAttributeArgument::I1(_) => SERIALIZATION_TYPE::I1,
        CustomAttributeArgument::U1(_) => SERIALIZATION_TYPE::U1,
        CustomAttributeArgument::I2(_) => SERIALIZATION_TYPE::I2,
        CustomAttributeArgument::U2(_) => SERIALIZATION_TYPE::U2,
        CustomAttributeArgument::I4(_) => SERIALIZATION_TYPE::I4,
        CustomAttributeArgument::U4(_) => SERIALIZATION_TYPE::U4,
        CustomAttributeArgument::I8(_) => SERIALIZATION_TYPE::I8,
        CustomAttributeArgument::U8(_) => SERIALIZATION_TYPE::U8,
        CustomAttributeArgument::R4(_) => SERIALIZATION_TYPE::R4,
        CustomAttributeArgument::R8(_) => SERIALIZATION_TYPE::R8,
        CustomAttributeArgument::Type(_) => SERIALIZATION_TYPE::TYPE,
        CustomAttributeArgument::Array(_) => SERIALIZATION_TYPE::SZARRAY,
        CustomAttributeArgument::Enum(_, _) => SERIALIZATION_TYPE::ENUM,
    }
}

fn encode_argument(argument: &CustomAttributeArgument, buffer: &mut Vec<u8>) -> Result<()> {
    match argument {
        CustomAttributeArgument::Null => buffer.push(0xFF),
        CustomAttributeArgument::Bool(value) => buffer.push(u8::from(*value)),
        CustomAttributeArgument::Char(value) => {
            let mut units = [0u16; 2];
            let encoded = value.encode_utf16(&mut units);
            write_le(buffer, encoded[0]);
        }
        CustomAttributeArgument::I1(value) => write_le(buffer, *value),
        CustomAttributeArgument::U1(value) => write_le(buffer, *value),
        CustomAttributeArgument::I2(value) => write_le(buffer, *value),
        CustomAttributeArgument::U2(value) => write_le(buffer, *value),
        CustomAttributeArgument::I4(value) | CustomAttributeArgument::Enum(_, value) => {
            write_le(buffer, *value);
        }
        CustomAttributeArgument::U4(value) => write_le(buffer, *value),
        CustomAttributeArgument::I8(value) => write_le(buffer, *value),
        CustomAttributeArgument::U8(value) => write_le(buffer, *value),
        CustomAttributeArgument::R4(value) => write_le(buffer, *value),
        CustomAttributeArgument::R8(value) => write_le(buffer, *value),
        CustomAttributeArgument::String(value) | CustomAttributeArgument::Type(value) => {
            write_ser_string(buffer, value)?;
        }
        CustomAttributeArgument::Array(items) => {
            let Ok(count) = u32::try_from(items.len()) else {
                return Err(malformed_error!("Array too long for a custom attribute"));
            };
            write_le(buffer, count);
            for item in items {
                encode_argument(item, buffer)?;
            }
        }
    }
    Ok(())
}

/// Encode a custom attribute value into a blob.
///
/// Fixed arguments are written by value in order; named arguments carry their serialization
/// type tag. Array-typed named arguments are not supported.
///
/// # Errors
/// Returns an error if a string is too long or a named argument is an array.
pub fn encode_custom_attribute_value(value: &CustomAttributeValue) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_le(&mut buffer, 0x0001u16);

    for argument in &value.fixed_args {
        encode_argument(argument, &mut buffer)?;
    }

    let Ok(count) = u16::try_from(value.named_args.len()) else {
        return Err(malformed_error!("Too many named arguments"));
    };
    write_le(&mut buffer, count);

    for named in &value.named_args {
        buffer.push(if named.is_field {
            SERIALIZATION_TYPE::FIELD
        } else {
            SERIALIZATION_TYPE::PROPERTY
        });

        let tag = type_tag(&named.value);
        if tag == SERIALIZATION_TYPE::SZARRAY {
            return Err(malformed_error!(
                "Array-typed named argument '{}' is not supported",
                named.name
            ));
        }
        buffer.push(tag);
        if let CustomAttributeArgument::Enum(enum_name, _) = &named.value {
            write_ser_string(&mut buffer, enum_name)?;
        }

        write_ser_string(&mut buffer, &named.name)?;
        encode_argument(&named.value, &mut buffer)?;
    }

    Ok(buffer)
}

use crate::{
    file::io::write_compressed_uint,
    metadata::{
        signatures::{
            SignatureField, SignatureMethod, SignatureParameter, SignatureProperty,
            TypeSignature, ELEMENT_TYPE, SIGNATURE_HEADER,
        },
        token::Token,
    },
    Result,
};

fn encode_type_token(token: Token, buffer: &mut Vec<u8>) -> Result<()> {
    let Some(coded_index) = token.to_type_def_or_ref() else {
        return Err(malformed_error!(
            "Token {} cannot be encoded as TypeDefOrRef",
            token
        ));
    };
    write_compressed_uint(buffer, coded_index)
}

/// Append the encoding of `signature` to `buffer`.
///
/// # Errors
/// Returns an error for [`TypeSignature::Unknown`] or tokens that do not address a type.
pub fn encode_type(signature: &TypeSignature, buffer: &mut Vec<u8>) -> Result<()> {
    match signature {
        TypeSignature::Unknown => {
            return Err(malformed_error!("Cannot encode an unknown type signature"))
        }
        TypeSignature::Void => buffer.push(ELEMENT_TYPE::VOID),
        TypeSignature::Boolean => buffer.push(ELEMENT_TYPE::BOOLEAN),
        TypeSignature::Char => buffer.push(ELEMENT_TYPE::CHAR),
        TypeSignature::I1 => buffer.push(ELEMENT_TYPE::I1),
        TypeSignature::U1 => buffer.push(ELEMENT_TYPE::U1),
        TypeSignature::I2 => buffer.push(ELEMENT_TYPE::I2),
        TypeSignature::U2 => buffer.push(ELEMENT_TYPE::U2),
        TypeSignature::I4 => buffer.push(ELEMENT_TYPE::I4),
        TypeSignature::U4 => buffer.push(ELEMENT_TYPE::U4),
        TypeSignature::I8 => buffer.push(ELEMENT_TYPE::I8),
        TypeSignature::U8 => buffer.push(ELEMENT_TYPE::U8),
        TypeSignature::R4 => buffer.push(ELEMENT_TYPE::R4),
        TypeSignature::R8 => buffer.push(ELEMENT_TYPE::R8),
        TypeSignature::String => buffer.push(ELEMENT_TYPE::STRING),
        TypeSignature::Ptr(base) => {
            buffer.push(ELEMENT_TYPE::PTR);
            encode_type(base, buffer)?;
        }
        TypeSignature::ByRef(base) => {
            buffer.push(ELEMENT_TYPE::BYREF);
            encode_type(base, buffer)?;
        }
        TypeSignature::ValueType(token) => {
            buffer.push(ELEMENT_TYPE::VALUETYPE);
            encode_type_token(*token, buffer)?;
        }
        TypeSignature::Class(token) => {
            buffer.push(ELEMENT_TYPE::CLASS);
            encode_type_token(*token, buffer)?;
        }
        TypeSignature::GenericParamType(index) => {
            buffer.push(ELEMENT_TYPE::VAR);
            write_compressed_uint(buffer, *index)?;
        }
        TypeSignature::GenericInst(base, args) => {
            buffer.push(ELEMENT_TYPE::GENERICINST);
            encode_type(base, buffer)?;
            write_compressed_uint(buffer, u32::try_from(args.len()).unwrap_or(u32::MAX))?;
            for arg in args {
                encode_type(arg, buffer)?;
            }
        }
        TypeSignature::TypedByRef => buffer.push(ELEMENT_TYPE::TYPEDBYREF),
        TypeSignature::I => buffer.push(ELEMENT_TYPE::I),
        TypeSignature::U => buffer.push(ELEMENT_TYPE::U),
        TypeSignature::Object => buffer.push(ELEMENT_TYPE::OBJECT),
        TypeSignature::SzArray(base) => {
            buffer.push(ELEMENT_TYPE::SZARRAY);
            encode_type(base, buffer)?;
        }
        TypeSignature::GenericParamMethod(index) => {
            buffer.push(ELEMENT_TYPE::MVAR);
            write_compressed_uint(buffer, *index)?;
        }
        TypeSignature::Pinned(base) => {
            buffer.push(ELEMENT_TYPE::PINNED);
            encode_type(base, buffer)?;
        }
    }
    Ok(())
}

fn encode_modifiers(modifiers: &[Token], buffer: &mut Vec<u8>) -> Result<()> {
    for modifier in modifiers {
        buffer.push(ELEMENT_TYPE::CMOD_OPT);
        encode_type_token(*modifier, buffer)?;
    }
    Ok(())
}

fn encode_parameter(parameter: &SignatureParameter, buffer: &mut Vec<u8>) -> Result<()> {
    encode_modifiers(&parameter.modifiers, buffer)?;
    if parameter.by_ref {
        buffer.push(ELEMENT_TYPE::BYREF);
    }
    encode_type(&parameter.base, buffer)
}

/// Encode a field signature blob.
///
/// # Errors
/// Returns an error if the field type cannot be encoded.
pub fn encode_field_signature(field: &SignatureField) -> Result<Vec<u8>> {
    let mut buffer = vec![SIGNATURE_HEADER::FIELD];
    encode_modifiers(&field.modifiers, &mut buffer)?;
    encode_type(&field.base, &mut buffer)?;
    Ok(buffer)
}

/// Encode a method signature blob.
///
/// # Errors
/// Returns an error if a parameter or return type cannot be encoded.
pub fn encode_method_signature(method: &SignatureMethod) -> Result<Vec<u8>> {
    let mut convention = SIGNATURE_HEADER::DEFAULT;
    if method.has_this {
        convention |= SIGNATURE_HEADER::HAS_THIS;
    }
    if method.explicit_this {
        convention |= SIGNATURE_HEADER::EXPLICIT_THIS;
    }
    if method.param_count_generic > 0 {
        convention |= SIGNATURE_HEADER::GENERIC;
    }

    let mut buffer = vec![convention];
    if method.param_count_generic > 0 {
        write_compressed_uint(&mut buffer, method.param_count_generic)?;
    }
    write_compressed_uint(
        &mut buffer,
        u32::try_from(method.params.len()).unwrap_or(u32::MAX),
    )?;
    encode_parameter(&method.return_type, &mut buffer)?;
    for param in &method.params {
        encode_parameter(param, &mut buffer)?;
    }
    Ok(buffer)
}

/// Encode a property signature blob.
///
/// # Errors
/// Returns an error if the property type cannot be encoded.
pub fn encode_property_signature(property: &SignatureProperty) -> Result<Vec<u8>> {
    let mut head = SIGNATURE_HEADER::PROPERTY;
    if property.has_this {
        head |= SIGNATURE_HEADER::HAS_THIS;
    }

    let mut buffer = vec![head];
    write_compressed_uint(
        &mut buffer,
        u32::try_from(property.params.len()).unwrap_or(u32::MAX),
    )?;
    encode_modifiers(&property.modifiers, &mut buffer)?;
    encode_type(&property.base, &mut buffer)?;
    for param in &property.params {
        encode_parameter(param, &mut buffer)?;
    }
    Ok(buffer)
}

/// Encode a type specification signature blob.
///
/// # Errors
/// Returns an error if the type cannot be encoded.
pub fn encode_type_spec_signature(signature: &TypeSignature) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    encode_type(signature, &mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::signatures::SignatureParser;

    #[test]
    fn field_matches_parser() {
        let field = SignatureField {
            modifiers: Vec::new(),
            base: TypeSignature::GenericInst(
                Box::new(TypeSignature::Class(Token::new(0x0100_0003))),
                vec![TypeSignature::String, TypeSignature::I4],
            ),
        };

        let blob = encode_field_signature(&field).unwrap();
        assert_eq!(blob, vec![0x06, 0x15, 0x12, 0x0D, 0x02, 0x0E, 0x08]);
        assert_eq!(
            SignatureParser::new(&blob).parse_field_signature().unwrap(),
            field
        );
    }

    #[test]
    fn method_header() {
        let method = SignatureMethod {
            has_this: true,
            return_type: SignatureParameter::new(TypeSignature::Void),
            params: vec![SignatureParameter::by_ref(TypeSignature::I4)],
            ..Default::default()
        };

        let blob = encode_method_signature(&method).unwrap();
        assert_eq!(blob, vec![0x20, 0x01, 0x01, 0x10, 0x08]);
    }

    #[test]
    fn invalid_token() {
        let field = SignatureField {
            modifiers: Vec::new(),
            base: TypeSignature::Class(Token::new(0x0600_0001)),
        };
        assert!(encode_field_signature(&field).is_err());
        assert!(encode_type_spec_signature(&TypeSignature::Unknown).is_err());
    }
}

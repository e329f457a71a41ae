//! Default values recovered from parameterless constructors.
//!
//! The constructor body is decoded and every `ldarg.0; <literal>; stfld` sequence records that
//! literal for the stored field. Any other store to the field, such as a computed value or a
//! `newobj`, clears what was recorded, so the field is left without a default.

use std::collections::HashMap;

use crate::{
    loader::ModuleResolver,
    metadata::{
        method::{decode_instructions, Instruction, OPCODE},
        module::{LoadedModule, TypeDeclaration},
        tables::TableId,
        token::Token,
    },
    model::{DefaultValue, PropertyDefinition, TypeClass},
};

/// A literal pushed immediately before a field store.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Literal {
    /// `ldc.i4*` / `ldc.i8`
    Integer(i64),
    /// `ldc.r4` / `ldc.r8`
    Float(f64),
    /// `ldstr`
    String(String),
}

/// Literal initializers of the parameterless constructor of `declaration`, by field name.
pub(crate) fn scan_initializers(
    module: &LoadedModule,
    declaration: &TypeDeclaration,
) -> HashMap<String, Literal> {
    let mut literals = HashMap::new();
    let Some(body) = declaration
        .default_constructor()
        .and_then(|constructor| constructor.body.as_ref())
    else {
        return literals;
    };

    let instructions = decode_instructions(&body.code);
    for (index, store) in instructions.iter().enumerate() {
        if store.opcode != OPCODE::STFLD {
            continue;
        }
        let Some(field) = store
            .token()
            .filter(|token| token.is_table(TableId::Field))
            .and_then(|token| declaration.field(token))
        else {
            continue;
        };

        // Only `ldarg.0; <literal>; stfld` counts. The last store to a field wins.
        let value = match index.checked_sub(2).map(|start| &instructions[start..index]) {
            Some([target, load]) if target.opcode == OPCODE::LDARG_0 => literal(module, load),
            _ => None,
        };
        match value {
            Some(value) => {
                literals.insert(field.name.clone(), value);
            }
            None => {
                literals.remove(&field.name);
                log::debug!(
                    "No recoverable default for '{}.{}': store at offset {} is not a literal initializer",
                    declaration.full_name(),
                    field.name,
                    store.offset
                );
            }
        }
    }
    literals
}

fn literal(module: &LoadedModule, instruction: &Instruction) -> Option<Literal> {
    if let Some(value) = instruction.integer_constant() {
        return Some(Literal::Integer(value));
    }
    if let Some(value) = instruction.float_constant() {
        return Some(Literal::Float(value));
    }
    if instruction.opcode == OPCODE::LDSTR {
        let token: Token = instruction.token()?;
        return module.user_string(token).ok().map(Literal::String);
    }
    None
}

/// Convert a literal to the default value of `property`, `None` if the kinds do not fit.
pub(crate) fn default_value(
    resolver: &ModuleResolver,
    property: &PropertyDefinition,
    literal: &Literal,
) -> Option<DefaultValue> {
    match (property.type_class, literal) {
        (TypeClass::Bool, Literal::Integer(value)) => Some(DefaultValue::Bool(*value != 0)),
        (class, Literal::Integer(value)) if class.is_integer() => Some(DefaultValue::Integer(*value)),
        (TypeClass::Float | TypeClass::Double, Literal::Float(value)) => {
            Some(DefaultValue::Float(*value))
        }
        (TypeClass::Float | TypeClass::Double, Literal::Integer(value)) => {
            Some(DefaultValue::Integer(*value))
        }
        (TypeClass::String, Literal::String(value)) => Some(DefaultValue::String(value.clone())),
        (TypeClass::Enum, Literal::Integer(value)) => enum_member(resolver, property, *value),
        _ => {
            log::debug!(
                "Initializer {:?} does not fit property '{}' of type class {}",
                literal,
                property.base.path,
                property.type_class
            );
            None
        }
    }
}

fn enum_member(
    resolver: &ModuleResolver,
    property: &PropertyDefinition,
    value: i64,
) -> Option<DefaultValue> {
    let reference = property.reference.as_ref()?;
    let module = resolver.module(&reference.module)?;
    let declaration = module.find_type(&reference.namespace, &reference.native_name)?;
    let member = declaration.fields.iter().find(|field| {
        field.is_static() && field.constant.as_ref().and_then(|constant| constant.as_i64()) == Some(value)
    })?;
    Some(DefaultValue::EnumMember {
        enum_name: reference.native_name.clone(),
        member: member.name.clone(),
    })
}

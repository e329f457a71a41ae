//! The document of one generation run.

use std::collections::HashMap;

use sha1::{Digest, Sha1};

use crate::{
    model::{
        ClassDefinition, EnumDefinition, StructDefinition, TypeDefinition,
    },
    Result,
};

/// Every model entity produced by one generation run, in export order.
///
/// Export order puts enums first, then structs with referenced structs before referencing ones,
/// then interfaces, then classes with super types before derived types. Display names are unique.
#[derive(Debug, Default)]
pub struct TypeDefinitionDocument {
    types: Vec<TypeDefinition>,
    index: HashMap<String, usize>,
}

impl TypeDefinitionDocument {
    /// Assemble a document from entities already in export order and compute their checksums.
    ///
    /// # Errors
    /// Returns an internal error if two entities share a display name; collisions are rejected
    /// during classification, so this indicates a builder bug.
    pub fn new(mut types: Vec<TypeDefinition>) -> Result<Self> {
        let mut index = HashMap::with_capacity(types.len());
        for (position, definition) in types.iter().enumerate() {
            if index.insert(definition.name().to_string(), position).is_some() {
                return Err(internal_error!(
                    "Duplicate display name '{}' in document",
                    definition.name()
                ));
            }
        }

        for definition in &mut types {
            let checksum = checksum(definition);
            definition.base_mut().checksum = Some(checksum);
        }

        Ok(TypeDefinitionDocument { types, index })
    }

    /// Entity by display name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.index.get(name).map(|position| &self.types[*position])
    }

    /// Entity by declared name and namespace.
    #[must_use]
    pub fn find(&self, namespace: &str, native_name: &str) -> Option<&TypeDefinition> {
        self.types.iter().find(|definition| {
            definition.base().namespace == namespace && definition.base().native_name == native_name
        })
    }

    /// Struct by declared name and namespace.
    #[must_use]
    pub fn find_struct(&self, namespace: &str, native_name: &str) -> Option<&StructDefinition> {
        match self.find(namespace, native_name) {
            Some(TypeDefinition::Struct(definition)) => Some(definition),
            _ => None,
        }
    }

    /// Enum by declared name and namespace.
    #[must_use]
    pub fn find_enum(&self, namespace: &str, native_name: &str) -> Option<&EnumDefinition> {
        match self.find(namespace, native_name) {
            Some(TypeDefinition::Enum(definition)) => Some(definition),
            _ => None,
        }
    }

    /// Every entity in export order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.iter()
    }

    /// Every class and interface.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDefinition> {
        self.types.iter().filter_map(|definition| match definition {
            TypeDefinition::Class(class) => Some(class),
            _ => None,
        })
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if the document holds no entity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// SHA-1 over the canonical rendering of an entity, excluding the checksum itself.
fn checksum(definition: &TypeDefinition) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("{definition:?}").as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BaseDefinition, EnumField, TypeClass, TypeFlags};

    fn enumeration(name: &str, namespace: &str) -> TypeDefinition {
        TypeDefinition::Enum(EnumDefinition {
            base: BaseDefinition::for_type(name, namespace, "Game", "Game"),
            underlying: TypeClass::UInt8,
            fields: vec![EnumField {
                name: "None".to_string(),
                value: 0,
            }],
            flags: TypeFlags::empty(),
        })
    }

    #[test]
    fn lookup_and_checksum() {
        let document =
            TypeDefinitionDocument::new(vec![enumeration("EMode", "Game"), enumeration("EState", "Game")])
                .unwrap();
        assert_eq!(document.len(), 2);
        assert!(document.get("Mode").is_some());
        assert!(document.find_enum("Game", "EState").is_some());

        let first = document.get("Mode").unwrap().base().checksum.clone().unwrap();
        assert_eq!(first.len(), 40);
        let again = TypeDefinitionDocument::new(vec![enumeration("EMode", "Game")]).unwrap();
        assert_eq!(again.get("Mode").unwrap().base().checksum.as_ref(), Some(&first));
    }

    #[test]
    fn duplicate_names() {
        let result = TypeDefinitionDocument::new(vec![
            enumeration("EMode", "Game"),
            enumeration("EMode", "Game.Other"),
        ]);
        assert!(result.is_err());
    }
}

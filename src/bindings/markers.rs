//! Binding markers: custom attributes matched by simple name.

use std::collections::BTreeMap;

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::metadata::{customattributes::CustomAttributeArgument, module::AttributeDeclaration};

/// A recognised marker attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Marker {
    /// Reflected class
    UClass,
    /// Reflected struct
    UStruct,
    /// Reflected enum
    UEnum,
    /// Reflected interface
    UInterface,
    /// Reflected field or property
    UProperty,
    /// Reflected method
    UFunction,
    /// Key/value annotation
    UMetaData,
    /// Placeholder describing a native counterpart
    BindingDefinition,
    /// Placeholder of a native-binding type
    NativeBinding,
    /// Placeholder of a blueprint-binding type
    BlueprintBinding,
}

impl Marker {
    /// Match an attribute simple name, with or without the `Attribute` suffix.
    #[must_use]
    pub fn from_attribute_name(name: &str) -> Option<Marker> {
        let name = name.strip_suffix("Attribute").unwrap_or(name);
        Marker::iter().find(|marker| marker.to_string() == name)
    }

    /// Returns `true` for the type markers that make a declaration an implementation type.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        matches!(
            self,
            Marker::UClass | Marker::UStruct | Marker::UEnum | Marker::UInterface
        )
    }

    /// Returns `true` for the markers that make a declaration a placeholder type.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(
            self,
            Marker::BindingDefinition | Marker::NativeBinding | Marker::BlueprintBinding
        )
    }
}

/// The first attribute carrying `marker`.
#[must_use]
pub fn find_marker(attributes: &[AttributeDeclaration], marker: Marker) -> Option<&AttributeDeclaration> {
    attributes
        .iter()
        .find(|attribute| Marker::from_attribute_name(attribute.simple_name()) == Some(marker))
}

/// Returns `true` if an attribute carries `marker`.
#[must_use]
pub fn has_marker(attributes: &[AttributeDeclaration], marker: Marker) -> bool {
    find_marker(attributes, marker).is_some()
}

/// Every marker present, in attribute order.
#[must_use]
pub fn markers(attributes: &[AttributeDeclaration]) -> Vec<Marker> {
    attributes
        .iter()
        .filter_map(|attribute| Marker::from_attribute_name(attribute.simple_name()))
        .collect()
}

/// Returns `true` if an attribute has the simple name `name`, with or without `Attribute` suffix.
#[must_use]
pub fn has_attribute(attributes: &[AttributeDeclaration], name: &str) -> bool {
    attributes.iter().any(|attribute| {
        let simple = attribute.simple_name();
        simple == name || simple.strip_suffix("Attribute") == Some(name)
    })
}

/// Annotations of every `UMetaData(key, value)` attribute plus the metadata implied by member
/// marker arguments.
#[must_use]
pub fn collect_metadata(attributes: &[AttributeDeclaration]) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    for attribute in attributes {
        match Marker::from_attribute_name(attribute.simple_name()) {
            Some(Marker::UMetaData) => {
                let key = attribute.value.fixed_args.first().and_then(CustomAttributeArgument::as_str);
                let value = attribute
                    .value
                    .fixed_args
                    .get(1)
                    .and_then(CustomAttributeArgument::as_str)
                    .unwrap_or_default();
                if let Some(key) = key {
                    metadata.insert(key.to_string(), value.to_string());
                }
            }
            Some(Marker::UProperty) => {
                if let Some(callback) = attribute
                    .value
                    .named("ReplicatedUsing")
                    .and_then(CustomAttributeArgument::as_str)
                {
                    metadata.insert("ReplicatedUsing".to_string(), callback.to_string());
                }
                if attribute
                    .value
                    .named("Replicated")
                    .and_then(CustomAttributeArgument::as_bool)
                    == Some(true)
                {
                    metadata.insert("Replicated".to_string(), "true".to_string());
                }
            }
            _ => {}
        }
    }
    metadata
}

/// User flags of a marker: the first fixed argument, if it is an integer.
#[must_use]
pub fn user_flags(attribute: &AttributeDeclaration) -> u64 {
    attribute
        .value
        .fixed_args
        .first()
        .and_then(CustomAttributeArgument::as_flags)
        .unwrap_or(0)
}

/// Boolean named argument `name` of `attribute`, `false` when absent.
#[must_use]
pub fn named_flag(attribute: &AttributeDeclaration, name: &str) -> bool {
    attribute
        .value
        .named(name)
        .and_then(CustomAttributeArgument::as_bool)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::customattributes::{CustomAttributeNamedArgument, CustomAttributeValue};

    fn attribute(type_name: &str, value: CustomAttributeValue) -> AttributeDeclaration {
        AttributeDeclaration {
            type_name: type_name.to_string(),
            value,
        }
    }

    #[test]
    fn names() {
        assert_eq!(Marker::from_attribute_name("UClassAttribute"), Some(Marker::UClass));
        assert_eq!(Marker::from_attribute_name("UStruct"), Some(Marker::UStruct));
        assert_eq!(Marker::from_attribute_name("Serializable"), None);
        assert!(Marker::UEnum.is_primary());
        assert!(Marker::NativeBinding.is_placeholder());
        assert!(!Marker::UProperty.is_primary());
    }

    #[test]
    fn metadata() {
        let attributes = vec![
            attribute(
                "Engine.UMetaDataAttribute",
                CustomAttributeValue {
                    fixed_args: vec![
                        CustomAttributeArgument::String("Category".to_string()),
                        CustomAttributeArgument::String("Combat".to_string()),
                    ],
                    named_args: Vec::new(),
                },
            ),
            attribute(
                "Engine.UPropertyAttribute",
                CustomAttributeValue {
                    fixed_args: vec![CustomAttributeArgument::U8(0x4)],
                    named_args: vec![CustomAttributeNamedArgument {
                        is_field: false,
                        name: "ReplicatedUsing".to_string(),
                        value: CustomAttributeArgument::String("OnRep_Health".to_string()),
                    }],
                },
            ),
        ];

        let metadata = collect_metadata(&attributes);
        assert_eq!(metadata.get("Category").map(String::as_str), Some("Combat"));
        assert_eq!(
            metadata.get("ReplicatedUsing").map(String::as_str),
            Some("OnRep_Health")
        );
        assert_eq!(user_flags(&attributes[1]), 0x4);
        assert_eq!(markers(&attributes), vec![Marker::UMetaData, Marker::UProperty]);
    }
}

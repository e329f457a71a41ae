//! Reflected member collection.

use crate::{
    bindings::markers::{find_marker, has_marker, Marker},
    metadata::{
        flags::{FieldAttributes, MemberAccess},
        module::{AttributeDeclaration, MethodDeclaration, TypeDeclaration},
        signatures::TypeSignature,
        token::Token,
    },
    model::{names::backing_field_property, FunctionFlags, PropertyFlags},
};

/// A field or property that becomes a [`crate::model::PropertyDefinition`].
#[derive(Debug, Clone)]
pub(crate) struct ReflectedMember {
    /// Member name
    pub name: String,
    /// Token of the declaring field or property row
    pub token: Token,
    /// Declared type
    pub signature: TypeSignature,
    /// Declared accessibility
    pub access: MemberAccess,
    /// Static storage
    pub is_static: bool,
    /// No setter, or an init-only field
    pub read_only: bool,
    /// Applied attributes
    pub attributes: Vec<AttributeDeclaration>,
    /// Name of the storage field the constructor assigns
    pub storage: String,
}

impl ReflectedMember {
    /// The `UProperty` marker, if present.
    pub fn marker(&self) -> Option<&AttributeDeclaration> {
        find_marker(&self.attributes, Marker::UProperty)
    }
}

/// Members of `declaration` in declaration order.
///
/// With `all` every instance field and auto-property is returned, which is how placeholder
/// structs describe their native layout. Otherwise only `UProperty` members are returned,
/// static ones included so they can be rejected.
pub(crate) fn reflected_members(declaration: &TypeDeclaration, all: bool) -> Vec<ReflectedMember> {
    let mut members = Vec::new();
    let mut covered = Vec::new();

    for field in &declaration.fields {
        if field.flags.contains(FieldAttributes::LITERAL) || field.name == "value__" {
            continue;
        }

        if let Some(property_name) = backing_field_property(&field.name) {
            let Some(property) = declaration
                .properties
                .iter()
                .find(|property| property.name == property_name)
            else {
                continue;
            };
            covered.push(property.token);
            if !all && !has_marker(&property.attributes, Marker::UProperty) {
                continue;
            }
            if all && field.is_static() {
                continue;
            }

            let accessor = property
                .getter
                .or(property.setter)
                .and_then(|token| declaration.method(token));
            members.push(ReflectedMember {
                name: property.name.clone(),
                token: property.token,
                signature: property.signature.base.clone(),
                access: accessor.map_or(MemberAccess::Public, MethodDeclaration::access),
                is_static: field.is_static(),
                read_only: property.setter.is_none(),
                attributes: property.attributes.clone(),
                storage: field.name.clone(),
            });
            continue;
        }

        if all {
            if field.is_static() {
                continue;
            }
        } else if !has_marker(&field.attributes, Marker::UProperty) {
            continue;
        }

        members.push(ReflectedMember {
            name: field.name.clone(),
            token: field.token,
            signature: field.signature.clone(),
            access: field.access(),
            is_static: field.is_static(),
            read_only: field.flags.contains(FieldAttributes::INIT_ONLY),
            attributes: field.attributes.clone(),
            storage: field.name.clone(),
        });
    }

    // Properties with hand-written accessors have no backing field.
    for property in &declaration.properties {
        if covered.contains(&property.token) || !has_marker(&property.attributes, Marker::UProperty) {
            continue;
        }
        let accessor = property
            .getter
            .or(property.setter)
            .and_then(|token| declaration.method(token));
        members.push(ReflectedMember {
            name: property.name.clone(),
            token: property.token,
            signature: property.signature.base.clone(),
            access: accessor.map_or(MemberAccess::Public, MethodDeclaration::access),
            is_static: accessor.is_some_and(MethodDeclaration::is_static),
            read_only: property.setter.is_none(),
            attributes: property.attributes.clone(),
            storage: property.name.clone(),
        });
    }

    members
}

/// `UFunction` methods of `declaration` in declaration order.
pub(crate) fn reflected_functions(declaration: &TypeDeclaration) -> Vec<&MethodDeclaration> {
    declaration
        .methods
        .iter()
        .filter(|method| {
            !method.is_constructor()
                && !method.is_special_name()
                && has_marker(&method.attributes, Marker::UFunction)
        })
        .collect()
}

/// Visibility flags of a property.
pub(crate) fn property_access(access: MemberAccess) -> PropertyFlags {
    match access {
        MemberAccess::Public => PropertyFlags::PUBLIC,
        access if access.is_protected() => PropertyFlags::PROTECTED,
        _ => PropertyFlags::PRIVATE,
    }
}

/// Visibility flags of a function.
pub(crate) fn function_access(access: MemberAccess) -> FunctionFlags {
    match access {
        MemberAccess::Public => FunctionFlags::PUBLIC,
        access if access.is_protected() => FunctionFlags::PROTECTED,
        _ => FunctionFlags::PRIVATE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::factories::sample_module;

    #[test]
    fn declaration_order() {
        let module = sample_module();
        let actor = module.find_type("Game.Actors", "AMyActor").unwrap();
        let names: Vec<String> = reflected_members(actor, false)
            .into_iter()
            .map(|member| member.name)
            .collect();
        assert_eq!(
            names,
            [
                "Health",
                "Mode",
                "Tags",
                "Scores",
                "Target",
                "ProjectileClass",
                "LastHit",
                "OnHit",
                "Label"
            ]
        );

        let label = reflected_members(actor, false).pop().unwrap();
        assert_eq!(label.storage, "<Label>k__BackingField");
        assert!(!label.read_only);
    }

    #[test]
    fn functions() {
        let module = sample_module();
        let actor = module.find_type("Game.Actors", "AMyActor").unwrap();
        let names: Vec<&str> = reflected_functions(actor)
            .into_iter()
            .map(|method| method.name.as_str())
            .collect();
        assert_eq!(names, ["OnRep_Health", "Fire", "Reset", "Interact", "ReceiveTick"]);
    }
}

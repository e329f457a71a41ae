//! Model entities.
//!
//! Every entity is built once by [`crate::factory`] and not mutated afterwards, except for the
//! content checksum the document computes when it is assembled.

use std::collections::{BTreeMap, BTreeSet};

use strum::Display;
use uguid::Guid;

use crate::model::{
    flags::{FunctionFlags, PropertyFlags, TypeFlags},
    guid::name_guid,
    names::{display_name, member_path, native_path, package_path},
    typeclass::TypeClass,
};

/// Identity shared by every model entity.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseDefinition {
    /// Display name, the native name without its engine-convention prefix
    pub name: String,
    /// Declared name
    pub native_name: String,
    /// Declaring namespace
    pub namespace: String,
    /// Dotted native path, e.g. `/Script/Game.MyActor`
    pub path: String,
    /// Owning project
    pub project: String,
    /// Namespace relative to the project root namespace, `/` separated
    pub package_path: String,
    /// Name of the module the declaration was loaded from
    pub module: String,
    /// User flags supplied by markers
    pub user_flags: u64,
    /// Explicit or derived identifier
    pub guid: Guid,
    /// Key/value annotations
    pub metadata: BTreeMap<String, String>,
    /// SHA-1 of the entity content, set when the document is assembled
    pub checksum: Option<String>,
}

impl BaseDefinition {
    /// Identity of a type declared as `native_name` in `namespace` of `project`.
    ///
    /// The GUID is derived from the module name and native path.
    #[must_use]
    pub fn for_type(native_name: &str, namespace: &str, project: &str, module: &str) -> Self {
        let name = display_name(native_name);
        let path = native_path(project, &name);
        BaseDefinition {
            guid: name_guid(&format!("{module}:{path}")),
            name,
            native_name: native_name.to_string(),
            namespace: namespace.to_string(),
            package_path: package_path(project, namespace),
            path,
            project: project.to_string(),
            module: module.to_string(),
            user_flags: 0,
            metadata: BTreeMap::new(),
            checksum: None,
        }
    }

    /// Identity of a member `name` of the type identified by `owner`.
    #[must_use]
    pub fn for_member(name: &str, owner: &BaseDefinition) -> Self {
        let path = member_path(&owner.path, name);
        BaseDefinition {
            guid: name_guid(&format!("{}:{}", owner.module, path)),
            name: name.to_string(),
            native_name: name.to_string(),
            namespace: owner.namespace.clone(),
            package_path: owner.package_path.clone(),
            path,
            project: owner.project.clone(),
            module: owner.module.clone(),
            user_flags: 0,
            metadata: BTreeMap::new(),
            checksum: None,
        }
    }

    /// Metadata value for `key`.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// `Namespace.NativeName`.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.native_name.clone()
        } else {
            format!("{}.{}", self.namespace, self.native_name)
        }
    }
}

/// Category of a referenced reflected type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ReferenceKind {
    /// Reflected class
    Class,
    /// Reflected interface
    Interface,
    /// Reflected struct
    Struct,
    /// Reflected enum
    Enum,
    /// Delegate type
    Delegate,
}

/// A by-name link to a reflected type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeReferenceInfo {
    /// Declared name
    pub native_name: String,
    /// Display name
    pub name: String,
    /// Declaring namespace
    pub namespace: String,
    /// Declaring module
    pub module: String,
    /// Category
    pub kind: ReferenceKind,
    /// Underlying integer tag of an enum
    pub underlying: Option<TypeClass>,
}

impl TypeReferenceInfo {
    /// `Namespace.NativeName`.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.native_name.clone()
        } else {
            format!("{}.{}", self.namespace, self.native_name)
        }
    }
}

/// A default value recovered from a parameterless constructor.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// Boolean literal
    Bool(bool),
    /// Integer literal
    Integer(i64),
    /// Floating point literal
    Float(f64),
    /// String literal
    String(String),
    /// Enum member
    EnumMember {
        /// Declared name of the enum
        enum_name: String,
        /// Member name
        member: String,
    },
}

impl DefaultValue {
    /// Source spelling of the value for a property of `type_class`.
    #[must_use]
    pub fn to_source(&self, type_class: TypeClass) -> String {
        match self {
            DefaultValue::Bool(value) => value.to_string(),
            DefaultValue::Integer(value) => match type_class {
                TypeClass::UInt32 => format!("{value}u"),
                TypeClass::Int64 => format!("{value}L"),
                TypeClass::UInt64 => format!("{value}UL"),
                TypeClass::Float => format!("{value}f"),
                TypeClass::Double => format!("{value}.0"),
                _ => value.to_string(),
            },
            DefaultValue::Float(value) => {
                let mut text = format!("{value:?}");
                if !text.contains(['.', 'e', 'E']) {
                    text.push_str(".0");
                }
                if type_class == TypeClass::Float {
                    text.push('f');
                }
                text
            }
            DefaultValue::String(value) => {
                let mut text = String::with_capacity(value.len() + 2);
                text.push('"');
                for c in value.chars() {
                    match c {
                        '"' => text.push_str("\\\""),
                        '\\' => text.push_str("\\\\"),
                        '\n' => text.push_str("\\n"),
                        '\r' => text.push_str("\\r"),
                        '\t' => text.push_str("\\t"),
                        _ => text.push(c),
                    }
                }
                text.push('"');
                text
            }
            DefaultValue::EnumMember { enum_name, member } => format!("{enum_name}.{member}"),
        }
    }
}

/// One field, parameter or return value.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefinition {
    /// Identity
    pub base: BaseDefinition,
    /// Semantic type name in the binding language, e.g. `int` or `TArray<FVector>`
    pub type_name: String,
    /// Marshaling kind
    pub type_class: TypeClass,
    /// Native size in bytes
    pub size: usize,
    /// Native alignment in bytes
    pub alignment: usize,
    /// Offset within the owner's derived native layout
    pub offset: usize,
    /// Flags
    pub flags: PropertyFlags,
    /// Referenced reflected type of object, struct, enum and class references
    pub reference: Option<TypeReferenceInfo>,
    /// Generic arguments of containers, key before value for maps
    pub inner: Vec<PropertyDefinition>,
    /// Callback shape of delegate properties
    pub signature: Option<Box<FunctionDefinition>>,
    /// Recovered default value
    pub default_value: Option<DefaultValue>,
}

impl PropertyDefinition {
    /// Property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.base.name
    }

    /// Returns `true` for the return value of a function.
    #[must_use]
    pub fn is_return(&self) -> bool {
        self.flags.contains(PropertyFlags::RETURN)
    }

    /// Returns `true` for `out` and `ref` parameters.
    #[must_use]
    pub fn is_out(&self) -> bool {
        self.flags
            .intersects(PropertyFlags::OUT | PropertyFlags::REFERENCE)
    }

    /// Walk this property and all inner properties depth first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a PropertyDefinition)) {
        visit(self);
        for inner in &self.inner {
            inner.walk(visit);
        }
    }
}

/// A function, or the callback shape of a delegate.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    /// Identity
    pub base: BaseDefinition,
    /// Parameters in declaration order
    pub parameters: Vec<PropertyDefinition>,
    /// Return value
    pub return_value: Option<PropertyDefinition>,
    /// Flags
    pub flags: FunctionFlags,
    /// Identity string compared against base-class overrides, e.g. `bool(float,out int)`
    pub signature: String,
    /// Size of the native parameter block
    pub params_size: usize,
}

impl FunctionDefinition {
    /// Function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.base.name
    }

    /// Parameters followed by the return value.
    pub fn properties(&self) -> impl Iterator<Item = &PropertyDefinition> {
        self.parameters.iter().chain(self.return_value.iter())
    }

    /// Returns `true` if the function has neither parameters nor a return value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.return_value.is_none()
    }

    /// Returns `true` for static functions.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(FunctionFlags::STATIC)
    }
}

/// One enumeration member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumField {
    /// Member name
    pub name: String,
    /// Integer value, wide enough for both `long` and `ulong` members
    pub value: i128,
}

/// A reflected enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDefinition {
    /// Identity
    pub base: BaseDefinition,
    /// Underlying integer tag
    pub underlying: TypeClass,
    /// Members in declaration order
    pub fields: Vec<EnumField>,
    /// Flags
    pub flags: TypeFlags,
}

impl EnumDefinition {
    /// Member name of `value`.
    #[must_use]
    pub fn member_name(&self, value: i128) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.value == value)
            .map(|field| field.name.as_str())
    }
}

/// A reflected struct, and the common part of classes.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDefinition {
    /// Identity
    pub base: BaseDefinition,
    /// Properties in declaration order
    pub properties: Vec<PropertyDefinition>,
    /// Namespaces the emitted file imports
    pub dependencies: BTreeSet<String>,
    /// Flags
    pub flags: TypeFlags,
    /// Native size of the derived layout
    pub size: usize,
    /// Native alignment of the derived layout
    pub alignment: usize,
    /// Returns `true` if every member is blittable
    pub blittable: bool,
}

/// A reflected class or interface.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDefinition {
    /// Properties, dependencies and identity
    pub structure: StructDefinition,
    /// Functions in declaration order
    pub functions: Vec<FunctionDefinition>,
    /// Reflected super type, by name
    pub super_type: Option<TypeReferenceInfo>,
    /// Implemented reflected interfaces, by name
    pub interfaces: Vec<TypeReferenceInfo>,
}

impl ClassDefinition {
    /// Returns `true` for interfaces.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.structure.flags.contains(TypeFlags::INTERFACE)
    }

    /// Function by name.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.iter().find(|function| function.name() == name)
    }
}

/// Category directory of an emitted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum TypeCategory {
    /// `Enums`
    Enums,
    /// `Structs`
    Structs,
    /// `Classes`
    Classes,
    /// `Interfaces`
    Interfaces,
}

/// Any type-level model entity.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinition {
    /// Enumeration
    Enum(EnumDefinition),
    /// Struct
    Struct(StructDefinition),
    /// Class or interface
    Class(ClassDefinition),
}

impl TypeDefinition {
    /// Identity of the entity.
    #[must_use]
    pub fn base(&self) -> &BaseDefinition {
        match self {
            TypeDefinition::Enum(definition) => &definition.base,
            TypeDefinition::Struct(definition) => &definition.base,
            TypeDefinition::Class(definition) => &definition.structure.base,
        }
    }

    pub(crate) fn base_mut(&mut self) -> &mut BaseDefinition {
        match self {
            TypeDefinition::Enum(definition) => &mut definition.base,
            TypeDefinition::Struct(definition) => &mut definition.base,
            TypeDefinition::Class(definition) => &mut definition.structure.base,
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.base().name
    }

    /// Output category.
    #[must_use]
    pub fn category(&self) -> TypeCategory {
        match self {
            TypeDefinition::Enum(_) => TypeCategory::Enums,
            TypeDefinition::Struct(_) => TypeCategory::Structs,
            TypeDefinition::Class(class) if class.is_interface() => TypeCategory::Interfaces,
            TypeDefinition::Class(_) => TypeCategory::Classes,
        }
    }

    /// Struct part of structs and classes.
    #[must_use]
    pub fn structure(&self) -> Option<&StructDefinition> {
        match self {
            TypeDefinition::Struct(definition) => Some(definition),
            TypeDefinition::Class(definition) => Some(&definition.structure),
            TypeDefinition::Enum(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity() {
        let base = BaseDefinition::for_type("AMyActor", "Game.Actors", "Game", "Game");
        assert_eq!(base.name, "MyActor");
        assert_eq!(base.path, "/Script/Game.MyActor");
        assert_eq!(base.package_path, "Actors");
        assert_eq!(base.full_name(), "Game.Actors.AMyActor");

        let member = BaseDefinition::for_member("Health", &base);
        assert_eq!(member.path, "/Script/Game.MyActor:Health");
        assert_ne!(member.guid, base.guid);
    }

    #[test]
    fn default_sources() {
        assert_eq!(DefaultValue::Integer(5).to_source(TypeClass::Int32), "5");
        assert_eq!(DefaultValue::Integer(5).to_source(TypeClass::Float), "5f");
        assert_eq!(DefaultValue::Float(1.5).to_source(TypeClass::Float), "1.5f");
        assert_eq!(DefaultValue::Float(2.0).to_source(TypeClass::Double), "2.0");
        assert_eq!(
            DefaultValue::String("a\"b".to_string()).to_source(TypeClass::String),
            "\"a\\\"b\""
        );
        assert_eq!(
            DefaultValue::EnumMember {
                enum_name: "EMode".to_string(),
                member: "Busy".to_string()
            }
            .to_source(TypeClass::Enum),
            "EMode.Busy"
        );
    }
}

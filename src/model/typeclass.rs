//! Type-class tags: the closed set of marshaling kinds of a property.

use strum::{Display, EnumIter, EnumString};

/// Marshaling kind of a property.
///
/// Every [`crate::model::PropertyDefinition`] carries exactly one tag, and every tag is served by
/// one processor of the [`crate::processors::ProcessorRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum TypeClass {
    /// `bool`
    Bool,
    /// `sbyte`
    Int8,
    /// `byte`
    UInt8,
    /// `short`
    Int16,
    /// `ushort`
    UInt16,
    /// `int`
    Int32,
    /// `uint`
    UInt32,
    /// `long`
    Int64,
    /// `ulong`
    UInt64,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `string`, a native `{ptr, num, max}` UTF-16 buffer
    String,
    /// `FName`
    Name,
    /// `FText`
    Text,
    /// Reference to a reflected object
    Object,
    /// `TSubclassOf<T>`
    Class,
    /// `TArray<T>`
    Array,
    /// `TSet<T>`
    Set,
    /// `TMap<K, V>`
    Map,
    /// Reflected value type
    Struct,
    /// Reflected enumeration
    Enum,
    /// `TSoftObjectPtr<T>`
    SoftObject,
    /// `TSoftClassPtr<T>`
    SoftClass,
    /// `TDelegate<D>`
    Delegate,
    /// `TMulticastDelegate<D>`
    MulticastDelegate,
}

impl TypeClass {
    /// Integer tag of the given width in bytes and signedness.
    #[must_use]
    pub fn integer(width: usize, signed: bool) -> Option<TypeClass> {
        Some(match (width, signed) {
            (1, true) => TypeClass::Int8,
            (1, false) => TypeClass::UInt8,
            (2, true) => TypeClass::Int16,
            (2, false) => TypeClass::UInt16,
            (4, true) => TypeClass::Int32,
            (4, false) => TypeClass::UInt32,
            (8, true) => TypeClass::Int64,
            (8, false) => TypeClass::UInt64,
            _ => return None,
        })
    }

    /// Managed keyword of the primitive tags.
    #[must_use]
    pub fn keyword(&self) -> Option<&'static str> {
        Some(match self {
            TypeClass::Bool => "bool",
            TypeClass::Int8 => "sbyte",
            TypeClass::UInt8 => "byte",
            TypeClass::Int16 => "short",
            TypeClass::UInt16 => "ushort",
            TypeClass::Int32 => "int",
            TypeClass::UInt32 => "uint",
            TypeClass::Int64 => "long",
            TypeClass::UInt64 => "ulong",
            TypeClass::Float => "float",
            TypeClass::Double => "double",
            TypeClass::String => "string",
            _ => return None,
        })
    }

    /// Size and alignment of the native representation, `None` for enums and structs whose
    /// layout depends on the referenced type.
    #[must_use]
    pub fn native_layout(&self) -> Option<(usize, usize)> {
        Some(match self {
            TypeClass::Bool | TypeClass::Int8 | TypeClass::UInt8 => (1, 1),
            TypeClass::Int16 | TypeClass::UInt16 => (2, 2),
            TypeClass::Int32 | TypeClass::UInt32 | TypeClass::Float => (4, 4),
            TypeClass::Int64
            | TypeClass::UInt64
            | TypeClass::Double
            | TypeClass::Name
            | TypeClass::Object
            | TypeClass::Class => (8, 8),
            TypeClass::String | TypeClass::Array | TypeClass::Delegate | TypeClass::MulticastDelegate => {
                (16, 8)
            }
            TypeClass::Text => (24, 8),
            TypeClass::SoftObject | TypeClass::SoftClass => (40, 8),
            TypeClass::Set | TypeClass::Map => (80, 8),
            TypeClass::Struct | TypeClass::Enum => return None,
        })
    }

    /// Returns `true` for integer tags.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            TypeClass::Int8
                | TypeClass::UInt8
                | TypeClass::Int16
                | TypeClass::UInt16
                | TypeClass::Int32
                | TypeClass::UInt32
                | TypeClass::Int64
                | TypeClass::UInt64
        )
    }

    /// Returns `true` for signed integer tags.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            TypeClass::Int8 | TypeClass::Int16 | TypeClass::Int32 | TypeClass::Int64
        )
    }

    /// Returns `true` for numeric tags, integer and floating point.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, TypeClass::Float | TypeClass::Double)
    }

    /// Returns `true` if the native bytes equal the managed bytes.
    ///
    /// Structs are blittable only if all their members are; that is decided on the definition.
    #[must_use]
    pub fn is_blittable(&self) -> bool {
        self.is_numeric() || matches!(self, TypeClass::Name | TypeClass::Enum)
    }

    /// Returns `true` for tags whose inner properties describe generic arguments.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            TypeClass::Array
                | TypeClass::Set
                | TypeClass::Map
                | TypeClass::SoftObject
                | TypeClass::SoftClass
                | TypeClass::Class
        )
    }

    /// Returns `true` for delegate tags.
    #[must_use]
    pub fn is_delegate(&self) -> bool {
        matches!(self, TypeClass::Delegate | TypeClass::MulticastDelegate)
    }

    /// Returns `true` for tags that may only appear on reference types.
    #[must_use]
    pub fn requires_reference_owner(&self) -> bool {
        self.is_delegate() || matches!(self, TypeClass::SoftObject | TypeClass::SoftClass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn integers() {
        assert_eq!(TypeClass::integer(4, true), Some(TypeClass::Int32));
        assert_eq!(TypeClass::integer(8, false), Some(TypeClass::UInt64));
        assert_eq!(TypeClass::integer(3, true), None);
        assert!(TypeClass::Int16.is_signed());
        assert!(!TypeClass::UInt16.is_signed());
    }

    #[test]
    fn layouts() {
        assert_eq!(TypeClass::String.native_layout(), Some((16, 8)));
        assert_eq!(TypeClass::Map.native_layout(), Some((80, 8)));
        assert_eq!(TypeClass::Struct.native_layout(), None);

        let fixed = TypeClass::iter()
            .filter(|tag| tag.native_layout().is_some())
            .count();
        assert_eq!(fixed, TypeClass::iter().count() - 2);
    }

    #[test]
    fn names() {
        assert_eq!(TypeClass::MulticastDelegate.to_string(), "multicast_delegate");
        assert_eq!("soft_object".parse::<TypeClass>().unwrap(), TypeClass::SoftObject);
        assert_eq!(TypeClass::UInt16.keyword(), Some("ushort"));
        assert_eq!(TypeClass::Name.keyword(), None);
    }
}

//! Engine vocabulary types recognised by simple name.

use strum::{Display, EnumIter, IntoEnumIterator};

/// A well-known engine or core-library type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum WellKnown {
    /// `TArray<T>`
    #[strum(to_string = "TArray`1")]
    Array,
    /// `TSet<T>`
    #[strum(to_string = "TSet`1")]
    Set,
    /// `TMap<K, V>`
    #[strum(to_string = "TMap`2")]
    Map,
    /// `TSoftObjectPtr<T>`
    #[strum(to_string = "TSoftObjectPtr`1")]
    SoftObjectPtr,
    /// `TSoftClassPtr<T>`
    #[strum(to_string = "TSoftClassPtr`1")]
    SoftClassPtr,
    /// `TSubclassOf<T>`
    #[strum(to_string = "TSubclassOf`1")]
    SubclassOf,
    /// `TDelegate<D>`
    #[strum(to_string = "TDelegate`1")]
    Delegate,
    /// `TMulticastDelegate<D>`
    #[strum(to_string = "TMulticastDelegate`1")]
    MulticastDelegate,
    /// `FName`
    #[strum(to_string = "FName")]
    Name,
    /// `FText`
    #[strum(to_string = "FText")]
    Text,
    /// The raw class pointer properties may not use
    #[strum(to_string = "UClass")]
    RawClass,
    /// Root of actor classes
    #[strum(to_string = "AActor")]
    Actor,
    /// Base of function libraries
    #[strum(to_string = "UBlueprintFunctionLibrary")]
    FunctionLibrary,
}

impl WellKnown {
    /// Match a declared simple name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<WellKnown> {
        WellKnown::iter().find(|known| known.to_string() == name)
    }
}

/// Core-library types with a fixed meaning.
#[allow(non_snake_case, missing_docs)]
pub mod CORE_TYPE {
    pub const OBJECT: &str = "System.Object";
    pub const VALUE_TYPE: &str = "System.ValueType";
    pub const ENUM: &str = "System.Enum";
    pub const DELEGATE: &str = "System.Delegate";
    pub const MULTICAST_DELEGATE: &str = "System.MulticastDelegate";
    pub const NULLABLE: &str = "System.Nullable`1";
    pub const FLAGS_ATTRIBUTE: &str = "Flags";
    pub const GUID_ATTRIBUTE: &str = "Guid";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup() {
        assert_eq!(WellKnown::from_name("TMap`2"), Some(WellKnown::Map));
        assert_eq!(WellKnown::from_name("FName"), Some(WellKnown::Name));
        assert_eq!(WellKnown::from_name("TMap"), None);
        assert_eq!(WellKnown::Actor.to_string(), "AActor");
    }
}

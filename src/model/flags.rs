//! Flag sets of model entities.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Flags of a [`crate::model::PropertyDefinition`]
    pub struct PropertyFlags: u32 {
        /// Declared `public`
        const PUBLIC = 0x0000_0001;
        /// Declared `protected`
        const PROTECTED = 0x0000_0002;
        /// Declared `private` or `internal`
        const PRIVATE = 0x0000_0004;
        /// Read-only
        const CONST = 0x0000_0010;
        /// `ref` parameter
        const REFERENCE = 0x0000_0020;
        /// `out` parameter
        const OUT = 0x0000_0040;
        /// Return value of a function
        const RETURN = 0x0000_0080;
        /// Replicated over the network
        const NET = 0x0000_0100;
        /// Replicated with a notification callback
        const REP_NOTIFY = 0x0000_0200;
        /// Has a recovered default value
        const HAS_DEFAULT = 0x0000_0400;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Flags of a [`crate::model::FunctionDefinition`]
    pub struct FunctionFlags: u32 {
        /// Declared `public`
        const PUBLIC = 0x0000_0001;
        /// Declared `protected`
        const PROTECTED = 0x0000_0002;
        /// Declared `private` or `internal`
        const PRIVATE = 0x0000_0004;
        /// Static function
        const STATIC = 0x0000_0010;
        /// Virtual function
        const VIRTUAL = 0x0000_0020;
        /// Event implemented on the managed side
        const EVENT = 0x0000_0040;
        /// Overrides a reflected base function
        const OVERRIDDEN = 0x0000_0080;
        /// Signature of a delegate
        const DELEGATE = 0x0000_0100;
        /// Has out or ref parameters
        const HAS_OUT_PARAMS = 0x0000_0200;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Flags of a type-level definition
    pub struct TypeFlags: u32 {
        /// Enumeration values are bit flags
        const FLAGS_ENUM = 0x0000_0001;
        /// Struct is eligible for the zero-copy view
        const FAST_ACCESS = 0x0000_0002;
        /// Class is a function library
        const FUNCTION_LIBRARY = 0x0000_0004;
        /// Class is abstract
        const ABSTRACT = 0x0000_0008;
        /// Class derives from the actor root
        const ACTOR = 0x0000_0010;
        /// Definition is an interface
        const INTERFACE = 0x0000_0020;
        /// Struct declares a parameterless constructor with recovered defaults
        const HAS_DEFAULTS = 0x0000_0040;
    }
}

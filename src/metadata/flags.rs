//! Attribute flags of type, field, method and parameter declarations (ECMA-335 II.23.1).

use bitflags::bitflags;
use strum::Display;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Flags of a type declaration
    pub struct TypeAttributes: u32 {
        /// Visibility mask
        const VISIBILITY_MASK = 0x0000_0007;
        /// Public top-level type
        const PUBLIC = 0x0000_0001;
        /// Public nested type
        const NESTED_PUBLIC = 0x0000_0002;
        /// Type is an interface
        const INTERFACE = 0x0000_0020;
        /// Type is abstract
        const ABSTRACT = 0x0000_0080;
        /// Type cannot be derived from
        const SEALED = 0x0000_0100;
        /// Name is special
        const SPECIAL_NAME = 0x0000_0400;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Flags of a field declaration
    pub struct FieldAttributes: u16 {
        /// Access mask, see [`MemberAccess`]
        const ACCESS_MASK = 0x0007;
        /// Field is static
        const STATIC = 0x0010;
        /// Field is read-only after initialization
        const INIT_ONLY = 0x0020;
        /// Field is a compile-time constant
        const LITERAL = 0x0040;
        /// Name is special
        const SPECIAL_NAME = 0x0200;
        /// Runtime should check the name
        const RT_SPECIAL_NAME = 0x0400;
        /// Field has a default value
        const HAS_DEFAULT = 0x8000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Flags of a method declaration
    pub struct MethodAttributes: u16 {
        /// Access mask, see [`MemberAccess`]
        const ACCESS_MASK = 0x0007;
        /// Method is static
        const STATIC = 0x0010;
        /// Method cannot be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method hides by name and signature
        const HIDE_BY_SIG = 0x0080;
        /// Method always gets a new vtable slot
        const NEW_SLOT = 0x0100;
        /// Method is abstract
        const ABSTRACT = 0x0400;
        /// Name is special (accessors, operators)
        const SPECIAL_NAME = 0x0800;
        /// Runtime should check the name (constructors)
        const RT_SPECIAL_NAME = 0x1000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Flags of a parameter declaration
    pub struct ParamAttributes: u16 {
        /// Parameter is an input
        const IN = 0x0001;
        /// Parameter is an output
        const OUT = 0x0002;
        /// Parameter is optional
        const OPTIONAL = 0x0010;
        /// Parameter has a default value
        const HAS_DEFAULT = 0x1000;
    }
}

/// Declared accessibility of a field or method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum MemberAccess {
    /// Only accessible by the compiler
    CompilerControlled,
    /// `private`
    Private,
    /// `private protected`
    FamilyAndAssembly,
    /// `internal`
    Assembly,
    /// `protected`
    Family,
    /// `protected internal`
    FamilyOrAssembly,
    /// `public`
    Public,
}

impl MemberAccess {
    /// Decode the access bits of a field or method flags word.
    #[must_use]
    pub fn from_flags(flags: u16) -> Self {
        match flags & 0x0007 {
            1 => MemberAccess::Private,
            2 => MemberAccess::FamilyAndAssembly,
            3 => MemberAccess::Assembly,
            4 => MemberAccess::Family,
            5 => MemberAccess::FamilyOrAssembly,
            6 => MemberAccess::Public,
            _ => MemberAccess::CompilerControlled,
        }
    }

    /// Returns `true` for `protected` flavors.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            MemberAccess::Family | MemberAccess::FamilyOrAssembly | MemberAccess::FamilyAndAssembly
        )
    }
}

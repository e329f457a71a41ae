use crate::metadata::token::Token;

/// Element type codes used in signatures (ECMA-335 II.23.1.16).
#[allow(non_snake_case, missing_docs)]
pub mod ELEMENT_TYPE {
    pub const END: u8 = 0x00;
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    pub const PTR: u8 = 0x0f;
    pub const BYREF: u8 = 0x10;
    pub const VALUETYPE: u8 = 0x11;
    pub const CLASS: u8 = 0x12;
    pub const VAR: u8 = 0x13;
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    pub const I: u8 = 0x18;
    pub const U: u8 = 0x19;
    pub const OBJECT: u8 = 0x1c;
    pub const SZARRAY: u8 = 0x1d;
    pub const MVAR: u8 = 0x1e;
    pub const CMOD_REQD: u8 = 0x1f;
    pub const CMOD_OPT: u8 = 0x20;
    pub const SENTINEL: u8 = 0x41;
    pub const PINNED: u8 = 0x45;
}

/// Signature header bytes and calling-convention flags (ECMA-335 II.23.2).
#[allow(non_snake_case, missing_docs)]
pub mod SIGNATURE_HEADER {
    pub const DEFAULT: u8 = 0x00;
    pub const FIELD: u8 = 0x06;
    pub const PROPERTY: u8 = 0x08;
    pub const GENERIC: u8 = 0x10;
    pub const HAS_THIS: u8 = 0x20;
    pub const EXPLICIT_THIS: u8 = 0x40;
}

/// Represents a parsed type in various signatures
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum TypeSignature {
    #[default]
    /// Not defined
    Unknown,
    /// void
    Void,
    /// bool
    Boolean,
    /// char
    Char,
    /// signed 8bit integer
    I1,
    /// unsigned 8bit integer
    U1,
    /// signed 16bit integer
    I2,
    /// unsigned 16bit integer
    U2,
    /// signed 32bit integer
    I4,
    /// unsigned 32bit integer
    U4,
    /// signed 64bit integer
    I8,
    /// unsigned 64bit integer
    U8,
    /// 32bit floating-point
    R4,
    /// 64bit floating-point
    R8,
    /// System.String
    String,
    /// A pointer to a type
    Ptr(Box<TypeSignature>),
    /// Type by reference
    ByRef(Box<TypeSignature>),
    /// CIL value-type
    // TypeDefOrRef encoded
    ValueType(Token),
    /// CIL Class
    // TypeDefOrRef encoded
    Class(Token),
    /// Generic type parameter
    GenericParamType(u32),
    /// Generic type and its arguments
    GenericInst(Box<TypeSignature>, Vec<TypeSignature>),
    /// Type is referenced during runtime
    TypedByRef,
    /// signed integer, sized to executing platform
    I,
    /// unsigned integer, sized to executing platform
    U,
    /// System.Object
    Object,
    /// Single dimension array
    SzArray(Box<TypeSignature>),
    /// Generic method parameter
    GenericParamMethod(u32),
    /// A pinned type
    Pinned(Box<TypeSignature>),
}

impl TypeSignature {
    /// The declaring token of a class, value type or generic instantiation.
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        match self {
            TypeSignature::Class(token) | TypeSignature::ValueType(token) => Some(*token),
            TypeSignature::GenericInst(base, _) => base.token(),
            _ => None,
        }
    }

    /// Returns `true` for generic parameters of the enclosing type or method.
    #[must_use]
    pub fn is_generic_parameter(&self) -> bool {
        matches!(
            self,
            TypeSignature::GenericParamType(_) | TypeSignature::GenericParamMethod(_)
        )
    }
}

/// Parameter with optional custom modifiers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureParameter {
    /// Custom modifiers of the parameter - `TypeDefOrRef` encoded
    pub modifiers: Vec<Token>,
    /// Parameter is passed by reference
    pub by_ref: bool,
    /// The type of the parameter
    pub base: TypeSignature,
}

impl SignatureParameter {
    /// A by-value parameter of type `base`.
    #[must_use]
    pub fn new(base: TypeSignature) -> Self {
        SignatureParameter {
            modifiers: Vec::new(),
            by_ref: false,
            base,
        }
    }

    /// A by-reference parameter of type `base`.
    #[must_use]
    pub fn by_ref(base: TypeSignature) -> Self {
        SignatureParameter {
            modifiers: Vec::new(),
            by_ref: true,
            base,
        }
    }
}

/// Represents a method signature (II.23.2.1)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureMethod {
    /// Used to encode the keyword instance in the calling convention
    pub has_this: bool,
    /// Used to encode the keyword explicit in the calling convention
    pub explicit_this: bool,
    /// Number of generic parameters of the method
    pub param_count_generic: u32,
    /// The return type of this `Method`
    pub return_type: SignatureParameter,
    /// The parameters of this `Method`
    pub params: Vec<SignatureParameter>,
}

/// Field signature (II.23.2.4)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureField {
    /// The custom modifiers for this field - `TypeDefOrRef` encoded
    pub modifiers: Vec<Token>,
    /// The signature of this type
    pub base: TypeSignature,
}

/// Property signature (II.23.2.5)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureProperty {
    /// Indicates the passing of a 'this' pointer
    pub has_this: bool,
    /// The custom modifiers for this property - `TypeDefOrRef` encoded
    pub modifiers: Vec<Token>,
    /// The signature of this property
    pub base: TypeSignature,
    /// The parameters of this property (indexers)
    pub params: Vec<SignatureParameter>,
}

/// Type specification signature (II.23.2.14)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureTypeSpec {
    /// Signature of this type
    pub base: TypeSignature,
}

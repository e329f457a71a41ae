//! Authoring of module images.
//!
//! [`ModuleBuilder`] writes the same format [`crate::metadata::module::LoadedModule`] reads. It
//! takes whole type descriptions and lays out every table at [`ModuleBuilder::build`]: types are
//! referenced by name, local names become TypeDef tokens and `[Assembly]Namespace.Name` names
//! become TypeRefs scoped to an assembly reference.
//!
//! # Examples
//!
//! ```rust
//! use bindweaver::metadata::builder::{Attribute, Field, ModuleBuilder, Ty, TypeDef};
//!
//! let mut builder = ModuleBuilder::new("Game");
//! builder.add_type(
//!     TypeDef::structure("Game", "FVector")
//!         .attribute(Attribute::new("[Engine]Engine.UStructAttribute"))
//!         .field(Field::new("X", Ty::R4).public()),
//! );
//! let image = builder.build()?;
//! let module = bindweaver::metadata::module::LoadedModule::from_mem(image)?;
//! assert_eq!(module.types[0].name, "FVector");
//! # Ok::<(), bindweaver::Error>(())
//! ```

use std::{collections::HashMap, path::Path};

use md5::{Digest, Md5};

use crate::{
    file::io::write_compressed_uint,
    metadata::{
        customattributes::{
            encode_custom_attribute_value, CustomAttributeArgument, CustomAttributeNamedArgument,
            CustomAttributeValue,
        },
        flags::{FieldAttributes, MethodAttributes, ParamAttributes, TypeAttributes},
        image::ModuleImage,
        method::{encode_method_body, InstructionEncoder, OPCODE},
        module::{ConstantValue, Version},
        signatures::{
            encode_field_signature, encode_method_signature, encode_property_signature,
            encode_type_spec_signature, SignatureField, SignatureMethod, SignatureParameter,
            SignatureProperty, TypeSignature, ELEMENT_TYPE,
        },
        tables::{
            AssemblyRaw, AssemblyRefRaw, ConstantRaw, CustomAttributeRaw, FieldRaw,
            GenericParamRaw, InterfaceImplRaw, MemberRefRaw, MethodDefRaw, ModuleRaw,
            NestedClassRaw, ParamRaw, PropertyRaw, TableId, Tables, TypeDefRaw, TypeRefRaw,
            TypeSpecRaw,
        },
        token::{Token, USER_STRING_TABLE},
    },
    Result,
};

/// Assembly used for `System.*` names written without an explicit scope.
pub const CORE_LIBRARY: &str = "System.Runtime";

/// A type expression in a description.
#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    /// void
    Void,
    /// bool
    Bool,
    /// char
    Char,
    /// sbyte
    I1,
    /// byte
    U1,
    /// short
    I2,
    /// ushort
    U2,
    /// int
    I4,
    /// uint
    U4,
    /// long
    I8,
    /// ulong
    U8,
    /// float
    R4,
    /// double
    R8,
    /// string
    String,
    /// object
    Object,
    /// Reference type by name
    Class(String),
    /// Value type by name
    ValueType(String),
    /// Generic instantiation
    Generic(Box<Ty>, Vec<Ty>),
    /// Single-dimension array
    Array(Box<Ty>),
    /// Generic parameter of the declaring type
    Var(u32),
    /// Generic parameter of the declaring method
    MVar(u32),
}

impl Ty {
    /// Reference type by name.
    #[must_use]
    pub fn class(name: &str) -> Ty {
        Ty::Class(name.to_string())
    }

    /// Value type by name.
    #[must_use]
    pub fn value(name: &str) -> Ty {
        Ty::ValueType(name.to_string())
    }

    /// Generic instantiation of the reference type `name`.
    #[must_use]
    pub fn generic(name: &str, args: Vec<Ty>) -> Ty {
        Ty::Generic(Box::new(Ty::class(name)), args)
    }

    /// Generic instantiation of the value type `name`.
    #[must_use]
    pub fn generic_value(name: &str, args: Vec<Ty>) -> Ty {
        Ty::Generic(Box::new(Ty::value(name)), args)
    }
}

/// A simplified CIL instruction for constructor bodies.
#[derive(Debug, Clone, PartialEq)]
pub enum Il {
    /// `nop`
    Nop,
    /// `ldarg.0`
    LdArg0,
    /// shortest `ldc.i4` form
    LdcI4(i32),
    /// `ldc.i8`
    LdcI8(i64),
    /// `ldc.r4`
    LdcR4(f32),
    /// `ldc.r8`
    LdcR8(f64),
    /// `ldstr` with an interned literal
    LdStr(String),
    /// `ldnull`
    LdNull,
    /// `stfld` of a field of the declaring type, by name
    StFld(String),
    /// `ret`
    Ret,
    /// Raw bytes
    Raw(Vec<u8>),
}

/// A custom attribute to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    type_name: String,
    params: Vec<Ty>,
    value: CustomAttributeValue,
}

impl Attribute {
    /// An attribute of type `type_name` with a parameterless constructor.
    #[must_use]
    pub fn new(type_name: &str) -> Self {
        Attribute {
            type_name: type_name.to_string(),
            params: Vec::new(),
            value: CustomAttributeValue::default(),
        }
    }

    /// Append a constructor argument of type `ty`.
    #[must_use]
    pub fn arg(mut self, ty: Ty, value: CustomAttributeArgument) -> Self {
        self.params.push(ty);
        self.value.fixed_args.push(value);
        self
    }

    /// Append a string constructor argument.
    #[must_use]
    pub fn arg_str(self, value: &str) -> Self {
        self.arg(Ty::String, CustomAttributeArgument::String(value.to_string()))
    }

    /// Append a named property argument.
    #[must_use]
    pub fn named(mut self, name: &str, value: CustomAttributeArgument) -> Self {
        self.value.named_args.push(CustomAttributeNamedArgument {
            is_field: false,
            name: name.to_string(),
            value,
        });
        self
    }
}

/// A field description.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    ty: Ty,
    flags: FieldAttributes,
    constant: Option<(u8, ConstantValue)>,
    attributes: Vec<Attribute>,
}

impl Field {
    /// A private instance field.
    #[must_use]
    pub fn new(name: &str, ty: Ty) -> Self {
        Field {
            name: name.to_string(),
            ty,
            flags: FieldAttributes::from_bits_truncate(0x0001),
            constant: None,
            attributes: Vec::new(),
        }
    }

    /// Make the field public.
    #[must_use]
    pub fn public(mut self) -> Self {
        self.flags = (self.flags - FieldAttributes::ACCESS_MASK) | FieldAttributes::from_bits_truncate(0x0006);
        self
    }

    /// Make the field protected.
    #[must_use]
    pub fn protected(mut self) -> Self {
        self.flags = (self.flags - FieldAttributes::ACCESS_MASK) | FieldAttributes::from_bits_truncate(0x0004);
        self
    }

    /// Make the field static.
    #[must_use]
    pub fn static_(mut self) -> Self {
        self.flags |= FieldAttributes::STATIC;
        self
    }

    /// Make the field read-only.
    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.flags |= FieldAttributes::INIT_ONLY;
        self
    }

    /// Apply a custom attribute.
    #[must_use]
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// A method parameter description.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    ty: Ty,
    by_ref: bool,
    flags: ParamAttributes,
}

impl Param {
    /// A by-value parameter.
    #[must_use]
    pub fn new(name: &str, ty: Ty) -> Self {
        Param {
            name: name.to_string(),
            ty,
            by_ref: false,
            flags: ParamAttributes::empty(),
        }
    }

    /// A `ref` parameter.
    #[must_use]
    pub fn by_ref(name: &str, ty: Ty) -> Self {
        Param {
            by_ref: true,
            ..Param::new(name, ty)
        }
    }

    /// An `out` parameter.
    #[must_use]
    pub fn out(name: &str, ty: Ty) -> Self {
        Param {
            by_ref: true,
            flags: ParamAttributes::OUT,
            ..Param::new(name, ty)
        }
    }
}

/// A method description.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    name: String,
    returns: Ty,
    params: Vec<Param>,
    flags: MethodAttributes,
    generic_params: Vec<String>,
    body: Option<Vec<Il>>,
    attributes: Vec<Attribute>,
}

impl Method {
    /// A public instance method.
    #[must_use]
    pub fn new(name: &str, returns: Ty) -> Self {
        Method {
            name: name.to_string(),
            returns,
            params: Vec::new(),
            flags: MethodAttributes::from_bits_truncate(0x0006) | MethodAttributes::HIDE_BY_SIG,
            generic_params: Vec::new(),
            body: None,
            attributes: Vec::new(),
        }
    }

    /// A public parameterless instance constructor with `body`.
    #[must_use]
    pub fn constructor(body: Vec<Il>) -> Self {
        let mut method = Method::new(".ctor", Ty::Void);
        method.flags |= MethodAttributes::SPECIAL_NAME | MethodAttributes::RT_SPECIAL_NAME;
        method.body = Some(body);
        method
    }

    /// Append a parameter.
    #[must_use]
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Make the method static.
    #[must_use]
    pub fn static_(mut self) -> Self {
        self.flags |= MethodAttributes::STATIC;
        self
    }

    /// Make the method virtual with a new slot.
    #[must_use]
    pub fn virtual_(mut self) -> Self {
        self.flags |= MethodAttributes::VIRTUAL | MethodAttributes::NEW_SLOT;
        self
    }

    /// Make the method override a virtual base method.
    #[must_use]
    pub fn override_(mut self) -> Self {
        self.flags |= MethodAttributes::VIRTUAL;
        self.flags -= MethodAttributes::NEW_SLOT;
        self
    }

    /// Make the method abstract.
    #[must_use]
    pub fn abstract_(mut self) -> Self {
        self.flags |= MethodAttributes::VIRTUAL | MethodAttributes::ABSTRACT | MethodAttributes::NEW_SLOT;
        self
    }

    /// Make the method protected.
    #[must_use]
    pub fn protected(mut self) -> Self {
        self.flags = (self.flags - MethodAttributes::ACCESS_MASK) | MethodAttributes::from_bits_truncate(0x0004);
        self
    }

    /// Declare a generic parameter.
    #[must_use]
    pub fn generic_param(mut self, name: &str) -> Self {
        self.generic_params.push(name.to_string());
        self
    }

    /// Attach a body.
    #[must_use]
    pub fn body(mut self, body: Vec<Il>) -> Self {
        self.body = Some(body);
        self
    }

    /// Apply a custom attribute.
    #[must_use]
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// An auto-implemented property description.
///
/// The property gets a private `<Name>k__BackingField` and public `get_Name`/`set_Name`
/// accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    name: String,
    ty: Ty,
    getter: bool,
    setter: bool,
    is_static: bool,
    attributes: Vec<Attribute>,
}

impl Property {
    /// A read-write instance property.
    #[must_use]
    pub fn new(name: &str, ty: Ty) -> Self {
        Property {
            name: name.to_string(),
            ty,
            getter: true,
            setter: true,
            is_static: false,
            attributes: Vec::new(),
        }
    }

    /// Drop the setter.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.setter = false;
        self
    }

    /// Make the property static.
    #[must_use]
    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Apply a custom attribute.
    #[must_use]
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Name of the compiler-generated backing field.
    #[must_use]
    pub fn backing_field_name(name: &str) -> String {
        format!("<{name}>k__BackingField")
    }
}

/// A type description.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    namespace: String,
    name: String,
    flags: TypeAttributes,
    extends: Option<Ty>,
    interfaces: Vec<Ty>,
    generic_params: Vec<String>,
    enclosing: Option<String>,
    fields: Vec<Field>,
    methods: Vec<Method>,
    properties: Vec<Property>,
    attributes: Vec<Attribute>,
}

impl TypeDef {
    fn new(namespace: &str, name: &str, flags: TypeAttributes, extends: Option<Ty>) -> Self {
        TypeDef {
            namespace: namespace.to_string(),
            name: name.to_string(),
            flags,
            extends,
            interfaces: Vec::new(),
            generic_params: Vec::new(),
            enclosing: None,
            fields: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// A public class deriving from `System.Object`.
    #[must_use]
    pub fn class(namespace: &str, name: &str) -> Self {
        TypeDef::new(
            namespace,
            name,
            TypeAttributes::PUBLIC,
            Some(Ty::class("System.Object")),
        )
    }

    /// A public sealed struct.
    #[must_use]
    pub fn structure(namespace: &str, name: &str) -> Self {
        TypeDef::new(
            namespace,
            name,
            TypeAttributes::PUBLIC | TypeAttributes::SEALED,
            Some(Ty::class("System.ValueType")),
        )
    }

    /// A public interface.
    #[must_use]
    pub fn interface(namespace: &str, name: &str) -> Self {
        TypeDef::new(
            namespace,
            name,
            TypeAttributes::PUBLIC | TypeAttributes::INTERFACE | TypeAttributes::ABSTRACT,
            None,
        )
    }

    /// A public enum with underlying type `underlying`.
    #[must_use]
    pub fn enumeration(namespace: &str, name: &str, underlying: Ty) -> Self {
        let mut def = TypeDef::new(
            namespace,
            name,
            TypeAttributes::PUBLIC | TypeAttributes::SEALED,
            Some(Ty::class("System.Enum")),
        );
        def.fields.push(Field {
            name: "value__".to_string(),
            ty: underlying,
            flags: FieldAttributes::from_bits_truncate(0x0006)
                | FieldAttributes::SPECIAL_NAME
                | FieldAttributes::RT_SPECIAL_NAME,
            constant: None,
            attributes: Vec::new(),
        });
        def
    }

    /// A public delegate type with an `Invoke(params) -> returns` method.
    #[must_use]
    pub fn delegate(namespace: &str, name: &str, returns: Ty, params: Vec<Param>) -> Self {
        let mut def = TypeDef::new(
            namespace,
            name,
            TypeAttributes::PUBLIC | TypeAttributes::SEALED,
            Some(Ty::class("System.MulticastDelegate")),
        );

        let mut constructor = Method::new(".ctor", Ty::Void)
            .param(Param::new("object", Ty::Object))
            .param(Param::new("method", Ty::I8));
        constructor.flags |= MethodAttributes::SPECIAL_NAME | MethodAttributes::RT_SPECIAL_NAME;
        def.methods.push(constructor);

        let mut invoke = Method::new("Invoke", returns).virtual_();
        invoke.params = params;
        def.methods.push(invoke);
        def
    }

    /// Set the base type.
    #[must_use]
    pub fn extends(mut self, base: Ty) -> Self {
        self.extends = Some(base);
        self
    }

    /// Set the base type to the reference type `name`.
    #[must_use]
    pub fn extends_class(self, name: &str) -> Self {
        self.extends(Ty::class(name))
    }

    /// Add an implemented interface.
    #[must_use]
    pub fn implements(mut self, interface: Ty) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Declare a generic parameter.
    #[must_use]
    pub fn generic_param(mut self, name: &str) -> Self {
        self.generic_params.push(name.to_string());
        self
    }

    /// Nest this type in the local type `enclosing` (full name). The namespace must match.
    #[must_use]
    pub fn nested_in(mut self, enclosing: &str) -> Self {
        self.enclosing = Some(enclosing.to_string());
        self.flags = (self.flags - TypeAttributes::VISIBILITY_MASK) | TypeAttributes::NESTED_PUBLIC;
        self
    }

    /// Add a field.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Add an enum member with `value`.
    #[must_use]
    pub fn variant(mut self, name: &str, value: i64) -> Self {
        let underlying = self
            .fields
            .first()
            .map_or(Ty::I4, |field| field.ty.clone());
        let base_type = match underlying {
            Ty::I1 => ELEMENT_TYPE::I1,
            Ty::U1 => ELEMENT_TYPE::U1,
            Ty::I2 => ELEMENT_TYPE::I2,
            Ty::U2 => ELEMENT_TYPE::U2,
            Ty::U4 => ELEMENT_TYPE::U4,
            Ty::I8 => ELEMENT_TYPE::I8,
            Ty::U8 => ELEMENT_TYPE::U8,
            _ => ELEMENT_TYPE::I4,
        };
        let own_type = Ty::value(&qualify(&self.namespace, &self.name));
        self.fields.push(Field {
            name: name.to_string(),
            ty: own_type,
            flags: FieldAttributes::from_bits_truncate(0x0006)
                | FieldAttributes::STATIC
                | FieldAttributes::LITERAL
                | FieldAttributes::HAS_DEFAULT,
            constant: Some((base_type, ConstantValue::Integer(value))),
            attributes: Vec::new(),
        });
        self
    }

    /// Add a method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    /// Add an auto-implemented property.
    #[must_use]
    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Apply a custom attribute.
    #[must_use]
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// `Namespace.Name` of the described type.
    #[must_use]
    pub fn full_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }
}

fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

/// Split `[Assembly]Namespace.Name` into its parts.
fn split_type_name(full_name: &str) -> (Option<&str>, &str, &str) {
    let (scope, rest) = match full_name.strip_prefix('[').and_then(|rest| rest.split_once(']')) {
        Some((scope, rest)) => (Some(scope), rest),
        None => (None, full_name),
    };
    match rest.rfind('.') {
        Some(pos) => (scope, &rest[..pos], &rest[pos + 1..]),
        None => (scope, "", rest),
    }
}

#[derive(Default)]
struct HeapWriter {
    strings: Vec<u8>,
    string_index: HashMap<String, u32>,
    blobs: Vec<u8>,
    blob_index: HashMap<Vec<u8>, u32>,
    user_strings: Vec<u8>,
    user_string_index: HashMap<String, u32>,
}

#[allow(clippy::cast_possible_truncation)]
impl HeapWriter {
    fn new() -> Self {
        HeapWriter {
            strings: vec![0],
            blobs: vec![0],
            user_strings: vec![0],
            ..Default::default()
        }
    }

    fn string(&mut self, value: &str) -> u32 {
        if value.is_empty() {
            return 0;
        }
        if let Some(index) = self.string_index.get(value) {
            return *index;
        }
        let index = self.strings.len() as u32;
        self.strings.extend_from_slice(value.as_bytes());
        self.strings.push(0);
        self.string_index.insert(value.to_string(), index);
        index
    }

    fn blob(&mut self, value: &[u8]) -> Result<u32> {
        if value.is_empty() {
            return Ok(0);
        }
        if let Some(index) = self.blob_index.get(value) {
            return Ok(*index);
        }
        let index = self.blobs.len() as u32;
        write_compressed_uint(&mut self.blobs, value.len() as u32)?;
        self.blobs.extend_from_slice(value);
        self.blob_index.insert(value.to_vec(), index);
        Ok(index)
    }

    fn user_string(&mut self, value: &str) -> Result<u32> {
        if let Some(index) = self.user_string_index.get(value) {
            return Ok(*index);
        }
        let index = self.user_strings.len() as u32;
        let units: Vec<u16> = value.encode_utf16().collect();
        write_compressed_uint(&mut self.user_strings, (units.len() * 2 + 1) as u32)?;
        for unit in &units {
            self.user_strings.extend_from_slice(&unit.to_le_bytes());
        }
        self.user_strings
            .push(u8::from(units.iter().any(|unit| *unit >= 0x80)));
        self.user_string_index.insert(value.to_string(), index);
        Ok(index)
    }
}

/// Builder for a module image.
pub struct ModuleBuilder {
    name: String,
    version: Version,
    types: Vec<TypeDef>,
}

struct Layout {
    heaps: HeapWriter,
    tables: Tables,
    il: Vec<u8>,
    local_types: HashMap<String, u32>,
    type_refs: HashMap<(Option<String>, String, String), u32>,
    assembly_refs: HashMap<String, u32>,
    member_refs: HashMap<(u32, Vec<u8>), u32>,
    type_specs: HashMap<Vec<u8>, u32>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
impl Layout {
    fn assembly_ref(&mut self, name: &str) -> u32 {
        if let Some(row) = self.assembly_refs.get(name) {
            return *row;
        }
        let name_index = self.heaps.string(name);
        self.tables.assembly_ref.push(AssemblyRefRaw {
            major: 1,
            minor: 0,
            build: 0,
            revision: 0,
            name: name_index,
        });
        let row = self.tables.assembly_ref.len() as u32;
        self.assembly_refs.insert(name.to_string(), row);
        row
    }

    fn type_token(&mut self, full_name: &str) -> Result<Token> {
        let (scope, namespace, name) = split_type_name(full_name);
        if scope.is_none() {
            if let Some(row) = self.local_types.get(&qualify(namespace, name)) {
                return Ok(Token::from_parts(TableId::TypeDef, *row));
            }
        }

        let scope = match scope {
            Some(scope) => scope.to_string(),
            None if namespace == "System" || namespace.starts_with("System.") => {
                CORE_LIBRARY.to_string()
            }
            None => {
                return Err(malformed_error!(
                    "Type '{}' is neither local nor scoped to an assembly",
                    full_name
                ))
            }
        };

        let key = (Some(scope.clone()), namespace.to_string(), name.to_string());
        if let Some(row) = self.type_refs.get(&key) {
            return Ok(Token::from_parts(TableId::TypeRef, *row));
        }

        let scope_row = self.assembly_ref(&scope);
        let name_index = self.heaps.string(name);
        let namespace_index = self.heaps.string(namespace);
        self.tables.type_ref.push(TypeRefRaw {
            scope: Token::from_parts(TableId::AssemblyRef, scope_row).value(),
            name: name_index,
            namespace: namespace_index,
        });
        let row = self.tables.type_ref.len() as u32;
        self.type_refs.insert(key, row);
        Ok(Token::from_parts(TableId::TypeRef, row))
    }

    fn signature(&mut self, ty: &Ty) -> Result<TypeSignature> {
        Ok(match ty {
            Ty::Void => TypeSignature::Void,
            Ty::Bool => TypeSignature::Boolean,
            Ty::Char => TypeSignature::Char,
            Ty::I1 => TypeSignature::I1,
            Ty::U1 => TypeSignature::U1,
            Ty::I2 => TypeSignature::I2,
            Ty::U2 => TypeSignature::U2,
            Ty::I4 => TypeSignature::I4,
            Ty::U4 => TypeSignature::U4,
            Ty::I8 => TypeSignature::I8,
            Ty::U8 => TypeSignature::U8,
            Ty::R4 => TypeSignature::R4,
            Ty::R8 => TypeSignature::R8,
            Ty::String => TypeSignature::String,
            Ty::Object => TypeSignature::Object,
            Ty::Class(name) => TypeSignature::Class(self.type_token(name)?),
            Ty::ValueType(name) => TypeSignature::ValueType(self.type_token(name)?),
            Ty::Generic(base, args) => {
                let base = self.signature(base)?;
                let mut arg_signatures = Vec::with_capacity(args.len());
                for arg in args {
                    arg_signatures.push(self.signature(arg)?);
                }
                TypeSignature::GenericInst(Box::new(base), arg_signatures)
            }
            Ty::Array(element) => TypeSignature::SzArray(Box::new(self.signature(element)?)),
            Ty::Var(index) => TypeSignature::GenericParamType(*index),
            Ty::MVar(index) => TypeSignature::GenericParamMethod(*index),
        })
    }

    /// Token usable in `extends` and interface columns.
    fn type_def_or_ref(&mut self, ty: &Ty) -> Result<Token> {
        match ty {
            Ty::Class(name) | Ty::ValueType(name) => self.type_token(name),
            _ => {
                let signature = self.signature(ty)?;
                let blob = encode_type_spec_signature(&signature)?;
                if let Some(row) = self.type_specs.get(&blob) {
                    return Ok(Token::from_parts(TableId::TypeSpec, *row));
                }
                let blob_index = self.heaps.blob(&blob)?;
                self.tables.type_spec.push(TypeSpecRaw {
                    signature: blob_index,
                });
                let row = self.tables.type_spec.len() as u32;
                self.type_specs.insert(blob, row);
                Ok(Token::from_parts(TableId::TypeSpec, row))
            }
        }
    }

    fn attribute(&mut self, parent: Token, attribute: &Attribute) -> Result<()> {
        let class = self.type_token(&attribute.type_name)?;
        let mut params = Vec::with_capacity(attribute.params.len());
        for param in &attribute.params {
            params.push(SignatureParameter::new(self.signature(param)?));
        }
        let constructor_signature = encode_method_signature(&SignatureMethod {
            has_this: true,
            return_type: SignatureParameter::new(TypeSignature::Void),
            params,
            ..Default::default()
        })?;

        let key = (class.value(), constructor_signature);
        let member_ref = match self.member_refs.get(&key) {
            Some(row) => *row,
            None => {
                let name_index = self.heaps.string(".ctor");
                let signature_index = self.heaps.blob(&key.1)?;
                self.tables.member_ref.push(MemberRefRaw {
                    class: class.value(),
                    name: name_index,
                    signature: signature_index,
                });
                let row = self.tables.member_ref.len() as u32;
                self.member_refs.insert(key, row);
                row
            }
        };

        let value = encode_custom_attribute_value(&attribute.value)?;
        let value_index = self.heaps.blob(&value)?;
        self.tables.custom_attribute.push(CustomAttributeRaw {
            parent: parent.value(),
            constructor: Token::from_parts(TableId::MemberRef, member_ref).value(),
            value: value_index,
        });
        Ok(())
    }

    fn constant(&mut self, parent: Token, base_type: u8, value: &ConstantValue) -> Result<()> {
        let mut data = Vec::new();
        match (base_type, value) {
            (ELEMENT_TYPE::I1 | ELEMENT_TYPE::U1, ConstantValue::Integer(v)) => data.push(*v as u8),
            (ELEMENT_TYPE::I2 | ELEMENT_TYPE::U2, ConstantValue::Integer(v)) => {
                data.extend_from_slice(&(*v as u16).to_le_bytes());
            }
            (ELEMENT_TYPE::I4 | ELEMENT_TYPE::U4, ConstantValue::Integer(v)) => {
                data.extend_from_slice(&(*v as u32).to_le_bytes());
            }
            (ELEMENT_TYPE::I8 | ELEMENT_TYPE::U8, ConstantValue::Integer(v)) => {
                data.extend_from_slice(&v.to_le_bytes());
            }
            (ELEMENT_TYPE::STRING, ConstantValue::String(v)) => {
                for unit in v.encode_utf16() {
                    data.extend_from_slice(&unit.to_le_bytes());
                }
            }
            _ => {
                return Err(malformed_error!(
                    "Unsupported constant {:?} of type 0x{:02X}",
                    value,
                    base_type
                ))
            }
        }

        // An empty string constant still needs a non-zero blob index.
        let value_index = if data.is_empty() {
            let index = self.heaps.blobs.len() as u32;
            self.heaps.blobs.push(0);
            index
        } else {
            self.heaps.blob(&data)?
        };

        self.tables.constant.push(ConstantRaw {
            base_type,
            padding: 0,
            parent: parent.value(),
            value: value_index,
        });
        Ok(())
    }

    fn body(&mut self, type_def: &TypeDef, first_field: u32, body: &[Il]) -> Result<u32> {
        let mut encoder = InstructionEncoder::new();
        for instruction in body {
            match instruction {
                Il::Nop => {
                    encoder.emit(OPCODE::NOP);
                }
                Il::LdArg0 => {
                    encoder.emit(OPCODE::LDARG_0);
                }
                Il::LdcI4(value) => {
                    encoder.ldc_i4(*value);
                }
                Il::LdcI8(value) => {
                    encoder.ldc_i8(*value);
                }
                Il::LdcR4(value) => {
                    encoder.ldc_r4(*value);
                }
                Il::LdcR8(value) => {
                    encoder.ldc_r8(*value);
                }
                Il::LdStr(value) => {
                    let index = self.heaps.user_string(value)?;
                    encoder.emit_token(
                        OPCODE::LDSTR,
                        Token::new((u32::from(USER_STRING_TABLE) << 24) | index),
                    );
                }
                Il::LdNull => {
                    encoder.emit(OPCODE::LDNULL);
                }
                Il::StFld(name) => {
                    let Some(position) = field_rows(type_def)
                        .iter()
                        .position(|field_name| field_name == name)
                    else {
                        return Err(malformed_error!(
                            "Unknown field '{}' on '{}'",
                            name,
                            type_def.full_name()
                        ));
                    };
                    encoder.emit_token(
                        OPCODE::STFLD,
                        Token::from_parts(TableId::Field, first_field + position as u32),
                    );
                }
                Il::Ret => {
                    encoder.emit(OPCODE::RET);
                }
                Il::Raw(bytes) => {
                    for byte in bytes {
                        encoder.emit(u16::from(*byte));
                    }
                }
            }
        }

        let encoded = encode_method_body(encoder.code(), 8)?;
        self.il.resize(self.il.len().next_multiple_of(4), 0);
        let offset = self.il.len() as u32;
        self.il.extend_from_slice(&encoded);
        Ok(offset)
    }
}

/// Field names of a type in row order, including property backing fields.
fn field_rows(type_def: &TypeDef) -> Vec<String> {
    type_def
        .fields
        .iter()
        .map(|field| field.name.clone())
        .chain(
            type_def
                .properties
                .iter()
                .map(|property| Property::backing_field_name(&property.name)),
        )
        .collect()
}

impl ModuleBuilder {
    /// Start a module named `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        ModuleBuilder {
            name: name.to_string(),
            version: Version {
                major: 1,
                ..Default::default()
            },
            types: Vec::new(),
        }
    }

    /// Set the assembly version.
    pub fn version(&mut self, version: Version) -> &mut Self {
        self.version = version;
        self
    }

    /// Add a type description.
    pub fn add_type(&mut self, type_def: TypeDef) -> &mut Self {
        self.types.push(type_def);
        self
    }

    /// Lay out and encode the module image.
    ///
    /// # Errors
    /// Returns an error if a referenced name can be resolved neither locally nor through an
    /// assembly scope, a constructor body stores an unknown field, or a nested type names an
    /// unknown enclosing type.
    #[allow(clippy::too_many_lines, clippy::cast_possible_truncation)]
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut layout = Layout {
            heaps: HeapWriter::new(),
            tables: Tables::default(),
            il: vec![0; 4],
            local_types: self
                .types
                .iter()
                .enumerate()
                .map(|(index, def)| (def.full_name(), index as u32 + 1))
                .collect(),
            type_refs: HashMap::new(),
            assembly_refs: HashMap::new(),
            member_refs: HashMap::new(),
            type_specs: HashMap::new(),
        };

        let module_name = layout.heaps.string(&format!("{}.bmod", self.name));
        let guids = Md5::digest(self.name.as_bytes()).to_vec();
        layout.tables.module.push(ModuleRaw {
            name: module_name,
            mvid: 1,
        });
        let assembly_name = layout.heaps.string(&self.name);
        layout.tables.assembly.push(AssemblyRaw {
            major: self.version.major,
            minor: self.version.minor,
            build: self.version.build,
            revision: self.version.revision,
            name: assembly_name,
        });

        // Member rows are contiguous per type, so row numbers are known up front.
        let mut first_field = 1u32;
        let mut first_method = 1u32;
        let mut first_property = 1u32;
        let mut first_param = 1u32;
        let mut deferred = Vec::new();

        for (type_index, def) in self.types.iter().enumerate() {
            let type_token = Token::from_parts(TableId::TypeDef, type_index as u32 + 1);
            let extends = match &def.extends {
                Some(base) => layout.type_def_or_ref(base)?.value(),
                None => 0,
            };

            let nested = def.enclosing.is_some();
            let name = layout.heaps.string(&def.name);
            let namespace = if nested {
                0
            } else {
                layout.heaps.string(&def.namespace)
            };
            layout.tables.type_def.push(TypeDefRaw {
                flags: def.flags.bits(),
                name,
                namespace,
                extends,
                field_list: first_field,
                method_list: first_method,
                property_list: first_property,
            });

            if let Some(enclosing) = &def.enclosing {
                let Some(enclosing_row) = layout.local_types.get(enclosing).copied() else {
                    return Err(malformed_error!(
                        "Unknown enclosing type '{}' for '{}'",
                        enclosing,
                        def.full_name()
                    ));
                };
                layout.tables.nested_class.push(NestedClassRaw {
                    nested: type_index as u32 + 1,
                    enclosing: enclosing_row,
                });
            }

            for interface in &def.interfaces {
                let token = layout.type_def_or_ref(interface)?;
                layout.tables.interface_impl.push(InterfaceImplRaw {
                    class: type_index as u32 + 1,
                    interface: token.value(),
                });
            }

            for (number, param) in def.generic_params.iter().enumerate() {
                let name = layout.heaps.string(param);
                layout.tables.generic_param.push(GenericParamRaw {
                    number: number as u16,
                    flags: 0,
                    owner: type_token.value(),
                    name,
                });
            }

            for attribute in &def.attributes {
                deferred.push((type_token, attribute.clone()));
            }

            let type_first_field = first_field;
            for field in &def.fields {
                let token = Token::from_parts(TableId::Field, first_field);
                let signature = layout.signature(&field.ty)?;
                let blob = encode_field_signature(&SignatureField {
                    modifiers: Vec::new(),
                    base: signature,
                })?;
                let name = layout.heaps.string(&field.name);
                let signature = layout.heaps.blob(&blob)?;
                layout.tables.field.push(FieldRaw {
                    flags: field.flags.bits(),
                    name,
                    signature,
                });
                if let Some((base_type, value)) = &field.constant {
                    layout.constant(token, *base_type, value)?;
                }
                for attribute in &field.attributes {
                    deferred.push((token, attribute.clone()));
                }
                first_field += 1;
            }

            for property in &def.properties {
                let signature = layout.signature(&property.ty)?;
                let blob = encode_field_signature(&SignatureField {
                    modifiers: Vec::new(),
                    base: signature,
                })?;
                let name = layout.heaps.string(&Property::backing_field_name(&property.name));
                let signature = layout.heaps.blob(&blob)?;
                let mut flags = FieldAttributes::from_bits_truncate(0x0001);
                if property.is_static {
                    flags |= FieldAttributes::STATIC;
                }
                layout.tables.field.push(FieldRaw {
                    flags: flags.bits(),
                    name,
                    signature,
                });
                first_field += 1;
            }

            let mut methods = def.methods.clone();
            let mut accessor_rows = Vec::with_capacity(def.properties.len());
            for property in &def.properties {
                let mut accessor_flags = MethodAttributes::from_bits_truncate(0x0006)
                    | MethodAttributes::HIDE_BY_SIG
                    | MethodAttributes::SPECIAL_NAME;
                if property.is_static {
                    accessor_flags |= MethodAttributes::STATIC;
                }

                let getter = if property.getter {
                    let mut getter = Method::new(&format!("get_{}", property.name), property.ty.clone());
                    getter.flags = accessor_flags;
                    methods.push(getter);
                    Some(first_method + methods.len() as u32 - 1)
                } else {
                    None
                };
                let setter = if property.setter {
                    let mut setter = Method::new(&format!("set_{}", property.name), Ty::Void)
                        .param(Param::new("value", property.ty.clone()));
                    setter.flags = accessor_flags;
                    methods.push(setter);
                    Some(first_method + methods.len() as u32 - 1)
                } else {
                    None
                };
                accessor_rows.push((getter, setter));
            }

            for method in &methods {
                let token = Token::from_parts(TableId::MethodDef, first_method);
                let has_this = !method.flags.contains(MethodAttributes::STATIC);

                let mut params = Vec::with_capacity(method.params.len());
                for param in &method.params {
                    let base = layout.signature(&param.ty)?;
                    params.push(if param.by_ref {
                        SignatureParameter::by_ref(base)
                    } else {
                        SignatureParameter::new(base)
                    });
                }
                let returns = layout.signature(&method.returns)?;
                let blob = encode_method_signature(&SignatureMethod {
                    has_this,
                    explicit_this: false,
                    param_count_generic: method.generic_params.len() as u32,
                    return_type: SignatureParameter::new(returns),
                    params,
                })?;

                let body = match &method.body {
                    Some(body) => layout.body(def, type_first_field, body)?,
                    None => 0,
                };

                let name = layout.heaps.string(&method.name);
                let signature = layout.heaps.blob(&blob)?;
                layout.tables.method_def.push(MethodDefRaw {
                    body,
                    impl_flags: 0,
                    flags: method.flags.bits(),
                    name,
                    signature,
                    param_list: first_param,
                });

                for (sequence, param) in method.params.iter().enumerate() {
                    let name = layout.heaps.string(&param.name);
                    layout.tables.param.push(ParamRaw {
                        flags: param.flags.bits(),
                        sequence: sequence as u16 + 1,
                        name,
                    });
                    first_param += 1;
                }

                for (number, param) in method.generic_params.iter().enumerate() {
                    let name = layout.heaps.string(param);
                    layout.tables.generic_param.push(GenericParamRaw {
                        number: number as u16,
                        flags: 0,
                        owner: token.value(),
                        name,
                    });
                }

                for attribute in &method.attributes {
                    deferred.push((token, attribute.clone()));
                }
                first_method += 1;
            }

            for (property, (getter, setter)) in def.properties.iter().zip(accessor_rows) {
                let token = Token::from_parts(TableId::Property, first_property);
                let base = layout.signature(&property.ty)?;
                let blob = encode_property_signature(&SignatureProperty {
                    has_this: !property.is_static,
                    modifiers: Vec::new(),
                    base,
                    params: Vec::new(),
                })?;
                let name = layout.heaps.string(&property.name);
                let signature = layout.heaps.blob(&blob)?;
                layout.tables.property.push(PropertyRaw {
                    flags: 0,
                    name,
                    signature,
                    getter: getter.unwrap_or(0),
                    setter: setter.unwrap_or(0),
                });
                for attribute in &property.attributes {
                    deferred.push((token, attribute.clone()));
                }
                first_property += 1;
            }
        }

        for (parent, attribute) in deferred {
            layout.attribute(parent, &attribute)?;
        }

        let table_data = layout.tables.write();
        Ok(ModuleImage::encode(&[
            ("#~", &table_data),
            ("#Strings", &layout.heaps.strings),
            ("#US", &layout.heaps.user_strings),
            ("#GUID", &guids),
            ("#Blob", &layout.heaps.blobs),
            ("#IL", &layout.il),
        ]))
    }

    /// Build the image and write it to `path`.
    ///
    /// # Errors
    /// Returns an error if building fails or the file cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let data = self.build()?;
        std::fs::write(path, data)?;
        Ok(())
    }
}

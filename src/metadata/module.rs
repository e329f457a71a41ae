//! Owned, fully decoded module.
//!
//! [`LoadedModule`] decodes a [`ModuleImage`] eagerly into owned declarations: every heap index
//! is resolved to its string, every signature and custom attribute blob is parsed, member lists
//! are split into per-type runs and method bodies are copied out of the `#IL` stream. After
//! loading, nothing borrows from the image.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};

use crate::{
    file::File,
    metadata::{
        customattributes::{parse_custom_attribute_blob, CustomAttributeValue},
        flags::{FieldAttributes, MemberAccess, MethodAttributes, ParamAttributes, TypeAttributes},
        image::ModuleImage,
        method::MethodBody,
        signatures::{
            parse_field_signature, parse_method_signature, parse_property_signature,
            parse_type_spec_signature, SignatureMethod, SignatureProperty, TypeSignature,
            ELEMENT_TYPE,
        },
        streams::UserStrings,
        tables::TableId,
        token::{Token, USER_STRING_TABLE},
    },
    Result,
};

/// Version quadruple of an assembly or assembly reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    /// Major version
    pub major: u16,
    /// Minor version
    pub minor: u16,
    /// Build number
    pub build: u16,
    /// Revision number
    pub revision: u16,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// A reference to another assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyReference {
    /// Simple name of the referenced assembly
    pub name: String,
    /// Requested version
    pub version: Version,
}

/// Where a type reference points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionScope {
    /// The referencing module itself
    Module,
    /// Another assembly, by simple name
    Assembly(String),
    /// A nested type of the referenced enclosing type
    Enclosing(Token),
}

/// A reference to a type declared elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeReference {
    /// Token of the reference
    pub token: Token,
    /// Where the type is declared
    pub scope: ResolutionScope,
    /// Namespace of the type
    pub namespace: String,
    /// Name of the type
    pub name: String,
}

impl TypeReference {
    /// `Namespace.Name`, or just `Name` without a namespace.
    #[must_use]
    pub fn full_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }
}

/// A reference to a member of another type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberReference {
    /// Token of the reference
    pub token: Token,
    /// Declaring type (TypeDef, TypeRef or TypeSpec)
    pub class: Token,
    /// Member name
    pub name: String,
    /// Raw signature blob
    pub signature: Vec<u8>,
}

/// A compile-time constant value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    /// Null reference
    Null,
    /// Boolean
    Bool(bool),
    /// UTF-16 character
    Char(char),
    /// Signed integer of any width, widened
    Integer(i64),
    /// Unsigned integer of any width, widened
    Unsigned(u64),
    /// 32-bit float
    R4(f32),
    /// 64-bit float
    R8(f64),
    /// String
    String(String),
}

impl ConstantValue {
    /// The value as a signed integer, if it is integral and fits.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConstantValue::Integer(value) => Some(*value),
            ConstantValue::Unsigned(value) => i64::try_from(*value).ok(),
            ConstantValue::Char(value) => Some(i64::from(u32::from(*value))),
            ConstantValue::Bool(value) => Some(i64::from(*value)),
            _ => None,
        }
    }
}

/// A custom attribute applied to a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDeclaration {
    /// Full name of the attribute type
    pub type_name: String,
    /// Decoded arguments
    pub value: CustomAttributeValue,
}

impl AttributeDeclaration {
    /// The attribute type name without namespace.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        match self.type_name.rfind('.') {
            Some(pos) => &self.type_name[pos + 1..],
            None => &self.type_name,
        }
    }
}

/// A field declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDeclaration {
    /// Token of the field
    pub token: Token,
    /// Field name
    pub name: String,
    /// Field flags
    pub flags: FieldAttributes,
    /// Field type
    pub signature: TypeSignature,
    /// Constant value of literal fields
    pub constant: Option<ConstantValue>,
    /// Applied custom attributes
    pub attributes: Vec<AttributeDeclaration>,
}

impl FieldDeclaration {
    /// Declared accessibility.
    #[must_use]
    pub fn access(&self) -> MemberAccess {
        MemberAccess::from_flags(self.flags.bits())
    }

    /// Returns `true` for static fields.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(FieldAttributes::STATIC)
    }
}

/// A parameter declaration. Sequence 0 describes the return value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDeclaration {
    /// Token of the parameter row
    pub token: Token,
    /// Position, 1-based; 0 is the return value
    pub sequence: u16,
    /// Parameter name
    pub name: String,
    /// Parameter flags
    pub flags: ParamAttributes,
    /// Default value of optional parameters
    pub constant: Option<ConstantValue>,
    /// Applied custom attributes
    pub attributes: Vec<AttributeDeclaration>,
}

/// A method declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDeclaration {
    /// Token of the method
    pub token: Token,
    /// Method name
    pub name: String,
    /// Method flags
    pub flags: MethodAttributes,
    /// Implementation flags
    pub impl_flags: u16,
    /// Method signature
    pub signature: SignatureMethod,
    /// Parameter rows
    pub params: Vec<ParamDeclaration>,
    /// Generic parameter names
    pub generic_params: Vec<String>,
    /// Decoded body, if the method has one
    pub body: Option<MethodBody>,
    /// Applied custom attributes
    pub attributes: Vec<AttributeDeclaration>,
}

impl MethodDeclaration {
    /// Declared accessibility.
    #[must_use]
    pub fn access(&self) -> MemberAccess {
        MemberAccess::from_flags(self.flags.bits())
    }

    /// Returns `true` for static methods.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodAttributes::STATIC)
    }

    /// Returns `true` for instance and type constructors.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.flags.contains(MethodAttributes::RT_SPECIAL_NAME)
            && (self.name == ".ctor" || self.name == ".cctor")
    }

    /// Returns `true` for compiler-generated accessors and operators.
    #[must_use]
    pub fn is_special_name(&self) -> bool {
        self.flags.contains(MethodAttributes::SPECIAL_NAME)
    }

    /// Parameter row for the 1-based `sequence`, if present.
    #[must_use]
    pub fn param(&self, sequence: u16) -> Option<&ParamDeclaration> {
        self.params.iter().find(|param| param.sequence == sequence)
    }
}

/// A property declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDeclaration {
    /// Token of the property
    pub token: Token,
    /// Property name
    pub name: String,
    /// Property flags
    pub flags: u16,
    /// Property signature
    pub signature: SignatureProperty,
    /// Getter method
    pub getter: Option<Token>,
    /// Setter method
    pub setter: Option<Token>,
    /// Default value
    pub constant: Option<ConstantValue>,
    /// Applied custom attributes
    pub attributes: Vec<AttributeDeclaration>,
}

/// A type declaration with all its members.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDeclaration {
    /// Token of the type
    pub token: Token,
    /// Type name, including a generic arity suffix
    pub name: String,
    /// Namespace; nested types inherit the namespace of their enclosing type
    pub namespace: String,
    /// Type flags
    pub flags: TypeAttributes,
    /// Base type (TypeDef, TypeRef or TypeSpec), null for interfaces and `System.Object`
    pub extends: Token,
    /// Implemented interfaces
    pub interfaces: Vec<Token>,
    /// Enclosing type of nested types
    pub enclosing: Option<Token>,
    /// Generic parameter names
    pub generic_params: Vec<String>,
    /// Fields
    pub fields: Vec<FieldDeclaration>,
    /// Methods
    pub methods: Vec<MethodDeclaration>,
    /// Properties
    pub properties: Vec<PropertyDeclaration>,
    /// Applied custom attributes
    pub attributes: Vec<AttributeDeclaration>,
}

impl TypeDeclaration {
    /// `Namespace.Name`, or just `Name` without a namespace.
    #[must_use]
    pub fn full_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }

    /// Returns `true` for interfaces.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(TypeAttributes::INTERFACE)
    }

    /// Returns `true` for generic type definitions.
    #[must_use]
    pub fn is_generic(&self) -> bool {
        !self.generic_params.is_empty()
    }

    /// Method by token.
    #[must_use]
    pub fn method(&self, token: Token) -> Option<&MethodDeclaration> {
        self.methods.iter().find(|method| method.token == token)
    }

    /// The parameterless instance constructor.
    #[must_use]
    pub fn default_constructor(&self) -> Option<&MethodDeclaration> {
        self.methods.iter().find(|method| {
            method.name == ".ctor" && !method.is_static() && method.signature.params.is_empty()
        })
    }

    /// Field by token.
    #[must_use]
    pub fn field(&self, token: Token) -> Option<&FieldDeclaration> {
        self.fields.iter().find(|field| field.token == token)
    }
}

/// A fully decoded module.
#[derive(Debug, Clone)]
pub struct LoadedModule {
    /// Simple name of the module (assembly name, or module name without extension)
    pub name: String,
    /// Path the module was loaded from
    pub path: Option<PathBuf>,
    /// Module version id
    pub mvid: Option<uguid::Guid>,
    /// Assembly version
    pub version: Version,
    /// Referenced assemblies
    pub assembly_refs: Vec<AssemblyReference>,
    /// Type references, indexed by row - 1
    pub type_refs: Vec<TypeReference>,
    /// Type specifications, indexed by row - 1
    pub type_specs: Vec<TypeSignature>,
    /// Member references, indexed by row - 1
    pub member_refs: Vec<MemberReference>,
    /// Type declarations, indexed by row - 1
    pub types: Vec<TypeDeclaration>,
    user_strings: Vec<u8>,
}

fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

/// Split a `list` column into per-owner `[start, end)` row ranges (0-based).
fn member_runs(starts: &[u32], count: usize, what: &str) -> Result<Vec<(usize, usize)>> {
    let mut runs = Vec::with_capacity(starts.len());
    for (index, start) in starts.iter().enumerate() {
        let start = (*start as usize).max(1) - 1;
        let end = match starts.get(index + 1) {
            Some(next) => (*next as usize).max(1) - 1,
            None => count,
        };

        if start > end || end > count {
            return Err(malformed_error!(
                "Invalid {} list run {}..{} (of {})",
                what,
                start,
                end,
                count
            ));
        }
        runs.push((start, end));
    }
    Ok(runs)
}

fn decode_constant(base_type: u8, data: &[u8]) -> Result<ConstantValue> {
    use crate::file::io::read_le;

    Ok(match base_type {
        ELEMENT_TYPE::BOOLEAN => ConstantValue::Bool(read_le::<u8>(data)? != 0),
        ELEMENT_TYPE::CHAR => ConstantValue::Char(
            char::from_u32(u32::from(read_le::<u16>(data)?)).unwrap_or(char::REPLACEMENT_CHARACTER),
        ),
        ELEMENT_TYPE::I1 => ConstantValue::Integer(i64::from(read_le::<i8>(data)?)),
        ELEMENT_TYPE::U1 => ConstantValue::Unsigned(u64::from(read_le::<u8>(data)?)),
        ELEMENT_TYPE::I2 => ConstantValue::Integer(i64::from(read_le::<i16>(data)?)),
        ELEMENT_TYPE::U2 => ConstantValue::Unsigned(u64::from(read_le::<u16>(data)?)),
        ELEMENT_TYPE::I4 => ConstantValue::Integer(i64::from(read_le::<i32>(data)?)),
        ELEMENT_TYPE::U4 => ConstantValue::Unsigned(u64::from(read_le::<u32>(data)?)),
        ELEMENT_TYPE::I8 => ConstantValue::Integer(read_le::<i64>(data)?),
        ELEMENT_TYPE::U8 => ConstantValue::Unsigned(read_le::<u64>(data)?),
        ELEMENT_TYPE::R4 => ConstantValue::R4(read_le::<f32>(data)?),
        ELEMENT_TYPE::R8 => ConstantValue::R8(read_le::<f64>(data)?),
        ELEMENT_TYPE::STRING => {
            if data.len() % 2 != 0 {
                return Err(malformed_error!("Odd-sized string constant"));
            }
            let mut parser = crate::file::parser::Parser::new(data);
            ConstantValue::String(parser.read_utf16(data.len() / 2)?)
        }
        ELEMENT_TYPE::CLASS => ConstantValue::Null,
        _ => {
            return Err(malformed_error!(
                "Unsupported constant type - 0x{:02X}",
                base_type
            ))
        }
    })
}

impl LoadedModule {
    /// Load a module from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid module image.
    pub fn from_path(path: &Path) -> Result<LoadedModule> {
        let file = File::from_path(path)?;
        let mut module = Self::from_image(&ModuleImage::parse(file.data())?)?;
        module.path = Some(path.to_path_buf());
        Ok(module)
    }

    /// Load a module from an in-memory image.
    ///
    /// # Errors
    /// Returns an error if the buffer is not a valid module image.
    pub fn from_mem(data: Vec<u8>) -> Result<LoadedModule> {
        let file = File::from_mem(data)?;
        Self::from_image(&ModuleImage::parse(file.data())?)
    }

    /// Decode a parsed image.
    ///
    /// # Errors
    /// Returns an error on any dangling heap index, row reference or malformed blob.
    #[allow(clippy::too_many_lines, clippy::cast_possible_truncation)]
    pub fn from_image(image: &ModuleImage) -> Result<LoadedModule> {
        let tables = &image.tables;
        let strings = &image.strings;
        let blob = &image.blob;

        let module_name = match tables.module.first() {
            Some(row) => strings.get(row.name as usize)?.to_string(),
            None => return Err(malformed_error!("Module table is empty")),
        };
        let mvid = match tables.module.first() {
            Some(row) if row.mvid != 0 => Some(image.guids.get(row.mvid as usize)?),
            _ => None,
        };

        let (name, version) = match tables.assembly.first() {
            Some(row) => (
                strings.get(row.name as usize)?.to_string(),
                Version {
                    major: row.major,
                    minor: row.minor,
                    build: row.build,
                    revision: row.revision,
                },
            ),
            None => (
                Path::new(&module_name)
                    .file_stem()
                    .map_or_else(|| module_name.clone(), |stem| stem.to_string_lossy().into_owned()),
                Version::default(),
            ),
        };

        let mut assembly_refs = Vec::with_capacity(tables.assembly_ref.len());
        for row in &tables.assembly_ref {
            assembly_refs.push(AssemblyReference {
                name: strings.get(row.name as usize)?.to_string(),
                version: Version {
                    major: row.major,
                    minor: row.minor,
                    build: row.build,
                    revision: row.revision,
                },
            });
        }

        let mut type_refs = Vec::with_capacity(tables.type_ref.len());
        for (index, row) in tables.type_ref.iter().enumerate() {
            let scope_token = Token::new(row.scope);
            let scope = if scope_token.is_null() {
                ResolutionScope::Module
            } else if scope_token.is_table(TableId::AssemblyRef) {
                match assembly_refs.get(scope_token.row() as usize - 1) {
                    Some(reference) => ResolutionScope::Assembly(reference.name.clone()),
                    None => {
                        return Err(malformed_error!(
                            "TypeRef scope {} out of range",
                            scope_token
                        ))
                    }
                }
            } else if scope_token.is_table(TableId::TypeRef) {
                ResolutionScope::Enclosing(scope_token)
            } else {
                return Err(malformed_error!(
                    "Unsupported TypeRef scope {}",
                    scope_token
                ));
            };

            type_refs.push(TypeReference {
                token: Token::from_parts(TableId::TypeRef, index as u32 + 1),
                scope,
                namespace: strings.get(row.namespace as usize)?.to_string(),
                name: strings.get(row.name as usize)?.to_string(),
            });
        }

        let mut type_specs = Vec::with_capacity(tables.type_spec.len());
        for row in &tables.type_spec {
            type_specs.push(parse_type_spec_signature(blob.get(row.signature as usize)?)?.base);
        }

        let mut member_refs = Vec::with_capacity(tables.member_ref.len());
        for (index, row) in tables.member_ref.iter().enumerate() {
            member_refs.push(MemberReference {
                token: Token::from_parts(TableId::MemberRef, index as u32 + 1),
                class: Token::new(row.class),
                name: strings.get(row.name as usize)?.to_string(),
                signature: blob.get(row.signature as usize)?.to_vec(),
            });
        }

        let field_runs = member_runs(
            &tables.type_def.iter().map(|row| row.field_list).collect::<Vec<_>>(),
            tables.field.len(),
            "field",
        )?;
        let method_runs = member_runs(
            &tables.type_def.iter().map(|row| row.method_list).collect::<Vec<_>>(),
            tables.method_def.len(),
            "method",
        )?;
        let property_runs = member_runs(
            &tables.type_def.iter().map(|row| row.property_list).collect::<Vec<_>>(),
            tables.property.len(),
            "property",
        )?;
        let param_runs = member_runs(
            &tables.method_def.iter().map(|row| row.param_list).collect::<Vec<_>>(),
            tables.param.len(),
            "param",
        )?;

        let mut constants: HashMap<Token, ConstantValue> = HashMap::new();
        for row in &tables.constant {
            constants.insert(
                Token::new(row.parent),
                decode_constant(row.base_type, blob.get(row.value as usize)?)?,
            );
        }

        let mut generic_params: HashMap<Token, Vec<(u16, String)>> = HashMap::new();
        for row in &tables.generic_param {
            generic_params
                .entry(Token::new(row.owner))
                .or_default()
                .push((row.number, strings.get(row.name as usize)?.to_string()));
        }
        let mut take_generic_params = |token: Token| -> Vec<String> {
            let mut params = generic_params.remove(&token).unwrap_or_default();
            params.sort_by_key(|(number, _)| *number);
            params.into_iter().map(|(_, name)| name).collect()
        };

        let mut module = LoadedModule {
            name,
            path: None,
            mvid,
            version,
            assembly_refs,
            type_refs,
            type_specs,
            member_refs,
            types: Vec::with_capacity(tables.type_def.len()),
            user_strings: image.user_strings_data.to_vec(),
        };

        // Attributes reference type names of the constructor owner and of enum/type arguments,
        // so the name lookup must be available before declarations are built.
        let mut type_def_names: Vec<(String, String)> = Vec::with_capacity(tables.type_def.len());
        for row in &tables.type_def {
            type_def_names.push((
                strings.get(row.namespace as usize)?.to_string(),
                strings.get(row.name as usize)?.to_string(),
            ));
        }

        let type_name = |token: Token| -> Option<String> {
            if token.is_table(TableId::TypeDef) {
                type_def_names
                    .get((token.row() as usize).checked_sub(1)?)
                    .map(|(namespace, name)| qualify(namespace, name))
            } else {
                module.type_ref_name(token)
            }
        };

        let method_owner = |method_row: usize| -> Option<usize> {
            method_runs
                .iter()
                .position(|(start, end)| method_row >= *start && method_row < *end)
        };

        let mut attributes: HashMap<Token, Vec<AttributeDeclaration>> = HashMap::new();
        for row in &tables.custom_attribute {
            let constructor = Token::new(row.constructor);
            let (owner_name, signature) = if constructor.is_table(TableId::MemberRef) {
                let Some(reference) = module.member_refs.get((constructor.row() as usize).wrapping_sub(1)) else {
                    return Err(malformed_error!("Attribute constructor {} out of range", constructor));
                };
                (
                    type_name(reference.class),
                    parse_method_signature(&reference.signature)?,
                )
            } else if constructor.is_table(TableId::MethodDef) {
                let method_row = (constructor.row() as usize).wrapping_sub(1);
                let Some(method) = tables.method_def.get(method_row) else {
                    return Err(malformed_error!("Attribute constructor {} out of range", constructor));
                };
                (
                    method_owner(method_row).and_then(|owner| {
                        type_name(Token::from_parts(TableId::TypeDef, owner as u32 + 1))
                    }),
                    parse_method_signature(blob.get(method.signature as usize)?)?,
                )
            } else {
                return Err(malformed_error!(
                    "Invalid attribute constructor {}",
                    constructor
                ));
            };

            let Some(type_name_value) = owner_name else {
                return Err(malformed_error!(
                    "Cannot resolve attribute type of constructor {}",
                    constructor
                ));
            };

            let value =
                parse_custom_attribute_blob(blob.get(row.value as usize)?, &signature, &type_name)?;
            attributes
                .entry(Token::new(row.parent))
                .or_default()
                .push(AttributeDeclaration {
                    type_name: type_name_value,
                    value,
                });
        }
        let mut take_attributes =
            |token: Token| -> Vec<AttributeDeclaration> { attributes.remove(&token).unwrap_or_default() };

        let mut interfaces: HashMap<u32, Vec<Token>> = HashMap::new();
        for row in &tables.interface_impl {
            interfaces
                .entry(row.class)
                .or_default()
                .push(Token::new(row.interface));
        }

        let mut enclosing: HashMap<u32, u32> = HashMap::new();
        for row in &tables.nested_class {
            enclosing.insert(row.nested, row.enclosing);
        }

        let mut types = Vec::with_capacity(tables.type_def.len());
        for (type_index, row) in tables.type_def.iter().enumerate() {
            let type_token = Token::from_parts(TableId::TypeDef, type_index as u32 + 1);

            let (field_start, field_end) = field_runs[type_index];
            let mut fields = Vec::with_capacity(field_end - field_start);
            for field_index in field_start..field_end {
                let field = &tables.field[field_index];
                let token = Token::from_parts(TableId::Field, field_index as u32 + 1);
                fields.push(FieldDeclaration {
                    token,
                    name: strings.get(field.name as usize)?.to_string(),
                    flags: FieldAttributes::from_bits_truncate(field.flags),
                    signature: parse_field_signature(blob.get(field.signature as usize)?)?.base,
                    constant: constants.remove(&token),
                    attributes: take_attributes(token),
                });
            }

            let (method_start, method_end) = method_runs[type_index];
            let mut methods = Vec::with_capacity(method_end - method_start);
            for method_index in method_start..method_end {
                let method = &tables.method_def[method_index];
                let token = Token::from_parts(TableId::MethodDef, method_index as u32 + 1);

                let (param_start, param_end) = param_runs[method_index];
                let mut params = Vec::with_capacity(param_end - param_start);
                for param_index in param_start..param_end {
                    let param = &tables.param[param_index];
                    let param_token = Token::from_parts(TableId::Param, param_index as u32 + 1);
                    params.push(ParamDeclaration {
                        token: param_token,
                        sequence: param.sequence,
                        name: strings.get(param.name as usize)?.to_string(),
                        flags: ParamAttributes::from_bits_truncate(param.flags),
                        constant: constants.remove(&param_token),
                        attributes: take_attributes(param_token),
                    });
                }

                let body = if method.body == 0 {
                    None
                } else {
                    let offset = method.body as usize;
                    if offset >= image.il.len() {
                        return Err(malformed_error!(
                            "Method body offset {} outside #IL stream",
                            offset
                        ));
                    }
                    Some(MethodBody::from(&image.il[offset..])?)
                };

                methods.push(MethodDeclaration {
                    token,
                    name: strings.get(method.name as usize)?.to_string(),
                    flags: MethodAttributes::from_bits_truncate(method.flags),
                    impl_flags: method.impl_flags,
                    signature: parse_method_signature(blob.get(method.signature as usize)?)?,
                    params,
                    generic_params: take_generic_params(token),
                    body,
                    attributes: take_attributes(token),
                });
            }

            let (property_start, property_end) = property_runs[type_index];
            let mut properties = Vec::with_capacity(property_end - property_start);
            for property_index in property_start..property_end {
                let property = &tables.property[property_index];
                let token = Token::from_parts(TableId::Property, property_index as u32 + 1);
                let accessor = |row: u32| -> Result<Option<Token>> {
                    if row == 0 {
                        return Ok(None);
                    }
                    if row as usize > tables.method_def.len() {
                        return Err(malformed_error!("Property accessor row {} out of range", row));
                    }
                    Ok(Some(Token::from_parts(TableId::MethodDef, row)))
                };

                properties.push(PropertyDeclaration {
                    token,
                    name: strings.get(property.name as usize)?.to_string(),
                    flags: property.flags,
                    signature: parse_property_signature(blob.get(property.signature as usize)?)?,
                    getter: accessor(property.getter)?,
                    setter: accessor(property.setter)?,
                    constant: constants.remove(&token),
                    attributes: take_attributes(token),
                });
            }

            let enclosing_token = enclosing
                .get(&(type_index as u32 + 1))
                .map(|row| Token::from_parts(TableId::TypeDef, *row));

            types.push(TypeDeclaration {
                token: type_token,
                name: type_def_names[type_index].1.clone(),
                namespace: type_def_names[type_index].0.clone(),
                flags: TypeAttributes::from_bits_truncate(row.flags),
                extends: Token::new(row.extends),
                interfaces: interfaces.remove(&(type_index as u32 + 1)).unwrap_or_default(),
                enclosing: enclosing_token,
                generic_params: take_generic_params(type_token),
                fields,
                methods,
                properties,
                attributes: take_attributes(type_token),
            });
        }

        // Nested types carry no namespace of their own.
        for index in 0..types.len() {
            let mut current = types[index].enclosing;
            let mut depth = 0;
            while types[index].namespace.is_empty() {
                let Some(outer) = current else { break };
                let Some(outer_type) = types.get((outer.row() as usize).wrapping_sub(1)) else {
                    return Err(malformed_error!("Enclosing type {} out of range", outer));
                };
                depth += 1;
                if depth > types.len() {
                    return Err(malformed_error!("Cyclic nesting at type {}", outer));
                }
                let namespace = outer_type.namespace.clone();
                current = outer_type.enclosing;
                types[index].namespace = namespace;
            }
        }

        module.types = types;
        Ok(module)
    }

    fn type_ref_name(&self, token: Token) -> Option<String> {
        if !token.is_table(TableId::TypeRef) {
            return None;
        }
        self.type_refs
            .get((token.row() as usize).checked_sub(1)?)
            .map(TypeReference::full_name)
    }

    /// Type declaration by TypeDef token.
    #[must_use]
    pub fn type_def(&self, token: Token) -> Option<&TypeDeclaration> {
        if !token.is_table(TableId::TypeDef) {
            return None;
        }
        self.types.get((token.row() as usize).checked_sub(1)?)
    }

    /// Type reference by TypeRef token.
    #[must_use]
    pub fn type_ref(&self, token: Token) -> Option<&TypeReference> {
        if !token.is_table(TableId::TypeRef) {
            return None;
        }
        self.type_refs.get((token.row() as usize).checked_sub(1)?)
    }

    /// Type specification by TypeSpec token.
    #[must_use]
    pub fn type_spec(&self, token: Token) -> Option<&TypeSignature> {
        if !token.is_table(TableId::TypeSpec) {
            return None;
        }
        self.type_specs.get((token.row() as usize).checked_sub(1)?)
    }

    /// Full name of a TypeDef or TypeRef token.
    #[must_use]
    pub fn full_name(&self, token: Token) -> Option<String> {
        if let Some(declaration) = self.type_def(token) {
            return Some(declaration.full_name());
        }
        self.type_ref_name(token)
    }

    /// Type declaration by full name.
    #[must_use]
    pub fn find_type(&self, namespace: &str, name: &str) -> Option<&TypeDeclaration> {
        self.type_index(namespace, name).map(|index| &self.types[index])
    }

    /// Index into [`LoadedModule::types`] of a type by full name, top-level types first.
    #[must_use]
    pub fn type_index(&self, namespace: &str, name: &str) -> Option<usize> {
        let matches = |declaration: &TypeDeclaration| {
            declaration.namespace == namespace && declaration.name == name
        };
        self.types
            .iter()
            .position(|declaration| declaration.enclosing.is_none() && matches(declaration))
            .or_else(|| self.types.iter().position(matches))
    }

    /// The type that declares the field with `token`.
    #[must_use]
    pub fn field_owner(&self, token: Token) -> Option<(&TypeDeclaration, &FieldDeclaration)> {
        self.types.iter().find_map(|declaration| {
            declaration
                .field(token)
                .map(|field| (declaration, field))
        })
    }

    /// The type that declares the method with `token`.
    #[must_use]
    pub fn method_owner(&self, token: Token) -> Option<(&TypeDeclaration, &MethodDeclaration)> {
        self.types.iter().find_map(|declaration| {
            declaration
                .method(token)
                .map(|method| (declaration, method))
        })
    }

    /// Literal loaded by an `ldstr` token.
    ///
    /// # Errors
    /// Returns an error if the token does not address the user-string heap or is out of range.
    pub fn user_string(&self, token: Token) -> Result<String> {
        if token.table() != USER_STRING_TABLE {
            return Err(malformed_error!("Token {} is not a user string", token));
        }
        UserStrings::from(&self.user_strings)?.get(token.row() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::factories::sample_module;

    #[test]
    fn decode_sample() {
        let module = sample_module();

        assert_eq!(module.name, "Game");
        let actor = module.find_type("Game.Actors", "AMyActor").unwrap();
        assert!(!actor.is_interface());
        assert!(actor.fields.iter().any(|field| field.name == "Health"));
        assert!(actor
            .attributes
            .iter()
            .any(|attribute| attribute.simple_name() == "UClassAttribute"));
        assert!(actor.default_constructor().is_some());
    }

    #[test]
    fn runs() {
        assert_eq!(
            member_runs(&[1, 3, 3], 4, "field").unwrap(),
            vec![(0, 2), (2, 2), (2, 4)]
        );
        assert!(member_runs(&[3, 1], 4, "field").is_err());
        assert!(member_runs(&[1, 9], 4, "field").is_err());
    }

    #[test]
    fn constants() {
        assert_eq!(
            decode_constant(ELEMENT_TYPE::I4, &[0x05, 0, 0, 0]).unwrap(),
            ConstantValue::Integer(5)
        );
        assert_eq!(
            decode_constant(ELEMENT_TYPE::STRING, &[b'h', 0, b'i', 0]).unwrap(),
            ConstantValue::String("hi".to_string())
        );
        assert!(decode_constant(ELEMENT_TYPE::STRING, &[b'h']).is_err());
        assert!(decode_constant(0x1C, &[]).is_err());
    }

    #[test]
    fn invalid_image() {
        assert!(LoadedModule::from_mem(Vec::new()).is_err());
        assert!(LoadedModule::from_mem(b"BMOD\x01\x00\x00\x00\x00\x00\x00\x00".to_vec()).is_err());
    }
}

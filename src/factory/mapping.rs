//! Mapping of declared types to type-class tags, names and native layouts.

use std::sync::Arc;

use crate::{
    bindings::{
        role_of,
        wellknown::{WellKnown, CORE_TYPE},
        BindingError, ErrorKind, SymbolCategory, SymbolId, TypeKind, TypeRole,
    },
    factory::{members::reflected_members, ModelFactory, StructLayout},
    loader::{ResolvedType, TypeHandle},
    metadata::{
        flags::ParamAttributes,
        module::{LoadedModule, MethodDeclaration, TypeDeclaration},
        signatures::TypeSignature,
        token::Token,
    },
    model::{
        layout::layout_properties,
        names::{delegate_signature_name, display_name},
        BaseDefinition, FunctionDefinition, FunctionFlags, PropertyDefinition, PropertyFlags,
        ReferenceKind, TypeClass, TypeReferenceInfo,
    },
    Error, Result,
};

/// Where a mapped type appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    /// Field or property of a type
    Property,
    /// Function or delegate parameter
    Parameter,
    /// Function or delegate return value
    Return,
    /// Generic argument of a container
    Inner,
}

/// The declaration a diagnostic is reported against.
#[derive(Debug, Clone)]
pub(crate) struct Site {
    symbol: SymbolId,
    module: String,
    token: Token,
}

impl Site {
    pub(crate) fn new(
        owner: &str,
        member: &str,
        category: SymbolCategory,
        module: &str,
        token: Token,
    ) -> Self {
        Site {
            symbol: SymbolId::member(owner, member, category),
            module: module.to_string(),
            token,
        }
    }

    pub(crate) fn for_type(owner: &str, module: &str, token: Token) -> Self {
        Site {
            symbol: SymbolId::type_(owner),
            module: module.to_string(),
            token,
        }
    }

    pub(crate) fn error(&self, kind: ErrorKind, message: impl Into<String>) -> BindingError {
        BindingError::new(kind, message, self.symbol.clone()).at(&self.module, self.token)
    }
}

struct Mapped {
    type_name: String,
    type_class: TypeClass,
    size: usize,
    alignment: usize,
    reference: Option<TypeReferenceInfo>,
    inner: Vec<PropertyDefinition>,
    signature: Option<Box<FunctionDefinition>>,
}

impl Mapped {
    fn fixed(type_class: TypeClass, type_name: &str) -> Self {
        let (size, alignment) = type_class.native_layout().unwrap_or((0, 1));
        Mapped {
            type_name: type_name.to_string(),
            type_class,
            size,
            alignment,
            reference: None,
            inner: Vec::new(),
            signature: None,
        }
    }
}

/// Key of a struct layout in the factory cache.
pub(crate) fn layout_key(module: &str, full_name: &str) -> String {
    format!("{module}!{full_name}")
}

/// By-name link to the type behind `handle`.
pub(crate) fn reference_info(
    handle: &TypeHandle,
    kind: ReferenceKind,
    underlying: Option<TypeClass>,
) -> TypeReferenceInfo {
    let declaration = handle.declaration();
    TypeReferenceInfo {
        native_name: declaration.name.clone(),
        name: display_name(&declaration.name),
        namespace: declaration.namespace.clone(),
        module: handle.module.name.clone(),
        kind,
        underlying,
    }
}

/// Integer tag of an enum's `value__` field.
pub(crate) fn enum_underlying(declaration: &TypeDeclaration) -> Option<TypeClass> {
    let field = declaration.fields.iter().find(|field| field.name == "value__")?;
    Some(match field.signature {
        TypeSignature::I1 => TypeClass::Int8,
        TypeSignature::U1 => TypeClass::UInt8,
        TypeSignature::I2 => TypeClass::Int16,
        TypeSignature::U2 => TypeClass::UInt16,
        TypeSignature::I4 => TypeClass::Int32,
        TypeSignature::U4 => TypeClass::UInt32,
        TypeSignature::I8 => TypeClass::Int64,
        TypeSignature::U8 => TypeClass::UInt64,
        _ => return None,
    })
}

fn generic_base_name(name: &str) -> &str {
    name.split('`').next().unwrap_or(name)
}

impl ModelFactory<'_> {
    /// Map a declared member type into a property named `name` owned by `owner`.
    ///
    /// Returns `Ok(None)` after recording a diagnostic when the type is not bindable.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn map_property(
        &mut self,
        module: &Arc<LoadedModule>,
        signature: &TypeSignature,
        name: &str,
        owner: &BaseDefinition,
        slot: Slot,
        site: &Site,
        depth: usize,
    ) -> Result<Option<PropertyDefinition>> {
        let Some(mapped) = self.map_type(module, signature, name, owner, slot, site, depth)? else {
            return Ok(None);
        };
        Ok(Some(PropertyDefinition {
            base: BaseDefinition::for_member(name, owner),
            type_name: mapped.type_name,
            type_class: mapped.type_class,
            size: mapped.size,
            alignment: mapped.alignment,
            offset: 0,
            flags: PropertyFlags::empty(),
            reference: mapped.reference,
            inner: mapped.inner,
            signature: mapped.signature,
            default_value: None,
        }))
    }

    #[allow(clippy::too_many_arguments)]
    fn map_type(
        &mut self,
        module: &Arc<LoadedModule>,
        signature: &TypeSignature,
        name: &str,
        owner: &BaseDefinition,
        slot: Slot,
        site: &Site,
        depth: usize,
    ) -> Result<Option<Mapped>> {
        if depth > self.recursion_limit {
            return Err(Error::RecursionLimit(self.recursion_limit));
        }

        let fixed = |type_class: TypeClass, type_name: &str| -> Result<Option<Mapped>> {
            Ok(Some(Mapped::fixed(type_class, type_name)))
        };
        match signature {
            TypeSignature::Boolean => fixed(TypeClass::Bool, "bool"),
            TypeSignature::I1 => fixed(TypeClass::Int8, "sbyte"),
            TypeSignature::U1 => fixed(TypeClass::UInt8, "byte"),
            TypeSignature::I2 => fixed(TypeClass::Int16, "short"),
            TypeSignature::U2 => fixed(TypeClass::UInt16, "ushort"),
            TypeSignature::I4 => fixed(TypeClass::Int32, "int"),
            TypeSignature::U4 => fixed(TypeClass::UInt32, "uint"),
            TypeSignature::I8 => fixed(TypeClass::Int64, "long"),
            TypeSignature::U8 => fixed(TypeClass::UInt64, "ulong"),
            TypeSignature::R4 => fixed(TypeClass::Float, "float"),
            TypeSignature::R8 => fixed(TypeClass::Double, "double"),
            TypeSignature::String => fixed(TypeClass::String, "string"),
            TypeSignature::Class(token) | TypeSignature::ValueType(token) => {
                match self.resolver.resolve_token(module, *token)? {
                    ResolvedType::Declared(handle) => self.map_declared(&handle, slot, site, depth),
                    ResolvedType::Intrinsic(full_name) => {
                        self.reject(
                            site,
                            ErrorKind::UnsupportedType,
                            format!("'{full_name}' has no reflected counterpart"),
                        );
                        Ok(None)
                    }
                }
            }
            TypeSignature::GenericInst(base, args) => {
                self.map_generic(module, base, args, name, owner, slot, site, depth)
            }
            TypeSignature::GenericParamType(_) | TypeSignature::GenericParamMethod(_) => {
                self.reject(
                    site,
                    ErrorKind::UnsupportedType,
                    "Generic parameters cannot be reflected",
                );
                Ok(None)
            }
            other => {
                self.reject(
                    site,
                    ErrorKind::UnsupportedType,
                    format!("{other:?} has no type-class mapping"),
                );
                Ok(None)
            }
        }
    }

    fn map_declared(
        &mut self,
        handle: &TypeHandle,
        slot: Slot,
        site: &Site,
        depth: usize,
    ) -> Result<Option<Mapped>> {
        let declaration = handle.declaration();
        match WellKnown::from_name(&declaration.name) {
            Some(WellKnown::Name) => return Ok(Some(Mapped::fixed(TypeClass::Name, "FName"))),
            Some(WellKnown::Text) => return Ok(Some(Mapped::fixed(TypeClass::Text, "FText"))),
            Some(WellKnown::RawClass) => {
                self.reject(
                    site,
                    ErrorKind::RawClassPointer,
                    "Raw UClass references are not supported, use TSubclassOf<T>",
                );
                return Ok(None);
            }
            _ => {}
        }

        let role = role_of(&handle.module, declaration);
        if !role.is_reflected() {
            self.reject(
                site,
                ErrorKind::UnsupportedType,
                format!("'{}' is not a reflected type", declaration.full_name()),
            );
            return Ok(None);
        }

        let mapped = match role.kind() {
            TypeKind::Class | TypeKind::Interface => {
                let kind = if role.kind() == TypeKind::Interface {
                    ReferenceKind::Interface
                } else {
                    ReferenceKind::Class
                };
                let mut mapped = Mapped::fixed(TypeClass::Object, &declaration.name);
                mapped.reference = Some(reference_info(handle, kind, None));
                mapped
            }
            // A container header has a fixed size, so element layouts are not needed while an
            // enclosing layout is being computed. Self-referential containers stay legal.
            TypeKind::Struct if slot == Slot::Inner && !self.pending.is_empty() => Mapped {
                type_name: declaration.name.clone(),
                type_class: TypeClass::Struct,
                size: 0,
                alignment: 1,
                reference: Some(reference_info(handle, ReferenceKind::Struct, None)),
                inner: Vec::new(),
                signature: None,
            },
            TypeKind::Struct => {
                let layout = self.struct_layout(handle, depth + 1)?;
                Mapped {
                    type_name: declaration.name.clone(),
                    type_class: TypeClass::Struct,
                    size: layout.layout.size,
                    alignment: layout.layout.alignment,
                    reference: Some(reference_info(handle, ReferenceKind::Struct, None)),
                    inner: Vec::new(),
                    signature: None,
                }
            }
            TypeKind::Enum => {
                let Some(underlying) = enum_underlying(declaration) else {
                    self.reject(
                        site,
                        ErrorKind::UnsupportedType,
                        format!("Enum '{}' has no integral underlying type", declaration.full_name()),
                    );
                    return Ok(None);
                };
                let (size, alignment) = underlying.native_layout().unwrap_or((4, 4));
                Mapped {
                    type_name: declaration.name.clone(),
                    type_class: TypeClass::Enum,
                    size,
                    alignment,
                    reference: Some(reference_info(handle, ReferenceKind::Enum, Some(underlying))),
                    inner: Vec::new(),
                    signature: None,
                }
            }
            TypeKind::Delegate => {
                self.reject(
                    site,
                    ErrorKind::UnsupportedType,
                    format!(
                        "Delegate '{}' must be wrapped in TMulticastDelegate<T>",
                        declaration.full_name()
                    ),
                );
                return Ok(None);
            }
        };
        Ok(Some(mapped))
    }

    #[allow(clippy::too_many_arguments)]
    fn map_generic(
        &mut self,
        module: &Arc<LoadedModule>,
        base: &TypeSignature,
        args: &[TypeSignature],
        name: &str,
        owner: &BaseDefinition,
        slot: Slot,
        site: &Site,
        depth: usize,
    ) -> Result<Option<Mapped>> {
        let Some(base_token) = base.token() else {
            return Err(malformed_error!("Generic instantiation without a base type"));
        };

        let handle = match self.resolver.resolve_token(module, base_token)? {
            ResolvedType::Declared(handle) => handle,
            ResolvedType::Intrinsic(full_name) => {
                if full_name == CORE_TYPE::NULLABLE {
                    self.reject(
                        site,
                        ErrorKind::NullableValueType,
                        "Nullable value types are not supported",
                    );
                } else {
                    self.reject(
                        site,
                        ErrorKind::UnsupportedType,
                        format!("'{full_name}' has no reflected counterpart"),
                    );
                }
                return Ok(None);
            }
        };

        let declared = handle.declaration().name.clone();
        let (type_class, inner_names): (TypeClass, &[&str]) = match WellKnown::from_name(&declared) {
            Some(WellKnown::Array) => (TypeClass::Array, &["Inner"]),
            Some(WellKnown::Set) => (TypeClass::Set, &["Element"]),
            Some(WellKnown::Map) => (TypeClass::Map, &["Key", "Value"]),
            Some(WellKnown::SoftObjectPtr) => (TypeClass::SoftObject, &["Inner"]),
            Some(WellKnown::SoftClassPtr) => (TypeClass::SoftClass, &["Inner"]),
            Some(WellKnown::SubclassOf) => (TypeClass::Class, &["Inner"]),
            Some(WellKnown::Delegate) => {
                if matches!(slot, Slot::Property | Slot::Inner) {
                    self.reject(
                        site,
                        ErrorKind::SingleCastDelegateProperty,
                        "Delegate properties must be multicast, use TMulticastDelegate<T>",
                    );
                    return Ok(None);
                }
                (TypeClass::Delegate, &[])
            }
            Some(WellKnown::MulticastDelegate) => (TypeClass::MulticastDelegate, &[]),
            _ => {
                self.reject(
                    site,
                    ErrorKind::UnsupportedType,
                    format!("Generic type '{}' is not a supported container", handle.full_name()),
                );
                return Ok(None);
            }
        };

        let expected = inner_names.len().max(1);
        if args.len() != expected {
            return Err(malformed_error!(
                "'{}' instantiated with {} arguments, expected {}",
                declared,
                args.len(),
                expected
            ));
        }

        let mut mapped = Mapped::fixed(type_class, "");
        let base_name = generic_base_name(&declared);

        if type_class.is_delegate() {
            let delegate = match args[0]
                .token()
                .map(|token| self.resolver.resolve_token(module, token))
                .transpose()?
            {
                Some(ResolvedType::Declared(delegate))
                    if role_of(&delegate.module, delegate.declaration()).kind() == TypeKind::Delegate =>
                {
                    delegate
                }
                _ => {
                    self.reject(
                        site,
                        ErrorKind::UnsupportedType,
                        format!("'{base_name}' must be instantiated with a delegate type"),
                    );
                    return Ok(None);
                }
            };
            let Some(signature) = self.delegate_signature(&delegate, owner, depth + 1)? else {
                return Ok(None);
            };
            mapped.type_name = format!("{base_name}<{}>", delegate.declaration().name);
            mapped.reference = Some(reference_info(&delegate, ReferenceKind::Delegate, None));
            mapped.signature = Some(Box::new(signature));
            return Ok(Some(mapped));
        }

        let mut failed = false;
        for (argument, suffix) in args.iter().zip(inner_names) {
            let inner_name = format!("{name}_{suffix}");
            match self.map_property(module, argument, &inner_name, owner, Slot::Inner, site, depth + 1)? {
                Some(inner) => mapped.inner.push(inner),
                None => failed = true,
            }
        }
        if failed {
            return Ok(None);
        }

        if matches!(
            type_class,
            TypeClass::SoftObject | TypeClass::SoftClass | TypeClass::Class
        ) && mapped.inner[0].type_class != TypeClass::Object
        {
            self.reject(
                site,
                ErrorKind::UnsupportedType,
                format!("'{base_name}' must be instantiated with a reflected class"),
            );
            return Ok(None);
        }

        let arguments: Vec<&str> = mapped
            .inner
            .iter()
            .map(|inner| inner.type_name.as_str())
            .collect();
        mapped.type_name = format!("{base_name}<{}>", arguments.join(", "));
        Ok(Some(mapped))
    }

    /// Callback shape of `delegate`, named `{Delegate}__DelegateSignature` under `owner`.
    pub(crate) fn delegate_signature(
        &mut self,
        delegate: &TypeHandle,
        owner: &BaseDefinition,
        depth: usize,
    ) -> Result<Option<FunctionDefinition>> {
        let declaration = delegate.declaration();
        let Some(invoke) = declaration.methods.iter().find(|method| method.name == "Invoke") else {
            return Err(malformed_error!(
                "Delegate '{}' has no Invoke method",
                declaration.full_name()
            ));
        };

        let name = delegate_signature_name(&declaration.name);
        let base = BaseDefinition::for_member(&name, owner);
        self.function_shape(
            &delegate.module,
            invoke,
            base,
            FunctionFlags::PUBLIC | FunctionFlags::DELEGATE,
            &declaration.full_name(),
            depth,
        )
    }

    /// Parameters, return value, identity string and parameter block of `method`.
    pub(crate) fn function_shape(
        &mut self,
        module: &Arc<LoadedModule>,
        method: &MethodDeclaration,
        base: BaseDefinition,
        mut flags: FunctionFlags,
        owner_name: &str,
        depth: usize,
    ) -> Result<Option<FunctionDefinition>> {
        let mut failed = false;
        let mut parameters = Vec::with_capacity(method.signature.params.len());

        for (index, parameter) in method.signature.params.iter().enumerate() {
            let sequence = u16::try_from(index + 1)
                .map_err(|_| malformed_error!("Too many parameters on '{}'", method.name))?;
            let row = method.param(sequence);
            let parameter_name = row.map_or_else(|| format!("Param{sequence}"), |row| row.name.clone());
            let site = Site::new(
                owner_name,
                &format!("{}.{}", method.name, parameter_name),
                SymbolCategory::Parameter,
                &module.name,
                row.map_or(method.token, |row| row.token),
            );

            let Some(mut property) = self.map_property(
                module,
                &parameter.base,
                &parameter_name,
                &base,
                Slot::Parameter,
                &site,
                depth,
            )?
            else {
                failed = true;
                continue;
            };

            if parameter.by_ref {
                let is_out = row.is_some_and(|row| row.flags.contains(ParamAttributes::OUT));
                property.flags |= if is_out {
                    PropertyFlags::OUT
                } else {
                    PropertyFlags::REFERENCE
                };
                flags |= FunctionFlags::HAS_OUT_PARAMS;
            }
            parameters.push(property);
        }

        let mut return_value = None;
        if method.signature.return_type.base != TypeSignature::Void {
            let site = Site::new(
                owner_name,
                &format!("{}.ReturnValue", method.name),
                SymbolCategory::Parameter,
                &module.name,
                method.token,
            );
            match self.map_property(
                module,
                &method.signature.return_type.base,
                "ReturnValue",
                &base,
                Slot::Return,
                &site,
                depth,
            )? {
                Some(mut property) => {
                    property.flags |= PropertyFlags::RETURN;
                    return_value = Some(property);
                }
                None => failed = true,
            }
        }

        if failed {
            return Ok(None);
        }

        let signature = self.signature_text(module, method)?;
        let mut function = FunctionDefinition {
            base,
            parameters,
            return_value,
            flags,
            signature,
            params_size: 0,
        };
        function.params_size = layout_properties(
            function
                .parameters
                .iter_mut()
                .chain(function.return_value.iter_mut()),
        )
        .size;
        Ok(Some(function))
    }

    /// Identity string of `method`, e.g. `bool(float,out int)`.
    ///
    /// Built from declared types only, so base and overriding declarations in different modules
    /// compare equal exactly when their shapes agree.
    pub(crate) fn signature_text(
        &self,
        module: &Arc<LoadedModule>,
        method: &MethodDeclaration,
    ) -> Result<String> {
        let mut text = self.type_text(module, &method.signature.return_type.base, 0)?;
        text.push('(');
        for (index, parameter) in method.signature.params.iter().enumerate() {
            if index > 0 {
                text.push(',');
            }
            if parameter.by_ref {
                let is_out = u16::try_from(index + 1)
                    .ok()
                    .and_then(|sequence| method.param(sequence))
                    .is_some_and(|row| row.flags.contains(ParamAttributes::OUT));
                text.push_str(if is_out { "out " } else { "ref " });
            }
            text.push_str(&self.type_text(module, &parameter.base, 0)?);
        }
        text.push(')');
        Ok(text)
    }

    fn type_text(&self, module: &Arc<LoadedModule>, signature: &TypeSignature, depth: usize) -> Result<String> {
        if depth > self.recursion_limit {
            return Err(Error::RecursionLimit(self.recursion_limit));
        }
        Ok(match signature {
            TypeSignature::Void => "void".to_string(),
            TypeSignature::Boolean => "bool".to_string(),
            TypeSignature::Char => "char".to_string(),
            TypeSignature::I1 => "sbyte".to_string(),
            TypeSignature::U1 => "byte".to_string(),
            TypeSignature::I2 => "short".to_string(),
            TypeSignature::U2 => "ushort".to_string(),
            TypeSignature::I4 => "int".to_string(),
            TypeSignature::U4 => "uint".to_string(),
            TypeSignature::I8 => "long".to_string(),
            TypeSignature::U8 => "ulong".to_string(),
            TypeSignature::R4 => "float".to_string(),
            TypeSignature::R8 => "double".to_string(),
            TypeSignature::String => "string".to_string(),
            TypeSignature::Object => "object".to_string(),
            TypeSignature::Class(token) | TypeSignature::ValueType(token) => {
                let resolved = self.resolver.resolve_token(module, *token)?;
                generic_base_name(&resolved.name()).to_string()
            }
            TypeSignature::GenericInst(base, args) => {
                let mut text = self.type_text(module, base, depth + 1)?;
                text.push('<');
                for (index, argument) in args.iter().enumerate() {
                    if index > 0 {
                        text.push(',');
                    }
                    text.push_str(&self.type_text(module, argument, depth + 1)?);
                }
                text.push('>');
                text
            }
            TypeSignature::SzArray(inner) => format!("{}[]", self.type_text(module, inner, depth + 1)?),
            TypeSignature::ByRef(inner) => format!("ref {}", self.type_text(module, inner, depth + 1)?),
            TypeSignature::GenericParamType(index) => format!("!{index}"),
            TypeSignature::GenericParamMethod(index) => format!("!!{index}"),
            other => format!("{other:?}"),
        })
    }

    /// Native layout of the struct behind `handle`, computed once and cached.
    ///
    /// Implementation structs lay out their `UProperty` members, placeholder structs every
    /// instance field. Diagnostics raised for the members are dropped here; an implementation
    /// struct reports them when it is built itself.
    pub(crate) fn struct_layout(&mut self, handle: &TypeHandle, depth: usize) -> Result<StructLayout> {
        let key = layout_key(&handle.module.name, &handle.full_name());
        if let Some(layout) = self.layouts.get(&key) {
            return Ok(*layout);
        }
        if !self.pending.insert(key.clone()) {
            return Err(malformed_error!(
                "Struct '{}' contains itself by value",
                handle.full_name()
            ));
        }

        let scratch = std::mem::take(&mut self.diagnostics);
        let properties = self.layout_members(handle, depth);
        self.diagnostics = scratch;
        self.pending.remove(&key);

        let mut properties = properties?;
        let layout = self.aggregate(&mut properties);
        self.layouts.insert(key, layout);
        Ok(layout)
    }

    fn layout_members(&mut self, handle: &TypeHandle, depth: usize) -> Result<Vec<PropertyDefinition>> {
        let declaration = handle.declaration();
        let all = !matches!(
            role_of(&handle.module, declaration),
            TypeRole::Implementation(_)
        );
        let owner = self.type_base(handle);

        let mut properties = Vec::new();
        for member in reflected_members(declaration, all) {
            if member.is_static {
                continue;
            }
            let site = Site::new(
                &declaration.full_name(),
                &member.name,
                SymbolCategory::Property,
                &handle.module.name,
                member.token,
            );
            if let Some(property) = self.map_property(
                &handle.module,
                &member.signature,
                &member.name,
                &owner,
                Slot::Property,
                &site,
                depth,
            )? {
                properties.push(property);
            }
        }
        Ok(properties)
    }

    /// Lay out `properties` and decide whether the aggregate is blittable.
    pub(crate) fn aggregate(&self, properties: &mut [PropertyDefinition]) -> StructLayout {
        let layout = layout_properties(properties.iter_mut());
        let blittable = properties.iter().all(|property| self.is_blittable(property));
        StructLayout { layout, blittable }
    }

    fn is_blittable(&self, property: &PropertyDefinition) -> bool {
        if property.type_class != TypeClass::Struct {
            return property.type_class.is_blittable();
        }
        property
            .reference
            .as_ref()
            .and_then(|reference| {
                self.layouts
                    .get(&layout_key(&reference.module, &reference.full_name()))
            })
            .is_some_and(|layout| layout.blittable)
    }

    /// Identity of the type behind `handle`.
    pub(crate) fn type_base(&self, handle: &TypeHandle) -> BaseDefinition {
        let declaration = handle.declaration();
        let module = &handle.module.name;
        BaseDefinition::for_type(&declaration.name, &declaration.namespace, module, module)
    }

    pub(crate) fn reject(&self, site: &Site, kind: ErrorKind, message: impl Into<String>) {
        self.diagnostics.push(site.error(kind, message));
    }
}

//! Type-definition model builder.
//!
//! [`ModelFactory`] turns every implementation type accepted by the
//! [`crate::bindings::Classifier`] into one [`TypeDefinition`], maps member types to type-class
//! tags, unwraps generic containers and delegate signatures, recovers constructor defaults,
//! tracks the namespaces each entity depends on and derives native layouts. Member-level
//! binding rules are checked on the way; violations are collected and reported together as
//! one [`Error::Validation`], so the document is either complete or not produced at all.
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use bindweaver::{bindings::Classifier, factory::ModelFactory, loader::ModuleResolver};
//! use std::path::Path;
//!
//! let resolver = ModuleResolver::new().with_search_path("modules");
//! let game = resolver.load(Path::new("modules/Game.bmod"))?;
//!
//! let classification = Classifier::new(&resolver).classify(&[game])?;
//! let document = ModelFactory::new(&resolver).build(&classification)?;
//! for definition in document.iter() {
//!     println!("{} -> {}", definition.base().full_name(), definition.base().path);
//! }
//! # Ok::<(), bindweaver::Error>(())
//! ```

mod defaults;
mod mapping;
mod members;
mod order;

use std::collections::{BTreeSet, HashMap, HashSet};

use uguid::Guid;

use crate::{
    bindings::{
        markers::{collect_metadata, find_marker, has_attribute, named_flag, user_flags, Marker},
        role_of,
        wellknown::{WellKnown, CORE_TYPE},
        BindingError, Classification, ClassifiedType, Classifier, Diagnostics, ErrorKind,
        SymbolCategory, SymbolId, TypeKind,
    },
    loader::{ModuleResolver, ResolvedType, TypeHandle},
    metadata::{
        customattributes::CustomAttributeArgument,
        flags::{FieldAttributes, MethodAttributes, TypeAttributes},
        module::{AttributeDeclaration, ConstantValue, MethodDeclaration},
    },
    model::{
        layout::NativeLayout, BaseDefinition, ClassDefinition, EnumDefinition, EnumField,
        FunctionDefinition, FunctionFlags, PropertyDefinition, PropertyFlags, ReferenceKind,
        StructDefinition, TypeDefinition, TypeDefinitionDocument, TypeFlags, TypeReferenceInfo,
    },
    Error, Result,
};

use defaults::{default_value, scan_initializers, Literal};
use mapping::{enum_underlying, layout_key, reference_info, Site, Slot};
use members::{function_access, property_access, reflected_functions, reflected_members, ReflectedMember};

/// Default bound on type nesting while mapping members and walking inheritance chains.
pub const DEFAULT_RECURSION_LIMIT: usize = 32;

/// Cached native layout of a struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StructLayout {
    /// Size and alignment
    pub layout: NativeLayout,
    /// Every member is blittable
    pub blittable: bool,
}

/// Builds the [`TypeDefinitionDocument`] of one generation run.
///
/// The factory owns the caches of one run (struct layouts) and is consumed by
/// [`ModelFactory::build`], so nothing leaks into a later run.
pub struct ModelFactory<'a> {
    resolver: &'a ModuleResolver,
    classifier: Classifier<'a>,
    diagnostics: Diagnostics,
    layouts: HashMap<String, StructLayout>,
    pending: HashSet<String>,
    recursion_limit: usize,
}

impl<'a> ModelFactory<'a> {
    /// Create a factory resolving member types through `resolver`.
    #[must_use]
    pub fn new(resolver: &'a ModuleResolver) -> Self {
        ModelFactory {
            resolver,
            classifier: Classifier::new(resolver),
            diagnostics: Diagnostics::new(),
            layouts: HashMap::new(),
            pending: HashSet::new(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// Bound the nesting depth of member types.
    #[must_use]
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Build one entity per implementation type of `classification`, in export order.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] with every member-level rule violation, or a load error if
    /// a referenced type cannot be resolved.
    pub fn build(mut self, classification: &Classification) -> Result<TypeDefinitionDocument> {
        let mut types = Vec::with_capacity(classification.implementations.len());
        for classified in &classification.implementations {
            if let Some(definition) = self.build_type(classified)? {
                types.push(definition);
            }
        }

        let diagnostics = std::mem::take(&mut self.diagnostics);
        diagnostics.into_result(()).map_err(Error::Validation)?;

        let types = order::export_order(types);
        log::debug!("Built {} type definitions", types.len());
        TypeDefinitionDocument::new(types)
    }

    /// Build the entity of a single implementation type.
    ///
    /// Rule violations are recorded in the factory and surface from [`ModelFactory::build`].
    ///
    /// # Errors
    /// Returns a load error if a referenced type cannot be resolved.
    pub fn build_type(&mut self, classified: &ClassifiedType) -> Result<Option<TypeDefinition>> {
        let handle = &classified.handle;
        Ok(match classified.kind {
            TypeKind::Enum => self.build_enum(handle)?.map(TypeDefinition::Enum),
            TypeKind::Struct => self.build_struct(handle)?.map(TypeDefinition::Struct),
            TypeKind::Class | TypeKind::Interface => {
                self.build_class(handle, classified.kind)?.map(TypeDefinition::Class)
            }
            TypeKind::Delegate => {
                return Err(internal_error!(
                    "Delegate '{}' classified as an implementation type",
                    handle.full_name()
                ))
            }
        })
    }

    /// Identity of a type: name-derived GUID unless one is declared, metadata, user flags.
    fn identity(&self, handle: &TypeHandle, primary: Marker) -> BaseDefinition {
        let declaration = handle.declaration();
        let mut base = self.type_base(handle);
        base.metadata = collect_metadata(&declaration.attributes);
        if let Some(marker) = find_marker(&declaration.attributes, primary) {
            base.user_flags = user_flags(marker);
        }
        if let Some(guid) = explicit_guid(&declaration.attributes) {
            base.guid = guid;
        }
        base
    }

    fn build_enum(&mut self, handle: &TypeHandle) -> Result<Option<EnumDefinition>> {
        let declaration = handle.declaration();
        let full_name = declaration.full_name();
        let module = &handle.module.name;

        let Some(underlying) = enum_underlying(declaration) else {
            self.reject(
                &Site::for_type(&full_name, module, declaration.token),
                ErrorKind::UnsupportedType,
                format!("Enum '{full_name}' has no integral underlying type"),
            );
            return Ok(None);
        };

        let mut flags = TypeFlags::empty();
        let flags_style = has_attribute(&declaration.attributes, CORE_TYPE::FLAGS_ATTRIBUTE);
        if flags_style {
            flags |= TypeFlags::FLAGS_ENUM;
        }

        let mut fields = Vec::new();
        let mut sequence_broken = false;
        for field in &declaration.fields {
            if !field.flags.contains(FieldAttributes::LITERAL) || !field.is_static() {
                continue;
            }
            let value = field.constant.as_ref().and_then(constant_value).unwrap_or_default();
            let expected = fields.len() as i128;
            if !flags_style && !sequence_broken && value != expected {
                sequence_broken = true;
                self.reject(
                    &Site::new(&full_name, &field.name, SymbolCategory::EnumField, module, field.token),
                    ErrorKind::EnumValueSequence,
                    format!(
                        "Enum member '{}' has value {value}, expected {expected}; \
                         values of non-flags enums must be sequential from zero",
                        field.name
                    ),
                );
            }
            fields.push(EnumField {
                name: field.name.clone(),
                value,
            });
        }

        Ok(Some(EnumDefinition {
            base: self.identity(handle, Marker::UEnum),
            underlying,
            fields,
            flags,
        }))
    }

    fn build_struct(&mut self, handle: &TypeHandle) -> Result<Option<StructDefinition>> {
        let declaration = handle.declaration();
        let full_name = declaration.full_name();
        let module = handle.module.name.clone();
        let base = self.identity(handle, Marker::UStruct);
        let literals = scan_initializers(&handle.module, declaration);

        let mut properties = Vec::new();
        for member in reflected_members(declaration, false) {
            let site = Site::new(&full_name, &member.name, SymbolCategory::Property, &module, member.token);
            if member.is_static {
                self.reject(
                    &site,
                    ErrorKind::StaticProperty,
                    format!("Static property '{}' cannot be reflected", member.name),
                );
                continue;
            }
            let Some(property) = self.map_member(handle, &base, &member, &literals, &site)? else {
                continue;
            };

            let mut offending = None;
            property.walk(&mut |node| {
                if offending.is_none() && node.type_class.requires_reference_owner() {
                    offending = Some(node.type_class);
                }
            });
            if let Some(type_class) = offending {
                self.reject(
                    &site,
                    ErrorKind::ReferenceMemberInValueType,
                    format!(
                        "'{}' holds a {type_class} value, which is only allowed on reference types",
                        member.name
                    ),
                );
                continue;
            }
            properties.push(property);
        }

        let layout = self.aggregate(&mut properties);
        self.layouts
            .insert(layout_key(&module, &full_name), layout);

        let mut flags = TypeFlags::empty();
        if properties.iter().any(|property| property.default_value.is_some()) {
            flags |= TypeFlags::HAS_DEFAULTS;
        }
        let fast_access = find_marker(&declaration.attributes, Marker::UStruct)
            .is_some_and(|marker| named_flag(marker, "FastAccess"));
        if fast_access {
            flags |= TypeFlags::FAST_ACCESS;
            if !layout.blittable {
                self.reject(
                    &Site::for_type(&full_name, &module, declaration.token),
                    ErrorKind::FastAccessNotBlittable,
                    format!("Fast-access struct '{full_name}' has non-blittable members"),
                );
            }
        }

        let dependencies = dependencies(&base.namespace, properties.iter(), std::iter::empty());
        Ok(Some(StructDefinition {
            base,
            properties,
            dependencies,
            flags,
            size: layout.layout.size,
            alignment: layout.layout.alignment,
            blittable: layout.blittable,
        }))
    }

    #[allow(clippy::too_many_lines)]
    fn build_class(&mut self, handle: &TypeHandle, kind: TypeKind) -> Result<Option<ClassDefinition>> {
        let declaration = handle.declaration();
        let full_name = declaration.full_name();
        let module = handle.module.clone();
        let interface = kind == TypeKind::Interface;
        let base = self.identity(
            handle,
            if interface { Marker::UInterface } else { Marker::UClass },
        );
        let type_site = Site::for_type(&full_name, &module.name, declaration.token);

        let mut flags = TypeFlags::empty();
        let mut super_type = None;
        if interface {
            flags |= TypeFlags::INTERFACE;
        } else {
            match self.classifier.super_type(handle)? {
                Some(ResolvedType::Declared(parent)) if is_reflected(&parent, TypeKind::Class) => {
                    super_type = Some(reference_info(&parent, ReferenceKind::Class, None));
                }
                other => self.reject(
                    &type_site,
                    ErrorKind::InvalidSuperType,
                    format!(
                        "'{full_name}' must derive from a reflected class, not '{}'",
                        other.map_or_else(|| CORE_TYPE::OBJECT.to_string(), |parent| parent.full_name())
                    ),
                ),
            }
            if self.classifier.derives_from(handle, WellKnown::Actor)? {
                flags |= TypeFlags::ACTOR;
            }
            if declaration.flags.contains(TypeAttributes::ABSTRACT) {
                flags |= TypeFlags::ABSTRACT;
            }
        }

        let library = !interface
            && (self.classifier.derives_from(handle, WellKnown::FunctionLibrary)?
                || find_marker(&declaration.attributes, Marker::UClass)
                    .is_some_and(|marker| named_flag(marker, "FunctionLibrary")));
        if library {
            flags |= TypeFlags::FUNCTION_LIBRARY;
        }

        let mut interfaces = Vec::new();
        for token in &declaration.interfaces {
            match self.resolver.resolve_token(&module, *token)? {
                ResolvedType::Declared(target) if is_reflected(&target, TypeKind::Interface) => {
                    interfaces.push(reference_info(&target, ReferenceKind::Interface, None));
                }
                other if interface => self.reject(
                    &type_site,
                    ErrorKind::InvalidInterfaceBase,
                    format!(
                        "Interface '{full_name}' inherits '{}', which is not a reflected interface",
                        other.full_name()
                    ),
                ),
                other => log::debug!(
                    "'{full_name}' implements non-reflected interface '{}'",
                    other.full_name()
                ),
            }
        }

        let methods = reflected_functions(declaration);
        let literals = scan_initializers(&module, declaration);
        let mut properties = Vec::new();
        for member in reflected_members(declaration, false) {
            let site = Site::new(&full_name, &member.name, SymbolCategory::Property, &module.name, member.token);
            if interface {
                self.reject(
                    &site,
                    ErrorKind::InterfaceProperty,
                    format!("Interface '{full_name}' cannot declare property '{}'", member.name),
                );
                continue;
            }
            if member.is_static {
                self.reject(
                    &site,
                    ErrorKind::StaticProperty,
                    format!("Static property '{}' cannot be reflected", member.name),
                );
                continue;
            }
            if let Some(callback) = member
                .marker()
                .and_then(|marker| marker.value.named("ReplicatedUsing"))
                .and_then(CustomAttributeArgument::as_str)
            {
                if !methods.iter().any(|method| method.name == callback) {
                    self.reject(
                        &site,
                        ErrorKind::MissingReplicationCallback,
                        format!(
                            "ReplicatedUsing callback '{callback}' of '{}' is not a UFunction of '{full_name}'",
                            member.name
                        ),
                    );
                }
            }
            if let Some(property) = self.map_member(handle, &base, &member, &literals, &site)? {
                properties.push(property);
            }
        }
        let layout = self.aggregate(&mut properties);

        let mut functions = Vec::new();
        let mut reported = HashSet::new();
        for method in &methods {
            let site = Site::new(&full_name, &method.name, SymbolCategory::Function, &module.name, method.token);
            let declarations: Vec<&&MethodDeclaration> =
                methods.iter().filter(|other| other.name == method.name).collect();
            if declarations.len() > 1 {
                if reported.insert(method.name.clone()) {
                    let mut error = BindingError::new(
                        ErrorKind::FunctionOverload,
                        format!(
                            "Function '{}' is declared {} times, overloads cannot be reflected",
                            method.name,
                            declarations.len()
                        ),
                        SymbolId::member(&full_name, &method.name, SymbolCategory::Function),
                    );
                    for other in declarations {
                        error = error.at(&module.name, other.token);
                    }
                    self.diagnostics.push(error);
                }
                continue;
            }
            if !method.generic_params.is_empty() || method.signature.param_count_generic > 0 {
                self.reject(
                    &site,
                    ErrorKind::GenericFunction,
                    format!("Generic function '{}' cannot be reflected", method.name),
                );
                continue;
            }
            if method.is_static() && !library {
                self.reject(
                    &site,
                    ErrorKind::StaticFunction,
                    format!(
                        "Static function '{}' is only allowed in a function library",
                        method.name
                    ),
                );
                continue;
            }
            if let Some(function) = self.build_function(handle, &base, method, &site)? {
                functions.push(function);
            }
        }

        if properties.iter().any(|property| property.default_value.is_some()) {
            flags |= TypeFlags::HAS_DEFAULTS;
        }

        let links: Vec<&TypeReferenceInfo> = super_type.iter().chain(interfaces.iter()).collect();
        let dependencies = dependencies(
            &base.namespace,
            properties
                .iter()
                .chain(functions.iter().flat_map(FunctionDefinition::properties)),
            links.into_iter(),
        );

        Ok(Some(ClassDefinition {
            structure: StructDefinition {
                base,
                properties,
                dependencies,
                flags,
                size: layout.layout.size,
                alignment: layout.layout.alignment,
                blittable: layout.blittable,
            },
            functions,
            super_type,
            interfaces,
        }))
    }

    fn map_member(
        &mut self,
        handle: &TypeHandle,
        owner: &BaseDefinition,
        member: &ReflectedMember,
        literals: &HashMap<String, Literal>,
        site: &Site,
    ) -> Result<Option<PropertyDefinition>> {
        let Some(mut property) = self.map_property(
            &handle.module,
            &member.signature,
            &member.name,
            owner,
            Slot::Property,
            site,
            0,
        )?
        else {
            return Ok(None);
        };

        property.flags |= property_access(member.access);
        if member.read_only {
            property.flags |= PropertyFlags::CONST;
        }
        property.base.metadata = collect_metadata(&member.attributes);
        if let Some(marker) = member.marker() {
            property.base.user_flags = user_flags(marker);
        }
        if property.base.metadata("ReplicatedUsing").is_some() {
            property.flags |= PropertyFlags::NET | PropertyFlags::REP_NOTIFY;
        } else if property.base.metadata("Replicated").is_some() {
            property.flags |= PropertyFlags::NET;
        }

        if let Some(literal) = literals.get(&member.storage) {
            if let Some(value) = default_value(self.resolver, &property, literal) {
                property.default_value = Some(value);
                property.flags |= PropertyFlags::HAS_DEFAULT;
            }
        }
        Ok(Some(property))
    }

    fn build_function(
        &mut self,
        handle: &TypeHandle,
        owner: &BaseDefinition,
        method: &MethodDeclaration,
        site: &Site,
    ) -> Result<Option<FunctionDefinition>> {
        let marker = find_marker(&method.attributes, Marker::UFunction);
        let mut flags = function_access(method.access());
        if method.is_static() {
            flags |= FunctionFlags::STATIC;
        }
        if method.flags.contains(MethodAttributes::VIRTUAL) && !method.flags.contains(MethodAttributes::FINAL) {
            flags |= FunctionFlags::VIRTUAL;
        }
        if marker.is_some_and(|marker| named_flag(marker, "BlueprintEvent")) {
            flags |= FunctionFlags::EVENT;
        }

        let mut base = BaseDefinition::for_member(&method.name, owner);
        base.metadata = collect_metadata(&method.attributes);
        base.user_flags = marker.map_or(0, user_flags);

        let owner_name = handle.full_name();
        let Some(mut function) =
            self.function_shape(&handle.module, method, base, flags, &owner_name, 0)?
        else {
            return Ok(None);
        };

        let overrides = method.flags.contains(MethodAttributes::VIRTUAL)
            && !method.flags.contains(MethodAttributes::NEW_SLOT);
        if overrides {
            if let Some((parent, index)) = self.find_base_function(handle, &method.name)? {
                let base_method = &parent.declaration().methods[index];
                let expected = self.signature_text(&parent.module, base_method)?;
                if expected != function.signature {
                    self.reject(
                        site,
                        ErrorKind::OverrideSignatureMismatch,
                        format!(
                            "'{}' overrides '{}.{}' as '{}', expected '{expected}'",
                            method.name,
                            parent.full_name(),
                            base_method.name,
                            function.signature
                        ),
                    );
                    return Ok(None);
                }
                function.flags |= FunctionFlags::OVERRIDDEN;
            }
        }
        Ok(Some(function))
    }

    /// The nearest reflected function named `name` in the super types of `handle`.
    fn find_base_function(&self, handle: &TypeHandle, name: &str) -> Result<Option<(TypeHandle, usize)>> {
        let mut current = handle.clone();
        for _ in 0..self.recursion_limit {
            let Some(ResolvedType::Declared(parent)) = self.classifier.super_type(&current)? else {
                return Ok(None);
            };
            if let Some(index) = parent.declaration().methods.iter().position(|method| {
                method.name == name
                    && !method.is_constructor()
                    && find_marker(&method.attributes, Marker::UFunction).is_some()
            }) {
                return Ok(Some((parent, index)));
            }
            current = parent;
        }
        Err(Error::RecursionLimit(self.recursion_limit))
    }
}

fn is_reflected(handle: &TypeHandle, kind: TypeKind) -> bool {
    let role = role_of(&handle.module, handle.declaration());
    role.is_reflected() && role.kind() == kind
}

fn constant_value(constant: &ConstantValue) -> Option<i128> {
    match constant {
        ConstantValue::Integer(value) => Some(i128::from(*value)),
        ConstantValue::Unsigned(value) => Some(i128::from(*value)),
        other => other.as_i64().map(i128::from),
    }
}

/// Explicit identifier of a `Guid("...")` attribute.
fn explicit_guid(attributes: &[AttributeDeclaration]) -> Option<Guid> {
    let attribute = attributes.iter().find(|attribute| {
        let name = attribute.simple_name();
        name == CORE_TYPE::GUID_ATTRIBUTE || name.strip_suffix("Attribute") == Some(CORE_TYPE::GUID_ATTRIBUTE)
    })?;
    let text = attribute.value.fixed_args.first()?.as_str()?;
    match Guid::try_parse(text) {
        Ok(guid) => Some(guid),
        Err(_) => {
            log::warn!("Ignoring malformed Guid attribute value '{text}'");
            None
        }
    }
}

/// Namespaces referenced by `properties` and `links`, other than `own`.
fn dependencies<'p, P, L>(own: &str, properties: P, links: L) -> BTreeSet<String>
where
    P: Iterator<Item = &'p PropertyDefinition>,
    L: Iterator<Item = &'p TypeReferenceInfo>,
{
    let mut visited = HashSet::new();
    let mut namespaces = BTreeSet::new();
    let mut add = |reference: &TypeReferenceInfo, namespaces: &mut BTreeSet<String>| {
        if visited.insert(reference.full_name())
            && reference.namespace != own
            && !reference.namespace.is_empty()
        {
            namespaces.insert(reference.namespace.clone());
        }
    };

    for link in links {
        add(link, &mut namespaces);
    }
    let mut stack: Vec<&PropertyDefinition> = properties.collect();
    while let Some(property) = stack.pop() {
        if let Some(reference) = &property.reference {
            add(reference, &mut namespaces);
        }
        stack.extend(property.inner.iter());
        if let Some(signature) = &property.signature {
            stack.extend(signature.properties());
        }
    }
    namespaces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bindings::ErrorKind,
        metadata::{
            builder::{Attribute, Field, Method, ModuleBuilder, Param, Property, Ty, TypeDef},
            customattributes::CustomAttributeArgument,
            module::LoadedModule,
        },
        model::{DefaultValue, TypeCategory, TypeClass},
        test::factories::{
            engine, engine_generic, engine_module, marker, sample_document, ufunction, uproperty,
        },
    };

    fn build_errors(game: ModuleBuilder) -> crate::bindings::BindingErrors {
        let resolver = ModuleResolver::new();
        resolver.insert(engine_module());
        let game = resolver.insert(LoadedModule::from_mem(game.build().unwrap()).unwrap());
        let classification = Classifier::new(&resolver).classify(&[game]).unwrap();
        match ModelFactory::new(&resolver).build(&classification) {
            Err(Error::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    fn actor(name: &str) -> TypeDef {
        TypeDef::class("Game", name)
            .extends(engine("AActor"))
            .attribute(marker("UClass"))
    }

    #[test]
    fn sample_order() {
        let document = sample_document();
        let names: Vec<&str> = document.iter().map(TypeDefinition::name).collect();
        assert_eq!(
            names,
            [
                "WeaponMode",
                "DamageFlags",
                "DamageInfo",
                "HitCounter",
                "Interactable",
                "MyActor",
                "DamageLibrary"
            ]
        );
        assert!(document.iter().all(|definition| definition.base().checksum.is_some()));
    }

    #[test]
    fn sample_actor() {
        let document = sample_document();
        let Some(TypeDefinition::Class(actor)) = document.get("MyActor") else {
            panic!("MyActor missing");
        };
        let flags = actor.structure.flags;
        assert!(flags.contains(TypeFlags::ACTOR | TypeFlags::HAS_DEFAULTS));
        assert_eq!(actor.super_type.as_ref().unwrap().native_name, "AActor");
        assert_eq!(actor.interfaces[0].native_name, "IInteractable");
        assert_eq!(actor.structure.base.metadata("DisplayName"), Some("My Actor"));
        assert!(actor.structure.dependencies.contains("Engine"));
        assert!(actor.structure.dependencies.contains("Game"));

        let health = &actor.structure.properties[0];
        assert_eq!(health.type_class, TypeClass::Float);
        assert!(health.flags.contains(PropertyFlags::NET | PropertyFlags::REP_NOTIFY));
        assert_eq!(health.default_value, Some(DefaultValue::Float(100.0)));

        let mode = &actor.structure.properties[1];
        assert_eq!(mode.type_class, TypeClass::Enum);
        assert_eq!(mode.size, 1);
        assert_eq!(
            mode.default_value,
            Some(DefaultValue::EnumMember {
                enum_name: "EWeaponMode".to_string(),
                member: "Burst".to_string()
            })
        );

        let target = actor.structure.properties.iter().find(|p| p.name() == "Target").unwrap();
        assert!(target.flags.contains(PropertyFlags::PROTECTED));
        assert_eq!(target.type_class, TypeClass::Object);

        let projectile = actor
            .structure
            .properties
            .iter()
            .find(|p| p.name() == "ProjectileClass")
            .unwrap();
        assert_eq!(projectile.type_class, TypeClass::Class);
        assert_eq!(projectile.type_name, "TSubclassOf<AActor>");

        let on_hit = actor.structure.properties.iter().find(|p| p.name() == "OnHit").unwrap();
        assert_eq!(on_hit.type_class, TypeClass::MulticastDelegate);
        let signature = on_hit.signature.as_ref().unwrap();
        assert_eq!(signature.name(), "OnHit__DelegateSignature");
        assert_eq!(signature.base.path, "/Script/Game.MyActor:OnHit__DelegateSignature");
        assert_eq!(signature.parameters.len(), 2);
        assert!(signature.flags.contains(FunctionFlags::DELEGATE));

        let label = actor.structure.properties.last().unwrap();
        assert_eq!(label.name(), "Label");
        assert_eq!(label.default_value, Some(DefaultValue::String("Hero".to_string())));

        let fire = actor.function("Fire").unwrap();
        assert_eq!(fire.signature, "bool(float,out int)");
        assert!(fire.flags.contains(FunctionFlags::HAS_OUT_PARAMS));
        assert!(fire.parameters[1].is_out());
        assert!(fire.return_value.as_ref().unwrap().is_return());
        assert_eq!(fire.params_size, 12);

        let tick = actor.function("ReceiveTick").unwrap();
        assert!(tick.flags.contains(FunctionFlags::OVERRIDDEN));
        assert!(!actor.function("Interact").unwrap().flags.contains(FunctionFlags::OVERRIDDEN));
        assert!(actor.function("Reset").unwrap().is_empty());
    }

    #[test]
    fn sample_structs_and_enums() {
        let document = sample_document();

        let Some(TypeDefinition::Struct(info)) = document.get("DamageInfo") else {
            panic!("DamageInfo missing");
        };
        assert_eq!(info.size, 32);
        assert_eq!(info.alignment, 8);
        assert!(!info.blittable);
        assert_eq!(info.properties[2].offset, 24);

        let Some(TypeDefinition::Struct(counter)) = document.get("HitCounter") else {
            panic!("HitCounter missing");
        };
        assert!(counter.flags.contains(TypeFlags::FAST_ACCESS));
        assert!(counter.blittable);

        let Some(TypeDefinition::Enum(flags)) = document.get("DamageFlags") else {
            panic!("DamageFlags missing");
        };
        assert!(flags.flags.contains(TypeFlags::FLAGS_ENUM));
        assert_eq!(flags.member_name(4), Some("Poison"));

        let library = document.get("DamageLibrary").unwrap();
        assert_eq!(library.category(), TypeCategory::Classes);
    }

    #[test]
    fn unsigned_enum_keeps_high_values() {
        let mut game = ModuleBuilder::new("Game");
        game.add_type(
            TypeDef::enumeration("Game", "EMask", Ty::U8)
                .attribute(marker("UEnum"))
                .attribute(Attribute::new("System.FlagsAttribute"))
                .variant("None", 0)
                .variant("Low", 1)
                .variant("High", i64::MIN),
        );

        let document = build_document(game).unwrap();
        let Some(TypeDefinition::Enum(mask)) = document.get("Mask") else {
            panic!("Mask missing");
        };
        assert_eq!(mask.underlying, TypeClass::UInt64);
        assert_eq!(mask.fields[2].value, 1_i128 << 63);
        assert_eq!(mask.member_name(1 << 63), Some("High"));
    }

    #[test]
    fn enum_sequence() {
        let mut game = ModuleBuilder::new("Game");
        game.add_type(
            TypeDef::enumeration("Game", "EGood", Ty::I4)
                .attribute(marker("UEnum"))
                .variant("A", 0)
                .variant("B", 1)
                .variant("C", 2)
                .variant("D", 3),
        )
        .add_type(
            TypeDef::enumeration("Game", "EGap", Ty::I4)
                .attribute(marker("UEnum"))
                .variant("A", 0)
                .variant("B", 1)
                .variant("C", 3),
        );
        let errors = build_errors(game);
        assert_eq!(errors.len(), 1);
        let error = errors.iter().next().unwrap();
        assert_eq!(error.kind, ErrorKind::EnumValueSequence);
        assert_eq!(error.symbol.owner, "Game.EGap");
        assert_eq!(error.symbol.member.as_deref(), Some("C"));
    }

    #[test]
    fn member_rules() {
        let mut game = ModuleBuilder::new("Game");
        game.add_type(
            actor("ABroken")
                .field(Field::new("Count", Ty::I4).public().static_().attribute(uproperty()))
                .field(
                    Field::new("Callback", engine_generic("TDelegate`1", vec![Ty::class("Game.FOnPing")]))
                        .public()
                        .attribute(uproperty()),
                )
                .field(
                    Field::new("Health", Ty::R4).public().attribute(uproperty().named(
                        "ReplicatedUsing",
                        CustomAttributeArgument::String("OnRep_Missing".to_string()),
                    )),
                )
                .method(Method::new("Fire", Ty::Void).attribute(ufunction()))
                .method(
                    Method::new("Fire", Ty::Void)
                        .param(Param::new("power", Ty::R4))
                        .attribute(ufunction()),
                )
                .method(Method::new("Spawn", Ty::Void).static_().attribute(ufunction()))
                .method(
                    Method::new("Pick", Ty::Void)
                        .generic_param("T")
                        .attribute(ufunction()),
                ),
        )
        .add_type(TypeDef::delegate("Game", "FOnPing", Ty::Void, Vec::new()));

        let errors = build_errors(game);
        for kind in [
            ErrorKind::StaticProperty,
            ErrorKind::SingleCastDelegateProperty,
            ErrorKind::MissingReplicationCallback,
            ErrorKind::FunctionOverload,
            ErrorKind::StaticFunction,
            ErrorKind::GenericFunction,
        ] {
            assert!(errors.contains(kind), "missing {kind}");
        }
        let overload = errors
            .iter()
            .find(|error| error.kind == ErrorKind::FunctionOverload)
            .unwrap();
        assert_eq!(overload.locations.len(), 2);
        assert_eq!(errors.len(), 6);
    }

    #[test]
    fn raw_class_in_function_signature() {
        let mut game = ModuleBuilder::new("Game");
        game.add_type(
            actor("ASpawner")
                .method(
                    Method::new("SpawnOf", Ty::Void)
                        .param(Param::new("kind", engine("UClass")))
                        .attribute(ufunction()),
                )
                .method(Method::new("KindOf", engine("UClass")).attribute(ufunction())),
        );

        let errors = build_errors(game);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|error| error.kind == ErrorKind::RawClassPointer));
        let members: Vec<_> = errors
            .iter()
            .map(|error| error.symbol.member.as_deref())
            .collect();
        assert!(members.contains(&Some("SpawnOf.kind")));
        assert!(members.contains(&Some("KindOf.ReturnValue")));
    }

    #[test]
    fn nullable_in_function_signature() {
        let mut game = ModuleBuilder::new("Game");
        game.add_type(
            actor("AScorer").method(
                Method::new("Score", Ty::generic_value("System.Nullable`1", vec![Ty::I4]))
                    .param(Param::new("bonus", Ty::generic_value("System.Nullable`1", vec![Ty::R4])))
                    .attribute(ufunction()),
            ),
        );

        let errors = build_errors(game);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|error| error.kind == ErrorKind::NullableValueType));
    }

    #[test]
    fn value_type_rules() {
        let mut game = ModuleBuilder::new("Game");
        game.add_type(
            TypeDef::structure("Game", "FHandle")
                .attribute(marker("UStruct"))
                .field(
                    Field::new("Soft", engine_generic("TSoftObjectPtr`1", vec![engine("UObject")]))
                        .public()
                        .attribute(uproperty()),
                )
                .field(
                    Field::new(
                        "Nested",
                        engine_generic(
                            "TArray`1",
                            vec![Ty::generic_value("[Engine]Engine.TSoftClassPtr`1", vec![engine("UObject")])],
                        ),
                    )
                    .public()
                    .attribute(uproperty()),
                ),
        )
        .add_type(
            TypeDef::structure("Game", "FFast")
                .attribute(marker("UStruct").named("FastAccess", CustomAttributeArgument::Bool(true)))
                .field(Field::new("Label", Ty::String).public().attribute(uproperty())),
        );

        let errors = build_errors(game);
        let value_type_errors = errors
            .iter()
            .filter(|error| error.kind == ErrorKind::ReferenceMemberInValueType)
            .count();
        assert_eq!(value_type_errors, 2);
        assert!(errors.contains(ErrorKind::FastAccessNotBlittable));
    }

    #[test]
    fn type_rules() {
        let mut game = ModuleBuilder::new("Game");
        game.add_type(
            TypeDef::class("Game", "UOrphan").attribute(marker("UClass")),
        )
        .add_type(
            TypeDef::interface("Game", "IPlain"),
        )
        .add_type(
            TypeDef::interface("Game", "IDerived")
                .implements(Ty::class("Game.IPlain"))
                .attribute(marker("UInterface"))
                .property(Property::new("Count", Ty::I4).attribute(uproperty())),
        )
        .add_type(
            actor("AMismatch").method(
                Method::new("ReceiveTick", Ty::Void)
                    .param(Param::new("deltaSeconds", Ty::R8))
                    .override_()
                    .attribute(ufunction()),
            ),
        );

        let errors = build_errors(game);
        assert!(errors.contains(ErrorKind::InvalidSuperType));
        assert!(errors.contains(ErrorKind::InvalidInterfaceBase));
        assert!(errors.contains(ErrorKind::InterfaceProperty));
        assert!(errors.contains(ErrorKind::OverrideSignatureMismatch));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn struct_dependency_order() {
        let mut game = ModuleBuilder::new("Game");
        game.add_type(
            TypeDef::structure("Game", "FOuter")
                .attribute(marker("UStruct"))
                .field(
                    Field::new("Inner", Ty::value("Game.FInner"))
                        .public()
                        .attribute(uproperty()),
                ),
        )
        .add_type(
            TypeDef::structure("Game", "FInner")
                .attribute(marker("UStruct"))
                .field(Field::new("Value", Ty::I8).public().attribute(uproperty())),
        );

        let resolver = ModuleResolver::new();
        resolver.insert(engine_module());
        let game = resolver.insert(LoadedModule::from_mem(game.build().unwrap()).unwrap());
        let classification = Classifier::new(&resolver).classify(&[game]).unwrap();
        let document = ModelFactory::new(&resolver).build(&classification).unwrap();

        let names: Vec<&str> = document.iter().map(TypeDefinition::name).collect();
        assert_eq!(names, ["Inner", "Outer"]);
        let outer = document.find_struct("Game", "FOuter").unwrap();
        assert_eq!(outer.size, 8);
        assert!(outer.blittable);
    }

    fn build_document(game: ModuleBuilder) -> Result<TypeDefinitionDocument> {
        let resolver = ModuleResolver::new();
        resolver.insert(engine_module());
        let game = resolver.insert(LoadedModule::from_mem(game.build().unwrap()).unwrap());
        let classification = Classifier::new(&resolver).classify(&[game]).unwrap();
        ModelFactory::new(&resolver).build(&classification)
    }

    #[test]
    fn self_referential_container() {
        let mut game = ModuleBuilder::new("Game");
        game.add_type(
            TypeDef::structure("Game", "FNode")
                .attribute(marker("UStruct"))
                .field(Field::new("Value", Ty::I4).public().attribute(uproperty()))
                .field(
                    Field::new("Children", engine_generic("TArray`1", vec![Ty::value("Game.FNode")]))
                        .public()
                        .attribute(uproperty()),
                ),
        );

        let document = build_document(game).unwrap();
        let node = document.find_struct("Game", "FNode").unwrap();
        assert_eq!(node.size, 24);
        let children = &node.properties[1];
        assert_eq!(children.offset, 8);
        assert_eq!(children.inner[0].type_class, TypeClass::Struct);
        assert_eq!(children.inner[0].size, 24);
        assert_eq!(children.inner[0].alignment, 8);
    }

    #[test]
    fn container_cycle_through_value_member() {
        let mut game = ModuleBuilder::new("Game");
        game.add_type(
            TypeDef::structure("Game", "FTree")
                .attribute(marker("UStruct"))
                .field(
                    Field::new("Branches", engine_generic("TArray`1", vec![Ty::value("Game.FBranch")]))
                        .public()
                        .attribute(uproperty()),
                ),
        )
        .add_type(
            TypeDef::structure("Game", "FBranch")
                .attribute(marker("UStruct"))
                .field(Field::new("Weight", Ty::R4).public().attribute(uproperty()))
                .field(Field::new("Subtree", Ty::value("Game.FTree")).public().attribute(uproperty())),
        );

        let document = build_document(game).unwrap();
        let tree = document.find_struct("Game", "FTree").unwrap();
        let branch = document.find_struct("Game", "FBranch").unwrap();
        assert_eq!(tree.size, 16);
        assert_eq!(branch.size, 24);
        assert_eq!(tree.properties[0].inner[0].size, 24);
    }

    #[test]
    fn struct_containing_itself_by_value() {
        let mut game = ModuleBuilder::new("Game");
        game.add_type(
            TypeDef::structure("Game", "FLoop")
                .attribute(marker("UStruct"))
                .field(Field::new("Next", Ty::value("Game.FLoop")).public().attribute(uproperty())),
        );

        assert!(matches!(build_document(game), Err(Error::Malformed { .. })));
    }

    #[test]
    fn explicit_guid_attribute() {
        let mut game = ModuleBuilder::new("Game");
        game.add_type(
            TypeDef::structure("Game", "FTagged")
                .attribute(marker("UStruct"))
                .attribute(
                    Attribute::new("System.Runtime.InteropServices.GuidAttribute")
                        .arg_str("01234567-89ab-cdef-0123-456789abcdef"),
                ),
        );
        let resolver = ModuleResolver::new();
        resolver.insert(engine_module());
        let game = resolver.insert(LoadedModule::from_mem(game.build().unwrap()).unwrap());
        let classification = Classifier::new(&resolver).classify(&[game]).unwrap();
        let document = ModelFactory::new(&resolver).build(&classification).unwrap();

        let tagged = document.get("Tagged").unwrap();
        assert_eq!(
            tagged.base().guid.to_string(),
            "01234567-89ab-cdef-0123-456789abcdef"
        );
    }
}

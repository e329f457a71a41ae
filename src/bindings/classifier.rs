//! Classification of declared types.

use std::{collections::HashMap, sync::Arc};

use strum::Display;

use crate::{
    bindings::{
        diagnostics::{BindingError, Diagnostics, ErrorKind, SymbolId},
        markers::{markers, Marker},
        wellknown::{WellKnown, CORE_TYPE},
    },
    loader::{ModuleResolver, ResolvedType, TypeHandle},
    metadata::module::{LoadedModule, TypeDeclaration},
    model::names::display_name,
    Error, Result,
};

/// Maximum length of a super-type chain.
const MAX_INHERITANCE_DEPTH: usize = 64;

/// Shape of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TypeKind {
    /// Reference type
    Class,
    /// Value type
    Struct,
    /// Enumeration
    Enum,
    /// Interface
    Interface,
    /// Delegate type
    Delegate,
}

/// Membership of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeRole {
    /// Carries a primary marker and becomes a model entity
    Implementation(TypeKind),
    /// Carries a placeholder marker, consulted but not emitted
    Placeholder(TypeKind),
    /// Neither
    Irrelevant(TypeKind),
}

impl TypeRole {
    /// Shape of the declaration.
    #[must_use]
    pub fn kind(&self) -> TypeKind {
        match self {
            TypeRole::Implementation(kind) | TypeRole::Placeholder(kind) | TypeRole::Irrelevant(kind) => {
                *kind
            }
        }
    }

    /// Returns `true` for implementation and placeholder types.
    #[must_use]
    pub fn is_reflected(&self) -> bool {
        !matches!(self, TypeRole::Irrelevant(_))
    }
}

/// An implementation type accepted by the classifier.
#[derive(Debug, Clone)]
pub struct ClassifiedType {
    /// The declaration
    pub handle: TypeHandle,
    /// Its shape
    pub kind: TypeKind,
}

/// Outcome of classifying a set of modules.
#[derive(Debug, Default)]
pub struct Classification {
    /// Implementation types in module and declaration order
    pub implementations: Vec<ClassifiedType>,
    /// Placeholder types of the classified modules
    pub placeholders: Vec<TypeHandle>,
}

/// Shape of `declaration` from its flags and base type.
#[must_use]
pub fn structural_kind(module: &LoadedModule, declaration: &TypeDeclaration) -> TypeKind {
    if declaration.is_interface() {
        return TypeKind::Interface;
    }

    match module.full_name(declaration.extends).as_deref() {
        Some(CORE_TYPE::ENUM) => TypeKind::Enum,
        Some(CORE_TYPE::VALUE_TYPE) => TypeKind::Struct,
        Some(CORE_TYPE::MULTICAST_DELEGATE | CORE_TYPE::DELEGATE) => TypeKind::Delegate,
        _ => TypeKind::Class,
    }
}

/// Role of `declaration` from its markers, ignoring conflicts.
#[must_use]
pub fn role_of(module: &LoadedModule, declaration: &TypeDeclaration) -> TypeRole {
    let kind = structural_kind(module, declaration);
    let present = markers(&declaration.attributes);
    if present.iter().any(Marker::is_primary) {
        TypeRole::Implementation(kind)
    } else if present.iter().any(Marker::is_placeholder) {
        TypeRole::Placeholder(kind)
    } else {
        TypeRole::Irrelevant(kind)
    }
}

/// Decides membership of declared types and validates type-level binding rules.
pub struct Classifier<'a> {
    resolver: &'a ModuleResolver,
}

impl<'a> Classifier<'a> {
    /// Create a classifier resolving base types through `resolver`.
    #[must_use]
    pub fn new(resolver: &'a ModuleResolver) -> Self {
        Classifier { resolver }
    }

    /// Role of the type behind `handle`.
    #[must_use]
    pub fn role(&self, handle: &TypeHandle) -> TypeRole {
        role_of(&handle.module, handle.declaration())
    }

    /// Resolved super type of `handle`, `None` for interfaces and roots.
    ///
    /// # Errors
    /// Returns an error if the base type reference cannot be resolved.
    pub fn super_type(&self, handle: &TypeHandle) -> Result<Option<ResolvedType>> {
        let extends = handle.declaration().extends;
        if extends.is_null() {
            return Ok(None);
        }
        Ok(Some(self.resolver.resolve_token(&handle.module, extends)?))
    }

    /// Returns `true` if `handle` is, or derives from, the well-known type `root`.
    ///
    /// # Errors
    /// Returns an error if a base type reference cannot be resolved or the chain is too deep.
    pub fn derives_from(&self, handle: &TypeHandle, root: WellKnown) -> Result<bool> {
        let root_name = root.to_string();
        let mut current = handle.clone();
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if current.declaration().name == root_name {
                return Ok(true);
            }
            match self.super_type(&current)? {
                Some(ResolvedType::Declared(next)) => current = next,
                _ => return Ok(false),
            }
        }
        Err(Error::RecursionLimit(MAX_INHERITANCE_DEPTH))
    }

    /// Classify every declared type of `modules`.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] with every type-level rule violation, or a load error if a
    /// base type cannot be resolved.
    pub fn classify(&self, modules: &[Arc<LoadedModule>]) -> Result<Classification> {
        let diagnostics = Diagnostics::new();
        let mut classification = Classification::default();

        for module in modules {
            for index in 0..module.types.len() {
                let handle = TypeHandle {
                    module: module.clone(),
                    index,
                };
                match self.role(&handle) {
                    TypeRole::Implementation(kind) => {
                        if self.validate(&handle, kind, &diagnostics)? {
                            classification
                                .implementations
                                .push(ClassifiedType { handle, kind });
                        }
                    }
                    TypeRole::Placeholder(_) => classification.placeholders.push(handle),
                    TypeRole::Irrelevant(_) => {}
                }
            }
        }

        let mut seen: HashMap<String, &ClassifiedType> = HashMap::new();
        for classified in &classification.implementations {
            let declaration = classified.handle.declaration();
            let name = display_name(&declaration.name);
            if let Some(previous) = seen.get(&name) {
                let other = previous.handle.declaration();
                diagnostics.push(
                    BindingError::new(
                        ErrorKind::NameCollision,
                        format!(
                            "'{}' and '{}' both produce the name '{}'",
                            other.full_name(),
                            declaration.full_name(),
                            name
                        ),
                        SymbolId::type_(&declaration.full_name()),
                    )
                    .at(&previous.handle.module.name, other.token)
                    .at(&classified.handle.module.name, declaration.token),
                );
            } else {
                seen.insert(name, classified);
            }
        }

        log::debug!(
            "Classified {} implementation and {} placeholder types",
            classification.implementations.len(),
            classification.placeholders.len()
        );
        diagnostics
            .into_result(classification)
            .map_err(Error::Validation)
    }

    /// Validate an implementation type, returning `false` if it must not become an entity.
    fn validate(&self, handle: &TypeHandle, kind: TypeKind, diagnostics: &Diagnostics) -> Result<bool> {
        let declaration = handle.declaration();
        let module = &handle.module.name;
        let full_name = declaration.full_name();
        let error = |error_kind: ErrorKind, message: String| {
            BindingError::new(error_kind, message, SymbolId::type_(&full_name))
                .at(module, declaration.token)
        };

        let present = markers(&declaration.attributes);
        let primaries: Vec<Marker> = present.iter().copied().filter(Marker::is_primary).collect();
        if present.iter().any(Marker::is_placeholder) || primaries.iter().any(|m| *m != primaries[0]) {
            diagnostics.push(error(
                ErrorKind::ConflictingMarkers,
                format!("'{full_name}' carries conflicting binding markers"),
            ));
            return Ok(false);
        }

        let expected = match primaries[0] {
            Marker::UEnum => TypeKind::Enum,
            Marker::UStruct => TypeKind::Struct,
            Marker::UInterface => TypeKind::Interface,
            _ => TypeKind::Class,
        };
        if expected != kind {
            diagnostics.push(error(
                ErrorKind::MarkerMismatch,
                format!("'{full_name}' is a {kind} but is marked {}", primaries[0]),
            ));
            return Ok(false);
        }

        if declaration.is_generic() {
            diagnostics.push(error(
                ErrorKind::GenericType,
                format!("Generic type '{full_name}' cannot be reflected"),
            ));
            return Ok(false);
        }

        let name = &declaration.name;
        let (prefix, rule) = match kind {
            TypeKind::Enum => ('E', ErrorKind::InvalidEnumName),
            TypeKind::Struct => ('F', ErrorKind::InvalidStructName),
            TypeKind::Interface => ('I', ErrorKind::InvalidInterfaceName),
            _ if self.derives_from(handle, WellKnown::Actor)? => ('A', ErrorKind::InvalidActorName),
            _ => ('U', ErrorKind::InvalidClassName),
        };
        if !name.starts_with(prefix) || display_name(name) == *name {
            diagnostics.push(error(
                rule,
                format!("'{name}' must start with '{prefix}' followed by an upper-case letter"),
            ));
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bindings::diagnostics::ErrorKind,
        metadata::builder::{Attribute, ModuleBuilder, TypeDef, Ty},
        test::factories::{engine_module, sample_module},
    };

    fn resolver_with(game: ModuleBuilder) -> (ModuleResolver, Arc<LoadedModule>) {
        let resolver = ModuleResolver::new();
        resolver.insert(engine_module());
        let game = resolver.insert(LoadedModule::from_mem(game.build().unwrap()).unwrap());
        (resolver, game)
    }

    #[test]
    fn sample_classification() {
        let resolver = ModuleResolver::new();
        resolver.insert(engine_module());
        let game = resolver.insert(sample_module());

        let classification = Classifier::new(&resolver).classify(&[game]).unwrap();
        let names: Vec<String> = classification
            .implementations
            .iter()
            .map(|classified| classified.handle.declaration().name.clone())
            .collect();
        assert!(names.contains(&"AMyActor".to_string()));
        assert!(names.contains(&"EWeaponMode".to_string()));

        let actor = classification
            .implementations
            .iter()
            .find(|classified| classified.handle.declaration().name == "AMyActor")
            .unwrap();
        assert_eq!(actor.kind, TypeKind::Class);
    }

    #[test]
    fn collision() {
        let mut game = ModuleBuilder::new("Game");
        game.add_type(
            TypeDef::class("Game", "UFoo")
                .extends_class("[Engine]Engine.UObject")
                .attribute(Attribute::new("[Engine]Engine.UClassAttribute")),
        )
        .add_type(
            TypeDef::class("Game.Other", "UFoo")
                .extends_class("[Engine]Engine.UObject")
                .attribute(Attribute::new("[Engine]Engine.UClassAttribute")),
        );
        let (resolver, game) = resolver_with(game);

        let Err(Error::Validation(errors)) = Classifier::new(&resolver).classify(&[game]) else {
            panic!("expected a validation error");
        };
        assert_eq!(errors.len(), 1);
        let error = errors.iter().next().unwrap();
        assert_eq!(error.kind, ErrorKind::NameCollision);
        assert_eq!(error.locations.len(), 2);
    }

    #[test]
    fn naming_and_markers() {
        let mut game = ModuleBuilder::new("Game");
        game.add_type(
            TypeDef::enumeration("Game", "Mode", Ty::U1)
                .attribute(Attribute::new("[Engine]Engine.UEnumAttribute"))
                .variant("A", 0),
        )
        .add_type(
            TypeDef::class("Game", "UPawnThing")
                .extends_class("[Engine]Engine.AActor")
                .attribute(Attribute::new("[Engine]Engine.UClassAttribute")),
        )
        .add_type(
            TypeDef::structure("Game", "FWrong").attribute(Attribute::new("[Engine]Engine.UClassAttribute")),
        )
        .add_type(
            TypeDef::class("Game", "UBoth")
                .extends_class("[Engine]Engine.UObject")
                .attribute(Attribute::new("[Engine]Engine.UClassAttribute"))
                .attribute(Attribute::new("[Engine]Engine.NativeBindingAttribute")),
        )
        .add_type(
            TypeDef::class("Game", "UBox")
                .generic_param("T")
                .extends_class("[Engine]Engine.UObject")
                .attribute(Attribute::new("[Engine]Engine.UClassAttribute")),
        );
        let (resolver, game) = resolver_with(game);

        let Err(Error::Validation(errors)) = Classifier::new(&resolver).classify(&[game]) else {
            panic!("expected a validation error");
        };
        assert!(errors.contains(ErrorKind::InvalidEnumName));
        assert!(errors.contains(ErrorKind::InvalidActorName));
        assert!(errors.contains(ErrorKind::MarkerMismatch));
        assert!(errors.contains(ErrorKind::ConflictingMarkers));
        assert!(errors.contains(ErrorKind::GenericType));
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn engine_types_are_placeholders() {
        let resolver = ModuleResolver::new();
        let engine = resolver.insert(engine_module());
        let classification = Classifier::new(&resolver).classify(&[engine]).unwrap();
        assert!(classification.implementations.is_empty());
        assert!(!classification.placeholders.is_empty());
    }
}

//! Binding context of one generation run.
//!
//! [`BindingContext`] bundles everything the exporters read: the finished
//! [`TypeDefinitionDocument`], the output root, the active [`BindingSchema`], the processor
//! registry and the fast-invoke set. It is assembled once with the `with_*` builders and only
//! read afterwards, so the exporters can share it across threads.
//!
//! # Usage Examples
//!
//! ```rust
//! use bindweaver::context::{BindingContext, BindingSchema};
//! use bindweaver::model::TypeDefinitionDocument;
//!
//! let context = BindingContext::new(TypeDefinitionDocument::default(), "Generated")
//!     .with_schema(BindingSchema::Managed)
//!     .with_fast_invoke(["/Script/Game.MyActor:Reset"]);
//! assert!(context.schema().companion_interfaces());
//! assert_eq!(context.projects().count(), 0);
//! ```

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use strum::{Display, EnumIter, EnumString};

use crate::{
    model::{
        FunctionDefinition, FunctionFlags, PropertyDefinition, PropertyFlags, TypeDefinition,
        TypeDefinitionDocument, TypeReferenceInfo,
    },
    processors::{ProcessorRegistry, PropertyProcessor},
    Result,
};

/// Default suffix of emitted files.
pub const GENERATED_SUFFIX: &str = ".generated.cs";

/// Binding flavor of the emitted sources.
///
/// Schemas change accessibility and companion types only; the model is the same for all.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum BindingSchema {
    /// Bindings for native engine types, members keep their declared accessibility
    #[default]
    Native,
    /// Bindings exposed to visual scripting, every member is public
    Blueprint,
    /// Bindings for types implemented on the managed side, interfaces get a companion
    Managed,
}

impl BindingSchema {
    /// Managed accessibility keyword of a property with `flags`.
    #[must_use]
    pub fn property_visibility(self, flags: PropertyFlags) -> &'static str {
        self.visibility(
            flags.contains(PropertyFlags::PUBLIC),
            flags.contains(PropertyFlags::PROTECTED),
        )
    }

    /// Managed accessibility keyword of a function with `flags`.
    #[must_use]
    pub fn function_visibility(self, flags: FunctionFlags) -> &'static str {
        self.visibility(
            flags.contains(FunctionFlags::PUBLIC),
            flags.contains(FunctionFlags::PROTECTED),
        )
    }

    fn visibility(self, public: bool, protected: bool) -> &'static str {
        if self == BindingSchema::Blueprint || public {
            "public"
        } else if protected {
            "protected"
        } else {
            "private"
        }
    }

    /// Returns `true` if interfaces get an implementable companion interface.
    #[must_use]
    pub fn companion_interfaces(self) -> bool {
        self == BindingSchema::Managed
    }

    /// Name of the attribute tagging every emitted type.
    #[must_use]
    pub fn attribute(self) -> &'static str {
        match self {
            BindingSchema::Native => "NativeBinding",
            BindingSchema::Blueprint => "BlueprintBinding",
            BindingSchema::Managed => "ManagedBinding",
        }
    }
}

/// Read-only aggregate shared by all exporters of a run.
#[derive(Debug)]
pub struct BindingContext {
    document: TypeDefinitionDocument,
    output_root: PathBuf,
    schema: BindingSchema,
    registry: ProcessorRegistry,
    fast_invoke: BTreeSet<String>,
    suffix: String,
    projects: BTreeMap<String, Vec<usize>>,
}

impl BindingContext {
    /// Context over `document` writing below `output_root`, with the built-in processors.
    #[must_use]
    pub fn new(document: TypeDefinitionDocument, output_root: impl Into<PathBuf>) -> Self {
        let mut projects: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (index, definition) in document.iter().enumerate() {
            projects
                .entry(definition.base().project.clone())
                .or_default()
                .push(index);
        }

        BindingContext {
            document,
            output_root: output_root.into(),
            schema: BindingSchema::default(),
            registry: ProcessorRegistry::with_builtins(),
            fast_invoke: BTreeSet::new(),
            suffix: GENERATED_SUFFIX.to_string(),
            projects,
        }
    }

    /// Emit with `schema`.
    #[must_use]
    pub fn with_schema(mut self, schema: BindingSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Resolve processors through `registry`.
    #[must_use]
    pub fn with_registry(mut self, registry: ProcessorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Functions, by native path, that take the direct native call path.
    #[must_use]
    pub fn with_fast_invoke<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fast_invoke.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Use `suffix` instead of [`GENERATED_SUFFIX`] for emitted files.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// The document.
    #[must_use]
    pub fn document(&self) -> &TypeDefinitionDocument {
        &self.document
    }

    /// Active schema.
    #[must_use]
    pub fn schema(&self) -> BindingSchema {
        self.schema
    }

    /// Processor registry.
    #[must_use]
    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    /// Output root.
    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Returns `true` if `function` takes the direct native call path.
    #[must_use]
    pub fn is_fast_invoke(&self, function: &FunctionDefinition) -> bool {
        self.fast_invoke.contains(&function.base.path)
    }

    /// Number of functions in the fast-invoke set.
    #[must_use]
    pub fn fast_invoke_len(&self) -> usize {
        self.fast_invoke.len()
    }

    /// Types grouped by project, projects in name order, types in export order.
    pub fn projects(&self) -> impl Iterator<Item = (&str, Vec<&TypeDefinition>)> + '_ {
        let types: Vec<&TypeDefinition> = self.document.iter().collect();
        self.projects.iter().map(move |(project, indices)| {
            (
                project.as_str(),
                indices.iter().map(|index| types[*index]).collect(),
            )
        })
    }

    /// Processor serving `property`.
    ///
    /// # Errors
    /// Returns [`crate::Error::NoProcessor`] if the tag is not registered.
    pub fn processor(&self, property: &PropertyDefinition) -> Result<&dyn PropertyProcessor> {
        self.registry.for_property(property)
    }

    /// Document entity a reference points at, `None` for engine and placeholder types.
    #[must_use]
    pub fn resolve(&self, reference: &TypeReferenceInfo) -> Option<&TypeDefinition> {
        self.document
            .find(&reference.namespace, &reference.native_name)
    }

    /// Output file of `definition`:
    /// `<root>/<project>/<package path>/<category>/<native name><suffix>`.
    #[must_use]
    pub fn output_path(&self, definition: &TypeDefinition) -> PathBuf {
        let base = definition.base();
        let mut path = self.output_root.join(&base.project);
        for segment in base.package_path.split('/').filter(|segment| !segment.is_empty()) {
            path.push(segment);
        }
        path.push(definition.category().to_string());
        path.push(format!("{}{}", base.native_name, self.suffix));
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::factories::sample_document;
    use std::str::FromStr;

    #[test]
    fn schema_names() {
        assert_eq!(BindingSchema::from_str("blueprint").unwrap(), BindingSchema::Blueprint);
        assert_eq!(BindingSchema::Managed.to_string(), "managed");
        assert_eq!(BindingSchema::Blueprint.property_visibility(PropertyFlags::PRIVATE), "public");
        assert_eq!(BindingSchema::Native.property_visibility(PropertyFlags::PROTECTED), "protected");
        assert_eq!(BindingSchema::Managed.function_visibility(FunctionFlags::PRIVATE), "private");
    }

    #[test]
    fn output_paths() {
        let context = BindingContext::new(sample_document(), "out");
        let actor = context.document().get("MyActor").unwrap();
        assert_eq!(
            context.output_path(actor),
            Path::new("out/Game/Actors/Classes/AMyActor.generated.cs")
        );
        let mode = context.document().get("WeaponMode").unwrap();
        assert_eq!(
            context.output_path(mode),
            Path::new("out/Game/Enums/EWeaponMode.generated.cs")
        );

        let context = context.with_suffix(".g.cs");
        let info = context.document().get("DamageInfo").unwrap();
        assert_eq!(
            context.output_path(info),
            Path::new("out/Game/Structs/FDamageInfo.g.cs")
        );
    }

    #[test]
    fn fast_invoke_membership() {
        let context = BindingContext::new(sample_document(), "out")
            .with_fast_invoke(["/Script/Game.MyActor:Reset"]);
        let TypeDefinition::Class(actor) = context.document().get("MyActor").unwrap() else {
            panic!("MyActor is a class");
        };
        assert!(context.is_fast_invoke(actor.function("Reset").unwrap()));
        assert!(!context.is_fast_invoke(actor.function("Fire").unwrap()));
    }

    #[test]
    fn project_groups() {
        let context = BindingContext::new(sample_document(), "out");
        let projects: Vec<(&str, usize)> = context
            .projects()
            .map(|(project, types)| (project, types.len()))
            .collect();
        assert_eq!(projects, [("Game", 7)]);
    }
}

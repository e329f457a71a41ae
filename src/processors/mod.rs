//! Processor registry and built-in processors.
//!
//! A [`PropertyProcessor`] knows everything the exporters need about one family of type-class
//! tags: how the value is spelled in managed source for a given [`Usage`], which marshaller
//! reads and writes it, how it is passed on the direct native call path and, optionally, a
//! hand-written accessor replacing the default offset-based get/set pair.
//!
//! The [`ProcessorRegistry`] maps every [`TypeClass`] to exactly one processor. New value kinds
//! are supported by registering another processor; nothing dispatches on tags outside this
//! registry.
//!
//! # Usage Examples
//!
//! ```rust
//! use bindweaver::model::TypeClass;
//! use bindweaver::processors::ProcessorRegistry;
//!
//! let registry = ProcessorRegistry::with_builtins();
//! assert_eq!(registry.get(TypeClass::Int32).map(|p| p.name()), Some("blittable"));
//! assert!(registry.get(TypeClass::Map).is_some());
//! ```

mod containers;
mod delegates;
mod primitives;
mod references;
mod strings;
mod structs;

pub use containers::{ArrayProcessor, MapProcessor, SetProcessor};
pub use delegates::DelegateProcessor;
pub use primitives::{BlittableProcessor, BoolProcessor, EnumProcessor, NameProcessor};
pub use references::{ClassProcessor, ObjectProcessor, SoftReferenceProcessor};
pub use strings::{StringProcessor, TextProcessor};
pub use structs::StructProcessor;

use std::{collections::HashMap, sync::Arc};

use strum::Display;

use crate::{
    marshal::{NativeMemory, StructMarshaller, Value},
    model::{PropertyDefinition, TypeClass},
    Error, Result,
};

/// The declaration context a managed type name is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Usage {
    /// Property of a class, backed by native object memory
    ClassField,
    /// Member of a struct, held by value on the managed side
    StructField,
    /// Function or delegate parameter
    Parameter,
    /// Function or delegate return value
    ReturnValue,
    /// Member of an interface contract
    InterfaceMember,
    /// Generic argument of a container
    GenericArgument,
}

/// How one parameter or return value travels on the direct native call path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastInvokeParam {
    /// Native type of the function-pointer slot, e.g. `int` or `IntPtr`
    pub native_type: String,
    /// Passed as a pointer to a local rather than by value
    pub by_address: bool,
    /// Statements emitted before the call
    pub pre: Vec<String>,
    /// Statements emitted after the call
    pub post: Vec<String>,
    /// Argument expression; for return values the conversion applied to `__result`
    pub argument: String,
}

impl FastInvokeParam {
    /// A value passed straight through.
    #[must_use]
    pub fn by_value(native_type: &str, argument: impl Into<String>) -> Self {
        FastInvokeParam {
            native_type: native_type.to_string(),
            by_address: false,
            pre: Vec::new(),
            post: Vec::new(),
            argument: argument.into(),
        }
    }
}

/// A getter/setter pair replacing the default offset-based accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    /// Getter expression
    pub getter: String,
    /// Setter statement, `None` for read-only accessors
    pub setter: Option<String>,
}

/// Naming, marshaling and call strategy for a family of type-class tags.
///
/// `buffer` and `offset` arguments are managed-source expressions evaluating to the native
/// base address and the byte offset of the value.
pub trait PropertyProcessor: Send + Sync {
    /// Unique identifier of the processor, used in logs and registry listings.
    fn name(&self) -> &'static str;

    /// Tags this processor serves.
    fn type_classes(&self) -> &'static [TypeClass];

    /// Managed type name of `property` in `usage`.
    ///
    /// # Errors
    /// Returns [`Error::NoProcessor`] if an inner property cannot be resolved.
    fn display_type(
        &self,
        property: &PropertyDefinition,
        usage: Usage,
        registry: &ProcessorRegistry,
    ) -> Result<String>;

    /// Managed marshaller type converting the value, e.g. `BlittableMarshaller<int>`.
    ///
    /// # Errors
    /// Returns [`Error::NoProcessor`] if an inner property cannot be resolved.
    fn marshaller(&self, property: &PropertyDefinition, registry: &ProcessorRegistry) -> Result<String>;

    /// Expression reading the value at `buffer + offset`.
    ///
    /// # Errors
    /// Propagates [`PropertyProcessor::marshaller`] failures.
    fn read_text(
        &self,
        property: &PropertyDefinition,
        buffer: &str,
        offset: &str,
        registry: &ProcessorRegistry,
    ) -> Result<String> {
        Ok(format!(
            "{}.FromNative({buffer}, {offset}, 0)",
            self.marshaller(property, registry)?
        ))
    }

    /// Statement writing `value` to `buffer + offset`.
    ///
    /// # Errors
    /// Propagates [`PropertyProcessor::marshaller`] failures.
    fn write_text(
        &self,
        property: &PropertyDefinition,
        buffer: &str,
        offset: &str,
        value: &str,
        registry: &ProcessorRegistry,
    ) -> Result<String> {
        Ok(format!(
            "{}.ToNative({buffer}, {offset}, 0, {value});",
            self.marshaller(property, registry)?
        ))
    }

    /// Direct-call convention of `property`, `None` if it cannot travel on the fast path.
    ///
    /// # Errors
    /// Returns [`Error::NoProcessor`] if an inner property cannot be resolved.
    fn fast_invoke(
        &self,
        _property: &PropertyDefinition,
        _registry: &ProcessorRegistry,
    ) -> Result<Option<FastInvokeParam>> {
        Ok(None)
    }

    /// Accessors replacing the default get/set pair of a class property.
    ///
    /// # Errors
    /// Returns [`Error::NoProcessor`] if an inner property cannot be resolved.
    fn accessor_override(
        &self,
        _property: &PropertyDefinition,
        _offset: &str,
        _registry: &ProcessorRegistry,
    ) -> Result<Option<Accessor>> {
        Ok(None)
    }

    /// Read the value stored at `address`.
    ///
    /// # Errors
    /// Returns [`Error::NotSupported`] for kinds whose native form needs the engine runtime.
    fn read_value(
        &self,
        property: &PropertyDefinition,
        _memory: &dyn NativeMemory,
        _address: u64,
        _marshal: &StructMarshaller<'_>,
    ) -> Result<Value> {
        log::debug!(
            "Processor '{}' cannot read '{}' without the engine runtime",
            self.name(),
            property.base.path
        );
        Err(Error::NotSupported)
    }

    /// Store `value` at `address`.
    ///
    /// # Errors
    /// Returns [`Error::NotSupported`] for kinds whose native form needs the engine runtime.
    fn write_value(
        &self,
        property: &PropertyDefinition,
        _memory: &mut dyn NativeMemory,
        _address: u64,
        _value: &Value,
        _marshal: &StructMarshaller<'_>,
    ) -> Result<()> {
        log::debug!(
            "Processor '{}' cannot write '{}' without the engine runtime",
            self.name(),
            property.base.path
        );
        Err(Error::NotSupported)
    }
}

/// Lookup from type-class tag to processor.
///
/// Registering a processor for a tag that is already served replaces the previous one for that
/// tag, so built-ins can be overridden selectively.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    processors: Vec<Arc<dyn PropertyProcessor>>,
    by_class: HashMap<TypeClass, usize>,
}

impl ProcessorRegistry {
    /// A registry without processors.
    #[must_use]
    pub fn new() -> Self {
        ProcessorRegistry::default()
    }

    /// Register `processor` for every tag it declares.
    #[must_use]
    pub fn register<P: PropertyProcessor + 'static>(mut self, processor: P) -> Self {
        self.insert(Arc::new(processor));
        self
    }

    /// Register a shared processor for every tag it declares.
    pub fn insert(&mut self, processor: Arc<dyn PropertyProcessor>) {
        let position = self.processors.len();
        for type_class in processor.type_classes() {
            if let Some(previous) = self.by_class.insert(*type_class, position) {
                log::debug!(
                    "Processor '{}' replaces '{}' for {type_class}",
                    processor.name(),
                    self.processors[previous].name()
                );
            }
        }
        self.processors.push(processor);
    }

    /// Registry serving every tag with the built-in processors.
    #[must_use]
    pub fn with_builtins() -> Self {
        ProcessorRegistry::new()
            .register(BoolProcessor)
            .register(BlittableProcessor)
            .register(EnumProcessor)
            .register(NameProcessor)
            .register(StringProcessor)
            .register(TextProcessor)
            .register(ObjectProcessor)
            .register(ClassProcessor)
            .register(SoftReferenceProcessor)
            .register(StructProcessor)
            .register(ArrayProcessor)
            .register(SetProcessor)
            .register(MapProcessor)
            .register(DelegateProcessor)
    }

    /// Processor serving `type_class`.
    #[must_use]
    pub fn get(&self, type_class: TypeClass) -> Option<&dyn PropertyProcessor> {
        self.by_class
            .get(&type_class)
            .map(|position| self.processors[*position].as_ref())
    }

    /// Processor serving the tag of `property`.
    ///
    /// # Errors
    /// Returns [`Error::NoProcessor`] naming the property and its owner if the tag is not served.
    pub fn for_property(&self, property: &PropertyDefinition) -> Result<&dyn PropertyProcessor> {
        self.get(property.type_class).ok_or_else(|| {
            let path = &property.base.path;
            let owner = path.rsplit_once(':').map_or(path.as_str(), |(owner, _)| owner);
            Error::NoProcessor {
                tag: property.type_class.to_string(),
                owner: owner.to_string(),
                property: property.name().to_string(),
            }
        })
    }

    /// Managed type name of `property` in `usage`.
    ///
    /// # Errors
    /// Returns [`Error::NoProcessor`] if the property or an inner property is not served.
    pub fn display_type(&self, property: &PropertyDefinition, usage: Usage) -> Result<String> {
        self.for_property(property)?.display_type(property, usage, self)
    }

    /// Marshaller type of `property`.
    ///
    /// # Errors
    /// Returns [`Error::NoProcessor`] if the property or an inner property is not served.
    pub fn marshaller(&self, property: &PropertyDefinition) -> Result<String> {
        self.for_property(property)?.marshaller(property, self)
    }

    /// Names of the registered processors in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.processors.iter().map(|processor| processor.name())
    }

    /// Number of tags served.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_class.len()
    }

    /// Returns `true` if no tag is served.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_class.is_empty()
    }
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("processors", &self.names().collect::<Vec<_>>())
            .field("tags", &self.by_class.len())
            .finish()
    }
}

/// Inner property `index` of a container.
fn inner(property: &PropertyDefinition, index: usize) -> Result<&PropertyDefinition> {
    property.inner.get(index).ok_or_else(|| {
        internal_error!(
            "'{}' of type class {} has no inner property {index}",
            property.base.path,
            property.type_class
        )
    })
}

/// Native type name referenced by `property`.
fn referenced_name(property: &PropertyDefinition) -> Result<&str> {
    property
        .reference
        .as_ref()
        .map(|reference| reference.native_name.as_str())
        .ok_or_else(|| {
            internal_error!(
                "'{}' of type class {} has no type reference",
                property.base.path,
                property.type_class
            )
        })
}

/// Error for a value of the wrong kind handed to `write_value`.
fn unexpected(property: &PropertyDefinition, expected: &str, value: &Value) -> Error {
    Error::Error(format!(
        "'{}' expects a {expected} value, got {}",
        property.base.path,
        value.kind()
    ))
}

/// Direct-call convention shared by values passed as plain bytes.
///
/// `out` and `ref` parameters go through a local whose address is passed.
/// `to_native` and `from_native` are conversion templates with `{}` standing for the operand.
fn plain_fast_invoke(
    property: &PropertyDefinition,
    native_type: &str,
    to_native: &str,
    from_native: &str,
) -> FastInvokeParam {
    let name = property.name();
    if property.is_return() {
        return FastInvokeParam::by_value(native_type, from_native.replace("{}", "__result"));
    }
    if !property.is_out() {
        return FastInvokeParam::by_value(native_type, to_native.replace("{}", name));
    }

    let local = format!("{name}_Native");
    let initial = if property.flags.contains(crate::model::PropertyFlags::OUT) {
        "default".to_string()
    } else {
        to_native.replace("{}", name)
    };
    FastInvokeParam {
        native_type: format!("{native_type}*"),
        by_address: true,
        pre: vec![format!("{native_type} {local} = {initial};")],
        post: vec![format!("{name} = {};", from_native.replace("{}", &local))],
        argument: format!("&{local}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::TypeClass, test::factories::primitive_property};
    use strum::IntoEnumIterator;

    struct Fixed;

    impl PropertyProcessor for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn type_classes(&self) -> &'static [TypeClass] {
            &[TypeClass::Int32]
        }

        fn display_type(&self, _: &PropertyDefinition, _: Usage, _: &ProcessorRegistry) -> Result<String> {
            Ok("Fixed".to_string())
        }

        fn marshaller(&self, _: &PropertyDefinition, _: &ProcessorRegistry) -> Result<String> {
            Ok("FixedMarshaller".to_string())
        }
    }

    #[test]
    fn builtins_cover_every_tag() {
        let registry = ProcessorRegistry::with_builtins();
        for type_class in TypeClass::iter() {
            assert!(registry.get(type_class).is_some(), "no processor for {type_class}");
        }
        assert_eq!(registry.len(), TypeClass::iter().count());
    }

    #[test]
    fn no_processor() {
        let registry = ProcessorRegistry::new().register(BoolProcessor);
        let property = primitive_property("Count", TypeClass::Int32);
        match registry.for_property(&property) {
            Err(Error::NoProcessor { tag, owner, property }) => {
                assert_eq!(tag, "int32");
                assert_eq!(owner, "/Script/Game.Fixture");
                assert_eq!(property, "Count");
            }
            other => panic!("unexpected {:?}", other.map(|processor| processor.name())),
        }
    }

    #[test]
    fn override_builtin() {
        let registry = ProcessorRegistry::with_builtins().register(Fixed);
        let count = primitive_property("Count", TypeClass::Int32);
        let flag = primitive_property("Flag", TypeClass::Bool);

        assert_eq!(registry.display_type(&count, Usage::ClassField).unwrap(), "Fixed");
        assert_eq!(registry.marshaller(&flag).unwrap(), "BoolMarshaller");
        assert_eq!(registry.get(TypeClass::Int64).unwrap().name(), "blittable");
        assert_eq!(registry.names().last(), Some("fixed"));
    }

    #[test]
    fn plain_out_parameter() {
        let mut shots = primitive_property("shots", TypeClass::Int32);
        shots.flags |= crate::model::PropertyFlags::OUT;
        let param = plain_fast_invoke(&shots, "int", "{}", "{}");
        assert!(param.by_address);
        assert_eq!(param.native_type, "int*");
        assert_eq!(param.pre, ["int shots_Native = default;"]);
        assert_eq!(param.post, ["shots = shots_Native;"]);
        assert_eq!(param.argument, "&shots_Native");
    }
}

//! Object, class and soft references.

use crate::{
    marshal::{NativeMemory, StructMarshaller, Value},
    model::{PropertyDefinition, TypeClass},
    processors::{
        inner, plain_fast_invoke, referenced_name, unexpected, FastInvokeParam, ProcessorRegistry,
        PropertyProcessor, Usage,
    },
    Result,
};

fn read_handle(memory: &dyn NativeMemory, address: u64) -> Result<Value> {
    Ok(Value::Object(memory.read_le::<u64>(address)?))
}

fn write_handle(
    property: &PropertyDefinition,
    memory: &mut dyn NativeMemory,
    address: u64,
    value: &Value,
) -> Result<()> {
    match value {
        Value::Object(handle) => memory.write_le(address, *handle),
        other => Err(unexpected(property, "object", other)),
    }
}

/// Pointers to reflected objects and interfaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectProcessor;

impl PropertyProcessor for ObjectProcessor {
    fn name(&self) -> &'static str {
        "object"
    }

    fn type_classes(&self) -> &'static [TypeClass] {
        &[TypeClass::Object]
    }

    fn display_type(&self, property: &PropertyDefinition, _: Usage, _: &ProcessorRegistry) -> Result<String> {
        Ok(referenced_name(property)?.to_string())
    }

    fn marshaller(&self, property: &PropertyDefinition, _: &ProcessorRegistry) -> Result<String> {
        Ok(format!("ObjectMarshaller<{}>", referenced_name(property)?))
    }

    fn fast_invoke(
        &self,
        property: &PropertyDefinition,
        _: &ProcessorRegistry,
    ) -> Result<Option<FastInvokeParam>> {
        let from_native = format!("ObjectMarshaller<{}>.FromHandle({{}})", referenced_name(property)?);
        Ok(Some(plain_fast_invoke(
            property,
            "IntPtr",
            "({}?.NativeObject ?? IntPtr.Zero)",
            &from_native,
        )))
    }

    fn read_value(
        &self,
        _: &PropertyDefinition,
        memory: &dyn NativeMemory,
        address: u64,
        _: &StructMarshaller<'_>,
    ) -> Result<Value> {
        read_handle(memory, address)
    }

    fn write_value(
        &self,
        property: &PropertyDefinition,
        memory: &mut dyn NativeMemory,
        address: u64,
        value: &Value,
        _: &StructMarshaller<'_>,
    ) -> Result<()> {
        write_handle(property, memory, address, value)
    }
}

/// `TSubclassOf<T>`, a class handle constrained to `T` and its subclasses.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassProcessor;

impl PropertyProcessor for ClassProcessor {
    fn name(&self) -> &'static str {
        "class"
    }

    fn type_classes(&self) -> &'static [TypeClass] {
        &[TypeClass::Class]
    }

    fn display_type(&self, property: &PropertyDefinition, _: Usage, _: &ProcessorRegistry) -> Result<String> {
        Ok(format!("TSubclassOf<{}>", referenced_name(inner(property, 0)?)?))
    }

    fn marshaller(&self, property: &PropertyDefinition, _: &ProcessorRegistry) -> Result<String> {
        Ok(format!("SubclassOfMarshaller<{}>", referenced_name(inner(property, 0)?)?))
    }

    fn fast_invoke(
        &self,
        property: &PropertyDefinition,
        _: &ProcessorRegistry,
    ) -> Result<Option<FastInvokeParam>> {
        let from_native = format!("new TSubclassOf<{}>({{}})", referenced_name(inner(property, 0)?)?);
        Ok(Some(plain_fast_invoke(property, "IntPtr", "{}.NativeClass", &from_native)))
    }

    fn read_value(
        &self,
        _: &PropertyDefinition,
        memory: &dyn NativeMemory,
        address: u64,
        _: &StructMarshaller<'_>,
    ) -> Result<Value> {
        read_handle(memory, address)
    }

    fn write_value(
        &self,
        property: &PropertyDefinition,
        memory: &mut dyn NativeMemory,
        address: u64,
        value: &Value,
        _: &StructMarshaller<'_>,
    ) -> Result<()> {
        write_handle(property, memory, address, value)
    }
}

/// `TSoftObjectPtr<T>` and `TSoftClassPtr<T>`, path-based lazy references.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftReferenceProcessor;

impl SoftReferenceProcessor {
    fn wrapper(property: &PropertyDefinition) -> (&'static str, &'static str) {
        if property.type_class == TypeClass::SoftClass {
            ("TSoftClassPtr", "SoftClassMarshaller")
        } else {
            ("TSoftObjectPtr", "SoftObjectMarshaller")
        }
    }
}

impl PropertyProcessor for SoftReferenceProcessor {
    fn name(&self) -> &'static str {
        "soft_reference"
    }

    fn type_classes(&self) -> &'static [TypeClass] {
        &[TypeClass::SoftObject, TypeClass::SoftClass]
    }

    fn display_type(&self, property: &PropertyDefinition, _: Usage, _: &ProcessorRegistry) -> Result<String> {
        let (wrapper, _) = Self::wrapper(property);
        Ok(format!("{wrapper}<{}>", referenced_name(inner(property, 0)?)?))
    }

    fn marshaller(&self, property: &PropertyDefinition, _: &ProcessorRegistry) -> Result<String> {
        let (_, marshaller) = Self::wrapper(property);
        Ok(format!("{marshaller}<{}>", referenced_name(inner(property, 0)?)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        marshal::NativeHeap,
        model::{PropertyFlags, ReferenceKind, TypeDefinitionDocument, TypeReferenceInfo},
        test::factories::primitive_property,
    };

    fn actor_reference(name: &str) -> PropertyDefinition {
        let mut property = primitive_property(name, TypeClass::Object);
        property.type_name = "AActor".to_string();
        property.reference = Some(TypeReferenceInfo {
            native_name: "AActor".to_string(),
            name: "Actor".to_string(),
            namespace: "Engine".to_string(),
            module: "Engine".to_string(),
            kind: ReferenceKind::Class,
            underlying: None,
        });
        property
    }

    #[test]
    fn object_names() {
        let registry = ProcessorRegistry::with_builtins();
        let target = actor_reference("Target");
        assert_eq!(registry.display_type(&target, Usage::Parameter).unwrap(), "AActor");
        assert_eq!(registry.marshaller(&target).unwrap(), "ObjectMarshaller<AActor>");

        let mut projectile = primitive_property("ProjectileClass", TypeClass::Class);
        projectile.inner.push(actor_reference("ProjectileClass_Inner"));
        assert_eq!(
            registry.display_type(&projectile, Usage::ClassField).unwrap(),
            "TSubclassOf<AActor>"
        );

        let mut soft = primitive_property("Preview", TypeClass::SoftClass);
        soft.inner.push(actor_reference("Preview_Inner"));
        assert_eq!(
            registry.display_type(&soft, Usage::StructField).unwrap(),
            "TSoftClassPtr<AActor>"
        );
        assert_eq!(registry.marshaller(&soft).unwrap(), "SoftClassMarshaller<AActor>");
    }

    #[test]
    fn object_fast_invoke() {
        let registry = ProcessorRegistry::with_builtins();
        let instigator = actor_reference("instigator");
        let param = ObjectProcessor.fast_invoke(&instigator, &registry).unwrap().unwrap();
        assert_eq!(param.native_type, "IntPtr");
        assert_eq!(param.argument, "(instigator?.NativeObject ?? IntPtr.Zero)");

        let mut result = actor_reference("ReturnValue");
        result.flags |= PropertyFlags::RETURN;
        let param = ObjectProcessor.fast_invoke(&result, &registry).unwrap().unwrap();
        assert_eq!(param.argument, "ObjectMarshaller<AActor>.FromHandle(__result)");
    }

    #[test]
    fn handles() {
        let registry = ProcessorRegistry::with_builtins();
        let document = TypeDefinitionDocument::default();
        let marshal = StructMarshaller::new(&registry, &document);
        let target = actor_reference("Target");

        let mut heap = NativeHeap::new();
        let address = heap.allocate(8, 8).unwrap();
        marshal
            .write_property(&target, &mut heap, address, &Value::Object(0xDEAD_BEEF))
            .unwrap();
        assert_eq!(
            marshal.read_property(&target, &heap, address).unwrap(),
            Value::Object(0xDEAD_BEEF)
        );
        assert!(marshal
            .write_property(&target, &mut heap, address, &Value::Bool(true))
            .is_err());
    }
}

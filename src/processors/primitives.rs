//! Booleans, numbers, enums and names: values whose native bytes are the managed bytes.

use crate::{
    marshal::{NativeMemory, StructMarshaller, Value},
    model::{PropertyDefinition, TypeClass},
    processors::{
        plain_fast_invoke, referenced_name, unexpected, FastInvokeParam, ProcessorRegistry,
        PropertyProcessor, Usage,
    },
    Result,
};

fn read_integer(memory: &dyn NativeMemory, address: u64, type_class: TypeClass) -> Result<i64> {
    Ok(match type_class {
        TypeClass::Int8 => memory.read_le::<i8>(address)?.into(),
        TypeClass::UInt8 => memory.read_le::<u8>(address)?.into(),
        TypeClass::Int16 => memory.read_le::<i16>(address)?.into(),
        TypeClass::UInt16 => memory.read_le::<u16>(address)?.into(),
        TypeClass::Int32 => memory.read_le::<i32>(address)?.into(),
        TypeClass::UInt32 => memory.read_le::<u32>(address)?.into(),
        TypeClass::Int64 => memory.read_le::<i64>(address)?,
        #[allow(clippy::cast_possible_wrap)]
        TypeClass::UInt64 => memory.read_le::<u64>(address)? as i64,
        other => return Err(internal_error!("{other} is not an integer type class")),
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn write_integer(memory: &mut dyn NativeMemory, address: u64, type_class: TypeClass, value: i64) -> Result<()> {
    match type_class {
        TypeClass::Int8 => memory.write_le(address, value as i8),
        TypeClass::UInt8 => memory.write_le(address, value as u8),
        TypeClass::Int16 => memory.write_le(address, value as i16),
        TypeClass::UInt16 => memory.write_le(address, value as u16),
        TypeClass::Int32 => memory.write_le(address, value as i32),
        TypeClass::UInt32 => memory.write_le(address, value as u32),
        TypeClass::Int64 => memory.write_le(address, value),
        TypeClass::UInt64 => memory.write_le(address, value as u64),
        other => Err(internal_error!("{other} is not an integer type class")),
    }
}

/// `bool`, stored as one byte.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoolProcessor;

impl PropertyProcessor for BoolProcessor {
    fn name(&self) -> &'static str {
        "bool"
    }

    fn type_classes(&self) -> &'static [TypeClass] {
        &[TypeClass::Bool]
    }

    fn display_type(&self, _: &PropertyDefinition, _: Usage, _: &ProcessorRegistry) -> Result<String> {
        Ok("bool".to_string())
    }

    fn marshaller(&self, _: &PropertyDefinition, _: &ProcessorRegistry) -> Result<String> {
        Ok("BoolMarshaller".to_string())
    }

    fn fast_invoke(
        &self,
        property: &PropertyDefinition,
        _: &ProcessorRegistry,
    ) -> Result<Option<FastInvokeParam>> {
        Ok(Some(plain_fast_invoke(
            property,
            "byte",
            "({} ? (byte)1 : (byte)0)",
            "{} != 0",
        )))
    }

    fn read_value(
        &self,
        _: &PropertyDefinition,
        memory: &dyn NativeMemory,
        address: u64,
        _: &StructMarshaller<'_>,
    ) -> Result<Value> {
        Ok(Value::Bool(memory.read_le::<u8>(address)? != 0))
    }

    fn write_value(
        &self,
        property: &PropertyDefinition,
        memory: &mut dyn NativeMemory,
        address: u64,
        value: &Value,
        _: &StructMarshaller<'_>,
    ) -> Result<()> {
        match value {
            Value::Bool(flag) => memory.write_le(address, u8::from(*flag)),
            other => Err(unexpected(property, "bool", other)),
        }
    }
}

/// Integers and floating point numbers.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlittableProcessor;

impl PropertyProcessor for BlittableProcessor {
    fn name(&self) -> &'static str {
        "blittable"
    }

    fn type_classes(&self) -> &'static [TypeClass] {
        &[
            TypeClass::Int8,
            TypeClass::UInt8,
            TypeClass::Int16,
            TypeClass::UInt16,
            TypeClass::Int32,
            TypeClass::UInt32,
            TypeClass::Int64,
            TypeClass::UInt64,
            TypeClass::Float,
            TypeClass::Double,
        ]
    }

    fn display_type(&self, property: &PropertyDefinition, _: Usage, _: &ProcessorRegistry) -> Result<String> {
        Ok(property.type_name.clone())
    }

    fn marshaller(&self, property: &PropertyDefinition, _: &ProcessorRegistry) -> Result<String> {
        Ok(format!("BlittableMarshaller<{}>", property.type_name))
    }

    fn fast_invoke(
        &self,
        property: &PropertyDefinition,
        _: &ProcessorRegistry,
    ) -> Result<Option<FastInvokeParam>> {
        Ok(Some(plain_fast_invoke(property, &property.type_name, "{}", "{}")))
    }

    fn read_value(
        &self,
        property: &PropertyDefinition,
        memory: &dyn NativeMemory,
        address: u64,
        _: &StructMarshaller<'_>,
    ) -> Result<Value> {
        match property.type_class {
            TypeClass::Float => Ok(Value::Float(memory.read_le::<f32>(address)?.into())),
            TypeClass::Double => Ok(Value::Float(memory.read_le::<f64>(address)?)),
            integer => Ok(Value::Integer(read_integer(memory, address, integer)?)),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn write_value(
        &self,
        property: &PropertyDefinition,
        memory: &mut dyn NativeMemory,
        address: u64,
        value: &Value,
        _: &StructMarshaller<'_>,
    ) -> Result<()> {
        match (property.type_class, value) {
            (TypeClass::Float, Value::Float(number)) => memory.write_le(address, *number as f32),
            (TypeClass::Double, Value::Float(number)) => memory.write_le(address, *number),
            (TypeClass::Float | TypeClass::Double, other) => Err(unexpected(property, "float", other)),
            (integer, Value::Integer(number)) => write_integer(memory, address, integer, *number),
            (_, other) => Err(unexpected(property, "integer", other)),
        }
    }
}

/// Reflected enums, stored as their underlying integer.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnumProcessor;

impl EnumProcessor {
    fn underlying(property: &PropertyDefinition) -> TypeClass {
        property
            .reference
            .as_ref()
            .and_then(|reference| reference.underlying)
            .unwrap_or(TypeClass::Int32)
    }
}

impl PropertyProcessor for EnumProcessor {
    fn name(&self) -> &'static str {
        "enum"
    }

    fn type_classes(&self) -> &'static [TypeClass] {
        &[TypeClass::Enum]
    }

    fn display_type(&self, property: &PropertyDefinition, _: Usage, _: &ProcessorRegistry) -> Result<String> {
        Ok(referenced_name(property)?.to_string())
    }

    fn marshaller(&self, property: &PropertyDefinition, _: &ProcessorRegistry) -> Result<String> {
        Ok(format!("EnumMarshaller<{}>", referenced_name(property)?))
    }

    fn fast_invoke(
        &self,
        property: &PropertyDefinition,
        _: &ProcessorRegistry,
    ) -> Result<Option<FastInvokeParam>> {
        let keyword = Self::underlying(property).keyword().unwrap_or("int");
        let name = referenced_name(property)?;
        Ok(Some(plain_fast_invoke(
            property,
            keyword,
            &format!("({keyword}){{}}"),
            &format!("({name}){{}}"),
        )))
    }

    fn read_value(
        &self,
        property: &PropertyDefinition,
        memory: &dyn NativeMemory,
        address: u64,
        _: &StructMarshaller<'_>,
    ) -> Result<Value> {
        Ok(Value::Integer(read_integer(memory, address, Self::underlying(property))?))
    }

    fn write_value(
        &self,
        property: &PropertyDefinition,
        memory: &mut dyn NativeMemory,
        address: u64,
        value: &Value,
        _: &StructMarshaller<'_>,
    ) -> Result<()> {
        match value {
            Value::Integer(number) => write_integer(memory, address, Self::underlying(property), *number),
            other => Err(unexpected(property, "integer", other)),
        }
    }
}

/// `FName`, an eight byte handle into the engine's name table.
#[derive(Debug, Default, Clone, Copy)]
pub struct NameProcessor;

impl PropertyProcessor for NameProcessor {
    fn name(&self) -> &'static str {
        "name"
    }

    fn type_classes(&self) -> &'static [TypeClass] {
        &[TypeClass::Name]
    }

    fn display_type(&self, _: &PropertyDefinition, _: Usage, _: &ProcessorRegistry) -> Result<String> {
        Ok("FName".to_string())
    }

    fn marshaller(&self, _: &PropertyDefinition, _: &ProcessorRegistry) -> Result<String> {
        Ok("BlittableMarshaller<FName>".to_string())
    }

    fn fast_invoke(
        &self,
        property: &PropertyDefinition,
        _: &ProcessorRegistry,
    ) -> Result<Option<FastInvokeParam>> {
        Ok(Some(plain_fast_invoke(property, "FName", "{}", "{}")))
    }

    fn read_value(
        &self,
        _: &PropertyDefinition,
        memory: &dyn NativeMemory,
        address: u64,
        _: &StructMarshaller<'_>,
    ) -> Result<Value> {
        Ok(Value::Name(memory.read_le::<u64>(address)?))
    }

    fn write_value(
        &self,
        property: &PropertyDefinition,
        memory: &mut dyn NativeMemory,
        address: u64,
        value: &Value,
        _: &StructMarshaller<'_>,
    ) -> Result<()> {
        match value {
            Value::Name(handle) => memory.write_le(address, *handle),
            other => Err(unexpected(property, "name", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        marshal::NativeHeap,
        model::{PropertyFlags, TypeDefinitionDocument},
        test::factories::primitive_property,
    };

    #[test]
    fn names_and_marshallers() {
        let registry = ProcessorRegistry::with_builtins();
        let score = primitive_property("Score", TypeClass::UInt64);
        assert_eq!(registry.display_type(&score, Usage::Parameter).unwrap(), "ulong");
        assert_eq!(registry.marshaller(&score).unwrap(), "BlittableMarshaller<ulong>");

        let processor = registry.for_property(&score).unwrap();
        assert_eq!(
            processor.read_text(&score, "buffer", "Score_Offset", &registry).unwrap(),
            "BlittableMarshaller<ulong>.FromNative(buffer, Score_Offset, 0)"
        );
        assert_eq!(
            processor
                .write_text(&score, "buffer", "Score_Offset", "value", &registry)
                .unwrap(),
            "BlittableMarshaller<ulong>.ToNative(buffer, Score_Offset, 0, value);"
        );
    }

    #[test]
    fn bool_fast_invoke() {
        let registry = ProcessorRegistry::with_builtins();
        let flag = primitive_property("enabled", TypeClass::Bool);
        let param = registry
            .for_property(&flag)
            .unwrap()
            .fast_invoke(&flag, &registry)
            .unwrap()
            .unwrap();
        assert_eq!(param.native_type, "byte");
        assert_eq!(param.argument, "(enabled ? (byte)1 : (byte)0)");

        let mut result = primitive_property("ReturnValue", TypeClass::Bool);
        result.flags |= PropertyFlags::RETURN;
        let param = BoolProcessor.fast_invoke(&result, &registry).unwrap().unwrap();
        assert_eq!(param.argument, "__result != 0");
    }

    #[test]
    fn integer_widths() {
        let registry = ProcessorRegistry::with_builtins();
        let document = TypeDefinitionDocument::default();
        let marshal = StructMarshaller::new(&registry, &document);
        let mut heap = NativeHeap::new();
        let address = heap.allocate(8, 8).unwrap();

        let small = primitive_property("Small", TypeClass::Int16);
        marshal
            .write_property(&small, &mut heap, address, &Value::Integer(-2))
            .unwrap();
        assert_eq!(heap.bytes(address, 2).unwrap(), &[0xFE, 0xFF]);
        assert_eq!(
            marshal.read_property(&small, &heap, address).unwrap(),
            Value::Integer(-2)
        );

        let ratio = primitive_property("Ratio", TypeClass::Float);
        marshal
            .write_property(&ratio, &mut heap, address, &Value::Float(0.5))
            .unwrap();
        assert_eq!(
            marshal.read_property(&ratio, &heap, address).unwrap(),
            Value::Float(0.5)
        );
        assert!(marshal
            .write_property(&ratio, &mut heap, address, &Value::Integer(1))
            .is_err());
    }
}

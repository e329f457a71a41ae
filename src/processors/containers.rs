//! `TArray<T>`, `TSet<T>` and `TMap<K, V>`.
//!
//! Element naming and marshalling is delegated to the processors of the inner properties, so a
//! container of any registered kind works without changes here.

use crate::{
    marshal::{NativeMemory, StructMarshaller, Value},
    model::{PropertyDefinition, TypeClass},
    processors::{
        inner,
        strings::{HEADER_MAX, HEADER_NUM},
        unexpected, ProcessorRegistry, PropertyProcessor, Usage,
    },
    Result,
};

/// Managed container spelling for `usage`: engine wrapper, interface, or owned collection.
fn container_name(usage: Usage, wrapper: &str, interface: &str, owned: &str) -> String {
    match usage {
        Usage::ClassField => wrapper.to_string(),
        Usage::Parameter | Usage::InterfaceMember => interface.to_string(),
        Usage::StructField | Usage::ReturnValue | Usage::GenericArgument => owned.to_string(),
    }
}

fn element(property: &PropertyDefinition, index: usize, registry: &ProcessorRegistry) -> Result<(String, String)> {
    let element = inner(property, index)?;
    Ok((
        registry.display_type(element, Usage::GenericArgument)?,
        registry.marshaller(element)?,
    ))
}

/// Dynamic arrays: `{ data: u64, num: i32, max: i32 }` over contiguous element storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArrayProcessor;

impl PropertyProcessor for ArrayProcessor {
    fn name(&self) -> &'static str {
        "array"
    }

    fn type_classes(&self) -> &'static [TypeClass] {
        &[TypeClass::Array]
    }

    fn display_type(
        &self,
        property: &PropertyDefinition,
        usage: Usage,
        registry: &ProcessorRegistry,
    ) -> Result<String> {
        let (element, _) = element(property, 0, registry)?;
        let name = container_name(usage, "TArray", "IList", "List");
        Ok(format!("{name}<{element}>"))
    }

    fn marshaller(&self, property: &PropertyDefinition, registry: &ProcessorRegistry) -> Result<String> {
        let (element, marshaller) = element(property, 0, registry)?;
        Ok(format!("ArrayMarshaller<{element}, {marshaller}>"))
    }

    fn read_value(
        &self,
        property: &PropertyDefinition,
        memory: &dyn NativeMemory,
        address: u64,
        marshal: &StructMarshaller<'_>,
    ) -> Result<Value> {
        let element = inner(property, 0)?;
        let data = memory.read_le::<u64>(address)?;
        let num = memory.read_le::<i32>(address + HEADER_NUM)?;
        let Ok(num) = u64::try_from(num) else {
            return Err(malformed_error!("Negative array length {} in '{}'", num, property.base.path));
        };
        if data == 0 {
            return Ok(Value::Array(Vec::new()));
        }

        let stride = element.size as u64;
        (0..num)
            .map(|index| marshal.read_property(element, memory, data + index * stride))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    fn write_value(
        &self,
        property: &PropertyDefinition,
        memory: &mut dyn NativeMemory,
        address: u64,
        value: &Value,
        marshal: &StructMarshaller<'_>,
    ) -> Result<()> {
        let Value::Array(items) = value else {
            return Err(unexpected(property, "array", value));
        };
        let element = inner(property, 0)?;
        let Ok(num) = i32::try_from(items.len()) else {
            return Err(out_of_bounds_error!());
        };
        if items.is_empty() {
            memory.write_le::<u64>(address, 0)?;
            memory.write_le::<i32>(address + HEADER_NUM, 0)?;
            return memory.write_le::<i32>(address + HEADER_MAX, 0);
        }

        let data = memory.allocate(element.size * items.len(), element.alignment)?;
        let stride = element.size as u64;
        for (index, item) in (0_u64..).zip(items) {
            marshal.write_property(element, memory, data + index * stride, item)?;
        }

        memory.write_le(address, data)?;
        memory.write_le(address + HEADER_NUM, num)?;
        memory.write_le(address + HEADER_MAX, num)
    }
}

/// Hash sets, marshalled by the engine runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct SetProcessor;

impl PropertyProcessor for SetProcessor {
    fn name(&self) -> &'static str {
        "set"
    }

    fn type_classes(&self) -> &'static [TypeClass] {
        &[TypeClass::Set]
    }

    fn display_type(
        &self,
        property: &PropertyDefinition,
        usage: Usage,
        registry: &ProcessorRegistry,
    ) -> Result<String> {
        let (element, _) = element(property, 0, registry)?;
        let name = container_name(usage, "TSet", "ISet", "HashSet");
        Ok(format!("{name}<{element}>"))
    }

    fn marshaller(&self, property: &PropertyDefinition, registry: &ProcessorRegistry) -> Result<String> {
        let (element, marshaller) = element(property, 0, registry)?;
        Ok(format!("SetMarshaller<{element}, {marshaller}>"))
    }
}

/// Hash maps, marshalled by the engine runtime. Inner property 0 is the key, 1 the value.
#[derive(Debug, Default, Clone, Copy)]
pub struct MapProcessor;

impl PropertyProcessor for MapProcessor {
    fn name(&self) -> &'static str {
        "map"
    }

    fn type_classes(&self) -> &'static [TypeClass] {
        &[TypeClass::Map]
    }

    fn display_type(
        &self,
        property: &PropertyDefinition,
        usage: Usage,
        registry: &ProcessorRegistry,
    ) -> Result<String> {
        let (key, _) = element(property, 0, registry)?;
        let (value, _) = element(property, 1, registry)?;
        let name = container_name(usage, "TMap", "IDictionary", "Dictionary");
        Ok(format!("{name}<{key}, {value}>"))
    }

    fn marshaller(&self, property: &PropertyDefinition, registry: &ProcessorRegistry) -> Result<String> {
        let (key, key_marshaller) = element(property, 0, registry)?;
        let (value, value_marshaller) = element(property, 1, registry)?;
        Ok(format!(
            "MapMarshaller<{key}, {key_marshaller}, {value}, {value_marshaller}>"
        ))
    }
}

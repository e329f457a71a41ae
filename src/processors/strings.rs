//! `string` and `FText`.

use widestring::U16Str;

use crate::{
    marshal::{NativeMemory, StructMarshaller, Value},
    model::{PropertyDefinition, TypeClass},
    processors::{unexpected, FastInvokeParam, ProcessorRegistry, PropertyProcessor, Usage},
    Result,
};

/// Byte offset of the element count within a string or array header.
pub(crate) const HEADER_NUM: u64 = 8;
/// Byte offset of the capacity within a string or array header.
pub(crate) const HEADER_MAX: u64 = 12;

/// Engine strings: `{ data: u64, num: i32, max: i32 }` over a NUL-terminated UTF-16 payload.
///
/// `num` counts the terminator; the empty string has a null data pointer and `num == 0`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringProcessor;

impl PropertyProcessor for StringProcessor {
    fn name(&self) -> &'static str {
        "string"
    }

    fn type_classes(&self) -> &'static [TypeClass] {
        &[TypeClass::String]
    }

    fn display_type(&self, _: &PropertyDefinition, _: Usage, _: &ProcessorRegistry) -> Result<String> {
        Ok("string".to_string())
    }

    fn marshaller(&self, _: &PropertyDefinition, _: &ProcessorRegistry) -> Result<String> {
        Ok("StringMarshaller".to_string())
    }

    fn fast_invoke(
        &self,
        property: &PropertyDefinition,
        _: &ProcessorRegistry,
    ) -> Result<Option<FastInvokeParam>> {
        let name = property.name();
        if property.is_return() {
            return Ok(Some(FastInvokeParam {
                native_type: "NativeString".to_string(),
                by_address: false,
                pre: Vec::new(),
                post: Vec::new(),
                argument: "__result.ToStringAndFree()".to_string(),
            }));
        }

        let local = format!("{name}_Native");
        let initial = if property.flags.contains(crate::model::PropertyFlags::OUT) {
            "default".to_string()
        } else {
            format!("new NativeString({name})")
        };
        let mut post = Vec::with_capacity(2);
        if property.is_out() {
            post.push(format!("{name} = {local}.ToString();"));
        }
        post.push(format!("{local}.Dispose();"));

        Ok(Some(FastInvokeParam {
            native_type: "NativeString*".to_string(),
            by_address: true,
            pre: vec![format!("NativeString {local} = {initial};")],
            post,
            argument: format!("&{local}"),
        }))
    }

    fn read_value(
        &self,
        _: &PropertyDefinition,
        memory: &dyn NativeMemory,
        address: u64,
        _: &StructMarshaller<'_>,
    ) -> Result<Value> {
        let data = memory.read_le::<u64>(address)?;
        let num = memory.read_le::<i32>(address + HEADER_NUM)?;
        let Ok(num) = usize::try_from(num) else {
            return Err(malformed_error!("Negative string length {}", num));
        };
        if data == 0 || num == 0 {
            return Ok(Value::String(String::new()));
        }

        let mut bytes = vec![0_u8; num * 2];
        memory.read(data, &mut bytes)?;
        let mut units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        if units.last() == Some(&0) {
            units.pop();
        }
        Ok(Value::String(U16Str::from_slice(&units).to_string_lossy()))
    }

    fn write_value(
        &self,
        property: &PropertyDefinition,
        memory: &mut dyn NativeMemory,
        address: u64,
        value: &Value,
        _: &StructMarshaller<'_>,
    ) -> Result<()> {
        let Value::String(text) = value else {
            return Err(unexpected(property, "string", value));
        };
        if text.is_empty() {
            memory.write_le::<u64>(address, 0)?;
            memory.write_le::<i32>(address + HEADER_NUM, 0)?;
            return memory.write_le::<i32>(address + HEADER_MAX, 0);
        }

        let units: Vec<u16> = text.encode_utf16().chain(std::iter::once(0)).collect();
        let Ok(num) = i32::try_from(units.len()) else {
            return Err(out_of_bounds_error!());
        };
        let bytes: Vec<u8> = units.iter().flat_map(|unit| unit.to_le_bytes()).collect();
        let data = memory.allocate(bytes.len(), 2)?;
        memory.write(data, &bytes)?;

        memory.write_le(address, data)?;
        memory.write_le(address + HEADER_NUM, num)?;
        memory.write_le(address + HEADER_MAX, num)
    }
}

/// `FText`, a localized engine string handled only by the engine runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextProcessor;

impl PropertyProcessor for TextProcessor {
    fn name(&self) -> &'static str {
        "text"
    }

    fn type_classes(&self) -> &'static [TypeClass] {
        &[TypeClass::Text]
    }

    fn display_type(&self, _: &PropertyDefinition, _: Usage, _: &ProcessorRegistry) -> Result<String> {
        Ok("FText".to_string())
    }

    fn marshaller(&self, _: &PropertyDefinition, _: &ProcessorRegistry) -> Result<String> {
        Ok("TextMarshaller".to_string())
    }
}

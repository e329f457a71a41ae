use crate::{
    marshal::{NativeMemory, StructMarshaller, Value},
    model::{PropertyDefinition, PropertyFlags, TypeClass},
    processors::{referenced_name, FastInvokeParam, ProcessorRegistry, PropertyProcessor, Usage},
    Result,
};

/// Reflected structs, marshalled member by member through their generated marshaller.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructProcessor;

impl PropertyProcessor for StructProcessor {
    fn name(&self) -> &'static str {
        "struct"
    }

    fn type_classes(&self) -> &'static [TypeClass] {
        &[TypeClass::Struct]
    }

    fn display_type(&self, property: &PropertyDefinition, _: Usage, _: &ProcessorRegistry) -> Result<String> {
        Ok(referenced_name(property)?.to_string())
    }

    fn marshaller(&self, property: &PropertyDefinition, _: &ProcessorRegistry) -> Result<String> {
        Ok(format!("{}Marshaller", referenced_name(property)?))
    }

    /// Structs travel through a stack copy whose address is passed; struct returns are not
    /// fast-invoke capable.
    fn fast_invoke(
        &self,
        property: &PropertyDefinition,
        _: &ProcessorRegistry,
    ) -> Result<Option<FastInvokeParam>> {
        if property.is_return() {
            return Ok(None);
        }

        let name = property.name();
        let marshaller = format!("{}Marshaller", referenced_name(property)?);
        let local = format!("{name}_Native");
        let mut pre = vec![format!(
            "byte* {local} = stackalloc byte[{marshaller}.NativeDataSize];"
        )];
        if !property.flags.contains(PropertyFlags::OUT) {
            pre.push(format!("{marshaller}.ToNative((IntPtr){local}, 0, 0, {name});"));
        }
        let post = if property.is_out() {
            vec![format!("{name} = {marshaller}.FromNative((IntPtr){local}, 0, 0);")]
        } else {
            Vec::new()
        };

        Ok(Some(FastInvokeParam {
            native_type: "IntPtr".to_string(),
            by_address: true,
            pre,
            post,
            argument: format!("(IntPtr){local}"),
        }))
    }

    fn read_value(
        &self,
        property: &PropertyDefinition,
        memory: &dyn NativeMemory,
        address: u64,
        marshal: &StructMarshaller<'_>,
    ) -> Result<Value> {
        let definition = marshal.resolve_struct(reference_of(property)?)?;
        marshal.from_native(definition, memory, address)
    }

    fn write_value(
        &self,
        property: &PropertyDefinition,
        memory: &mut dyn NativeMemory,
        address: u64,
        value: &Value,
        marshal: &StructMarshaller<'_>,
    ) -> Result<()> {
        let definition = marshal.resolve_struct(reference_of(property)?)?;
        marshal.to_native(definition, memory, address, value)
    }
}

fn reference_of(property: &PropertyDefinition) -> Result<&crate::model::TypeReferenceInfo> {
    property
        .reference
        .as_ref()
        .ok_or_else(|| internal_error!("Struct property '{}' has no type reference", property.base.path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ReferenceKind, TypeReferenceInfo};
    use crate::test::factories::primitive_property;

    fn damage_info(name: &str) -> PropertyDefinition {
        let mut property = primitive_property(name, TypeClass::Struct);
        property.type_name = "FDamageInfo".to_string();
        property.reference = Some(TypeReferenceInfo {
            native_name: "FDamageInfo".to_string(),
            name: "DamageInfo".to_string(),
            namespace: "Game".to_string(),
            module: "Game".to_string(),
            kind: ReferenceKind::Struct,
            underlying: None,
        });
        property
    }

    #[test]
    fn struct_names() {
        let registry = ProcessorRegistry::with_builtins();
        let info = damage_info("LastHit");
        assert_eq!(registry.display_type(&info, Usage::ClassField).unwrap(), "FDamageInfo");
        assert_eq!(registry.marshaller(&info).unwrap(), "FDamageInfoMarshaller");
    }

    #[test]
    fn struct_fast_invoke() {
        let registry = ProcessorRegistry::with_builtins();
        let info = damage_info("info");
        let param = StructProcessor.fast_invoke(&info, &registry).unwrap().unwrap();
        assert!(param.by_address);
        assert_eq!(
            param.pre,
            [
                "byte* info_Native = stackalloc byte[FDamageInfoMarshaller.NativeDataSize];",
                "FDamageInfoMarshaller.ToNative((IntPtr)info_Native, 0, 0, info);",
            ]
        );
        assert!(param.post.is_empty());

        let mut result = damage_info("ReturnValue");
        result.flags |= PropertyFlags::RETURN;
        assert!(StructProcessor.fast_invoke(&result, &registry).unwrap().is_none());
    }
}

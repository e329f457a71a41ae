use crate::{
    model::{PropertyDefinition, TypeClass},
    processors::{referenced_name, Accessor, ProcessorRegistry, PropertyProcessor, Usage},
    Result,
};

/// Single-cast and multicast delegates.
///
/// A multicast delegate property of a class is exposed through a nested invoker type named after
/// the property, so its accessor is replaced by a read-only getter constructing that invoker.
#[derive(Debug, Default, Clone, Copy)]
pub struct DelegateProcessor;

impl DelegateProcessor {
    /// Name of the nested invoker type generated for a delegate property.
    #[must_use]
    pub fn invoker_name(property: &PropertyDefinition) -> String {
        format!("{}Invoker", property.name())
    }
}

impl PropertyProcessor for DelegateProcessor {
    fn name(&self) -> &'static str {
        "delegate"
    }

    fn type_classes(&self) -> &'static [TypeClass] {
        &[TypeClass::Delegate, TypeClass::MulticastDelegate]
    }

    fn display_type(&self, property: &PropertyDefinition, usage: Usage, _: &ProcessorRegistry) -> Result<String> {
        let delegate = referenced_name(property)?;
        Ok(match (property.type_class, usage) {
            (TypeClass::MulticastDelegate, Usage::ClassField) => Self::invoker_name(property),
            (TypeClass::MulticastDelegate, _) => format!("TMulticastDelegate<{delegate}>"),
            _ => delegate.to_string(),
        })
    }

    fn marshaller(&self, property: &PropertyDefinition, _: &ProcessorRegistry) -> Result<String> {
        let delegate = referenced_name(property)?;
        if property.type_class == TypeClass::MulticastDelegate {
            Ok(format!("MulticastDelegateMarshaller<{delegate}>"))
        } else {
            Ok(format!("DelegateMarshaller<{delegate}>"))
        }
    }

    fn accessor_override(
        &self,
        property: &PropertyDefinition,
        offset: &str,
        _: &ProcessorRegistry,
    ) -> Result<Option<Accessor>> {
        if property.type_class != TypeClass::MulticastDelegate {
            return Ok(None);
        }
        Ok(Some(Accessor {
            getter: format!("new {}(NativeObject, {offset})", Self::invoker_name(property)),
            setter: None,
        }))
    }
}

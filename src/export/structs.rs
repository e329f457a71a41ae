//! Structs, and the property-offset cache shared with classes.
//!
//! Every property that crosses into native memory gets a static offset slot holding
//! [`UNRESOLVED_OFFSET`] until the static constructor resolves it by name against the owner's
//! native handle. Container and delegate properties additionally cache their member handle.

use crate::{
    context::BindingContext,
    export::{
        identifier,
        native_api::{FIND_MEMBER, FIND_TYPE, GET_MEMBER_OFFSET, OFFSET_ASSERT, UNRESOLVED_OFFSET},
        write_doc,
        writer::CodeWriter,
    },
    model::{PropertyDefinition, StructDefinition, TypeClass, TypeFlags},
    processors::Usage,
    Result,
};

/// One static slot of the property-offset cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OffsetSlot {
    /// Static field holding the byte offset
    pub offset: String,
    /// Static field holding the member handle, for kinds that need it
    pub handle: Option<String>,
    /// Native member name looked up at resolution time
    pub member: String,
}

impl OffsetSlot {
    /// Slot of `property`, fields named `{prefix}{Name}_Offset` / `{prefix}{Name}_NativeProperty`.
    pub(crate) fn for_property(prefix: &str, property: &PropertyDefinition) -> Self {
        let name = property.name();
        let handle = matches!(
            property.type_class,
            TypeClass::Array
                | TypeClass::Set
                | TypeClass::Map
                | TypeClass::Delegate
                | TypeClass::MulticastDelegate
        )
        .then(|| format!("{prefix}{name}_NativeProperty"));

        OffsetSlot {
            offset: format!("{prefix}{name}_Offset"),
            handle,
            member: property.base.native_name.clone(),
        }
    }
}

/// Slots of every property in `properties`.
pub(crate) fn property_slots<'a>(
    prefix: &str,
    properties: impl IntoIterator<Item = &'a PropertyDefinition>,
) -> Vec<OffsetSlot> {
    properties
        .into_iter()
        .map(|property| OffsetSlot::for_property(prefix, property))
        .collect()
}

/// Static field declarations of `slots`.
pub(crate) fn write_slot_fields(writer: &mut CodeWriter, slots: &[OffsetSlot]) {
    for slot in slots {
        writer.line(format!("static int {} = {UNRESOLVED_OFFSET};", slot.offset));
        if let Some(handle) = &slot.handle {
            writer.line(format!("static IntPtr {handle};"));
        }
    }
}

/// Statements resolving `slots` against the native handle `owner`.
pub(crate) fn write_slot_resolution(writer: &mut CodeWriter, owner: &str, slots: &[OffsetSlot]) {
    for slot in slots {
        let member = &slot.member;
        match &slot.handle {
            Some(handle) => {
                writer.line(format!("{handle} = {FIND_MEMBER}({owner}, \"{member}\");"));
                writer.line(format!(
                    "{} = {OFFSET_ASSERT}({GET_MEMBER_OFFSET}({handle}), \"{member}\");",
                    slot.offset
                ));
            }
            None => writer.line(format!(
                "{} = {OFFSET_ASSERT}({GET_MEMBER_OFFSET}({FIND_MEMBER}({owner}, \"{member}\")), \"{member}\");",
                slot.offset
            )),
        }
    }
}

/// Assignments of every recovered default in `properties`.
pub(crate) fn write_default_assignments(writer: &mut CodeWriter, properties: &[PropertyDefinition]) {
    for property in properties {
        if let Some(value) = &property.default_value {
            writer.line(format!(
                "{} = {};",
                identifier(property.name()),
                value.to_source(property.type_class)
            ));
        }
    }
}

/// Struct declaration followed by its marshaller.
///
/// Fast-access structs are copied as a whole instead of member by member.
///
/// # Errors
/// Returns [`crate::Error::NoProcessor`] if a property kind has no registered processor.
pub fn write_struct(writer: &mut CodeWriter, context: &BindingContext, definition: &StructDefinition) -> Result<()> {
    let name = &definition.base.native_name;
    let registry = context.registry();
    let view = definition.flags.contains(TypeFlags::FAST_ACCESS);

    if view {
        writer.line(format!(
            "[StructLayout(LayoutKind.Sequential, Size = {})]",
            definition.size
        ));
    }
    writer.open(format!("public unsafe partial struct {name}"));
    writer.line(format!("public const string NativePath = \"{}\";", definition.base.path));
    writer.line(format!("public const int NativeDataSize = {};", definition.size));
    writer.blank();

    for property in &definition.properties {
        write_doc(writer, &property.base);
        writer.line(format!(
            "{} {} {};",
            context.schema().property_visibility(property.flags),
            registry.display_type(property, Usage::StructField)?,
            identifier(property.name())
        ));
    }
    writer.blank();

    if definition.flags.contains(TypeFlags::HAS_DEFAULTS) {
        writer.open(format!("public {name}()"));
        write_default_assignments(writer, &definition.properties);
        writer.close();
        writer.blank();
    }

    let slots = property_slots("", &definition.properties);
    write_slot_fields(writer, &slots);
    writer.blank();
    writer.open(format!("static {name}()"));
    writer.line(format!("IntPtr nativeType = {FIND_TYPE}(NativePath);"));
    write_slot_resolution(writer, "nativeType", &slots);
    writer.close();
    writer.blank();

    writer.open(format!("public {name}(IntPtr buffer, int offset)"));
    if view {
        writer.line(format!("this = *({name}*)(buffer + offset);"));
    } else {
        for (property, slot) in definition.properties.iter().zip(&slots) {
            let processor = context.processor(property)?;
            let read = processor.read_text(property, "buffer", &format!("offset + {}", slot.offset), registry)?;
            writer.line(format!("{} = {read};", identifier(property.name())));
        }
    }
    writer.close();
    writer.blank();

    writer.open("public void ToNative(IntPtr buffer, int offset)");
    if view {
        writer.line(format!("*({name}*)(buffer + offset) = this;"));
    } else {
        for (property, slot) in definition.properties.iter().zip(&slots) {
            let processor = context.processor(property)?;
            writer.line(processor.write_text(
                property,
                "buffer",
                &format!("offset + {}", slot.offset),
                &identifier(property.name()),
                registry,
            )?);
        }
    }
    writer.close();
    writer.close();
    writer.blank();

    writer.open(format!("public static class {name}Marshaller"));
    writer.line(format!("public const int NativeDataSize = {name}.NativeDataSize;"));
    writer.blank();
    writer.line(format!(
        "public static {name} FromNative(IntPtr buffer, int offset, int index) => \
         new {name}(buffer, offset + index * NativeDataSize);"
    ));
    writer.blank();
    writer.line(format!(
        "public static void ToNative(IntPtr buffer, int offset, int index, {name} value) => \
         value.ToNative(buffer, offset + index * NativeDataSize);"
    ));
    writer.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        export::render,
        processors::{BoolProcessor, ProcessorRegistry},
        test::factories::sample_document,
        Error,
    };

    #[test]
    fn member_wise_struct() {
        let context = BindingContext::new(sample_document(), "out");
        let file = render(&context, context.document().get("DamageInfo").unwrap()).unwrap();
        let text = &file.contents;

        assert!(text.contains("    public unsafe partial struct FDamageInfo\n"));
        assert!(text.contains("        public const string NativePath = \"/Script/Game.DamageInfo\";\n"));
        assert!(text.contains("        public const int NativeDataSize = 32;\n"));
        assert!(text.contains("        public float Amount;\n        public string Source;\n        public EWeaponMode Mode;\n"));
        assert!(text.contains(
            "        public FDamageInfo()\n        {\n            Amount = 10.0f;\n            Source = \"World\";\n            Mode = EWeaponMode.Single;\n        }\n"
        ));
        assert!(text.contains("        static int Amount_Offset = NativeReflection.UnresolvedOffset;\n"));
        assert!(text.contains(
            "            Amount_Offset = NativeReflection.CheckOffset(NativeReflection.GetMemberOffset(NativeReflection.FindMember(nativeType, \"Amount\")), \"Amount\");\n"
        ));
        assert!(text.contains(
            "            Source = StringMarshaller.FromNative(buffer, offset + Source_Offset, 0);\n"
        ));
        assert!(text.contains(
            "            EnumMarshaller<EWeaponMode>.ToNative(buffer, offset + Mode_Offset, 0, Mode);\n"
        ));
        assert!(text.contains("    public static class FDamageInfoMarshaller\n"));
        assert!(!text.contains("StructLayout"));
    }

    #[test]
    fn fast_access_view() {
        let context = BindingContext::new(sample_document(), "out");
        let file = render(&context, context.document().get("HitCounter").unwrap()).unwrap();
        let text = &file.contents;

        assert!(text.contains("    [StructLayout(LayoutKind.Sequential, Size = 8)]\n    public unsafe partial struct FHitCounter\n"));
        assert!(text.contains("            this = *(FHitCounter*)(buffer + offset);\n"));
        assert!(text.contains("            *(FHitCounter*)(buffer + offset) = this;\n"));
        assert!(!text.contains("BlittableMarshaller<int>.FromNative"));
        assert!(!text.contains("public FHitCounter()"));
    }

    #[test]
    fn handle_slots() {
        let mut tags = crate::test::factories::primitive_property("Tags", TypeClass::Array);
        tags.base.native_name = "Tags".to_string();
        let slot = OffsetSlot::for_property("Fire_", &tags);
        assert_eq!(slot.offset, "Fire_Tags_Offset");
        assert_eq!(slot.handle.as_deref(), Some("Fire_Tags_NativeProperty"));

        let mut writer = CodeWriter::new();
        write_slot_resolution(&mut writer, "nativeType", &[slot]);
        assert_eq!(
            writer.as_str(),
            "Fire_Tags_NativeProperty = NativeReflection.FindMember(nativeType, \"Tags\");\n\
             Fire_Tags_Offset = NativeReflection.CheckOffset(NativeReflection.GetMemberOffset(Fire_Tags_NativeProperty), \"Tags\");\n"
        );
    }

    #[test]
    fn missing_processor() {
        let context = BindingContext::new(sample_document(), "out")
            .with_registry(ProcessorRegistry::new().register(BoolProcessor));
        match render(&context, context.document().get("DamageInfo").unwrap()) {
            Err(Error::NoProcessor { tag, owner, property }) => {
                assert_eq!(tag, "float");
                assert_eq!(owner, "/Script/Game.DamageInfo");
                assert_eq!(property, "Amount");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

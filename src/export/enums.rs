//! Enumerations.

use crate::{
    context::BindingContext,
    export::writer::CodeWriter,
    model::{EnumDefinition, TypeFlags},
    Result,
};

/// Source spelling of an enum member value: hexadecimal, negative values in decimal.
#[must_use]
pub fn member_value(value: i128) -> String {
    if value < 0 {
        value.to_string()
    } else {
        format!("0x{value:X}")
    }
}

/// Enum declaration followed by its marshaller.
///
/// # Errors
/// Never fails today; the signature matches the other kind bodies.
pub fn write_enum(writer: &mut CodeWriter, _context: &BindingContext, definition: &EnumDefinition) -> Result<()> {
    let name = &definition.base.native_name;
    let underlying = definition.underlying.keyword().unwrap_or("int");

    if definition.flags.contains(TypeFlags::FLAGS_ENUM) {
        writer.line("[Flags]");
    }
    writer.open(format!("public enum {name} : {underlying}"));
    for field in &definition.fields {
        writer.line(format!("{} = {},", field.name, member_value(field.value)));
    }
    writer.close();
    writer.blank();

    writer.open(format!("public static class {name}Marshaller"));
    writer.line(format!("public const int NativeDataSize = sizeof({underlying});"));
    writer.blank();
    writer.line(format!(
        "public static {name} FromNative(IntPtr buffer, int offset, int index) => \
         ({name})BlittableMarshaller<{underlying}>.FromNative(buffer, offset, index);"
    ));
    writer.blank();
    writer.line(format!(
        "public static void ToNative(IntPtr buffer, int offset, int index, {name} value) => \
         BlittableMarshaller<{underlying}>.ToNative(buffer, offset, index, ({underlying})value);"
    ));
    writer.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{export::render, test::factories::sample_document};

    #[test]
    fn values() {
        assert_eq!(member_value(0), "0x0");
        assert_eq!(member_value(255), "0xFF");
        assert_eq!(member_value(-1), "-1");
        assert_eq!(member_value(i128::from(u64::MAX)), "0xFFFFFFFFFFFFFFFF");
        assert_eq!(member_value(i128::from(i64::MIN)), "-9223372036854775808");
    }

    #[test]
    fn sequential_enum() {
        let context = BindingContext::new(sample_document(), "out");
        let file = render(&context, context.document().get("WeaponMode").unwrap()).unwrap();
        assert!(file.contents.contains(
            "    public enum EWeaponMode : byte\n    {\n        None = 0x0,\n        Single = 0x1,\n        Burst = 0x2,\n    }\n"
        ));
        assert!(file.contents.contains("public static class EWeaponModeMarshaller"));
        assert!(!file.contents.contains("[Flags]"));
    }

    #[test]
    fn flags_enum() {
        let context = BindingContext::new(sample_document(), "out");
        let file = render(&context, context.document().get("DamageFlags").unwrap()).unwrap();
        assert!(file.contents.contains("    [Flags]\n    public enum EDamageFlags : int\n"));
        assert!(file.contents.contains("        Poison = 0x4,\n"));
    }
}

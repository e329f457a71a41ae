//! Classes and interfaces.
//!
//! A class carries everything a struct does plus a lazily resolved native type handle, property
//! accessors over the native object, function bodies on one of the two call paths, and nested
//! invokers for multicast delegate properties. Functions overriding a reflected base function are
//! inherited rather than redeclared.

use std::collections::BTreeSet;

use crate::{
    context::BindingContext,
    export::{
        functions::{self, FastPlan},
        identifier,
        native_api::{FIND_TYPE, NATIVE_OBJECT, OBJECT_BASE},
        structs::{property_slots, write_default_assignments, write_slot_fields, write_slot_resolution},
        write_doc,
        writer::CodeWriter,
    },
    model::{ClassDefinition, FunctionDefinition, FunctionFlags, PropertyFlags, TypeClass, TypeFlags},
    processors::Usage,
    Result,
};

/// Class declaration.
///
/// # Errors
/// Returns [`crate::Error::NoProcessor`] if a property or parameter kind has no registered
/// processor.
pub fn write_class(writer: &mut CodeWriter, context: &BindingContext, definition: &ClassDefinition) -> Result<()> {
    let structure = &definition.structure;
    let name = &structure.base.native_name;
    let registry = context.registry();

    let mut functions: Vec<(&FunctionDefinition, Option<FastPlan>)> = Vec::new();
    for function in &definition.functions {
        if function.flags.contains(FunctionFlags::OVERRIDDEN) {
            continue;
        }
        functions.push((function, functions::plan(context, function)?));
    }
    let delegates: Vec<_> = structure
        .properties
        .iter()
        .filter_map(|property| property.signature.as_deref().map(|signature| (property, signature)))
        .collect();

    let mut bases = vec![definition
        .super_type
        .as_ref()
        .map_or_else(|| OBJECT_BASE.to_string(), |super_type| super_type.native_name.clone())];
    bases.extend(definition.interfaces.iter().map(|interface| interface.native_name.clone()));
    let modifiers = if structure.flags.contains(TypeFlags::ABSTRACT) {
        "public abstract unsafe partial class"
    } else {
        "public unsafe partial class"
    };

    writer.open(format!("{modifiers} {name} : {}", bases.join(", ")));
    writer.line(format!("public const string NativePath = \"{}\";", structure.base.path));
    writer.line("static IntPtr s_NativeType;");
    writer.line(format!(
        "public static IntPtr NativeType => s_NativeType != IntPtr.Zero ? s_NativeType : (s_NativeType = {FIND_TYPE}(NativePath));"
    ));
    writer.blank();
    writer.open(format!("public {name}(IntPtr nativeObject) : base(nativeObject)"));
    writer.close();
    writer.blank();

    let mut declared = BTreeSet::new();
    for (property, signature) in &delegates {
        let Some(reference) = &property.reference else {
            continue;
        };
        if declared.insert(reference.native_name.as_str()) {
            functions::write_delegate_type(writer, context, property, signature)?;
        }
    }
    writer.blank();

    let slots = property_slots("", &structure.properties);
    write_slot_fields(writer, &slots);
    for (function, plan) in &functions {
        functions::write_fields(writer, function, plan.as_ref());
    }
    for (property, signature) in &delegates {
        if property.type_class == TypeClass::MulticastDelegate {
            functions::write_invoker_fields(writer, signature);
        }
    }
    writer.blank();

    writer.open(format!("static {name}()"));
    writer.line("IntPtr nativeType = NativeType;");
    write_slot_resolution(writer, "nativeType", &slots);
    for (function, plan) in &functions {
        if plan.is_none() {
            functions::write_resolution(writer, "nativeType", function);
        }
    }
    for (property, signature) in &delegates {
        if property.type_class == TypeClass::MulticastDelegate {
            functions::write_resolution(writer, "nativeType", signature);
        }
    }
    let direct: Vec<(&FunctionDefinition, &FastPlan)> = functions
        .iter()
        .filter_map(|(function, plan)| plan.as_ref().map(|plan| (*function, plan)))
        .collect();
    functions::write_function_table(writer, "nativeType", &direct);
    writer.close();
    writer.blank();

    for (property, slot) in structure.properties.iter().zip(&slots) {
        let processor = context.processor(property)?;
        let declaration = format!(
            "{} {} {}",
            context.schema().property_visibility(property.flags),
            registry.display_type(property, Usage::ClassField)?,
            identifier(property.name())
        );
        write_doc(writer, &property.base);

        let (getter, setter) = match processor.accessor_override(property, &slot.offset, registry)? {
            Some(accessor) => (accessor.getter, accessor.setter),
            None => {
                let getter = processor.read_text(property, NATIVE_OBJECT, &slot.offset, registry)?;
                let setter = if property.flags.contains(PropertyFlags::CONST) {
                    None
                } else {
                    Some(processor.write_text(property, NATIVE_OBJECT, &slot.offset, "value", registry)?)
                };
                (getter, setter)
            }
        };
        match setter {
            Some(setter) => {
                writer.open(declaration);
                writer.line(format!("get => {getter};"));
                writer.line(format!("set => {setter}"));
                writer.close();
            }
            None => writer.line(format!("{declaration} => {getter};")),
        }
        writer.blank();
    }

    if structure.flags.contains(TypeFlags::HAS_DEFAULTS) {
        writer.open("public void ApplyDefaults()");
        write_default_assignments(writer, &structure.properties);
        writer.close();
        writer.blank();
    }

    for (function, plan) in &functions {
        let target = if function.is_static() { "NativeType" } else { NATIVE_OBJECT };
        functions::write_function(writer, context, function, plan.as_ref(), target)?;
        writer.blank();
    }

    for (property, signature) in &delegates {
        if property.type_class == TypeClass::MulticastDelegate {
            functions::write_invoker(writer, context, property, signature)?;
            writer.blank();
        }
    }
    writer.close();
    Ok(())
}

/// Interface declaration, followed by its implementable companion when the schema asks for one.
///
/// # Errors
/// Returns [`crate::Error::NoProcessor`] if a parameter kind has no registered processor.
pub fn write_interface(writer: &mut CodeWriter, context: &BindingContext, definition: &ClassDefinition) -> Result<()> {
    let name = &definition.structure.base.native_name;
    let bases: Vec<&str> = definition
        .interfaces
        .iter()
        .map(|interface| interface.native_name.as_str())
        .collect();
    let header = if bases.is_empty() {
        format!("public partial interface {name}")
    } else {
        format!("public partial interface {name} : {}", bases.join(", "))
    };

    writer.open(header);
    for function in &definition.functions {
        write_doc(writer, &function.base);
        writer.line(format!(
            "{} {}({});",
            functions::return_type(context, function)?,
            identifier(function.name()),
            functions::parameter_list(context, function, Usage::InterfaceMember)?
        ));
    }
    writer.close();

    if context.schema().companion_interfaces() {
        writer.blank();
        writer.open(format!("public interface {name}_Implementation"));
        for function in &definition.functions {
            writer.line(format!(
                "{} {}_Implementation({});",
                functions::return_type(context, function)?,
                function.name(),
                functions::parameter_list(context, function, Usage::InterfaceMember)?
            ));
        }
        writer.close();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::BindingSchema,
        export::render,
        processors::{BoolProcessor, ProcessorRegistry},
        test::factories::sample_document,
        Error,
    };

    fn actor(context: &BindingContext) -> String {
        render(context, context.document().get("MyActor").unwrap())
            .unwrap()
            .contents
    }

    #[test]
    fn class_frame() {
        let context = BindingContext::new(sample_document(), "out");
        let text = actor(&context);

        assert!(text.contains("    public unsafe partial class AMyActor : AActor, IInteractable\n"));
        assert!(text.contains("        public const string NativePath = \"/Script/Game.MyActor\";\n"));
        assert!(text.contains("        public AMyActor(IntPtr nativeObject) : base(nativeObject)\n        {\n        }\n"));
        assert!(text.contains("        public delegate void FOnHit(float damage, AActor instigator);\n"));
        assert!(text.contains("            IntPtr nativeType = NativeType;\n"));
        assert!(!text.contains("ReceiveTick"));
        assert!(!text.contains("functionTable"));
    }

    #[test]
    fn accessors() {
        let context = BindingContext::new(sample_document(), "out");
        let text = actor(&context);

        assert!(text.contains(
            "        public float Health\n        {\n            \
             get => BlittableMarshaller<float>.FromNative(NativeObject, Health_Offset, 0);\n            \
             set => BlittableMarshaller<float>.ToNative(NativeObject, Health_Offset, 0, value);\n        }\n"
        ));
        assert!(text.contains("        protected UActorComponent Target\n"));
        assert!(text.contains("        public TArray<string> Tags\n"));
        assert!(text.contains("        static IntPtr Tags_NativeProperty;\n"));
        assert!(text.contains(
            "        public OnHitInvoker OnHit => new OnHitInvoker(NativeObject, OnHit_Offset);\n"
        ));
        assert!(text.contains(
            "        public void ApplyDefaults()\n        {\n            Health = 100.0f;\n            \
             Mode = EWeaponMode.Burst;\n            Label = \"Hero\";\n        }\n"
        ));
    }

    #[test]
    fn delegate_invoker() {
        let context = BindingContext::new(sample_document(), "out");
        let text = actor(&context);

        assert!(text.contains("        public unsafe struct OnHitInvoker\n"));
        assert!(text.contains("            public void Broadcast(float damage, AActor instigator)\n"));
        assert!(text.contains(
            "                NativeReflection.BroadcastDelegate(nativeObject, offset, (IntPtr)paramsBuffer, OnHit__DelegateSignature_ParamsSize);\n"
        ));
        assert!(text.contains(
            "            OnHit__DelegateSignature_NativeFunction = NativeReflection.FindFunction(nativeType, \"OnHit__DelegateSignature\");\n"
        ));
    }

    #[test]
    fn bulk_function_table() {
        let context = BindingContext::new(sample_document(), "out")
            .with_fast_invoke(["/Script/Game.MyActor:Reset", "/Script/Game.MyActor:Fire"]);
        let text = actor(&context);

        assert!(text.contains("            IntPtr* functionTable = stackalloc IntPtr[2];\n"));
        assert!(text.contains(
            "            NativeReflection.ResolveFunctionTable(nativeType, new[] { \"Fire\", \"Reset\" }, functionTable);\n"
        ));
        assert!(text.contains(
            "            Reset_NativePointer = (delegate* unmanaged<IntPtr, void>)functionTable[1];\n"
        ));
        assert!(text.contains("        static delegate* unmanaged<IntPtr, float, int*, byte> Fire_NativePointer;\n"));
        assert!(!text.contains("Reset_ParamsSize"));
        assert!(text.contains("OnRep_Health_ParamsSize"));
    }

    #[test]
    fn static_library_function() {
        let context = BindingContext::new(sample_document(), "out");
        let file = render(&context, context.document().get("DamageLibrary").unwrap()).unwrap();
        let text = &file.contents;

        assert!(text.contains("    public unsafe partial class UDamageLibrary : UBlueprintFunctionLibrary\n"));
        assert!(text.contains("        public static float ComputeDamage(FDamageInfo info)\n"));
        assert!(text.contains(
            "            NativeReflection.InvokeFunction(NativeType, ComputeDamage_NativeFunction, (IntPtr)paramsBuffer, ComputeDamage_ParamsSize);\n"
        ));
        assert!(text.contains(
            "            FDamageInfoMarshaller.ToNative((IntPtr)paramsBuffer, ComputeDamage_info_Offset, 0, info);\n"
        ));
    }

    #[test]
    fn interface_declarations() {
        let context = BindingContext::new(sample_document(), "out");
        let interactable = context.document().get("Interactable").unwrap();
        let file = render(&context, interactable).unwrap();
        assert_eq!(
            file.path,
            std::path::PathBuf::from("out/Game/Interfaces/IInteractable.generated.cs")
        );
        assert!(file.contents.contains(
            "    public partial interface IInteractable\n    {\n        void Interact(AActor instigator);\n    }\n"
        ));
        assert!(!file.contents.contains("_Implementation"));

        let context = BindingContext::new(sample_document(), "out").with_schema(BindingSchema::Managed);
        let file = render(&context, context.document().get("Interactable").unwrap()).unwrap();
        assert!(file.contents.contains(
            "    public interface IInteractable_Implementation\n    {\n        void Interact_Implementation(AActor instigator);\n    }\n"
        ));
        assert!(file.contents.contains("[ManagedBinding(\"/Script/Game.Interactable\")]"));
    }

    #[test]
    fn no_processor_on_class() {
        let context = BindingContext::new(sample_document(), "out")
            .with_registry(ProcessorRegistry::new().register(BoolProcessor));
        assert!(matches!(
            render(&context, context.document().get("MyActor").unwrap()),
            Err(Error::NoProcessor { .. })
        ));
    }
}

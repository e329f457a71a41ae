//! Function bodies: the generic buffer path, the direct native call path and delegate invokers.

use crate::{
    context::BindingContext,
    export::{
        identifier,
        native_api::{
            BROADCAST_DELEGATE, FIND_FUNCTION, GET_FUNCTION_PARAMS_SIZE, INVOKE_FUNCTION, PARAMS_BUFFER,
            RESOLVE_FUNCTION_TABLE, RESULT_LOCAL,
        },
        structs::{property_slots, write_slot_fields, write_slot_resolution, OffsetSlot},
        write_doc,
        writer::CodeWriter,
    },
    model::{FunctionDefinition, FunctionFlags, PropertyDefinition, PropertyFlags},
    processors::{DelegateProcessor, FastInvokeParam, Usage},
    Result,
};

/// Direct-call conventions of every parameter and the return value of one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FastPlan {
    parameters: Vec<FastInvokeParam>,
    return_value: Option<FastInvokeParam>,
}

impl FastPlan {
    /// Unmanaged function-pointer type, the target handle first.
    pub(crate) fn pointer_type(&self) -> String {
        let mut slots = vec!["IntPtr".to_string()];
        slots.extend(self.parameters.iter().map(|param| param.native_type.clone()));
        slots.push(
            self.return_value
                .as_ref()
                .map_or_else(|| "void".to_string(), |ret| ret.native_type.clone()),
        );
        format!("delegate* unmanaged<{}>", slots.join(", "))
    }
}

/// Direct-call plan of `function`, `None` if it takes the generic path.
///
/// Functions outside the fast-invoke set always take the generic path. A listed function falls
/// back to it, with a warning, when one of its values has no direct-call convention.
pub(crate) fn plan(context: &BindingContext, function: &FunctionDefinition) -> Result<Option<FastPlan>> {
    if !context.is_fast_invoke(function) {
        return Ok(None);
    }

    let mut parameters = Vec::with_capacity(function.parameters.len());
    for property in &function.parameters {
        let Some(param) = direct_call(context, function, property)? else {
            return Ok(None);
        };
        parameters.push(param);
    }
    let return_value = match &function.return_value {
        Some(property) => match direct_call(context, function, property)? {
            Some(param) => Some(param),
            None => return Ok(None),
        },
        None => None,
    };

    Ok(Some(FastPlan {
        parameters,
        return_value,
    }))
}

fn direct_call(
    context: &BindingContext,
    function: &FunctionDefinition,
    property: &PropertyDefinition,
) -> Result<Option<FastInvokeParam>> {
    let param = context
        .processor(property)?
        .fast_invoke(property, context.registry())?;
    if param.is_none() {
        log::warn!(
            "'{}' takes the generic call path: '{}' ({}) has no direct-call convention",
            function.base.path,
            property.name(),
            property.type_class
        );
    }
    Ok(param)
}

/// Prefix of the static slots belonging to `function`.
fn prefix(function: &FunctionDefinition) -> String {
    format!("{}_", function.name())
}

/// Managed parameter list of `function`.
pub(crate) fn parameter_list(context: &BindingContext, function: &FunctionDefinition, usage: Usage) -> Result<String> {
    let mut parameters = Vec::with_capacity(function.parameters.len());
    for property in &function.parameters {
        let modifier = if property.flags.contains(PropertyFlags::OUT) {
            "out "
        } else if property.flags.contains(PropertyFlags::REFERENCE) {
            "ref "
        } else {
            ""
        };
        parameters.push(format!(
            "{modifier}{} {}",
            context.registry().display_type(property, usage)?,
            identifier(property.name())
        ));
    }
    Ok(parameters.join(", "))
}

/// Managed return type of `function`.
pub(crate) fn return_type(context: &BindingContext, function: &FunctionDefinition) -> Result<String> {
    match &function.return_value {
        Some(property) => context.registry().display_type(property, Usage::ReturnValue),
        None => Ok("void".to_string()),
    }
}

/// Static slots of a function on the generic path.
fn generic_slots(function: &FunctionDefinition) -> Vec<OffsetSlot> {
    property_slots(&prefix(function), function.properties())
}

/// Static fields backing `function`.
pub(crate) fn write_fields(writer: &mut CodeWriter, function: &FunctionDefinition, plan: Option<&FastPlan>) {
    let prefix = prefix(function);
    match plan {
        Some(plan) => writer.line(format!("static {} {prefix}NativePointer;", plan.pointer_type())),
        None => {
            writer.line(format!("static IntPtr {prefix}NativeFunction;"));
            writer.line(format!("static int {prefix}ParamsSize;"));
            write_slot_fields(writer, &generic_slots(function));
        }
    }
}

/// Statements resolving the generic-path handles of `function` against `owner`.
pub(crate) fn write_resolution(writer: &mut CodeWriter, owner: &str, function: &FunctionDefinition) {
    let prefix = prefix(function);
    let handle = format!("{prefix}NativeFunction");
    writer.line(format!(
        "{handle} = {FIND_FUNCTION}({owner}, \"{}\");",
        function.base.native_name
    ));
    writer.line(format!("{prefix}ParamsSize = {GET_FUNCTION_PARAMS_SIZE}({handle});"));
    write_slot_resolution(writer, &handle, &generic_slots(function));
}

/// One bulk lookup binding the pointer slot of every direct-call function.
pub(crate) fn write_function_table(writer: &mut CodeWriter, owner: &str, functions: &[(&FunctionDefinition, &FastPlan)]) {
    if functions.is_empty() {
        return;
    }
    let names: Vec<String> = functions
        .iter()
        .map(|(function, _)| format!("\"{}\"", function.base.native_name))
        .collect();
    writer.line(format!("IntPtr* functionTable = stackalloc IntPtr[{}];", functions.len()));
    writer.line(format!(
        "{RESOLVE_FUNCTION_TABLE}({owner}, new[] {{ {} }}, functionTable);",
        names.join(", ")
    ));
    for (index, (function, plan)) in functions.iter().enumerate() {
        writer.line(format!(
            "{}NativePointer = ({})functionTable[{index}];",
            prefix(function),
            plan.pointer_type()
        ));
    }
}

/// Method declaration and body of `function`, called on `target`.
///
/// # Errors
/// Returns [`crate::Error::NoProcessor`] if a parameter kind has no registered processor.
pub(crate) fn write_function(
    writer: &mut CodeWriter,
    context: &BindingContext,
    function: &FunctionDefinition,
    plan: Option<&FastPlan>,
    target: &str,
) -> Result<()> {
    let mut modifiers = vec![context.schema().function_visibility(function.flags)];
    if function.is_static() {
        modifiers.push("static");
    } else if function.flags.contains(FunctionFlags::VIRTUAL) {
        modifiers.push("virtual");
    }

    write_doc(writer, &function.base);
    writer.open(format!(
        "{} {} {}({})",
        modifiers.join(" "),
        return_type(context, function)?,
        identifier(function.name()),
        parameter_list(context, function, Usage::Parameter)?
    ));
    match plan {
        Some(plan) => write_direct_call(writer, function, plan, target),
        None => {
            let prefix = prefix(function);
            let invoke = format!(
                "{INVOKE_FUNCTION}({target}, {prefix}NativeFunction, (IntPtr){PARAMS_BUFFER}, {prefix}ParamsSize);"
            );
            write_buffer_call(writer, context, function, &prefix, &invoke)?;
        }
    }
    writer.close();
    Ok(())
}

fn write_direct_call(writer: &mut CodeWriter, function: &FunctionDefinition, plan: &FastPlan, target: &str) {
    let mut arguments = vec![target.to_string()];
    for param in &plan.parameters {
        for line in &param.pre {
            writer.line(line);
        }
        arguments.push(param.argument.clone());
    }

    let call = format!("{}NativePointer({})", prefix(function), arguments.join(", "));
    match &plan.return_value {
        Some(ret) => writer.line(format!("{} {RESULT_LOCAL} = {call};", ret.native_type)),
        None => writer.line(format!("{call};")),
    }

    for param in &plan.parameters {
        for line in &param.post {
            writer.line(line);
        }
    }
    if let Some(ret) = &plan.return_value {
        writer.line(format!("return {};", ret.argument));
    }
}

/// Stack parameter block, marshaled in and out around `invoke`.
fn write_buffer_call(
    writer: &mut CodeWriter,
    context: &BindingContext,
    function: &FunctionDefinition,
    prefix: &str,
    invoke: &str,
) -> Result<()> {
    let registry = context.registry();
    let buffer = format!("(IntPtr){PARAMS_BUFFER}");

    writer.line(format!("byte* {PARAMS_BUFFER} = stackalloc byte[{prefix}ParamsSize];"));
    for property in &function.parameters {
        if property.flags.contains(PropertyFlags::OUT) {
            continue;
        }
        let slot = OffsetSlot::for_property(prefix, property);
        writer.line(context.processor(property)?.write_text(
            property,
            &buffer,
            &slot.offset,
            &identifier(property.name()),
            registry,
        )?);
    }
    writer.line(invoke);

    for property in function.parameters.iter().filter(|property| property.is_out()) {
        let slot = OffsetSlot::for_property(prefix, property);
        let read = context
            .processor(property)?
            .read_text(property, &buffer, &slot.offset, registry)?;
        writer.line(format!("{} = {read};", identifier(property.name())));
    }
    if let Some(property) = &function.return_value {
        let slot = OffsetSlot::for_property(prefix, property);
        let read = context
            .processor(property)?
            .read_text(property, &buffer, &slot.offset, registry)?;
        writer.line(format!("return {read};"));
    }
    Ok(())
}

/// Static fields of the callback shape behind a delegate property.
pub(crate) fn write_invoker_fields(writer: &mut CodeWriter, signature: &FunctionDefinition) {
    write_fields(writer, signature, None);
}

/// Nested invoker type of a multicast delegate property.
///
/// # Errors
/// Returns [`crate::Error::NoProcessor`] if a parameter kind has no registered processor.
pub(crate) fn write_invoker(
    writer: &mut CodeWriter,
    context: &BindingContext,
    property: &PropertyDefinition,
    signature: &FunctionDefinition,
) -> Result<()> {
    let name = DelegateProcessor::invoker_name(property);
    writer.open(format!("public unsafe struct {name}"));
    writer.line("readonly IntPtr nativeObject;");
    writer.line("readonly int offset;");
    writer.blank();

    writer.open(format!("public {name}(IntPtr nativeObject, int offset)"));
    writer.line("this.nativeObject = nativeObject;");
    writer.line("this.offset = offset;");
    writer.close();
    writer.blank();

    let prefix = prefix(signature);
    writer.open(format!(
        "public void Broadcast({})",
        parameter_list(context, signature, Usage::Parameter)?
    ));
    let invoke = format!(
        "{BROADCAST_DELEGATE}(nativeObject, offset, (IntPtr){PARAMS_BUFFER}, {prefix}ParamsSize);"
    );
    write_buffer_call(writer, context, signature, &prefix, &invoke)?;
    writer.close();
    writer.close();
    Ok(())
}

/// Managed delegate type declaring the callback shape `signature` of `property`.
///
/// # Errors
/// Returns [`crate::Error::NoProcessor`] if a parameter kind has no registered processor.
pub(crate) fn write_delegate_type(
    writer: &mut CodeWriter,
    context: &BindingContext,
    property: &PropertyDefinition,
    signature: &FunctionDefinition,
) -> Result<()> {
    let Some(reference) = &property.reference else {
        return Err(internal_error!(
            "Delegate property '{}' has no type reference",
            property.base.path
        ));
    };
    writer.line(format!(
        "public delegate {} {}({});",
        return_type(context, signature)?,
        reference.native_name,
        parameter_list(context, signature, Usage::Parameter)?
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::TypeDefinition,
        test::factories::{primitive_property, sample_document},
    };

    fn actor_function<'a>(context: &'a BindingContext, name: &str) -> &'a FunctionDefinition {
        let TypeDefinition::Class(actor) = context.document().get("MyActor").unwrap() else {
            panic!("MyActor is a class");
        };
        actor.function(name).unwrap()
    }

    fn body(context: &BindingContext, name: &str) -> String {
        let function = actor_function(context, name);
        let plan = plan(context, function).unwrap();
        let mut writer = CodeWriter::new();
        write_function(&mut writer, context, function, plan.as_ref(), "NativeObject").unwrap();
        writer.into_string()
    }

    #[test]
    fn zero_arity_direct_call() {
        let context = BindingContext::new(sample_document(), "out")
            .with_fast_invoke(["/Script/Game.MyActor:Reset"]);
        assert_eq!(
            body(&context, "Reset"),
            "public void Reset()\n{\n    Reset_NativePointer(NativeObject);\n}\n"
        );

        let plan = plan(&context, actor_function(&context, "Reset")).unwrap().unwrap();
        assert_eq!(plan.pointer_type(), "delegate* unmanaged<IntPtr, void>");
    }

    #[test]
    fn generic_path_regardless_of_arity() {
        let context = BindingContext::new(sample_document(), "out");
        assert_eq!(
            body(&context, "Reset"),
            "public void Reset()\n{\n    byte* paramsBuffer = stackalloc byte[Reset_ParamsSize];\n    \
             NativeReflection.InvokeFunction(NativeObject, Reset_NativeFunction, (IntPtr)paramsBuffer, Reset_ParamsSize);\n}\n"
        );
    }

    #[test]
    fn generic_out_parameters() {
        let context = BindingContext::new(sample_document(), "out");
        let text = body(&context, "Fire");
        assert!(text.starts_with("public bool Fire(float power, out int shots)\n"));
        assert!(text.contains(
            "    BlittableMarshaller<float>.ToNative((IntPtr)paramsBuffer, Fire_power_Offset, 0, power);\n"
        ));
        assert!(!text.contains("Fire_shots_Offset, 0, shots)"));
        assert!(text.contains(
            "    shots = BlittableMarshaller<int>.FromNative((IntPtr)paramsBuffer, Fire_shots_Offset, 0);\n"
        ));
        assert!(text.contains(
            "    return BoolMarshaller.FromNative((IntPtr)paramsBuffer, Fire_ReturnValue_Offset, 0);\n"
        ));
    }

    #[test]
    fn direct_call_out_parameters() {
        let context = BindingContext::new(sample_document(), "out")
            .with_fast_invoke(["/Script/Game.MyActor:Fire"]);
        assert_eq!(
            body(&context, "Fire"),
            "public bool Fire(float power, out int shots)\n{\n    \
             int shots_Native = default;\n    \
             byte __result = Fire_NativePointer(NativeObject, power, &shots_Native);\n    \
             shots = shots_Native;\n    \
             return __result != 0;\n}\n"
        );
    }

    #[test]
    fn fallback_without_convention() {
        let context = BindingContext::new(sample_document(), "out")
            .with_fast_invoke(["/Script/Game.MyActor:Interact", "/Script/Game.MyActor:Fire"]);
        assert!(plan(&context, actor_function(&context, "Interact")).unwrap().is_some());

        let mut fire = actor_function(&context, "Fire").clone();
        fire.parameters
            .push(primitive_property("caption", crate::model::TypeClass::Text));
        assert!(plan(&context, &fire).unwrap().is_none());

        let mut writer = CodeWriter::new();
        write_function(&mut writer, &context, &fire, None, "NativeObject").unwrap();
        assert!(writer.as_str().contains("stackalloc byte[Fire_ParamsSize]"));
    }

    #[test]
    fn function_fields() {
        let context = BindingContext::new(sample_document(), "out");
        let fire = actor_function(&context, "Fire");
        let mut writer = CodeWriter::new();
        write_fields(&mut writer, fire, None);
        write_resolution(&mut writer, "nativeType", fire);
        let text = writer.into_string();
        assert!(text.starts_with("static IntPtr Fire_NativeFunction;\nstatic int Fire_ParamsSize;\n"));
        assert!(text.contains("Fire_NativeFunction = NativeReflection.FindFunction(nativeType, \"Fire\");\n"));
        assert!(text.contains("Fire_ParamsSize = NativeReflection.GetFunctionParamsSize(Fire_NativeFunction);\n"));
        assert!(text.contains("NativeReflection.FindMember(Fire_NativeFunction, \"power\")"));
    }
}

//! Source exporters and the code writer.
//!
//! Every entity is rendered by the same pipeline: banner, imports, namespace, doc comment, then
//! the kind-specific body supplied by [`enums`], [`structs`] or [`classes`]. Rendering only
//! reads the [`BindingContext`], so entities can be rendered in parallel; [`writer::save`] then
//! skips files whose bytes are already up to date.
//!
//! # Key Components
//!
//! - [`render`] / [`export`] - Entry points for one entity
//! - [`writer::CodeWriter`] - Indentation-scoped text buffer
//! - [`native_api`] - Runtime entry points the emitted sources call
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use bindweaver::context::BindingContext;
//! use bindweaver::export::export;
//! # fn demo(document: bindweaver::model::TypeDefinitionDocument) -> bindweaver::Result<()> {
//! let context = BindingContext::new(document, "Generated");
//! for definition in context.document().iter() {
//!     let (path, outcome) = export(&context, definition)?;
//!     println!("{}: {outcome:?}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod classes;
pub mod enums;
mod functions;
pub mod native_api;
pub mod structs;
pub mod writer;

use std::path::PathBuf;

use crate::{
    context::BindingContext,
    model::{BaseDefinition, TypeDefinition},
    Result,
};

use writer::{CodeWriter, SaveOutcome};

/// First lines of every emitted file.
pub const BANNER: [&str; 4] = [
    "// <auto-generated>",
    "//     This file was generated by bindweaver.",
    "//     Changes to this file will be lost when the bindings are regenerated.",
    "// </auto-generated>",
];

/// Namespaces imported by every emitted file, before the entity's own dependencies.
pub const STANDARD_IMPORTS: [&str; 4] = [
    "System",
    "System.Collections.Generic",
    "System.Runtime.InteropServices",
    native_api::RUNTIME_NAMESPACE,
];

/// A rendered entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    /// Destination below the output root
    pub path: PathBuf,
    /// Source text
    pub contents: String,
}

/// Render `definition` without touching the file system.
///
/// # Errors
/// Returns [`crate::Error::NoProcessor`] if a property kind has no registered processor.
pub fn render(context: &BindingContext, definition: &TypeDefinition) -> Result<ExportedFile> {
    let mut writer = CodeWriter::new();
    match definition {
        TypeDefinition::Enum(enumeration) => compose(&mut writer, context, definition, |writer| {
            enums::write_enum(writer, context, enumeration)
        })?,
        TypeDefinition::Struct(structure) => compose(&mut writer, context, definition, |writer| {
            structs::write_struct(writer, context, structure)
        })?,
        TypeDefinition::Class(class) if class.is_interface() => {
            compose(&mut writer, context, definition, |writer| {
                classes::write_interface(writer, context, class)
            })?;
        }
        TypeDefinition::Class(class) => compose(&mut writer, context, definition, |writer| {
            classes::write_class(writer, context, class)
        })?,
    }

    Ok(ExportedFile {
        path: context.output_path(definition),
        contents: writer.into_string(),
    })
}

/// Render `definition` and save it, leaving an identical existing file untouched.
///
/// # Errors
/// Returns the rendering error, or [`crate::Error::FileError`] if the file cannot be written.
pub fn export(context: &BindingContext, definition: &TypeDefinition) -> Result<(PathBuf, SaveOutcome)> {
    let file = render(context, definition)?;
    let outcome = writer::save(&file.path, &file.contents)?;
    Ok((file.path, outcome))
}

/// The shared pipeline around a kind-specific `body`.
fn compose<F>(writer: &mut CodeWriter, context: &BindingContext, definition: &TypeDefinition, body: F) -> Result<()>
where
    F: FnOnce(&mut CodeWriter) -> Result<()>,
{
    let base = definition.base();
    for line in BANNER {
        writer.line(line);
    }
    writer.blank();

    for import in STANDARD_IMPORTS {
        writer.line(format!("using {import};"));
    }
    if let Some(structure) = definition.structure() {
        for namespace in &structure.dependencies {
            if !STANDARD_IMPORTS.contains(&namespace.as_str()) {
                writer.line(format!("using {namespace};"));
            }
        }
    }
    writer.blank();

    writer.open(format!("namespace {}", base.namespace));
    write_doc(writer, base);
    writer.line(format!(
        "[{}(\"{}\")]",
        context.schema().attribute(),
        base.path
    ));
    body(writer)?;
    writer.close();
    Ok(())
}

/// Doc comment from the `ToolTip` metadata, falling back to `DisplayName`.
pub(crate) fn write_doc(writer: &mut CodeWriter, base: &BaseDefinition) {
    if let Some(text) = base.metadata("ToolTip").or_else(|| base.metadata("DisplayName")) {
        writer.doc_comment(text);
    }
}

const RESERVED: [&str; 30] = [
    "base", "bool", "byte", "case", "char", "checked", "class", "const", "default", "delegate",
    "do", "double", "event", "fixed", "float", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "object", "out", "params", "ref", "string", "this", "value",
];

/// `name` as a managed identifier, `@`-escaped if it is a reserved word.
#[must_use]
pub fn identifier(name: &str) -> String {
    if RESERVED.contains(&name) {
        format!("@{name}")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::factories::sample_document;

    #[test]
    fn pipeline_frame() {
        let context = BindingContext::new(sample_document(), "out");
        let actor = context.document().get("MyActor").unwrap();
        let file = render(&context, actor).unwrap();

        assert_eq!(file.path, PathBuf::from("out/Game/Actors/Classes/AMyActor.generated.cs"));
        let text = &file.contents;
        assert!(text.starts_with("// <auto-generated>\n"));
        assert!(text.contains("using Bindweaver.Runtime;\nusing Engine;\nusing Game;\n"));
        assert!(text.contains("namespace Game.Actors\n{\n"));
        assert!(text.contains("    /// <summary>\n    /// My Actor\n    /// </summary>\n"));
        assert!(text.contains("    [NativeBinding(\"/Script/Game.MyActor\")]\n"));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn render_is_stable() {
        let context = BindingContext::new(sample_document(), "out");
        for definition in context.document().iter() {
            let first = render(&context, definition).unwrap();
            let second = render(&context, definition).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn reserved_identifiers() {
        assert_eq!(identifier("object"), "@object");
        assert_eq!(identifier("instigator"), "instigator");
    }
}

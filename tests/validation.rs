//! Binding rule violations surface as one batched `Error::Validation` before anything is written.

mod common;

use bindweaver::{
    bindings::ErrorKind,
    metadata::builder::{Attribute, Field, ModuleBuilder, Ty, TypeDef},
    Error, Generator, Result,
};
use common::{marker, uproperty, Workspace};

fn enum_module(name: &str, values: &[i64]) -> ModuleBuilder {
    let mut enumeration = TypeDef::enumeration("Game", name, Ty::U1).attribute(marker("UEnum"));
    for (index, value) in values.iter().enumerate() {
        enumeration = enumeration.variant(&format!("Value{index}"), *value);
    }
    let mut builder = ModuleBuilder::new("Game");
    builder.add_type(enumeration);
    builder
}

fn validation_errors(workspace: &Workspace, builder: &ModuleBuilder) -> Result<Vec<ErrorKind>> {
    let module = workspace.write("Game", builder)?;
    let generator = Generator::new(workspace.config(&module, "out"));
    match generator.run() {
        Err(Error::Validation(errors)) => {
            assert!(!workspace.path().join("out").exists());
            Ok(errors.iter().map(|error| error.kind).collect())
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn sequential_enum_is_accepted() -> Result<()> {
    let workspace = Workspace::new()?;
    let module = workspace.write("Game", &enum_module("EStage", &[0, 1, 2, 3]))?;
    let report = Generator::new(workspace.config(&module, "out")).run()?;
    assert_eq!(report.processed, 1);
    Ok(())
}

#[test]
fn gap_in_enum_is_rejected() -> Result<()> {
    let workspace = Workspace::new()?;
    let kinds = validation_errors(&workspace, &enum_module("EStage", &[0, 1, 3]))?;
    assert_eq!(kinds, [ErrorKind::EnumValueSequence]);
    Ok(())
}

#[test]
fn flags_enum_may_skip_values() -> Result<()> {
    let workspace = Workspace::new()?;
    let mut builder = ModuleBuilder::new("Game");
    builder.add_type(
        TypeDef::enumeration("Game", "EChannels", Ty::I4)
            .attribute(marker("UEnum"))
            .attribute(Attribute::new("System.FlagsAttribute"))
            .variant("None", 0)
            .variant("Audio", 1)
            .variant("Video", 4),
    );
    let module = workspace.write("Game", &builder)?;
    let report = Generator::new(workspace.config(&module, "out")).run()?;
    assert_eq!(report.processed, 1);
    Ok(())
}

#[test]
fn display_names_must_be_unique() -> Result<()> {
    let workspace = Workspace::new()?;
    let mut builder = ModuleBuilder::new("Game");
    for namespace in ["Game.Inventory", "Game.Combat"] {
        builder.add_type(
            TypeDef::structure(namespace, "FFoo")
                .attribute(marker("UStruct"))
                .field(Field::new("Value", Ty::I4).public().attribute(uproperty())),
        );
    }
    let kinds = validation_errors(&workspace, &builder)?;
    assert_eq!(kinds, [ErrorKind::NameCollision]);
    Ok(())
}

#[test]
fn every_violation_is_reported() -> Result<()> {
    let workspace = Workspace::new()?;
    let mut builder = ModuleBuilder::new("Game");
    builder
        .add_type(
            TypeDef::structure("Game", "Counter")
                .attribute(marker("UStruct"))
                .field(Field::new("Value", Ty::I4).public().attribute(uproperty())),
        )
        .add_type(
            TypeDef::enumeration("Game", "Stage", Ty::U1)
                .attribute(marker("UEnum"))
                .variant("First", 0),
        );

    let kinds = validation_errors(&workspace, &builder)?;
    assert!(kinds.contains(&ErrorKind::InvalidStructName));
    assert!(kinds.contains(&ErrorKind::InvalidEnumName));
    assert_eq!(kinds.len(), 2);
    Ok(())
}

#[test]
fn missing_module_reference_is_fatal() -> Result<()> {
    let workspace = Workspace::new()?;
    let mut builder = ModuleBuilder::new("Game");
    builder.add_type(
        TypeDef::class("Game", "UWidget")
            .extends_class("[Missing]Missing.UBase")
            .attribute(marker("UClass")),
    );
    let module = workspace.write("Game", &builder)?;

    match Generator::new(workspace.config(&module, "out")).run() {
        Err(Error::UnresolvedReference { reference, module }) => {
            assert_eq!(reference, "Missing");
            assert_eq!(module, "Game");
        }
        other => panic!("expected an unresolved reference, got {other:?}"),
    }
    Ok(())
}

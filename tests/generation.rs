//! End-to-end generation runs over modules written to a temporary directory.
//!
//! These tests only use the public API: modules are authored with `ModuleBuilder`, loaded back
//! through the search paths and rendered by `Generator`.

mod common;

use std::fs;

use bindweaver::{
    context::{BindingContext, BindingSchema},
    export,
    metadata::builder::{Field, Method, ModuleBuilder, Param, Ty, TypeDef},
    processors::{BoolProcessor, ProcessorRegistry},
    Error, Generator, Result,
};
use common::{emitted, engine, engine_generic, marker, ufunction, uproperty, Workspace};

fn game_module() -> ModuleBuilder {
    let mut builder = ModuleBuilder::new("Game");
    builder
        .add_type(
            TypeDef::enumeration("Game", "EWeaponMode", Ty::U1)
                .attribute(marker("UEnum"))
                .variant("None", 0)
                .variant("Single", 1)
                .variant("Burst", 2),
        )
        .add_type(
            TypeDef::structure("Game", "FCounter")
                .attribute(marker("UStruct"))
                .field(Field::new("Count", Ty::I4).public().attribute(uproperty()))
                .field(Field::new("Label", Ty::String).public().attribute(uproperty())),
        )
        .add_type(
            TypeDef::class("Game", "AHero")
                .extends(engine("AActor"))
                .attribute(marker("UClass"))
                .field(Field::new("Health", Ty::R4).public().attribute(uproperty()))
                .field(
                    Field::new("Scores", engine_generic("TMap`2", vec![Ty::String, Ty::I4]))
                        .public()
                        .attribute(uproperty()),
                )
                .field(
                    Field::new("Mode", Ty::value("Game.EWeaponMode"))
                        .public()
                        .attribute(uproperty()),
                )
                .method(Method::new("Reset", Ty::Void).attribute(ufunction()))
                .method(
                    Method::new("Heal", Ty::Void)
                        .param(Param::new("amount", Ty::R4))
                        .attribute(ufunction()),
                ),
        );
    builder
}

#[test]
fn second_run_leaves_files_untouched() -> Result<()> {
    let workspace = Workspace::new()?;
    let module = workspace.write("Game", &game_module())?;
    let generator = Generator::new(workspace.config(&module, "out"));

    let first = generator.run()?;
    assert_eq!(first.processed, 3);
    assert_eq!(first.written, 3);
    assert_eq!(first.unchanged, 0);

    let before: Vec<_> = first
        .files
        .iter()
        .map(|path| fs::read(path).map(|bytes| (path.clone(), bytes)))
        .collect::<std::io::Result<_>>()?;

    let second = generator.run()?;
    assert_eq!(second.written, 0);
    assert_eq!(second.unchanged, 3);
    for (path, bytes) in before {
        assert_eq!(fs::read(&path)?, bytes, "{} changed", path.display());
    }
    Ok(())
}

#[test]
fn output_does_not_depend_on_location_or_threads() -> Result<()> {
    let workspace = Workspace::new()?;
    let module = workspace.write("Game", &game_module())?;

    let parallel = Generator::new(workspace.config(&module, "first")).run()?;
    let sequential = Generator::new(workspace.config(&module, "second").parallel(false)).run()?;
    assert_eq!(parallel.files.len(), sequential.files.len());

    for (left, right) in parallel.files.iter().zip(&sequential.files) {
        assert_eq!(
            left.strip_prefix(workspace.path().join("first")).unwrap(),
            right.strip_prefix(workspace.path().join("second")).unwrap()
        );
        assert_eq!(fs::read(left)?, fs::read(right)?);
    }
    Ok(())
}

#[test]
fn identifiers_are_stable_across_loads() -> Result<()> {
    let workspace = Workspace::new()?;
    let module = workspace.write("Game", &game_module())?;
    let generator = Generator::new(workspace.config(&module, "out"));

    let first = generator.document()?;
    let second = generator.document()?;
    for (left, right) in first.iter().zip(second.iter()) {
        assert_eq!(left.base().guid, right.base().guid);
        assert_eq!(left.base().checksum, right.base().checksum);
    }

    let counter = first.get("Counter").unwrap().base();
    let hero = first.get("Hero").unwrap().base();
    assert_ne!(counter.guid, hero.guid);
    Ok(())
}

#[test]
fn export_layout() -> Result<()> {
    let workspace = Workspace::new()?;
    let module = workspace.write("Game", &game_module())?;
    let report = Generator::new(workspace.config(&module, "out")).run()?;

    let out = workspace.path().join("out");
    assert_eq!(
        report.files,
        [
            out.join("Game/Enums/EWeaponMode.generated.cs"),
            out.join("Game/Structs/FCounter.generated.cs"),
            out.join("Game/Classes/AHero.generated.cs"),
        ]
    );

    let text = emitted(&report.files, "FCounter.generated.cs");
    assert!(text.starts_with("// <auto-generated>"));
    assert!(!text.contains(&workspace.path().display().to_string()));
    Ok(())
}

#[test]
fn map_keeps_key_and_value_order() -> Result<()> {
    let workspace = Workspace::new()?;
    let module = workspace.write("Game", &game_module())?;
    let report = Generator::new(workspace.config(&module, "out")).run()?;

    let text = emitted(&report.files, "AHero.generated.cs");
    assert!(text.contains("        public TMap<string, int> Scores\n"));
    assert!(text.contains("MapMarshaller<string, StringMarshaller, int, BlittableMarshaller<int>>"));
    assert!(text.contains("        static IntPtr Scores_NativeProperty;\n"));
    Ok(())
}

#[test]
fn fast_invoke_selects_direct_calls() -> Result<()> {
    let workspace = Workspace::new()?;
    let module = workspace.write("Game", &game_module())?;
    let report = Generator::new(
        workspace
            .config(&module, "out")
            .fast_invoke(["/Script/Game.Hero:Heal"]),
    )
    .run()?;

    let text = emitted(&report.files, "AHero.generated.cs");
    assert!(text.contains("        static delegate* unmanaged<IntPtr, float, void> Heal_NativePointer;\n"));
    assert!(text.contains("            Heal_NativePointer(NativeObject, amount);\n"));
    assert!(text.contains(
        "            NativeReflection.ResolveFunctionTable(nativeType, new[] { \"Heal\" }, functionTable);\n"
    ));
    assert!(!text.contains("Heal_ParamsSize"));

    // Functions outside the set keep the generic buffer path.
    assert!(text.contains("            byte* paramsBuffer = stackalloc byte[Reset_ParamsSize];\n"));
    Ok(())
}

#[test]
fn schema_tags_every_type() -> Result<()> {
    let workspace = Workspace::new()?;
    let module = workspace.write("Game", &game_module())?;
    let native = Generator::new(workspace.config(&module, "native")).run()?;
    let blueprint = Generator::new(
        workspace
            .config(&module, "blueprint")
            .schema(BindingSchema::Blueprint),
    )
    .run()?;

    let native_enum = emitted(&native.files, "EWeaponMode.generated.cs");
    let blueprint_enum = emitted(&blueprint.files, "EWeaponMode.generated.cs");
    assert!(native_enum.contains("    [NativeBinding(\"/Script/Game.WeaponMode\")]\n"));
    assert!(blueprint_enum.contains("    [BlueprintBinding(\"/Script/Game.WeaponMode\")]\n"));
    assert_eq!(
        native_enum.replace("NativeBinding", "BlueprintBinding"),
        blueprint_enum
    );
    Ok(())
}

#[test]
fn unregistered_kind_fails_with_owner_and_member() -> Result<()> {
    let workspace = Workspace::new()?;
    let module = workspace.write("Game", &game_module())?;
    let generator = Generator::new(workspace.config(&module, "out"));

    let context = BindingContext::new(generator.document()?, workspace.path().join("out"))
        .with_registry(ProcessorRegistry::new().register(BoolProcessor));
    let counter = context.document().get("Counter").unwrap();
    match export::render(&context, counter) {
        Err(Error::NoProcessor { tag, owner, property }) => {
            assert_eq!(tag, "int32");
            assert_eq!(owner, "/Script/Game.Counter");
            assert_eq!(property, "Count");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!workspace.path().join("out").exists());
    Ok(())
}

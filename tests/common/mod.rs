//! Shared fixtures for the integration tests.
//!
//! Every test authors its modules with `ModuleBuilder`, writes them into a temporary directory
//! and drives the public pipeline against that directory.

#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use bindweaver::{
    metadata::builder::{Attribute, Method, ModuleBuilder, Param, Ty, TypeDef},
    GeneratorConfig, Result,
};
use tempfile::TempDir;

/// Marker attribute `name` declared by the engine module.
pub fn marker(name: &str) -> Attribute {
    Attribute::new(&format!("[Engine]Engine.{name}Attribute"))
}

pub fn uproperty() -> Attribute {
    marker("UProperty")
}

pub fn ufunction() -> Attribute {
    marker("UFunction")
}

/// Reference type `name` of the engine module.
pub fn engine(name: &str) -> Ty {
    Ty::class(&format!("[Engine]Engine.{name}"))
}

pub fn engine_generic(name: &str, args: Vec<Ty>) -> Ty {
    Ty::generic(&format!("[Engine]Engine.{name}"), args)
}

fn native(type_def: TypeDef) -> TypeDef {
    type_def.attribute(Attribute::new("Engine.NativeBindingAttribute"))
}

/// The engine vocabulary: marker attributes, root classes and generic containers.
pub fn engine_module() -> ModuleBuilder {
    let mut builder = ModuleBuilder::new("Engine");

    for attribute in [
        "UClass",
        "UStruct",
        "UEnum",
        "UInterface",
        "UProperty",
        "UFunction",
        "UMetaData",
        "BindingDefinition",
        "NativeBinding",
        "BlueprintBinding",
    ] {
        builder.add_type(
            TypeDef::class("Engine", &format!("{attribute}Attribute"))
                .extends_class("System.Attribute"),
        );
    }

    builder
        .add_type(native(TypeDef::class("Engine", "UObject")))
        .add_type(native(
            TypeDef::class("Engine", "AActor")
                .extends_class("Engine.UObject")
                .method(
                    Method::new("ReceiveTick", Ty::Void)
                        .param(Param::new("deltaSeconds", Ty::R4))
                        .virtual_()
                        .attribute(Attribute::new("Engine.UFunctionAttribute")),
                ),
        ))
        .add_type(native(TypeDef::class("Engine", "UClass").extends_class("Engine.UObject")))
        .add_type(native(
            TypeDef::class("Engine", "UBlueprintFunctionLibrary").extends_class("Engine.UObject"),
        ))
        .add_type(native(TypeDef::structure("Engine", "FName")))
        .add_type(native(TypeDef::structure("Engine", "FText")));

    for (name, params) in [
        ("TArray`1", &["T"][..]),
        ("TSet`1", &["T"][..]),
        ("TMap`2", &["TKey", "TValue"][..]),
    ] {
        let mut container = TypeDef::class("Engine", name);
        for param in params {
            container = container.generic_param(param);
        }
        builder.add_type(container);
    }

    for name in [
        "TSoftObjectPtr`1",
        "TSoftClassPtr`1",
        "TSubclassOf`1",
        "TDelegate`1",
        "TMulticastDelegate`1",
    ] {
        builder.add_type(TypeDef::structure("Engine", name).generic_param("T"));
    }

    builder
}

/// A temporary directory holding `Engine/Engine.bmod` and the modules under test.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let engine = dir.path().join("Engine");
        fs::create_dir_all(&engine)?;
        engine_module().write_to(&engine.join("Engine.bmod"))?;
        Ok(Workspace { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `builder` as `<name>.bmod` and return its path.
    pub fn write(&self, name: &str, builder: &ModuleBuilder) -> Result<PathBuf> {
        let path = self.dir.path().join(format!("{name}.bmod"));
        builder.write_to(&path)?;
        Ok(path)
    }

    /// Configuration generating `module` into `<workspace>/<output>`.
    pub fn config(&self, module: &Path, output: &str) -> GeneratorConfig {
        GeneratorConfig::new()
            .module(module)
            .search_path(self.dir.path().join("Engine"))
            .output_root(self.dir.path().join(output))
    }
}

/// Contents of the emitted file whose name is `file_name`.
pub fn emitted(files: &[PathBuf], file_name: &str) -> String {
    let path = files
        .iter()
        .find(|path| path.file_name().is_some_and(|name| name == file_name))
        .unwrap_or_else(|| panic!("{file_name} was not emitted"));
    fs::read_to_string(path).unwrap()
}

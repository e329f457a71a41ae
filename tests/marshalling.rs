//! Reference marshaller round trips over layouts derived from a real module.

mod common;

use bindweaver::{
    marshal::{NativeHeap, NativeMemory, StructMarshaller, Value},
    metadata::builder::{Field, ModuleBuilder, Ty, TypeDef},
    processors::ProcessorRegistry,
    Error, Generator, Result,
};
use common::{engine_generic, marker, uproperty, Workspace};

fn counter_module() -> ModuleBuilder {
    let mut builder = ModuleBuilder::new("Game");
    builder
        .add_type(
            TypeDef::enumeration("Game", "ERank", Ty::U1)
                .attribute(marker("UEnum"))
                .variant("Low", 0)
                .variant("High", 1),
        )
        .add_type(
            TypeDef::structure("Game", "FCounter")
                .attribute(marker("UStruct"))
                .field(Field::new("Count", Ty::I4).public().attribute(uproperty()))
                .field(Field::new("Label", Ty::String).public().attribute(uproperty())),
        )
        .add_type(
            TypeDef::structure("Game", "FScoreboard")
                .attribute(marker("UStruct"))
                .field(Field::new("Rank", Ty::value("Game.ERank")).public().attribute(uproperty()))
                .field(Field::new("Best", Ty::value("Game.FCounter")).public().attribute(uproperty()))
                .field(
                    Field::new("Names", engine_generic("TArray`1", vec![Ty::String]))
                        .public()
                        .attribute(uproperty()),
                )
                .field(
                    Field::new("Unique", engine_generic("TSet`1", vec![Ty::I4]))
                        .public()
                        .attribute(uproperty()),
                ),
        );
    builder
}

fn counter(count: i64, label: &str) -> Value {
    Value::structure([
        ("Count", Value::Integer(count)),
        ("Label", Value::String(label.to_string())),
    ])
}

#[test]
fn struct_round_trip() -> Result<()> {
    let workspace = Workspace::new()?;
    let module = workspace.write("Game", &counter_module())?;
    let document = Generator::new(workspace.config(&module, "out")).document()?;
    let registry = ProcessorRegistry::with_builtins();
    let marshaller = StructMarshaller::new(&registry, &document);

    let definition = document.find_struct("Game", "FCounter").unwrap();
    assert_eq!(definition.size, 24);
    assert_eq!(definition.properties[1].offset, 8);

    let mut heap = NativeHeap::new();
    let address = heap.allocate(definition.size, definition.alignment)?;

    marshaller.to_native(definition, &mut heap, address, &counter(7, "x"))?;
    assert_eq!(marshaller.from_native(definition, &heap, address)?, counter(7, "x"));

    marshaller.to_native(definition, &mut heap, address, &counter(8, "y"))?;
    let memory: &dyn NativeMemory = &heap;
    assert_eq!(memory.read_le::<i32>(address)?, 8);
    assert_eq!(marshaller.from_native(definition, &heap, address)?, counter(8, "y"));
    Ok(())
}

#[test]
fn nested_struct_and_runtime_only_kinds() -> Result<()> {
    let workspace = Workspace::new()?;
    let module = workspace.write("Game", &counter_module())?;
    let document = Generator::new(workspace.config(&module, "out")).document()?;
    let registry = ProcessorRegistry::with_builtins();
    let marshaller = StructMarshaller::new(&registry, &document);

    let definition = document.find_struct("Game", "FScoreboard").unwrap();
    let mut heap = NativeHeap::new();
    let address = heap.allocate(definition.size, definition.alignment)?;

    let [rank, best, names, unique] = &definition.properties[..] else {
        panic!("unexpected members {:?}", definition.properties);
    };

    marshaller.write_property(rank, &mut heap, address + rank.offset as u64, &Value::Integer(1))?;
    marshaller.write_property(best, &mut heap, address + best.offset as u64, &counter(3, "best"))?;
    let list = Value::Array(vec![
        Value::String("a".to_string()),
        Value::String("b".to_string()),
    ]);
    marshaller.write_property(names, &mut heap, address + names.offset as u64, &list)?;

    assert_eq!(
        marshaller.read_property(rank, &heap, address + rank.offset as u64)?,
        Value::Integer(1)
    );
    assert_eq!(
        marshaller.read_property(best, &heap, address + best.offset as u64)?,
        counter(3, "best")
    );
    assert_eq!(
        marshaller.read_property(names, &heap, address + names.offset as u64)?,
        list
    );
    assert!(matches!(
        marshaller.read_property(unique, &heap, address + unique.offset as u64),
        Err(Error::NotSupported)
    ));
    assert!(matches!(
        marshaller.from_native(definition, &heap, address),
        Err(Error::NotSupported)
    ));
    Ok(())
}

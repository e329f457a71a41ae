//! Benchmarks for the generation pipeline.
//!
//! Measures each stage over a synthetic module of 64 classes and 16 structs:
//! - Module image decoding
//! - Classification and model building
//! - Rendering every entity, sequential and on the rayon pool

extern crate bindweaver;

#[path = "../tests/common/mod.rs"]
mod common;

use bindweaver::{
    bindings::Classifier,
    context::BindingContext,
    export,
    factory::ModelFactory,
    loader::ModuleResolver,
    metadata::{
        builder::{Field, Method, ModuleBuilder, Param, Ty, TypeDef},
        module::LoadedModule,
    },
    model::TypeDefinitionDocument,
};
use common::{engine, engine_generic, marker, ufunction, uproperty};
use criterion::{criterion_group, criterion_main, Criterion};
use rayon::prelude::*;
use std::hint::black_box;

const CLASSES: usize = 64;
const STRUCTS: usize = 16;

fn synthetic_module() -> ModuleBuilder {
    let mut builder = ModuleBuilder::new("Game");
    builder.add_type(
        TypeDef::enumeration("Game", "EState", Ty::U1)
            .attribute(marker("UEnum"))
            .variant("Idle", 0)
            .variant("Active", 1)
            .variant("Done", 2),
    );

    for index in 0..STRUCTS {
        builder.add_type(
            TypeDef::structure("Game.Data", &format!("FRecord{index}"))
                .attribute(marker("UStruct"))
                .field(Field::new("Id", Ty::I8).public().attribute(uproperty()))
                .field(Field::new("Weight", Ty::R4).public().attribute(uproperty()))
                .field(Field::new("Label", Ty::String).public().attribute(uproperty()))
                .field(
                    Field::new("State", Ty::value("Game.EState"))
                        .public()
                        .attribute(uproperty()),
                ),
        );
    }

    for index in 0..CLASSES {
        let record = format!("Game.Data.FRecord{}", index % STRUCTS);
        builder.add_type(
            TypeDef::class("Game.Actors", &format!("AUnit{index}"))
                .extends(engine("AActor"))
                .attribute(marker("UClass"))
                .field(Field::new("Health", Ty::R4).public().attribute(uproperty()))
                .field(Field::new("Armor", Ty::I4).public().attribute(uproperty()))
                .field(Field::new("Record", Ty::value(&record)).public().attribute(uproperty()))
                .field(
                    Field::new("Tags", engine_generic("TArray`1", vec![Ty::String]))
                        .public()
                        .attribute(uproperty()),
                )
                .field(
                    Field::new("Scores", engine_generic("TMap`2", vec![Ty::String, Ty::I4]))
                        .public()
                        .attribute(uproperty()),
                )
                .method(Method::new("Reset", Ty::Void).attribute(ufunction()))
                .method(
                    Method::new("Damage", Ty::Bool)
                        .param(Param::new("amount", Ty::R4))
                        .param(Param::new("record", Ty::value(&record)))
                        .attribute(ufunction()),
                ),
        );
    }

    builder
}

fn images() -> (Vec<u8>, Vec<u8>) {
    (
        common::engine_module().build().unwrap(),
        synthetic_module().build().unwrap(),
    )
}

fn document(engine: &[u8], game: &[u8]) -> TypeDefinitionDocument {
    let resolver = ModuleResolver::new();
    resolver.insert(LoadedModule::from_mem(engine.to_vec()).unwrap());
    let game = resolver.insert(LoadedModule::from_mem(game.to_vec()).unwrap());
    let classification = Classifier::new(&resolver).classify(&[game]).unwrap();
    ModelFactory::new(&resolver).build(&classification).unwrap()
}

/// Benchmark decoding the synthetic module image.
fn bench_load(c: &mut Criterion) {
    let (_, game) = images();

    c.bench_function("load_module", |b| {
        b.iter(|| {
            let module = LoadedModule::from_mem(black_box(game.clone())).unwrap();
            black_box(module)
        });
    });
}

/// Benchmark classification plus model building.
fn bench_model(c: &mut Criterion) {
    let (engine, game) = images();

    c.bench_function("build_document", |b| {
        b.iter(|| black_box(document(black_box(&engine), black_box(&game))));
    });
}

/// Benchmark rendering every entity of the document.
fn bench_render(c: &mut Criterion) {
    let (engine, game) = images();
    let context = BindingContext::new(document(&engine, &game), "Generated")
        .with_fast_invoke((0..CLASSES).map(|index| format!("/Script/Game.Unit{index}:Reset")));
    let definitions: Vec<_> = context.document().iter().collect();

    let mut group = c.benchmark_group("render");
    group.bench_function("sequential", |b| {
        b.iter(|| {
            let files: Vec<_> = definitions
                .iter()
                .map(|definition| export::render(&context, definition).unwrap())
                .collect();
            black_box(files)
        });
    });
    group.bench_function("parallel", |b| {
        b.iter(|| {
            let files: Vec<_> = definitions
                .par_iter()
                .map(|definition| export::render(&context, definition).unwrap())
                .collect();
            black_box(files)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_load, bench_model, bench_render);
criterion_main!(benches);

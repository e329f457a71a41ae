//! Orchestration of one generation run.
//!
//! [`Generator::run`] drives the pipeline end to end: load the configured modules through a
//! [`ModuleResolver`], classify their declarations, build the [`TypeDefinitionDocument`], wrap it
//! in a [`BindingContext`] and export every entity. Loading and model building run on the calling
//! thread; rendering may run on the rayon pool, after which files are saved one by one in the
//! document's dependency order.
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use bindweaver::{Generator, GeneratorConfig};
//!
//! let config = GeneratorConfig::new()
//!     .module("Modules/Game.bmod")
//!     .search_path("Engine/Modules")
//!     .output_root("Generated")
//!     .fast_invoke(["/Script/Game.MyActor:Reset"]);
//! let report = Generator::new(config).run()?;
//! println!("{} processed, {} written, {} unchanged", report.processed, report.written, report.unchanged);
//! # Ok::<(), bindweaver::Error>(())
//! ```

mod config;

pub use config::{parse_fast_invoke, GeneratorConfig, DEFAULT_OUTPUT_ROOT};

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use rayon::prelude::*;

use crate::{
    bindings::{role_of, Classifier, TypeRole},
    context::BindingContext,
    export::{
        self,
        writer::{self, SaveOutcome},
        ExportedFile,
    },
    factory::ModelFactory,
    loader::ModuleResolver,
    metadata::module::LoadedModule,
    model::TypeDefinitionDocument,
    Error, Result,
};

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// Entities rendered
    pub processed: usize,
    /// Files created or replaced
    pub written: usize,
    /// Files left untouched because their bytes were already current
    pub unchanged: usize,
    /// Every emitted path, in export order
    pub files: Vec<PathBuf>,
}

/// One declaration of a loaded module and its classification.
#[derive(Debug, Clone)]
pub struct InspectedType {
    /// Module the declaration belongs to
    pub module: String,
    /// `Namespace.Name` of the declaration
    pub full_name: String,
    /// Classification
    pub role: TypeRole,
}

/// A configured generation run.
#[derive(Debug, Clone)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    /// Create a generator for `config`.
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        Generator { config }
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Load every configured module.
    ///
    /// Each module is opened at its exact path first, then probed by file name through the
    /// search paths.
    ///
    /// # Errors
    /// Returns [`Error::Empty`] if no module is configured, [`Error::ModuleNotFound`] if a module
    /// cannot be located, or a parse error for an invalid module image.
    pub fn load(&self) -> Result<(ModuleResolver, Vec<Arc<LoadedModule>>)> {
        if self.config.modules.is_empty() {
            return Err(Error::Empty);
        }

        let resolver = ModuleResolver::new().with_search_paths(&self.config.search_paths);
        let mut modules = Vec::with_capacity(self.config.modules.len());
        for path in &self.config.modules {
            modules.push(open(&resolver, path)?);
        }
        Ok((resolver, modules))
    }

    /// Load, classify and build the document.
    ///
    /// # Errors
    /// Returns a load error, or [`Error::Validation`] with every binding rule violation.
    pub fn document(&self) -> Result<TypeDefinitionDocument> {
        let (resolver, modules) = self.load()?;
        let classification = Classifier::new(&resolver).classify(&modules)?;
        ModelFactory::new(&resolver)
            .with_recursion_limit(self.config.recursion_limit)
            .build(&classification)
    }

    /// Binding context over `document` for this configuration.
    #[must_use]
    pub fn context(&self, document: TypeDefinitionDocument) -> BindingContext {
        BindingContext::new(document, self.config.output_root.clone())
            .with_schema(self.config.schema)
            .with_fast_invoke(self.config.fast_invoke.iter().cloned())
            .with_suffix(self.config.suffix.clone())
    }

    /// Render every entity of `context`, in document order.
    ///
    /// # Errors
    /// Returns the first rendering error in document order.
    pub fn render(&self, context: &BindingContext) -> Result<Vec<ExportedFile>> {
        let definitions: Vec<_> = context.document().iter().collect();
        if self.config.parallel {
            definitions
                .par_iter()
                .map(|definition| export::render(context, definition))
                .collect()
        } else {
            definitions
                .iter()
                .map(|definition| export::render(context, definition))
                .collect()
        }
    }

    /// Run the whole pipeline.
    ///
    /// # Errors
    /// Returns the first failure of any stage; no file is written unless every entity renders.
    pub fn run(&self) -> Result<GenerationReport> {
        let document = self.document()?;
        let context = self.context(document);
        let files = self.render(&context)?;

        let mut report = GenerationReport {
            processed: files.len(),
            ..GenerationReport::default()
        };
        for file in files {
            match writer::save(&file.path, &file.contents)? {
                SaveOutcome::Written => report.written += 1,
                SaveOutcome::Unchanged => report.unchanged += 1,
            }
            report.files.push(file.path);
        }

        log::info!(
            "Generated {} files under {}: {} written, {} unchanged",
            report.processed,
            self.config.output_root.display(),
            report.written,
            report.unchanged
        );
        Ok(report)
    }

    /// Every declaration of the configured modules with its classification, without validating.
    ///
    /// # Errors
    /// Returns a load error.
    pub fn inspect(&self) -> Result<Vec<InspectedType>> {
        let (_, modules) = self.load()?;
        Ok(modules
            .iter()
            .flat_map(|module| {
                module.types.iter().map(move |declaration| InspectedType {
                    module: module.name.clone(),
                    full_name: declaration.full_name(),
                    role: role_of(module, declaration),
                })
            })
            .collect())
    }
}

/// Open `path` exactly, falling back to a search-path probe by module name.
fn open(resolver: &ModuleResolver, path: &Path) -> Result<Arc<LoadedModule>> {
    if path.is_file() {
        return resolver.load(path);
    }

    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| Error::ModuleNotFound(path.display().to_string()))?;
    match resolver.find_module_path(name) {
        Some(found) => {
            log::debug!("Module '{}' found at {}", name, found.display());
            resolver.load(&found)
        }
        None => Err(Error::ModuleNotFound(path.display().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::factories::{engine_module_builder, sample_module_builder};
    use std::fs;

    fn write_modules(dir: &Path) -> GeneratorConfig {
        let engine = dir.join("Engine");
        fs::create_dir_all(&engine).unwrap();
        engine_module_builder().write_to(&engine.join("Engine.bmod")).unwrap();
        sample_module_builder().write_to(&dir.join("Game.bmod")).unwrap();

        GeneratorConfig::new()
            .module(dir.join("Game.bmod"))
            .search_path(&engine)
            .output_root(dir.join("out"))
    }

    #[test]
    fn empty_configuration() {
        assert!(matches!(
            Generator::new(GeneratorConfig::new()).run(),
            Err(Error::Empty)
        ));
    }

    #[test]
    fn missing_module() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig::new().module(dir.path().join("Nowhere.bmod"));
        assert!(matches!(
            Generator::new(config).run(),
            Err(Error::ModuleNotFound(_))
        ));
    }

    #[test]
    fn probe_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_modules(dir.path());
        let config = GeneratorConfig {
            modules: vec![PathBuf::from("Engine.bmod")],
            ..config
        };
        let (_, modules) = Generator::new(config).load().unwrap();
        assert_eq!(modules[0].name, "Engine");
    }

    #[test]
    fn run_and_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(write_modules(dir.path()));

        let first = generator.run().unwrap();
        assert_eq!(first.processed, 7);
        assert_eq!(first.written, 7);
        assert_eq!(first.unchanged, 0);
        assert!(first.files[0].ends_with("Game/Enums/EWeaponMode.generated.cs"));
        assert!(first.files.iter().all(|path| path.is_file()));

        let second = generator.run().unwrap();
        assert_eq!(second.written, 0);
        assert_eq!(second.unchanged, 7);
        assert_eq!(second.files, first.files);
    }

    #[test]
    fn parallel_matches_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_modules(dir.path());
        let parallel = Generator::new(config.clone());
        let sequential = Generator::new(config.parallel(false));

        let context = parallel.context(parallel.document().unwrap());
        assert_eq!(
            parallel.render(&context).unwrap(),
            sequential.render(&context).unwrap()
        );
    }

    #[test]
    fn inspect_roles() {
        let dir = tempfile::tempdir().unwrap();
        let types = Generator::new(write_modules(dir.path())).inspect().unwrap();
        let actor = types
            .iter()
            .find(|inspected| inspected.full_name == "Game.Actors.AMyActor")
            .unwrap();
        assert_eq!(actor.module, "Game");
        assert!(matches!(actor.role, TypeRole::Implementation(_)));
        let delegate = types
            .iter()
            .find(|inspected| inspected.full_name.ends_with("FOnHit"))
            .unwrap();
        assert!(matches!(delegate.role, TypeRole::Irrelevant(_)));
    }
}

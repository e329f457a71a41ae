//! Module resolution across search paths.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use dashmap::DashMap;

use crate::{
    metadata::{
        module::{LoadedModule, ResolutionScope, TypeDeclaration},
        signatures::TypeSignature,
        tables::TableId,
        token::Token,
    },
    Error, Result,
};

/// File extension of module images.
pub const MODULE_EXTENSION: &str = "bmod";

/// Assembly names whose types are recognised by name and never loaded.
pub const CORE_LIBRARIES: [&str; 4] = [
    "System.Runtime",
    "System.Private.CoreLib",
    "mscorlib",
    "netstandard",
];

/// Returns `true` if `name` is an intrinsic core library.
#[must_use]
pub fn is_core_library(name: &str) -> bool {
    CORE_LIBRARIES.contains(&name)
}

/// A type declared in a loaded module.
#[derive(Clone)]
pub struct TypeHandle {
    /// The declaring module
    pub module: Arc<LoadedModule>,
    /// Index into [`LoadedModule::types`]
    pub index: usize,
}

impl TypeHandle {
    /// The declaration this handle points to.
    #[must_use]
    pub fn declaration(&self) -> &TypeDeclaration {
        &self.module.types[self.index]
    }

    /// `Namespace.Name` of the declaration.
    #[must_use]
    pub fn full_name(&self) -> String {
        self.declaration().full_name()
    }

    /// Returns `true` if both handles point to the same declaration.
    #[must_use]
    pub fn same_as(&self, other: &TypeHandle) -> bool {
        Arc::ptr_eq(&self.module, &other.module) && self.index == other.index
    }
}

impl std::fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}!{}", self.module.name, self.full_name())
    }
}

/// Outcome of resolving a type token.
#[derive(Debug, Clone)]
pub enum ResolvedType {
    /// A type declared in a loaded module
    Declared(TypeHandle),
    /// A core-library type, known by `Namespace.Name` only
    Intrinsic(String),
}

impl ResolvedType {
    /// `Namespace.Name` of the resolved type.
    #[must_use]
    pub fn full_name(&self) -> String {
        match self {
            ResolvedType::Declared(handle) => handle.full_name(),
            ResolvedType::Intrinsic(name) => name.clone(),
        }
    }

    /// Simple name, without namespace.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            ResolvedType::Declared(handle) => handle.declaration().name.clone(),
            ResolvedType::Intrinsic(name) => name
                .rsplit_once('.')
                .map_or(name.as_str(), |(_, simple)| simple)
                .to_string(),
        }
    }

    /// The declaration, if the type is not intrinsic.
    #[must_use]
    pub fn handle(&self) -> Option<&TypeHandle> {
        match self {
            ResolvedType::Declared(handle) => Some(handle),
            ResolvedType::Intrinsic(_) => None,
        }
    }
}

/// Loads modules and resolves cross-module type references.
///
/// Modules are cached by name, so every reference after the first is a map lookup. Resolution
/// of a module name probes, in order, the configured search paths and then the directories of
/// every module loaded so far. Within a search path both `{dir}/{name}.bmod` and
/// `{dir}/*/{name}.bmod` are candidates, and the most recently modified candidate wins.
///
/// # Examples
///
/// ```rust,no_run
/// use bindweaver::loader::ModuleResolver;
///
/// let resolver = ModuleResolver::new().with_search_path("Engine/Modules");
/// let game = resolver.load("Game.bmod".as_ref())?;
/// for declaration in &game.types {
///     println!("{}", declaration.full_name());
/// }
/// # Ok::<(), bindweaver::Error>(())
/// ```
#[derive(Default)]
pub struct ModuleResolver {
    search_paths: Vec<PathBuf>,
    loaded_dirs: boxcar::Vec<PathBuf>,
    cache: DashMap<String, Arc<LoadedModule>>,
}

impl ModuleResolver {
    /// Create a resolver without search paths.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory to probe for referenced modules.
    #[must_use]
    pub fn with_search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Add several directories to probe for referenced modules.
    #[must_use]
    pub fn with_search_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.search_paths
            .extend(paths.into_iter().map(|path| path.as_ref().to_path_buf()));
        self
    }

    /// Load the module at `path` exactly and cache it under its name.
    ///
    /// Loading a module whose name is already cached returns the cached module.
    ///
    /// # Errors
    /// Returns [`Error::ModuleNotFound`] if `path` does not exist, or a parse error if the file
    /// is not a valid module image.
    pub fn load(&self, path: &Path) -> Result<Arc<LoadedModule>> {
        if !path.is_file() {
            return Err(Error::ModuleNotFound(path.display().to_string()));
        }

        let module = LoadedModule::from_path(path)?;
        if let Some(parent) = path.parent() {
            if !self.loaded_dirs.iter().any(|(_, dir)| dir == parent) {
                self.loaded_dirs.push(parent.to_path_buf());
            }
        }

        let entry = self
            .cache
            .entry(module.name.clone())
            .or_insert_with(|| Arc::new(module));
        log::debug!("Loaded module '{}' from {}", entry.name, path.display());
        Ok(entry.clone())
    }

    /// Insert an already decoded module into the cache.
    pub fn insert(&self, module: LoadedModule) -> Arc<LoadedModule> {
        let module = Arc::new(module);
        self.cache.insert(module.name.clone(), module.clone());
        module
    }

    /// A cached module by name.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<Arc<LoadedModule>> {
        self.cache.get(name).map(|entry| entry.clone())
    }

    /// Every cached module, sorted by name.
    #[must_use]
    pub fn modules(&self) -> Vec<Arc<LoadedModule>> {
        let mut modules: Vec<_> = self.cache.iter().map(|entry| entry.clone()).collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        modules
    }

    /// Locate the module file for `name` without loading it.
    #[must_use]
    pub fn find_module_path(&self, name: &str) -> Option<PathBuf> {
        let file_name = format!("{name}.{MODULE_EXTENSION}");
        let loaded: Vec<PathBuf> = self.loaded_dirs.iter().map(|(_, dir)| dir.clone()).collect();

        for dir in self.search_paths.iter().chain(loaded.iter()) {
            let mut candidates = Vec::new();

            let direct = dir.join(&file_name);
            if direct.is_file() {
                candidates.push(direct);
            }

            if let Ok(entries) = std::fs::read_dir(dir) {
                for entry in entries.flatten() {
                    let candidate = entry.path().join(&file_name);
                    if entry.path().is_dir() && candidate.is_file() {
                        candidates.push(candidate);
                    }
                }
            }

            if let Some(best) = newest(candidates) {
                return Some(best);
            }
        }

        None
    }

    /// Resolve the module named `name`, loading it through the search paths if needed.
    ///
    /// Returns `None` for intrinsic core libraries.
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedReference`] naming `name` and `referencing` if no candidate
    /// file exists, or a parse error if the candidate is not a valid module image.
    pub fn resolve(&self, name: &str, referencing: &str) -> Result<Option<Arc<LoadedModule>>> {
        if is_core_library(name) {
            return Ok(None);
        }

        if let Some(module) = self.module(name) {
            return Ok(Some(module));
        }

        match self.find_module_path(name) {
            Some(path) => Ok(Some(self.load(&path)?)),
            None => Err(Error::UnresolvedReference {
                reference: name.to_string(),
                module: referencing.to_string(),
            }),
        }
    }

    /// Resolve a TypeDef, TypeRef or TypeSpec token of `module`.
    ///
    /// A TypeSpec resolves to the definition of its generic type.
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedReference`] if the referenced module or type does not exist,
    /// or a malformed error for tokens of other tables.
    pub fn resolve_token(&self, module: &Arc<LoadedModule>, token: Token) -> Result<ResolvedType> {
        self.resolve_token_depth(module, token, 0)
    }

    fn resolve_token_depth(
        &self,
        module: &Arc<LoadedModule>,
        token: Token,
        depth: usize,
    ) -> Result<ResolvedType> {
        if depth > 32 {
            return Err(Error::RecursionLimit(32));
        }

        if token.is_table(TableId::TypeDef) {
            let index = token.row() as usize;
            if index == 0 || index > module.types.len() {
                return Err(malformed_error!("Invalid TypeDef token 0x{:08X}", token.value()));
            }
            return Ok(ResolvedType::Declared(TypeHandle {
                module: module.clone(),
                index: index - 1,
            }));
        }

        if token.is_table(TableId::TypeSpec) {
            let Some(signature) = module.type_spec(token) else {
                return Err(malformed_error!("Invalid TypeSpec token 0x{:08X}", token.value()));
            };
            return match signature {
                TypeSignature::GenericInst(base, _) => match base.token() {
                    Some(base_token) => self.resolve_token_depth(module, base_token, depth + 1),
                    None => Err(malformed_error!("Generic instantiation without a base type")),
                },
                TypeSignature::Class(inner) | TypeSignature::ValueType(inner) => {
                    self.resolve_token_depth(module, *inner, depth + 1)
                }
                other => Err(malformed_error!("Unsupported TypeSpec {:?}", other)),
            };
        }

        if !token.is_table(TableId::TypeRef) {
            return Err(malformed_error!(
                "Token 0x{:08X} does not reference a type",
                token.value()
            ));
        }

        let Some(reference) = module.type_ref(token) else {
            return Err(malformed_error!("Invalid TypeRef token 0x{:08X}", token.value()));
        };

        match &reference.scope {
            ResolutionScope::Module => match module.type_index(&reference.namespace, &reference.name) {
                Some(index) => Ok(ResolvedType::Declared(TypeHandle {
                    module: module.clone(),
                    index,
                })),
                None => Err(Error::UnresolvedReference {
                    reference: reference.full_name(),
                    module: module.name.clone(),
                }),
            },
            ResolutionScope::Enclosing(enclosing) => {
                let ResolvedType::Declared(outer) =
                    self.resolve_token_depth(module, *enclosing, depth + 1)?
                else {
                    return Ok(ResolvedType::Intrinsic(reference.full_name()));
                };
                let outer_token = outer.declaration().token;
                match outer.module.types.iter().position(|candidate| {
                    candidate.enclosing == Some(outer_token) && candidate.name == reference.name
                }) {
                    Some(index) => Ok(ResolvedType::Declared(TypeHandle {
                        module: outer.module.clone(),
                        index,
                    })),
                    None => Err(Error::UnresolvedReference {
                        reference: format!("{}+{}", outer.full_name(), reference.name),
                        module: module.name.clone(),
                    }),
                }
            }
            ResolutionScope::Assembly(assembly) => {
                let Some(target) = self.resolve(assembly, &module.name)? else {
                    return Ok(ResolvedType::Intrinsic(reference.full_name()));
                };
                match target.type_index(&reference.namespace, &reference.name) {
                    Some(index) => Ok(ResolvedType::Declared(TypeHandle {
                        module: target,
                        index,
                    })),
                    None => Err(Error::UnresolvedReference {
                        reference: format!("[{}]{}", assembly, reference.full_name()),
                        module: module.name.clone(),
                    }),
                }
            }
        }
    }

    /// Find a declared type by simple name in any cached module.
    ///
    /// Modules are searched in name order, so the result is stable across runs.
    #[must_use]
    pub fn find_by_simple_name(&self, name: &str) -> Option<TypeHandle> {
        for module in self.modules() {
            if let Some(index) = module.types.iter().position(|t| t.name == name) {
                return Some(TypeHandle { module, index });
            }
        }
        None
    }
}

fn newest(candidates: Vec<PathBuf>) -> Option<PathBuf> {
    candidates
        .into_iter()
        .map(|path| {
            let modified = std::fs::metadata(&path)
                .and_then(|metadata| metadata.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .max()
        .map(|(_, path)| path)
}

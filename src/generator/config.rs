//! Generation run configuration

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use crate::{
    context::{BindingSchema, GENERATED_SUFFIX},
    factory::DEFAULT_RECURSION_LIMIT,
};

/// Default output root, relative to the working directory.
pub const DEFAULT_OUTPUT_ROOT: &str = "Generated";

/// Configuration of one generation run
///
/// Built with the chaining setters below, starting from [`GeneratorConfig::new`] or one of the
/// presets. Modules are loaded in the order given; every other collection is ordered so that the
/// same configuration always produces the same output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Module files to generate bindings for
    pub modules: Vec<PathBuf>,

    /// Directories probed for referenced modules
    pub search_paths: Vec<PathBuf>,

    /// Root directory of the emitted files
    pub output_root: PathBuf,

    /// Binding flavor of the emitted sources
    pub schema: BindingSchema,

    /// Native paths of the functions emitted on the direct native call path
    pub fast_invoke: BTreeSet<String>,

    /// Suffix of emitted files (default: `.generated.cs`)
    pub suffix: String,

    /// Render files on the rayon thread pool; saving stays sequential
    pub parallel: bool,

    /// Maximum nesting depth of generic arguments and delegate signatures (default: 32)
    pub recursion_limit: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            modules: Vec::new(),
            search_paths: Vec::new(),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            schema: BindingSchema::Native,
            fast_invoke: BTreeSet::new(),
            suffix: GENERATED_SUFFIX.to_string(),
            parallel: true,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

impl GeneratorConfig {
    /// Creates the default configuration: native schema, parallel rendering, no modules
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration rendering on the calling thread only
    ///
    /// Output is identical to the parallel configuration; useful when debugging a processor.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Creates a configuration emitting visual-scripting bindings
    #[must_use]
    pub fn blueprint() -> Self {
        Self {
            schema: BindingSchema::Blueprint,
            ..Self::default()
        }
    }

    /// Creates a configuration emitting bindings implementable on the managed side
    #[must_use]
    pub fn managed() -> Self {
        Self {
            schema: BindingSchema::Managed,
            ..Self::default()
        }
    }

    /// Add a module file.
    #[must_use]
    pub fn module<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.modules.push(path.as_ref().to_path_buf());
        self
    }

    /// Add a search directory.
    #[must_use]
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Set the output root.
    #[must_use]
    pub fn output_root<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_root = path.as_ref().to_path_buf();
        self
    }

    /// Set the binding schema.
    #[must_use]
    pub fn schema(mut self, schema: BindingSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Add functions, by native path, to the fast-invoke set.
    #[must_use]
    pub fn fast_invoke<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fast_invoke.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Set the file suffix.
    #[must_use]
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Toggle parallel rendering.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the recursion limit.
    #[must_use]
    pub fn recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }
}

/// Parse a fast-invoke list: one native function path per line, `#` starts a comment.
///
/// ```rust
/// use bindweaver::generator::parse_fast_invoke;
///
/// let paths = parse_fast_invoke("# hot paths\n/Script/Game.MyActor:Reset\n\n/Script/Game.MyActor:Fire # per frame\n");
/// assert_eq!(paths, ["/Script/Game.MyActor:Reset", "/Script/Game.MyActor:Fire"]);
/// ```
#[must_use]
pub fn parse_fast_invoke(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.split_once('#').map_or(line, |(path, _)| path).trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        let default = GeneratorConfig::default();
        assert_eq!(default, GeneratorConfig::new());
        assert!(default.parallel);
        assert_eq!(default.schema, BindingSchema::Native);
        assert_eq!(default.suffix, ".generated.cs");
        assert_eq!(default.output_root, PathBuf::from("Generated"));
        assert_eq!(default.recursion_limit, DEFAULT_RECURSION_LIMIT);

        assert!(!GeneratorConfig::sequential().parallel);
        assert_eq!(GeneratorConfig::blueprint().schema, BindingSchema::Blueprint);
        assert_eq!(GeneratorConfig::managed().schema, BindingSchema::Managed);
    }

    #[test]
    fn builder() {
        let config = GeneratorConfig::new()
            .module("Game.bmod")
            .module("Tools.bmod")
            .search_path("Engine")
            .output_root("out")
            .fast_invoke(["/Script/Game.MyActor:Reset", "/Script/Game.MyActor:Reset"])
            .suffix(".g.cs")
            .parallel(false)
            .recursion_limit(4);

        assert_eq!(config.modules, [PathBuf::from("Game.bmod"), PathBuf::from("Tools.bmod")]);
        assert_eq!(config.search_paths, [PathBuf::from("Engine")]);
        assert_eq!(config.fast_invoke.len(), 1);
        assert_eq!(config.suffix, ".g.cs");
        assert!(!config.parallel);
        assert_eq!(config.recursion_limit, 4);
    }

    #[test]
    fn fast_invoke_lists() {
        assert!(parse_fast_invoke("").is_empty());
        assert!(parse_fast_invoke("# only comments\n   \n").is_empty());
        assert_eq!(
            parse_fast_invoke("  /Script/Game.A:B  \r\n"),
            ["/Script/Game.A:B"]
        );
    }
}

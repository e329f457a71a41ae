use std::path::Path;

use anyhow::{bail, Context};
use bindweaver::{
    bindings::{BindingErrors, TypeRole},
    context::BindingSchema,
    generator::parse_fast_invoke,
    GeneratorConfig,
};

use crate::app::ModuleArgs;

/// Base configuration holding the modules and search paths of `input`.
pub fn base_config(input: &ModuleArgs) -> GeneratorConfig {
    let config = input
        .modules
        .iter()
        .fold(GeneratorConfig::new(), |config, module| config.module(module));
    input
        .search_paths
        .iter()
        .fold(config, |config, path| config.search_path(path))
}

/// Parse a `--schema` value.
pub fn parse_schema(value: &str) -> anyhow::Result<BindingSchema> {
    match value.parse::<BindingSchema>() {
        Ok(schema) => Ok(schema),
        Err(_) => bail!("unknown schema: {value} (expected native, blueprint, or managed)"),
    }
}

/// Read a fast-invoke list file.
pub fn read_fast_invoke(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read fast-invoke list: {}", path.display()))?;
    Ok(parse_fast_invoke(&text))
}

/// Lower-case name of the role, as accepted by `--role`.
pub fn role_name(role: TypeRole) -> &'static str {
    match role {
        TypeRole::Implementation(_) => "implementation",
        TypeRole::Placeholder(_) => "placeholder",
        TypeRole::Irrelevant(_) => "irrelevant",
    }
}

/// One line per diagnostic, for text output.
pub fn print_binding_errors(errors: &BindingErrors) {
    println!("FAIL  {} binding error(s)", errors.len());
    for error in errors.iter() {
        println!("  [{}] {}: {}", error.kind, error.symbol, error.message);
        for location in &error.locations {
            println!("      at {location}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn schema_values() {
        assert_eq!(parse_schema("managed").unwrap(), BindingSchema::Managed);
        assert!(parse_schema("unreal").is_err());
    }

    #[test]
    fn module_arguments() {
        let input = ModuleArgs {
            modules: vec![PathBuf::from("Game.bmod")],
            search_paths: vec![PathBuf::from("Engine"), PathBuf::from("Plugins")],
        };
        let config = base_config(&input);
        assert_eq!(config.modules, [PathBuf::from("Game.bmod")]);
        assert_eq!(config.search_paths.len(), 2);
    }

    #[test]
    fn fast_invoke_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fast.txt");
        std::fs::write(&path, "# per frame\n/Script/Game.Hero:Tick\n").unwrap();
        assert_eq!(read_fast_invoke(&path).unwrap(), ["/Script/Game.Hero:Tick"]);
        assert!(read_fast_invoke(&dir.path().join("missing.txt")).is_err());
    }
}

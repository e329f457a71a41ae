use anyhow::bail;
use bindweaver::{bindings::BindingErrors, Error, Generator};
use serde::Serialize;

use crate::{
    app::{GlobalOptions, ModuleArgs},
    commands::common::{base_config, print_binding_errors},
    output::print_output,
};

#[derive(Debug, Serialize)]
pub struct DiagnosticEntry {
    kind: String,
    symbol: String,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    locations: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CheckOutput {
    valid: bool,
    types: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<DiagnosticEntry>,
}

/// Serializable form of `errors`.
pub fn diagnostic_entries(errors: &BindingErrors) -> Vec<DiagnosticEntry> {
    errors
        .iter()
        .map(|error| DiagnosticEntry {
            kind: error.kind.to_string(),
            symbol: error.symbol.to_string(),
            message: error.message.clone(),
            locations: error.locations.iter().map(ToString::to_string).collect(),
        })
        .collect()
}

pub fn run(input: &ModuleArgs, opts: &GlobalOptions) -> anyhow::Result<()> {
    let generator = Generator::new(base_config(input));

    match generator.document() {
        Ok(document) => {
            let output = CheckOutput {
                valid: true,
                types: document.len(),
                diagnostics: Vec::new(),
            };
            print_output(&output, opts, |out| {
                println!("PASS  {} reflected type(s)", out.types);
            })
        }
        Err(Error::Validation(errors)) => {
            let output = CheckOutput {
                valid: false,
                types: 0,
                diagnostics: diagnostic_entries(&errors),
            };
            print_output(&output, opts, |_| print_binding_errors(&errors))?;
            bail!("{} binding error(s)", errors.len());
        }
        Err(error) => Err(error.into()),
    }
}

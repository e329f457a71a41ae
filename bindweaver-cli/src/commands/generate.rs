use std::path::{Path, PathBuf};

use anyhow::bail;
use bindweaver::{Error, Generator};
use serde::Serialize;

use crate::{
    app::{GlobalOptions, ModuleArgs},
    commands::{
        check::{diagnostic_entries, DiagnosticEntry},
        common::{base_config, parse_schema, print_binding_errors, read_fast_invoke},
    },
    output::print_output,
};

#[derive(Debug, Serialize)]
struct GenerateOutput {
    output_root: String,
    schema: String,
    processed: usize,
    written: usize,
    unchanged: usize,
    files: Vec<String>,
}

#[derive(Debug, Serialize)]
struct FailedOutput {
    valid: bool,
    diagnostics: Vec<DiagnosticEntry>,
}

pub struct GenerateOptions<'a> {
    pub output: &'a Path,
    pub schema: &'a str,
    pub fast_invoke: Option<&'a Path>,
    pub suffix: &'a str,
    pub sequential: bool,
    pub recursion_limit: Option<usize>,
    pub global: &'a GlobalOptions,
}

pub fn run(input: &ModuleArgs, opts: &GenerateOptions) -> anyhow::Result<()> {
    let schema = parse_schema(opts.schema)?;
    let mut config = base_config(input)
        .output_root(opts.output)
        .schema(schema)
        .suffix(opts.suffix)
        .parallel(!opts.sequential);
    if let Some(path) = opts.fast_invoke {
        let paths = read_fast_invoke(path)?;
        log::debug!("{} fast-invoke function(s) from {}", paths.len(), path.display());
        config = config.fast_invoke(paths);
    }
    if let Some(limit) = opts.recursion_limit {
        config = config.recursion_limit(limit);
    }

    let report = match Generator::new(config).run() {
        Ok(report) => report,
        Err(Error::Validation(errors)) => {
            let failed = FailedOutput {
                valid: false,
                diagnostics: diagnostic_entries(&errors),
            };
            print_output(&failed, opts.global, |_| print_binding_errors(&errors))?;
            bail!("generation aborted, no file was written");
        }
        Err(error) => return Err(error.into()),
    };

    let output = GenerateOutput {
        output_root: opts.output.display().to_string(),
        schema: schema.to_string(),
        processed: report.processed,
        written: report.written,
        unchanged: report.unchanged,
        files: report.files.iter().map(|path| relative(path, opts.output)).collect(),
    };

    print_output(&output, opts.global, |out| {
        for file in &out.files {
            println!("  {file}");
        }
        println!(
            "\n{} file(s) under {} ({} schema): {} written, {} unchanged.",
            out.processed, out.output_root, out.schema, out.written, out.unchanged
        );
    })
}

fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .map_or_else(|_| path.to_path_buf(), PathBuf::from)
        .display()
        .to_string()
}

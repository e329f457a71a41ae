use anyhow::bail;
use bindweaver::Generator;
use serde::Serialize;

use crate::{
    app::{GlobalOptions, ModuleArgs},
    commands::common::{base_config, role_name},
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct TypeEntry {
    module: String,
    role: String,
    kind: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct InspectOutput {
    types: Vec<TypeEntry>,
    count: usize,
}

const ROLES: [&str; 3] = ["implementation", "placeholder", "irrelevant"];

pub fn run(input: &ModuleArgs, role: Option<&str>, opts: &GlobalOptions) -> anyhow::Result<()> {
    if let Some(role) = role {
        if !ROLES.contains(&role) {
            bail!("unknown role: {role} (expected implementation, placeholder, or irrelevant)");
        }
    }

    let inspected = Generator::new(base_config(input)).inspect()?;
    let types: Vec<TypeEntry> = inspected
        .into_iter()
        .filter(|entry| role.map_or(true, |role| role_name(entry.role) == role))
        .map(|entry| TypeEntry {
            module: entry.module,
            role: role_name(entry.role).to_string(),
            kind: entry.role.kind().to_string(),
            name: entry.full_name,
        })
        .collect();

    let output = InspectOutput {
        count: types.len(),
        types,
    };

    print_output(&output, opts, |out| {
        let mut tw = TabWriter::new(&[
            ("Module", Align::Left),
            ("Role", Align::Left),
            ("Kind", Align::Left),
            ("Name", Align::Left),
        ]);
        for entry in &out.types {
            tw.row([
                entry.module.as_str(),
                entry.role.as_str(),
                entry.kind.as_str(),
                entry.name.as_str(),
            ]);
        }
        if !tw.is_empty() {
            tw.print();
        }
        println!("\n{} type(s) listed.", out.count);
    })
}

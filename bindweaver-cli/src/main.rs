mod app;
mod commands;
mod output;

use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\nCancelled.");
        std::process::exit(130);
    })
    .expect("failed to set Ctrl+C handler");

    let cli = Cli::parse();

    // bindweaver info+ on stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("bindweaver", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::Generate {
            input,
            output,
            schema,
            fast_invoke,
            suffix,
            sequential,
            recursion_limit,
        } => commands::generate::run(
            input,
            &commands::generate::GenerateOptions {
                output,
                schema,
                fast_invoke: fast_invoke.as_deref(),
                suffix,
                sequential: *sequential,
                recursion_limit: *recursion_limit,
                global: &cli.global,
            },
        ),
        Command::Check { input } => commands::check::run(input, &cli.global),
        Command::Inspect { input, role } => {
            commands::inspect::run(input, role.as_deref(), &cli.global)
        }
    }
}

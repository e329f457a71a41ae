use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// bindweaver - generate managed proxy sources from compiled module metadata
#[derive(Debug, Parser)]
#[command(name = "bindweaver", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Module inputs shared by every subcommand.
#[derive(Debug, Parser)]
pub struct ModuleArgs {
    /// Module files (.bmod) to process.
    #[arg(value_name = "MODULE", required = true)]
    pub modules: Vec<PathBuf>,

    /// Directory probed for referenced modules (repeatable).
    #[arg(short, long = "search-path", value_name = "DIR")]
    pub search_paths: Vec<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate binding sources for one or more modules.
    Generate {
        #[command(flatten)]
        input: ModuleArgs,

        /// Output root directory.
        #[arg(short, long, value_name = "DIR", default_value = bindweaver::generator::DEFAULT_OUTPUT_ROOT)]
        output: PathBuf,

        /// Binding schema: native, blueprint, or managed.
        #[arg(long, default_value = "native")]
        schema: String,

        /// File listing functions to emit on the direct call path, one native path per line.
        #[arg(long, value_name = "FILE")]
        fast_invoke: Option<PathBuf>,

        /// Generated file suffix.
        #[arg(long, default_value = bindweaver::context::GENERATED_SUFFIX)]
        suffix: String,

        /// Render on the calling thread only.
        #[arg(long)]
        sequential: bool,

        /// Maximum nesting depth of generic arguments and delegate signatures.
        #[arg(long)]
        recursion_limit: Option<usize>,
    },

    /// Classify and validate modules without writing anything.
    Check {
        #[command(flatten)]
        input: ModuleArgs,
    },

    /// List every declaration of the modules with its classification.
    Inspect {
        #[command(flatten)]
        input: ModuleArgs,

        /// Show only declarations with this role: implementation, placeholder, or irrelevant.
        #[arg(long)]
        role: Option<String>,
    },
}

//! Command-line parsing for the transformation inference tool.
//!
//! Argument parsing and command dispatch stay separate from the
//! inference/synthesis code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "xform",
    version,
    about = "Infer reusable transformation rules from example pairs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Infer a transformation rule from training pairs and print it.
    Infer(InferArgs),
    /// Infer a rule and apply it to a test CSV.
    Apply(ApplyArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct InferArgs {
    /// Training CSV with `source` and `target` columns.
    #[arg(short = 't', long)]
    pub train: PathBuf,

    /// Emit the inferred rule as JSON instead of text.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Show the rule applied back to the training inputs.
    #[arg(long, default_value_t = false)]
    pub preview: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct ApplyArgs {
    /// Training CSV with `source` and `target` columns.
    #[arg(short = 't', long)]
    pub train: PathBuf,

    /// Test CSV with a `source` column.
    #[arg(long)]
    pub test: PathBuf,

    /// Output CSV path. When omitted, a preview table is printed instead.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - builds the generation backend from the environment
//! - runs inference and/or application
//! - prints reports and writes optional exports

use clap::Parser;

use crate::cli::{ApplyArgs, Cli, Command, InferArgs};
use crate::error::{AppError, ErrorKind};
use crate::llm::GenerativeBackend;
use crate::report::{format_preview, PreviewRow};

pub mod pipeline;

/// Entry point for the `xform` binary.
pub fn run() -> Result<(), AppError> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Infer(args) => handle_infer(args),
        Command::Apply(args) => handle_apply(args),
    }
}

fn init_logging() {
    // RUST_LOG still wins; `warn` keeps normal runs quiet.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();
}

fn handle_infer(args: InferArgs) -> Result<(), AppError> {
    let backend = GenerativeBackend::from_env()?;
    let output = pipeline::run_infer(&args.train, &backend)?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&output.result).map_err(|e| {
            AppError::new(
                ErrorKind::Io,
                format!("Failed to serialize inference result: {e}"),
            )
        })?;
        println!("{rendered}");
    } else {
        println!("{}", output.result.description);
        if output.result.used_fallback {
            println!("\nNote: the first synthesized routine failed validation; this is the regenerated one.");
        }
    }

    if args.preview {
        let sources: Vec<String> = output.ingest.examples.sources();
        let predictions = crate::infer::apply_batch(&output.result.rule, &sources)?;
        let rows: Vec<PreviewRow> = output
            .ingest
            .examples
            .pairs()
            .iter()
            .zip(predictions)
            .map(|(pair, predicted)| PreviewRow {
                input: pair.source.clone(),
                expected: Some(pair.target.clone()),
                predicted,
            })
            .collect();
        println!("\n{}", format_preview(&rows));
    }

    Ok(())
}

fn handle_apply(args: ApplyArgs) -> Result<(), AppError> {
    let backend = GenerativeBackend::from_env()?;
    let run = pipeline::run_apply(&args.train, &args.test, &backend)?;

    println!("{}", run.result.description);

    match &args.output {
        Some(path) => {
            crate::io::write_predictions(path, &run.table, &run.predictions)?;
            println!(
                "\nWrote {} predictions to '{}'.",
                run.predictions.len(),
                path.display()
            );
        }
        None => {
            let rows: Vec<PreviewRow> = run
                .table
                .source_values()
                .into_iter()
                .zip(&run.predictions)
                .map(|(input, predicted)| PreviewRow {
                    input,
                    expected: None,
                    predicted: predicted.clone(),
                })
                .collect();
            println!("\n{}", format_preview(&rows));
        }
    }

    Ok(())
}

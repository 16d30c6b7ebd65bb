use std::path::{Path, PathBuf};

use isochron_core::{initialize_session, BlockOutcome, SessionRecord};

use super::helpers::{ensure_output_dir, read_session, synthetic_session, write_json};
use super::CliError;

#[derive(clap::Args)]
pub(super) struct InitArgs {
    /// Session JSON path
    #[arg(long)]
    session: PathBuf,

    /// Output directory for per-block model files
    #[arg(long, default_value = "models")]
    output: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct DemoArgs {
    /// Number of synthetic blocks to generate
    #[arg(long, default_value_t = 3)]
    blocks: usize,

    /// Output directory for per-block model files
    #[arg(long, default_value = "demo-models")]
    output: PathBuf,

    /// Also write the generated session to this path
    #[arg(long)]
    emit_session: Option<PathBuf>,
}

pub(super) fn run_init_command(args: InitArgs) -> Result<i32, CliError> {
    let session = read_session(&args.session)?;
    initialize_and_report(&session, &args.output)
}

pub(super) fn run_demo_command(args: DemoArgs) -> Result<i32, CliError> {
    if args.blocks == 0 {
        return Err(CliError::Usage(
            "at least one synthetic block is required".to_string(),
        ));
    }

    let session = synthetic_session(args.blocks);
    if let Some(path) = &args.emit_session {
        write_json(path, &session)?;
        println!("session written to {}", path.display());
    }
    initialize_and_report(&session, &args.output)
}

fn initialize_and_report(session: &SessionRecord, output: &Path) -> Result<i32, CliError> {
    ensure_output_dir(output)?;
    let outcomes = initialize_session(&session.blocks, &session.method, session.config);

    let mut failed = 0_usize;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(initialized) => {
                write_json(&model_path(output, outcome), &initialized)?;
                println!(
                    "block {}: {} parameters, log ratios {:?}",
                    outcome.block_number,
                    initialized.model.parameter_count(),
                    initialized.model.log_ratios,
                );
            }
            Err(error) => {
                failed += 1;
                eprintln!("block {}: {error}", outcome.block_number);
            }
        }
    }

    println!(
        "initialized {} of {} blocks into {}",
        outcomes.len() - failed,
        outcomes.len(),
        output.display()
    );
    Ok(if failed == 0 { 0 } else { 1 })
}

fn model_path(output: &Path, outcome: &BlockOutcome) -> PathBuf {
    output.join(format!("block-{:03}.json", outcome.block_number))
}

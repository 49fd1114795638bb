//! Resample command for putting a column onto a fixed grid.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;

use coda_core::{ResampleOptions, resample};

use crate::project::outcome_verb;
use crate::{Config, Project};

#[derive(Debug, Args)]
pub struct ResampleArgs {
    /// Column to resample.
    pub column: String,

    /// Grid step in milliseconds (default: `resample_step_ms` from config).
    #[arg(long)]
    pub step: Option<i64>,

    /// First grid instant (default: earliest onset).
    #[arg(long)]
    pub start: Option<i64>,

    /// Last grid instant, inclusive (default: latest offset).
    #[arg(long)]
    pub stop: Option<i64>,

    /// Output column name (default: `<column>_resampled`).
    #[arg(long)]
    pub name: Option<String>,
}

pub fn run<W: Write>(writer: &mut W, args: &ResampleArgs, config: &Config) -> Result<()> {
    let mut project = Project::open(config)?;
    let step = args.step.unwrap_or(config.resample_step_ms);
    let options = ResampleOptions {
        start: args.start,
        stop: args.stop,
        name: args.name.clone(),
    };

    let resampled = resample(project.column(&args.column)?, step, &options)
        .with_context(|| format!("failed to resample {}", args.column))?;
    let name = resampled.name().to_string();
    let cells = resampled.len();
    let outcome = project.store(resampled)?;
    project.save()?;

    writeln!(
        writer,
        "{} column {name} with {cells} cells ({step} ms step)",
        outcome_verb(&outcome)
    )?;
    Ok(())
}

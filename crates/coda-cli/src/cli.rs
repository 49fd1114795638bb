//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::check_rel::CheckRelArgs;
use crate::commands::columns::ColumnsArgs;
use crate::commands::import_legacy::ImportLegacyArgs;
use crate::commands::kappa::KappaArgs;
use crate::commands::make_rel::MakeRelArgs;
use crate::commands::merge::MergeArgs;
use crate::commands::nest::NestArgs;
use crate::commands::resample::ResampleArgs;
use crate::commands::validate::ValidateArgs;

/// Behavioral coding spreadsheet engine.
///
/// Merges, resamples and cross-checks timed annotation columns stored in a
/// coda project file.
#[derive(Debug, Parser)]
#[command(name = "coda", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Project file to operate on (overrides `project_path` from config).
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List, rename, hide or delete columns.
    Columns(ColumnsArgs),

    /// Merge columns into one timeline of mutually exclusive cells.
    Merge(MergeArgs),

    /// Resample a column onto a fixed time grid.
    Resample(ResampleArgs),

    /// Compute Cohen's kappa between a primary and a reliability column.
    Kappa(KappaArgs),

    /// Cross-check a reliability column against its primary.
    CheckRel(CheckRelArgs),

    /// Create a blank reliability column from a primary column.
    MakeRel(MakeRelArgs),

    /// Print cells nested inside cells of other columns.
    Nest(NestArgs),

    /// Report code values that fail validation rules.
    Validate(ValidateArgs),

    /// Import columns from a legacy tick-timed text file.
    ImportLegacy(ImportLegacyArgs),
}

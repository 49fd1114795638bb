//! Merge command for building combined timelines from several columns.

use std::io::Write;

use anyhow::{Result, bail};
use clap::Args;

use coda_core::{Column, create_mutually_exclusive, merge_columns};

use crate::project::outcome_verb;
use crate::{Config, Project};

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Name of the merged column.
    #[arg(long)]
    pub name: String,

    /// Source columns. Exactly two unless `--widen` is given.
    #[arg(required = true, num_args = 1..)]
    pub columns: Vec<String>,

    /// Code prefix for the first column (default: its name).
    #[arg(long)]
    pub prefix_a: Option<String>,

    /// Code prefix for the second column (default: its name).
    #[arg(long)]
    pub prefix_b: Option<String>,

    /// Merge any number of columns, widening point cells to 1 ms.
    #[arg(long)]
    pub widen: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &MergeArgs, config: &Config) -> Result<()> {
    let mut project = Project::open(config)?;

    let merged = {
        let sources: Vec<&Column> = args
            .columns
            .iter()
            .map(|name| project.column(name))
            .collect::<Result<_>>()?;

        if args.widen {
            if args.prefix_a.is_some() || args.prefix_b.is_some() {
                bail!("--prefix-a/--prefix-b cannot be combined with --widen");
            }
            merge_columns(&args.name, &sources)?
        } else {
            let [a, b] = sources.as_slice() else {
                bail!(
                    "merge takes exactly two columns, got {} (use --widen for more)",
                    sources.len()
                );
            };
            create_mutually_exclusive(
                &args.name,
                a,
                b,
                args.prefix_a.as_deref(),
                args.prefix_b.as_deref(),
            )?
        }
    };

    let cells = merged.len();
    let name = merged.name().to_string();
    let outcome = project.store(merged)?;
    project.save()?;

    writeln!(
        writer,
        "{} column {name} with {cells} cells from {}",
        outcome_verb(&outcome),
        args.columns.join(", ")
    )?;
    Ok(())
}

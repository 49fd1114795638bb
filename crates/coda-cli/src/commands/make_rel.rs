//! Make-rel command for preparing a column for a second coder.

use std::io::Write;

use anyhow::Result;
use clap::Args;

use coda_core::make_reliability;

use crate::project::outcome_verb;
use crate::{Config, Project};

#[derive(Debug, Args)]
pub struct MakeRelArgs {
    /// Column to sample cells from.
    pub source: String,

    /// Name of the new column (default: `<source>_rel`).
    #[arg(long)]
    pub name: Option<String>,

    /// Copy every Nth cell, starting with the first.
    #[arg(long, default_value_t = 1)]
    pub every: usize,

    /// Code whose values are copied; repeat for several. Others stay blank.
    #[arg(long = "keep")]
    pub keep: Vec<String>,
}

pub fn run<W: Write>(writer: &mut W, args: &MakeRelArgs, config: &Config) -> Result<()> {
    let mut project = Project::open(config)?;
    let name = args
        .name
        .clone()
        .unwrap_or_else(|| format!("{}_rel", args.source));

    let column = make_reliability(
        &name,
        project.column(&args.source)?,
        args.every,
        args.keep.as_slice(),
    )?;
    let cells = column.len();
    let outcome = project.store(column)?;
    project.save()?;

    writeln!(
        writer,
        "{} column {name} with {cells} cells from {}",
        outcome_verb(&outcome),
        args.source
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::project::test_support::{column, project_with, reload};

    #[test]
    fn test_creates_sampled_column() {
        let (_temp, config) = project_with(vec![column(
            "trial",
            &["n", "hand"],
            &[(0, 10, &["1", "l"]), (20, 30, &["2", "r"]), (40, 50, &["3", "l"])],
        )]);
        let args = MakeRelArgs {
            source: "trial".to_string(),
            name: None,
            every: 2,
            keep: vec!["n".to_string()],
        };
        let mut output = Vec::new();
        run(&mut output, &args, &config).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Created column trial_rel with 2 cells from trial\n"
        );

        let columns = reload(&config);
        let rel = columns.get_column("trial_rel").unwrap();
        assert_eq!(rel.cells()[1].get_code("n").unwrap(), "3");
        assert_eq!(rel.cells()[1].get_code("hand").unwrap(), "");
    }
}

//! Nest command for printing cells grouped under enclosing cells.

use std::io::Write;

use anyhow::Result;
use clap::{Args, ValueEnum};

use coda_core::{Column, OverlapMode, format_rows, nest_cells};

use crate::{Config, Project};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum ModeArg {
    /// Only cells entirely inside the outer cell.
    #[default]
    Nested,
    /// Cells with any overlap.
    Any,
    /// Cells that span the outer cell's onset.
    Onset,
    /// Cells that span the outer cell's offset.
    Offset,
}

impl From<ModeArg> for OverlapMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Nested => Self::Nested,
            ModeArg::Any => Self::Any,
            ModeArg::Onset => Self::Onset,
            ModeArg::Offset => Self::Offset,
        }
    }
}

#[derive(Debug, Args)]
pub struct NestArgs {
    /// Columns from outermost to innermost.
    #[arg(required = true, num_args = 1..)]
    pub columns: Vec<String>,

    /// How inner cells must relate to the enclosing cell.
    #[arg(long, value_enum, default_value_t)]
    pub mode: ModeArg,

    /// Clamp inner intervals to the enclosing cell.
    #[arg(long)]
    pub trim: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &NestArgs, config: &Config) -> Result<()> {
    let project = Project::open(config)?;
    let columns: Vec<&Column> = args
        .columns
        .iter()
        .map(|name| project.column(name))
        .collect::<Result<_>>()?;

    let rows = nest_cells(&columns, args.mode.into(), args.trim)?;
    write!(writer, "{}", format_rows(&columns, &rows))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::project::test_support::{column, project_with};

    #[test]
    fn test_prints_trimmed_rows() {
        let (_temp, config) = project_with(vec![
            column("trial", &["n"], &[(0, 1000, &["1"])]),
            column("look", &["dir"], &[(900, 1200, &["l"])]),
        ]);
        let args = NestArgs {
            columns: vec!["trial".to_string(), "look".to_string()],
            mode: ModeArg::Any,
            trim: true,
        };
        let mut output = Vec::new();
        run(&mut output, &args, &config).unwrap();
        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                "trial.ordinal\ttrial.onset\ttrial.offset\ttrial.n\tlook.ordinal\tlook.onset\tlook.offset\tlook.dir",
                "1\t0\t1000\t1\t1\t900\t1000\tl",
            ]
        );
    }
}

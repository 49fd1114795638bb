//! Columns command for listing and editing the project's columns.

use std::io::Write;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use serde::Serialize;

use coda_core::{Column, ColumnSet, sanitize_name};

use crate::{Config, Project};

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    /// Output as JSON (listing only).
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub action: Option<ColumnsAction>,
}

#[derive(Debug, Subcommand)]
pub enum ColumnsAction {
    /// List columns (the default).
    List,
    /// Rename a column. The new name is sanitized like a code name.
    Rename { old: String, new: String },
    /// Hide a column from the spreadsheet view.
    Hide { name: String },
    /// Show a hidden column.
    Show { name: String },
    /// Delete a column.
    Delete { name: String },
}

/// One row of the column listing.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub codes: Vec<String>,
    pub cells: usize,
    pub onset: Option<i64>,
    pub offset: Option<i64>,
    pub hidden: bool,
}

impl From<&Column> for ColumnSummary {
    fn from(column: &Column) -> Self {
        let extent = column.extent();
        Self {
            name: column.name().to_string(),
            codes: column.code_names().map(str::to_string).collect(),
            cells: column.len(),
            onset: extent.map(|e| e.onset),
            offset: extent.map(|e| e.offset),
            hidden: column.is_hidden(),
        }
    }
}

pub fn summarize(columns: &ColumnSet) -> Vec<ColumnSummary> {
    columns.columns().iter().map(ColumnSummary::from).collect()
}

/// Formats the listing as an aligned table.
pub fn format_columns(summaries: &[ColumnSummary]) -> String {
    if summaries.is_empty() {
        return "No columns.\n".to_string();
    }
    let width = summaries
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0)
        .max("Name".len());

    let mut output = format!("{:<width$}  {:>5}  {:<15}  Codes\n", "Name", "Cells", "Extent");
    for summary in summaries {
        let extent = match (summary.onset, summary.offset) {
            (Some(onset), Some(offset)) => format!("{onset}-{offset}"),
            _ => "-".to_string(),
        };
        let mut codes = summary.codes.join(", ");
        if summary.hidden {
            codes.push_str(" (hidden)");
        }
        output.push_str(&format!(
            "{:<width$}  {:>5}  {:<15}  {}\n",
            summary.name, summary.cells, extent, codes
        ));
    }
    output
}

pub fn run<W: Write>(writer: &mut W, args: &ColumnsArgs, config: &Config) -> Result<()> {
    let mut project = Project::open(config)?;

    match args.action.as_ref().unwrap_or(&ColumnsAction::List) {
        ColumnsAction::List => {
            let summaries = summarize(&project.columns);
            if args.json {
                writeln!(writer, "{}", serde_json::to_string_pretty(&summaries)?)?;
            } else {
                write!(writer, "{}", format_columns(&summaries))?;
            }
            return Ok(());
        }
        ColumnsAction::Rename { old, new } => {
            let target = sanitize_name(new)?;
            if project.columns.column_names().contains(&target.as_str()) {
                bail!("column already exists: {target}");
            }
            let Some(column) = project.columns.delete_column(old) else {
                bail!("column not found: {old}");
            };
            project.columns.set_column(column, Some(&target), false)?;
            writeln!(writer, "Renamed column {old} to {target}")?;
        }
        ColumnsAction::Hide { name } | ColumnsAction::Show { name } => {
            let hidden = matches!(args.action, Some(ColumnsAction::Hide { .. }));
            let Some(column) = project.columns.get_column_mut(name) else {
                bail!("column not found: {name}");
            };
            column.set_hidden(hidden);
            let verb = if hidden { "Hid" } else { "Showed" };
            writeln!(writer, "{verb} column {name}")?;
        }
        ColumnsAction::Delete { name } => {
            if project.columns.delete_column(name).is_none() {
                bail!("column not found: {name}");
            }
            writeln!(writer, "Deleted column {name}")?;
        }
    }

    project.save()
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    use crate::project::test_support::{column, project_with, reload};

    fn sample() -> Vec<Column> {
        let mut trial = column("trial", &["n"], &[(0, 5000, &["1"])]);
        trial.set_hidden(true);
        vec![
            column("look", &["dir", "hand"], &[(0, 1000, &["l", "x"]), (1500, 2500, &["r", ""])]),
            trial,
            column("notes", &["text"], &[]),
        ]
    }

    fn run_action(config: &Config, action: Option<ColumnsAction>, json: bool) -> Result<String> {
        let mut output = Vec::new();
        run(&mut output, &ColumnsArgs { json, action }, config)?;
        Ok(String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_lists_columns() {
        let (_temp, config) = project_with(sample());
        let output = run_action(&config, None, false).unwrap();
        assert_snapshot!(output, @r"
        Name   Cells  Extent           Codes
        look       2  0-2500           dir, hand
        trial      1  0-5000           n (hidden)
        notes      0  -                text
        ");
    }

    #[test]
    fn test_lists_columns_as_json() {
        let (_temp, config) = project_with(sample());
        let output = run_action(&config, Some(ColumnsAction::List), true).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["name"], "look");
        assert_eq!(parsed[0]["cells"], 2);
        assert_eq!(parsed[2]["onset"], serde_json::Value::Null);
        assert_eq!(parsed[1]["hidden"], true);
    }

    #[test]
    fn test_rename_hide_and_delete_persist() {
        let (_temp, config) = project_with(sample());

        let output = run_action(
            &config,
            Some(ColumnsAction::Rename {
                old: "look".into(),
                new: "gaze dir".into(),
            }),
            false,
        )
        .unwrap();
        assert_eq!(output, "Renamed column look to gaze_dir\n");

        run_action(&config, Some(ColumnsAction::Show { name: "trial".into() }), false).unwrap();
        run_action(&config, Some(ColumnsAction::Delete { name: "notes".into() }), false).unwrap();

        let columns = reload(&config);
        assert_eq!(columns.column_names(), vec!["trial", "gaze_dir"]);
        assert!(!columns.columns()[0].is_hidden());
        assert_eq!(columns.columns()[1].len(), 2);
    }

    #[test]
    fn test_missing_columns_are_errors() {
        let (_temp, config) = project_with(sample());
        let err = run_action(&config, Some(ColumnsAction::Delete { name: "nope".into() }), false)
            .unwrap_err();
        assert!(err.to_string().contains("column not found: nope"));

        let err = run_action(
            &config,
            Some(ColumnsAction::Rename {
                old: "look".into(),
                new: "trial".into(),
            }),
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}

//! Kappa command for per-code Cohen's kappa between two coders.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use clap::Args;

use coda_core::{KappaReport, compute_kappa};

use crate::{Config, Project};

#[derive(Debug, Args)]
pub struct KappaArgs {
    /// Primary coder's column.
    pub primary: String,

    /// Reliability coder's column.
    pub reliability: String,

    /// Code to compare; repeat for several (default: all shared codes).
    #[arg(long = "code")]
    pub codes: Vec<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Formats a kappa report with one contingency table per code.
pub fn format_kappa(report: &KappaReport) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Matched cells: {}", report.matched_cells);
    for (code, kappa) in &report.kappas {
        let _ = writeln!(output);
        let _ = writeln!(output, "{code}: kappa = {kappa:.4}");
        if let Some(table) = report.tables.get(code) {
            output.push_str(&table.to_string());
        }
    }
    if !report.skipped.is_empty() {
        let _ = writeln!(output);
        for skipped in &report.skipped {
            let _ = writeln!(output, "skipped {}: {}", skipped.code, skipped.reason);
        }
    }
    output
}

pub fn run<W: Write>(writer: &mut W, args: &KappaArgs, config: &Config) -> Result<()> {
    let project = Project::open(config)?;
    let primary = project.column(&args.primary)?;
    let reliability = project.column(&args.reliability)?;

    let report = compute_kappa(primary, reliability, args.codes.as_slice())?;

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        write!(writer, "{}", format_kappa(&report))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    use crate::project::test_support::{column, project_with};

    fn project() -> (tempfile::TempDir, Config) {
        project_with(vec![
            column("pri", &["x", "y"], &[(0, 500, &["a", "k"]), (1000, 1500, &["b", "k"])]),
            column("rel", &["x", "y"], &[(0, 400, &["a", "k"]), (1000, 1200, &["b", "k"])]),
        ])
    }

    fn args(json: bool) -> KappaArgs {
        KappaArgs {
            primary: "pri".to_string(),
            reliability: "rel".to_string(),
            codes: Vec::new(),
            json,
        }
    }

    #[test]
    fn test_prints_kappa_tables_and_skips() {
        let (_temp, config) = project();
        let mut output = Vec::new();
        run(&mut output, &args(false), &config).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Matched cells: 2

        x: kappa = 1.0000
          a b
        a 1 0
        b 0 1

        skipped y: only 1 distinct value(s) observed
        ");
    }

    #[test]
    fn test_json_output() {
        let (_temp, config) = project();
        let mut output = Vec::new();
        run(&mut output, &args(true), &config).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&String::from_utf8(output).unwrap()).unwrap();
        assert_eq!(parsed["kappas"]["x"], 1.0);
        assert_eq!(parsed["skipped"][0]["code"], "y");
        assert_eq!(parsed["skipped"][0]["reason"], "too_few_values");
        assert_eq!(parsed["tables"]["x"]["values"][1], "b");
    }

    #[test]
    fn test_unknown_code_fails() {
        let (_temp, config) = project();
        let mut bad = args(false);
        bad.codes = vec!["z".to_string()];
        let err = run(&mut Vec::new(), &bad, &config).unwrap_err();
        assert!(err.to_string().contains("no code named `z`"));
    }
}

//! Check-rel command for cross-checking a reliability coder.
//!
//! Two modes:
//! - keyed (default): cells pair up by a match code and every other field
//!   is compared, with a timing tolerance
//! - `--continuous`: both columns are merged and disagreement regions are
//!   stored as a new column

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Result, bail};
use clap::Args;
use serde::Serialize;

use coda_core::reliability::Disagreement;
use coda_core::{ReliabilityCheck, check_reliability, check_reliability_continuous};

use crate::project::outcome_verb;
use crate::{Config, Project};

#[derive(Debug, Args)]
pub struct CheckRelArgs {
    /// Primary coder's column.
    pub primary: String,

    /// Reliability coder's column.
    pub reliability: String,

    /// Code whose value pairs reliability cells with primary cells.
    #[arg(long, required_unless_present = "continuous")]
    pub match_code: Option<String>,

    /// Allowed onset/offset difference in ms (default: `time_tolerance_ms`).
    #[arg(long)]
    pub tolerance: Option<i64>,

    /// Compare continuous coding instead of keyed cells.
    #[arg(long, conflicts_with = "match_code")]
    pub continuous: bool,

    /// Code compared where both coders are active (continuous mode).
    #[arg(long = "compare", requires = "continuous")]
    pub compare: Vec<String>,

    /// Minimum uncovered span in ms (default: `continuous_threshold_ms`).
    #[arg(long, requires = "continuous")]
    pub threshold: Option<i64>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Formats a keyed check as per-field agreement plus every mismatch.
pub fn format_check(check: &ReliabilityCheck) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "Checked {} reliability cells matched on {}",
        check.reliability_cells, check.match_code
    );
    let width = check.fields.iter().map(String::len).max().unwrap_or(0);
    for field in &check.fields {
        let errors = check.errors.get(field).copied().unwrap_or(0);
        let agreement = check
            .agreement(field)
            .map_or_else(|| "-".to_string(), |a| format!("{a:.1}%"));
        let _ = writeln!(output, "  {field:<width$}  {errors:>4} errors  {agreement:>7}");
    }
    if !check.mismatches.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "Mismatches:");
        for m in &check.mismatches {
            let _ = writeln!(
                output,
                "  primary {} / reliability {}: {} {:?} vs {:?}",
                m.primary_ordinal, m.reliability_ordinal, m.field, m.primary_value, m.reliability_value
            );
        }
    }
    if !check.unmatched.is_empty() {
        let unmatched: Vec<String> = check.unmatched.iter().map(u32::to_string).collect();
        let _ = writeln!(output);
        let _ = writeln!(output, "Unmatched reliability cells: {}", unmatched.join(", "));
    }
    output
}

/// Formats continuous-mode disagreements, one per line.
pub fn format_disagreements(disagreements: &[Disagreement], total_ms: i64) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{} disagreements covering {total_ms} ms",
        disagreements.len()
    );
    for d in disagreements {
        let ordinal = |o: Option<u32>| o.map_or_else(|| "-".to_string(), |o| o.to_string());
        let _ = write!(
            output,
            "  {}-{}  {:<14}  primary {} / reliability {}",
            d.interval.onset,
            d.interval.offset,
            d.kind.as_str(),
            ordinal(d.primary_ordinal),
            ordinal(d.reliability_ordinal)
        );
        if !d.codes.is_empty() {
            let _ = write!(output, "  [{}]", d.codes.join(", "));
        }
        output.push('\n');
    }
    output
}

#[derive(Debug, Serialize)]
struct JsonContinuous<'a> {
    column: &'a str,
    disagreement_ms: i64,
    disagreements: &'a [Disagreement],
}

pub fn run<W: Write>(writer: &mut W, args: &CheckRelArgs, config: &Config) -> Result<()> {
    if args.continuous {
        return run_continuous(writer, args, config);
    }
    let Some(match_code) = args.match_code.as_deref() else {
        bail!("--match-code is required unless --continuous is given");
    };

    let project = Project::open(config)?;
    let primary = project.column(&args.primary)?;
    let reliability = project.column(&args.reliability)?;
    let tolerance = args.tolerance.unwrap_or(config.time_tolerance_ms);

    let check = check_reliability(primary, reliability, match_code, tolerance)?;
    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&check)?)?;
    } else {
        write!(writer, "{}", format_check(&check))?;
    }
    Ok(())
}

fn run_continuous<W: Write>(writer: &mut W, args: &CheckRelArgs, config: &Config) -> Result<()> {
    let mut project = Project::open(config)?;
    let threshold = args.threshold.unwrap_or(config.continuous_threshold_ms);

    let result = check_reliability_continuous(
        project.column(&args.primary)?,
        project.column(&args.reliability)?,
        args.compare.as_slice(),
        threshold,
    )?;

    let column_name = result.column.name().to_string();
    if args.json {
        let json = JsonContinuous {
            column: &column_name,
            disagreement_ms: result.disagreement_ms,
            disagreements: &result.disagreements,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&json)?)?;
    } else {
        write!(
            writer,
            "{}",
            format_disagreements(&result.disagreements, result.disagreement_ms)
        )?;
    }

    let outcome = project.store(result.column)?;
    project.save()?;
    if !args.json {
        writeln!(writer, "{} column {column_name}", outcome_verb(&outcome))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    use crate::project::test_support::{column, project_with, reload};

    fn keyed_args() -> CheckRelArgs {
        CheckRelArgs {
            primary: "pri".to_string(),
            reliability: "rel".to_string(),
            match_code: Some("trial".to_string()),
            tolerance: None,
            continuous: false,
            compare: Vec::new(),
            threshold: None,
            json: false,
        }
    }

    fn keyed_project() -> (tempfile::TempDir, Config) {
        project_with(vec![
            column(
                "pri",
                &["trial", "hand"],
                &[(0, 1000, &["1", "l"]), (2000, 3000, &["2", "r"])],
            ),
            column(
                "rel",
                &["trial", "hand"],
                &[(10, 1000, &["1", "l"]), (2000, 3000, &["2", "l"]), (5000, 5100, &["9", "r"])],
            ),
        ])
    }

    #[test]
    fn test_keyed_report() {
        let (_temp, mut config) = keyed_project();
        config.time_tolerance_ms = 20;
        let mut output = Vec::new();
        run(&mut output, &keyed_args(), &config).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @r#"
        Checked 3 reliability cells matched on trial
          onset      0 errors   100.0%
          offset     0 errors   100.0%
          hand       1 errors    66.7%

        Mismatches:
          primary 2 / reliability 2: hand "r" vs "l"

        Unmatched reliability cells: 3
        "#);
    }

    #[test]
    fn test_keyed_tolerance_from_flag() {
        let (_temp, config) = keyed_project();
        let mut args = keyed_args();
        args.json = true;
        let mut output = Vec::new();
        run(&mut output, &args, &config).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&String::from_utf8(output).unwrap()).unwrap();
        assert_eq!(parsed["errors"]["onset"], 1);

        args.tolerance = Some(10);
        let mut output = Vec::new();
        run(&mut output, &args, &config).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&String::from_utf8(output).unwrap()).unwrap();
        assert_eq!(parsed["errors"]["onset"], 0);
    }

    #[test]
    fn test_continuous_stores_disagreement_column() {
        let (_temp, config) = project_with(vec![
            column("pri", &["x"], &[(1, 1000, &["a"]), (2000, 2100, &["b"])]),
            column("rel", &["x"], &[(1, 1000, &["c"])]),
        ]);
        let args = CheckRelArgs {
            match_code: None,
            continuous: true,
            compare: vec!["x".to_string()],
            ..keyed_args()
        };
        let mut output = Vec::new();
        run(&mut output, &args, &config).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        2 disagreements covering 1099 ms
          1-1000  code_mismatch   primary 1 / reliability 1  [x]
          2000-2100  missed_cell     primary 2 / reliability -
        Created column pri_vs_rel
        ");

        let columns = reload(&config);
        let stored = columns.get_column("pri_vs_rel").unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored.cells()[1].get_code("kind").unwrap(), "missed_cell");
    }

    #[test]
    fn test_missing_match_code_is_an_error() {
        let (_temp, config) = keyed_project();
        let args = CheckRelArgs {
            match_code: None,
            ..keyed_args()
        };
        let err = run(&mut Vec::new(), &args, &config).unwrap_err();
        assert!(err.to_string().contains("--match-code"));
    }
}

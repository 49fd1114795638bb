//! Validate command for reporting code values that break the coding scheme.

use std::io::Write;

use anyhow::{Context, Result, bail};
use clap::Args;

use coda_core::{Column, ValidatorSet, check_valid_codes_in};

use crate::{Config, Project};

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Columns to check; every rule applies to each.
    #[arg(required = true, num_args = 1..)]
    pub columns: Vec<String>,

    /// Allowed values, as `code=a,b,c`. Repeatable.
    #[arg(long = "one-of", value_name = "CODE=VALUES")]
    pub one_of: Vec<String>,

    /// Regex that must match somewhere in the value, as `code=pattern`.
    #[arg(long = "pattern", value_name = "CODE=REGEX")]
    pub patterns: Vec<String>,

    /// Code that must not be blank. Repeatable.
    #[arg(long = "non-empty", value_name = "CODE")]
    pub non_empty: Vec<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

fn split_rule(rule: &str) -> Result<(&str, &str)> {
    rule.split_once('=')
        .with_context(|| format!("invalid rule `{rule}`, expected CODE=VALUE"))
}

/// Builds the validator set described by the command-line rules.
pub fn build_validators(args: &ValidateArgs) -> Result<ValidatorSet> {
    let mut validators = ValidatorSet::new();
    for rule in &args.one_of {
        let (code, values) = split_rule(rule)?;
        validators = validators.one_of(code, values.split(',').map(str::trim));
    }
    for rule in &args.patterns {
        let (code, pattern) = split_rule(rule)?;
        validators = validators.pattern(code, pattern)?;
    }
    for code in &args.non_empty {
        validators = validators.predicate(code, |value| !value.trim().is_empty());
    }
    if validators.is_empty() {
        bail!("no validation rules given (use --one-of, --pattern or --non-empty)");
    }
    Ok(validators)
}

pub fn run<W: Write>(writer: &mut W, args: &ValidateArgs, config: &Config) -> Result<()> {
    let validators = build_validators(args)?;
    let project = Project::open(config)?;
    let columns: Vec<&Column> = args
        .columns
        .iter()
        .map(|name| project.column(name))
        .collect::<Result<_>>()?;

    let pairs: Vec<(&Column, &ValidatorSet)> =
        columns.iter().map(|column| (*column, &validators)).collect();
    let invalid = check_valid_codes_in(&pairs)?;

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&invalid)?)?;
        return Ok(());
    }
    if invalid.is_empty() {
        writeln!(writer, "All values valid.")?;
        return Ok(());
    }
    writeln!(writer, "{} invalid values:", invalid.len())?;
    for row in &invalid {
        writeln!(writer, "  {row}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    use crate::project::test_support::{column, project_with};

    fn args(columns: &[&str]) -> ValidateArgs {
        ValidateArgs {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            one_of: Vec::new(),
            patterns: Vec::new(),
            non_empty: Vec::new(),
            json: false,
        }
    }

    fn project() -> (tempfile::TempDir, Config) {
        project_with(vec![
            column("look", &["hand", "trial"], &[(0, 10, &["x", "1"]), (20, 30, &["l", ""])]),
            column("reach", &["hand", "trial"], &[(0, 10, &["r", "t2"])]),
        ])
    }

    #[test]
    fn test_reports_each_bad_value() {
        let (_temp, config) = project();
        let mut args = args(&["look", "reach"]);
        args.one_of = vec!["hand=l, r".to_string()];
        args.patterns = vec![r"trial=^\d+$".to_string()];
        args.non_empty = vec!["trial".to_string()];

        let mut output = Vec::new();
        run(&mut output, &args, &config).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @r#"
        4 invalid values:
          look[1].hand = "x"
          look[2].trial = ""
          look[2].trial = ""
          reach[1].trial = "t2"
        "#);
    }

    #[test]
    fn test_clean_columns() {
        let (_temp, config) = project();
        let mut args = args(&["reach"]);
        args.one_of = vec!["hand=l,r".to_string()];
        let mut output = Vec::new();
        run(&mut output, &args, &config).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "All values valid.\n");
    }

    #[test]
    fn test_rejects_bad_rules() {
        let (_temp, config) = project();
        let err = run(&mut Vec::new(), &args(&["look"]), &config).unwrap_err();
        assert!(err.to_string().contains("no validation rules"));

        let mut bad = args(&["look"]);
        bad.one_of = vec!["hand".to_string()];
        let err = run(&mut Vec::new(), &bad, &config).unwrap_err();
        assert!(err.to_string().contains("expected CODE=VALUE"));

        let mut unknown = args(&["look"]);
        unknown.non_empty = vec!["foot".to_string()];
        let err = run(&mut Vec::new(), &unknown, &config).unwrap_err();
        assert!(err.to_string().contains("no code named `foot`"));
    }
}

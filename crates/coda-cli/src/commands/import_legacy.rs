//! Import-legacy command for bringing tick-timed text exports into a project.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use coda_store::legacy::import_legacy_file;

use crate::project::outcome_verb;
use crate::{Config, Project};

#[derive(Debug, Args)]
pub struct ImportLegacyArgs {
    /// Legacy text file to import.
    pub file: PathBuf,
}

pub fn run<W: Write>(writer: &mut W, args: &ImportLegacyArgs, config: &Config) -> Result<()> {
    let columns = import_legacy_file(&args.file)
        .with_context(|| format!("failed to import {}", args.file.display()))?;

    let mut project = Project::open_or_create(config)?;
    let mut lines = Vec::with_capacity(columns.len());
    for column in columns {
        let line = format!("{} cells", column.len());
        let name = column.name().to_string();
        let outcome = project.store(column)?;
        lines.push(format!("  {} {name} ({line})", outcome_verb(&outcome)));
    }
    project.save()?;

    writeln!(
        writer,
        "Imported {} columns from {}",
        lines.len(),
        args.file.display()
    )?;
    for line in lines {
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::project::test_support::reload;

    #[test]
    fn test_imports_into_new_project() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("old.txt");
        std::fs::write(
            &file,
            "variable\tlook\tdir\n0\t60\tl\n120\t180\tr\nvariable\ttrial\tn\n0\t600\t1\n",
        )
        .unwrap();
        let config = Config {
            project_path: Some(temp.path().join("study.coda")),
            ..Config::default()
        };

        let mut output = Vec::new();
        run(&mut output, &ImportLegacyArgs { file }, &config).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("Imported 2 columns from"));
        assert!(output.contains("  Created look (2 cells)"));

        let columns = reload(&config);
        assert_eq!(columns.column_names(), vec!["look", "trial"]);
        assert_eq!(columns.columns()[0].cells()[1].onset(), 2000);
    }

    #[test]
    fn test_malformed_file_leaves_project_untouched() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("bad.txt");
        std::fs::write(&file, "variable\tlook\tdir\n0\tsixty\tl\n").unwrap();
        let config = Config {
            project_path: Some(temp.path().join("study.coda")),
            ..Config::default()
        };

        let err = run(&mut Vec::new(), &ImportLegacyArgs { file }, &config).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
        assert!(!temp.path().join("study.coda").exists());
    }

    #[test]
    fn test_names_that_sanitize_alike_abort_import() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("old.txt");
        std::fs::write(&file, "variable\ta b\tdir\n0\t60\tl\nvariable\ta-b\tdir\n0\t600\tr\n")
            .unwrap();
        let config = Config {
            project_path: Some(temp.path().join("study.coda")),
            ..Config::default()
        };

        let err = run(&mut Vec::new(), &ImportLegacyArgs { file }, &config).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("line 3"), "{message}");
        assert!(message.contains("duplicate variable"), "{message}");
        assert!(!temp.path().join("study.coda").exists());
    }
}

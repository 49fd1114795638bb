//! Opening, editing and saving the project file a command works on.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use coda_core::{Column, ColumnSet, SetOutcome};
use coda_store::{ProjectMetadata, StoreError};

use crate::Config;

/// A loaded project plus where it came from.
#[derive(Debug)]
pub struct Project {
    pub path: PathBuf,
    pub columns: ColumnSet,
    pub metadata: ProjectMetadata,
}

impl Project {
    /// Opens the configured project. The file must exist.
    pub fn open(config: &Config) -> Result<Self> {
        let path = project_path(config)?;
        let (columns, metadata) = coda_store::load(path)
            .with_context(|| format!("failed to open project {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            columns,
            metadata,
        })
    }

    /// Opens the configured project, starting an empty one if the file does
    /// not exist yet.
    pub fn open_or_create(config: &Config) -> Result<Self> {
        let path = project_path(config)?;
        match coda_store::load(path) {
            Ok((columns, metadata)) => Ok(Self {
                path: path.to_path_buf(),
                columns,
                metadata,
            }),
            Err(StoreError::NotFound { .. }) => {
                let name = path
                    .file_stem()
                    .map_or_else(|| "project".to_string(), |s| s.to_string_lossy().into_owned());
                tracing::info!(path = %path.display(), "starting new project");
                Ok(Self {
                    path: path.to_path_buf(),
                    columns: ColumnSet::new(),
                    metadata: ProjectMetadata::new(name),
                })
            }
            Err(err) => {
                Err(err).with_context(|| format!("failed to open project {}", path.display()))
            }
        }
    }

    /// Looks up a column the command cannot do without.
    pub fn column(&self, name: &str) -> Result<&Column> {
        Ok(self.columns.require_column(name)?)
    }

    /// Stores a column produced by a command, replacing any column of the
    /// same name.
    pub fn store(&mut self, column: Column) -> Result<SetOutcome> {
        let name = column.name().to_string();
        self.columns
            .set_column(column, None, true)
            .with_context(|| format!("failed to store column {name}"))
    }

    pub fn save(&mut self) -> Result<()> {
        coda_store::save(&self.columns, &mut self.metadata, &self.path)
            .with_context(|| format!("failed to save project {}", self.path.display()))
    }
}

fn project_path(config: &Config) -> Result<&Path> {
    config
        .project_path
        .as_deref()
        .context("no project file given; pass --project or set project_path")
}

/// Describes a [`SetOutcome`] for command output.
pub const fn outcome_verb(outcome: &SetOutcome) -> &'static str {
    match outcome {
        SetOutcome::Created => "Created",
        SetOutcome::Recreated => "Replaced",
        SetOutcome::Patched { .. } => "Updated",
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    use coda_core::Interval;
    use tempfile::TempDir;

    /// Builds a column from `(onset, offset, values)` triples.
    pub fn column(name: &str, codes: &[&str], cells: &[(i64, i64, &[&str])]) -> Column {
        let mut col = Column::new(name, codes).unwrap();
        for &(onset, offset, values) in cells {
            col.push_cell(Interval::new(onset, offset), values.iter().copied())
                .unwrap();
        }
        col
    }

    /// Saves `columns` to a fresh project and returns a config pointing at it.
    pub fn project_with(columns: Vec<Column>) -> (TempDir, Config) {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("study.coda");
        let mut set = ColumnSet::new();
        for column in columns {
            set.set_column(column, None, false).unwrap();
        }
        coda_store::save(&set, &mut ProjectMetadata::new("study"), &path).unwrap();
        let config = Config {
            project_path: Some(path),
            ..Config::default()
        };
        (temp, config)
    }

    pub fn reload(config: &Config) -> ColumnSet {
        coda_store::load(config.project_path.as_ref().unwrap()).unwrap().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_requires_a_path() {
        let err = Project::open(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("no project file given"));
    }

    #[test]
    fn test_open_missing_file_fails_but_open_or_create_starts_fresh() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            project_path: Some(temp.path().join("new.coda")),
            ..Config::default()
        };
        assert!(Project::open(&config).is_err());

        let mut project = Project::open_or_create(&config).unwrap();
        assert!(project.columns.is_empty());
        assert_eq!(project.metadata.name, "new");
        project.save().unwrap();
        assert!(Project::open(&config).is_ok());
    }

    #[test]
    fn test_store_sanitizes_and_replaces() {
        let (_temp, config) = test_support::project_with(vec![]);
        let mut project = Project::open(&config).unwrap();
        let first = project.store(Column::new("my col", ["v"]).unwrap()).unwrap();
        assert_eq!(first, SetOutcome::Created);
        let second = project.store(Column::new("my_col", ["v"]).unwrap()).unwrap();
        assert_eq!(second, SetOutcome::Recreated);
        assert_eq!(project.columns.column_names(), vec!["my_col"]);
        assert!(project.column("nope").is_err());
    }
}

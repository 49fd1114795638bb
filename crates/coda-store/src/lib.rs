//! Project files for coda.
//!
//! A project is a single `SQLite` file holding every column of a coding
//! spreadsheet plus a little metadata. Saving always writes a fresh file
//! beside the destination and renames it into place, so a failed save never
//! leaves a half-written project behind.
//!
//! # Schema
//!
//! - `meta`: key/value pairs (`name`, `created_at`, `saved_at`, `format_version`)
//! - `columns`: one row per column, ordered by `position`
//! - `codes`: the column schema, ordered by `position` within each column
//! - `cells`: one row per cell; `code_values` is a JSON array of strings
//!   aligned with the column's codes
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond
//! precision, always UTC.

pub mod legacy;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use coda_core::{Column, ColumnSet, Interval};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The project file does not exist.
    #[error("project file not found: {}", path.display())]
    NotFound { path: PathBuf },
    /// The file exists but is not a readable project.
    #[error("{} is not a readable project: {message}", path.display())]
    Format { path: PathBuf, message: String },
    /// Filesystem failure while saving or reading.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A malformed line in a legacy import.
    #[error("line {line}: {message}")]
    Import { line: usize, message: String },
}

/// Project-level information saved alongside the columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub saved_at: Option<DateTime<Utc>>,
    pub format_version: u32,
}

impl ProjectMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: truncate_millis(Utc::now()),
            saved_at: None,
            format_version: FORMAT_VERSION,
        }
    }
}

/// Loads a project file.
pub fn load(path: &Path) -> Result<(ColumnSet, ProjectMetadata), StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| format_error(path, e.to_string()))?;

    let loaded = read_metadata(&conn, path)
        .and_then(|metadata| Ok((read_columns(&conn, path)?, metadata)))
        .map_err(|e| match e {
            StoreError::Sqlite(err) => format_error(path, err.to_string()),
            other => other,
        })?;

    tracing::debug!(
        path = %path.display(),
        columns = loaded.0.len(),
        "loaded project"
    );
    Ok(loaded)
}

/// Saves a project file, replacing any existing file at `path`.
///
/// `metadata.saved_at` is set to the save time before writing.
pub fn save(
    columns: &ColumnSet,
    metadata: &mut ProjectMetadata,
    path: &Path,
) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !parent.is_dir() {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "destination directory does not exist"),
        });
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "destination has no file name"),
        })?;
    let staging = parent.join(format!(".{file_name}.saving"));
    if staging.exists() {
        fs::remove_file(&staging).map_err(|source| StoreError::Io {
            path: staging.clone(),
            source,
        })?;
    }

    metadata.saved_at = Some(truncate_millis(Utc::now()));
    metadata.format_version = FORMAT_VERSION;

    let written = write_project(&staging, columns, metadata);
    if let Err(err) = written {
        let _ = fs::remove_file(&staging);
        return Err(err);
    }
    fs::rename(&staging, path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(
        path = %path.display(),
        columns = columns.len(),
        "saved project"
    );
    Ok(())
}

fn write_project(
    path: &Path,
    columns: &ColumnSet,
    metadata: &ProjectMetadata,
) -> Result<(), StoreError> {
    let mut conn = Connection::open(path).map_err(|e| match e {
        rusqlite::Error::SqliteFailure(_, _) => StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, e.to_string()),
        },
        other => StoreError::Sqlite(other),
    })?;
    init(&conn)?;

    let tx = conn.transaction()?;
    {
        let mut meta_stmt = tx.prepare("INSERT INTO meta (key, value) VALUES (?, ?)")?;
        meta_stmt.execute(params!["name", metadata.name])?;
        meta_stmt.execute(params!["created_at", format_timestamp(metadata.created_at)])?;
        if let Some(saved_at) = metadata.saved_at {
            meta_stmt.execute(params!["saved_at", format_timestamp(saved_at)])?;
        }
        meta_stmt.execute(params!["format_version", metadata.format_version.to_string()])?;
    }
    {
        let mut column_stmt = tx.prepare(
            "INSERT INTO columns (id, position, name, hidden) VALUES (?, ?, ?, ?)",
        )?;
        let mut code_stmt =
            tx.prepare("INSERT INTO codes (column_id, position, name) VALUES (?, ?, ?)")?;
        let mut cell_stmt = tx.prepare(
            "
            INSERT INTO cells (column_id, ordinal, onset_ms, offset_ms, code_values)
            VALUES (?, ?, ?, ?, ?)
            ",
        )?;
        for (position, column) in (0_i64..).zip(columns.columns()) {
            let id = column.id().to_string();
            column_stmt.execute(params![id, position, column.name(), column.is_hidden()])?;
            for (code_position, code) in (0_i64..).zip(column.code_names()) {
                code_stmt.execute(params![id, code_position, code])?;
            }
            for cell in column.cells() {
                let values =
                    Value::Array(cell.values().map(Value::from).collect()).to_string();
                cell_stmt.execute(params![
                    id,
                    cell.ordinal(),
                    cell.onset(),
                    cell.offset(),
                    values
                ])?;
            }
        }
    }
    tx.commit()?;
    Ok(())
}

/// Creates the project schema. Idempotent.
fn init(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS columns (
            id TEXT PRIMARY KEY,
            position INTEGER NOT NULL,
            name TEXT NOT NULL UNIQUE,
            hidden INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS codes (
            column_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            PRIMARY KEY (column_id, position),
            FOREIGN KEY (column_id) REFERENCES columns(id) ON DELETE CASCADE
        );

        -- code_values: JSON array of strings aligned with codes.position
        CREATE TABLE IF NOT EXISTS cells (
            column_id TEXT NOT NULL,
            ordinal INTEGER NOT NULL,
            onset_ms INTEGER NOT NULL,
            offset_ms INTEGER NOT NULL,
            code_values TEXT NOT NULL,
            PRIMARY KEY (column_id, ordinal),
            FOREIGN KEY (column_id) REFERENCES columns(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_columns_position ON columns(position);
        ",
    )?;
    Ok(())
}

fn read_metadata(conn: &Connection, path: &Path) -> Result<ProjectMetadata, StoreError> {
    let get = |key: &str| -> Result<Option<String>, StoreError> {
        Ok(conn
            .query_row("SELECT value FROM meta WHERE key = ?", [key], |row| row.get(0))
            .optional()?)
    };
    let require = |key: &str| -> Result<String, StoreError> {
        get(key)?.ok_or_else(|| format_error(path, format!("missing metadata key `{key}`")))
    };

    let format_version: u32 = require("format_version")?
        .parse()
        .map_err(|_| format_error(path, "format_version is not a number"))?;
    if format_version > FORMAT_VERSION {
        return Err(format_error(
            path,
            format!("format version {format_version} is newer than supported {FORMAT_VERSION}"),
        ));
    }

    Ok(ProjectMetadata {
        name: require("name")?,
        created_at: parse_timestamp(&require("created_at")?, path)?,
        saved_at: get("saved_at")?
            .map(|raw| parse_timestamp(&raw, path))
            .transpose()?,
        format_version,
    })
}

struct ColumnRow {
    id: String,
    name: String,
    hidden: bool,
}

fn read_columns(conn: &Connection, path: &Path) -> Result<ColumnSet, StoreError> {
    let mut stmt = conn.prepare("SELECT id, name, hidden FROM columns ORDER BY position ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(ColumnRow {
            id: row.get(0)?,
            name: row.get(1)?,
            hidden: row.get(2)?,
        })
    })?;
    let mut column_rows = Vec::new();
    for row in rows {
        column_rows.push(row?);
    }

    let mut code_stmt =
        conn.prepare("SELECT name FROM codes WHERE column_id = ? ORDER BY position ASC")?;
    let mut cell_stmt = conn.prepare(
        "
        SELECT onset_ms, offset_ms, code_values
        FROM cells
        WHERE column_id = ?
        ORDER BY ordinal ASC
        ",
    )?;

    let mut set = ColumnSet::new();
    for row in column_rows {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| format_error(path, format!("column `{}` has a bad id: {e}", row.name)))?;

        let codes = code_stmt.query_map([&row.id], |r| r.get::<_, String>(0))?;
        let mut code_names = Vec::new();
        for code in codes {
            code_names.push(code?);
        }
        let mut column = Column::with_id(id, &row.name, &code_names)
            .map_err(|e| format_error(path, e.to_string()))?;
        column.set_hidden(row.hidden);

        let cells = cell_stmt.query_map([&row.id], |r| {
            Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?, r.get::<_, String>(2)?))
        })?;
        for cell in cells {
            let (onset, offset, raw) = cell?;
            let values: Vec<String> = serde_json::from_str(&raw).map_err(|e| {
                format_error(path, format!("bad cell values in column `{}`: {e}", row.name))
            })?;
            column
                .push_cell(Interval::new(onset, offset), values)
                .map_err(|e| format_error(path, e.to_string()))?;
        }

        set.set_column(column, None, false)
            .map_err(|e| format_error(path, e.to_string()))?;
    }
    Ok(set)
}

fn format_error(path: &Path, message: impl Into<String>) -> StoreError {
    StoreError::Format {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn parse_timestamp(timestamp: &str, path: &Path) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| format_error(path, format!("invalid timestamp `{timestamp}`: {e}")))
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn truncate_millis(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(timestamp.timestamp_millis()).unwrap_or(timestamp)
}

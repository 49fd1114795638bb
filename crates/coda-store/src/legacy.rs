//! Import of legacy tab-separated, tick-timed coding files.
//!
//! ```text
//! # comment
//! variable<TAB>look<TAB>dir<TAB>hand
//! 0<TAB>60<TAB>l<TAB>x
//! ```
//!
//! Timestamps are ticks at 60 per second. Any malformed line aborts the
//! whole import.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use coda_core::{Column, Interval, sanitize_name};

use crate::StoreError;

pub const TICKS_PER_SECOND: i64 = 60;

/// `round(ticks / 60 * 1000)` in integer arithmetic.
///
/// Exact halves cannot occur since `ticks * 1000 / 60` always has a
/// remainder that is a multiple of 1/3 ms.
pub fn ticks_to_ms(ticks: i64) -> Option<i64> {
    let scaled = ticks.checked_mul(1000)?;
    Some((scaled + TICKS_PER_SECOND / 2).div_euclid(TICKS_PER_SECOND))
}

/// Reads a legacy file from disk.
pub fn import_legacy_file(path: &Path) -> Result<Vec<Column>, StoreError> {
    let file = File::open(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            StoreError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let columns = parse_legacy(BufReader::new(file))?;
    tracing::info!(
        path = %path.display(),
        columns = columns.len(),
        cells = columns.iter().map(Column::len).sum::<usize>(),
        "imported legacy file"
    );
    Ok(columns)
}

/// Parses legacy text into columns, in declaration order.
pub fn parse_legacy<R: BufRead>(reader: R) -> Result<Vec<Column>, StoreError> {
    let mut columns: Vec<Column> = Vec::new();
    let mut seen = HashSet::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| import_error(line_no, format!("failed to read: {e}")))?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();

        if fields[0] == "variable" {
            let name = fields.get(1).map(|n| n.trim()).unwrap_or_default();
            if name.is_empty() {
                return Err(import_error(line_no, "variable header without a name"));
            }
            // Columns are stored under their sanitized name.
            let key = sanitize_name(name).map_err(|e| import_error(line_no, e.to_string()))?;
            if !seen.insert(key) {
                return Err(import_error(line_no, format!("duplicate variable `{name}`")));
            }
            let column = Column::new(name, &fields[2..])
                .map_err(|e| import_error(line_no, e.to_string()))?;
            columns.push(column);
            continue;
        }

        let Some(column) = columns.last_mut() else {
            return Err(import_error(line_no, "cell before any variable header"));
        };
        let expected = column.codes().len() + 2;
        if fields.len() != expected {
            return Err(import_error(
                line_no,
                format!(
                    "expected {expected} fields for `{}`, found {}",
                    column.name(),
                    fields.len()
                ),
            ));
        }
        let onset = parse_ticks(fields[0], line_no)?;
        let offset = parse_ticks(fields[1], line_no)?;
        if onset > offset {
            return Err(import_error(
                line_no,
                format!("onset {onset} is after offset {offset}"),
            ));
        }
        column
            .push_cell(Interval::new(onset, offset), fields[2..].iter().copied())
            .map_err(|e| import_error(line_no, e.to_string()))?;
    }

    Ok(columns)
}

fn parse_ticks(raw: &str, line_no: usize) -> Result<i64, StoreError> {
    let ticks: i64 = raw
        .trim()
        .parse()
        .map_err(|_| import_error(line_no, format!("`{raw}` is not a tick count")))?;
    if ticks < 0 {
        return Err(import_error(line_no, format!("negative tick count {ticks}")));
    }
    ticks_to_ms(ticks).ok_or_else(|| import_error(line_no, format!("tick count {ticks} overflows")))
}

fn import_error(line: usize, message: impl Into<String>) -> StoreError {
    StoreError::Import {
        line,
        message: message.into(),
    }
}

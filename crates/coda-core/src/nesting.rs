//! Hierarchical printing of cells that sit inside (or touch) other cells.

use std::fmt::Write as _;

use serde::Serialize;

use crate::column::Column;
use crate::error::EngineError;
use crate::interval::Interval;

/// How an inner cell must relate to its parent to be nested under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapMode {
    /// Child lies entirely within the parent.
    #[default]
    Nested,
    /// Child overlaps the parent at all.
    Any,
    /// Child spans the parent's onset.
    Onset,
    /// Child spans the parent's offset.
    Offset,
}

impl OverlapMode {
    pub const fn relates(self, parent: &Interval, child: &Interval) -> bool {
        match self {
            Self::Nested => child.within(parent),
            Self::Any => child.overlaps(parent),
            Self::Onset => child.spans(parent.onset),
            Self::Offset => child.spans(parent.offset),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NestedCell {
    pub column: String,
    pub ordinal: u32,
    pub interval: Interval,
    pub values: Vec<String>,
}

/// One output line: a slot per input column, outermost first. Trailing slots
/// are `None` when an inner column had nothing related to the prefix.
pub type NestedRow = Vec<Option<NestedCell>>;

/// Walks `columns` outermost-first, nesting related cells recursively.
///
/// With `trim`, each nested interval is clamped to its parent and the
/// clamped interval is what deeper columns are related against.
pub fn nest_cells(
    columns: &[&Column],
    mode: OverlapMode,
    trim: bool,
) -> Result<Vec<NestedRow>, EngineError> {
    if columns.is_empty() {
        return Err(EngineError::NoColumns {
            operation: "nest_cells",
        });
    }
    for column in columns {
        column.check_intervals()?;
    }

    let mut rows = Vec::new();
    let mut prefix = Vec::with_capacity(columns.len());
    descend(columns, mode, trim, None, &mut prefix, &mut rows);
    tracing::debug!(columns = columns.len(), rows = rows.len(), ?mode, "nested cells");
    Ok(rows)
}

fn descend(
    columns: &[&Column],
    mode: OverlapMode,
    trim: bool,
    parent: Option<Interval>,
    prefix: &mut NestedRow,
    rows: &mut Vec<NestedRow>,
) {
    let depth = prefix.len();
    let Some(column) = columns.get(depth) else {
        rows.push(prefix.clone());
        return;
    };

    let mut related = 0_usize;
    for cell in column.cells() {
        let mut interval = cell.interval();
        if let Some(parent) = parent {
            if !mode.relates(&parent, &interval) {
                continue;
            }
            if trim {
                interval = interval.clamp_to(&parent);
            }
        }
        related += 1;
        prefix.push(Some(NestedCell {
            column: column.name().to_string(),
            ordinal: cell.ordinal(),
            interval,
            values: cell.values().map(str::to_string).collect(),
        }));
        descend(columns, mode, trim, Some(interval), prefix, rows);
        prefix.pop();
    }

    if related == 0 && parent.is_some() {
        let mut row = prefix.clone();
        row.resize(columns.len(), None);
        rows.push(row);
    }
}

/// Renders rows as tab-separated text with a header line.
///
/// Each column contributes `ordinal`, `onset`, `offset` and its codes, all
/// prefixed with the column name. Missing cells render as empty fields.
pub fn format_rows(columns: &[&Column], rows: &[NestedRow]) -> String {
    let header: Vec<String> = columns
        .iter()
        .flat_map(|column| {
            let name = column.name();
            ["ordinal", "onset", "offset"]
                .into_iter()
                .map(str::to_string)
                .chain(column.code_names().map(str::to_string))
                .map(move |field| format!("{name}.{field}"))
        })
        .collect();

    let mut out = header.join("\t");
    out.push('\n');
    for row in rows {
        let mut fields: Vec<String> = Vec::with_capacity(header.len());
        for (column, slot) in columns.iter().zip(row) {
            match slot {
                Some(cell) => {
                    fields.push(cell.ordinal.to_string());
                    fields.push(cell.interval.onset.to_string());
                    fields.push(cell.interval.offset.to_string());
                    fields.extend(cell.values.iter().cloned());
                }
                None => fields.extend(std::iter::repeat_n(String::new(), column.codes().len() + 3)),
            }
        }
        let _ = writeln!(out, "{}", fields.join("\t"));
    }
    out
}

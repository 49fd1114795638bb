//! Columns ("variables") and the named column registry.

use serde::Serialize;
use uuid::Uuid;

use crate::cell::Cell;
use crate::error::EngineError;
use crate::interval::Interval;
use crate::types::{CodeName, sanitize_name};

/// A named, schema-typed, ordered collection of cells.
///
/// Invariant: every cell carries exactly the codes in `codes`, in the same
/// order. All schema edits go through the column so they propagate to cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    id: Uuid,
    name: String,
    codes: Vec<CodeName>,
    cells: Vec<Cell>,
    hidden: bool,
}

impl Column {
    /// Creates an empty column with a fresh identity.
    ///
    /// Code names are sanitized; two that sanitize alike are rejected.
    pub fn new<I, S>(name: &str, codes: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_id(Uuid::new_v4(), name, codes)
    }

    /// Creates an empty column with a known identity (used when loading).
    pub fn with_id<I, S>(id: Uuid, name: &str, codes: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if name.trim().is_empty() {
            return Err(EngineError::EmptyName {
                field: "column name",
            });
        }
        let mut column = Self {
            id,
            name: name.to_string(),
            codes: Vec::new(),
            cells: Vec::new(),
            hidden: false,
        };
        for code in codes {
            column.add_code(code.as_ref())?;
        }
        Ok(column)
    }

    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Code schema in insertion order.
    pub fn codes(&self) -> &[CodeName] {
        &self.codes
    }

    pub fn code_names(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(CodeName::as_str)
    }

    pub fn has_code(&self, name: &str) -> bool {
        self.code_index(name).is_some()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Mutable access to cells. The slice cannot grow or shrink, so the
    /// schema invariant holds.
    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    pub const fn len(&self) -> usize {
        self.cells.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub const fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub const fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub(crate) fn rename(&mut self, name: &str) {
        name.clone_into(&mut self.name);
        for cell in &mut self.cells {
            cell.set_column(name);
        }
    }

    fn code_index(&self, name: &str) -> Option<usize> {
        self.codes.iter().position(|c| c == name)
    }

    fn no_such_code(&self, name: &str) -> EngineError {
        EngineError::NoSuchCode {
            column: self.name.clone(),
            code: name.to_string(),
        }
    }

    /// Errors with `NoSuchCode` unless every name is in the schema.
    pub fn require_codes<S: AsRef<str>>(&self, names: &[S]) -> Result<(), EngineError> {
        match names.iter().find(|n| !self.has_code(n.as_ref())) {
            Some(missing) => Err(self.no_such_code(missing.as_ref())),
            None => Ok(()),
        }
    }

    // ========== Schema edits ==========

    /// Appends a code to the schema and a blank value to every cell.
    pub fn add_code(&mut self, raw: &str) -> Result<CodeName, EngineError> {
        let code = CodeName::new(raw)?;
        if self.codes.contains(&code) {
            return Err(EngineError::CodeCollision {
                column: self.name.clone(),
                code: code.to_string(),
            });
        }
        for cell in &mut self.cells {
            cell.push_code(code.clone());
        }
        self.codes.push(code.clone());
        Ok(code)
    }

    /// Removes a code from the schema and from every cell.
    pub fn remove_code(&mut self, name: &str) -> Result<(), EngineError> {
        let idx = self.code_index(name).ok_or_else(|| self.no_such_code(name))?;
        self.codes.remove(idx);
        for cell in &mut self.cells {
            cell.remove_code_at(idx);
        }
        Ok(())
    }

    /// Renames a code in place, keeping its position and values.
    pub fn rename_code(&mut self, old: &str, new: &str) -> Result<CodeName, EngineError> {
        let idx = self.code_index(old).ok_or_else(|| self.no_such_code(old))?;
        let code = CodeName::new(new)?;
        if self.codes.iter().enumerate().any(|(i, c)| i != idx && *c == code) {
            return Err(EngineError::CodeCollision {
                column: self.name.clone(),
                code: code.to_string(),
            });
        }
        self.codes[idx] = code.clone();
        for cell in &mut self.cells {
            cell.rename_code_at(idx, code.clone());
        }
        Ok(code)
    }

    // ========== Cell edits ==========

    /// Appends a blank cell and returns it.
    ///
    /// The interval is stored as given; inverted intervals are only rejected
    /// by the operations that consume them.
    pub fn make_new_cell(&mut self, onset: i64, offset: i64) -> &mut Cell {
        let ordinal = self.next_ordinal();
        let cell = Cell::blank(&self.name, ordinal, Interval::new(onset, offset), &self.codes);
        self.cells.push(cell);
        let last = self.cells.len() - 1;
        &mut self.cells[last]
    }

    /// Appends a cell with values given in schema order.
    pub fn push_cell<I, S>(&mut self, interval: Interval, values: I) -> Result<&mut Cell, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.len() != self.codes.len() {
            return Err(EngineError::ValueCountMismatch {
                column: self.name.clone(),
                expected: self.codes.len(),
                found: values.len(),
            });
        }
        let cell = self.make_new_cell(interval.onset, interval.offset);
        for (idx, value) in values.into_iter().enumerate() {
            cell.set_value_at(idx, value);
        }
        Ok(cell)
    }

    /// Looks up a cell by ordinal. Logs a warning when absent.
    pub fn cell(&self, ordinal: u32) -> Option<&Cell> {
        let found = self.cells.iter().find(|c| c.ordinal() == ordinal);
        if found.is_none() {
            tracing::warn!(column = %self.name, ordinal, "cell not found");
        }
        found
    }

    pub fn cell_mut(&mut self, ordinal: u32) -> Option<&mut Cell> {
        let found = self.cells.iter_mut().find(|c| c.ordinal() == ordinal);
        if found.is_none() {
            tracing::warn!(column = %self.name, ordinal, "cell not found");
        }
        found
    }

    /// Removes a cell by ordinal and renumbers the remainder.
    pub fn remove_cell(&mut self, ordinal: u32) -> Option<Cell> {
        let Some(idx) = self.cells.iter().position(|c| c.ordinal() == ordinal) else {
            tracing::warn!(column = %self.name, ordinal, "cannot remove missing cell");
            return None;
        };
        let removed = self.cells.remove(idx);
        self.renumber();
        Some(removed)
    }

    /// Stable sort by onset, then renumber ordinals 1..N.
    pub fn sort_cells(&mut self) {
        self.cells.sort_by_key(Cell::onset);
        self.renumber();
    }

    /// Reassigns ordinals 1..N in current order.
    pub fn renumber(&mut self) {
        for (idx, cell) in self.cells.iter_mut().enumerate() {
            cell.set_ordinal(ordinal_at(idx));
        }
    }

    fn next_ordinal(&self) -> u32 {
        ordinal_at(self.cells.len())
    }

    /// Errors on the first inverted or negative cell.
    pub fn check_intervals(&self) -> Result<(), EngineError> {
        for cell in &self.cells {
            let interval = cell.interval();
            if interval.is_inverted() {
                return Err(EngineError::InvertedInterval {
                    column: self.name.clone(),
                    ordinal: cell.ordinal(),
                    onset: interval.onset,
                    offset: interval.offset,
                });
            }
            if interval.onset < 0 {
                return Err(EngineError::NegativeTime {
                    column: self.name.clone(),
                    ordinal: cell.ordinal(),
                });
            }
        }
        Ok(())
    }

    /// `(min onset, max offset)` over all cells.
    pub fn extent(&self) -> Option<Interval> {
        let onset = self.cells.iter().map(Cell::onset).min()?;
        let offset = self.cells.iter().map(Cell::offset).max()?;
        Some(Interval::new(onset, offset))
    }
}

fn ordinal_at(idx: usize) -> u32 {
    u32::try_from(idx + 1).unwrap_or(u32::MAX)
}

/// Result of [`ColumnSet::set_column`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    /// No column had that name; the column was appended.
    Created,
    /// A different column (by identity) had that name; it was replaced and
    /// the new one appended.
    Recreated,
    /// The same column was already present; its schema and cells were
    /// patched in place.
    Patched {
        added: Vec<CodeName>,
        removed: Vec<CodeName>,
    },
}

/// Ordered, name-unique collection of columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnSet {
    columns: Vec<Column>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub const fn len(&self) -> usize {
        self.columns.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Looks up a column by name. Logs a warning when absent.
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        let found = self.index_of(name).map(|idx| &self.columns[idx]);
        if found.is_none() {
            tracing::warn!(column = name, "column not found");
        }
        found
    }

    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        match self.index_of(name) {
            Some(idx) => Some(&mut self.columns[idx]),
            None => {
                tracing::warn!(column = name, "column not found");
                None
            }
        }
    }

    /// Like [`ColumnSet::get_column`] but absence is an error.
    pub fn require_column(&self, name: &str) -> Result<&Column, EngineError> {
        self.index_of(name)
            .map(|idx| &self.columns[idx])
            .ok_or_else(|| EngineError::ColumnNotFound {
                name: name.to_string(),
            })
    }

    /// Stores `column` under `name` (or its own name).
    ///
    /// With `sanitize`, the name is sanitized like a code name. If no column
    /// has that name, or the existing one has a different identity, the old
    /// one is deleted and the new one appended. Otherwise the existing column
    /// is patched in place and keeps its position.
    pub fn set_column(
        &mut self,
        mut column: Column,
        name: Option<&str>,
        sanitize: bool,
    ) -> Result<SetOutcome, EngineError> {
        let raw = name.unwrap_or(column.name()).to_string();
        let name = if sanitize { sanitize_name(&raw)? } else { raw };
        if name.trim().is_empty() {
            return Err(EngineError::EmptyName {
                field: "column name",
            });
        }
        column.rename(&name);
        if self
            .columns
            .iter()
            .any(|c| c.id() == column.id() && c.name() != name)
        {
            // Storing under a second name copies the column.
            tracing::debug!(column = %name, "copied column gets a new identity");
            column.id = Uuid::new_v4();
        }

        let Some(idx) = self.index_of(&name) else {
            tracing::debug!(column = %name, "creating column");
            self.columns.push(column);
            return Ok(SetOutcome::Created);
        };

        if self.columns[idx].id() != column.id() {
            tracing::debug!(column = %name, "replacing column with new identity");
            self.columns.remove(idx);
            self.columns.push(column);
            return Ok(SetOutcome::Recreated);
        }

        let existing = &mut self.columns[idx];
        let removed: Vec<CodeName> = existing
            .codes
            .iter()
            .filter(|c| !column.codes.contains(c))
            .cloned()
            .collect();
        let added: Vec<CodeName> = column
            .codes
            .iter()
            .filter(|c| !existing.codes.contains(c))
            .cloned()
            .collect();
        tracing::debug!(
            column = %name,
            added = added.len(),
            removed = removed.len(),
            "patching column schema"
        );
        existing.codes = column.codes;
        existing.cells = column.cells;
        existing.hidden = column.hidden;
        Ok(SetOutcome::Patched { added, removed })
    }

    /// Removes and returns a column. Logs a warning when absent.
    pub fn delete_column(&mut self, name: &str) -> Option<Column> {
        match self.index_of(name) {
            Some(idx) => Some(self.columns.remove(idx)),
            None => {
                tracing::warn!(column = name, "cannot delete missing column");
                None
            }
        }
    }
}

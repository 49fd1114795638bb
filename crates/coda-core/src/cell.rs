//! A single timestamped annotation.

use serde::Serialize;

use crate::error::EngineError;
use crate::interval::Interval;
use crate::types::CodeName;

/// One annotation instance within a column.
///
/// Cells are created by their owning [`Column`](crate::Column), which keeps
/// the code set in lockstep with its schema. The ordinal is a position, not an
/// identity: it changes whenever the column is re-sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    ordinal: u32,
    interval: Interval,
    codes: Vec<(CodeName, String)>,
    column: String,
}

impl Cell {
    pub(crate) fn blank(column: &str, ordinal: u32, interval: Interval, schema: &[CodeName]) -> Self {
        Self {
            ordinal,
            interval,
            codes: schema.iter().map(|c| (c.clone(), String::new())).collect(),
            column: column.to_string(),
        }
    }

    /// 1-based position within the owning column.
    pub const fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub const fn interval(&self) -> Interval {
        self.interval
    }

    pub const fn onset(&self) -> i64 {
        self.interval.onset
    }

    pub const fn offset(&self) -> i64 {
        self.interval.offset
    }

    pub const fn duration(&self) -> i64 {
        self.interval.duration()
    }

    /// Name of the owning column.
    pub fn column(&self) -> &str {
        &self.column
    }

    pub const fn set_onset(&mut self, onset: i64) {
        self.interval.onset = onset;
    }

    pub const fn set_offset(&mut self, offset: i64) {
        self.interval.offset = offset;
    }

    pub const fn set_interval(&mut self, interval: Interval) {
        self.interval = interval;
    }

    /// Returns the value of `name`.
    pub fn get_code(&self, name: &str) -> Result<&str, EngineError> {
        self.position(name)
            .map(|idx| self.codes[idx].1.as_str())
            .ok_or_else(|| self.no_such_code(name))
    }

    /// Sets the value of `name`.
    pub fn set_code(&mut self, name: &str, value: impl Into<String>) -> Result<(), EngineError> {
        let idx = self.position(name).ok_or_else(|| self.no_such_code(name))?;
        self.codes[idx].1 = value.into();
        Ok(())
    }

    /// `(code, value)` pairs in schema order.
    pub fn codes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.codes.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }

    /// Values in schema order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(|(_, v)| v.as_str())
    }

    /// True when every code value is empty.
    pub fn is_blank(&self) -> bool {
        self.codes.iter().all(|(_, v)| v.is_empty())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.codes.iter().position(|(c, _)| c == name)
    }

    fn no_such_code(&self, name: &str) -> EngineError {
        EngineError::NoSuchCode {
            column: self.column.clone(),
            code: name.to_string(),
        }
    }

    // Schema maintenance; only the owning column calls these.

    pub(crate) const fn set_ordinal(&mut self, ordinal: u32) {
        self.ordinal = ordinal;
    }

    pub(crate) fn set_column(&mut self, column: &str) {
        column.clone_into(&mut self.column);
    }

    pub(crate) fn push_code(&mut self, code: CodeName) {
        self.codes.push((code, String::new()));
    }

    pub(crate) fn remove_code_at(&mut self, idx: usize) {
        self.codes.remove(idx);
    }

    pub(crate) fn rename_code_at(&mut self, idx: usize, code: CodeName) {
        self.codes[idx].0 = code;
    }

    pub(crate) fn set_value_at(&mut self, idx: usize, value: String) {
        self.codes[idx].1 = value;
    }
}

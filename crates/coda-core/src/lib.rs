//! Core engine for behavioral-coding spreadsheets.
//!
//! This crate contains the fundamental types and logic for:
//! - Columns of timestamped, code-carrying cells and the column registry
//! - Interval algebra: mutually exclusive merges, resampling and nesting
//! - Inter-rater reliability: Cohen's kappa, keyed and continuous checks
//! - Code value validation

mod cell;
mod column;
mod error;
mod interval;
mod merge;
pub mod nesting;
pub mod reliability;
mod resample;
mod types;
pub mod validation;

pub use cell::Cell;
pub use column::{Column, ColumnSet, SetOutcome};
pub use error::EngineError;
pub use interval::{Interval, union_duration};
pub use merge::{create_mutually_exclusive, merge_columns};
pub use nesting::{NestedCell, NestedRow, OverlapMode, format_rows, nest_cells};
pub use reliability::{
    ContingencyTable, ContinuousReliability, KappaReport, ReliabilityCheck,
    check_reliability, check_reliability_continuous, compute_kappa, make_reliability,
};
pub use resample::{ResampleOptions, resample};
pub use types::{CodeName, sanitize_name};
pub use validation::{InvalidCode, Validator, ValidatorSet, check_valid_codes, check_valid_codes_in};

//! Mutually exclusive merges across columns.
//!
//! # Algorithm Summary
//!
//! 1. Collect every onset and offset of every source cell as breakpoints
//! 2. Walk consecutive breakpoint pairs, asking each source which of its
//!    cells is active over the pair
//! 3. Emit one output cell per pair with at least one active source,
//!    carrying each active source's ordinal and codes under a prefix
//!
//! Two entry points exist and they deliberately use different matching
//! rules. [`create_mutually_exclusive`] matches zero-width pairs only
//! against point cells at exactly that instant; [`merge_columns`] first
//! widens point cells to 1 ms and then matches purely by containment. The
//! divergence is kept as-is pending a decision from the coding-scheme owners.

use std::collections::BTreeSet;

use crate::column::Column;
use crate::error::EngineError;
use crate::interval::Interval;

/// One slice of a merged timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Slice {
    pub interval: Interval,
    /// Per source: index of the active cell in that source's `cells()`.
    pub active: Vec<Option<usize>>,
}

/// Merges two columns into one timeline of mutually exclusive slices.
///
/// Output codes are `<prefix>_ordinal` followed by `<prefix>_<code>` for
/// each source, `a` first. Prefixes default to the source column names.
pub fn create_mutually_exclusive(
    name: &str,
    a: &Column,
    b: &Column,
    prefix_a: Option<&str>,
    prefix_b: Option<&str>,
) -> Result<Column, EngineError> {
    let sources = [a, b];
    let prefixes = [
        prefix_a.unwrap_or(a.name()).to_string(),
        prefix_b.unwrap_or(b.name()).to_string(),
    ];
    let slices = exclusive_slices(&sources)?;
    tracing::debug!(
        column = name,
        slices = slices.len(),
        "built mutually exclusive timeline"
    );
    build_column(name, &sources, &prefixes, &slices)
}

/// Merges any number of columns, prefixing codes with each column's name.
///
/// Point cells are widened to 1 ms before merging, and each slice takes the
/// first cell of each source that contains it.
pub fn merge_columns(name: &str, columns: &[&Column]) -> Result<Column, EngineError> {
    if columns.is_empty() {
        return Err(EngineError::NoColumns {
            operation: "merge_columns",
        });
    }
    let prefixes: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
    let slices = enclosing_slices(columns)?;
    tracing::debug!(
        column = name,
        sources = columns.len(),
        slices = slices.len(),
        "merged columns"
    );
    build_column(name, columns, &prefixes, &slices)
}

/// Rejects unset offsets, inverted and negative cells.
fn check_sources(sources: &[&Column]) -> Result<(), EngineError> {
    for column in sources {
        if let Some(cell) = column.cells().iter().find(|c| c.offset() == 0) {
            return Err(EngineError::UnsetOffset {
                column: column.name().to_string(),
                ordinal: cell.ordinal(),
            });
        }
        column.check_intervals()?;
    }
    Ok(())
}

/// Breakpoint slices using the two-column matching rule.
pub(crate) fn exclusive_slices(sources: &[&Column]) -> Result<Vec<Slice>, EngineError> {
    check_sources(sources)?;

    let mut breakpoints = BTreeSet::new();
    let mut point_times = BTreeSet::new();
    for column in sources {
        for cell in column.cells() {
            breakpoints.insert(cell.onset());
            breakpoints.insert(cell.offset());
            if cell.interval().is_point() {
                point_times.insert(cell.onset());
            }
        }
    }

    let breakpoints: Vec<i64> = breakpoints.into_iter().collect();
    let mut pairs = Vec::new();
    for (idx, &t) in breakpoints.iter().enumerate() {
        if point_times.contains(&t) {
            pairs.push(Interval::new(t, t));
        }
        if let Some(&next) = breakpoints.get(idx + 1) {
            pairs.push(Interval::new(t, next));
        }
    }

    let slices = pairs
        .into_iter()
        .filter_map(|pair| {
            let active: Vec<Option<usize>> = sources
                .iter()
                .map(|column| {
                    first_match(column, |cell| {
                        if pair.is_point() {
                            cell == pair
                        } else {
                            cell.contains(&pair)
                        }
                    })
                })
                .collect();
            active.iter().any(Option::is_some).then_some(Slice {
                interval: pair,
                active,
            })
        })
        .collect();
    Ok(slices)
}

/// Breakpoint slices using the widen-then-contain rule.
fn enclosing_slices(sources: &[&Column]) -> Result<Vec<Slice>, EngineError> {
    check_sources(sources)?;

    let widened: Vec<Vec<Interval>> = sources
        .iter()
        .map(|column| {
            column
                .cells()
                .iter()
                .map(|cell| {
                    let iv = cell.interval();
                    if iv.is_point() {
                        Interval::new(iv.onset, iv.offset + 1)
                    } else {
                        iv
                    }
                })
                .collect()
        })
        .collect();

    let breakpoints: Vec<i64> = widened
        .iter()
        .flatten()
        .flat_map(|iv| [iv.onset, iv.offset])
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let slices = breakpoints
        .windows(2)
        .filter_map(|w| {
            let slice = Interval::new(w[0], w[1]);
            let active: Vec<Option<usize>> = widened
                .iter()
                .map(|intervals| intervals.iter().position(|iv| iv.contains(&slice)))
                .collect();
            active.iter().any(Option::is_some).then_some(Slice {
                interval: slice,
                active,
            })
        })
        .collect();
    Ok(slices)
}

fn first_match(column: &Column, matches: impl Fn(Interval) -> bool) -> Option<usize> {
    let mut hits = column
        .cells()
        .iter()
        .enumerate()
        .filter(|(_, cell)| matches(cell.interval()))
        .map(|(idx, _)| idx);
    let first = hits.next();
    if first.is_some() && hits.next().is_some() {
        tracing::debug!(
            column = column.name(),
            "overlapping cells within one source; using the first"
        );
    }
    first
}

fn build_column(
    name: &str,
    sources: &[&Column],
    prefixes: &[String],
    slices: &[Slice],
) -> Result<Column, EngineError> {
    let mut codes = Vec::new();
    for (column, prefix) in sources.iter().zip(prefixes) {
        codes.push(format!("{prefix}_ordinal"));
        for code in column.codes() {
            codes.push(format!("{prefix}_{code}"));
        }
    }
    let mut out = Column::new(name, &codes)?;

    for slice in slices {
        let mut values: Vec<String> = Vec::with_capacity(codes.len());
        for (column, active) in sources.iter().zip(&slice.active) {
            match active {
                Some(idx) => {
                    let cell = &column.cells()[*idx];
                    values.push(cell.ordinal().to_string());
                    values.extend(cell.values().map(str::to_string));
                }
                None => {
                    values.extend(std::iter::repeat_n(String::new(), column.codes().len() + 1));
                }
            }
        }
        out.push_cell(slice.interval, values)?;
    }
    out.renumber();
    Ok(out)
}

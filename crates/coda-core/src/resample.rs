//! Resampling irregular cells onto a fixed grid.

use crate::cell::Cell;
use crate::column::Column;
use crate::error::EngineError;
use crate::interval::Interval;

/// Options for [`resample`].
#[derive(Debug, Clone, Default)]
pub struct ResampleOptions {
    /// First grid instant. Default: earliest onset in the source.
    pub start: Option<i64>,
    /// Last grid instant (inclusive). Default: latest offset in the source.
    pub stop: Option<i64>,
    /// Output column name. Default: `<source>_resampled`.
    pub name: Option<String>,
}

/// Produces fixed-width cells of `step` ms covering `[start, stop]`.
///
/// Each slice copies the codes of the source cell with the largest overlap
/// (inclusive milliseconds). Ties go to the earlier cell in source order.
/// Slices that overlap no cell are skipped.
pub fn resample(
    column: &Column,
    step: i64,
    options: &ResampleOptions,
) -> Result<Column, EngineError> {
    if step <= 0 {
        return Err(EngineError::InvalidStep { step });
    }
    column.check_intervals()?;

    let name = options
        .name
        .clone()
        .unwrap_or_else(|| format!("{}_resampled", column.name()));
    let mut out = Column::new(&name, column.code_names())?;

    let Some(extent) = column.extent() else {
        tracing::debug!(column = column.name(), "resampling empty column");
        return Ok(out);
    };
    let start = options.start.unwrap_or(extent.onset);
    let stop = options.stop.unwrap_or(extent.offset);
    if start > stop {
        return Err(EngineError::InvalidRange { start, stop });
    }

    let mut slice_onset = start;
    let mut skipped = 0_usize;
    while slice_onset <= stop {
        let slice = Interval::new(slice_onset, slice_onset.saturating_add(step - 1).min(stop));
        match best_overlap(column, &slice) {
            Some(source) => {
                out.push_cell(slice, source.values())?;
            }
            None => skipped += 1,
        }
        let Some(next) = slice_onset.checked_add(step) else {
            break;
        };
        slice_onset = next;
    }

    tracing::debug!(
        column = column.name(),
        output = out.len(),
        skipped,
        "resampled column"
    );
    Ok(out)
}

fn best_overlap<'a>(column: &'a Column, slice: &Interval) -> Option<&'a Cell> {
    let mut best: Option<(&Cell, i64)> = None;
    for cell in column.cells() {
        let overlap = cell.interval().overlap_ms(slice);
        if overlap == 0 {
            continue;
        }
        if best.is_none_or(|(_, best_overlap)| overlap > best_overlap) {
            best = Some((cell, overlap));
        }
    }
    best.map(|(cell, _)| cell)
}

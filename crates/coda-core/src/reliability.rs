//! Inter-rater agreement between a primary and a reliability column.
//!
//! Three checks are provided:
//! - [`compute_kappa`]: Cohen's kappa per code over cells matched by onset
//! - [`check_reliability`]: pairwise cross-check keyed by a match code,
//!   tolerant of small timing differences
//! - [`check_reliability_continuous`]: disagreement regions for continuous
//!   coding, found by merging both columns into one timeline

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

use crate::cell::Cell;
use crate::column::Column;
use crate::error::EngineError;
use crate::interval::{Interval, union_duration};
use crate::merge::exclusive_slices;

// ========== Contingency tables ==========

/// Square co-occurrence matrix for one code.
///
/// Rows are primary values, columns are reliability values, both indexed by
/// the sorted set of distinct observed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContingencyTable {
    values: Vec<String>,
    counts: Vec<Vec<u64>>,
}

impl ContingencyTable {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        let values: Vec<String> = values.into_iter().collect();
        let counts = vec![vec![0; values.len()]; values.len()];
        Self { values, counts }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    fn index(&self, value: &str) -> Option<usize> {
        self.values.binary_search_by(|v| v.as_str().cmp(value)).ok()
    }

    /// Counts one `(primary, reliability)` pair. Returns false if either
    /// value is not a category of this table.
    pub fn record(&mut self, primary: &str, reliability: &str) -> bool {
        match (self.index(primary), self.index(reliability)) {
            (Some(row), Some(col)) => {
                self.counts[row][col] += 1;
                true
            }
            _ => false,
        }
    }

    pub fn count(&self, primary: &str, reliability: &str) -> u64 {
        match (self.index(primary), self.index(reliability)) {
            (Some(row), Some(col)) => self.counts[row][col],
            _ => 0,
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    pub fn row_total(&self, row: usize) -> u64 {
        self.counts[row].iter().sum()
    }

    pub fn col_total(&self, col: usize) -> u64 {
        self.counts.iter().map(|row| row[col]).sum()
    }

    /// Normalized trace.
    #[expect(
        clippy::cast_precision_loss,
        reason = "cell counts stay far below 2^52"
    )]
    pub fn observed_agreement(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let trace: u64 = (0..self.values.len()).map(|i| self.counts[i][i]).sum();
        trace as f64 / total as f64
    }

    /// Sum over categories of `row_total * col_total / total^2`.
    #[expect(
        clippy::cast_precision_loss,
        reason = "cell counts stay far below 2^52"
    )]
    pub fn expected_agreement(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let total = total as f64;
        (0..self.values.len())
            .map(|i| (self.row_total(i) as f64 * self.col_total(i) as f64) / (total * total))
            .sum()
    }

    /// Cohen's kappa, or `None` for an empty table.
    ///
    /// When every observation falls in one category the expected agreement
    /// is 1 and the statistic is undefined; that case reports 1.0.
    pub fn kappa(&self) -> Option<f64> {
        if self.total() == 0 {
            return None;
        }
        let po = self.observed_agreement();
        let pe = self.expected_agreement();
        if (1.0 - pe).abs() < f64::EPSILON {
            return Some(1.0);
        }
        Some((po - pe) / (1.0 - pe))
    }
}

impl fmt::Display for ContingencyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .values
            .iter()
            .map(String::len)
            .chain(self.counts.iter().flatten().map(|c| c.to_string().len()))
            .max()
            .unwrap_or(1)
            .max(1);
        write!(f, "{:width$}", "")?;
        for value in &self.values {
            write!(f, " {value:>width$}")?;
        }
        writeln!(f)?;
        for (value, row) in self.values.iter().zip(&self.counts) {
            write!(f, "{value:>width$}")?;
            for count in row {
                write!(f, " {count:>width$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// ========== Kappa ==========

/// Why a code produced no kappa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SkipReason {
    /// Fewer than two distinct values were observed across both columns.
    TooFewValues { distinct: usize },
    /// No reliability cell shared an onset with a primary cell.
    NoMatchedCells,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewValues { distinct } => {
                write!(f, "only {distinct} distinct value(s) observed")
            }
            Self::NoMatchedCells => write!(f, "no cells matched by onset"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCode {
    pub code: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Result of [`compute_kappa`]. `kappas` and `tables` share keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KappaReport {
    pub kappas: BTreeMap<String, f64>,
    pub tables: BTreeMap<String, ContingencyTable>,
    pub skipped: Vec<SkippedCode>,
    /// Reliability cells that found a primary cell with the same onset.
    pub matched_cells: usize,
}

/// Computes Cohen's kappa for each code.
///
/// Cells are paired by exact onset equality only: each reliability cell
/// pairs with the first primary cell having the same onset. An empty `codes`
/// slice means every primary code that the reliability column also has.
pub fn compute_kappa<S: AsRef<str>>(
    primary: &Column,
    reliability: &Column,
    codes: &[S],
) -> Result<KappaReport, EngineError> {
    let codes: Vec<String> = if codes.is_empty() {
        primary
            .code_names()
            .filter(|c| reliability.has_code(c))
            .map(str::to_string)
            .collect()
    } else {
        primary.require_codes(codes)?;
        reliability.require_codes(codes)?;
        let mut seen = BTreeSet::new();
        codes
            .iter()
            .map(|c| c.as_ref().to_string())
            .filter(|c| seen.insert(c.clone()))
            .collect()
    };

    let mut by_onset: HashMap<i64, &Cell> = HashMap::new();
    for cell in primary.cells() {
        by_onset.entry(cell.onset()).or_insert(cell);
    }
    let pairs: Vec<(&Cell, &Cell)> = reliability
        .cells()
        .iter()
        .filter_map(|rel| by_onset.get(&rel.onset()).map(|pri| (*pri, rel)))
        .collect();
    if pairs.len() < reliability.len() {
        tracing::debug!(
            primary = primary.name(),
            reliability = reliability.name(),
            unmatched = reliability.len() - pairs.len(),
            "reliability cells without a primary onset match"
        );
    }

    let mut report = KappaReport {
        kappas: BTreeMap::new(),
        tables: BTreeMap::new(),
        skipped: Vec::new(),
        matched_cells: pairs.len(),
    };

    for code in codes {
        let mut observed = BTreeSet::new();
        for cell in primary.cells().iter().chain(reliability.cells()) {
            observed.insert(cell.get_code(&code)?);
        }
        if observed.len() < 2 {
            let reason = SkipReason::TooFewValues {
                distinct: observed.len(),
            };
            tracing::warn!(code = %code, %reason, "skipping kappa");
            report.skipped.push(SkippedCode { code, reason });
            continue;
        }

        let mut table = ContingencyTable::new(observed);
        for (pri, rel) in &pairs {
            table.record(pri.get_code(&code)?, rel.get_code(&code)?);
        }

        match table.kappa() {
            Some(kappa) => {
                report.kappas.insert(code.clone(), kappa);
                report.tables.insert(code, table);
            }
            None => {
                let reason = SkipReason::NoMatchedCells;
                tracing::warn!(code = %code, %reason, "skipping kappa");
                report.skipped.push(SkippedCode { code, reason });
            }
        }
    }

    Ok(report)
}

// ========== Keyed pairwise check ==========

/// One field that differed between a matched pair of cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub field: String,
    pub primary_ordinal: u32,
    pub reliability_ordinal: u32,
    pub primary_value: String,
    pub reliability_value: String,
}

/// Result of [`check_reliability`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReliabilityCheck {
    pub match_code: String,
    pub reliability_cells: usize,
    /// Compared fields: `onset`, `offset`, then every shared code.
    pub fields: Vec<String>,
    pub errors: BTreeMap<String, usize>,
    pub mismatches: Vec<Mismatch>,
    /// Ordinals of reliability cells with no primary partner.
    pub unmatched: Vec<u32>,
}

impl ReliabilityCheck {
    /// `100 * (1 - errors / reliability_cells)`, or `None` without cells.
    #[expect(
        clippy::cast_precision_loss,
        reason = "cell counts stay far below 2^52"
    )]
    pub fn agreement(&self, field: &str) -> Option<f64> {
        if self.reliability_cells == 0 {
            return None;
        }
        let errors = self.errors.get(field).copied()?;
        Some(100.0 * (1.0 - errors as f64 / self.reliability_cells as f64))
    }
}

/// Cross-checks every reliability cell against every primary cell.
///
/// Cells pair up when their `match_code` values are equal (blank keys never
/// pair). For each pair, onset and offset differing by more than
/// `tolerance_ms`, and every other shared code differing in value, count one
/// error against that field. All problems are collected in one pass.
pub fn check_reliability(
    primary: &Column,
    reliability: &Column,
    match_code: &str,
    tolerance_ms: i64,
) -> Result<ReliabilityCheck, EngineError> {
    if tolerance_ms < 0 {
        return Err(EngineError::NegativeTolerance {
            tolerance: tolerance_ms,
        });
    }
    primary.require_codes(&[match_code])?;
    reliability.require_codes(&[match_code])?;

    let shared: Vec<&str> = primary
        .code_names()
        .filter(|c| *c != match_code && reliability.has_code(c))
        .collect();
    let mut fields = vec!["onset".to_string(), "offset".to_string()];
    fields.extend(shared.iter().map(|c| (*c).to_string()));

    let mut check = ReliabilityCheck {
        match_code: match_code.to_string(),
        reliability_cells: reliability.len(),
        errors: fields.iter().map(|f| (f.clone(), 0)).collect(),
        fields,
        mismatches: Vec::new(),
        unmatched: Vec::new(),
    };

    for rel in reliability.cells() {
        let key = rel.get_code(match_code)?;
        let mut matched = false;
        if !key.is_empty() {
            for pri in primary.cells() {
                if pri.get_code(match_code)? != key {
                    continue;
                }
                matched = true;
                compare_pair(&mut check, pri, rel, &shared, tolerance_ms)?;
            }
        }
        if !matched {
            tracing::warn!(
                reliability = reliability.name(),
                ordinal = rel.ordinal(),
                key,
                "reliability cell has no primary match"
            );
            check.unmatched.push(rel.ordinal());
        }
    }

    Ok(check)
}

fn compare_pair(
    check: &mut ReliabilityCheck,
    pri: &Cell,
    rel: &Cell,
    shared: &[&str],
    tolerance_ms: i64,
) -> Result<(), EngineError> {
    let mut fail = |field: &str, primary_value: String, reliability_value: String| {
        *check.errors.entry(field.to_string()).or_insert(0) += 1;
        check.mismatches.push(Mismatch {
            field: field.to_string(),
            primary_ordinal: pri.ordinal(),
            reliability_ordinal: rel.ordinal(),
            primary_value,
            reliability_value,
        });
    };

    if (pri.onset() - rel.onset()).abs() > tolerance_ms {
        fail("onset", pri.onset().to_string(), rel.onset().to_string());
    }
    if (pri.offset() - rel.offset()).abs() > tolerance_ms {
        fail("offset", pri.offset().to_string(), rel.offset().to_string());
    }
    for &code in shared {
        let (a, b) = (pri.get_code(code)?, rel.get_code(code)?);
        if a != b {
            fail(code, a.to_string(), b.to_string());
        }
    }
    Ok(())
}

// ========== Continuous coding ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisagreementKind {
    /// One coder has a cell the other missed entirely.
    MissedCell,
    /// One coder alone covers a span at least as long as the threshold.
    UncoveredSpan,
    /// Both coders are active but a compared code differs.
    CodeMismatch,
}

impl DisagreementKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MissedCell => "missed_cell",
            Self::UncoveredSpan => "uncovered_span",
            Self::CodeMismatch => "code_mismatch",
        }
    }
}

impl fmt::Display for DisagreementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Disagreement {
    pub interval: Interval,
    pub kind: DisagreementKind,
    pub primary_ordinal: Option<u32>,
    pub reliability_ordinal: Option<u32>,
    /// Compared codes that differed (only for `CodeMismatch`).
    pub codes: Vec<String>,
}

/// Result of [`check_reliability_continuous`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuousReliability {
    pub disagreements: Vec<Disagreement>,
    /// The disagreements as a column (`kind`, `primary_ordinal`,
    /// `reliability_ordinal`, `codes`).
    pub column: Column,
    /// Total time covered by disagreements.
    pub disagreement_ms: i64,
}

/// Finds disagreement regions between two continuously coded columns.
///
/// Both columns are merged into mutually exclusive slices. A slice is a
/// disagreement when exactly one coder is active and either the slice is
/// that coder's whole cell or it lasts at least `threshold_ms`, or when both
/// are active and any of `compare_codes` differs.
pub fn check_reliability_continuous<S: AsRef<str>>(
    primary: &Column,
    reliability: &Column,
    compare_codes: &[S],
    threshold_ms: i64,
) -> Result<ContinuousReliability, EngineError> {
    if threshold_ms < 0 {
        return Err(EngineError::NegativeTolerance {
            tolerance: threshold_ms,
        });
    }
    primary.require_codes(compare_codes)?;
    reliability.require_codes(compare_codes)?;

    let slices = exclusive_slices(&[primary, reliability])?;
    let mut disagreements = Vec::new();

    for slice in &slices {
        let pri = slice.active[0].map(|idx| &primary.cells()[idx]);
        let rel = slice.active[1].map(|idx| &reliability.cells()[idx]);

        let found = match (pri, rel) {
            (Some(a), Some(b)) => {
                let mut differing = Vec::new();
                for code in compare_codes {
                    let code = code.as_ref();
                    if a.get_code(code)? != b.get_code(code)? {
                        differing.push(code.to_string());
                    }
                }
                (!differing.is_empty()).then_some((DisagreementKind::CodeMismatch, differing))
            }
            (Some(only), None) | (None, Some(only)) => {
                if only.interval() == slice.interval {
                    Some((DisagreementKind::MissedCell, Vec::new()))
                } else if slice.interval.duration() >= threshold_ms {
                    Some((DisagreementKind::UncoveredSpan, Vec::new()))
                } else {
                    None
                }
            }
            (None, None) => None,
        };

        if let Some((kind, codes)) = found {
            disagreements.push(Disagreement {
                interval: slice.interval,
                kind,
                primary_ordinal: pri.map(Cell::ordinal),
                reliability_ordinal: rel.map(Cell::ordinal),
                codes,
            });
        }
    }

    let name = format!("{}_vs_{}", primary.name(), reliability.name());
    let mut column = Column::new(
        &name,
        ["kind", "primary_ordinal", "reliability_ordinal", "codes"],
    )?;
    for d in &disagreements {
        column.push_cell(
            d.interval,
            [
                d.kind.as_str().to_string(),
                d.primary_ordinal.map(|o| o.to_string()).unwrap_or_default(),
                d.reliability_ordinal
                    .map(|o| o.to_string())
                    .unwrap_or_default(),
                d.codes.join(","),
            ],
        )?;
    }

    let intervals: Vec<Interval> = disagreements.iter().map(|d| d.interval).collect();
    let disagreement_ms = union_duration(&intervals);
    tracing::debug!(
        primary = primary.name(),
        reliability = reliability.name(),
        slices = slices.len(),
        disagreements = disagreements.len(),
        disagreement_ms,
        "continuous reliability check"
    );

    Ok(ContinuousReliability {
        disagreements,
        column,
        disagreement_ms,
    })
}

// ========== Reliability column creation ==========

/// Builds a blank reliability column from `source`.
///
/// Every `every_nth` cell (starting with the first) is copied with its
/// interval and the values of `keep_codes`; other codes stay blank so a
/// second coder can fill them in. `every_nth == 0` copies no cells.
pub fn make_reliability<S: AsRef<str>>(
    name: &str,
    source: &Column,
    every_nth: usize,
    keep_codes: &[S],
) -> Result<Column, EngineError> {
    source.require_codes(keep_codes)?;
    let mut out = Column::new(name, source.code_names())?;
    if every_nth == 0 {
        return Ok(out);
    }
    for cell in source.cells().iter().step_by(every_nth) {
        let copy = out.make_new_cell(cell.onset(), cell.offset());
        for code in keep_codes {
            let code = code.as_ref();
            copy.set_code(code, cell.get_code(code)?)?;
        }
    }
    Ok(out)
}

//! Code value validation.
//!
//! Validators never touch the data; they only report offending values.

use std::collections::BTreeSet;
use std::fmt;

use regex::Regex;
use serde::Serialize;

use crate::column::Column;
use crate::error::EngineError;

/// A rule for acceptable values of one code.
pub enum Validator {
    /// The value must be one of a fixed set.
    OneOf(BTreeSet<String>),
    /// The pattern must match somewhere in the value (unanchored).
    Pattern(Regex),
    /// Arbitrary check.
    Predicate(Box<dyn Fn(&str) -> bool>),
}

impl Validator {
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Self::OneOf(values) => values.contains(value),
            Self::Pattern(re) => re.is_match(value),
            Self::Predicate(f) => f(value),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneOf(values) => f.debug_tuple("OneOf").field(values).finish(),
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Validators keyed by code name, applied in insertion order.
#[derive(Debug, Default)]
pub struct ValidatorSet {
    rules: Vec<(String, Validator)>,
}

impl ValidatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: &str, validator: Validator) {
        self.rules.push((code.to_string(), validator));
    }

    #[must_use]
    pub fn one_of<I, S>(mut self, code: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.insert(code, Validator::OneOf(values));
        self
    }

    pub fn pattern(mut self, code: &str, pattern: &str) -> Result<Self, EngineError> {
        let re = Regex::new(pattern).map_err(|e| EngineError::InvalidPattern {
            code: code.to_string(),
            message: e.to_string(),
        })?;
        self.insert(code, Validator::Pattern(re));
        Ok(self)
    }

    #[must_use]
    pub fn predicate(mut self, code: &str, check: impl Fn(&str) -> bool + 'static) -> Self {
        self.insert(code, Validator::Predicate(Box::new(check)));
        self
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(code, _)| code.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// One rejected value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidCode {
    pub column: String,
    pub ordinal: u32,
    pub code: String,
    pub value: String,
}

impl fmt::Display for InvalidCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}].{} = {:?}",
            self.column, self.ordinal, self.code, self.value
        )
    }
}

/// Reports every value in `column` rejected by `validators`.
///
/// Rows come out in cell order, then validator order. A validator for a
/// code the column does not have is an error and nothing is checked.
pub fn check_valid_codes(
    column: &Column,
    validators: &ValidatorSet,
) -> Result<Vec<InvalidCode>, EngineError> {
    let codes: Vec<&str> = validators.codes().collect();
    column.require_codes(&codes)?;

    let mut invalid = Vec::new();
    for cell in column.cells() {
        for (code, validator) in &validators.rules {
            let value = cell.get_code(code)?;
            if !validator.accepts(value) {
                invalid.push(InvalidCode {
                    column: column.name().to_string(),
                    ordinal: cell.ordinal(),
                    code: code.clone(),
                    value: value.to_string(),
                });
            }
        }
    }

    if !invalid.is_empty() {
        tracing::info!(
            column = column.name(),
            invalid = invalid.len(),
            "found invalid code values"
        );
    }
    Ok(invalid)
}

/// Runs [`check_valid_codes`] over several columns and concatenates rows.
pub fn check_valid_codes_in(
    pairs: &[(&Column, &ValidatorSet)],
) -> Result<Vec<InvalidCode>, EngineError> {
    let mut invalid = Vec::new();
    for (column, validators) in pairs {
        invalid.extend(check_valid_codes(column, validators)?);
    }
    Ok(invalid)
}

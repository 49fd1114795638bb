//! Validated name types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Sanitizes a raw code or column name.
///
/// Every non-alphanumeric character becomes `_` and a leading digit is
/// prefixed with `_`. Fails when the input is empty.
pub fn sanitize_name(raw: &str) -> Result<String, EngineError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EngineError::EmptyName { field: "name" });
    }
    let mut out: String = trimmed
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    Ok(out)
}

/// A sanitized code name.
///
/// Construction always sanitizes, so two raw names that map to the same
/// `CodeName` compare equal. Columns use that to detect collisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CodeName(String);

impl CodeName {
    /// Sanitizes `raw` into a code name.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, EngineError> {
        sanitize_name(raw.as_ref())
            .map(Self)
            .map_err(|_| EngineError::EmptyName { field: "code name" })
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CodeName {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CodeName> for String {
    fn from(name: CodeName) -> Self {
        name.0
    }
}

impl fmt::Display for CodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CodeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for CodeName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for CodeName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_non_alphanumerics() {
        assert_eq!(sanitize_name("left hand").unwrap(), "left_hand");
        assert_eq!(sanitize_name("a-b.c").unwrap(), "a_b_c");
        assert_eq!(sanitize_name("trial").unwrap(), "trial");
    }

    #[test]
    fn test_sanitize_prefixes_leading_digit() {
        assert_eq!(sanitize_name("2nd").unwrap(), "_2nd");
        assert_eq!(sanitize_name("x2").unwrap(), "x2");
    }

    #[test]
    fn test_sanitize_rejects_empty() {
        assert!(sanitize_name("").is_err());
        assert!(sanitize_name("   ").is_err());
    }

    #[test]
    fn test_code_names_that_sanitize_alike_are_equal() {
        assert_eq!(CodeName::new("a b").unwrap(), CodeName::new("a-b").unwrap());
    }

    #[test]
    fn test_code_name_serde_sanitizes() {
        let parsed: CodeName = serde_json::from_str("\"look at\"").unwrap();
        assert_eq!(parsed.as_str(), "look_at");
        let result: Result<CodeName, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }
}

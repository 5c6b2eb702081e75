//! Field values and the record abstraction shared by both result tables

use std::cmp::Ordering;
use std::fmt;

/// A single cell value as seen by sorting, searching and export
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Flag(bool),
}

impl FieldValue {
    /// Value used for missing fields
    pub fn empty() -> Self {
        FieldValue::Text(String::new())
    }

    /// Natural ordering: lexicographic for text, numeric for numbers,
    /// `false < true` for flags. Mixed kinds fall back to their display text.
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (FieldValue::Number(a), FieldValue::Number(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (FieldValue::Flag(a), FieldValue::Flag(b)) => a.cmp(b),
            _ => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => write!(f, "{}", text),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Flag(true) => write!(f, "Yes"),
            FieldValue::Flag(false) => write!(f, "No"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

/// Liveness bucket a record's status falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Live,
    Dead,
    Other,
}

/// Maps raw status literals onto live/dead buckets (case-insensitive)
#[derive(Debug, Clone, Copy)]
pub struct StatusRule {
    pub live: &'static [&'static str],
    pub dead: &'static [&'static str],
}

impl StatusRule {
    pub fn classify(&self, status: &str) -> StatusClass {
        let status = status.trim();
        if self.live.iter().any(|s| s.eq_ignore_ascii_case(status)) {
            StatusClass::Live
        } else if self.dead.iter().any(|s| s.eq_ignore_ascii_case(status)) {
            StatusClass::Dead
        } else {
            StatusClass::Other
        }
    }

    pub fn is_live(&self, status: &str) -> bool {
        self.classify(status) == StatusClass::Live
    }
}

/// A named field and its human-readable label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub key: &'static str,
    pub label: &'static str,
}

impl Column {
    pub const fn new(key: &'static str, label: &'static str) -> Self {
        Self { key, label }
    }
}

/// Static description of one result table
#[derive(Debug)]
pub struct TableSpec {
    /// Short name used in notices and the shell
    pub name: &'static str,
    /// On-screen columns, in display order
    pub columns: &'static [Column],
    /// Export projection, in header order
    pub csv_columns: &'static [Column],
    /// File name of the CSV artifact
    pub csv_filename: &'static str,
    pub status_rule: StatusRule,
    /// Whether the live/dead status filter applies to this table
    pub status_filter: bool,
}

impl TableSpec {
    /// Whether `key` names one of the on-screen columns
    pub fn has_column(&self, key: &str) -> bool {
        self.columns.iter().any(|c| c.key == key)
    }
}

/// A flat, display-ready lookup result
pub trait Record: Clone {
    /// Every field key the record exposes; search runs over all of them
    const FIELDS: &'static [&'static str];

    fn table() -> &'static TableSpec;

    /// Value of a named field, `None` for unknown or absent fields
    fn field(&self, key: &str) -> Option<FieldValue>;

    fn status(&self) -> &str;

    fn sort_value(&self, key: &str) -> FieldValue {
        self.field(key).unwrap_or_else(FieldValue::empty)
    }

    /// Case-insensitive substring match across every field.
    /// `needle` must already be lowercase.
    fn contains_text(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        Self::FIELDS
            .iter()
            .filter_map(|key| self.field(key))
            .any(|value| value.to_string().to_lowercase().contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULE: StatusRule = StatusRule {
        live: &["live"],
        dead: &["dead"],
    };

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::from("abc").to_string(), "abc");
        assert_eq!(FieldValue::Number(50.0).to_string(), "50");
        assert_eq!(FieldValue::Number(66.5).to_string(), "66.5");
        assert_eq!(FieldValue::Flag(true).to_string(), "Yes");
        assert_eq!(FieldValue::Flag(false).to_string(), "No");
    }

    #[test]
    fn test_field_value_natural_ordering() {
        assert_eq!(
            FieldValue::Number(9.0).compare(&FieldValue::Number(10.0)),
            Ordering::Less
        );
        // lexicographic on text, so "10" < "9"
        assert_eq!(
            FieldValue::from("10").compare(&FieldValue::from("9")),
            Ordering::Less
        );
        assert_eq!(
            FieldValue::Flag(false).compare(&FieldValue::Flag(true)),
            Ordering::Less
        );
        assert_eq!(
            FieldValue::Number(5.0).compare(&FieldValue::from("N/A")),
            "5".cmp("N/A")
        );
    }

    #[test]
    fn test_status_rule_classify() {
        assert_eq!(RULE.classify("Live"), StatusClass::Live);
        assert_eq!(RULE.classify("LIVE "), StatusClass::Live);
        assert_eq!(RULE.classify("dead"), StatusClass::Dead);
        assert_eq!(RULE.classify("pending"), StatusClass::Other);
        assert_eq!(RULE.classify(""), StatusClass::Other);
        assert!(!RULE.is_live("Dead"));
    }
}

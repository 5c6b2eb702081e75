//! Stable, comparator-based ordering over a named field

use crate::table::record::{FieldValue, Record};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    /// Apply the direction to an ascending comparison outcome
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Asc => "↑",
            SortDirection::Desc => "↓",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// Active sort key and direction. No key means arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortConfig {
    pub key: Option<String>,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn by(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: Some(key.into()),
            direction,
        }
    }

    /// Header click: the active key flips direction, any other key starts ascending
    pub fn toggle(&mut self, key: &str) {
        if self.key.as_deref() == Some(key) {
            self.direction = self.direction.flip();
        } else {
            self.key = Some(key.to_string());
            self.direction = SortDirection::Asc;
        }
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.key.as_deref() == Some(key)
    }
}

/// Sort a copy of `records` by `config`.
///
/// Uses the stable `slice::sort_by`; `Desc` negates the comparator, so equal
/// keys keep their arrival order in both directions.
pub fn sort_records<R: Record>(records: &[R], config: &SortConfig) -> Vec<R> {
    let Some(key) = config.key.as_deref() else {
        return records.to_vec();
    };

    let mut keyed: Vec<(FieldValue, &R)> = records
        .iter()
        .map(|record| (record.sort_value(key), record))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| config.direction.apply(a.compare(b)));

    keyed.into_iter().map(|(_, record)| record.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::models::{QualityRecord, WhoisRecord};

    fn quality(ip: &str, status: &str) -> QualityRecord {
        let mut record = QualityRecord::live(ip, "80");
        record.status = status.to_string();
        record
    }

    fn ips(records: &[QualityRecord]) -> Vec<&str> {
        records.iter().map(|r| r.ip.as_str()).collect()
    }

    #[test]
    fn test_no_key_keeps_arrival_order() {
        let records = vec![quality("c", "Live"), quality("a", "Dead"), quality("b", "Live")];
        let sorted = sort_records(&records, &SortConfig::default());
        assert_eq!(ips(&sorted), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_sort_is_stable_in_both_directions() {
        let records = vec![
            quality("A", "live"),
            quality("B", "dead"),
            quality("C", "live"),
            quality("D", "dead"),
        ];

        let asc = sort_records(&records, &SortConfig::by("status", SortDirection::Asc));
        assert_eq!(ips(&asc), vec!["B", "D", "A", "C"]);

        let desc = sort_records(&records, &SortConfig::by("status", SortDirection::Desc));
        assert_eq!(ips(&desc), vec!["A", "C", "B", "D"]);

        // re-sorting the ascending view descending gives the same grouping
        let resorted = sort_records(&asc, &SortConfig::by("status", SortDirection::Desc));
        assert_eq!(ips(&resorted), vec!["A", "C", "B", "D"]);
    }

    #[test]
    fn test_sort_numeric_field() {
        let mut low = QualityRecord::live("low", "80");
        low.fraud_score = Some(9);
        let mut high = QualityRecord::live("high", "80");
        high.fraud_score = Some(75);

        let sorted = sort_records(
            &[high.clone(), low.clone()],
            &SortConfig::by("fraud_score", SortDirection::Asc),
        );
        assert_eq!(ips(&sorted), vec!["low", "high"]);
    }

    #[test]
    fn test_sort_flags_normalized() {
        let mut vpn = QualityRecord::live("vpn", "80");
        vpn.vpn = true;
        let clean = QualityRecord::live("clean", "80");

        let sorted = sort_records(&[vpn, clean], &SortConfig::by("vpn", SortDirection::Asc));
        assert_eq!(ips(&sorted), vec!["clean", "vpn"]);
    }

    #[test]
    fn test_missing_field_sorts_as_empty() {
        let with_error = WhoisRecord::failed("1.1.1.1", "boom");
        let without = WhoisRecord::success("2.2.2.2");

        let sorted = sort_records(
            &[with_error, without],
            &SortConfig::by("error", SortDirection::Asc),
        );
        assert_eq!(sorted[0].ip, "2.2.2.2");

        // unknown keys are all equal, so order is untouched
        let records = vec![WhoisRecord::success("b"), WhoisRecord::success("a")];
        let sorted = sort_records(&records, &SortConfig::by("bogus", SortDirection::Desc));
        assert_eq!(sorted, records);
    }

    #[test]
    fn test_toggle() {
        let mut config = SortConfig::default();
        config.toggle("country");
        assert_eq!(config, SortConfig::by("country", SortDirection::Asc));
        config.toggle("country");
        assert_eq!(config, SortConfig::by("country", SortDirection::Desc));
        config.toggle("country");
        assert_eq!(config.direction, SortDirection::Asc);

        config.toggle("country");
        config.toggle("city");
        assert_eq!(config, SortConfig::by("city", SortDirection::Asc));
        assert!(config.is_active("city"));
    }
}

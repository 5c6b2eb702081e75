//! Free-text search combined with the live/dead status filter

use crate::table::record::{Record, StatusRule};
use anyhow::anyhow;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Live,
    Dead,
}

impl StatusFilter {
    /// Whether a record with `status` passes under `rule`.
    /// `Dead` is the complement of live, so unknown statuses land there.
    pub fn passes(self, rule: &StatusRule, status: &str) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Live => rule.is_live(status),
            StatusFilter::Dead => !rule.is_live(status),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => write!(f, "all"),
            StatusFilter::Live => write!(f, "live"),
            StatusFilter::Dead => write!(f, "dead"),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "live" => Ok(StatusFilter::Live),
            "dead" => Ok(StatusFilter::Dead),
            _ => Err(anyhow!("Invalid status filter: {}. Use: all, live, dead", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    pub search_term: String,
    pub status_filter: StatusFilter,
}

impl FilterState {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Keep the records passing both the search term and, when `status_rule` is
/// given, the status filter. Input order is preserved.
pub fn filter_records<R: Record>(
    records: &[R],
    state: &FilterState,
    status_rule: Option<&StatusRule>,
) -> Vec<R> {
    let needle = state.search_term.to_lowercase();

    records
        .iter()
        .filter(|record| record.contains_text(&needle))
        .filter(|record| match status_rule {
            Some(rule) => state.status_filter.passes(rule, record.status()),
            None => true,
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::models::{QualityRecord, WhoisRecord};

    fn germany() -> WhoisRecord {
        let mut record = WhoisRecord::success("5.9.0.1");
        record.country = "Germany".to_string();
        record
    }

    fn quality(ip: &str, status: &str) -> QualityRecord {
        let mut record = QualityRecord::live(ip, "80");
        record.status = status.to_string();
        record
    }

    fn state(term: &str, status_filter: StatusFilter) -> FilterState {
        FilterState {
            search_term: term.to_string(),
            status_filter,
        }
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let records = vec![germany(), WhoisRecord::success("8.8.8.8")];
        for term in ["germany", "GER", "many", "Germany"] {
            let hits = filter_records(&records, &state(term, StatusFilter::All), None);
            assert_eq!(hits, vec![germany()], "term {}", term);
        }
    }

    #[test]
    fn test_empty_search_matches_everything() {
        let records = vec![germany(), WhoisRecord::success("8.8.8.8")];
        let hits = filter_records(&records, &FilterState::default(), None);
        assert_eq!(hits, records);
    }

    #[test]
    fn test_search_matches_flag_tokens() {
        let mut vpn = quality("1.1.1.1", "Live");
        vpn.vpn = true;
        let mut clean = quality("2.2.2.2", "Live");
        clean.isp = "Clean Net".to_string();
        clean.organization = "Clean Net".to_string();

        let hits = filter_records(
            &[vpn.clone(), clean],
            &state("yes", StatusFilter::All),
            None,
        );
        assert_eq!(hits, vec![vpn]);
    }

    #[test]
    fn test_status_filter() {
        let records = vec![
            quality("a", "Live"),
            quality("b", "Dead"),
            quality("c", "LIVE"),
            quality("d", "unknown"),
        ];
        let rule = QualityRecord::table().status_rule;
        let pick = |f| -> Vec<String> {
            filter_records(&records, &state("", f), Some(&rule))
                .into_iter()
                .map(|r| r.ip)
                .collect()
        };

        assert_eq!(pick(StatusFilter::All), vec!["a", "b", "c", "d"]);
        assert_eq!(pick(StatusFilter::Live), vec!["a", "c"]);
        assert_eq!(pick(StatusFilter::Dead), vec!["b", "d"]);
    }

    #[test]
    fn test_filters_compose_with_and() {
        let mut berlin = quality("a", "Live");
        berlin.city = "Berlin".to_string();
        let mut dead_berlin = quality("b", "Dead");
        dead_berlin.city = "Berlin".to_string();
        let records = vec![berlin.clone(), dead_berlin, quality("c", "Live")];
        let rule = QualityRecord::table().status_rule;

        let hits = filter_records(&records, &state("berlin", StatusFilter::Live), Some(&rule));
        assert_eq!(hits, vec![berlin]);
    }

    #[test]
    fn test_status_axis_disabled_ignores_filter() {
        let records = vec![WhoisRecord::failed("1.1.1.1", "bad"), germany()];
        let hits = filter_records(&records, &state("", StatusFilter::Live), None);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let records = vec![
            quality("1.1.1.1", "Live"),
            quality("1.1.2.2", "Dead"),
            quality("9.9.9.9", "Live"),
        ];
        let rule = QualityRecord::table().status_rule;
        let filter = state("1.1", StatusFilter::Live);

        let once = filter_records(&records, &filter, Some(&rule));
        let twice = filter_records(&once, &filter, Some(&rule));
        assert_eq!(once, twice);
        assert_eq!(once.len(), 1);
    }

    #[test]
    fn test_status_filter_from_str() {
        assert_eq!("LIVE".parse::<StatusFilter>().unwrap(), StatusFilter::Live);
        assert_eq!("all".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert!("maybe".parse::<StatusFilter>().is_err());
    }
}

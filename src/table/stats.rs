//! Summary counts over a full record set

use crate::table::record::{Record, StatusClass, StatusRule};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TableStats {
    pub total: usize,
    pub live: usize,
    pub dead: usize,
    /// Percentage of live records, one decimal place
    pub live_rate: f64,
}

impl fmt::Display for TableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {} | Live: {} | Dead: {} | Live Rate: {:.1}%",
            self.total, self.live, self.dead, self.live_rate
        )
    }
}

/// Count live/dead records under `rule`. Statuses outside both buckets only
/// count toward the total.
pub fn compute_stats<R: Record>(records: &[R], rule: &StatusRule) -> TableStats {
    let total = records.len();
    let (mut live, mut dead) = (0, 0);
    for record in records {
        match rule.classify(record.status()) {
            StatusClass::Live => live += 1,
            StatusClass::Dead => dead += 1,
            StatusClass::Other => {}
        }
    }

    TableStats {
        total,
        live,
        dead,
        live_rate: live_rate(live, total),
    }
}

fn live_rate(live: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (live as f64 * 1000.0 / total as f64).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::models::{QualityRecord, WhoisRecord};

    fn statuses(statuses: &[&str]) -> Vec<QualityRecord> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let mut record = QualityRecord::live(format!("10.0.0.{}", i), "80");
                record.status = status.to_string();
                record
            })
            .collect()
    }

    fn rule() -> StatusRule {
        QualityRecord::table().status_rule
    }

    #[test]
    fn test_stats_live_dead() {
        let stats = compute_stats(&statuses(&["Live", "Live", "Dead"]), &rule());
        assert_eq!(
            stats,
            TableStats {
                total: 3,
                live: 2,
                dead: 1,
                live_rate: 66.7,
            }
        );
    }

    #[test]
    fn test_stats_empty_has_zero_rate() {
        let stats = compute_stats::<QualityRecord>(&[], &rule());
        assert_eq!(stats, TableStats::default());
        assert_eq!(stats.live_rate, 0.0);
    }

    #[test]
    fn test_stats_other_statuses_in_neither_bucket() {
        let stats = compute_stats(&statuses(&["live", "pending", "DEAD", ""]), &rule());
        assert_eq!(stats.total, 4);
        assert_eq!(stats.live, 1);
        assert_eq!(stats.dead, 1);
        assert_eq!(stats.live_rate, 25.0);
    }

    #[test]
    fn test_whois_stats_use_success_and_fail() {
        let records = vec![
            WhoisRecord::success("1.1.1.1"),
            WhoisRecord::failed("2.2.2.2", "reserved range"),
            WhoisRecord::success("3.3.3.3"),
        ];
        let stats = compute_stats(&records, &WhoisRecord::table().status_rule);
        assert_eq!((stats.live, stats.dead), (2, 1));
    }

    #[test]
    fn test_stats_display() {
        let stats = compute_stats(&statuses(&["Live", "Dead"]), &rule());
        assert_eq!(
            stats.to_string(),
            "Total: 2 | Live: 1 | Dead: 1 | Live Rate: 50.0%"
        );
    }
}

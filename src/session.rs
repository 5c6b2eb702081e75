//! Check session: drives both tables from lookup outcomes
//!
//! Each table tracks the token of the most recently dispatched check. An
//! outcome is applied only if it carries that token; older outcomes are
//! dropped. Failures become notices and never touch the table.

use crate::error::CheckError;
use crate::lookup::LookupService;
use crate::table::controller::TableController;
use crate::table::models::{QualityRecord, WhoisRecord};
use crate::table::record::Record;
use log::{debug, info, warn};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Whois,
    Quality,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Whois => write!(f, "whois"),
            TableKind::Quality => write!(f, "quality"),
        }
    }
}

/// Identifies one dispatched check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    pub kind: TableKind,
    seq: u64,
}

/// A message for the user about a check that produced no new records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: TableKind,
    pub error: CheckError,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.error)
    }
}

/// What happened to a finished check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Records replaced the table's set
    Applied(usize),
    /// A newer check was dispatched meanwhile; the outcome was dropped
    Stale,
    /// The check failed and a notice was raised
    Failed,
}

#[derive(Debug, Default)]
struct Track {
    latest: u64,
    loading: bool,
}

impl Track {
    fn begin(&mut self) -> u64 {
        self.latest += 1;
        self.loading = true;
        self.latest
    }
}

#[derive(Debug, Default)]
pub struct Session {
    pub whois: TableController<WhoisRecord>,
    pub quality: TableController<QualityRecord>,
    whois_track: Track,
    quality_track: Track,
    notices: Vec<Notice>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `kind` as loading and issue the token its outcome must carry
    pub fn begin(&mut self, kind: TableKind) -> RequestToken {
        let seq = self.track_mut(kind).begin();
        debug!("Dispatching {} check #{}", kind, seq);
        RequestToken { kind, seq }
    }

    pub fn is_loading(&self, kind: TableKind) -> bool {
        match kind {
            TableKind::Whois => self.whois_track.loading,
            TableKind::Quality => self.quality_track.loading,
        }
    }

    /// Notices raised since the last call
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn finish_whois(
        &mut self,
        token: RequestToken,
        outcome: Result<Vec<WhoisRecord>, CheckError>,
    ) -> Delivery {
        debug_assert_eq!(token.kind, TableKind::Whois);
        finish(
            &mut self.whois_track,
            &mut self.whois,
            &mut self.notices,
            token,
            outcome,
        )
    }

    pub fn finish_quality(
        &mut self,
        token: RequestToken,
        outcome: Result<Vec<QualityRecord>, CheckError>,
    ) -> Delivery {
        debug_assert_eq!(token.kind, TableKind::Quality);
        finish(
            &mut self.quality_track,
            &mut self.quality,
            &mut self.notices,
            token,
            outcome,
        )
    }

    /// Run a whois check over `text` to completion
    pub async fn check_whois<S: LookupService>(&mut self, service: &S, text: &str) -> Delivery {
        let token = self.begin(TableKind::Whois);
        let outcome = fetch_whois(service, text).await;
        self.finish_whois(token, outcome)
    }

    /// Run a quality check over `text` to completion
    pub async fn check_quality<S: LookupService>(
        &mut self,
        service: &S,
        text: &str,
        api_key: &str,
    ) -> Delivery {
        let token = self.begin(TableKind::Quality);
        let outcome = fetch_quality(service, text, api_key).await;
        self.finish_quality(token, outcome)
    }

    fn track_mut(&mut self, kind: TableKind) -> &mut Track {
        match kind {
            TableKind::Whois => &mut self.whois_track,
            TableKind::Quality => &mut self.quality_track,
        }
    }
}

fn finish<R: Record>(
    track: &mut Track,
    table: &mut TableController<R>,
    notices: &mut Vec<Notice>,
    token: RequestToken,
    outcome: Result<Vec<R>, CheckError>,
) -> Delivery {
    if token.seq != track.latest {
        debug!(
            "Dropping stale {} check #{} (latest #{})",
            token.kind, token.seq, track.latest
        );
        return Delivery::Stale;
    }
    track.loading = false;

    match outcome {
        Ok(records) => {
            let count = records.len();
            table.set_records(records);
            info!("{} table updated with {} records", token.kind, count);
            Delivery::Applied(count)
        }
        Err(error) => {
            warn!("{} check failed: {}", token.kind, error);
            notices.push(Notice {
                kind: token.kind,
                error,
            });
            Delivery::Failed
        }
    }
}

/// Parse `text` and look up its bare IPs
pub async fn fetch_whois<S: LookupService>(
    service: &S,
    text: &str,
) -> Result<Vec<WhoisRecord>, CheckError> {
    let parsed = service
        .parse_input(text)
        .await
        .map_err(CheckError::collaborator)?;
    let ips = parsed.ip_list();
    if ips.is_empty() {
        return Err(CheckError::NoIps);
    }

    service.check_whois(ips).await.map_err(CheckError::collaborator)
}

/// Parse `text` and check the quality of its proxies
pub async fn fetch_quality<S: LookupService>(
    service: &S,
    text: &str,
    api_key: &str,
) -> Result<Vec<QualityRecord>, CheckError> {
    let parsed = service
        .parse_input(text)
        .await
        .map_err(CheckError::collaborator)?;
    let proxies = parsed.proxy_list();
    if proxies.is_empty() {
        return Err(CheckError::NoProxies);
    }

    service
        .check_quality(proxies, api_key.to_string())
        .await
        .map_err(CheckError::collaborator)
}

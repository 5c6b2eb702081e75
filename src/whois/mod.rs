//! Whois lookups
//!
//! Results come from ipwho.is, or from a local MaxMind City database when one
//! is configured. Successful rows can be cached in the SQLite store.

pub mod client;
pub mod geo;

pub use client::IpWhoClient;
pub use geo::{GeoLocation, GeoLocator};

use crate::storage::Storage;
use crate::table::models::WhoisRecord;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};

/// Where whois rows come from
#[derive(Clone)]
pub enum WhoisBackend {
    Remote(IpWhoClient),
    Offline(GeoLocator),
}

#[derive(Clone)]
pub struct WhoisChecker {
    backend: WhoisBackend,
    concurrency: usize,
    cache: Option<(Storage, chrono::Duration)>,
}

impl WhoisChecker {
    pub fn new(backend: WhoisBackend, concurrency: usize) -> Self {
        Self {
            backend,
            concurrency: concurrency.max(1),
            cache: None,
        }
    }

    /// Cache successful rows in `storage` for `ttl`
    pub fn with_cache(mut self, storage: Storage, ttl: chrono::Duration) -> Self {
        self.cache = Some((storage, ttl));
        self
    }

    /// Look up one IP, consulting the cache first
    pub async fn lookup(&self, ip: &str) -> WhoisRecord {
        let key = cache_key(ip);

        if let Some((storage, _)) = &self.cache {
            match storage.cache_get::<WhoisRecord>(&key).await {
                Ok(Some(record)) => {
                    debug!("Whois cache hit for {}", ip);
                    return record;
                }
                Ok(None) => {}
                Err(e) => warn!("Whois cache read failed for {}: {:#}", ip, e),
            }
        }

        let record = match &self.backend {
            WhoisBackend::Remote(client) => client.lookup(ip).await,
            WhoisBackend::Offline(locator) => locator.whois(ip),
        };

        if let Some((storage, ttl)) = &self.cache {
            if record.is_success() {
                if let Err(e) = storage.cache_set(&key, &record, *ttl).await {
                    warn!("Whois cache write failed for {}: {:#}", ip, e);
                }
            }
        }

        record
    }

    /// Look up every IP concurrently; the result keeps input order
    pub async fn check_ips(&self, ips: &[String]) -> Vec<WhoisRecord> {
        info!("Starting whois check of {} IPs", ips.len());

        // collected first so the returned future stays Send
        let lookups: Vec<_> = ips.iter().map(|ip| self.lookup(ip)).collect();
        let results: Vec<WhoisRecord> = stream::iter(lookups)
            .buffered(self.concurrency)
            .collect()
            .await;

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!("Whois check completed: {} results, {} failed", results.len(), failed);
        results
    }
}

fn cache_key(ip: &str) -> String {
    format!("whois:{}", ip)
}

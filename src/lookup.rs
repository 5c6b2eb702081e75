//! Lookup collaborators behind one seam
//!
//! The session only talks to a `LookupService`; `LocalService` is the real
//! implementation, tests substitute their own.

use crate::config::AppConfig;
use crate::proxy::{CheckerConfig, InputParser, ParsedInput, ProxyType, QualityChecker};
use crate::storage::Storage;
use crate::table::models::{QualityRecord, WhoisRecord};
use crate::whois::{GeoLocator, IpWhoClient, WhoisBackend, WhoisChecker};
use crate::Result;
use anyhow::Context;
use log::info;
use std::future::Future;

/// Parse and lookup operations a check needs
pub trait LookupService: Send + Sync {
    fn parse_input(&self, text: &str) -> impl Future<Output = Result<ParsedInput>> + Send;

    fn check_whois(&self, ips: Vec<String>) -> impl Future<Output = Result<Vec<WhoisRecord>>> + Send;

    /// Each proxy string is `host:port` or `host:port:user:pass`
    fn check_quality(
        &self,
        proxies: Vec<String>,
        api_key: String,
    ) -> impl Future<Output = Result<Vec<QualityRecord>>> + Send;
}

/// In-process lookups: the input parser, whois and quality checkers
#[derive(Clone)]
pub struct LocalService {
    whois: WhoisChecker,
    quality: QualityChecker,
}

impl LocalService {
    pub fn new(whois: WhoisChecker, quality: QualityChecker) -> Self {
        Self { whois, quality }
    }

    /// Build from configuration. `storage` backs the whois cache when caching
    /// is enabled.
    pub fn from_config(config: &AppConfig, storage: Option<Storage>) -> Result<Self> {
        let backend = match &config.whois.mmdb_path {
            Some(path) => {
                info!("Using offline whois database {:?}", path);
                WhoisBackend::Offline(
                    GeoLocator::from_path(path)
                        .with_context(|| format!("Failed to open MMDB database {:?}", path))?,
                )
            }
            None => WhoisBackend::Remote(IpWhoClient::new(config.whois_timeout())?),
        };

        let mut whois = WhoisChecker::new(backend, config.worker.pool_size);
        if let Some(storage) = storage.filter(|_| config.storage.cache_enabled) {
            whois = whois.with_cache(storage, config.cache_ttl()?);
        }

        let quality = QualityChecker::with_config(
            CheckerConfig::new()
                .with_timeout(config.quality_timeout())
                .with_connect_timeout(config.proxy_connect_timeout())
                .with_concurrency(config.worker.pool_size)
                .with_user_agents(config.quality.user_agents.clone()),
        );

        Ok(Self::new(whois, quality))
    }
}

impl LookupService for LocalService {
    async fn parse_input(&self, text: &str) -> Result<ParsedInput> {
        Ok(InputParser::parse(text, ProxyType::Http))
    }

    async fn check_whois(&self, ips: Vec<String>) -> Result<Vec<WhoisRecord>> {
        Ok(self.whois.check_ips(&ips).await)
    }

    async fn check_quality(&self, proxies: Vec<String>, api_key: String) -> Result<Vec<QualityRecord>> {
        Ok(self.quality.check_proxies(&proxies, &api_key).await)
    }
}

//! IP-quality checker: exercises each proxy by running a fraud/VPN lookup
//! through it

use crate::proxy::models::{Proxy, ProxyType};
use crate::proxy::parser::InputParser;
use crate::table::models::{QualityRecord, NOT_AVAILABLE};
use crate::Result;
use anyhow::anyhow;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Proxy as ReqwestProxy};
use serde::Deserialize;
use std::time::Duration;

/// Default timeout for a quality check in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default timeout for connecting to the proxy in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default number of concurrent checks
const DEFAULT_CONCURRENCY: usize = 5;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

const API_BASE_URL: &str = "https://ipqualityscore.com/api/json/ip";

const LOOKUP_PAGE_URL: &str = "https://www.ipqualityscore.com/free-ip-lookup-proxy-vpn-test/lookup";

static COUNTRY_CELL: Lazy<Regex> = Lazy::new(|| cell_regex("Country"));
static CITY_CELL: Lazy<Regex> = Lazy::new(|| cell_regex("City"));
static REGION_CELL: Lazy<Regex> = Lazy::new(|| cell_regex("Region"));
static ISP_CELL: Lazy<Regex> = Lazy::new(|| cell_regex("ISP"));
static ORGANIZATION_CELL: Lazy<Regex> = Lazy::new(|| cell_regex("Organization"));

fn cell_regex(label: &str) -> Regex {
    Regex::new(&format!(r"{}:</td>\s*<td>([^<]+)", label)).expect("Invalid lookup page regex")
}

/// Configuration for the quality checker
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Timeout for each check, including the proxy connection
    pub timeout: Duration,
    /// Timeout for establishing the connection to the proxy
    pub connect_timeout: Duration,
    /// Number of concurrent checks
    pub concurrency: usize,
    /// User agents to rotate through for page lookups
    pub user_agents: Vec<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            user_agents: vec![DEFAULT_USER_AGENT.to_string()],
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_user_agents(mut self, user_agents: Vec<String>) -> Self {
        if !user_agents.is_empty() {
            self.user_agents = user_agents;
        }
        self
    }

    fn user_agent(&self, index: usize) -> &str {
        self.user_agents
            .get(index % self.user_agents.len().max(1))
            .map(String::as_str)
            .unwrap_or(DEFAULT_USER_AGENT)
    }
}

/// Response of the IPQualityScore JSON API
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiResponse {
    success: bool,
    message: String,
    fraud_score: u32,
    country_code: String,
    region: String,
    city: String,
    #[serde(rename = "ISP")]
    isp: String,
    organization: String,
    proxy: bool,
    vpn: bool,
    active_vpn: bool,
}

impl ApiResponse {
    fn into_record(self, proxy: &Proxy) -> Result<QualityRecord> {
        if !self.success {
            return Err(anyhow!("API failed: {}", self.message));
        }

        let mut record = QualityRecord::live(proxy.host.clone(), proxy.port.to_string());
        record.country = self.country_code;
        record.city = self.city;
        record.region = self.region;
        record.isp = self.isp;
        record.organization = self.organization;
        record.fraud_score = Some(self.fraud_score);
        record.vpn = self.vpn || self.active_vpn;
        record.proxy = self.proxy;
        Ok(record)
    }
}

/// Checker producing one `QualityRecord` per proxy string
#[derive(Debug, Clone, Default)]
pub struct QualityChecker {
    config: CheckerConfig,
}

impl QualityChecker {
    /// Create a new checker with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new checker with custom configuration
    pub fn with_config(config: CheckerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Check a single proxy string (`host:port[:user:pass]`, or a
    /// `scheme://` URL for non-HTTP proxies).
    ///
    /// Never fails: a proxy that cannot carry the lookup becomes a `Dead`
    /// record with the error attached.
    pub async fn check_proxy(&self, proxy_string: &str, api_key: &str, index: usize) -> QualityRecord {
        let Some(proxy) = route(proxy_string) else {
            return QualityRecord::dead(proxy_string, "", "Unrecognized proxy format");
        };

        debug!("Checking IP quality through {}", proxy.masked());
        let outcome = match self.create_client(&proxy, index) {
            Ok(client) => {
                if api_key.is_empty() {
                    self.lookup_page(&client, &proxy).await
                } else {
                    self.lookup_api(&client, &proxy, api_key).await
                }
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(record) => record,
            Err(e) => {
                warn!("IP quality check failed for {}: {}", proxy.masked(), e);
                QualityRecord::dead(proxy.host.clone(), proxy.port.to_string(), e.to_string())
            }
        }
    }

    /// Check proxy strings concurrently; the result keeps input order
    pub async fn check_proxies(&self, proxies: &[String], api_key: &str) -> Vec<QualityRecord> {
        info!(
            "Starting IP quality check of {} proxies ({})",
            proxies.len(),
            if api_key.is_empty() { "lookup page" } else { "API" }
        );

        let checks: Vec<_> = proxies
            .iter()
            .enumerate()
            .map(|(index, proxy)| self.check_proxy(proxy, api_key, index))
            .collect();
        let results: Vec<QualityRecord> = stream::iter(checks)
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let live = results.iter().filter(|r| r.is_live()).count();
        info!("IP quality check completed: {} live, {} dead", live, results.len() - live);
        results
    }

    async fn lookup_api(&self, client: &Client, proxy: &Proxy, api_key: &str) -> Result<QualityRecord> {
        let url = format!("{}/{}/{}", API_BASE_URL, api_key, proxy.host);
        let response = client
            .get(url)
            .query(&[
                ("strictness", "0"),
                ("allow_public_access_points", "true"),
                ("lighter_penalties", "true"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("API error: status {}, body: {}", status, body));
        }

        let mut record = response.json::<ApiResponse>().await?.into_record(proxy)?;
        record.error = Some("(Source: Official API)".to_string());
        Ok(record)
    }

    async fn lookup_page(&self, client: &Client, proxy: &Proxy) -> Result<QualityRecord> {
        let url = format!("{}/{}", LOOKUP_PAGE_URL, proxy.host);
        let html = client
            .get(url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await?
            .text()
            .await?;

        Ok(scrape_lookup_page(&html, proxy))
    }

    /// Create a reqwest client that routes through the proxy
    fn create_client(&self, proxy: &Proxy, index: usize) -> Result<Client> {
        // the lookups are https, so http proxies must carry every scheme
        let reqwest_proxy = ReqwestProxy::all(proxy.url())?;

        let client = Client::builder()
            .proxy(reqwest_proxy)
            .timeout(self.config.timeout)
            .connect_timeout(self.config.connect_timeout)
            .user_agent(self.config.user_agent(index))
            .build()?;

        Ok(client)
    }
}

/// The proxy a dispatch string routes through; bare strings are HTTP proxies
fn route(proxy_string: &str) -> Option<Proxy> {
    InputParser::parse_proxy_line(proxy_string, ProxyType::Http)
}

/// Pull the detail cells out of the public lookup page. Missing cells read `N/A`.
fn scrape_lookup_page(html: &str, proxy: &Proxy) -> QualityRecord {
    let cell = |re: &Regex| {
        re.captures(html)
            .map(|caps| caps[1].trim().to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };
    let lower = html.to_lowercase();

    let mut record = QualityRecord::live(proxy.host.clone(), proxy.port.to_string());
    record.country = cell(&COUNTRY_CELL);
    record.city = cell(&CITY_CELL);
    record.region = cell(&REGION_CELL);
    record.isp = cell(&ISP_CELL);
    record.organization = cell(&ORGANIZATION_CELL);
    record.vpn = lower.contains("vpn detected: yes");
    record.proxy = lower.contains("proxy detected: yes");
    record
}

//! ipwho.is client

use crate::table::models::WhoisRecord;
use crate::Result;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://ipwho.is";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Flag {
    img: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Connection {
    asn: u64,
    isp: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Timezone {
    utc: String,
}

/// Response body of `GET https://ipwho.is/<ip>`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IpWhoResponse {
    ip: String,
    success: bool,
    message: String,
    country: String,
    country_code: String,
    region: String,
    city: String,
    flag: Flag,
    connection: Connection,
    timezone: Timezone,
}

impl IpWhoResponse {
    fn into_record(self, requested_ip: &str) -> WhoisRecord {
        if !self.success {
            return WhoisRecord::failed(requested_ip, self.message);
        }

        let mut record = WhoisRecord::success(if self.ip.is_empty() {
            requested_ip.to_string()
        } else {
            self.ip
        });
        record.country = self.country;
        record.country_code = self.country_code;
        record.region = self.region;
        record.city = self.city;
        record.flag = self.flag.img;
        record.isp = self.connection.isp;
        record.asn = format!("AS{}", self.connection.asn);
        record.timezone = self.timezone.utc;
        record
    }
}

#[derive(Debug, Clone)]
pub struct IpWhoClient {
    client: Client,
    base_url: String,
}

impl IpWhoClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Look up one IP. Transport and decode errors become failed rows.
    pub async fn lookup(&self, ip: &str) -> WhoisRecord {
        debug!("Checking whois for {}", ip);
        match self.fetch(ip).await {
            Ok(response) => response.into_record(ip),
            Err(e) => {
                warn!("Whois check failed for {}: {}", ip, e);
                WhoisRecord::failed(ip, e.to_string())
            }
        }
    }

    async fn fetch(&self, ip: &str) -> Result<IpWhoResponse> {
        let url = format!("{}/{}", self.base_url, ip);
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response_into_record() {
        let response: IpWhoResponse = serde_json::from_str(
            r#"{
                "ip": "8.8.8.8",
                "success": true,
                "country": "United States",
                "country_code": "US",
                "region": "California",
                "city": "Mountain View",
                "flag": {"img": "https://cdn.ipwhois.io/flags/us.svg", "emoji": "🇺🇸"},
                "connection": {"asn": 15169, "org": "Google LLC", "isp": "Google LLC"},
                "timezone": {"id": "America/Los_Angeles", "utc": "-07:00"}
            }"#,
        )
        .unwrap();

        let record = response.into_record("8.8.8.8");
        assert!(record.is_success());
        assert_eq!(record.country_code, "US");
        assert_eq!(record.region, "California");
        assert_eq!(record.isp, "Google LLC");
        assert_eq!(record.asn, "AS15169");
        assert_eq!(record.timezone, "-07:00");
        assert_eq!(record.flag, "https://cdn.ipwhois.io/flags/us.svg");
        assert!(record.error.is_none());
    }

    #[test]
    fn test_failure_response_into_record() {
        let response: IpWhoResponse = serde_json::from_str(
            r#"{"ip": "10.0.0.1", "success": false, "message": "Reserved range"}"#,
        )
        .unwrap();

        let record = response.into_record("10.0.0.1");
        assert!(!record.is_success());
        assert_eq!(record.status, "fail");
        assert_eq!(record.error.as_deref(), Some("Reserved range"));
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = IpWhoClient::new(Duration::from_secs(1))
            .unwrap()
            .with_base_url("http://localhost:9999/");
        assert_eq!(client.base_url, "http://localhost:9999");
    }

    #[tokio::test]
    async fn test_unreachable_service_gives_failed_row() {
        let client = IpWhoClient::new(Duration::from_millis(500))
            .unwrap()
            .with_base_url("http://127.0.0.1:1");
        let record = client.lookup("1.1.1.1").await;
        assert_eq!(record.ip, "1.1.1.1");
        assert!(!record.is_success());
        assert!(record.error.is_some());
    }
}

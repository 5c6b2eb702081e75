//! Whois and IP-quality result records
//!
//! Raw collaborator responses are normalized here, once, into the flat shape
//! the tables work on. In particular the `vpn`/`proxy` flags arrive either as
//! JSON booleans or as `"Yes"`/`"No"` strings and always leave as `bool`.

use crate::table::record::{Column, FieldValue, Record, StatusRule, TableSpec};
use serde::{Deserialize, Deserializer, Serialize};
use std::net::IpAddr;

pub const WHOIS_SUCCESS: &str = "success";
pub const WHOIS_FAIL: &str = "fail";
pub const QUALITY_LIVE: &str = "Live";
pub const QUALITY_DEAD: &str = "Dead";

/// Display token for a missing fraud score
pub const NOT_AVAILABLE: &str = "N/A";

const WHOIS_COLUMNS: &[Column] = &[
    Column::new("ip", "IP"),
    Column::new("country", "Country"),
    Column::new("region", "Region"),
    Column::new("city", "City"),
    Column::new("isp", "ISP"),
    Column::new("asn", "ASN"),
    Column::new("timezone", "Timezone"),
    Column::new("status", "Status"),
];

static WHOIS_TABLE: TableSpec = TableSpec {
    name: "whois",
    columns: WHOIS_COLUMNS,
    csv_columns: WHOIS_COLUMNS,
    csv_filename: "whois_results.csv",
    status_rule: StatusRule {
        live: &[WHOIS_SUCCESS],
        dead: &[WHOIS_FAIL, "failed"],
    },
    status_filter: false,
};

static QUALITY_TABLE: TableSpec = TableSpec {
    name: "quality",
    columns: &[
        Column::new("proxy_label", "Proxy (IP:Port)"),
        Column::new("status", "Status"),
        Column::new("country", "Country"),
        Column::new("city", "City"),
        Column::new("region", "Region"),
        Column::new("vpn", "VPN"),
        Column::new("proxy", "Proxy"),
        Column::new("isp", "ISP"),
        Column::new("organization", "Organization"),
        Column::new("fraud_score", "Fraud Score"),
    ],
    csv_columns: &[
        Column::new("proxy_label", "IP:Port"),
        Column::new("status", "Status"),
        Column::new("country", "Country"),
        Column::new("city", "City"),
        Column::new("vpn", "VPN"),
        Column::new("proxy", "Proxy"),
        Column::new("isp", "ISP"),
        Column::new("organization", "Organization"),
    ],
    csv_filename: "quality_results.csv",
    status_rule: StatusRule {
        live: &["live"],
        dead: &["dead"],
    },
    status_filter: true,
};

/// Geolocation and ISP information for one IP
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WhoisRecord {
    pub ip: String,
    pub country: String,
    pub country_code: String,
    pub region: String,
    pub city: String,
    /// Flag image URL
    pub flag: String,
    pub isp: String,
    pub asn: String,
    pub timezone: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WhoisRecord {
    /// An empty successful record for `ip`, to be filled in by the caller
    pub fn success(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            status: WHOIS_SUCCESS.to_string(),
            ..Default::default()
        }
    }

    /// A row-level failure for `ip`
    pub fn failed(ip: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            status: WHOIS_FAIL.to_string(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case(WHOIS_SUCCESS)
    }
}

impl Record for WhoisRecord {
    const FIELDS: &'static [&'static str] = &[
        "ip",
        "country",
        "country_code",
        "region",
        "city",
        "flag",
        "isp",
        "asn",
        "timezone",
        "status",
        "error",
    ];

    fn table() -> &'static TableSpec {
        &WHOIS_TABLE
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        let text = match key {
            "ip" => &self.ip,
            "country" => &self.country,
            "country_code" => &self.country_code,
            "region" => &self.region,
            "city" => &self.city,
            "flag" => &self.flag,
            "isp" => &self.isp,
            "asn" => &self.asn,
            "timezone" => &self.timezone,
            "status" => &self.status,
            "error" => self.error.as_ref()?,
            _ => return None,
        };
        Some(FieldValue::Text(text.clone()))
    }

    fn status(&self) -> &str {
        &self.status
    }
}

/// Fraud/VPN detection result for one proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawQualityRecord")]
pub struct QualityRecord {
    pub ip: String,
    pub port: String,
    /// Derived `ip:port` label
    pub proxy_label: String,
    pub status: String,
    pub country: String,
    pub city: String,
    pub region: String,
    pub vpn: bool,
    pub proxy: bool,
    pub isp: String,
    pub organization: String,
    pub fraud_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QualityRecord {
    /// A live record for `ip:port` with every detail field unset
    pub fn live(ip: impl Into<String>, port: impl Into<String>) -> Self {
        Self::with_status(ip.into(), port.into(), QUALITY_LIVE)
    }

    /// A row-level failure for `ip:port`
    pub fn dead(ip: impl Into<String>, port: impl Into<String>, error: impl Into<String>) -> Self {
        let mut record = Self::with_status(ip.into(), port.into(), QUALITY_DEAD);
        record.error = Some(error.into());
        record
    }

    fn with_status(ip: String, port: String, status: &str) -> Self {
        Self {
            proxy_label: proxy_label(&ip, &port),
            ip,
            port,
            status: status.to_string(),
            country: NOT_AVAILABLE.to_string(),
            city: NOT_AVAILABLE.to_string(),
            region: NOT_AVAILABLE.to_string(),
            vpn: false,
            proxy: false,
            isp: NOT_AVAILABLE.to_string(),
            organization: NOT_AVAILABLE.to_string(),
            fraud_score: None,
            error: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.status.eq_ignore_ascii_case(QUALITY_LIVE)
    }
}

impl Record for QualityRecord {
    const FIELDS: &'static [&'static str] = &[
        "ip",
        "port",
        "proxy_label",
        "status",
        "country",
        "city",
        "region",
        "vpn",
        "proxy",
        "isp",
        "organization",
        "fraud_score",
        "error",
    ];

    fn table() -> &'static TableSpec {
        &QUALITY_TABLE
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        let text = match key {
            "ip" => &self.ip,
            "port" => &self.port,
            "proxy_label" => &self.proxy_label,
            "status" => &self.status,
            "country" => &self.country,
            "city" => &self.city,
            "region" => &self.region,
            "isp" => &self.isp,
            "organization" => &self.organization,
            "vpn" => return Some(FieldValue::Flag(self.vpn)),
            "proxy" => return Some(FieldValue::Flag(self.proxy)),
            "fraud_score" => {
                return Some(match self.fraud_score {
                    Some(score) => FieldValue::Number(f64::from(score)),
                    None => FieldValue::from(NOT_AVAILABLE),
                })
            }
            "error" => self.error.as_ref()?,
            _ => return None,
        };
        Some(FieldValue::Text(text.clone()))
    }

    fn status(&self) -> &str {
        &self.status
    }
}

/// `ip:port`, or just `ip` when the port is unknown
pub fn proxy_label(ip: &str, port: &str) -> String {
    if port.is_empty() {
        ip.to_string()
    } else {
        format!("{}:{}", ip, port)
    }
}

/// Interpret a display token or wire value as a flag
pub fn normalize_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "yes" | "true" | "1" | "y"
    )
}

/// Quality record exactly as a collaborator may send it
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawQualityRecord {
    ip: String,
    #[serde(deserialize_with = "text_or_number")]
    port: String,
    status: String,
    country: String,
    city: String,
    region: String,
    #[serde(deserialize_with = "flag")]
    vpn: bool,
    #[serde(deserialize_with = "flag")]
    proxy: bool,
    isp: String,
    organization: String,
    #[serde(deserialize_with = "score", alias = "fraudScore")]
    fraud_score: Option<u32>,
    error: Option<String>,
}

impl From<RawQualityRecord> for QualityRecord {
    fn from(raw: RawQualityRecord) -> Self {
        let (ip, port) = if raw.port.is_empty() {
            split_endpoint(&raw.ip)
        } else {
            (raw.ip, raw.port)
        };

        Self {
            proxy_label: proxy_label(&ip, &port),
            ip,
            port,
            status: raw.status,
            country: raw.country,
            city: raw.city,
            region: raw.region,
            vpn: raw.vpn,
            proxy: raw.proxy,
            isp: raw.isp,
            organization: raw.organization,
            fraud_score: raw.fraud_score,
            error: raw.error.filter(|e| !e.is_empty()),
        }
    }
}

/// Failed checks sometimes carry the whole `host:port[:user:pass]` string in
/// `ip`. Split off host and port; credentials are dropped.
fn split_endpoint(value: &str) -> (String, String) {
    if value.parse::<IpAddr>().is_ok() {
        return (value.to_string(), String::new());
    }
    let parts: Vec<&str> = value.split(':').collect();
    match parts.as_slice() {
        [host, port] | [host, port, _, _] if port.parse::<u16>().is_ok() => {
            (host.to_string(), port.to_string())
        }
        _ => (value.to_string(), String::new()),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Bool(b)) => b,
        Some(Loose::Int(n)) => n != 0,
        Some(Loose::Float(n)) => n != 0.0,
        Some(Loose::Text(s)) => normalize_flag(&s),
        None => false,
    })
}

fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Text(s)) => s,
        Some(Loose::Int(n)) => n.to_string(),
        Some(Loose::Float(n)) => n.to_string(),
        Some(Loose::Bool(b)) => b.to_string(),
        None => String::new(),
    })
}

fn score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Int(n)) => u32::try_from(n).ok(),
        Some(Loose::Float(n)) if n.is_finite() && n >= 0.0 => Some(n.round() as u32),
        Some(Loose::Text(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

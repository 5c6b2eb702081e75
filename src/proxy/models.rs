//! Parsed input models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Proxy type enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProxyType {
    #[default]
    Http,
    Https,
    Socks4,
    Socks5,
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyType::Http => write!(f, "http"),
            ProxyType::Https => write!(f, "https"),
            ProxyType::Socks4 => write!(f, "socks4"),
            ProxyType::Socks5 => write!(f, "socks5"),
        }
    }
}

/// Proxy authentication credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

impl ProxyAuth {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }
}

/// A proxy entry recognized in the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    pub host: String,
    pub port: u16,
    pub proxy_type: ProxyType,
    pub auth: Option<ProxyAuth>,
}

impl Proxy {
    /// Create a new proxy without authentication
    pub fn new(host: String, port: u16, proxy_type: ProxyType) -> Self {
        Self {
            host,
            port,
            proxy_type,
            auth: None,
        }
    }

    /// Create a new proxy with authentication
    pub fn with_auth(
        host: String,
        port: u16,
        proxy_type: ProxyType,
        username: String,
        password: String,
    ) -> Self {
        Self {
            host,
            port,
            proxy_type,
            auth: Some(ProxyAuth::new(username, password)),
        }
    }

    /// Get the proxy URL string
    pub fn url(&self) -> String {
        let auth_part = self.auth.as_ref().map_or(String::new(), |auth| {
            format!("{}:{}@", auth.username, auth.password)
        });

        format!("{}://{}{}:{}", self.proxy_type, auth_part, self.host, self.port)
    }

    /// Get the proxy string in IP:PORT format
    pub fn to_simple_string(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Dispatch form: `host:port`, or `host:port:user:pass` when both
    /// credentials are present. Non-HTTP proxies keep their scheme as
    /// `scheme://[user:pass@]host:port`.
    pub fn to_full_string(&self) -> String {
        let credentials = self
            .auth
            .as_ref()
            .filter(|auth| !auth.username.is_empty() && !auth.password.is_empty());

        match (&self.proxy_type, credentials) {
            (ProxyType::Http, Some(auth)) => format!(
                "{}:{}:{}:{}",
                self.host, self.port, auth.username, auth.password
            ),
            (ProxyType::Http, None) => self.to_simple_string(),
            (scheme, Some(auth)) => format!(
                "{}://{}:{}@{}:{}",
                scheme, auth.username, auth.password, self.host, self.port
            ),
            (scheme, None) => format!("{}://{}:{}", scheme, self.host, self.port),
        }
    }

    /// Full string with the password masked, for logs
    pub fn masked(&self) -> String {
        match &self.auth {
            Some(auth) => format!("{}:{}:{}:****", self.host, self.port, auth.username),
            None => self.to_simple_string(),
        }
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    V4,
    V6,
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => write!(f, "IPv4"),
            IpVersion::V6 => write!(f, "IPv6"),
        }
    }
}

/// A bare IP address recognized in the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpEntry {
    pub ip: String,
    pub version: IpVersion,
}

impl From<IpAddr> for IpEntry {
    fn from(addr: IpAddr) -> Self {
        let version = match addr {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        };
        Self {
            ip: addr.to_string(),
            version,
        }
    }
}

/// Everything recognized in one block of pasted text
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedInput {
    /// Non-blank, non-comment lines seen
    pub total: usize,
    pub ips: Vec<IpEntry>,
    pub proxies: Vec<Proxy>,
}

impl ParsedInput {
    /// IP strings to send to the whois lookup
    pub fn ip_list(&self) -> Vec<String> {
        self.ips.iter().map(|entry| entry.ip.clone()).collect()
    }

    /// Proxy strings to send to the quality lookup
    pub fn proxy_list(&self) -> Vec<String> {
        self.proxies.iter().map(Proxy::to_full_string).collect()
    }
}

//! Input parser: splits pasted text into bare IPs and proxy entries

use crate::proxy::models::{IpEntry, ParsedInput, Proxy, ProxyType};
use crate::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::net::IpAddr;
use std::path::Path;

static URL_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?|socks[45])://(?:([^:]+):([^@]+)@)?([^:]+):(\d+)/?$")
        .expect("Invalid proxy URL regex")
});

static AUTH_AT_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^:]+):([^@]+)@([^:]+):(\d+)$").expect("Invalid user:pass@host regex")
});

/// Parser for pasted IP and proxy lists
pub struct InputParser;

impl InputParser {
    /// Parse a block of text.
    ///
    /// Each line is either a bare IP address, a proxy, or ignored. Blank
    /// lines and `#` comments are skipped and do not count toward `total`.
    pub fn parse(content: &str, default_type: ProxyType) -> ParsedInput {
        let mut parsed = ParsedInput::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            parsed.total += 1;

            if let Some(entry) = Self::parse_ip_line(line) {
                parsed.ips.push(entry);
            } else if let Some(proxy) = Self::parse_proxy_line(line, default_type.clone()) {
                parsed.proxies.push(proxy);
            }
        }

        parsed
    }

    /// A line holding only an IPv4 or IPv6 address
    pub fn parse_ip_line(line: &str) -> Option<IpEntry> {
        line.trim().parse::<IpAddr>().ok().map(IpEntry::from)
    }

    /// Parse a single proxy line
    ///
    /// Supports formats:
    /// - IP:PORT
    /// - IP:PORT:USER:PASS
    /// - USER:PASS@IP:PORT
    /// - scheme://IP:PORT
    /// - scheme://USER:PASS@IP:PORT
    pub fn parse_proxy_line(line: &str, default_type: ProxyType) -> Option<Proxy> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        Self::parse_url_format(line)
            .or_else(|| Self::parse_auth_at_format(line, default_type.clone()))
            .or_else(|| Self::parse_colon_format(line, default_type))
    }

    /// Parse URL format proxy (e.g., http://ip:port or socks5://user:pass@ip:port)
    fn parse_url_format(line: &str) -> Option<Proxy> {
        let caps = URL_FORMAT.captures(line)?;

        let proxy_type = match &caps[1] {
            "http" => ProxyType::Http,
            "https" => ProxyType::Https,
            "socks4" => ProxyType::Socks4,
            "socks5" => ProxyType::Socks5,
            _ => return None,
        };

        let host = caps[4].to_string();
        let port: u16 = caps[5].parse().ok()?;

        match (caps.get(2), caps.get(3)) {
            (Some(user), Some(pass)) => Some(Proxy::with_auth(
                host,
                port,
                proxy_type,
                user.as_str().to_string(),
                pass.as_str().to_string(),
            )),
            _ => Some(Proxy::new(host, port, proxy_type)),
        }
    }

    /// Parse user:pass@ip:port format
    fn parse_auth_at_format(line: &str, default_type: ProxyType) -> Option<Proxy> {
        let caps = AUTH_AT_FORMAT.captures(line)?;

        let username = caps[1].to_string();
        let password = caps[2].to_string();
        let host = caps[3].to_string();
        let port: u16 = caps[4].parse().ok()?;

        Some(Proxy::with_auth(host, port, default_type, username, password))
    }

    /// Parse ip:port or ip:port:user:pass format.
    ///
    /// A third field alone carries no credentials. Everything after the
    /// username is the password, colons included.
    fn parse_colon_format(line: &str, default_type: ProxyType) -> Option<Proxy> {
        let parts: Vec<&str> = line.splitn(4, ':').collect();

        let (host, port) = match parts.as_slice() {
            [host, port, ..] if !host.is_empty() => (host.to_string(), port.parse::<u16>().ok()?),
            _ => return None,
        };

        match parts.as_slice() {
            [_, _, username, password] => Some(Proxy::with_auth(
                host,
                port,
                default_type,
                username.to_string(),
                password.to_string(),
            )),
            _ => Some(Proxy::new(host, port, default_type)),
        }
    }

    /// Save proxies to a file, one dispatch string per line
    pub fn save_to_file<P: AsRef<Path>>(proxies: &[Proxy], path: P) -> Result<()> {
        let content: String = proxies
            .iter()
            .map(Proxy::to_full_string)
            .collect::<Vec<_>>()
            .join("\n");

        fs::write(path, content)?;
        Ok(())
    }
}

//! IP Proxy Checker - Whois and IP-quality lookups with sortable result tables
//!
//! Pasted text is split into bare IPs and proxies. IPs get a whois lookup,
//! proxies get an IP-quality check routed through the proxy itself. Each
//! result set lands in a table that can be sorted, searched, filtered by
//! status, summarized and exported to CSV.

pub mod config;
pub mod error;
pub mod logger;
pub mod lookup;
pub mod proxy;
pub mod render;
pub mod session;
pub mod shell;
pub mod storage;
pub mod table;
pub mod whois;

pub use config::AppConfig;
pub use error::CheckError;
pub use lookup::{LocalService, LookupService};
pub use session::{Delivery, Notice, RequestToken, Session, TableKind};
pub use storage::Storage;
pub use table::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;

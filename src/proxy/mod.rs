//! Proxy module for parsing input and checking proxies
//!
//! This module provides functionality for:
//! - Parsing pasted text into bare IPs and proxies (IP:PORT, IP:PORT:USER:PASS, etc.)
//! - Checking each proxy's IP quality with concurrent lookups routed through it

pub mod checker;
pub mod models;
pub mod parser;

pub use checker::{CheckerConfig, QualityChecker};
pub use models::{IpEntry, IpVersion, ParsedInput, Proxy, ProxyAuth, ProxyType};
pub use parser::InputParser;

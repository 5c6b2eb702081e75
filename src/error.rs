//! Check outcome errors surfaced to the user as notices

use thiserror::Error;

/// Why a check did not produce a new record set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// Parsing found no bare IPs, so no whois lookup was issued
    #[error("No IPs found in input!")]
    NoIps,

    /// Parsing found no proxies, so no quality lookup was issued
    #[error("No proxies found in input!")]
    NoProxies,

    /// Parse or lookup collaborator failed
    #[error("{0}")]
    Collaborator(String),
}

impl CheckError {
    /// Wrap a collaborator failure, keeping its context chain in the message
    pub fn collaborator(error: anyhow::Error) -> Self {
        Self::Collaborator(format!("{:#}", error))
    }
}

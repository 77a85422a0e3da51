//! # Scan Target Model
//!
//! Defines the accepted input for a scan run.
//!
//! A target can be:
//! * A single IPv4/IPv6 address (e.g. `10.0.0.5`, `::1`).
//! * A hostname (e.g. `scanme.nmap.org`), resolved before discovery starts.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use anyhow::Context;

/// Represents the single host a run is pointed at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// An address literal, used as is.
    Host { target_addr: IpAddr },
    /// A name that still has to go through the system resolver.
    Name { hostname: String },
}

impl FromStr for Target {
    type Err = String;

    /// Parses a string into a `Target`.
    ///
    /// Supported formats:
    /// * **Host**: IPv4/IPv6 literal.
    /// * **Name**: RFC 1123 style hostname (letters, digits, `-` and `.`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Ok(target_addr) = s.parse::<IpAddr>() {
            return Ok(Target::Host { target_addr });
        }

        if is_valid_hostname(s) {
            return Ok(Target::Name {
                hostname: s.to_ascii_lowercase(),
            });
        }

        Err(format!("invalid target: {s}"))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Host { target_addr } => write!(f, "{target_addr}"),
            Target::Name { hostname } => f.write_str(hostname),
        }
    }
}

impl Target {
    /// Resolves the target into the address every probe will be aimed at.
    ///
    /// IPv4 results win over IPv6 ones when a name resolves to both.
    pub async fn resolve(&self) -> anyhow::Result<IpAddr> {
        let hostname = match self {
            Target::Host { target_addr } => return Ok(*target_addr),
            Target::Name { hostname } => hostname,
        };

        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((hostname.as_str(), 0))
            .await
            .with_context(|| format!("failed to resolve {hostname}"))?
            .collect();

        addrs
            .iter()
            .find(|addr| addr.is_ipv4())
            .or_else(|| addrs.first())
            .map(SocketAddr::ip)
            .with_context(|| format!("{hostname} resolved to no addresses"))
    }
}

fn is_valid_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }

    s.trim_end_matches('.').split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

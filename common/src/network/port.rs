//! # Port Model
//!
//! A [`PortRecord`] holds everything learned about one port of the target: the state
//! reported by discovery, the service metadata resolved by the deep scan and the
//! bookkeeping of which probes ran against it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Placeholder for descriptive fields nothing has filled in.
pub const NOT_AVAILABLE: &str = "N/A";

/// State of a port as reported by the discovery probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    Open,
    Filtered,
    Closed,
}

impl FromStr for PortState {
    type Err = std::convert::Infallible;

    /// Maps an nmap state token onto a [`PortState`].
    ///
    /// Only `open` and `closed` are matched exactly. Every other token
    /// (`filtered`, `open|filtered`, `unfiltered`, ...) lands in [`PortState::Filtered`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "open" => PortState::Open,
            "closed" => PortState::Closed,
            _ => PortState::Filtered,
        })
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PortState::Open => "open",
            PortState::Filtered => "filtered",
            PortState::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// The external probe variants the orchestrator knows how to launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProbeKind {
    /// Whole-target sweep for open and filtered ports.
    #[serde(rename = "Port Scan")]
    Discovery,
    /// Per-port service detection plus default and `vuln` scripts.
    #[serde(rename = "Script Scan")]
    ScriptScan,
}

impl ProbeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ProbeKind::Discovery => "Port Scan",
            ProbeKind::ScriptScan => "Script Scan",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRecord {
    pub id: String,
    pub state: PortState,
    pub service: String,
    pub product: String,
    pub version: String,
    pub os_name: String,
    pub completed_probes: Vec<ProbeKind>,
    pub failed_probes: Vec<ProbeKind>,
    pub findings: Vec<String>,
    pub notes: Vec<String>,
}

impl PortRecord {
    pub fn new(id: impl Into<String>, state: PortState) -> Self {
        Self {
            id: id.into(),
            state,
            service: NOT_AVAILABLE.to_string(),
            product: NOT_AVAILABLE.to_string(),
            version: NOT_AVAILABLE.to_string(),
            os_name: NOT_AVAILABLE.to_string(),
            completed_probes: Vec::new(),
            failed_probes: Vec::new(),
            findings: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Builder used at discovery time, when only the service name may be known.
    pub fn with_service(mut self, service: Option<&str>) -> Self {
        self.service = or_not_available(service);
        self
    }

    pub fn set_service(&mut self, service: Option<&str>) {
        self.service = or_not_available(service);
    }

    pub fn set_product(&mut self, product: Option<&str>) {
        self.product = or_not_available(product);
    }

    pub fn set_version(&mut self, version: Option<&str>) {
        self.version = or_not_available(version);
    }

    pub fn set_os_name(&mut self, os_name: Option<&str>) {
        self.os_name = or_not_available(os_name);
    }

    /// Records a probe kind as completed. A kind is stored at most once.
    pub fn mark_completed(&mut self, kind: ProbeKind) {
        if !self.completed_probes.contains(&kind) {
            self.completed_probes.push(kind);
        }
    }

    /// Records a probe kind as failed. A kind is stored at most once.
    pub fn mark_failed(&mut self, kind: ProbeKind) {
        if !self.failed_probes.contains(&kind) {
            self.failed_probes.push(kind);
        }
    }

    pub fn add_finding(&mut self, finding: impl Into<String>) {
        self.findings.push(finding.into());
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn is_vulnerable(&self) -> bool {
        !self.findings.is_empty()
    }
}

fn or_not_available(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

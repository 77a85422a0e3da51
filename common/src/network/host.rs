//! # Host Snapshot
//!
//! Read-only, fully consistent copy of a host's scan state. Produced by the aggregate
//! once the run is finalized and handed to the report writers and the terminal.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use super::port::PortRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSnapshot {
    pub address: IpAddr,
    pub open_count: usize,
    pub filtered_count: usize,
    pub open_ports: Vec<PortRecord>,
    pub filtered_ports: Vec<PortRecord>,
}

impl HostSnapshot {
    /// Looks a port up in both categories.
    pub fn port(&self, id: &str) -> Option<&PortRecord> {
        self.open_ports
            .iter()
            .chain(self.filtered_ports.iter())
            .find(|port| port.id == id)
    }

    pub fn total_findings(&self) -> usize {
        self.open_ports.iter().map(|port| port.findings.len()).sum()
    }

    /// Open ports whose deep scan ended in failure.
    pub fn failed_ports(&self) -> impl Iterator<Item = &PortRecord> {
        self.open_ports
            .iter()
            .filter(|port| !port.failed_probes.is_empty())
    }
}

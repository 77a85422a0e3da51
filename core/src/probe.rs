//! The **external probe** abstraction.
//!
//! A probe is one invocation of an external scanner against the target, either for the
//! whole host ([`ProbeKind::Discovery`]) or for a single port ([`ProbeKind::ScriptScan`]).
//! The orchestrator only depends on [`ExternalProbeRunner`]; [`nmap::NmapRunner`] is the
//! production implementation.

use std::net::IpAddr;
use std::path::PathBuf;

use async_trait::async_trait;
use nwiz_common::error::ProbeError;
use nwiz_common::network::port::ProbeKind;

pub mod nmap;

/// What to run and against what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub kind: ProbeKind,
    pub target: IpAddr,
    /// Set for per-port probes, `None` for a whole-host sweep.
    pub port_id: Option<String>,
}

impl ProbeRequest {
    pub fn discovery(target: IpAddr) -> Self {
        Self {
            kind: ProbeKind::Discovery,
            target,
            port_id: None,
        }
    }

    pub fn script_scan(target: IpAddr, port_id: impl Into<String>) -> Self {
        Self {
            kind: ProbeKind::ScriptScan,
            target,
            port_id: Some(port_id.into()),
        }
    }
}

/// Captured output of a finished probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    pub kind: ProbeKind,
    pub body: String,
    /// Where the output was persisted, if anywhere.
    pub path: Option<PathBuf>,
}

impl RawOutput {
    pub fn new(kind: ProbeKind, body: impl Into<String>) -> Self {
        Self {
            kind,
            body: body.into(),
            path: None,
        }
    }
}

/// Runs one external scan and hands back what it produced.
///
/// Implementations must be callable from many tasks at once. A call blocks its caller
/// for as long as the external process runs.
#[async_trait]
pub trait ExternalProbeRunner: Send + Sync {
    async fn run(&self, request: &ProbeRequest) -> Result<RawOutput, ProbeError>;
}

//! Typed failures of the scan pipeline.
//!
//! [`ProbeError`] and [`ParseError`] are raised by the external collaborators and are
//! absorbed per port by the orchestrator. [`ScanError`] is what ends a run.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::network::port::ProbeKind;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("could not start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{kind} exited with {status}: {stderr}")]
    Aborted {
        kind: ProbeKind,
        status: String,
        stderr: String,
    },

    #[error("lost track of {kind}: {source}")]
    Wait {
        kind: ProbeKind,
        #[source]
        source: std::io::Error,
    },

    #[error("{kind} did not finish within {}s", .after.as_secs())]
    TimedOut { kind: ProbeKind, after: Duration },

    #[error("could not read probe output {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed report: {0}")]
    Malformed(String),

    #[error("report has no <{0}> element")]
    MissingElement(&'static str),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("discovery probe failed: {0}")]
    DiscoveryProbe(#[from] ProbeError),

    #[error("discovery output could not be parsed: {0}")]
    DiscoveryParse(#[from] ParseError),

    #[error("cannot {action} while the run is {state}")]
    OutOfOrder {
        action: &'static str,
        state: &'static str,
    },
}

/// Why a single deep-scan task ended without results.
#[derive(Debug, Error)]
pub enum TaskFailure {
    #[error(transparent)]
    Invocation(#[from] ProbeError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("results for port {port} were rejected: {reason}")]
    Rejected { port: String, reason: String },

    #[error("task for port {port} panicked")]
    Panicked { port: String },
}

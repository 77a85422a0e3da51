//! nmap-backed [`ExternalProbeRunner`].
//!
//! Every probe writes its XML report to a file under the run's output directory and the
//! file is read back once the process exits. The files stay on disk as raw artifacts.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use nwiz_common::config::Config;
use nwiz_common::error::ProbeError;
use nwiz_common::network::port::ProbeKind;

use super::{ExternalProbeRunner, ProbeRequest, RawOutput};

const DISCOVERY_ARGS: &[&str] = &["-Pn", "-T4", "-sT", "--min-rate=2000", "-p-"];
const SCRIPT_SCAN_ARGS: &[&str] = &["-sV", "-sT", "-sC", "--script=vuln"];

pub struct NmapRunner {
    program: PathBuf,
    discovery_output: PathBuf,
    ports_dir: PathBuf,
    timeout: Option<Duration>,
}

impl NmapRunner {
    pub fn new(program: impl Into<PathBuf>, output_dir: &Path) -> Self {
        Self {
            program: program.into(),
            discovery_output: output_dir.join("OpenPorts.xml"),
            ports_dir: output_dir.join("Ports"),
            timeout: None,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self {
            program: cfg.nmap_path.clone(),
            discovery_output: cfg.discovery_output(),
            ports_dir: cfg.ports_dir(),
            timeout: cfg.probe_timeout,
        }
    }

    fn output_path(&self, request: &ProbeRequest) -> PathBuf {
        match (&request.kind, &request.port_id) {
            (ProbeKind::ScriptScan, Some(port_id)) => self
                .ports_dir
                .join(format!("{}.xml", port_id.replace(['/', '\\'], "_"))),
            _ => self.discovery_output.clone(),
        }
    }

    /// Builds the nmap argument list for `request`, writing XML to `output`.
    pub fn arguments(request: &ProbeRequest, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();

        if request.target.is_ipv6() {
            args.push("-6".to_string());
        }

        match request.kind {
            ProbeKind::Discovery => {
                args.extend(DISCOVERY_ARGS.iter().map(|arg| arg.to_string()));
            }
            ProbeKind::ScriptScan => {
                args.extend(SCRIPT_SCAN_ARGS.iter().map(|arg| arg.to_string()));
                if let Some(port_id) = &request.port_id {
                    args.push("-p".to_string());
                    args.push(port_number(port_id).to_string());
                }
            }
        }

        args.push("-oX".to_string());
        args.push(output.display().to_string());
        args.push(request.target.to_string());
        args
    }
}

#[async_trait]
impl ExternalProbeRunner for NmapRunner {
    async fn run(&self, request: &ProbeRequest) -> Result<RawOutput, ProbeError> {
        let output_path: PathBuf = self.output_path(request);
        let args: Vec<String> = Self::arguments(request, &output_path);
        debug!(program = %self.program.display(), ?args, "launching probe");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProbeError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let finished = child.wait_with_output();
        let waited = match self.timeout {
            Some(after) => tokio::time::timeout(after, finished)
                .await
                .map_err(|_elapsed| ProbeError::TimedOut {
                    kind: request.kind,
                    after,
                })?,
            None => finished.await,
        };
        let output = waited.map_err(|source| ProbeError::Wait {
            kind: request.kind,
            source,
        })?;

        if !output.status.success() {
            return Err(ProbeError::Aborted {
                kind: request.kind,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let body: String = tokio::fs::read_to_string(&output_path)
            .await
            .map_err(|source| ProbeError::Output {
                path: output_path.clone(),
                source,
            })?;

        Ok(RawOutput {
            kind: request.kind,
            body,
            path: Some(output_path),
        })
    }
}

/// `80/tcp` and `80` both address port 80 on the nmap command line.
fn port_number(port_id: &str) -> &str {
    port_id.split('/').next().unwrap_or(port_id)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

//! # Scan Orchestrator
//!
//! Drives a run through its phases:
//!
//! ```text
//! Idle -> Discovering -> DiscoveryFailed
//!                     -> Discovered -> ScanningPorts -> Finalized
//! ```
//!
//! * **Discovery** is a single probe for the whole target. Its failure ends the run and
//!   no port is ever recorded.
//! * **Deep scan** spawns one task per open port into a [`JoinSet`]. A [`Semaphore`] sized
//!   to the worker cap decides how many of them may be inside an external probe at once.
//!   A failing task marks its own port and nothing else.
//! * **Finalize** seals the [`HostAggregate`] and hands out the final snapshot.
//!
//! The orchestrator waits for every deep-scan task before it can finalize; there is no
//! phase timeout. Per-probe timeouts, if any, are the runner's business.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info_span};

use nwiz_common::config::DEFAULT_MAX_WORKERS;
use nwiz_common::error::{ParseError, ScanError, TaskFailure};
use nwiz_common::network::host::HostSnapshot;
use nwiz_common::network::port::{PortRecord, ProbeKind};
use nwiz_common::outcome::{
    self, DiscoveryOutcome, Module, ScriptScanOutcome, Severity, SummaryOutcome,
};
use nwiz_common::{fail, notice, pass};

use crate::aggregate::{HostAggregate, Placement};
use crate::parser::{ReportParser, Verdict};
use crate::probe::{ExternalProbeRunner, ProbeRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Discovering,
    DiscoveryFailed,
    Discovered,
    ScanningPorts,
    Finalized,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl RunState {
    fn name(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Discovering => "discovering",
            RunState::DiscoveryFailed => "discovery-failed",
            RunState::Discovered => "discovered",
            RunState::ScanningPorts => "scanning-ports",
            RunState::Finalized => "finalized",
        }
    }
}

/// Terminal state of one deep-scan task.
#[derive(Debug)]
pub enum TaskOutcome {
    Completed { port: String, findings: usize },
    Failed { port: String, failure: TaskFailure },
}

impl TaskOutcome {
    pub fn port(&self) -> &str {
        match self {
            TaskOutcome::Completed { port, .. } | TaskOutcome::Failed { port, .. } => port,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Completed { .. })
    }
}

/// Result of a run whose discovery succeeded, however many deep scans failed.
#[derive(Debug)]
pub struct RunReport {
    pub snapshot: HostSnapshot,
    /// One entry per deep-scan task, in discovery order.
    pub tasks: Vec<TaskOutcome>,
}

impl RunReport {
    pub fn completed(&self) -> usize {
        self.tasks.iter().filter(|task| task.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.tasks.len() - self.completed()
    }
}

/// Called with `(finished, total)` each time a deep-scan task reaches a terminal state.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

pub struct ScanOrchestrator {
    runner: Arc<dyn ExternalProbeRunner>,
    parser: Arc<dyn ReportParser>,
    aggregate: Arc<HostAggregate>,
    max_workers: usize,
    state: RunState,
    on_port_done: Option<ProgressCallback>,
}

impl ScanOrchestrator {
    pub fn new(
        address: IpAddr,
        runner: Arc<dyn ExternalProbeRunner>,
        parser: Arc<dyn ReportParser>,
    ) -> Self {
        Self {
            runner,
            parser,
            aggregate: Arc::new(HostAggregate::new(address)),
            max_workers: DEFAULT_MAX_WORKERS,
            state: RunState::Idle,
            on_port_done: None,
        }
    }

    /// Caps concurrently running deep scans. Zero is treated as one.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_progress(mut self, callback: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.on_port_done = Some(Arc::new(callback));
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn address(&self) -> IpAddr {
        self.aggregate.address()
    }

    pub fn aggregate(&self) -> &HostAggregate {
        &self.aggregate
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Discovery, deep scan of every open port, finalize.
    pub async fn run(&mut self) -> Result<RunReport, ScanError> {
        self.discover().await?;
        let tasks: Vec<TaskOutcome> = self.scan_ports().await?;
        let snapshot: HostSnapshot = self.finalize()?;
        Ok(RunReport { snapshot, tasks })
    }

    pub async fn discover(&mut self) -> Result<(), ScanError> {
        self.expect_state(&[RunState::Idle], "start discovery")?;
        self.state = RunState::Discovering;
        notice!(Module::PortScan, DiscoveryOutcome::Started);

        let request = ProbeRequest::discovery(self.address());
        let raw = match self.runner.run(&request).await {
            Ok(raw) => raw,
            Err(error) => {
                fail!(Module::PortScan, DiscoveryOutcome::CommandFailed, "{error}");
                return Err(self.discovery_failed(error.into()));
            }
        };
        outcome::log(
            Severity::Pass,
            Module::PortScan,
            DiscoveryOutcome::CommandCompleted,
            false,
            None,
        );

        let report = match self.parser.parse(&raw) {
            Ok(report) => report,
            Err(error) => {
                fail!(Module::PortScan, DiscoveryOutcome::ParseFailed, "{error}");
                return Err(self.discovery_failed(error.into()));
            }
        };
        pass!(Module::PortScan, DiscoveryOutcome::ParseCompleted);

        for port in report.ports {
            let record = PortRecord::new(port.id, port.state).with_service(port.service.as_deref());
            let id = record.id.clone();
            match self.aggregate.add_port(record) {
                Placement::Duplicate => debug!(port = %id, "port reported twice by discovery"),
                placement => debug!(port = %id, ?placement, "port recorded"),
            }
        }

        self.state = RunState::Discovered;
        outcome::log(
            Severity::Pass,
            Module::PortScan,
            DiscoveryOutcome::Completed,
            false,
            None,
        );
        self.log_ports_summary();
        Ok(())
    }

    fn discovery_failed(&mut self, error: ScanError) -> ScanError {
        self.state = RunState::DiscoveryFailed;
        fail!(Module::PortScan, DiscoveryOutcome::Failed);
        error
    }

    fn log_ports_summary(&self) {
        let snapshot: HostSnapshot = self.aggregate.snapshot();

        match snapshot.filtered_ports.as_slice() {
            [] => notice!(Module::PortsSummary, SummaryOutcome::FilteredNone),
            ports => pass!(
                Module::PortsSummary,
                SummaryOutcome::FilteredFound,
                "{}",
                port_listing(ports, "filtered")
            ),
        }

        match snapshot.open_ports.as_slice() {
            [] => notice!(Module::PortsSummary, SummaryOutcome::OpenNone),
            ports => pass!(
                Module::PortsSummary,
                SummaryOutcome::OpenFound,
                "{}",
                port_listing(ports, "open")
            ),
        }
    }

    /// Runs one script scan per open port, at most `max_workers` at a time, and waits
    /// for all of them.
    pub async fn scan_ports(&mut self) -> Result<Vec<TaskOutcome>, ScanError> {
        self.expect_state(&[RunState::Discovered], "start deep scans")?;
        self.state = RunState::ScanningPorts;

        let port_ids: Vec<String> = self.aggregate.open_port_ids();
        let total: usize = port_ids.len();
        if total == 0 {
            notice!(
                Module::ScriptScan,
                ScriptScanOutcome::Completed,
                "No open port to scan."
            );
            return Ok(Vec::new());
        }

        let workers: usize = self.max_workers.min(total);
        notice!(
            Module::ScriptScan,
            ScriptScanOutcome::Started,
            "{total} port(s), {workers} at a time."
        );

        let ctx = Arc::new(TaskContext {
            runner: Arc::clone(&self.runner),
            parser: Arc::clone(&self.parser),
            aggregate: Arc::clone(&self.aggregate),
            target: self.address(),
            finished: AtomicUsize::new(0),
            total,
            on_port_done: self.on_port_done.clone(),
        });
        let slots = Arc::new(Semaphore::new(workers));
        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();

        for port_id in &port_ids {
            let ctx = Arc::clone(&ctx);
            let slots = Arc::clone(&slots);
            let port_id = port_id.clone();
            let span = info_span!("deep_scan", port = %port_id);

            tasks.spawn(
                async move {
                    // The slot is held until the task's outcome is committed.
                    let _slot = slots.acquire_owned().await;
                    let outcome = deep_scan(&ctx, &port_id).await;
                    ctx.report_progress();
                    outcome
                }
                .instrument(span),
            );
        }

        let mut outcomes: Vec<TaskOutcome> = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(join_error) => error!(error = %join_error, "deep scan task ended abnormally"),
            }
        }

        let reported: HashSet<String> = outcomes.iter().map(|o| o.port().to_string()).collect();
        for port_id in port_ids.iter().filter(|id| !reported.contains(id.as_str())) {
            let failure = TaskFailure::Panicked {
                port: port_id.clone(),
            };
            fail!(Module::ScriptScan, ScriptScanOutcome::CommandFailed, "Port: {port_id} ({failure})");
            outcomes.push(ctx.fail(port_id, failure));
            ctx.report_progress();
        }

        let order: HashMap<&str, usize> = port_ids
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.as_str(), idx))
            .collect();
        outcomes.sort_by_key(|o| order.get(o.port()).copied().unwrap_or(usize::MAX));

        let succeeded: usize = outcomes.iter().filter(|o| o.is_success()).count();
        notice!(
            Module::ScriptScan,
            ScriptScanOutcome::Completed,
            "{succeeded} succeeded, {} failed.",
            outcomes.len() - succeeded
        );
        Ok(outcomes)
    }

    /// Seals the aggregate. Nothing can change the host afterwards.
    pub fn finalize(&mut self) -> Result<HostSnapshot, ScanError> {
        self.expect_state(
            &[RunState::Discovered, RunState::ScanningPorts],
            "finalize",
        )?;
        self.state = RunState::Finalized;
        Ok(self.aggregate.seal())
    }

    fn expect_state(&self, allowed: &[RunState], action: &'static str) -> Result<(), ScanError> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        Err(ScanError::OutOfOrder {
            action,
            state: self.state.name(),
        })
    }
}

/// Shared, read-only view every deep-scan task works from.
struct TaskContext {
    runner: Arc<dyn ExternalProbeRunner>,
    parser: Arc<dyn ReportParser>,
    aggregate: Arc<HostAggregate>,
    target: IpAddr,
    finished: AtomicUsize,
    total: usize,
    on_port_done: Option<ProgressCallback>,
}

impl TaskContext {
    fn report_progress(&self) {
        let finished: usize = self.finished.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(callback) = &self.on_port_done {
            callback(finished, self.total);
        }
    }

    /// Marks the script scan as failed on `port_id` and nothing else.
    fn fail(&self, port_id: &str, failure: TaskFailure) -> TaskOutcome {
        if let Err(error) = self
            .aggregate
            .with_port(port_id, |record| record.mark_failed(ProbeKind::ScriptScan))
        {
            error!(port = %port_id, %error, "could not record deep scan failure");
        }
        TaskOutcome::Failed {
            port: port_id.to_string(),
            failure,
        }
    }
}

async fn deep_scan(ctx: &TaskContext, port_id: &str) -> TaskOutcome {
    let detail: String = format!("Port: {port_id}");
    let silent = |severity: Severity, outcome: ScriptScanOutcome, extra: Option<&str>| {
        let line = match extra {
            Some(extra) => format!("{detail}, {extra}"),
            None => detail.clone(),
        };
        outcome::log(severity, Module::ScriptScan, outcome, false, Some(&line));
    };

    silent(Severity::Info, ScriptScanOutcome::PortStarted, None);

    let request = ProbeRequest::script_scan(ctx.target, port_id);
    let raw = match ctx.runner.run(&request).await {
        Ok(raw) => raw,
        Err(error) => {
            fail!(Module::ScriptScan, ScriptScanOutcome::CommandFailed, "{detail} ({error})");
            return ctx.fail(port_id, error.into());
        }
    };
    silent(Severity::Pass, ScriptScanOutcome::CommandCompleted, None);

    let report = match ctx.parser.parse(&raw) {
        Ok(report) => report,
        Err(error) => {
            fail!(Module::ScriptScan, ScriptScanOutcome::ParseFailed, "{detail} ({error})");
            return ctx.fail(port_id, error.into());
        }
    };
    let Some(parsed) = report.port(port_id) else {
        let error = ParseError::MissingElement("port");
        fail!(Module::ScriptScan, ScriptScanOutcome::ParseFailed, "{detail} ({error})");
        return ctx.fail(port_id, error.into());
    };
    silent(Severity::Pass, ScriptScanOutcome::ParseCompleted, None);

    let verdicts: Vec<(&str, Verdict)> = parsed
        .scripts
        .iter()
        .map(|script| (script.id.as_str(), script.verdict()))
        .collect();
    for (script_id, verdict) in &verdicts {
        let script = format!("script: {script_id}");
        match verdict {
            Verdict::Vulnerable => {
                silent(Severity::Pass, ScriptScanOutcome::VulnerabilityFound, Some(script.as_str()))
            }
            Verdict::NotVulnerable => {
                silent(Severity::Fail, ScriptScanOutcome::NoVulnerability, Some(script.as_str()))
            }
        }
    }

    let committed = ctx.aggregate.with_port(port_id, |record| {
        if parsed.service.is_some() {
            record.set_service(parsed.service.as_deref());
        }
        record.set_product(parsed.product.as_deref());
        record.set_version(parsed.version.as_deref());
        record.set_os_name(report.os_name.as_deref());

        for (script_id, verdict) in &verdicts {
            match verdict {
                Verdict::Vulnerable => record.add_finding(*script_id),
                Verdict::NotVulnerable => record.add_note(format!("checked: {script_id}")),
            }
        }
        record.mark_completed(ProbeKind::ScriptScan);
    });
    if let Err(error) = committed {
        error!(port = %port_id, %error, "deep scan result could not be committed");
        return TaskOutcome::Failed {
            port: port_id.to_string(),
            failure: TaskFailure::Rejected {
                port: port_id.to_string(),
                reason: error.to_string(),
            },
        };
    }

    let findings: Vec<&str> = parsed.findings().collect();
    pass!(Module::ScriptScan, ScriptScanOutcome::PortCompleted, "{detail}");
    match findings.as_slice() {
        [] => notice!(Module::ScriptScan, ScriptScanOutcome::NoVulnerability, "{detail}"),
        found => notice!(
            Module::ScriptScan,
            ScriptScanOutcome::VulnerabilityFound,
            "{detail} ({})",
            found.join(", ")
        ),
    }

    TaskOutcome::Completed {
        port: port_id.to_string(),
        findings: findings.len(),
    }
}

fn port_listing(ports: &[PortRecord], label: &str) -> String {
    let mut listing = format!("\n\t{} port(s) {label} on the target.", ports.len());
    for port in ports {
        listing.push_str(&format!("\n\t[+] {:>5} : {}", port.id, port.service));
    }
    listing
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

//! # Outcome Vocabulary
//!
//! Every observable step of a run is reported through [`log`] as a
//! `(severity, module, outcome)` triple with an optional free-text detail.
//!
//! Each operation owns a small outcome enum ([`DiscoveryOutcome`],
//! [`ScriptScanOutcome`], ...) whose `Display` is the human-readable message, so
//! no numeric code is shared between unrelated phases.
//!
//! The sink is `tracing`: [`log`] emits one event and never reports anything back.
//! Which subscriber formats it (console, file, both) is decided by the binary.

use std::fmt;

/// Events the user should see on the console even without `--verbose`.
pub const CONSOLE_TARGET: &str = "nwiz::console";
/// Events only kept in the log file unless `--verbose` is given.
pub const RECORD_TARGET: &str = "nwiz::record";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Pass,
    Fail,
    Info,
}

impl Severity {
    pub fn tag(&self) -> &'static str {
        match self {
            Severity::Pass => "PASS",
            Severity::Fail => "FAIL",
            Severity::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The part of the tool an event originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    Initialization,
    PortScan,
    PortsSummary,
    ScriptScan,
    Report,
    Exit,
}

impl Module {
    pub fn name(&self) -> &'static str {
        match self {
            Module::Initialization => "Initialization",
            Module::PortScan => "Port Scan",
            Module::PortsSummary => "Ports Summary",
            Module::ScriptScan => "Script Scan",
            Module::Report => "Report",
            Module::Exit => "Exit",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    ArgsValid,
    ArgsInvalid,
    DirectoriesReady,
}

impl fmt::Display for InitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InitOutcome::ArgsValid => "Arg(s) successfully validated.",
            InitOutcome::ArgsInvalid => "Given arg(s) invalid. Check and try again.",
            InitOutcome::DirectoriesReady => "Output directories are ready.",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    Started,
    CommandCompleted,
    CommandFailed,
    ParseCompleted,
    ParseFailed,
    Completed,
    Failed,
}

impl fmt::Display for DiscoveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiscoveryOutcome::Started => "Initiating ports scanning on the target.",
            DiscoveryOutcome::CommandCompleted => "Execution of the NMAP command has completed.",
            DiscoveryOutcome::CommandFailed => "Execution of the NMAP command has failed.",
            DiscoveryOutcome::ParseCompleted => "Parsing XML file has completed.",
            DiscoveryOutcome::ParseFailed => "Parsing XML file has failed.",
            DiscoveryOutcome::Completed => {
                "Probing the target for open and filtered ports has completed."
            }
            DiscoveryOutcome::Failed => "Probing the target for open and filtered ports has failed.",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryOutcome {
    OpenFound,
    OpenNone,
    FilteredFound,
    FilteredNone,
}

impl fmt::Display for SummaryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SummaryOutcome::OpenFound => "Open port(s) found on the target.",
            SummaryOutcome::OpenNone => "No open port found on the target.",
            SummaryOutcome::FilteredFound => "Filtered port(s) found on the target.",
            SummaryOutcome::FilteredNone => "No filtered port found on the target.",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptScanOutcome {
    Started,
    PortStarted,
    CommandCompleted,
    CommandFailed,
    ParseCompleted,
    ParseFailed,
    PortCompleted,
    VulnerabilityFound,
    NoVulnerability,
    Completed,
}

impl fmt::Display for ScriptScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScriptScanOutcome::Started => "NMAP script scan against the target has been initiated.",
            ScriptScanOutcome::PortStarted => {
                "Executing NMAP script scan against the target port has been initiated."
            }
            ScriptScanOutcome::CommandCompleted => "Execution of the NMAP command has completed.",
            ScriptScanOutcome::CommandFailed => "Execution of the NMAP command has failed.",
            ScriptScanOutcome::ParseCompleted => "Parsing XML file has completed.",
            ScriptScanOutcome::ParseFailed => "Parsing XML file has failed.",
            ScriptScanOutcome::PortCompleted => "Executing NMAP script scan has completed.",
            ScriptScanOutcome::VulnerabilityFound => {
                "Possible known vulnerability found on the port."
            }
            ScriptScanOutcome::NoVulnerability => {
                "No vulnerability found, as per the NMAP script scan."
            }
            ScriptScanOutcome::Completed => "NMAP script scan against the target has completed.",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    ReportWritten,
    ReportFailed,
    Interrupted,
    Finished,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunOutcome::ReportWritten => "Results are stored in the report file.",
            RunOutcome::ReportFailed => "Writing the report file has failed.",
            RunOutcome::Interrupted => "Keyboard interrupt received from user. Quitting the tool.",
            RunOutcome::Finished => "Exiting the tool.",
        })
    }
}

/// Appends one entry to the run log.
///
/// `user_visible` entries are routed to [`CONSOLE_TARGET`], the rest to
/// [`RECORD_TARGET`]. Fail entries are emitted at `WARN`, everything else at `INFO`.
pub fn log(
    severity: Severity,
    module: Module,
    outcome: impl fmt::Display,
    user_visible: bool,
    detail: Option<&str>,
) {
    let detail: &str = detail.unwrap_or_default();
    let severity_tag: &str = severity.tag();
    let module_name: &str = module.name();

    match (user_visible, severity) {
        (true, Severity::Fail) => tracing::warn!(
            target: CONSOLE_TARGET,
            severity = severity_tag,
            module = module_name,
            detail,
            "{outcome}"
        ),
        (true, _) => tracing::info!(
            target: CONSOLE_TARGET,
            severity = severity_tag,
            module = module_name,
            detail,
            "{outcome}"
        ),
        (false, Severity::Fail) => tracing::warn!(
            target: RECORD_TARGET,
            severity = severity_tag,
            module = module_name,
            detail,
            "{outcome}"
        ),
        (false, _) => tracing::info!(
            target: RECORD_TARGET,
            severity = severity_tag,
            module = module_name,
            detail,
            "{outcome}"
        ),
    }
}

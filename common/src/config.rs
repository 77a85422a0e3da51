use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on concurrently running deep scans unless told otherwise.
pub const DEFAULT_MAX_WORKERS: usize = 20;
pub const DEFAULT_OUTPUT_DIR: &str = "RW";
pub const DEFAULT_NMAP: &str = "nmap";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Xml,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Xml => "xml",
            ReportFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of deep scans allowed to run at the same time.
    pub max_workers: usize,
    /// Root of everything a run writes: logs, raw probe output, the report.
    pub output_dir: PathBuf,
    /// Program used for every external probe.
    pub nmap_path: PathBuf,
    /// Kills a single external probe after this long. `None` waits forever.
    pub probe_timeout: Option<Duration>,
    pub report_format: ReportFormat,
    /// Print every log entry to the console, not only the user-facing ones.
    pub verbose: bool,
    /// Skip banner and section headers.
    pub quiet: bool,
    pub no_banner: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            nmap_path: PathBuf::from(DEFAULT_NMAP),
            probe_timeout: None,
            report_format: ReportFormat::default(),
            verbose: false,
            quiet: false,
            no_banner: false,
        }
    }
}

impl Config {
    pub fn logs_dir(&self) -> PathBuf {
        self.output_dir.join("Logs")
    }

    pub fn ports_dir(&self) -> PathBuf {
        self.output_dir.join("Ports")
    }

    pub fn master_log(&self) -> PathBuf {
        self.logs_dir().join("master.log")
    }

    pub fn discovery_output(&self) -> PathBuf {
        self.output_dir.join("OpenPorts.xml")
    }

    pub fn report_path(&self, address: &std::net::IpAddr) -> PathBuf {
        self.output_dir
            .join(format!("{address}.{}", self.report_format.extension()))
    }
}

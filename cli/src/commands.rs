pub mod info;
pub mod scan;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use nwiz_common::config::{
    Config, DEFAULT_MAX_WORKERS, DEFAULT_NMAP, DEFAULT_OUTPUT_DIR, ReportFormat,
};
use nwiz_common::network::target::Target;

#[derive(Parser)]
#[command(name = "nwiz", version)]
#[command(about = "Port discovery and per-port vulnerability scanning on top of nmap.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the tool version and its defaults
    #[command(alias = "i")]
    Info,
    /// Sweep every TCP port of a host, then script-scan each open one
    #[command(alias = "s")]
    Scan(ScanArgs),
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// IPv4/IPv6 address or hostname of the host to scan
    pub target: Target,

    /// Maximum number of script scans running at once
    #[arg(short, long, default_value_t = DEFAULT_MAX_WORKERS, value_parser = parse_workers)]
    pub workers: usize,

    /// Directory receiving logs, raw nmap output and the report
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Xml)]
    pub format: FormatArg,

    /// Kill a single nmap run after this many seconds
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// nmap executable to use
    #[arg(long, default_value = DEFAULT_NMAP)]
    pub nmap: PathBuf,

    /// Print every log entry, not only the user-facing ones
    #[arg(short, long)]
    pub verbose: bool,

    /// Skip the banner and section headers
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    #[arg(long)]
    pub no_banner: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Xml,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Xml => ReportFormat::Xml,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

impl ScanArgs {
    pub fn to_config(&self) -> Config {
        Config {
            max_workers: self.workers,
            output_dir: self.output.clone(),
            nmap_path: self.nmap.clone(),
            probe_timeout: self.timeout.map(Duration::from_secs),
            report_format: self.format.into(),
            verbose: self.verbose,
            quiet: self.quiet,
            no_banner: self.no_banner,
        }
    }
}

fn parse_workers(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("at least one worker is required".to_string()),
        Ok(workers) => Ok(workers),
        Err(_) => Err(format!("`{value}` is not a positive number")),
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

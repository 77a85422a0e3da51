use std::net::IpAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::Instrument;

use nwiz_common::config::Config;
use nwiz_common::outcome::{InitOutcome, Module, RunOutcome};
use nwiz_common::{fail, notice, pass};
use nwiz_core::orchestrator::{RunReport, ScanOrchestrator};
use nwiz_core::parser::nmap::NmapXmlParser;
use nwiz_core::probe::nmap::NmapRunner;
use nwiz_core::{report, workspace};

use crate::commands::ScanArgs;
use crate::terminal::{logging, print, spinner};

/// Exit status after a keyboard interrupt.
const INTERRUPTED: i32 = 130;

pub async fn scan(args: ScanArgs) -> anyhow::Result<()> {
    let cfg: Config = args.to_config();

    workspace::prepare_directories(&cfg)?;
    logging::init_logging(&cfg)?;

    print::banner(cfg.no_banner, cfg.quiet);
    print::log_header(&args.target.to_string());
    notice!(
        Module::Initialization,
        InitOutcome::DirectoriesReady,
        "{}",
        cfg.output_dir.display()
    );

    tokio::select! {
        result = run(&args, &cfg) => {
            print::log_footer();
            print::end_of_program(cfg.quiet);
            result
        }
        _ = tokio::signal::ctrl_c() => {
            fail!(Module::Exit, RunOutcome::Interrupted);
            print::log_footer();
            std::process::exit(INTERRUPTED);
        }
    }
}

async fn run(args: &ScanArgs, cfg: &Config) -> anyhow::Result<()> {
    let address: IpAddr = match args.target.resolve().await {
        Ok(address) => address,
        Err(error) => {
            fail!(Module::Initialization, InitOutcome::ArgsInvalid, "{error:#}");
            return Err(error);
        }
    };
    pass!(
        Module::Initialization,
        InitOutcome::ArgsValid,
        "Target: {} ({address})",
        args.target
    );

    let outcome: RunReport = scan_host(address, cfg).await?;

    print::header("results", cfg.quiet);
    print::scan_summary(&outcome.snapshot, &outcome.tasks);

    let path = cfg.report_path(&address);
    match report::write_report(&outcome.snapshot, &path, cfg.report_format).await {
        Ok(path) => notice!(
            Module::Report,
            RunOutcome::ReportWritten,
            "{}",
            path.display()
        ),
        Err(error) => {
            fail!(Module::Report, RunOutcome::ReportFailed, "{error:#}");
            return Err(error);
        }
    }

    notice!(Module::Exit, RunOutcome::Finished);
    Ok(())
}

/// Runs both phases. The orchestrator, and with it the progress bar, is gone on return.
async fn scan_host(address: IpAddr, cfg: &Config) -> anyhow::Result<RunReport> {
    print::header("port discovery", cfg.quiet);
    let mut orchestrator = ScanOrchestrator::new(
        address,
        Arc::new(NmapRunner::from_config(cfg)),
        Arc::new(NmapXmlParser),
    )
    .with_max_workers(cfg.max_workers);

    orchestrator
        .discover()
        .await
        .context("Discovery failed, no port was scanned")?;

    print::header("script scan", cfg.quiet);
    let progress = spinner::deep_scan_progress(orchestrator.aggregate().open_count());
    let bar = progress.clone();
    orchestrator = orchestrator.with_progress(move |done, total| {
        spinner::report_progress(&bar, done, total);
    });

    let tasks = orchestrator.scan_ports().instrument(progress).await?;
    let snapshot = orchestrator.finalize()?;

    Ok(RunReport { snapshot, tasks })
}

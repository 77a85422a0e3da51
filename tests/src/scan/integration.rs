use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nwiz_common::error::{ScanError, TaskFailure};
use nwiz_common::network::port::{NOT_AVAILABLE, PortState, ProbeKind};
use nwiz_core::orchestrator::{RunState, TaskOutcome};

use crate::support::{FakeRunner, Scripted, discovery_xml, orchestrator, script_scan_ok, script_xml};

fn host_with_ssh_smtp_http() -> String {
    discovery_xml(&[
        ("22", "open", Some("ssh")),
        ("25", "filtered", Some("smtp")),
        ("80", "open", Some("http")),
    ])
}

#[tokio::test]
async fn discovery_partitions_ports_and_only_open_ones_are_scanned() {
    let runner = Arc::new(
        FakeRunner::new(Scripted::Report(host_with_ssh_smtp_http()))
            .port("22", script_scan_ok("22", "ssh"))
            .port("80", script_scan_ok("80", "http")),
    );
    let mut scan = orchestrator(&runner, 20);
    let report = scan.run().await.unwrap();

    let snapshot = &report.snapshot;
    assert_eq!(snapshot.open_count, 2);
    assert_eq!(snapshot.filtered_count, 1);
    assert_eq!(snapshot.open_count, snapshot.open_ports.len());
    assert_eq!(snapshot.filtered_count, snapshot.filtered_ports.len());
    assert_eq!(snapshot.filtered_ports[0].id, "25");
    assert_eq!(snapshot.filtered_ports[0].service, "smtp");

    assert_eq!(runner.discovery_calls(), 1);
    assert_eq!(runner.scanned_ports(), vec!["22", "80"]);
    assert_eq!(report.tasks.len(), 2);
    assert_eq!(scan.state(), RunState::Finalized);
}

#[tokio::test]
async fn closed_ports_never_enter_the_host() {
    let runner = Arc::new(FakeRunner::new(Scripted::Report(discovery_xml(&[
        ("22", "open", Some("ssh")),
        ("113", "closed", Some("ident")),
        ("139", "open|filtered", None),
        ("443", "closed", None),
    ]))));
    let mut scan = orchestrator(&runner, 20);
    scan.discover().await.unwrap();

    let snapshot = scan.aggregate().snapshot();
    assert!(snapshot.port("113").is_none());
    assert!(snapshot.port("443").is_none());
    assert_eq!(snapshot.port("139").unwrap().state, PortState::Filtered);
    assert_eq!(snapshot.port("139").unwrap().service, NOT_AVAILABLE);
    assert_eq!(snapshot.open_count + snapshot.filtered_count, 2);
}

#[tokio::test]
async fn vulnerable_script_becomes_a_finding() {
    let runner = Arc::new(
        FakeRunner::new(Scripted::Report(host_with_ssh_smtp_http()))
            .port("22", script_scan_ok("22", "ssh"))
            .port(
                "80",
                Scripted::Report(script_xml(
                    "80",
                    "http",
                    &[("http-csrf", "Found the following possible CSRF vulnerable forms")],
                )),
            ),
    );
    let report = orchestrator(&runner, 20).run().await.unwrap();

    let http = report.snapshot.port("80").unwrap();
    assert_eq!(http.findings, vec!["http-csrf"]);
    assert!(http.completed_probes.contains(&ProbeKind::ScriptScan));
    assert!(http.failed_probes.is_empty());
    assert_eq!(http.product, "Test httpd");
    assert_eq!(http.version, "1.0");
    assert_eq!(http.os_name, "Linux 5.X");
}

#[tokio::test]
async fn failed_probe_is_confined_to_its_port() {
    let runner = Arc::new(
        FakeRunner::new(Scripted::Report(host_with_ssh_smtp_http()))
            .port("22", Scripted::ProcessError)
            .port(
                "80",
                Scripted::Report(script_xml("80", "http", &[("http-vuln-x", "VULNERABLE")])),
            ),
    );
    let mut scan = orchestrator(&runner, 20);
    let report = scan.run().await.unwrap();
    assert_eq!(scan.state(), RunState::Finalized);

    let ssh = report.snapshot.port("22").unwrap();
    assert_eq!(ssh.failed_probes, vec![ProbeKind::ScriptScan]);
    assert!(ssh.completed_probes.is_empty());
    assert!(ssh.findings.is_empty());
    assert_eq!(ssh.service, "ssh");

    let http = report.snapshot.port("80").unwrap();
    assert_eq!(http.findings, vec!["http-vuln-x"]);
    assert_eq!(http.completed_probes, vec![ProbeKind::ScriptScan]);
    assert!(http.failed_probes.is_empty());

    assert!(matches!(
        &report.tasks[0],
        TaskOutcome::Failed { port, failure: TaskFailure::Invocation(_) } if port == "22"
    ));
    assert!(report.tasks[1].is_success());
    assert_eq!(report.snapshot.failed_ports().count(), 1);
}

#[tokio::test]
async fn unreadable_port_report_fails_only_that_port() {
    let runner = Arc::new(
        FakeRunner::new(Scripted::Report(host_with_ssh_smtp_http()))
            .port("22", Scripted::Garbage)
            .port("80", script_scan_ok("80", "http")),
    );
    let report = orchestrator(&runner, 20).run().await.unwrap();

    assert!(matches!(
        &report.tasks[0],
        TaskOutcome::Failed { failure: TaskFailure::Parse(_), .. }
    ));
    assert_eq!(
        report.snapshot.port("22").unwrap().failed_probes,
        vec![ProbeKind::ScriptScan]
    );
    assert_eq!(report.completed(), 1);
}

#[tokio::test]
async fn discovery_failure_ends_the_run_with_an_empty_host() {
    let runner = Arc::new(FakeRunner::new(Scripted::ProcessError).port("22", script_scan_ok("22", "ssh")));
    let mut scan = orchestrator(&runner, 20);

    let error = scan.run().await.unwrap_err();
    assert!(matches!(error, ScanError::DiscoveryProbe(_)));
    assert_eq!(scan.state(), RunState::DiscoveryFailed);
    assert!(scan.aggregate().is_empty());
    assert_eq!(runner.discovery_calls(), 1);
    assert!(runner.scanned_ports().is_empty());

    assert!(scan.scan_ports().await.is_err());
    assert!(scan.finalize().is_err());
}

#[tokio::test]
async fn unparsable_discovery_is_a_discovery_failure() {
    let runner = Arc::new(FakeRunner::new(Scripted::Garbage));
    let mut scan = orchestrator(&runner, 20);

    assert!(matches!(
        scan.run().await,
        Err(ScanError::DiscoveryParse(_))
    ));
    assert_eq!(scan.state(), RunState::DiscoveryFailed);
    assert!(scan.aggregate().is_empty());
}

#[tokio::test]
async fn host_without_open_ports_still_finalizes() {
    let runner = Arc::new(FakeRunner::new(Scripted::Report(discovery_xml(&[
        ("25", "filtered", Some("smtp")),
        ("113", "closed", None),
    ]))));
    let report = orchestrator(&runner, 20).run().await.unwrap();

    assert!(report.tasks.is_empty());
    assert_eq!(report.snapshot.open_count, 0);
    assert_eq!(report.snapshot.filtered_count, 1);
    assert!(runner.scanned_ports().is_empty());
}

#[tokio::test]
async fn classification_counts_each_marked_script_once() {
    let runner = Arc::new(
        FakeRunner::new(Scripted::Report(discovery_xml(&[("443", "open", Some("https"))]))).port(
            "443",
            Scripted::Report(script_xml(
                "443",
                "https",
                &[
                    ("ssl-heartbleed", "VULNERABLE: The Heartbleed Bug is vulnerable here"),
                    ("ssl-poodle", "State: NOT VULNERABLE"),
                    ("http-title", "Welcome"),
                    ("ssl-dh-params", "vulnerable to Logjam"),
                ],
            )),
        ),
    );
    let report = orchestrator(&runner, 20).run().await.unwrap();

    let https = report.snapshot.port("443").unwrap();
    assert_eq!(https.findings, vec!["ssl-heartbleed", "ssl-dh-params"]);
    assert_eq!(
        https.notes,
        vec!["checked: ssl-poodle", "checked: http-title"]
    );
    assert!(matches!(
        report.tasks[0],
        TaskOutcome::Completed { findings: 2, .. }
    ));
}

#[tokio::test]
async fn report_for_another_port_is_not_merged() {
    let runner = Arc::new(
        FakeRunner::new(Scripted::Report(host_with_ssh_smtp_http()))
            .port(
                "22",
                Scripted::Report(script_xml("443", "https", &[("ssl-heartbleed", "VULNERABLE")])),
            )
            .port("80", script_scan_ok("80", "http")),
    );
    let report = orchestrator(&runner, 20).run().await.unwrap();

    let ssh = report.snapshot.port("22").unwrap();
    assert_eq!(ssh.failed_probes, vec![ProbeKind::ScriptScan]);
    assert!(ssh.findings.is_empty());
    assert!(ssh.notes.is_empty());
    assert_eq!(ssh.service, "ssh");
    assert_eq!(ssh.product, NOT_AVAILABLE);
    assert!(report.snapshot.port("443").is_none());

    assert!(matches!(
        &report.tasks[0],
        TaskOutcome::Failed { port, failure: TaskFailure::Parse(_) } if port == "22"
    ));
    assert!(report.tasks[1].is_success());
}

#[tokio::test]
async fn panicking_task_fails_its_port_and_the_run_finalizes() {
    let finished = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&finished);
    let runner = Arc::new(
        FakeRunner::new(Scripted::Report(host_with_ssh_smtp_http()))
            .port("22", Scripted::Panic)
            .port(
                "80",
                Scripted::Report(script_xml("80", "http", &[("http-vuln-x", "VULNERABLE")])),
            ),
    );
    let mut scan = orchestrator(&runner, 20).with_progress(move |done, _| {
        seen.fetch_max(done, Ordering::SeqCst);
    });
    let report = scan.run().await.unwrap();
    assert_eq!(scan.state(), RunState::Finalized);
    assert_eq!(finished.load(Ordering::SeqCst), 2);

    let ssh = report.snapshot.port("22").unwrap();
    assert_eq!(ssh.failed_probes, vec![ProbeKind::ScriptScan]);
    assert!(ssh.completed_probes.is_empty());
    assert!(ssh.findings.is_empty());
    assert!(matches!(
        &report.tasks[0],
        TaskOutcome::Failed { port, failure: TaskFailure::Panicked { .. } } if port == "22"
    ));

    let http = report.snapshot.port("80").unwrap();
    assert_eq!(http.findings, vec!["http-vuln-x"]);
    assert_eq!(http.completed_probes, vec![ProbeKind::ScriptScan]);
    assert!(http.failed_probes.is_empty());
    assert_eq!(report.failed(), 1);
}

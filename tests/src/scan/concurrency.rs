use std::sync::Arc;
use std::time::Duration;

use nwiz_common::network::port::ProbeKind;

use crate::support::{FakeRunner, Scripted, discovery_xml, orchestrator, script_scan_ok};

fn many_open_ports(count: usize) -> (Vec<String>, FakeRunner) {
    let ids: Vec<String> = (0..count).map(|n| (8000 + n).to_string()).collect();
    let listing: Vec<(&str, &str, Option<&str>)> = ids
        .iter()
        .map(|id| (id.as_str(), "open", Some("http-alt")))
        .collect();

    let mut runner = FakeRunner::new(Scripted::Report(discovery_xml(&listing)))
        .delay(Duration::from_millis(25));
    for (n, id) in ids.iter().enumerate() {
        let scripted = match n % 5 {
            0 => Scripted::ProcessError,
            _ => script_scan_ok(id, "http-alt"),
        };
        runner = runner.port(id, scripted);
    }
    (ids, runner)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn worker_cap_bounds_simultaneous_probes() {
    let (ids, runner) = many_open_ports(12);
    let runner = Arc::new(runner);
    let report = orchestrator(&runner, 3).run().await.unwrap();

    assert!(runner.peak() <= 3, "peak was {}", runner.peak());
    assert_eq!(report.tasks.len(), ids.len());
    assert_eq!(runner.scanned_ports().len(), ids.len());

    for port in &report.snapshot.open_ports {
        let terminal = port.completed_probes.contains(&ProbeKind::ScriptScan)
            ^ port.failed_probes.contains(&ProbeKind::ScriptScan);
        assert!(terminal, "port {} has no terminal state", port.id);
    }
    assert_eq!(report.failed(), 3);
    assert_eq!(report.completed(), 9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn a_single_worker_serializes_every_probe() {
    let (_, runner) = many_open_ports(5);
    let runner = Arc::new(runner);
    let report = orchestrator(&runner, 1).run().await.unwrap();

    assert_eq!(runner.peak(), 1);
    assert_eq!(report.tasks.len(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fewer_ports_than_workers_run_side_by_side() {
    let (_, runner) = many_open_ports(4);
    let runner = Arc::new(runner.delay(Duration::from_millis(200)));
    let report = orchestrator(&runner, 20).run().await.unwrap();

    assert!(runner.peak() <= 4);
    assert!(runner.peak() >= 2, "probes never overlapped");
    assert_eq!(report.tasks.len(), 4);
}

#[tokio::test]
async fn task_outcomes_follow_discovery_order() {
    let (ids, runner) = many_open_ports(8);
    let runner = Arc::new(runner);
    let report = orchestrator(&runner, 4).run().await.unwrap();

    let order: Vec<&str> = report.tasks.iter().map(|task| task.port()).collect();
    assert_eq!(order, ids.iter().map(String::as_str).collect::<Vec<_>>());
    let open: Vec<&str> = report.snapshot.open_ports.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(open, order);
}

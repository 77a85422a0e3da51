use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nwiz_common::error::ProbeError;
use nwiz_core::orchestrator::ScanOrchestrator;
use nwiz_core::parser::nmap::NmapXmlParser;
use nwiz_core::probe::{ExternalProbeRunner, ProbeRequest, RawOutput};

pub const TARGET: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5));

/// What the fake hands back for one probe.
#[derive(Clone)]
pub enum Scripted {
    Report(String),
    ProcessError,
    Garbage,
    Panic,
}

/// Answers discovery and per-port probes from a script and counts how many calls are
/// inside `run` at the same time.
pub struct FakeRunner {
    discovery: Scripted,
    ports: HashMap<String, Scripted>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: Mutex<Vec<Option<String>>>,
}

impl FakeRunner {
    pub fn new(discovery: Scripted) -> Self {
        Self {
            discovery,
            ports: HashMap::new(),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn port(mut self, id: &str, scripted: Scripted) -> Self {
        self.ports.insert(id.to_string(), scripted);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Highest number of simultaneous `run` calls seen so far.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn discovery_calls(&self) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.is_none()).count()
    }

    /// Port ids that got a deep-scan call, sorted.
    pub fn scanned_ports(&self) -> Vec<String> {
        let mut ports: Vec<String> = self.calls.lock().unwrap().iter().flatten().cloned().collect();
        ports.sort();
        ports
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ExternalProbeRunner for FakeRunner {
    async fn run(&self, request: &ProbeRequest) -> Result<RawOutput, ProbeError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push(request.port_id.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = match &request.port_id {
            None => &self.discovery,
            Some(id) => self.ports.get(id).unwrap_or(&Scripted::ProcessError),
        };

        match scripted {
            Scripted::Report(body) => Ok(RawOutput::new(request.kind, body.clone())),
            Scripted::ProcessError => Err(ProbeError::Aborted {
                kind: request.kind,
                status: "exit status: 1".to_string(),
                stderr: "Failed to resolve given hostname/IP".to_string(),
            }),
            Scripted::Garbage => Ok(RawOutput::new(
                request.kind,
                "Starting Nmap 7.94 ( https://nmap.org )",
            )),
            Scripted::Panic => panic!("runner blew up on {:?}", request.port_id),
        }
    }
}

pub fn orchestrator(runner: &Arc<FakeRunner>, workers: usize) -> ScanOrchestrator {
    ScanOrchestrator::new(TARGET, runner.clone(), Arc::new(NmapXmlParser)).with_max_workers(workers)
}

/// nmap `-oX` output of a full port sweep. Each entry is `(portid, state, service)`.
pub fn discovery_xml(ports: &[(&str, &str, Option<&str>)]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\"?>\n<nmaprun scanner=\"nmap\">\n<host><status state=\"up\"/>\n<ports>\n",
    );
    for (id, state, service) in ports {
        xml.push_str(&format!(
            "<port protocol=\"tcp\" portid=\"{id}\"><state state=\"{state}\" reason=\"syn-ack\"/>"
        ));
        if let Some(service) = service {
            xml.push_str(&format!("<service name=\"{service}\" method=\"table\"/>"));
        }
        xml.push_str("</port>\n");
    }
    xml.push_str("</ports>\n</host>\n</nmaprun>\n");
    xml
}

/// nmap `-oX` output of a script scan of one port. Each script is `(id, output)`.
pub fn script_xml(port: &str, service: &str, scripts: &[(&str, &str)]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\"?>\n<nmaprun scanner=\"nmap\">\n<host>\n<ports>\n\
         <port protocol=\"tcp\" portid=\"{port}\"><state state=\"open\"/>\
         <service name=\"{service}\" product=\"Test {service}d\" version=\"1.0\"/>\n"
    );
    for (id, output) in scripts {
        xml.push_str(&format!("<script id=\"{id}\" output=\"{output}\"/>\n"));
    }
    xml.push_str(
        "</port>\n</ports>\n<os><osmatch name=\"Linux 5.X\" accuracy=\"96\"/></os>\n</host>\n</nmaprun>\n",
    );
    xml
}

/// A clean script scan: service metadata and one script without the marker.
pub fn script_scan_ok(port: &str, service: &str) -> Scripted {
    Scripted::Report(script_xml(port, service, &[("banner", "nothing to report")]))
}

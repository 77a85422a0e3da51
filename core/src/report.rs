//! Final report serializers.
//!
//! The XML layout keeps the tool's historical `<Host>` document so existing consumers can
//! keep reading it; JSON is a straight serde dump of the [`HostSnapshot`].

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;

use nwiz_common::config::ReportFormat;
use nwiz_common::network::host::HostSnapshot;
use nwiz_common::network::port::PortRecord;

use crate::parser::escape;

const INDENT: &str = "    ";

pub fn to_xml(snapshot: &HostSnapshot) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n");
    let _ = writeln!(
        xml,
        "<Host Address=\"{}\" NumFiltered=\"{}\" NumOpen=\"{}\">",
        snapshot.address, snapshot.filtered_count, snapshot.open_count
    );

    write_category(&mut xml, "OpenPorts", &snapshot.open_ports);
    write_category(&mut xml, "FilteredPorts", &snapshot.filtered_ports);

    xml.push_str("</Host>\n");
    xml
}

fn write_category(xml: &mut String, name: &str, ports: &[PortRecord]) {
    if ports.is_empty() {
        let _ = writeln!(xml, "{INDENT}<{name} />");
        return;
    }

    let _ = writeln!(xml, "{INDENT}<{name}>");
    for port in ports {
        write_port(xml, port);
    }
    let _ = writeln!(xml, "{INDENT}</{name}>");
}

fn write_port(xml: &mut String, port: &PortRecord) {
    let pad: String = INDENT.repeat(2);
    let _ = writeln!(xml, "{pad}<Port portid=\"{}\">", escape(&port.id));

    let fields = [
        ("state", port.state.to_string()),
        ("service", port.service.clone()),
        ("product", port.product.clone()),
        ("version", port.version.clone()),
        ("osname", port.os_name.clone()),
    ];
    for (tag, value) in &fields {
        let _ = writeln!(xml, "{pad}{INDENT}<{tag}>{}</{tag}>", escape(value));
    }

    let completed: Vec<String> = port.completed_probes.iter().map(|p| p.to_string()).collect();
    let failed: Vec<String> = port.failed_probes.iter().map(|p| p.to_string()).collect();
    write_list(xml, "scanscompleted", "scan", &completed);
    write_list(xml, "scansfailed", "scan", &failed);
    write_list(xml, "vulnerabilities", "scan", &port.findings);
    write_list(xml, "additionalinfo", "info", &port.notes);

    let _ = writeln!(xml, "{pad}</Port>");
}

/// Lists are only emitted when they have entries.
fn write_list(xml: &mut String, list: &str, item: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    let pad: String = INDENT.repeat(3);
    let _ = writeln!(xml, "{pad}<{list}>");
    for value in values {
        let _ = writeln!(xml, "{pad}{INDENT}<{item}>{}</{item}>", escape(value));
    }
    let _ = writeln!(xml, "{pad}</{list}>");
}

pub fn to_json(snapshot: &HostSnapshot) -> anyhow::Result<String> {
    serde_json::to_string_pretty(snapshot).context("Failed to serialize the host to JSON")
}

/// Serializes `snapshot` in `format` and writes it to `path`.
pub async fn write_report(
    snapshot: &HostSnapshot,
    path: &Path,
    format: ReportFormat,
) -> anyhow::Result<PathBuf> {
    let body: String = match format {
        ReportFormat::Xml => to_xml(snapshot),
        ReportFormat::Json => to_json(snapshot)?,
    };

    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("Failed to write the report to {}", path.display()))?;

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::xml;
    use nwiz_common::network::port::{PortState, ProbeKind};
    use std::net::{IpAddr, Ipv4Addr};

    fn snapshot() -> HostSnapshot {
        let mut http = PortRecord::new("80", PortState::Open).with_service(Some("http"));
        http.set_product(Some("Apache httpd"));
        http.add_finding("http-csrf");
        http.add_note("checked: http-title <b>");
        http.mark_completed(ProbeKind::ScriptScan);

        let mut ssh = PortRecord::new("22", PortState::Open).with_service(Some("ssh"));
        ssh.mark_failed(ProbeKind::ScriptScan);

        let smtp = PortRecord::new("25", PortState::Filtered).with_service(Some("smtp"));

        HostSnapshot {
            address: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)),
            open_count: 2,
            filtered_count: 1,
            open_ports: vec![ssh, http],
            filtered_ports: vec![smtp],
        }
    }

    #[test]
    fn xml_nests_ports_under_their_category() {
        let document = xml::parse(&to_xml(&snapshot())).unwrap();
        assert_eq!(document.name, "Host");
        assert_eq!(document.attr("Address"), Some("10.0.0.5"));
        assert_eq!(document.attr("NumOpen"), Some("2"));
        assert_eq!(document.attr("NumFiltered"), Some("1"));

        let open: Vec<&str> = document
            .child("OpenPorts")
            .unwrap()
            .children_named("Port")
            .filter_map(|port| port.attr("portid"))
            .collect();
        assert_eq!(open, vec!["22", "80"]);

        let filtered = document.child("FilteredPorts").unwrap();
        let smtp = filtered.child("Port").unwrap();
        assert_eq!(smtp.child("state").unwrap().text, "filtered");
        assert!(smtp.child("scanscompleted").is_none());
    }

    #[test]
    fn xml_carries_probe_lists_and_findings() {
        let document = xml::parse(&to_xml(&snapshot())).unwrap();
        let ports: Vec<_> = document.child("OpenPorts").unwrap().children_named("Port").collect();

        let ssh = ports[0];
        assert_eq!(
            ssh.child("scansfailed").unwrap().child("scan").unwrap().text,
            "Script Scan"
        );
        assert!(ssh.child("vulnerabilities").is_none());

        let http = ports[1];
        assert_eq!(http.child("product").unwrap().text, "Apache httpd");
        assert_eq!(http.child("version").unwrap().text, "N/A");
        assert_eq!(
            http.child("vulnerabilities").unwrap().child("scan").unwrap().text,
            "http-csrf"
        );
        assert_eq!(
            http.child("additionalinfo").unwrap().child("info").unwrap().text,
            "checked: http-title <b>"
        );
    }

    #[test]
    fn json_round_trips_the_snapshot() {
        let snapshot = snapshot();
        let json = to_json(&snapshot).unwrap();
        assert!(json.contains("\"Script Scan\""));
        let back: HostSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[tokio::test]
    async fn report_lands_at_the_requested_path() {
        let dir = std::env::temp_dir().join(format!("nwiz-report-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("10.0.0.5.xml");

        let written = write_report(&snapshot(), &path, ReportFormat::Xml)
            .await
            .unwrap();
        let body = tokio::fs::read_to_string(&written).await.unwrap();
        assert!(body.starts_with("<?xml"));

        let missing = dir.join("no-such-dir").join("report.xml");
        assert!(write_report(&snapshot(), &missing, ReportFormat::Json).await.is_err());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}

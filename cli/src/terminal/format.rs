use crate::terminal::colors;
use colored::*;
use nwiz_common::network::port::{NOT_AVAILABLE, PortRecord};
use nwiz_core::orchestrator::TaskOutcome;

pub fn port_title(port: &PortRecord) -> String {
    match port.service.as_str() {
        NOT_AVAILABLE => port.id.clone(),
        service => format!("{}/{}", port.id, service),
    }
}

pub fn task_for<'a>(tasks: &'a [TaskOutcome], port_id: &str) -> Option<&'a TaskOutcome> {
    tasks.iter().find(|task| task.port() == port_id)
}

fn or_muted(value: &str) -> ColoredString {
    match value {
        NOT_AVAILABLE => value.color(colors::MUTED),
        value => value.color(colors::TEXT_DEFAULT),
    }
}

pub fn port_details(port: &PortRecord, task: Option<&TaskOutcome>) -> Vec<(String, ColoredString)> {
    let mut details: Vec<(String, ColoredString)> = vec![
        (String::from("service"), or_muted(&port.service)),
        (String::from("product"), or_muted(&port.product)),
        (String::from("version"), or_muted(&port.version)),
        (String::from("os"), or_muted(&port.os_name)),
    ];

    let findings: ColoredString = if port.is_vulnerable() {
        port.findings.join(", ").color(colors::FINDING).bold()
    } else if port.failed_probes.is_empty() {
        "No vulnerability found".color(colors::PRIMARY)
    } else {
        "Not checked".color(colors::MUTED)
    };
    details.push((String::from("vulns"), findings));

    if let Some(TaskOutcome::Failed { failure, .. }) = task {
        details.push((String::from("failed"), failure.to_string().color(colors::FAILURE)));
    } else if !port.failed_probes.is_empty() {
        let probes: Vec<&str> = port.failed_probes.iter().map(|p| p.label()).collect();
        details.push((String::from("failed"), probes.join(", ").color(colors::FAILURE)));
    }

    details
}

pub fn findings_total(total: usize) -> ColoredString {
    match total {
        0 => total.to_string().color(colors::PRIMARY),
        _ => total.to_string().color(colors::FINDING).bold(),
    }
}

pub fn port_list(ports: &[PortRecord]) -> String {
    ports
        .iter()
        .map(port_title)
        .collect::<Vec<String>>()
        .join(", ")
}

//! Reader for nmap's XML report format (`-oX`).
//!
//! Only the first `<host>` is looked at. A run always targets exactly one address.

use nwiz_common::error::ParseError;
use nwiz_common::network::port::PortState;

use super::xml::{self, Element};
use super::{ParsedPort, ParsedReport, ReportParser, ScriptResult};
use crate::probe::RawOutput;

#[derive(Debug, Default, Clone, Copy)]
pub struct NmapXmlParser;

impl ReportParser for NmapXmlParser {
    fn parse(&self, raw: &RawOutput) -> Result<ParsedReport, ParseError> {
        let root: Element = xml::parse(&raw.body)?;
        if root.name != "nmaprun" {
            return Err(ParseError::MissingElement("nmaprun"));
        }

        let Some(host) = root.child("host") else {
            return Ok(ParsedReport::default());
        };

        let ports: Vec<ParsedPort> = match host.child("ports") {
            Some(ports) => ports
                .children_named("port")
                .map(parse_port)
                .collect::<Result<_, _>>()?,
            None => Vec::new(),
        };

        let os_name: Option<String> = host
            .child("os")
            .and_then(|os| os.child("osmatch"))
            .and_then(|osmatch| non_empty(osmatch.attr("name")));

        Ok(ParsedReport { ports, os_name })
    }
}

fn parse_port(node: &Element) -> Result<ParsedPort, ParseError> {
    let id: &str = node
        .attr("portid")
        .filter(|id| !id.is_empty())
        .ok_or(ParseError::MissingElement("port@portid"))?;

    let state: PortState = node
        .child("state")
        .and_then(|state| state.attr("state"))
        .ok_or(ParseError::MissingElement("port/state"))?
        .parse()
        .unwrap_or(PortState::Filtered);

    let service: Option<&Element> = node.child("service");
    let scripts: Vec<ScriptResult> = node
        .children_named("script")
        .filter_map(|script| {
            let id = script.attr("id")?;
            let output = script.attr("output").unwrap_or(&script.text);
            Some(ScriptResult::new(id, output))
        })
        .collect();

    Ok(ParsedPort {
        id: id.to_string(),
        state,
        service: service.and_then(|s| non_empty(s.attr("name"))),
        product: service.and_then(|s| non_empty(s.attr("product"))),
        version: service.and_then(|s| non_empty(s.attr("version"))),
        scripts,
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

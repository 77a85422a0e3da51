//! The **report parsing** abstraction.
//!
//! Turns a probe's [`RawOutput`] into port states, service metadata, an OS guess and
//! the per-script results of a deep scan. [`nmap::NmapXmlParser`] reads nmap's `-oX`
//! format.

use nwiz_common::error::ParseError;
use nwiz_common::network::port::PortState;

use crate::probe::RawOutput;

pub mod nmap;
pub(crate) mod xml;

pub(crate) use xml::escape;

/// Token whose presence in a script's output marks the port as vulnerable.
pub const VULNERABLE_MARKER: &str = "vulnerable";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Vulnerable,
    /// The script ran and found nothing. Not the same as "not checked".
    NotVulnerable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptResult {
    pub id: String,
    pub output: String,
}

impl ScriptResult {
    pub fn new(id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            output: output.into(),
        }
    }

    /// Case-insensitive marker search. `not vulnerable` does not count.
    pub fn verdict(&self) -> Verdict {
        let output: String = self.output.to_ascii_lowercase();
        let flagged = output
            .match_indices(VULNERABLE_MARKER)
            .any(|(idx, _)| output[..idx].split_whitespace().next_back() != Some("not"));

        match flagged {
            true => Verdict::Vulnerable,
            false => Verdict::NotVulnerable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPort {
    pub id: String,
    pub state: PortState,
    pub service: Option<String>,
    pub product: Option<String>,
    pub version: Option<String>,
    pub scripts: Vec<ScriptResult>,
}

impl ParsedPort {
    pub fn new(id: impl Into<String>, state: PortState) -> Self {
        Self {
            id: id.into(),
            state,
            service: None,
            product: None,
            version: None,
            scripts: Vec::new(),
        }
    }

    pub fn with_service(mut self, service: &str) -> Self {
        self.service = Some(service.to_string());
        self
    }

    pub fn with_script(mut self, script: ScriptResult) -> Self {
        self.scripts.push(script);
        self
    }

    /// Ids of the scripts whose output carries the vulnerability marker, in report order.
    pub fn findings(&self) -> impl Iterator<Item = &str> {
        self.scripts
            .iter()
            .filter(|script| script.verdict() == Verdict::Vulnerable)
            .map(|script| script.id.as_str())
    }
}

/// Everything a single report says about the target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReport {
    pub ports: Vec<ParsedPort>,
    pub os_name: Option<String>,
}

impl ParsedReport {
    /// The entry for `id`, with or without a `/tcp` suffix on either side.
    pub fn port(&self, id: &str) -> Option<&ParsedPort> {
        self.ports
            .iter()
            .find(|port| port.id == id || port_number(&port.id) == port_number(id))
    }
}

fn port_number(id: &str) -> &str {
    id.split('/').next().unwrap_or(id)
}

pub trait ReportParser: Send + Sync {
    fn parse(&self, raw: &RawOutput) -> Result<ParsedReport, ParseError>;
}

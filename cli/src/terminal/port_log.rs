//! Per-port log files.
//!
//! Every deep scan runs inside a [`PORT_SPAN`] span carrying a `port` field. The
//! [`PortLogLayer`] opens `<logs>/<port>.log` when such a span starts, appends each event
//! raised inside it, and closes the section with the usual footer once the span ends.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

use crate::terminal::logging::NwizFormatter;
use crate::terminal::print;

/// Name of the span that scopes one port's deep scan.
pub const PORT_SPAN: &str = "deep_scan";

pub struct PortLogLayer {
    logs_dir: PathBuf,
}

impl PortLogLayer {
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
        }
    }

    fn open(&self, port: &str) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.logs_dir.join(format!("{port}.log")))
    }
}

/// Open log file of one port, stored in its span's extensions.
struct PortLog {
    file: File,
}

impl PortLog {
    fn append(&self, text: &str) {
        // A log line that cannot be written is dropped; the master log still has it.
        let _ = (&self.file).write_all(text.as_bytes());
    }
}

#[derive(Default)]
struct PortField(Option<String>);

impl Visit for PortField {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "port" {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "port" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S> Layer<S> for PortLogLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        if attrs.metadata().name() != PORT_SPAN {
            return;
        }
        let mut port = PortField::default();
        attrs.record(&mut port);

        let (Some(port), Some(span)) = (port.0, ctx.span(id)) else {
            return;
        };
        let Ok(file) = self.open(&port) else {
            return;
        };

        let log = PortLog { file };
        log.append(&format!("{}\n", print::framed(&format!("Port {port}"))));
        span.extensions_mut().insert(log);
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(scope) = ctx.event_scope(event) else {
            return;
        };
        for span in scope {
            if let Some(log) = span.extensions().get::<PortLog>() {
                let mut line = String::new();
                if NwizFormatter::render(&mut line, event, false).is_ok() {
                    log.append(&line);
                }
                return;
            }
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else {
            return;
        };
        if let Some(log) = span.extensions_mut().remove::<PortLog>() {
            log.append(&format!("{}\n", print::framed(print::FOOTER)));
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

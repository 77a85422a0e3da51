use std::fmt;
use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Context;
use chrono::Local;
use colored::*;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::{EnvFilter, filter_fn};
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use nwiz_common::config::Config;
use nwiz_common::outcome::CONSOLE_TARGET;

use crate::terminal::port_log::PortLogLayer;
use crate::terminal::print::PRINT_TARGET;
use crate::terminal::spinner::PROGRESS_TARGET;

/// Overrides the level filter of the log file, `RUST_LOG` style.
pub const LOG_ENV: &str = "NWIZ_LOG";
const TIMESTAMP: &str = "[%d-%m-%y %H:%M:%S]";

/// `[PASS][18-10-26 14:02:11][Port Scan] message detail`
///
/// Colours are only written when the layer allows ANSI, so the same formatter serves the
/// console and the log file.
pub struct NwizFormatter;

impl<S, N> FormatEvent<S, N> for NwizFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let ansi: bool = writer.has_ansi_escapes();
        Self::render(&mut writer, event, ansi)
    }
}

impl NwizFormatter {
    /// Writes one entry for `event`, with colours only when `ansi` is set.
    pub fn render<W: fmt::Write>(writer: &mut W, event: &Event<'_>, ansi: bool) -> fmt::Result {
        let mut fields = EventFields::default();
        event.record(&mut fields);

        if let Some(raw) = fields.raw_msg {
            return match ansi {
                true => writeln!(writer, "{raw}"),
                false => writeln!(writer, "{}", console::strip_ansi_codes(&raw)),
            };
        }

        let meta = event.metadata();
        let (tag, color_func): (String, fn(ColoredString) -> ColoredString) =
            match fields.severity.as_deref() {
                Some("PASS") => ("[PASS]".into(), |s| s.green().bold()),
                Some("FAIL") => ("[FAIL]".into(), |s| s.red().bold()),
                Some(other) => (format!("[{other}]"), |s| s.yellow().bold()),
                None => level_tag(meta.level()),
            };

        match ansi {
            true => write!(writer, "{}", color_func(tag.as_str().into()))?,
            false => write!(writer, "{tag}")?,
        }
        write!(writer, "{}", Local::now().format(TIMESTAMP))?;

        let module: &str = fields.module.as_deref().unwrap_or(meta.target());
        write!(writer, "[{module}]")?;

        if let Some(message) = &fields.message {
            write!(writer, " {message}")?;
        }
        if let Some(detail) = &fields.detail {
            write!(writer, " {detail}")?;
        }
        for (name, value) in &fields.extra {
            write!(writer, " {name}={value}")?;
        }

        writeln!(writer)
    }
}

fn level_tag(level: &Level) -> (String, fn(ColoredString) -> ColoredString) {
    match *level {
        Level::TRACE => ("[TRACE]".into(), |s| s.dimmed()),
        Level::DEBUG => ("[DEBUG]".into(), |s| s.blue()),
        Level::INFO => ("[INFO]".into(), |s| s.yellow().bold()),
        Level::WARN => ("[WARN]".into(), |s| s.yellow().bold()),
        Level::ERROR => ("[ERROR]".into(), |s| s.red().bold()),
    }
}

#[derive(Default)]
struct EventFields {
    severity: Option<String>,
    module: Option<String>,
    detail: Option<String>,
    message: Option<String>,
    raw_msg: Option<String>,
    extra: Vec<(&'static str, String)>,
}

impl EventFields {
    fn store(&mut self, name: &'static str, value: String) {
        match name {
            "severity" => self.severity = Some(value),
            "module" => self.module = Some(value),
            "detail" if value.is_empty() => {}
            "detail" => self.detail = Some(value),
            "message" => self.message = Some(value),
            "raw_msg" => self.raw_msg = Some(value),
            other => self.extra.push((other, value)),
        }
    }
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.store(field.name(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.store(field.name(), format!("{value:?}"));
    }
}

/// User-facing entries and plain prints, or every info-and-above event in verbose mode.
fn on_console(meta: &Metadata<'_>, verbose: bool) -> bool {
    match meta.target() {
        CONSOLE_TARGET | PRINT_TARGET => true,
        _ => verbose && meta.is_event() && *meta.level() <= Level::INFO,
    }
}

/// Everything but plain prints and progress spans, info and above.
fn in_log_file(meta: &Metadata<'_>) -> bool {
    !matches!(meta.target(), PRINT_TARGET | PROGRESS_TARGET) && *meta.level() <= Level::INFO
}

/// Console plus `<output>/Logs/master.log` and one `<output>/Logs/<port>.log` per deep scan. Console lines go through the progress bar
/// writer so a running spinner is never torn.
pub fn init_logging(config: &Config) -> anyhow::Result<()> {
    let log_path = config.master_log();
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open the log file {}", log_path.display()))?;

    let file_filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(format!("{PRINT_TARGET}=off").parse()?)
        .add_directive(format!("{PROGRESS_TARGET}=off").parse()?);

    let verbose: bool = config.verbose;
    let indicatif_layer = IndicatifLayer::new();

    let console_layer = tracing_subscriber::fmt::layer()
        .event_format(NwizFormatter)
        .with_writer(indicatif_layer.get_stdout_writer())
        .with_filter(filter_fn(move |meta| on_console(meta, verbose)));

    let file_layer = tracing_subscriber::fmt::layer()
        .event_format(NwizFormatter)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .with_filter(file_filter);

    let port_layer = PortLogLayer::new(config.logs_dir())
        .with_filter(filter_fn(in_log_file));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(port_layer)
        .with(indicatif_layer.with_filter(filter_fn(|meta| meta.target() == PROGRESS_TARGET)))
        .try_init()
        .context("Failed to install the log subscriber")?;

    Ok(())
}

/// Console only, for commands that never touch the output directory.
pub fn init_console() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(NwizFormatter)
                .with_filter(filter_fn(|meta| on_console(meta, false))),
        )
        .try_init()
        .context("Failed to install the log subscriber")?;

    Ok(())
}

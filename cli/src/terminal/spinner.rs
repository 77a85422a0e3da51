use colored::*;
use indicatif::ProgressStyle;
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

/// Spans under this target get a progress bar, nothing else does.
pub const PROGRESS_TARGET: &str = "nwiz::progress";

const TICKS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
];

fn style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

/// Span whose bar tracks the deep-scan phase. Enter it (or instrument the phase with it)
/// to show the bar; it disappears once every clone is dropped.
pub fn deep_scan_progress(total: usize) -> Span {
    let span: Span = info_span!(target: PROGRESS_TARGET, "deep_scans");
    span.pb_set_style(&style());
    span.pb_set_length(total as u64);
    span.pb_set_message(&progress_message(0, total));
    span
}

pub fn report_progress(span: &Span, done: usize, total: usize) {
    span.pb_set_position(done as u64);
    span.pb_set_message(&progress_message(done, total));
}

fn progress_message(done: usize, total: usize) -> String {
    format!(
        "Script-scanned {} of {} open port(s)...",
        done.to_string().green().bold(),
        total
    )
}

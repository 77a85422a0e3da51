use std::cell::Cell;
use std::fmt::Display;

use colored::*;
use tracing::info;
use unicode_width::UnicodeWidthStr;

use nwiz_common::network::host::HostSnapshot;
use nwiz_common::outcome::RECORD_TARGET;
use nwiz_core::orchestrator::TaskOutcome;

use crate::terminal::{colors, format};

pub const TOTAL_WIDTH: usize = 64;
/// Plain console output that is not a log entry.
pub const PRINT_TARGET: &str = "nwiz::print";

thread_local! {
    pub static GLOBAL_KEY_WIDTH: Cell<usize> = const { Cell::new(0) }
}

pub trait WithDefaultColor {
    fn with_default(self, default_color: Color) -> ColoredString;
}

impl WithDefaultColor for &str {
    fn with_default(self, default_color: Color) -> ColoredString {
        self.color(default_color)
    }
}

impl WithDefaultColor for String {
    fn with_default(self, default_color: Color) -> ColoredString {
        self.color(default_color)
    }
}

impl WithDefaultColor for ColoredString {
    fn with_default(self, _default_color: Color) -> ColoredString {
        self
    }
}

pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

/// Goes to the log file only.
pub fn record(msg: &str) {
    info!(target: RECORD_TARGET, raw_msg = msg);
}

const BANNER: &str = r#"
          _   ___        _____ _____
         | \ | \ \      / /_ _|__  /
         |  \| |\ \ /\ / / | |  / /
         | |\  | \ V  V /  | | / /_
         |_| \_|  \_/\_/  |___/____|
"#;

pub fn banner(no_banner: bool, quiet: bool) {
    if no_banner || quiet {
        return;
    }

    let text_content: String = format!("⟦ NWIZ v{} ⟧ ", env!("CARGO_PKG_VERSION"));
    let text_width: usize = UnicodeWidthStr::width(text_content.as_str());
    let text: ColoredString = text_content.bright_green().bold();
    let sep: ColoredString = "═"
        .repeat(TOTAL_WIDTH.saturating_sub(text_width) / 2)
        .bright_black();

    print(&format!("{}", BANNER.bright_green()));
    print(&format!("{sep}{text}{sep}"));
}

pub fn header(msg: &str, quiet: bool) {
    if quiet {
        return;
    }

    let formatted: String = format!("⟦ {msg} ⟧");
    let msg_len: usize = formatted.chars().count();

    let dash_count: usize = TOTAL_WIDTH.saturating_sub(msg_len);
    let left: usize = dash_count / 2;
    let right: usize = dash_count - left;

    let line: ColoredString = format!(
        "{}{}{}",
        "─".repeat(left),
        formatted.to_uppercase().bright_green(),
        "─".repeat(right)
    )
    .bright_black();

    print(&format!("{line}"));
}

/// Opens a run's section of the log file with the target it was pointed at.
pub fn log_header(identifier: &str) {
    record(&framed(identifier));
}

pub fn log_footer() {
    record(&framed(FOOTER));
}

/// Closing line of every log section.
pub const FOOTER: &str = "Exiting the tool";

/// `title` centred between two rules, the frame of every log section.
pub fn framed(title: &str) -> String {
    let sep: String = "═".repeat(TOTAL_WIDTH);
    format!("{sep}\n{}\n{sep}", center(title))
}

pub fn aligned_line<V>(key: &str, value: V)
where
    V: Display + WithDefaultColor,
{
    let whitespace: String = ".".repeat((GLOBAL_KEY_WIDTH.get() + 1).saturating_sub(key.len()));
    let colon: String = format!(
        "{}{}",
        whitespace.color(colors::SEPARATOR),
        ":".color(colors::SEPARATOR)
    );
    let value: ColoredString = value.with_default(colors::TEXT_DEFAULT);
    print_status(format!("{}{} {}", key.color(colors::PRIMARY), colon, value));
}

pub fn print_status<T: AsRef<str>>(msg: T) {
    let prefix: ColoredString = ">".color(colors::SEPARATOR);
    let message: String = format!("{} {}", prefix, msg.as_ref().color(colors::TEXT_DEFAULT));
    print(&message);
}

pub fn tree_head(idx: usize, name: &str) {
    let idx_str: String = format!("[{}]", idx.to_string().color(colors::ACCENT));
    let output: String = format!(
        "{} {}",
        idx_str.color(colors::SEPARATOR),
        name.color(colors::PRIMARY)
    );
    print(&output);
}

pub fn as_tree_one_level(key_value_pair: Vec<(String, ColoredString)>) {
    for (i, (key, value)) in key_value_pair.iter().enumerate() {
        let last: bool = i + 1 == key_value_pair.len();
        let branch: ColoredString = if !last {
            "├─".bright_black()
        } else {
            "└─".bright_black()
        };
        let output: String = format!(
            " {} {}{}{} {}",
            branch,
            key.color(colors::TEXT_DEFAULT),
            ".".repeat(8usize.saturating_sub(key.len())).color(colors::SEPARATOR),
            ":".color(colors::SEPARATOR),
            value
        );
        print(&output);
    }
}

/// One tree per open port, then the filtered ports on a single line.
pub fn scan_summary(snapshot: &HostSnapshot, tasks: &[TaskOutcome]) {
    GLOBAL_KEY_WIDTH.set(8);
    aligned_line("Target", snapshot.address.to_string());
    aligned_line("Open", snapshot.open_count.to_string());
    aligned_line("Filtered", snapshot.filtered_count.to_string());
    aligned_line("Findings", format::findings_total(snapshot.total_findings()));

    if snapshot.open_ports.is_empty() {
        no_results();
    }

    for (idx, port) in snapshot.open_ports.iter().enumerate() {
        tree_head(idx + 1, &format::port_title(port));
        as_tree_one_level(format::port_details(port, format::task_for(tasks, &port.id)));
    }

    if !snapshot.filtered_ports.is_empty() {
        aligned_line("Filtered", format::port_list(&snapshot.filtered_ports));
    }
}

fn center(msg: &str) -> String {
    let width: usize = console::measure_text_width(msg);
    let space: String = " ".repeat(TOTAL_WIDTH.saturating_sub(width) / 2);
    format!("{space}{msg}")
}

const NO_RESULTS_0: &str = r#"
         _   _  ___     ___  ____  _____ _   _
        | \ | |/ _ \   / _ \|  _ \| ____| \ | |
        |  \| | | | | | | | | |_) |  _| |  \| |
        | |\  | |_| | | |_| |  __/| |___| |\  |
        |_| \_|\___/   \___/|_|   |_____|_| \_|
"#;

pub fn no_results() {
    print(&format!("{}", NO_RESULTS_0.red().bold()));
}

pub fn end_of_program(quiet: bool) {
    if quiet {
        return;
    }
    print(&format!(
        "{}",
        "═".repeat(TOTAL_WIDTH).color(colors::SEPARATOR)
    ));
}

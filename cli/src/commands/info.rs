use nwiz_common::config::Config;
use nwiz_common::outcome::CONSOLE_TARGET;
use nwiz_core::parser::VULNERABLE_MARKER;

use crate::terminal::logging::LOG_ENV;
use crate::terminal::print::{self, GLOBAL_KEY_WIDTH};

pub fn info() {
    let defaults = Config::default();

    let lines: Vec<(&str, String)> = vec![
        ("Tool", format!("nwiz v{}", env!("CARGO_PKG_VERSION"))),
        ("Workers", defaults.max_workers.to_string()),
        ("Output", defaults.output_dir.display().to_string()),
        ("Logs", defaults.master_log().display().to_string()),
        ("Report", defaults.report_format.extension().to_string()),
        ("nmap", defaults.nmap_path.display().to_string()),
        ("Marker", VULNERABLE_MARKER.to_string()),
        ("Log level", format!("${LOG_ENV} (file), {CONSOLE_TARGET} (console)")),
    ];

    let width: usize = lines.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    GLOBAL_KEY_WIDTH.set(width);
    for (key, value) in lines {
        print::aligned_line(key, value);
    }
    print::end_of_program(false);
}

pub mod colors;
pub mod format;
pub mod logging;
pub mod port_log;
pub mod print;
pub mod spinner;

//! Shorthands for user-visible [`log`](crate::outcome::log) entries.
//!
//! ```ignore
//! pass!(Module::PortScan, DiscoveryOutcome::Completed);
//! fail!(Module::ScriptScan, ScriptScanOutcome::CommandFailed, "Port: {}", id);
//! ```

#[macro_export]
macro_rules! pass {
    ($module:expr, $outcome:expr) => {
        $crate::outcome::log($crate::outcome::Severity::Pass, $module, $outcome, true, None)
    };
    ($module:expr, $outcome:expr, $($arg:tt)+) => {
        $crate::outcome::log(
            $crate::outcome::Severity::Pass,
            $module,
            $outcome,
            true,
            Some(&format!($($arg)+)),
        )
    };
}

#[macro_export]
macro_rules! fail {
    ($module:expr, $outcome:expr) => {
        $crate::outcome::log($crate::outcome::Severity::Fail, $module, $outcome, true, None)
    };
    ($module:expr, $outcome:expr, $($arg:tt)+) => {
        $crate::outcome::log(
            $crate::outcome::Severity::Fail,
            $module,
            $outcome,
            true,
            Some(&format!($($arg)+)),
        )
    };
}

#[macro_export]
macro_rules! notice {
    ($module:expr, $outcome:expr) => {
        $crate::outcome::log($crate::outcome::Severity::Info, $module, $outcome, true, None)
    };
    ($module:expr, $outcome:expr, $($arg:tt)+) => {
        $crate::outcome::log(
            $crate::outcome::Severity::Info,
            $module,
            $outcome,
            true,
            Some(&format!($($arg)+)),
        )
    };
}

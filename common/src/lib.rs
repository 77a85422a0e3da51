//! # nwiz common
//!
//! Types shared by every crate of the workspace:
//!
//! * **[`network`]**: the scan data model (ports, host snapshot) and target parsing.
//! * **[`outcome`]**: the logging vocabulary (severity, module, per-operation outcomes)
//!   and the [`outcome::log`] sink contract.
//! * **[`error`]**: typed failures raised by the external collaborators.
//! * **[`config`]**: resolved run settings.

pub mod config;
pub mod error;
pub mod macros;
pub mod network;
pub mod outcome;

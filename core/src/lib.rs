//! # nwiz core
//!
//! The scan engine. A run goes through two phases against one host:
//!
//! 1. **Discovery**: one sweep of every TCP port, feeding the [`aggregate::HostAggregate`].
//! 2. **Deep scan**: one script scan per open port, fanned out over a bounded worker pool
//!    by the [`orchestrator::ScanOrchestrator`].
//!
//! The engine never talks to nmap directly. It depends on two seams,
//! [`probe::ExternalProbeRunner`] and [`parser::ReportParser`], whose nmap-backed
//! implementations live next to them.

pub mod aggregate;
pub mod orchestrator;
pub mod parser;
pub mod probe;
pub mod report;
pub mod workspace;

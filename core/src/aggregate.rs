//! # Host Aggregate
//!
//! Owns every [`PortRecord`] discovered on the target, partitioned by state, and is
//! the only shared mutable state of a run.
//!
//! All structural reads and writes go through one [`Mutex`]. The lock is only held while
//! copying data in or out of a record: callers do their slow work (external probes,
//! parsing) first and commit the result through [`HostAggregate::with_port`].

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::debug;

use nwiz_common::network::host::HostSnapshot;
use nwiz_common::network::port::{PortRecord, PortState};

/// Where [`HostAggregate::add_port`] put a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Open,
    Filtered,
    /// Closed ports never enter the aggregate.
    Discarded,
    /// The id is already tracked; the first record wins.
    Duplicate,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("port {0} is not tracked by this host")]
    UnknownPort(String),
    #[error("host is finalized, port {0} can no longer change")]
    Sealed(String),
}

pub struct HostAggregate {
    address: IpAddr,
    book: Mutex<PortBook>,
}

#[derive(Default)]
struct PortBook {
    open: Vec<PortRecord>,
    filtered: Vec<PortRecord>,
    open_count: usize,
    filtered_count: usize,
    index: HashMap<String, (PortState, usize)>,
    sealed: bool,
}

impl PortBook {
    fn check_invariants(&self) {
        debug_assert_eq!(self.open_count, self.open.len());
        debug_assert_eq!(self.filtered_count, self.filtered.len());
        debug_assert_eq!(self.index.len(), self.open.len() + self.filtered.len());
    }

    fn record_mut(&mut self, id: &str) -> Option<&mut PortRecord> {
        let (state, idx) = *self.index.get(id)?;
        match state {
            PortState::Open => self.open.get_mut(idx),
            PortState::Filtered => self.filtered.get_mut(idx),
            PortState::Closed => None,
        }
    }
}

impl HostAggregate {
    pub fn new(address: IpAddr) -> Self {
        Self {
            address,
            book: Mutex::new(PortBook::default()),
        }
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    fn lock(&self) -> MutexGuard<'_, PortBook> {
        // A panicking writer leaves at most one record half-updated; keep serving the rest.
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Files `record` under its state. Meant for the discovery phase.
    pub fn add_port(&self, record: PortRecord) -> Placement {
        let mut book = self.lock();

        if book.sealed {
            debug!(port = %record.id, "ignoring port added after finalization");
            return Placement::Discarded;
        }
        if book.index.contains_key(&record.id) {
            debug!(port = %record.id, "ignoring duplicate port id");
            return Placement::Duplicate;
        }

        let placement = match record.state {
            PortState::Open => {
                let idx = book.open.len();
                book.index.insert(record.id.clone(), (PortState::Open, idx));
                book.open.push(record);
                book.open_count += 1;
                Placement::Open
            }
            PortState::Filtered => {
                let idx = book.filtered.len();
                book.index
                    .insert(record.id.clone(), (PortState::Filtered, idx));
                book.filtered.push(record);
                book.filtered_count += 1;
                Placement::Filtered
            }
            PortState::Closed => Placement::Discarded,
        };

        book.check_invariants();
        placement
    }

    /// Runs `mutator` with exclusive access to the record for `id`.
    ///
    /// The aggregate lock is held for the duration of the call, so `mutator` must not
    /// block. Id and state are fixed at discovery; changing them is reverted.
    pub fn with_port<R>(
        &self,
        id: &str,
        mutator: impl FnOnce(&mut PortRecord) -> R,
    ) -> Result<R, AggregateError> {
        let mut book = self.lock();

        if book.sealed {
            return Err(AggregateError::Sealed(id.to_string()));
        }

        let record = book
            .record_mut(id)
            .ok_or_else(|| AggregateError::UnknownPort(id.to_string()))?;

        let (original_id, original_state) = (record.id.clone(), record.state);
        let result = mutator(record);
        record.id = original_id;
        record.state = original_state;

        book.check_invariants();
        Ok(result)
    }

    /// Ids of the open ports, in discovery order.
    pub fn open_port_ids(&self) -> Vec<String> {
        self.lock().open.iter().map(|port| port.id.clone()).collect()
    }

    pub fn open_count(&self) -> usize {
        self.lock().open_count
    }

    pub fn filtered_count(&self) -> usize {
        self.lock().filtered_count
    }

    pub fn is_empty(&self) -> bool {
        self.lock().index.is_empty()
    }

    /// Consistent copy of the current state. No record is ever observed mid-update.
    pub fn snapshot(&self) -> HostSnapshot {
        let book = self.lock();
        HostSnapshot {
            address: self.address,
            open_count: book.open_count,
            filtered_count: book.filtered_count,
            open_ports: book.open.clone(),
            filtered_ports: book.filtered.clone(),
        }
    }

    /// Freezes the aggregate and returns its final snapshot.
    pub fn seal(&self) -> HostSnapshot {
        self.lock().sealed = true;
        self.snapshot()
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

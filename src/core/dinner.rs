//! Ring wiring and the running dinner session

use crate::core::lock::LockTable;
use crate::core::logger::EventLogger;
use crate::core::strategy::StrategyKind;
use crate::core::types::{ForkId, SeatId};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

/// One seat's place at the ring
///
/// Fork ids equal seat ids going clockwise: fork `k` lies between seat
/// `k` and seat `k + 1`. A seat's left fork is its own id; its right
/// fork is its predecessor's. Neighbours therefore share exactly one
/// fork, and every fork is shared by exactly two seats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Philosopher {
    seat: SeatId,
    seats: usize,
}

impl Philosopher {
    /// Seat `seat` of `seats` around the table
    pub fn new(seat: SeatId, seats: usize) -> Self {
        debug_assert!(seat < seats, "seat {seat} does not exist at a table of {seats}");
        Philosopher { seat, seats }
    }

    pub fn seat(&self) -> SeatId {
        self.seat
    }

    /// The fork on this seat's left
    pub fn left(&self) -> ForkId {
        self.seat
    }

    /// The fork on this seat's right
    pub fn right(&self) -> ForkId {
        (self.seat + self.seats - 1) % self.seats
    }
}

/// A dinner in progress
///
/// Holds the lock table, the optional timeline logger, and the
/// philosopher threads. The threads run forever and are never joined;
/// dropping the `Dinner` leaves them eating (or deadlocked) until the
/// process ends. There is no cancellation: a deadlocked table stays
/// exactly as it froze, available for inspection.
pub struct Dinner {
    table: Arc<LockTable>,
    strategy: StrategyKind,
    logger: Option<Arc<EventLogger>>,
    philosophers: Vec<JoinHandle<()>>,
}

impl Dinner {
    pub(crate) fn new(
        table: Arc<LockTable>,
        strategy: StrategyKind,
        logger: Option<Arc<EventLogger>>,
        philosophers: Vec<JoinHandle<()>>,
    ) -> Self {
        Dinner {
            table,
            strategy,
            logger,
            philosophers,
        }
    }

    /// Number of seats (and forks) at this table
    pub fn seats(&self) -> usize {
        self.philosophers.len()
    }

    /// The seating plan every philosopher follows
    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    /// The table's lock registry
    ///
    /// Useful for probing fork availability from outside the ring, for
    /// example with [`crate::NamedLock::try_acquire`].
    pub fn lock_table(&self) -> &Arc<LockTable> {
        &self.table
    }

    /// Resolved path of the timeline log, if one was configured
    pub fn log_path(&self) -> Option<&Path> {
        self.logger.as_deref().map(EventLogger::path)
    }

    /// Flush pending timeline entries to disk
    ///
    /// A no-op without a configured log.
    pub fn flush_log(&self) -> Result<()> {
        match &self.logger {
            Some(logger) => logger.flush(),
            None => Ok(()),
        }
    }

    /// Open the recorded timeline in the default browser
    ///
    /// Flushes the log first so the viewer sees the complete stream.
    ///
    /// # Errors
    /// Returns an error if no log was configured, the flush fails, or
    /// the browser could not be opened.
    pub fn showcase(&self) -> Result<()> {
        let logger = self
            .logger
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("dinner has no timeline log; configure one with with_log"))?;
        logger
            .flush()
            .context("Failed to flush pending log entries")?;
        crate::showcase::showcase(logger.path())
    }
}

//! Fork-acquisition strategies
//!
//! A strategy is a seat's table manner: the order in which it picks up
//! and puts down its two forks, forever. Two manners are provided:
//!
//! * [`LeftRightStrategy`] - the naive one. Left fork, then right fork.
//!   Symmetric, intuitive, and capable of the classic circular wait in
//!   which every seat holds its left and starves for its right. An
//!   optional startup stagger makes the collision less likely without
//!   ruling it out.
//! * [`OrderingStrategy`] - the disciplined one. Both forks are ranked
//!   by fork id and always grabbed lowest-first, which breaks the
//!   circular wait outright.
//!
//! Strategies are picked by configuration string through
//! [`StrategyKind::parse`]; an unrecognized name yields `None` and is
//! surfaced as a configuration error, never a silent default.

pub mod left_right;
pub mod ordered;

pub use left_right::LeftRightStrategy;
pub use ordered::OrderingStrategy;

use crate::core::lock::{LockTable, NamedLock};
use crate::core::logger::EventLogger;
use crate::core::tempo::Tempo;
use crate::core::types::{ForkEvent, ForkId, SeatId, fork_lock_name};
use std::sync::Arc;

/// Strategy-internal report sink: a fork id plus whether this seat now
/// holds it
///
/// The dinner layer wraps the public observer into one of these per
/// seat, translating the bool into an owner identity.
pub type ReportFork = Box<dyn Fn(ForkId, bool) + Send>;

/// Per-seat wiring handed to a strategy
pub struct StrategyOptions {
    /// Fork to this seat's left
    pub left: ForkId,
    /// Fork to this seat's right
    pub right: ForkId,
    /// Hold/free report sink
    pub report: ReportFork,
}

/// Seating-plan selector, parsed from configuration strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// `"left-right"`: naive order, deadlock possible
    LeftRight,
    /// `"left-right-wait"`: naive order after a random startup stagger
    LeftRightWait,
    /// `"ordering"`: global lowest-fork-first order, deadlock-free
    Ordering,
}

impl StrategyKind {
    /// Parse a configuration string
    ///
    /// Returns `None` for unknown names.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "left-right" => Some(StrategyKind::LeftRight),
            "left-right-wait" => Some(StrategyKind::LeftRightWait),
            "ordering" => Some(StrategyKind::Ordering),
            _ => None,
        }
    }

    /// The configuration string this kind parses from
    pub fn config_name(&self) -> &'static str {
        match self {
            StrategyKind::LeftRight => "left-right",
            StrategyKind::LeftRightWait => "left-right-wait",
            StrategyKind::Ordering => "ordering",
        }
    }
}

/// A seat's strategy, assembled and ready to run
pub enum Strategy {
    LeftRight(LeftRightStrategy),
    Ordering(OrderingStrategy),
}

impl Strategy {
    /// Assemble a strategy of the given kind for one seat
    pub fn build(
        kind: StrategyKind,
        seat: SeatId,
        table: &Arc<LockTable>,
        options: StrategyOptions,
        tempo: Arc<dyn Tempo>,
        logger: Option<Arc<EventLogger>>,
    ) -> Strategy {
        let StrategyOptions { left, right, report } = options;
        let access = ForkAccess::new(seat, Arc::clone(table), report, tempo, logger);
        match kind {
            StrategyKind::LeftRight => {
                Strategy::LeftRight(LeftRightStrategy::new(access, left, right, false))
            }
            StrategyKind::LeftRightWait => {
                Strategy::LeftRight(LeftRightStrategy::new(access, left, right, true))
            }
            StrategyKind::Ordering => {
                Strategy::Ordering(OrderingStrategy::new(access, left, right))
            }
        }
    }

    /// Assemble from a configuration string; `None` for unknown names
    pub fn from_config(
        name: &str,
        seat: SeatId,
        table: &Arc<LockTable>,
        options: StrategyOptions,
        tempo: Arc<dyn Tempo>,
        logger: Option<Arc<EventLogger>>,
    ) -> Option<Strategy> {
        StrategyKind::parse(name)
            .map(|kind| Strategy::build(kind, seat, table, options, tempo, logger))
    }

    /// The kind this strategy was assembled as
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::LeftRight(s) if s.waits_on_init() => StrategyKind::LeftRightWait,
            Strategy::LeftRight(_) => StrategyKind::LeftRight,
            Strategy::Ordering(_) => StrategyKind::Ordering,
        }
    }

    /// Run the seat's loop; never returns
    pub fn run(self) -> ! {
        match self {
            Strategy::LeftRight(s) => s.run(),
            Strategy::Ordering(s) => s.run(),
        }
    }
}

/// Fork plumbing shared by both strategies
///
/// Owns everything one seat needs to turn "get fork k" into a lock
/// acquisition plus its observable side effects, in the contractual
/// order.
pub(crate) struct ForkAccess {
    seat: SeatId,
    table: Arc<LockTable>,
    report: ReportFork,
    tempo: Arc<dyn Tempo>,
    logger: Option<Arc<EventLogger>>,
}

impl ForkAccess {
    pub(crate) fn new(
        seat: SeatId,
        table: Arc<LockTable>,
        report: ReportFork,
        tempo: Arc<dyn Tempo>,
        logger: Option<Arc<EventLogger>>,
    ) -> Self {
        ForkAccess {
            seat,
            table,
            report,
            tempo,
            logger,
        }
    }

    pub(crate) fn tempo(&self) -> &dyn Tempo {
        self.tempo.as_ref()
    }

    /// Block for a fork, then publish the hold
    ///
    /// The held report strictly follows the physical grant: observers
    /// never see a fork as held while it is still free. `holding` is the
    /// number of forks this seat already has, forwarded to the tempo
    /// hook that runs before the acquisition starts.
    pub(crate) fn get_fork(&self, fork: ForkId, holding: usize) -> NamedLock {
        self.tempo.before_fork(fork, holding);
        self.log(fork, ForkEvent::Attempt);
        let lock = NamedLock::acquire_on(&self.table, fork_lock_name(fork));
        self.log(fork, ForkEvent::Acquired);
        (self.report)(fork, true);
        lock
    }

    /// Publish the fork as free, then physically release it
    ///
    /// The report comes first, so there is a window in which the fork
    /// reads as free while the lock is still held. That ordering is part
    /// of the observable contract and is preserved as-is.
    pub(crate) fn release_fork(&self, fork: ForkId, mut lock: NamedLock) {
        (self.report)(fork, false);
        self.log(fork, ForkEvent::Released);
        lock.release();
    }

    fn log(&self, fork: ForkId, event: ForkEvent) {
        if let Some(logger) = &self.logger {
            logger.log_event(self.seat, fork, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct SilentTempo;

    impl Tempo for SilentTempo {
        fn hold(&self) {}
        fn interval(&self) {}
    }

    fn quiet_access(table: &Arc<LockTable>) -> ForkAccess {
        ForkAccess::new(
            0,
            Arc::clone(table),
            Box::new(|_, _| {}),
            Arc::new(SilentTempo),
            None,
        )
    }

    #[test]
    fn test_parse_knows_all_three_plans() {
        assert_eq!(StrategyKind::parse("left-right"), Some(StrategyKind::LeftRight));
        assert_eq!(
            StrategyKind::parse("left-right-wait"),
            Some(StrategyKind::LeftRightWait)
        );
        assert_eq!(StrategyKind::parse("ordering"), Some(StrategyKind::Ordering));
    }

    #[test]
    fn test_parse_rejects_unknown_and_miscased_names() {
        assert_eq!(StrategyKind::parse("round-robin"), None);
        assert_eq!(StrategyKind::parse("Ordering"), None);
        assert_eq!(StrategyKind::parse(""), None);
    }

    #[test]
    fn test_config_names_round_trip() {
        for kind in [
            StrategyKind::LeftRight,
            StrategyKind::LeftRightWait,
            StrategyKind::Ordering,
        ] {
            assert_eq!(StrategyKind::parse(kind.config_name()), Some(kind));
        }
    }

    #[test]
    fn test_from_config_wires_the_startup_stagger() {
        let table = Arc::new(LockTable::new());

        for (name, kind) in [
            ("left-right", StrategyKind::LeftRight),
            ("left-right-wait", StrategyKind::LeftRightWait),
            ("ordering", StrategyKind::Ordering),
        ] {
            let options = StrategyOptions {
                left: 1,
                right: 0,
                report: Box::new(|_, _| {}),
            };
            let strategy =
                Strategy::from_config(name, 1, &table, options, Arc::new(SilentTempo), None)
                    .expect("known name must build");
            assert_eq!(strategy.kind(), kind);
        }
    }

    #[test]
    fn test_from_config_rejects_unknown_names() {
        let table = Arc::new(LockTable::new());
        let options = StrategyOptions {
            left: 1,
            right: 0,
            report: Box::new(|_, _| {}),
        };
        assert!(
            Strategy::from_config("random", 1, &table, options, Arc::new(SilentTempo), None)
                .is_none()
        );
    }

    #[test]
    fn test_held_report_follows_the_grant() {
        let table = Arc::new(LockTable::new());
        let probe_table = Arc::clone(&table);
        let probed = Arc::new(StdMutex::new(None));
        let seen = Arc::clone(&probed);

        let report: ReportFork = Box::new(move |fork, held| {
            if held {
                // At report time the grant already happened, so the name
                // must be unavailable
                let mut probe = NamedLock::new(&probe_table, fork_lock_name(fork));
                *seen.lock().unwrap() = Some(probe.try_acquire());
            }
        });
        let access = ForkAccess::new(0, Arc::clone(&table), report, Arc::new(SilentTempo), None);

        let lock = access.get_fork(2, 0);
        assert_eq!(*probed.lock().unwrap(), Some(false));
        access.release_fork(2, lock);
    }

    #[test]
    fn test_free_report_comes_before_the_physical_release() {
        let table = Arc::new(LockTable::new());
        let probe_table = Arc::clone(&table);
        let probed = Arc::new(StdMutex::new(None));
        let seen = Arc::clone(&probed);

        let report: ReportFork = Box::new(move |fork, held| {
            if !held {
                // The free report runs while the lock is still held;
                // the probe must lose
                let mut probe = NamedLock::new(&probe_table, fork_lock_name(fork));
                *seen.lock().unwrap() = Some(probe.try_acquire());
            }
        });
        let access = ForkAccess::new(0, Arc::clone(&table), report, Arc::new(SilentTempo), None);

        let lock = access.get_fork(2, 0);
        access.release_fork(2, lock);

        assert_eq!(
            *probed.lock().unwrap(),
            Some(false),
            "fork must still be physically held while reported free"
        );

        // Once release_fork returns, the name really is free
        let mut after = NamedLock::new(&table, fork_lock_name(2));
        assert!(after.try_acquire());
        after.release();
    }

    #[test]
    fn test_get_fork_returns_an_acquired_handle() {
        let table = Arc::new(LockTable::new());
        let access = quiet_access(&table);

        let lock = access.get_fork(4, 0);
        assert_eq!(lock.state(), crate::core::lock::HandleState::Acquired);
        assert_eq!(lock.name(), "fork_4");
        access.release_fork(4, lock);
    }
}

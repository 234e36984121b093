//! # Forklore
//!
//! A dining philosophers playground built on named table locks.
//!
//! Forklore seats philosophers around a ring of shared forks, each fork
//! guarded by a named lock that is explicitly acquired and released.
//! Seating plans decide the order forks are reached for: the classic
//! left-right plan can deadlock, the ordering plan never does.
//!
//! ## Features
//!
//! - Named locks with explicit acquire/release and a FIFO handoff
//! - Deadlock-prone and deadlock-free seating plans
//! - Real-time deadlock detection reporting the full wait cycle
//! - Fork timeline logging
//! - Web-based timeline visualization

mod core;
pub use core::{
    Dinner, EventLogger, Forklore, HandleState, LeftRightStrategy, LockTable, NamedLock,
    OrderingStrategy, Philosopher, RandomTempo, ReportFork, Strategy, StrategyKind,
    StrategyOptions, Tempo, TempoConfig,
    types::{
        DeadlockInfo, FORK_LOCK_PREFIX, ForkEvent, ForkId, OwnerInfo, SeatId, ThreadId,
        fork_lock_name, get_current_thread_id,
    },
};

mod showcase;
pub use showcase::showcase;

const BANNER: &str = r#"
      ▄▖▄▖▄▖▖▖▖ ▄▖▄▖▄▖      ▄▖  ▄▖  ▄▖
      ▙▖▌▌▙▘▙▘▌ ▌▌▙▘▙▖  ▌▌  ▛▌  ▝▌  ▛▌
      ▌ ▙▌▌▌▌▌▙▖▙▌▌▌▙▖  ▚▘▗ █▌▗ ▄▌▗ █▌
"#;

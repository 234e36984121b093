use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Seat identifier type
///
/// Seats are numbered clockwise around the table, starting at 0.
pub type SeatId = usize;

/// Fork identifier type
///
/// There are exactly as many forks as seats; fork `k` lies between
/// seat `k` and seat `k + 1`.
pub type ForkId = usize;

/// Thread identifier type
///
/// Uniquely identifies a philosopher (or any other) thread for the
/// lifetime of the process.
pub type ThreadId = usize;

// Global counter for assigning unique thread IDs
static THREAD_ID_COUNTER: AtomicUsize = AtomicUsize::new(1);

// Thread-local storage for each thread's assigned ID
thread_local! {
    static THREAD_ID: ThreadId = {
        // Each thread gets a unique ID once, when this is first accessed
        THREAD_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
    };
}

/// Get a unique identifier of the current thread
/// This will always return the same ID for the lifetime of the thread
pub fn get_current_thread_id() -> ThreadId {
    THREAD_ID.with(|&id| id)
}

/// Prefix for the lock names backing forks
///
/// Fork `k` is guarded by the named lock `"fork_k"`. The mapping is
/// injective: distinct forks never share a lock name.
pub const FORK_LOCK_PREFIX: &str = "fork_";

/// Lock name for a fork
pub fn fork_lock_name(fork: ForkId) -> String {
    format!("{FORK_LOCK_PREFIX}{fork}")
}

/// A single step in a fork's lifecycle, as seen from one seat
///
/// These events drive the timeline log and the showcase visualization.
/// `Attempt` is emitted before the blocking acquisition starts;
/// `Acquired` only after the grant; `Released` when the seat gives the
/// fork back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ForkEvent {
    /// Seat started waiting for the fork
    Attempt,
    /// Seat holds the fork
    Acquired,
    /// Seat gave the fork back
    Released,
}

/// Identity of the seat currently holding a fork
///
/// Delivered through the fork observer whenever a fork becomes held;
/// a free fork is reported as `None` instead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerInfo {
    /// Seat that holds the fork
    pub seat: SeatId,
}

/// Result of a deadlock observation
///
/// Produced by the lock table when a blocked acquisition closes a cycle
/// in the wait-for graph. The table only observes; none of the threads
/// named here will ever run again on their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlockInfo {
    /// Ordered list of threads forming the cycle in the wait-for graph
    ///
    /// For example, if thread 1 is waiting for thread 2, and thread 2 is
    /// waiting for thread 1, the cycle is [1, 2].
    pub thread_cycle: Vec<ThreadId>,

    /// Which named lock each thread in the cycle is blocked on
    ///
    /// Each tuple is (thread_id, lock_name), one per cycle member.
    pub waiting_for: Vec<(ThreadId, String)>,

    /// ISO-8601 timestamp of the moment the cycle was closed
    pub timestamp: String,
}

//! Named locks with explicit acquire/release and an embedded deadlock watch
//!
//! A [`LockTable`] is the registry of named locks shared by everyone at
//! one table. A [`NamedLock`] is a handle onto one name: created, then
//! explicitly acquired, then explicitly released, in that order and only
//! in that order. Holding is decoupled from lexical scope on purpose;
//! a philosopher carries its fork handles across arbitrary code until it
//! decides to give them back.
//!
//! Every acquire and release runs under the single table mutex, which
//! lets the table keep an exact wait-for graph on the side: an edge is
//! added the moment a thread blocks behind a holder, re-pointed when the
//! holder changes, and removed when the waiter is granted. A cycle in
//! that graph is therefore never a false alarm - it is a set of threads
//! that will not run again. Detection only observes: nobody is unblocked,
//! timed out, or recovered.

use crate::core::graph::WaitForGraph;
use crate::core::types::{DeadlockInfo, ThreadId, get_current_thread_id};
use chrono::Utc;
use fxhash::FxHashMap;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::{Sender, channel};

/// Lifecycle of a [`NamedLock`] handle
///
/// Transitions run one way: `Initialized -> Acquired -> Released`.
/// Every other transition is protocol misuse and panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Created, not yet acquired
    Initialized,
    /// Holding the name
    Acquired,
    /// Given back; the handle is spent
    Released,
}

/// One named lock: its current holder and the threads queued behind it
#[derive(Default)]
struct LockEntry {
    holder: Option<ThreadId>,
    queue: VecDeque<ThreadId>,
}

/// Everything the table mutates, guarded by one mutex
struct TableState {
    entries: FxHashMap<String, LockEntry>,
    /// Which name each blocked thread is waiting on
    waits_for: FxHashMap<ThreadId, String>,
    graph: WaitForGraph,
}

/// Background dispatcher for deadlock callback execution
///
/// The thread that closes a wait cycle is itself about to block forever,
/// so it can never run the callback. Cycle reports are handed to this
/// dedicated thread over a channel instead.
struct Dispatcher {
    sender: Sender<DeadlockInfo>,
    _thread_handle: std::thread::JoinHandle<()>,
}

impl Dispatcher {
    fn new(callback: Box<dyn Fn(DeadlockInfo) + Send + 'static>) -> Self {
        let (tx, rx) = channel::<DeadlockInfo>();

        let thread_handle = std::thread::spawn(move || {
            while let Ok(info) = rx.recv() {
                callback(info);
            }
        });

        Dispatcher {
            sender: tx,
            _thread_handle: thread_handle,
        }
    }

    /// Non-blocking send; reports are dropped if the channel is closed
    fn send(&self, info: DeadlockInfo) {
        let _ = self.sender.send(info);
    }
}

/// Registry of named locks for one table of philosophers
///
/// Instance-based and shared through an `Arc`: two tables never see each
/// other's names. Waiters on a name are woken in FIFO order, though that
/// discipline is an implementation detail rather than a promise.
pub struct LockTable {
    state: Mutex<TableState>,
    cond: Condvar,
    dispatcher: Option<Dispatcher>,
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LockTable {
    /// Create a table without a deadlock watcher
    pub fn new() -> Self {
        LockTable {
            state: Mutex::new(TableState {
                entries: FxHashMap::default(),
                waits_for: FxHashMap::default(),
                graph: WaitForGraph::new(),
            }),
            cond: Condvar::new(),
            dispatcher: None,
        }
    }

    /// Create a table that reports wait cycles to `callback`
    ///
    /// The callback runs on a background dispatcher thread, never on a
    /// philosopher thread. A deadlock is reported exactly once, at the
    /// moment the final blocking acquisition closes the cycle.
    pub fn with_watcher<F>(callback: F) -> Self
    where
        F: Fn(DeadlockInfo) + Send + 'static,
    {
        LockTable {
            state: Mutex::new(TableState {
                entries: FxHashMap::default(),
                waits_for: FxHashMap::default(),
                graph: WaitForGraph::new(),
            }),
            cond: Condvar::new(),
            dispatcher: Some(Dispatcher::new(Box::new(callback))),
        }
    }

    /// Block the calling thread until it holds `name`
    ///
    /// Grants the name immediately when it is free and unclaimed,
    /// otherwise queues up behind the current holder. Panics if `owner`
    /// already holds the name: an agent that re-requests its own fork
    /// would wait on itself forever, so that mistake fails fast instead.
    fn block_until_granted(&self, owner: ThreadId, name: &str) {
        let mut state = self.state.lock();

        let holder = {
            let entry = state.entries.entry(name.to_owned()).or_default();
            if entry.holder == Some(owner) {
                panic!("thread {owner} already holds named lock '{name}'");
            }
            if entry.holder.is_none() && entry.queue.is_empty() {
                entry.holder = Some(owner);
                return;
            }
            entry.queue.push_back(owner);
            entry.holder
        };

        state.waits_for.insert(owner, name.to_owned());
        if let Some(holding) = holder {
            self.watch_edge(&mut state, owner, holding);
        }

        loop {
            let granted = state
                .entries
                .get(name)
                .is_some_and(|entry| entry.holder.is_none() && entry.queue.front() == Some(&owner));
            if granted {
                break;
            }
            self.cond.wait(&mut state);
        }

        let waiters: Vec<ThreadId> = {
            let entry = state.entries.entry(name.to_owned()).or_default();
            entry.queue.pop_front();
            entry.holder = Some(owner);
            entry.queue.iter().copied().collect()
        };
        state.waits_for.remove(&owner);
        state.graph.clear_wait_edges(owner);

        // Threads still queued now wait on the new holder
        for waiter in waiters {
            self.watch_edge(&mut state, waiter, owner);
        }
    }

    /// Take `name` for `owner` only if that needs no waiting
    fn try_take(&self, owner: ThreadId, name: &str) -> bool {
        let mut state = self.state.lock();
        match state.entries.get_mut(name) {
            None => {
                state.entries.insert(
                    name.to_owned(),
                    LockEntry {
                        holder: Some(owner),
                        queue: VecDeque::new(),
                    },
                );
                true
            }
            Some(entry) if entry.holder.is_none() && entry.queue.is_empty() => {
                entry.holder = Some(owner);
                true
            }
            Some(_) => false,
        }
    }

    /// Give `name` back and wake the queue
    fn release_entry(&self, owner: ThreadId, name: &str) {
        let mut state = self.state.lock();

        let waiters: Vec<ThreadId> = match state.entries.get_mut(name) {
            Some(entry) => {
                debug_assert_eq!(
                    entry.holder,
                    Some(owner),
                    "named lock '{name}' released by a non-holder"
                );
                entry.holder = None;
                entry.queue.iter().copied().collect()
            }
            None => return,
        };

        if waiters.is_empty() {
            state.entries.remove(name);
            return;
        }

        // The queued threads no longer wait on this owner
        for &waiter in &waiters {
            state.graph.remove_edge(waiter, owner);
        }

        drop(state);
        self.cond.notify_all();
    }

    /// Record a wait edge and report the cycle it may close
    fn watch_edge(&self, state: &mut TableState, from: ThreadId, to: ThreadId) {
        if let Some(cycle) = state.graph.add_edge(from, to) {
            let waiting_for = cycle
                .iter()
                .filter_map(|thread| state.waits_for.get(thread).map(|name| (*thread, name.clone())))
                .collect();
            let info = DeadlockInfo {
                thread_cycle: cycle,
                waiting_for,
                timestamp: Utc::now().to_rfc3339(),
            };

            if let Some(dispatcher) = &self.dispatcher {
                dispatcher.send(info);
            }
        }
    }
}

/// Handle onto one named lock in a [`LockTable`]
///
/// The handle is the witness of the acquire/release protocol: it starts
/// `Initialized`, blocks to `Acquired`, and is spent once `Released`.
/// Calling a transition from the wrong state panics - misuse of the
/// protocol is a bug in the caller, not a recoverable condition.
pub struct NamedLock {
    table: Arc<LockTable>,
    name: String,
    owner: Option<ThreadId>,
    state: HandleState,
}

impl NamedLock {
    /// Create a handle in the `Initialized` state, acquiring nothing yet
    pub fn new<S: Into<String>>(table: &Arc<LockTable>, name: S) -> Self {
        NamedLock {
            table: Arc::clone(table),
            name: name.into(),
            owner: None,
            state: HandleState::Initialized,
        }
    }

    /// Create a handle and immediately block to acquire it
    pub fn acquire_on<S: Into<String>>(table: &Arc<LockTable>, name: S) -> Self {
        let mut lock = Self::new(table, name);
        lock.acquire();
        lock
    }

    /// The name this handle binds
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current point in the handle lifecycle
    pub fn state(&self) -> HandleState {
        self.state
    }

    /// Block until the name is granted to the calling thread
    ///
    /// # Panics
    /// Panics unless the handle is `Initialized`, or if the calling
    /// thread already holds the name through another handle.
    pub fn acquire(&mut self) {
        self.assert_can_acquire();
        let owner = get_current_thread_id();
        self.table.block_until_granted(owner, &self.name);
        self.owner = Some(owner);
        self.state = HandleState::Acquired;
    }

    /// Acquire the name only if that needs no waiting
    ///
    /// Returns `true` and moves to `Acquired` on success; on failure the
    /// handle stays `Initialized` and may still be acquired later. A
    /// name the calling thread already holds through another handle is
    /// simply busy here: the attempt returns `false` instead of
    /// panicking the way [`acquire`](Self::acquire) does.
    ///
    /// # Panics
    /// Panics unless the handle is `Initialized`.
    pub fn try_acquire(&mut self) -> bool {
        self.assert_can_acquire();
        let owner = get_current_thread_id();
        if self.table.try_take(owner, &self.name) {
            self.owner = Some(owner);
            self.state = HandleState::Acquired;
            true
        } else {
            false
        }
    }

    /// Give the name back and wake whoever queued behind it
    ///
    /// Synchronous: when this returns the name is free (or already
    /// granted to the next waiter). The handle is spent afterwards.
    ///
    /// # Panics
    /// Panics unless the handle is `Acquired`.
    pub fn release(&mut self) {
        if self.state != HandleState::Acquired {
            panic!("named lock '{}' is not acquired", self.name);
        }
        if let Some(owner) = self.owner.take() {
            self.table.release_entry(owner, &self.name);
        }
        self.state = HandleState::Released;
    }

    fn assert_can_acquire(&self) {
        match self.state {
            HandleState::Initialized => {}
            HandleState::Acquired => {
                panic!("named lock '{}' is already acquired", self.name)
            }
            HandleState::Released => {
                panic!("named lock '{}' has already been released", self.name)
            }
        }
    }
}

impl Drop for NamedLock {
    fn drop(&mut self) {
        // Explicit release() is the protocol; this only cleans up after a
        // thread that panicked or bailed while still holding the name.
        if self.state == HandleState::Acquired
            && let Some(owner) = self.owner.take()
        {
            self.table.release_entry(owner, &self.name);
        }
    }
}

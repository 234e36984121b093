//! Wait-for graph over philosopher threads
//!
//! Directed graph recording which blocked thread is waiting for which
//! holding thread. The lock table updates it under its own mutex, so the
//! graph always mirrors the true waiting relationships: an edge exists
//! exactly while its source thread is blocked behind its target.
//!
//! Two mappings are kept so that both edge insertion and waiter rewiring
//! stay cheap:
//! 1. Forward (`edges`): thread A -> set of threads A waits for. Drives
//!    cycle detection (BFS).
//! 2. Reverse (`incoming_edges`): thread B -> set of threads waiting for
//!    B. Lets a release drop all edges onto the old holder without
//!    scanning the whole graph.
//!
//! Before an edge `A -> B` is inserted, the graph checks for an existing
//! path `B -> A`. Finding one means the new edge would close a cycle:
//! every thread on that path is blocked behind the next one, forever.

use crate::core::types::ThreadId;
use fxhash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// Directed graph of thread wait relationships
pub struct WaitForGraph {
    /// Outgoing edges: who each thread is waiting for
    edges: FxHashMap<ThreadId, FxHashSet<ThreadId>>,

    /// Incoming edges: who is waiting for each thread
    incoming_edges: FxHashMap<ThreadId, FxHashSet<ThreadId>>,

    // Cached buffers for BFS to avoid repeated allocations
    bfs_queue: VecDeque<ThreadId>,
    bfs_visited: FxHashSet<ThreadId>,
    bfs_parent: FxHashMap<ThreadId, ThreadId>,
}

impl Default for WaitForGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitForGraph {
    /// Create a new empty wait-for graph
    pub fn new() -> Self {
        Self {
            edges: FxHashMap::default(),
            incoming_edges: FxHashMap::default(),
            bfs_queue: VecDeque::with_capacity(16),
            bfs_visited: FxHashSet::default(),
            bfs_parent: FxHashMap::default(),
        }
    }

    /// Add a directed edge: `from` thread waits for `to` thread
    ///
    /// # Returns
    /// * `Some(cycle)` - the closed cycle, if inserting the edge would
    ///   create one. The edge is *not* inserted in that case; the cycle
    ///   starts at `to` and ends at `from`.
    /// * `None` - edge inserted (or already present), no cycle.
    pub fn add_edge(&mut self, from: ThreadId, to: ThreadId) -> Option<Vec<ThreadId>> {
        // Skip the BFS if the edge already exists
        if let Some(targets) = self.edges.get(&from)
            && targets.contains(&to)
        {
            return None;
        }

        // A cycle closes iff a path already runs from `to` back to `from`
        if let Some(path) = self.find_path(to, from) {
            return Some(path);
        }

        self.edges.entry(from).or_default().insert(to);
        self.incoming_edges.entry(to).or_default().insert(from);

        None
    }

    /// Remove the edge `from` -> `to` if present
    ///
    /// Called when the target releases the lock the source was queued
    /// behind: the source is still blocked, but no longer on `to`.
    pub fn remove_edge(&mut self, from: ThreadId, to: ThreadId) {
        if let Some(neighbors) = self.edges.get_mut(&from)
            && neighbors.remove(&to)
        {
            if neighbors.is_empty() {
                self.edges.remove(&from);
            }

            if let Some(waiters) = self.incoming_edges.get_mut(&to) {
                waiters.remove(&from);
                if waiters.is_empty() {
                    self.incoming_edges.remove(&to);
                }
            }
        }
    }

    /// Drop all outgoing edges of a thread
    ///
    /// Called when the thread is granted the lock it was blocked on and
    /// stops waiting altogether.
    pub fn clear_wait_edges(&mut self, thread_id: ThreadId) {
        if let Some(targets) = self.edges.remove(&thread_id) {
            for target in targets {
                if let Some(waiters) = self.incoming_edges.get_mut(&target) {
                    waiters.remove(&thread_id);
                    if waiters.is_empty() {
                        self.incoming_edges.remove(&target);
                    }
                }
            }
        }
    }

    /// Find a path from start to target using BFS
    ///
    /// Used internally for cycle detection.
    fn find_path(&mut self, start: ThreadId, target: ThreadId) -> Option<Vec<ThreadId>> {
        if start == target {
            return Some(vec![start]);
        }

        // Reuse cached buffers
        self.bfs_queue.clear();
        self.bfs_visited.clear();
        self.bfs_parent.clear();

        self.bfs_queue.push_back(start);
        self.bfs_visited.insert(start);

        while let Some(current) = self.bfs_queue.pop_front() {
            if current == target {
                // Reconstruct path
                let mut path = Vec::with_capacity(self.bfs_parent.len() + 1);
                let mut curr = target;
                path.push(curr);
                while let Some(&p) = self.bfs_parent.get(&curr) {
                    path.push(p);
                    curr = p;
                }
                path.reverse();
                return Some(path);
            }

            if let Some(neighbors) = self.edges.get(&current) {
                for &neighbor in neighbors {
                    if self.bfs_visited.insert(neighbor) {
                        self.bfs_parent.insert(neighbor, current);
                        self.bfs_queue.push_back(neighbor);
                    }
                }
            }
        }

        None
    }
}

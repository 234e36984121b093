//! The naive seating plan: left fork first, then right

use super::ForkAccess;
use crate::core::types::ForkId;

/// Grab the left fork, then the right, forever
///
/// Symmetric and intuitive, and exactly wrong: when every seat holds its
/// left fork at once, each one blocks on a neighbour and the ring waits
/// on itself. The optional startup stagger spreads the first grabs out
/// in time, which makes that collision rarer but cannot rule it out.
pub struct LeftRightStrategy {
    access: ForkAccess,
    left: ForkId,
    right: ForkId,
    wait_on_init: bool,
}

impl LeftRightStrategy {
    pub(crate) fn new(access: ForkAccess, left: ForkId, right: ForkId, wait_on_init: bool) -> Self {
        LeftRightStrategy {
            access,
            left,
            right,
            wait_on_init,
        }
    }

    pub(crate) fn waits_on_init(&self) -> bool {
        self.wait_on_init
    }

    /// Eat forever; never returns
    ///
    /// Each round: left fork, right fork, hold, give the right back,
    /// give the left back, breathe. Deadlock shows up as a round that
    /// never gets past the right fork.
    pub fn run(self) -> ! {
        if self.wait_on_init {
            self.access.tempo().startup_jitter();
        }
        loop {
            let left = self.access.get_fork(self.left, 0);
            let right = self.access.get_fork(self.right, 1);

            self.access.tempo().hold();

            self.access.release_fork(self.right, right);
            self.access.release_fork(self.left, left);

            self.access.tempo().interval();
        }
    }
}

//! The disciplined seating plan: forks in global id order

use super::ForkAccess;
use crate::core::types::ForkId;

/// Grab both forks lowest-id-first, forever
///
/// The pair is ranked once at assembly: `first` is the smaller fork id,
/// `last` the larger. Because every seat obeys the same global order, no
/// thread ever holds a higher-ranked fork while waiting on a lower one,
/// and a circular wait cannot assemble for any ring size. Around the
/// wrap of the ring this looks asymmetric on purpose: the two seats
/// flanking fork 0 both reach for fork 0 first and serialize there
/// instead of deadlocking.
pub struct OrderingStrategy {
    access: ForkAccess,
    first: ForkId,
    last: ForkId,
}

impl OrderingStrategy {
    pub(crate) fn new(access: ForkAccess, left: ForkId, right: ForkId) -> Self {
        OrderingStrategy {
            access,
            first: left.min(right),
            last: left.max(right),
        }
    }

    /// Eat forever; never returns
    ///
    /// Each round: lower fork, higher fork, hold, give the higher back,
    /// give the lower back, breathe.
    pub fn run(self) -> ! {
        loop {
            let first = self.access.get_fork(self.first, 0);
            let last = self.access.get_fork(self.last, 1);

            self.access.tempo().hold();

            self.access.release_fork(self.last, last);
            self.access.release_fork(self.first, first);

            self.access.tempo().interval();
        }
    }
}

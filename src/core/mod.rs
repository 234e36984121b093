// Core types
pub mod types;
pub use types::*;

// Named locks and the table registry
pub mod lock;
pub use lock::{HandleState, LockTable, NamedLock};

// Wait-for graph backing the deadlock watch
pub mod graph;

// Meal pacing
pub mod tempo;
pub use tempo::{RandomTempo, Tempo, TempoConfig};

// Seating plans
pub mod strategy;
pub use strategy::{
    LeftRightStrategy, OrderingStrategy, ReportFork, Strategy, StrategyKind, StrategyOptions,
};

// Ring wiring and the running session
pub mod dinner;
pub use dinner::{Dinner, Philosopher};

// Timeline logging
pub mod logger;
pub use logger::EventLogger;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::thread;

type ForkObserver = Arc<dyn Fn(ForkId, Option<OwnerInfo>) + Send + Sync + 'static>;

enum StrategySelection {
    Kind(StrategyKind),
    Named(String),
}

/// Forklore dinner configuration
///
/// Builder for a table: pick the seat count, the seating plan, the
/// pacing, and the observers, then call [`serve`](Forklore::serve) to
/// spawn the philosophers.
pub struct Forklore {
    seats: usize,
    strategy: StrategySelection,
    tempo: Option<Arc<dyn Tempo>>,
    observer: Option<ForkObserver>,
    on_deadlock: Option<Box<dyn Fn(DeadlockInfo) + Send + 'static>>,
    log_path: Option<String>,
}

impl Default for Forklore {
    fn default() -> Self {
        Self::new()
    }
}

impl Forklore {
    /// Create a new Forklore with default settings
    ///
    /// By default:
    /// - Five seats
    /// - The deadlock-free `ordering` plan
    /// - Random 400-800 ms pacing
    /// - No fork observer, no deadlock watcher, no timeline log
    pub fn new() -> Self {
        Forklore {
            seats: 5,
            strategy: StrategySelection::Kind(StrategyKind::Ordering),
            tempo: None,
            observer: None,
            on_deadlock: None,
            log_path: None,
        }
    }

    /// Set the number of seats (and forks) at the table
    ///
    /// A ring needs at least two seats; fewer fails at
    /// [`serve`](Forklore::serve).
    pub fn seats(mut self, seats: usize) -> Self {
        self.seats = seats;
        self
    }

    /// Pick the seating plan every philosopher follows
    pub fn strategy(mut self, kind: StrategyKind) -> Self {
        self.strategy = StrategySelection::Kind(kind);
        self
    }

    /// Pick the seating plan by configuration string
    ///
    /// Accepted names are `"left-right"`, `"left-right-wait"` and
    /// `"ordering"`. An unknown name is a configuration error reported
    /// by [`serve`](Forklore::serve), never silently replaced.
    pub fn strategy_named<S: Into<String>>(mut self, name: S) -> Self {
        self.strategy = StrategySelection::Named(name.into());
        self
    }

    /// Replace the default random pacing
    ///
    /// The tempo is shared by every seat, which is what lets a test
    /// tempo rendezvous all philosophers at one instant.
    pub fn tempo<T: Tempo + 'static>(mut self, tempo: T) -> Self {
        self.tempo = Some(Arc::new(tempo));
        self
    }

    /// Observe every fork hold and release
    ///
    /// The observer receives the fork id and `Some(owner)` when a seat
    /// takes it, `None` when the seat reports it free. It runs
    /// synchronously on the philosopher threads and must not block;
    /// a panic inside it is fatal to that philosopher.
    pub fn observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(ForkId, Option<OwnerInfo>) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Set a callback to be invoked when the table deadlocks
    ///
    /// # Arguments
    /// * `callback` - Function to call with the detected cycle; it runs
    ///   on a background thread, never on a philosopher thread
    ///
    /// # Returns
    /// The builder for method chaining
    pub fn on_deadlock<F>(mut self, callback: F) -> Self
    where
        F: Fn(DeadlockInfo) + Send + 'static,
    {
        self.on_deadlock = Some(Box::new(callback));
        self
    }

    /// Activate the timeline log and set the path for the log file
    ///
    /// # Arguments
    /// * `path` - Path to the log file. If the path contains
    ///   "{timestamp}", it will be replaced with the current timestamp.
    ///
    /// # Returns
    /// The builder for method chaining
    pub fn with_log<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.log_path = Some(path.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Seat the philosophers and start the dinner
    ///
    /// Spawns one named thread per seat; the threads run forever.
    ///
    /// # Errors
    /// Returns an error if the table has fewer than two seats, the
    /// configured strategy name is unknown, the log file could not be
    /// created, or a philosopher thread could not be spawned.
    pub fn serve(self) -> Result<Dinner> {
        if self.seats < 2 {
            anyhow::bail!("a table needs at least 2 seats, got {}", self.seats);
        }

        let kind = match self.strategy {
            StrategySelection::Kind(kind) => kind,
            StrategySelection::Named(name) => StrategyKind::parse(&name)
                .ok_or_else(|| anyhow::anyhow!("unknown strategy '{name}'"))?,
        };

        let logger = match &self.log_path {
            Some(path) => Some(Arc::new(
                EventLogger::with_file(path).context("Failed to initialize logger")?,
            )),
            None => None,
        };

        let table = Arc::new(match self.on_deadlock {
            Some(callback) => LockTable::with_watcher(callback),
            None => LockTable::new(),
        });

        let tempo: Arc<dyn Tempo> = self
            .tempo
            .unwrap_or_else(|| Arc::new(RandomTempo::new()));
        let observer: ForkObserver = self.observer.unwrap_or_else(|| Arc::new(|_, _| {}));

        // Print header
        println!("{}", crate::BANNER);

        let mut philosophers = Vec::with_capacity(self.seats);
        for seat in 0..self.seats {
            let place = Philosopher::new(seat, self.seats);

            // Translate the strategy's bool reports into owner identities
            let observer = Arc::clone(&observer);
            let report: ReportFork = Box::new(move |fork, held| {
                observer(fork, held.then_some(OwnerInfo { seat }));
            });

            let options = StrategyOptions {
                left: place.left(),
                right: place.right(),
                report,
            };
            let strategy = Strategy::build(
                kind,
                seat,
                &table,
                options,
                Arc::clone(&tempo),
                logger.clone(),
            );

            let handle = thread::Builder::new()
                .name(format!("philosopher-{seat}"))
                .spawn(move || {
                    strategy.run();
                })
                .with_context(|| format!("Failed to seat philosopher {seat}"))?;
            philosophers.push(handle);
        }

        Ok(Dinner::new(table, kind, logger, philosophers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve_error(builder: Forklore) -> String {
        match builder.serve() {
            Ok(_) => panic!("expected serve() to fail"),
            Err(err) => err.to_string(),
        }
    }

    #[test]
    fn test_serve_rejects_tables_below_two_seats() {
        for seats in [0, 1] {
            let message = serve_error(Forklore::new().seats(seats));
            assert!(message.contains("at least 2 seats"), "got: {message}");
        }
    }

    #[test]
    fn test_serve_rejects_unknown_strategy_names() {
        let message = serve_error(Forklore::new().strategy_named("family-style"));
        assert!(message.contains("unknown strategy 'family-style'"));
    }

    #[test]
    fn test_later_strategy_choice_wins() {
        // A named pick after a typed one must still be resolved (and
        // rejected when unknown)
        let message = serve_error(
            Forklore::new()
                .strategy(StrategyKind::Ordering)
                .strategy_named("banquet"),
        );
        assert!(message.contains("unknown strategy"));
    }
}

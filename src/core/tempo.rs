//! Meal pacing for philosophers
//!
//! Every pause a philosopher takes goes through the [`Tempo`] trait:
//! the optional startup stagger, the moment right before each fork grab,
//! the meal itself, and the breather between rounds. The dinner shares
//! one tempo across all seats, so a purpose-built implementation can
//! line threads up at the exact interleaving it wants to provoke -
//! that is how the deterministic deadlock tests work.
//!
//! [`RandomTempo`] is the production pacing: uniform random pauses,
//! with an optional random preemption right before fork grabs to shake
//! schedules apart.

use crate::core::types::ForkId;
use rand::{Rng, rng};
use std::thread;
use std::time::Duration;

/// Pause points in a philosopher's round
pub trait Tempo: Send + Sync {
    /// One-time pause before the first round
    ///
    /// Only strategies configured with a startup stagger call this.
    fn startup_jitter(&self) {}

    /// Runs immediately before each blocking fork acquisition
    ///
    /// `holding` counts the forks the seat already has, so an
    /// implementation can single out the dangerous second grab.
    fn before_fork(&self, _fork: ForkId, _holding: usize) {}

    /// Both forks held; the meal
    fn hold(&self);

    /// No forks held; the pause between rounds
    fn interval(&self);
}

/// Configuration for [`RandomTempo`]
#[derive(Debug, Clone)]
pub struct TempoConfig {
    /// Minimum pause in milliseconds
    pub min_delay_ms: u64,
    /// Maximum pause in milliseconds
    pub max_delay_ms: u64,
    /// Probability (0.0-1.0) of an extra pause right before a fork grab
    pub grab_probability: f64,
    /// Upper bound of that extra pause in milliseconds
    pub grab_max_delay_ms: u64,
}

impl Default for TempoConfig {
    fn default() -> Self {
        TempoConfig {
            min_delay_ms: 400,
            max_delay_ms: 800,
            grab_probability: 0.0,
            grab_max_delay_ms: 0,
        }
    }
}

/// Tempo drawing every pause uniformly from a configured band
pub struct RandomTempo {
    config: TempoConfig,
}

impl Default for RandomTempo {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomTempo {
    /// Random pacing with the default 400-800 ms band and no preemption
    pub fn new() -> Self {
        Self::with_config(TempoConfig::default())
    }

    pub fn with_config(config: TempoConfig) -> Self {
        RandomTempo { config }
    }

    fn pause(&self) {
        apply_delay(self.config.min_delay_ms, self.config.max_delay_ms);
    }
}

impl Tempo for RandomTempo {
    fn startup_jitter(&self) {
        self.pause();
    }

    fn before_fork(&self, _fork: ForkId, _holding: usize) {
        if self.config.grab_probability <= 0.0 {
            return;
        }
        let mut rng = rng();
        if rng.random::<f64>() < self.config.grab_probability {
            let delay_ms = rng.random_range(0..=self.config.grab_max_delay_ms);
            thread::sleep(Duration::from_millis(delay_ms));
        }
    }

    fn hold(&self) {
        self.pause();
    }

    fn interval(&self) {
        self.pause();
    }
}

/// Sleep for a duration drawn uniformly from `min_ms..=max_ms`
pub fn apply_delay(min_ms: u64, max_ms: u64) {
    let delay_ms = if min_ms == max_ms {
        min_ms
    } else {
        rng().random_range(min_ms..=max_ms)
    };
    thread::sleep(Duration::from_millis(delay_ms));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_default_band_matches_the_classic_demo() {
        let config = TempoConfig::default();
        assert_eq!(config.min_delay_ms, 400);
        assert_eq!(config.max_delay_ms, 800);
        assert_eq!(config.grab_probability, 0.0);
    }

    #[test]
    fn test_apply_delay_respects_the_lower_bound() {
        let start = Instant::now();
        apply_delay(10, 20);
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn test_zero_grab_probability_returns_immediately() {
        let tempo = RandomTempo::with_config(TempoConfig {
            min_delay_ms: 1,
            max_delay_ms: 1,
            grab_probability: 0.0,
            grab_max_delay_ms: 10_000,
        });

        let start = Instant::now();
        tempo.before_fork(0, 1);
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}

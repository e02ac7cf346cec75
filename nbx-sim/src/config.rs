//! # Fabric Configuration
//!
//! Time in the simulated fabric is counted in ticks. A tick passes every time
//! a simulated process waits for progress, so latencies are expressed as
//! "how many idle polls before the message shows up".
//!
//! | Behaviour | Config Field | Default | What it exercises |
//! |-----------|--------------|---------|-------------------|
//! | Message latency | `latency_ticks` | 0-4 ticks | Arrival order across sources |
//! | Barrier exit skew | `barrier_skew_ticks` | 0-3 ticks | Processes leaving an epoch at different times |
//! | Watchdog | `max_ticks` | 1,000,000 | Hangs turned into reported failures |
//!
//! ## Configuration Examples
//!
//! ```rust
//! use nbx_sim::FabricConfig;
//!
//! // Messages show up on the next poll, barrier exits are simultaneous.
//! let config = FabricConfig::fast_local();
//! assert_eq!(config.latency_ticks, 0..1);
//!
//! // Parameters drawn from a seed.
//! let config = FabricConfig::random_for_seed(42);
//! assert_eq!(config, FabricConfig::random_for_seed(42));
//! ```

use std::ops::Range;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Configuration of a simulated fabric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FabricConfig {
    /// Ticks a message spends in flight before it can be probed or received.
    pub latency_ticks: Range<u64>,
    /// Extra ticks, drawn per process, before a completed barrier is observed.
    pub barrier_skew_ticks: Range<u64>,
    /// Ticks after which the watchdog aborts the group.
    pub max_ticks: u64,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            latency_ticks: 0..5,
            barrier_skew_ticks: 0..4,
            max_ticks: 1_000_000,
        }
    }
}

impl FabricConfig {
    /// No latency and no barrier skew.
    pub fn fast_local() -> Self {
        Self {
            latency_ticks: 0..1,
            barrier_skew_ticks: 0..1,
            ..Self::default()
        }
    }

    /// Wide latency and skew ranges, reordering messages aggressively.
    pub fn chaotic() -> Self {
        Self {
            latency_ticks: 0..64,
            barrier_skew_ticks: 0..32,
            ..Self::default()
        }
    }

    /// Parameters drawn deterministically from `seed`.
    pub fn random_for_seed(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let latency_max = rng.random_range(1..48);
        let skew_max = rng.random_range(1..24);
        Self {
            latency_ticks: 0..latency_max,
            barrier_skew_ticks: 0..skew_max,
            ..Self::default()
        }
    }

    /// Set the message latency range.
    pub fn with_latency_ticks(mut self, latency_ticks: Range<u64>) -> Self {
        self.latency_ticks = latency_ticks;
        self
    }

    /// Set the barrier exit skew range.
    pub fn with_barrier_skew_ticks(mut self, barrier_skew_ticks: Range<u64>) -> Self {
        self.barrier_skew_ticks = barrier_skew_ticks;
        self
    }

    /// Set the watchdog budget.
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }
}

/// Sample `range`, returning its start when it is empty.
pub(crate) fn sample_range(rng: &mut ChaCha8Rng, range: &Range<u64>) -> u64 {
    if range.start >= range.end {
        range.start
    } else {
        rng.random_range(range.clone())
    }
}

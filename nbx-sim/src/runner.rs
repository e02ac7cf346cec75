//! Running a simulated group.
//!
//! [`SimCluster`] spawns one task per rank on a single-threaded local
//! executor, all sharing one [`SimFabric`]. Given the same seed and workload,
//! a run is fully reproducible.
//!
//! ```
//! use nbx_core::Transport;
//! use nbx_sim::SimCluster;
//!
//! let outcome = SimCluster::new(3)
//!     .seed(7)
//!     .run(|transport| async move { transport.rank() * 10 })
//!     .expect("run");
//! assert_eq!(outcome.results, vec![0, 10, 20]);
//! ```

use std::future::Future;

use nbx_core::{Rank, Transport};
use tracing::{debug, instrument};

use crate::{FabricConfig, FabricStats, SimError, SimFabric, SimResult, SimTransport};

/// Result of a simulated run.
#[derive(Debug)]
pub struct SimOutcome<R> {
    /// Value returned by every rank, in rank order.
    pub results: Vec<R>,
    /// Fabric counters at the end of the run.
    pub stats: FabricStats,
    /// Ticks elapsed.
    pub ticks: u64,
    /// Seed of the run.
    pub seed: u64,
    /// Abort reason, if the group was aborted.
    pub aborted: Option<String>,
}

/// Builder for a simulated group of processes.
#[derive(Debug, Clone)]
pub struct SimCluster {
    size: usize,
    seed: u64,
    config: FabricConfig,
}

impl SimCluster {
    /// Group of `size` processes with seed 0 and the default configuration.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            seed: 0,
            config: FabricConfig::default(),
        }
    }

    /// Set the seed driving latencies and barrier skew.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the fabric configuration.
    pub fn config(mut self, config: FabricConfig) -> Self {
        self.config = config;
        self
    }

    /// Run `workload` once per rank and wait for every rank to finish.
    ///
    /// A rank that panics aborts the group, so the others fail instead of
    /// waiting forever; the panic is reported as [`SimError::RankPanicked`].
    #[instrument(skip(self, workload), fields(size = self.size, seed = self.seed))]
    pub fn run<F, Fut, R>(self, workload: F) -> SimResult<SimOutcome<R>>
    where
        F: Fn(SimTransport) -> Fut,
        Fut: Future<Output = R> + 'static,
        R: 'static,
    {
        if self.size == 0 {
            return Err(SimError::EmptyGroup);
        }

        let runtime = tokio::runtime::Builder::new_current_thread().build()?;
        let local = tokio::task::LocalSet::new();
        let fabric = SimFabric::new(self.size, self.seed, self.config);

        let results = local.block_on(&runtime, async {
            let handles: Vec<_> = fabric
                .endpoints()
                .into_iter()
                .map(|transport| {
                    let guard = AbortOnDrop::new(fabric.clone(), transport.rank());
                    let work = workload(transport);
                    tokio::task::spawn_local(async move {
                        let mut guard = guard;
                        let result = work.await;
                        guard.disarm();
                        result
                    })
                })
                .collect();

            let mut results = Vec::with_capacity(handles.len());
            for (rank, handle) in handles.into_iter().enumerate() {
                match handle.await {
                    Ok(result) => results.push(result),
                    Err(err) => {
                        return Err(SimError::RankPanicked {
                            rank,
                            message: err.to_string(),
                        })
                    }
                }
            }
            Ok(results)
        })?;

        debug!(ticks = fabric.tick(), stats = ?fabric.stats(), "simulation finished");
        Ok(SimOutcome {
            results,
            stats: fabric.stats(),
            ticks: fabric.tick(),
            seed: self.seed,
            aborted: fabric.abort_reason(),
        })
    }
}

/// Aborts the group if a rank's task is dropped before finishing.
struct AbortOnDrop {
    fabric: SimFabric,
    rank: Rank,
    armed: bool,
}

impl AbortOnDrop {
    fn new(fabric: SimFabric, rank: Rank) -> Self {
        Self {
            fabric,
            rank,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.fabric.abort(self.rank, "process task ended without finishing");
        }
    }
}

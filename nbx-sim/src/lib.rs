//! # nbx-sim
//!
//! Deterministic simulated message-passing fabric for testing nbx.
//!
//! A sparse data exchange is only correct if it survives every arrival order
//! the network can produce. This crate runs a whole process group inside one
//! thread and lets a seeded generator decide when each message shows up:
//!
//! - **Reproducible**: the same seed replays the same arrival order
//! - **Adversarial**: latencies reorder messages across sources, barrier
//!   skew makes processes leave an epoch at different times
//! - **Bounded**: a watchdog aborts groups that never finish
//!
//! ## Core Components
//!
//! - [`SimFabric`]: shared mailboxes, requests, barrier rounds and clock
//! - [`SimTransport`]: one rank's [`Transport`](nbx_core::Transport) endpoint
//! - [`SimCluster`]: runs one task per rank and collects their results
//! - [`FabricConfig`]: latency, skew and watchdog settings
//!
//! ## Semantics
//!
//! | Property | Guarantee |
//! |----------|-----------|
//! | Per-pair order | messages between two ranks are matched in send order |
//! | Cross-source order | decided by the seed |
//! | Send completion | only once the destination matched the message |
//! | Barrier | completes when all ranks entered; observed after per-rank skew |
//! | Abort | every later operation of every rank fails |

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

mod config;
mod error;
mod fabric;
mod runner;
mod transport;

// Configuration exports
pub use config::FabricConfig;

// Fabric exports
pub use fabric::{FabricStats, SimFabric};
pub use transport::SimTransport;

// Runner exports
pub use runner::{SimCluster, SimOutcome};

// Error exports
pub use error::{SimError, SimResult};

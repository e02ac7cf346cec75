//! Error types for simulation runs.

use nbx_core::Rank;
use thiserror::Error;

/// Errors that can occur while setting up or running a simulated group.
#[derive(Debug, Error)]
pub enum SimError {
    /// A group needs at least one process.
    #[error("a simulated group needs at least one process")]
    EmptyGroup,

    /// An endpoint was requested for a rank outside the group.
    #[error("rank {rank} is out of range for a group of {size}")]
    InvalidRank {
        /// The requested rank.
        rank: Rank,
        /// Number of processes in the group.
        size: usize,
    },

    /// The async runtime could not be built.
    #[error("failed to build simulation runtime: {0}")]
    Runtime(#[from] std::io::Error),

    /// A simulated process panicked.
    #[error("rank {rank} panicked: {message}")]
    RankPanicked {
        /// Rank of the process that panicked.
        rank: Rank,
        /// Panic description.
        message: String,
    },
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;

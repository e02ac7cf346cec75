//! Error types for the exchange engine and the collectives.

use std::panic::Location;

use nbx_core::{Rank, TransportError};
use nbx_pack::PackError;
use thiserror::Error;

/// Errors returned by [`NbxEngine`](crate::NbxEngine) and [`Cluster`](crate::Cluster).
///
/// Only [`NbxError::Transport`] and [`NbxError::AllocationTooSmall`] come from
/// the running exchange; by the time they are returned the group has already
/// been aborted. Every other variant is a usage error detected before anything
/// was posted.
#[derive(Debug, Error)]
pub enum NbxError {
    /// A substrate call failed. The group was aborted.
    #[error("{op} failed at {location}: {source}")]
    Transport {
        /// Substrate operation that failed.
        op: &'static str,
        /// Call site in the engine.
        location: &'static Location<'static>,
        /// Error reported by the substrate.
        #[source]
        source: TransportError,
    },

    /// The engine still holds requests from an exchange that never finished.
    #[error("{count} requests from a previous exchange are still outstanding")]
    OutstandingRequests {
        /// Number of outstanding requests.
        count: usize,
    },

    /// Two lists that must line up have different lengths.
    #[error("{what}: expected {expected} entries, got {actual}")]
    LengthMismatch {
        /// The list that does not match.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// A rank outside the group was named.
    #[error("rank {rank} is out of range for a group of {size}")]
    InvalidRank {
        /// The rank that was named.
        rank: Rank,
        /// Number of processes in the group.
        size: usize,
    },

    /// More messages than an epoch has data tags.
    #[error("{count} messages exceed the {limit} tags of an epoch")]
    TooManyMessages {
        /// Number of messages posted.
        count: usize,
        /// Data tags available per epoch.
        limit: usize,
    },

    /// The receive allocator returned a buffer smaller than the message.
    #[error("buffer of {allocated} bytes for a {needed} byte message from rank {from_rank}")]
    AllocationTooSmall {
        /// Sender of the message.
        from_rank: Rank,
        /// Message size.
        needed: usize,
        /// Size of the returned buffer.
        allocated: usize,
    },

    /// The engine configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The engine was driven out of order.
    #[error("invalid engine state: {message}")]
    InvalidState {
        /// What was attempted.
        message: String,
    },

    /// Packing or unpacking a payload failed.
    #[error(transparent)]
    Pack(#[from] PackError),
}

impl NbxError {
    /// Whether the group was aborted because of this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NbxError::Transport { .. } | NbxError::AllocationTooSmall { .. }
        )
    }
}

/// Result type for engine and collective operations.
pub type NbxResult<T> = Result<T, NbxError>;

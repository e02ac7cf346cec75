//! Message-passing substrate abstraction.
//!
//! The exchange engine never talks to a network directly. It drives a
//! [`Transport`], which offers exactly the primitives a sparse data exchange
//! needs: non-blocking point-to-point operations, an asynchronous probe, a
//! non-blocking barrier, and completion tests.

use std::ops::Range;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::{Rank, RequestId, Tag};

/// Errors reported by a message-passing substrate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// A rank outside the group was addressed.
    #[error("rank {rank} is out of range for a group of {size}")]
    InvalidRank {
        /// The rank that was addressed.
        rank: Rank,
        /// Number of processes in the group.
        size: usize,
    },

    /// The request is unknown, already retired, or owned by another rank.
    #[error("unknown request {0}")]
    UnknownRequest(RequestId),

    /// An incoming message does not fit the receive buffer.
    #[error("message of {needed} bytes does not fit a {available} byte receive buffer")]
    Truncated {
        /// Size of the incoming message.
        needed: usize,
        /// Capacity of the posted buffer.
        available: usize,
    },

    /// The group was aborted, by this process or by a peer.
    #[error("group aborted: {reason}")]
    Aborted {
        /// Reason given by the process that aborted.
        reason: String,
    },

    /// Any other substrate failure.
    #[error("transport failure: {message}")]
    Failed {
        /// Details about the failure.
        message: String,
    },
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Envelope of a message found by [`Transport::probe_any`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    /// Rank that sent the message.
    pub source: Rank,
    /// Tag the message was sent with.
    pub tag: Tag,
    /// Exact payload size in bytes.
    pub size: usize,
}

/// Outcome of a completed request, returned once by [`Transport::test`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// A send was matched by its receiver.
    Sent,
    /// A posted receive was filled. The buffer is truncated to the message size.
    Received(Vec<u8>),
    /// This process observed the barrier as globally complete.
    Barrier,
}

/// Message-passing substrate driven by the exchange engine.
///
/// All `post_*`, probe and test operations are non-blocking. The only
/// suspension point is [`idle`](Transport::idle), which the engine awaits when
/// a polling round made no progress, letting the substrate (or the other
/// simulated processes) advance.
///
/// Single-core design - no Send bounds needed.
///
/// # Send semantics
///
/// A send request must complete only once the destination has matched the
/// message, either through [`recv_probed`](Transport::recv_probed) or a posted
/// receive. Eager completion would let a process enter the termination
/// barrier while its messages are still unmatched.
#[async_trait(?Send)]
pub trait Transport {
    /// Rank of this process.
    fn rank(&self) -> Rank;

    /// Number of processes in the group.
    fn size(&self) -> usize;

    /// Post a non-blocking synchronous send of `payload` to `dest`.
    fn post_send(&mut self, dest: Rank, tag: Tag, payload: Bytes) -> TransportResult<RequestId>;

    /// Post a non-blocking receive from `source` with `tag` into `buffer`.
    ///
    /// The message must fit the buffer; a larger message completes the
    /// request with [`TransportError::Truncated`].
    fn post_recv(&mut self, source: Rank, tag: Tag, buffer: Vec<u8>)
        -> TransportResult<RequestId>;

    /// Look for a pending message from any source whose tag lies in `tags`.
    ///
    /// Returns immediately. Messages from one source are reported in the
    /// order they were sent.
    fn probe_any(&mut self, tags: Range<Tag>) -> TransportResult<Option<Probe>>;

    /// Receive the message described by `probe` into `buffer`.
    ///
    /// The message is already present, so this completes without waiting.
    fn recv_probed(&mut self, probe: &Probe, buffer: &mut [u8]) -> TransportResult<()>;

    /// Enter a non-blocking barrier over the whole group.
    fn post_barrier(&mut self) -> TransportResult<RequestId>;

    /// Test a request, retiring it when complete.
    ///
    /// Returns `Ok(None)` while the request is pending. A completed request is
    /// reported exactly once; testing it again yields
    /// [`TransportError::UnknownRequest`].
    fn test(&mut self, request: RequestId) -> TransportResult<Option<Completion>>;

    /// Test every request in `requests`, removing the completed ones.
    ///
    /// Returns `true` once the list is empty. Completion payloads are dropped,
    /// so this is meant for sends and barriers.
    fn test_all(&mut self, requests: &mut Vec<RequestId>) -> TransportResult<bool> {
        let mut i = 0;
        while i < requests.len() {
            if self.test(requests[i])?.is_some() {
                requests.swap_remove(i);
            } else {
                i += 1;
            }
        }
        Ok(requests.is_empty())
    }

    /// Abort the whole group.
    ///
    /// After this call every operation of every process fails with
    /// [`TransportError::Aborted`]. Substrates without a recoverable notion of
    /// failure (MPI) terminate the processes instead of returning.
    fn abort(&mut self, reason: &str);

    /// Yield while waiting for progress.
    async fn idle(&mut self);
}

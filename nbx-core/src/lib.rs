//! # nbx-core
//!
//! Core abstractions shared by every nbx crate.
//!
//! This crate provides the vocabulary the exchange engine is written against:
//!
//! - **Identity types**: [`Rank`], [`Tag`] and [`RequestId`]
//! - **Substrate trait**: [`Transport`], the message-passing contract the
//!   engine drives (non-blocking send/receive, asynchronous probe, test, and a
//!   non-blocking barrier)
//! - **Errors**: [`TransportError`] for every substrate failure
//!
//! ## Transport implementations
//!
//! The trait lets the engine run unchanged on top of different substrates:
//!
//! - `SimTransport` (in nbx-sim): deterministic in-process fabric for tests
//! - An MPI binding or any other point-to-point layer implemented downstream
//!
//! ## Send semantics
//!
//! The exchange engine terminates an epoch with a barrier once all of its own
//! sends completed. That is only sound if a send completes when the receiver
//! has *matched* it (MPI `Issend` semantics), which every [`Transport`] must
//! honour.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

mod transport;
mod types;

// Transport exports
pub use transport::{Completion, Probe, Transport, TransportError, TransportResult};

// Core type exports
pub use types::{Rank, RequestId, Tag};

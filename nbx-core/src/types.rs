//! Identity types for processes, messages and outstanding operations.

use serde::{Deserialize, Serialize};

/// Identity of a process within the communicating group.
///
/// Ranks are dense: a group of `n` processes uses ranks `0..n`. A rank is
/// obtained once when the transport is created and never changes.
pub type Rank = usize;

/// Message tag used to partition traffic between exchange epochs.
pub type Tag = u32;

/// Handle of an in-flight non-blocking operation.
///
/// Returned by the `post_*` methods of a [`Transport`](crate::Transport) and
/// consumed by `test`. Identifiers are never reused by a transport.
///
/// # Examples
///
/// ```
/// use nbx_core::RequestId;
///
/// let id = RequestId::new(7);
/// assert_eq!(id.get(), 7);
/// assert_eq!(id.to_string(), "req#7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    /// Create a request identifier from its raw value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value of the identifier.
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

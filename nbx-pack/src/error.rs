//! Error types for packing and unpacking.

use thiserror::Error;

/// Errors that can occur while packing or unpacking a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackError {
    /// A write would run past the end of the pack buffer.
    #[error("pack buffer overflow: {requested} bytes at offset {offset} exceed capacity {capacity}")]
    Overflow {
        /// Allocation point at the time of the write.
        offset: usize,
        /// Bytes the write needed.
        requested: usize,
        /// Total capacity of the buffer.
        capacity: usize,
    },

    /// A read would run past the end of the source buffer.
    #[error("unpack past end: {needed} bytes at offset {offset}, buffer holds {len}")]
    Truncated {
        /// Cursor position at the time of the read.
        offset: usize,
        /// Bytes the read needed.
        needed: usize,
        /// Length of the source buffer.
        len: usize,
    },

    /// The size-request pass and the pack pass disagreed for one value.
    #[error("pack request {index} declared {declared} bytes but {written} were written")]
    SizeMismatch {
        /// Index of the request in the pack request table.
        index: usize,
        /// Size recorded by the size-request pass.
        declared: usize,
        /// Bytes actually written.
        written: usize,
    },

    /// More values were packed than the request table declared.
    #[error("pack request table exhausted after {requests} requests")]
    RequestsExhausted {
        /// Number of requests in the table.
        requests: usize,
    },

    /// Bytes were left over after unpacking a complete value.
    #[error("{remaining} trailing bytes after unpacking {consumed} bytes")]
    TrailingBytes {
        /// Bytes consumed by the value.
        consumed: usize,
        /// Bytes left unread.
        remaining: usize,
    },

    /// The bytes do not describe a valid value.
    #[error("invalid {what}: {detail}")]
    Invalid {
        /// What was being decoded.
        what: &'static str,
        /// Details about the failure.
        detail: String,
    },
}

impl PackError {
    pub(crate) fn invalid(what: &'static str, detail: impl Into<String>) -> Self {
        PackError::Invalid {
            what,
            detail: detail.into(),
        }
    }
}

/// Result type for pack operations.
pub type PackResult<T> = Result<T, PackError>;

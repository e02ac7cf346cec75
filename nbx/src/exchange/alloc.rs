//! Receive buffer allocation.

use nbx_core::{Rank, Tag};

/// Everything known about an incoming message when its buffer is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecvInfo {
    /// Exact payload size in bytes.
    pub size: usize,
    /// Bytes already accepted earlier in this epoch.
    pub total_size: usize,
    /// Number of messages expected in this epoch, when the mode knows it.
    pub total_senders: Option<usize>,
    /// Sender of the message.
    pub source: Rank,
    /// Index of this receive within the epoch, increasing from 0.
    pub request_index: usize,
    /// Tag relative to the start of the epoch.
    pub tag: Tag,
}

/// Provides the buffer each incoming message is received into.
///
/// The returned buffer must be at least [`RecvInfo::size`] bytes long;
/// anything shorter aborts the group. The engine truncates it to the
/// message size and hands it back through the
/// [`RecvTable`](crate::RecvTable).
///
/// Closures implement this trait, so per-call context is simply captured:
///
/// ```
/// use nbx::{RecvAllocator, RecvInfo};
///
/// let mut requested = 0;
/// let mut alloc = |info: &RecvInfo| {
///     requested += info.size;
///     vec![0u8; info.size]
/// };
/// # let info = RecvInfo { size: 4, total_size: 0, total_senders: None, source: 1, request_index: 0, tag: 0 };
/// # assert_eq!(alloc.allocate(&info).len(), 4);
/// ```
pub trait RecvAllocator {
    /// Buffer for the message described by `info`.
    fn allocate(&mut self, info: &RecvInfo) -> Vec<u8>;
}

impl<F> RecvAllocator for F
where
    F: FnMut(&RecvInfo) -> Vec<u8>,
{
    fn allocate(&mut self, info: &RecvInfo) -> Vec<u8> {
        self(info)
    }
}

/// Allocates a zeroed buffer of exactly the message size.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactAlloc;

impl RecvAllocator for ExactAlloc {
    fn allocate(&mut self, info: &RecvInfo) -> Vec<u8> {
        vec![0; info.size]
    }
}

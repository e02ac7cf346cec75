//! Messages received during one epoch.

use nbx_core::{Rank, Tag};

/// One received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecvEntry {
    /// Sender of the message.
    pub source: Rank,
    /// Tag relative to the epoch start, `None` for a locally inserted entry.
    pub tag: Option<Tag>,
    /// Position in arrival order.
    pub arrival: usize,
    /// Buffer returned by the allocator, possibly longer than the message.
    pub data: Vec<u8>,
    /// Message size in bytes.
    pub len: usize,
}

impl RecvEntry {
    /// The message bytes.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

/// Receive buffer table of one epoch.
///
/// Entries are stored in arrival order, which depends on the network.
/// [`reorder`](RecvTable::reorder) sorts them by `(source, tag)` with
/// untagged entries last, which is the same on every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecvTable {
    entries: Vec<RecvEntry>,
}

impl RecvTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message received from `source`.
    pub fn push(&mut self, source: Rank, tag: Option<Tag>, data: Vec<u8>, len: usize) {
        let arrival = self.entries.len();
        self.entries.push(RecvEntry {
            source,
            tag,
            arrival,
            data,
            len,
        });
    }

    /// Append a local contribution that did not cross the network.
    pub fn push_local(&mut self, source: Rank, tag: Option<Tag>, payload: &[u8]) {
        self.push(source, tag, payload.to_vec(), payload.len());
    }

    /// Stable sort by `(source, tag)`, untagged entries last.
    pub fn reorder(&mut self) {
        self.entries
            .sort_by_key(|entry| (entry.tag.is_none(), entry.source, entry.tag));
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no message was received.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the entries in their current order.
    pub fn iter(&self) -> std::slice::Iter<'_, RecvEntry> {
        self.entries.iter()
    }

    /// The entries in their current order.
    pub fn entries(&self) -> &[RecvEntry] {
        &self.entries
    }

    /// Take the entries.
    pub fn into_entries(self) -> Vec<RecvEntry> {
        self.entries
    }

    /// Source of every entry.
    pub fn sources(&self) -> Vec<Rank> {
        self.entries.iter().map(|entry| entry.source).collect()
    }

    /// Payload size of every entry.
    pub fn sizes(&self) -> Vec<usize> {
        self.entries.iter().map(|entry| entry.len).collect()
    }

    /// Sum of all payload sizes.
    pub fn total_bytes(&self) -> usize {
        self.entries.iter().map(|entry| entry.len).sum()
    }
}

impl<'a> IntoIterator for &'a RecvTable {
    type Item = &'a RecvEntry;
    type IntoIter = std::slice::Iter<'a, RecvEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

//! Pack request table, pack buffer and unpack cursor.
//!
//! Packing is two-phase. The size-request pass appends one byte count per
//! value to a [`PackRequest`] without touching any transmission buffer. A
//! [`PackBuffer`] is then allocated for exactly the requested total, and the
//! pack pass writes every value at the buffer's allocation point. On the
//! receiving side an [`UnpackCursor`] consumes the same bytes in the same
//! order.

use std::ops::Range;

use bytes::Bytes;

use crate::{PackError, PackResult};

/// Size of a length prefix on the wire (a native-endian `u64`).
pub const LEN_PREFIX: usize = std::mem::size_of::<u64>();

/// The Pack Request Table: one byte count per value to serialize.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackRequest {
    sizes: Vec<usize>,
}

impl PackRequest {
    /// Create an empty request table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the size of one value.
    pub fn push(&mut self, bytes: usize) {
        self.sizes.push(bytes);
    }

    /// Number of recorded values.
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// Whether no value was recorded.
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Sum of all recorded sizes.
    pub fn total(&self) -> usize {
        self.sizes.iter().sum()
    }

    /// Recorded sizes in request order.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Byte range of every request inside a buffer sized for the table.
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.sizes.iter().scan(0usize, |start, size| {
            let range = *start..*start + size;
            *start += size;
            Some(range)
        })
    }

    /// Forget every recorded size.
    pub fn clear(&mut self) {
        self.sizes.clear();
    }
}

/// Counters advanced by the pack pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackStats {
    /// Number of values packed so far.
    pub requests: usize,
    /// Number of bytes written so far.
    pub bytes: usize,
}

/// Caller-owned, pre-sized serialization buffer.
///
/// Writes land at the allocation point and advance it. A write that would run
/// past the capacity fails with [`PackError::Overflow`] rather than growing
/// the buffer.
#[derive(Debug, Clone)]
pub struct PackBuffer {
    data: Vec<u8>,
    offset: usize,
    declared: Vec<usize>,
}

impl PackBuffer {
    /// Allocate a buffer holding exactly the bytes declared by `request`.
    ///
    /// The declared sizes are kept so the pack pass can check every value
    /// against its size request.
    pub fn for_request(request: &PackRequest) -> Self {
        Self {
            data: vec![0; request.total()],
            offset: 0,
            declared: request.sizes().to_vec(),
        }
    }

    /// Allocate a buffer of `capacity` bytes without a request table.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            offset: 0,
            declared: Vec::new(),
        }
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Current allocation point.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left before the buffer is full.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Whether the allocation point reached the capacity.
    pub fn is_full(&self) -> bool {
        self.offset == self.data.len()
    }

    /// Whether the buffer was sized from a request table.
    pub fn has_requests(&self) -> bool {
        !self.declared.is_empty()
    }

    /// Size declared for request `index`, if the buffer has a request table.
    pub fn declared(&self, index: usize) -> Option<usize> {
        self.declared.get(index).copied()
    }

    /// Number of requests in the table the buffer was sized from.
    pub fn declared_len(&self) -> usize {
        self.declared.len()
    }

    /// Reserve `n` bytes at the allocation point and return them for writing.
    pub fn claim(&mut self, n: usize) -> PackResult<&mut [u8]> {
        let capacity = self.data.len();
        let start = self.offset;
        let end = match start.checked_add(n) {
            Some(end) if end <= capacity => end,
            _ => {
                return Err(PackError::Overflow {
                    offset: start,
                    requested: n,
                    capacity,
                })
            }
        };
        self.offset = end;
        Ok(&mut self.data[start..end])
    }

    /// Copy `bytes` to the allocation point.
    pub fn put(&mut self, bytes: &[u8]) -> PackResult<()> {
        self.claim(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Write a length prefix.
    pub fn put_len(&mut self, len: usize) -> PackResult<()> {
        self.put(&(len as u64).to_ne_bytes())
    }

    /// Bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.offset]
    }

    /// Consume the buffer, keeping the written bytes.
    pub fn into_vec(self) -> Vec<u8> {
        let mut data = self.data;
        data.truncate(self.offset);
        data
    }

    /// Consume the buffer into shareable bytes.
    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.into_vec())
    }
}

/// Read position inside a receive buffer.
///
/// The cursor only moves forward and never reads past the end of the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnpackCursor {
    offset: usize,
}

impl UnpackCursor {
    /// Cursor at the start of a buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor at `offset`.
    pub fn at(offset: usize) -> Self {
        Self { offset }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes of `src` not consumed yet.
    pub fn remaining(&self, src: &[u8]) -> usize {
        src.len().saturating_sub(self.offset)
    }

    /// Whether all of `src` was consumed.
    pub fn is_exhausted(&self, src: &[u8]) -> bool {
        self.offset >= src.len()
    }

    /// Consume `n` bytes of `src`.
    pub fn take<'a>(&mut self, src: &'a [u8], n: usize) -> PackResult<&'a [u8]> {
        let start = self.offset;
        let end = match start.checked_add(n) {
            Some(end) if end <= src.len() => end,
            _ => {
                return Err(PackError::Truncated {
                    offset: start,
                    needed: n,
                    len: src.len(),
                })
            }
        };
        self.offset = end;
        Ok(&src[start..end])
    }

    /// Consume exactly `N` bytes of `src` as an array.
    pub fn take_array<const N: usize>(&mut self, src: &[u8]) -> PackResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(src, N)?);
        Ok(out)
    }

    /// Consume a length prefix.
    pub fn take_len(&mut self, src: &[u8]) -> PackResult<usize> {
        let raw = u64::from_ne_bytes(self.take_array(src)?);
        usize::try_from(raw)
            .map_err(|_| PackError::invalid("length prefix", format!("{raw} does not fit usize")))
    }
}

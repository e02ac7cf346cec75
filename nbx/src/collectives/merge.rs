//! Merge strategies for received payloads.
//!
//! A collective hands every received message, after canonical reordering, to
//! a [`Merge`] implementation together with the receive container.
//!
//! | Strategy | Receive container | Effect |
//! |----------|-------------------|--------|
//! | [`Append`] | `Vec<E>` | unpack a packed `Vec<E>` and append its elements |
//! | [`Push`] | `Vec<S>` | unpack one `S` and push it as a new element |
//! | [`ZeroCopyAppend`] | `Vec<E>` | like `Append`, copying the run in place when `E` is zero-copy |
//! | [`ReplaceAt`] | `Vec<E>` | unpack into a pre-sized slot chosen per source |
//!
//! Any `FnMut(&mut R, &[u8], Rank) -> NbxResult<usize>` closure is a merge
//! strategy as well.

use nbx_core::Rank;
use nbx_pack::{unpack_from, PackError, Props, Unpack, UnpackCursor};
use serde::Serialize;

use crate::{NbxError, NbxResult};

/// Folds one received payload into a receive container.
pub trait Merge<R: ?Sized> {
    /// Merge the packed `payload` sent by `source` into `recv`.
    ///
    /// Returns the number of elements merged.
    fn merge<P: Props>(&mut self, recv: &mut R, payload: &[u8], source: Rank) -> NbxResult<usize>;
}

impl<R, F> Merge<R> for F
where
    R: ?Sized,
    F: FnMut(&mut R, &[u8], Rank) -> NbxResult<usize>,
{
    fn merge<P: Props>(&mut self, recv: &mut R, payload: &[u8], source: Rank) -> NbxResult<usize> {
        self(recv, payload, source)
    }
}

/// Append the elements of a packed vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct Append;

impl<E: Unpack + Default> Merge<Vec<E>> for Append {
    fn merge<P: Props>(
        &mut self,
        recv: &mut Vec<E>,
        payload: &[u8],
        _source: Rank,
    ) -> NbxResult<usize> {
        let items: Vec<E> = unpack_from::<P, Vec<E>>(payload)?;
        let count = items.len();
        recv.extend(items);
        Ok(count)
    }
}

/// Push each payload as one new element.
#[derive(Debug, Clone, Copy, Default)]
pub struct Push;

impl<S: Unpack + Default> Merge<Vec<S>> for Push {
    fn merge<P: Props>(
        &mut self,
        recv: &mut Vec<S>,
        payload: &[u8],
        _source: Rank,
    ) -> NbxResult<usize> {
        recv.push(unpack_from::<P, S>(payload)?);
        Ok(1)
    }
}

/// Append the elements of a packed vector, unpacking straight into the tail
/// of the receive vector.
///
/// Element types that are not zero-copy fall back to [`Append`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroCopyAppend;

impl<E: Unpack + Default> Merge<Vec<E>> for ZeroCopyAppend {
    fn merge<P: Props>(
        &mut self,
        recv: &mut Vec<E>,
        payload: &[u8],
        source: Rank,
    ) -> NbxResult<usize> {
        if !E::STRATEGY.is_zero_copy() {
            return Append.merge::<P>(recv, payload, source);
        }

        let mut cursor = UnpackCursor::new();
        let count = cursor.take_len(payload)?;
        let needed = count.saturating_mul(std::mem::size_of::<E>());
        if needed != cursor.remaining(payload) {
            return Err(PackError::Truncated {
                offset: cursor.offset(),
                needed,
                len: payload.len(),
            }
            .into());
        }

        let start = recv.len();
        recv.resize_with(start + count, E::default);
        if let Err(err) = E::unpack_slice::<P>(&mut recv[start..], payload, &mut cursor) {
            recv.truncate(start);
            return Err(err.into());
        }
        Ok(count)
    }
}

/// Unpack each source's elements into a fixed slot of a pre-sized vector.
///
/// The slot of a source starts at its element offset; the receive vector must
/// already be long enough.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceAt {
    offsets: Vec<usize>,
}

impl ReplaceAt {
    /// Slots starting at `offsets[source]`.
    pub fn new(offsets: Vec<usize>) -> Self {
        Self { offsets }
    }

    /// Consecutive slots of `sizes[source]` elements, in rank order.
    pub fn from_sizes(sizes: &[usize]) -> Self {
        let offsets = sizes
            .iter()
            .scan(0, |next, &size| {
                let offset = *next;
                *next += size;
                Some(offset)
            })
            .collect();
        Self { offsets }
    }

    /// Element offset of every source.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }
}

impl<E: Unpack + Default> Merge<Vec<E>> for ReplaceAt {
    fn merge<P: Props>(
        &mut self,
        recv: &mut Vec<E>,
        payload: &[u8],
        source: Rank,
    ) -> NbxResult<usize> {
        let offset = *self.offsets.get(source).ok_or(NbxError::InvalidRank {
            rank: source,
            size: self.offsets.len(),
        })?;

        let mut cursor = UnpackCursor::new();
        let count = cursor.take_len(payload)?;
        let end = offset.saturating_add(count);
        if end > recv.len() {
            return Err(NbxError::LengthMismatch {
                what: "replace-at slot",
                expected: recv.len(),
                actual: end,
            });
        }

        E::unpack_slice::<P>(&mut recv[offset..end], payload, &mut cursor)?;
        if !cursor.is_exhausted(payload) {
            return Err(PackError::TrailingBytes {
                consumed: cursor.offset(),
                remaining: cursor.remaining(payload),
            }
            .into());
        }
        Ok(count)
    }
}

/// Who contributed to a collective and how much.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecvSummary {
    /// Source of every merged message, in merge order.
    pub sources: Vec<Rank>,
    /// Elements merged from each message.
    pub sizes: Vec<usize>,
}

impl RecvSummary {
    /// Number of merged messages.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether nothing was merged.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Total number of elements merged.
    pub fn total(&self) -> usize {
        self.sizes.iter().sum()
    }

    pub(crate) fn record(&mut self, source: Rank, count: usize) {
        self.sources.push(source);
        self.sizes.push(count);
    }
}

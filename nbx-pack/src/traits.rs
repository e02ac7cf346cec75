//! The `Pack` and `Unpack` capabilities.
//!
//! Size request and pack share one dispatch: [`Pack::packed_size`] and
//! [`Pack::pack`] are implemented side by side for every type and traverse
//! the same elements in the same order, so the byte count of the first pass is
//! the byte count of the second.

use crate::{PackBuffer, PackResult, Props, Strategy, UnpackCursor};

/// A value that can be serialized into a [`PackBuffer`].
///
/// Types without an implementation cannot be packed at all; the failure is a
/// compile error, never a runtime one.
pub trait Pack {
    /// Serialization strategy of the type.
    const STRATEGY: Strategy;

    /// Bytes [`pack`](Pack::pack) writes for this value under property list `P`.
    fn packed_size<P: Props>(&self) -> usize;

    /// Write the value at the buffer's allocation point.
    fn pack<P: Props>(&self, buf: &mut PackBuffer) -> PackResult<()>;

    /// Bytes [`pack_slice`](Pack::pack_slice) writes for `items`.
    fn slice_packed_size<P: Props>(items: &[Self]) -> usize
    where
        Self: Sized,
    {
        items.iter().map(|item| item.packed_size::<P>()).sum()
    }

    /// Write every element of `items`, without a length prefix.
    ///
    /// Zero-copy types override this with a single byte copy.
    fn pack_slice<P: Props>(items: &[Self], buf: &mut PackBuffer) -> PackResult<()>
    where
        Self: Sized,
    {
        for item in items {
            item.pack::<P>(buf)?;
        }
        Ok(())
    }
}

/// A value that can be rebuilt from the bytes [`Pack`] wrote.
///
/// Unpacking overwrites `self` in place. Fields excluded by the property list
/// keep their current value.
pub trait Unpack: Pack {
    /// Read the value at the cursor, advancing it by the bytes consumed.
    fn unpack<P: Props>(&mut self, src: &[u8], cursor: &mut UnpackCursor) -> PackResult<()>;

    /// Read `out.len()` consecutive values.
    fn unpack_slice<P: Props>(
        out: &mut [Self],
        src: &[u8],
        cursor: &mut UnpackCursor,
    ) -> PackResult<()>
    where
        Self: Sized,
    {
        for item in out.iter_mut() {
            item.unpack::<P>(src, cursor)?;
        }
        Ok(())
    }

    /// Read `len` consecutive values into `out`, resizing it to `len`.
    ///
    /// Existing elements are unpacked in place; missing ones start from
    /// `Default`.
    fn unpack_vec<P: Props>(
        out: &mut Vec<Self>,
        len: usize,
        src: &[u8],
        cursor: &mut UnpackCursor,
    ) -> PackResult<()>
    where
        Self: Sized + Default,
    {
        out.truncate(len);
        Self::unpack_slice::<P>(out, src, cursor)?;
        while out.len() < len {
            let mut item = Self::default();
            item.unpack::<P>(src, cursor)?;
            out.push(item);
        }
        Ok(())
    }
}

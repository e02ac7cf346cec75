//! Fixed arrays, strings and growable sequences.

use crate::buffer::LEN_PREFIX;
use crate::{Pack, PackBuffer, PackError, PackResult, Props, Strategy, Unpack, UnpackCursor};

/// Fixed arrays inherit the strategy of their element when it is a plain
/// byte copy, and otherwise pack element by element like a record.
const fn array_strategy(element: Strategy) -> Strategy {
    match element {
        Strategy::Primitive | Strategy::OpaqueChecked | Strategy::OpaqueUnchecked => element,
        _ => Strategy::Record,
    }
}

impl<T: Pack, const N: usize> Pack for [T; N] {
    const STRATEGY: Strategy = array_strategy(T::STRATEGY);

    fn packed_size<P: Props>(&self) -> usize {
        T::slice_packed_size::<P>(self)
    }

    fn pack<P: Props>(&self, buf: &mut PackBuffer) -> PackResult<()> {
        T::pack_slice::<P>(self, buf)
    }

    fn slice_packed_size<P: Props>(items: &[Self]) -> usize {
        T::slice_packed_size::<P>(items.as_flattened())
    }

    fn pack_slice<P: Props>(items: &[Self], buf: &mut PackBuffer) -> PackResult<()> {
        T::pack_slice::<P>(items.as_flattened(), buf)
    }
}

impl<T: Unpack, const N: usize> Unpack for [T; N] {
    fn unpack<P: Props>(&mut self, src: &[u8], cursor: &mut UnpackCursor) -> PackResult<()> {
        T::unpack_slice::<P>(self, src, cursor)
    }

    fn unpack_slice<P: Props>(
        out: &mut [Self],
        src: &[u8],
        cursor: &mut UnpackCursor,
    ) -> PackResult<()> {
        T::unpack_slice::<P>(out.as_flattened_mut(), src, cursor)
    }
}

impl Pack for str {
    const STRATEGY: Strategy = Strategy::PrimitiveArray;

    fn packed_size<P: Props>(&self) -> usize {
        LEN_PREFIX + self.len()
    }

    fn pack<P: Props>(&self, buf: &mut PackBuffer) -> PackResult<()> {
        buf.put_len(self.len())?;
        buf.put(self.as_bytes())
    }
}

impl Pack for String {
    const STRATEGY: Strategy = Strategy::PrimitiveArray;

    fn packed_size<P: Props>(&self) -> usize {
        self.as_str().packed_size::<P>()
    }

    fn pack<P: Props>(&self, buf: &mut PackBuffer) -> PackResult<()> {
        self.as_str().pack::<P>(buf)
    }
}

impl Unpack for String {
    fn unpack<P: Props>(&mut self, src: &[u8], cursor: &mut UnpackCursor) -> PackResult<()> {
        let len = cursor.take_len(src)?;
        let bytes = cursor.take(src, len)?;
        let text = std::str::from_utf8(bytes)
            .map_err(|err| PackError::invalid("string", err.to_string()))?;
        self.clear();
        self.push_str(text);
        Ok(())
    }
}

impl<T: Pack> Pack for [T] {
    const STRATEGY: Strategy = Strategy::sequence_of(T::STRATEGY);

    fn packed_size<P: Props>(&self) -> usize {
        LEN_PREFIX + T::slice_packed_size::<P>(self)
    }

    fn pack<P: Props>(&self, buf: &mut PackBuffer) -> PackResult<()> {
        buf.put_len(self.len())?;
        T::pack_slice::<P>(self, buf)
    }
}

impl<T: Pack> Pack for Vec<T> {
    const STRATEGY: Strategy = Strategy::sequence_of(T::STRATEGY);

    fn packed_size<P: Props>(&self) -> usize {
        self.as_slice().packed_size::<P>()
    }

    fn pack<P: Props>(&self, buf: &mut PackBuffer) -> PackResult<()> {
        self.as_slice().pack::<P>(buf)
    }
}

impl<T: Unpack + Default> Unpack for Vec<T> {
    fn unpack<P: Props>(&mut self, src: &[u8], cursor: &mut UnpackCursor) -> PackResult<()> {
        let len = cursor.take_len(src)?;
        T::unpack_vec::<P>(self, len, src, cursor)
    }
}

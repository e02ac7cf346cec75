//! Primitive scalars.
//!
//! Scalars are written in native byte order. Runs of scalars (slices, vectors,
//! fixed arrays) go through `bytemuck` as one byte copy.

use crate::{Pack, PackBuffer, PackError, PackResult, Props, Strategy, Unpack, UnpackCursor};

macro_rules! impl_pod_primitive {
    ($($ty:ty),* $(,)?) => {$(
        impl Pack for $ty {
            const STRATEGY: Strategy = Strategy::Primitive;

            #[inline]
            fn packed_size<P: Props>(&self) -> usize {
                std::mem::size_of::<$ty>()
            }

            #[inline]
            fn pack<P: Props>(&self, buf: &mut PackBuffer) -> PackResult<()> {
                buf.put(&self.to_ne_bytes())
            }

            fn slice_packed_size<P: Props>(items: &[Self]) -> usize {
                std::mem::size_of_val(items)
            }

            fn pack_slice<P: Props>(items: &[Self], buf: &mut PackBuffer) -> PackResult<()> {
                buf.put(bytemuck::cast_slice(items))
            }
        }

        impl Unpack for $ty {
            #[inline]
            fn unpack<P: Props>(
                &mut self,
                src: &[u8],
                cursor: &mut UnpackCursor,
            ) -> PackResult<()> {
                *self = <$ty>::from_ne_bytes(cursor.take_array(src)?);
                Ok(())
            }

            fn unpack_slice<P: Props>(
                out: &mut [Self],
                src: &[u8],
                cursor: &mut UnpackCursor,
            ) -> PackResult<()> {
                let bytes = cursor.take(src, std::mem::size_of_val(out))?;
                bytemuck::cast_slice_mut::<$ty, u8>(out).copy_from_slice(bytes);
                Ok(())
            }

            fn unpack_vec<P: Props>(
                out: &mut Vec<Self>,
                len: usize,
                src: &[u8],
                cursor: &mut UnpackCursor,
            ) -> PackResult<()> {
                let size = len.checked_mul(std::mem::size_of::<$ty>()).ok_or_else(|| {
                    PackError::invalid("length prefix", format!("{len} elements overflow usize"))
                })?;
                // Check the run is present before resizing the destination.
                let bytes = cursor.take(src, size)?;
                out.clear();
                out.resize(len, <$ty>::default());
                bytemuck::cast_slice_mut::<$ty, u8>(out.as_mut_slice()).copy_from_slice(bytes);
                Ok(())
            }
        }
    )*};
}

impl_pod_primitive!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64);

impl Pack for bool {
    const STRATEGY: Strategy = Strategy::Primitive;

    fn packed_size<P: Props>(&self) -> usize {
        1
    }

    fn pack<P: Props>(&self, buf: &mut PackBuffer) -> PackResult<()> {
        buf.put(&[u8::from(*self)])
    }
}

impl Unpack for bool {
    fn unpack<P: Props>(&mut self, src: &[u8], cursor: &mut UnpackCursor) -> PackResult<()> {
        let [byte] = cursor.take_array::<1>(src)?;
        *self = match byte {
            0 => false,
            1 => true,
            other => return Err(PackError::invalid("bool", format!("byte {other:#04x}"))),
        };
        Ok(())
    }
}

impl Pack for char {
    const STRATEGY: Strategy = Strategy::Primitive;

    fn packed_size<P: Props>(&self) -> usize {
        std::mem::size_of::<u32>()
    }

    fn pack<P: Props>(&self, buf: &mut PackBuffer) -> PackResult<()> {
        buf.put(&u32::from(*self).to_ne_bytes())
    }
}

impl Unpack for char {
    fn unpack<P: Props>(&mut self, src: &[u8], cursor: &mut UnpackCursor) -> PackResult<()> {
        let raw = u32::from_ne_bytes(cursor.take_array(src)?);
        *self = char::from_u32(raw)
            .ok_or_else(|| PackError::invalid("char", format!("scalar value {raw:#x}")))?;
        Ok(())
    }
}

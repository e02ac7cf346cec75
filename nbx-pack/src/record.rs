//! Structured records and opaque aggregates.
//!
//! Two ways exist to make an aggregate packable:
//!
//! - [`pack_record!`](crate::pack_record) declares the fields of a record with
//!   their property indices. The record is self-describing: each selected
//!   field packs with its own strategy, so property lists apply per field.
//! - [`opaque_record!`](crate::opaque_record) copies the raw bytes of a `Copy`
//!   type. The type states through [`RawRecord::POINTER_FREE`] whether it can
//!   prove it holds no pointers; types that cannot are packed anyway with a
//!   warning in debug builds.

use crate::{PackBuffer, PackResult, Strategy, UnpackCursor};

/// Capability of types that may be packed as a raw byte copy.
///
/// # Safety
///
/// Every byte pattern written by packing a value must be a valid value when
/// copied back, and the type must have no padding bytes that are read
/// uninitialised. Types whose fields are all [`bytemuck::Pod`] satisfy this;
/// [`opaque_record!(pod T)`](crate::opaque_record) implements the trait for
/// them without `unsafe` at the call site.
pub unsafe trait RawRecord: Copy + 'static {
    /// Whether the type asserts it holds no pointers.
    ///
    /// `Some(true)` is a checked assertion, `Some(false)` a checked type that
    /// admits it holds pointers, and `None` a type that cannot tell.
    const POINTER_FREE: Option<bool> = None;
}

/// Strategy of an opaque record.
pub const fn opaque_strategy<T: RawRecord>() -> Strategy {
    match T::POINTER_FREE {
        Some(_) => Strategy::OpaqueChecked,
        None => Strategy::OpaqueUnchecked,
    }
}

/// Byte-copy helpers used by [`opaque_record!`](crate::opaque_record).
#[doc(hidden)]
pub mod raw {
    use super::*;

    fn bytes_of_slice<T: RawRecord>(items: &[T]) -> &[u8] {
        // SAFETY: `RawRecord` guarantees the representation is plain bytes.
        unsafe {
            std::slice::from_raw_parts(items.as_ptr().cast::<u8>(), std::mem::size_of_val(items))
        }
    }

    /// Pack one value as raw bytes.
    pub fn pack<T: RawRecord>(value: &T, buf: &mut PackBuffer) -> PackResult<()> {
        pack_slice(std::slice::from_ref(value), buf)
    }

    /// Pack a run of values as one byte copy.
    pub fn pack_slice<T: RawRecord>(items: &[T], buf: &mut PackBuffer) -> PackResult<()> {
        check_pointers::<T>();
        buf.put(bytes_of_slice(items))
    }

    /// Unpack one value from raw bytes.
    pub fn unpack<T: RawRecord>(
        out: &mut T,
        src: &[u8],
        cursor: &mut UnpackCursor,
    ) -> PackResult<()> {
        unpack_slice(std::slice::from_mut(out), src, cursor)
    }

    /// Unpack a run of values with one byte copy.
    pub fn unpack_slice<T: RawRecord>(
        out: &mut [T],
        src: &[u8],
        cursor: &mut UnpackCursor,
    ) -> PackResult<()> {
        check_pointers::<T>();
        let len = std::mem::size_of_val(out);
        let bytes = cursor.take(src, len)?;
        // SAFETY: `bytes` holds exactly `len` bytes and `RawRecord` accepts
        // any byte pattern produced by packing.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), out.as_mut_ptr().cast::<u8>(), len);
        }
        Ok(())
    }

    #[cfg(debug_assertions)]
    fn check_pointers<T: RawRecord>() {
        use std::collections::HashSet;
        use std::sync::{Mutex, OnceLock};

        static REPORTED: OnceLock<Mutex<HashSet<&'static str>>> = OnceLock::new();

        if T::POINTER_FREE == Some(true) {
            return;
        }
        let type_name = std::any::type_name::<T>();
        let first = REPORTED
            .get_or_init(Default::default)
            .lock()
            .map(|mut reported| reported.insert(type_name))
            .unwrap_or(false);
        if !first {
            return;
        }
        match T::POINTER_FREE {
            Some(false) => tracing::error!(
                type_name,
                "opaque record asserts it holds pointers, copying raw bytes anyway"
            ),
            _ => tracing::warn!(
                type_name,
                "opaque record cannot prove it is pointer-free, copying raw bytes"
            ),
        }
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn check_pointers<T: RawRecord>() {}
}

/// Implement [`Pack`](crate::Pack) and [`Unpack`](crate::Unpack) for a
/// record, field by field.
///
/// Each field is listed with its property index. A field takes part in
/// packing when the property list of the call contains its index; fields
/// themselves are always packed whole.
///
/// # Examples
///
/// ```
/// use nbx_pack::{pack_record, pack_to_vec, unpack_from, AllProps, P2};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Particle {
///     position: [f64; 3],
///     velocity: [f64; 3],
///     id: u64,
/// }
///
/// pack_record!(Particle { 0 => position, 1 => velocity, 2 => id });
///
/// let p = Particle { position: [1.0; 3], velocity: [2.0; 3], id: 7 };
/// let bytes = pack_to_vec::<P2<0, 2>, _>(&p).expect("pack");
/// assert_eq!(bytes.len(), 24 + 8);
/// ```
#[macro_export]
macro_rules! pack_record {
    ($ty:ty { $($index:literal => $field:ident),+ $(,)? }) => {
        impl $crate::Pack for $ty {
            const STRATEGY: $crate::Strategy = $crate::Strategy::Record;

            fn packed_size<P: $crate::Props>(&self) -> usize {
                let mut size = 0;
                $(
                    if P::contains($index) {
                        size += $crate::Pack::packed_size::<$crate::AllProps>(&self.$field);
                    }
                )+
                size
            }

            fn pack<P: $crate::Props>(
                &self,
                buf: &mut $crate::PackBuffer,
            ) -> $crate::PackResult<()> {
                $(
                    if P::contains($index) {
                        $crate::Pack::pack::<$crate::AllProps>(&self.$field, buf)?;
                    }
                )+
                Ok(())
            }
        }

        impl $crate::Unpack for $ty {
            fn unpack<P: $crate::Props>(
                &mut self,
                src: &[u8],
                cursor: &mut $crate::UnpackCursor,
            ) -> $crate::PackResult<()> {
                $(
                    if P::contains($index) {
                        $crate::Unpack::unpack::<$crate::AllProps>(&mut self.$field, src, cursor)?;
                    }
                )+
                Ok(())
            }
        }
    };
}

/// Implement [`Pack`](crate::Pack) and [`Unpack`](crate::Unpack) for an
/// opaque type as a raw byte copy.
///
/// `opaque_record!(pod T)` also implements [`RawRecord`] with a checked
/// pointer-free assertion; it fails to compile unless `T` is
/// [`bytemuck::Pod`]. The plain form expects a hand-written `unsafe impl
/// RawRecord`.
///
/// # Examples
///
/// ```
/// use nbx_pack::{classify, opaque_record, Strategy};
///
/// #[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
/// #[repr(C)]
/// struct Cell {
///     density: f64,
///     pressure: f64,
/// }
///
/// opaque_record!(pod Cell);
///
/// assert_eq!(classify::<Cell>(), Strategy::OpaqueChecked);
/// ```
#[macro_export]
macro_rules! opaque_record {
    (pod $ty:ty) => {
        // SAFETY: the bound requires `Pod`, which admits every byte pattern.
        unsafe impl $crate::RawRecord for $ty
        where
            $ty: $crate::bytemuck::Pod,
        {
            const POINTER_FREE: Option<bool> = Some(true);
        }

        $crate::opaque_record!($ty);
    };
    ($ty:ty) => {
        impl $crate::Pack for $ty {
            const STRATEGY: $crate::Strategy = $crate::opaque_strategy::<$ty>();

            fn packed_size<P: $crate::Props>(&self) -> usize {
                ::std::mem::size_of::<$ty>()
            }

            fn pack<P: $crate::Props>(
                &self,
                buf: &mut $crate::PackBuffer,
            ) -> $crate::PackResult<()> {
                $crate::raw::pack(self, buf)
            }

            fn slice_packed_size<P: $crate::Props>(items: &[Self]) -> usize {
                ::std::mem::size_of_val(items)
            }

            fn pack_slice<P: $crate::Props>(
                items: &[Self],
                buf: &mut $crate::PackBuffer,
            ) -> $crate::PackResult<()> {
                $crate::raw::pack_slice(items, buf)
            }
        }

        impl $crate::Unpack for $ty {
            fn unpack<P: $crate::Props>(
                &mut self,
                src: &[u8],
                cursor: &mut $crate::UnpackCursor,
            ) -> $crate::PackResult<()> {
                $crate::raw::unpack(self, src, cursor)
            }

            fn unpack_slice<P: $crate::Props>(
                out: &mut [Self],
                src: &[u8],
                cursor: &mut $crate::UnpackCursor,
            ) -> $crate::PackResult<()> {
                $crate::raw::unpack_slice(out, src, cursor)
            }
        }
    };
}

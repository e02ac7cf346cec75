//! # nbx-pack
//!
//! Type classification and two-phase packing for nbx exchanges.
//!
//! Every value that crosses an exchange goes through three passes:
//!
//! 1. **Size request** ([`pack_request`]): append the number of bytes the
//!    value will occupy to a [`PackRequest`] table. No buffer is touched.
//! 2. **Pack** ([`pack`]): write the value into a [`PackBuffer`] sized from
//!    the table, advancing the request counter in [`PackStats`].
//! 3. **Unpack** ([`unpack`]): the strict inverse, advancing an
//!    [`UnpackCursor`] by exactly the bytes the pack pass wrote.
//!
//! ## Classification
//!
//! Each packable type resolves statically to one [`Strategy`] through the
//! [`Pack`] trait. A type without an implementation cannot be packed; that
//! is a compile error.
//!
//! | Type | Strategy |
//! |------|----------|
//! | integers, floats, `bool`, `char` | `Primitive` |
//! | `[T; N]` of primitives | `Primitive` |
//! | `Vec<T>`, `[T]` of primitives, `String`, `str` | `PrimitiveArray` |
//! | `Vec<T>`, `[T]` of anything else | `VectorLike` |
//! | [`Grid`], [`GridRegion`] | `GridLike` |
//! | [`pack_record!`] types | `Record` |
//! | [`Encap`], [`EncapMut`] | `Encapsulated` |
//! | [`opaque_record!`] types | `OpaqueChecked` / `OpaqueUnchecked` |
//!
//! ## Property lists
//!
//! Every call takes a [`Props`] type parameter selecting which record fields
//! are packed ([`AllProps`], [`P1`] .. [`P4`], or a list declared with
//! [`props!`]). The size-request and pack passes must use the same list.
//!
//! ## Byte order
//!
//! Scalars and length prefixes (`u64`) use native byte order; all processes
//! of a group are assumed to share one architecture.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

mod buffer;
mod containers;
mod encap;
mod error;
mod grid;
mod packer;
mod primitive;
mod props;
mod record;
mod strategy;
mod traits;

#[doc(hidden)]
pub use bytemuck;

// Buffer exports
pub use buffer::{PackBuffer, PackRequest, PackStats, UnpackCursor, LEN_PREFIX};

// Classification exports
pub use props::{AllProps, Props, P1, P2, P3, P4};
pub use strategy::{classify, Strategy};
pub use traits::{Pack, Unpack};

// Container exports
pub use encap::{Encap, EncapMut};
pub use grid::{Grid, GridBox, GridRegion};
pub use record::{opaque_strategy, RawRecord};

#[doc(hidden)]
pub use record::raw;

// Entry points
pub use packer::{pack, pack_batch, pack_request, pack_to_vec, unpack, unpack_from};

// Error exports
pub use error::{PackError, PackResult};

//! Two-phase packing entry points.
//!
//! ```
//! use nbx_pack::{pack, pack_request, unpack, AllProps, PackBuffer, PackRequest, PackStats, UnpackCursor};
//!
//! let values = vec![1u64, 2, 3];
//! let label = "cells".to_string();
//!
//! // Size-request pass.
//! let mut request = PackRequest::new();
//! pack_request::<AllProps, _>(&values, &mut request);
//! pack_request::<AllProps, _>(&label, &mut request);
//!
//! // Pack pass.
//! let mut buf = PackBuffer::for_request(&request);
//! let mut stats = PackStats::default();
//! pack::<AllProps, _>(&mut buf, &values, &mut stats).expect("pack");
//! pack::<AllProps, _>(&mut buf, &label, &mut stats).expect("pack");
//! assert!(buf.is_full());
//!
//! // Unpack pass.
//! let bytes = buf.into_vec();
//! let mut cursor = UnpackCursor::new();
//! let mut values_out: Vec<u64> = Vec::new();
//! let mut label_out = String::new();
//! unpack::<AllProps, _>(&bytes, &mut values_out, &mut cursor).expect("unpack");
//! unpack::<AllProps, _>(&bytes, &mut label_out, &mut cursor).expect("unpack");
//! assert_eq!(values_out, values);
//! assert_eq!(cursor.offset(), bytes.len());
//! ```

use bytes::Bytes;

use crate::{
    Pack, PackBuffer, PackError, PackRequest, PackResult, PackStats, Props, Unpack, UnpackCursor,
};

/// Size-request pass: record the bytes `value` will occupy under `P`.
pub fn pack_request<P: Props, T: Pack + ?Sized>(value: &T, request: &mut PackRequest) {
    request.push(value.packed_size::<P>());
}

/// Pack pass: write `value` at the buffer's allocation point.
///
/// When the buffer was sized from a request table, the value must be packed
/// in the same order it was requested and occupy exactly the declared bytes.
pub fn pack<P: Props, T: Pack + ?Sized>(
    buf: &mut PackBuffer,
    value: &T,
    stats: &mut PackStats,
) -> PackResult<()> {
    let index = stats.requests;
    let declared = if buf.has_requests() {
        Some(buf.declared(index).ok_or(PackError::RequestsExhausted {
            requests: buf.declared_len(),
        })?)
    } else {
        None
    };

    let start = buf.offset();
    value.pack::<P>(buf)?;
    let written = buf.offset() - start;

    if let Some(declared) = declared {
        if declared != written {
            return Err(PackError::SizeMismatch {
                index,
                declared,
                written,
            });
        }
    }
    stats.requests += 1;
    stats.bytes += written;
    Ok(())
}

/// Unpack pass: rebuild `out` from the bytes at the cursor.
pub fn unpack<P: Props, T: Unpack + ?Sized>(
    src: &[u8],
    out: &mut T,
    cursor: &mut UnpackCursor,
) -> PackResult<()> {
    out.unpack::<P>(src, cursor)
}

/// Pack one value into a freshly sized byte vector.
pub fn pack_to_vec<P: Props, T: Pack + ?Sized>(value: &T) -> PackResult<Vec<u8>> {
    let mut request = PackRequest::new();
    pack_request::<P, T>(value, &mut request);
    let mut buf = PackBuffer::for_request(&request);
    pack::<P, T>(&mut buf, value, &mut PackStats::default())?;
    Ok(buf.into_vec())
}

/// Unpack one value that must occupy all of `src`.
pub fn unpack_from<P: Props, T: Unpack + Default>(src: &[u8]) -> PackResult<T> {
    let mut out = T::default();
    let mut cursor = UnpackCursor::new();
    out.unpack::<P>(src, &mut cursor)?;
    if !cursor.is_exhausted(src) {
        return Err(PackError::TrailingBytes {
            consumed: cursor.offset(),
            remaining: cursor.remaining(src),
        });
    }
    Ok(out)
}

/// Pack several values into one buffer, returning one payload per value.
///
/// All payloads share the same allocation; each is a zero-copy slice of it.
pub fn pack_batch<P: Props, T: Pack + ?Sized>(values: &[&T]) -> PackResult<Vec<Bytes>> {
    let mut request = PackRequest::new();
    for value in values {
        pack_request::<P, T>(value, &mut request);
    }

    let mut buf = PackBuffer::for_request(&request);
    let mut stats = PackStats::default();
    for value in values {
        pack::<P, T>(&mut buf, value, &mut stats)?;
    }

    let bytes = buf.into_bytes();
    Ok(request.ranges().map(|range| bytes.slice(range)).collect())
}

//! Encapsulated views.
//!
//! An [`Encap`] refers to a value owned by a larger aggregate (a field of a
//! record, one slot of a vector) and packs exactly like the referenced value.
//! [`EncapMut`] is the receiving counterpart: unpacking through it writes the
//! referenced value in place.

use crate::{Pack, PackBuffer, PackResult, Props, Strategy, Unpack, UnpackCursor};

/// Read-only view onto a value owned elsewhere.
#[derive(Debug)]
pub struct Encap<'a, T: ?Sized> {
    inner: &'a T,
}

impl<T: ?Sized> Clone for Encap<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Encap<'_, T> {}

impl<'a, T: ?Sized> Encap<'a, T> {
    /// View onto `inner`.
    pub fn new(inner: &'a T) -> Self {
        Self { inner }
    }

    /// The referenced value.
    pub fn get(&self) -> &'a T {
        self.inner
    }
}

impl<T: Clone> Encap<'_, T> {
    /// Value copy of the referenced value.
    pub fn materialize(&self) -> T {
        self.inner.clone()
    }
}

impl<T: Pack + ?Sized> Pack for Encap<'_, T> {
    const STRATEGY: Strategy = Strategy::Encapsulated;

    fn packed_size<P: Props>(&self) -> usize {
        self.inner.packed_size::<P>()
    }

    fn pack<P: Props>(&self, buf: &mut PackBuffer) -> PackResult<()> {
        self.inner.pack::<P>(buf)
    }
}

/// Mutable view onto a value owned elsewhere.
#[derive(Debug)]
pub struct EncapMut<'a, T: ?Sized> {
    inner: &'a mut T,
}

impl<'a, T: ?Sized> EncapMut<'a, T> {
    /// View onto `inner`.
    pub fn new(inner: &'a mut T) -> Self {
        Self { inner }
    }

    /// Give back the referenced value.
    pub fn into_inner(self) -> &'a mut T {
        self.inner
    }
}

impl<T: Pack + ?Sized> Pack for EncapMut<'_, T> {
    const STRATEGY: Strategy = Strategy::Encapsulated;

    fn packed_size<P: Props>(&self) -> usize {
        self.inner.packed_size::<P>()
    }

    fn pack<P: Props>(&self, buf: &mut PackBuffer) -> PackResult<()> {
        self.inner.pack::<P>(buf)
    }
}

impl<T: Unpack + ?Sized> Unpack for EncapMut<'_, T> {
    fn unpack<P: Props>(&mut self, src: &[u8], cursor: &mut UnpackCursor) -> PackResult<()> {
        self.inner.unpack::<P>(src, cursor)
    }
}

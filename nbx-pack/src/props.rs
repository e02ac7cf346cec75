//! Compile-time property lists.
//!
//! A property list selects which fields of a structured record take part in
//! packing. It is a type parameter of every pack and unpack call, so the
//! size-request pass and the pack pass see the same selection whenever they
//! are called with the same parameter.
//!
//! ```
//! use nbx_pack::{AllProps, Props, P2};
//!
//! assert!(AllProps::contains(7));
//! assert!(P2::<2, 5>::contains(5));
//! assert!(!P2::<2, 5>::contains(3));
//! ```

/// A compile-time selection of record field indices.
pub trait Props: 'static {
    /// Whether every field is selected.
    const ALL: bool;

    /// Selected field indices when [`ALL`](Props::ALL) is false.
    const INDICES: &'static [usize];

    /// Whether field `index` takes part in packing.
    #[inline]
    fn contains(index: usize) -> bool {
        if Self::ALL {
            return true;
        }
        let mut i = 0;
        while i < Self::INDICES.len() {
            if Self::INDICES[i] == index {
                return true;
            }
            i += 1;
        }
        false
    }
}

/// Selects every field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllProps;

impl Props for AllProps {
    const ALL: bool = true;
    const INDICES: &'static [usize] = &[];
}

/// Selects a single field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct P1<const A: usize>;

impl<const A: usize> Props for P1<A> {
    const ALL: bool = false;
    const INDICES: &'static [usize] = &[A];
}

/// Selects two fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct P2<const A: usize, const B: usize>;

impl<const A: usize, const B: usize> Props for P2<A, B> {
    const ALL: bool = false;
    const INDICES: &'static [usize] = &[A, B];
}

/// Selects three fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct P3<const A: usize, const B: usize, const C: usize>;

impl<const A: usize, const B: usize, const C: usize> Props for P3<A, B, C> {
    const ALL: bool = false;
    const INDICES: &'static [usize] = &[A, B, C];
}

/// Selects four fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct P4<const A: usize, const B: usize, const C: usize, const D: usize>;

impl<const A: usize, const B: usize, const C: usize, const D: usize> Props for P4<A, B, C, D> {
    const ALL: bool = false;
    const INDICES: &'static [usize] = &[A, B, C, D];
}

/// Declare a named property list over any number of field indices.
///
/// # Examples
///
/// ```
/// use nbx_pack::{props, Props};
///
/// props! {
///     /// Position and velocity of a particle.
///     pub Kinematics = [0, 1, 4]
/// }
///
/// assert!(Kinematics::contains(4));
/// assert!(!Kinematics::contains(2));
/// ```
#[macro_export]
macro_rules! props {
    ($(#[$meta:meta])* $vis:vis $name:ident = [$($index:expr),* $(,)?]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        $vis struct $name;

        impl $crate::Props for $name {
            const ALL: bool = false;
            const INDICES: &'static [usize] = &[$($index),*];
        }
    };
}

//! Type classification.
//!
//! Every packable type resolves statically to exactly one [`Strategy`]
//! through its [`Pack::STRATEGY`](crate::Pack::STRATEGY) constant. Containers
//! derive their strategy from their element's, so classification follows the
//! shape of the type and never inspects values at runtime.
//!
//! | Strategy | Wire layout | Zero-copy |
//! |----------|-------------|-----------|
//! | `Primitive` | raw bytes | yes |
//! | `PrimitiveArray` | length prefix + raw byte run | elements are |
//! | `VectorLike` | length prefix + packed elements | no |
//! | `GridLike` | extents + packed elements | no |
//! | `Record` | selected fields in declaration order | no |
//! | `Encapsulated` | the referenced value | as referenced |
//! | `OpaqueChecked` | raw bytes | yes |
//! | `OpaqueUnchecked` | raw bytes (debug warning) | yes |

use std::fmt;

use crate::Pack;

/// Serialization strategy of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Fixed-size scalar (or fixed array of scalars) copied as raw bytes.
    Primitive,
    /// Growable sequence of primitives: length prefix then one byte run.
    PrimitiveArray,
    /// Growable sequence of self-describing elements.
    VectorLike,
    /// Multi-dimensional structured array describing its own extents.
    GridLike,
    /// Structured record whose fields can be selected by a property list.
    Record,
    /// View onto a value owned elsewhere, packed as that value.
    Encapsulated,
    /// Opaque aggregate that asserts whether it holds pointers.
    OpaqueChecked,
    /// Opaque aggregate that cannot prove it is pointer-free.
    OpaqueUnchecked,
}

impl Strategy {
    /// Whether values can be moved between buffers as a plain byte copy.
    ///
    /// Only types without nested self-describing children qualify; merges use
    /// this to decide if a received run may be copied straight into place.
    pub const fn is_zero_copy(self) -> bool {
        matches!(
            self,
            Strategy::Primitive | Strategy::OpaqueChecked | Strategy::OpaqueUnchecked
        )
    }

    /// Whether the type drives its own traversal when packed.
    pub const fn is_self_describing(self) -> bool {
        matches!(
            self,
            Strategy::VectorLike | Strategy::GridLike | Strategy::Record
        )
    }

    /// Short name used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Strategy::Primitive => "primitive",
            Strategy::PrimitiveArray => "primitive-array",
            Strategy::VectorLike => "vector-like",
            Strategy::GridLike => "grid-like",
            Strategy::Record => "record",
            Strategy::Encapsulated => "encapsulated",
            Strategy::OpaqueChecked => "opaque-checked",
            Strategy::OpaqueUnchecked => "opaque-unchecked",
        }
    }

    /// Strategy of a growable sequence whose elements use `element`.
    pub const fn sequence_of(element: Strategy) -> Strategy {
        match element {
            Strategy::Primitive => Strategy::PrimitiveArray,
            _ => Strategy::VectorLike,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve the serialization strategy of `T`.
///
/// # Examples
///
/// ```
/// use nbx_pack::{classify, Strategy};
///
/// assert_eq!(classify::<u32>(), Strategy::Primitive);
/// assert_eq!(classify::<Vec<f64>>(), Strategy::PrimitiveArray);
/// assert_eq!(classify::<Vec<String>>(), Strategy::VectorLike);
/// ```
pub const fn classify<T: Pack + ?Sized>() -> Strategy {
    T::STRATEGY
}

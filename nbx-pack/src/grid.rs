//! Multi-dimensional structured arrays.
//!
//! A [`Grid`] stores its elements in row-major order (last dimension
//! fastest). On the wire it writes its `D` extents as length prefixes and
//! then every element. A [`GridRegion`] packs a box of a grid with the same
//! layout, which is how ghost layers are exchanged between neighbours.

use std::ops::Range;

use crate::buffer::LEN_PREFIX;
use crate::{Pack, PackBuffer, PackError, PackResult, Props, Strategy, Unpack, UnpackCursor};

/// Half-open box `lo..hi` in every dimension of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridBox<const D: usize> {
    /// Inclusive lower corner.
    pub lo: [usize; D],
    /// Exclusive upper corner.
    pub hi: [usize; D],
}

impl<const D: usize> GridBox<D> {
    /// Box spanning `lo..hi`.
    pub fn new(lo: [usize; D], hi: [usize; D]) -> Self {
        Self { lo, hi }
    }

    /// Box covering a whole grid of `shape`.
    pub fn whole(shape: [usize; D]) -> Self {
        Self {
            lo: [0; D],
            hi: shape,
        }
    }

    /// Extent of the box in every dimension.
    pub fn shape(&self) -> [usize; D] {
        let mut shape = [0; D];
        for (d, extent) in shape.iter_mut().enumerate() {
            *extent = self.hi[d].saturating_sub(self.lo[d]);
        }
        shape
    }

    /// Number of points in the box.
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    /// Whether the box holds no point.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the box lies inside a grid of `shape`.
    pub fn fits(&self, shape: &[usize; D]) -> bool {
        (0..D).all(|d| self.lo[d] <= self.hi[d] && self.hi[d] <= shape[d])
    }
}

/// Dense `D`-dimensional array of `T`.
///
/// # Examples
///
/// ```
/// use nbx_pack::{pack_to_vec, unpack_from, AllProps, Grid};
///
/// let mut grid = Grid::<u32, 2>::new([2, 3]).expect("shape");
/// *grid.get_mut([1, 2]).expect("in range") = 9;
///
/// let bytes = pack_to_vec::<AllProps, _>(&grid).expect("pack");
/// let back: Grid<u32, 2> = unpack_from::<AllProps, _>(&bytes).expect("unpack");
/// assert_eq!(back, grid);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T, const D: usize> {
    shape: [usize; D],
    data: Vec<T>,
}

impl<T, const D: usize> Default for Grid<T, D> {
    fn default() -> Self {
        Self {
            shape: [0; D],
            data: Vec::new(),
        }
    }
}

impl<T: Default + Clone, const D: usize> Grid<T, D> {
    /// Grid of `shape` filled with `T::default()`.
    ///
    /// Fails if the element count of `shape` overflows `usize`.
    pub fn new(shape: [usize; D]) -> PackResult<Self> {
        let len = checked_len(&shape)?;
        Ok(Self {
            shape,
            data: vec![T::default(); len],
        })
    }
}

impl<T, const D: usize> Grid<T, D> {
    /// Grid of `shape` over row-major `data`.
    pub fn from_vec(shape: [usize; D], data: Vec<T>) -> PackResult<Self> {
        let len = checked_len(&shape)?;
        if data.len() != len {
            return Err(PackError::invalid(
                "grid",
                format!("shape {shape:?} needs {len} elements, got {}", data.len()),
            ));
        }
        Ok(Self { shape, data })
    }

    /// Extents of the grid.
    pub fn shape(&self) -> [usize; D] {
        self.shape
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the grid holds no element.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Elements in row-major order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable elements in row-major order.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consume the grid into its row-major elements.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Row-major position of `index`, if it lies inside the grid.
    pub fn linear_index(&self, index: [usize; D]) -> Option<usize> {
        if (0..D).any(|d| index[d] >= self.shape[d]) {
            return None;
        }
        Some(linear(&self.shape, &index))
    }

    /// Element at `index`.
    pub fn get(&self, index: [usize; D]) -> Option<&T> {
        self.linear_index(index).map(|i| &self.data[i])
    }

    /// Mutable element at `index`.
    pub fn get_mut(&mut self, index: [usize; D]) -> Option<&mut T> {
        self.linear_index(index).map(move |i| &mut self.data[i])
    }

    /// View of the box `bounds` for packing.
    pub fn region(&self, bounds: GridBox<D>) -> PackResult<GridRegion<'_, T, D>> {
        self.check_box(&bounds)?;
        Ok(GridRegion { grid: self, bounds })
    }

    fn check_box(&self, bounds: &GridBox<D>) -> PackResult<()> {
        if bounds.fits(&self.shape) {
            Ok(())
        } else {
            Err(PackError::invalid(
                "grid region",
                format!("{bounds:?} outside shape {:?}", self.shape),
            ))
        }
    }
}

impl<T: Unpack, const D: usize> Grid<T, D> {
    /// Unpack a packed region into the box `bounds` of this grid.
    ///
    /// The extents on the wire must equal the extents of `bounds`.
    pub fn unpack_region<P: Props>(
        &mut self,
        bounds: GridBox<D>,
        src: &[u8],
        cursor: &mut UnpackCursor,
    ) -> PackResult<()> {
        self.check_box(&bounds)?;
        let shape = read_shape::<D>(src, cursor)?;
        if shape != bounds.shape() {
            return Err(PackError::invalid(
                "grid region",
                format!("packed extents {shape:?} do not match {bounds:?}"),
            ));
        }
        let grid_shape = self.shape;
        let data = &mut self.data;
        for_each_row(&grid_shape, &bounds, |row| {
            T::unpack_slice::<P>(&mut data[row], src, cursor)
        })
    }
}

fn checked_len(shape: &[usize]) -> PackResult<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, extent| acc.checked_mul(*extent))
        .ok_or_else(|| PackError::invalid("grid", format!("shape {shape:?} overflows usize")))
}

fn linear<const D: usize>(shape: &[usize; D], index: &[usize; D]) -> usize {
    (0..D).fold(0, |acc, d| acc * shape[d] + index[d])
}

fn read_shape<const D: usize>(src: &[u8], cursor: &mut UnpackCursor) -> PackResult<[usize; D]> {
    let mut shape = [0; D];
    for extent in shape.iter_mut() {
        *extent = cursor.take_len(src)?;
    }
    Ok(shape)
}

/// Visit every point of `bounds` in row-major order.
fn for_each_index<const D: usize>(
    bounds: &GridBox<D>,
    mut f: impl FnMut([usize; D]) -> PackResult<()>,
) -> PackResult<()> {
    if bounds.is_empty() {
        return Ok(());
    }
    let mut index = bounds.lo;
    loop {
        f(index)?;
        let mut d = D;
        loop {
            if d == 0 {
                return Ok(());
            }
            d -= 1;
            index[d] += 1;
            if index[d] < bounds.hi[d] {
                break;
            }
            index[d] = bounds.lo[d];
        }
    }
}

/// Visit the contiguous runs of `bounds` inside a grid of `shape`.
fn for_each_row<const D: usize>(
    shape: &[usize; D],
    bounds: &GridBox<D>,
    mut f: impl FnMut(Range<usize>) -> PackResult<()>,
) -> PackResult<()> {
    if bounds.is_empty() {
        return Ok(());
    }
    let Some(last) = D.checked_sub(1) else {
        return f(0..1);
    };
    let width = bounds.hi[last] - bounds.lo[last];
    let mut rows = *bounds;
    rows.hi[last] = rows.lo[last] + 1;
    for_each_index(&rows, |start| {
        let start = linear(shape, &start);
        f(start..start + width)
    })
}

impl<T: Pack, const D: usize> Pack for Grid<T, D> {
    const STRATEGY: Strategy = Strategy::GridLike;

    fn packed_size<P: Props>(&self) -> usize {
        D * LEN_PREFIX + T::slice_packed_size::<P>(&self.data)
    }

    fn pack<P: Props>(&self, buf: &mut PackBuffer) -> PackResult<()> {
        for extent in self.shape {
            buf.put_len(extent)?;
        }
        T::pack_slice::<P>(&self.data, buf)
    }
}

impl<T: Unpack + Default, const D: usize> Unpack for Grid<T, D> {
    fn unpack<P: Props>(&mut self, src: &[u8], cursor: &mut UnpackCursor) -> PackResult<()> {
        let shape = read_shape::<D>(src, cursor)?;
        let len = checked_len(&shape)?;
        T::unpack_vec::<P>(&mut self.data, len, src, cursor)?;
        self.shape = shape;
        Ok(())
    }
}

/// A box of a [`Grid`], packed with the layout of a grid of the box's shape.
#[derive(Debug, Clone, Copy)]
pub struct GridRegion<'a, T, const D: usize> {
    grid: &'a Grid<T, D>,
    bounds: GridBox<D>,
}

impl<T, const D: usize> GridRegion<'_, T, D> {
    /// The box this region covers.
    pub fn bounds(&self) -> GridBox<D> {
        self.bounds
    }
}

impl<T: Pack, const D: usize> Pack for GridRegion<'_, T, D> {
    const STRATEGY: Strategy = Strategy::GridLike;

    fn packed_size<P: Props>(&self) -> usize {
        let mut size = D * LEN_PREFIX;
        // Row visits cannot fail here.
        let _ = for_each_row(&self.grid.shape, &self.bounds, |row| {
            size += T::slice_packed_size::<P>(&self.grid.data[row]);
            Ok(())
        });
        size
    }

    fn pack<P: Props>(&self, buf: &mut PackBuffer) -> PackResult<()> {
        for extent in self.bounds.shape() {
            buf.put_len(extent)?;
        }
        for_each_row(&self.grid.shape, &self.bounds, |row| {
            T::pack_slice::<P>(&self.grid.data[row], buf)
        })
    }
}

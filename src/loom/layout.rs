use std::sync::Arc;

use derive_more::{Deref, Display, From, Into};
use itertools::Itertools;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout error: shape {0} and stride {1} differ in rank")]
    Rank(Shape, Stride),
    #[error("layout error: shape {0} cannot broadcast with shape {1}")]
    Broadcast(Shape, Shape),
    #[error("layout error: output layout {0} does not cover iteration shape {1}")]
    Output(Layout, Shape),
    #[error("layout error: output layout {0} writes to overlapping elements")]
    Overlap(Layout),
    #[error("layout error: axes {0:?} are not a permutation of {1} dimensions")]
    Permute(Vec<usize>, usize),
}

/// Sizes of each dimension, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref, From, Into, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[display("[{}]", _0.iter().format(", "))]
pub struct Shape(Arc<[usize]>);

impl From<Vec<usize>> for Shape {
    #[inline]
    fn from(value: Vec<usize>) -> Self {
        Self(value.into())
    }
}

impl From<&[usize]> for Shape {
    #[inline]
    fn from(value: &[usize]) -> Self {
        Self(value.into())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    #[inline]
    fn from(value: [usize; N]) -> Self {
        Self(value.into())
    }
}

impl Shape {
    /// Number of elements covered by the shape.
    #[inline]
    pub fn size(&self) -> usize {
        self.iter().product()
    }

    /// Left-pads the shape with size-1 dimensions up to `rank`.
    pub fn pad_to(&self, rank: usize) -> Self {
        let pad = rank.saturating_sub(self.len());
        std::iter::repeat_n(1, pad)
            .chain(self.iter().copied())
            .collect_vec()
            .into()
    }

    /// Broadcasts two shapes together. Each pair of dimensions must be equal or contain a 1.
    pub fn broadcast_with(&self, other: &Shape) -> Result<Shape, LayoutError> {
        let rank = self.len().max(other.len());
        let (x, y) = (self.pad_to(rank), other.pad_to(rank));
        x.iter()
            .zip_eq(y.iter())
            .map(|(&x, &y)| match (x, y) {
                (1, y) => Ok(y),
                (x, 1) => Ok(x),
                (x, y) if x == y => Ok(x),
                _ => Err(LayoutError::Broadcast(self.clone(), other.clone())),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Shape::from)
    }

    /// Broadcasts all `shapes` into one iteration shape.
    pub fn broadcast<'a>(shapes: impl IntoIterator<Item = &'a Shape>) -> Result<Shape, LayoutError> {
        shapes
            .into_iter()
            .try_fold(Shape::from(vec![]), |acc, shape| acc.broadcast_with(shape))
    }
}

/// Per-dimension steps in elements. May be zero (broadcast) or negative.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref, From, Into, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[display("[{}]", _0.iter().format(", "))]
pub struct Stride(Arc<[isize]>);

impl From<Vec<isize>> for Stride {
    #[inline]
    fn from(value: Vec<isize>) -> Self {
        Self(value.into())
    }
}

impl<const N: usize> From<[isize; N]> for Stride {
    #[inline]
    fn from(value: [isize; N]) -> Self {
        Self(value.into())
    }
}

impl Stride {
    /// Row-major strides of a densely packed `shape`.
    pub fn contiguous(shape: &Shape) -> Self {
        let mut stride = vec![0isize; shape.len()];
        let mut step = 1isize;
        for (stride, &dim) in stride.iter_mut().zip(shape.iter()).rev() {
            *stride = step;
            step *= dim.max(1) as isize;
        }
        stride.into()
    }
}

/// Maps coordinates of a logical shape to element offsets in a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[display("{shape}:{stride}+{offset}")]
pub struct Layout {
    shape: Shape,
    stride: Stride,
    offset: usize,
}

impl Layout {
    /// Creates a densely packed row-major layout.
    pub fn from_shape(shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        let stride = Stride::contiguous(&shape);
        let offset = 0;
        Self {
            shape,
            stride,
            offset,
        }
    }

    pub fn new(
        shape: impl Into<Shape>,
        stride: impl Into<Stride>,
        offset: usize,
    ) -> Result<Self, LayoutError> {
        let shape = shape.into();
        let stride = stride.into();
        if shape.len() != stride.len() {
            return Err(LayoutError::Rank(shape, stride));
        }
        Ok(Self {
            shape,
            stride,
            offset,
        })
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn stride(&self) -> &Stride {
        &self.stride
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Number of logical elements.
    #[inline]
    pub fn size(&self) -> usize {
        self.shape.size()
    }

    /// Returns `true` if elements are packed in row-major order without gaps.
    pub fn is_contiguous(&self) -> bool {
        if self.size() == 0 {
            return true;
        }
        let contiguous = Stride::contiguous(&self.shape);
        itertools::izip!(self.shape.iter(), self.stride.iter(), contiguous.iter())
            .all(|(&dim, &x, &y)| dim == 1 || x == y)
    }

    /// Returns `true` if two distinct coordinates may map to the same offset.
    ///
    /// Dimensions are ordered by stride magnitude; each must step past the whole extent of the
    /// faster dimensions. Interleaved layouts that never collide are reported as overlapping too.
    pub fn has_overlap(&self) -> bool {
        let mut extent = 1usize;
        self.shape
            .iter()
            .zip(self.stride.iter())
            .filter(|&(&dim, _)| dim > 1)
            .map(|(&dim, &stride)| (dim, stride.unsigned_abs()))
            .sorted_by_key(|&(_, stride)| stride)
            .any(|(dim, stride)| {
                let overlap = stride < extent;
                extent += stride * (dim - 1);
                overlap
            })
    }

    /// Left-pads the layout with size-1 dimensions up to `rank`.
    pub fn pad_to(&self, rank: usize) -> Self {
        let pad = rank.saturating_sub(self.rank());
        let shape = self.shape.pad_to(rank);
        let stride = std::iter::repeat_n(0, pad)
            .chain(self.stride.iter().copied())
            .collect_vec()
            .into();
        let offset = self.offset;
        Self {
            shape,
            stride,
            offset,
        }
    }

    /// Expands the layout to `shape`. Broadcast dimensions get a zero stride, so every coordinate
    /// along them reads index 0.
    pub fn broadcast_to(&self, shape: &Shape) -> Result<Self, LayoutError> {
        let error = || LayoutError::Broadcast(self.shape.clone(), shape.clone());
        if self.rank() > shape.len() {
            return Err(error());
        }
        let padded = self.pad_to(shape.len());
        let stride = itertools::izip!(padded.shape.iter(), padded.stride.iter(), shape.iter())
            .map(|(&dim, &stride, &target)| match dim {
                dim if dim == target => Ok(stride),
                1 => Ok(0),
                _ => Err(error()),
            })
            .collect::<Result<Vec<_>, _>>()?
            .into();
        let shape = shape.clone();
        let offset = self.offset;
        Ok(Self {
            shape,
            stride,
            offset,
        })
    }

    /// Reorders dimensions so that dimension `i` of the result is dimension `axes[i]` of `self`.
    pub fn permute(&self, axes: &[usize]) -> Result<Self, LayoutError> {
        let rank = self.rank();
        if axes.len() != rank || !axes.iter().all_unique() || axes.iter().any(|&axis| axis >= rank)
        {
            return Err(LayoutError::Permute(axes.to_vec(), rank));
        }
        let shape = axes.iter().map(|&axis| self.shape[axis]).collect_vec().into();
        let stride = axes.iter().map(|&axis| self.stride[axis]).collect_vec().into();
        let offset = self.offset;
        Ok(Self {
            shape,
            stride,
            offset,
        })
    }

    /// Reverses the order of dimensions.
    pub fn transpose(&self) -> Self {
        let shape = self.shape.iter().rev().copied().collect_vec().into();
        let stride = self.stride.iter().rev().copied().collect_vec().into();
        let offset = self.offset;
        Self {
            shape,
            stride,
            offset,
        }
    }

    /// Offset of the element at coordinate `index`.
    ///
    /// # Panics
    /// Panics if `index` has a different rank from the layout.
    #[inline]
    pub fn value(&self, index: impl AsRef<[usize]>) -> usize {
        let index = index.as_ref();
        assert_eq!(index.len(), self.rank(), "index rank must match layout rank");
        let offset = index
            .iter()
            .zip_eq(self.stride.iter())
            .map(|(&x, &stride)| x as isize * stride)
            .sum::<isize>();
        (self.offset as isize + offset) as usize
    }

    /// Offset of the element at row-major linear position `index`, or `None` if out of range.
    pub fn locate(&self, mut index: usize) -> Option<usize> {
        if index >= self.size() {
            return None;
        }
        let mut offset = self.offset as isize;
        for (&dim, &stride) in self.shape.iter().zip(self.stride.iter()).rev() {
            offset += (index % dim) as isize * stride;
            index /= dim;
        }
        Some(offset as usize)
    }

    /// Lowest and highest offsets touched by the layout, or `None` if it has no elements.
    pub fn bounds(&self) -> Option<(isize, isize)> {
        if self.size() == 0 {
            return None;
        }
        let base = self.offset as isize;
        self.shape
            .iter()
            .zip_eq(self.stride.iter())
            .map(|(&dim, &stride)| stride * (dim as isize - 1))
            .fold(Some((base, base)), |bounds, step| {
                bounds.map(|(lo, hi)| (lo + step.min(0), hi + step.max(0)))
            })
    }

    /// Iterates offsets of all elements in row-major order, last dimension fastest.
    #[inline]
    pub fn iter(&self) -> StridedIndex {
        StridedIndex::new(self.clone())
    }
}

/// Row-major offset iterator over a [`Layout`], advancing one coordinate at a time.
#[derive(Debug, Clone)]
pub struct StridedIndex {
    layout: Layout,
    index: Vec<usize>,
    offset: isize,
    remaining: usize,
}

impl StridedIndex {
    pub fn new(layout: Layout) -> Self {
        let index = vec![0; layout.rank()];
        let offset = layout.offset as isize;
        let remaining = layout.size();
        Self {
            layout,
            index,
            offset,
            remaining,
        }
    }
}

impl Iterator for StridedIndex {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let offset = self.offset;
        self.remaining -= 1;

        let Layout { shape, stride, .. } = &self.layout;
        for (index, (&dim, &stride)) in self
            .index
            .iter_mut()
            .zip(shape.iter().zip(stride.iter()))
            .rev()
        {
            *index += 1;
            self.offset += stride;
            if *index < dim {
                break;
            }
            // carry into the next outer dimension
            self.offset -= stride * dim as isize;
            *index = 0;
        }

        debug_assert!(offset >= 0, "negative offset {offset} in {}", self.layout);
        Some(offset as usize)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for StridedIndex {}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use itertools::Itertools;

    use super::{Layout, LayoutError, Shape, Stride};

    #[test]
    fn test_contiguous() {
        let layout = Layout::from_shape([2, 3, 4]);
        assert_eq!(layout.stride(), &Stride::from([12, 4, 1]));
        assert_eq!(layout.size(), 24);
        assert!(layout.is_contiguous());
        assert_eq!(layout.iter().collect_vec(), (0..24).collect_vec());
        assert_eq!(layout.to_string(), "[2, 3, 4]:[12, 4, 1]+0");
    }

    #[test]
    fn test_broadcast_shape() -> Result<(), Box<dyn Error>> {
        let shapes = [Shape::from([4, 1]), Shape::from([3]), Shape::from([1, 1])];
        assert_eq!(Shape::broadcast(&shapes)?, Shape::from([4, 3]));

        let shapes = [Shape::from([1, 3]), Shape::from([4, 3])];
        assert_eq!(Shape::broadcast(&shapes)?, Shape::from([4, 3]));

        let shapes = [Shape::from([0, 3]), Shape::from([1, 3])];
        assert_eq!(Shape::broadcast(&shapes)?, Shape::from([0, 3]));

        let shapes = [Shape::from([2, 3]), Shape::from([3, 2])];
        assert!(matches!(
            Shape::broadcast(&shapes),
            Err(LayoutError::Broadcast(_, _))
        ));

        assert_eq!(Shape::broadcast([])?, Shape::from([]));
        Ok(())
    }

    #[test]
    fn test_broadcast_layout() -> Result<(), Box<dyn Error>> {
        let layout = Layout::from_shape([1, 3]);
        let layout = layout.broadcast_to(&Shape::from([4, 3]))?;
        assert_eq!(layout.stride(), &Stride::from([0, 1]));
        assert!(layout.has_overlap());
        assert_eq!(
            layout.iter().collect_vec(),
            vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 0, 1, 2]
        );

        let layout = Layout::from_shape([3]).broadcast_to(&Shape::from([2, 3]))?;
        assert_eq!(layout.stride(), &Stride::from([0, 1]));

        let layout = Layout::from_shape([2, 3]);
        assert!(layout.broadcast_to(&Shape::from([3, 2])).is_err());
        assert!(layout.broadcast_to(&Shape::from([3])).is_err());
        Ok(())
    }

    #[test]
    fn test_strided_iter() -> Result<(), Box<dyn Error>> {
        let layout = Layout::from_shape([2, 3]).transpose();
        assert_eq!(layout.shape(), &Shape::from([3, 2]));
        assert!(!layout.is_contiguous());
        assert_eq!(layout.iter().collect_vec(), vec![0, 3, 1, 4, 2, 5]);

        let layout = Layout::new([2, 2], [-2, 1], 2)?;
        assert_eq!(layout.iter().collect_vec(), vec![2, 3, 0, 1]);
        assert_eq!(layout.bounds(), Some((0, 3)));

        for (index, offset) in layout.iter().enumerate() {
            assert_eq!(layout.locate(index), Some(offset));
        }
        assert_eq!(layout.locate(4), None);
        assert_eq!(layout.value([1, 1]), 1);
        Ok(())
    }

    #[test]
    fn test_degenerate() -> Result<(), Box<dyn Error>> {
        let scalar = Layout::from_shape([]);
        assert_eq!(scalar.size(), 1);
        assert_eq!(scalar.iter().collect_vec(), vec![0]);

        let empty = Layout::from_shape([2, 0, 3]);
        assert_eq!(empty.size(), 0);
        assert_eq!(empty.iter().count(), 0);
        assert_eq!(empty.bounds(), None);
        assert_eq!(empty.locate(0), None);
        assert!(!empty.has_overlap());
        assert!(empty.is_contiguous());

        assert!(matches!(
            Layout::new([2, 3], [1], 0),
            Err(LayoutError::Rank(_, _))
        ));
        Ok(())
    }

    #[test]
    fn test_permute() -> Result<(), Box<dyn Error>> {
        let layout = Layout::from_shape([2, 3, 4]);
        let permuted = layout.permute(&[2, 0, 1])?;
        assert_eq!(permuted.shape(), &Shape::from([4, 2, 3]));
        assert_eq!(permuted.stride(), &Stride::from([1, 12, 4]));
        assert!(matches!(
            layout.permute(&[0, 0, 1]),
            Err(LayoutError::Permute(_, 3))
        ));
        assert!(layout.permute(&[0, 1]).is_err());
        Ok(())
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde() -> Result<(), Box<dyn Error>> {
        let layout = Layout::new([2, 3], [1, 2], 4)?;
        let json = serde_json::to_string(&layout)?;
        assert_eq!(serde_json::from_str::<Layout>(&json)?, layout);
        Ok(())
    }

    #[test]
    fn test_overlap() -> Result<(), Box<dyn Error>> {
        assert!(!Layout::from_shape([2, 3, 4]).has_overlap());
        assert!(!Layout::from_shape([2, 3]).transpose().has_overlap());
        assert!(!Layout::new([2, 2], [-2, 1], 2)?.has_overlap());
        assert!(!Layout::new([1, 3], [0, 1], 0)?.has_overlap());
        assert!(!Layout::new([2, 2], [1, 4], 0)?.has_overlap());

        assert!(Layout::new([2, 2], [1, 1], 0)?.has_overlap());
        assert!(Layout::new([3, 2], [1, 2], 0)?.has_overlap());
        assert!(Layout::new([4, 3], [0, 1], 0)?.has_overlap());
        Ok(())
    }
}

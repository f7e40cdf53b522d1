//! Constant multi-dimensional indexing.
//!
//! Index expressions are known at trace time and follow NumPy basic indexing:
//! integers drop an axis, slices keep it and are clamped to the axis bounds.
//! Build them with [`IndexElem`] directly or with the [`idx!`](crate::idx) macro.

use std::fmt;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use smallvec::SmallVec;
use snafu::ensure;

use crate::{Result, error::*, shape::Shape};

/// One component of a constant index expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexElem {
    /// Select one position and drop the axis. Negative values count from the end.
    Int(isize),

    /// `start:stop:step`, every part optional.
    Slice { start: Option<isize>, stop: Option<isize>, step: Option<isize> },
}

impl IndexElem {
    /// The full slice `:`.
    pub const FULL: Self = Self::Slice { start: None, stop: None, step: None };

    pub fn slice(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> Self {
        Self::Slice { start, stop, step }
    }

    /// `::-1`
    pub fn reversed() -> Self {
        Self::slice(None, None, Some(-1))
    }
}

impl From<isize> for IndexElem {
    fn from(index: isize) -> Self {
        Self::Int(index)
    }
}

impl From<i32> for IndexElem {
    fn from(index: i32) -> Self {
        Self::Int(index as isize)
    }
}

impl From<RangeFull> for IndexElem {
    fn from(_: RangeFull) -> Self {
        Self::FULL
    }
}

macro_rules! impl_range_from {
    ($($int:ty),*) => {
        $(
            impl From<Range<$int>> for IndexElem {
                fn from(range: Range<$int>) -> Self {
                    Self::slice(Some(range.start as isize), Some(range.end as isize), None)
                }
            }

            impl From<RangeFrom<$int>> for IndexElem {
                fn from(range: RangeFrom<$int>) -> Self {
                    Self::slice(Some(range.start as isize), None, None)
                }
            }

            impl From<RangeTo<$int>> for IndexElem {
                fn from(range: RangeTo<$int>) -> Self {
                    Self::slice(None, Some(range.end as isize), None)
                }
            }
        )*
    };
}

impl_range_from!(i32, isize);

impl fmt::Display for IndexElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |value: &Option<isize>| value.map(|v| v.to_string()).unwrap_or_default();
        match self {
            Self::Int(index) => write!(f, "{index}"),
            Self::Slice { start, stop, step: None } => write!(f, "{}:{}", part(start), part(stop)),
            Self::Slice { start, stop, step } => write!(f, "{}:{}:{}", part(start), part(stop), part(step)),
        }
    }
}

/// Render a whole index expression: `1, 2:`.
pub fn display(index: &[IndexElem]) -> String {
    index.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Index expression macro.
///
/// # Syntax
/// - `idx![2]` → select position 2
/// - `idx![-1, ..]` → last row, every column
/// - `idx![1..3, 2..]` → slices
///
/// # Example
/// ```rust
/// use veil_ir::{idx, indexing::IndexElem};
///
/// assert_eq!(idx![2, ..], vec![IndexElem::Int(2), IndexElem::FULL]);
/// ```
#[macro_export]
macro_rules! idx {
    ($($elem:expr),* $(,)?) => {
        vec![$($crate::indexing::IndexElem::from($elem)),*]
    };
}

/// Index component with its bounds resolved against a concrete axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    Take(usize),
    Range { start: isize, step: isize, len: usize },
}

/// Validated index expression for a concrete shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPlan {
    components: Vec<Resolved>,
    shape: Shape,
}

impl IndexPlan {
    /// Resolve `index` against `shape`.
    ///
    /// Axes not covered by the expression are kept as they are.
    pub fn resolve(shape: &[usize], index: &[IndexElem]) -> Result<Self> {
        ensure!(index.len() <= shape.len(), TooManyIndicesSnafu { count: index.len(), ndim: shape.len() });

        let mut components = Vec::with_capacity(index.len());
        let mut out = Shape::new();

        for (axis, (elem, &dim)) in index.iter().zip(shape).enumerate() {
            let component = resolve_elem(axis, *elem, dim)?;
            if let Resolved::Range { len, .. } = component {
                out.push(len);
            }
            components.push(component);
        }
        out.extend_from_slice(&shape[index.len()..]);

        Ok(Self { components, shape: out })
    }

    /// Shape of the indexed result.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn components(&self) -> &[Resolved] {
        &self.components
    }

    /// Position in the source tensor of the element at `out` in the result.
    pub fn source_index(&self, out: &[usize]) -> SmallVec<[usize; 4]> {
        let mut source = SmallVec::with_capacity(self.components.len() + out.len());
        let mut position = 0;

        for component in &self.components {
            match *component {
                Resolved::Take(index) => source.push(index),
                Resolved::Range { start, step, .. } => {
                    source.push((start + step * out[position] as isize) as usize);
                    position += 1;
                }
            }
        }
        source.extend_from_slice(&out[position..]);
        source
    }
}

fn resolve_elem(axis: usize, elem: IndexElem, dim: usize) -> Result<Resolved> {
    let size = dim as isize;

    match elem {
        IndexElem::Int(index) => {
            let normalized = if index < 0 { index + size } else { index };
            ensure!((0..size).contains(&normalized), IndexRangeSnafu { axis, index, dim });
            Ok(Resolved::Take(normalized as usize))
        }
        IndexElem::Slice { start, stop, step } => {
            let step = step.unwrap_or(1);
            ensure!(step != 0, ZeroSliceStepSnafu { axis });

            // Clamp bounds the way Python slices do.
            let (lower, upper) = if step > 0 { (0, size) } else { (-1, size - 1) };
            let clamp = |bound: isize| {
                if bound < 0 { (bound + size).max(lower) } else { bound.min(upper) }
            };
            let start = start.map_or(if step > 0 { lower } else { upper }, clamp);
            let stop = stop.map_or(if step > 0 { upper } else { lower }, clamp);

            let len = match step > 0 {
                true if start < stop => (stop - start - 1) / step + 1,
                false if stop < start => (start - stop - 1) / -step + 1,
                _ => 0,
            };
            Ok(Resolved::Range { start, step, len: len as usize })
        }
    }
}

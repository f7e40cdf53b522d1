//! Concrete runtime data.
//!
//! [`Data`] is what constants hold and what [`OperatorGraph::evaluate`](crate::OperatorGraph::evaluate)
//! pushes through the graph. Integer data uses wrapping `i64` arithmetic;
//! any operation touching a float is carried out in `f64`.

use std::fmt;

use ndarray::{Array2, ArrayD, ArrayViewD, Dimension, Ix2, IxDyn, Zip, arr0};
use snafu::{OptionExt, ResultExt, ensure};
use veil_dtype::DType;

use crate::{
    Result, Value,
    error::*,
    indexing::{IndexElem, IndexPlan},
    shape::{self, Shape},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Int(ArrayD<i64>),
    Float(ArrayD<f64>),
}

impl Data {
    pub fn int(value: i64) -> Self {
        Self::Int(arr0(value).into_dyn())
    }

    pub fn float(value: f64) -> Self {
        Self::Float(arr0(value).into_dyn())
    }

    /// Integer tensor from row-major elements.
    pub fn int_tensor(shape: &[usize], elements: Vec<i64>) -> Result<Self> {
        let output_size = elements.len();
        ArrayD::from_shape_vec(IxDyn(shape), elements)
            .map(Self::Int)
            .ok()
            .context(ReshapeSizeMismatchSnafu { input_size: shape::numel(shape), output_size })
    }

    pub fn float_tensor(shape: &[usize], elements: Vec<f64>) -> Result<Self> {
        let output_size = elements.len();
        ArrayD::from_shape_vec(IxDyn(shape), elements)
            .map(Self::Float)
            .ok()
            .context(ReshapeSizeMismatchSnafu { input_size: shape::numel(shape), output_size })
    }

    // =========================================================================
    // Properties
    // =========================================================================

    pub fn shape(&self) -> Shape {
        match self {
            Self::Int(array) => Shape::from_slice(array.shape()),
            Self::Float(array) => Shape::from_slice(array.shape()),
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.shape().is_empty()
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    /// The single element of an integer scalar.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(array) if array.ndim() == 0 => array.first().copied(),
            _ => None,
        }
    }

    pub fn to_float(&self) -> ArrayD<f64> {
        match self {
            Self::Int(array) => array.mapv(|v| v as f64),
            Self::Float(array) => array.clone(),
        }
    }

    /// Check that every element is a finite number.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Int(_) => true,
            Self::Float(array) => array.iter().all(|v| v.is_finite()),
        }
    }

    /// Clear value describing this data.
    ///
    /// Integer data gets the smallest integer dtype holding all of its
    /// elements; float data is `float64`.
    pub fn value(&self) -> Result<Value> {
        let dtype = match self {
            Self::Int(array) => match self.as_int() {
                Some(value) => DType::for_constant_int(value),
                None => {
                    let min = array.iter().copied().min().unwrap_or(0);
                    let max = array.iter().copied().max().unwrap_or(0);
                    DType::holding(min as i128, max as i128).context(DTypeMixSnafu)?
                }
            },
            Self::Float(_) => DType::float64(),
        };
        Ok(Value::new(dtype, self.shape(), false))
    }

    // =========================================================================
    // Elementwise operations
    // =========================================================================

    /// Apply a unary function keeping the data kind.
    pub fn map(&self, int: impl Fn(i64) -> i64, float: impl Fn(f64) -> f64) -> Self {
        match self {
            Self::Int(array) => Self::Int(array.mapv(int)),
            Self::Float(array) => Self::Float(array.mapv(float)),
        }
    }

    /// Apply a unary function computed in `f64`.
    pub fn map_float(&self, f: impl Fn(f64) -> f64) -> Self {
        Self::Float(self.to_float().mapv(f))
    }

    /// Combine two operands elementwise with scalar broadcasting.
    ///
    /// Two integer operands use `int`, which may reject a pair of elements by
    /// returning `None`; otherwise both are converted and combined with `float`.
    pub fn zip_with(
        &self,
        rhs: &Self,
        operation: &str,
        int: impl Fn(i64, i64) -> Option<i64>,
        float: impl Fn(f64, f64) -> f64,
    ) -> Result<Self> {
        match (self, rhs) {
            (Self::Int(lhs), Self::Int(rhs)) => {
                let combined = broadcast_zip(lhs.view(), rhs.view(), |a, b| int(*a, *b))?;
                ensure!(
                    combined.iter().all(Option::is_some),
                    EvaluationSnafu { node: operation, reason: "integer operation undefined for these operands" }
                );
                Ok(Self::Int(combined.mapv(|v| v.unwrap_or_default())))
            }
            _ => {
                let (lhs, rhs) = (self.to_float(), rhs.to_float());
                Ok(Self::Float(broadcast_zip(lhs.view(), rhs.view(), |a, b| float(*a, *b))?))
            }
        }
    }

    pub fn add(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, "+", |a, b| Some(a.wrapping_add(b)), |a, b| a + b)
    }

    pub fn sub(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, "-", |a, b| Some(a.wrapping_sub(b)), |a, b| a - b)
    }

    pub fn mul(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, "*", |a, b| Some(a.wrapping_mul(b)), |a, b| a * b)
    }

    // =========================================================================
    // Contractions
    // =========================================================================

    /// Inner product of two 1-D tensors of equal length.
    pub fn dot(&self, rhs: &Self) -> Result<Self> {
        let (lhs_shape, rhs_shape) = (self.shape(), rhs.shape());
        ensure!(
            lhs_shape.len() == 1 && rhs_shape.len() == 1 && lhs_shape == rhs_shape,
            ContractionMismatchSnafu { node: "dot", lhs: lhs_shape, rhs: rhs_shape }
        );

        Ok(match (self, rhs) {
            (Self::Int(lhs), Self::Int(rhs)) => {
                Self::int(lhs.iter().zip(rhs).fold(0i64, |acc, (a, b)| acc.wrapping_add(a.wrapping_mul(*b))))
            }
            _ => Self::float(self.to_float().iter().zip(&rhs.to_float()).map(|(a, b)| a * b).sum()),
        })
    }

    /// Matrix product of two 2-D tensors.
    pub fn matmul(&self, rhs: &Self) -> Result<Self> {
        let (lhs_shape, rhs_shape) = (self.shape(), rhs.shape());
        ensure!(
            lhs_shape.len() == 2 && rhs_shape.len() == 2 && lhs_shape[1] == rhs_shape[0],
            ContractionMismatchSnafu { node: "matmul", lhs: lhs_shape.clone(), rhs: rhs_shape.clone() }
        );
        let mismatch = || ContractionMismatchSnafu { node: "matmul", lhs: lhs_shape.clone(), rhs: rhs_shape.clone() };

        Ok(match (self, rhs) {
            (Self::Int(lhs), Self::Int(rhs)) => {
                let lhs = lhs.view().into_dimensionality::<Ix2>().ok().with_context(mismatch)?;
                let rhs = rhs.view().into_dimensionality::<Ix2>().ok().with_context(mismatch)?;
                let product = Array2::from_shape_fn((lhs.nrows(), rhs.ncols()), |(row, col)| {
                    lhs.row(row).iter().zip(rhs.column(col)).fold(0i64, |acc, (a, b)| acc.wrapping_add(a.wrapping_mul(*b)))
                });
                Self::Int(product.into_dyn())
            }
            _ => {
                let (lhs, rhs) = (self.to_float(), rhs.to_float());
                let lhs = lhs.into_dimensionality::<Ix2>().ok().with_context(mismatch)?;
                let rhs = rhs.into_dimensionality::<Ix2>().ok().with_context(mismatch)?;
                Self::Float(lhs.dot(&rhs).into_dyn())
            }
        })
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// Evaluate a constant index expression.
    pub fn index(&self, index: &[IndexElem]) -> Result<Self> {
        let plan = IndexPlan::resolve(&self.shape(), index)?;
        Ok(match self {
            Self::Int(array) => Self::Int(gather(array, &plan)),
            Self::Float(array) => Self::Float(gather(array, &plan)),
        })
    }

    /// Row-major reshape.
    pub fn reshape(&self, shape: &[usize]) -> Result<Self> {
        shape::validate_reshape(&self.shape(), shape)?;
        let size_mismatch =
            || ReshapeSizeMismatchSnafu { input_size: shape::numel(&self.shape()), output_size: shape::numel(shape) };

        Ok(match self {
            Self::Int(array) => Self::Int(
                array.as_standard_layout().into_owned().into_shape_with_order(IxDyn(shape)).ok().with_context(size_mismatch)?,
            ),
            Self::Float(array) => Self::Float(
                array.as_standard_layout().into_owned().into_shape_with_order(IxDyn(shape)).ok().with_context(size_mismatch)?,
            ),
        })
    }

    /// Flatten to one dimension; a scalar becomes a one-element tensor.
    pub fn ravel(&self) -> Result<Self> {
        self.reshape(&shape::ravel(&self.shape()))
    }

    /// Reverse the axis order.
    pub fn transpose(&self) -> Self {
        match self {
            Self::Int(array) => Self::Int(array.clone().reversed_axes().as_standard_layout().into_owned()),
            Self::Float(array) => Self::Float(array.clone().reversed_axes().as_standard_layout().into_owned()),
        }
    }

    /// Convert elements to `dtype`. Floats are truncated toward zero.
    pub fn astype(&self, dtype: DType) -> Result<Self> {
        match (self, dtype) {
            (Self::Float(array), DType::Integer { .. }) => {
                ensure!(
                    array.iter().all(|v| v.is_finite()),
                    EvaluationSnafu { node: format!("astype({dtype})"), reason: "non-finite value" }
                );
                Ok(Self::Int(array.mapv(|v| v.trunc() as i64)))
            }
            (Self::Int(array), DType::Float { .. }) => Ok(Self::Float(array.mapv(|v| v as f64))),
            _ => Ok(self.clone()),
        }
    }
}

impl From<i64> for Data {
    fn from(value: i64) -> Self {
        Self::int(value)
    }
}

impl From<f64> for Data {
    fn from(value: f64) -> Self {
        Self::float(value)
    }
}

impl From<ArrayD<i64>> for Data {
    fn from(array: ArrayD<i64>) -> Self {
        Self::Int(array)
    }
}

impl From<ArrayD<f64>> for Data {
    fn from(array: ArrayD<f64>) -> Self {
        Self::Float(array)
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(array) if array.ndim() == 0 => write!(f, "{}", array.iter().next().copied().unwrap_or_default()),
            Self::Float(array) if array.ndim() == 0 => write!(f, "{}", array.iter().next().copied().unwrap_or_default()),
            Self::Int(array) => write!(f, "{array}"),
            Self::Float(array) => write!(f, "{array}"),
        }
    }
}

fn broadcast_zip<A, B, C>(lhs: ArrayViewD<'_, A>, rhs: ArrayViewD<'_, B>, f: impl Fn(&A, &B) -> C) -> Result<ArrayD<C>> {
    let target = shape::broadcast(lhs.shape(), rhs.shape())?;
    let mismatch = || ShapeMixSnafu { lhs: Shape::from_slice(lhs.shape()), rhs: Shape::from_slice(rhs.shape()) };

    let lhs_view = lhs.broadcast(IxDyn(&target)).with_context(mismatch)?;
    let rhs_view = rhs.broadcast(IxDyn(&target)).with_context(mismatch)?;
    Ok(Zip::from(lhs_view).and(rhs_view).map_collect(|a, b| f(a, b)))
}

fn gather<T: Clone>(array: &ArrayD<T>, plan: &IndexPlan) -> ArrayD<T> {
    ArrayD::from_shape_fn(IxDyn(plan.shape()), |out| array[plan.source_index(out.slice()).as_slice()].clone())
}

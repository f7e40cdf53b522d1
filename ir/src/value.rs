//! Type descriptor of one graph edge.

use std::fmt;

use snafu::ResultExt;
use veil_dtype::DType;

use crate::{
    Result,
    error::DTypeMixSnafu,
    shape::{self, Shape},
};

/// Dtype, shape and encryption status of the data flowing on an edge.
///
/// Values are plain owned data: every node keeps its own copies of the values
/// it consumes and produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Value {
    pub dtype: DType,
    /// Empty for scalars.
    pub shape: Shape,
    pub is_encrypted: bool,
}

impl Value {
    pub fn new(dtype: DType, shape: impl Into<Shape>, is_encrypted: bool) -> Self {
        Self { dtype, shape: shape.into(), is_encrypted }
    }

    pub fn encrypted_scalar(dtype: DType) -> Self {
        Self::new(dtype, Shape::new(), true)
    }

    pub fn clear_scalar(dtype: DType) -> Self {
        Self::new(dtype, Shape::new(), false)
    }

    pub fn encrypted_tensor(dtype: DType, shape: &[usize]) -> Self {
        Self::new(dtype, Shape::from_slice(shape), true)
    }

    pub fn clear_tensor(dtype: DType, shape: &[usize]) -> Self {
        Self::new(dtype, Shape::from_slice(shape), false)
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    pub fn is_tensor(&self) -> bool {
        !self.is_scalar()
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn size(&self) -> usize {
        shape::numel(&self.shape)
    }

    pub fn is_clear(&self) -> bool {
        !self.is_encrypted
    }

    /// Same dtype and encryption, different shape.
    pub fn with_shape(&self, shape: impl Into<Shape>) -> Self {
        Self { shape: shape.into(), ..self.clone() }
    }

    pub fn with_dtype(&self, dtype: DType) -> Self {
        Self { dtype, ..self.clone() }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_encrypted { "encrypted" } else { "clear" };
        if self.is_scalar() {
            write!(f, "{status} {}", self.dtype)
        } else {
            write!(f, "{status} {}{}", self.dtype, shape::display(&self.shape))
        }
    }
}

/// Combine the values of two operands.
///
/// Encryption is the logical OR of both operands, the dtype holds both
/// operand dtypes, and the shape follows the non-scalar operand.
pub fn mix_values(lhs: &Value, rhs: &Value) -> Result<Value> {
    let shape = shape::broadcast(&lhs.shape, &rhs.shape)?;
    let dtype = lhs.dtype.mix(rhs.dtype).context(DTypeMixSnafu)?;
    Ok(Value { dtype, shape, is_encrypted: lhs.is_encrypted || rhs.is_encrypted })
}

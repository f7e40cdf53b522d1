//! Shape utilities.
//!
//! A shape is a list of concrete dimension sizes; the empty shape is a scalar.

use smallvec::SmallVec;
use snafu::ensure;

use crate::{Result, error::*};

/// Shape type - sequence of dimension sizes.
///
/// Inline capacity of 4 covers the ranks traced programs actually use.
pub type Shape = SmallVec<[usize; 4]>;

pub fn is_scalar(shape: &[usize]) -> bool {
    shape.is_empty()
}

/// Number of elements (1 for a scalar).
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Shape both operands broadcast to.
///
/// Shapes broadcast only when they are equal or one of them is a scalar; the
/// result follows the non-scalar operand.
///
/// # Examples
///
/// ```rust
/// # use veil_ir::shape::broadcast;
/// # use smallvec::smallvec;
/// let tensor: veil_ir::shape::Shape = smallvec![2, 3];
/// assert_eq!(broadcast(&[], &tensor).unwrap(), tensor);
/// assert!(broadcast(&[3], &tensor).is_err());
/// ```
pub fn broadcast(lhs: &[usize], rhs: &[usize]) -> Result<Shape> {
    if lhs == rhs || is_scalar(rhs) {
        return Ok(Shape::from_slice(lhs));
    }
    ensure!(is_scalar(lhs), ShapeMixSnafu { lhs: Shape::from_slice(lhs), rhs: Shape::from_slice(rhs) });
    Ok(Shape::from_slice(rhs))
}

/// Validate a reshape target against the source shape.
pub fn validate_reshape(from: &[usize], to: &[usize]) -> Result<()> {
    let (input_size, output_size) = (numel(from), numel(to));
    ensure!(input_size == output_size, ReshapeSizeMismatchSnafu { input_size, output_size });
    Ok(())
}

/// Shape of the row-major flattening; a scalar ravels to `(1,)`.
pub fn ravel(shape: &[usize]) -> Shape {
    smallvec::smallvec![numel(shape)]
}

/// Shape with the axis order reversed.
pub fn transpose(shape: &[usize]) -> Shape {
    shape.iter().rev().copied().collect()
}

/// Format a shape as a tuple: `()`, `(3,)`, `(2, 3)`.
pub fn display(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [dim] => format!("({dim},)"),
        dims => format!("({})", dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")),
    }
}

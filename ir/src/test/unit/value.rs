use test_case::test_case;
use veil_dtype::DType;

use crate::{Error, Value, mix_values};

#[test]
fn test_mix_scalars() {
    let lhs = Value::encrypted_scalar(DType::unsigned(3));
    let rhs = Value::clear_scalar(DType::signed(2));

    let mixed = mix_values(&lhs, &rhs).unwrap();
    assert_eq!(mixed, Value::encrypted_scalar(DType::signed(4)));
}

#[test_case(&[], &[2, 3], &[2, 3]; "scalar_lhs")]
#[test_case(&[2, 3], &[], &[2, 3]; "scalar_rhs")]
#[test_case(&[4], &[4], &[4]; "equal")]
fn test_mix_broadcast(lhs: &[usize], rhs: &[usize], expected: &[usize]) {
    let lhs = Value::clear_tensor(DType::unsigned(2), lhs);
    let rhs = Value::clear_tensor(DType::unsigned(4), rhs);

    let mixed = mix_values(&lhs, &rhs).unwrap();
    assert_eq!(mixed.shape.as_slice(), expected);
    assert_eq!(mixed.dtype, DType::unsigned(4));
    assert!(mixed.is_clear());
}

#[test_case(&[3], &[4]; "different_lengths")]
#[test_case(&[2, 3], &[3]; "rank_broadcast")]
fn test_mix_incompatible_shapes(lhs: &[usize], rhs: &[usize]) {
    let lhs = Value::encrypted_tensor(DType::unsigned(2), lhs);
    let rhs = Value::encrypted_tensor(DType::unsigned(2), rhs);

    assert!(matches!(mix_values(&lhs, &rhs), Err(Error::ShapeMix { .. })));
}

#[test]
fn test_mix_unrepresentable_dtype() {
    let lhs = Value::encrypted_scalar(DType::unsigned(64));
    let rhs = Value::clear_scalar(DType::signed(8));

    assert!(matches!(mix_values(&lhs, &rhs), Err(Error::DTypeMix { .. })));
}

#[test]
fn test_mix_invalid_width() {
    let lhs = Value::encrypted_scalar(DType::signed(0));
    let rhs = Value::clear_scalar(DType::unsigned(2));

    let result = mix_values(&lhs, &rhs);
    assert!(matches!(result, Err(Error::DTypeMix { source: veil_dtype::Error::InvalidBitWidth { bit_width: 0, .. } })));
}

#[test]
fn test_display() {
    assert_eq!(Value::encrypted_scalar(DType::unsigned(5)).to_string(), "encrypted uint5");
    assert_eq!(Value::clear_tensor(DType::signed(3), &[2, 3]).to_string(), "clear int3(2, 3)");
    assert_eq!(Value::clear_tensor(DType::float64(), &[4]).to_string(), "clear float64(4,)");
}

#[test]
fn test_properties() {
    let value = Value::encrypted_tensor(DType::unsigned(7), &[2, 3, 4]);
    assert_eq!(value.ndim(), 3);
    assert_eq!(value.size(), 24);
    assert!(value.is_tensor());
    assert!(Value::clear_scalar(DType::unsigned(1)).is_scalar());
    assert_eq!(Value::clear_scalar(DType::unsigned(1)).size(), 1);
}

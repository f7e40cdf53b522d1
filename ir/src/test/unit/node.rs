use std::collections::BTreeMap;

use test_case::test_case;
use veil_dtype::DType;

use crate::{
    Data, Error, FunctionKind, GenericFunction, IntermediateNode, NodeKind, Value, idx,
    node::{Attribute, element_fn, function::FUSABLE},
};

fn encrypted(bits: u32) -> Value {
    Value::encrypted_scalar(DType::unsigned(bits))
}

fn tensor(shape: &[usize]) -> Value {
    Value::encrypted_tensor(DType::unsigned(4), shape)
}

fn identity(output: Value) -> GenericFunction {
    GenericFunction::builder()
        .name("identity")
        .kind(FunctionKind::Tlu)
        .func(element_fn(|input, _| Ok(input.clone())))
        .output(output)
        .build()
}

#[test_case(NodeKind::Add, 1; "add_one")]
#[test_case(NodeKind::Sub, 3; "sub_three")]
#[test_case(NodeKind::Mul, 0; "mul_zero")]
#[test_case(NodeKind::Dot, 1; "dot_one")]
#[test_case(NodeKind::MatMul, 3; "matmul_three")]
fn test_binary_arity(kind: NodeKind, count: usize) {
    let result = IntermediateNode::new(kind, vec![encrypted(3); count]);
    assert!(matches!(result, Err(Error::Arity { expected: 2, actual, .. }) if actual == count));
}

#[test]
fn test_constant_rejects_inputs() {
    let result = IntermediateNode::new(NodeKind::Constant { data: Data::int(3) }, vec![encrypted(2)]);
    assert!(matches!(result, Err(Error::Arity { node: "Constant", expected: 0, actual: 1 })));
}

#[test]
fn test_constant_output_is_clear() {
    let node = IntermediateNode::constant(Data::int(5)).unwrap();
    assert_eq!(node.output(), &Value::clear_scalar(DType::unsigned(3)));
    assert_eq!(node.n_in(), 0);
    assert_eq!(node.label(), "5");

    let node = IntermediateNode::constant(Data::int_tensor(&[3], vec![-2, 0, 7]).unwrap()).unwrap();
    assert_eq!(node.output(), &Value::clear_tensor(DType::signed(4), &[3]));
}

#[test]
fn test_invalid_input_dtype() {
    let wide = Value::encrypted_scalar(DType::Integer { bit_width: 128, is_signed: false });
    let result = IntermediateNode::new(NodeKind::GenericFunction(identity(encrypted(3))), vec![wide]);
    assert!(matches!(result, Err(Error::InvalidDType { .. })));
}

#[test]
fn test_add_mixes_inputs() {
    let node = IntermediateNode::new(NodeKind::Add, vec![encrypted(3), Value::clear_scalar(DType::unsigned(6))]).unwrap();
    assert_eq!(node.output(), &encrypted(6));
    assert_eq!(node.label(), "+");
}

#[test]
fn test_dot_shapes() {
    let node = IntermediateNode::new(NodeKind::Dot, vec![tensor(&[3]), tensor(&[3])]).unwrap();
    assert!(node.output().is_scalar());
    assert!(node.output().is_encrypted);

    let mismatch = IntermediateNode::new(NodeKind::Dot, vec![tensor(&[3]), tensor(&[4])]);
    assert!(matches!(mismatch, Err(Error::ContractionMismatch { .. })));

    let matrix = IntermediateNode::new(NodeKind::Dot, vec![tensor(&[2, 3]), tensor(&[3])]);
    assert!(matches!(matrix, Err(Error::RankMismatch { .. })));

    let scalar = IntermediateNode::new(NodeKind::Dot, vec![encrypted(2), tensor(&[3])]);
    assert!(matches!(scalar, Err(Error::RankMismatch { .. })));
}

#[test]
fn test_dot_encryption() {
    let lhs = Value::clear_tensor(DType::unsigned(2), &[3]);
    let rhs = Value::clear_tensor(DType::unsigned(2), &[3]);
    let node = IntermediateNode::new(NodeKind::Dot, vec![lhs, rhs]).unwrap();
    assert!(node.output().is_clear());
}

#[test]
fn test_matmul_shapes() {
    let node = IntermediateNode::new(NodeKind::MatMul, vec![tensor(&[2, 3]), tensor(&[3, 4])]).unwrap();
    assert_eq!(node.output().shape.as_slice(), &[2, 4]);
    assert_eq!(node.label(), "@");

    let mismatch = IntermediateNode::new(NodeKind::MatMul, vec![tensor(&[2, 3]), tensor(&[4, 5])]);
    assert!(matches!(mismatch, Err(Error::ContractionMismatch { .. })));

    let vector = IntermediateNode::new(NodeKind::MatMul, vec![tensor(&[3]), tensor(&[3, 4])]);
    assert!(matches!(vector, Err(Error::RankMismatch { .. })));
}

#[test]
fn test_index_constant() {
    let node = IntermediateNode::new(NodeKind::IndexConstant { index: idx![2, 1] }, vec![tensor(&[5, 4])]).unwrap();
    assert_eq!(node.output(), &encrypted(4));
    assert_eq!(node.label(), "value[2, 1]");

    let row = IntermediateNode::new(NodeKind::IndexConstant { index: idx![1..] }, vec![tensor(&[5, 4])]).unwrap();
    assert_eq!(row.output().shape.as_slice(), &[4, 4]);

    let out_of_range = IntermediateNode::new(NodeKind::IndexConstant { index: idx![5, 0] }, vec![tensor(&[5, 4])]);
    assert!(matches!(out_of_range, Err(Error::IndexRange { axis: 0, index: 5, dim: 5 })));

    let scalar = IntermediateNode::new(NodeKind::IndexConstant { index: idx![0] }, vec![encrypted(3)]);
    assert!(matches!(scalar, Err(Error::RankMismatch { .. })));
}

#[test]
fn test_input_node() {
    let node = IntermediateNode::input("x", 0, encrypted(3));
    assert_eq!(node.n_in(), 1);
    assert_eq!(node.n_edges(), 0);
    assert_eq!(node.label(), "x");
    assert_eq!(node.output(), &encrypted(3));
}

#[test]
fn test_generic_function_attributes() {
    let function = identity(encrypted(3));
    assert!(function.is_fusable());
    assert_eq!(function.attributes().len(), 1);

    let memory = GenericFunction::builder()
        .name("reshape")
        .kind(FunctionKind::Memory)
        .func(element_fn(|input, _| Ok(input.clone())))
        .output(tensor(&[6]))
        .attributes(BTreeMap::from([(FUSABLE.to_string(), Attribute::Bool(false))]))
        .build();
    assert!(!memory.is_fusable());
    assert_eq!(memory.kind(), FunctionKind::Memory);
}

#[test]
fn test_generic_function_node() {
    let node = IntermediateNode::new(NodeKind::GenericFunction(identity(encrypted(5))), vec![encrypted(3)]).unwrap();
    assert_eq!(node.output(), &encrypted(5));
    assert_eq!(node.label(), "identity");
    assert!(node.is_table_eligible());

    let clear = IntermediateNode::new(NodeKind::GenericFunction(identity(encrypted(5))), vec![
        Value::clear_scalar(DType::unsigned(3)),
    ])
    .unwrap();
    assert!(!clear.is_table_eligible());
}

#[test]
fn test_evaluate() {
    let add = IntermediateNode::new(NodeKind::Add, vec![encrypted(3), encrypted(3)]).unwrap();
    assert_eq!(add.evaluate(&[Data::int(4), Data::int(3)]).unwrap(), Data::int(7));
    assert!(matches!(add.evaluate(&[Data::int(4)]), Err(Error::Arity { .. })));

    let input = IntermediateNode::input("x", 0, tensor(&[2]));
    assert!(matches!(input.evaluate(&[Data::int(4)]), Err(Error::Evaluation { .. })));
}

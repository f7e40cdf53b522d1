use std::collections::HashMap;

use veil_dtype::DType;

use crate::{
    Data, EntryId, Error, FunctionKind, GenericFunction, IntermediateNode, NodeKind, OperatorGraph, TableConfig,
    TraceLog, Value, node::element_fn,
};

fn x() -> Value {
    Value::encrypted_scalar(DType::unsigned(3))
}

fn record_constant(log: &mut TraceLog, value: i64) -> EntryId {
    log.record(IntermediateNode::constant(Data::int(value)).unwrap(), &[]).unwrap()
}

fn record_binary(log: &mut TraceLog, kind: NodeKind, lhs: EntryId, rhs: EntryId) -> EntryId {
    let inputs = vec![log.get(lhs).unwrap().node.output().clone(), log.get(rhs).unwrap().node.output().clone()];
    log.record(IntermediateNode::new(kind, inputs).unwrap(), &[lhs, rhs]).unwrap()
}

/// `(x + 3) * 2`, plus an unused `x - 1`.
fn affine() -> (TraceLog, EntryId) {
    let mut log = TraceLog::new();
    let input = log.record(IntermediateNode::input("x", 0, x()), &[]).unwrap();
    let three = record_constant(&mut log, 3);
    let sum = record_binary(&mut log, NodeKind::Add, input, three);
    let one = record_constant(&mut log, 1);
    record_binary(&mut log, NodeKind::Sub, input, one);
    let two = record_constant(&mut log, 2);
    let product = record_binary(&mut log, NodeKind::Mul, sum, two);
    (log, product)
}

#[test]
fn test_round_trip() {
    let (log, output) = affine();
    let graph = OperatorGraph::freeze(log, &[output]).unwrap();

    let result = graph.evaluate(&HashMap::from([(0, Data::int(4))])).unwrap();
    assert_eq!(result, vec![Data::int(14)]);
}

#[test]
fn test_dead_nodes_are_dropped() {
    let (log, output) = affine();
    assert_eq!(log.len(), 7);

    let graph = OperatorGraph::freeze(log, &[output]).unwrap();
    assert_eq!(graph.len(), 5);
    assert!(graph.nodes().all(|(_, node)| !matches!(node.kind(), NodeKind::Sub)));
    assert!(graph.is_acyclic());
}

#[test]
fn test_breadth_first_numbering() {
    let (log, output) = affine();
    let graph = OperatorGraph::freeze(log, &[output]).unwrap();

    let labels: Vec<String> = graph.nodes().map(|(_, node)| node.label()).collect();
    assert_eq!(labels, vec!["*", "+", "2", "x", "3"]);

    let [product] = graph.ordered_outputs() else { panic!("expected one output") };
    let producers = graph.predecessors(*product);
    assert_eq!(graph.node(producers[0]).label(), "+");
    assert_eq!(graph.node(producers[1]).label(), "2");
    assert_eq!(graph.successors(producers[0]), &[*product]);
}

#[test]
fn test_topological_order() {
    let (log, output) = affine();
    let graph = OperatorGraph::freeze(log, &[output]).unwrap();

    let order = graph.topological_order();
    assert_eq!(order.len(), graph.len());
    let position: HashMap<_, _> = order.iter().enumerate().map(|(at, id)| (*id, at)).collect();
    for (id, _) in graph.nodes() {
        for producer in graph.predecessors(id) {
            assert!(position[producer] < position[&id]);
        }
    }
}

#[test]
fn test_display() {
    let (log, output) = affine();
    let graph = OperatorGraph::freeze(log, &[output]).unwrap();

    let expected = "\
%3 = x : encrypted uint3
%4 = 3 : clear uint2
%1 = + (%3, %4) : encrypted uint3
%2 = 2 : clear uint2
%0 = * (%1, %2) : encrypted uint3
return %0";
    assert_eq!(graph.to_string(), expected);
}

#[test]
fn test_ordered_inputs_skip_unused_parameters() {
    let mut log = TraceLog::new();
    let first = log.record(IntermediateNode::input("a", 0, x()), &[]).unwrap();
    log.record(IntermediateNode::input("b", 1, x()), &[]).unwrap();
    let third = log.record(IntermediateNode::input("c", 2, x()), &[]).unwrap();
    let sum = record_binary(&mut log, NodeKind::Add, third, first);

    let graph = OperatorGraph::freeze(log, &[sum]).unwrap();
    let names: Vec<String> = graph.ordered_inputs().iter().map(|id| graph.node(*id).label()).collect();
    assert_eq!(names, vec!["a", "c"]);

    let result = graph.evaluate(&HashMap::from([(0, Data::int(1)), (2, Data::int(5))])).unwrap();
    assert_eq!(result, vec![Data::int(6)]);

    let missing = graph.evaluate(&HashMap::from([(0, Data::int(1))]));
    assert_eq!(missing, Err(Error::MissingInput { position: 2 }));
}

#[test]
fn test_multiple_outputs() {
    let (mut log, product) = affine();
    let four = record_constant(&mut log, 4);

    let graph = OperatorGraph::freeze(log, &[four, product, four]).unwrap();
    assert_eq!(graph.ordered_outputs().len(), 3);
    assert_eq!(graph.ordered_outputs()[0], graph.ordered_outputs()[2]);

    let result = graph.evaluate(&HashMap::from([(0, Data::int(0))])).unwrap();
    assert_eq!(result, vec![Data::int(4), Data::int(6), Data::int(4)]);
}

#[test]
fn test_freeze_errors() {
    let (log, _) = affine();
    assert!(matches!(OperatorGraph::freeze(log, &[]), Err(Error::NoOutputs)));

    let (_, output) = affine();
    let mut other = TraceLog::new();
    record_constant(&mut other, 1);
    assert!(matches!(OperatorGraph::freeze(other, &[output]), Err(Error::UnknownEntry { entry: 6 })));
}

#[test]
fn test_record_validation() {
    let mut log = TraceLog::new();
    let input = log.record(IntermediateNode::input("x", 0, x()), &[]).unwrap();

    let add = IntermediateNode::new(NodeKind::Add, vec![x(), x()]).unwrap();
    assert!(matches!(log.record(add.clone(), &[input]), Err(Error::Arity { .. })));

    let wrong = IntermediateNode::new(NodeKind::Add, vec![x(), Value::clear_scalar(DType::unsigned(2))]).unwrap();
    assert!(matches!(log.record(wrong, &[input, input]), Err(Error::OperandMismatch { slot: 1, .. })));

    let (_, foreign) = affine();
    let result = log.record(add.clone(), &[input, foreign]);
    assert!(matches!(result, Err(Error::ForwardReference { entry: 1, operand: 6 })));

    assert!(log.record(add, &[input, input]).is_ok());
}

#[test]
fn test_tables() {
    let mut log = TraceLog::new();
    let input = log.record(IntermediateNode::input("x", 0, x()), &[]).unwrap();
    let double = GenericFunction::builder()
        .name("double")
        .kind(FunctionKind::Tlu)
        .func(element_fn(|input, _| input.add(input)))
        .output(Value::encrypted_scalar(DType::unsigned(4)))
        .build();
    let node = IntermediateNode::new(NodeKind::GenericFunction(double), vec![x()]).unwrap();
    let output = log.record(node, &[input]).unwrap();

    let graph = OperatorGraph::freeze(log, &[output]).unwrap();
    let tables = graph.tables(&TableConfig::default()).unwrap();
    assert_eq!(tables.len(), 1);

    let table = &tables[&graph.ordered_outputs()[0]];
    assert_eq!(table.len(), 8);
    assert_eq!(table.get(5), Some(&Data::int(10)));
}

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use veil_dtype::DType;

use super::generators::{Step, arb_program};
use crate::{Data, EntryId, IntermediateNode, NodeKind, OperatorGraph, TraceLog, Value};

/// Record a random program; entry 0 is the input `x`.
fn record(steps: &[Step]) -> (TraceLog, Vec<EntryId>) {
    let mut log = TraceLog::new();
    let mut ids = vec![log.record(IntermediateNode::input("x", 0, Value::encrypted_scalar(DType::unsigned(3))), &[]).unwrap()];

    for step in steps {
        let id = match *step {
            Step::Constant(value) => log.record(IntermediateNode::constant(Data::int(value)).unwrap(), &[]).unwrap(),
            Step::Add(lhs, rhs) | Step::Mul(lhs, rhs) => {
                let kind = if matches!(step, Step::Add(..)) { NodeKind::Add } else { NodeKind::Mul };
                let (lhs, rhs) = (ids[lhs % ids.len()], ids[rhs % ids.len()]);
                let inputs = vec![log.get(lhs).unwrap().node.output().clone(), log.get(rhs).unwrap().node.output().clone()];
                log.record(IntermediateNode::new(kind, inputs).unwrap(), &[lhs, rhs]).unwrap()
            }
        };
        ids.push(id);
    }

    (log, ids)
}

fn reachable(log: &TraceLog, outputs: &[EntryId]) -> HashSet<EntryId> {
    let mut seen = HashSet::new();
    let mut stack = outputs.to_vec();
    while let Some(entry) = stack.pop() {
        if seen.insert(entry) {
            stack.extend(log.get(entry).unwrap().operands.iter().copied());
        }
    }
    seen
}

proptest! {
    #[test]
    fn graph_is_closed_and_acyclic((steps, outputs) in arb_program()) {
        let (log, ids) = record(&steps);
        let outputs: Vec<EntryId> = outputs.iter().map(|o| ids[o % ids.len()]).collect();
        let expected = reachable(&log, &outputs).len();

        let graph = OperatorGraph::freeze(log, &outputs).unwrap();
        prop_assert!(graph.is_acyclic());
        prop_assert_eq!(graph.len(), expected);

        // Every node is reachable backward from some output.
        let mut seen = HashSet::new();
        let mut stack = graph.ordered_outputs().to_vec();
        while let Some(node) = stack.pop() {
            if seen.insert(node) {
                stack.extend_from_slice(graph.predecessors(node));
            }
        }
        prop_assert_eq!(seen.len(), graph.len());
        prop_assert_eq!(graph.topological_order().len(), graph.len());
    }

    #[test]
    fn graph_evaluation_matches_log((steps, outputs) in arb_program(), x in 0i64..8) {
        let (log, ids) = record(&steps);

        let mut direct: Vec<i64> = Vec::with_capacity(ids.len());
        for step in std::iter::once(None).chain(steps.iter().map(Some)) {
            let value = match step {
                None => x,
                Some(Step::Constant(value)) => *value,
                Some(Step::Add(lhs, rhs)) => direct[lhs % direct.len()].wrapping_add(direct[rhs % direct.len()]),
                Some(Step::Mul(lhs, rhs)) => direct[lhs % direct.len()].wrapping_mul(direct[rhs % direct.len()]),
            };
            direct.push(value);
        }

        let positions: Vec<usize> = outputs.iter().map(|o| o % ids.len()).collect();
        let entries: Vec<EntryId> = positions.iter().map(|&p| ids[p]).collect();
        let graph = OperatorGraph::freeze(log, &entries).unwrap();

        let result = graph.evaluate(&HashMap::from([(0, Data::int(x))])).unwrap();
        let expected: Vec<Data> = positions.iter().map(|&p| Data::int(direct[p])).collect();
        prop_assert_eq!(result, expected);
    }
}

//! Operator graph.
//!
//! A graph is frozen once from a [`TraceLog`] and a list of output entries.
//! Freezing walks backward from the outputs, so entries no output depends on
//! never become nodes.

pub mod log;

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

use smallvec::SmallVec;
use snafu::{OptionExt, ensure};

pub use log::{EntryId, LogEntry, TraceLog};

use crate::{
    Data, IntermediateNode, NodeKind, Result,
    error::*,
    tlu::{LookupTable, TableConfig},
};

/// Dense node index, assigned in discovery order from the outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Immutable DAG of IR nodes with designated outputs.
#[derive(Debug, Clone)]
pub struct OperatorGraph {
    nodes: Vec<IntermediateNode>,
    /// Producer of each input slot, per node.
    predecessors: Vec<SmallVec<[NodeId; 2]>>,
    successors: Vec<Vec<NodeId>>,
    inputs: Vec<NodeId>,
    outputs: Vec<NodeId>,
}

impl OperatorGraph {
    /// Extract the graph reachable backward from `outputs`.
    ///
    /// Nodes are numbered breadth-first: outputs first in the given order, then
    /// their operands slot by slot.
    pub fn freeze(log: TraceLog, outputs: &[EntryId]) -> Result<Self> {
        ensure!(!outputs.is_empty(), NoOutputsSnafu);

        let recorded = log.len();
        let mut ids: HashMap<EntryId, NodeId> = HashMap::new();
        let mut order: Vec<EntryId> = Vec::new();
        let mut queue = VecDeque::new();

        let mut discover = |entry: EntryId, order: &mut Vec<EntryId>, queue: &mut VecDeque<EntryId>| {
            *ids.entry(entry).or_insert_with(|| {
                order.push(entry);
                queue.push_back(entry);
                NodeId(order.len() - 1)
            })
        };

        let mut output_ids = Vec::with_capacity(outputs.len());
        for &output in outputs {
            ensure!(output.index() < recorded, UnknownEntrySnafu { entry: output.index() });
            output_ids.push(discover(output, &mut order, &mut queue));
        }
        while let Some(entry) = queue.pop_front() {
            let operands = log.get(entry).map(|e| e.operands.clone()).unwrap_or_default();
            for operand in operands {
                discover(operand, &mut order, &mut queue);
            }
        }

        let mut slots: Vec<Option<LogEntry>> = log.into_entries().into_iter().map(Some).collect();
        let mut nodes = Vec::with_capacity(order.len());
        let mut predecessors = Vec::with_capacity(order.len());
        for entry in &order {
            let LogEntry { node, operands } = slots[entry.index()].take().context(UnknownEntrySnafu { entry: entry.index() })?;
            predecessors.push(operands.iter().map(|operand| ids[operand]).collect::<SmallVec<[NodeId; 2]>>());
            nodes.push(node);
        }

        let mut successors = vec![Vec::new(); nodes.len()];
        for (consumer, producers) in predecessors.iter().enumerate() {
            for producer in producers {
                let consumers: &mut Vec<NodeId> = &mut successors[producer.0];
                if !consumers.contains(&NodeId(consumer)) {
                    consumers.push(NodeId(consumer));
                }
            }
        }

        let mut inputs: Vec<(usize, NodeId)> = nodes
            .iter()
            .enumerate()
            .filter_map(|(id, node)| match node.kind() {
                NodeKind::Input { position, .. } => Some((*position, NodeId(id))),
                _ => None,
            })
            .collect();
        inputs.sort_unstable();

        tracing::debug!(recorded, kept = nodes.len(), pruned = recorded - nodes.len(), "froze operator graph");

        Ok(Self {
            nodes,
            predecessors,
            successors,
            inputs: inputs.into_iter().map(|(_, id)| id).collect(),
            outputs: output_ids,
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn node(&self, id: NodeId) -> &IntermediateNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &IntermediateNode)> {
        self.nodes.iter().enumerate().map(|(id, node)| (NodeId(id), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Producers of `id`, in input slot order.
    pub fn predecessors(&self, id: NodeId) -> &[NodeId] {
        &self.predecessors[id.0]
    }

    /// Distinct consumers of `id`.
    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        &self.successors[id.0]
    }

    /// Input nodes by declared parameter position.
    ///
    /// Parameters the outputs do not depend on have no node.
    pub fn ordered_inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn ordered_outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    /// Nodes ordered so that every producer precedes its consumers.
    ///
    /// Post-order DFS from the outputs in order, visiting input slots left to right.
    pub fn topological_order(&self) -> Vec<NodeId> {
        let mut visited = vec![false; self.nodes.len()];
        let mut result = Vec::with_capacity(self.nodes.len());

        for &output in &self.outputs {
            let mut stack = vec![(output, false)];
            while let Some((node, processed)) = stack.pop() {
                if visited[node.0] {
                    continue;
                }

                if processed {
                    visited[node.0] = true;
                    result.push(node);
                } else {
                    stack.push((node, true));
                    // Reverse so slot 0 is visited first
                    for &producer in self.predecessors[node.0].iter().rev() {
                        if !visited[producer.0] {
                            stack.push((producer, false));
                        }
                    }
                }
            }
        }

        result
    }

    /// Check that no node depends on itself.
    pub fn is_acyclic(&self) -> bool {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        let mut marks = vec![Mark::New; self.nodes.len()];
        for root in 0..self.nodes.len() {
            let mut stack = vec![(NodeId(root), false)];
            while let Some((node, processed)) = stack.pop() {
                if processed {
                    marks[node.0] = Mark::Done;
                    continue;
                }
                if marks[node.0] != Mark::New {
                    continue;
                }

                marks[node.0] = Mark::Active;
                stack.push((node, true));
                for &producer in &self.predecessors[node.0] {
                    match marks[producer.0] {
                        Mark::Active => return false,
                        Mark::New => stack.push((producer, false)),
                        Mark::Done => {}
                    }
                }
            }
        }

        true
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Evaluate the graph and return the outputs in designated order.
    ///
    /// `inputs` maps parameter positions to data.
    pub fn evaluate(&self, inputs: &HashMap<usize, Data>) -> Result<Vec<Data>> {
        let results = self.evaluate_all(inputs)?;
        Ok(self.outputs.iter().map(|output| results[output.0].clone()).collect())
    }

    /// Evaluate every node, indexed by [`NodeId::index`].
    pub fn evaluate_all(&self, inputs: &HashMap<usize, Data>) -> Result<Vec<Data>> {
        let mut results: Vec<Option<Data>> = vec![None; self.nodes.len()];

        for id in self.topological_order() {
            let node = &self.nodes[id.0];
            let arguments = match node.kind() {
                NodeKind::Input { position, .. } => {
                    vec![inputs.get(position).context(MissingInputSnafu { position: *position })?.clone()]
                }
                _ => self.predecessors[id.0].iter().filter_map(|producer| results[producer.0].clone()).collect(),
            };
            results[id.0] = Some(node.evaluate(&arguments)?);
        }

        Ok(results.into_iter().flatten().collect())
    }

    /// Synthesize the lookup table of every eligible node.
    pub fn tables(&self, config: &TableConfig) -> Result<BTreeMap<NodeId, LookupTable>> {
        self.nodes()
            .filter(|(_, node)| node.is_table_eligible())
            .map(|(id, node)| Ok((id, node.table(config)?)))
            .collect()
    }
}

impl fmt::Display for OperatorGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in self.topological_order() {
            let node = &self.nodes[id.0];
            write!(f, "{id} = {}", node.label())?;

            let producers = &self.predecessors[id.0];
            if !producers.is_empty() {
                let operands = producers.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
                write!(f, " ({operands})")?;
            }
            writeln!(f, " : {}", node.output())?;
        }

        let outputs = self.outputs.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        write!(f, "return {outputs}")
    }
}

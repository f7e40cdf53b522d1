//! Append-only record of a trace.

use smallvec::SmallVec;
use snafu::{OptionExt, ensure};

use crate::{IntermediateNode, Result, error::*};

/// Position of an entry in a [`TraceLog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(usize);

impl EntryId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A recorded node and the entries feeding its input slots.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub node: IntermediateNode,
    pub operands: SmallVec<[EntryId; 2]>,
}

/// Nodes in the order the traced function created them.
///
/// Operands always refer to earlier entries, so the log is acyclic by construction.
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
    entries: Vec<LogEntry>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `node`, fed by `operands` slot by slot.
    ///
    /// Every operand must be an earlier entry whose output equals the value the
    /// node recorded for that slot.
    pub fn record(&mut self, node: IntermediateNode, operands: &[EntryId]) -> Result<EntryId> {
        let entry = self.entries.len();
        let expected = node.n_edges();
        ensure!(operands.len() == expected, AritySnafu { node: node.kind().name(), expected, actual: operands.len() });

        for (slot, (operand, recorded)) in operands.iter().zip(node.inputs()).enumerate() {
            let producer = self.entries.get(operand.0).context(ForwardReferenceSnafu { entry, operand: operand.0 })?;
            let actual = producer.node.output();
            ensure!(
                actual == recorded,
                OperandMismatchSnafu { slot, expected: recorded.clone(), actual: actual.clone() }
            );
        }

        tracing::trace!(entry, label = %node.label(), output = %node.output(), "recorded node");
        self.entries.push(LogEntry { node, operands: operands.into() });
        Ok(EntryId(entry))
    }

    pub fn get(&self, id: EntryId) -> Option<&LogEntry> {
        self.entries.get(id.0)
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

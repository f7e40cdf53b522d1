//! Table lookup synthesis.
//!
//! An elementwise function over an unsigned integer input is turned into a
//! total table: the function is evaluated on every representable input, and
//! inputs it cannot handle are filled from the nearest defined entry.

use std::collections::VecDeque;

use bon::bon;
use rayon::prelude::*;
use snafu::{OptionExt, ensure};

use crate::{
    Data, Result, Value,
    error::*,
    node::{FunctionKind, GenericFunction, IntermediateNode},
};

/// Hard ceiling on table input width, whatever the configuration asks for.
pub const MAX_TABLE_BIT_WIDTH: u32 = 32;

/// Limits and execution options for table synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    /// Widest input, in bits, a table is built for.
    pub max_bit_width: u32,
    /// Evaluate the sweep on the rayon thread pool.
    pub parallel: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { max_bit_width: 16, parallel: false }
    }
}

#[bon]
impl TableConfig {
    #[builder]
    pub fn new(#[builder(default = 16)] max_bit_width: u32, #[builder(default = false)] parallel: bool) -> Self {
        Self { max_bit_width, parallel }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `VEIL_TLU_MAX_BITS` - Widest table input in bits (default: 16)
    /// * `VEIL_TLU_PARALLEL` - Parallel sweep if set to `1` or `true`
    pub fn from_env() -> Self {
        let max_bit_width = std::env::var("VEIL_TLU_MAX_BITS").ok().and_then(|s| s.parse().ok()).unwrap_or(16);
        let parallel = std::env::var("VEIL_TLU_PARALLEL").is_ok_and(|s| matches!(s.as_str(), "1" | "true"));

        Self { max_bit_width, parallel }
    }
}

/// Total lookup table, indexed by the input value.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    entries: Vec<Data>,
    repaired: usize,
}

impl LookupTable {
    pub fn entries(&self) -> &[Data] {
        &self.entries
    }

    pub fn get(&self, input: usize) -> Option<&Data> {
        self.entries.get(input)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries filled from a neighbour instead of the function.
    pub fn repaired(&self) -> usize {
        self.repaired
    }

    pub fn into_entries(self) -> Vec<Data> {
        self.entries
    }
}

/// Fill every undefined entry with the value of its nearest defined entry.
///
/// The worklist is seeded with the defined indices in ascending order; each
/// popped index copies its value into an undefined left neighbour, then an
/// undefined right neighbour. Equidistant gaps therefore take the value that
/// reaches them first in that order.
///
/// Returns the number of repaired entries, or `None` when no entry is defined.
pub fn flood_fill<T: Clone>(table: &mut [Option<T>]) -> Option<usize> {
    let mut worklist: VecDeque<usize> = (0..table.len()).filter(|&i| table[i].is_some()).collect();
    if worklist.is_empty() {
        return None;
    }

    let mut repaired = 0;
    while let Some(index) = worklist.pop_front() {
        let neighbours = [index.checked_sub(1), Some(index + 1).filter(|&right| right < table.len())];
        for neighbour in neighbours.into_iter().flatten() {
            if table[neighbour].is_none() {
                table[neighbour] = table[index].clone();
                worklist.push_back(neighbour);
                repaired += 1;
            }
        }
    }

    assert!(table.iter().all(Option::is_some), "flood fill left undefined entries");
    Some(repaired)
}

impl GenericFunction {
    /// Synthesize the lookup table of this function over `input`.
    ///
    /// Inputs for which the function fails or yields a non-finite number are
    /// undefined and get repaired with [`flood_fill`].
    pub fn table(&self, input: &Value, config: &TableConfig) -> Result<LookupTable> {
        ensure!(
            self.kind() == FunctionKind::Tlu && input.dtype.is_unsigned_integer(),
            TableUnsupportedSnafu { node: self.name(), input: input.clone() }
        );

        let bit_width = input.dtype.bit_width();
        let max_bit_width = config.max_bit_width.min(MAX_TABLE_BIT_WIDTH);
        ensure!(bit_width <= max_bit_width, TableTooLargeSnafu { bit_width, max_bit_width });

        let size = 1usize.checked_shl(bit_width).context(TableTooLargeSnafu { bit_width, max_bit_width })?;
        let evaluate_at = |value: usize| self.call(&Data::int(value as i64)).ok().filter(Data::is_finite);
        let mut entries: Vec<Option<Data>> = if config.parallel {
            (0..size).into_par_iter().map(evaluate_at).collect()
        } else {
            (0..size).map(evaluate_at).collect()
        };

        let repaired = flood_fill(&mut entries).context(EmptyDomainSnafu { node: self.name() })?;
        tracing::debug!(function = self.name(), size, repaired, "lookup table synthesized");

        let entries: Vec<Data> = entries.into_iter().flatten().collect();
        assert_eq!(entries.len(), size, "repaired table must be total");
        Ok(LookupTable { entries, repaired })
    }
}

impl IntermediateNode {
    /// Synthesize the lookup table of a `GenericFunction` node.
    pub fn table(&self, config: &TableConfig) -> Result<LookupTable> {
        match (self.as_function(), self.inputs().first()) {
            (Some(function), Some(input)) => function.table(input, config),
            _ => TableUnsupportedSnafu { node: self.label(), input: self.output().clone() }.fail(),
        }
    }
}

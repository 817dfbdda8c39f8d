//! Stable indexing for solver integration.
//!
//! Maps between contiguous solver indices (0..N) and `(block, variable)`
//! pairs. The order is block order as given, then each block's declared
//! variable order, and never changes once built.

use std::ops::Range;

use hn_core::BlockId;

use crate::error::{GraphError, GraphResult};
use crate::network::Network;

/// One unknown: a block and the position of a variable in its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub block: BlockId,
    pub var: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateIndex {
    /// Contiguous list of keys (index -> key).
    keys: Vec<StateKey>,
    /// Reverse lookup: block slot -> range of solver indices.
    /// Sized to the network; `None` for blocks outside the index.
    ranges: Vec<Option<Range<usize>>>,
}

impl StateIndex {
    /// Index every variable of `blocks`, which must exist and be unique.
    pub fn build(network: &Network, blocks: &[BlockId]) -> GraphResult<Self> {
        let mut keys = Vec::new();
        let mut ranges = vec![None; network.len()];
        for &id in blocks {
            let block = network.block(id)?;
            let slot = &mut ranges[id.slot()];
            if slot.is_some() {
                return Err(GraphError::Core(hn_core::HnError::InvalidArg {
                    what: "block listed twice in state index",
                }));
            }
            let start = keys.len();
            keys.extend((0..block.state().len()).map(|var| StateKey { block: id, var }));
            *slot = Some(start..keys.len());
        }
        Ok(Self { keys, ranges })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[StateKey] {
        &self.keys
    }

    pub fn key(&self, index: usize) -> Option<StateKey> {
        self.keys.get(index).copied()
    }

    /// Solver indices covering `block`, if it is indexed.
    pub fn block_range(&self, block: BlockId) -> Option<Range<usize>> {
        self.ranges.get(block.slot()).cloned().flatten()
    }

    pub fn contains(&self, block: BlockId) -> bool {
        self.block_range(block).is_some()
    }

    /// Solver index of `block.variable`.
    pub fn position(&self, network: &Network, block: BlockId, variable: &str) -> GraphResult<usize> {
        let b = network.block(block)?;
        let unknown = || GraphError::UnknownVariable {
            block: b.name().to_string(),
            variable: variable.to_string(),
            context: "state index",
        };
        let range = self.block_range(block).ok_or_else(unknown)?;
        let var = b.state().get_index_of(variable).ok_or_else(unknown)?;
        Ok(range.start + var)
    }

    /// Column labels `<block>_<var>` in index order.
    pub fn labels(&self, network: &Network) -> Vec<String> {
        self.keys
            .iter()
            .filter_map(|key| {
                let block = network.block(key.block).ok()?;
                let (name, _) = block.state().get_index(key.var)?;
                Some(format!("{}_{}", block.name(), name))
            })
            .collect()
    }
}

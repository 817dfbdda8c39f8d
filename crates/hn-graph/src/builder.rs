//! Incremental network builder.

use hn_core::BlockId;

use crate::block::Block;
use crate::error::{GraphError, GraphResult};
use crate::flux::Flux;
use crate::network::Network;
use crate::source::Source;
use crate::validate;

/// Builder for assembling a network of blocks.
///
/// Add blocks first so fluxes can refer to them by id, attach fluxes and
/// sources, then call `build()` to validate and freeze everything into an
/// immutable `Network`.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    blocks: Vec<Block>,
}

impl NetworkBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block and return its id.
    pub fn add_block(&mut self, block: Block) -> BlockId {
        let id = BlockId::from_index(self.blocks.len() as u32);
        self.blocks.push(block);
        id
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.slot())
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(id.slot())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Attach `flux` to `owner`. The neighbor is checked at `build()`.
    pub fn add_flux(&mut self, owner: BlockId, flux: Flux) -> GraphResult<()> {
        self.block_mut(owner)
            .ok_or(GraphError::InvalidBlockRef { id: owner })?
            .add_flux(flux);
        Ok(())
    }

    pub fn add_source(&mut self, block: BlockId, source: Source) -> GraphResult<()> {
        self.block_mut(block)
            .ok_or(GraphError::InvalidBlockRef { id: block })?
            .add_source(source);
        Ok(())
    }

    /// Validate and freeze into an immutable network.
    pub fn build(mut self) -> GraphResult<Network> {
        let names = validate::validate_blocks(&mut self.blocks)?;
        Ok(Network {
            blocks: self.blocks,
            names,
        })
    }
}

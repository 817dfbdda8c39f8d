//! Frozen block arena and residual assembly.

use std::collections::HashMap;

use hn_core::{BlockId, Real, StateView, ensure_finite};
use hn_materials::Material;

use crate::block::Block;
use crate::error::{GraphError, GraphResult};

/// Evaluation context threaded through every residual term.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EvalContext {
    pub time: Real,
}

impl EvalContext {
    pub fn at(time: Real) -> Self {
        Self { time }
    }
}

/// A block paired with the values it should be evaluated at.
#[derive(Debug, Clone, Copy)]
pub struct BlockRef<'a> {
    pub block: &'a Block,
    pub state: StateView<'a>,
}

impl<'a> BlockRef<'a> {
    pub fn new(block: &'a Block, values: &'a [Real]) -> Self {
        Self {
            block,
            state: StateView::new(&block.state, values),
        }
    }

    pub(crate) fn material_for(&self, needed: &'static str) -> GraphResult<&'a Material> {
        self.block
            .material
            .as_deref()
            .ok_or_else(|| GraphError::MissingMaterial {
                block: self.block.name.clone(),
                needed,
            })
    }
}

/// Per-block value vectors, laid out in each block's declaration order.
///
/// Solvers evaluate the network on a snapshot instead of mutating blocks,
/// so residual evaluation stays free of side effects.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    values: Vec<Vec<Real>>,
}

impl Snapshot {
    pub fn block(&self, id: BlockId) -> &[Real] {
        &self.values[id.slot()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut [Real] {
        &mut self.values[id.slot()]
    }
}

/// An immutable network topology.
///
/// Created by `NetworkBuilder::build()`. Blocks reference each other by
/// `BlockId`; the set of blocks, fluxes, sources and declared variables is
/// fixed. Only state values and block time can change afterwards.
#[derive(Debug, Clone)]
pub struct Network {
    pub(crate) blocks: Vec<Block>,
    pub(crate) names: HashMap<String, BlockId>,
}

impl Network {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.blocks.len() as u32).map(BlockId::from_index)
    }

    pub fn contains(&self, id: BlockId) -> bool {
        id.slot() < self.blocks.len()
    }

    pub fn block(&self, id: BlockId) -> GraphResult<&Block> {
        self.blocks
            .get(id.slot())
            .ok_or(GraphError::InvalidBlockRef { id })
    }

    pub fn id_of(&self, name: &str) -> GraphResult<BlockId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownBlock { name: name.into() })
    }

    pub fn block_by_name(&self, name: &str) -> GraphResult<&Block> {
        self.block(self.id_of(name)?)
    }

    /// Copy of every block's current values.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            values: self
                .blocks
                .iter()
                .map(|b| b.state.values().copied().collect())
                .collect(),
        }
    }

    pub fn block_ref<'a>(&'a self, snapshot: &'a Snapshot, id: BlockId) -> BlockRef<'a> {
        BlockRef::new(&self.blocks[id.slot()], snapshot.block(id))
    }

    /// Sum of flux and source contributions for every variable of `id`.
    pub fn block_residual(
        &self,
        id: BlockId,
        snapshot: &Snapshot,
        ctx: EvalContext,
    ) -> GraphResult<Vec<Real>> {
        let owner = self.block_ref(snapshot, id);
        let mut acc = vec![0.0; owner.block.state.len()];
        for flux in &owner.block.fluxes {
            let neighbor = self.block_ref(snapshot, flux.neighbor);
            flux.accumulate(owner, neighbor, ctx.time, &mut acc)?;
        }
        for source in &owner.block.sources {
            source.accumulate(owner.block, ctx.time, &mut acc)?;
        }
        Ok(acc)
    }

    /// Contribution of the `index`-th flux of `id` alone.
    pub fn flux_value(
        &self,
        id: BlockId,
        index: usize,
        snapshot: &Snapshot,
        ctx: EvalContext,
    ) -> GraphResult<Vec<Real>> {
        let owner = self.block_ref(snapshot, id);
        let flux = owner
            .block
            .fluxes
            .get(index)
            .ok_or(GraphError::Core(hn_core::HnError::IndexOob {
                what: "flux",
                index,
                len: owner.block.fluxes.len(),
            }))?;
        let mut acc = vec![0.0; owner.block.state.len()];
        flux.accumulate(owner, self.block_ref(snapshot, flux.neighbor), ctx.time, &mut acc)?;
        Ok(acc)
    }

    /// Values a boundary block takes at `ctx`: the sum of its sources, or
    /// `None` if it has none and is therefore held fixed.
    pub fn drive(&self, id: BlockId, ctx: EvalContext) -> GraphResult<Option<Vec<Real>>> {
        let block = self.block(id)?;
        if block.sources.is_empty() {
            return Ok(None);
        }
        let mut acc = vec![0.0; block.state.len()];
        for source in &block.sources {
            source.accumulate(block, ctx.time, &mut acc)?;
        }
        Ok(Some(acc))
    }

    /// Divisors turning the residual of `id` into a time derivative.
    pub fn rate_divisors(&self, id: BlockId, snapshot: &Snapshot) -> GraphResult<Vec<Real>> {
        let owner = self.block_ref(snapshot, id);
        let scaling = owner
            .block
            .rate_scaling
            .as_ref()
            .ok_or_else(|| GraphError::MissingRateScaling {
                block: owner.block.name.clone(),
            })?;
        scaling.divisors(owner)
    }

    /// Per-variable flags: does any flux or source write this variable?
    pub fn touched_variables(&self, id: BlockId) -> GraphResult<Vec<bool>> {
        let block = self.block(id)?;
        let mut touched = vec![!block.sources.is_empty(); block.state.len()];
        for flux in &block.fluxes {
            for link in &flux.links {
                touched[link.owner] = true;
            }
        }
        Ok(touched)
    }

    /// Overwrite every value of `id` and stamp its time.
    pub fn commit(&mut self, id: BlockId, values: &[Real], time: Real) -> GraphResult<()> {
        let block = self
            .blocks
            .get_mut(id.slot())
            .ok_or(GraphError::InvalidBlockRef { id })?;
        if values.len() != block.state.len() {
            return Err(GraphError::Core(hn_core::HnError::IndexOob {
                what: "committed values",
                index: values.len(),
                len: block.state.len(),
            }));
        }
        for v in values {
            ensure_finite(*v, "committed value")?;
        }
        for (slot, v) in block.state.values_mut().zip(values) {
            *slot = *v;
        }
        block.time = time;
        Ok(())
    }

    /// Set one declared variable; undeclared names are rejected.
    pub fn set_var(&mut self, id: BlockId, name: &str, value: Real) -> GraphResult<()> {
        let block = self
            .blocks
            .get_mut(id.slot())
            .ok_or(GraphError::InvalidBlockRef { id })?;
        match block.state.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(GraphError::UnknownVariable {
                block: block.name.clone(),
                variable: name.into(),
                context: "assignment",
            }),
        }
    }

    /// Stamp every block with `time`.
    pub fn set_time(&mut self, time: Real) {
        for block in &mut self.blocks {
            block.time = time;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Flux, NetworkBuilder, Source, TimeSeries, TimeSignal};
    use crate::source::Interpolation;

    fn chain() -> (Network, BlockId, BlockId, BlockId) {
        let mut b = NetworkBuilder::new();
        let cold = b.add_block(Block::new("cold").with_var("T", 0.0));
        let mid = b.add_block(Block::new("mid").with_var("T", 3.0));
        let hot = b.add_block(Block::new("hot").with_var("T", 10.0));
        b.add_flux(mid, Flux::conductance(cold, 1.0)).unwrap();
        b.add_flux(mid, Flux::conductance(hot, 2.0)).unwrap();
        b.add_source(mid, Source::constant([("T", 0.5)])).unwrap();
        (b.build().unwrap(), cold, mid, hot)
    }

    #[test]
    fn residual_sums_fluxes_and_sources() {
        let (net, _, mid, _) = chain();
        let snap = net.snapshot();
        let r = net.block_residual(mid, &snap, EvalContext::default()).unwrap();
        // 1*(0-3) + 2*(10-3) + 0.5
        assert!((r[0] - 11.5).abs() < 1e-12);
    }

    #[test]
    fn residual_reads_snapshot_not_committed_state() {
        let (net, _, mid, _) = chain();
        let mut snap = net.snapshot();
        snap.block_mut(mid)[0] = 5.0;
        let r = net.block_residual(mid, &snap, EvalContext::default()).unwrap();
        assert!((r[0] - (-5.0 + 10.0 + 0.5)).abs() < 1e-12);
        assert_eq!(net.block(mid).unwrap().var("T"), Some(3.0));
    }

    #[test]
    fn flux_value_isolates_one_edge() {
        let (net, _, mid, _) = chain();
        let snap = net.snapshot();
        let v = net.flux_value(mid, 1, &snap, EvalContext::default()).unwrap();
        assert_eq!(v, vec![14.0]);
        assert!(net.flux_value(mid, 2, &snap, EvalContext::default()).is_err());
    }

    #[test]
    fn drive_sums_sources_at_time() {
        let mut b = NetworkBuilder::new();
        let series = TimeSeries::new(vec![0.0, 10.0], vec![0.0, 20.0], Interpolation::Linear).unwrap();
        let amb = b.add_block(Block::new("amb").with_var("T", 0.0));
        let fixed = b.add_block(Block::new("fixed").with_var("T", 1.0));
        b.add_source(amb, Source::time_driven([("T", TimeSignal::Series(series))]))
            .unwrap();
        b.add_source(amb, Source::constant([("T", 1.0)])).unwrap();
        let net = b.build().unwrap();

        assert_eq!(net.drive(amb, EvalContext::at(5.0)).unwrap(), Some(vec![11.0]));
        assert_eq!(net.drive(fixed, EvalContext::at(5.0)).unwrap(), None);
        assert!(matches!(
            net.drive(amb, EvalContext::at(11.0)),
            Err(GraphError::DataRange { .. })
        ));
    }

    #[test]
    fn commit_and_set_var_only_touch_values() {
        let (mut net, cold, mid, _) = chain();
        net.commit(mid, &[4.0], 2.5).unwrap();
        let block = net.block(mid).unwrap();
        assert_eq!(block.var("T"), Some(4.0));
        assert_eq!(block.time(), 2.5);
        assert!(net.commit(mid, &[1.0, 2.0], 0.0).is_err());
        assert!(matches!(
            net.commit(mid, &[f64::NAN], 3.0),
            Err(GraphError::Core(hn_core::HnError::NonFinite { .. }))
        ));
        assert_eq!(net.block(mid).unwrap().time(), 2.5);
        net.set_var(cold, "T", -1.0).unwrap();
        assert!(net.set_var(cold, "P", 1.0).is_err());
    }

    #[test]
    fn touched_variables_reflect_links() {
        let (net, cold, mid, _) = chain();
        assert_eq!(net.touched_variables(mid).unwrap(), vec![true]);
        assert_eq!(net.touched_variables(cold).unwrap(), vec![false]);
    }

    #[test]
    fn lookup_by_name() {
        let (net, _, mid, _) = chain();
        assert_eq!(net.id_of("mid").unwrap(), mid);
        assert!(matches!(net.id_of("nope"), Err(GraphError::UnknownBlock { .. })));
    }
}

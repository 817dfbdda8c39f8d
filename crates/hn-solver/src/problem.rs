//! Problem definition: which blocks are unknown, which are driven.

use std::collections::HashSet;

use hn_core::{BlockId, Real};
use hn_graph::{EvalContext, GraphError, Network, Snapshot, StateIndex};
use nalgebra::DVector;

use crate::error::{SolverError, SolverResult};

/// A network partitioned into solvable and boundary blocks.
///
/// The unknown vector covers every variable of every solvable block, in the
/// order the solvable blocks were given and then each block's declaration
/// order. Boundary blocks take the sum of their sources at the evaluation
/// time. Blocks in neither list keep whatever state they hold.
#[derive(Debug, Clone)]
pub struct Problem {
    network: Network,
    solvable: Vec<BlockId>,
    boundary: Vec<BlockId>,
    index: StateIndex,
    time: Real,
}

impl Problem {
    pub fn new(
        network: Network,
        solvable: Vec<BlockId>,
        boundary: Vec<BlockId>,
    ) -> SolverResult<Self> {
        let mut seen = HashSet::new();
        for &id in solvable.iter().chain(&boundary) {
            let block = network.block(id)?;
            if !seen.insert(id) {
                return Err(SolverError::ProblemSetup {
                    what: format!(
                        "block '{}' listed more than once as solvable or boundary",
                        block.name()
                    ),
                });
            }
        }

        for &id in &boundary {
            let block = network.block(id)?;
            if block.sources().is_empty() {
                return Err(SolverError::ProblemSetup {
                    what: format!("boundary block '{}' has no source to drive it", block.name()),
                });
            }
        }

        for &id in &solvable {
            let block = network.block(id)?;
            let touched = network.touched_variables(id)?;
            if let Some((name, _)) = block
                .state()
                .keys()
                .zip(&touched)
                .find(|(_, touched)| !**touched)
            {
                return Err(GraphError::UnconstrainedVariable {
                    block: block.name().to_string(),
                    variable: name.clone(),
                }
                .into());
            }
        }

        let index = StateIndex::build(&network, &solvable)?;
        let time = network.blocks().first().map_or(0.0, |b| b.time());
        Ok(Self {
            network,
            solvable,
            boundary,
            index,
            time,
        })
    }

    /// Same as [`Problem::new`], naming blocks instead of passing ids.
    pub fn from_names(network: Network, solvable: &[&str], boundary: &[&str]) -> SolverResult<Self> {
        let ids = |names: &[&str]| -> SolverResult<Vec<BlockId>> {
            names
                .iter()
                .map(|n| network.id_of(n).map_err(SolverError::from))
                .collect()
        };
        let (s, b) = (ids(solvable)?, ids(boundary)?);
        Self::new(network, s, b)
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Mutable access for adjusting state values between solves, e.g. the
    /// initial guess or held blocks. The topology itself is frozen.
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    pub fn solvable(&self) -> &[BlockId] {
        &self.solvable
    }

    pub fn boundary(&self) -> &[BlockId] {
        &self.boundary
    }

    pub fn index(&self) -> &StateIndex {
        &self.index
    }

    /// Number of unknowns.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Time of the last commit.
    pub fn time(&self) -> Real {
        self.time
    }

    pub fn set_time(&mut self, time: Real) {
        self.time = time;
        self.network.set_time(time);
    }

    /// `<block>_<var>` label for every unknown.
    pub fn labels(&self) -> Vec<String> {
        self.index.labels(&self.network)
    }

    /// Current solvable state as an unknown vector.
    pub fn pack(&self) -> DVector<f64> {
        let snapshot = self.network.snapshot();
        DVector::from_iterator(
            self.index.len(),
            self.index
                .keys()
                .iter()
                .map(|key| snapshot.block(key.block)[key.var]),
        )
    }

    /// Snapshot at time `t` with boundaries driven first, then `x` unpacked.
    pub fn snapshot_at(&self, x: &DVector<f64>, t: Real) -> SolverResult<Snapshot> {
        self.check_len(x)?;
        let ctx = EvalContext::at(t);
        let mut snapshot = self.network.snapshot();
        for &id in &self.boundary {
            if let Some(values) = self.network.drive(id, ctx)? {
                snapshot.block_mut(id).copy_from_slice(&values);
            }
        }
        for (key, value) in self.index.keys().iter().zip(x.iter()) {
            snapshot.block_mut(key.block)[key.var] = *value;
        }
        Ok(snapshot)
    }

    /// Residual of every solvable block at `x` and time `t`.
    ///
    /// Pure: reads the network and writes nothing, so solvers may call it
    /// any number of times and in any order.
    pub fn residual(&self, x: &DVector<f64>, t: Real) -> SolverResult<DVector<f64>> {
        let snapshot = self.snapshot_at(x, t)?;
        self.assemble(&snapshot, t, |_, r| Ok(r))
    }

    /// Residual divided by each block's rate scaling: the state derivative.
    pub fn rate(&self, x: &DVector<f64>, t: Real) -> SolverResult<DVector<f64>> {
        let snapshot = self.snapshot_at(x, t)?;
        self.assemble(&snapshot, t, |id, mut r| {
            let divisors = self.network.rate_divisors(id, &snapshot)?;
            for (v, c) in r.iter_mut().zip(&divisors) {
                *v /= c;
            }
            Ok(r)
        })
    }

    fn assemble<F>(&self, snapshot: &Snapshot, t: Real, mut per_block: F) -> SolverResult<DVector<f64>>
    where
        F: FnMut(BlockId, Vec<Real>) -> SolverResult<Vec<Real>>,
    {
        let ctx = EvalContext::at(t);
        let mut out = Vec::with_capacity(self.index.len());
        for &id in &self.solvable {
            let r = self.network.block_residual(id, snapshot, ctx)?;
            out.extend(per_block(id, r)?);
        }
        for (i, v) in out.iter().enumerate() {
            if !v.is_finite() {
                let label = self.labels().swap_remove(i);
                return Err(SolverError::Numeric {
                    what: format!("non-finite residual {v} for {label}"),
                });
            }
        }
        Ok(DVector::from_vec(out))
    }

    /// Write `x` into the solvable blocks, drive the boundaries at `t` and
    /// stamp every block with `t`.
    pub fn commit(&mut self, x: &DVector<f64>, t: Real) -> SolverResult<()> {
        let snapshot = self.snapshot_at(x, t)?;
        for &id in self.solvable.iter().chain(&self.boundary) {
            self.network.commit(id, snapshot.block(id), t)?;
        }
        self.set_time(t);
        Ok(())
    }

    /// Unknowns whose block carries at least one source.
    pub fn source_bearing_rows(&self) -> Vec<usize> {
        self.index
            .keys()
            .iter()
            .enumerate()
            .filter(|(_, key)| {
                self.network
                    .block(key.block)
                    .is_ok_and(|b| !b.sources().is_empty())
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Committed value of `block.variable`.
    pub fn value(&self, block: &str, variable: &str) -> SolverResult<Real> {
        let b = self.network.block_by_name(block)?;
        b.var(variable).ok_or_else(|| {
            GraphError::UnknownVariable {
                block: block.to_string(),
                variable: variable.to_string(),
                context: "lookup",
            }
            .into()
        })
    }

    fn check_len(&self, x: &DVector<f64>) -> SolverResult<()> {
        if x.len() == self.index.len() {
            Ok(())
        } else {
            Err(SolverError::InvalidState {
                what: format!(
                    "unknown vector has {} entries, problem has {}",
                    x.len(),
                    self.index.len()
                ),
            })
        }
    }
}

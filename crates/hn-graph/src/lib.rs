//! hn-graph: block/flux/source network layer for heatnet.
//!
//! Provides:
//! - `Block`: a named control volume with ordered state variables, owned
//!   fluxes and sources, optional mass-flow and rate-scaling accessors
//! - `Flux`: a pairwise exchange term drawn from a closed formula set
//! - `Source`: constant or time-driven forcing
//! - `NetworkBuilder` with assembly-time validation, frozen into a `Network`
//!   arena where blocks refer to each other by `BlockId`
//! - `StateIndex`: the stable mapping between solver vectors and
//!   `(block, variable)` pairs
//!
//! Sign convention: every flux and source value is the net rate *into* the
//! owning block. A block residual is the plain sum of its flux and source
//! contributions.
//!
//! # Example
//!
//! ```
//! use hn_graph::{Block, Flux, NetworkBuilder, Source};
//!
//! let mut builder = NetworkBuilder::new();
//! let cold = builder.add_block(Block::new("cold").with_var("T", 0.0));
//! let mid = builder.add_block(Block::new("mid").with_var("T", 1.0));
//! let hot = builder.add_block(Block::new("hot").with_var("T", 10.0));
//! builder.add_flux(mid, Flux::conductance(cold, 1.0)).unwrap();
//! builder.add_flux(mid, Flux::conductance(hot, 1.0)).unwrap();
//! builder.add_source(mid, Source::constant([("T", 0.0)])).unwrap();
//! let network = builder.build().unwrap();
//!
//! assert_eq!(network.len(), 3);
//! assert_eq!(network.id_of("mid").unwrap(), mid);
//! ```

pub mod block;
pub mod builder;
pub mod error;
pub mod flux;
pub mod indexing;
pub mod network;
pub mod source;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use block::{Block, MassFlow, RateScaling};
pub use builder::NetworkBuilder;
pub use error::{GraphError, GraphResult};
pub use flux::{ConductanceClass, Flux, FluxKind, LayerGeometry, LayeredPath, PathSide};
pub use indexing::{StateIndex, StateKey};
pub use network::{BlockRef, EvalContext, Network, Snapshot};
pub use source::{Interpolation, SignalFn, Source, TimeSeries, TimeSignal};

//! hn-core: stable foundation for heatnet.
//!
//! Contains:
//! - units (uom SI length/area types + constructors for geometry inputs)
//! - numeric (Real, finiteness check, polynomial evaluation)
//! - ids (stable compact IDs for arena objects)
//! - state (ordered per-block variable maps)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod state;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{HnError, HnResult};
pub use ids::*;
pub use numeric::*;
pub use state::{StateLookup, StateMap, StateView};
pub use units::*;

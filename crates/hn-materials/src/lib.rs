//! hn-materials: material property provider for heatnet.
//!
//! Provides:
//! - Named material definitions (liquid, gas, solid)
//! - State-dependent property functions (constant or polynomial fits with a
//!   fitted domain)
//! - `MaterialRegistry`, an explicit registry object handed to network
//!   construction instead of ambient global tables
//! - The built-in catalog used by the façade collector models
//!
//! # Example
//!
//! ```
//! use hn_core::StateMap;
//! use hn_materials::{MaterialRegistry, Property};
//!
//! let registry = MaterialRegistry::builtin();
//! let water = registry.get("water").unwrap();
//!
//! let mut state = StateMap::new();
//! state.insert("T".into(), 20.0);
//! let rho = water.eval(Property::Density, &state).unwrap();
//! assert!((rho - 997.774).abs() < 1e-9);
//! ```

pub mod catalog;
pub mod error;
pub mod material;
pub mod property;
pub mod registry;

// Re-exports for ergonomics
pub use error::{MaterialError, MaterialResult};
pub use material::{Material, Phase};
pub use property::{Property, PropertyFn};
pub use registry::MaterialRegistry;

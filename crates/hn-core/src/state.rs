//! Ordered per-block state variables.
//!
//! Insertion order is the iteration order and is part of the contract with
//! the solver mapping, so blocks store their state in an [`IndexMap`].

use indexmap::IndexMap;

use crate::Real;

/// Ordered mapping from variable name to value.
pub type StateMap = IndexMap<String, Real>;

/// Read access to named state variables.
///
/// Material property functions and flow accessors take `&dyn StateLookup`
/// so they can read either a block's committed state or an in-flight
/// solver snapshot.
pub trait StateLookup {
    fn get_var(&self, name: &str) -> Option<Real>;
}

impl StateLookup for StateMap {
    fn get_var(&self, name: &str) -> Option<Real> {
        self.get(name).copied()
    }
}

/// A borrowed view pairing a block's declared variable names with a value
/// slice laid out in the same order.
#[derive(Clone, Copy, Debug)]
pub struct StateView<'a> {
    names: &'a StateMap,
    values: &'a [Real],
}

impl<'a> StateView<'a> {
    pub fn new(names: &'a StateMap, values: &'a [Real]) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { names, values }
    }

    pub fn values(&self) -> &'a [Real] {
        self.values
    }

    pub fn at(&self, pos: usize) -> Real {
        self.values[pos]
    }
}

impl StateLookup for StateView<'_> {
    fn get_var(&self, name: &str) -> Option<Real> {
        self.names
            .get_index_of(name)
            .and_then(|i| self.values.get(i).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_map_keeps_insertion_order() {
        let mut s = StateMap::new();
        s.insert("T".into(), 20.0);
        s.insert("m".into(), 0.5);
        s.insert("a".into(), 1.0);
        let keys: Vec<_> = s.keys().cloned().collect();
        assert_eq!(keys, vec!["T", "m", "a"]);
    }

    #[test]
    fn view_reads_overlay_values() {
        let mut s = StateMap::new();
        s.insert("T".into(), 20.0);
        s.insert("m".into(), 0.5);
        let overlay = [25.0, 0.7];
        let view = StateView::new(&s, &overlay);
        assert_eq!(view.get_var("T"), Some(25.0));
        assert_eq!(view.get_var("m"), Some(0.7));
        assert_eq!(view.get_var("rho"), None);
        assert_eq!(s.get_var("T"), Some(20.0));
    }
}

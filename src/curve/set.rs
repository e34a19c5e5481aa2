use std::collections::BTreeMap;

use crate::curve::curve::Curve;
use crate::foundation::core::CurveId;

/// Curves of one automaton, iterated in creation order.
///
/// Serialized data addresses curves by position, which is this iteration order.
#[derive(Debug, Default)]
pub struct CurveSet {
    curves: BTreeMap<CurveId, Curve>,
}

impl CurveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: CurveId) -> Option<&Curve> {
        self.curves.get(&id)
    }

    pub fn get_mut(&mut self, id: CurveId) -> Option<&mut Curve> {
        self.curves.get_mut(&id)
    }

    pub(crate) fn insert(&mut self, curve: Curve) -> Option<Curve> {
        self.curves.insert(curve.id(), curve)
    }

    pub(crate) fn remove(&mut self, id: CurveId) -> Option<Curve> {
        self.curves.remove(&id)
    }

    pub fn contains(&self, id: CurveId) -> bool {
        self.curves.contains_key(&id)
    }

    /// Position of `id` in iteration order.
    pub fn index_of(&self, id: CurveId) -> Option<usize> {
        self.curves.keys().position(|k| *k == id)
    }

    /// Id at position `index` in iteration order.
    pub fn id_at(&self, index: usize) -> Option<CurveId> {
        self.curves.keys().nth(index).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = CurveId> + '_ {
        self.curves.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Curve> {
        self.curves.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Curve> {
        self.curves.values_mut()
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}

use std::collections::BTreeMap;

use crate::foundation::core::FxId;
use crate::fx::definition::FxParamValue;

/// A time-bounded fx applied over a curve's sample buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct FxSection {
    pub id: FxId,
    /// Registry key of the definition.
    pub def: String,
    pub time: f64,
    pub length: f64,
    /// Placement lane; only used to keep sections from overlapping.
    pub row: usize,
    pub bypass: bool,
    /// Raw parameter values, resolved against the definition at precalc time.
    pub params: BTreeMap<String, FxParamValue>,
}

impl FxSection {
    /// Exclusive end time.
    pub fn end(&self) -> f64 {
        self.time + self.length
    }
}

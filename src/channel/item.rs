use crate::curve::set::CurveSet;
use crate::foundation::core::{CurveId, ItemId};

/// What a channel item evaluates to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ItemKind {
    /// A literal value held over the item.
    Constant { value: f64 },
    /// A curve sampled at `offset + speed * local_time`, scaled by `amp`.
    Curve {
        curve: CurveId,
        speed: f64,
        offset: f64,
        amp: f64,
    },
}

impl ItemKind {
    /// Curve reference with the identity transform.
    pub fn curve(curve: CurveId) -> Self {
        Self::Curve {
            curve,
            speed: 1.0,
            offset: 0.0,
            amp: 1.0,
        }
    }

    pub fn curve_id(&self) -> Option<CurveId> {
        match self {
            Self::Constant { .. } => None,
            Self::Curve { curve, .. } => Some(*curve),
        }
    }
}

/// One element of a channel, covering `[time, time + length)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelItem {
    pub id: ItemId,
    pub time: f64,
    pub length: f64,
    pub kind: ItemKind,
    /// Tells the host to treat fx state as fresh when playback enters this item.
    pub reset: bool,
}

impl ChannelItem {
    pub fn end(&self) -> f64 {
        self.time + self.length
    }

    /// Value at item-local time `local`. A curve that no longer exists reads as 0.
    pub fn value_at(&self, local: f64, curves: &CurveSet) -> f64 {
        match self.kind {
            ItemKind::Constant { value } => value,
            ItemKind::Curve {
                curve,
                speed,
                offset,
                amp,
            } => curves
                .get(curve)
                .map_or(0.0, |c| amp * c.get_value(offset + speed * local)),
        }
    }
}

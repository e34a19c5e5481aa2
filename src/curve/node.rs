use crate::foundation::core::NodeId;

/// Tangent handle offset relative to its node.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BezierHandle {
    /// Time offset. Negative for in-handles, positive for out-handles.
    #[serde(default)]
    pub time: f64,
    /// Value offset.
    #[serde(default)]
    pub value: f64,
}

impl BezierHandle {
    pub fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }

    /// Force the time component toward the previous node (`<= 0`).
    pub(crate) fn as_in(self) -> Self {
        Self {
            time: self.time.min(0.0),
            value: self.value,
        }
    }

    /// Force the time component toward the next node (`>= 0`).
    pub(crate) fn as_out(self) -> Self {
        Self {
            time: self.time.max(0.0),
            value: self.value,
        }
    }
}

/// A control point on a curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BezierNode {
    pub id: NodeId,
    /// Time in curve-local seconds, within `[0, curve.length]`.
    pub time: f64,
    pub value: f64,
    /// Handle toward the previous node. Always `None` on the first node.
    pub in_handle: Option<BezierHandle>,
    /// Handle toward the next node. Always `None` on the last node.
    pub out_handle: Option<BezierHandle>,
}

impl BezierNode {
    pub fn new(id: NodeId, time: f64, value: f64) -> Self {
        Self {
            id,
            time,
            value,
            in_handle: None,
            out_handle: None,
        }
    }
}

use crate::foundation::error::{CurvefxError, CurvefxResult};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a bezier node, unique within its curve.
    NodeId
);
define_id!(
    /// Identifier of an fx section, unique within its curve.
    FxId
);
define_id!(
    /// Identifier of a channel item, unique within its channel.
    ItemId
);
define_id!(
    /// Identifier of a curve, unique within its automaton.
    CurveId
);

/// Monotonic id issuer. Ids are never reused by the same issuer.
#[derive(Clone, Debug, Default)]
pub(crate) struct IdGen {
    next: u64,
}

impl IdGen {
    pub(crate) fn issue(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Make sure ids handed out later never collide with `taken`.
    pub(crate) fn reserve(&mut self, taken: u64) {
        self.next = self.next.max(taken.saturating_add(1));
    }
}

/// Half-open loop window `[begin, end)` on the automaton timeline.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LoopRegion {
    /// Inclusive start time.
    pub begin: f64,
    /// Exclusive end time.
    pub end: f64,
}

impl LoopRegion {
    /// Create a validated region with finite `begin < end`.
    pub fn new(begin: f64, end: f64) -> CurvefxResult<Self> {
        ensure_finite("loop begin", begin)?;
        ensure_finite("loop end", end)?;
        if begin >= end {
            return Err(CurvefxError::validation("loop region begin must be < end"));
        }
        Ok(Self { begin, end })
    }

    /// Length of the window in seconds.
    pub fn len(self) -> f64 {
        self.end - self.begin
    }

    /// Return `true` when `t` is inside `[begin, end)`.
    pub fn contains(self, t: f64) -> bool {
        self.begin <= t && t < self.end
    }

    /// Wrap a time that ran past `end` back into the window.
    ///
    /// Times before `begin` are returned unchanged: playback has not entered the loop yet.
    pub fn wrap(self, t: f64) -> f64 {
        if t < self.end {
            return t;
        }
        self.begin + (t - self.begin).rem_euclid(self.len())
    }
}

pub(crate) fn ensure_finite(what: &str, v: f64) -> CurvefxResult<f64> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CurvefxError::validation(format!("{what} must be finite")))
    }
}

pub(crate) fn ensure_positive(what: &str, v: f64) -> CurvefxResult<f64> {
    ensure_finite(what, v)?;
    if v <= 0.0 {
        return Err(CurvefxError::validation(format!("{what} must be > 0")));
    }
    Ok(v)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;

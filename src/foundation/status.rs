//! Advisory status bookkeeping for editor consumption.
//!
//! Statuses never affect evaluation; they only record that something deserves a human's
//! attention (a NaN was clamped, a channel is never read).

/// Severity of a status entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub enum StatusLevel {
    /// Informational.
    Info,
    /// Something produced degraded output.
    Warning,
    /// Something is broken.
    Error,
}

/// Known status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum StatusCode {
    /// Precalc produced NaN samples which were replaced with `0.0`.
    NanDetected,
    /// Channel has never been read by the host.
    NotUsed,
}

/// One status entry.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Status {
    /// Status code.
    pub code: StatusCode,
    /// Severity.
    pub level: StatusLevel,
    /// Human-readable detail.
    pub message: String,
}

/// Set of statuses keyed by code; at most one entry per code.
#[derive(Clone, Debug, Default)]
pub struct Statuses {
    entries: Vec<Status>,
}

impl Statuses {
    /// Set or replace the entry for `code`. Returns `true` if the code was not present before.
    pub fn set(&mut self, code: StatusCode, level: StatusLevel, message: impl Into<String>) -> bool {
        let status = Status {
            code,
            level,
            message: message.into(),
        };
        match self.entries.iter_mut().find(|s| s.code == code) {
            Some(slot) => {
                *slot = status;
                false
            }
            None => {
                self.entries.push(status);
                true
            }
        }
    }

    /// Remove the entry for `code`. Returns `true` if something was removed.
    pub fn clear(&mut self, code: StatusCode) -> bool {
        let before = self.entries.len();
        self.entries.retain(|s| s.code != code);
        before != self.entries.len()
    }

    pub fn has(&self, code: StatusCode) -> bool {
        self.entries.iter().any(|s| s.code == code)
    }

    /// The most severe entry, earliest first on ties.
    pub fn most_severe(&self) -> Option<&Status> {
        self.entries
            .iter()
            .rev()
            .max_by_key(|s| s.level)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Status> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/status.rs"]
mod tests;

/// Convenience result type used across curvefx.
pub type CurvefxResult<T> = Result<T, CurvefxError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Capacity failures (no free fx row) and missing fx definitions are not errors; they surface as
/// `Ok(None)` and as skipped sections respectively.
#[derive(thiserror::Error, Debug)]
pub enum CurvefxError {
    /// Invalid caller-provided data: bad times, unknown ids, non-finite lengths.
    #[error("validation error: {0}")]
    Validation(String),

    /// A history entry failed to replay.
    #[error("history error: {0}")]
    History(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CurvefxError {
    /// Build a [`CurvefxError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`CurvefxError::History`] value.
    pub fn history(msg: impl Into<String>) -> Self {
        Self::History(msg.into())
    }

    /// Build a [`CurvefxError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

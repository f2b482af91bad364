/// Result alias used throughout the crate.
pub type CardResult<T> = Result<T, CardError>;

/// Error taxonomy for the editor core.
///
/// Degraded resources (missing images, unsupported storage) are surfaced as values on the caller
/// side whenever possible; these variants are for operations that genuinely cannot proceed.
#[derive(thiserror::Error, Debug)]
pub enum CardError {
    /// Malformed input or an out-of-range argument.
    #[error("validation error: {0}")]
    Validation(String),

    /// A mutation that would break a document invariant. State is left unchanged.
    #[error("invalid mutation: {0}")]
    InvalidMutation(String),

    /// A layer id that does not exist in the document.
    #[error("unknown layer: {0}")]
    UnknownLayer(String),

    /// Blob/template storage failure or an unsupported store.
    #[error("storage error: {0}")]
    Storage(String),

    /// Image bytes that could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Anything else, with its source chain preserved.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CardError {
    /// Build a [`CardError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`CardError::InvalidMutation`].
    pub fn invalid_mutation(msg: impl Into<String>) -> Self {
        Self::InvalidMutation(msg.into())
    }

    /// Build a [`CardError::UnknownLayer`].
    pub fn unknown_layer(id: impl Into<String>) -> Self {
        Self::UnknownLayer(id.into())
    }

    /// Build a [`CardError::Storage`].
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Build a [`CardError::Decode`].
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`CardError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for CardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

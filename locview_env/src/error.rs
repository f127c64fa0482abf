//! Error types for the LocView environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The asset URL does not name a format any loader understands
    #[error("Unsupported asset format: {0}")]
    UnsupportedFormat(String),

    /// Retrieving or parsing the asset failed
    #[error("Asset load failed for {url}: {reason}")]
    LoadFailed { url: String, reason: String },

    /// Context operation failed
    #[error("Context error: {0}")]
    ContextError(String),
}

impl EnvError {
    /// Creates a load failure.
    pub fn load_failed(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::LoadFailed {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an unsupported-format error.
    pub fn unsupported(url: impl Into<String>) -> Self {
        Self::UnsupportedFormat(url.into())
    }
}

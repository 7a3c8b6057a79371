/// Result alias that carries the custom [`ReactorError`] type.
pub type Result<T> = std::result::Result<T, ReactorError>;

/// Common error type for the core crate.
///
/// The per-frame path never fails; these variants only surface while loading
/// configuration or when the host performs I/O on behalf of the engine.
#[derive(Debug, thiserror::Error)]
pub enum ReactorError {
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON configuration or replay input.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    /// A configuration value parsed but is outside its allowed range.
    #[error("invalid config field `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

impl ReactorError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

impl From<&str> for ReactorError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for ReactorError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RdfError>;

/// Everything that can go wrong inside the core.  None of these are fatal; the
/// caller logs and carries on.
#[derive(Debug, Error)]
pub enum RdfError {
    /// Malformed JSON envelope, relay text, or numeric field.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid setting value.  The field keeps its previous value.
    #[error("config error: {key}: {reason}")]
    Config { key: String, reason: String },

    /// Backend connection failure.
    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RdfError {
    pub fn parse(msg: impl Into<String>) -> Self {
        RdfError::Parse(msg.into())
    }

    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        RdfError::Config {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for RdfError {
    fn from(e: serde_json::Error) -> Self {
        RdfError::Parse(e.to_string())
    }
}

impl From<std::num::ParseIntError> for RdfError {
    fn from(e: std::num::ParseIntError) -> Self {
        RdfError::Parse(e.to_string())
    }
}

impl From<std::num::ParseFloatError> for RdfError {
    fn from(e: std::num::ParseFloatError) -> Self {
        RdfError::Parse(e.to_string())
    }
}

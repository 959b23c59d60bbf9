use thiserror::Error;

/// Top-level error type for the Bendline pipeline.
#[derive(Debug, Error)]
pub enum BendlineError {
    #[error("invalid letter list: {0}")]
    InvalidLetterList(String),

    #[error("image unreadable ({path}): {reason}")]
    ImageUnreadable { path: String, reason: String },

    #[error("vision provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("model response violates the mapping contract: {0}")]
    ContractViolation(String),

    #[error("unknown catalog shape: {0}")]
    UnknownShape(String),

    #[error("no drawing found in order crop: {0}")]
    NoDrawing(String),

    #[error("storage error: {0}")]
    Store(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

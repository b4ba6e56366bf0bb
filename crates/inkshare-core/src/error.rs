use thiserror::Error;

use crate::types::StrokeError;

#[derive(Debug, Error)]
pub enum InkshareError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Stroke rejected: {0}")]
    Stroke(#[from] StrokeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl InkshareError {
    /// Short machine-readable code used in `error` events sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::Protocol(_) | Self::Json(_) => "parse_error",
            Self::Stroke(e) => e.code(),
            Self::Io(_) | Self::Other(_) => "internal_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, InkshareError>;

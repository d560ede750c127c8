use thiserror::Error;

use crate::services::{StoreError, UpstreamError};

/// Errors surfaced by the dialog core
///
/// Only `Persistence` escapes an assistant entry point; the others are
/// turned into guidance replies where they occur.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("No candidate has been shown yet")]
    NoActiveCandidate,

    #[error("Directory unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl From<UpstreamError> for AssistantError {
    fn from(value: UpstreamError) -> Self {
        AssistantError::UpstreamUnavailable(value.to_string())
    }
}

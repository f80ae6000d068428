//! Error types for the conversational pipeline.

use std::time::Duration;

use wayfind_core::error::WayfindError;

/// Errors from the language-model capability.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model service unreachable: {0}")]
    Unreachable(String),
    #[error("model '{0}' is not installed")]
    ModelMissing(String),
    #[error("model call timed out")]
    Timeout,
    #[error("model service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed model reply: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ModelError::Timeout
        } else if err.is_connect() || err.is_request() {
            ModelError::Unreachable(err.to_string())
        } else {
            ModelError::Decode(err.to_string())
        }
    }
}

/// Failures of intent extraction.
///
/// An unparseable model reply is not an error: the extractor returns
/// `Ok(None)` and the conversation asks the user to rephrase.
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    /// The model service cannot be reached or lacks the configured model.
    #[error("assistant unavailable: {0}")]
    Unavailable(String),
    /// No reply within the model budget.
    #[error("assistant did not answer within {0:?}")]
    Timeout(Duration),
    /// Any other model-side failure.
    #[error("assistant failed: {0}")]
    Model(String),
}

impl IntentError {
    /// Whether the user should be told to check the local model service.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, IntentError::Unavailable(_) | IntentError::Timeout(_))
    }
}

impl From<ModelError> for IntentError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Unreachable(_) | ModelError::ModelMissing(_) => {
                IntentError::Unavailable(err.to_string())
            }
            ModelError::Timeout => IntentError::Timeout(Duration::ZERO),
            ModelError::Status { .. } | ModelError::Decode(_) => {
                IntentError::Model(err.to_string())
            }
        }
    }
}

impl From<IntentError> for WayfindError {
    fn from(err: IntentError) -> Self {
        WayfindError::Assistant(err.to_string())
    }
}

/// Why a submission did not start a turn. Neither case touches the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TurnRejected {
    #[error("message cannot be empty")]
    Blank,
    #[error("a previous message is still being processed")]
    Busy,
}

use thiserror::Error;

/// Failures reported by the backend collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Why a submission did not complete the flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("submission transport failed: {0}")]
    TransportFailure(String),
    #[error("submission rejected by backend")]
    RejectedByBackend,
}

impl SubmissionError {
    /// Message shown to the user; the flow stays on the last screen.
    pub fn user_message(&self) -> &'static str {
        match self {
            SubmissionError::TransportFailure(_) => {
                "We couldn't reach our servers. Check your connection and try again."
            }
            SubmissionError::RejectedByBackend => {
                "We couldn't create your account right now. Please try again."
            }
        }
    }
}

impl From<ServiceError> for SubmissionError {
    fn from(err: ServiceError) -> Self {
        SubmissionError::TransportFailure(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("invalid screen index {index} (flow has {len} screens)")]
    InvalidScreenIndex { index: usize, len: usize },
    #[error("flow has already ended")]
    FlowEnded,
}

/// Raised by a screen's continue hook; logged, never blocks navigation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{screen_id} hook failed: {message}")]
pub struct HookError {
    pub screen_id: String,
    pub message: String,
}

impl HookError {
    pub fn new(screen_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            screen_id: screen_id.into(),
            message: message.into(),
        }
    }
}

//! Error taxonomy for the composer client.
//!
//! Every variant keeps its cause so callers can tell failures apart, while
//! [`UserFacing`] collapses each failure class to the single line a view shows.

use shared::domain::DraftError;
use thiserror::Error;

use crate::claims::ClaimsError;

/// One user-visible line per failure class.
pub trait UserFacing {
    fn user_message(&self) -> &'static str;
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected backend response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl BackendError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|status| status.as_u16()),
            Self::Decode(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("login rejected by backend (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("login request failed: {0}")]
    Transport(#[source] BackendError),
    #[error("login response was malformed: {0}")]
    MalformedResponse(String),
    #[error("failed to persist session token: {source}")]
    Store { source: anyhow::Error },
}

impl From<BackendError> for AuthError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::Status { status, message } => Self::Rejected { status, message },
            BackendError::Decode(err) => Self::MalformedResponse(err.to_string()),
            transport @ BackendError::Transport(_) => Self::Transport(transport),
        }
    }
}

impl UserFacing for AuthError {
    fn user_message(&self) -> &'static str {
        "Invalid username or password"
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("a quiz submission is already in flight")]
    AlreadySubmitting,
    #[error("quiz submission failed: {0}")]
    Backend(#[from] BackendError),
}

impl UserFacing for SubmitError {
    fn user_message(&self) -> &'static str {
        match self {
            Self::AlreadySubmitting => "The quiz is already being submitted",
            Self::Backend(_) => "Failed to submit the quiz",
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no session token is stored")]
    Unauthenticated,
    #[error("stored session token could not be decoded: {0}")]
    InvalidToken(#[from] ClaimsError),
    #[error("failed to fetch the current user: {0}")]
    FetchError(#[source] BackendError),
    #[error("session store failure: {source}")]
    Store { source: anyhow::Error },
}

impl UserFacing for SessionError {
    fn user_message(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "You are not logged in",
            Self::InvalidToken(_) => "Invalid token",
            Self::FetchError(_) => "Failed to load user data",
            Self::Store { .. } => "The saved session could not be read",
        }
    }
}

impl UserFacing for DraftError {
    fn user_message(&self) -> &'static str {
        match self {
            DraftError::QuestionOutOfRange { .. } => "That question does not exist",
            DraftError::OptionOutOfRange { .. } => "Each question has exactly four options",
        }
    }
}

//! Glue between the core components and whatever renders them.

use shared::protocol::{QuizAck, UserProfile};

use crate::{
    draft_store::QuizDraftStore,
    error::{SessionError, UserFacing},
    session::SessionManager,
};

/// The one message a view currently shows. A new message replaces the old.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatusLine {
    message: Option<String>,
}

impl StatusLine {
    pub fn show_error(&mut self, err: &impl UserFacing) {
        self.message = Some(err.user_message().to_string());
    }

    pub fn show_info(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn clear(&mut self) {
        self.message = None;
    }

    pub fn current(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Profile view lifecycle. `Loading` is entered on mount; every other state
/// is terminal until the view is mounted again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileState {
    Loading,
    Unauthenticated,
    TokenInvalid,
    FetchFailed,
    Ready(UserProfile),
}

impl ProfileState {
    pub async fn load(session: &SessionManager) -> Self {
        match session.current_user().await {
            Ok(user) => Self::Ready(user),
            Err(err) => Self::from_error(&err),
        }
    }

    fn from_error(err: &SessionError) -> Self {
        match err {
            SessionError::Unauthenticated => Self::Unauthenticated,
            SessionError::InvalidToken(_) => Self::TokenInvalid,
            SessionError::FetchError(_) | SessionError::Store { .. } => Self::FetchFailed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Loading)
    }

    pub fn message(&self) -> String {
        match self {
            Self::Loading => "Loading...".to_string(),
            Self::Unauthenticated => "You are not logged in".to_string(),
            Self::TokenInvalid => "Invalid token".to_string(),
            Self::FetchFailed => "Failed to load user data".to_string(),
            Self::Ready(user) => format!("Username: {}", user.username),
        }
    }
}

/// Login form outcome: either navigate away or stay with an error shown.
pub async fn submit_login(
    session: &SessionManager,
    status: &mut StatusLine,
    username: &str,
    password: &str,
) -> bool {
    match session.login(username, password).await {
        Ok(()) => {
            status.clear();
            true
        }
        Err(err) => {
            status.show_error(&err);
            false
        }
    }
}

/// Composer submit action. The draft stays in the store when this fails so
/// the author can retry.
pub async fn submit_quiz(
    store: &QuizDraftStore,
    session: &SessionManager,
    status: &mut StatusLine,
) -> Option<QuizAck> {
    let authorization = match session.authorization_header().await {
        Ok(authorization) => authorization,
        Err(err) => {
            status.show_error(&err);
            return None;
        }
    };

    match store.submit(authorization.as_deref()).await {
        Ok(ack) => {
            status.show_info(format!("Quiz \"{}\" saved", ack.title));
            Some(ack)
        }
        Err(err) => {
            status.show_error(&err);
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/views_tests.rs"]
mod tests;

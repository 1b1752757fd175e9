use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use shared::{
    domain::QuizId,
    protocol::{LoginRequest, LoginResponse, QuizAck, QuizSubmission, UserProfile},
};
use tokio::sync::Notify;

use crate::{backend::QuizBackend, error::BackendError};

pub(crate) fn token_for(subject: &str) -> String {
    encode(
        &Header::default(),
        &serde_json::json!({ "sub": subject, "iat": 1_700_000_000, "exp": 1_700_000_900 }),
        &EncodingKey::from_secret(b"issuer-secret"),
    )
    .expect("token")
}

fn rejected(status: u16, message: &str) -> BackendError {
    BackendError::Status {
        status,
        message: message.to_string(),
    }
}

/// In-process stand-in for the backend that records every call.
#[derive(Default)]
pub(crate) struct FakeBackend {
    pub accepted_password: Option<String>,
    pub issued_token: Option<String>,
    pub profile: Option<UserProfile>,
    pub fail_submit: bool,
    pub submit_gate: Option<Arc<Notify>>,
    pub login_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub submitted: Mutex<Vec<(Option<String>, QuizSubmission)>>,
    pub fetch_authorizations: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn accepting(password: &str, token: impl Into<String>) -> Self {
        Self {
            accepted_password: Some(password.to_string()),
            issued_token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn with_profile(mut self, username: &str) -> Self {
        self.profile = Some(UserProfile {
            username: username.to_string(),
        });
        self
    }

    pub fn failing_submit(mut self) -> Self {
        self.fail_submit = true;
        self
    }

    pub fn gated_submit(mut self, gate: Arc<Notify>) -> Self {
        self.submit_gate = Some(gate);
        self
    }

    pub fn network_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
            + self.fetch_calls.load(Ordering::SeqCst)
            + self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuizBackend for FakeBackend {
    async fn submit_quiz(
        &self,
        authorization: Option<&str>,
        quiz: &QuizSubmission,
    ) -> Result<QuizAck, BackendError> {
        let call = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.submitted
            .lock()
            .expect("submitted lock")
            .push((authorization.map(str::to_string), quiz.clone()));
        if let Some(gate) = &self.submit_gate {
            gate.notified().await;
        }
        if self.fail_submit {
            return Err(rejected(500, "database unavailable"));
        }
        Ok(QuizAck {
            id: QuizId(call as i64),
            title: quiz.title.clone(),
        })
    }

    async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, BackendError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        match (&self.accepted_password, &self.issued_token) {
            (Some(password), Some(token)) if *password == credentials.password => {
                Ok(LoginResponse {
                    access_token: token.clone(),
                })
            }
            _ => Err(rejected(401, "Bad username or password")),
        }
    }

    async fn fetch_user(&self, authorization: &str) -> Result<UserProfile, BackendError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.fetch_authorizations
            .lock()
            .expect("authorization lock")
            .push(authorization.to_string());
        self.profile
            .clone()
            .ok_or_else(|| rejected(500, "user lookup failed"))
    }
}

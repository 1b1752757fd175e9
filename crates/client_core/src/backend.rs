use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, Response};
use serde::{de::DeserializeOwned, Deserialize};
use shared::{
    error::ApiError,
    protocol::{
        LoginRequest, LoginResponse, QuizAck, QuizSubmission, UserProfile, LOGIN_ROUTE,
        QUIZZES_ROUTE, USER_ROUTE,
    },
};
use tracing::debug;

use crate::error::BackendError;

const MAX_ERROR_MESSAGE_CHARS: usize = 200;

/// The three backend operations the composer consumes.
#[async_trait]
pub trait QuizBackend: Send + Sync {
    async fn submit_quiz(
        &self,
        authorization: Option<&str>,
        quiz: &QuizSubmission,
    ) -> Result<QuizAck, BackendError>;
    async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, BackendError>;
    async fn fetch_user(&self, authorization: &str) -> Result<UserProfile, BackendError>;
}

pub struct HttpBackend {
    http: Client,
    server_url: String,
}

impl HttpBackend {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: impl Into<String>) -> Self {
        let server_url: String = server_url.into();
        Self {
            http,
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn endpoint(&self, route: &str) -> String {
        format!("{}{route}", self.server_url)
    }
}

#[async_trait]
impl QuizBackend for HttpBackend {
    async fn submit_quiz(
        &self,
        authorization: Option<&str>,
        quiz: &QuizSubmission,
    ) -> Result<QuizAck, BackendError> {
        let mut request = self.http.post(self.endpoint(QUIZZES_ROUTE)).json(quiz);
        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }
        debug!(questions = quiz.questions.len(), "posting quiz");
        read_json(request.send().await?).await
    }

    async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, BackendError> {
        let res = self
            .http
            .post(self.endpoint(LOGIN_ROUTE))
            .json(credentials)
            .send()
            .await?;
        read_json(res).await
    }

    async fn fetch_user(&self, authorization: &str) -> Result<UserProfile, BackendError> {
        let res = self
            .http
            .get(self.endpoint(USER_ROUTE))
            .header(AUTHORIZATION, authorization)
            .send()
            .await?;
        read_json(res).await
    }
}

#[derive(Deserialize)]
struct LegacyErrorBody {
    msg: String,
}

async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, BackendError> {
    let status = res.status();
    let body = res.bytes().await?;
    if !status.is_success() {
        return Err(BackendError::Status {
            status: status.as_u16(),
            message: error_message(&body, status.canonical_reason()),
        });
    }
    Ok(serde_json::from_slice(&body)?)
}

fn error_message(body: &[u8], reason: Option<&str>) -> String {
    if let Ok(err) = serde_json::from_slice::<ApiError>(body) {
        return err.message;
    }
    if let Ok(err) = serde_json::from_slice::<LegacyErrorBody>(body) {
        return err.msg;
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return reason.unwrap_or("request failed").to_string();
    }
    text.chars().take(MAX_ERROR_MESSAGE_CHARS).collect()
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;

use std::sync::Arc;

use shared::protocol::{LoginRequest, UserProfile};
use tracing::{debug, info, warn};

use crate::{
    backend::QuizBackend,
    claims::{decode_unverified, UserClaims},
    error::{AuthError, SessionError},
    session_store::SessionStore,
};

/// The single key the session token is persisted under.
pub const TOKEN_KEY: &str = "token";

/// Single source of truth for who is logged in.
pub struct SessionManager {
    backend: Arc<dyn QuizBackend>,
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn QuizBackend>, store: Arc<dyn SessionStore>) -> Self {
        Self { backend, store }
    }

    /// Exchanges credentials for a token and persists it. Any previously
    /// stored token is left untouched when this fails.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let credentials = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self.backend.login(&credentials).await.map_err(|err| {
            warn!(%username, error = %err, "login failed");
            AuthError::from(err)
        })?;

        let token = response.access_token.trim();
        if token.is_empty() {
            warn!(%username, "login response carried an empty access token");
            return Err(AuthError::MalformedResponse(
                "empty access_token".to_string(),
            ));
        }

        self.store
            .save(TOKEN_KEY, token)
            .await
            .map_err(|source| AuthError::Store { source })?;
        info!(%username, "logged in");
        Ok(())
    }

    /// Forgets the local token. The backend is not contacted.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.store
            .remove(TOKEN_KEY)
            .await
            .map_err(|source| SessionError::Store { source })?;
        info!("logged out");
        Ok(())
    }

    pub async fn token(&self) -> Result<Option<String>, SessionError> {
        self.store
            .load(TOKEN_KEY)
            .await
            .map_err(|source| SessionError::Store { source })
    }

    pub async fn authorization_header(&self) -> Result<Option<String>, SessionError> {
        Ok(self.token().await?.map(|token| format!("Bearer {token}")))
    }

    pub async fn claims(&self) -> Result<UserClaims, SessionError> {
        let token = self.token().await?.ok_or(SessionError::Unauthenticated)?;
        Ok(decode_unverified(&token)?)
    }

    pub async fn is_authenticated(&self) -> bool {
        self.claims().await.is_ok()
    }

    /// Resolves the logged-in user. Missing and undecodable tokens are
    /// reported without any request being sent.
    pub async fn current_user(&self) -> Result<UserProfile, SessionError> {
        let token = self.token().await?.ok_or(SessionError::Unauthenticated)?;
        let claims = decode_unverified(&token).map_err(|err| {
            warn!(error = %err, "stored token is not decodable");
            SessionError::InvalidToken(err)
        })?;
        debug!(subject = claims.username(), "fetching current user");

        self.backend
            .fetch_user(&format!("Bearer {token}"))
            .await
            .map_err(|err| {
                warn!(error = %err, "current user lookup failed");
                SessionError::FetchError(err)
            })
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;

//! Client core for composing quizzes and managing the author's session.
//!
//! [`QuizDraftStore`] owns the quiz being edited and submits snapshots of it;
//! [`SessionManager`] owns the authentication token and resolves the current
//! user. Both talk to the backend through [`QuizBackend`].

pub mod backend;
pub mod claims;
pub mod config;
mod draft_store;
pub mod error;
mod session;
mod session_store;
pub mod views;

pub use backend::{HttpBackend, QuizBackend};
pub use claims::{decode_unverified, UserClaims};
pub use draft_store::QuizDraftStore;
pub use error::{AuthError, BackendError, SessionError, SubmitError, UserFacing};
pub use session::{SessionManager, TOKEN_KEY};
pub use session_store::{DurableSessionStore, MemorySessionStore, SessionStore};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, PoisonError, RwLock,
};

use shared::{
    domain::{DraftError, QuestionField, QuizDraft},
    protocol::{QuizAck, QuizSubmission},
};
use tracing::{info, warn};

use crate::{backend::QuizBackend, error::SubmitError};

struct DraftState {
    draft: QuizDraft,
    revision: u64,
}

/// Owns the quiz being composed. Edits swap in a new draft value; submission
/// posts an immutable snapshot and allows one request in flight at a time.
pub struct QuizDraftStore {
    backend: Arc<dyn QuizBackend>,
    state: RwLock<DraftState>,
    submitting: AtomicBool,
}

struct SubmitGuard<'a>(&'a AtomicBool);

impl<'a> SubmitGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl QuizDraftStore {
    pub fn new(backend: Arc<dyn QuizBackend>) -> Self {
        Self {
            backend,
            state: RwLock::new(DraftState {
                draft: QuizDraft::new(),
                revision: 0,
            }),
            submitting: AtomicBool::new(false),
        }
    }

    pub fn draft(&self) -> QuizDraft {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .draft
            .clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    pub fn update_title(&self, value: impl Into<String>) -> QuizDraft {
        let value = value.into();
        self.replace(|draft| draft.with_title(value))
    }

    pub fn update_question_field(
        &self,
        index: usize,
        field: QuestionField,
        value: impl Into<String>,
    ) -> Result<QuizDraft, DraftError> {
        let value = value.into();
        self.try_replace(|draft| draft.with_question_field(index, field, value))
    }

    pub fn update_option(
        &self,
        index: usize,
        option_index: usize,
        value: impl Into<String>,
    ) -> Result<QuizDraft, DraftError> {
        let value = value.into();
        self.try_replace(|draft| draft.with_option(index, option_index, value))
    }

    pub fn add_question(&self) -> QuizDraft {
        self.replace(QuizDraft::with_added_question)
    }

    /// Posts the current draft. On success the draft is discarded unless it
    /// was edited while the request was in flight; on failure it is kept as is.
    pub async fn submit(&self, authorization: Option<&str>) -> Result<QuizAck, SubmitError> {
        let Some(_guard) = SubmitGuard::acquire(&self.submitting) else {
            warn!("quiz submission rejected: another submission is in flight");
            return Err(SubmitError::AlreadySubmitting);
        };

        let (snapshot, revision) = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            (QuizSubmission::from(&state.draft), state.revision)
        };

        match self.backend.submit_quiz(authorization, &snapshot).await {
            Ok(ack) => {
                info!(
                    quiz_id = ack.id.0,
                    title = %ack.title,
                    questions = snapshot.questions.len(),
                    "quiz submitted"
                );
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                if state.revision == revision {
                    state.draft = QuizDraft::new();
                    state.revision += 1;
                }
                Ok(ack)
            }
            Err(err) => {
                warn!(error = %err, "quiz submission failed");
                Err(SubmitError::Backend(err))
            }
        }
    }

    fn replace(&self, edit: impl FnOnce(&QuizDraft) -> QuizDraft) -> QuizDraft {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let next = edit(&state.draft);
        state.draft = next.clone();
        state.revision += 1;
        next
    }

    fn try_replace(
        &self,
        edit: impl FnOnce(&QuizDraft) -> Result<QuizDraft, DraftError>,
    ) -> Result<QuizDraft, DraftError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let next = edit(&state.draft)?;
        state.draft = next.clone();
        state.revision += 1;
        Ok(next)
    }
}

#[cfg(test)]
#[path = "tests/draft_store_tests.rs"]
mod tests;

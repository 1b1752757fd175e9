use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AnswerId, AttemptId, QuestionDraft, QuizDraft, QuizId, UserId, OPTIONS_PER_QUESTION,
};

pub const LOGIN_ROUTE: &str = "/api/login";
pub const USER_ROUTE: &str = "/api/user";
pub const QUIZZES_ROUTE: &str = "/api/quizzes";
pub const ATTEMPTS_ROUTE: &str = "/api/attempts";
pub const USER_ANSWERS_ROUTE: &str = "/api/user_answers";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPayload {
    pub question: String,
    pub options: [String; OPTIONS_PER_QUESTION],
    pub answer: String,
}

impl From<&QuestionDraft> for QuestionPayload {
    fn from(value: &QuestionDraft) -> Self {
        Self {
            question: value.prompt.clone(),
            options: value.options.clone(),
            answer: value.answer.clone(),
        }
    }
}

/// Immutable snapshot of a draft as posted to `/api/quizzes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSubmission {
    pub title: String,
    pub questions: Vec<QuestionPayload>,
}

impl From<&QuizDraft> for QuizSubmission {
    fn from(value: &QuizDraft) -> Self {
        Self {
            title: value.title.clone(),
            questions: value
                .questions
                .iter()
                .map(|question| QuestionPayload::from(question.as_ref()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAck {
    pub id: QuizId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(alias = "logged_in_as")]
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizRecord {
    pub id: QuizId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<QuestionPayload>,
}

/// Starts an attempt at a quiz for the authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartAttemptRequest {
    pub quiz_id: QuizId,
}

/// One answer within an attempt. `question_index` is the question's
/// position in the quiz, starting at 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub question_index: usize,
    pub answer_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: AnswerId,
    pub attempt_id: AttemptId,
    pub question_index: usize,
    pub answer_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: AttemptId,
    pub quiz_id: QuizId,
    pub user_id: UserId,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub answers: Vec<AnswerRecord>,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const OPTIONS_PER_QUESTION: usize = 4;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);
id_newtype!(QuizId);
id_newtype!(AttemptId);
id_newtype!(AnswerId);

/// Free-text fields of a question addressable by a single edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionField {
    Prompt,
    Answer,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("question index {index} is out of range for a draft with {len} questions")]
    QuestionOutOfRange { index: usize, len: usize },
    #[error("option index {index} is out of range; every question has exactly four options")]
    OptionOutOfRange { index: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionDraft {
    pub prompt: String,
    pub options: [String; OPTIONS_PER_QUESTION],
    /// Intended to match one of `options`, never checked.
    pub answer: String,
}

impl QuestionDraft {
    pub fn field(&self, field: QuestionField) -> &str {
        match field {
            QuestionField::Prompt => &self.prompt,
            QuestionField::Answer => &self.answer,
        }
    }
}

/// In-progress quiz. Every edit produces a new value; questions that an edit
/// does not touch are shared with the previous value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizDraft {
    pub title: String,
    pub questions: Vec<Arc<QuestionDraft>>,
}

impl Default for QuizDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizDraft {
    /// Empty title and a single blank question.
    pub fn new() -> Self {
        Self {
            title: String::new(),
            questions: vec![Arc::new(QuestionDraft::default())],
        }
    }

    pub fn question(&self, index: usize) -> Option<&QuestionDraft> {
        self.questions.get(index).map(Arc::as_ref)
    }

    pub fn with_title(&self, value: impl Into<String>) -> Self {
        Self {
            title: value.into(),
            questions: self.questions.clone(),
        }
    }

    pub fn with_question_field(
        &self,
        index: usize,
        field: QuestionField,
        value: impl Into<String>,
    ) -> Result<Self, DraftError> {
        let value = value.into();
        self.replace_question(index, |question| match field {
            QuestionField::Prompt => question.prompt = value,
            QuestionField::Answer => question.answer = value,
        })
    }

    pub fn with_option(
        &self,
        index: usize,
        option_index: usize,
        value: impl Into<String>,
    ) -> Result<Self, DraftError> {
        if option_index >= OPTIONS_PER_QUESTION {
            return Err(DraftError::OptionOutOfRange {
                index: option_index,
            });
        }
        let value = value.into();
        self.replace_question(index, |question| question.options[option_index] = value)
    }

    pub fn with_added_question(&self) -> Self {
        let mut questions = Vec::with_capacity(self.questions.len() + 1);
        questions.extend(self.questions.iter().cloned());
        questions.push(Arc::new(QuestionDraft::default()));
        Self {
            title: self.title.clone(),
            questions,
        }
    }

    fn replace_question(
        &self,
        index: usize,
        edit: impl FnOnce(&mut QuestionDraft),
    ) -> Result<Self, DraftError> {
        let Some(current) = self.questions.get(index) else {
            return Err(DraftError::QuestionOutOfRange {
                index,
                len: self.questions.len(),
            });
        };

        let mut replacement = QuestionDraft::clone(current);
        edit(&mut replacement);

        let mut questions = self.questions.clone();
        questions[index] = Arc::new(replacement);
        Ok(Self {
            title: self.title.clone(),
            questions,
        })
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;

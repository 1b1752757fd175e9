use std::{fs, path::Path};

use anyhow::{Context, Result};
use client_core::QuizDraftStore;
use serde::Deserialize;
use shared::domain::{QuestionField, QuizDraft};

/// Quiz authored offline as TOML:
///
/// ```toml
/// title = "Capitals"
///
/// [[questions]]
/// question = "Capital of France?"
/// options = ["Paris", "Rome", "Berlin", "Madrid"]
/// answer = "Paris"
/// ```
#[derive(Debug, Deserialize)]
pub struct QuizFile {
    pub title: String,
    #[serde(default)]
    pub questions: Vec<QuestionEntry>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionEntry {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub answer: String,
}

pub fn read_quiz_file(path: &Path) -> Result<QuizFile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read quiz file '{}'", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("invalid quiz file '{}'", path.display()))
}

/// Feeds the file through the same edit operations the composer form uses,
/// so every option-count rule applies to files as well.
pub fn apply_to_store(file: &QuizFile, store: &QuizDraftStore) -> Result<QuizDraft> {
    store.update_title(file.title.as_str());

    for (index, entry) in file.questions.iter().enumerate() {
        if index >= store.draft().questions.len() {
            store.add_question();
        }
        let context = || format!("question {}", index + 1);
        store
            .update_question_field(index, QuestionField::Prompt, entry.question.as_str())
            .with_context(context)?;
        store
            .update_question_field(index, QuestionField::Answer, entry.answer.as_str())
            .with_context(context)?;
        for (option_index, option) in entry.options.iter().enumerate() {
            store
                .update_option(index, option_index, option.as_str())
                .with_context(context)?;
        }
    }

    Ok(store.draft())
}

#[cfg(test)]
#[path = "tests/quiz_file_tests.rs"]
mod tests;

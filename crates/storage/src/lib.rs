use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{
    domain::{AnswerId, AttemptId, QuizId, UserId, OPTIONS_PER_QUESTION},
    protocol::{AnswerRecord, AttemptRecord, QuestionPayload, QuizRecord, QuizSubmission},
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredUser {
    pub user_id: UserId,
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct QuizSummary {
    pub quiz_id: QuizId,
    pub title: String,
    pub author: Option<String>,
    pub question_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        // Every in-memory connection is its own database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn load_session_value(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM session_values WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read session value '{key}'"))?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    pub async fn save_session_value(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO session_values (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write session value '{key}'"))?;
        Ok(())
    }

    /// Returns whether a value was present.
    pub async fn remove_session_value(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM session_values WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to remove session value '{key}'"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Creates the user, or replaces the credentials of an existing user with
    /// the same name.
    pub async fn upsert_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserId> {
        let rec = sqlx::query(
            "INSERT INTO users (username, password_hash) VALUES (?1, ?2)
             ON CONFLICT(username) DO UPDATE SET password_hash = excluded.password_hash
             RETURNING id",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(UserId(rec.get::<i64, _>(0)))
    }

    pub async fn find_user(&self, username: &str) -> Result<Option<StoredUser>> {
        let row = sqlx::query(
            "SELECT id, username, password_hash FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| -> Result<StoredUser> {
            Ok(StoredUser {
                user_id: UserId(r.try_get("id")?),
                username: r.try_get("username")?,
                password_hash: r.try_get("password_hash")?,
            })
        })
        .transpose()
    }

    /// Quizzes posted without a bearer token have no author.
    pub async fn insert_quiz(
        &self,
        author: Option<UserId>,
        quiz: &QuizSubmission,
    ) -> Result<QuizId> {
        let mut tx = self.pool.begin().await?;

        let rec = sqlx::query(
            "INSERT INTO quizzes (author_user_id, title, created_at) VALUES (?1, ?2, ?3) RETURNING id",
        )
        .bind(author.map(|id| id.0))
        .bind(&quiz.title)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .context("failed to insert quiz")?;
        let quiz_id = QuizId(rec.get::<i64, _>(0));

        for (position, question) in quiz.questions.iter().enumerate() {
            let options_json = serde_json::to_string(&question.options)?;
            sqlx::query(
                "INSERT INTO quiz_questions (quiz_id, position, question, options_json, answer)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(quiz_id.0)
            .bind(position as i64)
            .bind(&question.question)
            .bind(options_json)
            .bind(&question.answer)
            .execute(&mut *tx)
            .await
            .with_context(|| {
                format!("failed to insert question {position} of quiz {}", quiz_id.0)
            })?;
        }

        tx.commit().await?;
        Ok(quiz_id)
    }

    pub async fn load_quiz(&self, quiz_id: QuizId) -> Result<Option<QuizRecord>> {
        let Some(row) = sqlx::query(
            "SELECT q.title, q.created_at, u.username
             FROM quizzes q LEFT JOIN users u ON u.id = q.author_user_id
             WHERE q.id = ?",
        )
        .bind(quiz_id.0)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let rows = sqlx::query(
            "SELECT question, options_json, answer FROM quiz_questions
             WHERE quiz_id = ? ORDER BY position ASC",
        )
        .bind(quiz_id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut questions = Vec::with_capacity(rows.len());
        for r in rows {
            let options_json: String = r.try_get("options_json")?;
            let options: Vec<String> = serde_json::from_str(&options_json)
                .with_context(|| format!("corrupt options for quiz {}", quiz_id.0))?;
            let options: [String; OPTIONS_PER_QUESTION] =
                options.try_into().map_err(|v: Vec<String>| {
                    anyhow!(
                        "quiz {} has a question with {} options, expected {OPTIONS_PER_QUESTION}",
                        quiz_id.0,
                        v.len()
                    )
                })?;
            questions.push(QuestionPayload {
                question: r.try_get("question")?,
                options,
                answer: r.try_get("answer")?,
            });
        }

        Ok(Some(QuizRecord {
            id: quiz_id,
            title: row.try_get("title")?,
            author: row.try_get("username")?,
            created_at: row.try_get("created_at")?,
            questions,
        }))
    }

    pub async fn list_quizzes(&self, limit: i64) -> Result<Vec<QuizSummary>> {
        let rows = sqlx::query(
            "SELECT q.id, q.title, q.created_at, u.username,
                    (SELECT COUNT(*) FROM quiz_questions qq WHERE qq.quiz_id = q.id) AS question_count
             FROM quizzes q LEFT JOIN users u ON u.id = q.author_user_id
             ORDER BY q.id DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| -> Result<QuizSummary> {
                Ok(QuizSummary {
                    quiz_id: QuizId(r.try_get("id")?),
                    title: r.try_get("title")?,
                    author: r.try_get("username")?,
                    question_count: r.try_get("question_count")?,
                    created_at: r.try_get("created_at")?,
                })
            })
            .collect()
    }

    pub async fn insert_attempt(&self, quiz_id: QuizId, user_id: UserId) -> Result<AttemptId> {
        let rec = sqlx::query(
            "INSERT INTO quiz_attempts (quiz_id, user_id, started_at) VALUES (?1, ?2, ?3) RETURNING id",
        )
        .bind(quiz_id.0)
        .bind(user_id.0)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to start attempt at quiz {}", quiz_id.0))?;
        Ok(AttemptId(rec.get::<i64, _>(0)))
    }

    /// Loads the attempt with its answers in the order they were given.
    pub async fn load_attempt(&self, attempt_id: AttemptId) -> Result<Option<AttemptRecord>> {
        let Some(row) = sqlx::query(
            "SELECT quiz_id, user_id, started_at, completed_at FROM quiz_attempts WHERE id = ?",
        )
        .bind(attempt_id.0)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let answers = sqlx::query(
            "SELECT id, question_index, answer_text FROM attempt_answers
             WHERE attempt_id = ? ORDER BY id ASC",
        )
        .bind(attempt_id.0)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|r| -> Result<AnswerRecord> {
            Ok(AnswerRecord {
                id: AnswerId(r.try_get("id")?),
                attempt_id,
                question_index: usize::try_from(r.try_get::<i64, _>("question_index")?)?,
                answer_text: r.try_get("answer_text")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

        Ok(Some(AttemptRecord {
            id: attempt_id,
            quiz_id: QuizId(row.try_get("quiz_id")?),
            user_id: UserId(row.try_get("user_id")?),
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            answers,
        }))
    }

    pub async fn insert_answer(
        &self,
        attempt_id: AttemptId,
        question_index: usize,
        answer_text: &str,
    ) -> Result<AnswerRecord> {
        let rec = sqlx::query(
            "INSERT INTO attempt_answers (attempt_id, question_index, answer_text)
             VALUES (?1, ?2, ?3) RETURNING id",
        )
        .bind(attempt_id.0)
        .bind(i64::try_from(question_index)?)
        .bind(answer_text)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to record answer for attempt {}", attempt_id.0))?;

        Ok(AnswerRecord {
            id: AnswerId(rec.get::<i64, _>(0)),
            attempt_id,
            question_index,
            answer_text: answer_text.to_string(),
        })
    }

    pub async fn load_answer(&self, answer_id: AnswerId) -> Result<Option<AnswerRecord>> {
        let row = sqlx::query(
            "SELECT attempt_id, question_index, answer_text FROM attempt_answers WHERE id = ?",
        )
        .bind(answer_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| -> Result<AnswerRecord> {
            Ok(AnswerRecord {
                id: answer_id,
                attempt_id: AttemptId(r.try_get("attempt_id")?),
                question_index: usize::try_from(r.try_get::<i64, _>("question_index")?)?,
                answer_text: r.try_get("answer_text")?,
            })
        })
        .transpose()
    }

    /// Stamps the completion time once. Returns false when the attempt does
    /// not exist or was already completed.
    pub async fn complete_attempt(&self, attempt_id: AttemptId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE quiz_attempts SET completed_at = ?1 WHERE id = ?2 AND completed_at IS NULL",
        )
        .bind(Utc::now())
        .bind(attempt_id.0)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to complete attempt {}", attempt_id.0))?;
        Ok(result.rows_affected() > 0)
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

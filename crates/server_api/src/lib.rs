pub mod credentials;
pub mod tokens;

use shared::{
    domain::{AnswerId, AttemptId, QuizId, UserId},
    error::{ApiError, ErrorCode},
    protocol::{
        AnswerRecord, AnswerRequest, AttemptRecord, LoginRequest, LoginResponse, QuizAck,
        QuizRecord, QuizSubmission, StartAttemptRequest, UserProfile,
    },
};
use storage::{Storage, StoredUser};
use tracing::{error, info, warn};

pub use tokens::{mint_token, verify_token, AccessClaims, TokenConfig};

const BAD_CREDENTIALS: &str = "Bad username or password";

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub tokens: TokenConfig,
    /// bcrypt work factor for newly stored passwords.
    pub password_cost: u32,
}

/// Creates the account, or resets the password when the name is taken.
pub async fn register_user(
    ctx: &ApiContext,
    username: &str,
    password: &str,
) -> Result<UserId, ApiError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "username is required"));
    }
    if password.is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "password is required"));
    }

    let password_hash = credentials::hash_password(password, ctx.password_cost)
        .map_err(|err| internal(err.into()))?;
    let user_id = ctx
        .storage
        .upsert_user(username, &password_hash)
        .await
        .map_err(internal)?;
    info!(user_id = user_id.0, %username, "user registered");
    Ok(user_id)
}

pub async fn login(ctx: &ApiContext, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
    let user = ctx
        .storage
        .find_user(&request.username)
        .await
        .map_err(internal)?;

    let Some(user) = user
        .filter(|user| credentials::verify_password(&request.password, &user.password_hash))
    else {
        warn!(username = %request.username, "login rejected");
        return Err(ApiError::new(ErrorCode::Unauthorized, BAD_CREDENTIALS));
    };

    let access_token =
        mint_token(&ctx.tokens, &user.username).map_err(|err| internal(err.into()))?;
    info!(user_id = user.user_id.0, "login accepted");
    Ok(LoginResponse { access_token })
}

/// Resolves a bearer token to the account it was issued for.
pub async fn authenticate(ctx: &ApiContext, token: &str) -> Result<StoredUser, ApiError> {
    let claims = verify_token(&ctx.tokens, token).map_err(|err| {
        warn!(error = %err, "bearer token rejected");
        ApiError::new(ErrorCode::Unauthorized, "invalid or expired token")
    })?;

    ctx.storage
        .find_user(&claims.sub)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::new(ErrorCode::Unauthorized, "unknown user"))
}

pub async fn current_user(ctx: &ApiContext, token: &str) -> Result<UserProfile, ApiError> {
    let user = authenticate(ctx, token).await?;
    Ok(UserProfile {
        username: user.username,
    })
}

/// Stores a quiz. Without a token the quiz is saved anonymously; a token that
/// does not verify is rejected rather than ignored.
pub async fn create_quiz(
    ctx: &ApiContext,
    token: Option<&str>,
    quiz: &QuizSubmission,
) -> Result<QuizAck, ApiError> {
    let author = match token {
        Some(token) => Some(authenticate(ctx, token).await?.user_id),
        None => None,
    };

    let id = ctx
        .storage
        .insert_quiz(author, quiz)
        .await
        .map_err(internal)?;
    info!(
        quiz_id = id.0,
        author = author.map(|a| a.0),
        questions = quiz.questions.len(),
        "quiz stored"
    );
    Ok(QuizAck {
        id,
        title: quiz.title.clone(),
    })
}

pub async fn get_quiz(ctx: &ApiContext, quiz_id: QuizId) -> Result<QuizRecord, ApiError> {
    ctx.storage
        .load_quiz(quiz_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "quiz not found"))
}

pub async fn start_attempt(
    ctx: &ApiContext,
    token: &str,
    request: &StartAttemptRequest,
) -> Result<AttemptRecord, ApiError> {
    let user = authenticate(ctx, token).await?;
    get_quiz(ctx, request.quiz_id).await?;

    let attempt_id = ctx
        .storage
        .insert_attempt(request.quiz_id, user.user_id)
        .await
        .map_err(internal)?;
    info!(
        attempt_id = attempt_id.0,
        quiz_id = request.quiz_id.0,
        user_id = user.user_id.0,
        "attempt started"
    );
    get_attempt(ctx, attempt_id).await
}

pub async fn get_attempt(ctx: &ApiContext, attempt_id: AttemptId) -> Result<AttemptRecord, ApiError> {
    ctx.storage
        .load_attempt(attempt_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "attempt not found"))
}

/// Records one answer. Only the attempt's owner may answer, and only while
/// the attempt is open.
pub async fn add_answer(
    ctx: &ApiContext,
    token: &str,
    attempt_id: AttemptId,
    request: &AnswerRequest,
) -> Result<AnswerRecord, ApiError> {
    let attempt = owned_open_attempt(ctx, token, attempt_id).await?;

    if request.answer_text.trim().is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "answer_text is required"));
    }
    let quiz = get_quiz(ctx, attempt.quiz_id).await?;
    if request.question_index >= quiz.questions.len() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            format!(
                "question_index {} is out of range for a quiz with {} questions",
                request.question_index,
                quiz.questions.len()
            ),
        ));
    }

    let answer = ctx
        .storage
        .insert_answer(attempt_id, request.question_index, &request.answer_text)
        .await
        .map_err(internal)?;
    info!(
        answer_id = answer.id.0,
        attempt_id = attempt_id.0,
        question_index = request.question_index,
        "answer recorded"
    );
    Ok(answer)
}

pub async fn complete_attempt(
    ctx: &ApiContext,
    token: &str,
    attempt_id: AttemptId,
) -> Result<AttemptRecord, ApiError> {
    owned_open_attempt(ctx, token, attempt_id).await?;

    if !ctx
        .storage
        .complete_attempt(attempt_id)
        .await
        .map_err(internal)?
    {
        return Err(already_completed());
    }
    info!(attempt_id = attempt_id.0, "attempt completed");
    get_attempt(ctx, attempt_id).await
}

pub async fn get_answer(ctx: &ApiContext, answer_id: AnswerId) -> Result<AnswerRecord, ApiError> {
    ctx.storage
        .load_answer(answer_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "answer not found"))
}

async fn owned_open_attempt(
    ctx: &ApiContext,
    token: &str,
    attempt_id: AttemptId,
) -> Result<AttemptRecord, ApiError> {
    let user = authenticate(ctx, token).await?;
    let attempt = get_attempt(ctx, attempt_id).await?;
    if attempt.user_id != user.user_id {
        warn!(
            attempt_id = attempt_id.0,
            user_id = user.user_id.0,
            "attempt belongs to another user"
        );
        return Err(ApiError::new(
            ErrorCode::Forbidden,
            "attempt belongs to another user",
        ));
    }
    if attempt.completed_at.is_some() {
        return Err(already_completed());
    }
    Ok(attempt)
}

fn already_completed() -> ApiError {
    ApiError::new(ErrorCode::Validation, "attempt is already completed")
}

fn internal(err: anyhow::Error) -> ApiError {
    error!(error = %err, "request failed");
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

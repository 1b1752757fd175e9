use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use server_api::{ApiContext, TokenConfig};
use shared::{
    domain::{AnswerId, AttemptId, QuizId},
    error::{ApiError, ErrorCode},
    protocol::{
        AnswerRecord, AnswerRequest, AttemptRecord, LoginRequest, LoginResponse, QuizAck,
        QuizRecord, QuizSubmission, StartAttemptRequest, UserProfile, ATTEMPTS_ROUTE,
        LOGIN_ROUTE, QUIZZES_ROUTE, USER_ANSWERS_ROUTE, USER_ROUTE,
    },
};
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

mod config;

use config::{load_settings, normalize_database_url, validate};

const MAX_BODY_BYTES: usize = 1024 * 1024;

type Rejection = (StatusCode, Json<ApiError>);
type ApiResult<T> = Result<Json<T>, Rejection>;
type Created<T> = Result<(StatusCode, Json<T>), Rejection>;

struct AppState {
    api: ApiContext,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    validate(&settings)?;
    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let api = ApiContext {
        storage,
        tokens: TokenConfig {
            secret: settings.jwt_secret,
            ttl_seconds: settings.token_ttl_seconds,
        },
        password_cost: settings.password_cost,
    };

    let app = build_router(Arc::new(AppState { api }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(LOGIN_ROUTE, post(login))
        .route(USER_ROUTE, get(current_user))
        .route(QUIZZES_ROUTE, post(create_quiz))
        .route(&format!("{QUIZZES_ROUTE}/:quiz_id"), get(get_quiz))
        .route(ATTEMPTS_ROUTE, post(start_attempt))
        .route(&format!("{ATTEMPTS_ROUTE}/:attempt_id"), get(get_attempt))
        .route(&format!("{ATTEMPTS_ROUTE}/:attempt_id/answers"), post(add_answer))
        .route(
            &format!("{ATTEMPTS_ROUTE}/:attempt_id/complete"),
            post(complete_attempt),
        )
        .route(&format!("{USER_ANSWERS_ROUTE}/:answer_id"), get(get_answer))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, StatusCode> {
    state.api.storage.health_check().await.map_err(|error| {
        error!(%error, "health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    Ok("ok")
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    server_api::login(&state.api, &req)
        .await
        .map(Json)
        .map_err(reject)
}

async fn current_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<UserProfile> {
    let token = required_bearer(&headers)?;
    server_api::current_user(&state.api, token)
        .await
        .map(Json)
        .map_err(reject)
}

async fn create_quiz(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(quiz): Json<QuizSubmission>,
) -> ApiResult<QuizAck> {
    let token = bearer_token(&headers)?;
    server_api::create_quiz(&state.api, token, &quiz)
        .await
        .map(Json)
        .map_err(reject)
}

async fn get_quiz(
    State(state): State<Arc<AppState>>,
    Path(quiz_id): Path<i64>,
) -> ApiResult<QuizRecord> {
    server_api::get_quiz(&state.api, QuizId(quiz_id))
        .await
        .map(Json)
        .map_err(reject)
}

async fn start_attempt(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<StartAttemptRequest>,
) -> Created<AttemptRecord> {
    let token = required_bearer(&headers)?;
    server_api::start_attempt(&state.api, token, &req)
        .await
        .map(|attempt| (StatusCode::CREATED, Json(attempt)))
        .map_err(reject)
}

async fn get_attempt(
    State(state): State<Arc<AppState>>,
    Path(attempt_id): Path<i64>,
) -> ApiResult<AttemptRecord> {
    server_api::get_attempt(&state.api, AttemptId(attempt_id))
        .await
        .map(Json)
        .map_err(reject)
}

async fn add_answer(
    State(state): State<Arc<AppState>>,
    Path(attempt_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<AnswerRequest>,
) -> Created<AnswerRecord> {
    let token = required_bearer(&headers)?;
    server_api::add_answer(&state.api, token, AttemptId(attempt_id), &req)
        .await
        .map(|answer| (StatusCode::CREATED, Json(answer)))
        .map_err(reject)
}

async fn complete_attempt(
    State(state): State<Arc<AppState>>,
    Path(attempt_id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<AttemptRecord> {
    let token = required_bearer(&headers)?;
    server_api::complete_attempt(&state.api, token, AttemptId(attempt_id))
        .await
        .map(Json)
        .map_err(reject)
}

async fn get_answer(
    State(state): State<Arc<AppState>>,
    Path(answer_id): Path<i64>,
) -> ApiResult<AnswerRecord> {
    server_api::get_answer(&state.api, AnswerId(answer_id))
        .await
        .map(Json)
        .map_err(reject)
}

fn required_bearer(headers: &HeaderMap) -> Result<&str, Rejection> {
    bearer_token(headers)?
        .ok_or_else(|| reject(ApiError::new(ErrorCode::Unauthorized, "missing bearer token")))
}

/// `Ok(None)` when no Authorization header was sent at all.
fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, Rejection> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|raw| raw.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Some)
        .ok_or_else(|| {
            reject(ApiError::new(
                ErrorCode::Unauthorized,
                "authorization header must be 'Bearer <token>'",
            ))
        })
}

fn reject(err: ApiError) -> Rejection {
    let status = match err.code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;

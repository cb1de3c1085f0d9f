// 注册、登录与当前用户

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::{non_empty, user_conflict, CurrentUser};
use crate::error::{ApiJson, AppError, AppResult};
use crate::models::{NewUser, Role, UserSummary};
use crate::services::auth::MIN_PASSWORD_LEN;
use crate::services::{hash_password_async, is_valid_email, verify_password_async};
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    leetcode_username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

pub fn public_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

pub fn protected_routes() -> Router<SharedState> {
    Router::new().route("/api/auth/me", get(me))
}

async fn register(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let (Some(name), Some(email), Some(password), Some(leetcode_username)) = (
        non_empty(req.name),
        non_empty(req.email),
        req.password.filter(|p| !p.is_empty()),
        non_empty(req.leetcode_username),
    ) else {
        return Err(AppError::bad_request(
            "Please provide all required fields: name, email, password, and LeetCode username",
        ));
    };

    let email = email.to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::bad_request("Please provide a valid email"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    if state.db.find_user_by_email(&email)?.is_some() {
        return Err(AppError::bad_request("Email already registered"));
    }
    if state.db.find_user_by_username(&leetcode_username)?.is_some() {
        return Err(AppError::bad_request("LeetCode username already registered"));
    }

    let user = state
        .db
        .create_user(&NewUser {
            name,
            email,
            password_hash: hash_password_async(password).await?,
            role: Role::User,
            leetcode_username,
        })
        .map_err(user_conflict)?;
    log::info!("User registered: {} ({})", user.email, user.leetcode_username);

    let token = state.tokens.issue(&user.id, user.role)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "token": token, "user": UserSummary::from(&user) })),
    ))
}

async fn login(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let (Some(email), Some(password)) = (non_empty(req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(AppError::bad_request("Please provide both email and password"));
    };

    let invalid = || AppError::unauthorized("Invalid email or password");

    let user = state
        .db
        .find_user_by_email(&email.to_lowercase())?
        .ok_or_else(invalid)?;
    if !verify_password_async(password, user.password_hash.clone()).await? {
        log::info!("Failed login for {}", user.email);
        return Err(invalid());
    }

    let token = state.tokens.issue(&user.id, user.role)?;
    Ok(Json(json!({
        "success": true,
        "data": { "token": token, "user": UserSummary::from(&user) }
    })))
}

async fn me(Extension(user): Extension<CurrentUser>) -> impl IntoResponse {
    Json(user.0)
}

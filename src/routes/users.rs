// 用户资料、修改密码、用户列表与公开排行

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::{ensure_admin, non_empty, user_conflict, CurrentUser};
use crate::error::{ApiJson, AppError, AppResult};
use crate::services::auth::MIN_PASSWORD_LEN;
use crate::services::{hash_password_async, top_users_by_solved, verify_password_async};
use crate::state::SharedState;

/// 公开排行榜人数
const TOP_USERS: usize = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    name: Option<String>,
    leetcode_username: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    current_password: Option<String>,
    new_password: Option<String>,
}

pub fn public_routes() -> Router<SharedState> {
    Router::new().route("/api/users/leaderboard", get(leaderboard))
}

pub fn protected_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/users/profile", get(get_profile).put(update_profile))
        .route("/api/users/change-password", put(change_password))
        .route("/api/users/all", get(list_all))
}

async fn get_profile(Extension(user): Extension<CurrentUser>) -> impl IntoResponse {
    Json(user.0)
}

async fn update_profile(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(req): ApiJson<ProfileUpdate>,
) -> AppResult<impl IntoResponse> {
    let name = non_empty(req.name);
    let leetcode_username = non_empty(req.leetcode_username);

    if let Some(handle) = &leetcode_username {
        if let Some(owner) = state.db.find_user_by_username(handle)? {
            if owner.id != user.id() {
                return Err(AppError::bad_request("LeetCode username already registered"));
            }
        }
    }

    let updated = state
        .db
        .update_user_profile(user.id(), name.as_deref(), leetcode_username.as_deref())
        .map_err(user_conflict)?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(updated))
}

async fn change_password(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> AppResult<impl IntoResponse> {
    let (Some(current), Some(new)) = (
        req.current_password.filter(|p| !p.is_empty()),
        req.new_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::bad_request(
            "Please provide both current and new password",
        ));
    };

    if !verify_password_async(current, user.0.password_hash.clone()).await? {
        return Err(AppError::bad_request("Current password is incorrect"));
    }
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let password_hash = hash_password_async(new).await?;
    state.db.update_password(user.id(), &password_hash)?;
    log::info!("Password changed for {}", user.0.email);

    Ok(Json(json!({ "message": "Password updated successfully" })))
}

async fn list_all(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    ensure_admin(&user)?;
    Ok(Json(state.db.list_users()?))
}

async fn leaderboard(State(state): State<SharedState>) -> AppResult<impl IntoResponse> {
    let users = state.db.list_users()?;
    let counts = state.db.solved_counts_by_user()?;

    Ok(Json(top_users_by_solved(&users, &counts, TOP_USERS, false)))
}

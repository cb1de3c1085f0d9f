// 管理端接口：用户、统计、提交审核、标签
// 整个路由挂在 require_admin 之后

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;

use super::{distinct_topics, CurrentUser};
use crate::error::{ApiJson, AppError, AppResult};
use crate::models::{ReviewStatus, UserListItem};
use crate::services::{compute_user_stats, top_users_by_solved};
use crate::state::SharedState;

const TOP_USERS: usize = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    review_status: Option<String>,
    #[serde(default)]
    review_feedback: String,
}

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/users", get(top_users))
        .route("/users/list", get(users_list))
        .route("/users/:user_id/stats", get(user_stats))
        .route("/submissions", get(submissions))
        .route("/submissions/:id", get(submission))
        .route("/submissions/:id/review", put(review))
        .route("/topics", get(topics))
}

async fn top_users(State(state): State<SharedState>) -> AppResult<impl IntoResponse> {
    let users = state.db.list_users()?;
    let counts = state.db.solved_counts_by_user()?;

    Ok(Json(top_users_by_solved(&users, &counts, TOP_USERS, true)))
}

async fn users_list(State(state): State<SharedState>) -> AppResult<impl IntoResponse> {
    let users: Vec<UserListItem> = state
        .db
        .list_users()?
        .into_iter()
        .map(|u| UserListItem {
            id: u.id,
            name: u.name,
        })
        .collect();

    Ok(Json(users))
}

async fn user_stats(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    if state.db.find_user_by_id(&user_id)?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let questions = state.db.list_questions()?;
    let solved = state.db.solved_question_ids(&user_id)?;
    Ok(Json(compute_user_stats(&questions, &solved)))
}

async fn submissions(State(state): State<SharedState>) -> AppResult<impl IntoResponse> {
    Ok(Json(state.db.list_submissions()?))
}

async fn submission(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let submission = state
        .db
        .get_submission(&id)?
        .ok_or_else(|| AppError::not_found("Submission not found"))?;

    Ok(Json(submission))
}

async fn review(
    State(state): State<SharedState>,
    Extension(reviewer): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ReviewRequest>,
) -> AppResult<impl IntoResponse> {
    let status = req
        .review_status
        .as_deref()
        .and_then(|s| s.parse::<ReviewStatus>().ok())
        .filter(ReviewStatus::is_verdict)
        .ok_or_else(|| AppError::bad_request("Invalid review status"))?;

    let not_found = || AppError::not_found("Submission not found");
    if !state
        .db
        .review_progress(&id, status, &req.review_feedback, reviewer.id())?
    {
        return Err(not_found());
    }
    log::info!("Submission {} reviewed as {} by {}", id, status.as_str(), reviewer.id());

    let submission = state.db.get_submission(&id)?.ok_or_else(not_found)?;
    Ok(Json(submission))
}

async fn topics(State(state): State<SharedState>) -> AppResult<impl IntoResponse> {
    Ok(Json(distinct_topics(&state.db.list_questions()?)))
}

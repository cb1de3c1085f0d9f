// 做题进度接口

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde_json::json;
use std::collections::{HashMap, HashSet};

use super::{parse_id, CurrentUser};
use crate::error::{ApiJson, AppError, AppResult};
use crate::models::{ProgressUpdate, Question, QuestionSummary};
use crate::services::stats::{daily_progress, tally_where, topic_progress};
use crate::services::compute_user_stats;
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/api/progress/user", get(list_user_progress))
        .route("/api/progress/user/overall", get(overall))
        .route("/api/progress/user/topics", get(topics))
        .route("/api/progress/user/topics/:topic", get(topic))
        .route("/api/progress/user/daily", get(daily))
        .route("/api/progress/user/daily/:day", get(day))
        .route(
            "/api/progress/:question_id",
            get(get_progress).post(upsert_progress),
        )
}

async fn upsert_progress(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Path(question_id): Path<String>,
    ApiJson(update): ApiJson<ProgressUpdate>,
) -> AppResult<impl IntoResponse> {
    let question_id = parse_id(&question_id, "Invalid question ID")?;
    if state.db.get_question(question_id)?.is_none() {
        return Err(AppError::not_found("Question not found"));
    }

    let progress = state.db.upsert_progress(user.id(), question_id, &update)?;
    log::debug!(
        "Progress saved for user {} on {} (solved: {})",
        user.id(),
        question_id,
        progress.is_solved
    );

    Ok(Json(progress))
}

async fn get_progress(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Path(question_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let question_id = parse_id(&question_id, "Invalid question ID")?;
    let not_found = || AppError::not_found("Progress not found");

    let progress = state
        .db
        .get_progress(user.id(), question_id)?
        .ok_or_else(not_found)?;
    let question = state.db.get_question(question_id)?.ok_or_else(not_found)?;

    Ok(Json(progress.with_question(QuestionSummary::from(&question))))
}

async fn list_user_progress(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    let questions = state.db.list_questions()?;
    let by_id: HashMap<&str, &Question> = questions.iter().map(|q| (q.id.as_str(), q)).collect();

    let records: Vec<_> = state
        .db
        .list_progress_for_user(user.id())?
        .into_iter()
        .filter_map(|p| {
            let summary = by_id.get(p.question.as_str()).map(|q| QuestionSummary::from(*q))?;
            Some(p.with_question(summary))
        })
        .collect();

    Ok(Json(records))
}

/// 当前用户已解决的题目 id 与全部题目
fn load(state: &SharedState, user: &CurrentUser) -> AppResult<(Vec<Question>, Vec<String>)> {
    Ok((
        state.db.list_questions()?,
        state.db.solved_question_ids(user.id())?,
    ))
}

fn solved_set(ids: &[String]) -> HashSet<&str> {
    ids.iter().map(String::as_str).collect()
}

async fn overall(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    let (questions, solved) = load(&state, &user)?;
    Ok(Json(compute_user_stats(&questions, &solved)))
}

async fn topics(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    let (questions, solved) = load(&state, &user)?;
    Ok(Json(topic_progress(&questions, &solved_set(&solved))))
}

async fn topic(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Path(topic): Path<String>,
) -> AppResult<impl IntoResponse> {
    let (questions, solved) = load(&state, &user)?;
    let tally = tally_where(&questions, &solved_set(&solved), |q| {
        q.topics.iter().any(|t| *t == topic)
    });

    Ok(Json(json!({ "topic": topic, "total": tally.total, "solved": tally.solved })))
}

async fn daily(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    let (questions, solved) = load(&state, &user)?;
    Ok(Json(daily_progress(&questions, &solved_set(&solved))))
}

async fn day(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Path(day): Path<String>,
) -> AppResult<impl IntoResponse> {
    let day: i64 = day
        .trim()
        .parse()
        .map_err(|_| AppError::bad_request("Invalid day"))?;

    let (questions, solved) = load(&state, &user)?;
    let tally = tally_where(&questions, &solved_set(&solved), |q| q.day_plan == Some(day));

    Ok(Json(json!({ "day": day, "total": tally.total, "solved": tally.solved })))
}

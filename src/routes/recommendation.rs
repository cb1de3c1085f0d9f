// 推荐接口：优先使用 Gemini，任何失败都回退到按天数的推荐

use axum::{extract::State, response::IntoResponse, routing::get, Extension, Json, Router};
use std::collections::HashSet;

use super::CurrentUser;
use crate::error::AppResult;
use crate::services::fallback_recommendations;
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new().route("/api/recommendation", get(recommend))
}

async fn recommend(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    let questions = state.db.list_questions()?;
    let solved_ids = state.db.solved_question_ids(user.id())?;
    let solved: HashSet<&str> = solved_ids.iter().map(String::as_str).collect();

    if questions.iter().all(|q| solved.contains(q.id.as_str())) {
        log::info!("User {} has no unsolved questions", user.id());
        return Ok(Json(Vec::new()));
    }

    if state.gemini.is_configured() {
        match state.gemini.recommend(&questions, &solved).await {
            Ok(picks) => return Ok(Json(picks)),
            Err(e) => log::warn!("AI recommendation failed, using fallback: {:#}", e),
        }
    }

    Ok(Json(fallback_recommendations(&questions, &solved)))
}

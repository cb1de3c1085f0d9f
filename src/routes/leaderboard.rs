// 排行榜接口：日榜、周榜、总榜

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::services::{rank_leaderboard, LeaderboardWindow};
use crate::state::SharedState;

const MAX_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<String>,
}

impl LimitQuery {
    fn resolve(&self, window: LeaderboardWindow) -> AppResult<usize> {
        let Some(raw) = self.limit.as_deref().map(str::trim).filter(|l| !l.is_empty()) else {
            return Ok(window.default_limit());
        };

        match raw.parse::<usize>() {
            Ok(limit) if (1..=MAX_LIMIT).contains(&limit) => Ok(limit),
            _ => Err(AppError::bad_request(format!(
                "limit must be an integer between 1 and {}",
                MAX_LIMIT
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    leetcode_username: String,
    solved_count: u32,
    last_solved_at: Option<DateTime<Utc>>,
}

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/api/leaderboard/daily", get(daily))
        .route("/api/leaderboard/weekly", get(weekly))
        .route("/api/leaderboard/all-time", get(all_time))
}

async fn daily(
    State(state): State<SharedState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<impl IntoResponse> {
    leaderboard(&state, LeaderboardWindow::Daily, &query)
}

async fn weekly(
    State(state): State<SharedState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<impl IntoResponse> {
    leaderboard(&state, LeaderboardWindow::Weekly, &query)
}

async fn all_time(
    State(state): State<SharedState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<impl IntoResponse> {
    leaderboard(&state, LeaderboardWindow::AllTime, &query)
}

fn leaderboard(
    state: &SharedState,
    window: LeaderboardWindow,
    query: &LimitQuery,
) -> AppResult<Json<Vec<LeaderboardEntry>>> {
    let limit = query.resolve(window)?;
    let since = window.since(Utc::now());
    log::debug!("Leaderboard {:?} since {:?}, limit {}", window, since, limit);

    let ranked = rank_leaderboard(&state.db.solve_records()?, since, limit);

    let users = state.db.list_users()?;
    let by_id: HashMap<&str, &User> = users.iter().map(|u| (u.id.as_str(), u)).collect();

    let entries = ranked
        .into_iter()
        .map(|r| {
            let user = by_id.get(r.user_id.as_str());
            LeaderboardEntry {
                name: user.map(|u| u.name.clone()).unwrap_or_else(|| "Unknown User".to_string()),
                leetcode_username: user
                    .map(|u| u.leetcode_username.clone())
                    .unwrap_or_default(),
                id: r.user_id,
                solved_count: r.solved_count,
                last_solved_at: r.last_solved_at,
            }
        })
        .collect();

    Ok(Json(entries))
}

// 题库接口
// 列表（带进度合并与筛选）、详情、增删改、批量导入、天数与标签

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;

use super::{ensure_admin, non_empty, parse_id, CurrentUser};
use crate::error::{ApiJson, AppError, AppResult};
use crate::models::{Difficulty, NewQuestion, ProgressSnapshot, Question, QuestionPatch};
use crate::services::{merge_progress, StatusFilter};
use crate::state::SharedState;
use crate::utils::render_markdown;

/// 列表筛选参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionQuery {
    topic: Option<String>,
    topics: Option<String>,
    day_plan: Option<String>,
    difficulty: Option<String>,
    status: Option<String>,
}

impl QuestionQuery {
    /// `topic` 优先于 `topics`（逗号分隔，任一命中）；无法解析的 dayPlan 忽略
    fn matches(&self, question: &Question) -> bool {
        if let Some(difficulty) = self.difficulty.as_deref().filter(|d| !d.is_empty()) {
            if question.difficulty.as_str() != difficulty {
                return false;
            }
        }

        if let Some(topic) = self.topic.as_deref().filter(|t| !t.is_empty()) {
            if !question.topics.iter().any(|t| t == topic) {
                return false;
            }
        } else if let Some(topics) = self.topics.as_deref().filter(|t| !t.is_empty()) {
            let wanted: Vec<&str> = topics.split(',').map(str::trim).collect();
            if !question.topics.iter().any(|t| wanted.contains(&t.as_str())) {
                return false;
            }
        }

        if let Some(day) = self.day_plan.as_deref().and_then(|d| d.trim().parse::<i64>().ok()) {
            if question.day_plan != Some(day) {
                return false;
            }
        }

        true
    }

    fn status(&self) -> Option<StatusFilter> {
        self.status.as_deref().and_then(StatusFilter::parse)
    }
}

/// 创建、导入、更新共用的请求体
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    title: Option<String>,
    leetcode_slug: Option<String>,
    difficulty: Option<String>,
    topics: Option<Vec<String>>,
    day_plan: Option<i64>,
    leetcode_url: Option<String>,
    description: Option<String>,
    solution: Option<String>,
}

fn clean_topics(topics: Vec<String>) -> Vec<String> {
    topics
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

impl QuestionInput {
    fn into_new_question(self) -> Result<NewQuestion, String> {
        let (Some(title), Some(leetcode_slug), Some(difficulty), Some(leetcode_url)) = (
            non_empty(self.title),
            non_empty(self.leetcode_slug),
            non_empty(self.difficulty),
            non_empty(self.leetcode_url),
        ) else {
            return Err(
                "Please provide title, leetcodeSlug, difficulty and leetcodeUrl".to_string(),
            );
        };

        Ok(NewQuestion {
            title,
            leetcode_slug,
            difficulty: difficulty.parse::<Difficulty>()?,
            topics: clean_topics(self.topics.unwrap_or_default()),
            day_plan: self.day_plan,
            leetcode_url,
            description: non_empty(self.description),
            solution: non_empty(self.solution),
        })
    }

    /// 空字符串视为未提供
    fn into_patch(self) -> Result<QuestionPatch, String> {
        let difficulty = non_empty(self.difficulty)
            .map(|d| d.parse::<Difficulty>())
            .transpose()?;

        Ok(QuestionPatch {
            title: non_empty(self.title),
            leetcode_slug: non_empty(self.leetcode_slug),
            difficulty,
            topics: self.topics.map(clean_topics),
            day_plan: self.day_plan,
            leetcode_url: non_empty(self.leetcode_url),
            description: non_empty(self.description),
            solution: non_empty(self.solution),
        })
    }
}

/// 导入请求体：`{"questions": [...]}` 或数组；逐条解析，单条类型错误只记入 errors
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ImportPayload {
    Wrapped { questions: Vec<Value> },
    List(Vec<Value>),
}

impl ImportPayload {
    fn into_items(self) -> Vec<Value> {
        match self {
            ImportPayload::Wrapped { questions } | ImportPayload::List(questions) => questions,
        }
    }
}

/// 按下标校验导入条目，返回合法题目和错误列表
fn validate_import(items: Vec<Value>) -> (Vec<NewQuestion>, Vec<ImportError>) {
    let mut valid = Vec::with_capacity(items.len());
    let mut errors = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        let parsed = serde_json::from_value::<QuestionInput>(item)
            .map_err(|e| e.to_string())
            .and_then(QuestionInput::into_new_question);
        match parsed {
            Ok(q) => valid.push(q),
            Err(message) => errors.push(ImportError { index, message }),
        }
    }

    (valid, errors)
}

#[derive(Debug, PartialEq, Serialize)]
pub struct ImportError {
    index: usize,
    message: String,
}

/// 题目详情
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDetail {
    #[serde(flatten)]
    question: Question,
    user_progress: Option<ProgressSnapshot>,
    description_html: Option<String>,
    solution_html: Option<String>,
}

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route(
            "/api/questions",
            get(list_questions).post(create_question).delete(delete_all_questions),
        )
        .route("/api/questions/import", post(import_questions))
        .route("/api/questions/days/all", get(list_days))
        .route("/api/questions/topics/all", get(list_topics))
        .route(
            "/api/questions/:id",
            get(get_question).put(update_question).delete(delete_question),
        )
}

async fn list_questions(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<QuestionQuery>,
) -> AppResult<impl IntoResponse> {
    let questions: Vec<Question> = state
        .db
        .list_questions()?
        .into_iter()
        .filter(|q| query.matches(q))
        .collect();
    let progress = state.db.list_progress_for_user(user.id())?;

    log::debug!("{} questions after filtering {:?}", questions.len(), query);
    Ok(Json(merge_progress(questions, &progress, query.status())))
}

async fn get_question(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_id(&id, "Invalid question ID")?;
    let question = state
        .db
        .get_question(id)?
        .ok_or_else(|| AppError::not_found("Question not found"))?;
    let user_progress = state.db.get_progress(user.id(), id)?.map(|p| p.snapshot());

    Ok(Json(QuestionDetail {
        description_html: question.description.as_deref().map(render_markdown),
        solution_html: question.solution.as_deref().map(render_markdown),
        question,
        user_progress,
    }))
}

async fn create_question(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(input): ApiJson<QuestionInput>,
) -> AppResult<impl IntoResponse> {
    ensure_admin(&user)?;

    let new_question = input.into_new_question().map_err(AppError::BadRequest)?;
    let question = state.db.create_question(&new_question)?;
    log::info!("Question created: {}", question.title);

    Ok((StatusCode::CREATED, Json(question)))
}

async fn import_questions(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<ImportPayload>,
) -> AppResult<impl IntoResponse> {
    ensure_admin(&user)?;

    let (valid, errors) = validate_import(payload.into_items());

    let imported = state.db.create_questions_batch(&valid)?;
    log::info!(
        "Imported {} questions, {} rejected",
        imported.len(),
        errors.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "importedCount": imported.len(), "errors": errors })),
    ))
}

async fn update_question(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<QuestionInput>,
) -> AppResult<impl IntoResponse> {
    ensure_admin(&user)?;
    let id = parse_id(&id, "Invalid question ID")?;

    let patch = input.into_patch().map_err(AppError::BadRequest)?;
    let question = state
        .db
        .update_question(id, patch)?
        .ok_or_else(|| AppError::not_found("Question not found"))?;

    Ok(Json(question))
}

async fn delete_question(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    ensure_admin(&user)?;
    let id = parse_id(&id, "Invalid question ID")?;

    if !state.db.delete_question(id)? {
        return Err(AppError::not_found("Question not found"));
    }

    Ok(Json(json!({ "message": "Question deleted successfully" })))
}

async fn delete_all_questions(
    State(state): State<SharedState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    ensure_admin(&user)?;

    let deleted = state.db.delete_all_questions()?;
    log::warn!("{} deleted all {} questions", user.0.email, deleted);

    Ok(Json(json!({
        "message": "All questions and their progress have been deleted successfully",
        "deletedCount": deleted
    })))
}

async fn list_days(State(state): State<SharedState>) -> AppResult<impl IntoResponse> {
    Ok(Json(state.db.distinct_days()?))
}

async fn list_topics(State(state): State<SharedState>) -> AppResult<impl IntoResponse> {
    Ok(Json(distinct_topics(&state.db.list_questions()?)))
}

/// 去重排序后的非空标签
pub fn distinct_topics(questions: &[Question]) -> Vec<String> {
    questions
        .iter()
        .flat_map(|q| q.topics.iter())
        .filter(|t| !t.is_empty())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

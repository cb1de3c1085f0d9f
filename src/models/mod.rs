// 数据模型
// 用户、题目、做题进度以及对外返回的视图结构

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 难度
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Easy" => Ok(Difficulty::Easy),
            "Medium" => Ok(Difficulty::Medium),
            "Hard" => Ok(Difficulty::Hard),
            other => Err(format!("Invalid difficulty: {}", other)),
        }
    }
}

/// 用户角色
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Invalid role: {}", other)),
        }
    }
}

/// 管理员审核状态
///
/// `Pending` 只能由管理员迁移到其余三种状态之一，重复审核覆盖状态与时间。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Correct,
    Incorrect,
    NeedsOptimization,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Correct => "correct",
            ReviewStatus::Incorrect => "incorrect",
            ReviewStatus::NeedsOptimization => "needs_optimization",
        }
    }

    /// 审核接口可以设置的目标状态
    pub fn is_verdict(&self) -> bool {
        !matches!(self, ReviewStatus::Pending)
    }
}

impl FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "correct" => Ok(ReviewStatus::Correct),
            "incorrect" => Ok(ReviewStatus::Incorrect),
            "needs_optimization" => Ok(ReviewStatus::NeedsOptimization),
            other => Err(format!("Invalid review status: {}", other)),
        }
    }
}

// ==================== 用户 ====================

/// 用户
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub leetcode_username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 注册、登录时返回的用户信息
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub leetcode_username: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            leetcode_username: user.leetcode_username.clone(),
        }
    }
}

/// 新用户（密码已哈希）
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub leetcode_username: String,
}

/// 用户总做题数
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSolveTotal {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub leetcode_username: String,
    pub total_solved: u32,
}

/// 管理端用户下拉列表
#[derive(Debug, Clone, Serialize)]
pub struct UserListItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

// ==================== 题目 ====================

/// 题目
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub leetcode_slug: String,
    pub difficulty: Difficulty,
    pub topics: Vec<String>,
    pub day_plan: Option<i64>,
    pub leetcode_url: String,
    pub description: Option<String>,
    pub solution: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 校验后的新题目
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub title: String,
    pub leetcode_slug: String,
    pub difficulty: Difficulty,
    pub topics: Vec<String>,
    pub day_plan: Option<i64>,
    pub leetcode_url: String,
    pub description: Option<String>,
    pub solution: Option<String>,
}

/// 题目局部更新，`None` 表示保持不变
#[derive(Debug, Clone, Default)]
pub struct QuestionPatch {
    pub title: Option<String>,
    pub leetcode_slug: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub topics: Option<Vec<String>>,
    pub day_plan: Option<i64>,
    pub leetcode_url: Option<String>,
    pub description: Option<String>,
    pub solution: Option<String>,
}

impl QuestionPatch {
    pub fn apply(self, question: &mut Question) {
        if let Some(title) = self.title {
            question.title = title;
        }
        if let Some(slug) = self.leetcode_slug {
            question.leetcode_slug = slug;
        }
        if let Some(difficulty) = self.difficulty {
            question.difficulty = difficulty;
        }
        if let Some(topics) = self.topics {
            question.topics = topics;
        }
        if let Some(day_plan) = self.day_plan {
            question.day_plan = Some(day_plan);
        }
        if let Some(url) = self.leetcode_url {
            question.leetcode_url = url;
        }
        if let Some(description) = self.description {
            question.description = Some(description);
        }
        if let Some(solution) = self.solution {
            question.solution = Some(solution);
        }
    }
}

/// 进度记录中附带的题目摘要
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub topics: Vec<String>,
    pub day_plan: Option<i64>,
    pub leetcode_slug: String,
    pub leetcode_url: String,
}

impl From<&Question> for QuestionSummary {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            title: q.title.clone(),
            difficulty: q.difficulty,
            topics: q.topics.clone(),
            day_plan: q.day_plan,
            leetcode_slug: q.leetcode_slug.clone(),
            leetcode_url: q.leetcode_url.clone(),
        }
    }
}

// ==================== 进度 ====================

/// 用户在某道题上的进度，每个 (user, question) 只有一条
///
/// `Q` 默认为题目 id，查询详情时替换为 [`QuestionSummary`]。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress<Q = String> {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: String,
    pub question: Q,
    pub is_solved: bool,
    pub solution_url: String,
    pub notes: String,
    pub code: String,
    pub language: String,
    pub solved_at: Option<DateTime<Utc>>,
    pub review_status: ReviewStatus,
    pub review_feedback: String,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<Q> Progress<Q> {
    pub fn with_question<R>(self, question: R) -> Progress<R> {
        Progress {
            id: self.id,
            user: self.user,
            question,
            is_solved: self.is_solved,
            solution_url: self.solution_url,
            notes: self.notes,
            code: self.code,
            language: self.language,
            solved_at: self.solved_at,
            review_status: self.review_status,
            review_feedback: self.review_feedback,
            reviewed_at: self.reviewed_at,
            reviewed_by: self.reviewed_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            is_solved: self.is_solved,
            solution_url: self.solution_url.clone(),
            notes: self.notes.clone(),
            solved_at: self.solved_at,
        }
    }
}

/// 题目列表中合并的进度快照
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub is_solved: bool,
    pub solution_url: String,
    pub notes: String,
    pub solved_at: Option<DateTime<Utc>>,
}

/// 提交进度时的字段，`None` 表示保持原值（新建时取默认值）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub is_solved: Option<bool>,
    pub solution_url: Option<String>,
    pub notes: Option<String>,
    pub code: Option<String>,
    pub language: Option<String>,
}

/// 一条已解决记录，用于排行榜统计
#[derive(Debug, Clone, PartialEq)]
pub struct SolveRecord {
    pub user_id: String,
    pub solved_at: Option<DateTime<Utc>>,
}

/// 管理端看到的提交
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionView {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_name: String,
    pub question_title: String,
    pub topic: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub review_status: ReviewStatus,
    pub review_feedback: String,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub solution_url: String,
}

/// 推荐题目，附带推荐理由
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedQuestion {
    #[serde(flatten)]
    pub question: Question,
    pub reason: String,
}

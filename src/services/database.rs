// 数据库服务模块
// 提供 SQLite 数据库操作，支持用户、题库管理和做题进度追踪

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::{
    Difficulty, NewQuestion, NewUser, Progress, ProgressUpdate, Question, QuestionPatch,
    ReviewStatus, Role, SolveRecord, SubmissionView, User,
};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, leetcode_username, created_at, updated_at";

const QUESTION_COLUMNS: &str = "id, title, leetcode_slug, difficulty, topics, day_plan, \
     leetcode_url, description, solution, created_at, updated_at";

const PROGRESS_COLUMNS: &str = "id, user_id, question_id, is_solved, solution_url, notes, code, \
     language, solved_at, review_status, review_feedback, reviewed_at, reviewed_by, \
     created_at, updated_at";

/// 数据库服务
#[derive(Clone)]
pub struct DatabaseService {
    pool: Arc<Mutex<Connection>>,
}

impl DatabaseService {
    /// 打开（必要时创建）数据库文件
    pub fn open(db_path: &Path) -> Result<Self> {
        // 确保数据目录存在
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create data dir {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;

        let service = Self {
            pool: Arc::new(Mutex::new(conn)),
        };

        service.initialize()?;
        Ok(service)
    }

    /// 内存数据库，测试使用
    pub fn open_in_memory() -> Result<Self> {
        let service = Self {
            pool: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        };

        service.initialize()?;
        Ok(service)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.pool
            .lock()
            .map_err(|_| anyhow!("Database connection lock poisoned"))
    }

    /// 初始化数据库表结构
    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;

        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("SQLite journal_mode = {}", mode);
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user' CHECK(role IN ('user', 'admin')),
                leetcode_username TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS questions (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                leetcode_slug TEXT NOT NULL,
                difficulty TEXT NOT NULL CHECK(difficulty IN ('Easy', 'Medium', 'Hard')),
                topics TEXT NOT NULL DEFAULT '[]',
                day_plan INTEGER,
                leetcode_url TEXT NOT NULL,
                description TEXT,
                solution TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_questions_day_plan ON questions(day_plan);
            CREATE INDEX IF NOT EXISTS idx_questions_difficulty ON questions(difficulty);

            CREATE TABLE IF NOT EXISTS progress (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                question_id TEXT NOT NULL,
                is_solved INTEGER NOT NULL DEFAULT 0,
                solution_url TEXT NOT NULL DEFAULT '',
                notes TEXT NOT NULL DEFAULT '',
                code TEXT NOT NULL DEFAULT '',
                language TEXT NOT NULL DEFAULT 'javascript',
                solved_at TEXT,
                review_status TEXT NOT NULL DEFAULT 'pending'
                    CHECK(review_status IN ('pending', 'correct', 'incorrect', 'needs_optimization')),
                review_feedback TEXT NOT NULL DEFAULT '',
                reviewed_at TEXT,
                reviewed_by TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (user_id, question_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE,
                FOREIGN KEY (reviewed_by) REFERENCES users(id) ON DELETE SET NULL
            );

            CREATE INDEX IF NOT EXISTS idx_progress_user ON progress(user_id);
            CREATE INDEX IF NOT EXISTS idx_progress_question ON progress(question_id);
            CREATE INDEX IF NOT EXISTS idx_progress_solved ON progress(is_solved);
            ",
        )?;

        Ok(())
    }

    // ==================== 用户 ====================

    /// 创建用户
    pub fn create_user(&self, new_user: &NewUser) -> Result<User> {
        let conn = self.conn()?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: new_user.name.clone(),
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            role: new_user.role,
            leetcode_username: new_user.leetcode_username.clone(),
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO users (id, name, email, password_hash, role, leetcode_username, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user.id,
                user.name,
                user.email,
                user.password_hash,
                user.role,
                user.leetcode_username,
                user.created_at,
                user.updated_at,
            ],
        )?;

        Ok(user)
    }

    pub fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        self.find_user_where("id = ?1", id)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_user_where("email = ?1", email)
    }

    pub fn find_user_by_username(&self, leetcode_username: &str) -> Result<Option<User>> {
        self.find_user_where("leetcode_username = ?1", leetcode_username)
    }

    fn find_user_where(&self, clause: &str, value: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, clause);

        let user = conn
            .query_row(&sql, params![value], |row| Self::row_to_user(row))
            .optional()?;

        Ok(user)
    }

    /// 列出所有用户
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM users ORDER BY created_at", USER_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let users = stmt
            .query_map([], |row| Self::row_to_user(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(users)
    }

    /// 修改昵称和 LeetCode 用户名
    pub fn update_user_profile(
        &self,
        id: &str,
        name: Option<&str>,
        leetcode_username: Option<&str>,
    ) -> Result<Option<User>> {
        {
            let conn = self.conn()?;
            let changed = conn.execute(
                "UPDATE users SET
                    name = COALESCE(?1, name),
                    leetcode_username = COALESCE(?2, leetcode_username),
                    updated_at = ?3
                 WHERE id = ?4",
                params![name, leetcode_username, Utc::now(), id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
        }

        self.find_user_by_id(id)
    }

    pub fn update_password(&self, id: &str, password_hash: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
            params![password_hash, Utc::now(), id],
        )?;

        Ok(changed > 0)
    }

    // ==================== 题目 CRUD ====================

    /// 添加单道题目
    pub fn create_question(&self, new_question: &NewQuestion) -> Result<Question> {
        let conn = self.conn()?;
        let question = Self::build_question(new_question, Utc::now());
        Self::insert_question(&conn, &question)?;
        Ok(question)
    }

    /// 批量添加题目，单个事务内完成
    pub fn create_questions_batch(&self, questions: &[NewQuestion]) -> Result<Vec<Question>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let mut created = Vec::with_capacity(questions.len());
        for new_question in questions {
            let question = Self::build_question(new_question, now);
            Self::insert_question(&tx, &question)?;
            created.push(question);
        }

        tx.commit()?;
        Ok(created)
    }

    fn build_question(new_question: &NewQuestion, now: DateTime<Utc>) -> Question {
        Question {
            id: Uuid::new_v4().to_string(),
            title: new_question.title.clone(),
            leetcode_slug: new_question.leetcode_slug.clone(),
            difficulty: new_question.difficulty,
            topics: new_question.topics.clone(),
            day_plan: new_question.day_plan,
            leetcode_url: new_question.leetcode_url.clone(),
            description: new_question.description.clone(),
            solution: new_question.solution.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    fn insert_question(conn: &Connection, question: &Question) -> Result<()> {
        let topics = serde_json::to_string(&question.topics)?;

        conn.execute(
            "INSERT INTO questions
             (id, title, leetcode_slug, difficulty, topics, day_plan, leetcode_url,
              description, solution, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                question.id,
                question.title,
                question.leetcode_slug,
                question.difficulty,
                topics,
                question.day_plan,
                question.leetcode_url,
                question.description,
                question.solution,
                question.created_at,
                question.updated_at,
            ],
        )?;

        Ok(())
    }

    /// 获取单道题目
    pub fn get_question(&self, id: &str) -> Result<Option<Question>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM questions WHERE id = ?1", QUESTION_COLUMNS);

        let question = conn
            .query_row(&sql, params![id], |row| Self::row_to_question(row))
            .optional()?;

        Ok(question)
    }

    /// 按创建顺序列出全部题目
    pub fn list_questions(&self) -> Result<Vec<Question>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM questions ORDER BY created_at, rowid",
            QUESTION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let questions = stmt
            .query_map([], |row| Self::row_to_question(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(questions)
    }

    /// 更新题目，题目不存在时返回 `None`
    pub fn update_question(&self, id: &str, patch: QuestionPatch) -> Result<Option<Question>> {
        let Some(mut question) = self.get_question(id)? else {
            return Ok(None);
        };

        patch.apply(&mut question);
        question.updated_at = Utc::now();

        let conn = self.conn()?;
        conn.execute(
            "UPDATE questions SET
                title = ?1, leetcode_slug = ?2, difficulty = ?3, topics = ?4, day_plan = ?5,
                leetcode_url = ?6, description = ?7, solution = ?8, updated_at = ?9
             WHERE id = ?10",
            params![
                question.title,
                question.leetcode_slug,
                question.difficulty,
                serde_json::to_string(&question.topics)?,
                question.day_plan,
                question.leetcode_url,
                question.description,
                question.solution,
                question.updated_at,
                question.id,
            ],
        )?;

        Ok(Some(question))
    }

    /// 删除题目，相关进度随外键级联删除
    pub fn delete_question(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM questions WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// 清空题库及全部进度，返回删除的题目数
    pub fn delete_all_questions(&self) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let progress_deleted = tx.execute("DELETE FROM progress", [])?;
        let questions_deleted = tx.execute("DELETE FROM questions", [])?;

        tx.commit()?;
        log::info!(
            "Deleted {} questions and {} progress records",
            questions_deleted,
            progress_deleted
        );

        Ok(questions_deleted)
    }

    /// 所有已排期的天数（排除未排期和 -1）
    pub fn distinct_days(&self) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT day_plan FROM questions
             WHERE day_plan IS NOT NULL AND day_plan != -1
             ORDER BY day_plan",
        )?;

        let days = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;

        Ok(days)
    }

    // ==================== 用户进度 ====================

    /// 新建或更新 (user, question) 的进度
    ///
    /// 依赖 `UNIQUE (user_id, question_id)` 做冲突判断，未提供的字段保留原值。
    /// `is_solved == Some(true)` 时刷新 `solved_at`，标记为未解决时不清空。
    pub fn upsert_progress(
        &self,
        user_id: &str,
        question_id: &str,
        update: &ProgressUpdate,
    ) -> Result<Progress> {
        let now = Utc::now();
        let solved_at = match update.is_solved {
            Some(true) => Some(now),
            _ => None,
        };

        {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO progress
                 (id, user_id, question_id, is_solved, solution_url, notes, code, language,
                  solved_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, COALESCE(?4, 0), COALESCE(?5, ''), COALESCE(?6, ''),
                         COALESCE(?7, ''), COALESCE(?8, 'javascript'), ?9, ?10, ?10)
                 ON CONFLICT(user_id, question_id) DO UPDATE SET
                    is_solved = COALESCE(?4, is_solved),
                    solution_url = COALESCE(?5, solution_url),
                    notes = COALESCE(?6, notes),
                    code = COALESCE(?7, code),
                    language = COALESCE(?8, language),
                    solved_at = COALESCE(?9, solved_at),
                    updated_at = ?10",
                params![
                    Uuid::new_v4().to_string(),
                    user_id,
                    question_id,
                    update.is_solved,
                    update.solution_url,
                    update.notes,
                    update.code,
                    update.language,
                    solved_at,
                    now,
                ],
            )?;
        }

        self.get_progress(user_id, question_id)?
            .ok_or_else(|| anyhow!("Progress row missing after upsert"))
    }

    /// 获取用户在某道题上的进度
    pub fn get_progress(&self, user_id: &str, question_id: &str) -> Result<Option<Progress>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM progress WHERE user_id = ?1 AND question_id = ?2",
            PROGRESS_COLUMNS
        );

        let progress = conn
            .query_row(&sql, params![user_id, question_id], |row| {
                Self::row_to_progress(row)
            })
            .optional()?;

        Ok(progress)
    }

    pub fn get_progress_by_id(&self, id: &str) -> Result<Option<Progress>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM progress WHERE id = ?1", PROGRESS_COLUMNS);

        let progress = conn
            .query_row(&sql, params![id], |row| Self::row_to_progress(row))
            .optional()?;

        Ok(progress)
    }

    /// 用户的全部进度记录
    pub fn list_progress_for_user(&self, user_id: &str) -> Result<Vec<Progress>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM progress WHERE user_id = ?1 ORDER BY updated_at DESC",
            PROGRESS_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map(params![user_id], |row| Self::row_to_progress(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// 用户已解决的题目 id
    pub fn solved_question_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT question_id FROM progress WHERE user_id = ?1 AND is_solved = 1",
        )?;

        let ids = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(ids)
    }

    /// 所有已解决记录，排行榜统计使用
    pub fn solve_records(&self) -> Result<Vec<SolveRecord>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT user_id, solved_at FROM progress WHERE is_solved = 1")?;

        let records = stmt
            .query_map([], |row| {
                Ok(SolveRecord {
                    user_id: row.get(0)?,
                    solved_at: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    /// 每个用户的已解决题数
    pub fn solved_counts_by_user(&self) -> Result<HashMap<String, u32>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, COUNT(*) FROM progress WHERE is_solved = 1 GROUP BY user_id",
        )?;

        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)))?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;

        Ok(counts)
    }

    // ==================== 提交审核 ====================

    /// 全部提交，最新的在前
    pub fn list_submissions(&self) -> Result<Vec<SubmissionView>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT p.id, u.name, q.title, q.topics, p.created_at, p.review_status,
                    p.review_feedback, p.reviewed_at, p.solution_url
             FROM progress p
             JOIN users u ON u.id = p.user_id
             JOIN questions q ON q.id = p.question_id
             ORDER BY p.created_at DESC, p.rowid DESC",
        )?;

        let submissions = stmt
            .query_map([], |row| Self::row_to_submission(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(submissions)
    }

    pub fn get_submission(&self, id: &str) -> Result<Option<SubmissionView>> {
        let conn = self.conn()?;

        let submission = conn
            .query_row(
                "SELECT p.id, u.name, q.title, q.topics, p.created_at, p.review_status,
                        p.review_feedback, p.reviewed_at, p.solution_url
                 FROM progress p
                 JOIN users u ON u.id = p.user_id
                 JOIN questions q ON q.id = p.question_id
                 WHERE p.id = ?1",
                params![id],
                |row| Self::row_to_submission(row),
            )
            .optional()?;

        Ok(submission)
    }

    /// 写入审核结果，记录不存在时返回 false
    pub fn review_progress(
        &self,
        id: &str,
        status: ReviewStatus,
        feedback: &str,
        reviewer_id: &str,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let now = Utc::now();

        let changed = conn.execute(
            "UPDATE progress SET
                review_status = ?1, review_feedback = ?2, reviewed_at = ?3,
                reviewed_by = ?4, updated_at = ?3
             WHERE id = ?5",
            params![status, feedback, now, reviewer_id, id],
        )?;

        Ok(changed > 0)
    }

    // ==================== 辅助方法 ====================

    fn row_to_user(row: &Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            role: row.get(4)?,
            leetcode_username: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn row_to_question(row: &Row) -> rusqlite::Result<Question> {
        Ok(Question {
            id: row.get(0)?,
            title: row.get(1)?,
            leetcode_slug: row.get(2)?,
            difficulty: row.get(3)?,
            topics: topics_column(row, 4)?,
            day_plan: row.get(5)?,
            leetcode_url: row.get(6)?,
            description: row.get(7)?,
            solution: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn row_to_progress(row: &Row) -> rusqlite::Result<Progress> {
        Ok(Progress {
            id: row.get(0)?,
            user: row.get(1)?,
            question: row.get(2)?,
            is_solved: row.get(3)?,
            solution_url: row.get(4)?,
            notes: row.get(5)?,
            code: row.get(6)?,
            language: row.get(7)?,
            solved_at: row.get(8)?,
            review_status: row.get(9)?,
            review_feedback: row.get(10)?,
            reviewed_at: row.get(11)?,
            reviewed_by: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }

    fn row_to_submission(row: &Row) -> rusqlite::Result<SubmissionView> {
        let topics = topics_column(row, 3)?;

        Ok(SubmissionView {
            id: row.get(0)?,
            user_name: row.get(1)?,
            question_title: row.get(2)?,
            topic: topics.into_iter().next(),
            submitted_at: row.get(4)?,
            review_status: row.get(5)?,
            review_feedback: row.get(6)?,
            reviewed_at: row.get(7)?,
            solution_url: row.get(8)?,
        })
    }
}

/// 唯一约束冲突时返回冲突的列，例如 `users.email`
pub fn unique_violation(err: &anyhow::Error) -> Option<&str> {
    match err.downcast_ref::<rusqlite::Error>()? {
        rusqlite::Error::SqliteFailure(e, Some(msg)) if e.code == ErrorCode::ConstraintViolation => {
            msg.strip_prefix("UNIQUE constraint failed: ")
        }
        _ => None,
    }
}

/// topics 列以 JSON 数组存储
fn topics_column(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn enum_from_sql<T>(value: ValueRef<'_>) -> FromSqlResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .as_str()?
        .parse::<T>()
        .map_err(|e| FromSqlError::Other(e.into()))
}

impl ToSql for Difficulty {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Difficulty {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        enum_from_sql(value)
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        enum_from_sql(value)
    }
}

impl ToSql for ReviewStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ReviewStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        enum_from_sql(value)
    }
}

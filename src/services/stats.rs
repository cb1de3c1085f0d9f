//! 统计聚合
//! 完成度与难度/标签统计、题目列表的进度合并、排行榜排名和兜底推荐
//!
//! 这里全部是纯函数，输入为已经查询出来的题目和进度，便于单元测试。

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{
    Difficulty, Progress, ProgressSnapshot, Question, RecommendedQuestion, SolveRecord, User,
    UserSolveTotal,
};

/// 未排期的天数标记
pub const UNSCHEDULED_DAY: i64 = -1;

/// 兜底推荐的数量
pub const FALLBACK_LIMIT: usize = 3;

/// 单个分类（难度、标签、天）的完成情况
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryTally {
    pub total: u32,
    pub solved: u32,
}

impl CategoryTally {
    /// 分类内没有题目时返回 `None`
    pub fn percentage(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.solved as f64 / self.total as f64 * 100.0)
        }
    }
}

/// 计数与百分比，`percentages` 中不含题目数为 0 的分类
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryStats {
    pub counts: BTreeMap<String, u32>,
    pub percentages: BTreeMap<String, f64>,
}

impl CategoryStats {
    fn from_tallies(tallies: &BTreeMap<String, CategoryTally>, keep_zero_counts: bool) -> Self {
        let mut stats = CategoryStats::default();

        for (name, tally) in tallies {
            if keep_zero_counts || tally.solved > 0 {
                stats.counts.insert(name.clone(), tally.solved);
            }
            if let Some(pct) = tally.percentage() {
                stats.percentages.insert(name.clone(), pct);
            }
        }

        stats
    }
}

/// 用户整体统计
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_questions: usize,
    pub total_solved: usize,
    pub completion_percentage: f64,
    pub difficulty_stats: CategoryStats,
    pub topic_stats: CategoryStats,
}

/// 计算用户整体统计
///
/// 已解决记录与题目做连接后一次遍历计数，分类总数单独按题库分组统计。
/// 已删除题目的记录不计入。
pub fn compute_user_stats(questions: &[Question], solved_question_ids: &[String]) -> UserStats {
    let solved: HashSet<&str> = solved_question_ids.iter().map(String::as_str).collect();

    let mut difficulty: BTreeMap<String, CategoryTally> = Difficulty::ALL
        .iter()
        .map(|d| (d.as_str().to_string(), CategoryTally::default()))
        .collect();
    let mut topics: BTreeMap<String, CategoryTally> = BTreeMap::new();

    // 分类总数
    for question in questions {
        if let Some(tally) = difficulty.get_mut(question.difficulty.as_str()) {
            tally.total += 1;
        }
        for topic in &question.topics {
            topics.entry(topic.clone()).or_default().total += 1;
        }
    }

    // 已解决计数
    let mut total_solved = 0;
    for question in questions.iter().filter(|q| solved.contains(q.id.as_str())) {
        total_solved += 1;
        if let Some(tally) = difficulty.get_mut(question.difficulty.as_str()) {
            tally.solved += 1;
        }
        for topic in &question.topics {
            topics.entry(topic.clone()).or_default().solved += 1;
        }
    }

    let total_questions = questions.len();
    let completion_percentage = if total_questions == 0 {
        0.0
    } else {
        total_solved as f64 / total_questions as f64 * 100.0
    };

    UserStats {
        total_questions,
        total_solved,
        completion_percentage,
        difficulty_stats: CategoryStats::from_tallies(&difficulty, true),
        topic_stats: CategoryStats::from_tallies(&topics, false),
    }
}

/// 每个标签的完成情况
pub fn topic_progress(questions: &[Question], solved: &HashSet<&str>) -> BTreeMap<String, CategoryTally> {
    let mut result: BTreeMap<String, CategoryTally> = BTreeMap::new();

    for question in questions {
        let is_solved = solved.contains(question.id.as_str());
        for topic in &question.topics {
            let tally = result.entry(topic.clone()).or_default();
            tally.total += 1;
            if is_solved {
                tally.solved += 1;
            }
        }
    }

    result
}

/// 每一天的完成情况，未设置天数的题目跳过
pub fn daily_progress(questions: &[Question], solved: &HashSet<&str>) -> BTreeMap<i64, CategoryTally> {
    let mut result: BTreeMap<i64, CategoryTally> = BTreeMap::new();

    for question in questions {
        let Some(day) = question.day_plan else {
            continue;
        };
        let tally = result.entry(day).or_default();
        tally.total += 1;
        if solved.contains(question.id.as_str()) {
            tally.solved += 1;
        }
    }

    result
}

/// 满足条件的题目中有多少已解决
pub fn tally_where<F>(questions: &[Question], solved: &HashSet<&str>, predicate: F) -> CategoryTally
where
    F: Fn(&Question) -> bool,
{
    questions
        .iter()
        .filter(|q| predicate(q))
        .fold(CategoryTally::default(), |mut tally, q| {
            tally.total += 1;
            if solved.contains(q.id.as_str()) {
                tally.solved += 1;
            }
            tally
        })
}

// ==================== 进度合并 ====================

/// 题目 + 当前用户的进度快照
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionWithProgress {
    #[serde(flatten)]
    pub question: Question,
    pub user_progress: ProgressSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Solved,
    Unsolved,
}

impl StatusFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "solved" => Some(StatusFilter::Solved),
            "unsolved" => Some(StatusFilter::Unsolved),
            _ => None,
        }
    }
}

/// 给每道题附上用户进度（没有记录时使用未解决的默认值），再按状态过滤
pub fn merge_progress(
    questions: Vec<Question>,
    progress: &[Progress],
    status: Option<StatusFilter>,
) -> Vec<QuestionWithProgress> {
    let by_question: HashMap<&str, &Progress> =
        progress.iter().map(|p| (p.question.as_str(), p)).collect();

    questions
        .into_iter()
        .map(|question| {
            let user_progress = by_question
                .get(question.id.as_str())
                .map(|p| p.snapshot())
                .unwrap_or_default();
            QuestionWithProgress {
                question,
                user_progress,
            }
        })
        .filter(|item| match status {
            Some(StatusFilter::Solved) => item.user_progress.is_solved,
            Some(StatusFilter::Unsolved) => !item.user_progress.is_solved,
            None => true,
        })
        .collect()
}

// ==================== 排行榜 ====================

/// 排行榜时间窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardWindow {
    Daily,
    Weekly,
    AllTime,
}

impl LeaderboardWindow {
    /// 窗口起点：昨天 0 点、七天前 0 点（UTC），全部时间没有起点
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = match self {
            LeaderboardWindow::Daily => 1,
            LeaderboardWindow::Weekly => 7,
            LeaderboardWindow::AllTime => return None,
        };

        let midnight = (now - Duration::days(days)).date_naive().and_time(NaiveTime::MIN);
        Some(Utc.from_utc_datetime(&midnight))
    }

    pub fn default_limit(&self) -> usize {
        match self {
            LeaderboardWindow::Daily | LeaderboardWindow::Weekly => 5,
            LeaderboardWindow::AllTime => 10,
        }
    }
}

/// 排名结果，用户信息稍后补全
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSolver {
    pub user_id: String,
    pub solved_count: u32,
    pub last_solved_at: Option<DateTime<Utc>>,
}

/// 按窗口内解决数降序、最近解决时间降序排名
///
/// 有起点时没有 `solved_at` 的记录不计入；窗口内没有记录的用户不会出现。
pub fn rank_leaderboard(
    records: &[SolveRecord],
    since: Option<DateTime<Utc>>,
    limit: usize,
) -> Vec<RankedSolver> {
    let mut by_user: HashMap<&str, RankedSolver> = HashMap::new();

    for record in records {
        if let Some(since) = since {
            match record.solved_at {
                Some(at) if at >= since => {}
                _ => continue,
            }
        }

        let entry = by_user
            .entry(record.user_id.as_str())
            .or_insert_with(|| RankedSolver {
                user_id: record.user_id.clone(),
                solved_count: 0,
                last_solved_at: None,
            });
        entry.solved_count += 1;
        entry.last_solved_at = entry.last_solved_at.max(record.solved_at);
    }

    let mut ranked: Vec<RankedSolver> = by_user.into_values().collect();
    ranked.sort_by(|a, b| {
        b.solved_count
            .cmp(&a.solved_count)
            .then_with(|| b.last_solved_at.cmp(&a.last_solved_at))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    ranked.truncate(limit);
    ranked
}

/// 按总解决数排序的用户列表，包含解决数为 0 的用户
pub fn top_users_by_solved(
    users: &[User],
    counts: &HashMap<String, u32>,
    limit: usize,
    include_id: bool,
) -> Vec<UserSolveTotal> {
    let mut totals: Vec<UserSolveTotal> = users
        .iter()
        .map(|user| UserSolveTotal {
            id: include_id.then(|| user.id.clone()),
            name: user.name.clone(),
            leetcode_username: user.leetcode_username.clone(),
            total_solved: counts.get(&user.id).copied().unwrap_or(0),
        })
        .collect();

    // 稳定排序，同分保持注册顺序
    totals.sort_by(|a, b| b.total_solved.cmp(&a.total_solved));
    totals.truncate(limit);
    totals
}

// ==================== 兜底推荐 ====================

/// 在未解决题目中取最小的天数，返回该天最多三道题
///
/// 排除天数为 -1 的题目；全部解决或没有有效天数时返回空。
pub fn fallback_recommendations(
    questions: &[Question],
    solved: &HashSet<&str>,
) -> Vec<RecommendedQuestion> {
    let unsolved: Vec<&Question> = questions
        .iter()
        .filter(|q| q.day_plan != Some(UNSCHEDULED_DAY))
        .filter(|q| !solved.contains(q.id.as_str()))
        .collect();

    let Some(lowest_day) = unsolved.iter().filter_map(|q| q.day_plan).min() else {
        log::debug!("No scheduled unsolved questions for fallback recommendations");
        return Vec::new();
    };

    unsolved
        .into_iter()
        .filter(|q| q.day_plan == Some(lowest_day))
        .take(FALLBACK_LIMIT)
        .map(|q| RecommendedQuestion {
            question: q.clone(),
            reason: format!(
                "Recommended from Day {} - Build your foundation with these fundamental problems",
                lowest_day
            ),
        })
        .collect()
}

// 服务模块
// 提供核心业务逻辑服务

pub mod auth;
pub mod database;
pub mod gemini;
pub mod stats;

pub use auth::{
    hash_password_async, is_valid_email, verify_password_async, Claims, TokenService,
};
pub use database::DatabaseService;
pub use gemini::{GeminiClient, GeminiConfig};
pub use stats::{
    compute_user_stats, fallback_recommendations, merge_progress, rank_leaderboard,
    top_users_by_solved, LeaderboardWindow, StatusFilter, UserStats,
};

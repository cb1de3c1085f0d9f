// 配置
// 从环境变量读取，可选的 .env 文件由 main 在此之前加载

use anyhow::{bail, Result};
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::services::GeminiConfig;
use crate::utils::default_database_path;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub jwt_secret: String,
    pub jwt_expires_days: i64,
    pub gemini: GeminiConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None => bail!("JWT_SECRET must be set"),
        };

        let defaults = GeminiConfig::default();
        let gemini = GeminiConfig {
            api_key: var("GEMINI_API_KEY"),
            model: var("GEMINI_MODEL").unwrap_or(defaults.model),
            base_url: var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            timeout: Duration::from_secs(try_load("GEMINI_TIMEOUT_SECS", 30)),
            ..defaults
        };
        if gemini.api_key.is_none() {
            log::warn!("GEMINI_API_KEY not set, recommendations use the day plan only");
        }

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: try_load("PORT", 5000),
            database_path: var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_database_path),
            jwt_secret,
            jwt_expires_days: try_load("JWT_EXPIRES_DAYS", 7),
            gemini,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 空字符串按未设置处理
fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        None => {
            log::info!("{key} not set, using default: {default}");
            default
        }
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            log::warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
        }),
    }
}

// 共享状态

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::services::{DatabaseService, GeminiClient, TokenService};

pub struct AppState {
    pub config: Config,
    pub db: DatabaseService,
    pub tokens: TokenService,
    pub gemini: GeminiClient,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: Config, db: DatabaseService) -> Result<SharedState> {
        let tokens = TokenService::new(&config.jwt_secret, config.jwt_expires_days);
        let gemini = GeminiClient::new(config.gemini.clone())?;

        Ok(Arc::new(Self {
            config,
            db,
            tokens,
            gemini,
        }))
    }
}

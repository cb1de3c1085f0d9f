//! 认证服务
//! 密码哈希、JWT 签发与校验、邮箱格式校验

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tokio::task::spawn_blocking;

use crate::models::Role;

/// bcrypt 成本因子
pub const PASSWORD_COST: u32 = 10;

/// 密码最短长度
pub const MIN_PASSWORD_LEN: usize = 6;

pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, PASSWORD_COST).context("Failed to hash password")
}

/// 哈希格式损坏时视为不匹配
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match bcrypt::verify(password, password_hash) {
        Ok(valid) => valid,
        Err(e) => {
            log::warn!("Password hash could not be verified: {}", e);
            false
        }
    }
}

/// bcrypt 计算量较大，放到阻塞线程池执行
pub async fn hash_password_async(password: String) -> Result<String> {
    spawn_blocking(move || hash_password(&password))
        .await
        .context("Password hashing task failed")?
}

pub async fn verify_password_async(password: String, password_hash: String) -> Result<bool> {
    spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .context("Password verification task failed")
}

pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();

    EMAIL
        .get_or_init(|| Regex::new(r"^\w+([\.-]?\w+)*@\w+([\.-]?\w+)*(\.\w{2,3})+$").ok())
        .as_ref()
        .map(|re| re.is_match(email))
        .unwrap_or(false)
}

/// JWT 载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    pub role: Role,
    pub exp: usize,
}

/// 令牌服务，签发和校验 HS256 令牌
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(ttl_days),
        }
    }

    /// 签发令牌
    pub fn issue(&self, user_id: &str, role: Role) -> Result<String> {
        let exp = (Utc::now() + self.ttl).timestamp().max(0) as usize;
        let claims = Claims {
            user_id: user_id.to_string(),
            role,
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("Failed to sign token")
    }

    /// 校验签名与过期时间
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .context("Invalid token")?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify() {
        let hash = bcrypt::hash("secret1", 4).unwrap();
        assert!(verify_password("secret1", &hash));
        assert!(!verify_password("secret2", &hash));
        assert!(!verify_password("secret1", "not-a-bcrypt-hash"));
    }

    #[tokio::test]
    async fn test_password_helpers_off_runtime() {
        let hash = hash_password_async("secret1".to_string()).await.unwrap();
        assert!(verify_password_async("secret1".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password_async("other".to_string(), hash).await.unwrap());
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("first.last@mail.example.org"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("alice@example.technology"));
    }

    #[test]
    fn test_token_round_trip() {
        let tokens = TokenService::new("test-secret", 7);
        let token = tokens.issue("user-1", Role::Admin).unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn test_token_rejected_with_other_secret() {
        let token = TokenService::new("secret-a", 7).issue("u", Role::User).unwrap();
        assert!(TokenService::new("secret-b", 7).verify(&token).is_err());
        assert!(TokenService::new("secret-a", 7).verify("garbage").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = TokenService::new("secret", -1);
        let token = tokens.issue("u", Role::User).unwrap();
        assert!(tokens.verify(&token).is_err());
    }
}

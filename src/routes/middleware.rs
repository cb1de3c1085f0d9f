// 中间件
// 令牌校验、管理员校验和请求日志

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
    Extension,
};
use std::time::Instant;

use crate::error::{AppError, AppResult};
use crate::models::{Role, User};
use crate::state::SharedState;

/// 通过认证的当前用户，作为请求扩展传给处理函数
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn is_admin(&self) -> bool {
        self.0.role == Role::Admin
    }
}

/// 管理员专用的处理函数在路由内部调用
pub fn ensure_admin(user: &CurrentUser) -> AppResult<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not authorized as an admin".to_string()))
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn require_auth(
    State(state): State<SharedState>,
    mut req: Request,
    next: Next,
) -> AppResult<Response> {
    let token = bearer_token(&req).ok_or_else(|| AppError::unauthorized("Not authorized, no token"))?;

    let claims = state.tokens.verify(token).map_err(|e| {
        log::debug!("Token rejected: {:#}", e);
        AppError::unauthorized("Not authorized, token failed")
    })?;

    let user = state
        .db
        .find_user_by_id(&claims.user_id)?
        .ok_or_else(|| AppError::unauthorized("Not authorized, user not found"))?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

pub async fn require_admin(
    Extension(user): Extension<CurrentUser>,
    req: Request,
    next: Next,
) -> AppResult<Response> {
    ensure_admin(&user)?;
    Ok(next.run(req).await)
}

pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    log::info!(
        "{} {} {} {}ms",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

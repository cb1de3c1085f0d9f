// HTTP 路由
// 公开路由、需要登录的路由、管理员路由三组，合并后统一挂请求日志

mod admin;
mod auth;
mod leaderboard;
mod middleware;
mod progress;
mod questions;
mod recommendation;
mod users;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::database::unique_violation;
use crate::state::SharedState;

pub use middleware::{ensure_admin, CurrentUser};
use middleware::{log_requests, require_admin, require_auth};
use questions::distinct_topics;

pub fn build_router(state: SharedState) -> Router {
    let public = Router::new()
        .merge(auth::public_routes())
        .merge(users::public_routes());

    let protected = Router::new()
        .merge(auth::protected_routes())
        .merge(users::protected_routes())
        .merge(questions::routes())
        .merge(progress::routes())
        .merge(leaderboard::routes())
        .merge(recommendation::routes())
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    // 后加的层先执行：先认证，再校验角色
    let admin = admin::routes()
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
        .nest("/api/admin", admin)
        .layer(from_fn(log_requests))
        .with_state(state)
}

/// 去掉首尾空白，空字符串视为未提供
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 用户表唯一约束冲突转为 400，其余仍是内部错误
pub(crate) fn user_conflict(err: anyhow::Error) -> AppError {
    let message = match unique_violation(&err) {
        Some(column) if column.ends_with(".email") => Some("Email already registered"),
        Some(column) if column.ends_with(".leetcode_username") => {
            Some("LeetCode username already registered")
        }
        _ => None,
    };

    match message {
        Some(message) => AppError::bad_request(message),
        None => AppError::Internal(err),
    }
}

/// 实体 id 必须是 UUID
pub(crate) fn parse_id<'a>(raw: &'a str, message: &str) -> AppResult<&'a str> {
    Uuid::parse_str(raw)
        .map(|_| raw)
        .map_err(|_| AppError::bad_request(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{Difficulty, Role};
    use crate::services::database::tests::{add_question, add_user};
    use crate::services::{DatabaseService, GeminiConfig};
    use crate::state::AppState;
    use axum::{
        body::Body,
        http::{
            header::{AUTHORIZATION, CONTENT_TYPE},
            Method, Request, StatusCode,
        },
    };
    use serde_json::{json, Value};
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn test_state() -> SharedState {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_path: PathBuf::new(),
            jwt_secret: "test-secret".to_string(),
            jwt_expires_days: 7,
            gemini: GeminiConfig::default(),
        };
        AppState::new(config, DatabaseService::open_in_memory().unwrap()).unwrap()
    }

    fn token_for(state: &SharedState, name: &str, role: Role) -> (String, String) {
        let user = add_user(&state.db, name, role);
        let token = state.tokens.issue(&user.id, user.role).unwrap();
        (user.id, token)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_register_login_me() {
        let app = build_router(test_state());
        let body = json!({
            "name": "Alice",
            "email": " Alice@Example.com ",
            "password": "secret1",
            "leetcodeUsername": "alice_lc"
        });

        let (status, registered) =
            send(&app, Method::POST, "/api/auth/register", None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(registered["user"]["email"], "alice@example.com");
        assert_eq!(registered["user"]["role"], "user");

        let (status, dup) = send(&app, Method::POST, "/api/auth/register", None, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(dup["message"], "Email already registered");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "wrong!" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, login) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(login["success"], true);
        let token = login["data"]["token"].as_str().unwrap().to_string();

        let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["leetcodeUsername"], "alice_lc");
        assert!(me.get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn test_register_validation() {
        let app = build_router(test_state());

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Bob", "email": "bob@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().starts_with("Please provide"));

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Bob", "email": "bob@example.com",
                "password": "123", "leetcodeUsername": "bob"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_auth_required() {
        let app = build_router(test_state());

        let (status, body) = send(&app, Method::GET, "/api/questions", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Not authorized, no token");

        let (status, body) = send(&app, Method::GET, "/api/questions", Some("bogus"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Not authorized, token failed");

        let (status, _) = send(&app, Method::GET, "/api/users/leaderboard", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_only_routes() {
        let state = test_state();
        let (_, user_token) = token_for(&state, "Carol", Role::User);
        let (_, admin_token) = token_for(&state, "Root", Role::Admin);
        let app = build_router(state);

        let question = json!({
            "title": "Two Sum",
            "leetcodeSlug": "two-sum",
            "difficulty": "Easy",
            "topics": ["Array", "Hash Table"],
            "dayPlan": 1,
            "leetcodeUrl": "https://leetcode.com/problems/two-sum/",
            "description": "Find **two** numbers"
        });

        let (status, _) =
            send(&app, Method::POST, "/api/questions", Some(&user_token), Some(question.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, Method::GET, "/api/admin/users", Some(&user_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, created) =
            send(&app, Method::POST, "/api/questions", Some(&admin_token), Some(question)).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["_id"].as_str().unwrap().to_string();

        let (status, detail) =
            send(&app, Method::GET, &format!("/api/questions/{}", id), Some(&user_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["userProgress"], Value::Null);
        assert!(detail["descriptionHtml"].as_str().unwrap().contains("<strong>two</strong>"));

        let (status, _) =
            send(&app, Method::GET, "/api/questions/not-a-uuid", Some(&user_token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, users) = send(&app, Method::GET, "/api/admin/users", Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(users.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_progress_flow_and_stats() {
        let state = test_state();
        let (_, token) = token_for(&state, "Dave", Role::User);
        let e1 = add_question(&state.db, "E1", Difficulty::Easy, &["Array"], Some(1));
        add_question(&state.db, "E2", Difficulty::Easy, &["Array"], Some(1));
        add_question(&state.db, "M1", Difficulty::Medium, &["Graph"], Some(2));
        let app = build_router(state.clone());

        let uri = format!("/api/progress/{}", e1.id);
        let (status, first) = send(
            &app,
            Method::POST,
            &uri,
            Some(&token),
            Some(json!({ "isSolved": true, "notes": "hash map" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(first["solvedAt"].is_string());
        assert_eq!(first["language"], "javascript");

        let (status, second) = send(
            &app,
            Method::POST,
            &uri,
            Some(&token),
            Some(json!({ "solutionUrl": "https://example.com/s" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["_id"], first["_id"]);
        assert_eq!(second["notes"], "hash map");

        let (_, records) = send(&app, Method::GET, "/api/progress/user", Some(&token), None).await;
        assert_eq!(records.as_array().unwrap().len(), 1);
        assert_eq!(records[0]["question"]["title"], "E1");

        let (_, overall) =
            send(&app, Method::GET, "/api/progress/user/overall", Some(&token), None).await;
        assert_eq!(overall["totalQuestions"], 3);
        assert_eq!(overall["totalSolved"], 1);
        assert_eq!(overall["difficultyStats"]["counts"]["Easy"], 1);
        assert_eq!(overall["difficultyStats"]["percentages"]["Easy"], 50.0);
        assert!(overall["difficultyStats"]["percentages"].get("Hard").is_none());

        let (_, day) = send(&app, Method::GET, "/api/progress/user/daily/1", Some(&token), None).await;
        assert_eq!(day, json!({ "day": 1, "total": 2, "solved": 1 }));

        let (status, _) =
            send(&app, Method::GET, "/api/progress/user/daily/one", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, daily) = send(&app, Method::GET, "/api/progress/user/daily", Some(&token), None).await;
        assert_eq!(daily["2"], json!({ "total": 1, "solved": 0 }));

        let (_, unsolved) = send(
            &app,
            Method::GET,
            "/api/questions?status=unsolved&difficulty=Easy",
            Some(&token),
            None,
        )
        .await;
        let unsolved = unsolved.as_array().unwrap();
        assert_eq!(unsolved.len(), 1);
        assert_eq!(unsolved[0]["title"], "E2");
        assert_eq!(unsolved[0]["userProgress"]["isSolved"], false);

        let missing = format!("/api/progress/{}", Uuid::new_v4());
        let (status, _) =
            send(&app, Method::POST, &missing, Some(&token), Some(json!({ "isSolved": true }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let state = test_state();
        let (_, token) = token_for(&state, "Erin", Role::User);
        let q = add_question(&state.db, "Q", Difficulty::Hard, &[], Some(1));
        let app = build_router(state);

        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/progress/{}", q.id))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_leaderboard_and_recommendation_fallback() {
        let state = test_state();
        let (frank_id, frank) = token_for(&state, "Frank", Role::User);
        let (_, grace) = token_for(&state, "Grace", Role::User);
        let d1 = add_question(&state.db, "D1", Difficulty::Easy, &[], Some(1));
        add_question(&state.db, "D2a", Difficulty::Easy, &[], Some(2));
        add_question(&state.db, "D2b", Difficulty::Medium, &[], Some(2));
        add_question(&state.db, "Unplanned", Difficulty::Easy, &[], Some(-1));
        let app = build_router(state);

        send(
            &app,
            Method::POST,
            &format!("/api/progress/{}", d1.id),
            Some(&frank),
            Some(json!({ "isSolved": true })),
        )
        .await;

        let (status, board) =
            send(&app, Method::GET, "/api/leaderboard/daily", Some(&grace), None).await;
        assert_eq!(status, StatusCode::OK);
        let board = board.as_array().unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0]["_id"], frank_id.as_str());
        assert_eq!(board[0]["solvedCount"], 1);

        let (status, _) =
            send(&app, Method::GET, "/api/leaderboard/weekly?limit=0", Some(&grace), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, picks) =
            send(&app, Method::GET, "/api/recommendation", Some(&frank), None).await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<&str> = picks
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["D2a", "D2b"]);
        assert!(picks[0]["reason"].as_str().unwrap().contains("Day 2"));
    }

    #[tokio::test]
    async fn test_review_submission() {
        let state = test_state();
        let (_, user_token) = token_for(&state, "Heidi", Role::User);
        let (admin_id, admin_token) = token_for(&state, "Ivan", Role::Admin);
        let q = add_question(&state.db, "Review Me", Difficulty::Medium, &["Tree"], Some(3));
        let app = build_router(state.clone());

        let (_, progress) = send(
            &app,
            Method::POST,
            &format!("/api/progress/{}", q.id),
            Some(&user_token),
            Some(json!({ "isSolved": true, "solutionUrl": "https://example.com/x" })),
        )
        .await;
        let id = progress["_id"].as_str().unwrap().to_string();
        let uri = format!("/api/admin/submissions/{}/review", id);

        let (status, body) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&admin_token),
            Some(json!({ "reviewStatus": "pending" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid review status");

        let (status, reviewed) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&admin_token),
            Some(json!({ "reviewStatus": "needs_optimization", "reviewFeedback": "use a set" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reviewed["reviewStatus"], "needs_optimization");
        assert_eq!(reviewed["topic"], "Tree");
        assert!(reviewed["reviewedAt"].is_string());

        let stored = state.db.get_progress_by_id(&id).unwrap().unwrap();
        assert_eq!(stored.reviewed_by.as_deref(), Some(admin_id.as_str()));

        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/admin/submissions/missing/review",
            Some(&admin_token),
            Some(json!({ "reviewStatus": "correct" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, list) = send(&app, Method::GET, "/api/admin/submissions", Some(&admin_token), None).await;
        assert_eq!(list[0]["userName"], "Heidi");
    }

    async fn register(app: &Router, name: &str, email: &str, password: &str, handle: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": name, "email": email, "password": password, "leetcodeUsername": handle
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["token"].as_str().unwrap().to_string()
    }

    async fn login(app: &Router, email: &str, password: &str) -> StatusCode {
        send(
            app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
        .0
    }

    #[tokio::test]
    async fn test_profile_update() {
        let state = test_state();
        add_user(&state.db, "Bob", Role::User);
        let app = build_router(state);
        let token = register(&app, "Judy", "judy@example.com", "secret1", "judy_lc").await;

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/users/profile",
            Some(&token),
            Some(json!({ "leetcodeUsername": "lc_bob" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "LeetCode username already registered");

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/users/profile",
            Some(&token),
            Some(json!({ "name": "Judy B", "leetcodeUsername": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Judy B");
        assert_eq!(body["leetcodeUsername"], "judy_lc");

        let (_, profile) = send(&app, Method::GET, "/api/users/profile", Some(&token), None).await;
        assert_eq!(profile["name"], "Judy B");
    }

    #[tokio::test]
    async fn test_change_password() {
        let app = build_router(test_state());
        let token = register(&app, "Kim", "kim@example.com", "secret1", "kim_lc").await;
        let uri = "/api/users/change-password";

        let (status, body) = send(
            &app,
            Method::PUT,
            uri,
            Some(&token),
            Some(json!({ "currentPassword": "wrong1", "newPassword": "newpass1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Current password is incorrect");

        let (status, _) = send(
            &app,
            Method::PUT,
            uri,
            Some(&token),
            Some(json!({ "currentPassword": "secret1", "newPassword": "123" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            Method::PUT,
            uri,
            Some(&token),
            Some(json!({ "currentPassword": "secret1", "newPassword": "newpass1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Password updated successfully");

        assert_eq!(login(&app, "kim@example.com", "newpass1").await, StatusCode::OK);
        assert_eq!(
            login(&app, "kim@example.com", "secret1").await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_user_conflict_maps_unique_columns() {
        let state = test_state();
        let existing = add_user(&state.db, "Leo", Role::User);
        let duplicate = state
            .db
            .create_user(&crate::models::NewUser {
                name: "Leo".into(),
                email: existing.email.clone(),
                password_hash: "x".into(),
                role: Role::User,
                leetcode_username: "fresh".into(),
            })
            .unwrap_err();

        match user_conflict(duplicate) {
            AppError::BadRequest(message) => assert_eq!(message, "Email already registered"),
            other => panic!("unexpected error: {:?}", other),
        }

        let other = add_user(&state.db, "Mia", Role::User);
        let taken = state
            .db
            .update_user_profile(&other.id, None, Some(&existing.leetcode_username))
            .unwrap_err();
        match user_conflict(taken) {
            AppError::BadRequest(message) => {
                assert_eq!(message, "LeetCode username already registered")
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert!(matches!(
            user_conflict(anyhow::anyhow!("disk full")),
            AppError::Internal(_)
        ));
    }

    fn import_item(title: &str, day_plan: Value) -> Value {
        let slug = title.to_lowercase().replace(' ', "-");
        json!({
            "title": title,
            "leetcodeSlug": slug,
            "difficulty": "Easy",
            "topics": ["Array"],
            "dayPlan": day_plan,
            "leetcodeUrl": format!("https://leetcode.com/problems/{}/", slug)
        })
    }

    #[tokio::test]
    async fn test_import_questions() {
        let state = test_state();
        let (_, user_token) = token_for(&state, "Nina", Role::User);
        let (_, admin_token) = token_for(&state, "Oscar", Role::Admin);
        let app = build_router(state);

        let wrapped = json!({
            "questions": [import_item("Two Sum", json!(1)), import_item("3Sum", json!("2"))]
        });

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/questions/import",
            Some(&user_token),
            Some(wrapped.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/questions/import",
            Some(&admin_token),
            Some(wrapped),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["importedCount"], 1);
        assert_eq!(body["errors"].as_array().unwrap().len(), 1);
        assert_eq!(body["errors"][0]["index"], 1);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/questions/import",
            Some(&admin_token),
            Some(json!([import_item("Valid Anagram", json!(2))])),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["importedCount"], 1);
        assert!(body["errors"].as_array().unwrap().is_empty());

        let (_, list) = send(&app, Method::GET, "/api/questions", Some(&user_token), None).await;
        let titles: Vec<&str> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|q| q["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Two Sum", "Valid Anagram"]);
    }

    #[tokio::test]
    async fn test_bulk_delete_questions() {
        let state = test_state();
        let (_, user_token) = token_for(&state, "Pat", Role::User);
        let (_, admin_token) = token_for(&state, "Quinn", Role::Admin);
        add_question(&state.db, "A", Difficulty::Easy, &[], Some(1));
        add_question(&state.db, "B", Difficulty::Hard, &[], Some(2));
        let app = build_router(state);

        let (status, _) = send(&app, Method::DELETE, "/api/questions", Some(&user_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) =
            send(&app, Method::DELETE, "/api/questions", Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deletedCount"], 2);

        let (_, list) = send(&app, Method::GET, "/api/questions", Some(&user_token), None).await;
        assert!(list.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admin_user_stats() {
        let state = test_state();
        let (user_id, _) = token_for(&state, "Rita", Role::User);
        let (_, admin_token) = token_for(&state, "Sam", Role::Admin);
        add_question(&state.db, "A", Difficulty::Easy, &["Array"], Some(1));
        let app = build_router(state);

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/admin/users/{}/stats", Uuid::new_v4()),
            Some(&admin_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found");

        let (status, stats) = send(
            &app,
            Method::GET,
            &format!("/api/admin/users/{}/stats", user_id),
            Some(&admin_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["totalQuestions"], 1);
        assert_eq!(stats["totalSolved"], 0);
    }

    #[tokio::test]
    async fn test_question_partial_update() {
        let state = test_state();
        let (_, admin_token) = token_for(&state, "Tess", Role::Admin);
        let q = add_question(&state.db, "Two Sum", Difficulty::Easy, &["Array"], Some(1));
        let app = build_router(state);
        let uri = format!("/api/questions/{}", q.id);

        let (status, updated) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&admin_token),
            Some(json!({
                "title": "",
                "leetcodeUrl": "",
                "difficulty": "Hard",
                "topics": ["Graph"],
                "dayPlan": 4
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "Two Sum");
        assert_eq!(updated["leetcodeUrl"], q.leetcode_url.as_str());
        assert_eq!(updated["difficulty"], "Hard");
        assert_eq!(updated["topics"], json!(["Graph"]));
        assert_eq!(updated["dayPlan"], 4);

        let (_, cleared) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&admin_token),
            Some(json!({ "topics": [] })),
        )
        .await;
        assert_eq!(cleared["topics"], json!([]));
        assert_eq!(cleared["difficulty"], "Hard");

        let (status, _) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&admin_token),
            Some(json!({ "difficulty": "Trivial" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::PUT,
            &format!("/api/questions/{}", Uuid::new_v4()),
            Some(&admin_token),
            Some(json!({ "title": "Ghost" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

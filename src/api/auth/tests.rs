use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::types::UserRole;
use crate::repositories;
use crate::test_support;

fn registration(username: &str, role: &str) -> serde_json::Value {
    json!({
        "username": username,
        "password": "secret123",
        "first_name": "Ann",
        "last_name": "Lee",
        "email": format!("{username}@example.edu"),
        "role": role,
    })
}

#[tokio::test]
async fn register_login_and_logout() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(registration("ann", "student")),
        ))
        .await
        .expect("register");
    let status = response.status();
    let registered = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {registered}");
    assert_eq!(registered["message"], "User registered successfully");
    assert_eq!(registered["user"]["role"], "student");
    assert!(registered["user"].get("hashed_password").is_none());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(registration("ann", "student")),
        ))
        .await
        .expect("duplicate register");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(registration("root", "admin")),
        ))
        .await
        .expect("register admin");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"username": "ann", "password": "wrong-pass"})),
        ))
        .await
        .expect("bad login");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid credentials");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"username": "ann", "password": "secret123"})),
        ))
        .await
        .expect("login");
    let status = response.status();
    let login = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {login}");
    assert_eq!(login["message"], "Login successful");
    assert_eq!(login["token_type"], "bearer");
    assert_eq!(login["user_id"], registered["user"]["id"]);
    assert!(login["user"]["last_login"].is_string());
    let token = login["access_token"].as_str().expect("access token").to_string();

    let stored = repositories::users::find_by_username(ctx.state.db(), "ann")
        .await
        .expect("load user")
        .expect("user exists");
    assert!(stored.last_login.is_some());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/me", Some(&token), None))
        .await
        .expect("me");
    let status = response.status();
    let me = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "ann");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/logout",
            Some(&token),
            None,
        ))
        .await
        .expect("logout");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/me", Some(&token), None))
        .await
        .expect("me after logout");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deactivated_account_cannot_log_in() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let admin =
        test_support::insert_user(ctx.state.db(), "admin01", UserRole::Admin, "admin-pass").await;
    let student =
        test_support::insert_user(ctx.state.db(), "stud01", UserRole::Student, "stud-pass").await;
    let admin_token = test_support::bearer_token(&admin, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/users/{}", student.id),
            Some(&admin_token),
            None,
        ))
        .await
        .expect("deactivate");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"username": "stud01", "password": "stud-pass"})),
        ))
        .await
        .expect("login deactivated");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn null_field_is_reported_as_missing() {
    let (app, _guard) = test_support::lazy_app().await;

    let mut body = registration("ann", "student");
    body["username"] = serde_json::Value::Null;
    let response = app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(body),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = test_support::read_json(response).await;
    assert_eq!(json["detail"], "Missing required fields");
}

#[tokio::test]
async fn malformed_json_uses_error_body() {
    let (app, _guard) = test_support::lazy_app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"username": 42"#))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = test_support::read_json(response).await;
    assert_eq!(json["status"], 400);
    assert!(json["detail"].is_string());
}

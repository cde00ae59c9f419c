use crate::db::types::UserRole;
use crate::test_support;
use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn admin_can_create_update_and_deactivate_user() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let admin =
        test_support::insert_user(ctx.state.db(), "root", UserRole::Admin, "admin-pass").await;
    let token = test_support::bearer_token(&admin, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/users",
            Some(&token),
            Some(json!({
                "username": "prof_ada",
                "password": "prof-pass-1",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "email": "ada@example.edu",
                "role": "professor"
            })),
        ))
        .await
        .expect("create user");

    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["role"], "professor");
    assert_eq!(created["active"], true);
    let user_id = created["id"].as_i64().expect("user id");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/users/{user_id}"),
            Some(&token),
            Some(json!({"first_name": "Augusta", "email": "augusta@example.edu"})),
        ))
        .await
        .expect("update user");
    let status = response.status();
    let updated = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {updated}");
    assert_eq!(updated["first_name"], "Augusta");
    assert_eq!(updated["email"], "augusta@example.edu");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/users/{user_id}"),
            Some(&token),
            None,
        ))
        .await
        .expect("deactivate user");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/users?active=false",
            Some(&token),
            None,
        ))
        .await
        .expect("list users");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed["total_count"], 1);
    assert_eq!(listed["items"][0]["id"], user_id);
}

#[tokio::test]
async fn duplicate_email_is_conflict() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let admin =
        test_support::insert_user(ctx.state.db(), "root", UserRole::Admin, "admin-pass").await;
    test_support::insert_user(ctx.state.db(), "taken", UserRole::Student, "student-pass").await;
    let token = test_support::bearer_token(&admin, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/users",
            Some(&token),
            Some(json!({
                "username": "someone_else",
                "password": "student-pass",
                "first_name": "Some",
                "last_name": "One",
                "email": "taken@example.edu",
                "role": "student"
            })),
        ))
        .await
        .expect("create user");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn admin_cannot_deactivate_self() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let admin =
        test_support::insert_user(ctx.state.db(), "root", UserRole::Admin, "admin-pass").await;
    let token = test_support::bearer_token(&admin, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/users/{}", admin.id),
            Some(&token),
            None,
        ))
        .await
        .expect("deactivate self");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_admin_cannot_list_users() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let professor =
        test_support::insert_user(ctx.state.db(), "prof", UserRole::Professor, "prof-pass").await;
    let token = test_support::bearer_token(&professor, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/users", Some(&token), None))
        .await
        .expect("list users");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

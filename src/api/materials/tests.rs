use axum::http::{Method, StatusCode};
use tower::ServiceExt;

use crate::db::types::UserRole;
use crate::repositories;
use crate::test_support;

#[tokio::test]
async fn materials_are_shared_with_enrolled_students() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let professor =
        test_support::insert_user(ctx.state.db(), "prof01", UserRole::Professor, "prof-pass")
            .await;
    let student =
        test_support::insert_user(ctx.state.db(), "stud01", UserRole::Student, "stud-pass").await;
    let outsider =
        test_support::insert_user(ctx.state.db(), "stud02", UserRole::Student, "stud-pass").await;
    let course = test_support::insert_course(ctx.state.db(), "CS330", Some(professor.id)).await;
    test_support::enroll(ctx.state.db(), student.id, course.id).await;
    let prof_token = test_support::bearer_token(&professor, ctx.state.settings());
    let student_token = test_support::bearer_token(&student, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            Method::POST,
            &format!("/api/v1/courses/{}/materials", course.id),
            Some(&prof_token),
            &[("description", "Week 1 slides")],
            Some(("week 1.pdf", b"%PDF-1.7 slides")),
        ))
        .await
        .expect("upload material");
    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["original_filename"], "week1.pdf");
    assert_eq!(created["description"], "Week 1 slides");
    let material_id = created["id"].as_i64().expect("material id");

    let unread = repositories::notifications::count_unread(ctx.state.db(), student.id)
        .await
        .expect("count notifications");
    assert_eq!(unread, 1);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/materials/{material_id}/file"),
            Some(&student_token),
            None,
        ))
        .await
        .expect("download material");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(test_support::read_bytes(response).await, b"%PDF-1.7 slides");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/courses/{}/materials", course.id),
            Some(&test_support::bearer_token(&outsider, ctx.state.settings())),
            None,
        ))
        .await
        .expect("outsider lists materials");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/materials/{material_id}"),
            Some(&student_token),
            None,
        ))
        .await
        .expect("student deletes material");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/materials/{material_id}"),
            Some(&prof_token),
            None,
        ))
        .await
        .expect("delete material");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let remaining = repositories::materials::list_for_course(ctx.state.db(), course.id)
        .await
        .expect("list materials");
    assert!(remaining.is_empty());
}

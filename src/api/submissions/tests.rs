use axum::http::{Method, StatusCode};
use serde_json::json;
use time::Duration;
use tower::ServiceExt;

use crate::db::types::UserRole;
use crate::repositories;
use crate::test_support;

#[tokio::test]
async fn submit_replace_grade_and_lock() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let professor =
        test_support::insert_user(ctx.state.db(), "prof01", UserRole::Professor, "prof-pass")
            .await;
    let student =
        test_support::insert_user(ctx.state.db(), "stud01", UserRole::Student, "stud-pass").await;
    let course = test_support::insert_course(ctx.state.db(), "CS320", Some(professor.id)).await;
    test_support::enroll(ctx.state.db(), student.id, course.id).await;
    let assignment = test_support::insert_assignment(
        ctx.state.db(),
        course.id,
        professor.id,
        Duration::days(2),
    )
    .await;

    let student_token = test_support::bearer_token(&student, ctx.state.settings());
    let prof_token = test_support::bearer_token(&professor, ctx.state.settings());
    let upload_uri = format!("/api/v1/assignments/{}/submissions", assignment.id);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            Method::POST,
            &upload_uri,
            Some(&student_token),
            &[],
            Some(("list.py", b"print('v1')")),
        ))
        .await
        .expect("first upload");
    let status = response.status();
    let first = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {first}");
    assert_eq!(first["original_filename"], "list.py");
    assert_eq!(first["file_size"], 11);
    let submission_id = first["id"].as_i64().expect("submission id");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            Method::POST,
            &upload_uri,
            Some(&student_token),
            &[],
            Some(("list.py", b"print('v2')!")),
        ))
        .await
        .expect("second upload");
    let status = response.status();
    let second = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {second}");
    assert_eq!(second["id"], submission_id);
    assert_eq!(second["file_size"], 12);
    assert_ne!(second["file_hash"], first["file_hash"]);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &upload_uri,
            Some(&prof_token),
            None,
        ))
        .await
        .expect("list submissions");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["student_username"], "stud01");

    let grade_uri = format!("/api/v1/submissions/{submission_id}/grade");
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &grade_uri,
            Some(&prof_token),
            Some(json!({"grade": 140, "feedback": "?"})),
        ))
        .await
        .expect("grade out of range");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &grade_uri,
            Some(&student_token),
            Some(json!({"grade": 100})),
        ))
        .await
        .expect("student grades self");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &grade_uri,
            Some(&prof_token),
            Some(json!({"grade": 92.5, "feedback": "Clean implementation"})),
        ))
        .await
        .expect("grade");
    let status = response.status();
    let graded = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {graded}");
    assert_eq!(graded["grade"], 92.5);
    assert_eq!(graded["feedback"], "Clean implementation");
    assert!(graded["graded_date"].is_string());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            Method::POST,
            &upload_uri,
            Some(&student_token),
            &[],
            Some(("list.py", b"print('v3')")),
        ))
        .await
        .expect("upload after grading");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/submissions/{submission_id}/file"),
            Some(&student_token),
            None,
        ))
        .await
        .expect("download own submission");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(test_support::read_bytes(response).await, b"print('v2')!");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/submissions/mine",
            Some(&student_token),
            None,
        ))
        .await
        .expect("my submissions");
    let mine = test_support::read_json(response).await;
    assert_eq!(mine[0]["course_code"], "CS320");
    assert_eq!(mine[0]["grade"], 92.5);

    let unread = repositories::notifications::count_unread(ctx.state.db(), student.id)
        .await
        .expect("count notifications");
    // One for the new assignment, one for the grade.
    assert_eq!(unread, 2);
}

#[tokio::test]
async fn late_or_unenrolled_uploads_are_rejected() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let professor =
        test_support::insert_user(ctx.state.db(), "prof01", UserRole::Professor, "prof-pass")
            .await;
    let enrolled =
        test_support::insert_user(ctx.state.db(), "stud01", UserRole::Student, "stud-pass").await;
    let outsider =
        test_support::insert_user(ctx.state.db(), "stud02", UserRole::Student, "stud-pass").await;
    let course = test_support::insert_course(ctx.state.db(), "CS321", Some(professor.id)).await;
    test_support::enroll(ctx.state.db(), enrolled.id, course.id).await;

    let past_due = test_support::insert_assignment(
        ctx.state.db(),
        course.id,
        professor.id,
        -Duration::hours(1),
    )
    .await;
    let open = test_support::insert_assignment(
        ctx.state.db(),
        course.id,
        professor.id,
        Duration::days(1),
    )
    .await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            Method::POST,
            &format!("/api/v1/assignments/{}/submissions", past_due.id),
            Some(&test_support::bearer_token(&enrolled, ctx.state.settings())),
            &[],
            Some(("late.txt", b"late work")),
        ))
        .await
        .expect("late upload");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .oneshot(test_support::multipart_request(
            Method::POST,
            &format!("/api/v1/assignments/{}/submissions", open.id),
            Some(&test_support::bearer_token(&outsider, ctx.state.settings())),
            &[],
            Some(("work.txt", b"not enrolled")),
        ))
        .await
        .expect("unenrolled upload");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let rows = repositories::submissions::list_for_assignment(ctx.state.db(), open.id, None)
        .await
        .expect("list submissions");
    assert!(rows.is_empty());
}

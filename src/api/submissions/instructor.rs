use axum::{extract::State, response::Response};
use validator::Validate;

use super::helpers::{ensure_can_view, load_context};
use crate::api::assignments::load_assignment;
use crate::api::errors::ApiError;
use crate::api::extract::{Json, Path};
use crate::api::guards::{is_course_instructor, load_course, require_course_access, CurrentUser};
use crate::api::uploads::file_response;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::submission::{GradeRequest, SubmissionDetailResponse, SubmissionResponse};

/// Course staff see every submission; an enrolled student sees only their own.
pub(super) async fn list_for_assignment(
    Path(assignment_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubmissionDetailResponse>>, ApiError> {
    let assignment = load_assignment(&state, assignment_id).await?;
    let course = require_course_access(&state, &user, assignment.course_id).await?;

    let student_filter = if is_course_instructor(&user, &course) { None } else { Some(user.id) };
    let rows =
        repositories::submissions::list_for_assignment(state.db(), assignment.id, student_filter)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    Ok(Json(rows.into_iter().map(SubmissionDetailResponse::from_db).collect()))
}

pub(super) async fn get_submission(
    Path(submission_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SubmissionDetailResponse>, ApiError> {
    let context = load_context(&state, submission_id).await?;
    ensure_can_view(&user, &context)?;

    let view = repositories::submissions::find_view(state.db(), context.submission.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    Ok(Json(SubmissionDetailResponse::from_db(view)))
}

pub(super) async fn download_submission(
    Path(submission_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let context = load_context(&state, submission_id).await?;
    ensure_can_view(&user, &context)?;

    let bytes = state
        .storage()
        .get(&context.submission.submission_path)
        .await
        .map_err(|e| ApiError::from_storage_read(e, "Failed to read submission file"))?;

    Ok(file_response(bytes, &context.submission.original_filename))
}

pub(super) async fn grade_submission(
    Path(submission_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<GradeRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let submission = repositories::submissions::find_by_id(state.db(), submission_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;
    let assignment = load_assignment(&state, submission.assignment_id).await?;
    let course = load_course(&state, assignment.course_id).await?;
    if !is_course_instructor(&user, &course) {
        return Err(ApiError::Forbidden("Only the course instructor can grade submissions"));
    }

    let feedback = payload.feedback.as_deref().map(str::trim).filter(|text| !text.is_empty());
    let graded = repositories::submissions::grade(
        state.db(),
        submission.id,
        payload.grade,
        feedback,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to grade submission"))?
    .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    tracing::info!(
        user_id = user.id,
        submission_id = graded.id,
        student_id = graded.student_id,
        assignment_id = assignment.id,
        grade = payload.grade,
        regrade = submission.is_graded(),
        action = "submission_grade",
        "Submission graded"
    );

    Ok(Json(SubmissionResponse::from_db(graded)))
}

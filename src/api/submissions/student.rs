use std::slice;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
};

use crate::api::assignments::load_assignment;
use crate::api::errors::ApiError;
use crate::api::extract::{Json, Path};
use crate::api::guards::CurrentStudent;
use crate::api::uploads::{read_multipart, store_upload};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::AssignmentStatus;
use crate::repositories;
use crate::repositories::submissions::{StoreOutcome, StoreSubmission};
use crate::schemas::submission::{StudentSubmissionResponse, SubmissionResponse};

pub(super) async fn upload_submission(
    Path(assignment_id): Path<i64>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    let assignment = load_assignment(&state, assignment_id).await?;

    let enrolled =
        repositories::enrollments::is_active_student(state.db(), student.id, assignment.course_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check enrollment"))?;
    if !enrolled {
        return Err(ApiError::Forbidden("Not enrolled in this course"));
    }
    if assignment.status != AssignmentStatus::Active {
        return Err(ApiError::BadRequest(
            "Assignment is not accepting submissions".to_string(),
        ));
    }
    let now = primitive_now_utc();
    if now > assignment.due_date {
        return Err(ApiError::BadRequest("The due date for this assignment has passed".to_string()));
    }

    let file = read_multipart(&state, multipart)
        .await?
        .file
        .ok_or_else(|| ApiError::BadRequest("file is required".to_string()))?;
    let (stored, original_filename) =
        store_upload(&state, "submissions", student.id, file).await?;

    let outcome = repositories::submissions::store(
        state.db(),
        StoreSubmission {
            assignment_id: assignment.id,
            student_id: student.id,
            submission_path: &stored.key,
            original_filename: &original_filename,
            file_size: i64::try_from(stored.size).unwrap_or(i64::MAX),
            file_hash: &stored.sha256,
            submitted_at: now,
        },
    )
    .await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => {
            state.storage().delete_all(slice::from_ref(&stored.key)).await;
            return Err(ApiError::internal(err, "Failed to record submission"));
        }
    };

    match outcome {
        StoreOutcome::Created(submission) => {
            tracing::info!(
                student_id = student.id,
                assignment_id = assignment.id,
                submission_id = submission.id,
                size = stored.size,
                "Submission received"
            );
            Ok((StatusCode::CREATED, Json(SubmissionResponse::from_db(submission))))
        }
        StoreOutcome::Replaced { submission, previous_path } => {
            if previous_path != stored.key {
                state.storage().delete_all(&[previous_path]).await;
            }
            tracing::info!(
                student_id = student.id,
                assignment_id = assignment.id,
                submission_id = submission.id,
                size = stored.size,
                "Submission replaced"
            );
            Ok((StatusCode::OK, Json(SubmissionResponse::from_db(submission))))
        }
        StoreOutcome::AlreadyGraded => {
            state.storage().delete_all(slice::from_ref(&stored.key)).await;
            Err(ApiError::Conflict(
                "This submission has already been graded and cannot be replaced".to_string(),
            ))
        }
        StoreOutcome::Concurrent => {
            state.storage().delete_all(slice::from_ref(&stored.key)).await;
            Err(ApiError::Conflict("Another upload for this assignment is in progress".to_string()))
        }
    }
}

pub(super) async fn my_submissions(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentSubmissionResponse>>, ApiError> {
    let rows = repositories::submissions::list_for_student(state.db(), student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    Ok(Json(rows.into_iter().map(StudentSubmissionResponse::from_db).collect()))
}

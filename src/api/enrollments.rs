use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Router,
};

use crate::api::errors::ApiError;
use crate::api::extract::{Json, Path, Query};
use crate::api::guards::{load_course, require_course_instructor, CurrentStudent, CurrentUser};
use crate::api::pagination::{normalize, PaginatedResponse};
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::{RequestStatus, UserRole};
use crate::repositories;
use crate::repositories::enrollment_requests::{
    CancelOutcome, CreateOutcome, DecisionOutcome, RequestFilter,
};
use crate::schemas::enrollment::{
    EnrollmentRequestResponse, EnrollmentRequestView, RequestListQuery,
};

/// Routes mounted under `/courses`.
pub(crate) fn course_routes() -> Router<AppState> {
    Router::new().route("/:course_id/enrollment-requests", post(request_enrollment))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_requests))
        .route("/:request_id", delete(cancel_request))
        .route("/:request_id/approve", post(approve_request))
        .route("/:request_id/reject", post(reject_request))
}

async fn request_enrollment(
    Path(course_id): Path<i64>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<EnrollmentRequestResponse>), ApiError> {
    let course = load_course(&state, course_id).await?;

    let outcome = repositories::enrollment_requests::create(
        state.db(),
        student.id,
        course.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| {
        if crate::db::is_foreign_key_violation(&e) {
            ApiError::NotFound("Course not found".to_string())
        } else {
            ApiError::internal(e, "Failed to create enrollment request")
        }
    })?;

    match outcome {
        CreateOutcome::Created(request) => {
            tracing::info!(
                student_id = student.id,
                course_id = course.id,
                request_id = request.id,
                "Enrollment requested"
            );
            Ok((StatusCode::CREATED, Json(EnrollmentRequestResponse::from_db(request))))
        }
        CreateOutcome::AlreadyEnrolled => {
            Err(ApiError::Conflict("Already enrolled in this course".to_string()))
        }
        CreateOutcome::AlreadyPending => Err(ApiError::Conflict(
            "An enrollment request for this course is already pending".to_string(),
        )),
    }
}

async fn list_requests(
    Query(params): Query<RequestListQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<EnrollmentRequestView>>, ApiError> {
    let (skip, limit) = normalize(params.skip, params.limit);
    let mut filter = RequestFilter {
        status: params.status,
        course_id: params.course_id,
        ..RequestFilter::default()
    };
    match user.role {
        UserRole::Admin => {}
        UserRole::Professor => filter.instructor_id = Some(user.id),
        UserRole::Student => filter.student_id = Some(user.id),
    }

    let (rows, total_count) =
        repositories::enrollment_requests::list(state.db(), &filter, skip, limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list enrollment requests"))?;

    Ok(Json(PaginatedResponse {
        items: rows.into_iter().map(EnrollmentRequestView::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn approve_request(
    Path(request_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<EnrollmentRequestResponse>, ApiError> {
    decide(&state, &user, request_id, RequestStatus::Approved).await
}

async fn reject_request(
    Path(request_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<EnrollmentRequestResponse>, ApiError> {
    decide(&state, &user, request_id, RequestStatus::Rejected).await
}

async fn decide(
    state: &AppState,
    user: &User,
    request_id: i64,
    decision: RequestStatus,
) -> Result<Json<EnrollmentRequestResponse>, ApiError> {
    let request = repositories::enrollment_requests::find_by_id(state.db(), request_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch enrollment request"))?
        .ok_or_else(|| ApiError::NotFound("Enrollment request not found".to_string()))?;

    require_course_instructor(state, user, request.course_id).await?;

    let outcome = repositories::enrollment_requests::decide(
        state.db(),
        request.id,
        decision,
        user.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to process enrollment request"))?;

    match outcome {
        DecisionOutcome::Decided(request) => {
            metrics::record_enrollment_decision(decision.as_str());
            tracing::info!(
                user_id = user.id,
                request_id = request.id,
                student_id = request.student_id,
                course_id = request.course_id,
                decision = %decision,
                action = "enrollment_decision",
                "Enrollment request processed"
            );
            Ok(Json(EnrollmentRequestResponse::from_db(request)))
        }
        DecisionOutcome::AlreadyProcessed(status) => {
            tracing::debug!(request_id, current = %status, "Enrollment request already processed");
            Err(ApiError::Conflict("Request has already been processed".to_string()))
        }
        DecisionOutcome::NotFound => {
            Err(ApiError::NotFound("Enrollment request not found".to_string()))
        }
    }
}

async fn cancel_request(
    Path(request_id): Path<i64>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let outcome = repositories::enrollment_requests::cancel(
        state.db(),
        request_id,
        student.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to cancel enrollment request"))?;

    match outcome {
        CancelOutcome::Cancelled => Ok(StatusCode::NO_CONTENT),
        CancelOutcome::NotFound => {
            Err(ApiError::NotFound("Enrollment request not found".to_string()))
        }
        CancelOutcome::NotPending(status) => Err(ApiError::Conflict(format!(
            "Only pending requests can be cancelled (current status: {status})"
        ))),
    }
}

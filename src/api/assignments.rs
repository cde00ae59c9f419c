use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::extract::{Json, Path};
use crate::api::guards::{require_course_access, require_course_instructor, CurrentUser};
use crate::api::uploads::{file_response, read_multipart, store_upload};
use crate::core::state::AppState;
use crate::core::time::{parse_datetime_flexible, primitive_now_utc};
use crate::db::models::Assignment;
use crate::db::types::AssignmentStatus;
use crate::repositories;
use crate::repositories::assignments::{CreateAssignment, UpdateAssignment};
use crate::schemas::assignment::{AssignmentResponse, AssignmentUpdate};

const MAX_TITLE_LEN: usize = 255;

/// Routes mounted under `/courses`.
pub(crate) fn course_routes() -> Router<AppState> {
    Router::new().route(
        "/:course_id/assignments",
        get(list_course_assignments).post(create_assignment),
    )
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/:assignment_id",
            get(get_assignment).patch(update_assignment).delete(delete_assignment),
        )
        .route("/:assignment_id/file", get(download_attachment).put(replace_attachment))
}

pub(crate) async fn load_assignment(
    state: &AppState,
    assignment_id: i64,
) -> Result<Assignment, ApiError> {
    repositories::assignments::find_by_id(state.db(), assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch assignment"))?
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))
}

async fn list_course_assignments(
    Path(course_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AssignmentResponse>>, ApiError> {
    let course = require_course_access(&state, &user, course_id).await?;

    let assignments = repositories::assignments::list_for_course(state.db(), course.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list assignments"))?;

    Ok(Json(assignments.into_iter().map(AssignmentResponse::from_db).collect()))
}

async fn create_assignment(
    Path(course_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<AssignmentResponse>), ApiError> {
    let course = require_course_instructor(&state, &user, course_id).await?;
    let mut form = read_multipart(&state, multipart).await?;

    let title = form
        .text("title")
        .ok_or_else(|| ApiError::BadRequest("title is required".to_string()))?
        .to_string();
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::BadRequest("title must be 1-255 characters".to_string()));
    }
    let description = form.text("description").map(str::to_string);
    let due_date = form
        .text("due_date")
        .ok_or_else(|| ApiError::BadRequest("due_date is required".to_string()))
        .and_then(|raw| {
            parse_datetime_flexible(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("Invalid due_date: {raw}")))
        })?;
    let status = match form.text("status") {
        Some(raw) => raw
            .parse::<AssignmentStatus>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
        None => AssignmentStatus::Active,
    };

    let attachment = match form.file.take() {
        Some(file) => Some(store_upload(&state, "assignments", course.id, file).await?),
        None => None,
    };

    let notice = format!("New assignment in {}: {}", course.code, title);
    let now = primitive_now_utc();
    let created = repositories::assignments::create(
        state.db(),
        CreateAssignment {
            course_id: course.id,
            title: &title,
            description: description.as_deref(),
            due_date,
            file_path: attachment.as_ref().map(|(stored, _)| stored.key.as_str()),
            original_filename: attachment.as_ref().map(|(_, name)| name.as_str()),
            created_by: user.id,
            created_at: now,
            status,
        },
        &notice,
    )
    .await;

    let assignment = match created {
        Ok(assignment) => assignment,
        Err(err) => {
            if let Some((stored, _)) = &attachment {
                state.storage().delete_all(std::slice::from_ref(&stored.key)).await;
            }
            return Err(ApiError::internal(err, "Failed to create assignment"));
        }
    };

    tracing::info!(
        user_id = user.id,
        course_id = course.id,
        assignment_id = assignment.id,
        has_file = assignment.file_path.is_some(),
        "Assignment created"
    );

    Ok((StatusCode::CREATED, Json(AssignmentResponse::from_db(assignment))))
}

async fn get_assignment(
    Path(assignment_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let assignment = load_assignment(&state, assignment_id).await?;
    require_course_access(&state, &user, assignment.course_id).await?;
    Ok(Json(AssignmentResponse::from_db(assignment)))
}

async fn update_assignment(
    Path(assignment_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AssignmentUpdate>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let assignment = load_assignment(&state, assignment_id).await?;
    require_course_instructor(&state, &user, assignment.course_id).await?;

    repositories::assignments::update(
        state.db(),
        assignment.id,
        UpdateAssignment {
            title: payload.title.map(|title| title.trim().to_string()),
            description: payload.description,
            due_date: payload.due_date,
            status: payload.status,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update assignment"))?;

    let updated = repositories::assignments::fetch_one_by_id(state.db(), assignment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch assignment"))?;
    Ok(Json(AssignmentResponse::from_db(updated)))
}

async fn delete_assignment(
    Path(assignment_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let assignment = load_assignment(&state, assignment_id).await?;
    require_course_instructor(&state, &user, assignment.course_id).await?;

    let keys = repositories::assignments::delete_cascade(state.db(), assignment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete assignment"))?
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))?;

    state.storage().delete_all(&keys).await;

    tracing::info!(
        user_id = user.id,
        assignment_id = assignment.id,
        course_id = assignment.course_id,
        removed_files = keys.len(),
        action = "assignment_delete",
        "Assignment deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn download_attachment(
    Path(assignment_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let assignment = load_assignment(&state, assignment_id).await?;
    require_course_access(&state, &user, assignment.course_id).await?;

    let Some(key) = assignment.file_path.as_deref() else {
        return Err(ApiError::NotFound("Assignment has no attached file".to_string()));
    };
    let bytes = state
        .storage()
        .get(key)
        .await
        .map_err(|e| ApiError::from_storage_read(e, "Failed to read assignment file"))?;

    let filename = assignment.original_filename.as_deref().unwrap_or("assignment");
    Ok(file_response(bytes, filename))
}

async fn replace_attachment(
    Path(assignment_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let assignment = load_assignment(&state, assignment_id).await?;
    require_course_instructor(&state, &user, assignment.course_id).await?;

    let file = read_multipart(&state, multipart)
        .await?
        .file
        .ok_or_else(|| ApiError::BadRequest("file is required".to_string()))?;
    let (stored, original_filename) =
        store_upload(&state, "assignments", assignment.course_id, file).await?;

    if let Err(err) = repositories::assignments::set_file(
        state.db(),
        assignment.id,
        &stored.key,
        &original_filename,
    )
    .await
    {
        state.storage().delete_all(std::slice::from_ref(&stored.key)).await;
        return Err(ApiError::internal(err, "Failed to update assignment file"));
    }

    if let Some(previous) = assignment.file_path {
        state.storage().delete_all(&[previous]).await;
    }

    let updated = repositories::assignments::fetch_one_by_id(state.db(), assignment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch assignment"))?;
    Ok(Json(AssignmentResponse::from_db(updated)))
}

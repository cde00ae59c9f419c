use std::slice;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Response,
};

use crate::api::errors::ApiError;
use crate::api::extract::{Json, Path};
use crate::api::guards::{require_course_access, require_course_instructor, CurrentUser};
use crate::api::uploads::{file_response, read_multipart, store_upload};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::CourseMaterial;
use crate::repositories;
use crate::repositories::materials::CreateMaterial;
use crate::schemas::material::MaterialResponse;

async fn load_material(state: &AppState, material_id: i64) -> Result<CourseMaterial, ApiError> {
    repositories::materials::find_by_id(state.db(), material_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch material"))?
        .ok_or_else(|| ApiError::NotFound("Material not found".to_string()))
}

pub(super) async fn list_materials(
    Path(course_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<MaterialResponse>>, ApiError> {
    let course = require_course_access(&state, &user, course_id).await?;

    let materials = repositories::materials::list_for_course(state.db(), course.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list materials"))?;

    Ok(Json(materials.into_iter().map(MaterialResponse::from_db).collect()))
}

pub(super) async fn upload_material(
    Path(course_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<MaterialResponse>), ApiError> {
    let course = require_course_instructor(&state, &user, course_id).await?;

    let mut form = read_multipart(&state, multipart).await?;
    let description = form.text("description").map(str::to_string);
    let file = form
        .file
        .take()
        .ok_or_else(|| ApiError::BadRequest("file is required".to_string()))?;
    let (stored, original_filename) = store_upload(&state, "materials", course.id, file).await?;

    let notice = format!("New material in {}: {}", course.code, original_filename);
    let created = repositories::materials::create(
        state.db(),
        CreateMaterial {
            course_id: course.id,
            file_path: &stored.key,
            original_filename: &original_filename,
            description: description.as_deref(),
            uploaded_by: user.id,
            upload_date: primitive_now_utc(),
        },
        &notice,
    )
    .await;

    let material = match created {
        Ok(material) => material,
        Err(err) => {
            state.storage().delete_all(slice::from_ref(&stored.key)).await;
            return Err(ApiError::internal(err, "Failed to save material"));
        }
    };

    tracing::info!(
        user_id = user.id,
        course_id = course.id,
        material_id = material.id,
        size = stored.size,
        "Material uploaded"
    );

    Ok((StatusCode::CREATED, Json(MaterialResponse::from_db(material))))
}

pub(super) async fn download_material(
    Path(material_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let material = load_material(&state, material_id).await?;
    require_course_access(&state, &user, material.course_id).await?;

    let bytes = state
        .storage()
        .get(&material.file_path)
        .await
        .map_err(|e| ApiError::from_storage_read(e, "Failed to read material file"))?;

    Ok(file_response(bytes, &material.original_filename))
}

pub(super) async fn delete_material(
    Path(material_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let material = load_material(&state, material_id).await?;
    require_course_instructor(&state, &user, material.course_id).await?;

    let deleted = repositories::materials::delete(state.db(), material.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete material"))?;
    if !deleted {
        return Err(ApiError::NotFound("Material not found".to_string()));
    }

    state.storage().delete_all(slice::from_ref(&material.file_path)).await;
    tracing::info!(user_id = user.id, material_id = material.id, "Material deleted");

    Ok(StatusCode::NO_CONTENT)
}

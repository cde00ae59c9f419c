use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::extract::{Json, Path, Query};
use crate::api::guards::CurrentAdmin;
use crate::api::pagination::{default_limit, normalize, PaginatedResponse};
use crate::api::validation::validate_password_len;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::repositories::users::{CreateUser, UpdateUser, UserFilter};
use crate::schemas::user::{AdminUserCreate, AdminUserUpdate, UserResponse};

#[derive(Debug, Deserialize)]
pub(crate) struct UserListQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    role: Option<UserRole>,
    #[serde(default)]
    active: Option<bool>,
    #[serde(default)]
    search: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:user_id", get(get_user).patch(update_user).delete(deactivate_user))
}

async fn fetch_user(state: &AppState, user_id: i64) -> Result<User, ApiError> {
    repositories::users::find_by_id(state.db(), user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

async fn list_users(
    Query(params): Query<UserListQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    let (skip, limit) = normalize(params.skip, params.limit);
    let filter = UserFilter {
        role: params.role,
        active: params.active,
        search: params.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
    };

    let (users, total_count) = repositories::users::list(state.db(), &filter, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list users"))?;

    Ok(Json(PaginatedResponse {
        items: users.into_iter().map(UserResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn get_user(
    Path(user_id): Path<i64>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(UserResponse::from_db(fetch_user(&state, user_id).await?)))
}

async fn create_user(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<AdminUserCreate>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    validate_password_len(&payload.password)?;

    let username = payload.username.trim();
    let email = payload.email.trim();
    let conflict = repositories::users::find_conflicting(state.db(), username, email, None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if conflict.is_some() {
        return Err(ApiError::Conflict("Username or email already exists".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let user = repositories::users::create(
        state.db(),
        CreateUser {
            username,
            hashed_password,
            first_name: payload.first_name.trim(),
            last_name: payload.last_name.trim(),
            email,
            role: payload.role,
            active: payload.active,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            ApiError::Conflict("Username or email already exists".to_string())
        } else {
            ApiError::internal(e, "Failed to create user")
        }
    })?;

    tracing::info!(
        admin_id = admin.id,
        user_id = user.id,
        role = %user.role,
        action = "user_create",
        "Admin created user"
    );

    Ok((StatusCode::CREATED, Json(UserResponse::from_db(user))))
}

async fn update_user(
    Path(user_id): Path<i64>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<AdminUserUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let user = fetch_user(&state, user_id).await?;

    if admin.id == user.id {
        if payload.active == Some(false) {
            return Err(ApiError::BadRequest("Admins cannot deactivate themselves".to_string()));
        }
        if payload.role.is_some_and(|role| role != UserRole::Admin) {
            return Err(ApiError::BadRequest("Admins cannot change their own role".to_string()));
        }
    }

    if let Some(email) = payload.email.as_deref() {
        let conflict =
            repositories::users::find_conflicting(state.db(), &user.username, email, Some(user.id))
                .await
                .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
        if conflict.is_some() {
            return Err(ApiError::Conflict("Email already in use".to_string()));
        }
    }

    let hashed_password = match payload.password.as_deref() {
        Some(password) => {
            validate_password_len(password)?;
            Some(
                security::hash_password(password)
                    .map_err(|e| ApiError::internal(e, "Failed to hash password"))?,
            )
        }
        None => None,
    };

    repositories::users::update(
        state.db(),
        user.id,
        UpdateUser {
            first_name: payload.first_name.map(|s| s.trim().to_string()),
            last_name: payload.last_name.map(|s| s.trim().to_string()),
            email: payload.email.map(|s| s.trim().to_string()),
            role: payload.role,
            active: payload.active,
            hashed_password,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update user"))?;

    tracing::info!(
        admin_id = admin.id,
        user_id = user.id,
        action = "user_update",
        "Admin updated user"
    );

    Ok(Json(UserResponse::from_db(fetch_user(&state, user.id).await?)))
}

async fn deactivate_user(
    Path(user_id): Path<i64>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    if admin.id == user_id {
        return Err(ApiError::BadRequest("Admins cannot deactivate themselves".to_string()));
    }
    let user = fetch_user(&state, user_id).await?;

    repositories::users::update(
        state.db(),
        user.id,
        UpdateUser {
            first_name: None,
            last_name: None,
            email: None,
            role: None,
            active: Some(false),
            hashed_password: None,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to deactivate user"))?;

    tracing::info!(
        admin_id = admin.id,
        user_id = user.id,
        action = "user_deactivate",
        "Admin deactivated user"
    );

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests;

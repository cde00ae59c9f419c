use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::extract::Json;
use crate::api::guards::{bearer_token, CurrentUser};
use crate::api::validation::validate_password_len;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::auth::{LoginResponse, RegisterResponse};
use crate::schemas::user::{LoginRequest, RegisterRequest, UserResponse};
use crate::schemas::MessageResponse;

/// Max attempts per window for login and register.
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout).get(logout))
        .route("/me", get(me))
}

async fn enforce_rate_limit(
    state: &AppState,
    action: &str,
    username: &str,
    message: &'static str,
) -> Result<(), ApiError> {
    let rate_key = format!("rl:{action}:{}", username.to_lowercase());
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if allowed {
        Ok(())
    } else {
        Err(ApiError::TooManyRequests(message))
    }
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    if payload.has_blank_field() {
        return Err(ApiError::BadRequest("Missing required fields".to_string()));
    }
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    validate_password_len(&payload.password)?;

    let role = match payload.role.trim().parse::<UserRole>() {
        Ok(role @ (UserRole::Student | UserRole::Professor)) => role,
        Ok(UserRole::Admin) => {
            return Err(ApiError::BadRequest(
                "Admin accounts can only be created by an administrator".to_string(),
            ));
        }
        Err(_) => return Err(ApiError::BadRequest("Role must be student or professor".to_string())),
    };

    let username = payload.username.trim();
    let email = payload.email.trim();
    enforce_rate_limit(
        &state,
        "register",
        username,
        "Too many registration attempts, try again later",
    )
    .await?;

    let conflict = repositories::users::find_conflicting(state.db(), username, email, None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if conflict.is_some() {
        return Err(ApiError::Conflict("Username or email already exists".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let created = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            username,
            hashed_password,
            first_name: payload.first_name.trim(),
            last_name: payload.last_name.trim(),
            email,
            role,
            active: true,
            created_at: primitive_now_utc(),
        },
    )
    .await;

    let user = match created {
        Ok(user) => user,
        Err(err) if crate::db::is_unique_violation(&err) => {
            return Err(ApiError::Conflict("Username or email already exists".to_string()));
        }
        Err(err) => return Err(ApiError::internal(err, "Failed to create user")),
    };

    tracing::info!(user_id = user.id, role = %user.role, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user: UserResponse::from_db(user),
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest("Missing username or password".to_string()));
    }

    enforce_rate_limit(&state, "login", username, "Too many login attempts, try again later")
        .await?;

    let mut user = repositories::users::find_by_username(state.db(), username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized("Invalid credentials"))?;

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Invalid credentials"))?;
    if !verified {
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }

    if !user.active {
        return Err(ApiError::Forbidden("Account is deactivated"));
    }

    let now = primitive_now_utc();
    repositories::users::touch_last_login(state.db(), user.id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to record login"))?;

    let token = security::create_access_token(user.id, user.role, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    let user_id = user.id;
    user.last_login = Some(now);

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user_id,
        access_token: token,
        token_type: "bearer".to_string(),
        user: UserResponse::from_db(user),
    }))
}

/// Revokes the presented token when it is valid. Always succeeds so that
/// clients can call it unconditionally.
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let claims = bearer_token(&headers)
        .and_then(|token| security::verify_token(token, state.settings()).ok());

    if let Some(claims) = claims {
        if let Ok(user_id) = claims.user_id() {
            repositories::revoked_tokens::revoke(
                state.db(),
                &claims.jti,
                user_id,
                to_primitive_utc(claims.expires_at()),
                primitive_now_utc(),
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to revoke token"))?;
            tracing::info!(user_id, action = "logout", "Token revoked");
        }
    }

    Ok(Json(MessageResponse::new("Logged out")))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

#[cfg(test)]
mod tests;

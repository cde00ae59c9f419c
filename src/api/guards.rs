use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts, HeaderMap};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::{Course, User};
use crate::db::types::UserRole;
use crate::repositories;

pub(crate) struct CurrentUser(pub(crate) User);
pub(crate) struct CurrentAdmin(pub(crate) User);
/// A professor or an admin.
pub(crate) struct CurrentStaff(pub(crate) User);
pub(crate) struct CurrentStudent(pub(crate) User);

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let token =
            bearer_token(&parts.headers).ok_or(ApiError::Unauthorized("Not authenticated"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;
        let user_id = claims
            .user_id()
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        let revoked = repositories::revoked_tokens::is_revoked(app_state.db(), &claims.jti)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check token revocation"))?;
        if revoked {
            return Err(ApiError::Unauthorized("Token has been revoked"));
        }

        let user = repositories::users::find_by_id(app_state.db(), user_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

        let Some(user) = user else {
            return Err(ApiError::Unauthorized("User not found"));
        };

        if !user.active {
            return Err(ApiError::Unauthorized("Invalid authentication credentials"));
        }

        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if user.is_admin() {
            Ok(CurrentAdmin(user))
        } else {
            Err(ApiError::Forbidden("Admin access required"))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStaff {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        match user.role {
            UserRole::Admin | UserRole::Professor => Ok(CurrentStaff(user)),
            UserRole::Student => Err(ApiError::Forbidden("Professor or admin access required")),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStudent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if user.role == UserRole::Student {
            Ok(CurrentStudent(user))
        } else {
            Err(ApiError::Forbidden("Student access required"))
        }
    }
}

pub(crate) async fn load_course(state: &AppState, course_id: i64) -> Result<Course, ApiError> {
    repositories::courses::find_by_id(state.db(), course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))
}

/// A stale `instructor_id` grants nothing once the user is no longer a
/// professor.
pub(crate) fn is_course_instructor(user: &User, course: &Course) -> bool {
    match user.role {
        UserRole::Admin => true,
        UserRole::Professor => course.instructor_id == Some(user.id),
        UserRole::Student => false,
    }
}

/// Admin or the professor teaching the course.
pub(crate) async fn require_course_instructor(
    state: &AppState,
    user: &User,
    course_id: i64,
) -> Result<Course, ApiError> {
    let course = load_course(state, course_id).await?;
    if is_course_instructor(user, &course) {
        Ok(course)
    } else {
        Err(ApiError::Forbidden("Only the course instructor can do this"))
    }
}

/// Admin, the course instructor, or an actively enrolled student.
pub(crate) async fn require_course_access(
    state: &AppState,
    user: &User,
    course_id: i64,
) -> Result<Course, ApiError> {
    let course = load_course(state, course_id).await?;
    if is_course_instructor(user, &course) {
        return Ok(course);
    }

    if user.role == UserRole::Student {
        let enrolled =
            repositories::enrollments::is_active_student(state.db(), user.id, course.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to check enrollment"))?;
        if enrolled {
            return Ok(course);
        }
    }

    Err(ApiError::Forbidden("Not enrolled in this course"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    use crate::core::time::primitive_now_utc;
    use crate::db::types::Semester;

    fn user(id: i64, role: UserRole) -> User {
        User {
            id,
            username: format!("user{id}"),
            hashed_password: String::new(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: format!("user{id}@example.edu"),
            role,
            active: true,
            created_at: primitive_now_utc(),
            last_login: None,
        }
    }

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }

    #[test]
    fn instructor_rights_follow_the_current_role() {
        let course = Course {
            id: 1,
            name: "Algorithms".to_string(),
            code: "CS301".to_string(),
            description: None,
            instructor_id: Some(7),
            year: 2025,
            semester: Semester::Fall,
            created_at: primitive_now_utc(),
        };

        assert!(is_course_instructor(&user(7, UserRole::Professor), &course));
        assert!(is_course_instructor(&user(1, UserRole::Admin), &course));
        assert!(!is_course_instructor(&user(8, UserRole::Professor), &course));
        assert!(!is_course_instructor(&user(7, UserRole::Student), &course));
    }
}

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, put},
    Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::extract::{Json, Path, Query};
use crate::api::guards::{
    load_course, require_course_instructor, CurrentAdmin, CurrentStaff, CurrentUser,
};
use crate::api::pagination::{normalize, PaginatedResponse};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Course, User};
use crate::db::types::{EnrollmentStatus, UserRole};
use crate::repositories;
use crate::repositories::courses::{CourseFilter, CreateCourse, UpdateCourse};
use crate::schemas::course::{
    CourseCreate, CourseListQuery, CourseResponse, CourseUpdate, EnrolledStudentResponse,
    InstructorAssign,
};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/mine", get(my_courses))
        .route("/:course_id", get(get_course).patch(update_course).delete(delete_course))
        .route("/:course_id/instructor", put(assign_instructor))
        .route("/:course_id/students", get(list_students))
        .route("/:course_id/students/:student_id", delete(drop_student))
}

async fn require_active_professor(state: &AppState, user_id: i64) -> Result<User, ApiError> {
    let user = repositories::users::find_by_id(state.db(), user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch instructor"))?;

    match user {
        Some(user) if user.role == UserRole::Professor && user.active => Ok(user),
        _ => Err(ApiError::BadRequest(
            "instructor_id must reference an active professor".to_string(),
        )),
    }
}

async fn ensure_code_available(
    state: &AppState,
    code: &str,
    exclude_id: Option<i64>,
) -> Result<(), ApiError> {
    let taken = repositories::courses::code_taken(state.db(), code, exclude_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check course code"))?;
    if taken {
        Err(ApiError::Conflict(format!("Course code {code} already exists")))
    } else {
        Ok(())
    }
}

async fn list_courses(
    Query(params): Query<CourseListQuery>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<CourseResponse>>, ApiError> {
    let (skip, limit) = normalize(params.skip, params.limit);
    let filter = CourseFilter {
        year: params.year,
        semester: params.semester,
        instructor_id: params.instructor_id,
    };

    let (courses, total_count) = repositories::courses::list(state.db(), &filter, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list courses"))?;

    Ok(Json(PaginatedResponse {
        items: courses.into_iter().map(CourseResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn my_courses(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let courses: Vec<Course> = match user.role {
        UserRole::Professor => {
            repositories::courses::list_for_instructor(state.db(), user.id).await
        }
        UserRole::Student => repositories::courses::list_for_student(state.db(), user.id).await,
        UserRole::Admin => repositories::courses::list(
            state.db(),
            &CourseFilter::default(),
            0,
            i64::from(i32::MAX),
        )
        .await
        .map(|(courses, _)| courses),
    }
    .map_err(|e| ApiError::internal(e, "Failed to list courses"))?;

    Ok(Json(courses.into_iter().map(CourseResponse::from_db).collect()))
}

async fn create_course(
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<CourseCreate>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let instructor_id = if user.is_admin() {
        let requested = payload.instructor_id.ok_or_else(|| {
            ApiError::BadRequest("instructor_id is required when an admin creates a course".into())
        })?;
        require_active_professor(&state, requested).await?.id
    } else {
        if payload.instructor_id.is_some_and(|id| id != user.id) {
            return Err(ApiError::Forbidden("Professors can only create their own courses"));
        }
        user.id
    };

    let code = payload.code.trim();
    ensure_code_available(&state, code, None).await?;

    let course = repositories::courses::create(
        state.db(),
        CreateCourse {
            name: payload.name.trim(),
            code,
            description: payload.description.as_deref(),
            instructor_id: Some(instructor_id),
            year: payload.year,
            semester: payload.semester,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            ApiError::Conflict(format!("Course code {code} already exists"))
        } else {
            ApiError::internal(e, "Failed to create course")
        }
    })?;

    tracing::info!(
        user_id = user.id,
        course_id = course.id,
        instructor_id,
        action = "course_create",
        "Course created"
    );

    Ok((StatusCode::CREATED, Json(CourseResponse::from_db(course))))
}

async fn get_course(
    Path(course_id): Path<i64>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<CourseResponse>, ApiError> {
    Ok(Json(CourseResponse::from_db(load_course(&state, course_id).await?)))
}

async fn update_course(
    Path(course_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CourseUpdate>,
) -> Result<Json<CourseResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let course = require_course_instructor(&state, &user, course_id).await?;

    let code = payload.code.map(|code| code.trim().to_string());
    if let Some(code) = code.as_deref() {
        ensure_code_available(&state, code, Some(course.id)).await?;
    }

    repositories::courses::update(
        state.db(),
        course.id,
        UpdateCourse {
            name: payload.name.map(|name| name.trim().to_string()),
            code,
            description: payload.description,
            year: payload.year,
            semester: payload.semester,
        },
    )
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            ApiError::Conflict("Course code already exists".to_string())
        } else {
            ApiError::internal(e, "Failed to update course")
        }
    })?;

    let updated = repositories::courses::fetch_one_by_id(state.db(), course.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?;
    Ok(Json(CourseResponse::from_db(updated)))
}

async fn delete_course(
    Path(course_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let course = require_course_instructor(&state, &user, course_id).await?;

    let keys = repositories::courses::delete_cascade(state.db(), course.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete course"))?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    state.storage().delete_all(&keys).await;

    tracing::info!(
        user_id = user.id,
        course_id = course.id,
        course_code = %course.code,
        removed_files = keys.len(),
        action = "course_delete",
        "Course deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn assign_instructor(
    Path(course_id): Path<i64>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<InstructorAssign>,
) -> Result<Json<CourseResponse>, ApiError> {
    let course = load_course(&state, course_id).await?;
    let instructor = require_active_professor(&state, payload.instructor_id).await?;

    repositories::courses::set_instructor(state.db(), course.id, instructor.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to assign instructor"))?;

    let message = format!("You have been assigned as instructor of {}", course.code);
    repositories::notifications::insert(state.db(), instructor.id, &message, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to notify instructor"))?;

    tracing::info!(
        admin_id = admin.id,
        course_id = course.id,
        instructor_id = instructor.id,
        action = "course_assign_instructor",
        "Instructor assigned"
    );

    let updated = repositories::courses::fetch_one_by_id(state.db(), course.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?;
    Ok(Json(CourseResponse::from_db(updated)))
}

async fn list_students(
    Path(course_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<EnrolledStudentResponse>>, ApiError> {
    let course = require_course_instructor(&state, &user, course_id).await?;

    let students = repositories::enrollments::list_students(state.db(), course.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list students"))?;

    Ok(Json(students.into_iter().map(EnrolledStudentResponse::from_db).collect()))
}

async fn drop_student(
    Path((course_id, student_id)): Path<(i64, i64)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let course = require_course_instructor(&state, &user, course_id).await?;

    let enrollment = repositories::enrollments::find(state.db(), student_id, course.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch enrollment"))?;
    match enrollment {
        Some(enrollment) if enrollment.status == EnrollmentStatus::Active => {}
        Some(_) => return Err(ApiError::Conflict("Student has already been dropped".to_string())),
        None => {
            return Err(ApiError::NotFound("Student is not enrolled in this course".to_string()))
        }
    }

    let dropped = repositories::enrollments::drop_student(state.db(), student_id, course.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to drop student"))?;
    if !dropped {
        return Err(ApiError::Conflict("Student has already been dropped".to_string()));
    }

    let message = format!("You have been removed from {}", course.code);
    repositories::notifications::insert(state.db(), student_id, &message, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to notify student"))?;

    tracing::info!(
        user_id = user.id,
        course_id = course.id,
        student_id,
        action = "course_drop_student",
        "Student dropped"
    );

    Ok(StatusCode::NO_CONTENT)
}

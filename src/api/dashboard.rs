use axum::{extract::State, routing::get, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::{RequestStatus, UserRole};
use crate::repositories;
use crate::repositories::enrollment_requests::RequestFilter;
use crate::schemas::course::CourseResponse;
use crate::schemas::dashboard::{
    AdminDashboard, DashboardResponse, ProfessorCourseSummary, ProfessorDashboard,
    StudentDashboard, UpcomingAssignmentResponse,
};
use crate::schemas::enrollment::EnrollmentRequestView;
use crate::schemas::submission::StudentSubmissionResponse;

const RECENT_REQUESTS: i64 = 5;
const PENDING_REQUESTS: i64 = 50;
const UPCOMING_ASSIGNMENTS: i64 = 10;
const RECENT_GRADES: i64 = 5;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(dashboard))
}

async fn dashboard(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let response = match user.role {
        UserRole::Admin => DashboardResponse::Admin(admin_dashboard(&state).await?),
        UserRole::Professor => {
            DashboardResponse::Professor(professor_dashboard(&state, &user).await?)
        }
        UserRole::Student => DashboardResponse::Student(student_dashboard(&state, &user).await?),
    };
    Ok(Json(response))
}

async fn pending_requests(
    state: &AppState,
    instructor_id: Option<i64>,
    limit: i64,
) -> Result<Vec<EnrollmentRequestView>, ApiError> {
    let filter = RequestFilter {
        status: Some(RequestStatus::Pending),
        instructor_id,
        ..RequestFilter::default()
    };
    let (rows, _) = repositories::enrollment_requests::list(state.db(), &filter, 0, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list enrollment requests"))?;
    Ok(rows.into_iter().map(EnrollmentRequestView::from_db).collect())
}

async fn admin_dashboard(state: &AppState) -> Result<AdminDashboard, ApiError> {
    let counts = repositories::users::count_by_role(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count users"))?;
    let count_for = |role: UserRole| {
        counts.iter().find(|(r, _)| *r == role).map(|(_, count)| *count).unwrap_or(0)
    };

    let courses = repositories::courses::count_all(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count courses"))?;
    let pending = repositories::enrollment_requests::count_pending(state.db(), None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count enrollment requests"))?;

    Ok(AdminDashboard {
        admins: count_for(UserRole::Admin),
        professors: count_for(UserRole::Professor),
        students: count_for(UserRole::Student),
        courses,
        pending_requests: pending,
        recent_requests: pending_requests(state, None, RECENT_REQUESTS).await?,
    })
}

async fn professor_dashboard(
    state: &AppState,
    user: &User,
) -> Result<ProfessorDashboard, ApiError> {
    let courses = repositories::courses::list_for_instructor(state.db(), user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list courses"))?;

    let mut summaries = Vec::with_capacity(courses.len());
    for course in courses {
        let students = repositories::enrollments::count_active(state.db(), course.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count students"))?;
        let assignments = repositories::assignments::count_for_course(state.db(), course.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count assignments"))?;
        let ungraded_submissions =
            repositories::submissions::count_ungraded_for_course(state.db(), course.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to count submissions"))?;

        summaries.push(ProfessorCourseSummary {
            course: CourseResponse::from_db(course),
            students,
            assignments,
            ungraded_submissions,
        });
    }

    Ok(ProfessorDashboard {
        courses: summaries,
        pending_requests: pending_requests(state, Some(user.id), PENDING_REQUESTS).await?,
    })
}

async fn student_dashboard(state: &AppState, user: &User) -> Result<StudentDashboard, ApiError> {
    let courses = repositories::courses::list_for_student(state.db(), user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list courses"))?;
    let upcoming = repositories::assignments::upcoming_for_student(
        state.db(),
        user.id,
        primitive_now_utc(),
        UPCOMING_ASSIGNMENTS,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list upcoming assignments"))?;
    let graded =
        repositories::submissions::recent_graded_for_student(state.db(), user.id, RECENT_GRADES)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list grades"))?;
    let unread_notifications = repositories::notifications::count_unread(state.db(), user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count notifications"))?;

    Ok(StudentDashboard {
        courses: courses.into_iter().map(CourseResponse::from_db).collect(),
        upcoming_assignments: upcoming
            .into_iter()
            .map(UpcomingAssignmentResponse::from_db)
            .collect(),
        recent_grades: graded.into_iter().map(StudentSubmissionResponse::from_db).collect(),
        unread_notifications,
    })
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use time::Duration;
    use tower::ServiceExt;

    use crate::db::types::UserRole;
    use crate::test_support;

    #[tokio::test]
    async fn dashboard_is_shaped_by_role() {
        let Some(ctx) = test_support::setup_test_context().await else {
            return;
        };

        let admin =
            test_support::insert_user(ctx.state.db(), "root", UserRole::Admin, "admin-pass").await;
        let professor =
            test_support::insert_user(ctx.state.db(), "prof01", UserRole::Professor, "prof-pass")
                .await;
        let student =
            test_support::insert_user(ctx.state.db(), "stud01", UserRole::Student, "stud-pass")
                .await;
        let course = test_support::insert_course(ctx.state.db(), "CS340", Some(professor.id)).await;
        test_support::enroll(ctx.state.db(), student.id, course.id).await;
        test_support::insert_assignment(ctx.state.db(), course.id, professor.id, Duration::days(5))
            .await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/dashboard",
                Some(&test_support::bearer_token(&admin, ctx.state.settings())),
                None,
            ))
            .await
            .expect("admin dashboard");
        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        assert_eq!(body["role"], "admin");
        assert_eq!(body["students"], 1);
        assert_eq!(body["professors"], 1);
        assert_eq!(body["courses"], 1);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/dashboard",
                Some(&test_support::bearer_token(&professor, ctx.state.settings())),
                None,
            ))
            .await
            .expect("professor dashboard");
        let body = test_support::read_json(response).await;
        assert_eq!(body["role"], "professor");
        assert_eq!(body["courses"][0]["students"], 1);
        assert_eq!(body["courses"][0]["assignments"], 1);
        assert_eq!(body["courses"][0]["ungraded_submissions"], 0);

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/dashboard",
                Some(&test_support::bearer_token(&student, ctx.state.settings())),
                None,
            ))
            .await
            .expect("student dashboard");
        let body = test_support::read_json(response).await;
        assert_eq!(body["role"], "student");
        assert_eq!(body["courses"][0]["code"], "CS340");
        assert_eq!(body["upcoming_assignments"][0]["title"], "Lab 1");
        assert_eq!(body["unread_notifications"], 1);
    }
}

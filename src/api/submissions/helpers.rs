use crate::api::errors::ApiError;
use crate::api::guards::is_course_instructor;
use crate::core::state::AppState;
use crate::db::models::{Assignment, Course, Submission, User};
use crate::repositories;

pub(crate) struct SubmissionContext {
    pub(crate) submission: Submission,
    pub(crate) assignment: Assignment,
    pub(crate) course: Course,
}

pub(crate) async fn load_context(
    state: &AppState,
    submission_id: i64,
) -> Result<SubmissionContext, ApiError> {
    let submission = repositories::submissions::find_by_id(state.db(), submission_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;
    let assignment =
        crate::api::assignments::load_assignment(state, submission.assignment_id).await?;
    let course = crate::api::guards::load_course(state, assignment.course_id).await?;

    Ok(SubmissionContext { submission, assignment, course })
}

/// The submitting student, the course instructor, or an admin.
pub(crate) fn ensure_can_view(user: &User, context: &SubmissionContext) -> Result<(), ApiError> {
    if context.submission.student_id == user.id || is_course_instructor(user, &context.course) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Not allowed to access this submission"))
    }
}

pub(crate) mod helpers;
mod student;
mod instructor;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

/// Routes mounted under `/assignments`.
pub(crate) fn assignment_routes() -> Router<AppState> {
    Router::new().route(
        "/:assignment_id/submissions",
        get(instructor::list_for_assignment).post(student::upload_submission),
    )
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        // Student endpoints
        .route("/mine", get(student::my_submissions))
        // Shared by the owner and course staff
        .route("/:submission_id", get(instructor::get_submission))
        .route("/:submission_id/file", get(instructor::download_submission))
        // Instructor endpoints
        .route("/:submission_id/grade", post(instructor::grade_submission))
}

#[cfg(test)]
mod tests;

use time::PrimitiveDateTime;

use crate::db::models::Submission;

pub(crate) const COLUMNS: &str = "\
    id, assignment_id, student_id, submission_path, original_filename, file_size, file_hash, \
    submission_date, grade, feedback, graded_date";

pub(crate) struct StoreSubmission<'a> {
    pub(crate) assignment_id: i64,
    pub(crate) student_id: i64,
    pub(crate) submission_path: &'a str,
    pub(crate) original_filename: &'a str,
    pub(crate) file_size: i64,
    pub(crate) file_hash: &'a str,
    pub(crate) submitted_at: PrimitiveDateTime,
}

#[derive(Debug)]
pub(crate) enum StoreOutcome {
    Created(Submission),
    /// An ungraded submission was overwritten; `previous_path` is the file it
    /// pointed at before.
    Replaced { submission: Submission, previous_path: String },
    AlreadyGraded,
    /// Another upload for the same student and assignment won the insert.
    Concurrent,
}

/// A submission joined with the submitting student's profile.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct SubmissionView {
    pub(crate) id: i64,
    pub(crate) assignment_id: i64,
    pub(crate) student_id: i64,
    pub(crate) student_username: String,
    pub(crate) student_first_name: String,
    pub(crate) student_last_name: String,
    pub(crate) original_filename: String,
    pub(crate) file_size: i64,
    pub(crate) file_hash: String,
    pub(crate) submission_date: PrimitiveDateTime,
    pub(crate) grade: Option<f64>,
    pub(crate) feedback: Option<String>,
    pub(crate) graded_date: Option<PrimitiveDateTime>,
}

/// A student's own submission with the assignment and course it belongs to.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct StudentSubmissionView {
    pub(crate) id: i64,
    pub(crate) assignment_id: i64,
    pub(crate) assignment_title: String,
    pub(crate) due_date: PrimitiveDateTime,
    pub(crate) course_id: i64,
    pub(crate) course_code: String,
    pub(crate) course_name: String,
    pub(crate) original_filename: String,
    pub(crate) file_size: i64,
    pub(crate) submission_date: PrimitiveDateTime,
    pub(crate) grade: Option<f64>,
    pub(crate) feedback: Option<String>,
    pub(crate) graded_date: Option<PrimitiveDateTime>,
}

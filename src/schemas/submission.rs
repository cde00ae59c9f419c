use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Submission;
use crate::repositories::submissions::{StudentSubmissionView, SubmissionView};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradeRequest {
    #[validate(range(min = 0.0, max = 100.0, message = "grade must be between 0 and 100"))]
    pub(crate) grade: f64,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: i64,
    pub(crate) assignment_id: i64,
    pub(crate) student_id: i64,
    pub(crate) original_filename: String,
    pub(crate) file_size: i64,
    pub(crate) file_hash: String,
    pub(crate) submission_date: String,
    pub(crate) grade: Option<f64>,
    pub(crate) feedback: Option<String>,
    pub(crate) graded_date: Option<String>,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: Submission) -> Self {
        Self {
            id: submission.id,
            assignment_id: submission.assignment_id,
            student_id: submission.student_id,
            original_filename: submission.original_filename,
            file_size: submission.file_size,
            file_hash: submission.file_hash,
            submission_date: format_primitive(submission.submission_date),
            grade: submission.grade,
            feedback: submission.feedback,
            graded_date: submission.graded_date.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionDetailResponse {
    pub(crate) id: i64,
    pub(crate) assignment_id: i64,
    pub(crate) student_id: i64,
    pub(crate) student_username: String,
    pub(crate) student_name: String,
    pub(crate) original_filename: String,
    pub(crate) file_size: i64,
    pub(crate) file_hash: String,
    pub(crate) submission_date: String,
    pub(crate) grade: Option<f64>,
    pub(crate) feedback: Option<String>,
    pub(crate) graded_date: Option<String>,
}

impl SubmissionDetailResponse {
    pub(crate) fn from_db(row: SubmissionView) -> Self {
        Self {
            id: row.id,
            assignment_id: row.assignment_id,
            student_id: row.student_id,
            student_username: row.student_username,
            student_name: format!("{} {}", row.student_first_name, row.student_last_name),
            original_filename: row.original_filename,
            file_size: row.file_size,
            file_hash: row.file_hash,
            submission_date: format_primitive(row.submission_date),
            grade: row.grade,
            feedback: row.feedback,
            graded_date: row.graded_date.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentSubmissionResponse {
    pub(crate) id: i64,
    pub(crate) assignment_id: i64,
    pub(crate) assignment_title: String,
    pub(crate) due_date: String,
    pub(crate) course_id: i64,
    pub(crate) course_code: String,
    pub(crate) course_name: String,
    pub(crate) original_filename: String,
    pub(crate) file_size: i64,
    pub(crate) submission_date: String,
    pub(crate) grade: Option<f64>,
    pub(crate) feedback: Option<String>,
    pub(crate) graded_date: Option<String>,
}

impl StudentSubmissionResponse {
    pub(crate) fn from_db(row: StudentSubmissionView) -> Self {
        Self {
            id: row.id,
            assignment_id: row.assignment_id,
            assignment_title: row.assignment_title,
            due_date: format_primitive(row.due_date),
            course_id: row.course_id,
            course_code: row.course_code,
            course_name: row.course_name,
            original_filename: row.original_filename,
            file_size: row.file_size,
            submission_date: format_primitive(row.submission_date),
            grade: row.grade,
            feedback: row.feedback,
            graded_date: row.graded_date.map(format_primitive),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_must_be_within_bounds() {
        let ok: GradeRequest = serde_json::from_str(r#"{"grade":100}"#).unwrap();
        assert!(ok.validate().is_ok());

        let high: GradeRequest = serde_json::from_str(r#"{"grade":100.5}"#).unwrap();
        assert!(high.validate().is_err());

        let low: GradeRequest =
            serde_json::from_str(r#"{"grade":-1,"feedback":"late"}"#).unwrap();
        assert!(low.validate().is_err());
    }
}

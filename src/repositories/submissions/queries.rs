use sqlx::MySqlPool;

use crate::db::models::Submission;

use super::types::{StudentSubmissionView, SubmissionView, COLUMNS};

const VIEW_SELECT: &str = "
    SELECT s.id, s.assignment_id, s.student_id,
           u.username AS student_username,
           u.first_name AS student_first_name,
           u.last_name AS student_last_name,
           s.original_filename, s.file_size, s.file_hash, s.submission_date,
           s.grade, s.feedback, s.graded_date
    FROM submissions s
    JOIN users u ON u.id = s.student_id";

const STUDENT_SELECT: &str = "
    SELECT s.id, s.assignment_id, a.title AS assignment_title, a.due_date,
           c.id AS course_id, c.code AS course_code, c.name AS course_name,
           s.original_filename, s.file_size, s.submission_date,
           s.grade, s.feedback, s.graded_date
    FROM submissions s
    JOIN assignments a ON a.id = s.assignment_id
    JOIN courses c ON c.id = a.course_id";

pub(crate) async fn find_by_id(
    pool: &MySqlPool,
    submission_id: i64,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = ?"))
        .bind(submission_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_view(
    pool: &MySqlPool,
    submission_id: i64,
) -> Result<Option<SubmissionView>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionView>(&format!("{VIEW_SELECT} WHERE s.id = ?"))
        .bind(submission_id)
        .fetch_optional(pool)
        .await
}

/// All submissions for an assignment, optionally narrowed to one student.
pub(crate) async fn list_for_assignment(
    pool: &MySqlPool,
    assignment_id: i64,
    student_id: Option<i64>,
) -> Result<Vec<SubmissionView>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionView>(&format!(
        "{VIEW_SELECT}
         WHERE s.assignment_id = ? AND (? IS NULL OR s.student_id = ?)
         ORDER BY u.last_name, u.first_name"
    ))
    .bind(assignment_id)
    .bind(student_id)
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_for_student(
    pool: &MySqlPool,
    student_id: i64,
) -> Result<Vec<StudentSubmissionView>, sqlx::Error> {
    sqlx::query_as::<_, StudentSubmissionView>(&format!(
        "{STUDENT_SELECT}
         WHERE s.student_id = ?
         ORDER BY s.submission_date DESC"
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn recent_graded_for_student(
    pool: &MySqlPool,
    student_id: i64,
    limit: i64,
) -> Result<Vec<StudentSubmissionView>, sqlx::Error> {
    sqlx::query_as::<_, StudentSubmissionView>(&format!(
        "{STUDENT_SELECT}
         WHERE s.student_id = ? AND s.graded_date IS NOT NULL
         ORDER BY s.graded_date DESC
         LIMIT ?"
    ))
    .bind(student_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_ungraded_for_course(
    pool: &MySqlPool,
    course_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*)
         FROM submissions s
         JOIN assignments a ON a.id = s.assignment_id
         WHERE a.course_id = ? AND s.graded_date IS NULL",
    )
    .bind(course_id)
    .fetch_one(pool)
    .await
}

use sqlx::{Executor, MySql, MySqlPool};
use time::PrimitiveDateTime;

use crate::db::models::Enrollment;
use crate::db::types::EnrollmentStatus;

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct EnrolledStudent {
    pub(crate) student_id: i64,
    pub(crate) username: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) enrollment_date: PrimitiveDateTime,
}

pub(crate) async fn find(
    pool: &MySqlPool,
    student_id: i64,
    course_id: i64,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(
        "SELECT student_id, course_id, enrollment_date, status
         FROM enrollments
         WHERE student_id = ? AND course_id = ?",
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn is_active_student<'e, E>(
    executor: E,
    student_id: i64,
    course_id: i64,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    let found = sqlx::query_scalar::<_, i64>(
        "SELECT student_id FROM enrollments
         WHERE student_id = ? AND course_id = ? AND status = ?",
    )
    .bind(student_id)
    .bind(course_id)
    .bind(EnrollmentStatus::Active)
    .fetch_optional(executor)
    .await?;
    Ok(found.is_some())
}

/// Inserts an active enrollment, or reactivates a dropped one.
pub(crate) async fn upsert_active<'e, E>(
    executor: E,
    student_id: i64,
    course_id: i64,
    enrolled_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    sqlx::query(
        "INSERT INTO enrollments (student_id, course_id, enrollment_date, status)
         VALUES (?,?,?,?)
         ON DUPLICATE KEY UPDATE
             status = VALUES(status),
             enrollment_date = VALUES(enrollment_date)",
    )
    .bind(student_id)
    .bind(course_id)
    .bind(enrolled_at)
    .bind(EnrollmentStatus::Active)
    .execute(executor)
    .await?;
    Ok(())
}

/// Marks an active enrollment as dropped. Returns false when there was none.
pub(crate) async fn drop_student(
    pool: &MySqlPool,
    student_id: i64,
    course_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE enrollments SET status = ?
         WHERE student_id = ? AND course_id = ? AND status = ?",
    )
    .bind(EnrollmentStatus::Dropped)
    .bind(student_id)
    .bind(course_id)
    .bind(EnrollmentStatus::Active)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_students(
    pool: &MySqlPool,
    course_id: i64,
) -> Result<Vec<EnrolledStudent>, sqlx::Error> {
    sqlx::query_as::<_, EnrolledStudent>(
        "SELECT u.id AS student_id, u.username, u.first_name, u.last_name, u.email,
                e.enrollment_date
         FROM enrollments e
         JOIN users u ON u.id = e.student_id
         WHERE e.course_id = ? AND e.status = ?
         ORDER BY u.last_name, u.first_name",
    )
    .bind(course_id)
    .bind(EnrollmentStatus::Active)
    .fetch_all(pool)
    .await
}

pub(crate) async fn active_student_ids<'e, E>(
    executor: E,
    course_id: i64,
) -> Result<Vec<i64>, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    sqlx::query_scalar(
        "SELECT student_id FROM enrollments WHERE course_id = ? AND status = ?",
    )
    .bind(course_id)
    .bind(EnrollmentStatus::Active)
    .fetch_all(executor)
    .await
}

pub(crate) async fn count_active(pool: &MySqlPool, course_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE course_id = ? AND status = ?")
        .bind(course_id)
        .bind(EnrollmentStatus::Active)
        .fetch_one(pool)
        .await
}

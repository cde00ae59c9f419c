use sqlx::MySqlPool;
use time::PrimitiveDateTime;

use crate::db::models::Assignment;
use crate::db::types::{AssignmentStatus, EnrollmentStatus};
use crate::repositories::{enrollments, notifications};

const COLUMNS: &str = "\
    id, course_id, title, description, due_date, file_path, original_filename, \
    created_by, created_at, status";

pub(crate) struct CreateAssignment<'a> {
    pub(crate) course_id: i64,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) due_date: PrimitiveDateTime,
    pub(crate) file_path: Option<&'a str>,
    pub(crate) original_filename: Option<&'a str>,
    pub(crate) created_by: i64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) status: AssignmentStatus,
}

pub(crate) struct UpdateAssignment {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) due_date: Option<PrimitiveDateTime>,
    pub(crate) status: Option<AssignmentStatus>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct UpcomingAssignment {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) due_date: PrimitiveDateTime,
    pub(crate) course_id: i64,
    pub(crate) course_code: String,
    pub(crate) course_name: String,
}

/// Inserts the assignment and notifies every actively enrolled student in
/// the same transaction.
pub(crate) async fn create(
    pool: &MySqlPool,
    params: CreateAssignment<'_>,
    notice: &str,
) -> Result<Assignment, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO assignments (
            course_id, title, description, due_date, file_path, original_filename,
            created_by, created_at, status
         ) VALUES (?,?,?,?,?,?,?,?,?)",
    )
    .bind(params.course_id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.due_date)
    .bind(params.file_path)
    .bind(params.original_filename)
    .bind(params.created_by)
    .bind(params.created_at)
    .bind(params.status)
    .execute(&mut *tx)
    .await?;
    let assignment_id = result.last_insert_id() as i64;

    let students = enrollments::active_student_ids(&mut *tx, params.course_id).await?;
    notifications::insert_many(&mut *tx, &students, notice, params.created_at).await?;

    let assignment =
        sqlx::query_as::<_, Assignment>(&format!("SELECT {COLUMNS} FROM assignments WHERE id = ?"))
            .bind(assignment_id)
            .fetch_one(&mut *tx)
            .await?;

    tx.commit().await?;
    Ok(assignment)
}

pub(crate) async fn find_by_id(
    pool: &MySqlPool,
    assignment_id: i64,
) -> Result<Option<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!("SELECT {COLUMNS} FROM assignments WHERE id = ?"))
        .bind(assignment_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_one_by_id(
    pool: &MySqlPool,
    assignment_id: i64,
) -> Result<Assignment, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!("SELECT {COLUMNS} FROM assignments WHERE id = ?"))
        .bind(assignment_id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn list_for_course(
    pool: &MySqlPool,
    course_id: i64,
) -> Result<Vec<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "SELECT {COLUMNS} FROM assignments WHERE course_id = ? ORDER BY due_date, id"
    ))
    .bind(course_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn update(
    pool: &MySqlPool,
    assignment_id: i64,
    params: UpdateAssignment,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE assignments SET
            title = COALESCE(?, title),
            description = COALESCE(?, description),
            due_date = COALESCE(?, due_date),
            status = COALESCE(?, status)
         WHERE id = ?",
    )
    .bind(params.title)
    .bind(params.description)
    .bind(params.due_date)
    .bind(params.status)
    .bind(assignment_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn set_file(
    pool: &MySqlPool,
    assignment_id: i64,
    file_path: &str,
    original_filename: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE assignments SET file_path = ?, original_filename = ? WHERE id = ?")
        .bind(file_path)
        .bind(original_filename)
        .bind(assignment_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Deletes the assignment with its submissions. Returns the storage keys the
/// deleted rows pointed at, or `None` if the assignment did not exist.
pub(crate) async fn delete_cascade(
    pool: &MySqlPool,
    assignment_id: i64,
) -> Result<Option<Vec<String>>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let attachment = sqlx::query_scalar::<_, Option<String>>(
        "SELECT file_path FROM assignments WHERE id = ? FOR UPDATE",
    )
    .bind(assignment_id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(attachment) = attachment else {
        return Ok(None);
    };

    let mut keys: Vec<String> =
        sqlx::query_scalar("SELECT submission_path FROM submissions WHERE assignment_id = ?")
            .bind(assignment_id)
            .fetch_all(&mut *tx)
            .await?;
    keys.extend(attachment);

    sqlx::query("DELETE FROM submissions WHERE assignment_id = ?")
        .bind(assignment_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM assignments WHERE id = ?")
        .bind(assignment_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Some(keys))
}

pub(crate) async fn count_for_course(pool: &MySqlPool, course_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM assignments WHERE course_id = ?")
        .bind(course_id)
        .fetch_one(pool)
        .await
}

/// Active assignments in the student's courses that are not yet due and
/// have no submission from them.
pub(crate) async fn upcoming_for_student(
    pool: &MySqlPool,
    student_id: i64,
    now: PrimitiveDateTime,
    limit: i64,
) -> Result<Vec<UpcomingAssignment>, sqlx::Error> {
    sqlx::query_as::<_, UpcomingAssignment>(
        "SELECT a.id, a.title, a.due_date, c.id AS course_id,
                c.code AS course_code, c.name AS course_name
         FROM assignments a
         JOIN courses c ON c.id = a.course_id
         JOIN enrollments e ON e.course_id = a.course_id
         LEFT JOIN submissions s ON s.assignment_id = a.id AND s.student_id = e.student_id
         WHERE e.student_id = ? AND e.status = ?
           AND a.status = ? AND a.due_date > ?
           AND s.id IS NULL
         ORDER BY a.due_date
         LIMIT ?",
    )
    .bind(student_id)
    .bind(EnrollmentStatus::Active)
    .bind(AssignmentStatus::Active)
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await
}

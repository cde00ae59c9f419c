use sqlx::MySqlPool;
use time::PrimitiveDateTime;

use crate::db::models::Submission;
use crate::repositories::notifications;

use super::types::{StoreOutcome, StoreSubmission, COLUMNS};

async fn fetch_locked(
    conn: &mut sqlx::MySqlConnection,
    assignment_id: i64,
    student_id: i64,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS}
         FROM submissions
         WHERE assignment_id = ? AND student_id = ?
         FOR UPDATE"
    ))
    .bind(assignment_id)
    .bind(student_id)
    .fetch_optional(conn)
    .await
}

/// Records a new submission or overwrites an ungraded one. Graded
/// submissions are left untouched.
pub(crate) async fn store(
    pool: &MySqlPool,
    params: StoreSubmission<'_>,
) -> Result<StoreOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let existing = fetch_locked(&mut tx, params.assignment_id, params.student_id).await?;

    let outcome = match existing {
        Some(current) if current.is_graded() => return Ok(StoreOutcome::AlreadyGraded),
        Some(current) => {
            sqlx::query(
                "UPDATE submissions
                 SET submission_path = ?, original_filename = ?, file_size = ?, file_hash = ?,
                     submission_date = ?
                 WHERE id = ?",
            )
            .bind(params.submission_path)
            .bind(params.original_filename)
            .bind(params.file_size)
            .bind(params.file_hash)
            .bind(params.submitted_at)
            .bind(current.id)
            .execute(&mut *tx)
            .await?;

            let previous_path = current.submission_path.clone();
            let submission = Submission {
                submission_path: params.submission_path.to_string(),
                original_filename: params.original_filename.to_string(),
                file_size: params.file_size,
                file_hash: params.file_hash.to_string(),
                submission_date: params.submitted_at,
                ..current
            };
            StoreOutcome::Replaced { submission, previous_path }
        }
        None => {
            let inserted = sqlx::query(
                "INSERT INTO submissions (
                    assignment_id, student_id, submission_path, original_filename,
                    file_size, file_hash, submission_date
                 ) VALUES (?,?,?,?,?,?,?)",
            )
            .bind(params.assignment_id)
            .bind(params.student_id)
            .bind(params.submission_path)
            .bind(params.original_filename)
            .bind(params.file_size)
            .bind(params.file_hash)
            .bind(params.submitted_at)
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(_) => {}
                Err(err) if crate::db::is_unique_violation(&err) => {
                    return Ok(StoreOutcome::Concurrent);
                }
                Err(err) => return Err(err),
            }

            let created = fetch_locked(&mut tx, params.assignment_id, params.student_id)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            StoreOutcome::Created(created)
        }
    };

    tx.commit().await?;
    Ok(outcome)
}

/// Sets grade and feedback and notifies the student. Returns `None` when the
/// submission does not exist.
pub(crate) async fn grade(
    pool: &MySqlPool,
    submission_id: i64,
    grade: f64,
    feedback: Option<&str>,
    graded_at: PrimitiveDateTime,
) -> Result<Option<Submission>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions WHERE id = ? FOR UPDATE"
    ))
    .bind(submission_id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(current) = current else {
        return Ok(None);
    };

    sqlx::query("UPDATE submissions SET grade = ?, feedback = ?, graded_date = ? WHERE id = ?")
        .bind(grade)
        .bind(feedback)
        .bind(graded_at)
        .bind(submission_id)
        .execute(&mut *tx)
        .await?;

    let title: String = sqlx::query_scalar("SELECT title FROM assignments WHERE id = ?")
        .bind(current.assignment_id)
        .fetch_one(&mut *tx)
        .await?;
    let message = format!("Your submission for \"{title}\" has been graded: {grade}");
    notifications::insert(&mut *tx, current.student_id, &message, graded_at).await?;

    tx.commit().await?;

    Ok(Some(Submission {
        grade: Some(grade),
        feedback: feedback.map(str::to_string),
        graded_date: Some(graded_at),
        ..current
    }))
}

use sqlx::MySqlPool;
use time::PrimitiveDateTime;

use crate::db::models::CourseMaterial;
use crate::repositories::{enrollments, notifications};

const COLUMNS: &str =
    "id, course_id, file_path, original_filename, description, uploaded_by, upload_date";

pub(crate) struct CreateMaterial<'a> {
    pub(crate) course_id: i64,
    pub(crate) file_path: &'a str,
    pub(crate) original_filename: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) uploaded_by: i64,
    pub(crate) upload_date: PrimitiveDateTime,
}

/// Inserts the material and notifies the course's active students.
pub(crate) async fn create(
    pool: &MySqlPool,
    params: CreateMaterial<'_>,
    notice: &str,
) -> Result<CourseMaterial, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO course_materials (
            course_id, file_path, original_filename, description, uploaded_by, upload_date
         ) VALUES (?,?,?,?,?,?)",
    )
    .bind(params.course_id)
    .bind(params.file_path)
    .bind(params.original_filename)
    .bind(params.description)
    .bind(params.uploaded_by)
    .bind(params.upload_date)
    .execute(&mut *tx)
    .await?;

    let students = enrollments::active_student_ids(&mut *tx, params.course_id).await?;
    notifications::insert_many(&mut *tx, &students, notice, params.upload_date).await?;

    let material = sqlx::query_as::<_, CourseMaterial>(&format!(
        "SELECT {COLUMNS} FROM course_materials WHERE id = ?"
    ))
    .bind(result.last_insert_id() as i64)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(material)
}

pub(crate) async fn find_by_id(
    pool: &MySqlPool,
    material_id: i64,
) -> Result<Option<CourseMaterial>, sqlx::Error> {
    sqlx::query_as::<_, CourseMaterial>(&format!(
        "SELECT {COLUMNS} FROM course_materials WHERE id = ?"
    ))
    .bind(material_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_for_course(
    pool: &MySqlPool,
    course_id: i64,
) -> Result<Vec<CourseMaterial>, sqlx::Error> {
    sqlx::query_as::<_, CourseMaterial>(&format!(
        "SELECT {COLUMNS} FROM course_materials WHERE course_id = ?
         ORDER BY upload_date DESC, id DESC"
    ))
    .bind(course_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn delete(pool: &MySqlPool, material_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM course_materials WHERE id = ?")
        .bind(material_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

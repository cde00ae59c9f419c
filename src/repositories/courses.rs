use sqlx::{MySql, MySqlPool, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Course;
use crate::db::types::{EnrollmentStatus, Semester};

pub(crate) const COURSE_COLUMNS: &str =
    "c.id, c.name, c.code, c.description, c.instructor_id, c.year, c.semester, c.created_at";

pub(crate) struct CreateCourse<'a> {
    pub(crate) name: &'a str,
    pub(crate) code: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) instructor_id: Option<i64>,
    pub(crate) year: i32,
    pub(crate) semester: Semester,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) struct UpdateCourse {
    pub(crate) name: Option<String>,
    pub(crate) code: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) year: Option<i32>,
    pub(crate) semester: Option<Semester>,
}

#[derive(Debug, Default)]
pub(crate) struct CourseFilter {
    pub(crate) year: Option<i32>,
    pub(crate) semester: Option<Semester>,
    pub(crate) instructor_id: Option<i64>,
}

pub(crate) async fn create(
    pool: &MySqlPool,
    params: CreateCourse<'_>,
) -> Result<Course, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO courses (name, code, description, instructor_id, year, semester, created_at)
         VALUES (?,?,?,?,?,?,?)",
    )
    .bind(params.name)
    .bind(params.code)
    .bind(params.description)
    .bind(params.instructor_id)
    .bind(params.year)
    .bind(params.semester)
    .bind(params.created_at)
    .execute(pool)
    .await?;

    fetch_one_by_id(pool, result.last_insert_id() as i64).await
}

pub(crate) async fn find_by_id(
    pool: &MySqlPool,
    course_id: i64,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!("SELECT {COURSE_COLUMNS} FROM courses c WHERE c.id = ?"))
        .bind(course_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_one_by_id(
    pool: &MySqlPool,
    course_id: i64,
) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!("SELECT {COURSE_COLUMNS} FROM courses c WHERE c.id = ?"))
        .bind(course_id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn code_taken(
    pool: &MySqlPool,
    code: &str,
    exclude_id: Option<i64>,
) -> Result<bool, sqlx::Error> {
    let found = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM courses WHERE code = ? AND (? IS NULL OR id <> ?) LIMIT 1",
    )
    .bind(code)
    .bind(exclude_id)
    .bind(exclude_id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

fn push_filter(builder: &mut QueryBuilder<'_, MySql>, filter: &CourseFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(year) = filter.year {
        builder.push(" AND c.year = ").push_bind(year);
    }
    if let Some(semester) = filter.semester {
        builder.push(" AND c.semester = ").push_bind(semester);
    }
    if let Some(instructor_id) = filter.instructor_id {
        builder.push(" AND c.instructor_id = ").push_bind(instructor_id);
    }
}

pub(crate) async fn list(
    pool: &MySqlPool,
    filter: &CourseFilter,
    skip: i64,
    limit: i64,
) -> Result<(Vec<Course>, i64), sqlx::Error> {
    let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM courses c");
    push_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut builder = QueryBuilder::<MySql>::new(format!("SELECT {COURSE_COLUMNS} FROM courses c"));
    push_filter(&mut builder, filter);
    builder
        .push(" ORDER BY c.year DESC, c.code LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(skip);
    let courses = builder.build_query_as::<Course>().fetch_all(pool).await?;

    Ok((courses, total))
}

pub(crate) async fn list_for_instructor(
    pool: &MySqlPool,
    instructor_id: i64,
) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses c
         WHERE c.instructor_id = ?
         ORDER BY c.year DESC, c.code"
    ))
    .bind(instructor_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_for_student(
    pool: &MySqlPool,
    student_id: i64,
) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses c
         JOIN enrollments e ON e.course_id = c.id
         WHERE e.student_id = ? AND e.status = ?
         ORDER BY c.year DESC, c.code"
    ))
    .bind(student_id)
    .bind(EnrollmentStatus::Active)
    .fetch_all(pool)
    .await
}

pub(crate) async fn update(
    pool: &MySqlPool,
    course_id: i64,
    params: UpdateCourse,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE courses SET
            name = COALESCE(?, name),
            code = COALESCE(?, code),
            description = COALESCE(?, description),
            year = COALESCE(?, year),
            semester = COALESCE(?, semester)
         WHERE id = ?",
    )
    .bind(params.name)
    .bind(params.code)
    .bind(params.description)
    .bind(params.year)
    .bind(params.semester)
    .bind(course_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn set_instructor(
    pool: &MySqlPool,
    course_id: i64,
    instructor_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE courses SET instructor_id = ? WHERE id = ?")
        .bind(instructor_id)
        .bind(course_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn count_all(pool: &MySqlPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM courses").fetch_one(pool).await
}

/// Deletes a course and everything hanging off it in one transaction.
/// Returns the storage keys that were referenced by the deleted rows, or
/// `None` when the course does not exist.
pub(crate) async fn delete_cascade(
    pool: &MySqlPool,
    course_id: i64,
) -> Result<Option<Vec<String>>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM courses WHERE id = ? FOR UPDATE")
        .bind(course_id)
        .fetch_optional(&mut *tx)
        .await?;
    if locked.is_none() {
        return Ok(None);
    }

    let mut keys: Vec<String> = sqlx::query_scalar(
        "SELECT s.submission_path FROM submissions s
         JOIN assignments a ON a.id = s.assignment_id
         WHERE a.course_id = ?",
    )
    .bind(course_id)
    .fetch_all(&mut *tx)
    .await?;

    let assignment_files: Vec<String> = sqlx::query_scalar(
        "SELECT file_path FROM assignments WHERE course_id = ? AND file_path IS NOT NULL",
    )
    .bind(course_id)
    .fetch_all(&mut *tx)
    .await?;
    keys.extend(assignment_files);

    let material_files: Vec<String> =
        sqlx::query_scalar("SELECT file_path FROM course_materials WHERE course_id = ?")
            .bind(course_id)
            .fetch_all(&mut *tx)
            .await?;
    keys.extend(material_files);

    sqlx::query(
        "DELETE s FROM submissions s
         JOIN assignments a ON a.id = s.assignment_id
         WHERE a.course_id = ?",
    )
    .bind(course_id)
    .execute(&mut *tx)
    .await?;

    for statement in [
        "DELETE FROM assignments WHERE course_id = ?",
        "DELETE FROM course_materials WHERE course_id = ?",
        "DELETE FROM enrollments WHERE course_id = ?",
        "DELETE FROM enrollment_requests WHERE course_id = ?",
        "DELETE FROM courses WHERE id = ?",
    ] {
        sqlx::query(statement).bind(course_id).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(Some(keys))
}

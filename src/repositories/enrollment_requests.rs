use sqlx::{MySql, MySqlPool, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::EnrollmentRequest;
use crate::db::types::RequestStatus;
use crate::repositories::{enrollments, notifications};

const COLUMNS: &str =
    "id, student_id, course_id, request_date, status, processed_date, processed_by";

/// A request joined with the student and course it refers to.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct RequestView {
    pub(crate) id: i64,
    pub(crate) student_id: i64,
    pub(crate) student_username: String,
    pub(crate) student_first_name: String,
    pub(crate) student_last_name: String,
    pub(crate) course_id: i64,
    pub(crate) course_code: String,
    pub(crate) course_name: String,
    pub(crate) request_date: PrimitiveDateTime,
    pub(crate) status: RequestStatus,
    pub(crate) processed_date: Option<PrimitiveDateTime>,
    pub(crate) processed_by: Option<i64>,
}

#[derive(Debug, Default)]
pub(crate) struct RequestFilter {
    pub(crate) status: Option<RequestStatus>,
    pub(crate) course_id: Option<i64>,
    pub(crate) student_id: Option<i64>,
    /// Restricts to courses taught by this professor.
    pub(crate) instructor_id: Option<i64>,
}

#[derive(Debug)]
pub(crate) enum CreateOutcome {
    Created(EnrollmentRequest),
    AlreadyEnrolled,
    AlreadyPending,
}

#[derive(Debug)]
pub(crate) enum DecisionOutcome {
    NotFound,
    AlreadyProcessed(RequestStatus),
    Decided(EnrollmentRequest),
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum CancelOutcome {
    NotFound,
    NotPending(RequestStatus),
    Cancelled,
}

pub(crate) async fn find_by_id(
    pool: &MySqlPool,
    request_id: i64,
) -> Result<Option<EnrollmentRequest>, sqlx::Error> {
    sqlx::query_as::<_, EnrollmentRequest>(&format!(
        "SELECT {COLUMNS} FROM enrollment_requests WHERE id = ?"
    ))
    .bind(request_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn create(
    pool: &MySqlPool,
    student_id: i64,
    course_id: i64,
    requested_at: PrimitiveDateTime,
) -> Result<CreateOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    if enrollments::is_active_student(&mut *tx, student_id, course_id).await? {
        return Ok(CreateOutcome::AlreadyEnrolled);
    }

    let pending = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM enrollment_requests
         WHERE student_id = ? AND course_id = ? AND status = ?
         FOR UPDATE",
    )
    .bind(student_id)
    .bind(course_id)
    .bind(RequestStatus::Pending)
    .fetch_optional(&mut *tx)
    .await?;
    if pending.is_some() {
        return Ok(CreateOutcome::AlreadyPending);
    }

    let inserted = sqlx::query(
        "INSERT INTO enrollment_requests (student_id, course_id, request_date, status)
         VALUES (?,?,?,?)",
    )
    .bind(student_id)
    .bind(course_id)
    .bind(requested_at)
    .bind(RequestStatus::Pending)
    .execute(&mut *tx)
    .await;

    let request_id = match inserted {
        Ok(result) => result.last_insert_id() as i64,
        Err(err) if crate::db::is_unique_violation(&err) => {
            return Ok(CreateOutcome::AlreadyPending);
        }
        Err(err) => return Err(err),
    };

    let request = sqlx::query_as::<_, EnrollmentRequest>(&format!(
        "SELECT {COLUMNS} FROM enrollment_requests WHERE id = ?"
    ))
    .bind(request_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(CreateOutcome::Created(request))
}

fn push_filter(builder: &mut QueryBuilder<'_, MySql>, filter: &RequestFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        builder.push(" AND r.status = ").push_bind(status);
    }
    if let Some(course_id) = filter.course_id {
        builder.push(" AND r.course_id = ").push_bind(course_id);
    }
    if let Some(student_id) = filter.student_id {
        builder.push(" AND r.student_id = ").push_bind(student_id);
    }
    if let Some(instructor_id) = filter.instructor_id {
        builder.push(" AND c.instructor_id = ").push_bind(instructor_id);
    }
}

const VIEW_FROM: &str = "
    FROM enrollment_requests r
    JOIN users u ON u.id = r.student_id
    JOIN courses c ON c.id = r.course_id";

pub(crate) async fn list(
    pool: &MySqlPool,
    filter: &RequestFilter,
    skip: i64,
    limit: i64,
) -> Result<(Vec<RequestView>, i64), sqlx::Error> {
    let mut count = QueryBuilder::<MySql>::new(format!("SELECT COUNT(*) {VIEW_FROM}"));
    push_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut builder = QueryBuilder::<MySql>::new(format!(
        "SELECT r.id, r.student_id, u.username AS student_username,
                u.first_name AS student_first_name, u.last_name AS student_last_name,
                r.course_id, c.code AS course_code, c.name AS course_name,
                r.request_date, r.status, r.processed_date, r.processed_by
         {VIEW_FROM}"
    ));
    push_filter(&mut builder, filter);
    builder
        .push(" ORDER BY r.request_date DESC, r.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(skip);
    let items = builder.build_query_as::<RequestView>().fetch_all(pool).await?;

    Ok((items, total))
}

pub(crate) async fn count_pending(
    pool: &MySqlPool,
    instructor_id: Option<i64>,
) -> Result<i64, sqlx::Error> {
    let filter = RequestFilter {
        status: Some(RequestStatus::Pending),
        instructor_id,
        ..RequestFilter::default()
    };
    let mut count = QueryBuilder::<MySql>::new(format!("SELECT COUNT(*) {VIEW_FROM}"));
    push_filter(&mut count, &filter);
    count.build_query_scalar().fetch_one(pool).await
}

/// Approves or rejects a pending request.
///
/// The request row is locked for the duration of the transaction. A request
/// that is no longer pending is left untouched and reported back with its
/// current status. Approval upserts an active enrollment; either decision
/// notifies the student.
pub(crate) async fn decide(
    pool: &MySqlPool,
    request_id: i64,
    decision: RequestStatus,
    processed_by: i64,
    processed_at: PrimitiveDateTime,
) -> Result<DecisionOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let locked = sqlx::query_as::<_, EnrollmentRequest>(&format!(
        "SELECT {COLUMNS} FROM enrollment_requests WHERE id = ? FOR UPDATE"
    ))
    .bind(request_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(request) = locked else {
        return Ok(DecisionOutcome::NotFound);
    };
    if request.status != RequestStatus::Pending {
        return Ok(DecisionOutcome::AlreadyProcessed(request.status));
    }

    sqlx::query(
        "UPDATE enrollment_requests
         SET status = ?, processed_date = ?, processed_by = ?
         WHERE id = ?",
    )
    .bind(decision)
    .bind(processed_at)
    .bind(processed_by)
    .bind(request_id)
    .execute(&mut *tx)
    .await?;

    if decision == RequestStatus::Approved {
        enrollments::upsert_active(&mut *tx, request.student_id, request.course_id, processed_at)
            .await?;
    }

    let course_code: String = sqlx::query_scalar("SELECT code FROM courses WHERE id = ?")
        .bind(request.course_id)
        .fetch_one(&mut *tx)
        .await?;
    let message = format!("Your enrollment request for {course_code} was {decision}");
    notifications::insert(&mut *tx, request.student_id, &message, processed_at).await?;

    tx.commit().await?;

    Ok(DecisionOutcome::Decided(EnrollmentRequest {
        status: decision,
        processed_date: Some(processed_at),
        processed_by: Some(processed_by),
        ..request
    }))
}

/// Cancels a pending request owned by `student_id`.
pub(crate) async fn cancel(
    pool: &MySqlPool,
    request_id: i64,
    student_id: i64,
    cancelled_at: PrimitiveDateTime,
) -> Result<CancelOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let status = sqlx::query_scalar::<_, RequestStatus>(
        "SELECT status FROM enrollment_requests WHERE id = ? AND student_id = ? FOR UPDATE",
    )
    .bind(request_id)
    .bind(student_id)
    .fetch_optional(&mut *tx)
    .await?;

    match status {
        None => return Ok(CancelOutcome::NotFound),
        Some(RequestStatus::Pending) => {}
        Some(other) => return Ok(CancelOutcome::NotPending(other)),
    }

    sqlx::query("UPDATE enrollment_requests SET status = ?, processed_date = ? WHERE id = ?")
        .bind(RequestStatus::Cancelled)
        .bind(cancelled_at)
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(CancelOutcome::Cancelled)
}

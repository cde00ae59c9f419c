use sqlx::{Executor, MySql, MySqlPool, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Notification;

const COLUMNS: &str = "id, user_id, message, is_read, created_at";

pub(crate) async fn insert<'e, E>(
    executor: E,
    user_id: i64,
    message: &str,
    created_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    sqlx::query(
        "INSERT INTO notifications (user_id, message, is_read, created_at)
         VALUES (?,?,FALSE,?)",
    )
    .bind(user_id)
    .bind(message)
    .bind(created_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Fans one message out to every user in `user_ids` with a single statement.
pub(crate) async fn insert_many<'e, E>(
    executor: E,
    user_ids: &[i64],
    message: &str,
    created_at: PrimitiveDateTime,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    if user_ids.is_empty() {
        return Ok(0);
    }

    let mut builder = QueryBuilder::<MySql>::new(
        "INSERT INTO notifications (user_id, message, is_read, created_at) ",
    );
    builder.push_values(user_ids, |mut row, user_id| {
        row.push_bind(*user_id).push_bind(message).push_bind(false).push_bind(created_at);
    });

    let result = builder.build().execute(executor).await?;
    Ok(result.rows_affected())
}

pub(crate) async fn list_for_user(
    pool: &MySqlPool,
    user_id: i64,
    unread_only: bool,
    skip: i64,
    limit: i64,
) -> Result<(Vec<Notification>, i64), sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND (? = FALSE OR is_read = FALSE)",
    )
    .bind(user_id)
    .bind(unread_only)
    .fetch_one(pool)
    .await?;

    let items = sqlx::query_as::<_, Notification>(&format!(
        "SELECT {COLUMNS} FROM notifications
         WHERE user_id = ? AND (? = FALSE OR is_read = FALSE)
         ORDER BY created_at DESC, id DESC
         LIMIT ? OFFSET ?"
    ))
    .bind(user_id)
    .bind(unread_only)
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await?;

    Ok((items, total))
}

pub(crate) async fn mark_read(
    pool: &MySqlPool,
    notification_id: i64,
    user_id: i64,
) -> Result<bool, sqlx::Error> {
    // MySQL reports zero affected rows for a no-op update, so check existence separately.
    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM notifications WHERE id = ? AND user_id = ?",
    )
    .bind(notification_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    if exists.is_none() {
        return Ok(false);
    }

    sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = ?")
        .bind(notification_id)
        .execute(pool)
        .await?;
    Ok(true)
}

pub(crate) async fn mark_all_read(pool: &MySqlPool, user_id: i64) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = ? AND is_read = FALSE")
            .bind(user_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn count_unread(pool: &MySqlPool, user_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = FALSE")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

use sqlx::MySqlPool;
use time::PrimitiveDateTime;

pub(crate) async fn revoke(
    pool: &MySqlPool,
    jti: &str,
    user_id: i64,
    expires_at: PrimitiveDateTime,
    revoked_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT IGNORE INTO revoked_tokens (jti, user_id, expires_at, revoked_at)
         VALUES (?,?,?,?)",
    )
    .bind(jti)
    .bind(user_id)
    .bind(expires_at)
    .bind(revoked_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn is_revoked(pool: &MySqlPool, jti: &str) -> Result<bool, sqlx::Error> {
    let found = sqlx::query_scalar::<_, i32>("SELECT 1 FROM revoked_tokens WHERE jti = ?")
        .bind(jti)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Rows past their token expiry can never match a live token again.
pub(crate) async fn purge_expired(
    pool: &MySqlPool,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

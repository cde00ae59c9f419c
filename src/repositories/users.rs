use sqlx::{MySql, MySqlPool, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::User;
use crate::db::types::UserRole;

const COLUMNS: &str = "\
    id, username, hashed_password, first_name, last_name, email, role, active, \
    created_at, last_login";

pub(crate) async fn find_by_id(pool: &MySqlPool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_one_by_id(pool: &MySqlPool, id: i64) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn find_by_username(
    pool: &MySqlPool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE username = ?"))
        .bind(username)
        .fetch_optional(pool)
        .await
}

/// Returns the id of a user already holding `username` or `email`.
pub(crate) async fn find_conflicting(
    pool: &MySqlPool,
    username: &str,
    email: &str,
    exclude_id: Option<i64>,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT id FROM users
         WHERE (username = ? OR email = ?) AND (? IS NULL OR id <> ?)
         LIMIT 1",
    )
    .bind(username)
    .bind(email)
    .bind(exclude_id)
    .bind(exclude_id)
    .fetch_optional(pool)
    .await
}

pub(crate) struct CreateUser<'a> {
    pub(crate) username: &'a str,
    pub(crate) hashed_password: String,
    pub(crate) first_name: &'a str,
    pub(crate) last_name: &'a str,
    pub(crate) email: &'a str,
    pub(crate) role: UserRole,
    pub(crate) active: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &MySqlPool, params: CreateUser<'_>) -> Result<User, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO users (
            username, hashed_password, first_name, last_name, email, role, active, created_at
        ) VALUES (?,?,?,?,?,?,?,?)",
    )
    .bind(params.username)
    .bind(params.hashed_password)
    .bind(params.first_name)
    .bind(params.last_name)
    .bind(params.email)
    .bind(params.role)
    .bind(params.active)
    .bind(params.created_at)
    .execute(pool)
    .await?;

    fetch_one_by_id(pool, result.last_insert_id() as i64).await
}

pub(crate) struct UpdateUser {
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) role: Option<UserRole>,
    pub(crate) active: Option<bool>,
    pub(crate) hashed_password: Option<String>,
}

pub(crate) async fn update(
    pool: &MySqlPool,
    id: i64,
    params: UpdateUser,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET
            first_name = COALESCE(?, first_name),
            last_name = COALESCE(?, last_name),
            email = COALESCE(?, email),
            role = COALESCE(?, role),
            active = COALESCE(?, active),
            hashed_password = COALESCE(?, hashed_password)
         WHERE id = ?",
    )
    .bind(params.first_name)
    .bind(params.last_name)
    .bind(params.email)
    .bind(params.role)
    .bind(params.active)
    .bind(params.hashed_password)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn touch_last_login(
    pool: &MySqlPool,
    id: i64,
    at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
        .bind(at)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[derive(Debug, Default)]
pub(crate) struct UserFilter {
    pub(crate) role: Option<UserRole>,
    pub(crate) active: Option<bool>,
    pub(crate) search: Option<String>,
}

fn push_filter<'a>(builder: &mut QueryBuilder<'a, MySql>, filter: &'a UserFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(role) = filter.role {
        builder.push(" AND role = ").push_bind(role);
    }
    if let Some(active) = filter.active {
        builder.push(" AND active = ").push_bind(active);
    }
    if let Some(search) = filter.search.as_deref() {
        let pattern = format!("%{search}%");
        builder
            .push(" AND (username LIKE ")
            .push_bind(pattern.clone())
            .push(" OR email LIKE ")
            .push_bind(pattern.clone())
            .push(" OR CONCAT(first_name, ' ', last_name) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub(crate) async fn list(
    pool: &MySqlPool,
    filter: &UserFilter,
    skip: i64,
    limit: i64,
) -> Result<(Vec<User>, i64), sqlx::Error> {
    let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM users");
    push_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut builder = QueryBuilder::<MySql>::new(format!("SELECT {COLUMNS} FROM users"));
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY id LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(skip);
    let users = builder.build_query_as::<User>().fetch_all(pool).await?;

    Ok((users, total))
}

pub(crate) async fn count_by_role(pool: &MySqlPool) -> Result<Vec<(UserRole, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (UserRole, i64)>(
        "SELECT role, COUNT(*) FROM users WHERE active = TRUE GROUP BY role ORDER BY role",
    )
    .fetch_all(pool)
    .await
}

pub(crate) mod models;
pub(crate) mod types;

use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{ConnectOptions, MySqlPool};

use crate::core::config::Settings;

pub(crate) async fn init_pool(settings: &Settings) -> Result<MySqlPool, sqlx::Error> {
    let database_url = settings.database().database_url();
    let mut connect_options: MySqlConnectOptions = database_url.parse()?;

    connect_options = connect_options
        .charset("utf8mb4")
        .timezone(Some(String::from("+00:00")))
        .log_statements(tracing::log::LevelFilter::Off);

    MySqlPoolOptions::new()
        .max_connections(settings.database().max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .test_before_acquire(true)
        .connect_with(connect_options)
        .await
}

pub(crate) async fn run_migrations(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_error) => db_error.is_unique_violation(),
        _ => false,
    }
}

pub(crate) fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_error) => db_error.is_foreign_key_violation(),
        _ => false,
    }
}

//! Connection pool lifecycle
//!
//! The pool is created once at startup, handed to each request as axum
//! state, and closed after the server stops accepting requests.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;

/// Embedded schema migrations from `migrations/`
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Connects to PostgreSQL using the configured URL and pool size
///
/// # Errors
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn connect(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await
}

/// Applies pending migrations
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Waits for in-flight connections to be returned, then closes the pool
pub async fn shutdown(pool: PgPool) {
    tracing::info!("Closing database pool...");
    pool.close().await;
    tracing::info!("Database pool closed");
}

//! Postgres connection pool and schema migrations.

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::store::StoreError;

/// Connect to Postgres and bring the schema up to date.
///
/// The URL is not logged since it usually carries credentials.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    info!(max_connections, "connecting to database");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| StoreError::Backend(format!("connect: {e}")))?;

    info!("running database migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| StoreError::Backend(format!("migrate: {e}")))?;

    info!("database initialized");
    Ok(pool)
}

use crate::error::DbError;
use dotenvy::dotenv;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::env;
use std::time::Duration;

/// Establishes a connection pool to the PostgreSQL database.
///
/// `DATABASE_URL` may come from the process environment or from a `.env` file
/// in the working directory. The environment wins when both are present.
pub async fn connect() -> Result<PgPool, DbError> {
    // A missing .env file is fine as long as DATABASE_URL is already exported.
    let dotenv_result = dotenv();

    let database_url = env::var("DATABASE_URL").map_err(|_e| {
        let detail = match dotenv_result {
            Err(e) => format!("DATABASE_URL must be set ({e})."),
            Ok(_) => "DATABASE_URL must be set.".to_string(),
        };
        DbError::ConnectionConfigError(detail)
    })?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&database_url)
        .await?;

    tracing::debug!("Database pool established");
    Ok(pool)
}

/// Applies every pending migration under `crates/database/migrations`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

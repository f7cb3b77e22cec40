//! PostgreSQL connection pool management

use gsmgw_core::config::DatabaseConfig;
use gsmgw_core::{AppError, AppResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{info, warn};

/// Connection acquire timeout in seconds
const ACQUIRE_TIMEOUT: u64 = 30;

/// Idle connection timeout in seconds
const IDLE_TIMEOUT: u64 = 600;

/// Create a PostgreSQL connection pool and verify it with a round trip
///
/// # Example
///
/// ```no_run
/// use gsmgw_core::config::DatabaseConfig;
/// use gsmgw_db::create_pool;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: "postgresql://localhost/gsm_gateway".to_string(),
///         max_connections: 5,
///     };
///     let pool = create_pool(&config).await?;
///     Ok(())
/// }
/// ```
pub async fn create_pool(config: &DatabaseConfig) -> AppResult<PgPool> {
    info!("Creating database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT))
        .idle_timeout(Some(Duration::from_secs(IDLE_TIMEOUT)))
        .test_before_acquire(true)
        .connect(&config.url)
        .await
        .map_err(|e| {
            warn!("Failed to create database pool: {}", e);
            AppError::Pool(format!("Failed to connect to database: {}", e))
        })?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(|e| AppError::Database(format!("Database health check failed: {}", e)))?;

    info!(
        "Database pool ready with {} max connections",
        config.max_connections
    );

    Ok(pool)
}

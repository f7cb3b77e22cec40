//! SIM pool membership repository

use async_trait::async_trait;
use gsmgw_core::{models::SimPoolAssignment, traits::SimPoolStore, AppError, AppResult};
use sqlx::PgPool;
use tracing::{error, instrument};

/// PostgreSQL implementation of SimPoolStore
#[derive(Clone)]
pub struct PgSimPoolRepository {
    pool: PgPool,
}

impl PgSimPoolRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SimPoolStore for PgSimPoolRepository {
    #[instrument(skip(self))]
    async fn active_assignments(&self, pool_name: &str) -> AppResult<Vec<SimPoolAssignment>> {
        let rows = sqlx::query_as::<sqlx::Postgres, SimPoolAssignmentRow>(
            r#"
            SELECT pool_name, sim_id, priority, is_active
            FROM sim_pool_assignments
            WHERE pool_name = $1 AND is_active
            ORDER BY priority ASC, sim_id ASC
            "#,
        )
        .bind(pool_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error fetching pool {}: {}", pool_name, e);
            AppError::Database(format!("Failed to fetch SIM pool: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Database row representation
#[derive(Debug, sqlx::FromRow)]
struct SimPoolAssignmentRow {
    pool_name: String,
    sim_id: i64,
    priority: i32,
    is_active: bool,
}

impl From<SimPoolAssignmentRow> for SimPoolAssignment {
    fn from(row: SimPoolAssignmentRow) -> Self {
        Self {
            pool_name: row.pool_name,
            sim_id: row.sim_id,
            priority: row.priority,
            is_active: row.is_active,
        }
    }
}

//! Store traits the engine reads and writes through
//!
//! The relational store itself is an external dependency; these traits are
//! the only surface the ingestion and admission components see. PostgreSQL
//! implementations live in `gsmgw-db`.

use crate::error::AppError;
use crate::models::{BlacklistEntry, CallRecord, RoutingRule, SimPoolAssignment};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persistence sink for finished call records
#[async_trait]
pub trait CallRecordSink: Send + Sync {
    /// Persist one record. Called once per terminating event.
    async fn create(&self, record: &CallRecord) -> Result<(), AppError>;
}

/// Read access to the call record history
#[async_trait]
pub trait CallHistoryStore: Send + Sync {
    /// Calls placed by `number` that ended at or after `since`, newest first
    async fn calls_from(
        &self,
        number: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CallRecord>, AppError>;
}

/// Blacklist lookups
#[async_trait]
pub trait BlacklistStore: Send + Sync {
    /// Most specific currently-active entry covering `number`, if any
    async fn find_active_match(&self, number: &str) -> Result<Option<BlacklistEntry>, AppError>;

    /// Add (or refresh) an auto-detected exact entry for `number`,
    /// bumping its violation counter
    async fn record_auto_detection(
        &self,
        number: &str,
        method: &str,
        reason: &str,
        until: DateTime<Utc>,
    ) -> Result<(), AppError>;
}

/// Routing rule lookups
#[async_trait]
pub trait RoutingRuleStore: Send + Sync {
    /// Active rules whose destination prefix matches `number`, ordered by rank
    async fn rules_matching_prefix(&self, number: &str) -> Result<Vec<RoutingRule>, AppError>;
}

/// SIM pool lookups
#[async_trait]
pub trait SimPoolStore: Send + Sync {
    /// Active assignments of `pool_name`, ordered by priority
    async fn active_assignments(&self, pool_name: &str)
        -> Result<Vec<SimPoolAssignment>, AppError>;
}

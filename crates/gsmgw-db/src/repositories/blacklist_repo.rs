//! Blacklist repository
//!
//! Candidate entries are narrowed in SQL (active, and for exact/prefix
//! entries, covering the number); the final most-specific pick and the
//! wildcard matching happen in Rust so both follow the model's rules.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gsmgw_core::{
    models::{most_specific_match, BlacklistEntry, BlacklistPattern, BlacklistSource},
    normalize_number,
    traits::BlacklistStore,
    AppError, AppResult,
};
use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};

/// Stored value of `source` for manual entries
const SOURCE_MANUAL: &str = "manual";

/// Stored value of `source` for auto-detected entries
const SOURCE_AUTO: &str = "auto";

/// PostgreSQL implementation of BlacklistStore
#[derive(Clone)]
pub struct PgBlacklistRepository {
    pool: PgPool,
}

impl PgBlacklistRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlacklistStore for PgBlacklistRepository {
    #[instrument(skip(self))]
    async fn find_active_match(&self, number: &str) -> AppResult<Option<BlacklistEntry>> {
        let normalized = normalize_number(number);
        if normalized.is_empty() {
            return Ok(None);
        }

        let rows = sqlx::query_as::<sqlx::Postgres, BlacklistRow>(
            r#"
            SELECT
                id, pattern_type, pattern_value,
                block_inbound, block_outbound, reason,
                temporary_until, violation_count,
                source, detection_method, created_at
            FROM blacklist
            WHERE (temporary_until IS NULL OR temporary_until > NOW())
              AND (
                    (pattern_type = 'exact' AND translate(pattern_value, '+ -()', '') = $1)
                 OR (pattern_type = 'prefix'
                     AND left($1, length(translate(pattern_value, '+ -()', '')))
                         = translate(pattern_value, '+ -()', ''))
                 OR pattern_type IN ('wildcard', 'pattern')
              )
            "#,
        )
        .bind(&normalized)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error checking blacklist for {}: {}", number, e);
            AppError::Database(format!("Failed to check blacklist: {}", e))
        })?;

        let entries: Vec<BlacklistEntry> = rows.into_iter().filter_map(into_entry).collect();
        let found = most_specific_match(&entries, &normalized, Utc::now()).cloned();

        if let Some(entry) = &found {
            debug!(
                "Blacklist hit: entry {} ({} {})",
                entry.id,
                entry.pattern.kind(),
                entry.pattern.value()
            );
        }

        Ok(found)
    }

    #[instrument(skip(self, reason))]
    async fn record_auto_detection(
        &self,
        number: &str,
        method: &str,
        reason: &str,
        until: DateTime<Utc>,
    ) -> AppResult<()> {
        let normalized = normalize_number(number);
        if normalized.is_empty() {
            return Err(AppError::InvalidInput(
                "cannot blacklist an empty number".to_string(),
            ));
        }

        // A permanent entry stays permanent; a temporary one is extended.
        // Manual entries keep their reason.
        sqlx::query(
            r#"
            INSERT INTO blacklist (
                pattern_type, pattern_value,
                block_inbound, block_outbound, reason,
                temporary_until, violation_count,
                source, detection_method
            )
            VALUES ('exact', $1, FALSE, TRUE, $2, $3, 1, $4, $5)
            ON CONFLICT (pattern_type, pattern_value) DO UPDATE
            SET violation_count = blacklist.violation_count + 1,
                temporary_until = CASE
                    WHEN blacklist.temporary_until IS NULL THEN NULL
                    ELSE GREATEST(blacklist.temporary_until, EXCLUDED.temporary_until)
                END,
                block_outbound = TRUE,
                reason = CASE
                    WHEN blacklist.source = $4 THEN EXCLUDED.reason
                    ELSE blacklist.reason
                END,
                detection_method = COALESCE(blacklist.detection_method, EXCLUDED.detection_method)
            "#,
        )
        .bind(&normalized)
        .bind(reason)
        .bind(until)
        .bind(SOURCE_AUTO)
        .bind(method)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error recording auto-detection for {}: {}", number, e);
            AppError::Database(format!("Failed to record blacklist entry: {}", e))
        })?;

        info!("🚫 Auto-blacklisted {} until {} ({})", normalized, until, method);
        Ok(())
    }
}

/// Database row representation
#[derive(Debug, sqlx::FromRow)]
struct BlacklistRow {
    id: i64,
    pattern_type: String,
    pattern_value: String,
    block_inbound: bool,
    block_outbound: bool,
    reason: Option<String>,
    temporary_until: Option<DateTime<Utc>>,
    violation_count: i32,
    source: String,
    detection_method: Option<String>,
    created_at: DateTime<Utc>,
}

/// Rows with an unknown pattern type are skipped rather than failing the
/// whole lookup
fn into_entry(row: BlacklistRow) -> Option<BlacklistEntry> {
    let Some(pattern) = BlacklistPattern::from_parts(&row.pattern_type, &row.pattern_value) else {
        warn!(
            "Skipping blacklist entry {} with unknown pattern type {:?}",
            row.id, row.pattern_type
        );
        return None;
    };

    let source = if row.source == SOURCE_MANUAL {
        BlacklistSource::Manual
    } else {
        BlacklistSource::AutoDetected {
            method: row.detection_method.unwrap_or_else(|| row.source.clone()),
        }
    };

    Some(BlacklistEntry {
        id: row.id,
        pattern,
        block_inbound: row.block_inbound,
        block_outbound: row.block_outbound,
        reason: row.reason.unwrap_or_default(),
        temporary_until: row.temporary_until,
        violation_count: row.violation_count,
        source,
        created_at: row.created_at,
    })
}

//! Call record repository
//!
//! Write side for the AMI ingestion path, read side for the spam detector's
//! caller history. The raw event snapshot is stored as JSONB.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gsmgw_core::{
    models::{CallDirection, CallRecord, Disposition},
    traits::{CallHistoryStore, CallRecordSink},
    AppError, AppResult,
};
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::BTreeMap;
use tracing::{debug, error, instrument};

/// PostgreSQL implementation of the call record stores
#[derive(Clone)]
pub struct PgCallRecordRepository {
    pool: PgPool,
}

impl PgCallRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CALL_RECORD_COLUMNS: &str = r#"
    unique_id, channel,
    caller_number, caller_name,
    connected_line_number, connected_line_name,
    destination_number, account_code,
    hangup_cause, hangup_cause_text,
    start_time, answer_time, end_time,
    duration, billsec,
    modem_id, sim_id,
    direction, disposition, is_spam,
    server_id, raw_event
"#;

#[async_trait]
impl CallRecordSink for PgCallRecordRepository {
    #[instrument(skip(self, record), fields(unique_id = %record.unique_id))]
    async fn create(&self, record: &CallRecord) -> AppResult<()> {
        debug!("Inserting call record");

        let query = format!(
            r#"
            INSERT INTO call_records ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                    $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
            "#,
            CALL_RECORD_COLUMNS
        );

        sqlx::query(&query)
            .bind(&record.unique_id)
            .bind(&record.channel)
            .bind(&record.caller_number)
            .bind(&record.caller_name)
            .bind(&record.connected_line_number)
            .bind(&record.connected_line_name)
            .bind(&record.destination_number)
            .bind(&record.account_code)
            .bind(record.hangup_cause)
            .bind(&record.hangup_cause_text)
            .bind(record.start_time)
            .bind(record.answer_time)
            .bind(record.end_time)
            .bind(record.duration)
            .bind(record.billsec)
            .bind(record.modem_id)
            .bind(record.sim_id)
            .bind(record.direction.as_str())
            .bind(record.disposition.as_str())
            .bind(record.is_spam)
            .bind(&record.server_id)
            .bind(Json(&record.raw_event))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error inserting call record: {}", e);
                AppError::Database(format!("Failed to insert call record: {}", e))
            })?;

        Ok(())
    }
}

#[async_trait]
impl CallHistoryStore for PgCallRecordRepository {
    #[instrument(skip(self))]
    async fn calls_from(&self, number: &str, since: DateTime<Utc>) -> AppResult<Vec<CallRecord>> {
        let normalized = gsmgw_core::normalize_number(number);
        if normalized.is_empty() {
            return Ok(Vec::new());
        }

        // translate() strips the same decoration normalize_number does
        let query = format!(
            r#"
            SELECT {}
            FROM call_records
            WHERE translate(caller_number, '+ -()', '') = $1
              AND COALESCE(end_time, start_time, created_at) >= $2
            ORDER BY COALESCE(end_time, start_time, created_at) DESC
            "#,
            CALL_RECORD_COLUMNS
        );

        let rows = sqlx::query_as::<sqlx::Postgres, CallRecordRow>(&query)
            .bind(&normalized)
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error fetching history for {}: {}", number, e);
                AppError::Database(format!("Failed to fetch call history: {}", e))
            })?;

        debug!("Fetched {} history records", rows.len());
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Database row representation
#[derive(Debug, sqlx::FromRow)]
struct CallRecordRow {
    unique_id: String,
    channel: Option<String>,
    caller_number: Option<String>,
    caller_name: Option<String>,
    connected_line_number: Option<String>,
    connected_line_name: Option<String>,
    destination_number: Option<String>,
    account_code: Option<String>,
    hangup_cause: Option<i32>,
    hangup_cause_text: Option<String>,
    start_time: Option<DateTime<Utc>>,
    answer_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    duration: i32,
    billsec: i32,
    modem_id: Option<i64>,
    sim_id: Option<i64>,
    direction: String,
    disposition: String,
    is_spam: bool,
    server_id: String,
    raw_event: Json<BTreeMap<String, String>>,
}

impl From<CallRecordRow> for CallRecord {
    fn from(row: CallRecordRow) -> Self {
        Self {
            unique_id: row.unique_id,
            channel: row.channel,
            caller_number: row.caller_number,
            caller_name: row.caller_name,
            connected_line_number: row.connected_line_number,
            connected_line_name: row.connected_line_name,
            destination_number: row.destination_number,
            account_code: row.account_code,
            hangup_cause: row.hangup_cause,
            hangup_cause_text: row.hangup_cause_text,
            start_time: row.start_time,
            answer_time: row.answer_time,
            end_time: row.end_time,
            duration: row.duration,
            billsec: row.billsec,
            modem_id: row.modem_id,
            sim_id: row.sim_id,
            direction: CallDirection::parse(&row.direction),
            disposition: Disposition::from(row.disposition),
            is_spam: row.is_spam,
            server_id: row.server_id,
            raw_event: row.raw_event.0,
        }
    }
}

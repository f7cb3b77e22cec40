//! Calling-behaviour models
//!
//! `CallPattern` is a derived summary, recomputable at any time from the
//! call record history; `SpamAnalysis` is what the spam detector makes of it.

use crate::models::CallRecord;
use crate::normalize_number;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Rolling summary of one number's calling behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallPattern {
    pub phone_number: String,
    pub total_calls: u32,
    pub calls_last_hour: u32,
    pub calls_last_24h: u32,
    /// Mean call length in seconds
    pub avg_call_duration: f64,
    pub unique_destinations: u32,
    pub last_call_time: Option<DateTime<Utc>>,
}

impl CallPattern {
    /// Empty pattern for a number with no history
    pub fn empty(phone_number: &str) -> Self {
        Self {
            phone_number: phone_number.to_string(),
            total_calls: 0,
            calls_last_hour: 0,
            calls_last_24h: 0,
            avg_call_duration: 0.0,
            unique_destinations: 0,
            last_call_time: None,
        }
    }

    /// Recompute the summary from the calls `phone_number` placed.
    ///
    /// Records placed by other numbers are ignored. Records without any
    /// timestamp count towards the totals but not towards the windows.
    pub fn from_history(phone_number: &str, history: &[CallRecord], now: DateTime<Utc>) -> Self {
        let hour_ago = now - Duration::hours(1);
        let day_ago = now - Duration::hours(24);

        let mut pattern = Self::empty(phone_number);
        let mut total_duration: i64 = 0;
        let mut destinations = HashSet::new();

        for record in history.iter().filter(|r| r.is_placed_by(phone_number)) {
            pattern.total_calls += 1;
            total_duration += i64::from(record.duration.max(0));

            if let Some(dest) = record.destination_number.as_deref() {
                let dest = normalize_number(dest);
                if !dest.is_empty() {
                    destinations.insert(dest);
                }
            }

            if let Some(at) = record.occurred_at() {
                if at > hour_ago && at <= now {
                    pattern.calls_last_hour += 1;
                }
                if at > day_ago && at <= now {
                    pattern.calls_last_24h += 1;
                }
                if pattern.last_call_time.map_or(true, |last| at > last) {
                    pattern.last_call_time = Some(at);
                }
            }
        }

        if pattern.total_calls > 0 {
            pattern.avg_call_duration = total_duration as f64 / f64::from(pattern.total_calls);
        }
        pattern.unique_destinations = destinations.len() as u32;

        pattern
    }
}

/// What to do with a caller, by spam score tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpamAction {
    Allow,
    /// Monetization redirect to the AI answering service, not a rejection
    RouteToAi,
    Block,
}

impl SpamAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpamAction::Allow => "allow",
            SpamAction::RouteToAi => "route_to_ai",
            SpamAction::Block => "block",
        }
    }
}

impl fmt::Display for SpamAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spam verdict for one number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpamAnalysis {
    pub phone_number: String,
    pub is_spam: bool,
    /// Additive heuristic score (not normalized)
    pub confidence: Decimal,
    pub reasons: Vec<String>,
    pub action: SpamAction,
}

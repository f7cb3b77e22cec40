//! Spam pattern detection
//!
//! `SpamAnalyzer` is pure: given a number, its rolling `CallPattern`, the
//! raw history and a reference instant, it adds up heuristic weights and
//! maps the total onto an action tier. `SpamDetector` feeds it from a
//! `CallHistoryStore`.

use crate::constants::*;
use chrono::{DateTime, Duration, FixedOffset, Local, Timelike, Utc};
use gsmgw_core::{
    models::{CallPattern, CallRecord, SpamAction, SpamAnalysis},
    normalize_number,
    traits::CallHistoryStore,
    AppResult,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Heuristic spam scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct SpamAnalyzer {
    /// Offset used for the business-hours check; None = host local time
    utc_offset: Option<FixedOffset>,
}

impl SpamAnalyzer {
    pub fn new(utc_offset: Option<FixedOffset>) -> Self {
        Self { utc_offset }
    }

    /// Build from a configured offset in minutes east of UTC. Out-of-range
    /// values fall back to host local time.
    pub fn from_offset_minutes(minutes: Option<i32>) -> Self {
        Self::new(minutes.and_then(|m| FixedOffset::east_opt(m.saturating_mul(60))))
    }

    pub fn analyze(
        &self,
        phone_number: &str,
        pattern: &CallPattern,
        history: &[CallRecord],
    ) -> SpamAnalysis {
        self.analyze_at(phone_number, pattern, history, Utc::now())
    }

    /// Score `phone_number` as of `now`
    pub fn analyze_at(
        &self,
        phone_number: &str,
        pattern: &CallPattern,
        history: &[CallRecord],
        now: DateTime<Utc>,
    ) -> SpamAnalysis {
        let mut score = Decimal::ZERO;
        let mut reasons = Vec::new();

        if has_suspicious_digits(phone_number) {
            score += SEQUENTIAL_DIGITS_WEIGHT;
            reasons.push("sequential or repeated digits".to_string());
        }

        if pattern.calls_last_hour > HIGH_FREQUENCY_CALLS_PER_HOUR {
            score += HIGH_FREQUENCY_WEIGHT;
            reasons.push(format!(
                "high call frequency ({} calls in last hour)",
                pattern.calls_last_hour
            ));
        }

        if pattern.avg_call_duration < SHORT_CALL_SECONDS
            && pattern.total_calls > SHORT_CALLS_MIN_TOTAL
        {
            score += SHORT_CALLS_WEIGHT;
            reasons.push(format!(
                "short calls (avg {:.1}s over {} calls)",
                pattern.avg_call_duration, pattern.total_calls
            ));
        }

        if pattern.unique_destinations > FAN_OUT_DESTINATIONS
            && pattern.calls_last_24h > FAN_OUT_CALLS_24H
        {
            score += FAN_OUT_WEIGHT;
            reasons.push(format!(
                "destination fan-out ({} destinations, {} calls in 24h)",
                pattern.unique_destinations, pattern.calls_last_24h
            ));
        }

        if pattern.calls_last_24h > OFF_HOURS_CALLS_24H {
            if let Some(last) = pattern.last_call_time {
                if !self.is_business_hours(last) {
                    score += OFF_HOURS_WEIGHT;
                    reasons.push("calling outside business hours".to_string());
                }
            }
        }

        if let Some((destination, calls)) = most_repeated_target(phone_number, history, now) {
            if calls > REPEAT_TARGET_CALLS {
                score += REPETITIVE_TARGET_WEIGHT;
                reasons.push(format!(
                    "repetitive target ({} called {} times in 24h)",
                    destination, calls
                ));
            }
        }

        let action = action_for(score);
        debug!(
            "Spam score for {}: {} → {} ({} signals)",
            phone_number,
            score,
            action,
            reasons.len()
        );

        SpamAnalysis {
            phone_number: phone_number.to_string(),
            is_spam: action != SpamAction::Allow,
            confidence: score,
            reasons,
            action,
        }
    }

    fn is_business_hours(&self, at: DateTime<Utc>) -> bool {
        let hour = match self.utc_offset {
            Some(offset) => at.with_timezone(&offset).hour(),
            None => at.with_timezone(&Local).hour(),
        };
        (BUSINESS_HOURS_START..BUSINESS_HOURS_END).contains(&hour)
    }
}

/// Map a score onto its action tier
pub fn action_for(score: Decimal) -> SpamAction {
    if score > BLOCK_THRESHOLD {
        SpamAction::Block
    } else if score >= REDIRECT_THRESHOLD {
        SpamAction::RouteToAi
    } else {
        SpamAction::Allow
    }
}

/// Digit-shape heuristic over the last [`DIGIT_WINDOW`] digits:
/// an ascending run such as `1234`, four or more identical digits in a row,
/// or an `ABAB` / `AABB` group anywhere in the window.
pub fn has_suspicious_digits(phone_number: &str) -> bool {
    let digits: Vec<u32> = phone_number.chars().filter_map(|c| c.to_digit(10)).collect();
    let tail = &digits[digits.len().saturating_sub(DIGIT_WINDOW)..];

    let mut ascending_steps = 0;
    let mut identical_run = 1;
    for pair in tail.windows(2) {
        if pair[1] == pair[0] + 1 {
            ascending_steps += 1;
            if ascending_steps >= 3 {
                return true;
            }
        } else {
            ascending_steps = 0;
        }

        if pair[1] == pair[0] {
            identical_run += 1;
            if identical_run >= 4 {
                return true;
            }
        } else {
            identical_run = 1;
        }
    }

    tail.windows(4).any(|quad| {
        let (a, b, c, d) = (quad[0], quad[1], quad[2], quad[3]);
        let abab = a == c && b == d && a != b;
        let aabb = a == b && c == d && a != c;
        abab || aabb
    })
}

/// Destination `phone_number` called most often in the 24 h before `now`
fn most_repeated_target(
    phone_number: &str,
    history: &[CallRecord],
    now: DateTime<Utc>,
) -> Option<(String, usize)> {
    let since = now - Duration::hours(HISTORY_WINDOW_HOURS);
    let mut counts: HashMap<String, usize> = HashMap::new();

    for record in history.iter().filter(|r| r.is_placed_by(phone_number)) {
        let in_window = record
            .occurred_at()
            .map_or(false, |at| at > since && at <= now);
        if !in_window {
            continue;
        }
        if let Some(dest) = record.destination_number.as_deref().map(normalize_number) {
            if !dest.is_empty() {
                *counts.entry(dest).or_default() += 1;
            }
        }
    }

    counts.into_iter().max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
}

/// Scores a number from its stored call history
pub struct SpamDetector {
    history: Arc<dyn CallHistoryStore>,
    analyzer: SpamAnalyzer,
}

impl SpamDetector {
    pub fn new(history: Arc<dyn CallHistoryStore>, analyzer: SpamAnalyzer) -> Self {
        Self { history, analyzer }
    }

    /// Fetch the trailing window of calls placed by `phone_number` and score it
    #[instrument(skip(self))]
    pub async fn check(&self, phone_number: &str) -> AppResult<SpamAnalysis> {
        let now = Utc::now();
        let since = now - Duration::hours(HISTORY_WINDOW_HOURS);

        let history = self.history.calls_from(phone_number, since).await?;
        let pattern = CallPattern::from_history(phone_number, &history, now);

        Ok(self.analyzer.analyze_at(phone_number, &pattern, &history, now))
    }
}

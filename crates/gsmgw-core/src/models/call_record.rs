//! Call Record model
//!
//! Normalized call-detail record built from one terminating switch event.

use crate::normalize_number;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Call direction as declared by the dialplan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    Inbound,
    Outbound,
    Unknown,
}

impl CallDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallDirection::Inbound => "inbound",
            CallDirection::Outbound => "outbound",
            CallDirection::Unknown => "unknown",
        }
    }

    /// Case-insensitive parse; anything unrecognised is `Unknown`
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "inbound" => CallDirection::Inbound,
            "outbound" => CallDirection::Outbound,
            _ => CallDirection::Unknown,
        }
    }
}

impl fmt::Display for CallDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final outcome classification of a call
///
/// `Other` carries the switch's cause text verbatim when no accounting flag
/// was available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Disposition {
    Answered,
    NoAnswer,
    Busy,
    Failed,
    Other(String),
}

impl Disposition {
    pub fn as_str(&self) -> &str {
        match self {
            Disposition::Answered => "ANSWERED",
            Disposition::NoAnswer => "NO ANSWER",
            Disposition::Busy => "BUSY",
            Disposition::Failed => "FAILED",
            Disposition::Other(text) => text,
        }
    }
}

impl From<String> for Disposition {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ANSWERED" => Disposition::Answered,
            "NO ANSWER" => Disposition::NoAnswer,
            "BUSY" => Disposition::Busy,
            "FAILED" => Disposition::Failed,
            _ => Disposition::Other(value),
        }
    }
}

impl From<Disposition> for String {
    fn from(value: Disposition) -> Self {
        match value {
            Disposition::Other(text) => text,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Call Detail Record
///
/// Created once per terminating event and never mutated afterwards; the
/// persistence layer owns it after the write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Switch-assigned unique id of the call leg
    pub unique_id: String,

    /// Channel name, e.g. `Dongle/dongle0-0100000000`
    pub channel: Option<String>,

    /// Caller number (CLI)
    pub caller_number: Option<String>,

    /// Caller name
    pub caller_name: Option<String>,

    /// Connected-line number
    pub connected_line_number: Option<String>,

    /// Connected-line name
    pub connected_line_name: Option<String>,

    /// Dialled extension / destination number
    pub destination_number: Option<String>,

    /// Account code set by the dialplan
    pub account_code: Option<String>,

    /// Q.850 hangup cause code
    pub hangup_cause: Option<i32>,

    /// Hangup cause text
    pub hangup_cause_text: Option<String>,

    /// Call start timestamp
    pub start_time: Option<DateTime<Utc>>,

    /// Call answer timestamp (None if not answered or not reported)
    pub answer_time: Option<DateTime<Utc>>,

    /// Call end timestamp
    pub end_time: Option<DateTime<Utc>>,

    /// Total call duration in seconds
    pub duration: i32,

    /// Billable duration in seconds
    pub billsec: i32,

    /// GSM modem that carried the call, best-effort
    pub modem_id: Option<i64>,

    /// SIM that carried the call, best-effort
    pub sim_id: Option<i64>,

    /// Call direction
    pub direction: CallDirection,

    /// Final disposition
    pub disposition: Disposition,

    /// Marked as spam by the dialplan
    pub is_spam: bool,

    /// Switch connection that produced the record
    pub server_id: String,

    /// Every field of the source event, verbatim
    pub raw_event: BTreeMap<String, String>,
}

impl CallRecord {
    /// Whether any of the three timestamps is missing
    pub fn is_timing_incomplete(&self) -> bool {
        self.start_time.is_none() || self.answer_time.is_none() || self.end_time.is_none()
    }

    /// Reference instant for history windows: end, else start
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.end_time.or(self.start_time)
    }

    /// Whether `number` is this record's caller (decoration-insensitive)
    pub fn is_placed_by(&self, number: &str) -> bool {
        let number = normalize_number(number);
        self.caller_number
            .as_deref()
            .map_or(false, |caller| !number.is_empty() && normalize_number(caller) == number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CallRecord {
        CallRecord {
            unique_id: "1700000000.42".to_string(),
            channel: Some("Dongle/dongle0-0100000000".to_string()),
            caller_number: Some("51999888777".to_string()),
            caller_name: None,
            connected_line_number: None,
            connected_line_name: None,
            destination_number: Some("2341234567".to_string()),
            account_code: None,
            hangup_cause: Some(16),
            hangup_cause_text: Some("Normal Clearing".to_string()),
            start_time: None,
            answer_time: None,
            end_time: None,
            duration: 125,
            billsec: 120,
            modem_id: Some(7),
            sim_id: None,
            direction: CallDirection::Outbound,
            disposition: Disposition::Answered,
            is_spam: false,
            server_id: "bank-a".to_string(),
            raw_event: BTreeMap::new(),
        }
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(CallDirection::parse("INBOUND"), CallDirection::Inbound);
        assert_eq!(CallDirection::parse(" Outbound "), CallDirection::Outbound);
        assert_eq!(CallDirection::parse("sideways"), CallDirection::Unknown);
        assert_eq!(CallDirection::parse(""), CallDirection::Unknown);
    }

    #[test]
    fn test_disposition_string_conversion() {
        assert_eq!(Disposition::from("NO ANSWER".to_string()), Disposition::NoAnswer);
        assert_eq!(
            Disposition::from("NORMAL_CLEARING".to_string()),
            Disposition::Other("NORMAL_CLEARING".to_string())
        );
        assert_eq!(String::from(Disposition::Busy), "BUSY");
    }

    #[test]
    fn test_disposition_serializes_as_plain_string() {
        let json = serde_json::to_string(&Disposition::NoAnswer).unwrap();
        assert_eq!(json, "\"NO ANSWER\"");

        let parsed: Disposition = serde_json::from_str("\"USER_BUSY\"").unwrap();
        assert_eq!(parsed, Disposition::Other("USER_BUSY".to_string()));
    }

    #[test]
    fn test_timing_incomplete() {
        let mut cdr = record();
        assert!(cdr.is_timing_incomplete());

        let now = Utc::now();
        cdr.start_time = Some(now);
        cdr.answer_time = Some(now);
        cdr.end_time = Some(now);
        assert!(!cdr.is_timing_incomplete());
        assert_eq!(cdr.occurred_at(), Some(now));
    }

    #[test]
    fn test_is_placed_by() {
        let cdr = record();
        assert!(cdr.is_placed_by("+51 999 888 777"));
        assert!(!cdr.is_placed_by("51999888778"));
        assert!(!cdr.is_placed_by(""));
    }
}

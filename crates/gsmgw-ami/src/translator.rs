//! Event to Call Record translation
//!
//! Stateless and I/O-free. Every extraction is best-effort: a malformed
//! field leaves the matching record field empty (with a warning) instead of
//! rejecting the whole event. The only hard requirement is a unique id.

use crate::channel::device_token;
use crate::event::AmiEvent;
use chrono::{DateTime, Utc};
use gsmgw_core::models::{CallDirection, CallRecord, Disposition};
use tracing::warn;

/// Placeholder AMI reports for unset caller/connected-line fields
const UNKNOWN_PLACEHOLDER: &str = "<unknown>";

/// Event field names
pub mod fields {
    pub const UNIQUE_ID: &str = "Uniqueid";
    pub const CHANNEL: &str = "Channel";
    pub const CALLER_ID_NUM: &str = "CallerIDNum";
    pub const CALLER_ID_NAME: &str = "CallerIDName";
    pub const CONNECTED_LINE_NUM: &str = "ConnectedLineNum";
    pub const CONNECTED_LINE_NAME: &str = "ConnectedLineName";
    pub const EXTEN: &str = "Exten";
    pub const ACCOUNT_CODE: &str = "AccountCode";
    pub const CAUSE: &str = "Cause";
    pub const CAUSE_TXT: &str = "Cause-txt";
    pub const TIMESTAMP: &str = "Timestamp";
}

/// Channel variables set by the dialplan
pub mod variables {
    pub const MODEM_ID: &str = "MODEM_ID";
    pub const DONGLENAME: &str = "DONGLENAME";
    pub const SIM_ID: &str = "SIM_ID";
    pub const SIMID: &str = "SIMID";
    pub const CALL_START: &str = "CALL_START";
    pub const CALL_ANSWER: &str = "CALL_ANSWER";
    pub const CDR_DURATION: &str = "CDR(duration)";
    pub const CDR_BILLSEC: &str = "CDR(billsec)";
    pub const DISPOSITION_CODE: &str = "DISPOSITION_CODE";
    pub const CALL_DIRECTION: &str = "CALL_DIRECTION";
    pub const SPAM_FLAG: &str = "SPAM_FLAG";
}

/// Build a `CallRecord` from one terminating event.
///
/// Returns None only when the event carries no unique id.
pub fn translate(event: &AmiEvent, server_id: &str) -> Option<CallRecord> {
    let unique_id = match event.field(fields::UNIQUE_ID).map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            warn!(server_id, "Dropping {} without {}", event, fields::UNIQUE_ID);
            return None;
        }
    };

    let end_time = timestamp(fields::TIMESTAMP, present(event.field(fields::TIMESTAMP)));
    let start_time = timestamp(
        variables::CALL_START,
        present(event.variable(variables::CALL_START)),
    );
    let answer_time = timestamp(
        variables::CALL_ANSWER,
        present(event.variable(variables::CALL_ANSWER)),
    );

    let duration = seconds(event, variables::CDR_DURATION)
        .or_else(|| elapsed(start_time, end_time))
        .unwrap_or(0);
    let billsec = seconds(event, variables::CDR_BILLSEC)
        .or_else(|| elapsed(answer_time, end_time))
        .unwrap_or(0);

    let hangup_cause_text = text(event, fields::CAUSE_TXT);

    Some(CallRecord {
        channel: text(event, fields::CHANNEL),
        caller_number: text(event, fields::CALLER_ID_NUM),
        caller_name: text(event, fields::CALLER_ID_NAME),
        connected_line_number: text(event, fields::CONNECTED_LINE_NUM),
        connected_line_name: text(event, fields::CONNECTED_LINE_NAME),
        destination_number: text(event, fields::EXTEN),
        account_code: text(event, fields::ACCOUNT_CODE),
        hangup_cause: present(event.field(fields::CAUSE))
            .and_then(|raw| parse_logged::<i32>(&unique_id, fields::CAUSE, raw)),
        disposition: disposition(event, event.field(fields::CAUSE_TXT)),
        hangup_cause_text,
        start_time,
        answer_time,
        end_time,
        duration,
        billsec,
        modem_id: modem_id(event, &unique_id),
        sim_id: sim_id(event, &unique_id),
        direction: present(event.variable(variables::CALL_DIRECTION))
            .map_or(CallDirection::Unknown, CallDirection::parse),
        is_spam: present(event.variable(variables::SPAM_FLAG)).map_or(false, is_truthy),
        server_id: server_id.to_string(),
        raw_event: event.fields().clone(),
        unique_id,
    })
}

/// Modem id by strict precedence: `MODEM_ID`, then `DONGLENAME`, then the
/// channel's device token. The first present source decides; if its value
/// is not numeric the result is None without consulting the others.
pub fn modem_id(event: &AmiEvent, unique_id: &str) -> Option<i64> {
    let (source, raw) = if let Some(raw) = present(event.variable(variables::MODEM_ID)) {
        (variables::MODEM_ID, raw)
    } else if let Some(raw) = present(event.variable(variables::DONGLENAME)) {
        (variables::DONGLENAME, raw)
    } else if let Some(raw) = present(event.field(fields::CHANNEL)).and_then(device_token) {
        (fields::CHANNEL, raw)
    } else {
        return None;
    };

    parse_logged(unique_id, source, raw)
}

/// SIM id from `SIM_ID`, then `SIMID`
pub fn sim_id(event: &AmiEvent, unique_id: &str) -> Option<i64> {
    let (source, raw) = if let Some(raw) = present(event.variable(variables::SIM_ID)) {
        (variables::SIM_ID, raw)
    } else if let Some(raw) = present(event.variable(variables::SIMID)) {
        (variables::SIMID, raw)
    } else {
        return None;
    };

    parse_logged(unique_id, source, raw)
}

/// `DISPOSITION_CODE` 1/2/3, else the cause text verbatim, else `FAILED`
pub fn disposition(event: &AmiEvent, cause_text: Option<&str>) -> Disposition {
    match present(event.variable(variables::DISPOSITION_CODE)) {
        Some("1") => Disposition::Answered,
        Some("2") => Disposition::NoAnswer,
        Some("3") => Disposition::Busy,
        _ => match cause_text {
            Some(text) if !text.is_empty() => Disposition::Other(text.to_string()),
            _ => Disposition::Failed,
        },
    }
}

/// Unix epoch seconds, integer or fractional. Non-positive values are
/// treated as unset.
pub fn parse_epoch(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return (secs > 0).then(|| DateTime::from_timestamp(secs, 0)).flatten();
    }

    let value = raw.parse::<f64>().ok().filter(|v| v.is_finite())?;
    if value <= 0.0 {
        return None;
    }
    let secs = value.trunc() as i64;
    let nanos = ((value - value.trunc()) * 1_000_000_000.0).round() as u32;
    DateTime::from_timestamp(secs, nanos.min(999_999_999))
}

fn timestamp(source: &str, raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    if let Some(at) = parse_epoch(raw) {
        return Some(at);
    }
    if raw.trim().parse::<f64>().is_err() {
        warn!("Unparsable {} timestamp: {:?}", source, raw);
    }
    None
}

fn seconds(event: &AmiEvent, variable: &str) -> Option<i32> {
    present(event.variable(variable))?
        .parse::<i32>()
        .ok()
        .filter(|secs| *secs >= 0)
}

fn elapsed(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Option<i32> {
    let secs = (to? - from?).num_seconds().max(0);
    Some(i32::try_from(secs).unwrap_or(i32::MAX))
}

fn is_truthy(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

/// Trimmed, non-empty, not the `<unknown>` placeholder
fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty() && *v != UNKNOWN_PLACEHOLDER)
}

fn text(event: &AmiEvent, name: &str) -> Option<String> {
    present(event.field(name)).map(str::to_string)
}

fn parse_logged<T: std::str::FromStr>(unique_id: &str, source: &str, raw: &str) -> Option<T> {
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(unique_id, "Non-numeric {} value {:?}; leaving it unset", source, raw);
            None
        }
    }
}

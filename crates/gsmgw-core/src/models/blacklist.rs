//! Blacklist model
//!
//! Numbers, prefixes or wildcard patterns that must not place or receive
//! calls through the gateway bank.

use crate::models::CallDirection;
use crate::normalize_number;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a blacklist entry matches against
///
/// Wildcard grammar: `*` matches any run of characters (possibly empty),
/// `?` matches exactly one character, everything else is literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum BlacklistPattern {
    Exact(String),
    Prefix(String),
    Wildcard(String),
}

impl BlacklistPattern {
    /// Build a pattern from the `(type, value)` pair stores keep on disk
    pub fn from_parts(kind: &str, value: &str) -> Option<Self> {
        match kind.to_lowercase().as_str() {
            "exact" => Some(BlacklistPattern::Exact(value.to_string())),
            "prefix" => Some(BlacklistPattern::Prefix(value.to_string())),
            "wildcard" | "pattern" => Some(BlacklistPattern::Wildcard(value.to_string())),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BlacklistPattern::Exact(_) => "exact",
            BlacklistPattern::Prefix(_) => "prefix",
            BlacklistPattern::Wildcard(_) => "wildcard",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            BlacklistPattern::Exact(v)
            | BlacklistPattern::Prefix(v)
            | BlacklistPattern::Wildcard(v) => v,
        }
    }

    /// Check whether `number` is covered by this pattern
    pub fn matches(&self, number: &str) -> bool {
        let number = normalize_number(number);
        match self {
            BlacklistPattern::Exact(value) => matches_exact(value, &number),
            BlacklistPattern::Prefix(prefix) => matches_prefix(prefix, &number),
            BlacklistPattern::Wildcard(pattern) => matches_wildcard(pattern, &number),
        }
    }

    /// Ranking key for "most specific match": exact beats prefix beats
    /// wildcard; within a kind, more literal characters win.
    pub fn specificity(&self) -> (u8, usize) {
        match self {
            BlacklistPattern::Exact(v) => (2, normalize_number(v).len()),
            BlacklistPattern::Prefix(v) => (1, normalize_number(v).len()),
            BlacklistPattern::Wildcard(v) => {
                let literals = normalize_number(v)
                    .chars()
                    .filter(|c| !matches!(c, '*' | '?'))
                    .count();
                (0, literals)
            }
        }
    }
}

fn matches_exact(value: &str, number: &str) -> bool {
    !number.is_empty() && normalize_number(value) == number
}

fn matches_prefix(prefix: &str, number: &str) -> bool {
    let prefix = normalize_number(prefix);
    !prefix.is_empty() && number.starts_with(&prefix)
}

fn matches_wildcard(pattern: &str, number: &str) -> bool {
    let pattern: Vec<char> = normalize_number(pattern).chars().collect();
    let text: Vec<char> = number.chars().collect();

    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut star_t = 0usize;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            star_t = t;
            p += 1;
        } else if let Some(s) = star {
            // backtrack: let the last star swallow one more character
            p = s + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }

    p == pattern.len() && !pattern.is_empty()
}

/// How the entry got onto the list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum BlacklistSource {
    Manual,
    AutoDetected { method: String },
}

/// Blacklist entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub id: i64,
    pub pattern: BlacklistPattern,
    pub block_inbound: bool,
    pub block_outbound: bool,
    pub reason: String,
    /// None = permanent
    pub temporary_until: Option<DateTime<Utc>>,
    pub violation_count: i32,
    pub source: BlacklistSource,
    pub created_at: DateTime<Utc>,
}

impl BlacklistEntry {
    /// An entry whose `temporary_until` has passed is inert
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.temporary_until.map_or(true, |until| until > now)
    }

    /// Active and covering `number`
    pub fn matches_at(&self, number: &str, now: DateTime<Utc>) -> bool {
        self.is_active_at(now) && self.pattern.matches(number)
    }

    /// Active and blocking calls in `direction`
    pub fn blocks_at(&self, direction: CallDirection, now: DateTime<Utc>) -> bool {
        if !self.is_active_at(now) {
            return false;
        }
        match direction {
            CallDirection::Inbound => self.block_inbound,
            CallDirection::Outbound => self.block_outbound,
            CallDirection::Unknown => false,
        }
    }
}

/// Pick the most specific active entry covering `number`
pub fn most_specific_match<'a, I>(
    entries: I,
    number: &str,
    now: DateTime<Utc>,
) -> Option<&'a BlacklistEntry>
where
    I: IntoIterator<Item = &'a BlacklistEntry>,
{
    entries
        .into_iter()
        .filter(|entry| entry.matches_at(number, now))
        .max_by_key(|entry| entry.pattern.specificity())
}

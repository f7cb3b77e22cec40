//! Routing models
//!
//! Routing rules, SIM pool membership and the decision value the admission
//! pipeline hands back for every call attempt.

use crate::models::blacklist::BlacklistPattern;
use crate::normalize_number;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where a matched rule sends the call: exactly one SIM or one named pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum RouteTarget {
    Sim(i64),
    Pool(String),
}

/// Routing rule
///
/// Rules are evaluated in ascending `rank`; the first applicable one wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    pub id: i64,
    pub name: String,
    pub rank: i32,
    pub destination_prefix: String,
    /// Optional caller-id pattern, same grammar as wildcard blacklist entries
    pub caller_id_pattern: Option<String>,
    /// Customers allowed to use this rule; empty = everyone
    pub allowed_customer_ids: Vec<i64>,
    pub target: RouteTarget,
    pub cost_markup_percent: Decimal,
    pub is_active: bool,
}

impl RoutingRule {
    /// Destination starts with this rule's prefix
    pub fn matches_destination(&self, destination: &str) -> bool {
        normalize_number(destination).starts_with(&normalize_number(&self.destination_prefix))
    }

    /// Caller satisfies the optional caller-id pattern
    pub fn matches_caller(&self, caller: &str) -> bool {
        match self.caller_id_pattern.as_deref() {
            None | Some("") => true,
            Some(pattern) => BlacklistPattern::Wildcard(pattern.to_string()).matches(caller),
        }
    }

    /// Customer restriction check; an anonymous caller never satisfies a
    /// non-empty allow-list
    pub fn allows_customer(&self, customer_id: Option<i64>) -> bool {
        if self.allowed_customer_ids.is_empty() {
            return true;
        }
        customer_id.map_or(false, |id| self.allowed_customer_ids.contains(&id))
    }
}

/// SIM membership in a named pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimPoolAssignment {
    pub pool_name: String,
    pub sim_id: i64,
    /// Lower value = preferred
    pub priority: i32,
    pub is_active: bool,
}

/// Outcome of one admission decision
///
/// Never persisted by the engine itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRoutingResult {
    pub success: bool,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sim_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_markup_percent: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error text for a destination no rule applies to
pub const NO_ROUTING_RULE: &str = "no routing rule found";

impl CallRoutingResult {
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            blocked: true,
            block_reason: Some(reason.into()),
            sim_id: None,
            rule_id: None,
            cost_markup_percent: None,
            error: None,
        }
    }

    /// Not blocked, not routed
    pub fn lookup_failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            blocked: false,
            block_reason: None,
            sim_id: None,
            rule_id: None,
            cost_markup_percent: None,
            error: Some(message.into()),
        }
    }

    pub fn no_route() -> Self {
        Self::lookup_failed(NO_ROUTING_RULE)
    }

    pub fn routed(sim_id: i64, rule: &RoutingRule) -> Self {
        Self {
            success: true,
            blocked: false,
            block_reason: None,
            sim_id: Some(sim_id),
            rule_id: Some(rule.id),
            cost_markup_percent: Some(rule.cost_markup_percent),
            error: None,
        }
    }
}

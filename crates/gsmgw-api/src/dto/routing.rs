//! Call admission DTOs

use super::common::deserialize_optional_id;
use gsmgw_core::models::CallRoutingResult;
use gsmgw_services::ScreeningDecision;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fmt;
use validator::Validate;

/// One call attempt to admit, as a JSON body or as query parameters
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RouteRequest {
    /// Calling number (CLI)
    #[validate(length(min = 1, max = 32, message = "Caller is required"))]
    pub caller: String,

    /// Dialled number
    #[validate(length(min = 1, max = 32, message = "Destination is required"))]
    pub destination: String,

    /// Customer placing the call, for customer-restricted rules
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    #[validate(range(min = 1))]
    pub customer_id: Option<i64>,
}

/// Plain-text verdict for dialplan `CURL()` lookups
///
/// Fields are `|`-separated so the dialplan can split them with `CUT()`:
/// - `ROUTE|sim_id|rule_id|markup`
/// - `REDIRECT|sim_id|rule_id|markup` (spam redirect to the AI service)
/// - `BLOCKED|reason`
/// - `NOROUTE|message`
#[derive(Debug, Clone, PartialEq)]
pub enum DialplanReply {
    Route {
        sim_id: i64,
        rule_id: i64,
        markup: Decimal,
    },
    Redirect {
        sim_id: i64,
        rule_id: i64,
        markup: Decimal,
    },
    Blocked(String),
    NoRoute(String),
}

impl DialplanReply {
    pub fn from_routing(routing: &CallRoutingResult, redirect: bool) -> Self {
        if routing.blocked {
            return DialplanReply::Blocked(routing.block_reason.clone().unwrap_or_default());
        }

        match (routing.success, routing.sim_id, routing.rule_id) {
            (true, Some(sim_id), Some(rule_id)) => {
                let markup = routing.cost_markup_percent.unwrap_or_default();
                if redirect {
                    DialplanReply::Redirect {
                        sim_id,
                        rule_id,
                        markup,
                    }
                } else {
                    DialplanReply::Route {
                        sim_id,
                        rule_id,
                        markup,
                    }
                }
            }
            _ => DialplanReply::NoRoute(routing.error.clone().unwrap_or_default()),
        }
    }
}

impl From<&ScreeningDecision> for DialplanReply {
    fn from(decision: &ScreeningDecision) -> Self {
        DialplanReply::from_routing(&decision.routing, decision.redirect)
    }
}

/// Keeps free text on a single dialplan field
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '|' | '\r' | '\n' => ' ',
            c => c,
        })
        .collect()
}

impl fmt::Display for DialplanReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialplanReply::Route {
                sim_id,
                rule_id,
                markup,
            } => write!(f, "ROUTE|{}|{}|{}", sim_id, rule_id, markup),
            DialplanReply::Redirect {
                sim_id,
                rule_id,
                markup,
            } => write!(f, "REDIRECT|{}|{}|{}", sim_id, rule_id, markup),
            DialplanReply::Blocked(reason) => write!(f, "BLOCKED|{}", sanitize(reason)),
            DialplanReply::NoRoute(message) => write!(f, "NOROUTE|{}", sanitize(message)),
        }
    }
}

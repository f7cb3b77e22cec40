//! Call admission pipeline
//!
//! Decides, for one call attempt, whether it is blocked and otherwise which
//! SIM carries it. Stages run in order and the first decisive one wins:
//!
//! 1. caller blacklist (outbound blocking)
//! 2. destination blacklist (inbound blocking)
//! 3. routing rule selection by rank
//! 4. SIM selection, directly or from a pool

use chrono::{DateTime, Utc};
use gsmgw_core::{
    models::{CallDirection, CallRoutingResult, RouteTarget, RoutingRule},
    traits::{BlacklistStore, RoutingRuleStore, SimPoolStore},
    AppResult,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub struct AdmissionPipeline {
    blacklist: Arc<dyn BlacklistStore>,
    rules: Arc<dyn RoutingRuleStore>,
    pools: Arc<dyn SimPoolStore>,
}

impl AdmissionPipeline {
    pub fn new(
        blacklist: Arc<dyn BlacklistStore>,
        rules: Arc<dyn RoutingRuleStore>,
        pools: Arc<dyn SimPoolStore>,
    ) -> Self {
        Self {
            blacklist,
            rules,
            pools,
        }
    }

    /// Route one call attempt.
    ///
    /// Never fails: a store error yields a result that is neither blocked
    /// nor successful, carrying the error text.
    #[instrument(skip(self))]
    pub async fn route(
        &self,
        caller: &str,
        destination: &str,
        customer_id: Option<i64>,
    ) -> CallRoutingResult {
        info!("🔍 Routing call: {} → {}", caller, destination);

        match self.try_route(caller, destination, customer_id, Utc::now()).await {
            Ok(result) => result,
            Err(e) => {
                // Fail open
                error!(error_code = e.error_code(), "Routing lookup failed: {}", e);
                CallRoutingResult::lookup_failed(e.to_string())
            }
        }
    }

    async fn try_route(
        &self,
        caller: &str,
        destination: &str,
        customer_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> AppResult<CallRoutingResult> {
        // 1. Caller blacklist
        if let Some(entry) = self.blacklist.find_active_match(caller).await? {
            if entry.blocks_at(CallDirection::Outbound, now) {
                warn!("❌ Caller {} is blacklisted (entry {})", caller, entry.id);
                return Ok(CallRoutingResult::blocked(block_reason(
                    &entry.reason,
                    "caller blacklisted",
                )));
            }
        }

        // 2. Destination blacklist
        if let Some(entry) = self.blacklist.find_active_match(destination).await? {
            if entry.blocks_at(CallDirection::Inbound, now) {
                warn!("❌ Destination {} is blacklisted (entry {})", destination, entry.id);
                return Ok(CallRoutingResult::blocked(block_reason(
                    &entry.reason,
                    "destination blacklisted",
                )));
            }
        }

        // 3. Rule selection
        let mut rules = self.rules.rules_matching_prefix(destination).await?;
        rules.sort_by_key(|rule| rule.rank);

        let Some(rule) = rules
            .iter()
            .find(|rule| rule_applies(rule, caller, destination, customer_id))
        else {
            warn!("No routing rule for {} → {}", caller, destination);
            return Ok(CallRoutingResult::no_route());
        };
        debug!("Selected rule {} ({}) rank {}", rule.id, rule.name, rule.rank);

        // 4. Resource selection
        let sim_id = match &rule.target {
            RouteTarget::Sim(sim_id) => *sim_id,
            RouteTarget::Pool(pool_name) => {
                let assignments = self.pools.active_assignments(pool_name).await?;
                match assignments
                    .iter()
                    .filter(|a| a.is_active)
                    .min_by_key(|a| a.priority)
                {
                    Some(assignment) => assignment.sim_id,
                    None => {
                        warn!("Pool {} has no active SIM", pool_name);
                        return Ok(CallRoutingResult::lookup_failed(format!(
                            "no active SIM in pool {}",
                            pool_name
                        )));
                    }
                }
            }
        };

        info!("✅ Routed via rule {} on SIM {}", rule.id, sim_id);
        Ok(CallRoutingResult::routed(sim_id, rule))
    }
}

fn rule_applies(
    rule: &RoutingRule,
    caller: &str,
    destination: &str,
    customer_id: Option<i64>,
) -> bool {
    rule.is_active
        && rule.matches_destination(destination)
        && rule.matches_caller(caller)
        && rule.allows_customer(customer_id)
}

fn block_reason(reason: &str, fallback: &str) -> String {
    if reason.trim().is_empty() {
        fallback.to_string()
    } else {
        reason.to_string()
    }
}

//! Admission pipeline behaviour against mocked stores

mod common;

use chrono::{Duration, Utc};
use common::*;
use gsmgw_core::models::{BlacklistPattern, RouteTarget, NO_ROUTING_RULE};
use gsmgw_core::AppError;
use gsmgw_services::AdmissionPipeline;
use mockall::predicate::eq;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn pipeline(blacklist: MockBlacklist, rules: MockRules, pools: MockPools) -> AdmissionPipeline {
    AdmissionPipeline::new(Arc::new(blacklist), Arc::new(rules), Arc::new(pools))
}

#[tokio::test]
async fn test_direct_sim_route() {
    let mut rules = MockRules::new();
    rules
        .expect_rules_matching_prefix()
        .with(eq("2341234567"))
        .returning(|_| Ok(vec![rule(7, 1, "234", RouteTarget::Sim(42))]));

    let mut pools = MockPools::new();
    pools.expect_active_assignments().times(0);

    let result = pipeline(clean_blacklist(), rules, pools)
        .route("51999281739", "2341234567", None)
        .await;

    assert!(result.success);
    assert!(!result.blocked);
    assert_eq!(result.sim_id, Some(42));
    assert_eq!(result.rule_id, Some(7));
    assert_eq!(result.cost_markup_percent, Some(dec!(10)));
}

#[tokio::test]
async fn test_caller_blacklisted_outbound() {
    let mut blacklist = MockBlacklist::new();
    blacklist
        .expect_find_active_match()
        .with(eq("51999281739"))
        .times(1)
        .returning(|_| {
            Ok(Some(blacklist_entry(
                BlacklistPattern::Exact("51999281739".to_string()),
                false,
                true,
            )))
        });

    let mut rules = MockRules::new();
    rules.expect_rules_matching_prefix().times(0);

    let result = pipeline(blacklist, rules, MockPools::new())
        .route("51999281739", "2341234567", None)
        .await;

    assert!(result.blocked);
    assert!(!result.success);
    assert_eq!(result.block_reason.as_deref(), Some("fraud reports"));
    assert_eq!(result.sim_id, None);
}

#[tokio::test]
async fn test_caller_entry_without_outbound_block_passes() {
    let mut blacklist = MockBlacklist::new();
    blacklist
        .expect_find_active_match()
        .with(eq("51999281739"))
        .returning(|_| {
            Ok(Some(blacklist_entry(
                BlacklistPattern::Prefix("51".to_string()),
                true,
                false,
            )))
        });
    blacklist
        .expect_find_active_match()
        .with(eq("2341234567"))
        .returning(|_| Ok(None));

    let mut rules = MockRules::new();
    rules
        .expect_rules_matching_prefix()
        .returning(|_| Ok(vec![rule(1, 1, "234", RouteTarget::Sim(5))]));

    let result = pipeline(blacklist, rules, MockPools::new())
        .route("51999281739", "2341234567", None)
        .await;

    assert!(result.success);
    assert_eq!(result.sim_id, Some(5));
}

#[tokio::test]
async fn test_destination_blacklisted_inbound() {
    let mut blacklist = MockBlacklist::new();
    blacklist
        .expect_find_active_match()
        .with(eq("51999281739"))
        .returning(|_| Ok(None));
    blacklist
        .expect_find_active_match()
        .with(eq("2341234567"))
        .returning(|_| {
            Ok(Some(blacklist_entry(
                BlacklistPattern::Wildcard("234*".to_string()),
                true,
                false,
            )))
        });

    let result = pipeline(blacklist, MockRules::new(), MockPools::new())
        .route("51999281739", "2341234567", None)
        .await;

    assert!(result.blocked);
    assert_eq!(result.block_reason.as_deref(), Some("fraud reports"));
}

#[tokio::test]
async fn test_expired_entry_does_not_block() {
    let mut blacklist = MockBlacklist::new();
    blacklist.expect_find_active_match().returning(|number| {
        let mut entry = blacklist_entry(BlacklistPattern::Exact(number.to_string()), true, true);
        entry.temporary_until = Some(Utc::now() - Duration::minutes(1));
        Ok(Some(entry))
    });

    let mut rules = MockRules::new();
    rules
        .expect_rules_matching_prefix()
        .returning(|_| Ok(vec![rule(1, 1, "234", RouteTarget::Sim(5))]));

    let result = pipeline(blacklist, rules, MockPools::new())
        .route("51999281739", "2341234567", None)
        .await;

    assert!(!result.blocked);
    assert!(result.success);
}

#[tokio::test]
async fn test_rules_are_ranked_and_filtered() {
    let mut rules = MockRules::new();
    rules.expect_rules_matching_prefix().returning(|_| {
        let mut inactive = rule(1, 1, "234", RouteTarget::Sim(1));
        inactive.is_active = false;

        let mut wrong_caller = rule(2, 2, "234", RouteTarget::Sim(2));
        wrong_caller.caller_id_pattern = Some("44*".to_string());

        let mut other_customer = rule(3, 3, "234", RouteTarget::Sim(3));
        other_customer.allowed_customer_ids = vec![77];

        let wrong_prefix = rule(4, 4, "2349", RouteTarget::Sim(4));
        let fallback = rule(6, 9, "23", RouteTarget::Sim(6));
        let winner = rule(5, 5, "234", RouteTarget::Sim(5));

        // Deliberately out of rank order
        Ok(vec![fallback, winner, wrong_prefix, other_customer, wrong_caller, inactive])
    });

    let result = pipeline(clean_blacklist(), rules, MockPools::new())
        .route("51999281739", "2341234567", Some(12))
        .await;

    assert!(result.success);
    assert_eq!(result.rule_id, Some(5));
    assert_eq!(result.sim_id, Some(5));
}

#[tokio::test]
async fn test_equal_rank_keeps_store_order() {
    let mut rules = MockRules::new();
    rules.expect_rules_matching_prefix().returning(|_| {
        Ok(vec![
            rule(11, 1, "234", RouteTarget::Sim(11)),
            rule(10, 1, "234", RouteTarget::Sim(10)),
        ])
    });

    let result = pipeline(clean_blacklist(), rules, MockPools::new())
        .route("51999281739", "2341234567", None)
        .await;

    assert_eq!(result.rule_id, Some(11));
}

#[tokio::test]
async fn test_anonymous_caller_cannot_use_restricted_rule() {
    let mut rules = MockRules::new();
    rules.expect_rules_matching_prefix().returning(|_| {
        let mut restricted = rule(1, 1, "234", RouteTarget::Sim(1));
        restricted.allowed_customer_ids = vec![5];
        Ok(vec![restricted])
    });

    let result = pipeline(clean_blacklist(), rules, MockPools::new())
        .route("51999281739", "2341234567", None)
        .await;

    assert!(!result.success);
    assert!(!result.blocked);
    assert_eq!(result.error.as_deref(), Some(NO_ROUTING_RULE));
}

#[tokio::test]
async fn test_pool_picks_first_active_by_priority() {
    let mut rules = MockRules::new();
    rules
        .expect_rules_matching_prefix()
        .returning(|_| Ok(vec![rule(1, 1, "234", RouteTarget::Pool("mtn".to_string()))]));

    let mut pools = MockPools::new();
    pools
        .expect_active_assignments()
        .with(eq("mtn"))
        .times(1)
        .returning(|_| {
            Ok(vec![
                assignment("mtn", 30, 3, true),
                assignment("mtn", 10, 1, false),
                assignment("mtn", 20, 2, true),
                assignment("mtn", 21, 2, true),
            ])
        });

    let result = pipeline(clean_blacklist(), rules, pools)
        .route("51999281739", "2341234567", None)
        .await;

    assert!(result.success);
    assert_eq!(result.sim_id, Some(20));
}

#[tokio::test]
async fn test_empty_pool_fails_without_blocking() {
    let mut rules = MockRules::new();
    rules
        .expect_rules_matching_prefix()
        .returning(|_| Ok(vec![rule(1, 1, "234", RouteTarget::Pool("glo".to_string()))]));

    let mut pools = MockPools::new();
    pools.expect_active_assignments().returning(|_| Ok(vec![]));

    let result = pipeline(clean_blacklist(), rules, pools)
        .route("51999281739", "2341234567", None)
        .await;

    assert!(!result.success);
    assert!(!result.blocked);
    assert_eq!(result.error.as_deref(), Some("no active SIM in pool glo"));
}

#[tokio::test]
async fn test_store_error_fails_open() {
    let mut blacklist = MockBlacklist::new();
    blacklist
        .expect_find_active_match()
        .returning(|_| Err(AppError::Database("connection refused".to_string())));

    let result = pipeline(blacklist, MockRules::new(), MockPools::new())
        .route("51999281739", "2341234567", None)
        .await;

    assert!(!result.success);
    assert!(!result.blocked);
    assert!(result.error.unwrap_or_default().contains("connection refused"));
}

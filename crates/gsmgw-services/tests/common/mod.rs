//! Store mocks and fixtures shared by the service tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gsmgw_core::{
    models::{
        BlacklistEntry, BlacklistPattern, BlacklistSource, CallDirection, CallRecord, Disposition,
        RouteTarget, RoutingRule, SimPoolAssignment,
    },
    traits::{BlacklistStore, CallHistoryStore, RoutingRuleStore, SimPoolStore},
    AppError,
};
use mockall::mock;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

mock! {
    pub Blacklist {}

    #[async_trait]
    impl BlacklistStore for Blacklist {
        async fn find_active_match(&self, number: &str) -> Result<Option<BlacklistEntry>, AppError>;
        async fn record_auto_detection(
            &self,
            number: &str,
            method: &str,
            reason: &str,
            until: DateTime<Utc>,
        ) -> Result<(), AppError>;
    }
}

mock! {
    pub Rules {}

    #[async_trait]
    impl RoutingRuleStore for Rules {
        async fn rules_matching_prefix(&self, number: &str) -> Result<Vec<RoutingRule>, AppError>;
    }
}

mock! {
    pub Pools {}

    #[async_trait]
    impl SimPoolStore for Pools {
        async fn active_assignments(&self, pool_name: &str)
            -> Result<Vec<SimPoolAssignment>, AppError>;
    }
}

mock! {
    pub History {}

    #[async_trait]
    impl CallHistoryStore for History {
        async fn calls_from(
            &self,
            number: &str,
            since: DateTime<Utc>,
        ) -> Result<Vec<CallRecord>, AppError>;
    }
}

/// Blacklist mock with no entries at all
pub fn clean_blacklist() -> MockBlacklist {
    let mut blacklist = MockBlacklist::new();
    blacklist.expect_find_active_match().returning(|_| Ok(None));
    blacklist
}

pub fn blacklist_entry(pattern: BlacklistPattern, inbound: bool, outbound: bool) -> BlacklistEntry {
    BlacklistEntry {
        id: 99,
        pattern,
        block_inbound: inbound,
        block_outbound: outbound,
        reason: "fraud reports".to_string(),
        temporary_until: None,
        violation_count: 0,
        source: BlacklistSource::Manual,
        created_at: Utc::now(),
    }
}

pub fn rule(id: i64, rank: i32, prefix: &str, target: RouteTarget) -> RoutingRule {
    RoutingRule {
        id,
        name: format!("rule-{}", id),
        rank,
        destination_prefix: prefix.to_string(),
        caller_id_pattern: None,
        allowed_customer_ids: vec![],
        target,
        cost_markup_percent: dec!(10),
        is_active: true,
    }
}

pub fn assignment(pool: &str, sim_id: i64, priority: i32, active: bool) -> SimPoolAssignment {
    SimPoolAssignment {
        pool_name: pool.to_string(),
        sim_id,
        priority,
        is_active: active,
    }
}

pub fn call(caller: &str, dest: &str, at: DateTime<Utc>, duration: i32) -> CallRecord {
    CallRecord {
        unique_id: format!("{}-{}", dest, at.timestamp_millis()),
        channel: None,
        caller_number: Some(caller.to_string()),
        caller_name: None,
        connected_line_number: None,
        connected_line_name: None,
        destination_number: Some(dest.to_string()),
        account_code: None,
        hangup_cause: Some(16),
        hangup_cause_text: None,
        start_time: None,
        answer_time: None,
        end_time: Some(at),
        duration,
        billsec: duration,
        modem_id: None,
        sim_id: None,
        direction: CallDirection::Outbound,
        disposition: Disposition::Answered,
        is_spam: false,
        server_id: "test".to_string(),
        raw_event: BTreeMap::new(),
    }
}

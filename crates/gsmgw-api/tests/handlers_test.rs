//! Handler tests against mocked stores
//!
//! The services run for real; only the store traits are mocked.

use actix_web::{http::StatusCode, test, web, App};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gsmgw_api::configure;
use gsmgw_core::{
    models::{
        BlacklistEntry, BlacklistPattern, BlacklistSource, CallRecord, RouteTarget, RoutingRule,
        SimPoolAssignment,
    },
    traits::{BlacklistStore, CallHistoryStore, RoutingRuleStore, SimPoolStore},
    AppError,
};
use gsmgw_services::{AdmissionPipeline, CallScreener, SpamAnalyzer, SpamDetector};
use mockall::mock;
use rust_decimal_macros::dec;
use serde_json::Value;
use std::sync::Arc;

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

const BLOCKED_CALLER: &str = "44700900123";

/// Blacklist holding a single outbound entry for [`BLOCKED_CALLER`]
fn blacklist() -> MockBlacklist {
    let mut blacklist = MockBlacklist::new();
    blacklist.expect_find_active_match().returning(|number| {
        if number != BLOCKED_CALLER {
            return Ok(None);
        }
        Ok(Some(BlacklistEntry {
            id: 1,
            pattern: BlacklistPattern::Exact(BLOCKED_CALLER.to_string()),
            block_inbound: false,
            block_outbound: true,
            reason: "fraud reports".to_string(),
            temporary_until: None,
            violation_count: 3,
            source: BlacklistSource::Manual,
            created_at: Utc::now(),
        }))
    });
    blacklist
}

fn rules() -> MockRules {
    let mut rules = MockRules::new();
    rules.expect_rules_matching_prefix().returning(|destination| {
        if !destination.starts_with("234") {
            return Ok(vec![]);
        }
        Ok(vec![RoutingRule {
            id: 1,
            name: "nigeria".to_string(),
            rank: 1,
            destination_prefix: "234".to_string(),
            caller_id_pattern: None,
            allowed_customer_ids: vec![],
            target: RouteTarget::Sim(42),
            cost_markup_percent: dec!(10),
            is_active: true,
        }])
    });
    rules
}

fn quiet_history() -> MockHistory {
    let mut history = MockHistory::new();
    history.expect_calls_from().returning(|_, _| Ok(vec![]));
    history
}

/// Services wired the way the binary wires them
fn services(
    blacklist: MockBlacklist,
    rules: MockRules,
    history: MockHistory,
) -> (Arc<CallScreener>, Arc<SpamDetector>) {
    let blacklist: Arc<MockBlacklist> = Arc::new(blacklist);
    let pipeline = AdmissionPipeline::new(
        blacklist.clone(),
        Arc::new(rules),
        Arc::new(MockPools::new()),
    );
    let detector = Arc::new(SpamDetector::new(
        Arc::new(history),
        SpamAnalyzer::default(),
    ));
    let screener = Arc::new(CallScreener::new(
        Arc::new(pipeline),
        detector.clone(),
        blacklist,
    ));
    (screener, detector)
}

macro_rules! app {
    ($blacklist:expr, $rules:expr, $history:expr) => {{
        let (screener, detector) = services($blacklist, $rules, $history);
        test::init_service(
            App::new()
                .app_data(web::Data::new(screener))
                .app_data(web::Data::new(detector))
                .configure(configure),
        )
        .await
    }};
}

async fn dialplan(uri: &str, blacklist: MockBlacklist, rules: MockRules) -> String {
    let app = app!(blacklist, rules, quiet_history());
    let req = test::TestRequest::get().uri(uri).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = test::read_body(resp).await;
    String::from_utf8(body.to_vec()).unwrap()
}

#[actix_web::test]
async fn test_health_endpoint() {
    let app = app!(MockBlacklist::new(), MockRules::new(), MockHistory::new());

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "gsmgw");
}

#[actix_web::test]
async fn test_route_returns_screening_decision() {
    let app = app!(blacklist(), rules(), quiet_history());

    let req = test::TestRequest::post()
        .uri("/api/v1/route")
        .set_json(serde_json::json!({
            "caller": "51999281739",
            "destination": "2341234567",
            "customer_id": 9
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["routing"]["success"], true);
    assert_eq!(body["routing"]["sim_id"], 42);
    assert_eq!(body["routing"]["rule_id"], 1);
    assert_eq!(body["redirect"], false);
    assert_eq!(body["spam"]["action"], "allow");
}

#[actix_web::test]
async fn test_route_rejects_empty_caller() {
    let app = app!(MockBlacklist::new(), MockRules::new(), MockHistory::new());

    let req = test::TestRequest::post()
        .uri("/api/v1/route")
        .set_json(serde_json::json!({"caller": "", "destination": "2341234567"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation_error");
}

#[actix_web::test]
async fn test_dialplan_route_line() {
    let line = dialplan(
        "/api/v1/dialplan/route?caller=51999281739&destination=2341234567&customer_id=",
        blacklist(),
        rules(),
    )
    .await;
    assert_eq!(line, "ROUTE|42|1|10");
}

#[actix_web::test]
async fn test_dialplan_blocked_line() {
    let uri = format!(
        "/api/v1/dialplan/route?caller={}&destination=2341234567",
        BLOCKED_CALLER
    );
    let line = dialplan(&uri, blacklist(), rules()).await;
    assert_eq!(line, "BLOCKED|fraud reports");
}

#[actix_web::test]
async fn test_dialplan_no_route_line() {
    let line = dialplan(
        "/api/v1/dialplan/route?caller=51999281739&destination=4420000000",
        blacklist(),
        rules(),
    )
    .await;
    assert_eq!(line, "NOROUTE|no routing rule found");
}

#[actix_web::test]
async fn test_dialplan_lookup_failure_is_not_blocking() {
    let mut failing = MockBlacklist::new();
    failing
        .expect_find_active_match()
        .returning(|_| Err(AppError::Database("connection refused".to_string())));

    let line = dialplan(
        "/api/v1/dialplan/route?caller=51999281739&destination=2341234567",
        failing,
        MockRules::new(),
    )
    .await;
    assert!(line.starts_with("NOROUTE|"));
    assert!(line.contains("connection refused"));
}

#[actix_web::test]
async fn test_dialplan_invalid_values() {
    let line = dialplan(
        "/api/v1/dialplan/route?caller=&destination=2341234567",
        MockBlacklist::new(),
        MockRules::new(),
    )
    .await;
    assert!(line.starts_with("NOROUTE|invalid_request:"));
}

#[actix_web::test]
async fn test_spam_endpoint() {
    let app = app!(MockBlacklist::new(), MockRules::new(), quiet_history());

    let req = test::TestRequest::get()
        .uri("/api/v1/spam/51999281739")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["phone_number"], "51999281739");
    assert_eq!(body["is_spam"], false);
    assert_eq!(body["action"], "allow");
}

#[actix_web::test]
async fn test_spam_endpoint_rejects_non_numbers() {
    let app = app!(MockBlacklist::new(), MockRules::new(), MockHistory::new());

    let req = test::TestRequest::get().uri("/api/v1/spam/hello").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_spam_endpoint_store_failure() {
    let mut history = MockHistory::new();
    history
        .expect_calls_from()
        .returning(|_, _| Err(AppError::Database("timeout".to_string())));
    let app = app!(MockBlacklist::new(), MockRules::new(), history);

    let req = test::TestRequest::get()
        .uri("/api/v1/spam/51999281739")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "database_error");
}

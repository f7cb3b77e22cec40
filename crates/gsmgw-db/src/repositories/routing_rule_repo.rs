//! Routing rule repository

use async_trait::async_trait;
use gsmgw_core::{
    models::{RouteTarget, RoutingRule},
    normalize_number,
    traits::RoutingRuleStore,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, instrument, warn};

/// Candidate rules whose prefix covers `$1` (already normalized).
/// translate() strips the same decoration normalize_number does, so a
/// prefix stored as `+234` or `234 1` still matches.
const RULES_BY_PREFIX_QUERY: &str = r#"
    SELECT
        id, name, rank, destination_prefix, caller_id_pattern,
        allowed_customer_ids, target_sim_id, target_pool,
        cost_markup_percent, is_active
    FROM routing_rules
    WHERE is_active
      AND left($1, length(translate(destination_prefix, '+ -()', '')))
          = translate(destination_prefix, '+ -()', '')
    ORDER BY rank ASC, id ASC
"#;

/// PostgreSQL implementation of RoutingRuleStore
#[derive(Clone)]
pub struct PgRoutingRuleRepository {
    pool: PgPool,
}

impl PgRoutingRuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoutingRuleStore for PgRoutingRuleRepository {
    #[instrument(skip(self))]
    async fn rules_matching_prefix(&self, number: &str) -> AppResult<Vec<RoutingRule>> {
        let normalized = normalize_number(number);

        let rows = sqlx::query_as::<sqlx::Postgres, RoutingRuleRow>(RULES_BY_PREFIX_QUERY)
            .bind(&normalized)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error fetching routing rules for {}: {}", number, e);
                AppError::Database(format!("Failed to fetch routing rules: {}", e))
            })?;

        let rules: Vec<RoutingRule> = rows.into_iter().filter_map(into_rule).collect();
        debug!("Found {} candidate routing rules", rules.len());

        Ok(rules)
    }
}

/// Database row representation
#[derive(Debug, sqlx::FromRow)]
struct RoutingRuleRow {
    id: i64,
    name: String,
    rank: i32,
    destination_prefix: String,
    caller_id_pattern: Option<String>,
    allowed_customer_ids: Option<Vec<i64>>,
    target_sim_id: Option<i64>,
    target_pool: Option<String>,
    cost_markup_percent: Decimal,
    is_active: bool,
}

/// A rule must name exactly one SIM or one pool; anything else is skipped
fn into_rule(row: RoutingRuleRow) -> Option<RoutingRule> {
    let target = match (row.target_sim_id, row.target_pool) {
        (Some(sim_id), None) => RouteTarget::Sim(sim_id),
        (None, Some(pool)) if !pool.is_empty() => RouteTarget::Pool(pool),
        _ => {
            warn!(
                "Skipping routing rule {} ({}): needs exactly one SIM or pool target",
                row.id, row.name
            );
            return None;
        }
    };

    Some(RoutingRule {
        id: row.id,
        name: row.name,
        rank: row.rank,
        destination_prefix: row.destination_prefix,
        caller_id_pattern: row.caller_id_pattern,
        allowed_customer_ids: row.allowed_customer_ids.unwrap_or_default(),
        target,
        cost_markup_percent: row.cost_markup_percent,
        is_active: row.is_active,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row() -> RoutingRuleRow {
        RoutingRuleRow {
            id: 1,
            name: "nigeria-mtn".to_string(),
            rank: 10,
            destination_prefix: "234".to_string(),
            caller_id_pattern: None,
            allowed_customer_ids: None,
            target_sim_id: None,
            target_pool: Some("mtn".to_string()),
            cost_markup_percent: dec!(15.0),
            is_active: true,
        }
    }

    #[test]
    fn test_pool_target() {
        let rule = into_rule(row()).unwrap();
        assert_eq!(rule.target, RouteTarget::Pool("mtn".to_string()));
        assert!(rule.allowed_customer_ids.is_empty());
        assert_eq!(rule.cost_markup_percent, dec!(15.0));
    }

    #[test]
    fn test_decorated_prefix_matches_normalized_destination() {
        let mut r = row();
        r.destination_prefix = "+234 1".to_string();

        let rule = into_rule(r).unwrap();
        assert!(rule.matches_destination("2341234567"));
        assert!(!rule.matches_destination("2349876543"));
    }

    #[test]
    fn test_prefix_filter_normalizes_stored_prefix() {
        let normalized_prefix = "translate(destination_prefix, '+ -()', '')";
        assert!(RULES_BY_PREFIX_QUERY.contains(&format!("length({})", normalized_prefix)));
        assert!(RULES_BY_PREFIX_QUERY.contains(&format!("= {}", normalized_prefix)));
    }

    #[test]
    fn test_sim_target() {
        let mut r = row();
        r.target_pool = None;
        r.target_sim_id = Some(42);
        r.allowed_customer_ids = Some(vec![5, 6]);

        let rule = into_rule(r).unwrap();
        assert_eq!(rule.target, RouteTarget::Sim(42));
        assert_eq!(rule.allowed_customer_ids, vec![5, 6]);
    }

    #[test]
    fn test_ambiguous_or_missing_target_is_skipped() {
        let mut both = row();
        both.target_sim_id = Some(1);
        assert!(into_rule(both).is_none());

        let mut neither = row();
        neither.target_pool = None;
        assert!(into_rule(neither).is_none());
    }
}

//! Repository implementations
//!
//! Each repository implements one or more store traits from
//! `gsmgw_core::traits` on top of a shared `PgPool`.

pub mod blacklist_repo;
pub mod call_record_repo;
pub mod routing_rule_repo;
pub mod sim_pool_repo;

pub use blacklist_repo::PgBlacklistRepository;
pub use call_record_repo::PgCallRecordRepository;
pub use routing_rule_repo::PgRoutingRuleRepository;
pub use sim_pool_repo::PgSimPoolRepository;

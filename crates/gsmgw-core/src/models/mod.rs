//! Domain models for the GSM gateway engine
//!
//! This module contains all the core domain models used throughout the workspace.

pub mod blacklist;
pub mod call_record;
pub mod pattern;
pub mod routing;

pub use blacklist::{most_specific_match, BlacklistEntry, BlacklistPattern, BlacklistSource};
pub use call_record::{CallDirection, CallRecord, Disposition};
pub use pattern::{CallPattern, SpamAction, SpamAnalysis};
pub use routing::{CallRoutingResult, RouteTarget, RoutingRule, SimPoolAssignment, NO_ROUTING_RULE};

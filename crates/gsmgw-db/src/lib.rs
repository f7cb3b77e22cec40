//! GSM Gateway Database Layer
//!
//! PostgreSQL implementations of the store traits defined in `gsmgw-core`:
//!
//! - Connection pool management with sqlx
//! - Call record persistence and caller history reads
//! - Blacklist lookups with most-specific-match resolution
//! - Routing rule and SIM pool lookups
//!
//! Queries are built at runtime, so no database is needed at build time.

pub mod pool;
pub mod repositories;

pub use pool::create_pool;
pub use repositories::*;

pub use gsmgw_core::{AppError, AppResult};
pub use sqlx::PgPool;

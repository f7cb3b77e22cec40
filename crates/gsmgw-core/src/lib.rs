//! GSM Gateway Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the GSM gateway engine. It includes:
//!
//! - Domain models (CallRecord, BlacklistEntry, RoutingRule, CallPattern, etc.)
//! - Store traits the ingestion and admission components read and write through
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Strip the decoration switches and users put around phone numbers
/// (`+`, spaces, dashes, parentheses) so matchers compare digits only.
pub fn normalize_number(number: &str) -> String {
    number
        .chars()
        .filter(|c| !matches!(c, '+' | ' ' | '-' | '(' | ')'))
        .collect()
}

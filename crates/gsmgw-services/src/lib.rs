//! Call admission services for the GSM gateway engine
//!
//! # Services
//!
//! - `AdmissionPipeline` - blacklist checks, routing rule selection and SIM
//!   resource selection for one call attempt
//! - `SpamAnalyzer` - pure heuristic scoring of a caller's behaviour
//! - `SpamDetector` - history lookup plus analysis for one number
//! - `CallScreener` - admission followed by spam screening, with
//!   auto-blacklisting of confirmed spam
//!
//! Services hold only `Arc` handles to the store traits from `gsmgw-core`,
//! so they are `Send + Sync` and can be shared across request handlers.

pub mod admission;
pub mod screening;
pub mod spam;

pub use admission::AdmissionPipeline;
pub use screening::{CallScreener, ScreeningDecision};
pub use spam::{SpamAnalyzer, SpamDetector};

/// Spam heuristics and thresholds
pub mod constants {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Sequential, repeated or alternating digits at the end of the number
    pub const SEQUENTIAL_DIGITS_WEIGHT: Decimal = dec!(0.4);

    /// Too many calls in the trailing hour
    pub const HIGH_FREQUENCY_WEIGHT: Decimal = dec!(0.5);

    /// Mostly very short calls
    pub const SHORT_CALLS_WEIGHT: Decimal = dec!(0.3);

    /// Many distinct destinations at high volume
    pub const FAN_OUT_WEIGHT: Decimal = dec!(0.6);

    /// Busy outside business hours
    pub const OFF_HOURS_WEIGHT: Decimal = dec!(0.2);

    /// Same destination dialled over and over
    pub const REPETITIVE_TARGET_WEIGHT: Decimal = dec!(0.3);

    /// Score strictly above this blocks the caller
    pub const BLOCK_THRESHOLD: Decimal = dec!(0.8);

    /// Score at or above this redirects the caller to the AI service
    pub const REDIRECT_THRESHOLD: Decimal = dec!(0.5);

    /// How many trailing digits the digit-shape heuristic inspects
    pub const DIGIT_WINDOW: usize = 6;

    pub const HIGH_FREQUENCY_CALLS_PER_HOUR: u32 = 10;

    pub const SHORT_CALL_SECONDS: f64 = 10.0;
    pub const SHORT_CALLS_MIN_TOTAL: u32 = 5;

    pub const FAN_OUT_DESTINATIONS: u32 = 20;
    pub const FAN_OUT_CALLS_24H: u32 = 50;

    pub const OFF_HOURS_CALLS_24H: u32 = 10;
    /// Business hours are `[BUSINESS_HOURS_START, BUSINESS_HOURS_END)` local
    pub const BUSINESS_HOURS_START: u32 = 8;
    pub const BUSINESS_HOURS_END: u32 = 20;

    pub const REPEAT_TARGET_CALLS: usize = 3;

    /// History window the detector fetches, in hours
    pub const HISTORY_WINDOW_HOURS: i64 = 24;

    /// Lifetime of an auto-detected blacklist entry, in hours
    pub const AUTO_BLACKLIST_HOURS: i64 = 24;

    /// `detection_method` recorded for auto-detected entries
    pub const AUTO_DETECTION_METHOD: &str = "spam_detection";
}

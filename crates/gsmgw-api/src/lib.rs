//! HTTP API for the GSM gateway engine
//!
//! Exposes call admission and spam screening to the switch dialplan and to
//! operators. Handlers take their services from `web::Data`, so the binary
//! registers an `Arc<CallScreener>` and an `Arc<SpamDetector>` before calling
//! [`configure`].

#![forbid(unsafe_code)]

pub mod dto;
pub mod handlers;

pub use dto::{DialplanReply, HealthResponse, RouteRequest};
pub use handlers::configure;

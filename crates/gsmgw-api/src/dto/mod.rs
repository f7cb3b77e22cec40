//! Data Transfer Objects (DTOs) for API requests and responses

pub mod common;
pub mod routing;

pub use common::*;
pub use routing::*;

//! HTTP request handlers

pub mod health;
pub mod routing;
pub mod spam;

use actix_web::web;

pub use health::health_check;
pub use routing::{dialplan_route, route_call};
pub use spam::check_number;

/// Mount every endpoint under `/api/v1`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .route("/route", web::post().to(route_call))
            // Dialplan CURL() lookups (GET with query params, plain text reply)
            .route("/dialplan/route", web::get().to(dialplan_route))
            .route("/spam/{number}", web::get().to(check_number)),
    );
}

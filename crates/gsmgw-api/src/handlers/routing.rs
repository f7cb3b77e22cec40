//! Call admission handlers
//!
//! Both endpoints run the full screening path (blacklists, routing rules,
//! SIM selection, spam scoring). The JSON endpoint is for operators and
//! tooling; the dialplan endpoint answers `CURL()` with one text line.

use crate::dto::{DialplanReply, RouteRequest};
use actix_web::{web, HttpResponse};
use gsmgw_core::AppError;
use gsmgw_services::CallScreener;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

/// Screen one call attempt
///
/// POST /api/v1/route
#[instrument(skip(screener, req), fields(caller = %req.caller, destination = %req.destination))]
pub async fn route_call(
    screener: web::Data<Arc<CallScreener>>,
    req: web::Json<RouteRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Route request validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let decision = screener
        .screen(&req.caller, &req.destination, req.customer_id)
        .await;

    Ok(HttpResponse::Ok().json(decision))
}

/// Dialplan lookup
///
/// GET /api/v1/dialplan/route?caller=..&destination=..&customer_id=..
///
/// Answers 200 with a text line whenever the parameters parse, so the
/// dialplan only has to split the body; values that fail validation become
/// `NOROUTE|invalid_request:...`.
#[instrument(skip(screener, query), fields(caller = %query.caller, destination = %query.destination))]
pub async fn dialplan_route(
    screener: web::Data<Arc<CallScreener>>,
    query: web::Query<RouteRequest>,
) -> HttpResponse {
    let reply = match query.validate() {
        Ok(()) => {
            let decision = screener
                .screen(&query.caller, &query.destination, query.customer_id)
                .await;
            DialplanReply::from(&decision)
        }
        Err(e) => {
            warn!("Dialplan lookup validation failed: {}", e);
            DialplanReply::NoRoute(format!("invalid_request:{}", e))
        }
    };

    info!("Dialplan reply: {}", reply);
    HttpResponse::Ok().content_type("text/plain").body(reply.to_string())
}

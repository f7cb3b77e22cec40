use actix_web::{web, HttpResponse};
use gsmgw_core::{normalize_number, AppError};
use gsmgw_services::SpamDetector;
use std::sync::Arc;
use tracing::instrument;

/// Spam analysis of one number over its recent history
///
/// GET /api/v1/spam/{number}
#[instrument(skip(detector))]
pub async fn check_number(
    detector: web::Data<Arc<SpamDetector>>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let number = path.into_inner();
    let digits = normalize_number(&number);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::InvalidInput(format!(
            "'{}' is not a phone number",
            number
        )));
    }

    let analysis = detector.check(&number).await?;
    Ok(HttpResponse::Ok().json(analysis))
}

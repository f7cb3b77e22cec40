//! Call screening: admission followed by spam scoring of the caller

use crate::admission::AdmissionPipeline;
use crate::constants::{AUTO_BLACKLIST_HOURS, AUTO_DETECTION_METHOD};
use crate::spam::SpamDetector;
use chrono::{Duration, Utc};
use gsmgw_core::{
    models::{CallRoutingResult, SpamAction, SpamAnalysis},
    traits::BlacklistStore,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Final verdict for one call attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningDecision {
    pub routing: CallRoutingResult,
    /// Route to the AI answering service instead of the destination
    pub redirect: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spam: Option<SpamAnalysis>,
}

impl ScreeningDecision {
    fn from_routing(routing: CallRoutingResult) -> Self {
        Self {
            routing,
            redirect: false,
            spam: None,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.routing.blocked
    }
}

pub struct CallScreener {
    pipeline: Arc<AdmissionPipeline>,
    detector: Arc<SpamDetector>,
    blacklist: Arc<dyn BlacklistStore>,
    auto_blacklist_ttl: Duration,
}

impl CallScreener {
    pub fn new(
        pipeline: Arc<AdmissionPipeline>,
        detector: Arc<SpamDetector>,
        blacklist: Arc<dyn BlacklistStore>,
    ) -> Self {
        Self {
            pipeline,
            detector,
            blacklist,
            auto_blacklist_ttl: Duration::hours(AUTO_BLACKLIST_HOURS),
        }
    }

    /// Override how long auto-detected entries stay on the blacklist
    pub fn with_auto_blacklist_hours(mut self, hours: i64) -> Self {
        self.auto_blacklist_ttl = Duration::hours(hours.max(1));
        self
    }

    /// Admission pipeline, then spam screening for calls that would route.
    ///
    /// A detector failure leaves the routing decision as it was.
    #[instrument(skip(self))]
    pub async fn screen(
        &self,
        caller: &str,
        destination: &str,
        customer_id: Option<i64>,
    ) -> ScreeningDecision {
        let routing = self.pipeline.route(caller, destination, customer_id).await;
        if routing.blocked || !routing.success {
            return ScreeningDecision::from_routing(routing);
        }

        let analysis = match self.detector.check(caller).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("Spam check for {} failed, admitting: {}", caller, e);
                return ScreeningDecision::from_routing(routing);
            }
        };

        match analysis.action {
            SpamAction::Allow => ScreeningDecision {
                routing,
                redirect: false,
                spam: Some(analysis),
            },
            SpamAction::RouteToAi => {
                info!(
                    "🤖 Redirecting {} to AI service (score {})",
                    caller, analysis.confidence
                );
                ScreeningDecision {
                    routing,
                    redirect: true,
                    spam: Some(analysis),
                }
            }
            SpamAction::Block => {
                let reason = format!("spam: {}", analysis.reasons.join("; "));
                warn!("❌ Blocking {} (score {}): {}", caller, analysis.confidence, reason);

                let until = Utc::now() + self.auto_blacklist_ttl;
                if let Err(e) = self
                    .blacklist
                    .record_auto_detection(caller, AUTO_DETECTION_METHOD, &reason, until)
                    .await
                {
                    error!("Failed to auto-blacklist {}: {}", caller, e);
                }

                ScreeningDecision {
                    routing: CallRoutingResult::blocked(reason),
                    redirect: false,
                    spam: Some(analysis),
                }
            }
        }
    }
}

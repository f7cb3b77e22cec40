use crate::event::AmiEvent;
use crate::events;
use crate::translator::translate;
use async_trait::async_trait;
use gsmgw_core::traits::CallRecordSink;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Receives every inbound event, in arrival order, on the connector's task
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: &AmiEvent);
}

/// Persists a call record for every hangup
pub struct CallRecordHandler {
    server_id: String,
    sink: Arc<dyn CallRecordSink>,
}

impl CallRecordHandler {
    pub fn new(server_id: impl Into<String>, sink: Arc<dyn CallRecordSink>) -> Self {
        Self {
            server_id: server_id.into(),
            sink,
        }
    }

    #[instrument(
        skip(self, event),
        fields(server_id = %self.server_id, unique_id = tracing::field::Empty)
    )]
    async fn handle_hangup(&self, event: &AmiEvent) {
        let Some(record) = translate(event, &self.server_id) else {
            return;
        };
        tracing::Span::current().record("unique_id", record.unique_id.as_str());

        if record.is_timing_incomplete() {
            debug!("Call record has incomplete timing");
        }

        // Sink failures drop the record; there is no retry queue
        match self.sink.create(&record).await {
            Ok(()) => info!(
                "📝 Call record saved: {} -> {} ({}, {}s)",
                record.caller_number.as_deref().unwrap_or("-"),
                record.destination_number.as_deref().unwrap_or("-"),
                record.disposition,
                record.billsec
            ),
            Err(e) => error!(
                error_code = e.error_code(),
                "Failed to save call record {}: {}", record.unique_id, e
            ),
        }
    }
}

#[async_trait]
impl EventHandler for CallRecordHandler {
    async fn handle_event(&self, event: &AmiEvent) {
        if event.is_event(events::HANGUP) {
            self.handle_hangup(event).await;
        } else if event.is_event(events::FULLY_BOOTED) {
            info!("Switch {} fully booted", self.server_id);
        } else if let Some(name) = event.event_name() {
            debug!("Ignoring AMI event {}", name);
        } else {
            warn!("Message without Event field reached the handler");
        }
    }
}

use crate::api::utils::json_response;
use crate::clock::Clock;
use crate::errors::ConversionsError;
use crate::event::{EventRequest, ValidationRules};
use crate::handler::Handler;
use crate::metrics_defs::{EVENTS_SENT, UPSTREAM_DURATION};
use crate::payload::Assembler;
use crate::upstream::ConversionsApi;
use async_trait::async_trait;
use http::StatusCode;
use hyper::Response;
use hyper::body::Bytes;
use serde_json::json;
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;

/// Validates, normalizes, hashes, and forwards one event.
pub struct SendEventHandler {
    rules: ValidationRules,
    assembler: Assembler,
    api: Arc<dyn ConversionsApi>,
    clock: Arc<dyn Clock>,
}

impl SendEventHandler {
    pub fn new(
        rules: ValidationRules,
        assembler: Assembler,
        api: Arc<dyn ConversionsApi>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rules,
            assembler,
            api,
            clock,
        }
    }
}

#[async_trait]
impl Handler for SendEventHandler {
    fn name(&self) -> &'static str {
        "send_event"
    }

    async fn handle(&self, event: EventRequest) -> Result<Response<Bytes>, ConversionsError> {
        let event = event.validate(&self.rules)?;
        let destination = event.destination.as_ref().ok_or_else(|| {
            ConversionsError::InternalError("validated event has no destination".into())
        })?;

        let envelope = self.assembler.assemble(&event, self.clock.now());
        tracing::debug!(
            pixel_id = %destination.pixel_id,
            payload = ?envelope,
            "sending event"
        );

        let start = Instant::now();
        let result = self.api.send_events(destination, &envelope).await;
        let outcome = if result.is_ok() { "success" } else { "failure" };
        histogram!(UPSTREAM_DURATION, "outcome" => outcome).record(start.elapsed().as_secs_f64());

        let reply = result?;
        counter!(EVENTS_SENT, "action_source" => event.action_source.as_str()).increment(1);
        tracing::info!(
            pixel_id = %destination.pixel_id,
            event_name = %event.event_name,
            "event delivered"
        );

        json_response(StatusCode::OK, &json!({"success": true, "data": reply}))
    }
}

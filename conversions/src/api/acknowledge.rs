use crate::api::utils::json_response;
use crate::errors::ConversionsError;
use crate::event::{EventRequest, ValidationRules};
use crate::handler::Handler;
use async_trait::async_trait;
use http::StatusCode;
use hyper::Response;
use hyper::body::Bytes;
use serde_json::{Value, json};

/// Checks an event without hashing or sending it and echoes what was
/// received. Useful for wiring up a storefront before going live.
pub struct AcknowledgeHandler {
    rules: ValidationRules,
}

impl AcknowledgeHandler {
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl Handler for AcknowledgeHandler {
    fn name(&self) -> &'static str {
        "acknowledge"
    }

    async fn handle(&self, event: EventRequest) -> Result<Response<Bytes>, ConversionsError> {
        let validated = event.validate(&self.rules)?;

        let mut data = serde_json::to_value(event.redacted())
            .map_err(|e| ConversionsError::ResponseSerializationError(e.to_string()))?;
        if let Value::Object(fields) = &mut data {
            fields.retain(|_, value| !value.is_null());
        }

        json_response(
            StatusCode::OK,
            &json!({
                "message": format!("{} event received", validated.event_name),
                "data": data,
            }),
        )
    }
}

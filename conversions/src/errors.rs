use crate::event::ValidationError;
use crate::upstream::UpstreamError;
use http::header::{ALLOW, CONTENT_TYPE};
use http::{Method, StatusCode};
use hyper::Response;
use hyper::body::Bytes;
use serde_json::{Value, json};
use thiserror::Error;

/// Errors that can occur while relaying an event
#[derive(Error, Debug)]
pub enum ConversionsError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Upstream(#[from] UpstreamError),

    #[error("No route matched for request")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed(Vec<Method>),

    #[error("Response serialization error: {0}")]
    ResponseSerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConversionsError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ConversionsError::MalformedRequest(_) | ConversionsError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            ConversionsError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ConversionsError::Upstream(UpstreamError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ConversionsError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ConversionsError::NotFound => StatusCode::NOT_FOUND,
            ConversionsError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ConversionsError::ResponseSerializationError(_)
            | ConversionsError::InternalError(_)
            | ConversionsError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used to tag metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ConversionsError::MalformedRequest(_) => "malformed",
            ConversionsError::PayloadTooLarge(_) => "too_large",
            ConversionsError::Validation(_) => "validation",
            ConversionsError::Upstream(UpstreamError::Timeout(_)) => "upstream_timeout",
            ConversionsError::Upstream(_) => "upstream",
            ConversionsError::NotFound => "not_found",
            ConversionsError::MethodNotAllowed(_) => "method_not_allowed",
            _ => "internal",
        }
    }

    fn body(&self) -> Value {
        match self {
            ConversionsError::Validation(err) => json!({
                "error": err.to_string(),
                "fields": err.problems(),
            }),
            ConversionsError::Upstream(UpstreamError::Status {
                status,
                message,
                body,
            }) => json!({
                "error": message.as_deref().unwrap_or("Conversions API rejected the event"),
                "upstream_status": status.as_u16(),
                "upstream": body,
            }),
            // Internal details stay in the logs.
            ConversionsError::ResponseSerializationError(_)
            | ConversionsError::InternalError(_)
            | ConversionsError::Io(_) => json!({"error": "Internal server error"}),
            other => json!({"error": other.to_string()}),
        }
    }

    /// JSON error response sent back to the caller.
    pub fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(Bytes::from(self.body().to_string()));
        *response.status_mut() = self.status_code();
        response.headers_mut().insert(
            CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );

        if let ConversionsError::MethodNotAllowed(methods) = &self {
            let allow = methods
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            if let Ok(value) = http::HeaderValue::from_str(&allow) {
                response.headers_mut().insert(ALLOW, value);
            }
        }

        response
    }
}

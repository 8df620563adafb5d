use crate::errors::ConversionsError;
use crate::event::EventRequest;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::Response;
use hyper::body::{Body, Bytes};
use serde::Serialize;

/// Serializes a value into a JSON response.
pub fn json_response<T: Serialize>(
    status: StatusCode,
    value: &T,
) -> Result<Response<Bytes>, ConversionsError> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| ConversionsError::ResponseSerializationError(e.to_string()))?;

    let mut response = Response::new(Bytes::from(bytes));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}

/// Collects a request body, refusing anything larger than `limit` bytes.
pub async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, ConversionsError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ConversionsError::PayloadTooLarge(limit))
        }
        Err(err) => Err(ConversionsError::MalformedRequest(format!(
            "failed to read request body: {err}"
        ))),
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

/// Extracts event fields from a request.
///
/// GET and HEAD carry their fields in the query string. Other methods send
/// a JSON body, or a form-encoded one when the content type says so. An
/// empty body falls back to the query string.
pub fn parse_event(
    method: &Method,
    headers: &HeaderMap,
    query: Option<&str>,
    body: &[u8],
) -> Result<EventRequest, ConversionsError> {
    let malformed = |e: serde_json::Error| ConversionsError::MalformedRequest(e.to_string());

    if method == Method::GET || method == Method::HEAD || body.is_empty() {
        return EventRequest::from_form(query.unwrap_or_default()).map_err(malformed);
    }

    if is_form(headers) {
        let encoded = std::str::from_utf8(body).map_err(|e| {
            ConversionsError::MalformedRequest(format!("form body is not UTF-8: {e}"))
        })?;
        return EventRequest::from_form(encoded).map_err(malformed);
    }

    EventRequest::from_json(body).map_err(malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;

    #[tokio::test]
    async fn test_read_body_limit() {
        let body = Full::new(Bytes::from_static(b"0123456789"));
        assert_eq!(read_body(body, 10).await.unwrap().as_ref(), b"0123456789");

        let body = Full::new(Bytes::from_static(b"0123456789"));
        assert!(matches!(
            read_body(body, 9).await.unwrap_err(),
            ConversionsError::PayloadTooLarge(9)
        ));
    }

    #[test]
    fn test_parse_event_sources() {
        let headers = HeaderMap::new();

        let event = parse_event(&Method::GET, &headers, Some("ph=5551234567&value=0"), b"")
            .unwrap();
        assert_eq!(event.phone.as_deref(), Some("5551234567"));

        let event = parse_event(&Method::POST, &headers, None, br#"{"ph": "5551234567"}"#)
            .unwrap();
        assert_eq!(event.phone.as_deref(), Some("5551234567"));

        let mut form_headers = HeaderMap::new();
        form_headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=utf-8"),
        );
        let event = parse_event(&Method::POST, &form_headers, None, b"zip=90210").unwrap();
        assert_eq!(event.zip.as_deref(), Some("90210"));

        let event = parse_event(&Method::POST, &headers, None, b"").unwrap();
        assert_eq!(event, EventRequest::default());
    }

    #[test]
    fn test_parse_event_malformed_json() {
        let err = parse_event(&Method::POST, &HeaderMap::new(), None, b"{not json").unwrap_err();
        assert!(matches!(err, ConversionsError::MalformedRequest(_)));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_json_response() {
        let response =
            json_response(StatusCode::OK, &serde_json::json!({"success": true})).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.body().as_ref(), br#"{"success":true}"#);
    }
}

use crate::errors::ConversionsError;
use crate::event::EventRequest;
use async_trait::async_trait;
use hyper::Response;
use hyper::body::Bytes;

/// Handler for a configured route action
///
/// Receives the already parsed event. Reading and size-limiting the body,
/// routing, and turning errors into responses happen in the service.
#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: EventRequest) -> Result<Response<Bytes>, ConversionsError>;
}

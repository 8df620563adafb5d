use crate::api::acknowledge::AcknowledgeHandler;
use crate::api::send_event::SendEventHandler;
use crate::api::utils::{parse_event, read_body};
use crate::client_context;
use crate::clock::Clock;
use crate::config::{Config, RouteAction};
use crate::errors::ConversionsError;
use crate::event::ValidationRules;
use crate::handler::Handler;
use crate::metrics_defs::{EVENTS_REJECTED, REQUEST_DURATION, REQUESTS_INFLIGHT};
use crate::payload::Assembler;
use crate::router::{RouteMatch, Router};
use crate::upstream::ConversionsApi;
use http::header::CONTENT_LENGTH;
use http_body_util::combinators::BoxBody;
use hyper::body::{Body, Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response};
use metrics::Gauge;
use shared::http::full_body;
use shared::{counter, gauge, histogram};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// Counts a request as inflight until dropped, including when hyper drops
/// the request future after the client disconnects.
struct InflightGuard {
    gauge: Gauge,
}

impl InflightGuard {
    fn new(gauge: Gauge) -> Self {
        gauge.increment(1.0);
        InflightGuard { gauge }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.gauge.decrement(1.0);
    }
}

/// Main listener service: routes a request, parses its event, and hands it
/// to the route's handler.
#[derive(Clone)]
pub struct ConversionsService {
    inner: Arc<Inner>,
}

struct Inner {
    router: Router,
    max_body_bytes: usize,
    context_from_headers: bool,
}

impl ConversionsService {
    pub fn new(config: &Config, api: Arc<dyn ConversionsApi>, clock: Arc<dyn Clock>) -> Self {
        let assembler = Assembler::new(config.click_token.subdomain_index);

        let routes = config
            .routes
            .iter()
            .map(|route| {
                let rules = ValidationRules::new(&config.validation, route.action);
                let handler: Arc<dyn Handler> = match route.action {
                    RouteAction::SendEvent => Arc::new(SendEventHandler::new(
                        rules,
                        assembler,
                        api.clone(),
                        clock.clone(),
                    )),
                    RouteAction::Acknowledge => Arc::new(AcknowledgeHandler::new(rules)),
                };
                (route.r#match.clone(), handler)
            })
            .collect();

        Self {
            inner: Arc::new(Inner {
                router: Router::new(routes),
                max_body_bytes: config.max_body_bytes,
                context_from_headers: config.client_context.from_headers,
            }),
        }
    }

    /// Handles one request. Every failure becomes a JSON error response.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Bytes>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let start = Instant::now();
        let inflight = InflightGuard::new(gauge!(REQUESTS_INFLIGHT));

        let (handler, result) = self.dispatch(req).await;

        drop(inflight);

        let response = result.unwrap_or_else(|err| {
            if err.status_code().is_server_error() {
                tracing::error!(handler, error = %err, "request failed");
            } else {
                tracing::info!(handler, error = %err, "request rejected");
            }
            counter!(EVENTS_REJECTED, "handler" => handler, "reason" => err.kind()).increment(1);
            err.into_response()
        });

        histogram!(
            REQUEST_DURATION,
            "status" => response.status().as_u16().to_string(),
            "handler" => handler
        )
        .record(start.elapsed().as_secs_f64());

        response
    }

    async fn dispatch<B>(
        &self,
        req: Request<B>,
    ) -> (&'static str, Result<Response<Bytes>, ConversionsError>)
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();

        let handler = match self.inner.router.resolve(&parts.method, parts.uri.path()) {
            RouteMatch::Matched(handler) => handler.clone(),
            RouteMatch::MethodNotAllowed(allowed) => {
                return ("none", Err(ConversionsError::MethodNotAllowed(allowed)));
            }
            RouteMatch::NotFound => return ("none", Err(ConversionsError::NotFound)),
        };

        let limit = self.inner.max_body_bytes;
        let declared_length = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared_length.is_some_and(|len| len > limit) {
            return (handler.name(), Err(ConversionsError::PayloadTooLarge(limit)));
        }

        let result = async {
            let bytes = read_body(body, limit).await?;
            let mut event = parse_event(&parts.method, &parts.headers, parts.uri.query(), &bytes)?;
            if self.inner.context_from_headers {
                client_context::apply(&mut event, &parts.headers);
            }
            handler.handle(event).await
        }
        .await;

        (handler.name(), result)
    }
}

impl Service<Request<Incoming>> for ConversionsService {
    type Response = Response<BoxBody<Bytes, ConversionsError>>;
    type Error = ConversionsError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await.map(full_body)) })
    }
}

//! Relay for purchase events bound for a conversions API.
//!
//! Each request is routed to a handler, validated, its customer identity
//! normalized and hashed with [`pii`], assembled into the API's envelope,
//! and posted upstream. Nothing is stored between requests.

pub mod api;
pub mod client_context;
pub mod clock;
pub mod config;
pub mod errors;
pub mod event;
pub mod fields;
pub mod handler;
pub mod metrics_defs;
pub mod payload;
pub mod router;
pub mod service;
pub mod upstream;

#[cfg(test)]
mod testutils;

use crate::clock::SystemClock;
use crate::errors::ConversionsError;
use crate::service::ConversionsService;
use crate::upstream::GraphApiClient;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;

/// Serves events on the main listener and health probes on the admin
/// listener until either of them fails.
pub async fn run(config: config::Config) -> Result<(), ConversionsError> {
    let api = Arc::new(GraphApiClient::from_config(&config.upstream));
    let service = ConversionsService::new(&config, api, Arc::new(SystemClock));
    let admin_service = AdminService::<_, ConversionsError>::new(|| true);

    tracing::info!(
        routes = config.routes.len(),
        api_version = %config.upstream.api_version,
        "starting conversions relay"
    );

    let relay_task = run_http_service(&config.listener.host, config.listener.port, service);
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin_service,
    );

    tokio::try_join!(relay_task, admin_task)?;
    Ok(())
}

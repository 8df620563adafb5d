use crate::config::{LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::{StatsdBuilder, StatsdError};
use shared::metrics_defs::describe_all;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(thiserror::Error, Debug)]
pub enum TelemetryError {
    #[error("could not build statsd recorder: {0}")]
    Statsd(#[from] StatsdError),
    #[error("a metrics recorder is already installed")]
    RecorderAlreadySet,
}

/// Keeps the Sentry client alive; events are flushed when it is dropped.
pub struct TelemetryGuard {
    _sentry: Option<sentry::ClientInitGuard>,
}

fn init_sentry(config: &LoggingConfig) -> Option<sentry::ClientInitGuard> {
    let guard = sentry::init((
        config.sentry_dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            send_default_pii: false,
            ..Default::default()
        },
    ));

    guard.is_enabled().then_some(guard)
}

/// Installs the global tracing subscriber. `RUST_LOG` overrides the default
/// `info` level. With a Sentry DSN, errors are reported there as well.
pub fn init_logging(config: Option<&LoggingConfig>) -> TelemetryGuard {
    let sentry_guard = config.and_then(init_sentry);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(
            sentry_guard
                .as_ref()
                .map(|_| sentry::integrations::tracing::layer()),
        )
        .init();

    match (config, &sentry_guard) {
        (Some(_), Some(_)) => tracing::info!("Sentry initialized"),
        (Some(_), None) => tracing::warn!("Sentry DSN provided but client not enabled"),
        _ => {}
    }

    TelemetryGuard {
        _sentry: sentry_guard,
    }
}

/// Exports every metric to statsd under `config.prefix`.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), TelemetryError> {
    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some(&config.prefix))?;

    metrics::set_global_recorder(recorder).map_err(|_| TelemetryError::RecorderAlreadySet)?;
    describe_all(conversions::metrics_defs::ALL_METRICS);

    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "statsd metrics enabled"
    );
    Ok(())
}

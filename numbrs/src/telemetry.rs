use crate::config::{LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::{StatsdBuilder, StatsdError};
use sentry::types::{Dsn, ParseDsnError};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const METRICS_PREFIX: &str = "numbrs";

#[derive(thiserror::Error, Debug)]
pub enum TelemetryError {
    #[error("invalid sentry dsn: {0}")]
    InvalidDsn(#[from] ParseDsnError),
    #[error("could not build statsd exporter: {0}")]
    Statsd(#[from] StatsdError),
    #[error("a metrics recorder is already installed")]
    RecorderAlreadySet,
}

/// Installs the global tracing subscriber, forwarding to Sentry when a DSN
/// is configured. The returned guard flushes Sentry on drop and must be
/// kept alive for the lifetime of the process.
pub fn init_logging(
    logging: Option<&LoggingConfig>,
) -> Result<Option<sentry::ClientInitGuard>, TelemetryError> {
    let sentry_guard = match logging {
        Some(logging) => {
            let dsn: Dsn = logging.sentry_dsn.parse()?;
            Some(sentry::init(sentry::ClientOptions {
                dsn: Some(dsn),
                release: sentry::release_name!(),
                ..Default::default()
            }))
        }
        None => None,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            sentry_guard
                .as_ref()
                .map(|_| sentry::integrations::tracing::layer()),
        )
        .init();

    Ok(sentry_guard)
}

/// Installs the StatsD recorder and describes every known metric.
pub fn init_metrics(metrics_config: &MetricsConfig) -> Result<(), TelemetryError> {
    let recorder = StatsdBuilder::from(
        metrics_config.statsd_host.clone(),
        metrics_config.statsd_port,
    )
    .build(Some(METRICS_PREFIX))?;

    metrics::set_global_recorder(recorder).map_err(|_| TelemetryError::RecorderAlreadySet)?;
    shared::describe_metrics!(numbers_router::metrics_defs::ALL_METRICS);

    tracing::info!(
        host = %metrics_config.statsd_host,
        port = metrics_config.statsd_port,
        "Sending metrics to statsd"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_dsn_is_rejected() {
        let logging = LoggingConfig {
            sentry_dsn: "not a dsn".to_string(),
        };
        assert!(matches!(
            init_logging(Some(&logging)),
            Err(TelemetryError::InvalidDsn(_))
        ));
    }
}

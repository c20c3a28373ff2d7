pub mod aggregator;
pub mod config;
pub mod errors;
pub mod fetcher;
pub mod handler;
pub mod metrics_defs;
pub mod response;
pub mod router;
pub mod service;

#[cfg(test)]
mod testutils;

use aggregator::Aggregator;
use errors::NumbersRouterError;
use fetcher::Fetcher;
use handler::NumbersHandler;
use router::Router;
use service::NumbersService;
use shared::admin_service::AdminService;
use shared::http::run_http_service;

/// Builds the `/numbers` service from the upstream settings.
pub fn build_service(
    upstream: &config::UpstreamConfig,
) -> Result<NumbersService, NumbersRouterError> {
    let fetcher = Fetcher::new(upstream.timeout())?.with_max_body_bytes(upstream.max_body_bytes);
    let aggregator = Aggregator::new(fetcher, upstream.execution_mode);

    Ok(NumbersService::new(Router::new(NumbersHandler::new(aggregator))))
}

pub async fn run(config: config::Config) -> Result<(), NumbersRouterError> {
    config.validate()?;

    let router_service = build_service(&config.upstream)?;
    let admin_service = AdminService::<_, NumbersRouterError>::new(|| true);

    tracing::info!(
        timeout_ms = config.upstream.timeout_ms,
        execution_mode = ?config.upstream.execution_mode,
        "Starting numbers router"
    );

    let router_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        config.listener.timeouts(),
        router_service,
    );
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        config.admin_listener.timeouts(),
        admin_service,
    );

    tokio::try_join!(router_task, admin_task)?;
    Ok(())
}

use crate::cli::ServeArgs;
use crate::infra::{bootstrap_admin, AppState};
use crate::routes::with_operational_routes;
use adoptly::config::AppConfig;
use adoptly::error::AppError;
use adoptly::marketplace::{marketplace_router, Marketplace};
use adoptly::store::MemoryStore;
use adoptly::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(MemoryStore::new());
    let marketplace = Arc::new(Marketplace::new(
        store,
        &config.security,
        config.adoption,
    ));
    bootstrap_admin(&marketplace, &config)?;

    let app = with_operational_routes(marketplace_router(marketplace))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "adoption marketplace ready");

    axum::serve(listener, app).await?;
    Ok(())
}

use adoptly::config::AppConfig;
use adoptly::error::AppError;
use adoptly::marketplace::{Marketplace, MarketplaceStore};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Create or promote the configured admin account, if any.
pub(crate) fn bootstrap_admin<S: MarketplaceStore>(
    marketplace: &Marketplace<S>,
    config: &AppConfig,
) -> Result<(), AppError> {
    let Some(admin) = config.bootstrap_admin.as_ref() else {
        return Ok(());
    };
    let user = marketplace.users.bootstrap_admin(admin, Utc::now())?;
    info!(user_id = %user.id, username = %user.username, "admin account ready");
    Ok(())
}

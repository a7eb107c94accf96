use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_site_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use oisdrive::config::AppConfig;
use oisdrive::error::AppError;
use oisdrive::intake::ContactService;
use oisdrive::notify::{mailer_from_config, NotificationDispatcher};
use oisdrive::storage::attachment_store_from_config;
use oisdrive::telemetry;
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

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let storage = attachment_store_from_config(&config.storage)?;
    let mailer = mailer_from_config(&config.email)?;
    let notifier = Arc::new(NotificationDispatcher::new(mailer, config.site.clone()));
    let contact_service = Arc::new(ContactService::new(storage, notifier));

    let app = with_site_routes(contact_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        cloud_storage = config.storage.is_cloud_configured(),
        email = config.email.is_configured(),
        "oisdrive contact service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

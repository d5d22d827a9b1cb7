use crate::cli::ServeArgs;
use crate::infra::{AppState, TracingNotifier};
use crate::routes::with_ledger_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hostel_ledger::config::AppConfig;
use hostel_ledger::error::AppError;
use hostel_ledger::ledger::{HostelService, MemoryHostelRepository};
use hostel_ledger::telemetry;
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

    let service = Arc::new(HostelService::new(
        Arc::new(MemoryHostelRepository::new()),
        Arc::new(TracingNotifier),
        config.ledger.clone(),
    ));

    let app = with_ledger_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        grace_days = config.ledger.late_fees.grace_days,
        commit_attempts = config.ledger.commit_attempts,
        "hostel ledger ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

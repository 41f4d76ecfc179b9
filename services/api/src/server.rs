use crate::cli::ServeArgs;
use crate::infra::{build_intake_service, AppState, InMemoryIntakeRepository};
use crate::routes::with_intake_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use loan_intake::config::AppConfig;
use loan_intake::error::AppError;
use loan_intake::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Command-line flags win over the environment.
fn apply_overrides(config: &mut AppConfig, args: ServeArgs) {
    let ServeArgs {
        host,
        port,
        workers,
    } = args;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(workers) = workers {
        config.intake.worker_limit = workers.max(1);
    }
}

pub(crate) async fn run(args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    apply_overrides(&mut config, args);
    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = Arc::new(build_intake_service(
        &config.intake,
        Arc::new(InMemoryIntakeRepository::default()),
    ));
    let workers = service.worker_limit();
    let app = with_intake_routes(service)
        .layer(Extension(state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        workers,
        storage = %config.intake.storage_dir.display(),
        extraction_service = config.intake.extraction_url.is_some(),
        narrative_service = config.intake.narrative_url.is_some(),
        "loan intake service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

use crate::cli::ServeArgs;
use crate::infra::{build_registry, load_catalog, AppState, LoggingNotificationSink};
use crate::routes::with_application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hireflow::config::AppConfig;
use hireflow::error::AppError;
use hireflow::telemetry;
use hireflow::workflows::recruitment::applications::{
    InMemoryCheckpointStore, NotificationDispatcher,
};
use std::sync::atomic::Ordering;
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
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = load_catalog(&config.catalog, args.catalog.as_deref())?;
    let (registry, events) = build_registry(catalog, config.matching);
    let dispatcher = NotificationDispatcher::new(Arc::new(LoggingNotificationSink));
    tokio::spawn(async move {
        let stats = dispatcher.run(events).await;
        info!(
            delivered = stats.delivered,
            duplicates = stats.duplicates,
            retried = stats.retried,
            failed = stats.failed,
            "notification dispatcher stopped"
        );
    });

    let app = with_application_routes(registry, Arc::new(InMemoryCheckpointStore::default()))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        skills_weight = config.matching.skills(),
        experience_weight = config.matching.experience(),
        education_weight = config.matching.education(),
        "hireflow application service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

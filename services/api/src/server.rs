use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_pilot_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use enthalpy::config::AppConfig;
use enthalpy::error::AppError;
use enthalpy::telemetry;
use enthalpy::workflows::pilot_access::{PilotAccessService, ResendMailer, ResendSettings};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let mailer = match ResendSettings::from_config(&config.mail) {
        Some(settings) => Some(Arc::new(ResendMailer::new(settings)?)),
        None => None,
    };
    let pilot_service = Arc::new(PilotAccessService::from_config(mailer, &config.mail));

    let missing = config.mail.missing_settings();
    if !missing.is_empty() {
        warn!(
            missing = %missing.join(", "),
            "mail delivery not configured; pilot access requests will be refused"
        );
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        mail_configured: pilot_service.is_configured(),
    };

    let app = with_pilot_routes(pilot_service, &config.cors)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        cors_origins = config.cors.allowed_origins.len(),
        "pilot access service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

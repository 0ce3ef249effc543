use crate::infra::{cors_layer, AppState};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use enthalpy::config::CorsConfig;
use enthalpy::workflows::pilot_access::{pilot_access_router, Mailer, PilotAccessService};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub(crate) struct ReadinessView {
    pub(crate) status: &'static str,
    pub(crate) mail_configured: bool,
}

pub(crate) fn with_pilot_routes<M>(
    service: Arc<PilotAccessService<M>>,
    cors: &CorsConfig,
) -> axum::Router
where
    M: Mailer + 'static,
{
    let pilot = match cors_layer(cors) {
        Some(layer) => pilot_access_router(service).layer(layer),
        None => pilot_access_router(service),
    };

    pilot
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = ReadinessView {
        status: if ready { "ready" } else { "initializing" },
        mail_configured: state.mail_configured,
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;

use super::mailer::Mailer;
use super::service::{PilotAccessError, PilotAccessService};

pub const PILOT_ACCESS_PATH: &str = "/api/pilot-access";

/// Router exposing the pilot-access form endpoint.
pub fn pilot_access_router<M>(service: Arc<PilotAccessService<M>>) -> Router
where
    M: Mailer + 'static,
{
    Router::new()
        .route(PILOT_ACCESS_PATH, post(submit_handler::<M>))
        .with_state(service)
}

pub(crate) async fn submit_handler<M>(
    State(service): State<Arc<PilotAccessService<M>>>,
    body: Bytes,
) -> Response
where
    M: Mailer + 'static,
{
    match service.submit_json(&body).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: PilotAccessError) -> Response {
    let (status, payload) = match &err {
        PilotAccessError::Malformed(_) | PilotAccessError::Validation(_) => {
            (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() }))
        }
        PilotAccessError::NotConfigured => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": err.to_string() }),
        ),
        PilotAccessError::Delivery(failure) => (
            StatusCode::BAD_GATEWAY,
            json!({
                "error": err.to_string(),
                "details": failure.public_detail(),
            }),
        ),
    };
    (status, Json(payload)).into_response()
}

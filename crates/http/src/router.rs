use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use engine::{HostError, Invocation, InvocationSettings, invoke};
use platform::Platform;
use thiserror::Error;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub platform: Arc<dyn Platform>,
    pub settings: InvocationSettings,
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("application is in maintenance mode")]
    Maintenance,
    #[error("bootstrap failed: {0}")]
    Bootstrap(#[from] HostError),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = match self {
            HttpError::Maintenance => StatusCode::SERVICE_UNAVAILABLE,
            HttpError::Bootstrap(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .fallback(handle_request)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    "lambda ready"
}

/// Every request is a fresh invocation: classify, redirect, boot, respond.
async fn handle_request(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, HttpError> {
    let uri = request.uri().to_string();
    match invoke(state.platform.as_ref(), &state.settings)? {
        Invocation::Maintenance { .. } => Err(HttpError::Maintenance),
        Invocation::Ready { report, .. } => {
            tracing::debug!(
                "[http] {} ephemeral={} redirect={:?}",
                uri,
                report.ephemeral,
                report.redirect
            );
            if !report.stale_roles.is_empty() {
                tracing::warn!("storage overrides applied after boot: {:?}", report.stale_roles);
            }
            Ok(Json(report).into_response())
        }
    }
}

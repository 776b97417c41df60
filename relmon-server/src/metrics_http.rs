//! HTTP scrape surface for the prometheus registry.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::Registry;
use tower_http::trace::TraceLayer;
use tracing::error;

#[derive(Clone)]
struct MetricsState {
    registry: Arc<Registry>,
}

/// Router exposing `GET /metrics` in the text exposition format.
pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(MetricsState { registry })
}

async fn metrics_handler(State(state): State<MetricsState>) -> Response {
    match relmon_core::metrics::encode_text(&state.registry) {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

//! HTTP routes gateway (EMBP).
//!
//! Sibling modules each export a subrouter over [`AppState`]; `main.rs` only
//! sees [`router`].

use std::sync::Arc;

use axum::{http::StatusCode, Json, Router};
use serde::Serialize;

use crate::flight_log::FlightStore;
use crate::telemetry::{FeedBoard, TelemetryCache};

mod dashboard;
mod health;
mod telemetry;

// ---

/// Shared state for all handlers. Everything behind it is read-only from
/// the HTTP side; the pollers are the only writers.
#[derive(Clone)]
pub struct AppState {
    pub flights: Arc<FlightStore>,
    pub feed: Arc<FeedBoard>,
    pub cache: Arc<TelemetryCache>,
}

/// JSON error body for rejected requests.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(msg: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse { error: msg.into() }),
    )
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(dashboard::router())
        .merge(telemetry::router())
        .merge(health::router())
        .with_state(state)
}

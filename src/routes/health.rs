// src/routes/health.rs
//! API health check endpoint for the fleet dashboard backend.
//!
//! This module defines the `/health` route used by container orchestrators
//! and the presentation layer to verify that the service is running. It
//! reports whether a flight log has been loaded yet and which telemetry tier
//! answered the last poll, without touching any upstream.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;
use crate::telemetry::TelemetryTier;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    flights_loaded: bool,
    telemetry_tier: TelemetryTier,
}

/// Handle `GET /health`.
///
/// Always answers `ok`; degraded upstreams show up in the body, never as an
/// error status.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        flights_loaded: state.flights.snapshot().loaded_at.is_some(),
        telemetry_tier: state.feed.latest().tier,
    })
}

/// Create a subrouter containing the `/health` route.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

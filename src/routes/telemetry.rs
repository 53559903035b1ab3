//! Live fleet endpoints backed by the telemetry poller.

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::AppState;
use crate::analytics::{get_uav_stats, UavStat};
use crate::models::DroneTelemetry;
use crate::telemetry::{CacheStatus, TelemetryTier};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/telemetry", get(telemetry))
        .route("/api/telemetry/status", get(status))
}

/// Latest feed plus cache status. With no drones at all, `fallback` carries
/// the per-UAV flight-log summary so the fleet view is never blank.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TelemetryView {
    tier: TelemetryTier,
    polled_at: DateTime<Utc>,
    drones: Vec<DroneView>,
    cache_status: CacheStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback: Option<Vec<UavStat>>,
}

/// One drone record plus its display label.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DroneView {
    #[serde(flatten)]
    drone: DroneTelemetry,
    status_label: &'static str,
}

impl From<&DroneTelemetry> for DroneView {
    fn from(drone: &DroneTelemetry) -> Self {
        Self {
            status_label: drone.status.label(),
            drone: drone.clone(),
        }
    }
}

async fn telemetry(State(state): State<AppState>) -> Json<TelemetryView> {
    // ---
    let feed = state.feed.latest();
    let fallback = feed
        .drones
        .is_empty()
        .then(|| get_uav_stats(&state.flights.flights()));

    if fallback.is_some() {
        tracing::debug!("No telemetry available, serving flight-log UAV summary");
    }

    Json(TelemetryView {
        tier: feed.tier,
        polled_at: feed.polled_at,
        drones: feed.drones.iter().map(DroneView::from).collect(),
        cache_status: state.cache.status(Utc::now()),
        fallback,
    })
}

async fn status(State(state): State<AppState>) -> Json<CacheStatus> {
    Json(state.cache.status(Utc::now()))
}

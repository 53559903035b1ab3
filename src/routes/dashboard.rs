//! Flight-log analytics endpoints.
//!
//! Every handler takes `?period=daily|weekly|all` (default `all`) and an
//! optional `?on=DD-MM-YYYY` reference date (default: today, local time),
//! filters the current flight list, and returns one rollup.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::debug;

use super::{bad_request, ApiError, AppState};
use crate::analytics::{
    build_dashboard, compute_metrics, get_daily_stats, get_landing_stats, get_medical_ops_stats,
    get_node_stats, get_pilot_stats, get_route_stats, get_uav_stats, DailyStat, DashboardView,
    FleetMetrics, LandingStats, MedicalOpsStats, PilotStat, RouteStat, UavStat,
};
use crate::models::Flight;
use crate::network::{locate_all, LocatedNode, NodeLocation, NODE_LOCATIONS};
use crate::normalize::parse_flight_date;
use crate::period::{filter_flights_by_period, filter_flights_for_now, Period};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/flights", get(flights))
        .route("/api/dashboard", get(dashboard))
        .route("/api/metrics", get(metrics))
        .route("/api/routes", get(routes))
        .route("/api/pilots", get(pilots))
        .route("/api/uavs", get(uavs))
        .route("/api/daily", get(daily))
        .route("/api/nodes", get(nodes))
        .route("/api/medical", get(medical))
        .route("/api/landing", get(landing))
        .route("/api/network", get(network))
}

/// Query parameters shared by the analytics endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    period: Option<String>,
    /// Reference date, `DD-MM-YYYY`.
    on: Option<String>,
}

/// Resolve the query and return the period-filtered flights.
fn select(state: &AppState, query: &PeriodQuery) -> Result<(Period, Vec<Flight>), ApiError> {
    // ---
    let period = query
        .period
        .as_deref()
        .unwrap_or_default()
        .parse::<Period>()
        .map_err(bad_request)?;

    let all = state.flights.flights();
    let selected = match query.on.as_deref() {
        Some(text) => {
            let today = parse_flight_date(text)
                .ok_or_else(|| bad_request(format!("invalid date '{text}', expected DD-MM-YYYY")))?;
            filter_flights_by_period(&all, period, today)
        }
        None => filter_flights_for_now(&all, period),
    };
    debug!(
        "Selected {} of {} flights for {:?}",
        selected.len(),
        all.len(),
        period
    );
    Ok((period, selected))
}

async fn flights(
    Query(q): Query<PeriodQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Flight>>, ApiError> {
    let (_, flights) = select(&state, &q)?;
    Ok(Json(flights))
}

async fn dashboard(
    Query(q): Query<PeriodQuery>,
    State(state): State<AppState>,
) -> Result<Json<DashboardView>, ApiError> {
    // ---
    let (period, flights) = select(&state, &q)?;
    Ok(Json(build_dashboard(&flights, period)))
}

async fn metrics(
    Query(q): Query<PeriodQuery>,
    State(state): State<AppState>,
) -> Result<Json<FleetMetrics>, ApiError> {
    let (_, flights) = select(&state, &q)?;
    Ok(Json(compute_metrics(&flights)))
}

async fn routes(
    Query(q): Query<PeriodQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<RouteStat>>, ApiError> {
    let (_, flights) = select(&state, &q)?;
    Ok(Json(get_route_stats(&flights)))
}

async fn pilots(
    Query(q): Query<PeriodQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<PilotStat>>, ApiError> {
    let (_, flights) = select(&state, &q)?;
    Ok(Json(get_pilot_stats(&flights)))
}

async fn uavs(
    Query(q): Query<PeriodQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<UavStat>>, ApiError> {
    let (_, flights) = select(&state, &q)?;
    Ok(Json(get_uav_stats(&flights)))
}

async fn daily(
    Query(q): Query<PeriodQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<DailyStat>>, ApiError> {
    let (_, flights) = select(&state, &q)?;
    Ok(Json(get_daily_stats(&flights)))
}

async fn nodes(
    Query(q): Query<PeriodQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<LocatedNode>>, ApiError> {
    let (_, flights) = select(&state, &q)?;
    Ok(Json(locate_all(get_node_stats(&flights))))
}

async fn medical(
    Query(q): Query<PeriodQuery>,
    State(state): State<AppState>,
) -> Result<Json<MedicalOpsStats>, ApiError> {
    let (_, flights) = select(&state, &q)?;
    Ok(Json(get_medical_ops_stats(&flights)))
}

async fn landing(
    Query(q): Query<PeriodQuery>,
    State(state): State<AppState>,
) -> Result<Json<LandingStats>, ApiError> {
    let (_, flights) = select(&state, &q)?;
    Ok(Json(get_landing_stats(&flights)))
}

async fn network() -> Json<&'static [NodeLocation]> {
    Json(NODE_LOCATIONS)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;

    use crate::flight_log::{parse_flight_csv, FlightStore};
    use crate::telemetry::{FeedBoard, TelemetryCache};

    fn create_test_state() -> AppState {
        // ---
        let csv = "h\nh\nh\n\
            02-06-2025,AS04,F1,Live,Krupa Sagar,Paderu,Araku Valley,34.7,1112,1138,00:26,0\n\
            04-06-2025,AS04,F2,Live,Mohan Kumar,Araku Valley,Paderu,37.7,1203,1229,00:26,0\n\
            28-05-2025,AS05,F3,Test,Ankush Kavir,Paderu,Paderu,0,1500,1502,00:02,0\n";
        let flights = FlightStore::new();
        flights.replace(parse_flight_csv(csv).0, Utc::now());

        AppState {
            flights: Arc::new(flights),
            feed: Arc::new(FeedBoard::new()),
            cache: Arc::new(TelemetryCache::new()),
        }
    }

    fn query(period: Option<&str>, on: Option<&str>) -> PeriodQuery {
        PeriodQuery {
            period: period.map(str::to_string),
            on: on.map(str::to_string),
        }
    }

    #[test]
    fn test_select_defaults_to_all() {
        // ---
        let state = create_test_state();
        let (period, flights) = select(&state, &PeriodQuery::default()).unwrap();
        assert_eq!(period, Period::All);
        assert_eq!(flights.len(), 3);
    }

    #[test]
    fn test_select_weekly_with_reference_date() {
        // ---
        let state = create_test_state();
        let (_, flights) = select(&state, &query(Some("weekly"), Some("04-06-2025"))).unwrap();
        assert_eq!(flights.len(), 2);

        let (_, flights) = select(&state, &query(Some("daily"), Some("04-06-2025"))).unwrap();
        assert_eq!(flights.len(), 1);
        assert_eq!(flights[0].flight_id, "F2");
    }

    #[test]
    fn test_select_rejects_bad_input() {
        // ---
        let state = create_test_state();

        let (status, _) = select(&state, &query(Some("monthly"), None)).unwrap_err();
        assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);

        let (status, body) = select(&state, &query(None, Some("2025-06-04"))).unwrap_err();
        assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
        assert!(body.0.error.contains("DD-MM-YYYY"));
    }

    #[tokio::test]
    async fn test_medical_handler_serves_empty_shape() {
        // ---
        let Json(stats) = medical(Query(PeriodQuery::default()), State(create_test_state()))
            .await
            .unwrap();
        assert_eq!(stats, MedicalOpsStats::default());
    }
}

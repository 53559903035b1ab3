//! Aggregation engine: pure rollups over a flight list.
//!
//! Every function accepts an empty slice and returns zeroed or empty
//! structures. Grouped outputs keep first-seen order and are sorted with a
//! stable sort, so equal keys stay in input order.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{dmy_date, Flight, Fls, LfaoOutcome, Precland};
use crate::period::Period;

// ---

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetMetrics {
    // ---
    /// Kilometres, rounded.
    pub total_distance: f64,
    pub total_flights: usize,
    pub live_count: usize,
    pub test_count: usize,
    pub uav_count: usize,
    pub uavs: Vec<String>,
    pub pilot_count: usize,
    pub pilots: Vec<String>,
    pub location_count: usize,
    pub locations: Vec<String>,
    pub total_minutes: u64,
    /// Kilograms, rounded to 2 decimals.
    pub total_payload_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStat {
    pub route: String,
    pub from: String,
    pub to: String,
    pub count: usize,
    pub total_dist: f64,
    /// Mean airtime in minutes, rounded.
    pub avg_duration: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PilotStat {
    pub name: String,
    pub flights: usize,
    pub live: usize,
    pub test: usize,
    pub distance: f64,
    pub minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UavStat {
    pub id: String,
    pub flights: usize,
    pub live: usize,
    pub test: usize,
    pub distance: f64,
    pub minutes: u64,
    /// Grams.
    pub payload: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStat {
    #[serde(with = "dmy_date")]
    pub date: NaiveDate,
    pub flights: usize,
    pub distance: f64,
    pub live: usize,
    pub test: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStat {
    pub name: String,
    /// Takeoffs plus landings.
    pub total_flights: usize,
    pub takeoffs: usize,
    pub landings: usize,
    pub deliveries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRoute {
    pub route: String,
    pub deliveries: usize,
    pub payload_g: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalDay {
    #[serde(with = "dmy_date")]
    pub date: NaiveDate,
    pub deliveries: usize,
    pub payload_g: u64,
}

/// Rollup of order-carrying flights. The empty value is the explicit
/// zero shape served when there are no medical flights.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalOpsStats {
    pub total_deliveries: usize,
    pub total_payload_g: u64,
    pub total_payload_kg: f64,
    /// Mean payload per delivery in grams, rounded. Absent without
    /// deliveries so the empty shape stays minimal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_payload_g: Option<u64>,
    pub routes: Vec<MedicalRoute>,
    pub daily: Vec<MedicalDay>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LfaoCounts {
    pub worked: usize,
    pub partial: usize,
    pub disabled: usize,
    pub untested: usize,
    pub unknown: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LandingStats {
    pub on_marker: usize,
    pub off_marker: usize,
    pub not_applicable: usize,
    /// Percent of marker landings that were on the marker, 1 decimal.
    pub on_marker_rate: f64,
    pub lfao: LfaoCounts,
    pub fls_used: usize,
    pub avg_det_alt: Option<f64>,
    pub avg_land_off: Option<f64>,
}

/// Every rollup for one period, as served to the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub period: Period,
    pub metrics: FleetMetrics,
    pub routes: Vec<RouteStat>,
    pub pilots: Vec<PilotStat>,
    pub uavs: Vec<UavStat>,
    pub daily: Vec<DailyStat>,
    pub nodes: Vec<NodeStat>,
    pub medical: MedicalOpsStats,
    pub landing: LandingStats,
}

// ---

/// Insertion-ordered grouping.
struct Grouped<K, T> {
    index: HashMap<K, usize>,
    groups: Vec<T>,
}

impl<K: Eq + Hash, T> Grouped<K, T> {
    // ---
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    fn entry(&mut self, key: K, init: impl FnOnce() -> T) -> &mut T {
        // ---
        let groups = &mut self.groups;
        let idx = *self.index.entry(key).or_insert_with(|| {
            groups.push(init());
            groups.len() - 1
        });
        &mut self.groups[idx]
    }

    fn into_vec(self) -> Vec<T> {
        self.groups
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Unique values in first-seen order.
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    // ---
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    // ---
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| round2(sum / n as f64))
}

// ---

pub fn compute_metrics(flights: &[Flight]) -> FleetMetrics {
    // ---
    let live_count = flights.iter().filter(|f| f.is_live()).count();
    let uavs = distinct(flights.iter().map(|f| f.uav.as_str()));
    let pilots = distinct(flights.iter().map(|f| f.pilot.as_str()));
    let locations = distinct(
        flights
            .iter()
            .flat_map(|f| [f.from.as_str(), f.to.as_str()]),
    );
    let total_payload_g: u64 = flights.iter().map(|f| f.payload).sum();

    FleetMetrics {
        total_distance: flights.iter().map(|f| f.distance).sum::<f64>().round(),
        total_flights: flights.len(),
        live_count,
        test_count: flights.len() - live_count,
        uav_count: uavs.len(),
        uavs,
        pilot_count: pilots.len(),
        pilots,
        location_count: locations.len(),
        locations,
        total_minutes: flights.iter().map(Flight::duration_minutes).sum(),
        total_payload_kg: round2(total_payload_g as f64 / 1000.0),
    }
}

/// Point-to-point flights grouped by ordered (from, to), busiest first.
pub fn get_route_stats(flights: &[Flight]) -> Vec<RouteStat> {
    // ---
    let mut routes: Grouped<(&str, &str), (RouteStat, u64)> = Grouped::new();

    for f in flights.iter().filter(|f| f.is_route()) {
        let (stat, minutes) = routes.entry((f.from.as_str(), f.to.as_str()), || {
            let stat = RouteStat {
                route: f.route_label(),
                from: f.from.clone(),
                to: f.to.clone(),
                count: 0,
                total_dist: 0.0,
                avg_duration: 0,
            };
            (stat, 0)
        });
        stat.count += 1;
        stat.total_dist += f.distance;
        *minutes += f.duration_minutes();
    }

    let mut out: Vec<RouteStat> = routes
        .into_vec()
        .into_iter()
        .map(|(mut stat, minutes)| {
            stat.avg_duration = (minutes as f64 / stat.count as f64).round() as u64;
            stat.total_dist = stat.total_dist.round();
            stat
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

pub fn get_pilot_stats(flights: &[Flight]) -> Vec<PilotStat> {
    // ---
    let mut pilots: Grouped<&str, PilotStat> = Grouped::new();

    for f in flights {
        let stat = pilots.entry(f.pilot.as_str(), || PilotStat {
            name: f.pilot.clone(),
            flights: 0,
            live: 0,
            test: 0,
            distance: 0.0,
            minutes: 0,
        });
        stat.flights += 1;
        if f.is_live() {
            stat.live += 1;
        } else {
            stat.test += 1;
        }
        stat.distance += f.distance;
        stat.minutes += f.duration_minutes();
    }

    let mut out = pilots.into_vec();
    out.sort_by(|a, b| b.flights.cmp(&a.flights));
    out
}

/// Per-aircraft rollup in first-seen order. Partitions the input: the
/// per-UAV flight counts always sum to `flights.len()`.
pub fn get_uav_stats(flights: &[Flight]) -> Vec<UavStat> {
    // ---
    let mut uavs: Grouped<&str, UavStat> = Grouped::new();

    for f in flights {
        let stat = uavs.entry(f.uav.as_str(), || UavStat {
            id: f.uav.clone(),
            flights: 0,
            live: 0,
            test: 0,
            distance: 0.0,
            minutes: 0,
            payload: 0,
        });
        stat.flights += 1;
        if f.is_live() {
            stat.live += 1;
        } else {
            stat.test += 1;
        }
        stat.distance += f.distance;
        stat.minutes += f.duration_minutes();
        stat.payload += f.payload;
    }

    uavs.into_vec()
}

/// Per-day rollup, oldest day first.
pub fn get_daily_stats(flights: &[Flight]) -> Vec<DailyStat> {
    // ---
    let mut days: Grouped<NaiveDate, DailyStat> = Grouped::new();

    for f in flights {
        let stat = days.entry(f.date, || DailyStat {
            date: f.date,
            flights: 0,
            distance: 0.0,
            live: 0,
            test: 0,
        });
        stat.flights += 1;
        stat.distance += f.distance;
        if f.is_live() {
            stat.live += 1;
        } else {
            stat.test += 1;
        }
    }

    let mut out = days.into_vec();
    out.sort_by_key(|d| d.date);
    out
}

/// Takeoff/landing/delivery counters per location, most active first.
pub fn get_node_stats(flights: &[Flight]) -> Vec<NodeStat> {
    // ---
    let mut nodes: Grouped<&str, NodeStat> = Grouped::new();
    let blank = |name: &str| NodeStat {
        name: name.to_string(),
        total_flights: 0,
        takeoffs: 0,
        landings: 0,
        deliveries: 0,
    };

    for f in flights {
        let origin = nodes.entry(f.from.as_str(), || blank(&f.from));
        origin.takeoffs += 1;
        origin.total_flights += 1;

        let dest = nodes.entry(f.to.as_str(), || blank(&f.to));
        dest.landings += 1;
        dest.total_flights += 1;
        if f.is_live() {
            dest.deliveries += 1;
        }
    }

    let mut out = nodes.into_vec();
    out.sort_by(|a, b| b.total_flights.cmp(&a.total_flights));
    out
}

/// Rollup of flights carrying an order id.
pub fn get_medical_ops_stats(flights: &[Flight]) -> MedicalOpsStats {
    // ---
    let medical: Vec<&Flight> = flights.iter().filter(|f| f.is_medical()).collect();
    if medical.is_empty() {
        return MedicalOpsStats::default();
    }

    let mut routes: Grouped<(&str, &str), MedicalRoute> = Grouped::new();
    let mut days: Grouped<NaiveDate, MedicalDay> = Grouped::new();

    for f in &medical {
        let route = routes.entry((f.from.as_str(), f.to.as_str()), || MedicalRoute {
            route: f.route_label(),
            deliveries: 0,
            payload_g: 0,
        });
        route.deliveries += 1;
        route.payload_g += f.payload;

        let day = days.entry(f.date, || MedicalDay {
            date: f.date,
            deliveries: 0,
            payload_g: 0,
        });
        day.deliveries += 1;
        day.payload_g += f.payload;
    }

    let mut routes = routes.into_vec();
    routes.sort_by(|a, b| b.deliveries.cmp(&a.deliveries));
    let mut daily = days.into_vec();
    daily.sort_by_key(|d| d.date);

    let total_payload_g: u64 = medical.iter().map(|f| f.payload).sum();
    MedicalOpsStats {
        total_deliveries: medical.len(),
        total_payload_g,
        total_payload_kg: round2(total_payload_g as f64 / 1000.0),
        avg_payload_g: Some((total_payload_g as f64 / medical.len() as f64).round() as u64),
        routes,
        daily,
    }
}

/// Landing-quality rollup: precision landing, LFAO buckets, FLS usage.
pub fn get_landing_stats(flights: &[Flight]) -> LandingStats {
    // ---
    let mut stats = LandingStats::default();

    for f in flights {
        match f.precland {
            Precland::OnMarker => stats.on_marker += 1,
            Precland::OffMarker => stats.off_marker += 1,
            Precland::NotApplicable => stats.not_applicable += 1,
        }
        match f.lfao_outcome() {
            LfaoOutcome::Worked => stats.lfao.worked += 1,
            LfaoOutcome::Partial => stats.lfao.partial += 1,
            LfaoOutcome::Disabled => stats.lfao.disabled += 1,
            LfaoOutcome::Untested => stats.lfao.untested += 1,
            LfaoOutcome::Unknown => stats.lfao.unknown += 1,
        }
        if f.fls == Fls::Use {
            stats.fls_used += 1;
        }
    }

    let marked = stats.on_marker + stats.off_marker;
    if marked > 0 {
        stats.on_marker_rate = round1(stats.on_marker as f64 * 100.0 / marked as f64);
    }
    stats.avg_det_alt = mean(flights.iter().filter_map(|f| f.det_alt));
    stats.avg_land_off = mean(flights.iter().filter_map(|f| f.land_off));
    stats
}

/// All rollups over an already period-filtered list.
pub fn build_dashboard(flights: &[Flight], period: Period) -> DashboardView {
    // ---
    DashboardView {
        period,
        metrics: compute_metrics(flights),
        routes: get_route_stats(flights),
        pilots: get_pilot_stats(flights),
        uavs: get_uav_stats(flights),
        daily: get_daily_stats(flights),
        nodes: get_node_stats(flights),
        medical: get_medical_ops_stats(flights),
        landing: get_landing_stats(flights),
    }
}

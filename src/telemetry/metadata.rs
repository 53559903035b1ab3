//! Metadata fallback tier: registered aircraft joined with open alarms.
//!
//! Records built here carry identity only. Position, speed, and battery stay
//! empty, and every record is tagged `_fromMetadata`.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::source::MetadataSource;
use crate::models::{DroneStatus, DroneTelemetry};

// ---

/// One configured aircraft from the roster endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AircraftMeta {
    #[serde(alias = "drone_id", alias = "aircraft_id")]
    pub id: String,
    #[serde(default)]
    pub aircraft_name: Option<String>,
    #[serde(default)]
    pub aircraft_no: Option<String>,
}

/// One currently-true alarm.
#[derive(Debug, Clone, Deserialize)]
pub struct Alarm {
    #[serde(alias = "drone_id", alias = "aircraft_id")]
    pub id: String,
    #[serde(alias = "alarm", alias = "alarm_name")]
    pub name: String,
}

/// Decode a JSON list item by item, skipping entries that do not fit.
fn decode_list<T: for<'de> Deserialize<'de>>(what: &str, payload: Value) -> Vec<T> {
    // ---
    let Value::Array(items) = payload else {
        tracing::debug!("{} response is not an array", what);
        return Vec::new();
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<T>(item) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::debug!("Skipping {} item {}: {}", what, i, e);
                None
            }
        })
        .collect()
}

/// Join the roster with open alarms by aircraft id.
pub fn join_fleet(roster: Vec<AircraftMeta>, alarms: Vec<Alarm>) -> Vec<DroneTelemetry> {
    // ---
    let mut by_aircraft: HashMap<String, Vec<String>> = HashMap::new();
    for alarm in alarms {
        by_aircraft.entry(alarm.id).or_default().push(alarm.name);
    }

    roster
        .into_iter()
        .filter(|a| !a.id.trim().is_empty())
        .map(|a| DroneTelemetry {
            alarms: by_aircraft.remove(&a.id).unwrap_or_default(),
            aircraft_name: a.aircraft_name.unwrap_or_else(|| a.id.clone()),
            aircraft_no: a.aircraft_no.unwrap_or_default(),
            status: DroneStatus::Unknown,
            from_metadata: true,
            id: a.id,
            ..Default::default()
        })
        .collect()
}

struct Joined {
    drones: Vec<DroneTelemetry>,
    fetched_at: DateTime<Utc>,
}

/// Short-lived cache of the joined fleet, independent of the telemetry cache.
pub struct MetadataCache {
    ttl: Duration,
    entry: Mutex<Option<Joined>>,
}

impl MetadataCache {
    // ---
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    fn cached(&self, now: DateTime<Utc>, fresh_only: bool) -> Option<Vec<DroneTelemetry>> {
        // ---
        let entry = self.entry.lock().unwrap_or_else(PoisonError::into_inner);
        entry
            .as_ref()
            .filter(|j| !fresh_only || now - j.fetched_at <= self.ttl)
            .map(|j| j.drones.clone())
    }

    /// Degraded fleet records, from cache while fresh, else from `source`.
    ///
    /// A failed refresh reuses the last joined fleet if there is one. Returns
    /// `None` when no aircraft are known.
    pub async fn degraded_fleet<M: MetadataSource>(&self, source: &M) -> Option<Vec<DroneTelemetry>> {
        // ---
        if let Some(drones) = self.cached(Utc::now(), true) {
            return Some(drones);
        }

        let roster = match source.fetch_roster().await {
            Ok(payload) => decode_list::<AircraftMeta>("roster", payload),
            Err(e) => {
                tracing::warn!("Aircraft roster unavailable: {}", e);
                return self.cached(Utc::now(), false);
            }
        };
        if roster.is_empty() {
            return self.cached(Utc::now(), false);
        }

        let alarms = match source.fetch_alarms().await {
            Ok(payload) => decode_list::<Alarm>("alarms", payload),
            Err(e) => {
                tracing::warn!("Alarm list unavailable, using roster only: {}", e);
                Vec::new()
            }
        };

        let drones = join_fleet(roster, alarms);
        tracing::debug!("Metadata tier refreshed: {} aircraft", drones.len());

        let mut entry = self.entry.lock().unwrap_or_else(PoisonError::into_inner);
        *entry = Some(Joined {
            drones: drones.clone(),
            fetched_at: Utc::now(),
        });
        Some(drones)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_attaches_alarms_by_id() {
        // ---
        let roster = decode_list::<AircraftMeta>(
            "roster",
            json!([
                { "drone_id": "AS04", "aircraft_name": "Redwing 4" },
                { "aircraft_id": "AS05" },
                { "name": "no id" }
            ]),
        );
        let alarms = decode_list::<Alarm>(
            "alarms",
            json!([
                { "drone_id": "AS05", "alarm": "LOW_BATTERY" },
                { "drone_id": "AS05", "alarm": "GPS_GLITCH" },
                { "drone_id": "AS09", "alarm": "LINK_LOST" }
            ]),
        );
        assert_eq!(roster.len(), 2);

        let fleet = join_fleet(roster, alarms);
        assert_eq!(fleet.len(), 2);
        assert_eq!(fleet[0].aircraft_name, "Redwing 4");
        assert!(fleet[0].alarms.is_empty());
        assert_eq!(fleet[1].aircraft_name, "AS05");
        assert_eq!(fleet[1].alarms, vec!["LOW_BATTERY", "GPS_GLITCH"]);
        assert!(fleet.iter().all(|d| d.from_metadata && !d.from_cache));
        assert!(fleet.iter().all(|d| d.lat.is_none() && d.lon.is_none() && d.alt == 0.0));
        assert!(fleet.iter().all(|d| d.battery_remaining.is_none()));
    }

    #[test]
    fn test_non_array_decodes_to_nothing() {
        // ---
        assert!(decode_list::<Alarm>("alarms", json!({ "error": "down" })).is_empty());
    }
}

//! Canonical data models for the fleet dashboard.
//!
//! `Flight` is produced once per flight-log load and never mutated afterwards;
//! `DroneTelemetry` snapshots are replaced wholesale on every telemetry poll.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---

/// Text form of a flight date, as it appears in the flight log.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Serde adapter rendering a [`NaiveDate`] as `DD-MM-YYYY`.
pub mod dmy_date {
    // ---
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::DATE_FORMAT;

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&date.format(DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let text = String::deserialize(d)?;
        NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(de::Error::custom)
    }
}

/// Live = operational delivery, Test = engineering/validation sortie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightType {
    Live,
    Test,
}

/// Forward-looking-sensor usage flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fls {
    Use,
    Disable,
}

/// Precision-landing outcome relative to the ground marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precland {
    #[serde(rename = "On Marker")]
    OnMarker,
    #[serde(rename = "Off Marker")]
    OffMarker,
    #[serde(rename = "N/A")]
    NotApplicable,
}

/// Bucketed outcome of the landing-feature auto-override script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LfaoOutcome {
    Worked,
    Partial,
    Disabled,
    Untested,
    Unknown,
}

impl LfaoOutcome {
    /// Classify the free-text LFAO column.
    pub fn classify(text: &str) -> Self {
        // ---
        let text = text.trim();
        if text.eq_ignore_ascii_case("worked") {
            LfaoOutcome::Worked
        } else if text.contains("Partial") {
            LfaoOutcome::Partial
        } else if text.starts_with("Disable") {
            LfaoOutcome::Disabled
        } else if text.starts_with("Didn't Test") || text.starts_with("Didn’t Test") {
            LfaoOutcome::Untested
        } else {
            LfaoOutcome::Unknown
        }
    }
}

/// One canonical drone sortie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    // ---
    #[serde(with = "dmy_date")]
    pub date: NaiveDate,
    pub uav: String,
    pub flight_id: String,
    #[serde(rename = "type")]
    pub kind: FlightType,
    pub pilot: String,
    pub from: String,
    pub to: String,
    /// Kilometres.
    pub distance: f64,
    pub takeoff: String,
    pub landing: String,
    /// `HH:MM`.
    pub duration: String,
    /// Grams.
    pub payload: u64,
    pub fls: Fls,
    pub precland: Precland,
    pub lfao: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub det_alt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub land_off: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl Flight {
    // ---
    /// Airtime in minutes; hours and minutes are read independently and
    /// each defaults to 0 when malformed. A total that does not fit is 0.
    pub fn duration_minutes(&self) -> u64 {
        // ---
        let mut parts = self.duration.trim().splitn(2, ':');
        let hours = parts
            .next()
            .and_then(|h| h.trim().parse::<u64>().ok())
            .unwrap_or(0);
        let minutes = parts
            .next()
            .and_then(|m| m.trim().parse::<u64>().ok())
            .unwrap_or(0);
        hours
            .checked_mul(60)
            .and_then(|m| m.checked_add(minutes))
            .unwrap_or(0)
    }

    pub fn is_live(&self) -> bool {
        self.kind == FlightType::Live
    }

    /// A flight whose origin and destination differ.
    pub fn is_route(&self) -> bool {
        self.from != self.to
    }

    /// Medical/order delivery: carries a non-empty order id.
    pub fn is_medical(&self) -> bool {
        self.order_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }

    pub fn route_label(&self) -> String {
        format!("{} → {}", self.from, self.to)
    }

    pub fn lfao_outcome(&self) -> LfaoOutcome {
        LfaoOutcome::classify(&self.lfao)
    }
}

/// Drone state as reported by the telemetry backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DroneStatus {
    Flying,
    OnGround,
    Disconnected,
    PoweredOff,
    #[default]
    Unknown,
}

impl DroneStatus {
    /// Map a raw status string; anything unrecognised is `Unknown`.
    pub fn from_raw(raw: &str) -> Self {
        // ---
        match raw.trim() {
            "flying" => DroneStatus::Flying,
            "on_ground" => DroneStatus::OnGround,
            "disconnected" => DroneStatus::Disconnected,
            "powered_off" => DroneStatus::PoweredOff,
            _ => DroneStatus::Unknown,
        }
    }

    /// Display label for map popups and fleet tables.
    pub fn label(&self) -> &'static str {
        match self {
            DroneStatus::Flying => "FLYING",
            DroneStatus::OnGround => "ON GROUND",
            DroneStatus::Disconnected => "DISCONNECTED",
            DroneStatus::PoweredOff => "POWERED OFF",
            DroneStatus::Unknown => "UNKNOWN",
        }
    }
}

/// One drone snapshot, tagged with the tier that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroneTelemetry {
    // ---
    pub id: String,
    pub sysid: Option<i64>,
    pub status: DroneStatus,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: f64,
    pub relative_alt: f64,
    pub groundspeed: f64,
    pub airspeed: f64,
    pub heading: f64,
    pub climb: f64,
    pub roll: f64,
    pub pitch: f64,
    pub battery_remaining: Option<f64>,
    pub voltage: Option<f64>,
    pub current_consumed: Option<f64>,
    pub temperature: Option<f64>,
    pub timestamp: Option<String>,

    pub aircraft_name: String,
    pub aircraft_no: String,
    pub order_id: Option<String>,
    pub flight_no: Option<String>,
    pub payload_weight: Option<f64>,
    pub takeoff_location: Option<String>,
    pub landing_location: Option<String>,
    pub last_received: Option<String>,

    /// Open alarms; only populated by the metadata tier.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alarms: Vec<String>,

    #[serde(rename = "_fromCache")]
    pub from_cache: bool,
    #[serde(rename = "_fromMetadata")]
    pub from_metadata: bool,
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn create_test_flight(duration: &str) -> Flight {
        // ---
        Flight {
            date: NaiveDate::from_ymd_opt(2025, 12, 5).unwrap(),
            uav: "AS04".to_string(),
            flight_id: "AP01LF15L01".to_string(),
            kind: FlightType::Live,
            pilot: "Krupa Sagar".to_string(),
            from: "Paderu".to_string(),
            to: "Araku Valley".to_string(),
            distance: 34.7,
            takeoff: "11:12".to_string(),
            landing: "11:38".to_string(),
            duration: duration.to_string(),
            payload: 0,
            fls: Fls::Use,
            precland: Precland::OnMarker,
            lfao: "Worked".to_string(),
            det_alt: None,
            land_off: None,
            version: None,
            order_id: None,
            remarks: None,
        }
    }

    #[test]
    fn test_duration_minutes() {
        // ---
        assert_eq!(create_test_flight("00:26").duration_minutes(), 26);
        assert_eq!(create_test_flight("01:05").duration_minutes(), 65);
        assert_eq!(create_test_flight("ab:07").duration_minutes(), 7);
        assert_eq!(create_test_flight("01:xx").duration_minutes(), 60);
        assert_eq!(create_test_flight("").duration_minutes(), 0);
        assert_eq!(
            create_test_flight("18446744073709551615:00").duration_minutes(),
            0
        );
    }

    #[test]
    fn test_medical_requires_non_blank_order() {
        // ---
        let mut flight = create_test_flight("00:26");
        assert!(!flight.is_medical());

        flight.order_id = Some("   ".to_string());
        assert!(!flight.is_medical());

        flight.order_id = Some("ORD-118".to_string());
        assert!(flight.is_medical());
    }

    #[test]
    fn test_lfao_buckets() {
        // ---
        assert_eq!(LfaoOutcome::classify("Worked"), LfaoOutcome::Worked);
        assert_eq!(LfaoOutcome::classify("Partially Worked"), LfaoOutcome::Partial);
        assert_eq!(LfaoOutcome::classify("Disable"), LfaoOutcome::Disabled);
        assert_eq!(LfaoOutcome::classify("Didn't Test"), LfaoOutcome::Untested);
        assert_eq!(LfaoOutcome::classify("??"), LfaoOutcome::Unknown);
    }

    #[test]
    fn test_status_mapping() {
        // ---
        assert_eq!(DroneStatus::from_raw("flying"), DroneStatus::Flying);
        assert_eq!(DroneStatus::from_raw("on_ground").label(), "ON GROUND");
        assert_eq!(DroneStatus::from_raw("hovering"), DroneStatus::Unknown);
    }

    #[test]
    fn test_flight_serializes_dashboard_shape() {
        // ---
        let json = serde_json::to_value(create_test_flight("00:26")).unwrap();

        assert_eq!(json["date"], "05-12-2025");
        assert_eq!(json["type"], "Live");
        assert_eq!(json["flightId"], "AP01LF15L01");
        assert_eq!(json["precland"], "On Marker");
        assert!(json.get("orderId").is_none());
    }
}

//! Record normalizer: raw flight-log rows and raw telemetry JSON into the
//! canonical [`Flight`] and [`DroneTelemetry`] models.
//!
//! Both paths are best-effort. The only rejections are a flight row without a
//! valid `DD-MM-YYYY` date or UAV id, and a drone record without an id. Every
//! other malformed field falls back to `0`, `None`, or `unknown`.

use chrono::NaiveDate;
use serde_json::Value;

use crate::models::{
    DroneStatus, DroneTelemetry, Flight, FlightType, Fls, Precland, DATE_FORMAT,
};

// ---

/// Zero-based positions of the flight-log columns.
pub mod col {
    pub const DATE: usize = 0;
    pub const UAV: usize = 1;
    pub const FLIGHT_ID: usize = 2;
    pub const TYPE: usize = 3;
    pub const PILOT: usize = 4;
    pub const FROM: usize = 5;
    pub const TO: usize = 6;
    pub const DISTANCE: usize = 7;
    pub const TAKEOFF: usize = 8;
    pub const LANDING: usize = 9;
    pub const DURATION: usize = 10;
    pub const PAYLOAD: usize = 11;
    pub const FLS: usize = 12;
    pub const PRECLAND: usize = 13;
    pub const DET_ALT: usize = 14;
    pub const LAND_OFF: usize = 15;
    pub const LFAO: usize = 16;
    pub const VERSION: usize = 17;
    pub const ORDER_ID: usize = 18;
    pub const REMARKS: usize = 19;
}

/// Largest payload accepted, in grams; anything above is malformed.
const MAX_PAYLOAD_G: f64 = u32::MAX as f64;

/// Largest airtime hour count accepted (one year).
const MAX_DURATION_HOURS: u64 = 24 * 365;

/// Normalize one flight-log row. Returns `None` when the date or UAV gate
/// fails; the caller drops such rows silently.
pub fn normalize_flight_row(row: &[&str]) -> Option<Flight> {
    // ---
    let field = |idx: usize| row.get(idx).map(|s| s.trim()).unwrap_or("");

    let date = parse_flight_date(field(col::DATE))?;
    let uav = field(col::UAV);
    if uav.is_empty() {
        return None;
    }

    let kind = if field(col::TYPE).contains("Live") {
        FlightType::Live
    } else {
        FlightType::Test
    };

    Some(Flight {
        date,
        uav: uav.to_string(),
        flight_id: field(col::FLIGHT_ID).to_string(),
        kind,
        pilot: field(col::PILOT).to_string(),
        from: field(col::FROM).to_string(),
        to: field(col::TO).to_string(),
        distance: parse_non_negative(field(col::DISTANCE)).unwrap_or(0.0),
        takeoff: clock_from_raw(field(col::TAKEOFF)),
        landing: clock_from_raw(field(col::LANDING)),
        duration: duration_from_raw(field(col::DURATION)),
        payload: parse_non_negative(field(col::PAYLOAD))
            .filter(|g| *g <= MAX_PAYLOAD_G)
            .map(|g| g.round() as u64)
            .unwrap_or(0),
        fls: parse_fls(field(col::FLS)),
        precland: parse_precland(field(col::PRECLAND)),
        lfao: field(col::LFAO).to_string(),
        det_alt: parse_finite(field(col::DET_ALT)),
        land_off: parse_finite(field(col::LAND_OFF)),
        version: non_empty(field(col::VERSION)),
        order_id: non_empty(field(col::ORDER_ID)),
        remarks: non_empty(field(col::REMARKS)),
    })
}

/// Parse a date that must look exactly like `DD-MM-YYYY`.
pub fn parse_flight_date(text: &str) -> Option<NaiveDate> {
    // ---
    let bytes = text.trim().as_bytes();
    let shaped = bytes.len() == 10
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| if i == 2 || i == 5 { *b == b'-' } else { b.is_ascii_digit() });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

/// Turn a raw 3-4 digit clock value (`900`, `1705`) into `HH:MM`.
///
/// Separators are ignored, so `17:05` passes through unchanged. Anything
/// without 1-4 digits becomes `00:00`.
pub fn clock_from_raw(raw: &str) -> String {
    // ---
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() || digits.len() > 4 {
        return "00:00".to_string();
    }
    let padded = format!("{:0>4}", digits);
    format!("{}:{}", &padded[..2], &padded[2..])
}

/// Re-render an `H:MM` airtime as `HH:MM`. Hours and minutes are read
/// independently; a part that is malformed or out of range becomes 0.
pub fn duration_from_raw(raw: &str) -> String {
    // ---
    let mut parts = raw.trim().splitn(2, ':');
    let hours = parts
        .next()
        .and_then(|h| h.trim().parse::<u64>().ok())
        .filter(|h| *h <= MAX_DURATION_HOURS)
        .unwrap_or(0);
    let minutes = parts
        .next()
        .and_then(|m| m.trim().parse::<u64>().ok())
        .filter(|m| *m < 60)
        .unwrap_or(0);
    format!("{hours:02}:{minutes:02}")
}

fn parse_finite(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_non_negative(text: &str) -> Option<f64> {
    parse_finite(text).filter(|v| *v >= 0.0)
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

fn parse_fls(text: &str) -> Fls {
    if text.eq_ignore_ascii_case("use") {
        Fls::Use
    } else {
        Fls::Disable
    }
}

fn parse_precland(text: &str) -> Precland {
    // ---
    let lower = text.to_ascii_lowercase();
    if lower.starts_with("on") {
        Precland::OnMarker
    } else if lower.starts_with("off") {
        Precland::OffMarker
    } else {
        Precland::NotApplicable
    }
}

// ---

/// Normalize a telemetry response body.
///
/// Accepts a JSON array of drone objects or an object whose values are drone
/// objects. Anything else, including `{}`, yields an empty list, which the
/// fetcher treats as a failed poll.
pub fn normalize_telemetry_payload(payload: &Value) -> Vec<DroneTelemetry> {
    // ---
    let items: Vec<&Value> = match payload {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => Vec::new(),
    };

    items.into_iter().filter_map(normalize_drone).collect()
}

/// Normalize one raw drone object; `None` when it has no `drone_id`.
pub fn normalize_drone(raw: &Value) -> Option<DroneTelemetry> {
    // ---
    let id = text(raw, "drone_id")?;

    Some(DroneTelemetry {
        sysid: raw.get("sysid").and_then(Value::as_i64),
        status: text(raw, "status")
            .map(|s| DroneStatus::from_raw(&s))
            .unwrap_or_default(),
        lat: number(raw, "lat"),
        lon: number(raw, "lon"),
        alt: number(raw, "alt").unwrap_or(0.0),
        relative_alt: number(raw, "relative_alt")
            .map(|mm| mm / 1000.0)
            .unwrap_or(0.0),
        groundspeed: number(raw, "groundspeed").unwrap_or(0.0),
        airspeed: number(raw, "airspeed").unwrap_or(0.0),
        heading: number(raw, "hdg")
            .or_else(|| number(raw, "heading"))
            .unwrap_or(0.0),
        climb: number(raw, "climb").unwrap_or(0.0),
        roll: number(raw, "roll").unwrap_or(0.0),
        pitch: number(raw, "pitch").unwrap_or(0.0),
        battery_remaining: number(raw, "battery_remaining"),
        voltage: number(raw, "processed_voltage").or_else(|| number(raw, "voltage")),
        current_consumed: number(raw, "current_consumed"),
        temperature: number(raw, "system_temperature"),
        timestamp: text(raw, "timestamp"),
        aircraft_name: text(raw, "aircraft_name").unwrap_or_else(|| id.clone()),
        aircraft_no: text(raw, "aircraft_no").unwrap_or_default(),
        order_id: text(raw, "order_id"),
        flight_no: text(raw, "flight_no"),
        payload_weight: number(raw, "payload_weight"),
        takeoff_location: text(raw, "takeoff_location"),
        landing_location: text(raw, "landing_location"),
        last_received: text(raw, "last_received"),
        id,
        ..Default::default()
    })
}

/// Numeric field; numeric strings are accepted too.
fn number(raw: &Value, key: &str) -> Option<f64> {
    // ---
    match raw.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Non-empty text field; numbers are rendered as text.
fn text(raw: &Value, key: &str) -> Option<String> {
    // ---
    match raw.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

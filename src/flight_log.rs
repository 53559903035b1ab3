//! Flight-log acquisition: fetch the tabular export, normalize its rows, and
//! hold the latest list for the dashboard.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::ReaderBuilder;

use crate::models::Flight;
use crate::normalize::normalize_flight_row;

// ---

/// Leading header/metadata rows in every export.
pub const SKIPPED_ROWS: usize = 3;

/// Where the flight log lives: an `http(s)` URL or a local path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlightLogSource {
    Url(String),
    File(String),
}

impl FlightLogSource {
    pub fn parse(location: &str) -> Self {
        // ---
        let location = location.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            FlightLogSource::Url(location.to_string())
        } else {
            FlightLogSource::File(location.to_string())
        }
    }
}

/// Parse CSV text into flights, skipping the leading rows and dropping
/// rejected ones. Returns the flights and the number of dropped rows.
pub fn parse_flight_csv(text: &str) -> (Vec<Flight>, usize) {
    // ---
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut flights = Vec::new();
    let mut dropped = 0;

    for (i, record) in rdr.records().enumerate().skip(SKIPPED_ROWS) {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Unreadable flight-log row {}: {}", i + 1, e);
                dropped += 1;
                continue;
            }
        };

        let row: Vec<&str> = record.iter().collect();
        match normalize_flight_row(&row) {
            Some(flight) => flights.push(flight),
            None => {
                tracing::trace!("Dropped flight-log row {}: {:?}", i + 1, row);
                dropped += 1;
            }
        }
    }

    (flights, dropped)
}

/// HTTP client for flight-log fetches. `timeout` bounds the whole request,
/// so a stalled upstream fails the cycle instead of wedging the poller.
pub fn flight_log_client(timeout: Duration) -> Result<reqwest::Client> {
    // ---
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build flight-log HTTP client")
}

/// Fetch and parse the flight log once.
pub async fn load_flights(client: &reqwest::Client, source: &FlightLogSource) -> Result<Vec<Flight>> {
    // ---
    let text = match source {
        FlightLogSource::Url(url) => client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("Failed to fetch flight log from {url}"))?
            .text()
            .await
            .context("Failed to read flight log body")?,
        FlightLogSource::File(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read flight log file {path}"))?,
    };

    let (flights, dropped) = parse_flight_csv(&text);
    tracing::debug!(
        "Parsed {} flights ({} rows dropped)",
        flights.len(),
        dropped
    );
    Ok(flights)
}

#[derive(Debug, Clone)]
pub struct FlightSnapshot {
    pub flights: Arc<Vec<Flight>>,
    pub loaded_at: Option<DateTime<Utc>>,
}

/// Most recent flight list; replaced whole on every successful load.
#[derive(Debug)]
pub struct FlightStore {
    current: RwLock<FlightSnapshot>,
}

impl Default for FlightStore {
    fn default() -> Self {
        Self {
            current: RwLock::new(FlightSnapshot {
                flights: Arc::new(Vec::new()),
                loaded_at: None,
            }),
        }
    }
}

impl FlightStore {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, flights: Vec<Flight>, loaded_at: DateTime<Utc>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = FlightSnapshot {
            flights: Arc::new(flights),
            loaded_at: Some(loaded_at),
        };
    }

    pub fn snapshot(&self) -> FlightSnapshot {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn flights(&self) -> Arc<Vec<Flight>> {
        self.snapshot().flights
    }
}

/// Reload the flight log forever on a fixed cadence. A failed load keeps
/// the previous list.
pub async fn run_poller(
    client: reqwest::Client,
    source: FlightLogSource,
    store: Arc<FlightStore>,
    every: Duration,
) {
    // ---
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match load_flights(&client, &source).await {
            Ok(flights) => {
                tracing::info!("Flight log refreshed: {} flights", flights.len());
                store.replace(flights, Utc::now());
            }
            Err(e) => {
                tracing::warn!("Flight log refresh failed, keeping previous data: {:#}", e);
            }
        }
    }
}

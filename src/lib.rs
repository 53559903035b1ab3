//! Backend for the drone-delivery fleet operations dashboard.
//!
//! Two pollers feed the HTTP layer: the flight log (tabular export,
//! normalized into [`models::Flight`]) and live telemetry (tiered
//! live → cache → metadata → empty). Everything the dashboard shows is
//! derived per request from those two snapshots.

pub mod analytics;
pub mod config;
pub mod flight_log;
pub mod models;
pub mod network;
pub mod normalize;
pub mod period;
pub mod routes;
pub mod telemetry;

pub use config::Config;

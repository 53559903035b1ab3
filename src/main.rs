//! Application entry point for the `fleetdash` backend service.
//!
//! This binary orchestrates the full startup sequence for the fleet
//! dashboard API, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Starting the flight-log and telemetry pollers
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving requests
//!
//! # Environment Variables
//! - `FLIGHT_LOG_URL` (**required**) – flight-log CSV URL or file path
//! - `TELEMETRY_API_URL` (**required**) – telemetry backend base URL
//! - `FLEETDASH_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `FLEETDASH_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See [`fleetdash::config`] for the remaining tunables.
use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::Router;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use fleetdash::config;
use fleetdash::flight_log::{self, FlightLogSource, FlightStore};
use fleetdash::routes::{self, AppState};
use fleetdash::telemetry::{self, FeedBoard, HttpSource, TelemetryCache, TelemetryFetcher};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let state = AppState {
        flights: Arc::new(FlightStore::new()),
        feed: Arc::new(FeedBoard::new()),
        cache: Arc::new(TelemetryCache::new()),
    };

    let source = FlightLogSource::parse(&cfg.flight_log_url);
    tracing::info!("Polling flight log every {:?}", cfg.flight_poll_interval());
    let client = flight_log::flight_log_client(cfg.flight_log_timeout())?;
    tokio::spawn(flight_log::run_poller(
        client,
        source,
        state.flights.clone(),
        cfg.flight_poll_interval(),
    ));

    let http = HttpSource::new(&cfg)?;
    let fetcher = TelemetryFetcher::new(
        http.clone(),
        http,
        state.cache.clone(),
        cfg.fetch_policy(),
    );
    tracing::info!("Polling telemetry every {:?}", cfg.telemetry_poll_interval());
    tokio::spawn(telemetry::run_poller(
        fetcher,
        state.feed.clone(),
        cfg.telemetry_poll_interval(),
    ));

    // Build app from routes gateway (EMBP)
    let app: Router = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.listen_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---

/// Install the global `tracing` subscriber. Call once, before any logging.
///
/// - Filter: `RUST_LOG` if it parses, else `FLEETDASH_LOG_LEVEL` (any
///   `EnvFilter` directive, default `debug`) with the HTTP client stack
///   capped at `warn`.
/// - Span events: `FLEETDASH_SPAN_EVENTS=full|enter_exit`, else close only.
/// - Colour: `FORCE_COLOR=1|true|yes` or `0|false|no`, else TTY detection.
fn init_tracing() {
    // ---
    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events())
        .with_env_filter(log_filter())
        .with_ansi(use_color())
        .compact()
        .init();
}

fn log_filter() -> EnvFilter {
    // ---
    const QUIET_DEPS: &str = "hyper=warn,hyper_util=warn,reqwest=warn";

    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = env::var("FLEETDASH_LOG_LEVEL").unwrap_or_else(|_| "debug".to_string());
        EnvFilter::try_new(format!("{},{QUIET_DEPS}", level.trim()))
            .unwrap_or_else(|_| EnvFilter::new(format!("debug,{QUIET_DEPS}")))
    })
}

fn span_events() -> FmtSpan {
    match env::var("FLEETDASH_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    }
}

fn use_color() -> bool {
    match env::var("FORCE_COLOR").as_deref() {
        Ok("1" | "true" | "yes") => true,
        Ok("0" | "false" | "no") => false,
        _ => std::io::stdout().is_terminal(),
    }
}

//! Live telemetry acquisition (EMBP gateway).
//!
//! Siblings stay private; this module exports the fetcher, the cache, the
//! sources, and the shared board the HTTP layer reads the latest feed from.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;

mod cache;
mod fetcher;
mod metadata;
mod source;

pub use cache::{CacheStatus, CachedSnapshot, TelemetryCache};
pub use fetcher::{FetchPolicy, TelemetryFeed, TelemetryFetcher, TelemetryTier};
pub use source::{FetchError, HttpSource, MetadataSource, TelemetrySource};

// ---

/// Latest feed produced by the poller, swapped whole on every cycle.
#[derive(Debug)]
pub struct FeedBoard {
    latest: RwLock<Arc<TelemetryFeed>>,
}

impl Default for FeedBoard {
    fn default() -> Self {
        Self {
            latest: RwLock::new(Arc::new(TelemetryFeed::empty(Utc::now()))),
        }
    }
}

impl FeedBoard {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, feed: TelemetryFeed) {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(feed);
    }

    pub fn latest(&self) -> Arc<TelemetryFeed> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Poll the fetcher forever on a fixed cadence, publishing each feed.
pub async fn run_poller<L, M>(fetcher: TelemetryFetcher<L, M>, board: Arc<FeedBoard>, every: Duration)
where
    L: TelemetrySource,
    M: MetadataSource,
{
    // ---
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let feed = fetcher.fetch_feed().await;
        tracing::info!(
            "Telemetry poll: tier={:?} drones={}",
            feed.tier,
            feed.drones.len()
        );
        board.publish(feed);
    }
}

//! Tiered telemetry acquisition: live → cache → metadata → empty.
//!
//! One call to [`TelemetryFetcher::fetch_feed`] is one poll cycle. Upstream
//! failures are absorbed here and only show up as the tier of the returned
//! feed and in the cache status.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::time::{sleep, timeout};

use super::cache::TelemetryCache;
use super::metadata::MetadataCache;
use super::source::{FetchError, MetadataSource, TelemetrySource};
use crate::models::DroneTelemetry;
use crate::normalize::normalize_telemetry_payload;

// ---

/// Timing knobs for one poll cycle.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub timeout: StdDuration,
    /// Attempts after the first one.
    pub retries: u32,
    /// Linear backoff step; attempt `n` waits `n * backoff`.
    pub backoff: StdDuration,
    pub max_cache_age: Duration,
    pub metadata_ttl: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: StdDuration::from_secs(8),
            retries: 2,
            backoff: StdDuration::from_millis(250),
            max_cache_age: Duration::minutes(5),
            metadata_ttl: Duration::minutes(2),
        }
    }
}

/// Which tier produced a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryTier {
    Live,
    Cached,
    Metadata,
    Empty,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryFeed {
    pub tier: TelemetryTier,
    pub drones: Vec<DroneTelemetry>,
    pub polled_at: DateTime<Utc>,
}

impl TelemetryFeed {
    pub fn empty(polled_at: DateTime<Utc>) -> Self {
        Self {
            tier: TelemetryTier::Empty,
            drones: Vec::new(),
            polled_at,
        }
    }
}

pub struct TelemetryFetcher<L, M> {
    // ---
    live: L,
    metadata_source: M,
    metadata: MetadataCache,
    cache: Arc<TelemetryCache>,
    policy: FetchPolicy,
}

impl<L: TelemetrySource, M: MetadataSource> TelemetryFetcher<L, M> {
    // ---
    pub fn new(live: L, metadata_source: M, cache: Arc<TelemetryCache>, policy: FetchPolicy) -> Self {
        Self {
            live,
            metadata_source,
            metadata: MetadataCache::new(policy.metadata_ttl),
            cache,
            policy,
        }
    }

    pub fn cache(&self) -> &Arc<TelemetryCache> {
        &self.cache
    }

    /// Drone records for this poll; never fails, possibly empty.
    pub async fn fetch(&self) -> Vec<DroneTelemetry> {
        self.fetch_feed().await.drones
    }

    /// Run one poll cycle and report which tier answered.
    pub async fn fetch_feed(&self) -> TelemetryFeed {
        // ---
        let sequence = self.cache.next_sequence();

        match self.fetch_live_with_retry().await {
            Ok(drones) => {
                let now = Utc::now();
                self.cache.store(drones.clone(), now, sequence);
                tracing::debug!("Poll #{}: {} live drones", sequence, drones.len());
                return TelemetryFeed {
                    tier: TelemetryTier::Live,
                    drones,
                    polled_at: now,
                };
            }
            Err(e) => {
                let failures = self.cache.record_failure();
                tracing::warn!(
                    "Poll #{}: live telemetry unavailable ({}), {} consecutive failures",
                    sequence,
                    e,
                    failures
                );
            }
        }

        let now = Utc::now();
        if let Some(snapshot) = self.cache.snapshot() {
            let age = now - snapshot.fetched_at;
            if age <= self.policy.max_cache_age {
                tracing::info!("Serving cached telemetry ({}s old)", age.num_seconds());
                let drones = snapshot
                    .drones
                    .iter()
                    .cloned()
                    .map(|mut d| {
                        d.from_cache = true;
                        d
                    })
                    .collect();
                return TelemetryFeed {
                    tier: TelemetryTier::Cached,
                    drones,
                    polled_at: now,
                };
            }
            tracing::debug!("Cached telemetry too old ({}s)", age.num_seconds());
        }

        if let Some(drones) = self.metadata.degraded_fleet(&self.metadata_source).await {
            tracing::info!("Serving metadata fallback for {} aircraft", drones.len());
            return TelemetryFeed {
                tier: TelemetryTier::Metadata,
                drones,
                polled_at: now,
            };
        }

        tracing::warn!("No telemetry tier available");
        TelemetryFeed::empty(now)
    }

    /// Sequential attempts with a per-attempt timeout and linear backoff.
    async fn fetch_live_with_retry(&self) -> Result<Vec<DroneTelemetry>, FetchError> {
        // ---
        let mut last_error = FetchError::Empty;

        for attempt in 0..=self.policy.retries {
            if attempt > 0 {
                let delay = self.policy.backoff * attempt;
                tracing::debug!("Retry {} after {:?}: {}", attempt, delay, last_error);
                if !delay.is_zero() {
                    sleep(delay).await;
                }
            }

            last_error = match timeout(self.policy.timeout, self.live.fetch_live()).await {
                Ok(Ok(payload)) => {
                    let drones = normalize_telemetry_payload(&payload);
                    if !drones.is_empty() {
                        return Ok(drones);
                    }
                    FetchError::Empty
                }
                Ok(Err(e)) => e,
                Err(_) => FetchError::Timeout,
            };
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use serde_json::{json, Value};

    /// Replays scripted responses, then fails with 503 forever.
    struct FakeLive {
        script: Mutex<VecDeque<Result<Value, FetchError>>>,
        delay: StdDuration,
        calls: AtomicUsize,
    }

    impl FakeLive {
        fn scripted(script: Vec<Result<Value, FetchError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                delay: StdDuration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self::scripted(Vec::new())
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TelemetrySource for FakeLive {
        async fn fetch_live(&self) -> Result<Value, FetchError> {
            // ---
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            next.unwrap_or(Err(FetchError::Status(503)))
        }
    }

    struct FakeMeta {
        roster: Option<Value>,
        alarms: Option<Value>,
        roster_calls: AtomicUsize,
    }

    impl FakeMeta {
        fn new(roster: Option<Value>, alarms: Option<Value>) -> Self {
            Self {
                roster,
                alarms,
                roster_calls: AtomicUsize::new(0),
            }
        }

        fn unavailable() -> Self {
            Self::new(None, None)
        }
    }

    impl MetadataSource for FakeMeta {
        async fn fetch_roster(&self) -> Result<Value, FetchError> {
            self.roster_calls.fetch_add(1, Ordering::SeqCst);
            self.roster.clone().ok_or(FetchError::Status(500))
        }

        async fn fetch_alarms(&self) -> Result<Value, FetchError> {
            self.alarms.clone().ok_or(FetchError::Http("connection refused".into()))
        }
    }

    fn create_test_policy() -> FetchPolicy {
        FetchPolicy {
            timeout: StdDuration::from_millis(200),
            backoff: StdDuration::ZERO,
            ..FetchPolicy::default()
        }
    }

    fn create_test_fetcher(live: FakeLive, meta: FakeMeta) -> TelemetryFetcher<FakeLive, FakeMeta> {
        TelemetryFetcher::new(live, meta, Arc::new(TelemetryCache::new()), create_test_policy())
    }

    fn live_payload() -> Value {
        json!([
            { "drone_id": "AS04", "status": "flying", "lat": 18.2, "lon": 82.7, "alt": 120.5, "battery_remaining": 64 },
            { "drone_id": "AS05", "status": "on_ground", "lat": 18.08, "lon": 82.66 }
        ])
    }

    fn seed_cache(cache: &TelemetryCache, age: Duration) {
        let drones = normalize_telemetry_payload(&live_payload());
        cache.store(drones, Utc::now() - age, cache.next_sequence());
    }

    #[tokio::test]
    async fn test_live_success_fills_cache() {
        // ---
        let fetcher = create_test_fetcher(FakeLive::scripted(vec![Ok(live_payload())]), FakeMeta::unavailable());
        fetcher.cache().record_failure();

        let feed = fetcher.fetch_feed().await;
        assert_eq!(feed.tier, TelemetryTier::Live);
        assert_eq!(feed.drones.len(), 2);
        assert!(feed.drones.iter().all(|d| !d.from_cache && !d.from_metadata));

        let status = fetcher.cache().status(Utc::now());
        assert!(status.is_cached);
        assert!(!status.is_stale);
        assert_eq!(status.cached_drones, 2);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        // ---
        let live = FakeLive::scripted(vec![
            Err(FetchError::Status(502)),
            Ok(json!({})),
            Ok(live_payload()),
        ]);
        let fetcher = create_test_fetcher(live, FakeMeta::unavailable());

        let feed = fetcher.fetch_feed().await;
        assert_eq!(feed.tier, TelemetryTier::Live);
        assert_eq!(fetcher.live.calls(), 3);
    }

    #[tokio::test]
    async fn test_failing_polls_serve_recent_cache() {
        // ---
        let fetcher = create_test_fetcher(FakeLive::failing(), FakeMeta::unavailable());
        seed_cache(fetcher.cache(), Duration::seconds(90));

        let mut feed = fetcher.fetch_feed().await;
        for _ in 0..2 {
            feed = fetcher.fetch_feed().await;
        }

        assert_eq!(feed.tier, TelemetryTier::Cached);
        assert_eq!(feed.drones.len(), 2);
        assert!(feed.drones.iter().all(|d| d.from_cache && !d.from_metadata));
        assert_eq!(feed.drones[0].lat, Some(18.2));

        let status = fetcher.cache().status(Utc::now());
        assert!(status.is_stale);
        assert_eq!(status.consecutive_failures, 3);
        assert_eq!(status.age, "1m ago");
        // 3 polls x (1 + 2 retries)
        assert_eq!(fetcher.live.calls(), 9);
    }

    #[tokio::test]
    async fn test_no_cache_falls_back_to_metadata() {
        // ---
        let meta = FakeMeta::new(
            Some(json!([{ "drone_id": "AS04" }, { "drone_id": "AS05", "aircraft_name": "Redwing 5" }])),
            Some(json!([{ "drone_id": "AS05", "alarm": "LOW_BATTERY" }])),
        );
        let fetcher = create_test_fetcher(FakeLive::failing(), meta);

        let drones = fetcher.fetch().await;
        assert_eq!(drones.len(), 2);
        assert!(drones.iter().all(|d| d.from_metadata && !d.from_cache));
        assert!(drones.iter().all(|d| d.lat.is_none() && d.lon.is_none() && d.alt == 0.0));
        assert_eq!(drones[1].alarms, vec!["LOW_BATTERY"]);
    }

    #[tokio::test]
    async fn test_expired_cache_is_skipped_for_metadata() {
        // ---
        let meta = FakeMeta::new(Some(json!([{ "drone_id": "AS09" }])), Some(json!([])));
        let fetcher = create_test_fetcher(FakeLive::failing(), meta);
        seed_cache(fetcher.cache(), Duration::minutes(10));

        let feed = fetcher.fetch_feed().await;
        assert_eq!(feed.tier, TelemetryTier::Metadata);
        assert_eq!(feed.drones.len(), 1);
        assert_eq!(feed.drones[0].id, "AS09");
        assert!(!feed.drones[0].from_cache);

        // The expired snapshot is kept, not cleared
        assert!(fetcher.cache().status(Utc::now()).is_cached);
    }

    #[tokio::test]
    async fn test_metadata_is_cached_between_polls() {
        // ---
        let meta = FakeMeta::new(Some(json!([{ "drone_id": "AS04" }])), None);
        let fetcher = create_test_fetcher(FakeLive::failing(), meta);

        assert_eq!(fetcher.fetch_feed().await.tier, TelemetryTier::Metadata);
        assert_eq!(fetcher.fetch_feed().await.tier, TelemetryTier::Metadata);
        assert_eq!(fetcher.metadata_source.roster_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_nothing_available_yields_empty() {
        // ---
        let fetcher = create_test_fetcher(FakeLive::failing(), FakeMeta::unavailable());

        let feed = fetcher.fetch_feed().await;
        assert_eq!(feed.tier, TelemetryTier::Empty);
        assert!(feed.drones.is_empty());
        assert_eq!(fetcher.cache().consecutive_failures(), 1);
    }

    #[tokio::test]
    async fn test_empty_object_counts_as_failure() {
        // ---
        let live = FakeLive::scripted(vec![Ok(json!({})), Ok(json!({})), Ok(json!({}))]);
        let fetcher = create_test_fetcher(live, FakeMeta::unavailable());
        seed_cache(fetcher.cache(), Duration::seconds(5));

        let feed = fetcher.fetch_feed().await;
        assert_eq!(feed.tier, TelemetryTier::Cached);
        assert_eq!(fetcher.cache().consecutive_failures(), 1);
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        // ---
        let mut live = FakeLive::scripted(vec![Ok(live_payload())]);
        live.delay = StdDuration::from_secs(5);
        let policy = FetchPolicy {
            timeout: StdDuration::from_millis(20),
            retries: 0,
            ..create_test_policy()
        };
        let fetcher = TelemetryFetcher::new(live, FakeMeta::unavailable(), Arc::new(TelemetryCache::new()), policy);

        let result = fetcher.fetch_live_with_retry().await;
        assert!(matches!(result, Err(FetchError::Timeout)));
    }
}

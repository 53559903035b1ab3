//! Owned telemetry cache: the most recent successful snapshot, its
//! timestamp, and the consecutive-failure counter.
//!
//! One instance is built at startup and shared by handle. The fetch cycle is
//! the only writer; status queries and rendering only read. Snapshots are
//! swapped whole, so readers never observe a partial update.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::DroneTelemetry;

// ---

#[derive(Debug, Clone)]
pub struct CachedSnapshot {
    pub drones: Vec<DroneTelemetry>,
    pub fetched_at: DateTime<Utc>,
    /// Poll-cycle sequence number that produced this snapshot.
    pub sequence: u64,
}

/// Read-only view for the presentation layer. Informational only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    /// At least one poll has failed since the last success.
    pub is_stale: bool,
    pub is_cached: bool,
    pub last_success: Option<DateTime<Utc>>,
    /// `"12s ago"`, `"4m ago"`, `"2h ago"`, or `"never"`.
    pub age: String,
    pub consecutive_failures: u32,
    pub cached_drones: usize,
}

#[derive(Debug, Default)]
pub struct TelemetryCache {
    // ---
    snapshot: RwLock<Option<Arc<CachedSnapshot>>>,
    failures: AtomicU32,
    sequence: AtomicU64,
}

impl TelemetryCache {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number for a new poll cycle; strictly increasing.
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Replace the snapshot and reset the failure counter.
    ///
    /// A write from a cycle older than the stored snapshot is dropped so a
    /// slow overlapping poll cannot overwrite newer data. Returns whether the
    /// snapshot was replaced.
    pub fn store(&self, drones: Vec<DroneTelemetry>, fetched_at: DateTime<Utc>, sequence: u64) -> bool {
        // ---
        self.failures.store(0, Ordering::SeqCst);

        let mut slot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|s| s.sequence > sequence) {
            tracing::debug!("Discarding late telemetry from poll #{}", sequence);
            return false;
        }
        *slot = Some(Arc::new(CachedSnapshot {
            drones,
            fetched_at,
            sequence,
        }));
        true
    }

    /// Count one failed poll; returns the new consecutive count.
    pub fn record_failure(&self) -> u32 {
        self.failures.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Option<Arc<CachedSnapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn status(&self, now: DateTime<Utc>) -> CacheStatus {
        // ---
        let snapshot = self.snapshot();
        let failures = self.consecutive_failures();

        CacheStatus {
            is_stale: failures > 0,
            is_cached: snapshot.is_some(),
            last_success: snapshot.as_ref().map(|s| s.fetched_at),
            age: snapshot
                .as_ref()
                .map(|s| format_age((now - s.fetched_at).num_seconds()))
                .unwrap_or_else(|| "never".to_string()),
            consecutive_failures: failures,
            cached_drones: snapshot.as_ref().map_or(0, |s| s.drones.len()),
        }
    }
}

/// Bucket an age in seconds into seconds, minutes, or hours ago.
pub fn format_age(seconds: i64) -> String {
    // ---
    let seconds = seconds.max(0);
    if seconds < 60 {
        format!("{seconds}s ago")
    } else if seconds < 3600 {
        format!("{}m ago", seconds / 60)
    } else {
        format!("{}h ago", seconds / 3600)
    }
}

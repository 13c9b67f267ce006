//! Event types for the skislope event system
//!
//! Provides shared event definitions and EventBus for elevation acquisition.
//! Events are broadcast via EventBus and can be serialized for SSE transmission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Which tier of the acquisition chain produced an elevation grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridSource {
    /// Real samples from the remote elevation server, normalized
    Remote,
    /// Procedural terrain shaped by remote location metadata
    MetadataSynthetic,
    /// Procedural terrain shaped by the local location catalogue
    LocalSynthetic,
}

impl GridSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            GridSource::Remote => "remote",
            GridSource::MetadataSynthetic => "metadata_synthetic",
            GridSource::LocalSynthetic => "local_synthetic",
        }
    }

    /// True for either synthesis tier
    pub fn is_synthetic(&self) -> bool {
        !matches!(self, GridSource::Remote)
    }
}

impl std::fmt::Display for GridSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fallback tier entered after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStage {
    /// Remote fetch failed, trying metadata-based synthesis
    Metadata,
    /// Metadata unavailable, using local synthesis
    Local,
}

/// Elevation acquisition events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ElevationEvent {
    /// A cache miss started a new acquisition chain
    FetchStarted {
        request_id: String,
        location_key: String,
        resolution: usize,
        area_size_m: f64,
        timestamp: DateTime<Utc>,
    },

    /// Remote progress report for an in-flight fetch
    ///
    /// Emitted for every successful progress poll; not persisted.
    ProgressUpdated {
        request_id: String,
        /// Percent complete (0-100)
        percent: f64,
        message: String,
        current: Option<u64>,
        total: Option<u64>,
        timestamp: DateTime<Utc>,
    },

    /// A request was served from the grid cache
    CacheHit {
        cache_key: String,
        timestamp: DateTime<Utc>,
    },

    /// The chain moved to a fallback tier
    FallbackEngaged {
        request_id: String,
        location_key: String,
        stage: FallbackStage,
        /// Error that caused the fallback
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A grid was produced and cached
    FetchCompleted {
        request_id: String,
        location_key: String,
        source: GridSource,
        samples: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use skislope_common::events::{ElevationEvent, EventBus};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(ElevationEvent::CacheHit {
///     cache_key: "chamonix_64_2000".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(matches!(rx.try_recv(), Ok(ElevationEvent::CacheHit { .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ElevationEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ElevationEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ElevationEvent) {
        let _ = self.tx.send(event);
    }
}

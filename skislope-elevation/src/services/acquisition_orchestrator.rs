//! Elevation acquisition with layered fallback
//!
//! Entry point for consumers. A request is served from the first tier that
//! succeeds:
//!
//! 1. cache
//! 2. remote grid, normalized
//! 3. synthetic terrain from remote location metadata
//! 4. synthetic terrain from the local catalogue
//!
//! Only invalid input yields `None`; every remote failure moves to the next
//! tier. Concurrent requests for the same key share one acquisition.

use crate::config::ElevationConfig;
use crate::error::{ElevationError, ElevationResult};
use crate::models::{
    cache_key, ElevationGrid, ElevationRequest, GridSource, LocationDescriptor, ProgressState,
};
use crate::services::elevation_gateway::{ElevationSource, RemoteElevationGateway};
use crate::services::grid_cache::{CacheEntry, GridCache};
use crate::services::location_registry::LocationRegistry;
use crate::services::normalizer::{normalize, Normalized};
use crate::services::progress_tracker::{
    HttpProgressSource, ProgressCallback, ProgressSource, ProgressTracker, TrackerHandle,
    TrackerSettings,
};
use crate::services::synthetic_terrain::{SyntheticTerrainGenerator, TerrainProfile};
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use skislope_common::events::{ElevationEvent, EventBus, FallbackStage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Largest accepted grid side length
pub const MAX_RESOLUTION: i64 = 1024;
/// Largest accepted area side in meters
pub const MAX_AREA_SIZE_M: f64 = 10_000.0;

pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Direct progress callback: `(request_id, state)`
pub type ProgressHook = Arc<dyn Fn(&str, &ProgressState) + Send + Sync>;

type SharedFetch = Shared<BoxFuture<'static, Arc<ElevationGrid>>>;
type InFlightTable = Arc<Mutex<HashMap<String, SharedFetch>>>;

/// Validated, owned request parameters
struct Target {
    location: LocationDescriptor,
    resolution: usize,
    area_size_m: f64,
    cache_key: String,
}

/// Coordinates cache, remote source, progress tracking and synthesis
#[derive(Clone)]
pub struct AcquisitionOrchestrator {
    registry: Arc<LocationRegistry>,
    source: Arc<dyn ElevationSource>,
    tracker: ProgressTracker,
    cache: Arc<GridCache>,
    generator: SyntheticTerrainGenerator,
    events: EventBus,
    in_flight: InFlightTable,
    dedupe: bool,
    progress_hook: Option<ProgressHook>,
}

impl AcquisitionOrchestrator {
    pub fn new(
        registry: Arc<LocationRegistry>,
        source: Arc<dyn ElevationSource>,
        progress: Arc<dyn ProgressSource>,
        cache: Arc<GridCache>,
    ) -> Self {
        Self {
            registry,
            source,
            tracker: ProgressTracker::new(progress, TrackerSettings::default()),
            cache,
            generator: SyntheticTerrainGenerator::new(),
            events: EventBus::new(DEFAULT_EVENT_CAPACITY),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            dedupe: true,
            progress_hook: None,
        }
    }

    /// Wire the HTTP gateway, progress endpoint and built-in catalogue
    pub fn from_config(config: &ElevationConfig) -> ElevationResult<Self> {
        let source = RemoteElevationGateway::new(&config.server_url, config.request_timeout())?;
        let progress = HttpProgressSource::new(&config.server_url, config.request_timeout())?;

        info!(
            server_url = %config.server_url,
            cache_capacity = config.cache_capacity,
            dedupe = config.dedupe_in_flight,
            "Elevation orchestrator configured"
        );

        Ok(Self::new(
            Arc::new(LocationRegistry::builtin().clone()),
            Arc::new(source),
            Arc::new(progress),
            Arc::new(GridCache::new(config.cache_capacity)),
        )
        .with_tracker_settings(config.tracker_settings())
        .with_events(EventBus::new(config.event_capacity))
        .with_dedupe(config.dedupe_in_flight))
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_progress_hook(mut self, hook: ProgressHook) -> Self {
        self.progress_hook = Some(hook);
        self
    }

    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn with_tracker_settings(mut self, settings: TrackerSettings) -> Self {
        self.tracker = self.tracker.with_settings(settings);
        self
    }

    pub fn with_generator(mut self, generator: SyntheticTerrainGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Get a normalized `resolution²` grid for a location
    ///
    /// `None` only when the request is invalid (unknown location, resolution
    /// outside `1..=1024`, area outside `(0, 10000]`).
    pub async fn fetch(
        &self,
        location_key: &str,
        resolution: i64,
        area_size_m: f64,
    ) -> Option<Arc<ElevationGrid>> {
        let target = match self.validate(location_key, resolution, area_size_m) {
            Ok(target) => target,
            Err(e) => {
                warn!(
                    location = %location_key,
                    resolution,
                    area_size_m,
                    error = %e,
                    "Rejected elevation request"
                );
                return None;
            }
        };

        if let Some(grid) = self.cache_hit(&target.cache_key) {
            return Some(grid);
        }

        if !self.dedupe {
            return Some(self.acquire(target).await);
        }

        let shared = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

            // A fetch may have finished between the first lookup and the lock
            if let Some(grid) = self.cache_hit(&target.cache_key) {
                return Some(grid);
            }

            match in_flight.get(&target.cache_key) {
                Some(existing) => {
                    debug!(cache_key = %target.cache_key, "Joining in-flight fetch");
                    existing.clone()
                }
                None => {
                    let key = target.cache_key.clone();
                    let shared = self.spawn_acquisition(target);
                    in_flight.insert(key, shared.clone());
                    shared
                }
            }
        };

        Some(shared.await)
    }

    /// Stop progress tracking for a request; the fetch itself continues
    pub fn abort(&self, request_id: &str) -> bool {
        self.tracker.abort(request_id)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Elevation cache cleared");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ElevationEvent> {
        self.events.subscribe()
    }

    /// Cached grids, oldest first
    pub fn cached_entries(&self) -> Vec<CacheEntry> {
        self.cache.entries()
    }

    pub fn registry(&self) -> &LocationRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    fn validate(
        &self,
        location_key: &str,
        resolution: i64,
        area_size_m: f64,
    ) -> ElevationResult<Target> {
        let location = self
            .registry
            .get(location_key)
            .ok_or_else(|| ElevationError::Validation(format!("unknown location {:?}", location_key)))?;

        if resolution <= 0 || resolution > MAX_RESOLUTION {
            return Err(ElevationError::Validation(format!(
                "resolution {} outside 1..={}",
                resolution, MAX_RESOLUTION
            )));
        }

        if !area_size_m.is_finite() || area_size_m <= 0.0 || area_size_m > MAX_AREA_SIZE_M {
            return Err(ElevationError::Validation(format!(
                "area size {} outside (0, {}]",
                area_size_m, MAX_AREA_SIZE_M
            )));
        }

        let resolution = resolution as usize;
        Ok(Target {
            location: location.clone(),
            resolution,
            area_size_m,
            cache_key: cache_key(location_key, resolution, area_size_m),
        })
    }

    fn cache_hit(&self, key: &str) -> Option<Arc<ElevationGrid>> {
        let grid = self.cache.get(key)?;
        debug!(cache_key = %key, "Elevation cache hit");
        self.events.emit_lossy(ElevationEvent::CacheHit {
            cache_key: key.to_string(),
            timestamp: Utc::now(),
        });
        Some(grid)
    }

    /// Run one acquisition on its own task so it completes even if every
    /// waiting caller goes away
    ///
    /// The task owns the in-flight slot and releases it when it ends, whether
    /// or not anyone is still waiting.
    fn spawn_acquisition(&self, target: Target) -> SharedFetch {
        let slot = InFlightSlot {
            table: Arc::clone(&self.in_flight),
            key: target.cache_key.clone(),
        };
        let key = target.cache_key.clone();
        let location = target.location.clone();
        let resolution = target.resolution;
        let generator = self.generator.clone();
        let this = self.clone();

        let task = tokio::spawn(async move {
            let _slot = slot;
            this.acquire(target).await
        });

        async move {
            match task.await {
                Ok(grid) => grid,
                Err(e) => {
                    warn!(
                        cache_key = %key,
                        error = %e,
                        "Elevation acquisition task failed, using local profile"
                    );
                    Arc::new(generator.generate(&TerrainProfile::from_local(&location), resolution))
                }
            }
        }
        .boxed()
        .shared()
    }

    async fn acquire(&self, target: Target) -> Arc<ElevationGrid> {
        let request = ElevationRequest::new(&target.location.key, target.resolution, target.area_size_m);
        let request_id = request.request_id.clone();

        info!(
            request_id = %request_id,
            location = %request.location_key,
            resolution = request.resolution,
            area_size_m = request.area_size_m,
            source = self.source.source_id(),
            "Fetching elevation grid"
        );
        self.events.emit_lossy(ElevationEvent::FetchStarted {
            request_id: request_id.clone(),
            location_key: request.location_key.clone(),
            resolution: request.resolution,
            area_size_m: request.area_size_m,
            timestamp: Utc::now(),
        });

        let tracking = TrackingGuard {
            tracker: self.tracker.clone(),
            handle: self.tracker.start(&request_id, self.progress_callback()),
        };
        let remote = self.fetch_remote(&request).await;
        drop(tracking);

        let grid = match remote {
            Ok(grid) => grid,
            Err(e) => {
                warn!(
                    request_id = %request_id,
                    location = %request.location_key,
                    error = %e,
                    "Remote elevation unavailable, using location metadata"
                );
                self.events.emit_lossy(ElevationEvent::FallbackEngaged {
                    request_id: request_id.clone(),
                    location_key: request.location_key.clone(),
                    stage: FallbackStage::Metadata,
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                self.synthesize(&target.location, target.resolution, &request_id)
                    .await
            }
        };

        let grid = Arc::new(grid);
        self.cache.put(&target.cache_key, Arc::clone(&grid));

        info!(
            request_id = %request_id,
            location = %request.location_key,
            source = %grid.source(),
            synthetic = grid.source().is_synthetic(),
            samples = grid.len(),
            "Elevation grid ready"
        );
        self.events.emit_lossy(ElevationEvent::FetchCompleted {
            request_id,
            location_key: request.location_key,
            source: grid.source(),
            samples: grid.len(),
            timestamp: Utc::now(),
        });

        grid
    }

    async fn fetch_remote(&self, request: &ElevationRequest) -> ElevationResult<ElevationGrid> {
        let raw = self.source.fetch_grid(request).await?;

        if raw.is_empty() {
            return Err(ElevationError::EmptyData("server returned no samples".to_string()));
        }
        if raw.len() != request.sample_count() {
            return Err(ElevationError::Protocol(format!(
                "expected {} samples, got {}",
                request.sample_count(),
                raw.len()
            )));
        }

        match normalize(&raw) {
            Normalized::NoData => Err(ElevationError::EmptyData(
                "no finite elevation samples".to_string(),
            )),
            Normalized::Grid(samples) => {
                ElevationGrid::new(request.resolution, samples, GridSource::Remote)
            }
        }
    }

    async fn synthesize(
        &self,
        location: &LocationDescriptor,
        resolution: usize,
        request_id: &str,
    ) -> ElevationGrid {
        let profile = match self.source.fetch_metadata(&location.key).await {
            Ok(mut metadata) if metadata.has_usable_profile() => {
                metadata.key = location.key.clone();
                TerrainProfile::from_metadata(&metadata)
            }
            Ok(_) => {
                self.engage_local(location, request_id, "metadata has no usable elevation profile");
                TerrainProfile::from_local(location)
            }
            Err(e) => {
                self.engage_local(location, request_id, &e.to_string());
                TerrainProfile::from_local(location)
            }
        };

        self.generator.generate(&profile, resolution)
    }

    fn engage_local(&self, location: &LocationDescriptor, request_id: &str, reason: &str) {
        warn!(
            request_id,
            location = %location.key,
            reason,
            "Location metadata unavailable, using local profile"
        );
        self.events.emit_lossy(ElevationEvent::FallbackEngaged {
            request_id: request_id.to_string(),
            location_key: location.key.clone(),
            stage: FallbackStage::Local,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn progress_callback(&self) -> ProgressCallback {
        let events = self.events.clone();
        let hook = self.progress_hook.clone();

        Arc::new(move |state: &ProgressState| {
            debug!(
                request_id = %state.request_id,
                percent = state.percent,
                message = %state.message,
                "Elevation progress"
            );
            events.emit_lossy(ElevationEvent::ProgressUpdated {
                request_id: state.request_id.clone(),
                percent: state.percent,
                message: state.message.clone(),
                current: state.current,
                total: state.total,
                timestamp: Utc::now(),
            });
            if let Some(hook) = &hook {
                hook(state.request_id.as_str(), state);
            }
        })
    }
}

/// Removes a key from the in-flight table when dropped
struct InFlightSlot {
    table: InFlightTable,
    key: String,
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Stops progress tracking when the remote fetch ends or is dropped
struct TrackingGuard {
    tracker: ProgressTracker,
    handle: Option<TrackerHandle>,
}

impl Drop for TrackingGuard {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            self.tracker.abort(handle.request_id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::progress_tracker::ProgressPoll;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingSource {
        grid_calls: AtomicUsize,
    }

    #[async_trait]
    impl ElevationSource for FailingSource {
        fn source_id(&self) -> &'static str {
            "failing"
        }

        async fn fetch_grid(&self, _request: &ElevationRequest) -> ElevationResult<Vec<f64>> {
            self.grid_calls.fetch_add(1, Ordering::SeqCst);
            Err(ElevationError::Transport {
                status: None,
                message: "connection refused".to_string(),
            })
        }

        async fn fetch_metadata(&self, _location_key: &str) -> ElevationResult<LocationDescriptor> {
            Err(ElevationError::Remote("offline".to_string()))
        }
    }

    struct SilentProgress;

    #[async_trait]
    impl ProgressSource for SilentProgress {
        async fn query(&self, _request_id: &str) -> ElevationResult<ProgressPoll> {
            Ok(ProgressPoll::NotReady)
        }
    }

    struct PanickingSource;

    #[async_trait]
    impl ElevationSource for PanickingSource {
        fn source_id(&self) -> &'static str {
            "panicking"
        }

        async fn fetch_grid(&self, _request: &ElevationRequest) -> ElevationResult<Vec<f64>> {
            panic!("decoder bug");
        }

        async fn fetch_metadata(&self, _location_key: &str) -> ElevationResult<LocationDescriptor> {
            Err(ElevationError::Remote("offline".to_string()))
        }
    }

    fn orchestrator() -> (AcquisitionOrchestrator, Arc<FailingSource>) {
        let source = Arc::new(FailingSource {
            grid_calls: AtomicUsize::new(0),
        });
        let orchestrator = AcquisitionOrchestrator::new(
            Arc::new(LocationRegistry::builtin().clone()),
            source.clone(),
            Arc::new(SilentProgress),
            Arc::new(GridCache::default()),
        );
        (orchestrator, source)
    }

    #[tokio::test]
    async fn test_invalid_requests_return_none() {
        let (orchestrator, source) = orchestrator();

        assert!(orchestrator.fetch("unknown_location", 64, 2000.0).await.is_none());
        assert!(orchestrator.fetch("chamonix", -1, 2000.0).await.is_none());
        assert!(orchestrator.fetch("chamonix", 0, 2000.0).await.is_none());
        assert!(orchestrator.fetch("chamonix", 1025, 2000.0).await.is_none());
        assert!(orchestrator.fetch("chamonix", 64, 0.0).await.is_none());
        assert!(orchestrator.fetch("chamonix", 64, 10_001.0).await.is_none());
        assert!(orchestrator.fetch("chamonix", 64, f64::NAN).await.is_none());

        assert_eq!(source.grid_calls.load(Ordering::SeqCst), 0);
        assert!(orchestrator.cached_entries().is_empty());
    }

    #[tokio::test]
    async fn test_boundary_values_accepted() {
        let (orchestrator, _) = orchestrator();
        let grid = orchestrator.fetch("zermatt", 1, 10_000.0).await.unwrap();
        assert_eq!(grid.len(), 1);
    }

    #[tokio::test]
    async fn test_local_fallback_when_everything_fails() {
        let (orchestrator, source) = orchestrator();
        let grid = orchestrator.fetch("chamonix", 16, 2000.0).await.unwrap();

        assert_eq!(grid.source(), GridSource::LocalSynthetic);
        assert_eq!(grid.len(), 256);
        assert_eq!(source.grid_calls.load(Ordering::SeqCst), 1);
        assert_eq!(orchestrator.tracker().active_count(), 0);
    }

    #[tokio::test]
    async fn test_second_fetch_served_from_cache() {
        let (orchestrator, source) = orchestrator();
        let first = orchestrator.fetch("whistler", 8, 1500.0).await.unwrap();
        let second = orchestrator.fetch("whistler", 8, 1500.0).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.grid_calls.load(Ordering::SeqCst), 1);

        orchestrator.clear_cache();
        orchestrator.fetch("whistler", 8, 1500.0).await.unwrap();
        assert_eq!(source.grid_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_acquisition_task_still_returns_local_grid() {
        let orchestrator = AcquisitionOrchestrator::new(
            Arc::new(LocationRegistry::builtin().clone()),
            Arc::new(PanickingSource),
            Arc::new(SilentProgress),
            Arc::new(GridCache::default()),
        );

        let grid = orchestrator.fetch("chamonix", 8, 2000.0).await.unwrap();

        assert_eq!(grid.source(), GridSource::LocalSynthetic);
        assert_eq!(grid.len(), 64);
        assert!(orchestrator.in_flight.lock().unwrap().is_empty());
        assert_eq!(orchestrator.tracker().active_count(), 0);
    }
}

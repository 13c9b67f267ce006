//! In-memory elevation and progress sources with call counters

use async_trait::async_trait;
use skislope_elevation::error::{ElevationError, ElevationResult};
use skislope_elevation::models::{ElevationRequest, LocationDescriptor, ProgressState};
use skislope_elevation::services::{ElevationSource, ProgressPoll, ProgressSource, LocationRegistry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What `fetch_grid` returns
#[derive(Debug, Clone)]
pub enum GridReply {
    /// `resolution²` samples rising from 1000 m
    Ramp,
    Samples(Vec<f64>),
    Fail(ElevationError),
}

pub struct FakeSource {
    grid: Mutex<GridReply>,
    metadata: Mutex<ElevationResult<LocationDescriptor>>,
    delay: Duration,
    grid_calls: AtomicUsize,
    metadata_calls: AtomicUsize,
}

impl FakeSource {
    /// Remote grid available, metadata from the built-in catalogue
    pub fn ramp() -> Self {
        Self::with_grid(GridReply::Ramp)
    }

    /// Grid and metadata both fail
    pub fn offline() -> Self {
        let source = Self::with_grid(GridReply::Fail(ElevationError::Transport {
            status: None,
            message: "connection refused".to_string(),
        }));
        source.set_metadata(Err(ElevationError::Transport {
            status: None,
            message: "connection refused".to_string(),
        }));
        source
    }

    pub fn with_grid(reply: GridReply) -> Self {
        let metadata = LocationRegistry::builtin()
            .get("chamonix")
            .cloned()
            .ok_or_else(|| ElevationError::Remote("missing".to_string()));

        Self {
            grid: Mutex::new(reply),
            metadata: Mutex::new(metadata),
            delay: Duration::ZERO,
            grid_calls: AtomicUsize::new(0),
            metadata_calls: AtomicUsize::new(0),
        }
    }

    /// Hold every grid fetch for `delay`
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_grid(&self, reply: GridReply) {
        *self.grid.lock().unwrap() = reply;
    }

    pub fn set_metadata(&self, metadata: ElevationResult<LocationDescriptor>) {
        *self.metadata.lock().unwrap() = metadata;
    }

    pub fn grid_calls(&self) -> usize {
        self.grid_calls.load(Ordering::SeqCst)
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ElevationSource for FakeSource {
    fn source_id(&self) -> &'static str {
        "fake"
    }

    async fn fetch_grid(&self, request: &ElevationRequest) -> ElevationResult<Vec<f64>> {
        self.grid_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let reply = self.grid.lock().unwrap().clone();
        match reply {
            GridReply::Ramp => Ok((0..request.sample_count())
                .map(|i| 1000.0 + i as f64)
                .collect()),
            GridReply::Samples(samples) => Ok(samples),
            GridReply::Fail(e) => Err(e),
        }
    }

    async fn fetch_metadata(&self, _location_key: &str) -> ElevationResult<LocationDescriptor> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.metadata.lock().unwrap().clone()
    }
}

/// Reports a fixed percent for every request
pub struct FakeProgress {
    percent: Option<f64>,
    queries: AtomicUsize,
}

impl FakeProgress {
    pub fn reporting(percent: f64) -> Self {
        Self {
            percent: Some(percent),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn silent() -> Self {
        Self {
            percent: None,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProgressSource for FakeProgress {
    async fn query(&self, request_id: &str) -> ElevationResult<ProgressPoll> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(match self.percent {
            Some(percent) => ProgressPoll::Ready(
                ProgressState::new(request_id, percent, "Fetching elevation data")
                    .with_counts(Some(1), Some(2)),
            ),
            None => ProgressPoll::NotReady,
        })
    }
}

//! Progress polling for in-flight remote fetches
//!
//! Each tracked request gets one background task that polls the server's
//! progress endpoint and forwards reports to a callback. The task ends when
//! progress reaches 100%, when the caller aborts it, or when the attempt
//! budget runs out. Polling failures never reach the fetch itself.

use crate::error::{ElevationError, ElevationResult};
use crate::models::ProgressState;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Callback receiving each progress report
pub type ProgressCallback = Arc<dyn Fn(&ProgressState) + Send + Sync>;

/// One answer from a progress source
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressPoll {
    Ready(ProgressState),
    /// The server has not registered the request yet
    NotReady,
}

/// Anything that can report progress for a request id
#[async_trait]
pub trait ProgressSource: Send + Sync {
    async fn query(&self, request_id: &str) -> ElevationResult<ProgressPoll>;
}

#[derive(Debug, Deserialize)]
struct ProgressBody {
    progress: f64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    current: Option<u64>,
    #[serde(default)]
    total: Option<u64>,
}

/// `GET <server_url>/progress/<request_id>`
pub struct HttpProgressSource {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpProgressSource {
    pub fn new(server_url: &str, timeout: Duration) -> ElevationResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ElevationError::transport)?;

        Ok(Self {
            http_client,
            base_url: server_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ProgressSource for HttpProgressSource {
    async fn query(&self, request_id: &str) -> ElevationResult<ProgressPoll> {
        let url = format!("{}/progress/{}", self.base_url, request_id);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(ElevationError::transport)?;

        // 404 until the server picks the request up
        if !response.status().is_success() {
            return Ok(ProgressPoll::NotReady);
        }

        let body: ProgressBody = response
            .json()
            .await
            .map_err(|e| ElevationError::Protocol(format!("invalid progress body: {}", e)))?;

        Ok(ProgressPoll::Ready(
            ProgressState::new(request_id, body.progress, body.message.unwrap_or_default())
                .with_counts(body.current, body.total),
        ))
    }
}

/// Polling cadence and budget
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSettings {
    /// Steady-state poll interval
    pub poll_interval: Duration,
    /// Faster interval used while the server may not know the request yet
    pub warmup_interval: Duration,
    /// How long after start the warm-up interval applies
    pub warmup_window: Duration,
    /// Polls before the tracker gives up
    pub max_attempts: u32,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            warmup_interval: Duration::from_millis(250),
            warmup_window: Duration::from_secs(5),
            max_attempts: 600,
        }
    }
}

/// How a tracking task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerOutcome {
    Completed,
    Aborted,
    TimedOut,
}

/// Handle to one tracking task
pub struct TrackerHandle {
    request_id: String,
    token: CancellationToken,
    task: JoinHandle<TrackerOutcome>,
}

impl TrackerHandle {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Stop polling; no callback fires after this returns
    pub fn abort(&self) {
        self.token.cancel();
    }

    /// Wait for the task to finish
    pub async fn wait(self) -> TrackerOutcome {
        self.task.await.unwrap_or(TrackerOutcome::Aborted)
    }
}

struct ActiveEntry {
    generation: u64,
    token: CancellationToken,
}

/// Tracks progress for any number of concurrent requests
#[derive(Clone)]
pub struct ProgressTracker {
    source: Arc<dyn ProgressSource>,
    settings: TrackerSettings,
    active: Arc<Mutex<HashMap<String, ActiveEntry>>>,
    generation: Arc<AtomicU64>,
}

impl ProgressTracker {
    pub fn new(source: Arc<dyn ProgressSource>, settings: TrackerSettings) -> Self {
        Self {
            source,
            settings,
            active: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Replace the cadence used by trackers started from now on
    pub fn with_settings(mut self, settings: TrackerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Start polling for `request_id`
    ///
    /// Returns `None` if the id is already being tracked.
    pub fn start(&self, request_id: &str, callback: ProgressCallback) -> Option<TrackerHandle> {
        let token = CancellationToken::new();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            if active.contains_key(request_id) {
                warn!(request_id, "Progress tracking already active");
                return None;
            }
            active.insert(
                request_id.to_string(),
                ActiveEntry {
                    generation,
                    token: token.clone(),
                },
            );
        }

        let source = Arc::clone(&self.source);
        let settings = self.settings.clone();
        let active = Arc::clone(&self.active);
        let id = request_id.to_string();
        let task_token = token.clone();

        let task = tokio::spawn(async move {
            let outcome = poll_loop(source.as_ref(), &settings, &id, &task_token, &callback).await;

            let mut active = active.lock().unwrap_or_else(PoisonError::into_inner);
            if active.get(&id).map(|e| e.generation) == Some(generation) {
                active.remove(&id);
            }
            debug!(request_id = %id, ?outcome, "Progress tracking finished");
            outcome
        });

        Some(TrackerHandle {
            request_id: request_id.to_string(),
            token,
            task,
        })
    }

    /// Stop tracking `request_id`; false if it was not tracked
    pub fn abort(&self, request_id: &str) -> bool {
        let entry = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(request_id);

        match entry {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_tracking(&self, request_id: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(request_id)
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

async fn poll_loop(
    source: &dyn ProgressSource,
    settings: &TrackerSettings,
    request_id: &str,
    token: &CancellationToken,
    callback: &ProgressCallback,
) -> TrackerOutcome {
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        if attempts >= settings.max_attempts {
            warn!(request_id, attempts, "Progress tracking gave up");
            return TrackerOutcome::TimedOut;
        }
        attempts += 1;

        let poll = tokio::select! {
            biased;
            _ = token.cancelled() => return TrackerOutcome::Aborted,
            poll = source.query(request_id) => poll,
        };

        if token.is_cancelled() {
            return TrackerOutcome::Aborted;
        }

        let warming_up = started.elapsed() < settings.warmup_window;
        let idle_delay = if warming_up {
            settings.warmup_interval
        } else {
            settings.poll_interval
        };

        let delay = match poll {
            Ok(ProgressPoll::Ready(state)) => {
                callback(&state);
                if state.is_complete() {
                    return TrackerOutcome::Completed;
                }
                settings.poll_interval
            }
            Ok(ProgressPoll::NotReady) => idle_delay,
            Err(e) => {
                debug!(request_id, error = %e, "Progress poll failed");
                idle_delay
            }
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => return TrackerOutcome::Aborted,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

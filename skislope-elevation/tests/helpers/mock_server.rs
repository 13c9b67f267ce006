//! In-process elevation server
//!
//! Serves `POST /mcp` (JSON-RPC `tools/call`) and `GET /progress/:request_id`
//! on an ephemeral localhost port, with switchable failure modes and call
//! counters.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How `fetch_elevation_grid` answers
#[derive(Debug, Clone)]
pub enum GridMode {
    /// `resolution²` samples rising from 1000 m by 1 m per sample
    Ramp,
    /// Fixed sample list (nulls allowed)
    Samples(Vec<Option<f64>>),
    /// JSON-RPC error object
    RpcError,
    /// Tool text starting with "Error:"
    ToolError,
    /// Non-success HTTP status
    HttpStatus(u16),
    /// Echo a different request id
    WrongRequestId,
    /// Text content that is not JSON
    Garbage,
}

pub struct MockState {
    pub grid_mode: Mutex<GridMode>,
    /// `None` makes `get_location_info` fail with an RPC error
    pub metadata: Mutex<Option<Value>>,
    pub grid_delay: Mutex<Duration>,
    /// Percent reported for any request id; `None` answers 404
    pub progress_percent: Mutex<Option<f64>>,
    pub grid_calls: AtomicUsize,
    pub metadata_calls: AtomicUsize,
    pub progress_calls: AtomicUsize,
    pub last_rpc: Mutex<Option<Value>>,
}

pub struct MockServer {
    pub url: String,
    pub state: Arc<MockState>,
}

impl MockServer {
    pub async fn start() -> Self {
        let state = Arc::new(MockState {
            grid_mode: Mutex::new(GridMode::Ramp),
            metadata: Mutex::new(Some(chamonix_metadata())),
            grid_delay: Mutex::new(Duration::ZERO),
            progress_percent: Mutex::new(None),
            grid_calls: AtomicUsize::new(0),
            metadata_calls: AtomicUsize::new(0),
            progress_calls: AtomicUsize::new(0),
            last_rpc: Mutex::new(None),
        });

        let app = Router::new()
            .route("/mcp", post(handle_rpc))
            .route("/progress/:request_id", get(handle_progress))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    pub fn set_grid_mode(&self, mode: GridMode) {
        *self.state.grid_mode.lock().unwrap() = mode;
    }

    pub fn set_metadata(&self, metadata: Option<Value>) {
        *self.state.metadata.lock().unwrap() = metadata;
    }

    pub fn set_grid_delay(&self, delay: Duration) {
        *self.state.grid_delay.lock().unwrap() = delay;
    }

    pub fn set_progress(&self, percent: Option<f64>) {
        *self.state.progress_percent.lock().unwrap() = percent;
    }

    pub fn grid_calls(&self) -> usize {
        self.state.grid_calls.load(Ordering::SeqCst)
    }

    pub fn metadata_calls(&self) -> usize {
        self.state.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn progress_calls(&self) -> usize {
        self.state.progress_calls.load(Ordering::SeqCst)
    }

    pub fn last_rpc(&self) -> Option<Value> {
        self.state.last_rpc.lock().unwrap().clone()
    }
}

/// URL of a port nothing listens on
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Metadata payload in the server's wire format
pub fn chamonix_metadata() -> Value {
    json!({
        "name": "Chamonix-Mont-Blanc",
        "country": "France",
        "lat": 45.9237,
        "lon": 6.8694,
        "base_elevation": 1035,
        "peak_elevation": 3842,
        "vertical_drop": 2807,
        "terrain_type": "glacial_alpine"
    })
}

fn text_result(id: &Value, text: String) -> Response {
    Json(json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": { "content": [{ "type": "text", "text": text }] }
    }))
    .into_response()
}

fn rpc_error(id: &Value, message: &str) -> Response {
    Json(json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": -32603, "message": message }
    }))
    .into_response()
}

async fn handle_rpc(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    *state.last_rpc.lock().unwrap() = Some(body.clone());

    let id = body["id"].clone();
    let args = &body["params"]["arguments"];

    match body["params"]["name"].as_str() {
        Some("fetch_elevation_grid") => {
            state.grid_calls.fetch_add(1, Ordering::SeqCst);
            let delay = *state.grid_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let resolution = args["resolution"].as_u64().unwrap_or(0) as usize;
            let request_id = args["request_id"].as_str().unwrap_or_default().to_string();
            let mode = state.grid_mode.lock().unwrap().clone();
            let wrong_id = matches!(mode, GridMode::WrongRequestId);

            let samples: Vec<Option<f64>> = match mode {
                GridMode::Ramp | GridMode::WrongRequestId => (0..resolution * resolution)
                    .map(|i| Some(1000.0 + i as f64))
                    .collect(),
                GridMode::Samples(samples) => samples,
                GridMode::RpcError => return rpc_error(&id, "Internal error"),
                GridMode::ToolError => {
                    return text_result(&id, "Error: Unknown location 'chamonix'".to_string())
                }
                GridMode::HttpStatus(code) => {
                    return (
                        StatusCode::from_u16(code).unwrap(),
                        "upstream elevation service failed",
                    )
                        .into_response()
                }
                GridMode::Garbage => return text_result(&id, "not json at all".to_string()),
            };

            let echoed_id = if wrong_id {
                "req_someone_else".to_string()
            } else {
                request_id
            };

            let payload = json!({
                "location": args["location_key"],
                "resolution": resolution,
                "area_size": args["area_size"],
                "elevation_data": samples,
                "source": "MCP Elevation Server",
                "request_id": echoed_id,
            });
            text_result(&id, payload.to_string())
        }
        Some("get_location_info") => {
            state.metadata_calls.fetch_add(1, Ordering::SeqCst);
            match state.metadata.lock().unwrap().clone() {
                Some(metadata) => text_result(&id, metadata.to_string()),
                None => rpc_error(&id, "Location info unavailable"),
            }
        }
        _ => rpc_error(&id, "Unknown tool"),
    }
}

async fn handle_progress(
    State(state): State<Arc<MockState>>,
    Path(request_id): Path<String>,
) -> Response {
    state.progress_calls.fetch_add(1, Ordering::SeqCst);

    match *state.progress_percent.lock().unwrap() {
        Some(percent) => Json(json!({
            "request_id": request_id,
            "progress": percent,
            "message": "Fetching elevation data",
            "current": 10,
            "total": 20,
        }))
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Request not found or completed" })),
        )
            .into_response(),
    }
}

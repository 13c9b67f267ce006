//! Remote elevation server client
//!
//! Speaks JSON-RPC 2.0 over HTTP to the elevation server's `/mcp` endpoint.
//! Both operations are MCP `tools/call` requests:
//!
//! - `fetch_elevation_grid` with `{ location_key, resolution, area_size, request_id }`
//! - `get_location_info` with `{ location_key }`
//!
//! A successful result carries one text content item holding a JSON document.
//! The gateway never retries; every failure is reported once and the
//! orchestrator decides what to do next.

use crate::error::{ElevationError, ElevationResult};
use crate::models::{ElevationRequest, LocationDescriptor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const FETCH_GRID_TOOL: &str = "fetch_elevation_grid";
pub const LOCATION_INFO_TOOL: &str = "get_location_info";

const USER_AGENT: &str = concat!("skislope-elevation/", env!("CARGO_PKG_VERSION"));

/// Source of raw elevation samples and location metadata
#[async_trait]
pub trait ElevationSource: Send + Sync {
    /// Identifier for logging (e.g. "mcp-http")
    fn source_id(&self) -> &'static str;

    /// Raw elevation samples in meters, row-major, `resolution²` long
    ///
    /// Missing samples are reported as NaN.
    async fn fetch_grid(&self, request: &ElevationRequest) -> ElevationResult<Vec<f64>>;

    /// Location metadata known to the remote side
    async fn fetch_metadata(&self, location_key: &str) -> ElevationResult<LocationDescriptor>;
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: ToolCallParams<'a>,
}

#[derive(Debug, Serialize)]
struct ToolCallParams<'a> {
    name: &'a str,
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<ToolResult>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ToolResult {
    #[serde(default)]
    content: Vec<ContentItem>,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Decoded `fetch_elevation_grid` text payload
#[derive(Debug, Deserialize)]
struct GridPayload {
    elevation_data: Vec<Option<f64>>,
    #[serde(default, alias = "resort")]
    location: Option<String>,
    #[serde(default)]
    resolution: Option<u64>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    request_id: Option<String>,
}

/// HTTP JSON-RPC gateway to the elevation server
pub struct RemoteElevationGateway {
    http_client: reqwest::Client,
    endpoint: String,
    next_rpc_id: AtomicU64,
}

impl RemoteElevationGateway {
    /// Create a gateway for `server_url` (e.g. `http://localhost:8081`)
    pub fn new(server_url: &str, timeout: Duration) -> ElevationResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(ElevationError::transport)?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/mcp", server_url.trim_end_matches('/')),
            next_rpc_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Issue one `tools/call` and return the text content of the result
    async fn call_tool(&self, name: &str, arguments: Value) -> ElevationResult<String> {
        let id = self.next_rpc_id.fetch_add(1, Ordering::Relaxed);
        let body = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method: "tools/call",
            params: ToolCallParams { name, arguments },
        };

        tracing::debug!(rpc_id = id, tool = name, endpoint = %self.endpoint, "Calling elevation server");

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(ElevationError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ElevationError::Transport {
                status: Some(status.as_u16()),
                message: if error_text.is_empty() {
                    status.to_string()
                } else {
                    error_text
                },
            });
        }

        let rpc: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ElevationError::Protocol(format!("invalid JSON-RPC response: {}", e)))?;

        if let Some(error) = rpc.error {
            tracing::debug!(rpc_id = id, code = ?error.code, "Elevation server returned error");
            return Err(ElevationError::Remote(error.message));
        }

        let result = rpc.result.ok_or_else(|| {
            ElevationError::Protocol("response has neither result nor error".to_string())
        })?;

        let text = result
            .content
            .into_iter()
            .find(|item| item.kind == "text")
            .and_then(|item| item.text)
            .ok_or_else(|| ElevationError::Protocol("result has no text content".to_string()))?;

        // Tool-level failures come back as plain "Error: ..." text
        if text.trim_start().starts_with("Error:") {
            return Err(ElevationError::Remote(text.trim().to_string()));
        }

        Ok(text)
    }
}

#[async_trait]
impl ElevationSource for RemoteElevationGateway {
    fn source_id(&self) -> &'static str {
        "mcp-http"
    }

    async fn fetch_grid(&self, request: &ElevationRequest) -> ElevationResult<Vec<f64>> {
        let arguments = json!({
            "location_key": request.location_key,
            "resolution": request.resolution,
            "area_size": request.area_size_m,
            "request_id": request.request_id,
        });

        let text = self.call_tool(FETCH_GRID_TOOL, arguments).await?;
        let payload: GridPayload = serde_json::from_str(&text)
            .map_err(|e| ElevationError::Protocol(format!("invalid grid payload: {}", e)))?;

        if let Some(echoed) = payload.request_id.as_deref() {
            if echoed != request.request_id {
                return Err(ElevationError::Protocol(format!(
                    "response for request {} does not match {}",
                    echoed, request.request_id
                )));
            }
        }

        tracing::info!(
            request_id = %request.request_id,
            location = payload.location.as_deref().unwrap_or(&request.location_key),
            resolution = ?payload.resolution,
            source = payload.source.as_deref().unwrap_or("unknown"),
            samples = payload.elevation_data.len(),
            "Received elevation grid"
        );

        Ok(payload
            .elevation_data
            .into_iter()
            .map(|s| s.unwrap_or(f64::NAN))
            .collect())
    }

    async fn fetch_metadata(&self, location_key: &str) -> ElevationResult<LocationDescriptor> {
        let text = self
            .call_tool(LOCATION_INFO_TOOL, json!({ "location_key": location_key }))
            .await?;

        let mut location: LocationDescriptor = serde_json::from_str(&text)
            .map_err(|e| ElevationError::Protocol(format!("invalid location payload: {}", e)))?;

        if location.key.is_empty() {
            location.key = location_key.to_string();
        }

        Ok(location)
    }
}

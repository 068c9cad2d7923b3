//! HTTP API for uploading, finding and reading monetized content.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use contentindex::{JsonIndex, MetadataIndex};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::storage::StorageGateway;
use crate::summarize::Summarizer;
use crate::tools::{self, read_blocking, ContentTools, ToolError};
use crate::upload::{SendRequest, UploadError, UploadPipeline};

/// Shared state for web handlers
#[derive(Clone)]
pub struct WebState {
    pub index: Arc<JsonIndex>,
    pub storage: Arc<dyn StorageGateway>,
    pub pipeline: Arc<UploadPipeline>,
    pub tools: ContentTools,
}

impl WebState {
    pub fn new(
        index: Arc<JsonIndex>,
        storage: Arc<dyn StorageGateway>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        let pipeline = UploadPipeline::new(index.clone(), Arc::clone(&storage), summarizer);
        let tools = ContentTools::new(index.clone(), Arc::clone(&storage));
        Self {
            index,
            storage,
            pipeline: Arc::new(pipeline),
            tools,
        }
    }
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/api/send", post(send_content))
        .route("/api/content/{root_hash}", get(get_content))
        .route("/api/content-metadata", get(content_metadata))
        .route("/api/search", get(search_content))
        .route("/api/stats", get(content_stats))
        .route("/api/agent/tools", get(list_tools))
        .route("/api/agent/tools/{name}", post(call_tool))
        .with_state(state)
}

fn error_json(status: StatusCode, key: &str, message: impl Into<String>) -> Response {
    let mut body = serde_json::Map::new();
    body.insert(key.to_string(), Value::String(message.into()));
    (status, Json(Value::Object(body))).into_response()
}

/// Store content, summarize it and index it.
#[tracing::instrument(name = "http.send", skip(state, payload))]
async fn send_content(
    State(state): State<WebState>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!("Rejected upload body: {}", rejection);
            return error_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                "Failed to process request",
            );
        }
    };

    match state.pipeline.submit(request).await {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(e @ (UploadError::MissingContent | UploadError::MissingWallet)) => {
            error_json(StatusCode::BAD_REQUEST, "message", e.to_string())
        }
        Err(e @ UploadError::Storage(_)) => {
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "message", e.to_string())
        }
    }
}

/// Look up a record and deliver the stored bytes with its metadata.
#[tracing::instrument(name = "http.content.get", skip(state))]
async fn get_content(State(state): State<WebState>, Path(root_hash): Path<String>) -> Response {
    let key = root_hash.clone();
    let Some(record) = read_blocking(&state.index, move |index| index.lookup(&key)).await else {
        return error_json(StatusCode::NOT_FOUND, "error", "Content not found");
    };

    match state.storage.download(&root_hash).await {
        Ok(bytes) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "content": String::from_utf8_lossy(&bytes),
                "metadata": {
                    "summary": record.summary,
                    "creator": record.wallet_address,
                    "price": record.amount,
                    "txHash": record.tx_hash,
                }
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(%root_hash, error = %e, "Failed to download content");
            error_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                format!("Failed to download content: {e}"),
            )
        }
    }
}

/// The whole index document.
#[tracing::instrument(name = "http.content.metadata", skip(state))]
async fn content_metadata(State(state): State<WebState>) -> Response {
    let index = Arc::clone(&state.index);
    let records = tokio::task::spawn_blocking(move || index.try_read_all())
        .await
        .map_err(|e| e.to_string())
        .and_then(|read| read.map_err(|e| e.to_string()));

    match records {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Error reading content metadata");
            error_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                "Failed to read content metadata",
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[tracing::instrument(name = "http.search", skip(state))]
async fn search_content(
    State(state): State<WebState>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let results = read_blocking(&state.index, move |index| index.search(&query.q)).await;
    Json(json!({
        "total": results.len(),
        "results": results,
    }))
}

#[tracing::instrument(name = "http.stats", skip(state))]
async fn content_stats(State(state): State<WebState>) -> impl IntoResponse {
    Json(read_blocking(&state.index, |index| index.statistics()).await)
}

async fn list_tools() -> impl IntoResponse {
    Json(tools::list_tools())
}

#[tracing::instrument(name = "http.tools.call", skip(state, body))]
async fn call_tool(
    State(state): State<WebState>,
    Path(name): Path<String>,
    body: Option<Json<Value>>,
) -> Response {
    let args = body.map(|Json(v)| v).unwrap_or(Value::Null);

    match state.tools.call(&name, args).await {
        Ok(text) => (StatusCode::OK, Json(json!({ "text": text }))).into_response(),
        Err(e @ ToolError::UnknownTool(_)) => {
            error_json(StatusCode::NOT_FOUND, "error", e.to_string())
        }
        Err(e @ ToolError::InvalidArguments { .. }) => {
            error_json(StatusCode::BAD_REQUEST, "error", e.to_string())
        }
    }
}

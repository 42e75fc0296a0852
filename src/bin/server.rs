use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use heapsight::{
    produce_report, EngineOutput, HeapError, HeapReport, PrecomputedEngine, RankConfig,
    RawSnapshot,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "127.0.0.1:3030";
const DEFAULT_MAX_BODY_BYTES: usize = 512 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
struct ServerConfig {
    addr: SocketAddr,
    max_body_bytes: usize,
}

impl ServerConfig {
    fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(
            std::env::var("HEAPSIGHT_ADDR").ok(),
            std::env::var("HEAPSIGHT_MAX_BODY_BYTES").ok(),
        )
    }

    fn from_vars(addr: Option<String>, max_body_bytes: Option<String>) -> anyhow::Result<Self> {
        let addr = addr.unwrap_or_else(|| DEFAULT_ADDR.into());
        let addr = addr
            .parse::<SocketAddr>()
            .with_context(|| format!("HEAPSIGHT_ADDR is not a socket address: {addr}"))?;
        let max_body_bytes = match max_body_bytes {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("HEAPSIGHT_MAX_BODY_BYTES is not a byte count: {raw}"))?,
            None => DEFAULT_MAX_BODY_BYTES,
        };
        Ok(Self {
            addr,
            max_body_bytes,
        })
    }
}

/// Snapshot plus the analysis results computed for it by the caller.
#[derive(Debug, Deserialize)]
struct ReportRequest {
    snapshot: RawSnapshot,
    retained_sizes: Vec<u64>,
    distances: Vec<u64>,
    #[serde(default)]
    aggregates: Value,
    #[serde(default)]
    statistics: Value,
    #[serde(default)]
    limit: Option<usize>,
}

enum ApiError {
    Heap(HeapError),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Heap(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "kind": err.kind(), "message": err.to_string() })),
            )
                .into_response(),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "kind": "internal", "message": message })),
            )
                .into_response(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env()?;
    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    tracing::info!(addr = %config.addr, "heapsight server listening");

    axum::serve(listener, router(config.max_body_bytes)).await?;
    Ok(())
}

fn router(max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/report", post(report))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
}

async fn health() -> impl IntoResponse {
    "ok"
}

async fn report(
    Json(request): Json<ReportRequest>,
) -> Result<Json<HeapReport<Value, Value>>, ApiError> {
    // Decoding a large capture is CPU bound; keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || build_report(request))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    match result {
        Ok(report) => Ok(Json(report)),
        Err(err) => {
            tracing::warn!(kind = err.kind(), error = %err, "report request rejected");
            Err(ApiError::Heap(err))
        }
    }
}

fn build_report(request: ReportRequest) -> Result<HeapReport<Value, Value>, HeapError> {
    let engine = PrecomputedEngine::new(EngineOutput {
        retained_sizes: request.retained_sizes,
        distances: request.distances,
        aggregates: request.aggregates,
        statistics: request.statistics,
    });
    let mut config = RankConfig::default();
    if let Some(limit) = request.limit {
        config = config.with_limit(limit);
    }
    produce_report(&request.snapshot, &engine, &config)
}

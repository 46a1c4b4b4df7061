//! HTTP bridge for out-of-process launchers
//!
//! `POST /v1/query` answers with the placeholder and a slot id; the host then
//! polls `GET /v1/query/{id}` until the phase is terminal. A slot is released
//! once its terminal state has been read.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::core::cache::CacheStats;
use crate::core::coordinator::{QueryCoordinator, QuerySlot, QueryState};

/// Slots kept for hosts that never poll
const MAX_OPEN_SLOTS: usize = 1024;

/// Application state
pub struct AppState {
    coordinator: QueryCoordinator,
    slots: RwLock<BTreeMap<u64, QuerySlot>>,
    next_id: AtomicU64,
}

impl AppState {
    /// State with no open slots
    pub fn new(coordinator: QueryCoordinator) -> Self {
        Self {
            coordinator,
            slots: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

/// Query submission
#[derive(Deserialize)]
pub struct QueryRequest {
    /// Raw launcher input
    pub query: String,
}

/// Current state of a slot
#[derive(Serialize, Deserialize)]
pub struct QueryResponse {
    /// Absent when the answer is already final (empty query)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_id: Option<u64>,
    /// Phase, pair and items
    #[serde(flatten)]
    pub state: QueryState,
}

/// Usage summary response
#[derive(Serialize, Deserialize)]
pub struct UsageResponse {
    /// Usage line or the unavailable marker
    pub summary: String,
}

/// Cache counters response
#[derive(Serialize, Deserialize)]
pub struct CacheResponse {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that had to compute
    pub misses: u64,
    /// Entries currently held
    pub entries: usize,
}

impl From<CacheStats> for CacheResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            entries: stats.entries,
        }
    }
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    /// What went wrong
    pub error: ErrorDetail,
}

/// Error body
#[derive(Serialize)]
pub struct ErrorDetail {
    /// Human-readable message
    pub message: String,
    /// Machine-readable error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn not_found(id: u64) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: ErrorDetail {
                message: format!("Unknown query id {}", id),
                code: Some("unknown_query".to_string()),
            },
        }),
    )
}

/// Health check handler
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Submit a query; returns the placeholder immediately
async fn submit_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Json<QueryResponse> {
    let slot = state.coordinator.handle(&payload.query);
    let current = slot.current();

    if current.phase.is_terminal() {
        return Json(QueryResponse {
            query_id: None,
            state: current,
        });
    }

    let id = state.next_id.fetch_add(1, Ordering::Relaxed);
    {
        let mut slots = state.slots.write().await;
        slots.insert(id, slot);
        while slots.len() > MAX_OPEN_SLOTS {
            if let Some((dropped, _)) = slots.pop_first() {
                warn!(query_id = dropped, "Dropping unpolled query slot");
            }
        }
    }
    debug!(query_id = id, "Query dispatched");

    Json(QueryResponse {
        query_id: Some(id),
        state: current,
    })
}

/// Poll a slot; terminal states are returned once and then released
async fn poll_query(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<QueryResponse>, ApiError> {
    let current = {
        let slots = state.slots.read().await;
        slots.get(&id).map(QuerySlot::current).ok_or_else(|| not_found(id))?
    };

    if current.phase.is_terminal() {
        state.slots.write().await.remove(&id);
    }

    Ok(Json(QueryResponse {
        query_id: Some(id),
        state: current,
    }))
}

/// Usage summary handler
async fn get_usage(State(state): State<Arc<AppState>>) -> Json<UsageResponse> {
    Json(UsageResponse {
        summary: state.coordinator.usage_summary().await,
    })
}

/// Cache counters handler
async fn get_cache(State(state): State<Arc<AppState>>) -> Json<CacheResponse> {
    Json(state.coordinator.cache_stats().await.into())
}

/// Build the router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/v1/query", post(submit_query))
        .route("/v1/query/:id", get(poll_query))
        .route("/v1/usage", get(get_usage))
        .route("/v1/cache", get(get_cache))
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(host: String, port: u16, coordinator: QueryCoordinator) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(coordinator));
    let app = router(state);

    // Bind address
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

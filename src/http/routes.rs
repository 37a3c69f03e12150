//! HTTP route definitions

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::warn;

use crate::app::{AppState, ConsoleRequest};
use crate::util::time::uptime_secs;
use crate::war::ZoneStatus;

/// How long a console caller waits for the authority loop
pub const CONSOLE_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/zones", get(zones_handler))
        .route("/zones/:name", get(zone_handler))
        .route("/console", post(console_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    zones: usize,
    active_matches: usize,
    active_players: usize,
    connected_players: usize,
    ticks: u64,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = &state.status;
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        zones: status.zones().len(),
        active_matches: status.active_matches(),
        active_players: status.players_in_matches(),
        connected_players: status.connected_players(),
        ticks: status.ticks(),
    })
}

// ============================================================================
// Zone status endpoints
// ============================================================================

async fn zones_handler(State(state): State<AppState>) -> Json<Vec<ZoneStatus>> {
    Json(state.status.zones())
}

async fn zone_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ZoneStatus>, AppError> {
    state
        .status
        .zone(&name)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Warzone {name} does not exist.")))
}

// ============================================================================
// Console endpoint
// ============================================================================

#[derive(Deserialize)]
struct ConsoleCommand {
    command: String,
}

#[derive(Serialize)]
struct ConsoleResponse {
    output: Vec<String>,
}

async fn console_handler(
    State(state): State<AppState>,
    Json(req): Json<ConsoleCommand>,
) -> Result<Json<ConsoleResponse>, AppError> {
    if state.console_limiter.check().is_err() {
        return Err(AppError::RateLimited);
    }
    if req.command.trim().is_empty() {
        return Err(AppError::BadRequest("Empty command".to_string()));
    }

    let (reply, output) = oneshot::channel();
    state
        .console
        .send(ConsoleRequest {
            line: req.command,
            reply,
        })
        .await
        .map_err(|_| AppError::Unavailable)?;

    match tokio::time::timeout(CONSOLE_REPLY_TIMEOUT, output).await {
        Ok(Ok(output)) => Ok(Json(ConsoleResponse { output })),
        Ok(Err(_)) => Err(AppError::Unavailable),
        Err(_) => {
            warn!("Console command timed out waiting for the authority loop");
            Err(AppError::Unavailable)
        }
    }
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Authority loop unavailable")]
    Unavailable,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

//! Health check handlers

use axum::{extract::State, Json};
use infra_db::Database;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub response: &'static str,
}

/// Liveness check
///
/// Only requires the database manager to be wired in; no query is issued, so
/// per-request data errors never fail it.
pub async fn ping(State(_database): State<Arc<Database>>) -> Json<PingResponse> {
    Json(PingResponse { response: "pong" })
}

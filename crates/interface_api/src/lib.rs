//! HTTP API Layer
//!
//! This crate provides the web skeleton of the diecast catalogue using Axum.
//!
//! # Architecture
//!
//! - **Config**: server and database settings loaded from the environment
//! - **State**: the database manager, injected explicitly at router creation
//! - **Handlers**: the `/ping` health check
//! - **Error Handling**: consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let database = Arc::new(Database::new(settings)?);
//! let app = create_router(Arc::clone(&database));
//! axum::serve(listener, app).await?;
//! database.close().await;
//! ```

pub mod config;
pub mod error;
pub mod handlers;

use axum::{extract::FromRef, routing::get, Router};
use infra_db::Database;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::health;

/// Application state shared across handlers
///
/// Handlers that need sessions extract `State<Arc<Database>>` and call
/// [`Database::session`] once per request.
#[derive(Clone)]
pub struct AppState {
    pub database: Arc<Database>,
}

impl FromRef<AppState> for Arc<Database> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.database)
    }
}

/// Creates the main API router
///
/// # Arguments
///
/// * `database` - Connection manager built at startup
pub fn create_router(database: Arc<Database>) -> Router {
    let state = AppState { database };

    Router::new()
        .route("/ping", get(health::ping))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

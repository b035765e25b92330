//! Dinner Picker
//!
//! Group restaurant voting: members propose restaurants inside time-boxed
//! voting sessions and vote on them. The crate contains the pure domain core,
//! a typed REST client with a client-side entity store, and a reference
//! backend (axum + SQLite) implementing the same wire contract.

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod models;
pub mod store;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use db::Repository;

pub use client::{ApiClient, ClientError};
pub use store::{DinnerPicker, EntityStore, SessionWatcher};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(api::api_health))
        .route("/revision", get(api::get_revision))
        // Groups
        .route("/groups", get(api::list_groups).post(api::create_group))
        .route("/groups/user/{user_id}", get(api::list_user_groups))
        .route("/groups/{id}", get(api::get_group).delete(api::delete_group))
        // Sessions
        .route("/sessions", post(api::create_session))
        .route("/sessions/group/{group_id}", get(api::list_group_sessions))
        .route("/sessions/{id}", get(api::get_session))
        .route("/sessions/{id}/lock", post(api::lock_session))
        .route("/sessions/{id}/options", get(api::list_session_options))
        // Options
        .route("/options", post(api::add_option))
        .route("/options/{id}/vote", post(api::vote_option));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(api::health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests;

//! skydrop mission control service
//!
//! HTTP surface for launching and observing delivery missions, plus the
//! `/ws` event feed. [`router`] builds the full application so tests can
//! drive it without binding a socket.

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;
pub mod ws;

use axum::routing::{delete, get, post};
use axum::Router;

pub use config::ServiceConfig;
pub use error::{ApiError, StartupError};
pub use state::AppState;

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/launch", post(handlers::launch))
        .route("/api/status", post(handlers::status))
        .route("/api/connect", post(handlers::connect))
        .route("/api/return-home", post(handlers::return_home))
        .route("/api/drones", get(handlers::list_drones))
        .route("/api/drones/:drone_id", delete(handlers::disconnect_drone))
        .route("/api/missions", get(handlers::list_missions))
        .route("/api/missions/:mission_id", get(handlers::get_mission))
        .route("/ws", get(ws::feed))
        .with_state(state)
}

//! API endpoints.

mod health;
pub mod reports;

use axum::{Router, routing::get};

use crate::middleware::AppState;

/// Create the API router (mounted under `/api`).
pub fn router() -> Router<AppState> {
    Router::new().nest("/reports", reports::router())
}

/// Routes served outside `/api`.
pub fn root_router() -> Router<AppState> {
    Router::new().route("/health", get(health::health))
}

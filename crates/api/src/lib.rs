//! HTTP API layer for roadwatch.
//!
//! - **Endpoints**: accident report intake, queries and lifecycle
//! - **Extractors**: authenticated caller, negotiated locale
//! - **Middleware**: bearer authentication, response localisation
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

use axum::{Router, extract::DefaultBodyLimit, middleware::from_fn_with_state};

pub use endpoints::router;
use middleware::{AppState, auth_middleware, locale_middleware};

/// Assemble the application: `/api` routes, `/health` and the request
/// middleware they depend on.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(endpoints::root_router())
        .nest("/api", router())
        .layer(DefaultBodyLimit::max(state.body_limit))
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .layer(from_fn_with_state(state.clone(), locale_middleware))
        .with_state(state)
}

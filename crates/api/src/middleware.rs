//! API middleware.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{
        HeaderValue, Request,
        header::{ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_LANGUAGE, CONTENT_LENGTH},
    },
    middleware::Next,
    response::Response,
};
use roadwatch_common::{ErrorReport, Locale};
use roadwatch_core::{IdentityProvider, ReportService};
use tracing::debug;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub report_service: ReportService,
    pub identity: Arc<dyn IdentityProvider>,
    /// Locale used when `Accept-Language` names no supported language.
    pub default_locale: Locale,
    /// Include server-side diagnostics in error bodies.
    pub expose_error_details: bool,
    /// Largest accepted request body, in bytes.
    pub body_limit: usize,
}

/// Authentication middleware.
///
/// A valid bearer token places the [`roadwatch_core::Caller`] in the request
/// extensions. Missing or invalid tokens are left for the extractors to reject.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.identity.authenticate(token.trim()).await {
            Ok(caller) => {
                req.extensions_mut().insert(caller);
            }
            Err(e) => debug!(error = %e, "Bearer token rejected"),
        }
    }

    next.run(req).await
}

/// Locale middleware.
///
/// Negotiates the response locale and re-renders error bodies in it.
pub async fn locale_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let locale = req
        .headers()
        .get(ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .and_then(Locale::negotiate)
        .unwrap_or(state.default_locale);
    req.extensions_mut().insert(locale);

    let mut response = next.run(req).await;

    if let Some(report) = response.extensions().get::<ErrorReport>().cloned() {
        let (mut parts, _) = response.into_parts();
        parts.headers.remove(CONTENT_LENGTH);
        let body = report.body(locale, state.expose_error_details);
        response = Response::from_parts(parts, Body::from(body.to_string()));
    }

    response
        .headers_mut()
        .insert(CONTENT_LANGUAGE, HeaderValue::from_static(locale.tag()));
    response
}

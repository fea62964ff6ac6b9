//! Error types for roadwatch.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::i18n::{Locale, MessageKey};

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::Validation(_) | Self::UnsupportedMedia(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,

            // 5xx Server Errors
            Self::Database(_) | Self::Storage(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error code for API responses.
    ///
    /// Every server-side kind is reported as `INTERNAL_ERROR`; the precise
    /// kind only reaches the logs.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UnsupportedMedia(_) => "UNSUPPORTED_MEDIA",
            Self::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Database(_) | Self::Storage(_) | Self::Config(_) | Self::Internal(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Message catalog entry for this error.
    #[must_use]
    pub const fn message_key(&self) -> MessageKey {
        match self {
            Self::Validation(_) => MessageKey::Validation,
            Self::UnsupportedMedia(_) => MessageKey::UnsupportedMedia,
            Self::PayloadTooLarge(_) => MessageKey::PayloadTooLarge,
            Self::Unauthorized => MessageKey::Unauthorized,
            Self::Forbidden(_) => MessageKey::Forbidden,
            Self::NotFound(_) => MessageKey::NotFound,
            Self::Database(_) | Self::Storage(_) | Self::Config(_) | Self::Internal(_) => {
                MessageKey::Internal
            }
        }
    }

    /// Build the locale-independent part of the response.
    #[must_use]
    pub fn report(&self) -> ErrorReport {
        let (reason, detail) = if self.is_server_error() {
            (None, Some(self.to_string()))
        } else {
            let reason = match self {
                Self::Validation(r)
                | Self::UnsupportedMedia(r)
                | Self::PayloadTooLarge(r)
                | Self::Forbidden(r)
                | Self::NotFound(r) => Some(r.clone()),
                _ => None,
            };
            (reason, None)
        };

        ErrorReport {
            status: self.status_code(),
            code: self.error_code(),
            key: self.message_key(),
            reason,
            detail,
        }
    }
}

/// Everything needed to render an error body in any locale.
///
/// Attached to error responses as an extension so the HTTP layer can
/// re-render the body once the caller's locale is known.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    /// HTTP status.
    pub status: StatusCode,
    /// Machine-readable code.
    pub code: &'static str,
    /// Catalog entry for the human-readable message.
    pub key: MessageKey,
    /// Specific cause of a client error.
    pub reason: Option<String>,
    /// Server-side diagnostic, only shown outside production.
    pub detail: Option<String>,
}

impl ErrorReport {
    /// Render the JSON body for a locale.
    #[must_use]
    pub fn body(&self, locale: Locale, expose_detail: bool) -> Value {
        let mut error = json!({
            "code": self.code,
            "message": self.key.text(locale),
        });
        if let Some(reason) = &self.reason {
            error["reason"] = json!(reason);
        }
        if expose_detail && let Some(detail) = &self.detail {
            error["detail"] = json!(detail);
        }

        json!({
            "success": false,
            "error": error,
        })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let report = self.report();

        // Log server errors
        if self.is_server_error() {
            tracing::error!(error = %self, code = report.code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = report.code, "Client error occurred");
        }

        let mut response =
            (report.status, Json(report.body(Locale::default(), false))).into_response();
        response.extensions_mut().insert(report);
        response
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!(error = %err, "Rejected bearer token");
        Self::Unauthorized
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

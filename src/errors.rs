use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Failures talking to the remote table store.
///
/// Kept apart from "not found": a lookup that reaches the store and matches
/// nothing is `Ok(None)` / `Ok(false)`, never one of these.
#[derive(Debug)]
pub enum StoreError {
    /// The request never produced a response (connect, TLS, timeout...).
    Transport(reqwest::Error),
    /// The store answered with a non-success status.
    Status {
        /// HTTP status code returned by the store.
        status: u16,
        /// Raw response body, for diagnostics.
        body: String,
    },
    /// The store answered but the payload was not the expected row set.
    Decode(String),
    /// A write that must return the affected row returned nothing.
    EmptyResponse(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Transport(e) => write!(f, "Store request failed: {}", e),
            StoreError::Status { status, body } => {
                write!(f, "Store returned {}: {}", status, body)
            }
            StoreError::Decode(msg) => write!(f, "Failed to parse store response: {}", msg),
            StoreError::EmptyResponse(op) => write!(f, "Store returned no rows for {}", op),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    /// Converts a `reqwest::Error` into a `StoreError`.
    ///
    /// Body decoding failures are reported as `Decode`, everything else as `Transport`.
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Transport(err)
        }
    }
}

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// Bad request error (missing or malformed body).
    BadRequest(String),
    /// Field-level validation messages, in the order they were found.
    Validation(Vec<String>),
    /// Resource not found error.
    NotFound(String),
    /// Any failure communicating with the remote store.
    Upstream(StoreError),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "{}", msg),
            AppError::Validation(errors) => write!(f, "{}", errors.join("; ")),
            AppError::NotFound(msg) => write!(f, "{}", msg),
            AppError::Upstream(e) => write!(f, "{}", e),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Client errors carry their message verbatim; store failures become a 500
    /// whose message embeds the underlying cause.
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": msg }))).into_response()
            }
            AppError::Validation(errors) => {
                tracing::debug!("Validation failed: {:?}", errors);
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "message": msg }))).into_response()
            }
            AppError::Upstream(e) => {
                tracing::error!("Store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": e.to_string() })),
                )
                    .into_response()
            }
            AppError::WithContext { source, context } => match *source {
                AppError::Upstream(e) => {
                    tracing::error!("{}: {}", context, e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "message": format!("{}: {}", context, e) })),
                    )
                        .into_response()
                }
                // Client errors keep their own shape; the context only goes to the log
                other => {
                    tracing::debug!("{}: {}", context, other);
                    other.into_response()
                }
            },
        }
    }
}

impl From<StoreError> for AppError {
    /// Converts a `StoreError` into an `AppError`.
    fn from(err: StoreError) -> Self {
        AppError::Upstream(err)
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Arguments
    ///
    /// * `context` - The context message to add.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }
}

impl<T> ResultExt<T> for Result<T, StoreError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::Upstream(e)),
            context: context.into(),
        })
    }
}

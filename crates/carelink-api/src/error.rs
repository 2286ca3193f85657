use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::session::AuthError;

/// The full error taxonomy surfaced by the API. Empty query results are not
/// part of it — they serialize as empty sequences, never as errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{field} {reason}")]
    Validation { field: &'static str, reason: &'static str },
    #[error("message text must not be empty")]
    EmptyText,
    #[error("email is already registered")]
    DuplicateEmail,
    #[error("accounts are already connected")]
    AlreadyConnected,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("accounts are not connected")]
    NotConnected,
    #[error("operation may not target the caller's own account")]
    SelfTargetForbidden,
    #[error("a connection requires exactly one caregiver and one observer")]
    InvalidRoles,
    #[error("profiles may only be updated by their owner")]
    NotProfileOwner,
    #[error("only the recipient may mark an item read")]
    NotRecipient,
    #[error("observer callers must scope this query with contact_id")]
    MissingContactId,
    #[error("no connected caregivers to deliver to")]
    NoConnections,
    #[error("blob exceeds the upload size limit")]
    BlobTooLarge,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("storage failure")]
    Storage(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::EmptyText | ApiError::MissingContactId => {
                StatusCode::BAD_REQUEST
            }
            ApiError::InvalidCredentials | ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotConnected
            | ApiError::SelfTargetForbidden
            | ApiError::InvalidRoles
            | ApiError::NotProfileOwner
            | ApiError::NotRecipient => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::DuplicateEmail | ApiError::AlreadyConnected | ApiError::NoConnections => {
                StatusCode::CONFLICT
            }
            ApiError::BlobTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation",
            ApiError::EmptyText => "empty_text",
            ApiError::DuplicateEmail => "duplicate_email",
            ApiError::AlreadyConnected => "already_connected",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::Auth(AuthError::MissingToken) => "missing_token",
            ApiError::Auth(AuthError::MalformedToken) => "malformed_token",
            ApiError::Auth(AuthError::InvalidToken) => "invalid_token",
            ApiError::Auth(AuthError::ExpiredToken) => "expired_token",
            ApiError::NotConnected => "not_connected",
            ApiError::SelfTargetForbidden => "self_target_forbidden",
            ApiError::InvalidRoles => "invalid_roles",
            ApiError::NotProfileOwner => "not_profile_owner",
            ApiError::NotRecipient => "not_recipient",
            ApiError::MissingContactId => "missing_contact_id",
            ApiError::NoConnections => "no_connections",
            ApiError::BlobTooLarge => "blob_too_large",
            ApiError::NotFound(_) => "not_found",
            ApiError::Storage(_) => "storage",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Store failures are logged with their cause but never leaked.
        let message = match &self {
            ApiError::Storage(cause) => {
                error!("storage failure: {:#}", cause);
                "internal storage failure".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(serde_json::json!({
            "error": self.code(),
            "message": message,
        }));
        (self.status(), body).into_response()
    }
}

/// Run a store operation off the async runtime. SQLite calls are blocking,
/// so every handler funnels them through here.
pub async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Storage(anyhow::anyhow!("blocking task join error: {}", e)))?
}

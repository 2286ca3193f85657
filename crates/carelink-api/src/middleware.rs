use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::session::AuthError;

/// Extract and verify the bearer credential, then stash the claims for the
/// handlers. The verifying authority comes from shared state — never from an
/// ambient secret.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingToken)?;

    let claims = state.sessions.verify(token)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

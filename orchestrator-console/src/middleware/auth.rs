use axum::{extract::Request, middleware::Next, response::Response};
use console_core::error::AppError;
use tower_sessions::Session;

use crate::models::user::SESSION_ACCESS_TOKEN;

/// Rejects API calls without a logged-in session before any handler runs.
pub async fn require_session(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let access_token: Option<String> = session
        .get(SESSION_ACCESS_TOKEN)
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Session read failed: {}", e)))?;

    if access_token.is_none() {
        return Err(AppError::Unauthorized(anyhow::anyhow!("Login required")));
    }

    Ok(next.run(request).await)
}

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use console_core::error::AppError;
use secrecy::Secret;
use serde::Serialize;
use tower_sessions::Session;

pub const SESSION_ACCESS_TOKEN: &str = "access_token";
pub const SESSION_REFRESH_TOKEN: &str = "refresh_token";
pub const SESSION_USER_ID: &str = "user_id";
pub const SESSION_EMAIL: &str = "email";
pub const SESSION_COMPANY_CODE: &str = "company_code";

/// Profile echoed back to the browser after login.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub email: Option<String>,
    pub company_code: Option<String>,
}

/// Credentials for one backend call. Passed explicitly to every client
/// method; nothing about the caller is kept in shared state.
#[derive(Debug, Clone)]
pub struct BackendSession {
    pub access_token: Secret<String>,
    pub company_code: Option<String>,
}

/// Authenticated user context extracted from session
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
    pub company_code: Option<String>,
    pub access_token: String,
}

impl AuthUser {
    pub fn backend_session(&self) -> BackendSession {
        BackendSession {
            access_token: Secret::new(self.access_token.clone()),
            company_code: self.company_code.clone(),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::InternalError(anyhow::anyhow!(msg)))?;

        let access_token: Option<String> = session_value(&session, SESSION_ACCESS_TOKEN).await?;
        let user_id: Option<String> = session_value(&session, SESSION_USER_ID).await?;

        match (access_token, user_id) {
            (Some(access_token), Some(user_id)) => Ok(AuthUser {
                user_id,
                email: session_value(&session, SESSION_EMAIL).await?,
                company_code: session_value(&session, SESSION_COMPANY_CODE).await?,
                access_token,
            }),
            _ => Err(AppError::Unauthorized(anyhow::anyhow!("Login required"))),
        }
    }
}

async fn session_value(session: &Session, key: &str) -> Result<Option<String>, AppError> {
    session
        .get::<String>(key)
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Session read failed: {}", e)))
}

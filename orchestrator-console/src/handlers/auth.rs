use axum::{extract::State, http::StatusCode, Json};
use console_core::error::AppError;
use console_core::extract::ValidatedJson;
use console_core::middleware::RequestId;
use serde::Deserialize;
use tower_sessions::Session;
use validator::Validate;

use crate::models::user::{
    SESSION_ACCESS_TOKEN, SESSION_COMPANY_CODE, SESSION_EMAIL, SESSION_REFRESH_TOKEN,
    SESSION_USER_ID,
};
use crate::models::UserProfile;
use crate::services::BackendError;
use crate::utils::jwt::decode_jwt_claims;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginForm {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[serde(default)]
    pub company_code: Option<String>,
}

pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    request_id: RequestId,
    ValidatedJson(form): ValidatedJson<LoginForm>,
) -> Result<Json<UserProfile>, AppError> {
    let company_code = form
        .company_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty());

    let tokens = state
        .backend
        .login(&form.email, &form.password, company_code, Some(request_id.as_str()))
        .await
        .map_err(|e| match e {
            BackendError::Rejected { status, .. } if status == 401 || status == 403 => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid email or password"))
            }
            other => AppError::BadGateway(other.user_message()),
        })?;

    let claims = decode_jwt_claims(&tokens.access_token).map_err(|e| {
        tracing::error!("Failed to decode JWT claims: {}", e);
        AppError::InternalError(anyhow::anyhow!("Authentication error"))
    })?;

    let profile = UserProfile {
        user_id: claims.sub,
        email: claims.email.or_else(|| Some(form.email.clone())),
        company_code: tokens
            .company_code
            .or(claims.company_code)
            .or_else(|| company_code.map(str::to_string)),
    };

    session.cycle_id().await.map_err(session_error)?;
    store(&session, SESSION_ACCESS_TOKEN, Some(&tokens.access_token)).await?;
    store(&session, SESSION_REFRESH_TOKEN, tokens.refresh_token.as_ref()).await?;
    store(&session, SESSION_USER_ID, Some(&profile.user_id)).await?;
    store(&session, SESSION_EMAIL, profile.email.as_ref()).await?;
    store(&session, SESSION_COMPANY_CODE, profile.company_code.as_ref()).await?;

    tracing::info!(
        user_id = %profile.user_id,
        company_code = ?profile.company_code,
        "User logged in successfully"
    );

    Ok(Json(profile))
}

pub async fn logout_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<StatusCode, AppError> {
    let user_id: Option<String> = session
        .get(SESSION_USER_ID)
        .await
        .map_err(session_error)?;

    if let Some(user_id) = user_id {
        state.drafts.clear(&user_id);
        tracing::info!(user_id = %user_id, "User logged out");
    }

    session.flush().await.map_err(session_error)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn store(session: &Session, key: &str, value: Option<&String>) -> Result<(), AppError> {
    if let Some(value) = value {
        session.insert(key, value).await.map_err(session_error)?;
    }
    Ok(())
}

fn session_error(e: tower_sessions::session::Error) -> AppError {
    AppError::InternalError(anyhow::anyhow!("Session store error: {}", e))
}

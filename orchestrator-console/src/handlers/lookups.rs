use axum::{extract::State, Json};
use console_core::error::AppError;
use console_core::middleware::RequestId;

use crate::models::{AccountSummary, AuthUser, PartnerSummary};
use crate::AppState;

pub async fn list_accounts(
    State(state): State<AppState>,
    user: AuthUser,
    request_id: RequestId,
) -> Result<Json<Vec<AccountSummary>>, AppError> {
    let accounts = state
        .backend
        .list_accounts(&user.backend_session(), Some(request_id.as_str()))
        .await?;
    Ok(Json(accounts))
}

pub async fn list_dealers(
    State(state): State<AppState>,
    user: AuthUser,
    request_id: RequestId,
) -> Result<Json<Vec<PartnerSummary>>, AppError> {
    let dealers = state
        .backend
        .list_dealers(&user.backend_session(), Some(request_id.as_str()))
        .await?;
    Ok(Json(dealers))
}

pub async fn list_suppliers(
    State(state): State<AppState>,
    user: AuthUser,
    request_id: RequestId,
) -> Result<Json<Vec<PartnerSummary>>, AppError> {
    let suppliers = state
        .backend
        .list_suppliers(&user.backend_session(), Some(request_id.as_str()))
        .await?;
    Ok(Json(suppliers))
}

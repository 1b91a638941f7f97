//! Settlement draft endpoints.
//!
//! The browser edits one field at a time; each call returns the whole
//! refreshed view so totals and submit gating never drift from the draft.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use console_core::error::AppError;
use console_core::extract::ValidatedJson;
use console_core::middleware::RequestId;
use serde::Deserialize;
use validator::Validate;

use super::FieldEdit;
use crate::models::{AuthUser, BackendSession, SettlementResponse};
use crate::services::draft_store::SettlementView;
use crate::services::{BackendClient, BackendError, SettlementLookups, StoreError};
use crate::settlement::{
    AllocationField, Counterparty, DraftError, HeaderField, PaymentField, SettlementRequest,
};
use crate::utils::today;
use crate::AppState;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterpartyKind {
    Dealer,
    Supplier,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OpenSettlementForm {
    pub counterparty_type: CounterpartyKind,
    #[validate(range(min = 1, message = "Select a counterparty"))]
    pub counterparty_id: i64,
}

impl OpenSettlementForm {
    fn counterparty(&self) -> Counterparty {
        match self.counterparty_type {
            CounterpartyKind::Dealer => Counterparty::Dealer(self.counterparty_id),
            CounterpartyKind::Supplier => Counterparty::Supplier(self.counterparty_id),
        }
    }
}

pub async fn open_settlement(
    State(state): State<AppState>,
    user: AuthUser,
    request_id: RequestId,
    ValidatedJson(form): ValidatedJson<OpenSettlementForm>,
) -> Result<(StatusCode, Json<SettlementView>), AppError> {
    let counterparty = form.counterparty();
    let ticket = state
        .drafts
        .open_settlement(&user.user_id, counterparty, today());

    tracing::info!(
        user_id = %user.user_id,
        counterparty = counterparty.kind(),
        counterparty_id = counterparty.id(),
        generation = ticket.generation,
        "Settlement draft opened"
    );

    let session = user.backend_session();
    let applied = match load_lookups(&state.backend, &session, counterparty, &request_id).await {
        Ok(lookups) => {
            state
                .drafts
                .apply_settlement_lookups(&user.user_id, ticket.generation, lookups)
        }
        Err(e) => {
            tracing::warn!(
                user_id = %user.user_id,
                error = %e,
                "Failed to load settlement lookups"
            );
            state.drafts.record_settlement_load_error(
                &user.user_id,
                ticket.generation,
                e.user_message(),
            )
        }
    };
    if !applied {
        state.console_metrics.record_stale_load();
    }

    let view = state.drafts.settlement_view(&user.user_id)?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn load_lookups(
    backend: &BackendClient,
    session: &BackendSession,
    counterparty: Counterparty,
    request_id: &RequestId,
) -> Result<SettlementLookups, BackendError> {
    let request_id = Some(request_id.as_str());
    match counterparty {
        Counterparty::Dealer(dealer_id) => {
            let (accounts, invoices) = tokio::try_join!(
                backend.list_accounts(session, request_id),
                backend.list_dealer_invoices(session, dealer_id, request_id),
            )?;
            Ok(SettlementLookups {
                accounts,
                invoices,
                purchases: Vec::new(),
            })
        }
        Counterparty::Supplier(supplier_id) => {
            let (accounts, purchases) = tokio::try_join!(
                backend.list_accounts(session, request_id),
                backend.list_supplier_purchases(session, supplier_id, request_id),
            )?;
            Ok(SettlementLookups {
                accounts,
                invoices: Vec::new(),
                purchases,
            })
        }
    }
}

pub async fn get_settlement(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<SettlementView>, AppError> {
    Ok(Json(state.drafts.settlement_view(&user.user_id)?))
}

pub async fn close_settlement(
    State(state): State<AppState>,
    user: AuthUser,
) -> StatusCode {
    if state.drafts.close_settlement(&user.user_id) {
        tracing::info!(user_id = %user.user_id, "Settlement draft closed");
    }
    StatusCode::NO_CONTENT
}

pub async fn edit_header(
    State(state): State<AppState>,
    user: AuthUser,
    Json(edit): Json<FieldEdit<HeaderField>>,
) -> Result<Json<SettlementView>, AppError> {
    let raw = edit.raw();
    state
        .drafts
        .with_settlement(&user.user_id, |draft| draft.set_header_field(edit.field, &raw))?;
    Ok(Json(state.drafts.settlement_view(&user.user_id)?))
}

pub async fn add_allocation(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<(StatusCode, Json<SettlementView>), AppError> {
    state
        .drafts
        .with_settlement(&user.user_id, |draft| Ok(draft.add_allocation_line()))?;
    Ok((
        StatusCode::CREATED,
        Json(state.drafts.settlement_view(&user.user_id)?),
    ))
}

pub async fn edit_allocation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(index): Path<usize>,
    Json(edit): Json<FieldEdit<AllocationField>>,
) -> Result<Json<SettlementView>, AppError> {
    let raw = edit.raw();
    state.drafts.with_settlement(&user.user_id, |draft| {
        draft.set_allocation_field(index, edit.field, &raw)
    })?;
    Ok(Json(state.drafts.settlement_view(&user.user_id)?))
}

/// Removing the only line is a no-op; the view is returned unchanged.
pub async fn remove_allocation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(index): Path<usize>,
) -> Result<Json<SettlementView>, AppError> {
    state
        .drafts
        .with_settlement(&user.user_id, |draft| draft.remove_allocation_line(index))?;
    Ok(Json(state.drafts.settlement_view(&user.user_id)?))
}

pub async fn add_payment(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<(StatusCode, Json<SettlementView>), AppError> {
    state
        .drafts
        .with_settlement(&user.user_id, |draft| Ok(draft.add_payment_line()))?;
    Ok((
        StatusCode::CREATED,
        Json(state.drafts.settlement_view(&user.user_id)?),
    ))
}

pub async fn edit_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(index): Path<usize>,
    Json(edit): Json<FieldEdit<PaymentField>>,
) -> Result<Json<SettlementView>, AppError> {
    let raw = edit.raw();
    state.drafts.with_settlement(&user.user_id, |draft| {
        draft.set_payment_field(index, edit.field, &raw)
    })?;
    Ok(Json(state.drafts.settlement_view(&user.user_id)?))
}

pub async fn remove_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(index): Path<usize>,
) -> Result<Json<SettlementView>, AppError> {
    state
        .drafts
        .with_settlement(&user.user_id, |draft| draft.remove_payment_line(index))?;
    Ok(Json(state.drafts.settlement_view(&user.user_id)?))
}

/// Post the draft. A backend rejection keeps the draft open with the
/// server's message so the user can correct and retry with the same key.
/// If the request is cancelled mid-flight the submit guard releases the draft.
pub async fn submit_settlement(
    State(state): State<AppState>,
    user: AuthUser,
    request_id: RequestId,
) -> Result<Json<SettlementResponse>, AppError> {
    let (guard, request) = match state.drafts.begin_settlement_submit(&user.user_id) {
        Ok(started) => started,
        Err(e) => {
            if matches!(e, StoreError::Draft(DraftError::NotReady(_))) {
                state.console_metrics.record_submission("settlement", "blocked");
            }
            return Err(e.into());
        }
    };

    let kind = request.counterparty_kind();
    let session = user.backend_session();
    let rid = Some(request_id.as_str());
    let result = match &request {
        SettlementRequest::Dealer(body) => {
            state
                .backend
                .create_dealer_settlement(&session, body, rid)
                .await
        }
        SettlementRequest::Supplier(body) => {
            state
                .backend
                .create_supplier_settlement(&session, body, rid)
                .await
        }
    };

    match result {
        Ok(response) => {
            guard.complete();
            state.console_metrics.record_submission("settlement", "success");
            tracing::info!(
                user_id = %user.user_id,
                counterparty = kind,
                idempotency_key = %request.idempotency_key(),
                journal_entry_id = ?response.journal_entry.as_ref().map(|je| je.id),
                "Settlement posted"
            );
            Ok(Json(response))
        }
        Err(e) => {
            let message = e.user_message();
            guard.fail(message.clone());
            state.console_metrics.record_submission("settlement", "failure");
            tracing::warn!(
                user_id = %user.user_id,
                counterparty = kind,
                status = ?e.status(),
                error = %e,
                "Settlement submission rejected"
            );
            Err(AppError::BadGateway(message))
        }
    }
}

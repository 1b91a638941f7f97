use axum::{extract::State, http::StatusCode, Json};
use console_core::error::AppError;
use console_core::extract::ValidatedJson;
use console_core::middleware::RequestId;
use serde::Deserialize;
use validator::Validate;

use super::FieldEdit;
use crate::models::{AuthUser, JournalEntrySummary};
use crate::services::draft_store::DebitNoteView;
use crate::services::StoreError;
use crate::settlement::{DebitNoteField, DraftError};
use crate::utils::today;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OpenDebitNoteForm {
    #[validate(range(min = 1, message = "Select a supplier"))]
    pub supplier_id: i64,
}

pub async fn open_debit_note(
    State(state): State<AppState>,
    user: AuthUser,
    request_id: RequestId,
    ValidatedJson(form): ValidatedJson<OpenDebitNoteForm>,
) -> Result<(StatusCode, Json<DebitNoteView>), AppError> {
    let ticket = state.drafts.open_debit_note(&user.user_id, form.supplier_id);

    let applied = match state
        .backend
        .list_supplier_purchases(
            &user.backend_session(),
            form.supplier_id,
            Some(request_id.as_str()),
        )
        .await
    {
        Ok(purchases) => {
            state
                .drafts
                .apply_debit_note_purchases(&user.user_id, ticket.generation, purchases)
        }
        Err(e) => {
            tracing::warn!(
                user_id = %user.user_id,
                supplier_id = form.supplier_id,
                error = %e,
                "Failed to load supplier purchases"
            );
            state.drafts.record_debit_note_load_error(
                &user.user_id,
                ticket.generation,
                e.user_message(),
            )
        }
    };
    if !applied {
        state.console_metrics.record_stale_load();
    }

    let view = state.drafts.debit_note_view(&user.user_id)?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_debit_note(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DebitNoteView>, AppError> {
    Ok(Json(state.drafts.debit_note_view(&user.user_id)?))
}

pub async fn edit_debit_note(
    State(state): State<AppState>,
    user: AuthUser,
    Json(edit): Json<FieldEdit<DebitNoteField>>,
) -> Result<Json<DebitNoteView>, AppError> {
    let raw = edit.raw();
    state
        .drafts
        .with_debit_note(&user.user_id, |draft| draft.set_field(edit.field, &raw))?;
    Ok(Json(state.drafts.debit_note_view(&user.user_id)?))
}

pub async fn close_debit_note(State(state): State<AppState>, user: AuthUser) -> StatusCode {
    state.drafts.close_debit_note(&user.user_id);
    StatusCode::NO_CONTENT
}

pub async fn submit_debit_note(
    State(state): State<AppState>,
    user: AuthUser,
    request_id: RequestId,
) -> Result<Json<JournalEntrySummary>, AppError> {
    let (guard, request) = match state
        .drafts
        .begin_debit_note_submit(&user.user_id, today())
    {
        Ok(started) => started,
        Err(e) => {
            if matches!(e, StoreError::Draft(DraftError::NotReady(_))) {
                state.console_metrics.record_submission("debit_note", "blocked");
            }
            return Err(e.into());
        }
    };

    match state
        .backend
        .create_debit_note(&user.backend_session(), &request, Some(request_id.as_str()))
        .await
    {
        Ok(entry) => {
            guard.complete();
            state.console_metrics.record_submission("debit_note", "success");
            tracing::info!(
                user_id = %user.user_id,
                purchase_id = request.purchase_id,
                journal_entry_id = entry.id,
                "Debit note posted"
            );
            Ok(Json(entry))
        }
        Err(e) => {
            let message = e.user_message();
            guard.fail(message.clone());
            state.console_metrics.record_submission("debit_note", "failure");
            tracing::warn!(
                user_id = %user.user_id,
                purchase_id = request.purchase_id,
                error = %e,
                "Debit note submission rejected"
            );
            Err(AppError::BadGateway(message))
        }
    }
}

//! Per-user draft workspace.
//!
//! Each signed-in user owns at most one settlement draft and one debit-note
//! draft. Every open takes a fresh generation from a store-wide counter;
//! lookup responses and submit outcomes carry the generation they were
//! started under and are dropped when it no longer matches. All mutations are
//! synchronous and finish before the entry guard is released.
//!
//! A submit hands out a [`SubmitGuard`]. If the request future is dropped
//! before the backend answers, the guard releases the draft so it can be
//! edited and submitted again.

use crate::models::{AccountSummary, DealerInvoice, SupplierPurchase};
use crate::settlement::{
    BlockingReason, Counterparty, DebitNoteDraft, DebitNoteRequest, DraftError, DraftTotals,
    SettlementDraft, SettlementRequest,
};
use chrono::NaiveDate;
use console_core::error::AppError;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("No settlement draft is open")]
    NoSettlementDraft,

    #[error("No debit note draft is open")]
    NoDebitNoteDraft,

    #[error("A submission is already in progress")]
    SubmitInProgress,

    #[error(transparent)]
    Draft(#[from] DraftError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NoSettlementDraft | StoreError::NoDebitNoteDraft => {
                AppError::NotFound(anyhow::anyhow!(err.to_string()))
            }
            StoreError::SubmitInProgress => AppError::Conflict(anyhow::anyhow!(err.to_string())),
            StoreError::Draft(DraftError::NotReady(reasons)) => AppError::Unprocessable {
                message: "Draft is not ready to submit".to_string(),
                reasons: reasons.iter().map(ToString::to_string).collect(),
            },
            StoreError::Draft(other) => AppError::BadRequest(anyhow::anyhow!(other.to_string())),
        }
    }
}

/// Reference data loaded for an open settlement draft.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementLookups {
    pub accounts: Vec<AccountSummary>,
    pub invoices: Vec<DealerInvoice>,
    pub purchases: Vec<SupplierPurchase>,
}

/// Returned by an open; later loads and submits must present the generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftTicket {
    pub generation: u64,
    pub idempotency_key: String,
}

struct OpenSettlement {
    generation: u64,
    draft: SettlementDraft,
    lookups: Option<SettlementLookups>,
    load_error: Option<String>,
}

struct OpenDebitNote {
    generation: u64,
    draft: DebitNoteDraft,
    purchases: Option<Vec<SupplierPurchase>>,
    load_error: Option<String>,
}

#[derive(Default)]
struct Workspace {
    settlement: Option<OpenSettlement>,
    debit_note: Option<OpenDebitNote>,
}

/// Settlement draft plus its derived values, as rendered by the form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementView {
    pub generation: u64,
    #[serde(flatten)]
    pub draft: SettlementDraft,
    pub totals: DraftTotals,
    pub net_cash_required: Decimal,
    pub payment_total: Decimal,
    pub can_submit: bool,
    pub blocking_reasons: Vec<String>,
    pub lookups: Option<SettlementLookups>,
    pub load_error: Option<String>,
}

impl SettlementView {
    fn render(open: &OpenSettlement) -> Self {
        let draft = &open.draft;
        let reasons: Vec<BlockingReason> = draft.blocking_reasons();
        Self {
            generation: open.generation,
            draft: draft.clone(),
            totals: draft.compute_totals(),
            net_cash_required: draft.compute_net_cash_required(),
            payment_total: draft.compute_payment_total(),
            can_submit: reasons.is_empty(),
            blocking_reasons: reasons.iter().map(ToString::to_string).collect(),
            lookups: open.lookups.clone(),
            load_error: open.load_error.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebitNoteView {
    pub generation: u64,
    #[serde(flatten)]
    pub draft: DebitNoteDraft,
    pub can_submit: bool,
    pub purchases: Option<Vec<SupplierPurchase>>,
    pub load_error: Option<String>,
}

impl DebitNoteView {
    fn render(open: &OpenDebitNote) -> Self {
        Self {
            generation: open.generation,
            draft: open.draft.clone(),
            can_submit: open.draft.can_submit(),
            purchases: open.purchases.clone(),
            load_error: open.load_error.clone(),
        }
    }
}

/// Shown on a draft whose submission was abandoned mid-flight.
pub const INTERRUPTED_MESSAGE: &str =
    "Submission was interrupted before the server answered. Submit again to retry.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DraftKind {
    Settlement,
    DebitNote,
}

/// Marks a draft as submitting for as long as it is alive.
///
/// Resolve it with [`SubmitGuard::complete`] or [`SubmitGuard::fail`]. A guard
/// dropped unresolved clears the submitting flag and records
/// [`INTERRUPTED_MESSAGE`] on the draft it was issued for.
#[must_use = "dropping the guard releases the draft immediately"]
pub struct SubmitGuard<'a> {
    store: &'a DraftStore,
    user: String,
    generation: u64,
    kind: DraftKind,
    resolved: bool,
}

impl std::fmt::Debug for SubmitGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmitGuard")
            .field("user", &self.user)
            .field("generation", &self.generation)
            .field("kind", &self.kind)
            .field("resolved", &self.resolved)
            .finish()
    }
}

impl SubmitGuard<'_> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The backend accepted the submission; the draft is done.
    pub fn complete(mut self) {
        self.resolved = true;
        match self.kind {
            DraftKind::Settlement => self
                .store
                .complete_settlement_submit(&self.user, self.generation),
            DraftKind::DebitNote => self
                .store
                .complete_debit_note_submit(&self.user, self.generation),
        }
    }

    /// The backend rejected the submission; keep the draft with the message.
    pub fn fail(mut self, message: String) {
        self.resolved = true;
        self.release(message);
    }

    fn release(&self, message: String) {
        match self.kind {
            DraftKind::Settlement => {
                self.store
                    .fail_settlement_submit(&self.user, self.generation, message)
            }
            DraftKind::DebitNote => {
                self.store
                    .fail_debit_note_submit(&self.user, self.generation, message)
            }
        }
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        tracing::warn!(
            user_id = %self.user,
            generation = self.generation,
            kind = ?self.kind,
            "Submission abandoned before the backend answered"
        );
        self.release(INTERRUPTED_MESSAGE.to_string());
    }
}

#[derive(Default)]
pub struct DraftStore {
    workspaces: DashMap<String, Workspace>,
    next_generation: AtomicU64,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn submit_guard(&self, user: &str, generation: u64, kind: DraftKind) -> SubmitGuard<'_> {
        SubmitGuard {
            store: self,
            user: user.to_string(),
            generation,
            kind,
            resolved: false,
        }
    }

    /// Drop everything the user had open. Called on logout.
    pub fn clear(&self, user: &str) {
        self.workspaces.remove(user);
    }

    // Settlement drafts

    /// Open a fresh draft, discarding any previous one for this user.
    pub fn open_settlement(
        &self,
        user: &str,
        counterparty: Counterparty,
        settlement_date: NaiveDate,
    ) -> DraftTicket {
        let generation = self.bump();
        let draft = SettlementDraft::open(counterparty, settlement_date);
        let ticket = DraftTicket {
            generation,
            idempotency_key: draft.idempotency_key.clone(),
        };

        let mut workspace = self.workspaces.entry(user.to_string()).or_default();
        workspace.settlement = Some(OpenSettlement {
            generation,
            draft,
            lookups: None,
            load_error: None,
        });

        ticket
    }

    /// Store lookups loaded for `generation`. Returns false when the draft
    /// was closed or replaced while the load was in flight.
    pub fn apply_settlement_lookups(
        &self,
        user: &str,
        generation: u64,
        lookups: SettlementLookups,
    ) -> bool {
        self.with_current_settlement(user, generation, |open| {
            open.lookups = Some(lookups);
            open.load_error = None;
        })
    }

    pub fn record_settlement_load_error(&self, user: &str, generation: u64, message: String) -> bool {
        self.with_current_settlement(user, generation, |open| {
            open.load_error = Some(message);
        })
    }

    fn with_current_settlement(
        &self,
        user: &str,
        generation: u64,
        apply: impl FnOnce(&mut OpenSettlement),
    ) -> bool {
        let Some(mut workspace) = self.workspaces.get_mut(user) else {
            return false;
        };
        match workspace.settlement.as_mut() {
            Some(open) if open.generation == generation => {
                apply(open);
                true
            }
            _ => {
                tracing::debug!(user, generation, "Discarding stale settlement load");
                false
            }
        }
    }

    /// Run an edit against the open draft. Edits are refused mid-submit.
    pub fn with_settlement<R>(
        &self,
        user: &str,
        edit: impl FnOnce(&mut SettlementDraft) -> Result<R, DraftError>,
    ) -> Result<R, StoreError> {
        let mut workspace = self
            .workspaces
            .get_mut(user)
            .ok_or(StoreError::NoSettlementDraft)?;
        let open = workspace
            .settlement
            .as_mut()
            .ok_or(StoreError::NoSettlementDraft)?;
        if open.draft.submitting {
            return Err(StoreError::SubmitInProgress);
        }
        Ok(edit(&mut open.draft)?)
    }

    pub fn settlement_view(&self, user: &str) -> Result<SettlementView, StoreError> {
        let workspace = self
            .workspaces
            .get(user)
            .ok_or(StoreError::NoSettlementDraft)?;
        workspace
            .settlement
            .as_ref()
            .map(SettlementView::render)
            .ok_or(StoreError::NoSettlementDraft)
    }

    /// Close the draft unconditionally. Returns whether one was open.
    pub fn close_settlement(&self, user: &str) -> bool {
        self.workspaces
            .get_mut(user)
            .and_then(|mut workspace| workspace.settlement.take())
            .is_some()
    }

    /// Validate, mark the draft as submitting and hand back the request to
    /// send together with the guard that resolves the submission.
    pub fn begin_settlement_submit(
        &self,
        user: &str,
    ) -> Result<(SubmitGuard<'_>, SettlementRequest), StoreError> {
        let (generation, request) = self.mark_settlement_submitting(user)?;
        Ok((
            self.submit_guard(user, generation, DraftKind::Settlement),
            request,
        ))
    }

    fn mark_settlement_submitting(&self, user: &str) -> Result<(u64, SettlementRequest), StoreError> {
        let mut workspace = self
            .workspaces
            .get_mut(user)
            .ok_or(StoreError::NoSettlementDraft)?;
        let open = workspace
            .settlement
            .as_mut()
            .ok_or(StoreError::NoSettlementDraft)?;

        if open.draft.submitting {
            return Err(StoreError::SubmitInProgress);
        }

        let request = open.draft.build_request()?;
        open.draft.submitting = true;
        open.draft.error = None;
        Ok((open.generation, request))
    }

    fn complete_settlement_submit(&self, user: &str, generation: u64) {
        if let Some(mut workspace) = self.workspaces.get_mut(user) {
            if matches!(&workspace.settlement, Some(open) if open.generation == generation) {
                workspace.settlement = None;
            }
        }
    }

    fn fail_settlement_submit(&self, user: &str, generation: u64, message: String) {
        self.with_current_settlement(user, generation, |open| {
            open.draft.submitting = false;
            open.draft.error = Some(message);
        });
    }

    // Debit note drafts

    pub fn open_debit_note(&self, user: &str, supplier_id: i64) -> DraftTicket {
        let generation = self.bump();
        let draft = DebitNoteDraft::open(supplier_id);
        let ticket = DraftTicket {
            generation,
            idempotency_key: draft.idempotency_key.clone(),
        };

        let mut workspace = self.workspaces.entry(user.to_string()).or_default();
        workspace.debit_note = Some(OpenDebitNote {
            generation,
            draft,
            purchases: None,
            load_error: None,
        });

        ticket
    }

    pub fn apply_debit_note_purchases(
        &self,
        user: &str,
        generation: u64,
        purchases: Vec<SupplierPurchase>,
    ) -> bool {
        self.with_current_debit_note(user, generation, |open| {
            open.purchases = Some(purchases);
            open.load_error = None;
        })
    }

    pub fn record_debit_note_load_error(&self, user: &str, generation: u64, message: String) -> bool {
        self.with_current_debit_note(user, generation, |open| {
            open.load_error = Some(message);
        })
    }

    fn with_current_debit_note(
        &self,
        user: &str,
        generation: u64,
        apply: impl FnOnce(&mut OpenDebitNote),
    ) -> bool {
        let Some(mut workspace) = self.workspaces.get_mut(user) else {
            return false;
        };
        match workspace.debit_note.as_mut() {
            Some(open) if open.generation == generation => {
                apply(open);
                true
            }
            _ => {
                tracing::debug!(user, generation, "Discarding stale debit note load");
                false
            }
        }
    }

    pub fn with_debit_note<R>(
        &self,
        user: &str,
        edit: impl FnOnce(&mut DebitNoteDraft) -> Result<R, DraftError>,
    ) -> Result<R, StoreError> {
        let mut workspace = self
            .workspaces
            .get_mut(user)
            .ok_or(StoreError::NoDebitNoteDraft)?;
        let open = workspace
            .debit_note
            .as_mut()
            .ok_or(StoreError::NoDebitNoteDraft)?;
        if open.draft.submitting {
            return Err(StoreError::SubmitInProgress);
        }
        Ok(edit(&mut open.draft)?)
    }

    pub fn debit_note_view(&self, user: &str) -> Result<DebitNoteView, StoreError> {
        let workspace = self
            .workspaces
            .get(user)
            .ok_or(StoreError::NoDebitNoteDraft)?;
        workspace
            .debit_note
            .as_ref()
            .map(DebitNoteView::render)
            .ok_or(StoreError::NoDebitNoteDraft)
    }

    pub fn close_debit_note(&self, user: &str) -> bool {
        self.workspaces
            .get_mut(user)
            .and_then(|mut workspace| workspace.debit_note.take())
            .is_some()
    }

    pub fn begin_debit_note_submit(
        &self,
        user: &str,
        entry_date: NaiveDate,
    ) -> Result<(SubmitGuard<'_>, DebitNoteRequest), StoreError> {
        let (generation, request) = self.mark_debit_note_submitting(user, entry_date)?;
        Ok((
            self.submit_guard(user, generation, DraftKind::DebitNote),
            request,
        ))
    }

    fn mark_debit_note_submitting(
        &self,
        user: &str,
        entry_date: NaiveDate,
    ) -> Result<(u64, DebitNoteRequest), StoreError> {
        let mut workspace = self
            .workspaces
            .get_mut(user)
            .ok_or(StoreError::NoDebitNoteDraft)?;
        let open = workspace
            .debit_note
            .as_mut()
            .ok_or(StoreError::NoDebitNoteDraft)?;

        if open.draft.submitting {
            return Err(StoreError::SubmitInProgress);
        }

        let request = open.draft.build_request(entry_date)?;
        open.draft.submitting = true;
        open.draft.error = None;
        Ok((open.generation, request))
    }

    fn complete_debit_note_submit(&self, user: &str, generation: u64) {
        if let Some(mut workspace) = self.workspaces.get_mut(user) {
            if matches!(&workspace.debit_note, Some(open) if open.generation == generation) {
                workspace.debit_note = None;
            }
        }
    }

    fn fail_debit_note_submit(&self, user: &str, generation: u64, message: String) {
        self.with_current_debit_note(user, generation, |open| {
            open.draft.submitting = false;
            open.draft.error = Some(message);
        });
    }
}

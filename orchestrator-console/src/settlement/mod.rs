//! Settlement-family form models: the allocation ledger draft, its outbound
//! request composition, and the debit-note draft.

pub mod amount;
pub mod debit_note;
pub mod draft;
pub mod model;
pub mod request;

pub use debit_note::{DebitNoteDraft, DebitNoteField, DebitNoteRequest};
pub use draft::{PAYMENT_TOLERANCE, SettlementDraft};
pub use model::{
    AllocationField, AllocationLine, Counterparty, DraftTotals, HeaderField, PaymentField,
    PaymentLine, PaymentMethod, PaymentMode,
};
pub use request::{
    DealerAllocation, DealerSettlementRequest, SettlementPayment, SettlementRequest,
    SupplierAllocation, SupplierSettlementRequest,
};

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("line {index} does not exist (draft has {len} lines)")]
    LineOutOfRange { index: usize, len: usize },

    #[error("invalid value '{value}' for {field}")]
    InvalidValue { field: &'static str, value: String },

    #[error("split payments are only available for dealer settlements")]
    SplitNotSupported,

    #[error("draft is not ready to submit")]
    NotReady(Vec<BlockingReason>),
}

/// Why a draft cannot be submitted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum BlockingReason {
    #[error("no amount has been applied")]
    NothingApplied,

    #[error("a discount account is required when a discount is applied")]
    MissingDiscountAccount,

    #[error("a write-off account is required when an amount is written off")]
    MissingWriteOffAccount,

    #[error("an FX gain account is required for a net FX gain")]
    MissingFxGainAccount,

    #[error("an FX loss account is required for a net FX loss")]
    MissingFxLossAccount,

    #[error("allocation line {line} applies an amount without an invoice")]
    AllocationWithoutInvoice { line: usize },

    #[error("a cash account is required")]
    MissingCashAccount,

    #[error("at least one payment line is required")]
    NoPaymentLines,

    #[error("payment line {line} needs an account and a positive amount")]
    IncompletePaymentLine { line: usize },

    #[error("payments total {payment_total} but {net_cash} is required")]
    PaymentMismatch {
        payment_total: Decimal,
        net_cash: Decimal,
    },

    #[error("a purchase must be selected")]
    MissingPurchase,
}

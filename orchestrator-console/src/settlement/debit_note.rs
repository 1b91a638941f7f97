//! Debit note against a supplier purchase.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::amount::{parse_flag, parse_id, parse_text};
use super::{BlockingReason, DraftError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DebitNoteField {
    PurchaseId,
    ReferenceNumber,
    Memo,
    AdminOverride,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebitNoteDraft {
    pub supplier_id: i64,
    pub purchase_id: Option<i64>,
    pub reference_number: Option<String>,
    pub memo: Option<String>,
    pub admin_override: bool,
    pub idempotency_key: String,
    pub submitting: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebitNoteRequest {
    pub purchase_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    pub admin_override: bool,
    pub idempotency_key: String,
    pub entry_date: NaiveDate,
}

impl DebitNoteDraft {
    pub fn open(supplier_id: i64) -> Self {
        Self {
            supplier_id,
            purchase_id: None,
            reference_number: None,
            memo: None,
            admin_override: false,
            idempotency_key: Uuid::new_v4().to_string(),
            submitting: false,
            error: None,
        }
    }

    pub fn set_field(&mut self, field: DebitNoteField, raw: &str) -> Result<(), DraftError> {
        match field {
            DebitNoteField::PurchaseId => self.purchase_id = parse_id(raw),
            DebitNoteField::ReferenceNumber => self.reference_number = parse_text(raw),
            DebitNoteField::Memo => self.memo = parse_text(raw),
            DebitNoteField::AdminOverride => {
                self.admin_override = parse_flag("adminOverride", raw)?;
            }
        }
        Ok(())
    }

    pub fn can_submit(&self) -> bool {
        self.purchase_id.is_some()
    }

    /// Compose the request, dated `entry_date` (today at the call site).
    pub fn build_request(&self, entry_date: NaiveDate) -> Result<DebitNoteRequest, DraftError> {
        let purchase_id = self
            .purchase_id
            .ok_or_else(|| DraftError::NotReady(vec![BlockingReason::MissingPurchase]))?;

        Ok(DebitNoteRequest {
            purchase_id,
            reference_number: self.reference_number.clone(),
            memo: self.memo.clone(),
            admin_override: self.admin_override,
            idempotency_key: self.idempotency_key.clone(),
            entry_date,
        })
    }
}

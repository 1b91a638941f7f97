//! Allocation ledger draft: the editable settlement form and its derived values.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::amount::{
    parse_amount, parse_flag, parse_id, parse_non_negative, parse_raw_text, parse_text,
};
use super::model::{
    AllocationField, AllocationLine, Counterparty, DraftTotals, HeaderField, PaymentField,
    PaymentLine, PaymentMethod, PaymentMode,
};
use super::{BlockingReason, DraftError};

/// Largest accepted gap between split payments and net cash required.
///
/// The comparison is strict: a gap of exactly one cent blocks submission.
/// A "within 0.01" reading of the payment rule would let 999.99 against a
/// net cash of 1000 through, yet that pair must stay blocked, so only gaps
/// strictly below one cent are accepted.
pub const PAYMENT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Settlement form state for one counterparty.
///
/// A draft is created when the form opens and dropped on close or after a
/// successful submit. It is never reused for another counterparty.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementDraft {
    pub counterparty: Counterparty,
    pub payment_mode: PaymentMode,
    pub cash_account_id: Option<i64>,
    pub payment_method: PaymentMethod,
    pub discount_account_id: Option<i64>,
    pub write_off_account_id: Option<i64>,
    pub fx_gain_account_id: Option<i64>,
    pub fx_loss_account_id: Option<i64>,
    pub settlement_date: NaiveDate,
    pub reference_number: Option<String>,
    pub memo: Option<String>,
    pub admin_override: bool,
    pub idempotency_key: String,
    pub allocations: Vec<AllocationLine>,
    pub payments: Vec<PaymentLine>,
    pub submitting: bool,
    pub error: Option<String>,
}

impl SettlementDraft {
    /// Fresh draft with one empty allocation line, one empty payment line and
    /// a new idempotency key.
    pub fn open(counterparty: Counterparty, settlement_date: NaiveDate) -> Self {
        Self {
            counterparty,
            payment_mode: PaymentMode::Single,
            cash_account_id: None,
            payment_method: PaymentMethod::Cash,
            discount_account_id: None,
            write_off_account_id: None,
            fx_gain_account_id: None,
            fx_loss_account_id: None,
            settlement_date,
            reference_number: None,
            memo: None,
            admin_override: false,
            idempotency_key: Uuid::new_v4().to_string(),
            allocations: vec![AllocationLine::default()],
            payments: vec![PaymentLine::default()],
            submitting: false,
            error: None,
        }
    }

    pub fn add_allocation_line(&mut self) -> usize {
        self.allocations.push(AllocationLine::default());
        self.allocations.len() - 1
    }

    /// Remove a line. Returns `Ok(false)` when it is the last remaining line,
    /// which is always kept.
    pub fn remove_allocation_line(&mut self, index: usize) -> Result<bool, DraftError> {
        check_index(index, self.allocations.len())?;
        if self.allocations.len() == 1 {
            return Ok(false);
        }
        self.allocations.remove(index);
        Ok(true)
    }

    pub fn set_allocation_field(
        &mut self,
        index: usize,
        field: AllocationField,
        raw: &str,
    ) -> Result<(), DraftError> {
        check_index(index, self.allocations.len())?;
        let line = &mut self.allocations[index];
        match field {
            AllocationField::InvoiceId => line.invoice_id = parse_id(raw),
            AllocationField::PurchaseId => line.purchase_id = parse_id(raw),
            AllocationField::AppliedAmount => line.applied_amount = parse_non_negative(raw),
            AllocationField::DiscountAmount => line.discount_amount = parse_non_negative(raw),
            AllocationField::WriteOffAmount => line.write_off_amount = parse_non_negative(raw),
            AllocationField::FxAdjustment => line.fx_adjustment = parse_amount(raw),
            AllocationField::Memo => line.memo = parse_raw_text(raw),
        }
        Ok(())
    }

    pub fn add_payment_line(&mut self) -> usize {
        self.payments.push(PaymentLine::default());
        self.payments.len() - 1
    }

    /// Same minimum-one-line rule as allocations.
    pub fn remove_payment_line(&mut self, index: usize) -> Result<bool, DraftError> {
        check_index(index, self.payments.len())?;
        if self.payments.len() == 1 {
            return Ok(false);
        }
        self.payments.remove(index);
        Ok(true)
    }

    pub fn set_payment_field(
        &mut self,
        index: usize,
        field: PaymentField,
        raw: &str,
    ) -> Result<(), DraftError> {
        check_index(index, self.payments.len())?;
        let line = &mut self.payments[index];
        match field {
            PaymentField::AccountId => line.account_id = parse_id(raw).unwrap_or(0),
            PaymentField::Amount => line.amount = parse_non_negative(raw),
            PaymentField::Method => line.method = raw.parse()?,
            PaymentField::ReferenceNumber => line.reference_number = parse_text(raw),
            PaymentField::Memo => line.memo = parse_text(raw),
        }
        Ok(())
    }

    pub fn set_header_field(&mut self, field: HeaderField, raw: &str) -> Result<(), DraftError> {
        match field {
            HeaderField::PaymentMode => {
                let mode: PaymentMode = raw.parse()?;
                if mode == PaymentMode::Split && !self.counterparty.is_dealer() {
                    return Err(DraftError::SplitNotSupported);
                }
                self.payment_mode = mode;
            }
            HeaderField::CashAccountId => self.cash_account_id = parse_id(raw),
            HeaderField::PaymentMethod => self.payment_method = raw.parse()?,
            HeaderField::DiscountAccountId => self.discount_account_id = parse_id(raw),
            HeaderField::WriteOffAccountId => self.write_off_account_id = parse_id(raw),
            HeaderField::FxGainAccountId => self.fx_gain_account_id = parse_id(raw),
            HeaderField::FxLossAccountId => self.fx_loss_account_id = parse_id(raw),
            HeaderField::SettlementDate => {
                self.settlement_date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                    .map_err(|_| DraftError::InvalidValue {
                        field: "settlementDate",
                        value: raw.to_string(),
                    })?;
            }
            HeaderField::ReferenceNumber => self.reference_number = parse_text(raw),
            HeaderField::Memo => self.memo = parse_text(raw),
            HeaderField::AdminOverride => {
                self.admin_override = parse_flag("adminOverride", raw)?;
            }
        }
        Ok(())
    }

    /// Sums recomputed from the current lines on every call.
    pub fn compute_totals(&self) -> DraftTotals {
        self.allocations
            .iter()
            .fold(DraftTotals::default(), |mut totals, line| {
                totals.applied += line.applied_amount;
                totals.discount += line.discount_amount;
                totals.write_off += line.write_off_amount;
                totals.fx += line.fx_adjustment;
                totals
            })
    }

    pub fn compute_net_cash_required(&self) -> Decimal {
        self.compute_totals().net_cash_required()
    }

    /// Single mode pays exactly the net cash once a cash account is chosen;
    /// split mode pays whatever the payment lines add up to.
    pub fn compute_payment_total(&self) -> Decimal {
        match self.payment_mode {
            PaymentMode::Single => {
                if self.cash_account_id.is_some() {
                    self.compute_net_cash_required()
                } else {
                    Decimal::ZERO
                }
            }
            PaymentMode::Split => self.payments.iter().map(|p| p.amount).sum(),
        }
    }

    /// Every rule the draft currently violates. Empty means ready.
    pub fn blocking_reasons(&self) -> Vec<BlockingReason> {
        let totals = self.compute_totals();
        let mut reasons = Vec::new();

        if totals.applied <= Decimal::ZERO {
            reasons.push(BlockingReason::NothingApplied);
        }
        if totals.discount > Decimal::ZERO && self.discount_account_id.is_none() {
            reasons.push(BlockingReason::MissingDiscountAccount);
        }
        if totals.write_off > Decimal::ZERO && self.write_off_account_id.is_none() {
            reasons.push(BlockingReason::MissingWriteOffAccount);
        }
        if totals.fx > Decimal::ZERO && self.fx_gain_account_id.is_none() {
            reasons.push(BlockingReason::MissingFxGainAccount);
        }
        if totals.fx < Decimal::ZERO && self.fx_loss_account_id.is_none() {
            reasons.push(BlockingReason::MissingFxLossAccount);
        }

        if self.counterparty.is_dealer() {
            for (line, allocation) in self.allocations.iter().enumerate() {
                if allocation.applied_amount > Decimal::ZERO && allocation.invoice_id.is_none() {
                    reasons.push(BlockingReason::AllocationWithoutInvoice { line });
                }
            }
        }

        match self.payment_mode {
            PaymentMode::Single => {
                if self.cash_account_id.is_none() {
                    reasons.push(BlockingReason::MissingCashAccount);
                }
            }
            PaymentMode::Split => {
                if self.payments.is_empty() {
                    reasons.push(BlockingReason::NoPaymentLines);
                }
                for (line, payment) in self.payments.iter().enumerate() {
                    if !payment.is_complete() {
                        reasons.push(BlockingReason::IncompletePaymentLine { line });
                    }
                }
                let payment_total = self.compute_payment_total();
                let net_cash = totals.net_cash_required();
                if (payment_total - net_cash).abs() >= PAYMENT_TOLERANCE {
                    reasons.push(BlockingReason::PaymentMismatch {
                        payment_total,
                        net_cash,
                    });
                }
            }
        }

        reasons
    }

    pub fn can_submit(&self) -> bool {
        self.blocking_reasons().is_empty()
    }
}

fn check_index(index: usize, len: usize) -> Result<(), DraftError> {
    if index < len {
        Ok(())
    } else {
        Err(DraftError::LineOutOfRange { index, len })
    }
}

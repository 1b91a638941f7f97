//! Outbound settlement payloads.
//!
//! Dealer and supplier settlements go to different endpoints with different
//! contracts. They are modelled as two disjoint types so that a supplier
//! request cannot carry a `payments` array or an `invoiceId`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::draft::SettlementDraft;
use super::model::{Counterparty, PaymentMethod, PaymentMode};
use super::{BlockingReason, DraftError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealerAllocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<i64>,
    #[serde(with = "rust_decimal::serde::float")]
    pub applied_amount: Decimal,
    #[serde(
        with = "rust_decimal::serde::float",
        skip_serializing_if = "Decimal::is_zero"
    )]
    pub discount_amount: Decimal,
    #[serde(
        with = "rust_decimal::serde::float",
        skip_serializing_if = "Decimal::is_zero"
    )]
    pub write_off_amount: Decimal,
    #[serde(
        with = "rust_decimal::serde::float",
        skip_serializing_if = "Decimal::is_zero"
    )]
    pub fx_adjustment: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// Supplier allocations reference purchases; there is no invoice field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierAllocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_id: Option<i64>,
    #[serde(with = "rust_decimal::serde::float")]
    pub applied_amount: Decimal,
    #[serde(
        with = "rust_decimal::serde::float",
        skip_serializing_if = "Decimal::is_zero"
    )]
    pub discount_amount: Decimal,
    #[serde(
        with = "rust_decimal::serde::float",
        skip_serializing_if = "Decimal::is_zero"
    )]
    pub write_off_amount: Decimal,
    #[serde(
        with = "rust_decimal::serde::float",
        skip_serializing_if = "Decimal::is_zero"
    )]
    pub fx_adjustment: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementPayment {
    pub account_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealerSettlementRequest {
    pub dealer_id: i64,
    pub allocations: Vec<DealerAllocation>,
    pub payments: Vec<SettlementPayment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_account_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_off_account_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fx_gain_account_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fx_loss_account_id: Option<i64>,
    pub settlement_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    pub admin_override: bool,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierSettlementRequest {
    pub supplier_id: i64,
    pub cash_account_id: i64,
    pub allocations: Vec<SupplierAllocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_account_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_off_account_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fx_gain_account_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fx_loss_account_id: Option<i64>,
    pub settlement_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    pub admin_override: bool,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettlementRequest {
    Dealer(DealerSettlementRequest),
    Supplier(SupplierSettlementRequest),
}

impl SettlementRequest {
    pub fn counterparty_kind(&self) -> &'static str {
        match self {
            Self::Dealer(_) => "dealer",
            Self::Supplier(_) => "supplier",
        }
    }

    pub fn idempotency_key(&self) -> &str {
        match self {
            Self::Dealer(r) => &r.idempotency_key,
            Self::Supplier(r) => &r.idempotency_key,
        }
    }
}

impl SettlementDraft {
    /// Compose the request for the draft's counterparty.
    ///
    /// Fails with [`DraftError::NotReady`] unless [`SettlementDraft::can_submit`]
    /// holds.
    pub fn build_request(&self) -> Result<SettlementRequest, DraftError> {
        let reasons = self.blocking_reasons();
        if !reasons.is_empty() {
            return Err(DraftError::NotReady(reasons));
        }

        match self.counterparty {
            Counterparty::Dealer(dealer_id) => Ok(SettlementRequest::Dealer(
                self.build_dealer_request(dealer_id)?,
            )),
            Counterparty::Supplier(supplier_id) => Ok(SettlementRequest::Supplier(
                self.build_supplier_request(supplier_id)?,
            )),
        }
    }

    fn build_dealer_request(&self, dealer_id: i64) -> Result<DealerSettlementRequest, DraftError> {
        let allocations = self
            .allocations
            .iter()
            .map(|line| DealerAllocation {
                invoice_id: line.invoice_id,
                applied_amount: line.applied_amount,
                discount_amount: line.discount_amount,
                write_off_amount: line.write_off_amount,
                fx_adjustment: line.fx_adjustment,
                memo: line.memo.clone(),
            })
            .collect();

        let payments = match self.payment_mode {
            PaymentMode::Single => {
                let account_id = self.required_cash_account()?;
                vec![SettlementPayment {
                    account_id,
                    amount: self.compute_net_cash_required(),
                    method: self.payment_method,
                    reference_number: None,
                    memo: None,
                }]
            }
            PaymentMode::Split => self
                .payments
                .iter()
                .filter(|p| p.is_complete())
                .map(|p| SettlementPayment {
                    account_id: p.account_id,
                    amount: p.amount,
                    method: p.method,
                    reference_number: p.reference_number.clone(),
                    memo: p.memo.clone(),
                })
                .collect(),
        };

        Ok(DealerSettlementRequest {
            dealer_id,
            allocations,
            payments,
            discount_account_id: self.discount_account_id,
            write_off_account_id: self.write_off_account_id,
            fx_gain_account_id: self.fx_gain_account_id,
            fx_loss_account_id: self.fx_loss_account_id,
            settlement_date: self.settlement_date,
            reference_number: self.reference_number.clone(),
            memo: self.memo.clone(),
            admin_override: self.admin_override,
            idempotency_key: self.idempotency_key.clone(),
        })
    }

    fn build_supplier_request(
        &self,
        supplier_id: i64,
    ) -> Result<SupplierSettlementRequest, DraftError> {
        let allocations = self
            .allocations
            .iter()
            .map(|line| SupplierAllocation {
                purchase_id: line.purchase_id,
                applied_amount: line.applied_amount,
                discount_amount: line.discount_amount,
                write_off_amount: line.write_off_amount,
                fx_adjustment: line.fx_adjustment,
                memo: line.memo.clone(),
            })
            .collect();

        Ok(SupplierSettlementRequest {
            supplier_id,
            cash_account_id: self.required_cash_account()?,
            allocations,
            discount_account_id: self.discount_account_id,
            write_off_account_id: self.write_off_account_id,
            fx_gain_account_id: self.fx_gain_account_id,
            fx_loss_account_id: self.fx_loss_account_id,
            settlement_date: self.settlement_date,
            reference_number: self.reference_number.clone(),
            memo: self.memo.clone(),
            admin_override: self.admin_override,
            idempotency_key: self.idempotency_key.clone(),
        })
    }

    fn required_cash_account(&self) -> Result<i64, DraftError> {
        self.cash_account_id
            .ok_or_else(|| DraftError::NotReady(vec![BlockingReason::MissingCashAccount]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::{AllocationField, HeaderField, PaymentField};
    use serde_json::Value;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn dealer_draft() -> SettlementDraft {
        let mut draft = SettlementDraft::open(Counterparty::Dealer(5), date());
        draft
            .set_allocation_field(0, AllocationField::InvoiceId, "301")
            .unwrap();
        draft
            .set_allocation_field(0, AllocationField::AppliedAmount, "1000")
            .unwrap();
        draft
            .set_allocation_field(0, AllocationField::DiscountAmount, "100")
            .unwrap();
        draft
            .set_header_field(HeaderField::DiscountAccountId, "41")
            .unwrap();
        draft
            .set_header_field(HeaderField::CashAccountId, "11")
            .unwrap();
        draft
            .set_header_field(HeaderField::PaymentMethod, "BANK")
            .unwrap();
        draft
    }

    #[test]
    fn dealer_single_mode_synthesizes_one_payment() {
        let SettlementRequest::Dealer(request) = dealer_draft().build_request().unwrap() else {
            panic!("expected dealer request");
        };

        assert_eq!(request.dealer_id, 5);
        assert_eq!(
            request.payments,
            vec![SettlementPayment {
                account_id: 11,
                amount: Decimal::from(900),
                method: PaymentMethod::Bank,
                reference_number: None,
                memo: None,
            }]
        );
        assert_eq!(request.allocations[0].invoice_id, Some(301));
        assert_eq!(request.discount_account_id, Some(41));
    }

    #[test]
    fn dealer_split_mode_sends_only_complete_lines() {
        let mut draft = dealer_draft();
        draft
            .set_header_field(HeaderField::PaymentMode, "split")
            .unwrap();
        draft.set_payment_field(0, PaymentField::AccountId, "11").unwrap();
        draft.set_payment_field(0, PaymentField::Amount, "500").unwrap();
        draft.add_payment_line();
        draft.set_payment_field(1, PaymentField::AccountId, "12").unwrap();
        draft.set_payment_field(1, PaymentField::Amount, "400").unwrap();
        draft.set_payment_field(1, PaymentField::Method, "CHEQUE").unwrap();
        draft
            .set_payment_field(1, PaymentField::ReferenceNumber, "CHQ-0091")
            .unwrap();

        let SettlementRequest::Dealer(request) = draft.build_request().unwrap() else {
            panic!("expected dealer request");
        };
        assert_eq!(request.payments.len(), 2);
        assert_eq!(request.payments[1].method, PaymentMethod::Cheque);
        assert_eq!(request.payments[1].reference_number.as_deref(), Some("CHQ-0091"));
    }

    #[test]
    fn supplier_request_never_carries_payments_or_invoice_ids() {
        let mut draft = SettlementDraft::open(Counterparty::Supplier(8), date());
        draft.add_allocation_line();
        for (i, (invoice, purchase, amount)) in
            [("301", "77", "250"), ("302", "", "125.50")].iter().enumerate()
        {
            draft
                .set_allocation_field(i, AllocationField::InvoiceId, invoice)
                .unwrap();
            draft
                .set_allocation_field(i, AllocationField::PurchaseId, purchase)
                .unwrap();
            draft
                .set_allocation_field(i, AllocationField::AppliedAmount, amount)
                .unwrap();
        }
        draft
            .set_header_field(HeaderField::CashAccountId, "11")
            .unwrap();
        assert!(draft.allocations.iter().all(|l| l.invoice_id.is_some()));

        let SettlementRequest::Supplier(request) = draft.build_request().unwrap() else {
            panic!("expected supplier request");
        };
        assert_eq!(request.cash_account_id, 11);

        let json = serde_json::to_value(&request).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("payments"));
        assert_eq!(object["supplierId"], Value::from(8));
        assert_eq!(object["cashAccountId"], Value::from(11));
        for allocation in object["allocations"].as_array().unwrap() {
            assert!(allocation.get("invoiceId").is_none());
        }
        assert_eq!(object["allocations"][0]["purchaseId"], Value::from(77));
        assert!(object["allocations"][1].get("purchaseId").is_none());
    }

    #[test]
    fn dealer_payload_uses_camel_case_numbers() {
        let SettlementRequest::Dealer(request) = dealer_draft().build_request().unwrap() else {
            panic!("expected dealer request");
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["settlementDate"], Value::from("2026-10-18"));
        assert_eq!(json["adminOverride"], Value::from(false));
        assert_eq!(json["allocations"][0]["appliedAmount"].as_f64(), Some(1000.0));
        assert_eq!(json["allocations"][0]["discountAmount"].as_f64(), Some(100.0));
        assert!(json["allocations"][0].get("writeOffAmount").is_none());
        assert_eq!(json["payments"][0]["method"], Value::from("BANK"));
        assert!(json.get("writeOffAccountId").is_none());
    }

    #[test]
    fn unready_draft_does_not_build() {
        let draft = SettlementDraft::open(Counterparty::Dealer(5), date());
        match draft.build_request() {
            Err(DraftError::NotReady(reasons)) => {
                assert!(reasons.contains(&BlockingReason::NothingApplied));
                assert!(reasons.contains(&BlockingReason::MissingCashAccount));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn request_reuses_draft_idempotency_key() {
        let draft = dealer_draft();
        let request = draft.build_request().unwrap();
        assert_eq!(request.idempotency_key(), draft.idempotency_key);
        assert_eq!(request.counterparty_kind(), "dealer");
    }
}

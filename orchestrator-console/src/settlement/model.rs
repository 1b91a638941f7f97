//! Draft line types and the enums the settlement form edits.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::DraftError;

/// Who the settlement clears a balance with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Counterparty {
    /// Accounts receivable, settled against dealer invoices.
    Dealer(i64),
    /// Accounts payable, settled against purchases.
    Supplier(i64),
}

impl Counterparty {
    pub fn id(&self) -> i64 {
        match self {
            Self::Dealer(id) | Self::Supplier(id) => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Dealer(_) => "dealer",
            Self::Supplier(_) => "supplier",
        }
    }

    pub fn is_dealer(&self) -> bool {
        matches!(self, Self::Dealer(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    #[default]
    Single,
    Split,
}

impl FromStr for PaymentMode {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "split" => Ok(Self::Split),
            other => Err(DraftError::InvalidValue {
                field: "paymentMode",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Bank,
    Cheque,
    Card,
    Other,
}

impl FromStr for PaymentMethod {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CASH" => Ok(Self::Cash),
            "BANK" => Ok(Self::Bank),
            "CHEQUE" => Ok(Self::Cheque),
            "CARD" => Ok(Self::Card),
            "OTHER" => Ok(Self::Other),
            other => Err(DraftError::InvalidValue {
                field: "method",
                value: other.to_string(),
            }),
        }
    }
}

/// One row of the allocation grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationLine {
    pub invoice_id: Option<i64>,
    pub purchase_id: Option<i64>,
    pub applied_amount: Decimal,
    pub discount_amount: Decimal,
    pub write_off_amount: Decimal,
    /// Positive is an FX gain, negative an FX loss.
    pub fx_adjustment: Decimal,
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AllocationField {
    InvoiceId,
    PurchaseId,
    AppliedAmount,
    DiscountAmount,
    WriteOffAmount,
    FxAdjustment,
    /// Stored exactly as typed, surrounding whitespace included.
    Memo,
}

/// One tender in split-payment mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLine {
    /// Cash/bank GL account; 0 while unselected.
    pub account_id: i64,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference_number: Option<String>,
    pub memo: Option<String>,
}

impl PaymentLine {
    /// Complete lines are the only ones sent to the backend.
    pub fn is_complete(&self) -> bool {
        self.account_id > 0 && self.amount > Decimal::ZERO
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentField {
    AccountId,
    Amount,
    Method,
    ReferenceNumber,
    Memo,
}

/// Header-level fields of the settlement form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HeaderField {
    PaymentMode,
    CashAccountId,
    PaymentMethod,
    DiscountAccountId,
    WriteOffAccountId,
    FxGainAccountId,
    FxLossAccountId,
    SettlementDate,
    ReferenceNumber,
    Memo,
    AdminOverride,
}

/// Aggregates across all allocation lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftTotals {
    pub applied: Decimal,
    pub discount: Decimal,
    pub write_off: Decimal,
    pub fx: Decimal,
}

impl DraftTotals {
    /// Cash actually changing hands after non-cash adjustments.
    pub fn net_cash_required(&self) -> Decimal {
        let gain = self.fx.max(Decimal::ZERO);
        let loss = (-self.fx).max(Decimal::ZERO);
        self.applied + gain - loss - self.discount - self.write_off
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(applied: i64, discount: i64, write_off: i64, fx: i64) -> DraftTotals {
        DraftTotals {
            applied: Decimal::from(applied),
            discount: Decimal::from(discount),
            write_off: Decimal::from(write_off),
            fx: Decimal::from(fx),
        }
    }

    #[test]
    fn net_cash_nets_out_discount_and_write_off() {
        assert_eq!(totals(1000, 100, 50, 0).net_cash_required(), Decimal::from(850));
    }

    #[test]
    fn fx_gain_adds_and_loss_subtracts() {
        assert_eq!(totals(1000, 0, 0, 200).net_cash_required(), Decimal::from(1200));
        assert_eq!(totals(1000, 0, 0, -200).net_cash_required(), Decimal::from(800));
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("Split".parse::<PaymentMode>().unwrap(), PaymentMode::Split);
        assert_eq!("cheque".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cheque);
        assert!("wire".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn counterparty_serializes_tagged() {
        let json = serde_json::to_value(Counterparty::Dealer(7)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "dealer", "id": 7}));
    }
}

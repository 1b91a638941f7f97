//! Summary DTOs returned by the ERP backend.
//!
//! Only the fields the console reads are modelled; anything else in the
//! backend payload is ignored.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// General-ledger account offered in the cash/discount/write-off/FX pickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: i64,
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    #[serde(default, rename = "type")]
    pub account_type: Option<String>,
    #[serde(default)]
    pub balance: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealerInvoice {
    pub id: i64,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub total_amount: Decimal,
    #[serde(default)]
    pub outstanding_amount: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierPurchase {
    pub id: i64,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub invoice_date: Option<NaiveDate>,
    #[serde(default)]
    pub total_amount: Decimal,
    #[serde(default)]
    pub outstanding_amount: Option<Decimal>,
}

/// Dealer or supplier as listed in the counterparty pickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub outstanding_balance: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntrySummary {
    pub id: i64,
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub entry_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Posted settlement as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
    #[serde(default)]
    pub journal_entry: Option<JournalEntrySummary>,
    #[serde(default)]
    pub total_applied: Option<Decimal>,
    #[serde(default)]
    pub total_discount: Option<Decimal>,
    #[serde(default)]
    pub total_write_off: Option<Decimal>,
    #[serde(default)]
    pub total_fx_gain: Option<Decimal>,
    #[serde(default)]
    pub total_fx_loss: Option<Decimal>,
    #[serde(default)]
    pub cash_amount: Option<Decimal>,
}

/// Tokens issued by the backend login endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginTokens {
    #[serde(alias = "access_token")]
    pub access_token: String,
    #[serde(default, alias = "refresh_token")]
    pub refresh_token: Option<String>,
    #[serde(default, alias = "company_code")]
    pub company_code: Option<String>,
}

pub mod erp;
pub mod user;

pub use erp::{
    AccountSummary, DealerInvoice, JournalEntrySummary, LoginTokens, PartnerSummary,
    SettlementResponse, SupplierPurchase,
};
pub use user::{AuthUser, BackendSession, UserProfile};

pub mod backend_client;
pub mod draft_store;
pub mod metrics;

pub use backend_client::{BackendClient, BackendError};
pub use draft_store::{DraftStore, DraftTicket, SettlementLookups, StoreError, SubmitGuard};
pub use metrics::ConsoleMetrics;

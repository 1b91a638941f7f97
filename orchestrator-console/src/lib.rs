pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod settlement;
pub mod startup;
pub mod utils;

use console_core::observability::MetricsRegistry;
use services::{BackendClient, ConsoleMetrics, DraftStore};
use std::sync::Arc;

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<BackendClient>,
    pub drafts: Arc<DraftStore>,
    pub metrics: MetricsRegistry,
    pub console_metrics: ConsoleMetrics,
}

impl AppState {
    pub fn new(
        backend: Arc<BackendClient>,
        metrics: MetricsRegistry,
        console_metrics: ConsoleMetrics,
    ) -> Self {
        Self {
            backend,
            drafts: Arc::new(DraftStore::new()),
            metrics,
            console_metrics,
        }
    }
}

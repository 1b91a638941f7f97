use console_core::observability::MetricsRegistry;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

/// Console-specific collectors, registered alongside the HTTP metrics.
#[derive(Clone)]
pub struct ConsoleMetrics {
    submissions_total: IntCounterVec,
    backend_request_duration_seconds: HistogramVec,
    stale_loads_total: IntCounter,
}

impl ConsoleMetrics {
    pub fn register(registry: &MetricsRegistry) -> Result<Self, prometheus::Error> {
        let submissions_total = registry.register(IntCounterVec::new(
            Opts::new(
                "console_submissions_total",
                "Settlement and debit note submissions by form and outcome",
            ),
            &["form", "outcome"],
        )?)?;

        let backend_request_duration_seconds = registry.register(HistogramVec::new(
            HistogramOpts::new(
                "console_backend_request_duration_seconds",
                "Latency of calls to the ERP backend",
            ),
            &["operation", "outcome"],
        )?)?;

        let stale_loads_total = registry.register(IntCounter::new(
            "console_stale_loads_total",
            "Lookup responses discarded because a newer draft was opened",
        )?)?;

        Ok(Self {
            submissions_total,
            backend_request_duration_seconds,
            stale_loads_total,
        })
    }

    pub fn record_submission(&self, form: &str, outcome: &str) {
        self.submissions_total
            .with_label_values(&[form, outcome])
            .inc();
    }

    pub fn observe_backend(&self, operation: &str, outcome: &str, seconds: f64) {
        self.backend_request_duration_seconds
            .with_label_values(&[operation, outcome])
            .observe(seconds);
    }

    pub fn record_stale_load(&self) {
        self.stale_loads_total.inc();
    }
}

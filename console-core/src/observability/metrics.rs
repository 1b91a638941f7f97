use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
    core::Collector,
};

/// Prometheus registry shared by the HTTP middleware and service-specific
/// collectors.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method", "path", "status"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Register an additional collector and hand it back for recording.
    pub fn register<C>(&self, collector: C) -> Result<C, prometheus::Error>
    where
        C: Collector + Clone + 'static,
    {
        self.registry.register(Box::new(collector.clone()))?;
        Ok(collector)
    }

    pub fn observe_http(&self, method: &str, path: &str, status: &str, seconds: f64) {
        let labels = [method, path, status];
        self.http_requests_total.with_label_values(&labels).inc();
        self.http_request_duration_seconds
            .with_label_values(&labels)
            .observe(seconds);
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_observed_requests() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics.observe_http("GET", "/health", "200", 0.002);

        let body = metrics.render().unwrap();
        assert!(body.contains("http_requests_total"));
        assert!(body.contains("path=\"/health\""));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let metrics = MetricsRegistry::new().unwrap();
        let counter = IntCounterVec::new(Opts::new("http_requests_total", "dup"), &["x"]).unwrap();
        assert!(metrics.register(counter).is_err());
    }
}

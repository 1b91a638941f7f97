//! W3C Trace Context propagation for calls to the ERP backend.
//!
//! See: https://www.w3.org/TR/trace-context/

use opentelemetry::trace::TraceContextExt;
use reqwest::header::HeaderMap;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Header name for W3C traceparent
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Header name for W3C tracestate
pub const TRACESTATE_HEADER: &str = "tracestate";

/// Header name for request correlation ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Inject the current span's trace context as traceparent/tracestate headers.
///
/// Leaves `headers` untouched when there is no valid OpenTelemetry context,
/// which is the case when OTLP export is disabled.
pub fn inject_trace_context(headers: &mut HeaderMap) {
    let context = Span::current().context();
    let otel_span = context.span();
    let span_context = otel_span.span_context();

    if !span_context.is_valid() {
        return;
    }

    let traceparent = format!(
        "00-{}-{}-{:02x}",
        span_context.trace_id(),
        span_context.span_id(),
        span_context.trace_flags().to_u8()
    );
    if let Ok(value) = traceparent.parse() {
        headers.insert(TRACEPARENT_HEADER, value);
    }

    let tracestate = span_context.trace_state().header();
    if !tracestate.is_empty() {
        if let Ok(value) = tracestate.parse() {
            headers.insert(TRACESTATE_HEADER, value);
        }
    }
}

/// Extension trait that decorates an outbound request with correlation headers.
pub trait TracedRequestExt {
    /// Attach trace context and, when known, the inbound request id.
    fn traced(self, request_id: Option<&str>) -> Self;
}

impl TracedRequestExt for reqwest::RequestBuilder {
    fn traced(self, request_id: Option<&str>) -> Self {
        let mut headers = HeaderMap::new();
        inject_trace_context(&mut headers);

        if let Some(id) = request_id {
            if let Ok(value) = id.parse() {
                headers.insert(REQUEST_ID_HEADER, value);
            }
        }

        self.headers(headers)
    }
}

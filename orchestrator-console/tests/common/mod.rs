#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use console_core::observability::MetricsRegistry;
use orchestrator_console::config::{BackendSettings, SessionSettings};
use orchestrator_console::services::{BackendClient, ConsoleMetrics};
use orchestrator_console::startup::build_router;
use orchestrator_console::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_USER_ID: &str = "accountant-1";
pub const TEST_EMAIL: &str = "accountant@bbp.example";
pub const TEST_COMPANY: &str = "BBP";

pub struct TestApp {
    pub router: Router,
    pub backend: MockServer,
    pub cookie: Option<String>,
}

/// Unsigned token carrying the claims the console reads.
pub fn test_token() -> String {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = json!({
        "sub": TEST_USER_ID,
        "email": TEST_EMAIL,
        "companyCode": TEST_COMPANY,
    });
    let body = general_purpose::URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, body)
}

/// Wrap a payload the way the ERP backend does.
pub fn envelope(data: Value) -> Value {
    json!({"success": true, "message": "OK", "data": data})
}

impl TestApp {
    pub async fn spawn() -> Self {
        let backend = MockServer::start().await;

        let settings = BackendSettings {
            base_url: backend.uri(),
            timeout_seconds: 5,
            default_company_code: None,
            open_invoice_status: "ISSUED".to_string(),
        };

        let registry = MetricsRegistry::new().expect("Failed to create metrics registry");
        let console_metrics =
            ConsoleMetrics::register(&registry).expect("Failed to register console metrics");
        let client = BackendClient::new(settings, console_metrics.clone())
            .expect("Failed to build backend client");

        let state = AppState::new(Arc::new(client), registry, console_metrics);
        let router = build_router(state, &SessionSettings::default());

        Self {
            router,
            backend,
            cookie: None,
        }
    }

    /// Spawn and log in against a mocked backend.
    pub async fn spawn_logged_in() -> Self {
        let mut app = Self::spawn().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
                "accessToken": test_token(),
                "refreshToken": "refresh-token",
            }))))
            .mount(&app.backend)
            .await;

        let (status, _) = app
            .send(
                Method::POST,
                "/api/auth/login",
                Some(json!({"email": TEST_EMAIL, "password": "secret"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(app.cookie.is_some(), "login did not set a session cookie");

        app
    }

    /// Mount account and counterparty lookups for a draft open.
    pub async fn mount_lookups(&self) {
        Mock::given(method("GET"))
            .and(path("/api/v1/accounting/accounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([
                {"id": 11, "code": "1000", "name": "Cash in Hand", "type": "ASSET"},
                {"id": 12, "code": "1010", "name": "HDFC Current", "type": "ASSET"},
                {"id": 40, "code": "5100", "name": "Discount Allowed", "type": "EXPENSE"}
            ]))))
            .mount(&self.backend)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/invoices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([
                {"id": 301, "invoiceNumber": "INV-301", "status": "ISSUED", "totalAmount": 1180.0, "outstandingAmount": 1180.0}
            ]))))
            .mount(&self.backend)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/purchasing/raw-material-purchases"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([
                {"id": 42, "invoiceNumber": "PUR-42", "status": "POSTED", "totalAmount": 2500.0}
            ]))))
            .mount(&self.backend)
            .await;
    }

    pub async fn send(
        &mut self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let value = set_cookie.to_str().expect("Non-ASCII cookie");
            let pair = value.split(';').next().unwrap_or_default().to_string();
            self.cookie = Some(pair);
        }

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, json)
    }

    pub async fn patch_field(&mut self, uri: &str, field: &str, value: Value) -> Value {
        let (status, body) = self
            .send(Method::PATCH, uri, Some(json!({"field": field, "value": value})))
            .await;
        assert_eq!(status, StatusCode::OK, "edit {} failed: {}", field, body);
        body
    }

    /// Bodies the backend received on `path`, in arrival order.
    pub async fn received_bodies(&self, on_path: &str) -> Vec<Value> {
        self.backend
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == on_path)
            .map(|r| serde_json::from_slice(&r.body).unwrap_or(Value::Null))
            .collect()
    }
}

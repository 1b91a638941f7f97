mod common;

use common::{envelope, test_token};
use console_core::observability::MetricsRegistry;
use orchestrator_console::config::BackendSettings;
use orchestrator_console::models::BackendSession;
use orchestrator_console::services::{BackendClient, BackendError, ConsoleMetrics};
use secrecy::Secret;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> BackendClient {
    let settings = BackendSettings {
        base_url: format!("{}/", server.uri()),
        timeout_seconds: 5,
        default_company_code: Some("BBP".to_string()),
        open_invoice_status: "ISSUED".to_string(),
    };
    let registry = MetricsRegistry::new().unwrap();
    let metrics = ConsoleMetrics::register(&registry).unwrap();
    BackendClient::new(settings, metrics).unwrap()
}

fn session() -> BackendSession {
    BackendSession {
        access_token: Secret::new("token-abc".to_string()),
        company_code: Some("BBP".to_string()),
    }
}

#[tokio::test]
async fn login_sends_default_company_and_unwraps_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(body_partial_json(json!({"email": "a@b.example", "companyCode": "BBP"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(json!({"accessToken": test_token()}))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tokens = client_for(&server)
        .login("a@b.example", "pw", None, Some("req-1"))
        .await
        .unwrap();

    assert_eq!(tokens.access_token, test_token());
}

#[tokio::test]
async fn invoice_lookup_sends_bearer_status_and_request_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/invoices"))
        .and(query_param("dealerId", "7"))
        .and(query_param("status", "ISSUED"))
        .and(header("Authorization", "Bearer token-abc"))
        .and(header("x-request-id", "req-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 301, "totalAmount": 100.5}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let invoices = client_for(&server)
        .list_dealer_invoices(&session(), 7, Some("req-2"))
        .await
        .unwrap();

    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].id, 301);
}

#[tokio::test]
async fn rejection_prefers_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/dealers"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"message": "Company BBP is locked"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .list_dealers(&session(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::Rejected { status: 403, .. }));
    assert_eq!(err.user_message(), "Company BBP is locked");
}

#[tokio::test]
async fn unsuccessful_envelope_on_ok_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/suppliers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false, "message": "Supplier module disabled", "data": null
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .list_suppliers(&session(), None)
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "Supplier module disabled");
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let settings = BackendSettings {
        // Nothing listens on the discard port.
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_seconds: 2,
        default_company_code: None,
        open_invoice_status: "ISSUED".to_string(),
    };
    let registry = MetricsRegistry::new().unwrap();
    let metrics = ConsoleMetrics::register(&registry).unwrap();
    let client = BackendClient::new(settings, metrics).unwrap();

    let err = client.list_accounts(&session(), None).await.unwrap_err();

    assert!(matches!(err, BackendError::Transport(_)));
    assert_eq!(err.user_message(), "Unable to reach the accounting service");
}

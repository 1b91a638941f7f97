//! Typed REST transport to the Orchestrator ERP backend.
//!
//! Every call takes the caller's [`BackendSession`] explicitly. Responses may
//! arrive wrapped in an `{success, message, data}` envelope; the client
//! unwraps `data` and turns `success: false` into an error.

use crate::config::BackendSettings;
use crate::models::{
    AccountSummary, BackendSession, DealerInvoice, JournalEntrySummary, LoginTokens,
    PartnerSummary, SettlementResponse, SupplierPurchase,
};
use crate::services::metrics::ConsoleMetrics;
use crate::settlement::{DealerSettlementRequest, DebitNoteRequest, SupplierSettlementRequest};
use console_core::error::AppError;
use console_core::observability::TracedRequestExt;
use reqwest::{Client, RequestBuilder};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const COMPANY_HEADER: &str = "X-Company-Code";
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Shown when the backend rejects a call without saying why.
pub const GENERIC_FAILURE_MESSAGE: &str = "The request could not be completed. Please try again.";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Unable to reach the accounting service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response from the accounting service: {0}")]
    Decode(String),
}

impl BackendError {
    /// Human-readable text for the form's error banner.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Rejected { message, .. } => message.clone(),
            BackendError::Transport(_) => "Unable to reach the accounting service".to_string(),
            BackendError::Decode(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err.status() {
            Some(401) => AppError::Unauthorized(anyhow::anyhow!(
                "Session expired, please log in again"
            )),
            _ => AppError::BadGateway(err.user_message()),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginPayload<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    company_code: Option<&'a str>,
}

pub struct BackendClient {
    client: Client,
    settings: BackendSettings,
    metrics: ConsoleMetrics,
}

impl BackendClient {
    pub fn new(settings: BackendSettings, metrics: ConsoleMetrics) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build backend HTTP client: {}", e))?;

        Ok(Self {
            client,
            settings,
            metrics,
        })
    }

    pub fn base_url(&self) -> &str {
        self.settings.base_url.trim_end_matches('/')
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    fn authorized(&self, builder: RequestBuilder, session: &BackendSession) -> RequestBuilder {
        let builder = builder.bearer_auth(session.access_token.expose_secret());
        match &session.company_code {
            Some(code) => builder.header(COMPANY_HEADER, code),
            None => builder,
        }
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        company_code: Option<&str>,
        request_id: Option<&str>,
    ) -> Result<LoginTokens, BackendError> {
        let payload = LoginPayload {
            email,
            password,
            company_code: company_code.or(self.settings.default_company_code.as_deref()),
        };
        let request = self.client.post(self.url("/api/v1/auth/login")).json(&payload);
        self.send("login", request, request_id).await
    }

    pub async fn list_accounts(
        &self,
        session: &BackendSession,
        request_id: Option<&str>,
    ) -> Result<Vec<AccountSummary>, BackendError> {
        let request = self.authorized(
            self.client.get(self.url("/api/v1/accounting/accounts")),
            session,
        );
        self.send("list_accounts", request, request_id).await
    }

    pub async fn list_dealer_invoices(
        &self,
        session: &BackendSession,
        dealer_id: i64,
        request_id: Option<&str>,
    ) -> Result<Vec<DealerInvoice>, BackendError> {
        let request = self
            .authorized(self.client.get(self.url("/api/v1/invoices")), session)
            .query(&[
                ("dealerId", dealer_id.to_string()),
                ("status", self.settings.open_invoice_status.clone()),
            ]);
        self.send("list_dealer_invoices", request, request_id).await
    }

    pub async fn list_supplier_purchases(
        &self,
        session: &BackendSession,
        supplier_id: i64,
        request_id: Option<&str>,
    ) -> Result<Vec<SupplierPurchase>, BackendError> {
        let request = self
            .authorized(
                self.client
                    .get(self.url("/api/v1/purchasing/raw-material-purchases")),
                session,
            )
            .query(&[("supplierId", supplier_id.to_string())]);
        self.send("list_supplier_purchases", request, request_id)
            .await
    }

    pub async fn list_dealers(
        &self,
        session: &BackendSession,
        request_id: Option<&str>,
    ) -> Result<Vec<PartnerSummary>, BackendError> {
        let request = self.authorized(self.client.get(self.url("/api/v1/dealers")), session);
        self.send("list_dealers", request, request_id).await
    }

    pub async fn list_suppliers(
        &self,
        session: &BackendSession,
        request_id: Option<&str>,
    ) -> Result<Vec<PartnerSummary>, BackendError> {
        let request = self.authorized(self.client.get(self.url("/api/v1/suppliers")), session);
        self.send("list_suppliers", request, request_id).await
    }

    pub async fn create_dealer_settlement(
        &self,
        session: &BackendSession,
        body: &DealerSettlementRequest,
        request_id: Option<&str>,
    ) -> Result<SettlementResponse, BackendError> {
        let request = self
            .authorized(
                self.client
                    .post(self.url("/api/v1/accounting/settlements/dealers")),
                session,
            )
            .header(IDEMPOTENCY_HEADER, &body.idempotency_key)
            .json(body);
        self.send("create_dealer_settlement", request, request_id)
            .await
    }

    pub async fn create_supplier_settlement(
        &self,
        session: &BackendSession,
        body: &SupplierSettlementRequest,
        request_id: Option<&str>,
    ) -> Result<SettlementResponse, BackendError> {
        let request = self
            .authorized(
                self.client
                    .post(self.url("/api/v1/accounting/settlements/suppliers")),
                session,
            )
            .header(IDEMPOTENCY_HEADER, &body.idempotency_key)
            .json(body);
        self.send("create_supplier_settlement", request, request_id)
            .await
    }

    pub async fn create_debit_note(
        &self,
        session: &BackendSession,
        body: &DebitNoteRequest,
        request_id: Option<&str>,
    ) -> Result<JournalEntrySummary, BackendError> {
        let request = self
            .authorized(
                self.client.post(self.url("/api/v1/accounting/debit-notes")),
                session,
            )
            .header(IDEMPOTENCY_HEADER, &body.idempotency_key)
            .json(body);
        self.send("create_debit_note", request, request_id).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        request_id: Option<&str>,
    ) -> Result<T, BackendError> {
        let start = Instant::now();
        let result = self.execute(operation, request.traced(request_id)).await;

        let outcome = if result.is_ok() { "ok" } else { "error" };
        self.metrics
            .observe_backend(operation, outcome, start.elapsed().as_secs_f64());

        result
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = request.send().await.map_err(|e| {
            tracing::error!(operation, error = %e, "Backend request failed to send");
            BackendError::Transport(e)
        })?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message =
                extract_message(&body).unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
            tracing::warn!(
                operation,
                status = status.as_u16(),
                message = %message,
                "Backend rejected request"
            );
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        decode_body(&body).map_err(|e| {
            if let BackendError::Decode(reason) = &e {
                tracing::error!(operation, reason = %reason, "Backend response did not decode");
            }
            e
        })
    }
}

/// Prefer the server's `message`, then `error`, when the body is JSON.
pub fn extract_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["message", "error"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|msg| !msg.is_empty())
        .map(str::to_string)
}

/// Decode a success body, unwrapping the `{success, message, data}` envelope.
pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, BackendError> {
    let value: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(body).map_err(|e| BackendError::Decode(e.to_string()))?
    };

    let payload = match value {
        Value::Object(mut map) if map.contains_key("success") => {
            if map.get("success").and_then(Value::as_bool) == Some(false) {
                let message = map
                    .get("message")
                    .and_then(Value::as_str)
                    .filter(|m| !m.trim().is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
                return Err(BackendError::Rejected {
                    status: 200,
                    message,
                });
            }
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };

    serde_json::from_value(payload).map_err(|e| BackendError::Decode(e.to_string()))
}

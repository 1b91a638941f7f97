use console_core::error::AppError;
use serde::Deserialize;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct BackendSettings {
    /// Base URL of the ERP REST API, e.g. http://orchestrator-erp:8081.
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Company used at login when the browser does not send one.
    #[serde(default)]
    pub default_company_code: Option<String>,
    /// Invoice status used to list settleable dealer invoices.
    #[serde(default = "default_open_invoice_status")]
    pub open_invoice_status: String,
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_open_invoice_status() -> String {
    "ISSUED".to_string()
}

#[derive(Deserialize, Clone, Debug)]
pub struct SessionSettings {
    /// Set to true in production with HTTPS.
    #[serde(default)]
    pub secure_cookie: bool,
    #[serde(default = "default_inactivity_hours")]
    pub inactivity_hours: i64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            secure_cookie: false,
            inactivity_hours: default_inactivity_hours(),
        }
    }
}

fn default_inactivity_hours() -> i64 {
    8
}

#[derive(Deserialize, Clone, Debug)]
pub struct TelemetrySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP gRPC endpoint; tracing stays local when unset.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn get_configuration() -> Result<Settings, AppError> {
    console_core::config::load_settings("orchestrator-console")
}

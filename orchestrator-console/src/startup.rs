use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Router,
};
use console_core::middleware::{metrics_middleware, request_id_middleware};
use console_core::observability::REQUEST_ID_HEADER;
use time::Duration;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::SessionSettings;
use crate::handlers::{
    app::health_check,
    auth::{login_handler, logout_handler},
    debit_note::{
        close_debit_note, edit_debit_note, get_debit_note, open_debit_note, submit_debit_note,
    },
    lookups::{list_accounts, list_dealers, list_suppliers},
    metrics::metrics,
    settlement::{
        add_allocation, add_payment, close_settlement, edit_allocation, edit_header, edit_payment,
        get_settlement, open_settlement, remove_allocation, remove_payment, submit_settlement,
    },
};
use crate::middleware::auth::require_session;
use crate::AppState;

pub fn build_router(state: AppState, session_settings: &SessionSettings) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(session_settings.secure_cookie)
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            session_settings.inactivity_hours,
        )));

    let protected = Router::new()
        .route("/api/accounts", get(list_accounts))
        .route("/api/dealers", get(list_dealers))
        .route("/api/suppliers", get(list_suppliers))
        .route(
            "/api/settlements/draft",
            post(open_settlement)
                .get(get_settlement)
                .patch(edit_header)
                .delete(close_settlement),
        )
        .route("/api/settlements/draft/allocations", post(add_allocation))
        .route(
            "/api/settlements/draft/allocations/:index",
            patch(edit_allocation).delete(remove_allocation),
        )
        .route("/api/settlements/draft/payments", post(add_payment))
        .route(
            "/api/settlements/draft/payments/:index",
            patch(edit_payment).delete(remove_payment),
        )
        .route("/api/settlements/draft/submit", post(submit_settlement))
        .route(
            "/api/debit-notes/draft",
            post(open_debit_note)
                .get(get_debit_note)
                .patch(edit_debit_note)
                .delete(close_debit_note),
        )
        .route("/api/debit-notes/draft/submit", post(submit_debit_note))
        .route_layer(from_fn(require_session));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/logout", post(logout_handler))
        .merge(protected)
        .layer(session_layer)
        .layer(from_fn_with_state(state.metrics.clone(), metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

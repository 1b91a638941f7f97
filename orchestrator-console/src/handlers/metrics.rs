use axum::{extract::State, http::header, response::IntoResponse};
use console_core::error::AppError;

use crate::AppState;

pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state.metrics.render()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

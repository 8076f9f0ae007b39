//! HTTP request handlers

use super::types::{ErrorResponse, WebhookResponse};
use super::AppState;
use crate::telegram::{normalize, Update};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Header Telegram sets to the `secret_token` given to `setWebhook`
const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/webhook", post(webhook))
        .route("/version", get(get_version))
        .with_state(state)
}

async fn health() -> &'static str {
    "Caption editor bot is running"
}

async fn get_version() -> &'static str {
    concat!("caption-editor ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Webhook
// ============================================================

async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<WebhookResponse>, AppError> {
    authorize(&headers, state.webhook_secret.as_deref())?;

    // Update kinds this bot cannot decode are acknowledged; an error would only
    // make Telegram redeliver them
    let update: Update = match serde_json::from_value(body) {
        Ok(update) => update,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring undecodable update");
            return Ok(Json(WebhookResponse { ok: true }));
        }
    };

    let Some(inbound) = normalize(&update) else {
        tracing::debug!(update_id = ?update.id, "Ignoring update");
        return Ok(Json(WebhookResponse { ok: true }));
    };

    // Acknowledge first so the client stops its loading indicator
    if let Some(callback_query_id) = &inbound.callback_query_id {
        if let Err(e) = state
            .runtime
            .delivery()
            .answer_callback_query(callback_query_id)
            .await
        {
            tracing::warn!(update_id = ?update.id, error = %e, "Failed to answer callback query");
        }
    }

    // Detached so a dropped connection cannot interrupt the event; failures
    // are reported to the user by the runtime
    let _handle = state.runtime.spawn_dispatch(inbound.event);
    Ok(Json(WebhookResponse { ok: true }))
}

fn authorize(headers: &HeaderMap, expected: Option<&str>) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if provided == Some(expected) {
        Ok(())
    } else {
        tracing::warn!("Rejected webhook call with missing or wrong secret");
        Err(AppError::Unauthorized)
    }
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "invalid webhook secret"),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

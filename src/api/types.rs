//! API response types

use serde::Serialize;

/// Body returned to Telegram for every accepted update
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub ok: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

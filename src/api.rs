//! HTTP API for the caption editor bot
//!
//! Telegram delivers updates to the webhook; everything else is health and
//! version checks.

mod handlers;
mod types;

pub use handlers::create_router;

use crate::runtime::ProductionRuntime;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ProductionRuntime>,
    /// Expected value of the webhook secret header, when configured
    pub webhook_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(runtime: ProductionRuntime, webhook_secret: Option<String>) -> Self {
        Self {
            runtime: Arc::new(runtime),
            webhook_secret: webhook_secret.map(Arc::from),
        }
    }
}

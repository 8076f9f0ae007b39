//! Caption editor - Telegram bot for editing media captions
//!
//! Users send a photo, video, document or audio file and edit its caption
//! through an inline keyboard. Each user's editing session is a small state
//! machine persisted in sqlite.

mod api;
mod config;
mod db;
mod runtime;
mod state_machine;
mod telegram;
mod watermark;

use api::{create_router, AppState};
use config::BotConfig;
use db::Database;
use runtime::{DatabaseStore, SessionRuntime};
use state_machine::KeyboardLayout;
use std::net::SocketAddr;
use telegram::TelegramClient;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use watermark::CommandRenderer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caption_editor=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = BotConfig::from_env()?;

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    if let Some(ttl) = config.session_ttl {
        let purged = db.purge_expired(ttl)?;
        if purged > 0 {
            tracing::info!(purged, "Removed expired sessions");
        }
    }

    let telegram = TelegramClient::new(&config.bot_token, &config.api_base)?;

    if let Some(url) = &config.webhook_url {
        telegram
            .set_webhook(url, config.webhook_secret.as_deref())
            .await?;
        tracing::info!(url = %url, "Webhook registered");
    } else {
        tracing::warn!("WEBHOOK_URL not set; assuming the webhook is registered elsewhere");
    }

    let runtime = SessionRuntime::new(
        DatabaseStore::new(db),
        telegram,
        CommandRenderer::new(&config.watermark_command),
        KeyboardLayout {
            link_row_width: config.link_row_width,
        },
    )
    .with_session_ttl(config.session_ttl);

    // Create application state
    let state = AppState::new(runtime, config.webhook_secret.clone());

    let app = create_router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Caption editor listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

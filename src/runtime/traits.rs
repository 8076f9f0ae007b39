//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the runtime with mock implementations.

use crate::state_machine::keyboard::{Keyboard, OutgoingMedia};
use crate::state_machine::{ChatId, MessageId, Session, UserId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use crate::db::StoredSession;

/// Message created by a successful send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: MessageId,
    /// Platform id of the media attached to the new message
    pub file_id: Option<String>,
}

/// Failure talking to the messaging platform
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Platform rejected the request: {0}")]
    Api(String),
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    #[error("Invalid URL {0}")]
    InvalidUrl(String),
}

/// Failure compositing a watermark
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to start renderer: {0}")]
    Spawn(String),
    #[error("Renderer exited with status {status}: {stderr}")]
    Failed { status: i32, stderr: String },
    #[error("Renderer produced no image")]
    EmptyOutput,
    #[error("Renderer timed out")]
    Timeout,
}

/// Durable session storage keyed by user
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the user's session, if one is open
    async fn load(&self, user_id: UserId) -> Result<Option<StoredSession>, String>;

    /// Insert or replace the user's session
    async fn save(&self, session: &Session) -> Result<(), String>;

    /// Remove the user's session; deleting a missing session is not an error
    async fn delete(&self, user_id: UserId) -> Result<(), String>;
}

/// Sends and edits messages on the messaging platform
#[async_trait]
pub trait MediaDelivery: Send + Sync {
    /// Send media with caption and keyboard as a new message
    async fn send(
        &self,
        chat_id: ChatId,
        media: &OutgoingMedia,
        caption: &str,
        keyboard: &Keyboard,
    ) -> Result<SentMessage, DeliveryError>;

    /// Replace caption and keyboard of an existing message
    async fn edit_caption(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        caption: &str,
        keyboard: &Keyboard,
    ) -> Result<(), DeliveryError>;

    /// Replace only the keyboard of an existing message
    async fn edit_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: &Keyboard,
    ) -> Result<(), DeliveryError>;

    /// Send a plain text notice
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), DeliveryError>;

    /// Fetch the bytes of stored media
    async fn download(&self, file_id: &str) -> Result<Vec<u8>, DeliveryError>;
}

/// Composites text over an image
#[async_trait]
pub trait WatermarkRenderer: Send + Sync {
    async fn render(&self, image: &[u8], text: &str) -> Result<Vec<u8>, RenderError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn load(&self, user_id: UserId) -> Result<Option<StoredSession>, String> {
        (**self).load(user_id).await
    }

    async fn save(&self, session: &Session) -> Result<(), String> {
        (**self).save(session).await
    }

    async fn delete(&self, user_id: UserId) -> Result<(), String> {
        (**self).delete(user_id).await
    }
}

#[async_trait]
impl<T: MediaDelivery + ?Sized> MediaDelivery for Arc<T> {
    async fn send(
        &self,
        chat_id: ChatId,
        media: &OutgoingMedia,
        caption: &str,
        keyboard: &Keyboard,
    ) -> Result<SentMessage, DeliveryError> {
        (**self).send(chat_id, media, caption, keyboard).await
    }

    async fn edit_caption(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        caption: &str,
        keyboard: &Keyboard,
    ) -> Result<(), DeliveryError> {
        (**self)
            .edit_caption(chat_id, message_id, caption, keyboard)
            .await
    }

    async fn edit_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: &Keyboard,
    ) -> Result<(), DeliveryError> {
        (**self).edit_keyboard(chat_id, message_id, keyboard).await
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), DeliveryError> {
        (**self).send_text(chat_id, text).await
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, DeliveryError> {
        (**self).download(file_id).await
    }
}

#[async_trait]
impl<T: WatermarkRenderer + ?Sized> WatermarkRenderer for Arc<T> {
    async fn render(&self, image: &[u8], text: &str) -> Result<Vec<u8>, RenderError> {
        (**self).render(image, text).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

use crate::db::{Database, DbError};

/// Adapter to use Database as a `SessionStore`
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for DatabaseStore {
    async fn load(&self, user_id: UserId) -> Result<Option<StoredSession>, String> {
        match self.db.get_session(user_id) {
            Ok(stored) => Ok(stored),
            // A row that no longer decodes can never be resumed
            Err(DbError::Serialization { source, .. }) => {
                tracing::warn!(user_id = %user_id, error = %source, "Discarding undecodable session");
                self.db.delete_session(user_id).map_err(|e| e.to_string())?;
                Ok(None)
            }
            Err(e) => Err(e.to_string()),
        }
    }

    async fn save(&self, session: &Session) -> Result<(), String> {
        self.db.save_session(session).map_err(|e| e.to_string())
    }

    async fn delete(&self, user_id: UserId) -> Result<(), String> {
        self.db.delete_session(user_id).map_err(|e| e.to_string())
    }
}

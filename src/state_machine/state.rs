//! Editing session types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;

// ============================================================================
// Identity
// ============================================================================

/// Platform user identity; one session per user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Chat the session renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

/// Identifier of a message the bot has sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Media
// ============================================================================

/// Kinds of media a session can edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Photo,
    Video,
    Document,
    Audio,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Photo => "photo",
            FileType::Video => "video",
            FileType::Document => "document",
            FileType::Audio => "audio",
        }
    }

    /// Only photos can carry a watermark
    pub fn supports_watermark(self) -> bool {
        matches!(self, FileType::Photo)
    }
}

/// Normalized inbound media: what ingress extracts from a platform message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub file_type: FileType,
    pub file_id: String,
    #[serde(default)]
    pub caption: String,
}

/// A user-defined link rendered as a URL button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

impl LinkButton {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

// ============================================================================
// Editing State
// ============================================================================

/// Stage of the editing workflow.
///
/// "No session" is not a variant: it is the absence of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditState {
    /// Menu shown, waiting for a button press
    #[default]
    AwaitingMainChoice,

    /// Waiting for the watermark text (photos only)
    AwaitingWatermarkText,

    /// Waiting for the fragment to style and the style marker
    AwaitingStyleSelection {
        /// Caption fragment captured from an earlier reply, awaiting a style
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selected_text: Option<String>,
    },
}

impl EditState {
    pub fn name(&self) -> &'static str {
        match self {
            EditState::AwaitingMainChoice => "awaiting_main_choice",
            EditState::AwaitingWatermarkText => "awaiting_watermark_text",
            EditState::AwaitingStyleSelection { .. } => "awaiting_style_selection",
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Durable per-user record of an in-progress edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub file_id: String,
    pub file_type: FileType,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub buttons: Vec<LinkButton>,
    /// Currently rendered message; `None` until the first send succeeds
    #[serde(default)]
    pub message_id: Option<MessageId>,
    #[serde(default)]
    pub state: EditState,
}

impl Session {
    pub fn new(user_id: UserId, chat_id: ChatId, media: MediaDescriptor) -> Self {
        Self {
            user_id,
            chat_id,
            file_id: media.file_id,
            file_type: media.file_type,
            caption: media.caption,
            buttons: Vec::new(),
            message_id: None,
            state: EditState::AwaitingMainChoice,
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: EditState) -> Self {
        self.state = state;
        self
    }
}

// ============================================================================
// Context
// ============================================================================

/// Layout constraints for rendered keyboards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyboardLayout {
    /// Maximum link buttons per row; `None` keeps all links on one row
    pub link_row_width: Option<NonZeroUsize>,
}

/// Immutable configuration for one dispatch
#[derive(Debug, Clone, Copy)]
pub struct EditorContext {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub layout: KeyboardLayout,
}

impl EditorContext {
    pub fn new(user_id: UserId, chat_id: ChatId, layout: KeyboardLayout) -> Self {
        Self {
            user_id,
            chat_id,
            layout,
        }
    }
}

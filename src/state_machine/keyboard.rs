//! Render-command builder
//!
//! Pure functions from a session snapshot to what should be shown. The
//! runtime hands the result to the media delivery collaborator.

use super::event::Action;
use super::state::{ChatId, FileType, KeyboardLayout, LinkButton, MessageId, Session};
use std::fmt;

/// What pressing a button does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonKind {
    /// Sends callback data back to the bot
    Callback(String),
    /// Opens a URL
    Url(String),
}

/// A single inline keyboard button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardButton {
    pub text: String,
    pub kind: ButtonKind,
}

impl KeyboardButton {
    pub fn callback(text: impl Into<String>, action: &Action) -> Self {
        Self {
            text: text.into(),
            kind: ButtonKind::Callback(action.callback_data().to_string()),
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: ButtonKind::Url(url.into()),
        }
    }
}

/// Inline keyboard as rows of buttons
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Keyboard {
    pub rows: Vec<Vec<KeyboardButton>>,
}

impl Keyboard {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }

    /// Every button, row by row
    pub fn buttons(&self) -> impl Iterator<Item = &KeyboardButton> {
        self.rows.iter().flatten()
    }
}

/// Media attached to a new message
#[derive(Clone, PartialEq, Eq)]
pub enum OutgoingMedia {
    /// Media already stored on the platform
    Existing { file_type: FileType, file_id: String },
    /// Freshly rendered bytes that must be uploaded
    Upload { file_type: FileType, bytes: Vec<u8> },
}

impl OutgoingMedia {
    pub fn file_type(&self) -> FileType {
        match self {
            OutgoingMedia::Existing { file_type, .. } | OutgoingMedia::Upload { file_type, .. } => {
                *file_type
            }
        }
    }

    #[cfg(test)]
    pub fn is_upload(&self) -> bool {
        matches!(self, OutgoingMedia::Upload { .. })
    }
}

impl fmt::Debug for OutgoingMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutgoingMedia::Existing { file_type, file_id } => f
                .debug_struct("Existing")
                .field("file_type", file_type)
                .field("file_id", file_id)
                .finish(),
            OutgoingMedia::Upload { file_type, bytes } => f
                .debug_struct("Upload")
                .field("file_type", file_type)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

/// Whether to create a new message or patch the existing one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaAction {
    Send { chat_id: ChatId, media: OutgoingMedia },
    EditCaption { chat_id: ChatId, message_id: MessageId },
}

/// Everything needed to show the current session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCommand {
    pub action: MediaAction,
    pub caption: String,
    pub keyboard: Keyboard,
}

// ============================================================================
// Builders
// ============================================================================

/// Static menu shown under every main-choice render
pub fn control_keyboard(file_type: FileType) -> Vec<Vec<KeyboardButton>> {
    let mut rows = vec![
        vec![KeyboardButton::callback("✏️ Edit Caption", &Action::EditCaptionMenu)],
        vec![KeyboardButton::callback("💅 Style Text", &Action::StyleMenu)],
        vec![KeyboardButton::callback("➕ Add URL Button", &Action::AddButton)],
    ];
    if file_type.supports_watermark() {
        rows.push(vec![KeyboardButton::callback(
            "💧 Add Watermark",
            &Action::AddWatermark,
        )]);
    }
    rows.push(vec![KeyboardButton::callback("🔖 Templates", &Action::TemplatesMenu)]);
    rows.push(vec![KeyboardButton::callback("✅ Done", &Action::Done)]);
    rows
}

/// User link buttons in insertion order
pub fn link_rows(buttons: &[LinkButton], layout: KeyboardLayout) -> Vec<Vec<KeyboardButton>> {
    if buttons.is_empty() {
        return Vec::new();
    }
    let to_button = |b: &LinkButton| KeyboardButton::url(&b.label, &b.url);
    match layout.link_row_width {
        Some(width) => buttons
            .chunks(width.get())
            .map(|chunk| chunk.iter().map(to_button).collect())
            .collect(),
        None => vec![buttons.iter().map(to_button).collect()],
    }
}

/// Link rows followed by the control menu
pub fn main_keyboard(session: &Session, layout: KeyboardLayout) -> Keyboard {
    let mut rows = link_rows(&session.buttons, layout);
    rows.extend(control_keyboard(session.file_type));
    Keyboard { rows }
}

/// Keyboard left on the message once editing is finished: links only
pub fn final_keyboard(session: &Session, layout: KeyboardLayout) -> Keyboard {
    Keyboard {
        rows: link_rows(&session.buttons, layout),
    }
}

/// Send a new message when none exists yet, otherwise edit caption and keyboard
pub fn render_command(session: &Session, layout: KeyboardLayout) -> RenderCommand {
    let action = match session.message_id {
        None => MediaAction::Send {
            chat_id: session.chat_id,
            media: OutgoingMedia::Existing {
                file_type: session.file_type,
                file_id: session.file_id.clone(),
            },
        },
        Some(message_id) => MediaAction::EditCaption {
            chat_id: session.chat_id,
            message_id,
        },
    };
    RenderCommand {
        action,
        caption: session.caption.clone(),
        keyboard: main_keyboard(session, layout),
    }
}

/// A watermarked photo always goes out as a brand-new message
pub fn watermark_command(session: &Session, image: Vec<u8>, layout: KeyboardLayout) -> RenderCommand {
    RenderCommand {
        action: MediaAction::Send {
            chat_id: session.chat_id,
            media: OutgoingMedia::Upload {
                file_type: session.file_type,
                bytes: image,
            },
        },
        caption: session.caption.clone(),
        keyboard: main_keyboard(session, layout),
    }
}

//! Events that drive an editing session

use super::state::{MediaDescriptor, MessageId};

/// Menu action carried by a button press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    EditCaptionMenu,
    StyleMenu,
    AddButton,
    AddWatermark,
    TemplatesMenu,
    Done,
    /// Callback data we don't recognise (stale keyboards, foreign buttons)
    Other(String),
}

impl Action {
    pub const EDIT_CAPTION_MENU: &'static str = "edit_caption_menu";
    pub const STYLE_MENU: &'static str = "style_menu";
    pub const ADD_BUTTON: &'static str = "add_button";
    pub const ADD_WATERMARK: &'static str = "add_watermark";
    pub const TEMPLATES_MENU: &'static str = "templates_menu";
    pub const DONE: &'static str = "done";

    /// Parse callback data from a control button
    pub fn parse(data: &str) -> Self {
        match data {
            Self::EDIT_CAPTION_MENU => Action::EditCaptionMenu,
            Self::STYLE_MENU => Action::StyleMenu,
            Self::ADD_BUTTON => Action::AddButton,
            Self::ADD_WATERMARK => Action::AddWatermark,
            Self::TEMPLATES_MENU => Action::TemplatesMenu,
            Self::DONE => Action::Done,
            other => Action::Other(other.to_string()),
        }
    }

    /// Callback data sent back by the platform when the button is pressed
    pub fn callback_data(&self) -> &str {
        match self {
            Action::EditCaptionMenu => Self::EDIT_CAPTION_MENU,
            Action::StyleMenu => Self::STYLE_MENU,
            Action::AddButton => Self::ADD_BUTTON,
            Action::AddWatermark => Self::ADD_WATERMARK,
            Action::TemplatesMenu => Self::TEMPLATES_MENU,
            Action::Done => Self::DONE,
            Action::Other(data) => data,
        }
    }
}

/// Events that trigger session transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // User events
    /// `/start` command
    Start,
    MediaReceived(MediaDescriptor),
    /// A message with media we can't edit (stickers, voice notes, ...)
    UnsupportedMedia,
    ButtonPressed(Action),
    TextReceived(String),

    // Watermark renderer events
    WatermarkRendered {
        image: Vec<u8>,
    },
    WatermarkFailed {
        message: String,
    },

    // Media delivery events
    Delivered {
        message_id: MessageId,
        /// Set when the send uploaded new media and the platform assigned it an id
        file_id: Option<String>,
    },
    DeliveryFailed {
        message: String,
    },
}

impl Event {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Start => "start",
            Event::MediaReceived(_) => "media_received",
            Event::UnsupportedMedia => "unsupported_media",
            Event::ButtonPressed(_) => "button_pressed",
            Event::TextReceived(_) => "text_received",
            Event::WatermarkRendered { .. } => "watermark_rendered",
            Event::WatermarkFailed { .. } => "watermark_failed",
            Event::Delivered { .. } => "delivered",
            Event::DeliveryFailed { .. } => "delivery_failed",
        }
    }
}

//! Effects produced by state transitions

use super::keyboard::{Keyboard, RenderCommand};
use super::state::MessageId;

/// Effects to be executed after a state transition.
///
/// Effects run in order. An effect that reports back (delivery, watermark
/// rendering) ends its batch: the remaining effects are dropped and the
/// generated event is transitioned next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Save the current session record
    PersistSession,

    /// Remove the session record
    DeleteSession,

    /// Send a plain text notice to the chat
    Reply { text: String },

    /// Send or edit the session message
    Render(RenderCommand),

    /// Replace only the keyboard of the final message
    FinalizeKeyboard {
        message_id: MessageId,
        keyboard: Keyboard,
    },

    /// Download the photo and composite the watermark text over it
    RenderWatermark { file_id: String, text: String },
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply { text: text.into() }
    }
}

//! Normalize Bot API updates into session events

use crate::runtime::InboundEvent;
use crate::state_machine::{Action, ChatId, Event, FileType, MediaDescriptor, UserId};
use teloxide::types::{CallbackQuery, Message, Update, UpdateKind, User};

/// A session event plus what the webhook must acknowledge
#[derive(Debug, Clone)]
pub struct Inbound {
    pub event: InboundEvent,
    /// Callback queries must be answered so the client stops its spinner
    pub callback_query_id: Option<String>,
}

/// Turn an update into a session event.
///
/// Returns `None` for updates the bot ignores: bot senders, commands other
/// than `/start`, and update kinds without a message or callback.
pub fn normalize(update: &Update) -> Option<Inbound> {
    match &update.kind {
        UpdateKind::Message(message) => from_message(message),
        UpdateKind::CallbackQuery(query) => from_callback(query),
        _ => None,
    }
}

/// Supported media attached to a message. Photos resolve to the largest size.
pub(crate) fn media_of(message: &Message) -> Option<(FileType, &str)> {
    if let Some(largest) = message
        .photo()
        .and_then(|sizes| sizes.iter().max_by_key(|s| u64::from(s.width) * u64::from(s.height)))
    {
        return Some((FileType::Photo, largest.file.id.as_str()));
    }
    if let Some(video) = message.video() {
        return Some((FileType::Video, video.file.id.as_str()));
    }
    if let Some(document) = message.document() {
        return Some((FileType::Document, document.file.id.as_str()));
    }
    message
        .audio()
        .map(|audio| (FileType::Audio, audio.file.id.as_str()))
}

fn user_id(user: &User) -> Option<UserId> {
    if user.is_bot {
        return None;
    }
    i64::try_from(user.id.0).ok().map(UserId)
}

fn from_callback(query: &CallbackQuery) -> Option<Inbound> {
    let user_id = user_id(&query.from)?;
    // Private chats share the user's id
    let chat_id = query
        .message
        .as_ref()
        .map_or(ChatId(user_id.0), |m| ChatId(m.chat().id.0));
    let action = Action::parse(query.data.as_deref().unwrap_or_default());

    Some(Inbound {
        event: InboundEvent::new(user_id, chat_id, Event::ButtonPressed(action)),
        callback_query_id: Some(query.id.clone()),
    })
}

fn from_message(message: &Message) -> Option<Inbound> {
    let user_id = user_id(message.from.as_ref()?)?;
    let chat_id = ChatId(message.chat.id.0);

    let event = if let Some((file_type, file_id)) = media_of(message) {
        Event::MediaReceived(MediaDescriptor {
            file_type,
            file_id: file_id.to_string(),
            caption: message.caption().unwrap_or_default().to_string(),
        })
    } else if let Some(text) = message.text() {
        match command_name(text) {
            Some("start") => Event::Start,
            Some(_) => return None,
            None => Event::TextReceived(text.to_string()),
        }
    } else {
        Event::UnsupportedMedia
    };

    Some(Inbound {
        event: InboundEvent::new(user_id, chat_id, event),
        callback_query_id: None,
    })
}

/// `/start@my_bot args` -> `start`
fn command_name(text: &str) -> Option<&str> {
    let command = text.strip_prefix('/')?.split_whitespace().next()?;
    Some(command.split('@').next().unwrap_or(command))
}

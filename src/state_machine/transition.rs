//! Pure state transition function
//!
//! Every (state, event) pair is matched explicitly. Combinations without a
//! dedicated rule re-render the session unchanged.

use super::event::Action;
use super::keyboard::{final_keyboard, render_command, watermark_command};
use super::state::{EditState, EditorContext, MessageId, Session};
use super::style::{apply_style, find_in_text, strip_markup, Style};
use super::{Effect, Event};
use thiserror::Error;

pub const GREETING: &str = "👋 Welcome to the Caption Editor!\n\n\
    Send me a photo, video, document, or audio file to get started. \
    I'll help you edit its caption, style the text, and attach link buttons.";
pub const PROMPT_WATERMARK: &str = "Send the text to use as the watermark.";
pub const PROMPT_STYLE: &str =
    "Copy the part of the caption you want to style and send it to me.";
pub const PROMPT_STYLE_CHOICE: &str = "Reply with <b> for bold or <i> for italic.";
pub const FRAGMENT_NOT_FOUND: &str = "That text is not part of the caption.";
pub const WATERMARK_PENDING: &str = "Applying the watermark, please wait...";
pub const WATERMARK_FAILED: &str = "Something went wrong while applying the watermark.";
pub const WATERMARK_UNSUPPORTED: &str = "Watermarks can only be applied to photos.";
pub const FINISHED: &str = "All done!";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    /// Session after the transition; `None` once it is closed
    pub session: Option<Session>,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            session,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Events rejected without touching the session; the message goes to the user
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Sorry, I can only process photos, videos, documents, or audio files.")]
    UnsupportedMedia,
    #[error("You are already editing a file. Please finish that session with ✅ Done first.")]
    SessionConflict,
    #[error("This editing session has expired. Please send a new file.")]
    SessionExpired,
}

/// Pure transition function: same inputs, same outputs, no I/O
pub fn transition(
    session: Option<&Session>,
    context: &EditorContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (session, event) {
        (current, Event::Start) => {
            Ok(TransitionResult::new(current.cloned()).with_effect(Effect::reply(GREETING)))
        }

        // ============================================================
        // Uploads
        // ============================================================
        (None, Event::MediaReceived(media)) => {
            let created = Session::new(context.user_id, context.chat_id, media);
            let render = render_command(&created, context.layout);
            Ok(TransitionResult::new(Some(created))
                .with_effect(Effect::PersistSession)
                .with_effect(Effect::Render(render)))
        }

        (None, Event::UnsupportedMedia) => Err(TransitionError::UnsupportedMedia),

        (Some(_), Event::MediaReceived(_) | Event::UnsupportedMedia) => {
            Err(TransitionError::SessionConflict)
        }

        (None, Event::ButtonPressed(_) | Event::TextReceived(_)) => {
            Err(TransitionError::SessionExpired)
        }

        // ============================================================
        // User input
        // ============================================================
        (Some(current), Event::ButtonPressed(action)) => Ok(on_button(current, context, &action)),

        (Some(current), Event::TextReceived(text)) => Ok(on_text(current, context, &text)),

        // ============================================================
        // Watermark results
        // ============================================================
        (Some(current), Event::WatermarkRendered { image })
            if current.state == EditState::AwaitingWatermarkText =>
        {
            let next = current.clone().with_state(EditState::AwaitingMainChoice);
            let render = watermark_command(&next, image, context.layout);
            Ok(TransitionResult::new(Some(next))
                .with_effect(Effect::PersistSession)
                .with_effect(Effect::Render(render)))
        }

        (Some(current), Event::WatermarkFailed { .. })
            if current.state == EditState::AwaitingWatermarkText =>
        {
            Ok(back_to_main(current, context, Some(WATERMARK_FAILED)))
        }

        (Some(current), Event::WatermarkRendered { .. } | Event::WatermarkFailed { .. }) => {
            Ok(rerender(current, context))
        }

        // ============================================================
        // Delivery results
        // ============================================================
        (Some(current), Event::Delivered { message_id, file_id }) => {
            Ok(on_delivered(current, message_id, file_id))
        }

        (_, Event::DeliveryFailed { message }) => Ok(TransitionResult::new(None)
            .with_effect(Effect::DeleteSession)
            .with_effect(Effect::reply(format!(
                "An error occurred: {message}\nPlease send the file again."
            )))),

        // Feedback for a session that no longer exists
        (
            None,
            Event::Delivered { .. } | Event::WatermarkRendered { .. } | Event::WatermarkFailed { .. },
        ) => Ok(TransitionResult::new(None)),
    }
}

fn on_button(current: &Session, context: &EditorContext, action: &Action) -> TransitionResult {
    if current.state != EditState::AwaitingMainChoice {
        return rerender(current, context);
    }

    match action {
        Action::AddWatermark if current.file_type.supports_watermark() => {
            let next = current.clone().with_state(EditState::AwaitingWatermarkText);
            TransitionResult::new(Some(next))
                .with_effect(Effect::PersistSession)
                .with_effect(Effect::reply(PROMPT_WATERMARK))
        }

        Action::StyleMenu => {
            let next = current
                .clone()
                .with_state(EditState::AwaitingStyleSelection { selected_text: None });
            TransitionResult::new(Some(next))
                .with_effect(Effect::PersistSession)
                .with_effect(Effect::reply(PROMPT_STYLE))
        }

        Action::Done => {
            let finalize = current.message_id.map(|message_id| Effect::FinalizeKeyboard {
                message_id,
                keyboard: final_keyboard(current, context.layout),
            });
            TransitionResult::new(None)
                .with_effects(finalize)
                .with_effect(Effect::DeleteSession)
                .with_effect(Effect::reply(FINISHED))
        }

        // Caption editing, link buttons and templates have no sub-flow here
        Action::AddWatermark
        | Action::EditCaptionMenu
        | Action::AddButton
        | Action::TemplatesMenu
        | Action::Other(_) => rerender(current, context),
    }
}

fn on_text(current: &Session, context: &EditorContext, text: &str) -> TransitionResult {
    match &current.state {
        EditState::AwaitingMainChoice => rerender(current, context),

        EditState::AwaitingWatermarkText if current.file_type.supports_watermark() => {
            TransitionResult::new(Some(current.clone()))
                .with_effect(Effect::reply(WATERMARK_PENDING))
                .with_effect(Effect::RenderWatermark {
                    file_id: current.file_id.clone(),
                    text: text.to_string(),
                })
        }

        EditState::AwaitingWatermarkText => {
            back_to_main(current, context, Some(WATERMARK_UNSUPPORTED))
        }

        EditState::AwaitingStyleSelection { selected_text } => {
            on_style_text(current, context, selected_text.as_deref(), text)
        }
    }
}

fn on_style_text(
    current: &Session,
    context: &EditorContext,
    selected: Option<&str>,
    text: &str,
) -> TransitionResult {
    match (selected, Style::detect(text)) {
        // Style choice for a captured fragment
        (Some(fragment), Some(style)) => styled(current, context, fragment, style),

        // No recognised marker: caption stays as it is
        (Some(_), None) => back_to_main(current, context, None),

        // Fragment and marker in one reply, e.g. "<b>hello</b>"
        (None, Some(style)) => styled(current, context, &strip_markup(text), style),

        // Plain fragment: remember it and ask for the style
        (None, None) => {
            let fragment = text.trim();
            if find_in_text(&current.caption, fragment).is_none() {
                return back_to_main(current, context, Some(FRAGMENT_NOT_FOUND));
            }
            let next = current.clone().with_state(EditState::AwaitingStyleSelection {
                selected_text: Some(fragment.to_string()),
            });
            TransitionResult::new(Some(next))
                .with_effect(Effect::PersistSession)
                .with_effect(Effect::reply(PROMPT_STYLE_CHOICE))
        }
    }
}

fn styled(current: &Session, context: &EditorContext, fragment: &str, style: Style) -> TransitionResult {
    match apply_style(&current.caption, fragment, style) {
        Some(caption) => {
            let mut next = current.clone();
            next.caption = caption;
            back_to_main(&next, context, None)
        }
        None => back_to_main(current, context, Some(FRAGMENT_NOT_FOUND)),
    }
}

fn on_delivered(current: &Session, message_id: MessageId, file_id: Option<String>) -> TransitionResult {
    let mut next = current.clone();
    next.message_id = Some(message_id);
    if let Some(file_id) = file_id {
        next.file_id = file_id;
    }

    if &next == current {
        TransitionResult::new(Some(next))
    } else {
        TransitionResult::new(Some(next)).with_effect(Effect::PersistSession)
    }
}

/// Return to the main menu, optionally with a notice, then save and render
fn back_to_main(current: &Session, context: &EditorContext, notice: Option<&str>) -> TransitionResult {
    let next = current.clone().with_state(EditState::AwaitingMainChoice);
    let render = render_command(&next, context.layout);
    TransitionResult::new(Some(next))
        .with_effects(notice.map(Effect::reply))
        .with_effect(Effect::PersistSession)
        .with_effect(Effect::Render(render))
}

/// Show the session again without changing it
fn rerender(current: &Session, context: &EditorContext) -> TransitionResult {
    TransitionResult::new(Some(current.clone()))
        .with_effect(Effect::Render(render_command(current, context.layout)))
}

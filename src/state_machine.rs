//! Editing session state machine
//!
//! Elm-style: a pure `transition` turns (session, event) into the next
//! session plus a list of effects for the runtime to execute.

mod effect;
pub mod event;
pub mod keyboard;
pub mod state;
pub mod style;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{Action, Event};
pub use state::{
    ChatId, EditState, EditorContext, FileType, KeyboardLayout, LinkButton, MediaDescriptor,
    MessageId, Session, UserId,
};
pub use transition::{transition, TransitionError};

//! Session runtime executor

use super::traits::{MediaDelivery, SessionStore, WatermarkRenderer};
use super::{InboundEvent, Outcome, UserLocks};

use crate::state_machine::keyboard::{MediaAction, OutgoingMedia, RenderCommand};
use crate::state_machine::{
    transition, ChatId, EditorContext, Effect, Event, KeyboardLayout, Session, UserId,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Generic session runtime that can work with any store, delivery, and renderer implementations
pub struct SessionRuntime<S, D, W>
where
    S: SessionStore,
    D: MediaDelivery,
    W: WatermarkRenderer,
{
    store: S,
    delivery: D,
    renderer: W,
    layout: KeyboardLayout,
    /// Sessions idle longer than this are discarded on load
    session_ttl: Option<Duration>,
    locks: UserLocks,
}

/// Failure that abandons the event being processed
#[derive(Debug)]
enum Abort {
    Store(String),
}

impl<S, D, W> SessionRuntime<S, D, W>
where
    S: SessionStore,
    D: MediaDelivery,
    W: WatermarkRenderer,
{
    pub fn new(store: S, delivery: D, renderer: W, layout: KeyboardLayout) -> Self {
        Self {
            store,
            delivery,
            renderer,
            layout,
            session_ttl: None,
            locks: UserLocks::default(),
        }
    }

    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn delivery(&self) -> &D {
        &self.delivery
    }

    /// Process one inbound event inside the user's critical section
    pub async fn dispatch(&self, inbound: InboundEvent) -> Outcome {
        let InboundEvent {
            user_id,
            chat_id,
            event,
        } = inbound;
        let _guard = self.locks.acquire(user_id).await;

        tracing::debug!(user_id = %user_id, event = event.kind(), "Dispatching event");

        let context = EditorContext::new(user_id, chat_id, self.layout);
        let outcome = match self.load(user_id).await {
            Ok(session) => self.process_event(&context, session, event).await,
            Err(Abort::Store(e)) => Outcome::StoreFailed(e),
        };

        if let Outcome::StoreFailed(e) = &outcome {
            tracing::error!(user_id = %user_id, error = %e, "Session store failed");
            self.notify(
                chat_id,
                "Sorry, something went wrong on our side. Please try again.",
            )
            .await;
        }
        outcome
    }

    /// Load the user's session, discarding it when it has sat idle past the TTL
    async fn load(&self, user_id: UserId) -> Result<Option<Session>, Abort> {
        let Some(stored) = self.store.load(user_id).await.map_err(Abort::Store)? else {
            return Ok(None);
        };

        if let Some(ttl) = self.session_ttl {
            if Utc::now() - stored.updated_at > ttl {
                tracing::info!(
                    user_id = %user_id,
                    updated_at = %stored.updated_at,
                    "Discarding expired session"
                );
                self.store.delete(user_id).await.map_err(Abort::Store)?;
                return Ok(None);
            }
        }

        Ok(Some(stored.session))
    }

    async fn process_event(
        &self,
        context: &EditorContext,
        mut session: Option<Session>,
        event: Event,
    ) -> Outcome {
        let mut outcome = Outcome::Applied;

        // Process events in a loop to handle chained effects
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let kind = current_event.kind();
            let had_session = session.is_some();
            let discards = matches!(current_event, Event::DeliveryFailed { .. });

            // Pure state transition
            let result = match transition(session.as_ref(), context, current_event) {
                Ok(r) => r,
                Err(e) => {
                    // Transition errors are user-facing
                    tracing::info!(user_id = %context.user_id, event = kind, reason = %e, "Event rejected");
                    self.notify(context.chat_id, &e.to_string()).await;
                    return Outcome::Rejected(e);
                }
            };

            session = result.session;
            if let Some(current) = &session {
                tracing::debug!(user_id = %context.user_id, event = kind, state = current.state.name(), "Transitioned");
            }
            if discards && had_session {
                outcome = Outcome::SessionDiscarded;
            }

            // Execute effects in order; one that reports back ends the batch
            for effect in result.effects {
                match self.execute_effect(context, session.as_ref(), effect).await {
                    Ok(Some(generated)) => {
                        events_to_process.push(generated);
                        break;
                    }
                    Ok(None) => {}
                    Err(Abort::Store(e)) => return Outcome::StoreFailed(e),
                }
            }
        }

        outcome
    }

    async fn execute_effect(
        &self,
        context: &EditorContext,
        session: Option<&Session>,
        effect: Effect,
    ) -> Result<Option<Event>, Abort> {
        match effect {
            Effect::PersistSession => {
                if let Some(current) = session {
                    self.store.save(current).await.map_err(Abort::Store)?;
                } else {
                    tracing::warn!(user_id = %context.user_id, "PersistSession without a session");
                }
                Ok(None)
            }

            Effect::DeleteSession => {
                self.store
                    .delete(context.user_id)
                    .await
                    .map_err(Abort::Store)?;
                Ok(None)
            }

            Effect::Reply { text } => {
                self.notify(context.chat_id, &text).await;
                Ok(None)
            }

            Effect::Render(command) => Ok(Some(self.render(command).await)),

            Effect::FinalizeKeyboard {
                message_id,
                keyboard,
            } => match self
                .delivery
                .edit_keyboard(context.chat_id, message_id, &keyboard)
                .await
            {
                Ok(()) => Ok(None),
                Err(e) => {
                    tracing::warn!(user_id = %context.user_id, error = %e, "Failed to finalize keyboard");
                    Ok(Some(Event::DeliveryFailed {
                        message: e.to_string(),
                    }))
                }
            },

            Effect::RenderWatermark { file_id, text } => {
                Ok(Some(self.render_watermark(context, &file_id, &text).await))
            }
        }
    }

    async fn render(&self, command: RenderCommand) -> Event {
        let RenderCommand {
            action,
            caption,
            keyboard,
        } = command;

        match action {
            MediaAction::Send { chat_id, media } => {
                match self.delivery.send(chat_id, &media, &caption, &keyboard).await {
                    Ok(sent) => Event::Delivered {
                        message_id: sent.message_id,
                        // Only an upload creates new platform media
                        file_id: match media {
                            OutgoingMedia::Upload { .. } => sent.file_id,
                            OutgoingMedia::Existing { .. } => None,
                        },
                    },
                    Err(e) => {
                        tracing::warn!(chat_id = %chat_id, error = %e, "Send failed");
                        Event::DeliveryFailed {
                            message: e.to_string(),
                        }
                    }
                }
            }

            MediaAction::EditCaption {
                chat_id,
                message_id,
            } => {
                match self
                    .delivery
                    .edit_caption(chat_id, message_id, &caption, &keyboard)
                    .await
                {
                    Ok(()) => Event::Delivered {
                        message_id,
                        file_id: None,
                    },
                    Err(e) => {
                        tracing::warn!(chat_id = %chat_id, error = %e, "Edit failed");
                        Event::DeliveryFailed {
                            message: e.to_string(),
                        }
                    }
                }
            }
        }
    }

    async fn render_watermark(&self, context: &EditorContext, file_id: &str, text: &str) -> Event {
        let image = match self.delivery.download(file_id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(user_id = %context.user_id, error = %e, "Failed to download photo");
                return Event::WatermarkFailed {
                    message: e.to_string(),
                };
            }
        };

        match self.renderer.render(&image, text).await {
            Ok(image) => {
                tracing::info!(user_id = %context.user_id, bytes = image.len(), "Watermark rendered");
                Event::WatermarkRendered { image }
            }
            Err(e) => {
                tracing::warn!(user_id = %context.user_id, error = %e, "Watermark rendering failed");
                Event::WatermarkFailed {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Best-effort text notice; failures are logged and otherwise ignored
    async fn notify(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.delivery.send_text(chat_id, text).await {
            tracing::warn!(chat_id = %chat_id, error = %e, "Failed to send notice");
        }
    }
}

impl<S, D, W> SessionRuntime<S, D, W>
where
    S: SessionStore + 'static,
    D: MediaDelivery + 'static,
    W: WatermarkRenderer + 'static,
{
    /// Dispatch on a task of its own; the event runs to completion even if
    /// the caller stops waiting
    pub fn spawn_dispatch(self: &Arc<Self>, inbound: InboundEvent) -> JoinHandle<Outcome> {
        let runtime = Arc::clone(self);
        tokio::spawn(async move {
            let user_id = inbound.user_id;
            let event = inbound.event.kind();
            let outcome = runtime.dispatch(inbound).await;
            tracing::info!(user_id = %user_id, event, outcome = ?outcome, "Event processed");
            outcome
        })
    }
}

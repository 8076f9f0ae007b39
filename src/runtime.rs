//! Runtime for executing editing sessions
//!
//! Every inbound event for a user runs inside that user's critical section:
//! load the session, transition, execute effects, persist.

mod executor;
pub mod traits;


pub use executor::SessionRuntime;
pub use traits::*;

use crate::state_machine::{ChatId, Event, TransitionError, UserId};
use crate::telegram::TelegramClient;
use crate::watermark::CommandRenderer;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime = SessionRuntime<DatabaseStore, TelegramClient, CommandRenderer>;

/// A normalized event addressed to one user's session
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub event: Event,
}

impl InboundEvent {
    pub fn new(user_id: UserId, chat_id: ChatId, event: Event) -> Self {
        Self {
            user_id,
            chat_id,
            event,
        }
    }
}

/// How a dispatched event ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Transitions ran and their effects were executed
    Applied,
    /// The event was refused; the user was told why
    Rejected(TransitionError),
    /// A delivery failure closed the session
    SessionDiscarded,
    /// The session store failed; the event was abandoned
    StoreFailed(String),
}

/// One async lock per user with an event in flight
#[derive(Default)]
pub(crate) struct UserLocks {
    locks: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>,
}

/// Held for the whole of one dispatch
pub(crate) struct UserLockGuard<'a> {
    table: &'a UserLocks,
    user_id: UserId,
    lock: Arc<tokio::sync::Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl UserLocks {
    pub(crate) async fn acquire(&self, user_id: UserId) -> UserLockGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(user_id).or_default())
        };
        let guard = Arc::clone(&lock).lock_owned().await;
        UserLockGuard {
            table: self,
            user_id,
            lock,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for UserLockGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self
            .table
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Only the table and this guard still point at the lock: nobody is waiting
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.user_id);
        }
    }
}

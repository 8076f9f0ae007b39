//! Telegram Bot API bindings
//!
//! Normalization of updates into session events, and the teloxide client
//! that implements media delivery.

mod client;
pub mod ingress;

pub use client::TelegramClient;
pub use ingress::normalize;
pub use teloxide::types::Update;

//! Bot API client built on teloxide

use super::ingress::media_of;
use crate::runtime::{DeliveryError, MediaDelivery, SentMessage};
use crate::state_machine::keyboard::{ButtonKind, Keyboard, OutgoingMedia};
use crate::state_machine::{ChatId, FileType, MessageId};
use async_trait::async_trait;
use std::future::IntoFuture;
use std::time::Instant;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{
    AllowedUpdate, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, Message, ParseMode,
};
use teloxide::{ApiError, RequestError};
use url::Url;

/// Bot API client implementing media delivery
#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>, api_base: &str) -> Result<Self, DeliveryError> {
        let api_url = Url::parse(api_base)
            .map_err(|e| DeliveryError::InvalidUrl(format!("{api_base}: {e}")))?;
        Ok(Self {
            bot: Bot::new(token).set_api_url(api_url),
        })
    }

    /// Acknowledge a button press
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), DeliveryError> {
        timed(
            "answerCallbackQuery",
            self.bot.answer_callback_query(callback_query_id),
        )
        .await
        .map_err(delivery_error)?;
        Ok(())
    }

    /// Point the bot's webhook at `url`
    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> Result<(), DeliveryError> {
        let url = Url::parse(url).map_err(|e| DeliveryError::InvalidUrl(format!("{url}: {e}")))?;
        let mut request = self
            .bot
            .set_webhook(url)
            .allowed_updates([AllowedUpdate::Message, AllowedUpdate::CallbackQuery]);
        if let Some(secret) = secret {
            request = request.secret_token(secret);
        }
        timed("setWebhook", request).await.map_err(delivery_error)?;
        Ok(())
    }
}

/// Await a request, logging how long it took
async fn timed<T, R>(method: &'static str, request: R) -> Result<T, RequestError>
where
    R: IntoFuture<Output = Result<T, RequestError>> + Send,
    R::IntoFuture: Send,
{
    let start = Instant::now();
    let result = request.await;
    let duration_ms = start.elapsed().as_millis();
    match &result {
        Ok(_) => tracing::debug!(method, duration_ms = %duration_ms, "Bot API call completed"),
        Err(e) => tracing::warn!(method, duration_ms = %duration_ms, error = %e, "Bot API call failed"),
    }
    result
}

fn delivery_error(e: RequestError) -> DeliveryError {
    match e {
        RequestError::Network(e) => DeliveryError::Network(e.to_string()),
        RequestError::Io(e) => DeliveryError::Network(e.to_string()),
        RequestError::InvalidJson { source, .. } => DeliveryError::InvalidResponse(source.to_string()),
        other => DeliveryError::Api(other.to_string()),
    }
}

/// Unchanged edits count as delivered
fn ignore_not_modified(result: Result<Message, RequestError>) -> Result<(), DeliveryError> {
    match result {
        Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(e) => Err(delivery_error(e)),
    }
}

fn chat(chat_id: ChatId) -> teloxide::types::ChatId {
    teloxide::types::ChatId(chat_id.0)
}

fn message(message_id: MessageId) -> Result<teloxide::types::MessageId, DeliveryError> {
    i32::try_from(message_id.0)
        .map(teloxide::types::MessageId)
        .map_err(|_| DeliveryError::InvalidResponse(format!("Message id {message_id} out of range")))
}

/// Inline markup for a keyboard; empty rows are dropped
fn inline_keyboard(keyboard: &Keyboard) -> Result<InlineKeyboardMarkup, DeliveryError> {
    let mut rows = Vec::with_capacity(keyboard.rows.len());
    for row in keyboard.rows.iter().filter(|row| !row.is_empty()) {
        let buttons = row
            .iter()
            .map(|button| match &button.kind {
                ButtonKind::Callback(data) => Ok(InlineKeyboardButton::callback(
                    button.text.clone(),
                    data.clone(),
                )),
                ButtonKind::Url(url) => Url::parse(url)
                    .map(|url| InlineKeyboardButton::url(button.text.clone(), url))
                    .map_err(|e| DeliveryError::InvalidUrl(format!("{url}: {e}"))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(buttons);
    }
    Ok(InlineKeyboardMarkup::new(rows))
}

fn upload_file_name(file_type: FileType) -> &'static str {
    match file_type {
        FileType::Photo => "watermarked.jpg",
        FileType::Video => "video.mp4",
        FileType::Document => "document",
        FileType::Audio => "audio.mp3",
    }
}

fn input_file(media: &OutgoingMedia) -> InputFile {
    match media {
        OutgoingMedia::Existing { file_id, .. } => InputFile::file_id(file_id.clone()),
        OutgoingMedia::Upload { file_type, bytes } => {
            InputFile::memory(bytes.clone()).file_name(upload_file_name(*file_type))
        }
    }
}

#[async_trait]
impl MediaDelivery for TelegramClient {
    async fn send(
        &self,
        chat_id: ChatId,
        media: &OutgoingMedia,
        caption: &str,
        keyboard: &Keyboard,
    ) -> Result<SentMessage, DeliveryError> {
        let file_type = media.file_type();
        tracing::debug!(chat_id = %chat_id, kind = file_type.as_str(), ?media, "Sending media");
        let markup = inline_keyboard(keyboard)?;
        let file = input_file(media);
        let chat_id = chat(chat_id);

        let result = match file_type {
            FileType::Photo => {
                let request = self
                    .bot
                    .send_photo(chat_id, file)
                    .caption(caption)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(markup);
                timed("sendPhoto", request).await
            }
            FileType::Video => {
                let request = self
                    .bot
                    .send_video(chat_id, file)
                    .caption(caption)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(markup);
                timed("sendVideo", request).await
            }
            FileType::Document => {
                let request = self
                    .bot
                    .send_document(chat_id, file)
                    .caption(caption)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(markup);
                timed("sendDocument", request).await
            }
            FileType::Audio => {
                let request = self
                    .bot
                    .send_audio(chat_id, file)
                    .caption(caption)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(markup);
                timed("sendAudio", request).await
            }
        };
        let sent = result.map_err(delivery_error)?;

        Ok(SentMessage {
            message_id: MessageId(i64::from(sent.id.0)),
            file_id: media_of(&sent).map(|(_, file_id)| file_id.to_string()),
        })
    }

    async fn edit_caption(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        caption: &str,
        keyboard: &Keyboard,
    ) -> Result<(), DeliveryError> {
        let request = self
            .bot
            .edit_message_caption(chat(chat_id), message(message_id)?)
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .reply_markup(inline_keyboard(keyboard)?);
        ignore_not_modified(timed("editMessageCaption", request).await)
    }

    async fn edit_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: &Keyboard,
    ) -> Result<(), DeliveryError> {
        let request = self
            .bot
            .edit_message_reply_markup(chat(chat_id), message(message_id)?)
            .reply_markup(inline_keyboard(keyboard)?);
        ignore_not_modified(timed("editMessageReplyMarkup", request).await)
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), DeliveryError> {
        timed("sendMessage", self.bot.send_message(chat(chat_id), text))
            .await
            .map_err(delivery_error)?;
        Ok(())
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, DeliveryError> {
        let file = timed("getFile", self.bot.get_file(file_id))
            .await
            .map_err(delivery_error)?;

        let mut bytes = Vec::new();
        self.bot
            .download_file(&file.path, &mut bytes)
            .await
            .map_err(|e| DeliveryError::Network(format!("File download failed: {e}")))?;
        Ok(bytes)
    }
}

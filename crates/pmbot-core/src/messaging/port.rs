use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::types::InlineKeyboard,
    Result,
};

/// Port over the chat platform's outbound API.
///
/// Telegram is the only implementation today; the shape is kept small enough
/// that another messenger could fit behind it.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Plain-text message.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    /// Photo by URL with a plain-text caption.
    async fn send_photo_url(&self, chat_id: ChatId, url: &str, caption: &str)
        -> Result<MessageRef>;

    /// HTML-formatted text with inline callback buttons.
    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef>;

    /// Forward with the platform's native sender attribution. Returns a
    /// reference to the new copy in `to`.
    async fn forward_message(
        &self,
        to: ChatId,
        from: ChatId,
        message_id: MessageId,
    ) -> Result<MessageRef>;

    /// Re-send content as a fresh, non-attributed message.
    async fn copy_message(&self, to: ChatId, from: ChatId, message_id: MessageId) -> Result<()>;

    /// Acknowledge a callback button press, optionally with feedback text
    /// (as an alert popup when `show_alert`).
    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()>;
}

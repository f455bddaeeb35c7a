//! Shared test doubles.

use std::{
    collections::HashSet,
    sync::atomic::{AtomicI32, Ordering},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::domain::{ChatId, MessageId, MessageRef};
use crate::messaging::{InlineKeyboard, MessagingPort};
use crate::{Error, Result};

/// In-memory [`MessagingPort`] that records every outbound call.
#[derive(Default)]
pub struct FakeMessenger {
    texts: Mutex<Vec<(i64, String)>>,
    photos: Mutex<Vec<(i64, String, String)>>,
    keyboards: Mutex<Vec<(i64, String, InlineKeyboard)>>,
    forwards: Mutex<Vec<(i64, i64, i32)>>,
    copies: Mutex<Vec<(i64, i64, i32)>>,
    acks: Mutex<Vec<(String, Option<String>, bool)>>,
    /// Chats for which `forward_message` fails.
    fail_forward_to: Mutex<HashSet<i64>>,
    next_id: AtomicI32,
}

impl FakeMessenger {
    pub fn texts(&self) -> Vec<(i64, String)> {
        self.texts.lock().unwrap().clone()
    }

    pub fn texts_for(&self, chat_id: i64) -> Vec<String> {
        self.texts
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == chat_id)
            .map(|(_, t)| t.clone())
            .collect()
    }

    pub fn photos(&self) -> Vec<(i64, String, String)> {
        self.photos.lock().unwrap().clone()
    }

    pub fn keyboards(&self) -> Vec<(i64, String, InlineKeyboard)> {
        self.keyboards.lock().unwrap().clone()
    }

    pub fn forwards(&self) -> Vec<(i64, i64, i32)> {
        self.forwards.lock().unwrap().clone()
    }

    pub fn copies(&self) -> Vec<(i64, i64, i32)> {
        self.copies.lock().unwrap().clone()
    }

    pub fn acks(&self) -> Vec<(String, Option<String>, bool)> {
        self.acks.lock().unwrap().clone()
    }

    pub fn fail_forwards_to(&self, chat_id: i64) {
        self.fail_forward_to.lock().unwrap().insert(chat_id);
    }

    // Message ids start at 1001.
    fn alloc(&self, chat_id: i64) -> MessageRef {
        MessageRef {
            chat_id: ChatId(chat_id),
            message_id: MessageId(1001 + self.next_id.fetch_add(1, Ordering::SeqCst)),
        }
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        self.texts.lock().unwrap().push((chat_id.0, text.to_string()));
        Ok(self.alloc(chat_id.0))
    }

    async fn send_photo_url(
        &self,
        chat_id: ChatId,
        url: &str,
        caption: &str,
    ) -> Result<MessageRef> {
        self.photos
            .lock()
            .unwrap()
            .push((chat_id.0, url.to_string(), caption.to_string()));
        Ok(self.alloc(chat_id.0))
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        self.keyboards
            .lock()
            .unwrap()
            .push((chat_id.0, html.to_string(), keyboard));
        Ok(self.alloc(chat_id.0))
    }

    async fn forward_message(
        &self,
        to: ChatId,
        from: ChatId,
        message_id: MessageId,
    ) -> Result<MessageRef> {
        if self.fail_forward_to.lock().unwrap().contains(&to.0) {
            return Err(Error::External(format!("forward to {} refused", to.0)));
        }
        self.forwards
            .lock()
            .unwrap()
            .push((to.0, from.0, message_id.0));
        Ok(self.alloc(to.0))
    }

    async fn copy_message(&self, to: ChatId, from: ChatId, message_id: MessageId) -> Result<()> {
        self.copies
            .lock()
            .unwrap()
            .push((to.0, from.0, message_id.0));
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()> {
        self.acks.lock().unwrap().push((
            callback_id.to_string(),
            text.map(str::to_string),
            show_alert,
        ));
        Ok(())
    }
}

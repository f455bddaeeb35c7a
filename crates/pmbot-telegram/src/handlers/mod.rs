//! Telegram update handlers.
//!
//! Each handler translates a raw update into calls on the core services.
//! Core errors are logged, never bubbled into the dispatcher.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};

use pmbot_core::domain::{ChatId, Requester};

use crate::router::AppState;

mod callback;
mod commands;
mod guest;

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    callback::handle_callback(q, state).await
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = ChatId(msg.chat.id.0);

    if msg.text().is_some_and(is_start_command) {
        welcome(&msg, chat_id, &state).await;
        return Ok(());
    }

    if state.cfg.is_admin(chat_id.0) {
        return commands::handle_admin_message(msg, state).await;
    }

    guest::handle_guest_message(msg, state).await
}

/// `/start` greeting, plus a verification challenge for non-admin chats
/// that have not passed one yet.
async fn welcome(msg: &Message, chat_id: ChatId, state: &AppState) {
    if let Err(e) = state
        .messenger
        .send_text(chat_id, &state.cfg.welcome_message)
        .await
    {
        tracing::warn!(chat = chat_id.0, "welcome message failed: {e}");
    }

    if !state.cfg.captcha_enabled || state.cfg.is_admin(chat_id.0) {
        return;
    }
    match state.verification.is_verified(chat_id).await {
        Ok(true) => {}
        Ok(false) => {
            if let Err(e) = state
                .verification
                .issue_challenge(chat_id, &requester_from(msg))
                .await
            {
                tracing::error!(chat = chat_id.0, "failed to issue challenge: {e}");
            }
        }
        Err(e) => tracing::error!(chat = chat_id.0, "verified lookup failed: {e}"),
    }
}

fn is_start_command(text: &str) -> bool {
    let first = text.trim().split_whitespace().next().unwrap_or("");
    first
        .strip_prefix('/')
        .map(|c| c.split('@').next() == Some("start"))
        .unwrap_or(false)
}

pub(crate) fn requester_from(msg: &Message) -> Requester {
    match msg.from() {
        Some(user) => Requester {
            username: user.username.clone(),
            first_name: Some(user.first_name.clone()),
            last_name: user.last_name.clone(),
        },
        None => Requester::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_command_detection() {
        assert!(is_start_command("/start"));
        assert!(is_start_command("  /start  "));
        assert!(is_start_command("/start@my_bot"));
        assert!(is_start_command("/start deep-link-payload"));
        assert!(!is_start_command("/started"));
        assert!(!is_start_command("start"));
        assert!(!is_start_command("hello /start"));
    }
}

//! Admin-side message handling: review-list commands, reply-scoped
//! moderation commands, and plain replies routed back to guests.

use std::sync::Arc;

use teloxide::prelude::*;

use pmbot_core::domain::{ChatId, MessageId};

use crate::router::AppState;

const USAGE: &str = "Admin commands:\n\
/pending — list users awaiting verification\n\
/failed — list rejected verifications\n\n\
Reply to a forwarded message with /block, /unblock or /checkblock,\n\
or reply with any text to answer the guest.";

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub async fn handle_admin_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let admin_chat = ChatId(msg.chat.id.0);
    let text = msg.text().unwrap_or("");

    if let Some(replied) = msg.reply_to_message() {
        let replied_id = MessageId(replied.id.0);

        if text.starts_with('/') {
            let (cmd, _) = parse_command(text);
            handle_reply_command(&cmd, admin_chat, replied_id, &state).await;
            return Ok(());
        }

        // Plain reply to a forwarded message: copy it back to the guest.
        // A reply to anything else (old forward past the index TTL, or the
        // bot's own status messages) is dropped without feedback.
        match state
            .relay
            .route_admin_reply(admin_chat, MessageId(msg.id.0), replied_id)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(admin = admin_chat.0, "reply target not in relay index")
            }
            Err(e) => tracing::error!(admin = admin_chat.0, "reply routing failed: {e}"),
        }
        return Ok(());
    }

    if text.starts_with('/') {
        let (cmd, _) = parse_command(text);
        match cmd.as_str() {
            "pending" => log_failure(state.moderation.list_pending(admin_chat).await, "pending"),
            "failed" => log_failure(state.moderation.list_failed(admin_chat).await, "failed"),
            "block" | "unblock" | "checkblock" => {
                send_text(
                    &state,
                    admin_chat,
                    &format!("⚠️ Reply to a forwarded message with /{cmd}."),
                )
                .await;
            }
            _ => send_text(&state, admin_chat, USAGE).await,
        }
        return Ok(());
    }

    send_text(&state, admin_chat, USAGE).await;
    Ok(())
}

async fn handle_reply_command(
    cmd: &str,
    admin_chat: ChatId,
    replied_id: MessageId,
    state: &AppState,
) {
    let guest = match state.relay.resolve_reply(replied_id).await {
        Ok(Some(guest)) => guest,
        Ok(None) => {
            send_text(
                state,
                admin_chat,
                "⚠️ Could not match this message to a guest.",
            )
            .await;
            return;
        }
        Err(e) => {
            tracing::error!(admin = admin_chat.0, "reply lookup failed: {e}");
            return;
        }
    };

    match cmd {
        "block" => {
            if state.cfg.is_admin(guest.0) {
                send_text(state, admin_chat, "⚠️ You cannot block an admin.").await;
                return;
            }
            log_failure(state.moderation.block(guest, admin_chat).await, "block");
        }
        "unblock" => {
            log_failure(state.moderation.unblock(guest, admin_chat).await, "unblock")
        }
        "checkblock" => match state.moderation.status(guest).await {
            Ok(status) => {
                send_text(
                    state,
                    admin_chat,
                    &format!("ℹ️ User {} is {}.", guest.0, status),
                )
                .await;
            }
            Err(e) => tracing::error!(guest = guest.0, "status lookup failed: {e}"),
        },
        _ => send_text(state, admin_chat, USAGE).await,
    }
}

async fn send_text(state: &AppState, chat: ChatId, text: &str) {
    if let Err(e) = state.messenger.send_text(chat, text).await {
        tracing::error!(chat = chat.0, "admin notice failed: {e}");
    }
}

fn log_failure(result: pmbot_core::Result<()>, what: &str) {
    if let Err(e) = result {
        tracing::error!("{what} failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_with_bot_suffix_and_args() {
        assert_eq!(parse_command("/pending"), ("pending".to_string(), String::new()));
        assert_eq!(
            parse_command("/block@pm_bot now"),
            ("block".to_string(), "now".to_string())
        );
        assert_eq!(
            parse_command("  /CheckBlock  "),
            ("checkblock".to_string(), String::new())
        );
    }
}

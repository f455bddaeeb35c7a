//! Guest-side message handling: verification gate, block gate, relay.

use std::sync::Arc;

use teloxide::prelude::*;

use pmbot_core::domain::{ChatId, MessageId};
use pmbot_core::relay::GuestDelivery;
use pmbot_core::verification::AnswerOutcome;

use crate::router::AppState;

pub async fn handle_guest_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = ChatId(msg.chat.id.0);

    if state.cfg.captcha_enabled {
        match state.verification.is_verified(chat_id).await {
            Ok(true) => {}
            Ok(false) => {
                handle_unverified(&msg, chat_id, &state).await;
                return Ok(());
            }
            Err(e) => {
                tracing::error!(chat = chat_id.0, "verified lookup failed: {e}");
                return Ok(());
            }
        }
    }

    match state
        .relay
        .deliver_from_guest(
            &state.moderation,
            chat_id,
            MessageId(msg.id.0),
            &state.cfg.admin_ids,
        )
        .await
    {
        Ok(GuestDelivery::Relayed(0)) => {
            tracing::warn!(chat = chat_id.0, "message reached no admin")
        }
        Ok(GuestDelivery::Relayed(_)) | Ok(GuestDelivery::Blocked) => {}
        Err(e) => tracing::error!(chat = chat_id.0, "relay failed: {e}"),
    }
    Ok(())
}

/// An unverified guest's message is only ever a challenge answer. With a
/// session active, text is checked; without one, the guest is pointed at
/// `/start`. Non-text messages mid-session are ignored.
async fn handle_unverified(msg: &Message, chat_id: ChatId, state: &AppState) {
    let has_session = match state.verification.has_active_session(chat_id).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(chat = chat_id.0, "session lookup failed: {e}");
            return;
        }
    };

    if !has_session {
        send_text(
            state,
            chat_id,
            "⚠️ You are not verified yet.\n\nSend /start to begin verification.",
        )
        .await;
        return;
    }

    let Some(text) = msg.text() else {
        return;
    };

    match state.verification.check_answer(chat_id, text).await {
        Ok(AnswerOutcome::Correct) => {
            send_text(
                state,
                chat_id,
                "✅ Verification passed! You can send messages now.",
            )
            .await;
        }
        // The engine already told the guest about wrong answers and
        // lockout.
        Ok(AnswerOutcome::Incorrect { .. }) | Ok(AnswerOutcome::Exhausted) => {}
        Ok(AnswerOutcome::Expired) | Ok(AnswerOutcome::NoSession) => {
            send_text(
                state,
                chat_id,
                "⏱ Your verification expired. Send /start to try again.",
            )
            .await;
        }
        Err(e) => tracing::error!(chat = chat_id.0, "answer check failed: {e}"),
    }
}

async fn send_text(state: &AppState, chat: ChatId, text: &str) {
    if let Err(e) = state.messenger.send_text(chat, text).await {
        tracing::error!(chat = chat.0, "guest notice failed: {e}");
    }
}

//! Callback-button handling: admin moderation actions and quiz answers.

use std::sync::Arc;

use teloxide::{prelude::*, types::CallbackQuery};

use pmbot_core::callback::CallbackAction;
use pmbot_core::domain::ChatId;
use pmbot_core::verification::AnswerOutcome;

use crate::router::AppState;

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    let caller = ChatId(q.from.id.0 as i64);
    let action = q.data.as_deref().and_then(CallbackAction::parse);

    match action {
        Some(CallbackAction::Approve(guest)) if state.cfg.is_admin(caller.0) => {
            let result = state.moderation.approve(ChatId(guest), caller).await;
            ack_action(&state, &q.id, result, "✅ Approved").await;
        }
        Some(CallbackAction::Reject(guest)) if state.cfg.is_admin(caller.0) => {
            let result = state.moderation.reject(ChatId(guest), caller).await;
            ack_action(&state, &q.id, result, "❌ Rejected").await;
        }
        Some(CallbackAction::Block(guest)) if state.cfg.is_admin(caller.0) => {
            let result = state.moderation.block(ChatId(guest), caller).await;
            ack_action(&state, &q.id, result, "🚫 Blocked").await;
        }
        Some(CallbackAction::QuizAnswer(answer)) => {
            handle_quiz_answer(&state, &q.id, caller, &answer).await;
        }
        // Unknown payloads and admin buttons pressed by non-admins get a
        // bare ack so the spinner stops.
        _ => ack(&state, &q.id, None, false).await,
    }

    Ok(())
}

async fn handle_quiz_answer(state: &AppState, callback_id: &str, guest: ChatId, answer: &str) {
    match state.verification.check_answer(guest, answer).await {
        Ok(AnswerOutcome::Correct) => {
            ack(state, callback_id, Some("✅ Verification passed!"), true).await;
            if let Err(e) = state
                .messenger
                .send_text(guest, "✅ Verification passed! You can send messages now.")
                .await
            {
                tracing::error!(chat = guest.0, "confirmation failed: {e}");
            }
        }
        Ok(AnswerOutcome::Incorrect { .. }) => {
            ack(state, callback_id, Some("❌ Wrong answer"), false).await;
        }
        Ok(AnswerOutcome::Exhausted) => {
            ack(state, callback_id, Some("❌ Too many attempts"), true).await;
        }
        Ok(AnswerOutcome::Expired) | Ok(AnswerOutcome::NoSession) => {
            ack(
                state,
                callback_id,
                Some("Verification expired. Send /start to try again."),
                true,
            )
            .await;
        }
        Err(e) => {
            tracing::error!(chat = guest.0, "answer check failed: {e}");
            ack(state, callback_id, None, false).await;
        }
    }
}

async fn ack_action(
    state: &AppState,
    callback_id: &str,
    result: pmbot_core::Result<()>,
    done: &str,
) {
    match result {
        Ok(()) => ack(state, callback_id, Some(done), false).await,
        Err(e) => {
            tracing::error!("moderation action failed: {e}");
            ack(state, callback_id, Some("⚠️ Action failed"), true).await;
        }
    }
}

async fn ack(state: &AppState, callback_id: &str, text: Option<&str>, show_alert: bool) {
    if let Err(e) = state
        .messenger
        .answer_callback(callback_id, text, show_alert)
        .await
    {
        tracing::warn!("callback ack failed: {e}");
    }
}

//! Verification Engine: challenge issuance, session persistence, answer
//! checking, attempt/timeout policy.

use std::{sync::Arc, time::Duration};

use crate::challenge::{Challenge, ChallengeKind, QuizQuestion};
use crate::config::Config;
use crate::domain::{ChatId, Requester};
use crate::formatting::escape_html;
use crate::kv::KvStore;
use crate::messaging::{InlineKeyboard, MessagingPort};
use crate::records::{self, decode, now_ms, CaptchaSession};
use crate::Result;

/// Outcome of checking a submitted answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct,
    Incorrect { remaining: u32 },
    /// Attempt limit reached; the session is gone and the user was told.
    Exhausted,
    /// Session outlived the timeout; deleted on read. Callers treat this the
    /// same as `NoSession`.
    Expired,
    NoSession,
}

#[derive(Clone, Debug)]
pub struct VerificationSettings {
    pub mode: ChallengeKind,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub custom_questions: Option<Vec<QuizQuestion>>,
}

impl VerificationSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            mode: cfg.captcha_mode,
            timeout: cfg.captcha_timeout,
            max_attempts: cfg.captcha_max_attempts,
            custom_questions: cfg.quiz_questions.clone(),
        }
    }
}

pub struct VerificationEngine {
    kv: Arc<dyn KvStore>,
    messenger: Arc<dyn MessagingPort>,
    settings: VerificationSettings,
}

impl VerificationEngine {
    pub fn new(
        kv: Arc<dyn KvStore>,
        messenger: Arc<dyn MessagingPort>,
        settings: VerificationSettings,
    ) -> Self {
        Self {
            kv,
            messenger,
            settings,
        }
    }

    /// Issue a fresh challenge to the chat, overwriting any prior session.
    pub async fn issue_challenge(&self, chat_id: ChatId, requester: &Requester) -> Result<()> {
        let challenge = Challenge::generate(
            self.settings.mode,
            self.settings.custom_questions.as_deref(),
        );

        let session = CaptchaSession {
            chat_id: chat_id.0,
            answer: challenge.expected_answer(),
            attempts: 0,
            created_at: now_ms(),
            kind: challenge.kind(),
            username: requester.username.clone(),
            first_name: requester.first_name.clone(),
            last_name: requester.last_name.clone(),
        };
        self.kv
            .put(
                &records::session_key(chat_id.0),
                &serde_json::to_string(&session)?,
                Some(self.settings.timeout),
            )
            .await?;

        let secs = self.settings.timeout.as_secs();
        let max = self.settings.max_attempts;
        match challenge {
            Challenge::Image { image_url, .. } => {
                let caption = format!(
                    "🔐 Verification\n\nType the characters shown in the picture \
                     (case doesn't matter).\n\n⏱ Valid for {secs} seconds\n📝 Attempts left: {max}"
                );
                self.messenger
                    .send_photo_url(chat_id, &image_url, &caption)
                    .await?;
            }
            Challenge::Quiz { question } => {
                let text = format!(
                    "🔐 Verification\n\n{}\n\n⏱ Valid for {secs} seconds\n📝 Attempts left: {max}",
                    escape_html(&question.question)
                );
                self.messenger
                    .send_inline_keyboard(
                        chat_id,
                        &text,
                        InlineKeyboard::quiz_options(&question.options),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn check_answer(&self, chat_id: ChatId, submitted: &str) -> Result<AnswerOutcome> {
        self.check_answer_at(chat_id, submitted, now_ms()).await
    }

    /// Like [`check_answer`](Self::check_answer) with an explicit clock.
    pub async fn check_answer_at(
        &self,
        chat_id: ChatId,
        submitted: &str,
        now_ms: i64,
    ) -> Result<AnswerOutcome> {
        let key = records::session_key(chat_id.0);
        let Some(raw) = self.kv.get(&key).await? else {
            return Ok(AnswerOutcome::NoSession);
        };
        let Some(mut session) = decode::<CaptchaSession>(&raw) else {
            // Corrupt record: treat as absent.
            self.kv.delete(&key).await?;
            return Ok(AnswerOutcome::NoSession);
        };

        // The store's TTL is advisory; enforce the timeout on read too.
        let timeout_ms = self.settings.timeout.as_millis() as i64;
        if now_ms - session.created_at > timeout_ms {
            self.kv.delete(&key).await?;
            return Ok(AnswerOutcome::Expired);
        }

        session.attempts += 1;

        if session.answer_matches(submitted) {
            self.kv
                .put(&records::verified_key(chat_id.0), "true", None)
                .await?;
            self.kv.delete(&key).await?;
            return Ok(AnswerOutcome::Correct);
        }

        if session.attempts >= self.settings.max_attempts {
            self.kv.delete(&key).await?;
            self.messenger
                .send_text(
                    chat_id,
                    "❌ Too many failed attempts. Please try again later.",
                )
                .await?;
            return Ok(AnswerOutcome::Exhausted);
        }

        // TTL restarts from the full timeout on every wrong answer; the
        // attempt counter is what actually caps total tries.
        let remaining = self.settings.max_attempts - session.attempts;
        self.kv
            .put(
                &key,
                &serde_json::to_string(&session)?,
                Some(self.settings.timeout),
            )
            .await?;
        self.messenger
            .send_text(
                chat_id,
                &format!("❌ Wrong answer, try again.\n📝 Attempts left: {remaining}"),
            )
            .await?;
        Ok(AnswerOutcome::Incorrect { remaining })
    }

    pub async fn is_verified(&self, chat_id: ChatId) -> Result<bool> {
        let mark = self.kv.get(&records::verified_key(chat_id.0)).await?;
        Ok(mark.as_deref() == Some("true"))
    }

    /// Presence only — a lazily-expired session still counts as active until
    /// the next check consumes it.
    pub async fn has_active_session(&self, chat_id: ChatId) -> Result<bool> {
        Ok(self.kv.get(&records::session_key(chat_id.0)).await?.is_some())
    }
}

//! Moderation workflow: approve / reject / block / unblock, consolidated
//! guest status, and the admin review lists.

use std::fmt;
use std::sync::Arc;

use crate::callback::{approve_data, block_data, reject_data};
use crate::domain::{ChatId, Requester};
use crate::formatting::{escape_html, truncate_label};
use crate::kv::KvStore;
use crate::messaging::{InlineButton, InlineKeyboard, MessagingPort};
use crate::records::{
    self, decode, now_ms, CaptchaSession, FailedVerification, SESSION_PREFIX, VERIFIED_PREFIX,
};
use crate::Result;

/// At most this many entries get action buttons in a review list; Telegram
/// keyboards get unwieldy past that.
const MAX_ACTION_ROWS: usize = 10;

const BUTTON_LABEL_MAX: usize = 16;

/// Consolidated view over the per-chat records. Blocked wins over
/// everything; a verified mark beats a stale session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuestStatus {
    Blocked,
    Verified,
    Pending,
    Failed,
    Unverified,
}

impl fmt::Display for GuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GuestStatus::Blocked => "blocked",
            GuestStatus::Verified => "verified",
            GuestStatus::Pending => "pending verification",
            GuestStatus::Failed => "rejected",
            GuestStatus::Unverified => "unverified",
        };
        f.write_str(s)
    }
}

pub struct ModerationWorkflow {
    kv: Arc<dyn KvStore>,
    messenger: Arc<dyn MessagingPort>,
    max_attempts: u32,
}

impl ModerationWorkflow {
    pub fn new(kv: Arc<dyn KvStore>, messenger: Arc<dyn MessagingPort>, max_attempts: u32) -> Self {
        Self {
            kv,
            messenger,
            max_attempts,
        }
    }

    /// Mark the guest verified and clear any pending or failed records.
    /// The guest is told; the acting admin gets a confirmation.
    pub async fn approve(&self, guest: ChatId, acting_admin: ChatId) -> Result<()> {
        self.kv
            .put(&records::verified_key(guest.0), "true", None)
            .await?;
        self.kv.delete(&records::session_key(guest.0)).await?;
        self.kv.delete(&records::failed_key(guest.0)).await?;

        self.messenger
            .send_text(
                guest,
                "✅ An admin approved your verification. You can send messages now.",
            )
            .await?;
        self.messenger
            .send_text(acting_admin, &format!("✅ Approved user {}", guest.0))
            .await?;
        Ok(())
    }

    /// Discard the guest's pending session and record the rejection. The
    /// guest is deliberately not notified.
    pub async fn reject(&self, guest: ChatId, acting_admin: ChatId) -> Result<()> {
        let session: Option<CaptchaSession> = self
            .kv
            .get(&records::session_key(guest.0))
            .await?
            .and_then(|raw| decode(&raw));

        self.kv.delete(&records::session_key(guest.0)).await?;

        let requester = session.map(|s| s.requester()).unwrap_or_default();
        let record = FailedVerification::rejected(guest.0, requester, now_ms());
        self.kv
            .put(
                &records::failed_key(guest.0),
                &serde_json::to_string(&record)?,
                None,
            )
            .await?;

        self.messenger
            .send_text(acting_admin, &format!("❌ Rejected user {}", guest.0))
            .await?;
        Ok(())
    }

    /// Block the guest outright. Clears pending and failed records so the
    /// block mark is the single source of truth.
    pub async fn block(&self, guest: ChatId, acting_admin: ChatId) -> Result<()> {
        self.kv
            .put(&records::blocked_key(guest.0), "true", None)
            .await?;
        self.kv.delete(&records::session_key(guest.0)).await?;
        self.kv.delete(&records::failed_key(guest.0)).await?;

        self.messenger
            .send_text(acting_admin, &format!("🚫 Blocked user {}", guest.0))
            .await?;
        Ok(())
    }

    /// Lift a block by overwriting the mark with `"false"` rather than
    /// deleting it, matching what existing datasets contain.
    pub async fn unblock(&self, guest: ChatId, acting_admin: ChatId) -> Result<()> {
        self.kv
            .put(&records::blocked_key(guest.0), "false", None)
            .await?;

        self.messenger
            .send_text(acting_admin, &format!("✅ Unblocked user {}", guest.0))
            .await?;
        Ok(())
    }

    /// Value equality, not key presence: an unblocked user keeps a
    /// `"false"` record behind.
    pub async fn is_blocked(&self, guest: ChatId) -> Result<bool> {
        let mark = self.kv.get(&records::blocked_key(guest.0)).await?;
        Ok(mark.as_deref() == Some("true"))
    }

    pub async fn status(&self, guest: ChatId) -> Result<GuestStatus> {
        if self.is_blocked(guest).await? {
            return Ok(GuestStatus::Blocked);
        }
        let verified = self.kv.get(&records::verified_key(guest.0)).await?;
        if verified.as_deref() == Some("true") {
            return Ok(GuestStatus::Verified);
        }
        if self.kv.get(&records::session_key(guest.0)).await?.is_some() {
            return Ok(GuestStatus::Pending);
        }
        if self.kv.get(&records::failed_key(guest.0)).await?.is_some() {
            return Ok(GuestStatus::Failed);
        }
        Ok(GuestStatus::Unverified)
    }

    /// Send the admin a list of users mid-verification, with approve/reject
    /// buttons per entry.
    pub async fn list_pending(&self, admin: ChatId) -> Result<()> {
        self.list_pending_at(admin, now_ms()).await
    }

    pub async fn list_pending_at(&self, admin: ChatId, now_ms: i64) -> Result<()> {
        let mut sessions: Vec<CaptchaSession> = Vec::new();
        for key in self.kv.list(SESSION_PREFIX).await? {
            // The session namespace is a prefix of the verified one, so a
            // plain prefix scan picks up verified marks too. Skip those.
            if key.starts_with(VERIFIED_PREFIX) {
                continue;
            }
            let Some(raw) = self.kv.get(&key).await? else {
                continue;
            };
            if let Some(session) = decode::<CaptchaSession>(&raw) {
                sessions.push(session);
            }
        }

        if sessions.is_empty() {
            self.messenger
                .send_text(admin, "📋 No users are currently verifying.")
                .await?;
            return Ok(());
        }

        let mut text = format!("📋 Pending verification ({}):\n", sessions.len());
        let mut rows = Vec::new();
        for session in &sessions {
            let requester = session.requester();
            let age_min = ((now_ms - session.created_at) / 60_000).max(0);
            text.push_str(&format!(
                "\n• {} — <code>{}</code>\n  attempts {}/{}, started {} min ago\n",
                display_name(&requester, session.chat_id),
                session.chat_id,
                session.attempts,
                self.max_attempts,
                age_min,
            ));
            if rows.len() < MAX_ACTION_ROWS {
                let label = button_label(&requester, session.chat_id);
                rows.push(vec![
                    InlineButton::new(format!("✅ {label}"), approve_data(session.chat_id)),
                    InlineButton::new(format!("❌ {label}"), reject_data(session.chat_id)),
                ]);
            }
        }

        self.messenger
            .send_inline_keyboard(admin, &text, InlineKeyboard::rows(rows))
            .await?;
        Ok(())
    }

    /// Send the admin the list of rejected verifications, with
    /// approve/block buttons per entry.
    pub async fn list_failed(&self, admin: ChatId) -> Result<()> {
        self.list_failed_at(admin, now_ms()).await
    }

    pub async fn list_failed_at(&self, admin: ChatId, now_ms: i64) -> Result<()> {
        let mut failures: Vec<FailedVerification> = Vec::new();
        for key in self.kv.list(records::FAILED_PREFIX).await? {
            let Some(raw) = self.kv.get(&key).await? else {
                continue;
            };
            if let Some(record) = decode::<FailedVerification>(&raw) {
                failures.push(record);
            }
        }

        if failures.is_empty() {
            self.messenger
                .send_text(admin, "📋 No failed verifications.")
                .await?;
            return Ok(());
        }

        let mut text = format!("📋 Failed verifications ({}):\n", failures.len());
        let mut rows = Vec::new();
        for record in &failures {
            let requester = Requester {
                username: record.username.clone(),
                first_name: record.first_name.clone(),
                last_name: record.last_name.clone(),
            };
            let age_min = ((now_ms - record.timestamp) / 60_000).max(0);
            text.push_str(&format!(
                "\n• {} — <code>{}</code>\n  rejected {} min ago\n",
                display_name(&requester, record.chat_id),
                record.chat_id,
                age_min,
            ));
            if rows.len() < MAX_ACTION_ROWS {
                let label = button_label(&requester, record.chat_id);
                rows.push(vec![
                    InlineButton::new(format!("✅ {label}"), approve_data(record.chat_id)),
                    InlineButton::new(format!("🚫 {label}"), block_data(record.chat_id)),
                ]);
            }
        }

        self.messenger
            .send_inline_keyboard(admin, &text, InlineKeyboard::rows(rows))
            .await?;
        Ok(())
    }
}

/// HTML-escaped display line: full name, then @username, then the bare id.
fn display_name(requester: &Requester, chat_id: i64) -> String {
    let full = match (&requester.first_name, &requester.last_name) {
        (Some(first), Some(last)) => Some(format!("{first} {last}")),
        (Some(first), None) => Some(first.clone()),
        (None, Some(last)) => Some(last.clone()),
        (None, None) => None,
    };
    match (full, &requester.username) {
        (Some(name), Some(username)) => {
            format!("{} (@{})", escape_html(&name), escape_html(username))
        }
        (Some(name), None) => escape_html(&name),
        (None, Some(username)) => format!("@{}", escape_html(username)),
        (None, None) => chat_id.to_string(),
    }
}

fn button_label(requester: &Requester, chat_id: i64) -> String {
    let raw = requester
        .first_name
        .clone()
        .or_else(|| requester.username.clone())
        .unwrap_or_else(|| chat_id.to_string());
    truncate_label(&raw, BUTTON_LABEL_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::challenge::ChallengeKind;
    use crate::kv::MemoryKv;
    use crate::test_support::FakeMessenger;

    fn workflow() -> (Arc<MemoryKv>, Arc<FakeMessenger>, ModerationWorkflow) {
        let kv = Arc::new(MemoryKv::new());
        let messenger = Arc::new(FakeMessenger::default());
        let workflow = ModerationWorkflow::new(kv.clone(), messenger.clone(), 3);
        (kv, messenger, workflow)
    }

    async fn seed_session(kv: &MemoryKv, chat_id: i64, first_name: Option<&str>) {
        let session = CaptchaSession {
            chat_id,
            answer: "XY42Z".to_string(),
            attempts: 1,
            created_at: now_ms() - 120_000,
            kind: ChallengeKind::Image,
            username: None,
            first_name: first_name.map(str::to_string),
            last_name: None,
        };
        kv.put(
            &records::session_key(chat_id),
            &serde_json::to_string(&session).unwrap(),
            Some(Duration::from_secs(300)),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn approve_sets_mark_clears_records_and_notifies_both_sides() {
        let (kv, messenger, workflow) = workflow();
        seed_session(&kv, 555, Some("Eve")).await;
        kv.put(&records::failed_key(555), "{}", None).await.unwrap();

        workflow.approve(ChatId(555), ChatId(1)).await.unwrap();

        assert_eq!(
            kv.get(&records::verified_key(555)).await.unwrap().as_deref(),
            Some("true")
        );
        assert!(kv.get(&records::session_key(555)).await.unwrap().is_none());
        assert!(kv.get(&records::failed_key(555)).await.unwrap().is_none());

        assert!(messenger.texts_for(555)[0].contains("approved your verification"));
        assert!(messenger.texts_for(1)[0].contains("Approved user 555"));
    }

    #[tokio::test]
    async fn reject_records_failure_without_telling_the_guest() {
        let (kv, messenger, workflow) = workflow();
        seed_session(&kv, 555, Some("Eve")).await;

        workflow.reject(ChatId(555), ChatId(1)).await.unwrap();

        assert!(kv.get(&records::session_key(555)).await.unwrap().is_none());
        let record: FailedVerification =
            decode(&kv.get(&records::failed_key(555)).await.unwrap().unwrap()).unwrap();
        assert_eq!(record.status, "failed");
        assert_eq!(record.first_name.as_deref(), Some("Eve"));

        assert!(messenger.texts_for(555).is_empty());
        assert!(messenger.texts_for(1)[0].contains("Rejected user 555"));
    }

    #[tokio::test]
    async fn reject_then_approve_restores_the_guest() {
        let (kv, _messenger, workflow) = workflow();
        seed_session(&kv, 555, None).await;

        workflow.reject(ChatId(555), ChatId(1)).await.unwrap();
        assert_eq!(workflow.status(ChatId(555)).await.unwrap(), GuestStatus::Failed);

        workflow.approve(ChatId(555), ChatId(1)).await.unwrap();
        assert_eq!(
            workflow.status(ChatId(555)).await.unwrap(),
            GuestStatus::Verified
        );
        assert!(kv.get(&records::failed_key(555)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn block_and_unblock_flip_the_mark_by_value() {
        let (kv, _messenger, workflow) = workflow();
        seed_session(&kv, 700, None).await;

        workflow.block(ChatId(700), ChatId(1)).await.unwrap();
        assert!(workflow.is_blocked(ChatId(700)).await.unwrap());
        assert_eq!(
            workflow.status(ChatId(700)).await.unwrap(),
            GuestStatus::Blocked
        );
        assert!(kv.get(&records::session_key(700)).await.unwrap().is_none());

        workflow.unblock(ChatId(700), ChatId(1)).await.unwrap();
        assert!(!workflow.is_blocked(ChatId(700)).await.unwrap());
        // The record stays behind with value "false"; unblocking does not
        // grant verification.
        assert_eq!(
            kv.get(&records::blocked_key(700)).await.unwrap().as_deref(),
            Some("false")
        );
        assert_eq!(
            workflow.status(ChatId(700)).await.unwrap(),
            GuestStatus::Unverified
        );
    }

    #[tokio::test]
    async fn block_outranks_a_verified_mark() {
        let (kv, _messenger, workflow) = workflow();
        kv.put(&records::verified_key(800), "true", None)
            .await
            .unwrap();
        workflow.block(ChatId(800), ChatId(1)).await.unwrap();
        assert_eq!(
            workflow.status(ChatId(800)).await.unwrap(),
            GuestStatus::Blocked
        );
    }

    #[tokio::test]
    async fn status_of_an_unknown_chat_is_unverified() {
        let (_kv, _messenger, workflow) = workflow();
        assert_eq!(
            workflow.status(ChatId(999)).await.unwrap(),
            GuestStatus::Unverified
        );
    }

    #[tokio::test]
    async fn empty_pending_list_says_so() {
        let (_kv, messenger, workflow) = workflow();
        workflow.list_pending(ChatId(1)).await.unwrap();
        assert!(messenger.texts_for(1)[0].contains("No users are currently verifying"));
        assert!(messenger.keyboards().is_empty());
    }

    #[tokio::test]
    async fn pending_list_skips_verified_marks_and_offers_actions() {
        let (kv, messenger, workflow) = workflow();
        seed_session(&kv, 555, Some("Eve <script>")).await;
        // A verified mark shares the key prefix but is not a session.
        kv.put(&records::verified_key(42), "true", None)
            .await
            .unwrap();

        workflow.list_pending(ChatId(1)).await.unwrap();

        let keyboards = messenger.keyboards();
        assert_eq!(keyboards.len(), 1);
        let (chat, text, kb) = &keyboards[0];
        assert_eq!(*chat, 1);
        assert!(text.contains("Pending verification (1)"));
        assert!(text.contains("Eve &lt;script&gt;"));
        assert!(text.contains("<code>555</code>"));
        assert!(text.contains("attempts 1/3"));

        assert_eq!(kb.rows.len(), 1);
        assert_eq!(kb.rows[0][0].callback_data, "approve_555");
        assert_eq!(kb.rows[0][1].callback_data, "reject_555");
    }

    #[tokio::test]
    async fn pending_list_caps_action_rows() {
        let (kv, messenger, workflow) = workflow();
        for id in 0..15 {
            seed_session(&kv, 1000 + id, None).await;
        }

        workflow.list_pending(ChatId(1)).await.unwrap();

        let keyboards = messenger.keyboards();
        assert!(keyboards[0].1.contains("Pending verification (15)"));
        assert_eq!(keyboards[0].2.rows.len(), 10);
    }

    #[tokio::test]
    async fn failed_list_offers_approve_or_block() {
        let (kv, messenger, workflow) = workflow();
        let rejected_at = 1_700_000_000_000;
        let record = FailedVerification::rejected(
            555,
            Requester {
                username: Some("eve".to_string()),
                first_name: None,
                last_name: None,
            },
            rejected_at,
        );
        kv.put(
            &records::failed_key(555),
            &serde_json::to_string(&record).unwrap(),
            None,
        )
        .await
        .unwrap();

        workflow
            .list_failed_at(ChatId(1), rejected_at + 5 * 60_000)
            .await
            .unwrap();

        let keyboards = messenger.keyboards();
        assert_eq!(keyboards.len(), 1);
        assert!(keyboards[0].1.contains("Failed verifications (1)"));
        assert!(keyboards[0].1.contains("@eve"));
        assert!(keyboards[0].1.contains("rejected 5 min ago"));
        assert_eq!(keyboards[0].2.rows[0][0].callback_data, "approve_555");
        assert_eq!(keyboards[0].2.rows[0][1].callback_data, "block_555");
    }

    #[tokio::test]
    async fn empty_failed_list_says_so() {
        let (_kv, messenger, workflow) = workflow();
        workflow.list_failed(ChatId(1)).await.unwrap();
        assert!(messenger.texts_for(1)[0].contains("No failed verifications"));
    }
}

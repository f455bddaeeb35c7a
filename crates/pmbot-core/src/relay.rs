//! Relay Router: guest → all admins fan-out, and admin replies routed back
//! through the forwarded-message index.

use std::{sync::Arc, time::Duration};

use crate::domain::{ChatId, MessageId};
use crate::kv::KvStore;
use crate::messaging::MessagingPort;
use crate::moderation::ModerationWorkflow;
use crate::records;
use crate::Result;

/// Outcome of the guest delivery gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuestDelivery {
    /// The guest is blocked; they got a notice and nothing was forwarded.
    Blocked,
    /// Forwarded to this many admins.
    Relayed(usize),
}

pub struct RelayRouter {
    kv: Arc<dyn KvStore>,
    messenger: Arc<dyn MessagingPort>,
    index_ttl: Duration,
}

impl RelayRouter {
    pub fn new(
        kv: Arc<dyn KvStore>,
        messenger: Arc<dyn MessagingPort>,
        index_ttl: Duration,
    ) -> Self {
        Self {
            kv,
            messenger,
            index_ttl,
        }
    }

    /// Forward a guest message to every admin. Each admin is attempted
    /// independently; a failed forward is logged and skipped so the rest
    /// still receive the message. Returns how many forwards succeeded.
    pub async fn relay_to_admins(
        &self,
        guest_chat: ChatId,
        message_id: MessageId,
        admin_ids: &[i64],
    ) -> Result<usize> {
        let mut delivered = 0;
        for &admin in admin_ids {
            let forwarded = match self
                .messenger
                .forward_message(ChatId(admin), guest_chat, message_id)
                .await
            {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(admin, guest = guest_chat.0, "forward failed: {e}");
                    continue;
                }
            };
            // Index the forwarded copy so a later admin reply can find its
            // way back to the guest.
            self.kv
                .put(
                    &records::msg_map_key(forwarded.message_id.0),
                    &guest_chat.0.to_string(),
                    Some(self.index_ttl),
                )
                .await?;
            delivered += 1;
        }
        Ok(delivered)
    }

    /// The delivery gate for a guest who has already passed (or is exempt
    /// from) verification: a blocked guest gets a notice and no relay,
    /// anyone else is fanned out to the admins.
    pub async fn deliver_from_guest(
        &self,
        moderation: &ModerationWorkflow,
        guest_chat: ChatId,
        message_id: MessageId,
        admin_ids: &[i64],
    ) -> Result<GuestDelivery> {
        if moderation.is_blocked(guest_chat).await? {
            self.messenger
                .send_text(
                    guest_chat,
                    "🚫 You are blocked from contacting the admins.",
                )
                .await?;
            return Ok(GuestDelivery::Blocked);
        }

        let delivered = self
            .relay_to_admins(guest_chat, message_id, admin_ids)
            .await?;
        Ok(GuestDelivery::Relayed(delivered))
    }

    /// Look up which guest chat a forwarded message came from.
    pub async fn resolve_reply(&self, forwarded_id: MessageId) -> Result<Option<ChatId>> {
        let raw = self.kv.get(&records::msg_map_key(forwarded_id.0)).await?;
        Ok(raw.and_then(|v| v.parse::<i64>().ok()).map(ChatId))
    }

    /// Deliver an admin's reply back to the guest the replied-to forward
    /// originated from. The guest sees a clean copy with no admin
    /// attribution. Returns `false` (and does nothing) when the replied-to
    /// message is not in the index.
    pub async fn route_admin_reply(
        &self,
        admin_chat: ChatId,
        reply_id: MessageId,
        replied_to: MessageId,
    ) -> Result<bool> {
        let Some(guest_chat) = self.resolve_reply(replied_to).await? else {
            return Ok(false);
        };
        self.messenger
            .copy_message(guest_chat, admin_chat, reply_id)
            .await?;
        Ok(true)
    }
}

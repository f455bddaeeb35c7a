//! Key namespaces and record schemas for everything the bot persists.
//!
//! Field names match the JSON blobs the original deployment wrote to its
//! store, so an existing dataset keeps working. A record that fails to
//! decode is treated as absent, never as a crash.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::challenge::ChallengeKind;
use crate::domain::Requester;

pub const SESSION_PREFIX: &str = "captcha-";
pub const VERIFIED_PREFIX: &str = "captcha-verified-";
pub const BLOCKED_PREFIX: &str = "isblocked-";
pub const FAILED_PREFIX: &str = "failed-verification-";
pub const MSG_MAP_PREFIX: &str = "msg-map-";

pub fn session_key(chat_id: i64) -> String {
    format!("{SESSION_PREFIX}{chat_id}")
}

pub fn verified_key(chat_id: i64) -> String {
    format!("{VERIFIED_PREFIX}{chat_id}")
}

pub fn blocked_key(chat_id: i64) -> String {
    format!("{BLOCKED_PREFIX}{chat_id}")
}

pub fn failed_key(chat_id: i64) -> String {
    format!("{FAILED_PREFIX}{chat_id}")
}

pub fn msg_map_key(message_id: i32) -> String {
    format!("{MSG_MAP_PREFIX}{message_id}")
}

/// One live verification challenge per chat. A new challenge for the same
/// chat overwrites any prior session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptchaSession {
    pub chat_id: i64,
    pub answer: String,
    pub attempts: u32,
    /// Unix milliseconds.
    pub created_at: i64,
    #[serde(rename = "type")]
    pub kind: ChallengeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl CaptchaSession {
    /// Image codes compare case-insensitively; quiz answers are the exact
    /// option index as a string.
    pub fn answer_matches(&self, submitted: &str) -> bool {
        match self.kind {
            ChallengeKind::Image => submitted.eq_ignore_ascii_case(&self.answer),
            ChallengeKind::Quiz => submitted == self.answer,
        }
    }

    pub fn requester(&self) -> Requester {
        Requester {
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

/// Written when an admin explicitly rejects a pending verification.
/// Attempts-exhausted expiry does not create one of these.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedVerification {
    pub chat_id: i64,
    pub status: String,
    /// Unix milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl FailedVerification {
    pub fn rejected(chat_id: i64, requester: Requester, timestamp: i64) -> Self {
        Self {
            chat_id,
            status: "failed".to_string(),
            timestamp,
            username: requester.username,
            first_name: requester.first_name,
            last_name: requester.last_name,
        }
    }
}

/// Decode a stored JSON record, treating corrupt data as absent.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Option<T> {
    serde_json::from_str(raw).ok()
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

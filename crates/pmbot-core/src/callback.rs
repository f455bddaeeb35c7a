//! Callback-button payloads, shared between keyboard construction and the
//! update dispatcher so both sides agree on the wire format.

/// A parsed callback payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    /// Admin approves the guest's verification.
    Approve(i64),
    /// Admin rejects the pending verification.
    Reject(i64),
    /// Admin blocks the guest outright.
    Block(i64),
    /// Guest picked a quiz option; carries the raw index text, which is
    /// compared verbatim against the session's expected answer.
    QuizAnswer(String),
}

const APPROVE_PREFIX: &str = "approve_";
const REJECT_PREFIX: &str = "reject_";
const BLOCK_PREFIX: &str = "block_";
const QUIZ_ANSWER_PREFIX: &str = "captcha_answer_";

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(rest) = data.strip_prefix(APPROVE_PREFIX) {
            return rest.parse().ok().map(CallbackAction::Approve);
        }
        if let Some(rest) = data.strip_prefix(REJECT_PREFIX) {
            return rest.parse().ok().map(CallbackAction::Reject);
        }
        if let Some(rest) = data.strip_prefix(BLOCK_PREFIX) {
            return rest.parse().ok().map(CallbackAction::Block);
        }
        if let Some(rest) = data.strip_prefix(QUIZ_ANSWER_PREFIX) {
            return Some(CallbackAction::QuizAnswer(rest.to_string()));
        }
        None
    }
}

pub fn approve_data(chat_id: i64) -> String {
    format!("{APPROVE_PREFIX}{chat_id}")
}

pub fn reject_data(chat_id: i64) -> String {
    format!("{REJECT_PREFIX}{chat_id}")
}

pub fn block_data(chat_id: i64) -> String {
    format!("{BLOCK_PREFIX}{chat_id}")
}

pub fn quiz_answer_data(option_index: usize) -> String {
    format!("{QUIZ_ANSWER_PREFIX}{option_index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_admin_actions() {
        assert_eq!(
            CallbackAction::parse(&approve_data(555)),
            Some(CallbackAction::Approve(555))
        );
        assert_eq!(
            CallbackAction::parse(&reject_data(-100)),
            Some(CallbackAction::Reject(-100))
        );
        assert_eq!(
            CallbackAction::parse(&block_data(7)),
            Some(CallbackAction::Block(7))
        );
    }

    #[test]
    fn quiz_answer_keeps_raw_index_text() {
        assert_eq!(
            CallbackAction::parse(&quiz_answer_data(2)),
            Some(CallbackAction::QuizAnswer("2".to_string()))
        );
        // Whatever follows the prefix is passed through as-is.
        assert_eq!(
            CallbackAction::parse("captcha_answer_xyz"),
            Some(CallbackAction::QuizAnswer("xyz".to_string()))
        );
    }

    #[test]
    fn unknown_or_malformed_payloads_do_not_parse() {
        assert_eq!(CallbackAction::parse(""), None);
        assert_eq!(CallbackAction::parse("noop"), None);
        assert_eq!(CallbackAction::parse("approve_abc"), None);
    }
}

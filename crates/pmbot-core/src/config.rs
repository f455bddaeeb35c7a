use std::{env, fs, path::Path, time::Duration};

use crate::challenge::{ChallengeKind, QuizQuestion};
use crate::{errors::Error, Result};

/// Typed configuration, loaded once at process start and passed into every
/// component — no ambient lookups.
#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,
    /// Shared secret verified on every inbound webhook call. Required in
    /// webhook mode.
    pub webhook_secret: Option<String>,
    /// Public webhook URL. Present → webhook mode; absent → long polling
    /// (development).
    pub webhook_url: Option<String>,
    pub webhook_port: u16,

    /// Administrator chat ids. The first entry is the primary admin.
    pub admin_ids: Vec<i64>,

    pub captcha_enabled: bool,
    pub captcha_mode: ChallengeKind,
    pub captcha_timeout: Duration,
    pub captcha_max_attempts: u32,
    pub welcome_message: String,
    /// Custom quiz pool; `None` falls back to the built-in questions.
    pub quiz_questions: Option<Vec<QuizQuestion>>,

    pub redis_url: String,
    /// TTL on reply-routing index entries; bounds the otherwise unbounded
    /// msg-map growth.
    pub relay_index_ttl: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bot_token = env_str("BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(Error::Config(
                "BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let admin_ids = parse_csv_i64(env_str("ADMIN_UIDS"));
        if admin_ids.is_empty() {
            return Err(Error::Config(
                "ADMIN_UIDS environment variable is required".to_string(),
            ));
        }

        let webhook_url = env_str("WEBHOOK_URL").and_then(non_empty);
        let webhook_secret = env_str("BOT_SECRET").and_then(non_empty);
        if webhook_url.is_some() && webhook_secret.is_none() {
            return Err(Error::Config(
                "BOT_SECRET is required when WEBHOOK_URL is set".to_string(),
            ));
        }
        let webhook_port = env_u16("WEBHOOK_PORT").unwrap_or(8443);

        let captcha_enabled = env_bool("CAPTCHA_ENABLED").unwrap_or(true);
        let captcha_mode = parse_mode(env_str("CAPTCHA_MODE"));
        let captcha_timeout =
            Duration::from_millis(env_u64("CAPTCHA_TIMEOUT").unwrap_or(300_000));
        let captcha_max_attempts = env_u32("CAPTCHA_MAX_ATTEMPTS").unwrap_or(3).max(1);
        let welcome_message = env_str("WELCOME_MESSAGE")
            .and_then(non_empty)
            .unwrap_or_else(|| "👋 Welcome! Send a message and it will reach the admins.".to_string());
        let quiz_questions = parse_quiz_questions(env_str("QUIZ_QUESTIONS"));

        let redis_url = env_str("REDIS_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string());
        let relay_index_ttl =
            Duration::from_secs(env_u64("RELAY_INDEX_TTL_SECS").unwrap_or(30 * 24 * 3600));

        Ok(Self {
            bot_token,
            webhook_secret,
            webhook_url,
            webhook_port,
            admin_ids,
            captcha_enabled,
            captcha_mode,
            captcha_timeout,
            captcha_max_attempts,
            welcome_message,
            quiz_questions,
            redis_url,
            relay_index_ttl,
        })
    }

    pub fn primary_admin(&self) -> Option<i64> {
        self.admin_ids.first().copied()
    }

    pub fn is_admin(&self, chat_id: i64) -> bool {
        self.admin_ids.contains(&chat_id)
    }
}

fn parse_mode(v: Option<String>) -> ChallengeKind {
    match v.as_deref().map(str::trim) {
        Some(s) if s.eq_ignore_ascii_case("image") => ChallengeKind::Image,
        _ => ChallengeKind::Quiz,
    }
}

/// Parse the custom quiz pool. Malformed input falls back to `None` (the
/// built-in pool) rather than failing startup; invalid entries are dropped.
fn parse_quiz_questions(v: Option<String>) -> Option<Vec<QuizQuestion>> {
    let raw = v?;
    if raw.trim().is_empty() {
        return None;
    }

    let parsed: Vec<QuizQuestion> = match serde_json::from_str(&raw) {
        Ok(qs) => qs,
        Err(e) => {
            tracing::warn!("failed to parse QUIZ_QUESTIONS, using built-in pool: {e}");
            return None;
        }
    };

    let valid: Vec<QuizQuestion> = parsed.into_iter().filter(QuizQuestion::is_valid).collect();
    if valid.is_empty() {
        None
    } else {
        Some(valid)
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_u16(key: &str) -> Option<u16> {
    env_str(key).and_then(|s| s.trim().parse::<u16>().ok())
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_admin_ids_skip_blanks_and_junk() {
        assert_eq!(
            parse_csv_i64(Some("12345, 678,, abc, 9".to_string())),
            vec![12345, 678, 9]
        );
        assert!(parse_csv_i64(None).is_empty());
    }

    #[test]
    fn mode_defaults_to_quiz() {
        assert_eq!(parse_mode(None), ChallengeKind::Quiz);
        assert_eq!(parse_mode(Some("quiz".to_string())), ChallengeKind::Quiz);
        assert_eq!(parse_mode(Some("IMAGE".to_string())), ChallengeKind::Image);
        assert_eq!(parse_mode(Some("bogus".to_string())), ChallengeKind::Quiz);
    }

    #[test]
    fn quiz_questions_parse_or_fall_back() {
        let good = r#"[{"question":"q?","options":["a","b"],"correctAnswer":1}]"#;
        let qs = parse_quiz_questions(Some(good.to_string())).unwrap();
        assert_eq!(qs.len(), 1);
        assert_eq!(qs[0].correct_answer, 1);

        assert_eq!(parse_quiz_questions(None), None);
        assert_eq!(parse_quiz_questions(Some(String::new())), None);
        assert_eq!(parse_quiz_questions(Some("{broken".to_string())), None);
        assert_eq!(parse_quiz_questions(Some("[]".to_string())), None);

        // Out-of-range correct index is dropped; a pool with nothing valid
        // left falls back to the built-ins.
        let bad_index = r#"[{"question":"q?","options":["a"],"correctAnswer":3}]"#;
        assert_eq!(parse_quiz_questions(Some(bad_index.to_string())), None);
    }
}

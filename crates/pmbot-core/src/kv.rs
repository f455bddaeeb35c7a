use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use async_trait::async_trait;

use crate::Result;

/// Port over the external key-value store.
///
/// This is the full surface the bot needs: string values, optional per-key
/// TTL, and prefix listing. Redis is the production implementation
/// (`pmbot-redis`); `MemoryKv` backs tests.
///
/// TTLs are advisory expiry, not eviction guarantees — callers that care
/// about staleness (session timeout) re-check timestamps on read.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    /// Keys (not values) starting with `prefix`, in sorted order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

/// In-memory store with TTL support.
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, Entry>>,
    // Test clock offset added to `Instant::now()`.
    skew: Mutex<Duration>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the store's notion of "now" (for TTL tests).
    pub fn advance(&self, d: Duration) {
        let mut skew = self.skew.lock().unwrap();
        *skew += d;
    }

    fn now(&self) -> Instant {
        Instant::now() + *self.skew.lock().unwrap()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = self.now();
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(e) if e.expires_at.is_some_and(|at| at <= now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(e) => Ok(Some(e.value.clone())),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.map(|d| self.now() + d);
        self.entries.lock().unwrap().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let now = self.now();
        let entries = self.entries.lock().unwrap();
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(k, e)| k.starts_with(prefix) && !e.expires_at.is_some_and(|at| at <= now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

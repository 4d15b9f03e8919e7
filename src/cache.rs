//! In-memory TTL cache for Twitch API responses.
//!
//! The bridge reads stream status and video listings far more often than
//! they change, so responses are held under fixed, per-endpoint TTLs: 30
//! minutes for the live stream snapshot and 24 hours for video listings.
//! Entries can also be evicted explicitly, which is what the maintenance
//! `delete-cache` action does.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;

/// How long the live stream snapshot (including an offline verdict) is held.
pub const STREAM_TTL: Duration = Duration::from_secs(60 * 30);
/// How long video listings are held.
pub const VIDEOS_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// Cache key for the stream snapshot.
pub const STREAM_KEY: &str = "twitch-pack-stream";
/// Cache key for the archived-VODs listing.
pub const VIDEOS_ARCHIVE_KEY: &str = "twitch-pack-videos-archive";
/// Cache key for the highlights listing.
pub const VIDEOS_HIGHLIGHT_KEY: &str = "twitch-pack-videos-highlight";

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: SystemTime,
}

/// A shared key-value cache of decoded API responses.
///
/// Values are stored as raw JSON so one cache can hold responses of
/// different shapes; callers decode on the way out. Cloning is cheap and
/// all clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct ResponseCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key`, or `None` when absent or expired.
    ///
    /// Expired entries are dropped on read.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if SystemTime::now() < entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                tracing::trace!(key, "cache entry expired");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `value` under `key` for `ttl`, replacing any previous entry.
    pub async fn put(&self, key: &str, value: Value, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: SystemTime::now() + ttl,
        };
        self.entries.lock().await.insert(key.to_string(), entry);
    }

    /// Evicts a single entry.
    pub async fn delete(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    /// Evicts everything.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
        tracing::info!("cache deleted");
    }
}

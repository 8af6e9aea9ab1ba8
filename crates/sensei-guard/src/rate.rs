//! Window-reset rate limiting over an injectable key-value store.

use chrono::{DateTime, Duration, Utc};
use sensei_types::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Length of the rate-limit window in seconds.
pub const DEFAULT_WINDOW_SECS: i64 = 60;

/// Per-key counter with a reset deadline.
///
/// Records are overwritten on every allowed call and never deleted; the
/// key space is bounded (user identity + operation name), so stale keys
/// are left in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateDecision {
    /// Whole seconds until the window resets, clamped at zero.
    pub fn retry_after_secs(&self) -> u64 {
        (self.reset_at - Utc::now()).num_seconds().max(0) as u64
    }
}

/// Key-value storage for rate-limit records.
///
/// Check-and-increment is a single synchronous read-modify-write with no
/// suspension point, which makes it safe for interleaved async callers in
/// one process. It is NOT safe against true multi-process writers: there
/// is no compare-and-swap or cross-process lock.
pub trait RateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError>;
    fn set(&self, key: &str, record: &RateLimitRecord) -> Result<(), StoreError>;
}

/// In-memory store for tests and single-process use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, RateLimitRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(key).cloned())
    }

    fn set(&self, key: &str, record: &RateLimitRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(key.to_string(), record.clone());
        Ok(())
    }
}

/// Durable store: one JSON file per key under `dir` (atomic write:
/// .tmp → rename).
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store, ensuring the directory exists.
    pub fn new(dir: PathBuf) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn record_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl RateStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        match std::fs::read_to_string(self.record_path(key)) {
            Ok(data) => Ok(Some(serde_json::from_str(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, record: &RateLimitRecord) -> Result<(), StoreError> {
        let path = self.record_path(key);
        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, serde_json::to_string(record)?)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

/// Window-reset request counter.
///
/// This is not a sliding window or a token bucket: the counter resets
/// entirely at the deadline, so a burst of `max` requests just before the
/// reset followed by `max` just after is possible. Accepted trade-off for
/// a UX throttle.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateStore>,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateStore>) -> Self {
        Self::with_window(store, Duration::seconds(DEFAULT_WINDOW_SECS))
    }

    /// Override the window length (tests shrink it).
    pub fn with_window(store: Arc<dyn RateStore>, window: Duration) -> Self {
        Self { store, window }
    }

    /// Check and count one request under `key`.
    ///
    /// Fails OPEN: if the store errors on read or write, the request is
    /// allowed. Availability beats strict enforcement here — this limiter
    /// is defense-in-depth for UX, and the authoritative limit is enforced
    /// server-side. Do not change this to fail closed.
    pub fn check(&self, key: &str, max_requests: u32) -> RateDecision {
        let now = Utc::now();

        let current = match self.store.get(key) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("rate-limit store read failed for '{key}', allowing: {e}");
                return RateDecision {
                    allowed: true,
                    remaining: max_requests.saturating_sub(1),
                    reset_at: now + self.window,
                };
            }
        };

        match current {
            Some(record) if record.reset_at > now => {
                if record.count >= max_requests {
                    // Denied calls do not increment the counter.
                    return RateDecision {
                        allowed: false,
                        remaining: 0,
                        reset_at: record.reset_at,
                    };
                }
                let updated = RateLimitRecord {
                    count: record.count + 1,
                    reset_at: record.reset_at,
                };
                self.write(key, &updated);
                RateDecision {
                    allowed: true,
                    remaining: max_requests - updated.count,
                    reset_at: updated.reset_at,
                }
            }
            // No record, or the window expired: start a fresh one.
            _ => {
                let fresh = RateLimitRecord {
                    count: 1,
                    reset_at: now + self.window,
                };
                self.write(key, &fresh);
                RateDecision {
                    allowed: true,
                    remaining: max_requests.saturating_sub(1),
                    reset_at: fresh.reset_at,
                }
            }
        }
    }

    fn write(&self, key: &str, record: &RateLimitRecord) {
        if let Err(e) = self.store.set(key, record) {
            tracing::warn!("rate-limit store write failed for '{key}', allowing: {e}");
        }
    }
}

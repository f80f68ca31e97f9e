//! Refresh-token whitelist
//!
//! A refresh token is usable only while its whitelist entry exists. Entries
//! live in a key-value cache with native per-key expiry, keyed by
//! `refresh_token:{user_id}:{fingerprint}` where the fingerprint is a
//! truncated SHA-256 of the token. The raw token is never stored.
//!
//! The store is built once at startup and handed to the services. When the
//! cache cannot be reached at that point the store stays unavailable for the
//! lifetime of the process; every check then answers with the configured
//! fail-open policy and every write is a no-op.

use super::clock::{Clock, SystemClock};
use crate::config::RevocationConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use redis::aio::ConnectionManager;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Key namespace for whitelist entries
pub const KEY_PREFIX: &str = "refresh_token";

/// Hex characters of the SHA-256 digest kept in the key
pub const FINGERPRINT_LEN: usize = 16;

/// URL selecting the in-process backend instead of Redis
pub const MEMORY_URL: &str = "memory://";

const SCAN_BATCH: usize = 200;

/// Minimal key-value primitives the whitelist needs
#[async_trait]
pub trait RevocationBackend: Send + Sync {
    async fn ping(&self) -> Result<()>;

    /// Create or overwrite `key` expiring after `ttl_secs`
    async fn set_with_ttl(&self, key: &str, ttl_secs: u64) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Delete `key`; `true` only if this call removed it
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Delete every key starting with `prefix`; returns how many were removed
    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64>;
}

/// Redis-backed whitelist
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    /// Open a managed connection and ping it once
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("invalid Redis URL")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("failed to connect to Redis")?;
        let backend = Self { conn };
        backend.ping().await?;
        Ok(backend)
    }
}

#[async_trait]
impl RevocationBackend for RedisBackend {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(1)
            .arg("EX")
            .arg(ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let count: i64 = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(count > 0)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        // DEL is atomic: of several concurrent callers only one sees 1
        let mut conn = self.conn.clone();
        let removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(removed > 0)
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", prefix);
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let n: i64 = redis::cmd("DEL").arg(&keys).query_async(&mut conn).await?;
                removed += n.max(0) as u64;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(removed)
    }
}

/// In-process whitelist for tests and single-node development
///
/// All operations take one lock, so `delete_by_prefix` is atomic with
/// respect to concurrent writes. Expired entries are swept on every write
/// and dropped whenever a lookup lands on one, so the map only holds live
/// sessions plus whatever expired since the last write.
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryBackend {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

#[async_trait]
impl RevocationBackend for MemoryBackend {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, ttl_secs: u64) -> Result<()> {
        let ttl = i64::try_from(ttl_secs).context("ttl out of range")?;
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, expires_at| *expires_at > now);
        entries.insert(key.to_string(), now + ChronoDuration::seconds(ttl));
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(expires_at) if *expires_at > now => Ok(true),
            Some(_) => {
                entries.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = self.clock.now();
        let removed = self.entries.lock().await.remove(key);
        Ok(removed.is_some_and(|expires_at| expires_at > now))
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let mut removed = 0u64;
        entries.retain(|key, expires_at| {
            if *expires_at <= now {
                return false;
            }
            if key.starts_with(prefix) {
                removed += 1;
                return false;
            }
            true
        });
        Ok(removed)
    }
}

/// Outcome of an atomic test-and-delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumed {
    /// The entry existed and this caller removed it
    Consumed,
    /// No entry: never whitelisted, already rotated, revoked or expired
    Missing,
    /// The store could not answer
    Unavailable,
}

/// Refresh-token whitelist handle
///
/// Cheap to clone. Build it with [`RevocationStore::connect`] at startup, or
/// with one of the explicit constructors in tests.
#[derive(Clone)]
pub struct RevocationStore {
    backend: Option<Arc<dyn RevocationBackend>>,
    fail_open: bool,
    op_timeout: Duration,
}

impl RevocationStore {
    /// Build the store described by `config`, probing the backend once
    pub async fn connect(config: &RevocationConfig) -> Self {
        let op_timeout = Duration::from_secs(config.op_timeout_secs.max(1));

        let Some(url) = config.redis_url.as_deref().filter(|u| !u.is_empty()) else {
            warn!("No revocation store configured; refresh tokens are checked by signature and expiry only");
            return Self::unavailable(config.fail_open);
        };

        if url == MEMORY_URL {
            info!("Using in-process revocation store");
            return Self::from_backend(
                Arc::new(MemoryBackend::new(Arc::new(SystemClock))),
                config.fail_open,
                op_timeout,
            );
        }

        info!("Connecting to revocation store...");
        match tokio::time::timeout(op_timeout, RedisBackend::connect(url)).await {
            Ok(Ok(backend)) => {
                info!("Revocation store connection established");
                Self::from_backend(Arc::new(backend), config.fail_open, op_timeout)
            }
            Ok(Err(e)) => {
                warn!(
                    error = %e,
                    fail_open = config.fail_open,
                    "Revocation store unavailable; running without refresh-token revocation"
                );
                Self::unavailable(config.fail_open)
            }
            Err(_) => {
                warn!(
                    timeout_secs = op_timeout.as_secs(),
                    fail_open = config.fail_open,
                    "Revocation store ping timed out; running without refresh-token revocation"
                );
                Self::unavailable(config.fail_open)
            }
        }
    }

    pub fn from_backend(
        backend: Arc<dyn RevocationBackend>,
        fail_open: bool,
        op_timeout: Duration,
    ) -> Self {
        Self {
            backend: Some(backend),
            fail_open,
            op_timeout,
        }
    }

    /// In-process store reading expiry from `clock`
    pub fn in_memory(clock: Arc<dyn Clock>, fail_open: bool) -> Self {
        Self::from_backend(
            Arc::new(MemoryBackend::new(clock)),
            fail_open,
            Duration::from_secs(5),
        )
    }

    /// Store with no backend; checks answer `fail_open`, writes are no-ops
    pub fn unavailable(fail_open: bool) -> Self {
        Self {
            backend: None,
            fail_open,
            op_timeout: Duration::from_secs(5),
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn fail_open(&self) -> bool {
        self.fail_open
    }

    /// Live check used by the readiness endpoint
    pub async fn ping(&self) -> bool {
        match &self.backend {
            Some(backend) => self.call("ping", backend.ping()).await.is_some(),
            None => false,
        }
    }

    /// Record `token` as valid for `ttl_secs`. Failure is logged, not fatal.
    pub async fn whitelist(&self, user_id: Uuid, token: &str, ttl_secs: i64) -> bool {
        let Some(backend) = &self.backend else {
            return false;
        };
        let Ok(ttl) = u64::try_from(ttl_secs) else {
            return false;
        };
        if ttl == 0 {
            return false;
        }
        let key = token_key(user_id, token);
        self.call("whitelist", backend.set_with_ttl(&key, ttl))
            .await
            .is_some()
    }

    /// Whether `token` is still whitelisted; the fail-open policy decides
    /// when the store cannot answer
    pub async fn is_valid(&self, user_id: Uuid, token: &str) -> bool {
        let Some(backend) = &self.backend else {
            return self.fail_open;
        };
        let key = token_key(user_id, token);
        self.call("is_valid", backend.exists(&key))
            .await
            .unwrap_or(self.fail_open)
    }

    /// Atomically check and remove the entry for `token`
    ///
    /// Concurrent callers presenting the same token get exactly one
    /// [`Consumed::Consumed`].
    pub async fn consume(&self, user_id: Uuid, token: &str) -> Consumed {
        let Some(backend) = &self.backend else {
            return Consumed::Unavailable;
        };
        let key = token_key(user_id, token);
        match self.call("consume", backend.delete(&key)).await {
            Some(true) => Consumed::Consumed,
            Some(false) => Consumed::Missing,
            None => Consumed::Unavailable,
        }
    }

    /// Remove the entry for `token`. Removing a missing entry succeeds.
    pub async fn revoke(&self, user_id: Uuid, token: &str) -> bool {
        let Some(backend) = &self.backend else {
            return false;
        };
        let key = token_key(user_id, token);
        self.call("revoke", backend.delete(&key)).await.is_some()
    }

    /// Remove every entry belonging to `user_id`
    ///
    /// A whitelist write racing with this call is last-writer-wins: the new
    /// entry is either removed or survives intact.
    pub async fn revoke_all(&self, user_id: Uuid) -> bool {
        let Some(backend) = &self.backend else {
            return false;
        };
        let prefix = user_prefix(user_id);
        match self.call("revoke_all", backend.delete_by_prefix(&prefix)).await {
            Some(removed) => {
                info!(%user_id, removed, "revoked all refresh tokens");
                true
            }
            None => false,
        }
    }

    async fn call<T, F>(&self, op: &'static str, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(op, error = %e, "revocation store call failed");
                metrics::counter!("revocation_store_errors_total", "op" => op).increment(1);
                None
            }
            Err(_) => {
                warn!(
                    op,
                    timeout_ms = self.op_timeout.as_millis() as u64,
                    "revocation store call timed out"
                );
                metrics::counter!("revocation_store_errors_total", "op" => op).increment(1);
                None
            }
        }
    }
}

/// Truncated SHA-256 of the token, hex encoded
pub fn fingerprint(token: &str) -> String {
    let digest = hex::encode(Sha256::digest(token.as_bytes()));
    digest[..FINGERPRINT_LEN].to_string()
}

fn user_prefix(user_id: Uuid) -> String {
    format!("{}:{}:", KEY_PREFIX, user_id)
}

/// Whitelist key for one token
pub fn token_key(user_id: Uuid, token: &str) -> String {
    format!("{}{}", user_prefix(user_id), fingerprint(token))
}

//! In-memory cache for transient OAuth handshake state.
//!
//! Bridges the multi-step redirect dance: a session is created at
//! Initiate (keyed by the provider's request token), read back at
//! Callback, and deleted once credentials are persisted. Entries expire
//! after a fixed TTL and the cache is capacity-bounded with
//! least-recently-used eviction, so a flood of handshake requests cannot
//! exhaust memory. Nothing here survives a process restart, by design.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::service::ServiceName;

/// Default session lifetime: 15 minutes.
pub const DEFAULT_TTL_SECONDS: i64 = 15 * 60;

/// Default capacity before LRU eviction kicks in.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Transient state for one in-flight OAuth handshake.
///
/// Keyed externally by the provider-issued request token; holds the
/// matching token secret needed for the exchange step.
#[derive(Clone, Debug)]
pub struct HandshakeSession {
    pub principal: Uuid,
    pub service: ServiceName,
    /// Request-token secret, paired with the cache key.
    pub token_secret: String,
    /// CSRF state bound to this handshake (256 bits, hex).
    pub csrf_state: String,
    /// Where to send the user after a successful callback.
    pub return_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

struct Entry {
    session: HandshakeSession,
    expires_at: DateTime<Utc>,
    /// Recency tick for LRU eviction; bumped on every get.
    last_used: u64,
}

struct Inner {
    entries: HashMap<String, Entry>,
    tick: u64,
}

/// Time-bounded, capacity-bounded handshake session cache.
///
/// All operations take a single lock, so per-key put/get/delete are
/// atomic: two concurrent callbacks cannot both consume one session.
/// Expired entries are dropped lazily on access and by the periodic
/// sweeper; they are never returned.
#[derive(Clone)]
pub struct SessionCache {
    inner: Arc<Mutex<Inner>>,
    ttl: Duration,
    capacity: usize,
}

impl SessionCache {
    pub fn new(ttl_seconds: i64, capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                tick: 0,
            })),
            ttl: Duration::seconds(ttl_seconds),
            capacity: capacity.max(1),
        }
    }

    /// Inserts or overwrites the session for a request token.
    ///
    /// When the cache is full, the least-recently-used entry is evicted
    /// first (an accepted availability trade-off under flood, not an
    /// error).
    pub fn put(&self, token: &str, session: HandshakeSession) {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();

        if !inner.entries.contains_key(token) && inner.entries.len() >= self.capacity {
            // Prefer reclaiming expired entries before evicting live ones
            inner.entries.retain(|_, e| e.expires_at > now);

            if inner.entries.len() >= self.capacity {
                if let Some(lru_key) = inner
                    .entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_used)
                    .map(|(k, _)| k.clone())
                {
                    tracing::warn!(token = %lru_key, "session cache full, evicting least-recently-used entry");
                    inner.entries.remove(&lru_key);
                }
            }
        }

        inner.tick += 1;
        let tick = inner.tick;
        inner.entries.insert(
            token.to_string(),
            Entry {
                session,
                expires_at: now + self.ttl,
                last_used: tick,
            },
        );
    }

    /// Fetches the session for a request token, refreshing its recency.
    ///
    /// Returns `None` both for expired and never-inserted tokens; callers
    /// cannot tell the two apart, which keeps replay timing opaque.
    pub fn get(&self, token: &str) -> Option<HandshakeSession> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();

        let expired = matches!(inner.entries.get(token), Some(e) if e.expires_at <= now);
        if expired {
            inner.entries.remove(token);
            return None;
        }

        inner.tick += 1;
        let tick = inner.tick;
        let entry = inner.entries.get_mut(token)?;
        entry.last_used = tick;
        Some(entry.session.clone())
    }

    /// Explicitly invalidates a session, making it single-use once the
    /// callback that read it has persisted credentials.
    pub fn delete(&self, token: &str) {
        self.inner.lock().unwrap().entries.remove(token);
    }

    /// Drops all expired entries. Called by the periodic sweeper; lazy
    /// expiry on access makes this an optimization, not a correctness
    /// requirement.
    pub fn cleanup_expired(&self) {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        inner.entries.retain(|_, e| e.expires_at > now);
    }

    /// Active entry count (monitoring).
    pub fn count(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }
}

/// Generates a CSRF state value: 32 random bytes (256 bits), hex-encoded.
pub fn generate_csrf_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Background task that periodically sweeps expired handshake sessions.
pub async fn run_session_sweeper(cache: SessionCache, interval_seconds: u64) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_seconds));

    loop {
        interval.tick().await;
        cache.cleanup_expired();
        tracing::debug!("session sweep complete, {} sessions remaining", cache.count());
    }
}

//! Time-bounded response cache.
//!
//! Entries carry an absolute expiry in epoch seconds. A lookup is a hit only
//! while `expires_at > now`. Expired entries are dropped on read, and
//! [`MemoryCache`] sweeps the rest on writes at most once a minute.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Prefix shared by every gateway response entry.
pub const API_CACHE_PREFIX: &str = "mautic_api:";

/// A cached value with its absolute expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Decoded response body or derived data.
    pub value: Value,
    /// Epoch seconds after which the entry is stale.
    pub expires_at: i64,
}

impl CacheEntry {
    /// True while the entry may still be served.
    pub fn is_fresh(&self, now: i64) -> bool {
        self.expires_at > now
    }
}

/// Absolute expiry `lifetime` seconds after `now`, saturating at `i64::MAX`.
pub fn expires_after(now: i64, lifetime: u64) -> i64 {
    now.saturating_add(i64::try_from(lifetime).unwrap_or(i64::MAX))
}

/// Key/value store for cached API data.
///
/// Implementations must be safe to share across concurrent requests.
pub trait CacheStore: Send + Sync {
    /// Fetch a fresh entry. Stale entries are reported as misses.
    fn get(&self, key: &str, now: i64) -> Option<Value>;

    /// Insert or replace an entry that stays fresh for `lifetime` seconds after `now`.
    fn set(&self, key: &str, value: Value, now: i64, lifetime: u64);

    /// Remove a single entry.
    fn delete(&self, key: &str);

    /// Remove every entry whose key starts with `prefix`. Returns the count removed.
    fn delete_prefix(&self, prefix: &str) -> usize;
}

/// Seconds between stale-entry sweeps in [`MemoryCache`].
const SWEEP_INTERVAL: i64 = 60;

/// In-process cache backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryCache {
    inner: Mutex<Entries>,
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, CacheEntry>,
    next_sweep: i64,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.lock().map.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str, now: i64) -> Option<Value> {
        let mut entries = self.lock();
        match entries.map.get(key) {
            Some(entry) if entry.is_fresh(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.map.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: Value, now: i64, lifetime: u64) {
        let mut entries = self.lock();
        if now >= entries.next_sweep {
            entries.map.retain(|_, entry| entry.is_fresh(now));
            entries.next_sweep = now.saturating_add(SWEEP_INTERVAL);
        }
        let expires_at = expires_after(now, lifetime);
        entries
            .map
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }

    fn delete(&self, key: &str) {
        self.lock().map.remove(key);
    }

    fn delete_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.lock();
        let before = entries.map.len();
        entries.map.retain(|key, _| !key.starts_with(prefix));
        before - entries.map.len()
    }
}

/// Lowercase hex SHA-256 of `input`.
pub fn digest(input: &str) -> String {
    let hash = Sha256::digest(input.as_bytes());
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Prefix under which all entries for one endpoint live.
pub fn endpoint_prefix(endpoint: &str) -> String {
    format!("{}{}:", API_CACHE_PREFIX, normalize_endpoint(endpoint))
}

/// Cache key for a gateway response: `mautic_api:{endpoint}:{sha256(endpoint + options)}`.
pub fn response_key(endpoint: &str, serialized_options: &str) -> String {
    let endpoint = normalize_endpoint(endpoint);
    format!(
        "{}{}",
        endpoint_prefix(endpoint),
        digest(&format!("{}{}", endpoint, serialized_options))
    )
}

/// Endpoints are stored without a leading slash so `/contacts` and `contacts` share entries.
pub fn normalize_endpoint(endpoint: &str) -> &str {
    endpoint.trim_start_matches('/')
}
